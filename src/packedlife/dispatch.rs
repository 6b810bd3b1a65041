//! Data-parallel entry points over a 2D index space.
//!
//! Each unit of work (one packed word, or one rendered pixel) is independent.
//! Units are grouped by output row and rows are handed to rayon, so every
//! task owns a disjoint slice of the output buffer. Out-of-range units are
//! skipped silently; nothing here reports errors.

use rayon::prelude::*;

use super::grid::WORD_BITS;
use super::kernel::{self, KernelBackend};
use super::pcg;

pub const ALIVE_PIXEL: u8 = 255;
pub const DEAD_PIXEL: u8 = 0;

/// Below this many units a call runs on the calling thread.
const PARALLEL_MIN_UNITS: usize = 4_096;

/// Rows per rayon task: at least one, enough to amortize scheduling.
#[inline]
fn rows_per_task(row_len: usize) -> usize {
    const TARGET_UNITS_PER_TASK: usize = 8_192;
    (TARGET_UNITS_PER_TASK / row_len.max(1)).max(1)
}

/// Apply `f(row, row_slice)` to the first `rows` rows of `out`.
///
/// Rows past the end of `out` do not exist and are skipped.
fn dispatch_rows<T, F>(out: &mut [T], row_len: usize, rows: usize, f: F)
where
    T: Send,
    F: Fn(usize, &mut [T]) + Sync + Send,
{
    if row_len == 0 || rows == 0 {
        return;
    }
    let rows = rows.min(out.len() / row_len);
    let out = &mut out[..rows * row_len];

    if rows * row_len < PARALLEL_MIN_UNITS || rayon::current_num_threads() <= 1 {
        for (y, row) in out.chunks_exact_mut(row_len).enumerate() {
            f(y, row);
        }
        return;
    }

    let block = rows_per_task(row_len);
    out.par_chunks_mut(block * row_len)
        .enumerate()
        .for_each(|(block_idx, chunk)| {
            let base = block_idx * block;
            for (offset, row) in chunk.chunks_exact_mut(row_len).enumerate() {
                f(base + offset, row);
            }
        });
}

/// Fill every word of `grid` with its seeded generation-0 bits.
///
/// Index space: `x` over `[0, width_in_uints)`, `y` over the rows present in
/// `grid`. Prior contents are overwritten, never read.
pub fn initialize(grid: &mut [u32], seed: u32, width_in_uints: usize) {
    let rows = grid.len() / width_in_uints.max(1);
    dispatch_rows(grid, width_in_uints, rows, |y, row| {
        for (x, word) in row.iter_mut().enumerate() {
            *word = pcg::seeded_word(x as u32, y as u32, seed);
        }
    });
}

/// Compute the next generation of `current` into `next`.
///
/// `current` and `next` must have the same shape. Rows and word columns wrap
/// around the torus.
pub fn step(
    current: &[u32],
    next: &mut [u32],
    grid_size: usize,
    width_in_uints: usize,
    backend: KernelBackend,
) {
    debug_assert_eq!(current.len(), next.len());
    if grid_size == 0 || width_in_uints == 0 {
        return;
    }

    dispatch_rows(next, width_in_uints, grid_size, |y, out| {
        let up = word_row(current, kernel::wrap_prev(y, grid_size), width_in_uints);
        let mid = word_row(current, y, width_in_uints);
        let down = word_row(current, kernel::wrap_next(y, grid_size), width_in_uints);
        kernel::advance_row(up, mid, down, out, backend);
    });
}

#[inline(always)]
fn word_row(words: &[u32], y: usize, width_in_uints: usize) -> &[u32] {
    &words[y * width_in_uints..][..width_in_uints]
}

/// Unpack the window starting at `(x_offset, y_offset)` into one byte per
/// cell, `255` alive and `0` dead.
///
/// Index space: `x` over `[0, width)`, `y` over the rows of `output`
/// (`output.len() / width`). Pixels whose grid coordinate falls past the
/// grid edge are not written; the window does not wrap.
pub fn render(
    grid: &[u32],
    output: &mut [u8],
    grid_size: usize,
    width_in_uints: usize,
    x_offset: usize,
    y_offset: usize,
    width: usize,
) {
    let height = output.len() / width.max(1);
    dispatch_rows(output, width, height, |y, row| {
        let Some(gy) = y.checked_add(y_offset) else {
            return;
        };
        for (x, pixel) in row.iter_mut().enumerate() {
            let pixel_value = x
                .checked_add(x_offset)
                .and_then(|gx| render_pixel(grid, grid_size, width_in_uints, gx, gy));
            if let Some(value) = pixel_value {
                *pixel = value;
            }
        }
    });
}

/// The pixel for grid cell `(gx, gy)`, or `None` past the grid edge.
#[inline(always)]
pub fn render_pixel(
    grid: &[u32],
    grid_size: usize,
    width_in_uints: usize,
    gx: usize,
    gy: usize,
) -> Option<u8> {
    if gx >= grid_size || gy >= grid_size {
        return None;
    }
    let word = grid[gy * width_in_uints + gx / WORD_BITS];
    let bit = (word >> (gx % WORD_BITS)) & 1;
    Some(if bit != 0 { ALIVE_PIXEL } else { DEAD_PIXEL })
}
