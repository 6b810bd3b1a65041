//! Packed grid storage for PackedLife.
//!
//! A square torus of `grid_size` cells per side, stored row-major as `u32`
//! words. Bit `b` of the word at `(row, word_col)` is the cell at absolute
//! column `word_col * 32 + b`; bit 0 is the leftmost cell of the word.

use super::error::{LifeError, Result};

pub const WORD_BITS: usize = 32;

/// Side length and row stride of a packed torus.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct GridDims {
    grid_size: usize,
    width_in_uints: usize,
}

impl GridDims {
    pub fn new(grid_size: usize) -> Result<Self> {
        if grid_size == 0 || grid_size % WORD_BITS != 0 {
            return Err(LifeError::GridSizeNotAligned { grid_size });
        }
        Ok(Self {
            grid_size,
            width_in_uints: grid_size / WORD_BITS,
        })
    }

    #[inline]
    pub fn grid_size(self) -> usize {
        self.grid_size
    }

    /// Packed words per row.
    #[inline]
    pub fn width_in_uints(self) -> usize {
        self.width_in_uints
    }

    #[inline]
    pub fn total_words(self) -> usize {
        self.grid_size * self.width_in_uints
    }

    /// Linear offset of `(row, word_col)`.
    #[inline(always)]
    pub fn word_index(self, row: usize, word_col: usize) -> usize {
        row * self.width_in_uints + word_col
    }

    #[inline]
    pub fn contains(self, x: usize, y: usize) -> bool {
        x < self.grid_size && y < self.grid_size
    }
}

/// A rectangular view onto the grid, in cells.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Window {
    pub x_offset: usize,
    pub y_offset: usize,
    pub width: usize,
    pub height: usize,
}

impl Window {
    pub fn new(x_offset: usize, y_offset: usize, width: usize, height: usize) -> Self {
        Self {
            x_offset,
            y_offset,
            width,
            height,
        }
    }

    /// Window spanning `[x_start, x_end) x [y_start, y_end)`.
    /// Inverted bounds yield an empty window.
    pub fn from_bounds(x_start: usize, y_start: usize, x_end: usize, y_end: usize) -> Self {
        Self::new(
            x_start,
            y_start,
            x_end.saturating_sub(x_start),
            y_end.saturating_sub(y_start),
        )
    }

    /// One byte per cell of the window; fails when the area overflows.
    #[inline]
    pub fn pixel_count(self) -> Result<usize> {
        self.width
            .checked_mul(self.height)
            .ok_or(LifeError::WindowTooLarge {
                width: self.width,
                height: self.height,
            })
    }
}

/// One generation of packed cells.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PackedGrid {
    dims: GridDims,
    words: Vec<u32>,
}

impl PackedGrid {
    /// An all-dead grid.
    pub fn new(dims: GridDims) -> Self {
        Self {
            dims,
            words: vec![0; dims.total_words()],
        }
    }

    pub fn from_words(dims: GridDims, words: Vec<u32>) -> Result<Self> {
        if words.len() != dims.total_words() {
            return Err(LifeError::BufferLength {
                expected: dims.total_words(),
                actual: words.len(),
            });
        }
        Ok(Self { dims, words })
    }

    #[inline]
    pub fn dims(&self) -> GridDims {
        self.dims
    }

    #[inline]
    pub fn as_words(&self) -> &[u32] {
        &self.words
    }

    #[inline]
    pub fn as_words_mut(&mut self) -> &mut [u32] {
        &mut self.words
    }

    #[inline(always)]
    fn locate(&self, x: usize, y: usize) -> (usize, u32) {
        (
            self.dims.word_index(y, x / WORD_BITS),
            1u32 << (x % WORD_BITS),
        )
    }

    /// Cell state at absolute `(x, y)`; out-of-range reads are dead.
    pub fn get(&self, x: usize, y: usize) -> bool {
        if !self.dims.contains(x, y) {
            return false;
        }
        let (idx, mask) = self.locate(x, y);
        self.words[idx] & mask != 0
    }

    /// Set the cell at `(x, y)`; out-of-range writes are ignored.
    pub fn set(&mut self, x: usize, y: usize, alive: bool) {
        if !self.dims.contains(x, y) {
            return;
        }
        let (idx, mask) = self.locate(x, y);
        if alive {
            self.words[idx] |= mask;
        } else {
            self.words[idx] &= !mask;
        }
    }

    /// Flip the cell at `(x, y)` and return its new state.
    pub fn toggle(&mut self, x: usize, y: usize) -> Option<bool> {
        if !self.dims.contains(x, y) {
            return None;
        }
        let (idx, mask) = self.locate(x, y);
        self.words[idx] ^= mask;
        Some(self.words[idx] & mask != 0)
    }

    pub fn clear(&mut self) {
        self.words.fill(0);
    }

    pub fn population(&self) -> u64 {
        self.words.iter().map(|w| w.count_ones() as u64).sum()
    }

    /// Visit every live cell in row-major order.
    pub fn for_each_live<F: FnMut(usize, usize)>(&self, mut f: F) {
        let stride = self.dims.width_in_uints();
        for (row_index, row) in self.words.chunks_exact(stride).enumerate() {
            for (word_col, &word) in row.iter().enumerate() {
                let mut bits = word;
                while bits != 0 {
                    let bit = bits.trailing_zeros() as usize;
                    f(word_col * WORD_BITS + bit, row_index);
                    bits &= bits - 1;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{GridDims, PackedGrid, Window};
    use crate::packedlife::error::LifeError;

    #[test]
    fn dims_reject_unaligned_sizes() {
        assert!(matches!(
            GridDims::new(0),
            Err(LifeError::GridSizeNotAligned { grid_size: 0 })
        ));
        assert!(matches!(
            GridDims::new(33),
            Err(LifeError::GridSizeNotAligned { grid_size: 33 })
        ));
        let dims = GridDims::new(96).unwrap();
        assert_eq!(dims.width_in_uints(), 3);
        assert_eq!(dims.total_words(), 96 * 3);
    }

    #[test]
    fn word_index_is_row_major() {
        let dims = GridDims::new(64).unwrap();
        assert_eq!(dims.word_index(0, 0), 0);
        assert_eq!(dims.word_index(0, 1), 1);
        assert_eq!(dims.word_index(1, 0), 2);
        assert_eq!(dims.word_index(63, 1), 127);
    }

    #[test]
    fn bit_zero_is_leftmost_cell_of_word() {
        let dims = GridDims::new(64).unwrap();
        let mut grid = PackedGrid::new(dims);
        grid.set(0, 0, true);
        grid.set(31, 0, true);
        grid.set(32, 1, true);
        assert_eq!(grid.as_words()[0], 0x8000_0001);
        assert_eq!(grid.as_words()[dims.word_index(1, 1)], 1);
        assert!(grid.get(32, 1));
        assert!(!grid.get(33, 1));
    }

    #[test]
    fn out_of_range_access_is_ignored() {
        let dims = GridDims::new(32).unwrap();
        let mut grid = PackedGrid::new(dims);
        grid.set(32, 0, true);
        grid.set(0, 32, true);
        assert_eq!(grid.population(), 0);
        assert!(!grid.get(40, 40));
        assert_eq!(grid.toggle(32, 32), None);
    }

    #[test]
    fn toggle_flips_and_reports_state() {
        let dims = GridDims::new(32).unwrap();
        let mut grid = PackedGrid::new(dims);
        assert_eq!(grid.toggle(5, 6), Some(true));
        assert!(grid.get(5, 6));
        assert_eq!(grid.toggle(5, 6), Some(false));
        assert!(!grid.get(5, 6));
    }

    #[test]
    fn from_words_checks_length() {
        let dims = GridDims::new(32).unwrap();
        let err = PackedGrid::from_words(dims, vec![0; 31]).unwrap_err();
        assert!(matches!(
            err,
            LifeError::BufferLength {
                expected: 32,
                actual: 31
            }
        ));
    }

    #[test]
    fn for_each_live_reports_absolute_coordinates() {
        let dims = GridDims::new(64).unwrap();
        let mut grid = PackedGrid::new(dims);
        let cells = [(0, 0), (33, 0), (63, 5), (2, 63)];
        for &(x, y) in &cells {
            grid.set(x, y, true);
        }
        let mut seen = Vec::new();
        grid.for_each_live(|x, y| seen.push((x, y)));
        assert_eq!(seen, cells);
        assert_eq!(grid.population(), 4);
    }

    #[test]
    fn window_from_bounds_saturates() {
        assert_eq!(Window::from_bounds(4, 2, 10, 8), Window::new(4, 2, 6, 6));
        assert_eq!(Window::from_bounds(10, 8, 4, 2).pixel_count().unwrap(), 0);
    }

    #[test]
    fn window_area_overflow_is_an_error() {
        assert!(matches!(
            Window::new(0, 0, usize::MAX, 2).pixel_count(),
            Err(LifeError::WindowTooLarge {
                width: usize::MAX,
                height: 2
            })
        ));
        assert_eq!(Window::new(0, 0, usize::MAX, 1).pixel_count().unwrap(), usize::MAX);
    }
}
