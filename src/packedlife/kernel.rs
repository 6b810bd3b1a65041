//! Word-parallel generation kernel for PackedLife.
//!
//! Each packed word is advanced from its 3x3 word neighborhood: the eight
//! neighbor bit-planes are summed lane-wise into a 3-bit ripple counter and
//! the B3/S23 rule is read off the counter bits. A count of 8 wraps to 0,
//! which the rule treats as dead, same as the true count.

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KernelBackend {
    Scalar,
    Avx2,
}

/// Lane-wise 3-bit neighbor counter: `ones | twos << 1 | fours << 2`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct NeighborCount {
    pub ones: u32,
    pub twos: u32,
    pub fours: u32,
}

impl NeighborCount {
    /// Ripple-carry add one neighbor plane. The carry out of `fours` is dropped.
    #[inline(always)]
    pub fn add(self, plane: u32) -> Self {
        let carry_ones = self.ones & plane;
        let carry_twos = self.twos & carry_ones;
        Self {
            ones: self.ones ^ plane,
            twos: self.twos ^ carry_ones,
            fours: self.fours ^ carry_twos,
        }
    }

    #[inline(always)]
    pub fn exactly_two(self) -> u32 {
        !self.fours & self.twos & !self.ones
    }

    #[inline(always)]
    pub fn exactly_three(self) -> u32 {
        !self.fours & self.twos & self.ones
    }
}

/// The 3x3 block of packed words centered on the word being advanced.
/// Each row is `[left, center, right]`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Neighborhood {
    pub up: [u32; 3],
    pub mid: [u32; 3],
    pub down: [u32; 3],
}

#[inline(always)]
pub fn west_neighbor_plane(center: u32, left: u32) -> u32 {
    (center << 1) | (left >> 31)
}

#[inline(always)]
pub fn east_neighbor_plane(center: u32, right: u32) -> u32 {
    (center >> 1) | (right << 31)
}

#[inline(always)]
pub fn wrap_prev(i: usize, len: usize) -> usize {
    if i == 0 { len - 1 } else { i - 1 }
}

#[inline(always)]
pub fn wrap_next(i: usize, len: usize) -> usize {
    if i == len - 1 { 0 } else { i + 1 }
}

impl Neighborhood {
    /// Fetch the toroidally wrapped neighborhood of `(word_col, row)`.
    #[inline(always)]
    pub fn gather(
        current: &[u32],
        grid_size: usize,
        width_in_uints: usize,
        word_col: usize,
        row: usize,
    ) -> Self {
        let y_up = wrap_prev(row, grid_size);
        let y_down = wrap_next(row, grid_size);
        let x_left = wrap_prev(word_col, width_in_uints);
        let x_right = wrap_next(word_col, width_in_uints);

        let fetch = |y: usize| {
            let base = y * width_in_uints;
            [
                current[base + x_left],
                current[base + word_col],
                current[base + x_right],
            ]
        };

        Self {
            up: fetch(y_up),
            mid: fetch(row),
            down: fetch(y_down),
        }
    }

    /// The eight neighbor planes in accumulation order:
    /// NW, N, NE, W, E, SW, S, SE.
    #[inline(always)]
    pub fn planes(&self) -> [u32; 8] {
        let [ul, uc, ur] = self.up;
        let [ml, mc, mr] = self.mid;
        let [dl, dc, dr] = self.down;
        [
            west_neighbor_plane(uc, ul),
            uc,
            east_neighbor_plane(uc, ur),
            west_neighbor_plane(mc, ml),
            east_neighbor_plane(mc, mr),
            west_neighbor_plane(dc, dl),
            dc,
            east_neighbor_plane(dc, dr),
        ]
    }
}

#[inline(always)]
pub fn count_neighbors(planes: [u32; 8]) -> NeighborCount {
    let mut count = NeighborCount::default();
    for plane in planes {
        count = count.add(plane);
    }
    count
}

/// Birth on exactly three, survival on two or three.
#[inline(always)]
pub fn apply_rule(count: NeighborCount, center: u32) -> u32 {
    count.exactly_three() | (count.exactly_two() & center)
}

#[inline(always)]
pub fn advance_word(neighborhood: &Neighborhood) -> u32 {
    let count = count_neighbors(neighborhood.planes());
    apply_rule(count, neighborhood.mid[1])
}

/// Next-generation word at `(word_col, row)`, or `None` outside the grid.
#[inline]
pub fn step_word(
    current: &[u32],
    grid_size: usize,
    width_in_uints: usize,
    word_col: usize,
    row: usize,
) -> Option<u32> {
    if word_col >= width_in_uints || row >= grid_size {
        return None;
    }
    let neighborhood = Neighborhood::gather(current, grid_size, width_in_uints, word_col, row);
    Some(advance_word(&neighborhood))
}

/// Advance one row of words given its wrapped neighbor rows.
#[inline]
pub fn advance_row_scalar(up: &[u32], mid: &[u32], down: &[u32], out: &mut [u32]) {
    let width = mid.len();
    debug_assert_eq!(up.len(), width);
    debug_assert_eq!(down.len(), width);
    debug_assert_eq!(out.len(), width);

    for (x, slot) in out.iter_mut().enumerate() {
        advance_column_scalar(up, mid, down, x, slot);
    }
}

#[inline(always)]
fn advance_column_scalar(up: &[u32], mid: &[u32], down: &[u32], x: usize, slot: &mut u32) {
    let width = mid.len();
    let xl = wrap_prev(x, width);
    let xr = wrap_next(x, width);
    *slot = advance_word(&Neighborhood {
        up: [up[xl], up[x], up[xr]],
        mid: [mid[xl], mid[x], mid[xr]],
        down: [down[xl], down[x], down[xr]],
    });
}

// ── AVX2 kernel ─────────────────────────────────────────────────────────

#[cfg(target_arch = "x86_64")]
const AVX2_LANES: usize = 8;

#[cfg(target_arch = "x86_64")]
#[inline(always)]
unsafe fn avx2_ripple_add(
    ones: &mut std::arch::x86_64::__m256i,
    twos: &mut std::arch::x86_64::__m256i,
    fours: &mut std::arch::x86_64::__m256i,
    plane: std::arch::x86_64::__m256i,
) {
    use std::arch::x86_64::{_mm256_and_si256, _mm256_xor_si256};
    unsafe {
        let carry_ones = _mm256_and_si256(*ones, plane);
        let carry_twos = _mm256_and_si256(*twos, carry_ones);
        *ones = _mm256_xor_si256(*ones, plane);
        *twos = _mm256_xor_si256(*twos, carry_ones);
        *fours = _mm256_xor_si256(*fours, carry_twos);
    }
}

/// AVX2 row kernel: 8 packed words per iteration.
///
/// Interior words whose left and right neighbors are contiguous in memory
/// go through 256-bit lanes; the wrapped first word and the ragged tail use
/// the scalar path.
///
/// # Safety
/// The CPU must support AVX2.
#[cfg(target_arch = "x86_64")]
#[target_feature(enable = "avx2")]
pub unsafe fn advance_row_avx2(up: &[u32], mid: &[u32], down: &[u32], out: &mut [u32]) {
    use std::arch::x86_64::{
        __m256i, _mm256_and_si256, _mm256_andnot_si256, _mm256_loadu_si256, _mm256_or_si256,
        _mm256_setzero_si256, _mm256_slli_epi32, _mm256_srli_epi32, _mm256_storeu_si256,
    };

    let width = mid.len();
    debug_assert_eq!(up.len(), width);
    debug_assert_eq!(down.len(), width);
    debug_assert_eq!(out.len(), width);

    if width < AVX2_LANES + 2 {
        advance_row_scalar(up, mid, down, out);
        return;
    }

    advance_column_scalar(up, mid, down, 0, &mut out[0]);

    // Vector block [x, x + 8) reads words x - 1 ..= x + 8, all in range.
    let mut x = 1;
    while x + AVX2_LANES < width {
        let mut ones = _mm256_setzero_si256();
        let mut twos = _mm256_setzero_si256();
        let mut fours = _mm256_setzero_si256();
        let mut mid_center = _mm256_setzero_si256();

        for (row_idx, row) in [up, mid, down].into_iter().enumerate() {
            let ptr = row.as_ptr();
            let (left, center, right) = unsafe {
                (
                    _mm256_loadu_si256(ptr.add(x - 1) as *const __m256i),
                    _mm256_loadu_si256(ptr.add(x) as *const __m256i),
                    _mm256_loadu_si256(ptr.add(x + 1) as *const __m256i),
                )
            };
            let west = _mm256_or_si256(_mm256_slli_epi32(center, 1), _mm256_srli_epi32(left, 31));
            let east = _mm256_or_si256(_mm256_srli_epi32(center, 1), _mm256_slli_epi32(right, 31));

            unsafe {
                avx2_ripple_add(&mut ones, &mut twos, &mut fours, west);
                if row_idx == 1 {
                    mid_center = center;
                } else {
                    avx2_ripple_add(&mut ones, &mut twos, &mut fours, center);
                }
                avx2_ripple_add(&mut ones, &mut twos, &mut fours, east);
            }
        }

        // (!fours & twos) & (ones | (!ones & center))
        let two_or_three = _mm256_andnot_si256(fours, twos);
        let three = _mm256_and_si256(two_or_three, ones);
        let two = _mm256_andnot_si256(ones, two_or_three);
        let next = _mm256_or_si256(three, _mm256_and_si256(two, mid_center));

        unsafe {
            _mm256_storeu_si256(out.as_mut_ptr().add(x) as *mut __m256i, next);
        }
        x += AVX2_LANES;
    }

    while x < width {
        advance_column_scalar(up, mid, down, x, &mut out[x]);
        x += 1;
    }
}

/// Advance one row with the selected backend.
#[inline]
pub fn advance_row(up: &[u32], mid: &[u32], down: &[u32], out: &mut [u32], backend: KernelBackend) {
    match backend {
        KernelBackend::Scalar => advance_row_scalar(up, mid, down, out),
        KernelBackend::Avx2 => {
            #[cfg(target_arch = "x86_64")]
            {
                unsafe { advance_row_avx2(up, mid, down, out) }
            }
            #[cfg(not(target_arch = "x86_64"))]
            {
                advance_row_scalar(up, mid, down, out)
            }
        }
    }
}

#[inline]
pub fn avx2_available() -> bool {
    #[cfg(target_arch = "x86_64")]
    {
        std::is_x86_feature_detected!("avx2")
    }
    #[cfg(not(target_arch = "x86_64"))]
    {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::{
        NeighborCount, Neighborhood, advance_row_scalar, advance_word, apply_rule,
        count_neighbors, east_neighbor_plane, step_word, west_neighbor_plane,
    };

    #[cfg(target_arch = "x86_64")]
    use super::advance_row_avx2;

    use rand::RngCore;
    use rand::SeedableRng;

    /// Broadcast lane bit `bit` of each of 8 neighbor flags into full planes.
    fn planes_from_bits(bits: u8) -> [u32; 8] {
        let mut planes = [0u32; 8];
        for (i, plane) in planes.iter_mut().enumerate() {
            if (bits >> i) & 1 != 0 {
                *plane = u32::MAX;
            }
        }
        planes
    }

    #[test]
    fn ripple_counter_matches_popcount_mod_8() {
        for bits in 0u16..=255 {
            let bits = bits as u8;
            let count = count_neighbors(planes_from_bits(bits));
            let expected = bits.count_ones() % 8;
            for (plane, bit) in [(count.ones, 0), (count.twos, 1), (count.fours, 2)] {
                let want = if (expected >> bit) & 1 != 0 { u32::MAX } else { 0 };
                assert_eq!(plane, want, "bits {bits:08b} counter bit {bit}");
            }
        }
    }

    #[test]
    fn ripple_counter_lanes_are_independent() {
        // Lane i sees i live neighbors in the first i planes (i <= 8).
        let mut planes = [0u32; 8];
        for lane in 0..=8u32 {
            for plane in planes.iter_mut().take(lane as usize) {
                *plane |= 1 << lane;
            }
        }
        let count = count_neighbors(planes);
        for lane in 0..=8u32 {
            let got = ((count.ones >> lane) & 1)
                | (((count.twos >> lane) & 1) << 1)
                | (((count.fours >> lane) & 1) << 2);
            assert_eq!(got, lane % 8, "lane {lane}");
        }
    }

    #[test]
    fn rule_table_matches_b3_s23() {
        for neighbors in 0u32..=8 {
            let planes = planes_from_bits(((1u16 << neighbors) - 1) as u8);
            let count = count_neighbors(planes);
            let dead_next = apply_rule(count, 0);
            let alive_next = apply_rule(count, u32::MAX);
            let born = neighbors == 3;
            let survives = neighbors == 2 || neighbors == 3;
            assert_eq!(dead_next == u32::MAX, born, "dead cell, {neighbors} neighbors");
            assert_eq!(dead_next == 0, !born);
            assert_eq!(alive_next == u32::MAX, survives, "live cell, {neighbors} neighbors");
            assert_eq!(alive_next == 0, !survives);
        }
    }

    #[test]
    fn eight_neighbors_wrap_to_zero_and_die() {
        let count = count_neighbors([u32::MAX; 8]);
        assert_eq!(count, NeighborCount::default());
        assert_eq!(apply_rule(count, u32::MAX), 0);
    }

    #[test]
    fn neighbor_planes_borrow_across_word_boundary() {
        assert_eq!(west_neighbor_plane(0, 0x8000_0000), 1);
        assert_eq!(west_neighbor_plane(1, 0), 2);
        assert_eq!(east_neighbor_plane(0, 1), 0x8000_0000);
        assert_eq!(east_neighbor_plane(2, 0), 1);
    }

    #[test]
    fn all_alive_neighborhood_dies() {
        let hood = Neighborhood {
            up: [u32::MAX; 3],
            mid: [u32::MAX; 3],
            down: [u32::MAX; 3],
        };
        assert_eq!(advance_word(&hood), 0);
    }

    #[test]
    fn step_word_guards_out_of_range() {
        let current = vec![0u32; 64 * 2];
        assert_eq!(step_word(&current, 64, 2, 2, 0), None);
        assert_eq!(step_word(&current, 64, 2, 0, 64), None);
        assert_eq!(step_word(&current, 64, 2, 1, 63), Some(0));
    }

    #[test]
    fn bit_31_feeds_bit_0_of_next_word() {
        // Vertical triple at the last column of word 0: rows 0..=2, bit 31.
        // Its middle cell is a neighbor of bit 0 in word 1, rows 0..=2.
        let grid_size = 64;
        let width = 2;
        let mut current = vec![0u32; grid_size * width];
        for row in 10..=12 {
            current[row * width] = 1 << 31;
        }
        // Row 11, word 1, bit 0 sees three live west neighbors: born.
        let word = step_word(&current, grid_size, width, 1, 11).unwrap();
        assert_eq!(word & 1, 1);
        // Row 10, word 1, bit 0 sees two: stays dead.
        let word = step_word(&current, grid_size, width, 1, 10).unwrap();
        assert_eq!(word & 1, 0);
    }

    #[test]
    fn last_word_wraps_into_first_word() {
        let grid_size = 64;
        let width = 2;
        let mut current = vec![0u32; grid_size * width];
        for row in 20..=22 {
            current[row * width + (width - 1)] = 1 << 31;
        }
        let word = step_word(&current, grid_size, width, 0, 21).unwrap();
        assert_eq!(word & 1, 1);
    }

    #[test]
    fn scalar_row_matches_step_word() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(0x0DDB_A11C_0FFE_E123);
        let grid_size = 96;
        let width = 3;
        let current: Vec<u32> = (0..grid_size * width).map(|_| rng.next_u32()).collect();
        for row in [0, 1, 47, 95] {
            let up = &current[((row + grid_size - 1) % grid_size) * width..][..width];
            let mid = &current[row * width..][..width];
            let down = &current[((row + 1) % grid_size) * width..][..width];
            let mut out = vec![0u32; width];
            advance_row_scalar(up, mid, down, &mut out);
            for (x, &got) in out.iter().enumerate() {
                assert_eq!(Some(got), step_word(&current, grid_size, width, x, row));
            }
        }
    }

    #[test]
    fn avx2_matches_scalar_randomized() {
        #[cfg(target_arch = "x86_64")]
        {
            if !std::is_x86_feature_detected!("avx2") {
                return;
            }

            let mut rng = rand::rngs::StdRng::seed_from_u64(0xA55A_F00D_1122_3344);
            for width in [1usize, 2, 9, 10, 11, 17, 18, 32, 33, 64] {
                for _ in 0..64 {
                    let mut row = || (0..width).map(|_| rng.next_u32()).collect::<Vec<u32>>();
                    let (up, mid, down) = (row(), row(), row());
                    let mut scalar = vec![0u32; width];
                    let mut avx = vec![0u32; width];
                    advance_row_scalar(&up, &mid, &down, &mut scalar);
                    unsafe { advance_row_avx2(&up, &mid, &down, &mut avx) };
                    assert_eq!(scalar, avx, "width {width}");
                }
            }
        }
    }
}
