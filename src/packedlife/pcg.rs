//! Stateless PCG32 word generator used to seed generation 0.
//!
//! Every packed word derives its bits purely from `(word_col, row, seed)`;
//! there is no running RNG sequence shared between words.

const PCG_MULTIPLIER: u32 = 747_796_405;
const PCG_INCREMENT: u32 = 2_891_336_453;
const PCG_OUTPUT_MULTIPLIER: u32 = 277_803_737;

const ROW_MIX: u32 = 2_654_435_761;
const SEED_MIX: u32 = 0x9E37_79B9;

/// One PCG32 application: the permuted output and the advanced LCG state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PcgStep {
    pub output: u32,
    pub state: u32,
}

/// Advance `state` once and permute it into an output word.
///
/// The output transform reads the pre-advance state, so `output` depends
/// only on the input.
#[inline(always)]
pub fn pcg32(state: u32) -> PcgStep {
    let old = state;
    let advanced = old
        .wrapping_mul(PCG_MULTIPLIER)
        .wrapping_add(PCG_INCREMENT);
    let mut xorshifted = ((old >> ((old >> 28) + 4)) ^ old).wrapping_mul(PCG_OUTPUT_MULTIPLIER);
    xorshifted ^= xorshifted >> 22;
    PcgStep {
        output: xorshifted,
        state: advanced,
    }
}

/// Mix a word coordinate and the seed into an initial generator state.
#[inline(always)]
pub fn mix_state(word_col: u32, row: u32, seed: u32) -> u32 {
    let mut state = word_col;
    state ^= row.wrapping_mul(ROW_MIX);
    state ^= seed.wrapping_mul(SEED_MIX);
    state
}

/// The generation-0 word at `(word_col, row)` for `seed`.
///
/// Two chained applications: the first output becomes the second input.
#[inline(always)]
pub fn seeded_word(word_col: u32, row: u32, seed: u32) -> u32 {
    let first = pcg32(mix_state(word_col, row, seed)).output;
    pcg32(first).output
}
