//! PackedLife engine internals and public API.

mod dispatch;
mod engine;
mod error;
mod grid;
mod kernel;
mod pcg;

pub use dispatch::{ALIVE_PIXEL, DEAD_PIXEL, initialize, render, render_pixel, step};
pub use engine::{PackedLife, PackedLifeConfig, RGBA_ALIVE, RGBA_DEAD, gray_to_rgba};
pub use error::{LifeError, Result};
pub use grid::{GridDims, PackedGrid, WORD_BITS, Window};
pub use kernel::{
    KernelBackend, NeighborCount, Neighborhood, advance_word, apply_rule, avx2_available,
    count_neighbors, east_neighbor_plane, step_word, west_neighbor_plane,
};
pub use pcg::{PcgStep, mix_state, pcg32, seeded_word};
