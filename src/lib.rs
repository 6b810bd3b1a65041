//! Bit-packed toroidal Conway's Game of Life (B3/S23).
//!
//! Cells are packed 32 to a `u32` word; a generation is computed one word
//! at a time with a lane-wise full-adder neighbor count.

pub mod packedlife;
pub use packedlife::{KernelBackend, LifeError, PackedGrid, PackedLife, PackedLifeConfig};
