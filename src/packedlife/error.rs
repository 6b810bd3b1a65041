//! Errors reported by the host-side driver.
//!
//! The per-unit kernels never fail; these cover the checks the driver makes
//! before it hands buffers to them.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum LifeError {
    /// The grid side must be a positive multiple of 32.
    #[error("grid size {grid_size} is not a positive multiple of 32")]
    GridSizeNotAligned { grid_size: usize },

    /// A caller-supplied word buffer does not match the grid shape.
    #[error("word buffer holds {actual} words, grid needs {expected}")]
    BufferLength { expected: usize, actual: usize },

    /// A render window must start inside the grid.
    #[error("render window origin ({x_offset}, {y_offset}) lies outside a {grid_size}x{grid_size} grid")]
    WindowOutOfRange {
        x_offset: usize,
        y_offset: usize,
        grid_size: usize,
    },

    /// `width * height` of a render window does not fit in memory.
    #[error("render window {width}x{height} is too large to allocate")]
    WindowTooLarge { width: usize, height: usize },

    /// Render output buffer too small for the requested window.
    #[error("render output holds {actual} bytes, window needs {expected}")]
    OutputLength { expected: usize, actual: usize },

    #[error("failed to build rayon thread pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

pub type Result<T> = std::result::Result<T, LifeError>;
