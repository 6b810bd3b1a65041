use std::sync::OnceLock;

use rayon::prelude::*;

use super::dispatch;
use super::error::{LifeError, Result};
use super::grid::{GridDims, PackedGrid, Window};
use super::kernel::{self, KernelBackend};

/// Green-on-black RGBA for live cells.
pub const RGBA_ALIVE: [u8; 4] = [0, 255, 0, 255];
pub const RGBA_DEAD: [u8; 4] = [0, 0, 0, 255];

#[inline]
fn physical_core_count() -> usize {
    static PHYSICAL_CORES: OnceLock<usize> = OnceLock::new();
    *PHYSICAL_CORES.get_or_init(|| num_cpus::get_physical().max(1))
}

/// The stepper streams two whole grids per generation; past eight cores
/// extra threads mostly wait on memory.
#[inline]
fn auto_pool_thread_count_for_physical(physical: usize) -> usize {
    let physical = physical.max(1);
    if physical <= 8 {
        physical
    } else {
        physical.div_ceil(2).max(8)
    }
}

/// Resolve the thread count from a config, falling back to auto-detect.
fn resolve_thread_count(config: &PackedLifeConfig) -> usize {
    let mut threads = config
        .thread_count
        .unwrap_or_else(|| auto_pool_thread_count_for_physical(physical_core_count()));
    if let Some(cap) = config.max_threads {
        threads = threads.min(cap);
    }
    threads.max(1)
}

fn parse_auto_kernel_flag(value: Option<&str>) -> Option<bool> {
    let v = value?.trim();
    if v.is_empty() {
        None
    } else if v == "1" || v.eq_ignore_ascii_case("true") {
        Some(true)
    } else if v == "0" || v.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}

#[inline]
fn detect_kernel_backend() -> KernelBackend {
    let auto_enabled =
        parse_auto_kernel_flag(std::env::var("PACKEDLIFE_AUTO_KERNEL").ok().as_deref())
            .unwrap_or(true);

    if auto_enabled && kernel::avx2_available() {
        KernelBackend::Avx2
    } else {
        KernelBackend::Scalar
    }
}

/// Resolve the kernel backend from a config, falling back to default policy.
fn resolve_kernel_backend(config: &PackedLifeConfig) -> KernelBackend {
    match config.kernel {
        Some(KernelBackend::Avx2) if kernel::avx2_available() => KernelBackend::Avx2,
        Some(KernelBackend::Avx2) => {
            tracing::warn!("AVX2 kernel requested but unsupported; using scalar");
            KernelBackend::Scalar
        }
        Some(backend) => backend,
        None => detect_kernel_backend(),
    }
}

/// Configuration for a PackedLife engine instance.
///
/// Use `PackedLifeConfig::default()` for auto-tuned defaults, or customise
/// individual knobs via the builder methods.
#[derive(Clone, Debug, Default)]
pub struct PackedLifeConfig {
    /// Number of threads for the compute pool.
    /// `None` means auto-detect (physical cores, memory-bandwidth capped).
    pub thread_count: Option<usize>,
    /// Hard upper bound on threads regardless of auto-detection.
    pub max_threads: Option<usize>,
    /// Kernel backend selection.
    /// `None` means AVX2 when the CPU reports it, scalar otherwise.
    /// Set `PACKEDLIFE_AUTO_KERNEL=0` to force the scalar default.
    pub kernel: Option<KernelBackend>,
}

impl PackedLifeConfig {
    /// Set an explicit thread count for the compute pool.
    pub fn thread_count(mut self, n: usize) -> Self {
        self.thread_count = Some(n.max(1));
        self
    }

    /// Set a hard upper bound on threads.
    pub fn max_threads(mut self, n: usize) -> Self {
        self.max_threads = Some(n.max(1));
        self
    }

    /// Force a specific kernel backend.
    pub fn kernel(mut self, backend: KernelBackend) -> Self {
        self.kernel = Some(backend);
        self
    }
}

/// Host-side driver: owns the generation pair and the compute pool.
///
/// `current` is only read while `next` is written; the two swap roles after
/// every completed generation.
pub struct PackedLife {
    current: PackedGrid,
    next: PackedGrid,
    generation: u64,
    pool: rayon::ThreadPool,
    backend: KernelBackend,
}

impl PackedLife {
    /// An all-dead torus with default configuration.
    pub fn new(grid_size: usize) -> Result<Self> {
        Self::with_config(grid_size, PackedLifeConfig::default())
    }

    /// Create a PackedLife engine with explicit configuration.
    pub fn with_config(grid_size: usize, config: PackedLifeConfig) -> Result<Self> {
        let dims = GridDims::new(grid_size).inspect_err(|err| {
            tracing::debug!(%err, "rejected grid dimensions");
        })?;
        let threads = resolve_thread_count(&config);
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("packed-life-{i}"))
            .build()?;
        let backend = resolve_kernel_backend(&config);

        let engine = Self {
            current: PackedGrid::new(dims),
            next: PackedGrid::new(dims),
            generation: 0,
            pool,
            backend,
        };
        tracing::debug!(
            grid_size,
            width_in_uints = dims.width_in_uints(),
            threads,
            ?backend,
            memory_mb = engine.memory_bytes() as f64 / 1e6,
            "packed life engine ready"
        );
        Ok(engine)
    }

    /// Wrap an existing generation-0 word buffer.
    pub fn from_words(
        grid_size: usize,
        words: Vec<u32>,
        config: PackedLifeConfig,
    ) -> Result<Self> {
        let mut engine = Self::with_config(grid_size, config)?;
        engine.current = PackedGrid::from_words(engine.dims(), words)?;
        Ok(engine)
    }

    #[inline]
    pub fn dims(&self) -> GridDims {
        self.current.dims()
    }

    #[inline]
    pub fn grid_size(&self) -> usize {
        self.dims().grid_size()
    }

    #[inline]
    pub fn backend(&self) -> KernelBackend {
        self.backend
    }

    #[inline]
    pub fn thread_count(&self) -> usize {
        self.pool.current_num_threads()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// The current generation's packed words.
    pub fn words(&self) -> &[u32] {
        self.current.as_words()
    }

    /// Bytes held by the generation pair.
    pub fn memory_bytes(&self) -> usize {
        2 * self.dims().total_words() * std::mem::size_of::<u32>()
    }

    /// Replace the current generation with `words`; resets the generation count.
    pub fn load_words(&mut self, words: &[u32]) -> Result<()> {
        let expected = self.dims().total_words();
        if words.len() != expected {
            return Err(LifeError::BufferLength {
                expected,
                actual: words.len(),
            });
        }
        self.current.as_words_mut().copy_from_slice(words);
        self.generation = 0;
        Ok(())
    }

    /// Fill the grid with the seeded generation 0.
    pub fn randomize(&mut self, seed: u32) {
        let width = self.dims().width_in_uints();
        let grid = self.current.as_words_mut();
        self.pool.install(|| dispatch::initialize(grid, seed, width));
        self.generation = 0;
        tracing::debug!(seed, "randomized grid");
    }

    pub fn clear(&mut self) {
        self.current.clear();
        self.generation = 0;
    }

    pub fn step(&mut self) {
        self.step_n(1);
    }

    pub fn step_n(&mut self, n: u64) {
        let Self {
            current,
            next,
            generation,
            pool,
            backend,
        } = self;
        let backend = *backend;
        pool.install(|| {
            for _ in 0..n {
                advance_generation(current, next, backend);
                std::mem::swap(current, next);
                *generation += 1;
            }
        });
    }

    pub fn get_cell(&self, x: usize, y: usize) -> bool {
        self.current.get(x, y)
    }

    pub fn set_cell(&mut self, x: usize, y: usize, alive: bool) {
        self.current.set(x, y, alive);
    }

    /// Flip a cell; `None` when `(x, y)` is outside the grid.
    pub fn toggle_cell(&mut self, x: usize, y: usize) -> Option<bool> {
        self.current.toggle(x, y)
    }

    pub fn set_cells_alive<I>(&mut self, cells: I)
    where
        I: IntoIterator<Item = (usize, usize)>,
    {
        for (x, y) in cells {
            self.current.set(x, y, true);
        }
    }

    pub fn population(&self) -> u64 {
        let words = self.current.as_words();
        self.pool.install(|| {
            words
                .par_chunks(4_096)
                .map(|chunk| chunk.iter().map(|w| w.count_ones() as u64).sum::<u64>())
                .sum()
        })
    }

    pub fn is_empty(&self) -> bool {
        self.current.as_words().iter().all(|&w| w == 0)
    }

    pub fn for_each_live<F: FnMut(usize, usize)>(&self, f: F) {
        self.current.for_each_live(f);
    }

    /// Render `window` into a caller-owned buffer of `window.pixel_count()`
    /// bytes. Pixels past the grid edge keep their previous contents.
    pub fn render_into(&self, window: Window, output: &mut [u8]) -> Result<()> {
        let dims = self.dims();
        let expected = self.check_window(window)?;
        if output.len() < expected {
            return Err(LifeError::OutputLength {
                expected,
                actual: output.len(),
            });
        }
        let words = self.current.as_words();
        let output = &mut output[..expected];
        self.pool.install(|| {
            dispatch::render(
                words,
                output,
                dims.grid_size(),
                dims.width_in_uints(),
                window.x_offset,
                window.y_offset,
                window.width,
            )
        });
        Ok(())
    }

    /// Render `[x_start, x_end) x [y_start, y_end)` into a fresh zeroed buffer.
    pub fn render_region(
        &self,
        x_start: usize,
        y_start: usize,
        x_end: usize,
        y_end: usize,
    ) -> Result<Vec<u8>> {
        let window = Window::from_bounds(x_start, y_start, x_end, y_end);
        let pixels = self.check_window(window)?;
        let mut output = Vec::new();
        output
            .try_reserve_exact(pixels)
            .map_err(|_| LifeError::WindowTooLarge {
                width: window.width,
                height: window.height,
            })?;
        output.resize(pixels, dispatch::DEAD_PIXEL);
        self.render_into(window, &mut output)?;
        Ok(output)
    }

    /// Like `render_region`, expanded to RGBA with live cells green.
    pub fn render_rgba(
        &self,
        x_start: usize,
        y_start: usize,
        x_end: usize,
        y_end: usize,
    ) -> Result<Vec<u8>> {
        let gray = self.render_region(x_start, y_start, x_end, y_end)?;
        Ok(gray_to_rgba(&gray))
    }

    /// Validates `window` and returns its pixel count.
    fn check_window(&self, window: Window) -> Result<usize> {
        let grid_size = self.grid_size();
        let pixels = window.pixel_count()?;
        if pixels > 0 && !self.dims().contains(window.x_offset, window.y_offset) {
            tracing::debug!(?window, grid_size, "render window starts outside grid");
            return Err(LifeError::WindowOutOfRange {
                x_offset: window.x_offset,
                y_offset: window.y_offset,
                grid_size,
            });
        }
        Ok(pixels)
    }
}

/// Write the successor of `current` into `next`. Must complete before the
/// buffers swap roles.
fn advance_generation(current: &PackedGrid, next: &mut PackedGrid, backend: KernelBackend) {
    let dims = current.dims();
    dispatch::step(
        current.as_words(),
        next.as_words_mut(),
        dims.grid_size(),
        dims.width_in_uints(),
        backend,
    );
}

/// Expand a 0/255 image into RGBA pixels.
pub fn gray_to_rgba(gray: &[u8]) -> Vec<u8> {
    let mut rgba = Vec::with_capacity(gray.len() * 4);
    for &value in gray {
        let pixel = if value == dispatch::ALIVE_PIXEL {
            RGBA_ALIVE
        } else {
            RGBA_DEAD
        };
        rgba.extend_from_slice(&pixel);
    }
    rgba
}
