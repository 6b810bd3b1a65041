#[cfg(feature = "mimalloc-global")]
#[global_allocator]
static GLOBAL_ALLOCATOR: mimalloc::MiMalloc = mimalloc::MiMalloc;

use std::time::{Duration, Instant};

use packed_life::packedlife::{KernelBackend, PackedLife, PackedLifeConfig, Result};
use tracing_subscriber::EnvFilter;

const DEFAULT_GRID_SIZE: usize = 16_384;
const DEFAULT_DURATION_SECS: f64 = 15.0;
const CONTROL_WIDTH: usize = 1920;
const CONTROL_HEIGHT: usize = 1080;

struct MainArgs {
    config: PackedLifeConfig,
    grid_size: usize,
    duration: Duration,
    generations: Option<u64>,
    seed: Option<u32>,
}

fn parse_args() -> MainArgs {
    let args: Vec<String> = std::env::args().collect();
    let mut config = PackedLifeConfig::default();
    let mut grid_size = DEFAULT_GRID_SIZE;
    let mut duration = Duration::from_secs_f64(DEFAULT_DURATION_SECS);
    let mut generations = None;
    let mut seed = None;
    let next_arg = |i: usize, flag: &str| -> &str {
        args.get(i)
            .map(String::as_str)
            .unwrap_or_else(|| panic!("{flag} requires a value"))
    };
    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--size" => {
                i += 1;
                grid_size = next_arg(i, "--size")
                    .parse()
                    .expect("--size requires a multiple of 32");
            }
            "--seconds" => {
                i += 1;
                let secs: f64 = next_arg(i, "--seconds")
                    .parse()
                    .expect("--seconds requires a number");
                duration = Duration::from_secs_f64(secs.max(0.0));
            }
            "--generations" => {
                i += 1;
                generations = Some(
                    next_arg(i, "--generations")
                        .parse()
                        .expect("--generations requires a positive integer"),
                );
            }
            "--seed" => {
                i += 1;
                seed = Some(
                    next_arg(i, "--seed")
                        .parse()
                        .expect("--seed requires a u32"),
                );
            }
            "--threads" => {
                i += 1;
                let n: usize = next_arg(i, "--threads")
                    .parse()
                    .expect("--threads requires a positive integer");
                config = config.thread_count(n);
            }
            "--max-threads" => {
                i += 1;
                let n: usize = next_arg(i, "--max-threads")
                    .parse()
                    .expect("--max-threads requires a positive integer");
                config = config.max_threads(n);
            }
            "--kernel" => {
                i += 1;
                let backend = match next_arg(i, "--kernel").to_ascii_lowercase().as_str() {
                    "scalar" => KernelBackend::Scalar,
                    "avx2" => KernelBackend::Avx2,
                    other => panic!("unknown kernel backend: {other} (expected scalar or avx2)"),
                };
                config = config.kernel(backend);
            }
            other => panic!(
                "unknown argument: {other}\nusage: packed-life [--size N] [--seconds S | --generations N] [--seed N] [--threads N] [--max-threads N] [--kernel scalar|avx2]"
            ),
        }
        i += 1;
    }
    MainArgs {
        config,
        grid_size,
        duration,
        generations,
        seed,
    }
}

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let args = parse_args();
    let mut life = PackedLife::with_config(args.grid_size, args.config)?;
    let seed = args
        .seed
        .unwrap_or_else(|| rand::random_range(0..1_000_000u32));

    let grid_size = life.grid_size();
    tracing::info!(
        grid_size,
        seed,
        threads = life.thread_count(),
        backend = ?life.backend(),
        memory_mb = life.memory_bytes() as f64 / 1e6,
        "starting benchmark"
    );

    life.randomize(seed);
    // Warm-up: first touch of the second buffer.
    life.step();

    let start = Instant::now();
    let mut frames = 0u64;
    match args.generations {
        Some(n) => {
            life.step_n(n);
            frames = n;
        }
        None => {
            while start.elapsed() < args.duration {
                life.step();
                frames += 1;
            }
        }
    }
    let elapsed = start.elapsed().as_secs_f64();

    let cells = (grid_size as f64) * (grid_size as f64);
    let fps = frames as f64 / elapsed;
    let cells_per_sec = frames as f64 * cells / elapsed;
    // One read of `current` and one write of `next`, 1 bit per cell each.
    let bandwidth_gib = frames as f64 * (cells / 8.0) * 2.0 / elapsed / (1u64 << 30) as f64;

    println!("\n== Benchmark {grid_size}x{grid_size} ==");
    println!("Generations     : {frames}");
    println!("Elapsed         : {elapsed:.3} s");
    println!("Generations/s   : {fps:.2}");
    println!("Cells/s         : {:.3} Tcells/s", cells_per_sec / 1e12);
    println!("Bandwidth (RW)  : {bandwidth_gib:.2} GiB/s");

    let control = life.render_region(
        0,
        0,
        CONTROL_WIDTH.min(grid_size),
        CONTROL_HEIGHT.min(grid_size),
    )?;
    let lit = control.iter().filter(|&&p| p != 0).count();
    println!(
        "Control frame   : {} px, {lit} alive, population {}",
        control.len(),
        life.population()
    );
    Ok(())
}
