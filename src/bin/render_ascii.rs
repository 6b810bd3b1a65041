//! Print a window of a seeded grid after N generations.
//!
//! usage: render_ascii [--size N] [--seed N] [--generations N] [--window X Y W H]

use packed_life::packedlife::{ALIVE_PIXEL, PackedLife, Result, Window};
use tracing_subscriber::EnvFilter;

#[derive(Clone, Debug)]
struct RenderConfig {
    size: usize,
    seed: u32,
    generations: u64,
    window: Window,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            size: 256,
            seed: 42,
            generations: 0,
            window: Window::new(0, 0, 64, 32),
        }
    }
}

fn parse_num<T: std::str::FromStr>(value: Option<String>, flag: &str) -> T {
    value
        .unwrap_or_else(|| panic!("{flag} requires a value"))
        .parse()
        .unwrap_or_else(|_| panic!("{flag} expects a non-negative integer"))
}

fn parse_args() -> RenderConfig {
    let mut cfg = RenderConfig::default();
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--size" => cfg.size = parse_num(args.next(), "--size"),
            "--seed" => cfg.seed = parse_num(args.next(), "--seed"),
            "--generations" => cfg.generations = parse_num(args.next(), "--generations"),
            "--window" => {
                let x = parse_num(args.next(), "--window");
                let y = parse_num(args.next(), "--window");
                let w = parse_num(args.next(), "--window");
                let h = parse_num(args.next(), "--window");
                cfg.window = Window::new(x, y, w, h);
            }
            other => panic!("unknown arg: {other}"),
        }
    }
    cfg
}

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let cfg = parse_args();
    let mut life = PackedLife::new(cfg.size)?;
    life.randomize(cfg.seed);
    life.step_n(cfg.generations);

    let window = cfg.window;
    // Pixels past the grid edge stay at the sentinel and print blank.
    let mut pixels = vec![b' '; window.pixel_count()?];
    life.render_into(window, &mut pixels)?;

    println!(
        "generation {} of {}x{} (seed {}), window {}x{} at ({}, {})",
        life.generation(),
        cfg.size,
        cfg.size,
        cfg.seed,
        window.width,
        window.height,
        window.x_offset,
        window.y_offset
    );
    for row in pixels.chunks(window.width.max(1)) {
        let line: String = row
            .iter()
            .map(|&p| match p {
                ALIVE_PIXEL => '#',
                b' ' => ' ',
                _ => '.',
            })
            .collect();
        println!("{line}");
    }
    Ok(())
}
