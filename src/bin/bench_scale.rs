use std::time::Instant;

use packed_life::packedlife::PackedLife;

const SEED: u32 = 0x5EED_1234;

fn bench_packed(size: usize, iterations: u64) -> (f64, u64) {
    let mut life = PackedLife::new(size).expect("benchmark sizes are multiples of 32");
    life.randomize(SEED);

    let start = Instant::now();
    life.step_n(iterations);
    let duration = start.elapsed();

    let total_ms = duration.as_secs_f64() * 1000.0;
    (total_ms, life.population())
}

fn main() {
    let scales: &[(usize, u64)] = &[
        (1024, 500),  // 32 words per row, mostly single-threaded dispatch
        (4096, 200),
        (16384, 50),  // 32 MiB per generation buffer
        (32768, 20),
        (65536, 5),   // 512 MiB per generation buffer
    ];

    println!(
        "{:<12} {:>10} {:>8} {:>12} {:>10} {:>10}",
        "Grid", "Words", "Iters", "Total(ms)", "Avg(ms)", "Gcells/s"
    );
    println!("{}", "-".repeat(68));

    for &(size, iters) in scales {
        let words = size * size / 32;
        let (total_ms, _pop) = bench_packed(size, iters);
        let avg_ms = total_ms / iters as f64;
        let gcells = (size as f64 * size as f64) / (avg_ms / 1000.0) / 1e9;
        println!(
            "{:<12} {:>10} {:>8} {:>12.1} {:>10.4} {:>10.2}",
            format!("{}x{}", size, size),
            words,
            iters,
            total_ms,
            avg_ms,
            gcells
        );
    }
}
