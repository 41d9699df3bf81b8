use criterion::{BatchSize, Criterion, black_box, criterion_group, criterion_main};
use shade_core::{PositionSample, PositionStabilizer, StabilizerCfg};

// Synthetic telemetry: ramps towards a target with jitter, then holds.
fn synth_samples(n: usize, seed: u32) -> Vec<PositionSample> {
    // tiny PRNG
    let mut state = seed.max(1);
    let mut next = || {
        let mut x = state;
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        state = x;
        x
    };
    let mut v = Vec::with_capacity(n);
    let mut pos: i32 = 0;
    for i in 0..n {
        let target = if (i / 400) % 2 == 0 { 80 } else { 20 };
        pos += (target - pos).signum();
        let jitter = (next() % 3) as i32 - 1;
        v.push(PositionSample {
            t_ms: (i as u64) * 120,
            value: (pos + jitter).clamp(0, 100) as u8,
        });
    }
    v
}

pub fn bench_on_sample(c: &mut Criterion) {
    let mut g = c.benchmark_group("stabilizer");
    //   BENCH_SAMPLE_SIZE=10 cargo bench -p shade_core --bench stabilizer
    if let Ok(ss) = std::env::var("BENCH_SAMPLE_SIZE")
        && let Ok(n) = ss.parse::<usize>()
    {
        g.sample_size(n.max(10));
    }

    let samples = synth_samples(20_000, 0xC0FFEE);
    for &recent_ms in &[500u64, 1000, 2000] {
        let cfg = StabilizerCfg {
            recent_ms,
            window_ms: recent_ms * 3,
            ..StabilizerCfg::default()
        };
        g.bench_function(format!("on_sample_recent_{recent_ms}ms"), |b| {
            b.iter_batched(
                || PositionStabilizer::new(cfg),
                |mut st| {
                    for &s in &samples {
                        black_box(st.on_sample(black_box(s)));
                    }
                    black_box(st.stable_position());
                },
                BatchSize::SmallInput,
            )
        });
    }
    g.finish();
}

criterion_group!(stabilizer, bench_on_sample);
criterion_main!(stabilizer);
