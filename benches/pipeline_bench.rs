use criterion::{Criterion, criterion_group, criterion_main};
use rand::Rng;
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::io;
use tweetstats::{MedianStrategy, Pipeline, StatsConfig};

const VOCAB: &[&str] = &[
    "rust", "thread", "queue", "median", "word", "count", "tweet", "hash", "shard", "heap", "order", "drain",
];

fn lines(n: usize) -> Vec<String> {
    let mut rng = StdRng::seed_from_u64(1);
    (0..n)
        .map(|_| {
            let len = rng.gen_range(1..20);
            (0..len)
                .map(|_| VOCAB[rng.gen_range(0..VOCAB.len())])
                .collect::<Vec<_>>()
                .join(" ")
        })
        .collect()
}

fn bench_pipeline(c: &mut Criterion) {
    let input = lines(10_000);
    let mut group = c.benchmark_group("pipeline");
    group.sample_size(10);
    for (name, median) in [
        ("histogram", MedianStrategy::default()),
        ("two_heap", MedianStrategy::TwoHeap),
    ] {
        let config = StatsConfig {
            median,
            poll_interval_ms: 1,
            ..StatsConfig::default()
        };
        let pipeline = Pipeline::new(config).unwrap();
        group.bench_function(name, |b| {
            b.iter(|| pipeline.run(input.clone(), io::sink(), io::sink()).unwrap())
        });
    }
    group.finish();
}

criterion_group!(benches, bench_pipeline);
criterion_main!(benches);
