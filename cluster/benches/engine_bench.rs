use std::sync::Arc;

use analyst_cluster::{ClusterId, Config, Document, DocumentId, Engine, MemoryStore};
use chrono::{DateTime, Duration, Utc};
use criterion::{Criterion, black_box, criterion_group, criterion_main};

const DIM: usize = 768;

fn random_unit_vec(dim: usize, seed: u64) -> Vec<f32> {
    let mut v = Vec::with_capacity(dim);
    let mut state = seed;
    for _ in 0..dim {
        state = state.wrapping_mul(6364136223846793005).wrapping_add(1);
        v.push(((state >> 33) as f32) / (u32::MAX as f32) - 0.5);
    }
    normalize(&mut v);
    v
}

fn normalize(v: &mut [f32]) {
    let norm: f64 = v.iter().map(|&x| (x as f64) * (x as f64)).sum::<f64>().sqrt();
    if norm > 0.0 {
        let s = (1.0 / norm) as f32;
        for x in v {
            *x *= s;
        }
    }
}

/// `n` unit vectors scattered around `centroid`.
fn make_topic(centroid: &[f32], n: usize, noise: f32, base_seed: u64) -> Vec<Vec<f32>> {
    (0..n)
        .map(|i| {
            let rvec = random_unit_vec(centroid.len(), base_seed.wrapping_add(i as u64 * 997));
            let mut v: Vec<f32> = centroid
                .iter()
                .zip(&rvec)
                .map(|(c, r)| c + r * noise)
                .collect();
            normalize(&mut v);
            v
        })
        .collect()
}

/// An engine holding `topics` clusters of `per_topic` processed documents.
fn populated_engine(topics: u64, per_topic: usize) -> (Engine, Vec<DocumentId>) {
    let engine = Engine::new(
        Config {
            dim: DIM,
            ..Config::default()
        },
        Arc::new(MemoryStore::new()),
    )
    .unwrap();

    let t0 = DateTime::<Utc>::from_timestamp(1_700_000_000, 0).unwrap();
    let mut ids = Vec::new();
    for topic in 0..topics {
        let centroid = random_unit_vec(DIM, topic + 1);
        for (i, emb) in make_topic(&centroid, per_topic, 0.5, topic * 1000)
            .into_iter()
            .enumerate()
        {
            let doc = Document::new(
                format!("https://example.com/{topic}/{i}"),
                format!("Topic {topic} story {i}"),
                t0 + Duration::minutes(i as i64),
            )
            .with_embedding(emb);
            engine.register(&doc).unwrap();
            engine.on_article_embedded(&doc.id).unwrap();
            ids.push(doc.id);
        }
    }
    (engine, ids)
}

fn bench_find_best_cluster(c: &mut Criterion) {
    let (engine, _) = populated_engine(8, 25);
    let probe = Document::new("probe", "", Utc::now()).with_embedding(random_unit_vec(DIM, 999));

    c.bench_function("cluster_find_best_768d_8topics", |b| {
        b.iter(|| black_box(engine.find_best_cluster(black_box(&probe)).unwrap()));
    });
}

fn bench_resolve_duplicates(c: &mut Criterion) {
    let (engine, _) = populated_engine(8, 25);
    let probe = Document::new("probe", "", Utc::now()).with_embedding(random_unit_vec(DIM, 999));

    c.bench_function("cluster_resolve_duplicates_768d_200docs", |b| {
        b.iter(|| black_box(engine.resolve_duplicates(black_box(&probe)).unwrap()));
    });
}

fn bench_reprocess(c: &mut Criterion) {
    let (engine, ids) = populated_engine(4, 25);
    let id = ids[ids.len() / 2].clone();

    c.bench_function("cluster_reprocess_768d_100docs", |b| {
        b.iter(|| black_box(engine.reprocess(black_box(&id)).unwrap()));
    });
}

fn bench_recompute(c: &mut Criterion) {
    let (engine, _) = populated_engine(1, 150);

    c.bench_function("cluster_recompute_768d_150members", |b| {
        b.iter(|| black_box(engine.recompute(ClusterId(1)).unwrap()));
    });
}

criterion_group!(
    benches,
    bench_find_best_cluster,
    bench_resolve_duplicates,
    bench_reprocess,
    bench_recompute
);
criterion_main!(benches);
