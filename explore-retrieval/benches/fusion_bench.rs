use std::collections::BTreeMap;

use criterion::{criterion_group, criterion_main, Criterion};
use explore_core::config::{ComponentType, TokenBudgetConfig};
use explore_core::models::ComponentHit;
use explore_retrieval::{fuse, BudgetAllocator, ComponentOutput};
use explore_tokens::WordCounter;
use serde_json::{Map, Value};

fn outputs(calls: usize, hits: usize) -> Vec<ComponentOutput> {
    (0..calls)
        .map(|c| ComponentOutput {
            component: ComponentType::VectorSearch,
            ordinal: c,
            source: format!("source_{}", c % 3),
            weight: 1.0 / calls as f64,
            hits: (0..hits)
                .map(|h| {
                    let mut fields = Map::new();
                    fields.insert("body".into(), Value::from(format!("record {h} body text")));
                    ComponentHit::new(format!("r{h}"), 1.0 - h as f64 / hits as f64)
                        .with_fields(fields)
                })
                .collect(),
        })
        .collect()
}

fn bench_fuse(c: &mut Criterion) {
    let small = outputs(4, 50);
    let large = outputs(6, 1_000);

    c.bench_function("fuse_4x50", |b| b.iter(|| fuse(&small, 10)));
    c.bench_function("fuse_6x1000", |b| b.iter(|| fuse(&large, 100)));
}

fn bench_allocate(c: &mut Criterion) {
    let ranked = fuse(&outputs(6, 1_000), 100);
    let fields = BTreeMap::new();
    let budget = TokenBudgetConfig {
        enabled: true,
        max_tokens: 200,
        priority: vec!["source_1".into()],
    };
    let allocator = BudgetAllocator::new(&WordCounter, &fields);

    c.bench_function("allocate_100_into_200_tokens", |b| {
        b.iter(|| allocator.allocate(ranked.clone(), Some(&budget), &BTreeMap::new()))
    });
}

criterion_group!(benches, bench_fuse, bench_allocate);
criterion_main!(benches);
