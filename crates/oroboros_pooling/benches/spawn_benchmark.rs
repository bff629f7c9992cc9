//! Benchmark for pooled spawn/despawn throughput.
//!
//! Run with: cargo bench --package oroboros_pooling --bench spawn_benchmark

use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use oroboros_assets::{AssetHandle, AssetKind, ItemEntry, Registry, RegistryManager};
use oroboros_pooling::{HostError, InstanceHost, InstanceId, Placement, PoolConfig, PoolingEngine};

/// Hands out ids and does nothing else, so only engine overhead is measured.
#[derive(Default)]
struct CountingHost {
    next_id: u64,
}

impl InstanceHost for CountingHost {
    fn create_instance(&mut self, _asset: AssetHandle, _placement: &Placement) -> Result<InstanceId, HostError> {
        self.next_id += 1;
        Ok(InstanceId(self.next_id))
    }

    fn destroy_instance(&mut self, _instance: InstanceId) {}

    fn place_instance(&mut self, _instance: InstanceId, _placement: &Placement) {}
}

fn create_test_engine(config: PoolConfig) -> PoolingEngine<CountingHost> {
    let fallback = ItemEntry::new("missing", AssetHandle::prefab(0)).unwrap();
    let mut fx = Registry::new("fx", AssetKind::Prefab, fallback).unwrap();
    for i in 0..100u64 {
        fx.add_item(ItemEntry::new(format!("spark_{i}"), AssetHandle::prefab(i + 1)).unwrap())
            .unwrap();
    }

    let manager = RegistryManager::new();
    manager.add_registry_to_bucket("fx", fx.into_shared()).unwrap();
    PoolingEngine::new(Arc::new(manager), CountingHost::default(), config)
}

fn benchmark_warm_round_trip(c: &mut Criterion) {
    let engine = create_test_engine(PoolConfig::default());
    engine.pre_warm_pool("fx/spark_7", 32).unwrap();

    c.bench_function("spawn_despawn_warm_pool", |b| {
        b.iter(|| {
            let instance = engine.spawn(black_box("fx/spark_7"), &Placement::IDENTITY).unwrap();
            black_box(engine.despawn(instance).unwrap())
        });
    });
}

fn benchmark_bare_key_round_trip(c: &mut Criterion) {
    let engine = create_test_engine(PoolConfig::default());
    engine.pre_warm_pool("spark_7", 32).unwrap();

    c.bench_function("spawn_despawn_bare_key", |b| {
        b.iter(|| {
            let instance = engine.spawn(black_box("spark_7"), &Placement::IDENTITY).unwrap();
            black_box(engine.despawn(instance).unwrap())
        });
    });
}

fn benchmark_burst_over_cap(c: &mut Criterion) {
    let engine = create_test_engine(PoolConfig::default().with_default_max_size(16));

    c.bench_function("burst_64_cap_16", |b| {
        b.iter(|| {
            let burst: Vec<_> = (0..64)
                .map(|_| engine.spawn("fx/spark_3", &Placement::IDENTITY).unwrap())
                .collect();
            for instance in burst {
                black_box(engine.despawn(instance).unwrap());
            }
        });
    });
}

fn benchmark_auto_cleanup(c: &mut Criterion) {
    c.bench_function("spawn_over_threshold", |b| {
        b.iter_batched_ref(
            || {
                let engine = create_test_engine(PoolConfig::uncapped().with_auto_cleanup(500));
                for i in 0..50 {
                    engine.pre_warm_pool(&format!("fx/spark_{i}"), 10).unwrap();
                }
                engine
            },
            // Total sits at the threshold, so this creation evicts one instance
            |engine| black_box(engine.spawn("fx/spark_99", &Placement::IDENTITY).unwrap()),
            BatchSize::LargeInput,
        );
    });
}

criterion_group!(
    benches,
    benchmark_warm_round_trip,
    benchmark_bare_key_round_trip,
    benchmark_burst_over_cap,
    benchmark_auto_cleanup,
);
criterion_main!(benches);
