use criterion::{black_box, criterion_group, criterion_main, Criterion};
use route_engine::benchmark_support::{
    EndpointRegistryFixture, ProducerCacheFixture, RouteDispatchFixture,
};
use tokio::runtime::Builder;

const CACHE_CAPACITY: usize = 64;
const HOT_ENDPOINTS: usize = 32;
const CHURN_ENDPOINTS: usize = 96;
const REGISTRY_SIZE: usize = 256;
const REGISTRY_URIS: usize = 128;

fn cache_criterion(c: &mut Criterion) {
    let runtime = Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("benchmark runtime should build");

    let hot_fixture = runtime
        .block_on(ProducerCacheFixture::new(CACHE_CAPACITY, HOT_ENDPOINTS))
        .expect("hot producer-cache fixture should build");
    let churn_fixture = runtime
        .block_on(ProducerCacheFixture::new(CACHE_CAPACITY, CHURN_ENDPOINTS))
        .expect("churn producer-cache fixture should build");

    let mut producer_cache_group = c.benchmark_group("producer_cache");
    producer_cache_group.bench_function("hot_reuse", |b| {
        b.iter(|| {
            let size = runtime
                .block_on(hot_fixture.send_round())
                .expect("hot round should send");
            black_box(size);
        });
    });
    producer_cache_group.bench_function("eviction_churn", |b| {
        b.iter(|| {
            let size = runtime
                .block_on(churn_fixture.send_round())
                .expect("churn round should send");
            black_box(size);
        });
    });
    producer_cache_group.finish();

    let registry_fixture = EndpointRegistryFixture::new(REGISTRY_SIZE, REGISTRY_URIS);
    let mut registry_group = c.benchmark_group("endpoint_registry");
    registry_group.bench_function("resolve_cached", |b| {
        b.iter(|| {
            let size = runtime
                .block_on(registry_fixture.resolve_all())
                .expect("registry round should resolve");
            black_box(size);
        });
    });
    registry_group.finish();

    let dispatch_fixture = runtime
        .block_on(RouteDispatchFixture::new())
        .expect("route-dispatch fixture should build");
    let mut dispatch_group = c.benchmark_group("route_dispatch");
    dispatch_group.bench_function("direct_to_producer", |b| {
        b.iter(|| {
            let delivered = runtime
                .block_on(dispatch_fixture.dispatch_once())
                .expect("dispatch should succeed");
            assert!(delivered, "dispatch should reach the counting producer");
            black_box(delivered);
        });
    });
    dispatch_group.finish();
    runtime
        .block_on(dispatch_fixture.stop())
        .expect("route-dispatch fixture should stop");
}

criterion_group!(benches, cache_criterion);
criterion_main!(benches);
