use apitrack::{
    DeployRequest, DeploymentRegistry, DeploymentStatus, DocumentStore, EngineConfig,
    EnvironmentId, MemoryStore, PlatformId, QueryParser, ResultEngine, SearchOptions,
};
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use serde_json::json;
use std::sync::Arc;

fn setup_store(num_apis: usize) -> Arc<MemoryStore> {
    let store = Arc::new(MemoryStore::new());
    let statuses = [
        DeploymentStatus::Running,
        DeploymentStatus::Stopped,
        DeploymentStatus::Deploying,
    ];
    for i in 0..num_apis {
        for (p, platform) in PlatformId::ALL.iter().take(3).enumerate() {
            for (e, env) in EnvironmentId::ALL.iter().take(4).enumerate() {
                let region = if e % 2 == 0 { "eu" } else { "us" };
                let request = DeployRequest::new(format!("service-{}-api", i), *platform, *env)
                    .with_version(format!("{}.{}.{}", i % 5, p, e))
                    .with_status(statuses[(i + e) % statuses.len()])
                    .with_updated_by("bench")
                    .with_property("owner", json!(format!("team-{}", i % 10)))
                    .with_property("meta", json!({ "region": region }));
                store.deploy(&request).unwrap();
            }
        }
    }
    store
}

fn bench_parse(c: &mut Criterion) {
    let parser = QueryParser::new();
    let mut group = c.benchmark_group("parse");
    for query in [
        "user prd",
        "Platform = IP4 AND Environment = prd",
        "Properties : meta.region = eu AND Version >= 2.0 AND Stauts = RUNNING",
    ] {
        group.bench_with_input(BenchmarkId::from_parameter(query), query, |b, q| {
            b.iter(|| parser.parse(q))
        });
    }
    group.finish();
}

fn bench_search(c: &mut Criterion) {
    let store = setup_store(500);
    let engine = ResultEngine::new(store.clone(), EngineConfig::default());
    let opts = SearchOptions::default();

    let mut group = c.benchmark_group("search");
    group.throughput(Throughput::Elements(6000));

    group.bench_function("match_all", |b| b.iter(|| engine.search("", 1, 10, opts)));
    group.bench_function("free_text", |b| {
        b.iter(|| engine.search("service-42-api", 1, 10, opts))
    });
    group.bench_function("discrete_and", |b| {
        b.iter(|| engine.search("Platform = IP4 AND Environment = prd", 1, 10, opts))
    });
    group.bench_function("version_range", |b| {
        b.iter(|| engine.search("Version >= 2.1", 3, 50, opts))
    });
    group.bench_function("property_path", |b| {
        b.iter(|| engine.search("Properties : meta.region = eu", 1, 10, opts))
    });
    group.finish();

    let registry = DeploymentRegistry::new(store, EngineConfig::default());
    c.bench_function("search/cached", |b| {
        b.iter(|| registry.search("Status = RUNNING", None, None, opts))
    });
}

fn bench_deploy(c: &mut Criterion) {
    let store = setup_store(100);
    let mut i = 0usize;
    c.bench_function("deploy/update_in_place", |b| {
        b.iter(|| {
            i += 1;
            store.deploy(
                &DeployRequest::new("service-7-api", PlatformId::Ip4, EnvironmentId::Prd)
                    .with_version(format!("9.9.{}", i)),
            )
        })
    });
}

criterion_group!(benches, bench_parse, bench_search, bench_deploy);
criterion_main!(benches);
