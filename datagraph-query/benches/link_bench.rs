//! Benchmarks for key grouping, attaching and full batched fetches.
//!
//! Run with: `cargo bench --package datagraph-query --bench link_bench`

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use datagraph_query::{
    EntityDescription, FetchRequest, FilterValue, KeyGroups, MemoryStore, Node, NodeConfig,
    Record, RelationDescription, SchemaDefinition,
};
use std::hint::black_box;
use tokio::runtime::Runtime;

const DEPTS: i64 = 50;

fn schema() -> SchemaDefinition {
    SchemaDefinition::new()
        .entity(
            EntityDescription::new("emps", ["id", "name", "dept_id"])
                .relation(RelationDescription::belongs_to("dept", "depts", ["dept_id"], ["id"])),
        )
        .entity(
            EntityDescription::new("depts", ["id", "name"])
                .relation(RelationDescription::has_many("emps", "emps", ["id"], ["dept_id"])),
        )
}

fn emps(count: i64) -> Vec<Record> {
    (0..count)
        .map(|id| {
            Record::from_pairs([
                ("id", FilterValue::Int(id)),
                ("name", FilterValue::String(format!("emp {}", id))),
                ("dept_id", FilterValue::Int(id % DEPTS)),
            ])
        })
        .collect()
}

fn depts() -> Vec<Record> {
    (0..DEPTS)
        .map(|id| {
            Record::from_pairs([
                ("id", FilterValue::Int(id)),
                ("name", FilterValue::String(format!("dept {}", id))),
            ])
        })
        .collect()
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

// ============================================================================
// Grouping and attaching
// ============================================================================

fn bench_key_groups(c: &mut Criterion) {
    let mut group = c.benchmark_group("key_groups");
    let single = strings(&["dept_id"]);
    let composite = strings(&["dept_id", "id"]);

    for count in [100i64, 1_000, 10_000] {
        let parents = emps(count);
        group.throughput(Throughput::Elements(count as u64));

        group.bench_with_input(BenchmarkId::new("single_column", count), &parents, |b, parents| {
            b.iter(|| black_box(KeyGroups::from_records(parents, &single)))
        });
        group.bench_with_input(BenchmarkId::new("composite", count), &parents, |b, parents| {
            b.iter(|| black_box(KeyGroups::from_records(parents, &composite)))
        });
    }

    group.finish();
}

fn bench_attach(c: &mut Criterion) {
    let mut group = c.benchmark_group("attach");
    let node = Node::build(
        &schema(),
        "emps",
        &NodeConfig::new().include("dept", NodeConfig::new()),
    )
    .unwrap();
    let linkage = node.linkage("dept").unwrap();
    let children = depts();

    for count in [100i64, 1_000, 10_000] {
        let parents = emps(count);
        let groups = linkage.group(&parents);
        group.throughput(Throughput::Elements(count as u64));

        group.bench_with_input(BenchmarkId::new("belongs_to", count), &parents, |b, parents| {
            b.iter(|| {
                let mut parents = parents.clone();
                linkage.attach(&mut parents, &groups, children.clone());
                black_box(parents)
            })
        });
    }

    group.finish();
}

// ============================================================================
// Full fetches against the memory store
// ============================================================================

fn bench_find(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let mut group = c.benchmark_group("find");
    let config = NodeConfig::new().include("emps", NodeConfig::new().only(["name"]));
    let node = Node::build(&schema(), "depts", &config).unwrap();

    for count in [100i64, 1_000] {
        let store = MemoryStore::new()
            .with_table("depts", depts())
            .with_table("emps", emps(count));
        group.throughput(Throughput::Elements(count as u64));

        group.bench_with_input(BenchmarkId::new("has_many", count), &store, |b, store| {
            b.to_async(&rt).iter(|| async {
                store.clear_log();
                black_box(node.find(store, FetchRequest::new()).await.unwrap())
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_key_groups, bench_attach, bench_find);
criterion_main!(benches);
