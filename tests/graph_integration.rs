//! Integration tests for batched graph loading.
//!
//! These tests load graphs from an in-memory store and check both the linked
//! records and the fetches issued to produce them.

use datagraph::prelude::*;
use datagraph::LinkKind;
use pretty_assertions::assert_eq;
use serde_json::json;

fn schema() -> SchemaDefinition {
    SchemaDefinition::new()
        .entity(
            EntityDescription::new("emps", ["id", "first_name", "last_name", "ssn", "job_id", "dept_id"])
                .primary_key(["id"])
                .relation(RelationDescription::belongs_to("job", "jobs", ["job_id"], ["id"]))
                .relation(RelationDescription::belongs_to("dept", "depts", ["dept_id"], ["id"])),
        )
        .entity(
            EntityDescription::new("depts", ["id", "name"])
                .primary_key(["id"])
                .relation(
                    RelationDescription::has_many("emps", "emps", ["id"], ["dept_id"])
                        .order_by([OrderByField::asc("first_name")]),
                )
                .relation(RelationDescription::has_one("manager", "emps", ["id"], ["dept_id"])),
        )
        .entity(
            EntityDescription::new("jobs", ["id", "name"])
                .primary_key(["id"])
                .relation(RelationDescription::has_many("emps", "emps", ["id"], ["job_id"]))
                .relation(
                    RelationDescription::has_many("depts", "depts", ["id"], ["job_id"])
                        .through("emps")
                        .source("dept"),
                ),
        )
}

fn emp(id: i64, first_name: &str, job_id: Option<i64>, dept_id: Option<i64>) -> Record {
    let mut record = Record::from_pairs([
        ("id", FilterValue::Int(id)),
        ("first_name", first_name.into()),
        ("last_name", "Smith".into()),
        ("ssn", format!("000-00-{:04}", id).into()),
    ]);
    record.set("job_id", job_id);
    record.set("dept_id", dept_id);
    record
}

fn named(id: i64, name: &str) -> Record {
    Record::from_pairs([("id", FilterValue::Int(id)), ("name", name.into())])
}

fn store() -> MemoryStore {
    MemoryStore::new()
        .with_table(
            "emps",
            vec![
                emp(1, "Kim", Some(1), Some(10)),
                emp(2, "Michelle", Some(4), Some(20)),
                emp(3, "Carla", Some(4), Some(10)),
                emp(4, "John", Some(4), Some(20)),
                emp(5, "Sara", Some(2), None),
            ],
        )
        .with_table(
            "depts",
            vec![named(10, "Accounting"), named(20, "Research"), named(30, "Sales")],
        )
        .with_table(
            "jobs",
            vec![named(1, "President"), named(2, "Analyst"), named(3, "Clerk"), named(4, "Manager")],
        )
}

fn string(record: &Record, column: &str) -> String {
    match record.get(column) {
        Some(FilterValue::String(s)) => s.clone(),
        other => format!("{:?}", other),
    }
}

fn many<'a>(record: &'a Record, relation: &str) -> &'a [Record] {
    record
        .relation(relation)
        .and_then(RelationValue::as_many)
        .unwrap_or_else(|| panic!("`{}` is not a loaded plural relation", relation))
}

fn one<'a>(record: &'a Record, relation: &str) -> Option<&'a Record> {
    match record.relation(relation) {
        Some(RelationValue::One(target)) => target.as_deref(),
        other => panic!("`{}` is not a loaded singular relation: {:?}", relation, other),
    }
}

async fn find(graph: &Graph, store: &MemoryStore, filter: Filter) -> Vec<Record> {
    graph
        .find(store, FetchRequest::new().filter(filter))
        .await
        .unwrap()
}

#[tokio::test]
async fn test_belongs_to_is_one_batched_fetch() {
    let config = NodeConfig::new()
        .only(["first_name"])
        .include("dept", NodeConfig::new().only(["name"]));
    let graph = Graph::build(&schema(), "emps", &config).unwrap();
    let store = store();

    let emps = find(&graph, &store, Filter::In("id".into(), vec![1.into(), 2.into(), 3.into()])).await;

    assert_eq!(store.fetch_count(), 2);
    let log = store.fetch_log();
    let (sql, params) = log[1].filter.to_sql(0);
    assert_eq!(log[1].entity, "depts");
    assert_eq!(sql, "id IN ($1, $2)");
    assert_eq!(params, vec![FilterValue::Int(10), FilterValue::Int(20)]);

    let depts: Vec<_> = emps
        .iter()
        .map(|e| one(e, "dept").map(|d| string(d, "name")))
        .collect();
    assert_eq!(
        depts,
        vec![
            Some("Accounting".to_string()),
            Some("Research".to_string()),
            Some("Accounting".to_string()),
        ]
    );
}

#[tokio::test]
async fn test_null_keys_link_nothing() {
    let config = NodeConfig::new().include("dept", NodeConfig::new());
    let graph = Graph::build(&schema(), "emps", &config).unwrap();
    let store = store();

    let emps = find(&graph, &store, Filter::Equals("id".into(), 5.into())).await;

    assert_eq!(store.fetch_count(), 1);
    assert_eq!(emps[0].relation("dept"), Some(&RelationValue::One(None)));
}

#[tokio::test]
async fn test_has_many_without_children_is_empty_list() {
    let config = NodeConfig::new().include("emps", NodeConfig::new().only(["first_name"]));
    let graph = Graph::build(&schema(), "depts", &config).unwrap();
    let store = store();

    let depts = find(&graph, &store, Filter::None).await;

    assert_eq!(store.fetch_count(), 2);
    let names: Vec<Vec<String>> = depts
        .iter()
        .map(|d| many(d, "emps").iter().map(|e| string(e, "first_name")).collect())
        .collect();
    assert_eq!(
        names,
        vec![
            vec!["Carla".to_string(), "Kim".to_string()],
            vec!["John".to_string(), "Michelle".to_string()],
            Vec::new(),
        ]
    );
}

#[tokio::test]
async fn test_has_one_links_a_single_child() {
    let config = NodeConfig::new().include("manager", NodeConfig::new().only(["first_name"]));
    let graph = Graph::build(&schema(), "depts", &config).unwrap();
    assert_eq!(graph.node().linkage("manager").map(|l| l.kind()), Some(LinkKind::HasOne));

    let store = MemoryStore::new()
        .with_table("depts", vec![named(10, "Accounting"), named(30, "Sales")])
        .with_table("emps", vec![emp(1, "Kim", None, Some(10))]);
    let depts = find(&graph, &store, Filter::None).await;

    assert_eq!(one(&depts[0], "manager").map(|e| string(e, "first_name")), Some("Kim".to_string()));
    assert_eq!(one(&depts[1], "manager"), None);
}

#[tokio::test]
async fn test_fetch_count_is_one_per_level() {
    let config = NodeConfig::new().include(
        "emps",
        NodeConfig::new()
            .include("job", NodeConfig::new())
            .include("dept", NodeConfig::new()),
    );
    let graph = Graph::build(&schema(), "depts", &config).unwrap();
    let store = store();

    let depts = find(&graph, &store, Filter::None).await;

    let entities: Vec<_> = store.fetch_log().into_iter().map(|r| r.entity).collect();
    assert_eq!(entities, vec!["depts", "emps", "jobs", "depts"]);

    let carla = &many(&depts[0], "emps")[0];
    assert_eq!(one(carla, "job").map(|j| string(j, "name")), Some("Manager".to_string()));
    assert_eq!(one(carla, "dept").map(|d| string(d, "name")), Some("Accounting".to_string()));
}

#[tokio::test]
async fn test_through_relation_dedupes_per_parent() {
    let config = NodeConfig::new().include("depts", NodeConfig::new().only(["name"]));
    let graph = Graph::build(&schema(), "jobs", &config).unwrap();
    let store = store();

    let jobs = find(&graph, &store, Filter::Equals("id".into(), 4.into())).await;

    let names: Vec<_> = many(&jobs[0], "depts").iter().map(|d| string(d, "name")).collect();
    assert_eq!(names, vec!["Research", "Accounting"]);

    let log = store.fetch_log();
    let entities: Vec<_> = log.iter().map(|r| r.entity.as_str()).collect();
    assert_eq!(entities, vec!["jobs", "emps", "depts"]);
    assert_eq!(log[1].columns, vec!["dept_id", "job_id"]);
    assert_eq!(graph.get_paths().iter().filter(|p| p.starts_with("depts.")).count(), 1);
}

#[tokio::test]
async fn test_direct_has_many_keeps_duplicate_rows() {
    let config = NodeConfig::new().include("emps", NodeConfig::new().only(["first_name"]));
    let graph = Graph::build(&schema(), "jobs", &config).unwrap();
    let store = store();
    store.insert("emps", emp(2, "Michelle", Some(4), Some(20)));

    let jobs = find(&graph, &store, Filter::Equals("id".into(), 4.into())).await;

    let names: Vec<_> = many(&jobs[0], "emps").iter().map(|e| string(e, "first_name")).collect();
    assert_eq!(names, vec!["Michelle", "Carla", "John", "Michelle"]);
}

#[tokio::test]
async fn test_relation_limit_applies_to_whole_batch() {
    let config = NodeConfig::new().include("emps", NodeConfig::new().limit(1));
    let graph = Graph::build(&schema(), "depts", &config).unwrap();
    let store = store();

    let depts = find(&graph, &store, Filter::None).await;

    let counts: Vec<_> = depts.iter().map(|d| many(d, "emps").len()).collect();
    assert_eq!(counts.iter().sum::<usize>(), 1);
    assert_eq!(store.fetch_log()[1].limit, Some(1));
}

#[tokio::test]
async fn test_relation_conditions_are_anded() {
    let schema = SchemaDefinition::new()
        .entity(
            EntityDescription::new("emps", ["id", "dept_id"]).relation(
                RelationDescription::belongs_to("dept", "depts", ["dept_id"], ["id"])
                    .conditions(Filter::Contains("name".into(), "ount".into())),
            ),
        )
        .entity(EntityDescription::new("depts", ["id", "name"]));
    let config = NodeConfig::new().include("dept", NodeConfig::new());
    let graph = Graph::build(&schema, "emps", &config).unwrap();
    let store = store();

    let emps = find(&graph, &store, Filter::In("id".into(), vec![1.into(), 2.into()])).await;

    assert!(one(&emps[0], "dept").is_some());
    assert!(one(&emps[1], "dept").is_none());
}

#[tokio::test]
async fn test_composite_keys() {
    let schema = SchemaDefinition::new()
        .entity(
            EntityDescription::new("one", ["a", "b", "p"])
                .primary_key(["a", "b"])
                .relation(RelationDescription::belongs_to("two", "two", ["p"], ["q"]))
                .relation(RelationDescription::has_many("twos", "two", ["a", "b"], ["x", "y"])),
        )
        .entity(EntityDescription::new("two", ["x", "y", "q"]).primary_key(["q"]));
    let row = |values: [i64; 3], columns: [&str; 3]| {
        Record::from_pairs(columns.into_iter().zip(values))
    };
    let store = MemoryStore::new()
        .with_table(
            "one",
            [[1, 1, 1], [1, 2, 2], [2, 1, 3]].map(|v| row(v, ["a", "b", "p"])),
        )
        .with_table(
            "two",
            [[1, 1, 3], [1, 2, 2], [2, 1, 1]].map(|v| row(v, ["x", "y", "q"])),
        );
    let config = NodeConfig::new()
        .only(["p"])
        .include("two", NodeConfig::new().only(["q"]))
        .include("twos", NodeConfig::new().only(["q"]));
    let graph = Graph::build(&schema, "one", &config).unwrap();

    let ones = graph.find(&store, FetchRequest::new()).await.unwrap();

    let tree: Vec<_> = ones
        .iter()
        .map(|o| {
            json!({
                "p": o.get("p"),
                "two": one(o, "two").and_then(|t| t.get("q")),
                "twos": many(o, "twos").iter().map(|t| t.get("q")).collect::<Vec<_>>(),
            })
        })
        .collect();
    assert_eq!(
        tree,
        vec![
            json!({"p": 1, "two": 1, "twos": [3]}),
            json!({"p": 2, "two": 2, "twos": [2]}),
            json!({"p": 3, "two": 3, "twos": [1]}),
        ]
    );

    let (sql, _) = store.fetch_log()[2].filter.to_sql(0);
    assert_eq!(sql, "(x, y) IN (($1, $2), ($3, $4), ($5, $6))");
}

#[tokio::test]
async fn test_store_failure_fails_the_whole_fetch() {
    let config = NodeConfig::new().include("job", NodeConfig::new());
    let graph = Graph::build(&schema(), "emps", &config).unwrap();
    let store = MemoryStore::new().with_table("emps", vec![emp(1, "Kim", Some(1), None)]);

    let err = graph.find(&store, FetchRequest::new()).await.unwrap_err();
    assert!(matches!(err, GraphError::Store { ref entity, .. } if entity == "jobs"));
}

#[tokio::test]
async fn test_subset_find_only_fetches_subset_columns() {
    let config = NodeConfig::new()
        .include("job", NodeConfig::new())
        .subset("public", ["first_name", "job.name"]);
    let graph = Graph::build(&schema(), "emps", &config).unwrap();
    let store = store();

    let public = graph.subset("public").unwrap();
    let emps = public
        .find(&store, FetchRequest::new().filter(Filter::Equals("id".into(), 1.into())))
        .await
        .unwrap();

    let log = store.fetch_log();
    assert_eq!(log[0].columns, vec!["first_name", "job_id"]);
    assert_eq!(log[1].columns, vec!["name", "id"]);
    assert!(emps[0].get("ssn").is_none());
    assert_eq!(
        serde_json::to_value(&emps[0]).unwrap(),
        json!({"first_name": "Kim", "job_id": 1, "job": {"name": "President", "id": 1}})
    );
}

#[test]
fn test_only_never_widens_leaf_paths() {
    let config = NodeConfig::new()
        .methods(["full_name"])
        .include("job", NodeConfig::new());
    let graph = Graph::build(&schema(), "emps", &config).unwrap();
    let leaves = ["id", "first_name", "ssn", "full_name", "bogus"];

    for mask in 0u32..(1 << leaves.len()) {
        let subset: Vec<String> = leaves
            .iter()
            .enumerate()
            .filter(|(i, _)| mask & (1 << i) != 0)
            .map(|(_, leaf)| leaf.to_string())
            .collect();
        let narrowed = graph.only(&subset);
        for path in narrowed.get_paths() {
            assert!(subset.contains(path), "{} escaped only({:?})", path, subset);
        }
    }
}

#[test]
fn test_alias_resolution_is_idempotent() {
    let config = NodeConfig::new()
        .include("job", NodeConfig::new())
        .alias("name", ["first_name", "last_name"])
        .alias("position", ["job.name", "job"]);
    let graph = Graph::build(&schema(), "emps", &config).unwrap();

    for input in [
        vec!["name"],
        vec!["name", "position", "first_name"],
        vec!["job", "ssn", "position", "name"],
    ] {
        let once = graph.resolve(&input);
        assert_eq!(graph.resolve(&once), once, "resolving {:?}", input);
    }
}

#[test]
fn test_validate_lists_every_offender() {
    let config = NodeConfig::new()
        .include("job", NodeConfig::new())
        .subset("public", ["first_name", "last_name", "job.name"]);
    let graph = Graph::build(&schema(), "emps", &config).unwrap();

    let err = graph
        .validate("public", &["ssn", "first_name", "job.id", "ssn"])
        .unwrap_err();
    assert_eq!(err.to_string(), r#"inaccessible: ["ssn", "job.id"]"#);

    let err = graph
        .validate_attrs("public", &json!({"job": {"name": "CEO"}, "last_name": "King", "ssn": "1"}))
        .unwrap_err();
    assert_eq!(err.paths(), Some(&["ssn".to_string()][..]));
}

#[tokio::test]
async fn test_float_keys_link_to_integer_keys() {
    let config = NodeConfig::new().include("dept", NodeConfig::new().only(["name"]));
    let graph = Graph::build(&schema(), "emps", &config).unwrap();
    let store = MemoryStore::new()
        .with_table("emps", vec![emp(1, "Kim", None, Some(10))])
        .with_table(
            "depts",
            vec![Record::from_pairs([
                ("id", FilterValue::Float(10.0)),
                ("name", "Accounting".into()),
            ])],
        );

    let emps = find(&graph, &store, Filter::None).await;

    assert_eq!(
        one(&emps[0], "dept").map(|d| string(d, "name")),
        Some("Accounting".to_string())
    );
}

fn lead_schema() -> SchemaDefinition {
    SchemaDefinition::new()
        .entity(
            EntityDescription::new("depts", ["id", "name"])
                .primary_key(["id"])
                .relation(RelationDescription::has_one("lead", "emps", ["id"], ["dept_id"]))
                .relation(
                    RelationDescription::has_one("lead_job", "jobs", ["id"], ["dept_id"])
                        .through("lead")
                        .source("job"),
                ),
        )
        .entity(
            EntityDescription::new("emps", ["id", "first_name", "job_id", "dept_id"])
                .primary_key(["id"])
                .relation(RelationDescription::belongs_to("job", "jobs", ["job_id"], ["id"])),
        )
        .entity(EntityDescription::new("jobs", ["id", "name"]).primary_key(["id"]))
}

#[tokio::test]
async fn test_has_one_through_skips_hops_without_target() {
    let config = NodeConfig::new().include("lead_job", NodeConfig::new().only(["name"]));
    let graph = Graph::build(&lead_schema(), "depts", &config).unwrap();
    assert_eq!(graph.node().linkage("lead_job").map(|l| l.kind()), Some(LinkKind::HasOne));

    let store = MemoryStore::new()
        .with_table(
            "depts",
            vec![
                named(10, "Accounting"),
                named(20, "Research"),
                named(30, "Sales"),
                named(40, "Operations"),
            ],
        )
        .with_table(
            "emps",
            vec![
                emp(1, "Kim", None, Some(10)),
                emp(2, "Michelle", Some(1), Some(10)),
                emp(3, "Carla", None, Some(20)),
                emp(4, "John", Some(4), Some(40)),
                emp(5, "Sara", None, Some(40)),
            ],
        )
        .with_table("jobs", vec![named(1, "President"), named(4, "Manager")]);

    let depts = find(&graph, &store, Filter::None).await;

    let jobs: Vec<_> = depts
        .iter()
        .map(|d| one(d, "lead_job").map(|j| string(j, "name")))
        .collect();
    assert_eq!(
        jobs,
        vec![
            Some("President".to_string()),
            None,
            None,
            Some("Manager".to_string()),
        ]
    );
    assert!(depts.iter().all(|d| d.relation("lead").is_none()));

    let entities: Vec<_> = store.fetch_log().into_iter().map(|r| r.entity).collect();
    assert_eq!(entities, vec!["depts", "emps", "jobs"]);
}
