//! # Scenario Tier Tests (S0-S4)
//!
//! End-to-end behavior of the store and the operation contract.
//!
//! ## Tiers
//! - S0: Positional Model
//! - S1: Persistence
//! - S2: Content Addressing
//! - S3: Execution
//! - S4: Unordered Staging

#![allow(clippy::unwrap_used, clippy::panic)]

use sphynx_core::ops::{
    AddConstantDoubleAttribute, ConstantParams, ExampleGraph, NoParams, ReverseEdges,
};
use sphynx_core::{
    DoubleAttribute, Dag, EdgeBundle, Entity, EntityStore, ExecOutcome, Executor, Guid,
    Operation, OperationInstance, Registry, SphynxError, StoreConfig, VertexSet,
};
use std::collections::BTreeMap;

fn guid(tag: u8) -> Guid {
    Guid([tag; 32])
}

/// Vertex set `[100, 200, 300]` under guid 1, edges `100->200 (7)` and
/// `200->300 (8)` under guid 2.
fn sample_graph(store: &EntityStore) {
    store
        .put(guid(1), VertexSet::new(vec![100, 200, 300]).into())
        .expect("vertex set");
    store
        .put(
            guid(2),
            EdgeBundle::new(guid(1), vec![0, 1], vec![1, 2], vec![7, 8]).into(),
        )
        .expect("edge bundle");
}

fn example_instance() -> OperationInstance {
    let description = ExampleGraph::describe(&NoParams {}).expect("describe");
    OperationInstance::new(description, BTreeMap::new(), ExampleGraph::OUTPUTS)
}

// =============================================================================
// TIER S0: POSITIONAL MODEL
// =============================================================================

mod s0_positional_model {
    use super::*;

    /// S0.1: Edges resolve to external ids through the vertex set.
    #[test]
    fn edges_map_back_to_external_ids() {
        let store = EntityStore::in_memory();
        sample_graph(&store);

        let vs = store.vertex_set(&guid(1)).expect("vs");
        let eb = store.edge_bundle(&guid(2)).expect("eb");
        let external: Vec<(i64, i64, i64)> = eb
            .iter()
            .map(|(s, d, id)| (vs.mapping()[s], vs.mapping()[d], id))
            .collect();
        assert_eq!(external, vec![(100, 200, 7), (200, 300, 8)]);
    }

    /// S0.2: An undefined position is absent even though a value is stored.
    #[test]
    fn undefined_position_is_absent() {
        let store = EntityStore::in_memory();
        sample_graph(&store);
        let attr = DoubleAttribute::new(guid(1), vec![1.5, 0.0, 3.25], vec![true, false, true]);
        store.put(guid(3), attr.into()).expect("attr");

        let attr = store.double_attribute(&guid(3)).expect("attr");
        assert_eq!(attr.get(0), Some(&1.5));
        assert_eq!(attr.get(1), None);
        assert_eq!(attr.get(2), Some(&3.25));
    }

    /// S0.3: An out-of-range endpoint is a corrupt-data fault, not truncated.
    #[test]
    fn out_of_range_endpoint_refused() {
        let store = EntityStore::in_memory();
        sample_graph(&store);
        let bad = EdgeBundle::new(guid(1), vec![0], vec![3], vec![9]);
        let err = store.put(guid(4), bad.into()).expect_err("dst 3 of 3");
        assert!(matches!(err, SphynxError::PositionOutOfRange { .. }));
        assert!(err.is_corrupt());
    }

    /// S0.4: Source and destination may live in different vertex sets.
    #[test]
    fn bipartite_edges_checked_per_side() {
        let store = EntityStore::in_memory();
        sample_graph(&store);
        store
            .put(guid(5), VertexSet::new(vec![1, 2, 3, 4, 5]).into())
            .expect("second set");

        let ok = EdgeBundle::between(guid(1), guid(5), vec![2], vec![4], vec![1]);
        store.put(guid(6), ok.into()).expect("dst 4 fits the larger set");

        let bad = EdgeBundle::between(guid(5), guid(1), vec![2], vec![4], vec![1]);
        assert!(store.put(guid(7), bad.into()).is_err());
    }
}

// =============================================================================
// TIER S1: PERSISTENCE
// =============================================================================

mod s1_persistence {
    use super::*;
    use sphynx_core::primitives::ROWS_FILE;
    use sphynx_core::storage::entity_dir;

    /// S1.1: The sample bundle persists and reloads unchanged.
    #[test]
    fn sample_bundle_reloads_unchanged() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = StoreConfig::rooted_at(dir.path());
        let store = EntityStore::new(config.clone()).expect("store");
        sample_graph(&store);
        store.persist(&guid(2)).expect("persist");

        let fresh = EntityStore::new(config).expect("reopen");
        let eb = fresh.get_or_load(&guid(2)).expect("load");
        assert!(eb.same_content(&store.get(&guid(2)).expect("original")));
        assert_eq!(
            fresh.vertex_set(&guid(1)).expect("vs").mapping(),
            &[100, 200, 300]
        );
    }

    /// S1.2: A truncated row file is reported with the failing row.
    #[test]
    fn truncated_rows_name_the_row() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = StoreConfig::rooted_at(dir.path());
        let store = EntityStore::new(config.clone()).expect("store");
        sample_graph(&store);
        store.persist(&guid(2)).expect("persist");

        let rows = entity_dir::entity_path(&config.data_dir, guid(2)).join(ROWS_FILE);
        let bytes = std::fs::read(&rows).expect("read");
        std::fs::write(&rows, &bytes[..bytes.len() - 1]).expect("truncate");

        let fresh = EntityStore::new(config).expect("reopen");
        let err = fresh.load(&guid(2)).expect_err("truncated");
        assert!(
            matches!(err, SphynxError::MalformedRow { guid: g, row: 1, .. } if g == guid(2)),
            "unexpected error: {err}"
        );
        assert!(err.is_corrupt());
        assert!(!fresh.has(&guid(2)));
    }

    /// S1.3: A load never pads a vertex set that shrank underneath an attribute.
    #[test]
    fn vertex_set_size_drift_detected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = StoreConfig::rooted_at(dir.path());
        let store = EntityStore::new(config.clone()).expect("store");
        sample_graph(&store);
        let attr = DoubleAttribute::dense(guid(1), vec![1.0, 2.0, 3.0]);
        store.put(guid(3), attr.into()).expect("attr");
        store.persist(&guid(3)).expect("persist");

        // A different, smaller vertex set now sits under the same guid.
        let fresh = EntityStore::new(config).expect("reopen");
        fresh
            .put(guid(1), VertexSet::new(vec![100, 200]).into())
            .expect("replacement");
        assert!(matches!(
            fresh.load(&guid(3)),
            Err(SphynxError::LengthMismatch {
                field: "vertex_set",
                ..
            })
        ));
    }
}

// =============================================================================
// TIER S2: CONTENT ADDRESSING
// =============================================================================

mod s2_content_addressing {
    use super::*;

    /// S2.1: JSON key order never changes the derived guid.
    #[test]
    fn json_key_order_is_irrelevant() {
        let registry = Registry::with_builtins();
        let a: serde_json::Value = serde_json::from_str(r#"{"value": 1.5}"#).expect("json");
        let b: serde_json::Value = serde_json::from_str(r#"{ "value" :1.50 }"#).expect("json");
        let da = registry
            .describe_json(AddConstantDoubleAttribute::CLASS, a)
            .expect("describe");
        let db = registry
            .describe_json(AddConstantDoubleAttribute::CLASS, b)
            .expect("describe");

        let inputs = BTreeMap::from([("vs".to_string(), guid(1))]);
        let ia = OperationInstance::new(da, inputs.clone(), &["attr"]);
        let ib = OperationInstance::new(db, inputs, &["attr"]);
        assert_eq!(ia.guid, ib.guid);
        assert_eq!(ia.output("attr"), ib.output("attr"));
    }

    /// S2.2: A collision under the default policy leaves the original intact.
    #[test]
    fn collision_keeps_original() {
        let store = EntityStore::in_memory();
        sample_graph(&store);
        let err = store
            .put(guid(2), EdgeBundle::new(guid(1), vec![1], vec![0], vec![7]).into())
            .expect_err("different content");
        assert!(matches!(err, SphynxError::Collision(_)));
        assert_eq!(store.edge_bundle(&guid(2)).expect("eb").len(), 2);
    }

    /// S2.3: Two different instances claiming one output guid are refused.
    #[test]
    fn conflicting_output_claims_refused() {
        let honest = example_instance();
        let mut forged = OperationInstance::new(
            ReverseEdges::describe(&NoParams {}).expect("describe"),
            BTreeMap::from([("es".to_string(), guid(9))]),
            &["reversed"],
        );
        forged.outputs = honest.outputs.clone();
        // Forged outputs no longer match the derivation.
        assert!(matches!(
            Dag::new([honest, forged]),
            Err(SphynxError::GuidMismatch { .. })
        ));
    }
}

// =============================================================================
// TIER S3: EXECUTION
// =============================================================================

mod s3_execution {
    use super::*;

    /// S3.1: A DAG runs in dependency order and a rerun is fully cached.
    #[test]
    fn dag_runs_then_caches() {
        let store = EntityStore::in_memory();
        let registry = Registry::with_builtins();
        let root = example_instance();
        let vertices = root.output("vertices").expect("vertices");
        let edges = root.output("edges").expect("edges");

        let reverse = OperationInstance::new(
            ReverseEdges::describe(&NoParams {}).expect("describe"),
            BTreeMap::from([("es".to_string(), edges)]),
            &["reversed"],
        );
        let constant = OperationInstance::new(
            AddConstantDoubleAttribute::describe(&ConstantParams { value: 1.0 })
                .expect("describe"),
            BTreeMap::from([("vs".to_string(), vertices)]),
            &["attr"],
        );
        let dag = Dag::new([reverse.clone(), constant.clone(), root.clone()]).expect("dag");

        let executor = Executor::new(&store, &registry);
        let first = executor.run(&dag).expect("first run");
        assert_eq!(first.computed(), 3);

        let reversed = store
            .edge_bundle(&reverse.output("reversed").expect("out"))
            .expect("reversed");
        let original = store.edge_bundle(&edges).expect("edges");
        assert_eq!(reversed.src, original.dst);
        assert_eq!(reversed.dst, original.src);
        assert_eq!(reversed.edge_mapping, original.edge_mapping);

        let ones = store
            .double_attribute(&constant.output("attr").expect("out"))
            .expect("attr");
        assert_eq!(ones.defined_count(), 4);

        let second = executor.run(&dag).expect("second run");
        assert_eq!(second.cached(), 3);
        assert_eq!(second.computed(), 0);
    }

    /// S3.2: With persistence on, a new process sees the outputs as cached.
    #[test]
    fn persisted_outputs_are_cached_across_stores() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = StoreConfig::rooted_at(dir.path()).persistent();
        let registry = Registry::with_builtins();
        let root = example_instance();

        {
            let store = EntityStore::new(config.clone()).expect("store");
            let outcome = Executor::new(&store, &registry)
                .execute(&root)
                .expect("execute");
            assert_eq!(outcome, ExecOutcome::Computed);
        }

        let store = EntityStore::new(config).expect("reopen");
        let catalog = store.catalog().expect("catalog");
        assert_eq!(catalog.instances().expect("instances"), vec![root.clone()]);
        let entry = catalog
            .entity(root.output("edges").expect("edges"))
            .expect("read")
            .expect("recorded");
        assert_eq!(entry.producer, Some(root.guid));

        let outcome = Executor::new(&store, &registry)
            .execute(&root)
            .expect("execute");
        assert_eq!(outcome, ExecOutcome::Cached);

        let rebuilt = Dag::new(catalog.instances().expect("instances")).expect("dag");
        assert_eq!(rebuilt.len(), 1);
    }

    /// S3.3: A downstream instance waiting on a missing input is retryable.
    #[test]
    fn missing_upstream_is_retryable() {
        let store = EntityStore::in_memory();
        let registry = Registry::with_builtins();
        let root = example_instance();
        let reverse = OperationInstance::new(
            ReverseEdges::describe(&NoParams {}).expect("describe"),
            BTreeMap::from([("es".to_string(), root.output("edges").expect("edges"))]),
            &["reversed"],
        );
        let executor = Executor::new(&store, &registry);

        let err = executor.execute(&reverse).expect_err("upstream not run");
        assert!(err.is_retryable());

        executor.execute(&root).expect("upstream");
        assert_eq!(
            executor.execute(&reverse).expect("retry"),
            ExecOutcome::Computed
        );
    }

    /// S3.4: A tampered instance never runs.
    #[test]
    fn tampered_instance_refused() {
        let store = EntityStore::in_memory();
        let registry = Registry::with_builtins();
        let mut tampered = example_instance();
        tampered.operation.class = ReverseEdges::CLASS.to_string();

        let err = Executor::new(&store, &registry)
            .execute(&tampered)
            .expect_err("guid mismatch");
        assert!(matches!(err, SphynxError::GuidMismatch { .. }));
        assert!(store.is_empty());
    }
}

// =============================================================================
// TIER S4: UNORDERED STAGING
// =============================================================================

mod s4_unordered {
    use super::*;

    /// S4.1: Export then import reproduces positions for sorted inputs.
    #[test]
    fn sorted_graph_survives_unordered_roundtrip() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = StoreConfig::rooted_at(dir.path());
        let store = EntityStore::new(config.clone()).expect("store");
        sample_graph(&store);
        let attr = DoubleAttribute::new(guid(1), vec![1.5, 0.0, 3.25], vec![true, false, true]);
        store.put(guid(3), attr.into()).expect("attr");
        for g in [guid(1), guid(2), guid(3)] {
            store.export_unordered(&g).expect("export");
        }

        let fresh = EntityStore::new(config).expect("fresh");
        for g in [guid(2), guid(3)] {
            let imported = fresh.import_unordered(&g).expect("import");
            assert!(imported.same_content(&store.get(&g).expect("original")));
        }
        assert_eq!(fresh.len(), 3);
    }

    /// S4.2: Import assigns positions by sorting external ids.
    #[test]
    fn unsorted_vertices_get_sorted_positions() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = StoreConfig::rooted_at(dir.path());
        let store = EntityStore::new(config.clone()).expect("store");
        store
            .put(guid(1), VertexSet::new(vec![30, 10, 20]).into())
            .expect("vs");
        store
            .put(
                guid(2),
                DoubleAttribute::dense(guid(1), vec![3.0, 1.0, 2.0]).into(),
            )
            .expect("attr");
        store.export_unordered(&guid(1)).expect("export vs");
        store.export_unordered(&guid(2)).expect("export attr");

        let fresh = EntityStore::new(config).expect("fresh");
        let Entity::DoubleAttribute(attr) = fresh.import_unordered(&guid(2)).expect("import")
        else {
            unreachable!("double attribute expected");
        };
        assert_eq!(fresh.vertex_set(&guid(1)).expect("vs").mapping(), &[10, 20, 30]);
        assert_eq!(attr.values, vec![1.0, 2.0, 3.0]);
    }
}
