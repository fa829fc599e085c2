//! # CLI Integration Tests
//!
//! Drives the command implementations against a temporary store.

#![allow(clippy::unwrap_used, clippy::panic)]

use sphynx::cli::{
    cmd_classes, cmd_export_unordered, cmd_import_unordered, cmd_init, cmd_purge, cmd_run,
    cmd_show, cmd_status,
};
use sphynx::config::{self, Overrides};
use sphynx::plan::Plan;
use sphynx_core::{
    DoubleAttribute, EntityStore, ExecOutcome, Executor, Registry, SphynxError, StoreConfig,
};
use std::path::Path;
use tempfile::TempDir;

const PLAN: &str = r#"{
    "steps": [
        { "name": "g", "class": "ExampleGraph",
          "outputs": ["vertices", "edges", "name", "age", "gender", "income", "location"] },
        { "name": "rev", "class": "ReverseEdges",
          "inputs": { "es": "g.edges" }, "outputs": ["reversed"] },
        { "name": "label", "class": "AddConstantStringAttribute",
          "params": { "value": "person" },
          "inputs": { "vs": "g.vertices" }, "outputs": ["attr"] }
    ]
}"#;

fn setup() -> (TempDir, StoreConfig) {
    let dir = tempfile::tempdir().expect("tempdir");
    let overrides = Overrides {
        data_dir: Some(dir.path().join("ordered")),
        unordered_data_dir: Some(dir.path().join("unordered")),
    };
    let config = config::from_toml("", &overrides).expect("config");
    (dir, config)
}

fn write_plan(dir: &Path) -> std::path::PathBuf {
    let path = dir.join("plan.json");
    std::fs::write(&path, PLAN).expect("write plan");
    path
}

#[test]
fn init_creates_roots_and_refuses_to_clobber() {
    let (_dir, config) = setup();
    cmd_init(&config, false).expect("init");
    assert!(config.data_dir.is_dir());
    assert!(config.unordered_data_dir.is_dir());
    assert!(config.catalog_path().is_file());

    let err = cmd_init(&config, false).expect_err("catalog already there");
    assert!(matches!(err, SphynxError::ConfigError(_)));
    cmd_init(&config, true).expect("forced");
}

#[test]
fn run_persists_every_output_and_reruns_from_cache() {
    let (dir, config) = setup();
    let plan_path = write_plan(dir.path());
    cmd_run(&config, &plan_path, true).expect("first run");

    let registry = Registry::with_builtins();
    let steps = Plan::read(&plan_path)
        .expect("plan")
        .instantiate(&registry)
        .expect("instantiate");

    let store = EntityStore::new(config.clone()).expect("store");
    for step in &steps {
        for guid in step.instance.outputs.values() {
            assert!(store.has_persisted(guid), "{} not persisted", guid);
        }
        let outcome = Executor::new(&store, &registry)
            .execute(&step.instance)
            .expect("execute");
        assert_eq!(outcome, ExecOutcome::Cached);
    }
    let catalog = store.catalog().expect("catalog");
    assert_eq!(catalog.instances().expect("instances").len(), steps.len());
    drop(store);

    cmd_run(&config, &plan_path, false).expect("second run");
    cmd_status(&config, true).expect("status");
}

#[test]
fn show_and_unordered_roundtrip() {
    let (dir, config) = setup();
    let plan_path = write_plan(dir.path());
    cmd_run(&config, &plan_path, false).expect("run");

    let steps = Plan::read(&plan_path)
        .expect("plan")
        .instantiate(&Registry::with_builtins())
        .expect("instantiate");
    let vertices = steps[0].instance.output("vertices").expect("vertices");
    let income = steps[0].instance.output("income").expect("income");
    cmd_show(&config, income, 2, false).expect("show");
    cmd_show(&config, income, 10, true).expect("show json");

    cmd_export_unordered(&config, vertices).expect("export vertices");
    cmd_export_unordered(&config, income).expect("export income");
    std::fs::remove_dir_all(&config.data_dir).expect("wipe ordered");

    cmd_import_unordered(&config, income).expect("import");
    let store = EntityStore::new(config).expect("store");
    assert!(store.has_persisted(&income));
    let attr = store
        .get_or_load(&income)
        .and_then(|entity| entity.downcast::<DoubleAttribute>(income))
        .expect("reloaded");
    assert_eq!(attr.defined, vec![true, false, true, false]);
}

#[test]
fn purge_then_rerun_recomputes() {
    let (dir, config) = setup();
    let plan_path = write_plan(dir.path());
    cmd_run(&config, &plan_path, false).expect("run");

    let steps = Plan::read(&plan_path)
        .expect("plan")
        .instantiate(&Registry::with_builtins())
        .expect("instantiate");
    let reversed = steps[1].instance.output("reversed").expect("reversed");
    cmd_purge(&config, reversed).expect("purge");

    let store = EntityStore::new(config.clone()).expect("store");
    assert!(!store.has_persisted(&reversed));
    let catalog = store.catalog().expect("catalog");
    assert!(catalog.entity(reversed).expect("read").is_none());
    drop(store);

    cmd_purge(&config, reversed).expect("purge twice");
    cmd_run(&config, &plan_path, false).expect("rerun");
    let store = EntityStore::new(config).expect("store");
    assert!(store.has_persisted(&reversed));
}

#[test]
fn show_unknown_guid_is_missing() {
    let (_dir, config) = setup();
    let err = cmd_show(&config, sphynx_core::Guid([5; 32]), 10, false).expect_err("absent");
    assert!(matches!(err, SphynxError::MissingEntity(_)));
    assert!(err.is_retryable());
}

#[test]
fn classes_lists_builtins() {
    cmd_classes(true).expect("classes");
    let classes = Registry::with_builtins().classes();
    assert!(classes.contains(&"ExampleGraph"));
    assert!(classes.contains(&"ReverseEdges"));
}
