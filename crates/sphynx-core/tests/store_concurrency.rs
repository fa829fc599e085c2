//! # Concurrency Tests
//!
//! Many threads sharing one `EntityStore`, in memory and on disk.

#![allow(clippy::unwrap_used, clippy::panic)]

use sphynx_core::ops::{AddConstantDoubleAttribute, ConstantParams, ExampleGraph, NoParams};
use sphynx_core::{
    Dag, DoubleAttribute, Entity, EntityStore, ExecOutcome, Executor, Guid, Operation,
    OperationInstance, Registry, SphynxError, StoreConfig, VertexSet,
};
use std::collections::BTreeMap;
use std::sync::{Arc, Barrier};

const THREADS: usize = 8;
const PER_THREAD: usize = 64;
const VS: Guid = Guid([1; 32]);

fn nth_guid(thread: usize, i: usize) -> Guid {
    let mut bytes = [0u8; 32];
    bytes[0] = thread as u8;
    bytes[1..9].copy_from_slice(&(i as u64).to_le_bytes());
    bytes[31] = 0xcc;
    Guid(bytes)
}

#[test]
fn parallel_puts_lose_nothing() {
    let store = EntityStore::in_memory();
    store
        .put(VS, VertexSet::new(vec![10, 20]).into())
        .expect("vs");

    std::thread::scope(|scope| {
        for thread in 0..THREADS {
            let store = &store;
            scope.spawn(move || {
                for i in 0..PER_THREAD {
                    let attr = DoubleAttribute::dense(VS, vec![thread as f64, i as f64]);
                    store.put(nth_guid(thread, i), attr.into()).expect("put");
                }
            });
        }
    });

    assert_eq!(store.len(), THREADS * PER_THREAD + 1);

    std::thread::scope(|scope| {
        for thread in 0..THREADS {
            let store = &store;
            scope.spawn(move || {
                for i in 0..PER_THREAD {
                    let attr = store
                        .double_attribute(&nth_guid(thread, i))
                        .expect("present");
                    assert_eq!(attr.values, vec![thread as f64, i as f64]);
                }
            });
        }
    });
}

#[test]
fn racing_writers_of_one_guid_agree_on_one_payload() {
    let store = EntityStore::in_memory();
    store
        .put(VS, VertexSet::new(vec![10, 20]).into())
        .expect("vs");
    let target = Guid([7; 32]);

    let results: Vec<Result<Entity, SphynxError>> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                let store = &store;
                scope.spawn(move || {
                    let attr = DoubleAttribute::dense(VS, vec![1.0, 2.0]);
                    store.put(target, attr.into())
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|h| h.join().expect("thread"))
            .collect()
    });

    let published: Vec<Entity> = results
        .into_iter()
        .map(|r| r.expect("identical content never collides"))
        .collect();
    let Entity::DoubleAttribute(first) = &published[0] else {
        unreachable!("double attribute expected");
    };
    for entity in &published {
        let Entity::DoubleAttribute(attr) = entity else {
            unreachable!("double attribute expected");
        };
        assert!(Arc::ptr_eq(first, attr));
    }
}

#[test]
fn concurrent_executors_compute_once_or_cache() {
    let store = EntityStore::in_memory();
    let registry = Registry::with_builtins();
    let description = ExampleGraph::describe(&NoParams {}).expect("describe");
    let instance = OperationInstance::new(description, BTreeMap::new(), ExampleGraph::OUTPUTS);

    std::thread::scope(|scope| {
        for _ in 0..THREADS {
            let (store, registry, instance) = (&store, &registry, &instance);
            scope.spawn(move || {
                Executor::new(store, registry)
                    .execute(instance)
                    .expect("identical outputs never collide");
            });
        }
    });

    assert_eq!(store.len(), ExampleGraph::OUTPUTS.len());
}

#[test]
fn parallel_persists_of_one_guid_all_succeed() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store =
        EntityStore::new(StoreConfig::rooted_at(dir.path()).persistent()).expect("store");

    for round in 0..20u8 {
        let guid = Guid([round; 32]);
        store
            .put(guid, VertexSet::new(vec![100, 200, 300 + i64::from(round)]).into())
            .expect("vs");
        let barrier = Barrier::new(THREADS);
        std::thread::scope(|scope| {
            for _ in 0..THREADS {
                let (store, barrier) = (&store, &barrier);
                scope.spawn(move || {
                    barrier.wait();
                    store.persist(&guid).expect("persist");
                    assert!(store.has_persisted(&guid));
                });
            }
        });
    }

    let fresh = EntityStore::new(StoreConfig::rooted_at(dir.path())).expect("reopen");
    assert_eq!(fresh.persisted_guids().expect("list").len(), 20);
    for round in 0..20u8 {
        let loaded = fresh.get_or_load(&Guid([round; 32])).expect("load");
        assert_eq!(loaded.len(), 3);
    }
    let staging_left = std::fs::read_dir(fresh.data_dir())
        .expect("read data dir")
        .filter_map(Result::ok)
        .filter(|entry| entry.file_name().to_string_lossy().starts_with('.'))
        .count();
    assert_eq!(staging_left, 0);
}

#[test]
fn persistent_wave_over_shared_vertex_set() {
    let registry = Registry::with_builtins();

    for _ in 0..10 {
        let dir = tempfile::tempdir().expect("tempdir");
        let store =
            EntityStore::new(StoreConfig::rooted_at(dir.path()).persistent()).expect("store");
        // Known in memory only: every instance of the wave persists it.
        store
            .put(VS, VertexSet::new(vec![10, 20, 30]).into())
            .expect("vs");

        let instances: Vec<OperationInstance> = (0..THREADS)
            .map(|i| {
                let params = ConstantParams { value: i as f64 };
                let description = AddConstantDoubleAttribute::describe(&params).expect("describe");
                let inputs = BTreeMap::from([("vs".to_string(), VS)]);
                OperationInstance::new(description, inputs, &["attr"])
            })
            .collect();
        let dag = Dag::new(instances.clone()).expect("dag");
        assert_eq!(dag.waves().expect("waves").len(), 1);

        let report = Executor::new(&store, &registry).run(&dag).expect("run");
        assert_eq!(report.computed(), THREADS);
        assert!(store.has_persisted(&VS));

        let catalog = store.catalog().expect("catalog");
        assert_eq!(catalog.instances().expect("instances").len(), THREADS);

        let fresh = EntityStore::new(StoreConfig::rooted_at(dir.path())).expect("reopen");
        for (i, instance) in instances.iter().enumerate() {
            let guid = instance.output("attr").expect("attr");
            let attr = fresh
                .get_or_load(&guid)
                .and_then(|entity| entity.downcast::<DoubleAttribute>(guid))
                .expect("persisted attribute");
            assert_eq!(attr.values, vec![i as f64; 3]);
        }

        let rerun = Executor::new(&fresh, &registry).run(&dag).expect("rerun");
        assert_eq!(rerun.cached(), THREADS);
        assert!(rerun.outcomes.values().all(|o| *o == ExecOutcome::Cached));
    }
}
