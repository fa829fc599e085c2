//! # CLI Command Implementations
//!
//! This module contains the actual implementations of CLI commands.

use crate::plan::Plan;
use serde_json::{Value, json};
use sphynx_core::{
    Attribute, ColumnValue, Dag, EdgeBundle, Entity, EntityStore, Executor, Guid,
    Registry, SphynxError, StoreConfig, VertexSet,
};
use std::collections::BTreeMap;
use std::path::Path;

fn print_json(output: &Value) {
    println!(
        "{}",
        serde_json::to_string_pretty(output).unwrap_or_default()
    );
}

// =============================================================================
// INIT COMMAND
// =============================================================================

/// Create the data directories and catalog.
///
/// Existing data is kept unless `force` is set, in which case both data
/// roots are wiped first.
pub fn cmd_init(config: &StoreConfig, force: bool) -> Result<(), SphynxError> {
    let roots = [&config.data_dir, &config.unordered_data_dir];
    let populated = roots.iter().any(|root| {
        std::fs::read_dir(root)
            .map(|mut entries| entries.next().is_some())
            .unwrap_or(false)
    });

    if populated {
        if !force {
            return Err(SphynxError::ConfigError(format!(
                "Data already exists at {:?}. Use --force to overwrite.",
                config.data_dir
            )));
        }
        for root in roots {
            if root.exists() {
                std::fs::remove_dir_all(root)?;
            }
        }
        tracing::warn!(data_dir = %config.data_dir.display(), "Wiped existing data");
    }

    for root in roots {
        std::fs::create_dir_all(root)?;
    }
    let store = EntityStore::new(config.clone())?;

    println!("Initialized Sphynx store");
    println!("  Ordered:   {:?}", store.data_dir());
    println!("  Unordered: {:?}", store.unordered_data_dir());
    if store.catalog().is_some() {
        println!("  Catalog:   {:?}", config.catalog_path());
    }
    Ok(())
}

// =============================================================================
// STATUS COMMAND
// =============================================================================

/// Show persisted entities and recorded instances.
pub fn cmd_status(config: &StoreConfig, json_mode: bool) -> Result<(), SphynxError> {
    let store = EntityStore::new(config.clone())?;
    let persisted = store.persisted_guids()?;

    let mut by_kind: BTreeMap<String, usize> = BTreeMap::new();
    let mut instances = None;
    if let Some(catalog) = store.catalog() {
        for entry in catalog.entities()? {
            *by_kind.entry(entry.kind.name().to_string()).or_default() += 1;
        }
        instances = Some(catalog.instances()?.len());
    }

    if json_mode {
        let output = json!({
            "data_dir": config.data_dir.to_string_lossy(),
            "unordered_data_dir": config.unordered_data_dir.to_string_lossy(),
            "collision": config.collision,
            "persist_outputs": config.persist_outputs,
            "persisted_entities": persisted.len(),
            "catalog": store.catalog().is_some(),
            "entities_by_kind": by_kind,
            "instances": instances,
        });
        print_json(&output);
        return Ok(());
    }

    println!("Sphynx Store Status");
    println!("===================");
    println!("Ordered:   {:?}", config.data_dir);
    println!("Unordered: {:?}", config.unordered_data_dir);
    println!("Collision: {:?}", config.collision);
    println!();
    println!("Persisted entities: {}", persisted.len());
    match instances {
        Some(count) => {
            for (kind, n) in &by_kind {
                println!("  {:<24} {}", kind, n);
            }
            println!("Recorded instances: {}", count);
        }
        None => println!("Catalog disabled"),
    }
    Ok(())
}

// =============================================================================
// RUN COMMAND
// =============================================================================

/// Execute a JSON plan and print the output guids of every step.
pub fn cmd_run(config: &StoreConfig, plan_path: &Path, json_mode: bool) -> Result<(), SphynxError> {
    let plan = Plan::read(plan_path)?;
    let registry = Registry::with_builtins();
    let steps = plan.instantiate(&registry)?;

    let dag = Dag::new(steps.iter().map(|s| s.instance.clone()))?;
    let store = EntityStore::new(config.clone())?;
    let report = Executor::new(&store, &registry).run(&dag)?;

    tracing::info!(
        plan = %plan_path.display(),
        computed = report.computed(),
        cached = report.cached(),
        "Plan finished"
    );
    if !config.persist_outputs {
        tracing::warn!("persist_outputs is off: results were not written to disk");
    }

    if json_mode {
        let output: Vec<Value> = steps
            .iter()
            .map(|step| {
                json!({
                    "name": step.name,
                    "class": step.instance.class(),
                    "instance": step.instance.guid,
                    "outcome": report
                        .outcomes
                        .get(&step.instance.guid)
                        .map(|o| format!("{:?}", o)),
                    "outputs": step.instance.outputs,
                })
            })
            .collect();
        print_json(&json!({
            "computed": report.computed(),
            "cached": report.cached(),
            "steps": output,
        }));
        return Ok(());
    }

    println!(
        "Plan complete: {} computed, {} cached",
        report.computed(),
        report.cached()
    );
    for step in &steps {
        let outcome = report
            .outcomes
            .get(&step.instance.guid)
            .map(|o| format!("{:?}", o))
            .unwrap_or_default();
        println!();
        println!("{} ({}) [{}]", step.name, step.instance.class(), outcome);
        for (slot, guid) in &step.instance.outputs {
            println!("  {:<12} {}", slot, guid);
        }
    }
    Ok(())
}

// =============================================================================
// SHOW COMMAND
// =============================================================================

/// Load one entity and print up to `limit` rows in external-id terms.
pub fn cmd_show(
    config: &StoreConfig,
    guid: Guid,
    limit: usize,
    json_mode: bool,
) -> Result<(), SphynxError> {
    let store = EntityStore::new(config.clone())?;
    let entity = store.get_or_load(&guid)?;
    let rows = preview(&store, &entity, limit)?;
    let references: Vec<String> = entity.references().iter().map(Guid::to_hex).collect();

    if json_mode {
        print_json(&json!({
            "guid": guid,
            "kind": entity.kind().name(),
            "len": entity.len(),
            "references": references,
            "rows": rows,
        }));
        return Ok(());
    }

    println!("Entity {}", guid);
    println!("Kind: {}", entity.kind());
    println!("Len:  {}", entity.len());
    for reference in &references {
        println!("Vertex set: {}", reference);
    }
    println!();
    for row in &rows {
        println!("  {}", row);
    }
    if entity.len() > limit {
        println!("  ... (first {} of {} rows)", limit, entity.len());
    }
    Ok(())
}

/// First `limit` rows of `entity`, keyed by external ids.
///
/// Attributes only list defined positions.
pub fn preview(store: &EntityStore, entity: &Entity, limit: usize) -> Result<Vec<Value>, SphynxError> {
    Ok(match entity {
        Entity::VertexSet(vs) => vs
            .mapping()
            .iter()
            .take(limit)
            .map(|id| json!({ "id": id }))
            .collect(),
        Entity::EdgeBundle(eb) => edge_rows(store, eb, limit)?,
        Entity::DoubleAttribute(a) => attribute_rows(store, a, limit, |v| json!(v))?,
        Entity::StringAttribute(a) => attribute_rows(store, a, limit, |v| json!(v))?,
        Entity::DoubleTuple2Attribute(a) => {
            attribute_rows(store, a, limit, |&(x, y)| json!([x, y]))?
        }
    })
}

fn edge_rows(store: &EntityStore, eb: &EdgeBundle, limit: usize) -> Result<Vec<Value>, SphynxError> {
    let src_vs = store.vertex_set(&eb.src_vertex_set)?;
    let dst_vs = store.vertex_set(&eb.dst_vertex_set)?;
    Ok(eb
        .iter()
        .take(limit)
        .map(|(src, dst, id)| {
            json!({
                "id": id,
                "src": external(&src_vs, src),
                "dst": external(&dst_vs, dst),
            })
        })
        .collect())
}

fn attribute_rows<T: ColumnValue>(
    store: &EntityStore,
    attribute: &Attribute<T>,
    limit: usize,
    render: impl Fn(&T) -> Value,
) -> Result<Vec<Value>, SphynxError> {
    let vs = store.vertex_set(&attribute.vertex_set)?;
    Ok(attribute
        .iter_defined()
        .take(limit)
        .map(|(position, value)| json!({ "id": external(&vs, position), "value": render(value) }))
        .collect())
}

fn external(vs: &VertexSet, position: usize) -> Value {
    vs.external_id(position).map_or(Value::Null, Value::from)
}

// =============================================================================
// UNORDERED STAGING COMMANDS
// =============================================================================

/// Write `guid` to the unordered staging area.
pub fn cmd_export_unordered(config: &StoreConfig, guid: Guid) -> Result<(), SphynxError> {
    let store = EntityStore::new(config.clone())?;
    let path = store.export_unordered(&guid)?;
    println!("Exported {} to {:?}", guid, path);
    Ok(())
}

/// Import `guid` from the unordered staging area and persist it.
pub fn cmd_import_unordered(config: &StoreConfig, guid: Guid) -> Result<(), SphynxError> {
    let store = EntityStore::new(config.clone())?;
    let entity = store.import_unordered(&guid)?;
    let path = store.persist(&guid)?;
    println!(
        "Imported {} ({}, {} rows) to {:?}",
        guid,
        entity.kind(),
        entity.len(),
        path
    );
    Ok(())
}

// =============================================================================
// PURGE COMMAND
// =============================================================================

/// Delete `guid` from `data_dir` and the catalog.
pub fn cmd_purge(config: &StoreConfig, guid: Guid) -> Result<(), SphynxError> {
    let store = EntityStore::new(config.clone())?;
    if store.purge(&guid)? {
        println!("Purged {}", guid);
    } else {
        println!("Nothing stored under {}", guid);
    }
    Ok(())
}

// =============================================================================
// CLASSES COMMAND
// =============================================================================

/// List registered operation classes.
pub fn cmd_classes(json_mode: bool) -> Result<(), SphynxError> {
    let classes = Registry::with_builtins().classes();
    if json_mode {
        print_json(&json!(classes));
        return Ok(());
    }
    for class in classes {
        println!("{}", class);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sphynx_core::DoubleAttribute;

    #[test]
    fn preview_uses_external_ids() {
        let store = EntityStore::in_memory();
        let vs = Guid([1; 32]);
        store
            .put(vs, VertexSet::new(vec![100, 200, 300]).into())
            .expect("vs");
        let attr: Entity =
            DoubleAttribute::new(vs, vec![1.5, 0.0, 3.25], vec![true, false, true]).into();
        let eb: Entity = EdgeBundle::new(vs, vec![0, 1], vec![1, 2], vec![7, 8]).into();

        let rows = preview(&store, &attr, 10).expect("attr rows");
        assert_eq!(
            rows,
            vec![
                json!({ "id": 100, "value": 1.5 }),
                json!({ "id": 300, "value": 3.25 })
            ]
        );

        let rows = preview(&store, &eb, 1).expect("edge rows");
        assert_eq!(rows, vec![json!({ "id": 7, "src": 100, "dst": 200 })]);
    }
}
