//! # Executor
//!
//! Runs operation instances against an [`EntityStore`]:
//!
//! 1. verify the instance's guids against its content
//! 2. skip the work if every output is already in memory or on disk
//! 3. resolve inputs (`MissingInput` if one does not exist yet)
//! 4. run the registered operation
//! 5. check the produced slots against the declared ones
//! 6. publish outputs, vertex sets first
//! 7. persist outputs and record them in the catalog, when enabled
//!
//! [`Executor::run`] executes a whole [`Dag`] wave by wave; instances within
//! a wave run on scoped threads.

use crate::dag::Dag;
use crate::operation::OperationInstance;
use crate::registry::{OpContext, Registry};
use crate::store::EntityStore;
use crate::{Guid, SphynxError};
use std::collections::BTreeMap;

/// What [`Executor::execute`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecOutcome {
    /// Every output already existed; nothing ran.
    Cached,
    /// The operation ran and its outputs were published.
    Computed,
}

/// Outcome per instance of one [`Executor::run`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    pub outcomes: BTreeMap<Guid, ExecOutcome>,
}

impl RunReport {
    /// Instances served from the cache.
    #[must_use]
    pub fn cached(&self) -> usize {
        self.count(ExecOutcome::Cached)
    }

    /// Instances that actually ran.
    #[must_use]
    pub fn computed(&self) -> usize {
        self.count(ExecOutcome::Computed)
    }

    fn count(&self, outcome: ExecOutcome) -> usize {
        self.outcomes.values().filter(|&&o| o == outcome).count()
    }
}

/// Binds a store to a registry.
#[derive(Debug, Clone, Copy)]
pub struct Executor<'a> {
    store: &'a EntityStore,
    registry: &'a Registry,
}

impl<'a> Executor<'a> {
    #[must_use]
    pub fn new(store: &'a EntityStore, registry: &'a Registry) -> Self {
        Self { store, registry }
    }

    /// Run one instance, or confirm its outputs are already available.
    pub fn execute(&self, instance: &OperationInstance) -> Result<ExecOutcome, SphynxError> {
        instance.verify()?;

        if self.is_cached(instance) {
            tracing::debug!(instance = %instance.guid, class = instance.class(), "Cache hit");
            return Ok(ExecOutcome::Cached);
        }

        let mut inputs = BTreeMap::new();
        for (slot, guid) in &instance.inputs {
            let entity = self.store.get_or_load(guid).map_err(|e| match e {
                SphynxError::MissingEntity(missing) if missing == *guid => {
                    SphynxError::MissingInput {
                        slot: slot.clone(),
                        guid: *guid,
                    }
                }
                other => other,
            })?;
            inputs.insert(slot.clone(), (*guid, entity));
        }

        let mut ctx = OpContext::new(instance, inputs);
        self.registry.run(&instance.operation, &mut ctx)?;
        let mut outputs = ctx.into_outputs()?;
        outputs.sort_by_key(|(_, _, entity)| entity.publish_rank());

        for (_, guid, entity) in &outputs {
            self.store.put(*guid, entity.clone())?;
        }

        if self.store.config().persist_outputs {
            for (_, guid, _) in &outputs {
                self.store.persist_from(guid, Some(instance.guid))?;
            }
            if let Some(catalog) = self.store.catalog() {
                catalog.record_instance(instance)?;
            }
        }

        tracing::info!(
            instance = %instance.guid,
            class = instance.class(),
            outputs = outputs.len(),
            "Computed instance"
        );
        Ok(ExecOutcome::Computed)
    }

    /// Run every instance of `dag` in dependency order.
    ///
    /// Each wave runs concurrently. If any instance in a wave fails, the
    /// whole wave is still joined and the first error (in guid order) is
    /// returned; later waves do not start.
    pub fn run(&self, dag: &Dag) -> Result<RunReport, SphynxError> {
        let mut report = RunReport::default();
        for (index, wave) in dag.waves()?.into_iter().enumerate() {
            tracing::debug!(wave = index, instances = wave.len(), "Starting wave");
            let results: Vec<(Guid, Result<ExecOutcome, SphynxError>)> =
                std::thread::scope(|scope| {
                    let handles: Vec<_> = wave
                        .iter()
                        .map(|&instance| (instance, scope.spawn(move || self.execute(instance))))
                        .collect();
                    handles
                        .into_iter()
                        .map(|(instance, handle)| {
                            let result = handle.join().unwrap_or_else(|_| {
                                Err(SphynxError::OperationFailed {
                                    class: instance.class().to_string(),
                                    reason: "operation panicked".to_string(),
                                })
                            });
                            (instance.guid, result)
                        })
                        .collect()
                });

            for (guid, result) in results {
                report.outcomes.insert(guid, result?);
            }
        }
        Ok(report)
    }

    fn is_cached(&self, instance: &OperationInstance) -> bool {
        !instance.outputs.is_empty()
            && instance
                .outputs
                .values()
                .all(|guid| self.store.has(guid) || self.store.has_persisted(guid))
    }
}
