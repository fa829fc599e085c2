//! # Instance DAG
//!
//! The implicit graph over operation instances: instance X depends on
//! instance Y when one of X's input guids is one of Y's output guids.
//!
//! Guids are derived from inputs, so a well-formed set of instances is
//! acyclic by construction. [`Dag::waves`] still checks, because instances
//! can arrive from plan files or a catalog.

use crate::operation::OperationInstance;
use crate::{Guid, SphynxError};
use std::collections::{BTreeMap, BTreeSet};

/// A verified, collision-free set of instances.
#[derive(Debug, Clone, Default)]
pub struct Dag {
    instances: BTreeMap<Guid, OperationInstance>,
    /// Output guid -> producing instance guid.
    producers: BTreeMap<Guid, Guid>,
}

impl Dag {
    /// Build a DAG from `instances`.
    ///
    /// Every instance is verified. Repeated identical instances collapse into
    /// one.
    ///
    /// # Errors
    ///
    /// - `GuidMismatch` for an instance whose guids do not match its content
    /// - `Collision` when two different instances claim the same guid or the
    ///   same output guid
    pub fn new(
        instances: impl IntoIterator<Item = OperationInstance>,
    ) -> Result<Self, SphynxError> {
        let mut dag = Self::default();
        for instance in instances {
            instance.verify()?;
            if let Some(existing) = dag.instances.get(&instance.guid) {
                if *existing == instance {
                    continue;
                }
                return Err(SphynxError::Collision(instance.guid));
            }
            for output in instance.outputs.values() {
                if dag.producers.insert(*output, instance.guid).is_some() {
                    return Err(SphynxError::Collision(*output));
                }
            }
            dag.instances.insert(instance.guid, instance);
        }
        Ok(dag)
    }

    /// Number of distinct instances.
    #[must_use]
    pub fn len(&self) -> usize {
        self.instances.len()
    }

    /// True when there are no instances.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    /// Instance by guid.
    #[must_use]
    pub fn get(&self, guid: &Guid) -> Option<&OperationInstance> {
        self.instances.get(guid)
    }

    /// Instances in guid order.
    pub fn instances(&self) -> impl Iterator<Item = &OperationInstance> {
        self.instances.values()
    }

    /// Instances in this DAG whose outputs `instance` consumes.
    #[must_use]
    pub fn dependencies(&self, instance: &OperationInstance) -> BTreeSet<Guid> {
        instance
            .inputs
            .values()
            .filter_map(|input| self.producers.get(input).copied())
            .collect()
    }

    /// Topological layering (Kahn's algorithm).
    ///
    /// Wave `n` holds every instance whose in-DAG dependencies all sit in
    /// waves `< n`. Instances inside a wave are independent and come in guid
    /// order.
    ///
    /// # Errors
    ///
    /// `Cycle` naming the smallest instance guid left unscheduled.
    pub fn waves(&self) -> Result<Vec<Vec<&OperationInstance>>, SphynxError> {
        let mut pending: BTreeMap<Guid, usize> = BTreeMap::new();
        let mut dependents: BTreeMap<Guid, Vec<Guid>> = BTreeMap::new();
        for (guid, instance) in &self.instances {
            let deps = self.dependencies(instance);
            pending.insert(*guid, deps.len());
            for dep in deps {
                dependents.entry(dep).or_default().push(*guid);
            }
        }

        let mut ready: Vec<Guid> = pending
            .iter()
            .filter(|&(_, &count)| count == 0)
            .map(|(guid, _)| *guid)
            .collect();
        let mut waves = Vec::new();

        while !ready.is_empty() {
            let mut next = BTreeSet::new();
            for guid in &ready {
                for dependent in dependents.get(guid).into_iter().flatten() {
                    if let Some(count) = pending.get_mut(dependent) {
                        *count -= 1;
                        if *count == 0 {
                            next.insert(*dependent);
                        }
                    }
                }
            }
            waves.push(
                ready
                    .iter()
                    .filter_map(|guid| self.instances.get(guid))
                    .collect(),
            );
            ready = next.into_iter().collect();
        }

        if let Some((stuck, _)) = pending.iter().find(|&(_, &count)| count > 0) {
            return Err(SphynxError::Cycle(*stuck));
        }
        Ok(waves)
    }
}
