//! # Operation Registry
//!
//! Maps class tags to operations. Each operation declares a typed parameter
//! struct; the registry is where untyped parameters (JSON from a plan file)
//! are checked against that struct and turned into canonical [`Params`].
//!
//! Operations never see the store. They receive an [`OpContext`] holding
//! their resolved inputs and hand their outputs back through it.

use crate::entity::{
    DoubleAttribute, DoubleTuple2Attribute, EdgeBundle, Entity, EntityVariant, StringAttribute,
    VertexSet,
};
use crate::operation::{OperationDescription, OperationInstance, Params};
use crate::{Guid, SphynxError};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use std::sync::Arc;

// =============================================================================
// OPERATION TRAIT
// =============================================================================

/// A computation the executor can run.
pub trait Operation: Send + Sync + 'static {
    /// Class tag used in [`OperationDescription::class`].
    const CLASS: &'static str;

    /// Parameter schema for this class.
    type Params: Serialize + DeserializeOwned;

    /// Read inputs from `ctx` and write every declared output into it.
    fn execute(&self, params: Self::Params, ctx: &mut OpContext) -> Result<(), SphynxError>;

    /// Describe an invocation of this class with typed parameters.
    fn describe(params: &Self::Params) -> Result<OperationDescription, SphynxError> {
        OperationDescription::new(Self::CLASS, params)
    }
}

/// Object-safe face of [`Operation`], so differently typed operations can
/// share one registry.
trait DynOperation: Send + Sync {
    fn canonical_params(&self, json: serde_json::Value) -> Result<Params, SphynxError>;
    fn params_json(&self, params: &Params) -> Result<serde_json::Value, SphynxError>;
    fn run(&self, params: &Params, ctx: &mut OpContext) -> Result<(), SphynxError>;
}

impl<O: Operation> DynOperation for O {
    fn canonical_params(&self, json: serde_json::Value) -> Result<Params, SphynxError> {
        let typed: O::Params =
            serde_json::from_value(json).map_err(|e| SphynxError::InvalidParams {
                class: O::CLASS.to_string(),
                reason: e.to_string(),
            })?;
        Params::encode(&typed)
    }

    fn params_json(&self, params: &Params) -> Result<serde_json::Value, SphynxError> {
        let typed: O::Params = params.decode(O::CLASS)?;
        serde_json::to_value(&typed).map_err(|e| SphynxError::SerializationError(e.to_string()))
    }

    fn run(&self, params: &Params, ctx: &mut OpContext) -> Result<(), SphynxError> {
        let typed: O::Params = params.decode(O::CLASS)?;
        self.execute(typed, ctx)
    }
}

// =============================================================================
// REGISTRY
// =============================================================================

/// Class tag -> operation.
#[derive(Default)]
pub struct Registry {
    operations: BTreeMap<&'static str, Box<dyn DynOperation>>,
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("classes", &self.classes())
            .finish()
    }
}

impl Registry {
    /// An empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding every built-in operation.
    #[must_use]
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        crate::ops::register_builtins(&mut registry);
        registry
    }

    /// Register `operation` under its class tag, replacing any previous one.
    pub fn register<O: Operation>(&mut self, operation: O) {
        self.operations.insert(O::CLASS, Box::new(operation));
    }

    /// True when `class` is registered.
    #[must_use]
    pub fn contains(&self, class: &str) -> bool {
        self.operations.contains_key(class)
    }

    /// Registered class tags, sorted.
    #[must_use]
    pub fn classes(&self) -> Vec<&'static str> {
        self.operations.keys().copied().collect()
    }

    /// Describe `class` with parameters given as JSON.
    ///
    /// The JSON is decoded into the class's parameter struct and re-encoded
    /// canonically, so key order and formatting never affect guids.
    pub fn describe_json(
        &self,
        class: &str,
        params: serde_json::Value,
    ) -> Result<OperationDescription, SphynxError> {
        let operation = self.lookup(class)?;
        Ok(OperationDescription {
            class: class.to_string(),
            params: operation.canonical_params(params)?,
        })
    }

    /// Render the canonical parameters of `description` back as JSON.
    pub fn params_json(
        &self,
        description: &OperationDescription,
    ) -> Result<serde_json::Value, SphynxError> {
        self.lookup(&description.class)?
            .params_json(&description.params)
    }

    /// Run `description` against `ctx`.
    pub fn run(
        &self,
        description: &OperationDescription,
        ctx: &mut OpContext,
    ) -> Result<(), SphynxError> {
        self.lookup(&description.class)?
            .run(&description.params, ctx)
    }

    fn lookup(&self, class: &str) -> Result<&dyn DynOperation, SphynxError> {
        self.operations
            .get(class)
            .map(Box::as_ref)
            .ok_or_else(|| SphynxError::UnknownOperation(class.to_string()))
    }
}

// =============================================================================
// OPERATION CONTEXT
// =============================================================================

/// What one running instance sees: resolved inputs and an output sink.
#[derive(Debug)]
pub struct OpContext {
    class: String,
    inputs: BTreeMap<String, (Guid, Entity)>,
    output_guids: BTreeMap<String, Guid>,
    outputs: BTreeMap<String, Entity>,
}

impl OpContext {
    /// Context for `instance` with its inputs already resolved.
    #[must_use]
    pub fn new(instance: &OperationInstance, inputs: BTreeMap<String, (Guid, Entity)>) -> Self {
        Self {
            class: instance.class().to_string(),
            inputs,
            output_guids: instance.outputs.clone(),
            outputs: BTreeMap::new(),
        }
    }

    /// Guid bound to input `slot`.
    pub fn input_guid(&self, slot: &str) -> Result<Guid, SphynxError> {
        self.slot(slot).map(|(guid, _)| *guid)
    }

    /// Input `slot` narrowed to one concrete type.
    pub fn typed_input<T: EntityVariant>(&self, slot: &str) -> Result<Arc<T>, SphynxError> {
        let (guid, entity) = self.slot(slot)?;
        entity.downcast(*guid)
    }

    pub fn vertex_set(&self, slot: &str) -> Result<Arc<VertexSet>, SphynxError> {
        self.typed_input(slot)
    }

    pub fn edge_bundle(&self, slot: &str) -> Result<Arc<EdgeBundle>, SphynxError> {
        self.typed_input(slot)
    }

    pub fn double_attribute(&self, slot: &str) -> Result<Arc<DoubleAttribute>, SphynxError> {
        self.typed_input(slot)
    }

    pub fn string_attribute(&self, slot: &str) -> Result<Arc<StringAttribute>, SphynxError> {
        self.typed_input(slot)
    }

    pub fn double_tuple2_attribute(
        &self,
        slot: &str,
    ) -> Result<Arc<DoubleTuple2Attribute>, SphynxError> {
        self.typed_input(slot)
    }

    /// Guid the output `slot` will be published under.
    ///
    /// Outputs that refer to a vertex set produced by the same instance use
    /// this to name it.
    pub fn output_guid(&self, slot: &str) -> Result<Guid, SphynxError> {
        self.output_guids
            .get(slot)
            .copied()
            .ok_or_else(|| SphynxError::UnexpectedOutput {
                class: self.class.clone(),
                slot: slot.to_string(),
            })
    }

    /// Hand over output `slot`. Returns the guid it will be published under.
    pub fn output(&mut self, slot: &str, entity: impl Into<Entity>) -> Result<Guid, SphynxError> {
        let guid = self.output_guid(slot)?;
        self.outputs.insert(slot.to_string(), entity.into());
        Ok(guid)
    }

    /// Produced outputs, checked against the declared slots.
    pub(crate) fn into_outputs(self) -> Result<Vec<(String, Guid, Entity)>, SphynxError> {
        if let Some(slot) = self
            .output_guids
            .keys()
            .find(|slot| !self.outputs.contains_key(*slot))
        {
            return Err(SphynxError::MissingOutput {
                class: self.class,
                slot: slot.clone(),
            });
        }
        let mut produced = Vec::with_capacity(self.outputs.len());
        for (slot, entity) in self.outputs {
            let guid = self.output_guids.get(&slot).copied().ok_or_else(|| {
                SphynxError::UnexpectedOutput {
                    class: self.class.clone(),
                    slot: slot.clone(),
                }
            })?;
            produced.push((slot, guid, entity));
        }
        Ok(produced)
    }

    fn slot(&self, slot: &str) -> Result<&(Guid, Entity), SphynxError> {
        self.inputs
            .get(slot)
            .ok_or_else(|| SphynxError::OperationFailed {
                class: self.class.clone(),
                reason: format!("no input bound to slot '{}'", slot),
            })
    }
}

// =============================================================================
// TESTS
// =============================================================================
