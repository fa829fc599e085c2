//! # Plans
//!
//! A plan is a JSON list of named steps. Each step becomes one
//! [`OperationInstance`]; an input either names a guid directly or points at
//! an output of an earlier step as `"<step>.<slot>"`.
//!
//! ```json
//! {
//!   "steps": [
//!     { "name": "g", "class": "ExampleGraph",
//!       "outputs": ["vertices", "edges"] },
//!     { "name": "ones", "class": "AddConstantDoubleAttribute",
//!       "params": { "value": 1.0 },
//!       "inputs": { "vs": "g.vertices" }, "outputs": ["attr"] }
//!   ]
//! }
//! ```
//!
//! Only backward references are allowed, so a plan is acyclic as written.

use serde::{Deserialize, Serialize};
use sphynx_core::{Guid, OperationInstance, Registry, SphynxError};
use std::collections::BTreeMap;
use std::path::Path;

/// Maximum plan file size (16 MB).
pub const MAX_PLAN_FILE_SIZE: u64 = 16 * 1024 * 1024;

/// One step of a plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Step {
    pub name: String,
    pub class: String,
    #[serde(default = "empty_params")]
    pub params: serde_json::Value,
    #[serde(default)]
    pub inputs: BTreeMap<String, String>,
    pub outputs: Vec<String>,
}

fn empty_params() -> serde_json::Value {
    serde_json::Value::Object(serde_json::Map::new())
}

/// A parsed plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Plan {
    pub steps: Vec<Step>,
}

/// A step bound to its derived instance.
#[derive(Debug, Clone)]
pub struct PlannedStep {
    pub name: String,
    pub instance: OperationInstance,
}

impl Plan {
    /// Parse a plan from JSON text.
    pub fn from_json(text: &str) -> Result<Self, SphynxError> {
        serde_json::from_str(text)
            .map_err(|e| SphynxError::SerializationError(format!("Invalid plan: {}", e)))
    }

    /// Read and parse a plan file.
    pub fn read(path: &Path) -> Result<Self, SphynxError> {
        let metadata = std::fs::metadata(path).map_err(|e| {
            SphynxError::IoError(format!("Cannot read plan '{}': {}", path.display(), e))
        })?;
        if metadata.len() > MAX_PLAN_FILE_SIZE {
            return Err(SphynxError::SerializationError(format!(
                "Plan size {} bytes exceeds maximum allowed {} bytes",
                metadata.len(),
                MAX_PLAN_FILE_SIZE
            )));
        }
        Self::from_json(&std::fs::read_to_string(path)?)
    }

    /// Derive every step's instance, resolving step references in order.
    pub fn instantiate(&self, registry: &Registry) -> Result<Vec<PlannedStep>, SphynxError> {
        // Step name -> (output slot -> guid)
        let mut by_name: BTreeMap<&str, BTreeMap<String, Guid>> = BTreeMap::new();
        let mut planned: Vec<PlannedStep> = Vec::with_capacity(self.steps.len());

        for step in &self.steps {
            if by_name.contains_key(step.name.as_str()) {
                return Err(plan_error(step, "duplicate step name".to_string()));
            }
            let description = registry.describe_json(&step.class, step.params.clone())?;

            let mut inputs = BTreeMap::new();
            for (slot, reference) in &step.inputs {
                let guid = resolve_reference(reference, &by_name)
                    .map_err(|reason| plan_error(step, format!("input '{}': {}", slot, reason)))?;
                inputs.insert(slot.clone(), guid);
            }

            let instance = OperationInstance::new(description, inputs, &step.outputs);
            by_name.insert(step.name.as_str(), instance.outputs.clone());
            planned.push(PlannedStep {
                name: step.name.clone(),
                instance,
            });
        }
        Ok(planned)
    }
}

fn resolve_reference(
    reference: &str,
    steps: &BTreeMap<&str, BTreeMap<String, Guid>>,
) -> Result<Guid, String> {
    if reference.len() == Guid::HEX_LEN {
        if let Ok(guid) = reference.parse::<Guid>() {
            return Ok(guid);
        }
    }
    let (step, slot) = reference
        .split_once('.')
        .ok_or_else(|| format!("'{}' is neither a guid nor <step>.<slot>", reference))?;
    let outputs = steps
        .get(step)
        .ok_or_else(|| format!("no earlier step named '{}'", step))?;
    outputs
        .get(slot)
        .copied()
        .ok_or_else(|| format!("step '{}' declares no output '{}'", step, slot))
}

fn plan_error(step: &Step, reason: String) -> SphynxError {
    SphynxError::ConfigError(format!("Plan step '{}': {}", step.name, reason))
}

#[cfg(test)]
mod tests {
    use super::*;

    const PLAN: &str = r#"{
        "steps": [
            { "name": "g", "class": "ExampleGraph",
              "outputs": ["vertices", "edges", "name", "age", "gender", "income", "location"] },
            { "name": "rev", "class": "ReverseEdges",
              "inputs": { "es": "g.edges" }, "outputs": ["reversed"] },
            { "name": "ones", "class": "AddConstantDoubleAttribute",
              "params": { "value": 1.0 },
              "inputs": { "vs": "g.vertices" }, "outputs": ["attr"] }
        ]
    }"#;

    #[test]
    fn references_resolve_to_earlier_outputs() {
        let registry = Registry::with_builtins();
        let steps = Plan::from_json(PLAN)
            .expect("parse")
            .instantiate(&registry)
            .expect("instantiate");

        assert_eq!(steps.len(), 3);
        let graph = &steps[0].instance;
        assert_eq!(
            steps[1].instance.inputs.get("es").copied(),
            graph.output("edges")
        );
        assert_eq!(
            steps[2].instance.inputs.get("vs").copied(),
            graph.output("vertices")
        );
    }

    #[test]
    fn same_plan_same_guids() {
        let registry = Registry::with_builtins();
        let plan = Plan::from_json(PLAN).expect("parse");
        let a = plan.instantiate(&registry).expect("first");
        let b = plan.instantiate(&registry).expect("second");
        let guids = |steps: &[PlannedStep]| steps.iter().map(|s| s.instance.guid).collect::<Vec<_>>();
        assert_eq!(guids(&a), guids(&b));
    }

    #[test]
    fn literal_guid_inputs_accepted() {
        let registry = Registry::with_builtins();
        let guid = Guid([3; 32]);
        let text = format!(
            r#"{{ "steps": [ {{ "name": "rev", "class": "ReverseEdges",
                 "inputs": {{ "es": "{}" }}, "outputs": ["reversed"] }} ] }}"#,
            guid
        );
        let steps = Plan::from_json(&text)
            .expect("parse")
            .instantiate(&registry)
            .expect("instantiate");
        assert_eq!(steps[0].instance.inputs.get("es"), Some(&guid));
    }

    #[test]
    fn forward_reference_rejected() {
        let registry = Registry::with_builtins();
        let text = r#"{ "steps": [
            { "name": "rev", "class": "ReverseEdges",
              "inputs": { "es": "g.edges" }, "outputs": ["reversed"] },
            { "name": "g", "class": "ExampleGraph", "outputs": ["edges"] }
        ] }"#;
        let err = Plan::from_json(text)
            .expect("parse")
            .instantiate(&registry)
            .expect_err("g is defined later");
        assert!(matches!(err, SphynxError::ConfigError(_)));
    }

    #[test]
    fn duplicate_step_names_rejected() {
        let registry = Registry::with_builtins();
        let text = r#"{ "steps": [
            { "name": "g", "class": "ExampleGraph", "outputs": ["edges"] },
            { "name": "g", "class": "ExampleGraph", "outputs": ["vertices"] }
        ] }"#;
        assert!(
            Plan::from_json(text)
                .expect("parse")
                .instantiate(&registry)
                .is_err()
        );
    }

    #[test]
    fn unknown_class_rejected() {
        let registry = Registry::with_builtins();
        let text = r#"{ "steps": [ { "name": "x", "class": "Nope", "outputs": [] } ] }"#;
        let err = Plan::from_json(text)
            .expect("parse")
            .instantiate(&registry)
            .expect_err("unregistered");
        assert!(matches!(err, SphynxError::UnknownOperation(_)));
    }
}
