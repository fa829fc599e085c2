//! # Operation Descriptions and Instances
//!
//! An [`OperationDescription`] names a computation (class tag + canonical
//! parameters). An [`OperationInstance`] binds a description to input entity
//! guids and derives its own guid and one guid per declared output.
//!
//! Instances describe work; they never perform it. Running an instance is
//! the [`Executor`](crate::executor::Executor)'s job.

use crate::guid::{derive_instance_guid, derive_output_guid};
use crate::{Guid, SphynxError};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// =============================================================================
// PARAMS
// =============================================================================

/// Canonical parameter payload.
///
/// Always the `postcard` encoding of the class's typed parameter struct, so
/// two equal parameter values always hash to the same instance guid.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Params(Vec<u8>);

impl Params {
    /// Encode a typed parameter value.
    pub fn encode<T: Serialize>(value: &T) -> Result<Self, SphynxError> {
        postcard::to_stdvec(value)
            .map(Self)
            .map_err(|e| SphynxError::SerializationError(e.to_string()))
    }

    /// Decode into the typed parameter struct of `class`.
    pub fn decode<T: DeserializeOwned>(&self, class: &str) -> Result<T, SphynxError> {
        postcard::from_bytes(&self.0).map_err(|e| SphynxError::InvalidParams {
            class: class.to_string(),
            reason: e.to_string(),
        })
    }

    /// Wrap raw canonical bytes.
    #[must_use]
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    /// Raw canonical bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

// =============================================================================
// OPERATION DESCRIPTION
// =============================================================================

/// Which computation to run, and with what parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationDescription {
    /// Class tag; selects the registered operation.
    pub class: String,
    /// Canonical class-specific parameters.
    pub params: Params,
}

impl OperationDescription {
    /// Describe `class` with typed parameters.
    pub fn new<T: Serialize>(class: impl Into<String>, params: &T) -> Result<Self, SphynxError> {
        Ok(Self {
            class: class.into(),
            params: Params::encode(params)?,
        })
    }
}

// =============================================================================
// OPERATION INSTANCE
// =============================================================================

/// One node of the operation DAG: a description bound to concrete inputs.
///
/// `BTreeMap` keeps slots in name order, which is also the order inputs are
/// hashed in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationInstance {
    pub guid: Guid,
    pub inputs: BTreeMap<String, Guid>,
    pub outputs: BTreeMap<String, Guid>,
    pub operation: OperationDescription,
}

impl OperationInstance {
    /// Bind `operation` to `inputs` and derive all guids.
    pub fn new<S: AsRef<str>>(
        operation: OperationDescription,
        inputs: BTreeMap<String, Guid>,
        output_slots: &[S],
    ) -> Self {
        let guid = derive_instance_guid(&operation, &inputs);
        let outputs = output_slots
            .iter()
            .map(|slot| {
                let slot = slot.as_ref();
                (slot.to_string(), derive_output_guid(guid, slot))
            })
            .collect();
        Self {
            guid,
            inputs,
            outputs,
            operation,
        }
    }

    /// Recompute every guid and compare with the declared ones.
    pub fn verify(&self) -> Result<(), SphynxError> {
        let derived = derive_instance_guid(&self.operation, &self.inputs);
        if derived != self.guid {
            return Err(SphynxError::GuidMismatch {
                declared: self.guid,
                derived,
            });
        }
        for (slot, declared) in &self.outputs {
            let derived = derive_output_guid(self.guid, slot);
            if derived != *declared {
                return Err(SphynxError::GuidMismatch {
                    declared: *declared,
                    derived,
                });
            }
        }
        Ok(())
    }

    /// Guid of output `slot`.
    #[must_use]
    pub fn output(&self, slot: &str) -> Option<Guid> {
        self.outputs.get(slot).copied()
    }

    /// Class tag shortcut.
    #[must_use]
    pub fn class(&self) -> &str {
        &self.operation.class
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Serialize)]
    struct Constant {
        value: f64,
    }

    fn instance(value: f64, input: u8) -> OperationInstance {
        let description = OperationDescription::new("AddConstant", &Constant { value })
            .expect("describe");
        let inputs = BTreeMap::from([("vs".to_string(), Guid([input; 32]))]);
        OperationInstance::new(description, inputs, &["attr"])
    }

    #[test]
    fn instances_are_deterministic() {
        assert_eq!(instance(1.5, 1), instance(1.5, 1));
        assert_ne!(instance(1.5, 1).guid, instance(2.5, 1).guid);
        assert_ne!(instance(1.5, 1).guid, instance(1.5, 2).guid);
    }

    #[test]
    fn verify_accepts_derived_instance() {
        assert!(instance(1.0, 1).verify().is_ok());
    }

    #[test]
    fn verify_rejects_tampered_inputs() {
        let mut tampered = instance(1.0, 1);
        tampered.inputs.insert("vs".to_string(), Guid([9; 32]));
        assert!(matches!(
            tampered.verify(),
            Err(SphynxError::GuidMismatch { .. })
        ));
    }

    #[test]
    fn verify_rejects_tampered_outputs() {
        let mut tampered = instance(1.0, 1);
        tampered.outputs.insert("attr".to_string(), Guid([9; 32]));
        assert!(tampered.verify().is_err());
    }

    #[test]
    fn params_decode_reports_class() {
        let params = Params::from_bytes(vec![]);
        let err = params.decode::<(u64, u64)>("Broken").expect_err("empty payload");
        assert!(matches!(err, SphynxError::InvalidParams { class, .. } if class == "Broken"));
    }

    #[test]
    fn instance_survives_postcard() {
        let original = instance(3.25, 4);
        let bytes = postcard::to_stdvec(&original).expect("encode");
        let back: OperationInstance = postcard::from_bytes(&bytes).expect("decode");
        assert_eq!(back, original);
        assert!(back.verify().is_ok());
    }
}
