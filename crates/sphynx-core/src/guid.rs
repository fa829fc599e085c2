//! # Content Addressing
//!
//! Derives instance and output guids from operation content.
//!
//! An instance guid is `BLAKE3(INSTANCE_DOMAIN | class | params | inputs)`
//! where every field is length-prefixed and inputs are hashed in slot-name
//! order. An output guid is `BLAKE3(OUTPUT_DOMAIN | instance | slot)`.
//!
//! Two processes that agree on (class, canonical params, input guids) agree
//! on every guid, which is what makes the store a cache: a caller can derive
//! the output guid and check the store before running anything.

use crate::Guid;
use crate::operation::OperationDescription;
use crate::primitives::{INSTANCE_DOMAIN, OUTPUT_DOMAIN};
use std::collections::BTreeMap;

/// Length-prefixed field, so `("ab", "c")` and `("a", "bc")` hash differently.
fn update_field(hasher: &mut blake3::Hasher, bytes: &[u8]) {
    hasher.update(&(bytes.len() as u64).to_le_bytes());
    hasher.update(bytes);
}

/// Guid of the instance that runs `description` over `inputs`.
#[must_use]
pub fn derive_instance_guid(
    description: &OperationDescription,
    inputs: &BTreeMap<String, Guid>,
) -> Guid {
    let mut hasher = blake3::Hasher::new();
    update_field(&mut hasher, INSTANCE_DOMAIN);
    update_field(&mut hasher, description.class.as_bytes());
    update_field(&mut hasher, description.params.as_bytes());
    hasher.update(&(inputs.len() as u64).to_le_bytes());
    for (slot, guid) in inputs {
        update_field(&mut hasher, slot.as_bytes());
        hasher.update(guid.as_bytes());
    }
    hasher.finalize().into()
}

/// Guid of the entity an instance produces in output `slot`.
#[must_use]
pub fn derive_output_guid(instance: Guid, slot: &str) -> Guid {
    let mut hasher = blake3::Hasher::new();
    update_field(&mut hasher, OUTPUT_DOMAIN);
    hasher.update(instance.as_bytes());
    update_field(&mut hasher, slot.as_bytes());
    hasher.finalize().into()
}
