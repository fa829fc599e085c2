//! Constant attribute columns over a vertex set.

use crate::SphynxError;
use crate::entity::{Attribute, ColumnValue, Entity};
use crate::registry::{OpContext, Operation};
use serde::{Deserialize, Serialize};

/// Parameters of the constant-attribute operations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConstantParams<T> {
    pub value: T,
}

/// `vs` -> `attr`: every position defined and set to `value`.
#[derive(Debug, Clone, Copy, Default)]
pub struct AddConstantDoubleAttribute;

impl Operation for AddConstantDoubleAttribute {
    const CLASS: &'static str = "AddConstantDoubleAttribute";
    type Params = ConstantParams<f64>;

    fn execute(&self, params: Self::Params, ctx: &mut OpContext) -> Result<(), SphynxError> {
        constant_column(params.value, ctx)
    }
}

/// `vs` -> `attr`: every position defined and set to `value`.
#[derive(Debug, Clone, Copy, Default)]
pub struct AddConstantStringAttribute;

impl Operation for AddConstantStringAttribute {
    const CLASS: &'static str = "AddConstantStringAttribute";
    type Params = ConstantParams<String>;

    fn execute(&self, params: Self::Params, ctx: &mut OpContext) -> Result<(), SphynxError> {
        constant_column(params.value, ctx)
    }
}

fn constant_column<T>(value: T, ctx: &mut OpContext) -> Result<(), SphynxError>
where
    T: ColumnValue,
    Entity: From<Attribute<T>>,
{
    let vertex_set = ctx.input_guid("vs")?;
    let size = ctx.vertex_set("vs")?.len();
    ctx.output("attr", Attribute::dense(vertex_set, vec![value; size]))?;
    Ok(())
}
