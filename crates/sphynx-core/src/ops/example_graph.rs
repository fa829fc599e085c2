//! A fixed four-person graph for demos and tests.

use super::NoParams;
use crate::SphynxError;
use crate::entity::{
    DoubleAttribute, DoubleTuple2Attribute, EdgeBundle, StringAttribute, VertexSet,
};
use crate::registry::{OpContext, Operation};

/// Produces a small social graph:
///
/// ```text
/// 0 Adam  <-> 1 Eve
/// 2 Bob    -> 0 Adam, 1 Eve
/// 3 Isolated Joe
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct ExampleGraph;

impl ExampleGraph {
    /// Output slots, in publication order.
    pub const OUTPUTS: &'static [&'static str] = &[
        "vertices", "edges", "name", "age", "gender", "income", "location",
    ];
}

impl Operation for ExampleGraph {
    const CLASS: &'static str = "ExampleGraph";
    type Params = NoParams;

    fn execute(&self, _params: NoParams, ctx: &mut OpContext) -> Result<(), SphynxError> {
        let vs = ctx.output("vertices", VertexSet::new(vec![0, 1, 2, 3]))?;

        ctx.output(
            "edges",
            EdgeBundle::new(vs, vec![0, 1, 2, 2], vec![1, 0, 0, 1], vec![0, 1, 2, 3]),
        )?;

        let names = ["Adam", "Eve", "Bob", "Isolated Joe"];
        ctx.output(
            "name",
            StringAttribute::dense(vs, names.iter().map(|s| (*s).to_string()).collect()),
        )?;
        ctx.output("age", DoubleAttribute::dense(vs, vec![20.3, 18.2, 50.3, 2.0]))?;
        let genders = ["Male", "Female", "Male", "Male"];
        ctx.output(
            "gender",
            StringAttribute::dense(vs, genders.iter().map(|s| (*s).to_string()).collect()),
        )?;
        ctx.output(
            "income",
            DoubleAttribute::from_options(vs, vec![Some(1000.0), None, Some(2000.0), None]),
        )?;
        ctx.output(
            "location",
            DoubleTuple2Attribute::dense(
                vs,
                vec![
                    (40.714_28, -74.005_97),
                    (47.526_967_4, 19.032_396_8),
                    (1.352_083, 103.819_836),
                    (-33.867_486_9, 151.206_990_2),
                ],
            ),
        )?;
        Ok(())
    }
}
