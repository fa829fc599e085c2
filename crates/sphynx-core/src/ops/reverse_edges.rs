use super::NoParams;
use crate::SphynxError;
use crate::entity::EdgeBundle;
use crate::registry::{OpContext, Operation};

/// `es` -> `reversed`: every edge flipped, original edge ids kept.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReverseEdges;

impl Operation for ReverseEdges {
    const CLASS: &'static str = "ReverseEdges";
    type Params = NoParams;

    fn execute(&self, _params: NoParams, ctx: &mut OpContext) -> Result<(), SphynxError> {
        let es = ctx.edge_bundle("es")?;
        let reversed = EdgeBundle::between(
            es.dst_vertex_set,
            es.src_vertex_set,
            es.dst.clone(),
            es.src.clone(),
            es.edge_mapping.clone(),
        );
        ctx.output("reversed", reversed)?;
        Ok(())
    }
}
