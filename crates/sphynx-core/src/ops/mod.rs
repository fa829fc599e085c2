//! # Built-in Operations
//!
//! Small data-shaping operations that exercise the operation contract end to
//! end. None of them is a graph algorithm.
//!
//! | Class                         | Inputs | Outputs                 |
//! |-------------------------------|--------|-------------------------|
//! | `ExampleGraph`                | -      | see [`ExampleGraph::OUTPUTS`] |
//! | `AddConstantDoubleAttribute`  | `vs`   | `attr`                  |
//! | `AddConstantStringAttribute`  | `vs`   | `attr`                  |
//! | `ReverseEdges`                | `es`   | `reversed`              |

mod constant;
mod example_graph;
mod reverse_edges;

pub use constant::{AddConstantDoubleAttribute, AddConstantStringAttribute, ConstantParams};
pub use example_graph::ExampleGraph;
pub use reverse_edges::ReverseEdges;

use crate::registry::Registry;
use serde::{Deserialize, Serialize};

/// Parameters of classes that take none. Written as `{}` in JSON.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoParams {}

/// Register every built-in operation.
pub fn register_builtins(registry: &mut Registry) {
    registry.register(ExampleGraph);
    registry.register(AddConstantDoubleAttribute);
    registry.register(AddConstantStringAttribute);
    registry.register(ReverseEdges);
}
