//! Assistant tool calls: parsing, validation and application to a graph.

pub mod engine;
pub mod invocation;
pub mod properties;
pub mod recovery;
pub mod shared;

pub use engine::*;
pub use invocation::*;
pub use properties::parse_patch;
pub use recovery::*;
pub use shared::*;
