pub mod connection;
pub mod topology;

pub use connection::{edge_kind, is_compatible};
pub use topology::{TopologyReport, validate_topology};
