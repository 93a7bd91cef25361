pub mod canvas;
pub mod edge;
pub mod node;
pub mod state;
pub mod store;

pub use canvas::*;
pub use edge::*;
pub use node::*;
pub use state::*;
pub use store::*;
