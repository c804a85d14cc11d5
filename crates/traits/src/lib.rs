pub mod bridge;
pub mod memory;

pub use bridge::{AccessBridge, BridgeError, BridgeOp};
pub use memory::{FixtureError, FixtureNode, InMemoryBridge, NodeId, TreeBuilder, name_of};
