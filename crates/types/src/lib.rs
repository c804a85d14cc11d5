pub mod handle;
pub mod ids;
pub mod role;
pub mod snapshot;

pub use handle::{Capabilities, Capability, NodeHandle, Ownership};
pub use ids::{NativeRef, SessionId};
pub use role::{Role, State};
pub use snapshot::{AttrValue, AttributeSnapshot};
