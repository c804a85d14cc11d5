//! AccessBridge trait for abstracting the native accessibility bridge.
//!
//! The query engine never talks to a native library directly. Everything it
//! needs from the remote tree goes through this trait, which a binding to the
//! Java Access Bridge (or any other accessibility API) implements.

use axpath_types::{AttributeSnapshot, NodeHandle};
use std::fmt::{self, Debug};
use thiserror::Error;

/// The bridge primitive that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BridgeOp {
    Children,
    Parent,
    Attributes,
    SiblingIndex,
    SameObject,
    Release,
}

impl fmt::Display for BridgeOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BridgeOp::Children => "get_children",
            BridgeOp::Parent => "get_parent",
            BridgeOp::Attributes => "get_attributes",
            BridgeOp::SiblingIndex => "get_sibling_index",
            BridgeOp::SameObject => "is_same_object",
            BridgeOp::Release => "release",
        };
        f.write_str(name)
    }
}

/// A failed native call, with the bridge's error code.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("bridge call {op} failed with code {code}")]
pub struct BridgeError {
    pub op: BridgeOp,
    pub code: i32,
}

impl BridgeError {
    pub fn new(op: BridgeOp, code: i32) -> Self {
        Self { op, code }
    }
}

/// The primitives of a live accessibility tree.
///
/// All calls are synchronous and may block while they cross into the remote
/// process. Every handle returned by `children` or `parent` is owned by the
/// caller and must be passed to `release` exactly once.
///
/// # Implementations
///
/// - `InMemoryBridge`: a deterministic in-memory tree, for tests and fixtures
/// - native bindings live outside this workspace
pub trait AccessBridge: Debug {
    /// The direct children of `handle`, in sibling order.
    fn children(&self, handle: &NodeHandle) -> Result<Vec<NodeHandle>, BridgeError>;

    /// The parent of `handle`, or `None` for a top-level object.
    fn parent(&self, handle: &NodeHandle) -> Result<Option<NodeHandle>, BridgeError>;

    /// A snapshot of every attribute the bridge reports for `handle`.
    fn attributes(&self, handle: &NodeHandle) -> Result<AttributeSnapshot, BridgeError>;

    /// The zero-based index of `handle` among its siblings, and the sibling count.
    /// A top-level object reports `(0, 1)`.
    fn sibling_index(&self, handle: &NodeHandle) -> Result<(u32, u32), BridgeError>;

    /// Whether two handles refer to the same remote object.
    fn is_same_object(&self, a: &NodeHandle, b: &NodeHandle) -> Result<bool, BridgeError>;

    /// Gives a handle back to the remote side.
    fn release(&self, handle: NodeHandle) -> Result<(), BridgeError>;

    /// Returns a human-readable name for this bridge (for logging/debugging).
    fn name(&self) -> &'static str;
}

impl<B: AccessBridge + ?Sized> AccessBridge for &B {
    fn children(&self, handle: &NodeHandle) -> Result<Vec<NodeHandle>, BridgeError> {
        (**self).children(handle)
    }

    fn parent(&self, handle: &NodeHandle) -> Result<Option<NodeHandle>, BridgeError> {
        (**self).parent(handle)
    }

    fn attributes(&self, handle: &NodeHandle) -> Result<AttributeSnapshot, BridgeError> {
        (**self).attributes(handle)
    }

    fn sibling_index(&self, handle: &NodeHandle) -> Result<(u32, u32), BridgeError> {
        (**self).sibling_index(handle)
    }

    fn is_same_object(&self, a: &NodeHandle, b: &NodeHandle) -> Result<bool, BridgeError> {
        (**self).is_same_object(a, b)
    }

    fn release(&self, handle: NodeHandle) -> Result<(), BridgeError> {
        (**self).release(handle)
    }

    fn name(&self) -> &'static str {
        (**self).name()
    }
}
