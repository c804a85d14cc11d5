//! The opaque node handle shared by the bridge, the navigator and the resolver.

use crate::ids::{NativeRef, SessionId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// An interface a node may implement on the remote side, besides the basic
/// accessible context every node has.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    Component,
    Action,
    Selection,
    Text,
    Hypertext,
    Table,
    Value,
}

impl Capability {
    pub const ALL: [Capability; 7] = [
        Capability::Component,
        Capability::Action,
        Capability::Selection,
        Capability::Text,
        Capability::Hypertext,
        Capability::Table,
        Capability::Value,
    ];

    const fn bit(self) -> u8 {
        1 << (self as u8)
    }
}

/// A small set of [`Capability`] values carried by every handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Capabilities(u8);

impl Capabilities {
    pub const fn empty() -> Self {
        Self(0)
    }

    pub const fn with(self, capability: Capability) -> Self {
        Self(self.0 | capability.bit())
    }

    pub const fn contains(self, capability: Capability) -> bool {
        self.0 & capability.bit() != 0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn iter(self) -> impl Iterator<Item = Capability> {
        Capability::ALL.into_iter().filter(move |c| self.contains(*c))
    }
}

impl FromIterator<Capability> for Capabilities {
    fn from_iter<I: IntoIterator<Item = Capability>>(iter: I) -> Self {
        iter.into_iter().fold(Capabilities::empty(), Capabilities::with)
    }
}

/// Who is responsible for releasing a handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ownership {
    /// The holder must release the handle exactly once.
    Owned,
    /// A view of a handle owned elsewhere; releasing it is a no-op.
    Borrowed,
}

/// An opaque reference to one node of a remote accessibility tree.
///
/// Handles are deliberately not `Clone`: an owned handle is consumed when it is
/// released, so it can neither be released twice nor used afterwards. Handle
/// equality says nothing about node identity; use the bridge's same-object check.
pub struct NodeHandle {
    session: SessionId,
    native: NativeRef,
    capabilities: Capabilities,
    ownership: Ownership,
}

impl NodeHandle {
    /// Wraps a reference freshly acquired from the bridge.
    pub fn owned(session: SessionId, native: NativeRef, capabilities: Capabilities) -> Self {
        Self {
            session,
            native,
            capabilities,
            ownership: Ownership::Owned,
        }
    }

    /// A borrowed view of this handle that may be stored alongside owned handles.
    pub fn borrowed(&self) -> Self {
        Self {
            session: self.session,
            native: self.native,
            capabilities: self.capabilities,
            ownership: Ownership::Borrowed,
        }
    }

    pub fn session(&self) -> SessionId {
        self.session
    }

    pub fn native(&self) -> NativeRef {
        self.native
    }

    pub fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    pub fn supports(&self, capability: Capability) -> bool {
        self.capabilities.contains(capability)
    }

    pub fn ownership(&self) -> Ownership {
        self.ownership
    }

    pub fn is_borrowed(&self) -> bool {
        self.ownership == Ownership::Borrowed
    }
}

impl fmt::Debug for NodeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeHandle({}, {}", self.session, self.native)?;
        if self.is_borrowed() {
            write!(f, ", borrowed")?;
        }
        write!(f, ")")
    }
}
