//! Newtype wrappers for the raw identifiers handed out by an accessibility bridge.
//!
//! These types keep the virtual-machine id of a session and the native object
//! reference of a node apart at compile time, so that neither can be passed
//! where the other is expected.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The identifier of one bridge session (the Java Access Bridge `vmid`).
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct SessionId(i32);

impl SessionId {
    /// Creates a new SessionId from a raw virtual-machine id
    pub const fn new(id: i32) -> Self {
        Self(id)
    }

    /// Returns the raw virtual-machine id
    pub const fn get(self) -> i32 {
        self.0
    }
}

impl From<i32> for SessionId {
    fn from(id: i32) -> Self {
        Self(id)
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "vm#{}", self.0)
    }
}

/// A native object reference (a 64-bit `jobject` on the Java Access Bridge).
///
/// Two different `NativeRef` values may still denote the same remote object;
/// only the bridge's same-object check can tell.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct NativeRef(u64);

impl NativeRef {
    /// Creates a new NativeRef from a raw reference value
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw reference value
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl From<u64> for NativeRef {
    fn from(raw: u64) -> Self {
        Self(raw)
    }
}

impl fmt::Display for NativeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}
