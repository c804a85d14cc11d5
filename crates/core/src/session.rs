//! Sessions and handle bookkeeping.
//!
//! A [`Session`] pairs one connected process (identified by its [`SessionId`])
//! with the bridge that talks to it. Every handle the engine acquires through
//! a session is recorded in its ledger until it is released, which makes
//! release idempotent: releasing a handle twice, or a handle the session never
//! handed out, is logged and never reaches the native bridge.

use crate::navigator::TreeNavigator;
use axpath_traits::AccessBridge;
use axpath_types::{NativeRef, NodeHandle, SessionId};
use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard};

/// Counters describing the handles a session has seen.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HandleStats {
    pub acquired: u64,
    pub released: u64,
    /// Handles acquired and not yet released.
    pub outstanding: usize,
    /// Release requests refused because the handle was unknown, foreign, or
    /// already released.
    pub rejected: u64,
}

#[derive(Debug, Default)]
struct HandleLedger {
    outstanding: HashSet<NativeRef>,
    acquired: u64,
    released: u64,
    rejected: u64,
}

/// One connected accessibility session.
#[derive(Debug)]
pub struct Session<B: AccessBridge> {
    id: SessionId,
    bridge: B,
    ledger: Mutex<HandleLedger>,
}

impl<B: AccessBridge> Session<B> {
    pub fn new(id: SessionId, bridge: B) -> Self {
        log::debug!("Opening session {} over the {} bridge", id, bridge.name());
        Self {
            id,
            bridge,
            ledger: Mutex::new(HandleLedger::default()),
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn bridge(&self) -> &B {
        &self.bridge
    }

    /// A navigator over this session's tree.
    pub fn navigator(&self) -> TreeNavigator<'_, B> {
        TreeNavigator::new(self)
    }

    /// Takes responsibility for a handle acquired outside the engine, such as
    /// a window root, so that [`Session::release`] will accept it.
    pub fn adopt(&self, handle: NodeHandle) -> NodeHandle {
        if !handle.is_borrowed() && handle.session() == self.id {
            self.track(&handle);
        }
        handle
    }

    /// Releases an owned handle exactly once.
    ///
    /// Borrowed views are ignored. Native release failures are logged and
    /// swallowed; the handle is considered released either way.
    pub fn release(&self, handle: NodeHandle) {
        if handle.is_borrowed() {
            log::trace!("Ignoring release of borrowed view {:?}", handle);
            return;
        }
        if handle.session() != self.id {
            self.ledger().rejected += 1;
            log::warn!(
                "Refusing to release {:?}: it belongs to {}, not {}",
                handle,
                handle.session(),
                self.id
            );
            return;
        }
        {
            let mut ledger = self.ledger();
            if !ledger.outstanding.remove(&handle.native()) {
                ledger.rejected += 1;
                log::warn!("Ignoring release of {:?}: not outstanding (double release?)", handle);
                return;
            }
            ledger.released += 1;
        }
        if let Err(e) = self.bridge.release(handle) {
            log::warn!("Native release failed on {}: {}", self.id, e);
        }
    }

    pub fn release_all<I: IntoIterator<Item = NodeHandle>>(&self, handles: I) {
        for handle in handles {
            self.release(handle);
        }
    }

    pub fn stats(&self) -> HandleStats {
        let ledger = self.ledger();
        HandleStats {
            acquired: ledger.acquired,
            released: ledger.released,
            outstanding: ledger.outstanding.len(),
            rejected: ledger.rejected,
        }
    }

    pub(crate) fn track(&self, handle: &NodeHandle) {
        let mut ledger = self.ledger();
        if ledger.outstanding.insert(handle.native()) {
            ledger.acquired += 1;
        } else {
            log::warn!("Bridge returned {:?} while it was still outstanding", handle);
        }
    }

    fn ledger(&self) -> MutexGuard<'_, HandleLedger> {
        // Only counters and a set live behind this lock.
        self.ledger.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
