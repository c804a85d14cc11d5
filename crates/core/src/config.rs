//! Options that bound a single resolution.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

/// A flag another thread can set to stop a running resolution.
///
/// Clones share the flag. The resolver polls it between candidate expansions,
/// so a cancelled walk stops after at most one more bridge call.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Tuning for one call to [`crate::Resolver::resolve`].
///
/// The default walks the whole tree with no time limit, which is what the
/// plain [`crate::resolve`] function uses.
#[derive(Debug, Clone, Default)]
pub struct ResolveOptions {
    /// Skip nodes (and their subtrees) whose states lack `showing`.
    ///
    /// Hidden children are dropped when their parent is enumerated, so `[n]`
    /// and `last()` count showing siblings only.
    pub visible_only: bool,
    /// How many levels below each context node a descendant step visits.
    /// `Some(1)` behaves like a child step; `Some(0)` is treated as `Some(1)`.
    pub max_depth: Option<usize>,
    pub deadline: Option<Instant>,
    pub cancel: Option<CancelFlag>,
}

impl ResolveOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_visible_only(mut self, visible_only: bool) -> Self {
        self.visible_only = visible_only;
        self
    }

    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth.max(1));
        self
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Sets the deadline to `timeout` from now.
    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    pub fn with_cancel_flag(mut self, flag: CancelFlag) -> Self {
        self.cancel = Some(flag);
        self
    }

    pub(crate) fn depth_allows(&self, depth: usize) -> bool {
        self.max_depth.is_none_or(|max| depth < max.max(1))
    }
}
