//! Resolves a parsed query against a live tree.
//!
//! Resolution is a step-at-a-time frontier walk. The frontier starts as a
//! borrowed view of the root; each step replaces it with the nodes the step
//! selects from it. Descendant steps walk each context subtree depth first,
//! in pre-order, with an explicit stack of [`Children`] iterators.
//!
//! Handle ownership follows one rule: every handle acquired during a walk is
//! either returned in the result list or released before `resolve` returns,
//! on every path including early stops and cancellation.

use crate::config::ResolveOptions;
use crate::error::ResolveError;
use crate::evaluator::evaluate;
use crate::navigator::{Children, SiblingPosition, TreeNavigator};
use crate::session::Session;
use axpath_query::{Axis, Query, RoleTest, Step};
use axpath_traits::{AccessBridge, BridgeError};
use axpath_types::{AttributeSnapshot, NativeRef, NodeHandle, State};
use std::collections::HashMap;
use std::time::Instant;

/// The matches of a resolution together with the bridge failures that were
/// skipped over while producing them.
#[derive(Debug)]
pub struct Resolution {
    /// Matching nodes in document order. Owned by the caller, except for a
    /// borrowed view of the root when the root itself matched.
    pub matches: Vec<NodeHandle>,
    pub diagnostics: Vec<BridgeError>,
}

/// Resolves queries within one session.
#[derive(Debug)]
pub struct Resolver<'s, B: AccessBridge> {
    session: &'s Session<B>,
    options: ResolveOptions,
}

impl<'s, B: AccessBridge> Resolver<'s, B> {
    pub fn new(session: &'s Session<B>) -> Self {
        Self {
            session,
            options: ResolveOptions::default(),
        }
    }

    pub fn with_options(mut self, options: ResolveOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> &ResolveOptions {
        &self.options
    }

    /// Every node `query` selects below `root`, in document order.
    ///
    /// `root` stays owned by the caller. An empty result is `Ok(vec![])`.
    pub fn resolve(&self, query: &Query, root: &NodeHandle) -> Result<Vec<NodeHandle>, ResolveError> {
        self.run(query, root, None).map(|resolution| resolution.matches)
    }

    /// Like [`Resolver::resolve`], also returning the skipped bridge failures.
    pub fn resolve_detailed(
        &self,
        query: &Query,
        root: &NodeHandle,
    ) -> Result<Resolution, ResolveError> {
        self.run(query, root, None)
    }

    /// The first node in document order that `query` selects, stopping the
    /// walk as soon as it is found.
    pub fn find_first(&self, query: &Query, root: &NodeHandle) -> Result<Option<NodeHandle>, ResolveError> {
        let resolution = self.run(query, root, Some(1))?;
        Ok(resolution.matches.into_iter().next())
    }

    fn run(
        &self,
        query: &Query,
        root: &NodeHandle,
        limit: Option<usize>,
    ) -> Result<Resolution, ResolveError> {
        if root.session() != self.session.id() {
            return Err(ResolveError::SessionMismatch {
                expected: self.session.id(),
                found: root.session(),
            });
        }

        let mut walk = Walk::new(self.session.navigator(), &self.options);
        log::debug!("Resolving '{}' from {:?}", query, root);

        let mut frontier = vec![root.borrowed()];
        let last = query.len().saturating_sub(1);
        for (index, step) in query.steps().iter().enumerate() {
            let step_limit = if index == last { limit } else { None };
            frontier = walk.apply_step(step, frontier, step_limit)?;
            if frontier.is_empty() {
                walk.enter(Phase::Empty);
                log::debug!("Step {} ('{}') selected nothing", index + 1, step);
                return Ok(walk.finish(Vec::new()));
            }
            walk.enter(Phase::NextStep);
            log::trace!("Step {} ('{}') selected {} nodes", index + 1, step, frontier.len());
        }

        walk.enter(Phase::Done);
        log::debug!("'{}' matched {} nodes", query, frontier.len());
        Ok(walk.finish(frontier))
    }
}

/// Resolves `query` below `root` with default options.
pub fn resolve<B: AccessBridge>(
    session: &Session<B>,
    query: &Query,
    root: &NodeHandle,
) -> Result<Vec<NodeHandle>, ResolveError> {
    Resolver::new(session).resolve(query, root)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Start,
    Expanding,
    Filtering,
    NextStep,
    Empty,
    Done,
}

/// What a step decided about one candidate.
#[derive(Debug, Clone, Copy)]
struct Verdict {
    keep: bool,
    descend: bool,
}

impl Verdict {
    const SKIP: Verdict = Verdict {
        keep: false,
        descend: false,
    };
}

/// One context node of a step.
#[derive(Debug)]
struct Context {
    handle: NodeHandle,
    /// Lies inside the subtree of an earlier context of the same step.
    nested: bool,
}

impl Context {
    fn outer(handle: NodeHandle) -> Self {
        Self {
            handle,
            nested: false,
        }
    }
}

/// State of one resolution.
struct Walk<'s, 'o, B: AccessBridge> {
    nav: TreeNavigator<'s, B>,
    options: &'o ResolveOptions,
    phase: Phase,
    diagnostics: Vec<BridgeError>,
    /// Snapshots read while filtering hidden children, keyed by the child's
    /// reference and consumed when the child is judged.
    prefetched: HashMap<NativeRef, AttributeSnapshot>,
}

impl<'s, 'o, B: AccessBridge> Walk<'s, 'o, B> {
    fn new(nav: TreeNavigator<'s, B>, options: &'o ResolveOptions) -> Self {
        Self {
            nav,
            options,
            phase: Phase::Start,
            diagnostics: Vec::new(),
            prefetched: HashMap::new(),
        }
    }

    fn enter(&mut self, phase: Phase) {
        if self.phase != phase {
            log::trace!("{:?} -> {:?}", self.phase, phase);
            self.phase = phase;
        }
    }

    fn finish(self, matches: Vec<NodeHandle>) -> Resolution {
        if !self.diagnostics.is_empty() {
            log::debug!("Skipped {} unreadable nodes", self.diagnostics.len());
        }
        Resolution {
            matches,
            diagnostics: self.diagnostics,
        }
    }

    fn checkpoint(&self) -> Result<(), ResolveError> {
        if self.options.cancel.as_ref().is_some_and(|flag| flag.is_cancelled()) {
            return Err(ResolveError::Cancelled);
        }
        if self.options.deadline.is_some_and(|deadline| Instant::now() >= deadline) {
            return Err(ResolveError::DeadlineExceeded);
        }
        Ok(())
    }

    fn diagnose(&mut self, handle: &NodeHandle, error: BridgeError) {
        log::warn!("Skipping {:?}: {}", handle, error);
        self.diagnostics.push(error);
    }

    /// Applies one step to the whole frontier, consuming it.
    fn apply_step(
        &mut self,
        step: &Step,
        frontier: Vec<NodeHandle>,
        limit: Option<usize>,
    ) -> Result<Vec<NodeHandle>, ResolveError> {
        let contexts = match step.axis {
            Axis::Descendant | Axis::Any if frontier.len() > 1 => self.disjoint(frontier),
            _ => frontier.into_iter().map(Context::outer).collect(),
        };
        let mut survivors = Vec::new();
        let mut pending = contexts.into_iter();

        while let Some(context) = pending.next() {
            if limit.is_some_and(|n| survivors.len() >= n) {
                self.nav.release(context.handle);
                continue;
            }
            self.enter(Phase::Expanding);
            let expanded = match step.axis {
                Axis::SelfAxis => self.filter_self(step, context.handle, &mut survivors),
                Axis::Child => self.expand_children(step, context.handle, &mut survivors, limit),
                Axis::Descendant | Axis::Any => {
                    self.expand_descendants(step, context, &mut survivors, limit)
                }
            };
            if let Err(e) = expanded {
                self.nav.release_all(survivors);
                self.nav.release_all(pending.map(|context| context.handle));
                return Err(e);
            }
        }
        Ok(survivors)
    }

    /// Separates the contexts of a descendant step into disjoint subtrees.
    ///
    /// The frontier lists ancestors before their descendants, so a context
    /// can only lie inside an earlier one. Such a context is dropped, since
    /// the earlier walk reaches everything below it. Under `max_depth` it
    /// may reach deeper than the earlier walk does, so it is kept and marked
    /// nested instead.
    fn disjoint(&mut self, frontier: Vec<NodeHandle>) -> Vec<Context> {
        let mut contexts: Vec<Context> = Vec::with_capacity(frontier.len());
        for handle in frontier {
            if contexts.is_empty() || !self.is_below(&handle, &contexts) {
                contexts.push(Context::outer(handle));
            } else if self.options.max_depth.is_some() {
                contexts.push(Context {
                    handle,
                    nested: true,
                });
            } else {
                log::trace!("{:?} is inside an earlier context; not walking it again", handle);
                self.nav.release(handle);
            }
        }
        contexts
    }

    /// Whether any ancestor of `node` is one of the outer `contexts`.
    fn is_below(&mut self, node: &NodeHandle, contexts: &[Context]) -> bool {
        let mut current = self.parent_or_diagnose(node);
        while let Some(ancestor) = current {
            let found = contexts
                .iter()
                .filter(|context| !context.nested)
                .any(|context| self.same(&ancestor, &context.handle));
            if found {
                self.nav.release(ancestor);
                return true;
            }
            current = self.parent_or_diagnose(&ancestor);
            self.nav.release(ancestor);
        }
        false
    }

    fn parent_or_diagnose(&mut self, node: &NodeHandle) -> Option<NodeHandle> {
        match self.nav.parent(node) {
            Ok(parent) => parent,
            Err(e) => {
                self.diagnose(node, e);
                None
            }
        }
    }

    /// `same_object`, with a failed comparison counted as "different".
    fn same(&mut self, a: &NodeHandle, b: &NodeHandle) -> bool {
        match self.nav.same_object(a, b) {
            Ok(same) => same,
            Err(e) => {
                self.diagnose(a, e);
                false
            }
        }
    }

    /// The root is the only borrowed handle in a frontier; failing to read it
    /// fails the whole resolution.
    fn unreachable(&mut self, context: NodeHandle, error: BridgeError) -> Result<(), ResolveError> {
        if context.is_borrowed() {
            return Err(ResolveError::RootUnreachable(error));
        }
        self.diagnose(&context, error);
        self.nav.release(context);
        Ok(())
    }

    /// Enumerates the children of `handle`.
    ///
    /// With `visible_only`, children that are not showing are released here,
    /// before anything is judged, so `[n]` and `last()` count showing
    /// siblings only. Their subtrees are never entered.
    fn enumerate(&mut self, handle: &NodeHandle) -> Result<Children<'s, B>, BridgeError> {
        let mut children = self.nav.children(handle)?;
        if self.options.visible_only {
            let nav = self.nav;
            let prefetched = &mut self.prefetched;
            let diagnostics = &mut self.diagnostics;
            children.retain(|child| match nav.attributes(child) {
                Ok(snapshot) => {
                    let showing = snapshot.has_state(State::Showing.as_str());
                    if showing {
                        prefetched.insert(child.native(), snapshot);
                    } else {
                        log::trace!("{:?} is not showing; skipping its subtree", child);
                    }
                    showing
                }
                Err(e) => {
                    log::warn!("Skipping {:?}: {}", child, e);
                    diagnostics.push(e);
                    false
                }
            });
        }
        Ok(children)
    }

    fn filter_self(
        &mut self,
        step: &Step,
        context: NodeHandle,
        survivors: &mut Vec<NodeHandle>,
    ) -> Result<(), ResolveError> {
        if let Err(e) = self.checkpoint() {
            self.nav.release(context);
            return Err(e);
        }
        self.enter(Phase::Filtering);
        match self.judge(step, &context, None) {
            Ok(verdict) if verdict.keep => survivors.push(context),
            Ok(_) => self.nav.release(context),
            Err(e) => return self.unreachable(context, e),
        }
        Ok(())
    }

    fn expand_children(
        &mut self,
        step: &Step,
        context: NodeHandle,
        survivors: &mut Vec<NodeHandle>,
        limit: Option<usize>,
    ) -> Result<(), ResolveError> {
        let children = match self.enumerate(&context) {
            Ok(children) => children,
            Err(e) => return self.unreachable(context, e),
        };
        self.enter(Phase::Filtering);
        for (child, position) in children {
            if let Err(e) = self.checkpoint() {
                self.nav.release(child);
                self.nav.release(context);
                return Err(e);
            }
            self.settle(step, child, position, survivors, 0, false);
            if limit.is_some_and(|n| survivors.len() >= n) {
                break;
            }
        }
        self.nav.release(context);
        Ok(())
    }

    fn expand_descendants(
        &mut self,
        step: &Step,
        context: Context,
        survivors: &mut Vec<NodeHandle>,
        limit: Option<usize>,
    ) -> Result<(), ResolveError> {
        // Only matches of a nested context can repeat, and only those
        // selected by the contexts before it.
        let earlier = if context.nested { survivors.len() } else { 0 };
        let context = context.handle;
        let top = match self.enumerate(&context) {
            Ok(children) => children,
            Err(e) => return self.unreachable(context, e),
        };
        // Each entry holds the unvisited children of one open node and the
        // depth of those children below the context.
        let mut stack: Vec<(Children<'s, B>, usize)> = vec![(top, 1)];
        self.enter(Phase::Filtering);

        loop {
            let Some((children, depth)) = stack.last_mut() else {
                break;
            };
            let depth = *depth;
            let Some((node, position)) = children.next() else {
                stack.pop();
                continue;
            };
            if let Err(e) = self.checkpoint() {
                self.nav.release(node);
                drop(stack);
                self.nav.release(context);
                return Err(e);
            }
            let expand = self.options.depth_allows(depth);
            let below = self.settle(step, node, position, survivors, earlier, expand);
            if limit.is_some_and(|n| survivors.len() >= n) {
                break;
            }
            if let Some(grandchildren) = below {
                stack.push((grandchildren, depth + 1));
            }
        }
        drop(stack);
        self.nav.release(context);
        Ok(())
    }

    /// Judges one candidate, then keeps or releases it.
    ///
    /// A match that is the same element as one of the first `earlier`
    /// survivors is released instead of kept. With `expand` set, the children
    /// of a candidate whose subtree is still eligible are fetched before the
    /// candidate is settled and returned.
    fn settle(
        &mut self,
        step: &Step,
        node: NodeHandle,
        position: SiblingPosition,
        survivors: &mut Vec<NodeHandle>,
        earlier: usize,
        expand: bool,
    ) -> Option<Children<'s, B>> {
        let verdict = match self.judge(step, &node, Some(position)) {
            Ok(verdict) => verdict,
            Err(e) => {
                self.diagnose(&node, e);
                Verdict::SKIP
            }
        };
        let below = if expand && verdict.descend {
            match self.enumerate(&node) {
                Ok(children) => Some(children),
                Err(e) => {
                    self.diagnose(&node, e);
                    None
                }
            }
        } else {
            None
        };
        let repeated = verdict.keep
            && survivors[..earlier]
                .iter()
                .any(|selected| self.same(&node, selected));
        if verdict.keep && !repeated {
            survivors.push(node);
        } else {
            self.nav.release(node);
        }
        below
    }

    /// Decides whether `handle` satisfies the step's role test and predicate.
    ///
    /// Attributes are fetched only when the role test, the predicate or the
    /// visibility filter needs them, and at most once per candidate.
    /// `position` is `None` when the node was not reached by enumerating its
    /// parent.
    fn judge(
        &mut self,
        step: &Step,
        handle: &NodeHandle,
        position: Option<SiblingPosition>,
    ) -> Result<Verdict, BridgeError> {
        let role_test = step.effective_role_test();
        let predicate = step.predicate.as_ref();
        let needs_snapshot = self.options.visible_only
            || matches!(role_test, RoleTest::Role(_))
            || predicate.is_some_and(|p| p.uses_attributes());
        let snapshot = match self.prefetched.remove(&handle.native()) {
            Some(snapshot) => snapshot,
            None if needs_snapshot => self.nav.attributes(handle)?,
            None => AttributeSnapshot::default(),
        };

        // Enumerated children were filtered already; this catches the nodes a
        // self step filters.
        if self.options.visible_only && !snapshot.has_state(State::Showing.as_str()) {
            log::trace!("{:?} is not showing; skipping its subtree", handle);
            return Ok(Verdict::SKIP);
        }
        if !role_test.matches(snapshot.role()) {
            return Ok(Verdict {
                keep: false,
                descend: true,
            });
        }

        let keep = match predicate {
            None => true,
            Some(predicate) => {
                let position = match position {
                    Some(position) => position,
                    None if predicate.uses_position() => self.nav.sibling_position(handle)?,
                    None => SiblingPosition::default(),
                };
                evaluate(predicate, &snapshot, position.position(), position.count)
            }
        };
        log::trace!("{:?} {}", handle, if keep { "matches" } else { "does not match" });
        Ok(Verdict {
            keep,
            descend: true,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CancelFlag;
    use axpath_query::parse;
    use axpath_traits::{BridgeOp, InMemoryBridge, NodeId, name_of};
    use axpath_types::SessionId;

    const VM: SessionId = SessionId::new(9);

    /// frame
    /// ├── panel "left"
    /// │   ├── label "a"
    /// │   └── panel "inner"
    /// │       └── label "b"
    /// └── panel "right"
    ///     └── label "c"
    fn tree() -> InMemoryBridge {
        let mut builder = InMemoryBridge::builder(VM);
        let root = builder.root("frame", "Main");
        let left = builder.child(root, "panel", "left");
        builder.child(left, "label", "a");
        let inner = builder.child(left, "panel", "inner");
        builder.child(inner, "label", "b");
        let right = builder.child(root, "panel", "right");
        builder.child(right, "label", "c");
        builder.build()
    }

    fn names(bridge: &InMemoryBridge, handles: &[NodeHandle]) -> Vec<String> {
        handles
            .iter()
            .map(|h| name_of(bridge, h).unwrap_or_default())
            .collect()
    }

    #[test]
    fn descendant_walk_is_pre_order() {
        let bridge = tree();
        let session = Session::new(VM, &bridge);
        let root = session.adopt(bridge.root());

        let found = resolve(&session, &parse("//label").unwrap(), &root).unwrap();
        assert_eq!(names(&bridge, &found), vec!["a", "b", "c"]);

        let panels = resolve(&session, &parse("//*").unwrap(), &root).unwrap();
        assert_eq!(
            names(&bridge, &panels),
            vec!["left", "a", "inner", "b", "right", "c"]
        );

        session.release_all(found);
        session.release_all(panels);
        session.release(root);
        assert_eq!(bridge.live_count(), 0);
        assert_eq!(bridge.invalid_releases(), 0);
    }

    #[test]
    fn overlapping_contexts_yield_each_node_once() {
        let bridge = tree();
        let session = Session::new(VM, &bridge);
        let root = session.adopt(bridge.root());

        // Both "left" and "inner" are contexts; "b" is below each of them.
        let found = resolve(&session, &parse("//panel//label").unwrap(), &root).unwrap();
        assert_eq!(names(&bridge, &found), vec!["a", "b", "c"]);

        session.release_all(found);
        session.release(root);
        assert_eq!(bridge.live_count(), 0);
    }

    #[test]
    fn nested_contexts_still_reach_deeper_under_max_depth() {
        let mut builder = InMemoryBridge::builder(VM);
        let root = builder.root("frame", "Main");
        let outer = builder.child(root, "panel", "outer");
        let middle = builder.child(outer, "panel", "middle");
        let inner = builder.child(middle, "panel", "inner");
        builder.child(inner, "label", "deep");
        let bridge = builder.build();
        let session = Session::new(VM, &bridge);
        let root = session.adopt(bridge.root());

        // "deep" is four levels below "outer" but within reach of "middle"
        // and "inner"; it is returned once.
        let found = Resolver::new(&session)
            .with_options(ResolveOptions::new().with_max_depth(3))
            .resolve(&parse("//panel//label").unwrap(), &root)
            .unwrap();
        assert_eq!(names(&bridge, &found), vec!["deep"]);

        session.release_all(found);
        session.release(root);
        assert_eq!(bridge.live_count(), 0);
        assert_eq!(bridge.invalid_releases(), 0);
    }

    #[test]
    fn find_first_stops_early_without_leaking() {
        let bridge = tree();
        let session = Session::new(VM, &bridge);
        let root = session.adopt(bridge.root());

        let first = Resolver::new(&session)
            .find_first(&parse("//label").unwrap(), &root)
            .unwrap()
            .unwrap();
        assert_eq!(name_of(&bridge, &first).as_deref(), Some("a"));
        session.release(first);
        session.release(root);
        assert_eq!(bridge.live_count(), 0);
        assert_eq!(session.stats().acquired, session.stats().released);
    }

    #[test]
    fn self_step_keeps_the_root_borrowed() {
        let bridge = tree();
        let session = Session::new(VM, &bridge);
        let root = session.adopt(bridge.root());

        let found = resolve(&session, &parse("/.").unwrap(), &root).unwrap();
        assert_eq!(found.len(), 1);
        assert!(found[0].is_borrowed());
        assert_eq!(found[0].native(), root.native());
        session.release_all(found);

        let filtered = resolve(&session, &parse("/.[@name='Other']").unwrap(), &root).unwrap();
        assert!(filtered.is_empty());

        session.release(root);
        assert_eq!(bridge.live_count(), 0);
    }

    #[test]
    fn unreadable_nodes_are_skipped_with_diagnostics() {
        let bridge = tree();
        bridge.fail_on(NodeId(3), BridgeOp::Attributes, 5);
        let session = Session::new(VM, &bridge);
        let root = session.adopt(bridge.root());

        let resolution = Resolver::new(&session)
            .resolve_detailed(&parse("//*[@name!='zzz']").unwrap(), &root)
            .unwrap();
        // "inner" and everything below it are gone.
        assert_eq!(
            names(&bridge, &resolution.matches),
            vec!["left", "a", "right", "c"]
        );
        assert_eq!(
            resolution.diagnostics,
            vec![BridgeError::new(BridgeOp::Attributes, 5)]
        );

        session.release_all(resolution.matches);
        session.release(root);
        assert_eq!(bridge.live_count(), 0);
    }

    #[test]
    fn root_failures_are_fatal() {
        let bridge = tree();
        bridge.fail_on(NodeId(0), BridgeOp::Children, 7);
        let session = Session::new(VM, &bridge);
        let root = session.adopt(bridge.root());

        let err = resolve(&session, &parse("//label").unwrap(), &root).unwrap_err();
        assert_eq!(
            err,
            ResolveError::RootUnreachable(BridgeError::new(BridgeOp::Children, 7))
        );
        session.release(root);
        assert_eq!(bridge.live_count(), 0);
    }

    #[test]
    fn foreign_root_is_rejected() {
        let bridge = tree();
        let session = Session::new(SessionId::new(10), &bridge);
        let root = bridge.root();

        let err = resolve(&session, &parse("//label").unwrap(), &root).unwrap_err();
        assert_eq!(
            err,
            ResolveError::SessionMismatch {
                expected: SessionId::new(10),
                found: VM
            }
        );
        assert_eq!(bridge.live_count(), 1);
    }

    #[test]
    fn cancelled_walk_releases_everything() {
        let bridge = tree();
        let session = Session::new(VM, &bridge);
        let root = session.adopt(bridge.root());
        let flag = CancelFlag::new();
        flag.cancel();

        let err = Resolver::new(&session)
            .with_options(ResolveOptions::new().with_cancel_flag(flag))
            .resolve(&parse("//panel/label").unwrap(), &root)
            .unwrap_err();
        assert_eq!(err, ResolveError::Cancelled);

        session.release(root);
        assert_eq!(bridge.live_count(), 0);
        assert_eq!(session.stats().rejected, 0);
    }

    #[test]
    fn max_depth_bounds_descendant_steps() {
        let bridge = tree();
        let session = Session::new(VM, &bridge);
        let root = session.adopt(bridge.root());

        let found = Resolver::new(&session)
            .with_options(ResolveOptions::new().with_max_depth(2))
            .resolve(&parse("//label").unwrap(), &root)
            .unwrap();
        assert_eq!(names(&bridge, &found), vec!["a", "c"]);

        session.release_all(found);
        session.release(root);
        assert_eq!(bridge.live_count(), 0);
    }
}
