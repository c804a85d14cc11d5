//! Tree navigation on top of a session.
//!
//! `TreeNavigator` is the only code that calls the bridge's acquiring
//! primitives. Every handle it returns has been recorded in the session's
//! ledger, and [`Children`] hands any handle it never yielded back to the
//! session when dropped, so a walk that stops early cannot leak.

use crate::session::Session;
use axpath_traits::{AccessBridge, BridgeError};
use axpath_types::{AttributeSnapshot, NodeHandle};
use std::vec;

/// Where a node sits among its siblings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SiblingPosition {
    /// 0-based index in the parent's child list.
    pub index: u32,
    /// Number of children the parent has.
    pub count: u32,
}

impl SiblingPosition {
    /// The 1-based position used by `[n]` and `last()`.
    pub fn position(self) -> u32 {
        self.index + 1
    }

    pub fn is_last(self) -> bool {
        self.position() == self.count
    }
}

impl Default for SiblingPosition {
    /// The position of a node with no siblings.
    fn default() -> Self {
        Self { index: 0, count: 1 }
    }
}

/// Navigation primitives bound to one session.
#[derive(Debug)]
pub struct TreeNavigator<'s, B: AccessBridge> {
    session: &'s Session<B>,
}

impl<B: AccessBridge> Clone for TreeNavigator<'_, B> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<B: AccessBridge> Copy for TreeNavigator<'_, B> {}

impl<'s, B: AccessBridge> TreeNavigator<'s, B> {
    pub fn new(session: &'s Session<B>) -> Self {
        Self { session }
    }

    pub fn session(&self) -> &'s Session<B> {
        self.session
    }

    /// Fetches the children of `handle`, in enumeration order.
    pub fn children(&self, handle: &NodeHandle) -> Result<Children<'s, B>, BridgeError> {
        let handles = self.session.bridge().children(handle)?;
        for child in &handles {
            self.session.track(child);
        }
        log::trace!("{:?} has {} children", handle, handles.len());
        Ok(Children {
            session: self.session,
            count: handles.len() as u32,
            next_index: 0,
            handles: handles.into_iter(),
        })
    }

    /// Fetches the parent of `handle`, or `None` at the top of the tree.
    pub fn parent(&self, handle: &NodeHandle) -> Result<Option<NodeHandle>, BridgeError> {
        let parent = self.session.bridge().parent(handle)?;
        if let Some(parent) = &parent {
            self.session.track(parent);
        }
        Ok(parent)
    }

    pub fn attributes(&self, handle: &NodeHandle) -> Result<AttributeSnapshot, BridgeError> {
        self.session.bridge().attributes(handle)
    }

    /// Asks the bridge where `handle` sits among its siblings.
    ///
    /// Used when a node's position was not observed by enumerating its
    /// parent, as for the nodes a self step filters.
    pub fn sibling_position(&self, handle: &NodeHandle) -> Result<SiblingPosition, BridgeError> {
        let (index, count) = self.session.bridge().sibling_index(handle)?;
        Ok(SiblingPosition { index, count })
    }

    /// Whether two handles denote the same element. Handle equality is never
    /// used for this: each acquisition yields a different native reference.
    pub fn same_object(&self, a: &NodeHandle, b: &NodeHandle) -> Result<bool, BridgeError> {
        self.session.bridge().is_same_object(a, b)
    }

    pub fn release(&self, handle: NodeHandle) {
        self.session.release(handle);
    }

    pub fn release_all<I: IntoIterator<Item = NodeHandle>>(&self, handles: I) {
        self.session.release_all(handles);
    }
}

/// The children of one node, yielded with their sibling positions.
///
/// Children that are never taken out of the iterator are released when it
/// is dropped.
#[derive(Debug)]
pub struct Children<'s, B: AccessBridge> {
    session: &'s Session<B>,
    handles: vec::IntoIter<NodeHandle>,
    count: u32,
    next_index: u32,
}

impl<B: AccessBridge> Children<'_, B> {
    /// Number of children the parent had when enumerated.
    pub fn sibling_count(&self) -> u32 {
        self.count
    }

    /// Keeps only the unvisited children for which `keep` holds, releasing
    /// the others. Positions of the kept children are renumbered among
    /// themselves.
    pub fn retain<F: FnMut(&NodeHandle) -> bool>(&mut self, mut keep: F) {
        let mut kept = Vec::with_capacity(self.handles.len());
        for handle in self.handles.by_ref() {
            if keep(&handle) {
                kept.push(handle);
            } else {
                self.session.release(handle);
            }
        }
        self.count = self.next_index + kept.len() as u32;
        self.handles = kept.into_iter();
    }
}

impl<B: AccessBridge> Iterator for Children<'_, B> {
    type Item = (NodeHandle, SiblingPosition);

    fn next(&mut self) -> Option<Self::Item> {
        let handle = self.handles.next()?;
        let position = SiblingPosition {
            index: self.next_index,
            count: self.count,
        };
        self.next_index += 1;
        Some((handle, position))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.handles.size_hint()
    }
}

impl<B: AccessBridge> ExactSizeIterator for Children<'_, B> {}

impl<B: AccessBridge> Drop for Children<'_, B> {
    fn drop(&mut self) {
        let rest = self.handles.len();
        if rest > 0 {
            log::trace!("Releasing {} unvisited children", rest);
            self.session.release_all(self.handles.by_ref());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axpath_traits::{InMemoryBridge, NodeId, name_of};
    use axpath_types::SessionId;

    fn bridge() -> InMemoryBridge {
        let mut builder = InMemoryBridge::builder(SessionId::new(3));
        let root = builder.root("frame", "Main");
        let panel = builder.child(root, "panel", "body");
        builder.child(panel, "label", "first");
        builder.child(panel, "label", "second");
        builder.child(panel, "label", "third");
        builder.build()
    }

    #[test]
    fn children_carry_positions() {
        let bridge = bridge();
        let session = Session::new(SessionId::new(3), &bridge);
        let nav = session.navigator();
        let panel = session.adopt(bridge.acquire(NodeId(1)));

        let positions: Vec<(Option<String>, u32, bool)> = nav
            .children(&panel)
            .unwrap()
            .map(|(child, pos)| {
                let name = name_of(&bridge, &child);
                nav.release(child);
                (name, pos.position(), pos.is_last())
            })
            .collect();

        assert_eq!(
            positions,
            vec![
                (Some("first".to_string()), 1, false),
                (Some("second".to_string()), 2, false),
                (Some("third".to_string()), 3, true),
            ]
        );
        nav.release(panel);
        assert_eq!(bridge.live_count(), 0);
    }

    #[test]
    fn dropping_children_releases_the_rest() {
        let bridge = bridge();
        let session = Session::new(SessionId::new(3), &bridge);
        let nav = session.navigator();
        let panel = session.adopt(bridge.acquire(NodeId(1)));

        let mut children = nav.children(&panel).unwrap();
        assert_eq!(children.sibling_count(), 3);
        let (first, _) = children.next().unwrap();
        drop(children);

        // The panel and the one child we kept.
        assert_eq!(bridge.live_count(), 2);
        nav.release(first);
        nav.release(panel);
        assert_eq!(bridge.live_count(), 0);
        assert_eq!(bridge.invalid_releases(), 0);
    }

    #[test]
    fn retained_children_are_renumbered() {
        let bridge = bridge();
        let session = Session::new(SessionId::new(3), &bridge);
        let nav = session.navigator();
        let panel = session.adopt(bridge.acquire(NodeId(1)));

        let mut children = nav.children(&panel).unwrap();
        children.retain(|child| name_of(&bridge, child).as_deref() != Some("second"));
        assert_eq!(children.sibling_count(), 2);
        // Only the panel and the two kept labels are still live.
        assert_eq!(bridge.live_count(), 3);

        let positions: Vec<(Option<String>, u32, bool)> = children
            .map(|(child, pos)| {
                let name = name_of(&bridge, &child);
                nav.release(child);
                (name, pos.position(), pos.is_last())
            })
            .collect();
        assert_eq!(
            positions,
            vec![
                (Some("first".to_string()), 1, false),
                (Some("third".to_string()), 2, true),
            ]
        );
        nav.release(panel);
        assert_eq!(bridge.live_count(), 0);
        assert_eq!(session.stats().outstanding, 0);
    }

    #[test]
    fn parent_and_identity() {
        let bridge = bridge();
        let session = Session::new(SessionId::new(3), &bridge);
        let nav = session.navigator();
        let label = session.adopt(bridge.acquire(NodeId(2)));
        let panel = session.adopt(bridge.acquire(NodeId(1)));

        let parent = nav.parent(&label).unwrap().unwrap();
        assert_ne!(parent.native(), panel.native());
        assert!(nav.same_object(&parent, &panel).unwrap());
        assert!(!nav.same_object(&parent, &label).unwrap());

        let root = session.adopt(bridge.root());
        assert!(nav.parent(&root).unwrap().is_none());
        assert_eq!(nav.sibling_position(&root).unwrap(), SiblingPosition::default());

        session.release_all([label, panel, parent, root]);
        assert_eq!(session.stats().outstanding, 0);
        assert_eq!(bridge.live_count(), 0);
    }
}
