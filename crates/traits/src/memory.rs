//! A deterministic, in-memory accessibility tree.
//!
//! `InMemoryBridge` behaves like a native bridge as far as handle lifetime is
//! concerned: every acquisition yields a fresh native reference, references
//! must be released exactly once, and identity is only observable through
//! `is_same_object`. It keeps counters so tests can prove that a walk neither
//! leaks nor double-frees, and it can be told to fail specific calls.

use crate::bridge::{AccessBridge, BridgeError, BridgeOp};
use axpath_types::snapshot::{
    self, AttrValue, CHILDREN_COUNT, DESCRIPTION, INDEX_IN_PARENT, NAME, OBJECT_DEPTH, ROLE,
    ROLE_EN_US, STATES, STATES_EN_US,
};
use axpath_types::{AttributeSnapshot, Capabilities, Capability, NativeRef, NodeHandle, SessionId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use thiserror::Error;

/// Error code reported for a reference that is unknown or already released.
pub const INVALID_REFERENCE: i32 = -1;
/// Error code reported for a handle that belongs to another session.
pub const FOREIGN_SESSION: i32 = -2;

/// Index of a node inside an `InMemoryBridge`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub usize);

/// Errors raised while loading a tree fixture.
#[derive(Error, Debug)]
pub enum FixtureError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid fixture: {0}")]
    Json(#[from] serde_json::Error),
}

/// The serialized form of a tree, as read from a JSON fixture.
///
/// ```json
/// { "role": "panel", "children": [
///     { "role": "check box", "name": "Chin", "states": "enabled,visible,showing" }
/// ] }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FixtureNode {
    pub role: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Comma-separated `en_US` states.
    #[serde(default)]
    pub states: String,
    #[serde(default)]
    pub capabilities: Vec<Capability>,
    /// Any further attributes (`x`, `y`, `width`, `height`, ...).
    #[serde(default)]
    pub attributes: BTreeMap<String, AttrValue>,
    #[serde(default)]
    pub children: Vec<FixtureNode>,
}

#[derive(Debug)]
struct Node {
    base: AttributeSnapshot,
    capabilities: Capabilities,
    parent: Option<usize>,
    children: Vec<usize>,
    depth: usize,
}

#[derive(Debug, Default)]
struct BridgeState {
    next_ref: u64,
    live: HashMap<u64, usize>,
    acquired: u64,
    released: u64,
    invalid_releases: u64,
    failures: HashMap<(usize, BridgeOp), i32>,
}

/// Builds an `InMemoryBridge` node by node.
#[derive(Debug)]
pub struct TreeBuilder {
    session: SessionId,
    nodes: Vec<Node>,
}

impl TreeBuilder {
    pub fn new(session: SessionId) -> Self {
        Self {
            session,
            nodes: Vec::new(),
        }
    }

    /// Adds the root node. Must be called first, and only once.
    pub fn root(&mut self, role: &str, name: &str) -> NodeId {
        assert!(self.nodes.is_empty(), "the tree already has a root");
        self.push(None, role, name)
    }

    /// Appends a node as the last child of `parent`.
    pub fn child(&mut self, parent: NodeId, role: &str, name: &str) -> NodeId {
        self.push(Some(parent.0), role, name)
    }

    pub fn description(&mut self, node: NodeId, description: &str) -> &mut Self {
        self.nodes[node.0].base.insert(DESCRIPTION, description);
        self
    }

    /// Sets the comma-separated state list reported as both `states` and `states_en_us`.
    pub fn states(&mut self, node: NodeId, csv: &str) -> &mut Self {
        let base = &mut self.nodes[node.0].base;
        base.insert(STATES, AttrValue::states_from_csv(csv));
        base.insert(STATES_EN_US, AttrValue::states_from_csv(csv));
        self
    }

    pub fn attr(&mut self, node: NodeId, name: &str, value: impl Into<AttrValue>) -> &mut Self {
        self.nodes[node.0].base.insert(name, value);
        self
    }

    pub fn capability(&mut self, node: NodeId, capability: Capability) -> &mut Self {
        let caps = &mut self.nodes[node.0].capabilities;
        *caps = caps.with(capability);
        self
    }

    pub fn build(self) -> InMemoryBridge {
        InMemoryBridge {
            session: self.session,
            nodes: self.nodes,
            state: Mutex::new(BridgeState::default()),
        }
    }

    fn push(&mut self, parent: Option<usize>, role: &str, name: &str) -> NodeId {
        let id = self.nodes.len();
        let depth = parent.map_or(0, |p| self.nodes[p].depth + 1);
        let base = AttributeSnapshot::new()
            .with(ROLE, role)
            .with(ROLE_EN_US, role)
            .with(NAME, name)
            .with(DESCRIPTION, "");
        self.nodes.push(Node {
            base,
            capabilities: Capabilities::empty().with(Capability::Component),
            parent,
            children: Vec::new(),
            depth,
        });
        if let Some(p) = parent {
            self.nodes[p].children.push(id);
        }
        NodeId(id)
    }

    fn push_fixture(&mut self, parent: Option<NodeId>, fixture: &FixtureNode) {
        let id = match parent {
            Some(p) => self.child(p, &fixture.role, &fixture.name),
            None => self.root(&fixture.role, &fixture.name),
        };
        self.description(id, &fixture.description);
        if !fixture.states.is_empty() {
            self.states(id, &fixture.states);
        }
        for capability in &fixture.capabilities {
            self.capability(id, *capability);
        }
        for (name, value) in &fixture.attributes {
            self.attr(id, name, value.clone());
        }
        for child in &fixture.children {
            self.push_fixture(Some(id), child);
        }
    }
}

/// An `AccessBridge` over a tree held in memory.
#[derive(Debug)]
pub struct InMemoryBridge {
    session: SessionId,
    nodes: Vec<Node>,
    state: Mutex<BridgeState>,
}

impl InMemoryBridge {
    pub fn builder(session: SessionId) -> TreeBuilder {
        TreeBuilder::new(session)
    }

    pub fn from_fixture(session: SessionId, fixture: &FixtureNode) -> Self {
        let mut builder = TreeBuilder::new(session);
        builder.push_fixture(None, fixture);
        builder.build()
    }

    pub fn from_json(session: SessionId, json: &str) -> Result<Self, FixtureError> {
        let fixture: FixtureNode = serde_json::from_str(json)?;
        Ok(Self::from_fixture(session, &fixture))
    }

    pub fn from_json_file<P: AsRef<Path>>(session: SessionId, path: P) -> Result<Self, FixtureError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(session, &json)
    }

    pub fn session(&self) -> SessionId {
        self.session
    }

    /// Acquires a handle to the root node. The caller owns it.
    pub fn root(&self) -> NodeHandle {
        self.acquire(NodeId(0))
    }

    /// Acquires a fresh handle to any node. The caller owns it.
    pub fn acquire(&self, node: NodeId) -> NodeHandle {
        let mut state = self.lock();
        state.next_ref += 1;
        // Offset the raw values so that no reference ever equals a node index.
        let raw = 0x1000 + state.next_ref;
        state.live.insert(raw, node.0);
        state.acquired += 1;
        NodeHandle::owned(self.session, NativeRef::new(raw), self.nodes[node.0].capabilities)
    }

    /// The node a live handle points at, if any.
    pub fn node_of(&self, handle: &NodeHandle) -> Option<NodeId> {
        self.lock().live.get(&handle.native().get()).copied().map(NodeId)
    }

    /// Makes every future `op` call on `node` fail with `code`.
    pub fn fail_on(&self, node: NodeId, op: BridgeOp, code: i32) {
        self.lock().failures.insert((node.0, op), code);
    }

    pub fn acquired(&self) -> u64 {
        self.lock().acquired
    }

    pub fn released(&self) -> u64 {
        self.lock().released
    }

    /// Release calls for references that were unknown or already released.
    pub fn invalid_releases(&self) -> u64 {
        self.lock().invalid_releases
    }

    /// References acquired and not yet released.
    pub fn live_count(&self) -> usize {
        self.lock().live.len()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    fn lock(&self) -> MutexGuard<'_, BridgeState> {
        // The state holds plain counters; a panic while holding the lock cannot
        // leave it half-updated in a way that matters to callers.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn resolve(&self, handle: &NodeHandle, op: BridgeOp) -> Result<usize, BridgeError> {
        if handle.session() != self.session {
            return Err(BridgeError::new(op, FOREIGN_SESSION));
        }
        let state = self.lock();
        let node = state
            .live
            .get(&handle.native().get())
            .copied()
            .ok_or(BridgeError::new(op, INVALID_REFERENCE))?;
        if let Some(code) = state.failures.get(&(node, op)) {
            return Err(BridgeError::new(op, *code));
        }
        Ok(node)
    }

    fn sibling_index_of(&self, node: usize) -> (u32, u32) {
        match self.nodes[node].parent {
            Some(parent) => {
                let siblings = &self.nodes[parent].children;
                let index = siblings.iter().position(|&c| c == node).unwrap_or(0);
                (index as u32, siblings.len() as u32)
            }
            None => (0, 1),
        }
    }
}

impl AccessBridge for InMemoryBridge {
    fn children(&self, handle: &NodeHandle) -> Result<Vec<NodeHandle>, BridgeError> {
        let node = self.resolve(handle, BridgeOp::Children)?;
        Ok(self.nodes[node]
            .children
            .iter()
            .map(|&child| self.acquire(NodeId(child)))
            .collect())
    }

    fn parent(&self, handle: &NodeHandle) -> Result<Option<NodeHandle>, BridgeError> {
        let node = self.resolve(handle, BridgeOp::Parent)?;
        Ok(self.nodes[node].parent.map(|p| self.acquire(NodeId(p))))
    }

    fn attributes(&self, handle: &NodeHandle) -> Result<AttributeSnapshot, BridgeError> {
        let node = self.resolve(handle, BridgeOp::Attributes)?;
        let data = &self.nodes[node];
        let (index, _) = self.sibling_index_of(node);
        let mut snapshot = data.base.clone();
        snapshot.insert(INDEX_IN_PARENT, i64::from(index));
        snapshot.insert(CHILDREN_COUNT, data.children.len() as i64);
        snapshot.insert(OBJECT_DEPTH, data.depth as i64);
        if snapshot.get(STATES).is_none() {
            snapshot.insert(STATES, AttrValue::States(Default::default()));
            snapshot.insert(STATES_EN_US, AttrValue::States(Default::default()));
        }
        Ok(snapshot)
    }

    fn sibling_index(&self, handle: &NodeHandle) -> Result<(u32, u32), BridgeError> {
        let node = self.resolve(handle, BridgeOp::SiblingIndex)?;
        Ok(self.sibling_index_of(node))
    }

    fn is_same_object(&self, a: &NodeHandle, b: &NodeHandle) -> Result<bool, BridgeError> {
        let left = self.resolve(a, BridgeOp::SameObject)?;
        let right = self.resolve(b, BridgeOp::SameObject)?;
        Ok(left == right)
    }

    fn release(&self, handle: NodeHandle) -> Result<(), BridgeError> {
        let mut state = self.lock();
        let raw = handle.native().get();
        match state.live.remove(&raw) {
            Some(node) => {
                state.released += 1;
                match state.failures.get(&(node, BridgeOp::Release)) {
                    Some(code) => Err(BridgeError::new(BridgeOp::Release, *code)),
                    None => Ok(()),
                }
            }
            None => {
                state.invalid_releases += 1;
                log::warn!("{}: release of unknown reference {}", self.name(), handle.native());
                Err(BridgeError::new(BridgeOp::Release, INVALID_REFERENCE))
            }
        }
    }

    fn name(&self) -> &'static str {
        "in-memory"
    }
}

/// Convenience for tests: the `name` of the node behind a live handle.
pub fn name_of(bridge: &InMemoryBridge, handle: &NodeHandle) -> Option<String> {
    let node = bridge.node_of(handle)?;
    bridge.nodes[node.0].base.text(snapshot::NAME).map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn sample() -> InMemoryBridge {
        let mut builder = InMemoryBridge::builder(SessionId::new(1));
        let root = builder.root("frame", "Main");
        let panel = builder.child(root, "panel", "");
        let chin = builder.child(panel, "check box", "Chin");
        builder.states(chin, "enabled,focusable,visible,showing");
        builder.child(panel, "check box", "Hair");
        builder.build()
    }

    #[test]
    fn every_acquisition_gets_a_fresh_reference() {
        let bridge = sample();
        let a = bridge.root();
        let b = bridge.root();
        assert_ne!(a.native(), b.native());
        assert!(bridge.is_same_object(&a, &b).unwrap());
        bridge.release(a).unwrap();
        bridge.release(b).unwrap();
        assert_eq!(bridge.live_count(), 0);
        assert_eq!(bridge.acquired(), bridge.released());
    }

    #[test]
    fn computed_attributes() {
        let bridge = sample();
        let root = bridge.root();
        let panel = bridge.children(&root).unwrap().pop().unwrap();
        let mut boxes = bridge.children(&panel).unwrap();
        let hair = boxes.pop().unwrap();
        let chin = boxes.pop().unwrap();

        let snapshot = bridge.attributes(&chin).unwrap();
        assert_eq!(snapshot.name(), Some("Chin"));
        assert_eq!(snapshot.role(), Some("check box"));
        assert_eq!(snapshot.int("objectdepth"), Some(2));
        assert_eq!(snapshot.int("indexinparent"), Some(0));
        assert_eq!(snapshot.int("childrencount"), Some(0));
        assert!(snapshot.has_state("focusable"));
        assert_eq!(bridge.sibling_index(&hair).unwrap(), (1, 2));
        assert_eq!(bridge.sibling_index(&root).unwrap(), (0, 1));

        let parent = bridge.parent(&chin).unwrap().unwrap();
        assert!(bridge.is_same_object(&parent, &panel).unwrap());

        for handle in [root, panel, hair, chin, parent] {
            bridge.release(handle).unwrap();
        }
        assert_eq!(bridge.live_count(), 0);
    }

    #[test]
    fn released_references_are_invalid() {
        let bridge = sample();
        let root = bridge.root();
        let stale = root.borrowed();
        bridge.release(root).unwrap();

        let err = bridge.children(&stale).unwrap_err();
        assert_eq!(err, BridgeError::new(BridgeOp::Children, INVALID_REFERENCE));
        assert!(bridge.release(stale).is_err());
        assert_eq!(bridge.invalid_releases(), 1);
    }

    #[test]
    fn injected_failures() {
        let bridge = sample();
        bridge.fail_on(NodeId(1), BridgeOp::Attributes, 42);
        let root = bridge.root();
        let panel = bridge.children(&root).unwrap().pop().unwrap();
        assert_eq!(
            bridge.attributes(&panel).unwrap_err(),
            BridgeError::new(BridgeOp::Attributes, 42)
        );
        assert!(bridge.attributes(&root).is_ok());
        bridge.release(panel).unwrap();
        bridge.release(root).unwrap();
    }

    #[test]
    fn foreign_session_is_rejected() {
        let bridge = sample();
        let foreign = NodeHandle::owned(SessionId::new(9), NativeRef::new(0x1001), Capabilities::empty());
        assert_eq!(
            bridge.attributes(&foreign).unwrap_err().code,
            FOREIGN_SESSION
        );
    }

    #[test]
    fn loads_json_fixture_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{
                "role": "frame",
                "name": "Main",
                "children": [
                    {{ "role": "text", "name": "Search", "states": "editable,visible",
                       "capabilities": ["text", "action"],
                       "attributes": {{ "x": 10, "width": 200 }} }}
                ]
            }}"#
        )
        .unwrap();

        let bridge = InMemoryBridge::from_json_file(SessionId::new(3), file.path()).unwrap();
        assert_eq!(bridge.node_count(), 2);
        let root = bridge.root();
        let text = bridge.children(&root).unwrap().pop().unwrap();
        assert!(text.supports(Capability::Text));
        assert!(text.supports(Capability::Action));
        assert!(!text.supports(Capability::Table));
        let snapshot = bridge.attributes(&text).unwrap();
        assert_eq!(snapshot.int("width"), Some(200));
        assert!(snapshot.has_state("editable"));
        assert_eq!(name_of(&bridge, &text).as_deref(), Some("Search"));
        bridge.release(text).unwrap();
        bridge.release(root).unwrap();
    }

    #[test]
    fn malformed_fixture_is_an_error() {
        let err = InMemoryBridge::from_json(SessionId::new(1), "{ \"name\": 3 }").unwrap_err();
        assert!(matches!(err, FixtureError::Json(_)));
    }
}
