#![allow(dead_code)]

use axpath::{
    AccessBridge, AttributeSnapshot, BridgeError, BridgeOp, CancelFlag, InMemoryBridge, NodeHandle,
    Session, SessionId,
};
use axpath_traits::{NodeId, name_of};
use std::collections::HashMap;
use std::sync::Mutex;

pub type TestResult = Result<(), Box<dyn std::error::Error>>;

pub const VM: SessionId = SessionId::new(42);

pub const ROOT: NodeId = NodeId(0);
pub const TOOLBAR: NodeId = NodeId(1);
pub const OPEN: NodeId = NodeId(2);
pub const SAVE: NodeId = NodeId(3);
pub const CLOSE: NodeId = NodeId(4);
pub const FACE: NodeId = NodeId(5);
pub const CHIN: NodeId = NodeId(6);
pub const HAIR: NodeId = NodeId(7);
pub const STATUS: NodeId = NodeId(8);

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// The shared test window:
///
/// ```text
/// frame "Main"
/// ├── panel "toolbar"
/// │   ├── push button "Open"
/// │   ├── push button "Save"
/// │   └── push button "Close"        (not showing)
/// ├── panel "face"
/// │   ├── check box "Chin"           (focused)
/// │   └── check box "Hair"
/// └── text ""                        (description "Ready")
/// ```
pub fn window() -> InMemoryBridge {
    let mut b = InMemoryBridge::builder(VM);
    let root = b.root("frame", "Main");
    let toolbar = b.child(root, "panel", "toolbar");
    let open = b.child(toolbar, "push button", "Open");
    let save = b.child(toolbar, "push button", "Save");
    let close = b.child(toolbar, "push button", "Close");
    let face = b.child(root, "panel", "face");
    let chin = b.child(face, "check box", "Chin");
    let hair = b.child(face, "check box", "Hair");
    let status = b.child(root, "text", "");

    for node in [root, toolbar, open, save, face, hair, status] {
        b.states(node, "enabled,showing,visible");
    }
    b.states(close, "enabled,visible");
    b.states(chin, "enabled,focused,focusable,showing,visible");
    b.description(status, "Ready");
    b.build()
}

/// A frame holding one panel with two check boxes.
pub fn face() -> InMemoryBridge {
    let mut b = InMemoryBridge::builder(VM);
    let root = b.root("frame", "Main");
    let panel = b.child(root, "panel", "face");
    b.child(panel, "check box", "Chin");
    b.child(panel, "check box", "Hair");
    b.build()
}

/// Names of the nodes behind `handles`, in order.
pub fn names(bridge: &InMemoryBridge, handles: &[NodeHandle]) -> Vec<String> {
    handles
        .iter()
        .map(|h| name_of(bridge, h).unwrap_or_default())
        .collect()
}

/// Releases the results and the root, then checks that every native
/// reference was released exactly once.
pub fn finish<B: AccessBridge>(
    bridge: &InMemoryBridge,
    session: &Session<B>,
    found: Vec<NodeHandle>,
    root: NodeHandle,
) {
    session.release_all(found);
    session.release(root);
    assert_eq!(bridge.live_count(), 0, "handles leaked");
    assert_eq!(bridge.invalid_releases(), 0, "a release reached the bridge twice");
    assert_eq!(bridge.acquired(), bridge.released());
    let stats = session.stats();
    assert_eq!(stats.outstanding, 0);
    assert_eq!(stats.rejected, 0);
}

/// A frame holding `panels` panels of `labels` labels each.
pub fn grid(panels: usize, labels: usize) -> InMemoryBridge {
    let mut b = InMemoryBridge::builder(VM);
    let root = b.root("frame", "Main");
    for p in 0..panels {
        let panel = b.child(root, "panel", &format!("panel {p}"));
        for l in 0..labels {
            b.child(panel, "label", &format!("label {p}.{l}"));
        }
    }
    b.build()
}

/// Three levels of panels, three wide, with three labels under each
/// innermost panel.
pub fn nested() -> InMemoryBridge {
    let mut b = InMemoryBridge::builder(VM);
    let root = b.root("frame", "Main");
    for i in 0..3 {
        let outer = b.child(root, "panel", &format!("p{i}"));
        for j in 0..3 {
            let inner = b.child(outer, "panel", &format!("p{i}.{j}"));
            for k in 0..3 {
                b.child(inner, "label", &format!("l{i}.{j}.{k}"));
            }
        }
    }
    b.build()
}

/// Counts every call made through it, and can trip a cancel flag once a
/// given number of calls has been made.
#[derive(Debug)]
pub struct CountingBridge {
    inner: InMemoryBridge,
    counts: Mutex<HashMap<BridgeOp, usize>>,
    trip: Option<(usize, CancelFlag)>,
}

impl CountingBridge {
    pub fn new(inner: InMemoryBridge) -> Self {
        Self {
            inner,
            counts: Mutex::new(HashMap::new()),
            trip: None,
        }
    }

    /// Cancels `flag` as soon as `calls` calls have gone through.
    pub fn cancelling_after(inner: InMemoryBridge, calls: usize, flag: CancelFlag) -> Self {
        Self {
            trip: Some((calls, flag)),
            ..Self::new(inner)
        }
    }

    pub fn inner(&self) -> &InMemoryBridge {
        &self.inner
    }

    pub fn calls(&self, op: BridgeOp) -> usize {
        self.counts.lock().unwrap().get(&op).copied().unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.counts.lock().unwrap().values().sum()
    }

    fn record(&self, op: BridgeOp) {
        let total = {
            let mut counts = self.counts.lock().unwrap();
            *counts.entry(op).or_insert(0) += 1;
            counts.values().sum::<usize>()
        };
        if let Some((after, flag)) = &self.trip {
            if total >= *after {
                flag.cancel();
            }
        }
    }
}

impl AccessBridge for CountingBridge {
    fn children(&self, handle: &NodeHandle) -> Result<Vec<NodeHandle>, BridgeError> {
        self.record(BridgeOp::Children);
        self.inner.children(handle)
    }

    fn parent(&self, handle: &NodeHandle) -> Result<Option<NodeHandle>, BridgeError> {
        self.record(BridgeOp::Parent);
        self.inner.parent(handle)
    }

    fn attributes(&self, handle: &NodeHandle) -> Result<AttributeSnapshot, BridgeError> {
        self.record(BridgeOp::Attributes);
        self.inner.attributes(handle)
    }

    fn sibling_index(&self, handle: &NodeHandle) -> Result<(u32, u32), BridgeError> {
        self.record(BridgeOp::SiblingIndex);
        self.inner.sibling_index(handle)
    }

    fn is_same_object(&self, a: &NodeHandle, b: &NodeHandle) -> Result<bool, BridgeError> {
        self.record(BridgeOp::SameObject);
        self.inner.is_same_object(a, b)
    }

    fn release(&self, handle: NodeHandle) -> Result<(), BridgeError> {
        self.record(BridgeOp::Release);
        self.inner.release(handle)
    }

    fn name(&self) -> &'static str {
        "counting"
    }
}
