//! # axpath-core
//!
//! Resolution of parsed queries against a live accessibility tree.
//!
//! - **session**: one connected process, its bridge, and the ledger of
//!   handles acquired through it
//! - **navigator**: children, parent, attributes and identity on top of a
//!   session, with automatic release of unvisited children
//! - **evaluator**: pure predicate evaluation over attribute snapshots
//! - **resolver**: the step-by-step frontier walk
//! - **config**: per-call limits (visibility, depth, deadline, cancellation)
//!
//! ```no_run
//! use axpath_core::{Session, resolve};
//! use axpath_query::parse;
//! use axpath_traits::InMemoryBridge;
//! use axpath_types::SessionId;
//!
//! let bridge = InMemoryBridge::from_json(SessionId::new(1), r#"{"role": "frame"}"#).unwrap();
//! let session = Session::new(SessionId::new(1), &bridge);
//! let root = session.adopt(bridge.root());
//! let found = resolve(&session, &parse("//check box[@name='Chin']").unwrap(), &root).unwrap();
//! session.release_all(found);
//! session.release(root);
//! ```

pub mod config;
pub mod error;
pub mod evaluator;
pub mod navigator;
pub mod resolver;
pub mod session;

pub use config::{CancelFlag, ResolveOptions};
pub use error::ResolveError;
pub use evaluator::evaluate;
pub use navigator::{Children, SiblingPosition, TreeNavigator};
pub use resolver::{Resolution, Resolver, resolve};
pub use session::{HandleStats, Session};

pub use axpath_query as query;
pub use axpath_traits as traits;
pub use axpath_types as types;
