//! # axpath
//!
//! XPath-style queries over live accessibility trees.
//!
//! A query such as `//panel/check box[@name='Chin' and @states='enabled']`
//! is parsed once into an immutable [`Query`] and resolved any number of
//! times against the tree of a [`Session`], yielding owned [`NodeHandle`]s.
//!
//! The workspace is split the same way the engine is layered:
//! - **axpath-types**: handles, session ids, roles, states, attribute snapshots
//! - **axpath-traits**: the `AccessBridge` trait and an in-memory bridge
//! - **axpath-query**: the query lexer, predicate parser and locators
//! - **axpath-core**: sessions, navigation, predicate evaluation, resolution

pub mod error;

pub use error::AxPathError;

pub use axpath_core::{
    CancelFlag, HandleStats, Resolution, ResolveError, ResolveOptions, Resolver, Session,
    TreeNavigator, evaluate,
};
pub use axpath_query::{Axis, By, ParseError, Predicate, Query, RoleTest, Step};
pub use axpath_traits::{AccessBridge, BridgeError, BridgeOp, InMemoryBridge};
pub use axpath_types::{AttrValue, AttributeSnapshot, NodeHandle, SessionId};

/// Parses a query string.
pub fn parse(query: &str) -> Result<Query, ParseError> {
    axpath_query::parse(query)
}

/// Resolves `query` below `root` with default options.
///
/// The returned handles are owned by the caller, who releases them through
/// the session when done.
pub fn resolve<B: AccessBridge>(
    session: &Session<B>,
    query: &Query,
    root: &NodeHandle,
) -> Result<Vec<NodeHandle>, ResolveError> {
    axpath_core::resolve(session, query, root)
}

/// Every element below `root` matching a locator.
pub fn find_elements<B: AccessBridge>(
    session: &Session<B>,
    by: &By,
    root: &NodeHandle,
) -> Result<Vec<NodeHandle>, AxPathError> {
    find_elements_with(session, by, root, &ResolveOptions::default())
}

/// [`find_elements`] under the given options, e.g. visible elements only.
pub fn find_elements_with<B: AccessBridge>(
    session: &Session<B>,
    by: &By,
    root: &NodeHandle,
    options: &ResolveOptions,
) -> Result<Vec<NodeHandle>, AxPathError> {
    let query = by.to_query()?;
    let resolver = Resolver::new(session).with_options(options.clone());
    Ok(resolver.resolve(&query, root)?)
}

/// The first element below `root` matching a locator, in document order.
pub fn find_element<B: AccessBridge>(
    session: &Session<B>,
    by: &By,
    root: &NodeHandle,
) -> Result<Option<NodeHandle>, AxPathError> {
    find_element_with(session, by, root, &ResolveOptions::default())
}

pub fn find_element_with<B: AccessBridge>(
    session: &Session<B>,
    by: &By,
    root: &NodeHandle,
    options: &ResolveOptions,
) -> Result<Option<NodeHandle>, AxPathError> {
    let query = by.to_query()?;
    let resolver = Resolver::new(session).with_options(options.clone());
    Ok(resolver.find_first(&query, root)?)
}

/// Reads the attributes of every handle, skipping the ones the bridge
/// cannot read.
pub fn snapshots<B: AccessBridge>(
    session: &Session<B>,
    handles: &[NodeHandle],
) -> Vec<AttributeSnapshot> {
    let nav = session.navigator();
    handles
        .iter()
        .filter_map(|handle| match nav.attributes(handle) {
            Ok(snapshot) => Some(snapshot),
            Err(e) => {
                log::warn!("Cannot read {:?}: {}", handle, e);
                None
            }
        })
        .collect()
}
