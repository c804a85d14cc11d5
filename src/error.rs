// src/error.rs
use axpath_core::ResolveError;
use axpath_query::ParseError;
use axpath_traits::FixtureError;
use thiserror::Error;

/// Any failure of a top-level lookup or of the command-line tool.
#[derive(Error, Debug)]
pub enum AxPathError {
    #[error("Query is invalid: {0}")]
    Parse(#[from] ParseError),

    #[error("Resolution failed: {0}")]
    Resolve(#[from] ResolveError),

    #[error("Tree fixture could not be loaded: {0}")]
    Fixture(#[from] FixtureError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
