//! Error types for query resolution.

use axpath_traits::BridgeError;
use axpath_types::SessionId;
use thiserror::Error;

/// Why a resolution produced no result list at all.
///
/// Failures below the root are not errors: the affected node counts as a
/// non-match, its subtree is skipped, and the walk continues.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    #[error("Root node is unreachable: {0}")]
    RootUnreachable(#[source] BridgeError),

    #[error("Root handle belongs to session {found}, expected {expected}")]
    SessionMismatch {
        expected: SessionId,
        found: SessionId,
    },

    #[error("Resolution was cancelled")]
    Cancelled,

    #[error("Resolution deadline exceeded")]
    DeadlineExceeded,
}
