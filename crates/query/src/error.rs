use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error("Invalid predicate '{0}'")]
    InvalidPredicate(String),
}
