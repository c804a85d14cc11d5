//! Assembles raw steps and parsed predicates into an immutable `Query`.

use crate::ast::{Axis, Predicate, RoleTest, Step};
use crate::error::ParseError;
use crate::lexer::{self, RawStep};
use crate::parser::parse_predicate;
use axpath_types::Role;
use std::fmt;
use std::str::FromStr;

/// A parsed query: a non-empty, ordered list of steps.
///
/// A `Query` holds no reference to any tree and can be resolved any number of
/// times, against any session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    steps: Vec<Step>,
}

impl Query {
    /// Builds a query from steps assembled in code. Returns `None` for an empty list.
    pub fn from_steps(steps: Vec<Step>) -> Option<Self> {
        if steps.is_empty() {
            None
        } else {
            Some(Self { steps })
        }
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Always false: a query has at least one step.
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

/// Parses a query string.
pub fn parse(query: &str) -> Result<Query, ParseError> {
    let steps = lexer::segment(query)?
        .into_iter()
        .map(assemble_step)
        .collect::<Result<Vec<_>, _>>()?;
    Query::from_steps(steps).ok_or_else(|| ParseError::InvalidQuery("empty query".to_string()))
}

fn assemble_step(raw: RawStep<'_>) -> Result<Step, ParseError> {
    let role_test = match raw.role {
        "*" | "." => RoleTest::Wildcard,
        role => {
            if !Role::is_known(role) {
                log::debug!("Role '{}' is not a known accessibility role; matching it verbatim.", role);
            }
            RoleTest::Role(role.to_string())
        }
    };

    let mut predicate: Option<Predicate> = None;
    for text in raw.predicates {
        if let Some(next) = parse_predicate(text)? {
            predicate = Some(match predicate {
                Some(previous) => Predicate::and(previous, next),
                None => next,
            });
        }
    }

    // `//*[]` selects exactly what `//*` does.
    let axis = match (raw.axis, &role_test, &predicate) {
        (Axis::Descendant, RoleTest::Wildcard, None) => Axis::Any,
        (axis, _, _) => axis,
    };

    Ok(Step {
        axis,
        role_test,
        predicate,
    })
}

impl FromStr for Query {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse(s)
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for step in &self.steps {
            write!(f, "{}", step)?;
        }
        Ok(())
    }
}
