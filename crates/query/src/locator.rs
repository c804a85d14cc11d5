//! Locator strategies: the single-attribute lookups drivers offer next to
//! full queries (`find_element_by_name` and friends), expressed as queries.

use crate::ast::{AttrRef, Axis, CompareOp, Literal, Predicate, RoleTest, Step};
use crate::error::ParseError;
use crate::lexer::is_role_char;
use crate::query::{Query, parse};
use axpath_types::snapshot;
use itertools::Itertools;

/// How to find an element below a root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum By {
    Name(String),
    Description(String),
    Role(String),
    /// Every listed state must be present.
    States(Vec<String>),
    ObjectDepth(i64),
    ChildrenCount(i64),
    IndexInParent(i64),
    XPath(String),
}

impl By {
    /// Compiles the locator into a query over the whole subtree of the root.
    ///
    /// Values are placed into the query structure directly, so names containing
    /// brackets or one kind of quote need no escaping. A value holding both
    /// `'` and `"` has no quoted form and is rejected, as is a role with
    /// characters a role test cannot spell.
    pub fn to_query(&self) -> Result<Query, ParseError> {
        let step = match self {
            By::XPath(text) => return parse(text),
            By::Role(role) => {
                let trimmed = role.trim();
                if trimmed.is_empty() || trimmed != role || !role.chars().all(is_role_char) {
                    return Err(ParseError::InvalidQuery(format!("role '{}'", role)));
                }
                Step {
                    axis: Axis::Descendant,
                    role_test: RoleTest::Role(role.clone()),
                    predicate: None,
                }
            }
            By::Name(name) => attribute_step(snapshot::NAME, text_literal(name.clone())?),
            By::Description(description) => {
                attribute_step(snapshot::DESCRIPTION, text_literal(description.clone())?)
            }
            By::States(states) => {
                attribute_step(snapshot::STATES_EN_US, text_literal(states.iter().join(","))?)
            }
            By::ObjectDepth(depth) => attribute_step(snapshot::OBJECT_DEPTH, Literal::Int(*depth)),
            By::ChildrenCount(count) => {
                attribute_step(snapshot::CHILDREN_COUNT, Literal::Int(*count))
            }
            By::IndexInParent(index) => {
                attribute_step(snapshot::INDEX_IN_PARENT, Literal::Int(*index))
            }
        };
        Query::from_steps(vec![step])
            .ok_or_else(|| ParseError::InvalidQuery("empty locator".to_string()))
    }
}

fn text_literal(value: String) -> Result<Literal, ParseError> {
    if value.contains('\'') && value.contains('"') {
        return Err(ParseError::InvalidPredicate(value));
    }
    Ok(Literal::Str(value))
}

fn attribute_step(attr: &str, value: Literal) -> Step {
    Step {
        axis: Axis::Descendant,
        role_test: RoleTest::Wildcard,
        predicate: Some(Predicate::Comparison {
            attr: AttrRef::Named(attr.to_string()),
            op: CompareOp::Eq,
            value,
        }),
    }
}
