//! Evaluates a step predicate against one candidate node.
//!
//! Evaluation is pure: it reads an attribute snapshot and the node's sibling
//! position and never calls the bridge.

use axpath_query::{AttrRef, CompareOp, Literal, Predicate, StringFunction};
use axpath_types::snapshot::split_states;
use axpath_types::{AttrValue, AttributeSnapshot};
use std::borrow::Cow;
use std::cmp::Ordering;
use std::collections::BTreeSet;

/// Whether `predicate` holds for a node with `snapshot` at 1-based `position`
/// among `count` siblings.
///
/// Comparison rules:
/// - text compares exactly and case-sensitively; `<`, `<=`, `>`, `>=` hold
///   only when both sides read as integers
/// - an integer attribute compared with a string literal parses the literal;
///   an unparsable literal makes `=` false and `!=` true
/// - a state set compared with `=` requires every listed state to be present
/// - an attribute the node does not report satisfies only `!=`
pub fn evaluate(
    predicate: &Predicate,
    snapshot: &AttributeSnapshot,
    position: u32,
    count: u32,
) -> bool {
    match predicate {
        Predicate::Position(n) => position == *n,
        Predicate::Last => position == count,
        Predicate::And(left, right) => {
            evaluate(left, snapshot, position, count) && evaluate(right, snapshot, position, count)
        }
        Predicate::Or(left, right) => {
            evaluate(left, snapshot, position, count) || evaluate(right, snapshot, position, count)
        }
        Predicate::Comparison { attr, op, value } => compare(lookup(attr, snapshot), *op, value),
        Predicate::Function { func, attr, value } => apply(*func, lookup(attr, snapshot), value),
    }
}

#[derive(Debug, Clone, Copy)]
enum Value<'s> {
    Text(&'s str),
    Int(i64),
    States(&'s BTreeSet<String>),
}

fn lookup<'s>(attr: &AttrRef, snapshot: &'s AttributeSnapshot) -> Option<Value<'s>> {
    match attr {
        AttrRef::Text => snapshot.text_content().map(Value::Text),
        AttrRef::Named(name) => snapshot.get(name).map(|value| match value {
            AttrValue::Text(s) => Value::Text(s),
            AttrValue::Int(n) => Value::Int(*n),
            AttrValue::States(set) => Value::States(set),
        }),
    }
}

fn literal_text(literal: &Literal) -> Cow<'_, str> {
    match literal {
        Literal::Str(s) => Cow::Borrowed(s),
        Literal::Int(n) => Cow::Owned(n.to_string()),
    }
}

fn literal_int(literal: &Literal) -> Option<i64> {
    match literal {
        Literal::Int(n) => Some(*n),
        Literal::Str(s) => s.trim().parse().ok(),
    }
}

fn ordered(op: CompareOp, ordering: Ordering) -> bool {
    match op {
        CompareOp::Eq => ordering == Ordering::Equal,
        CompareOp::NotEq => ordering != Ordering::Equal,
        CompareOp::Less => ordering == Ordering::Less,
        CompareOp::LessOrEqual => ordering != Ordering::Greater,
        CompareOp::Greater => ordering == Ordering::Greater,
        CompareOp::GreaterOrEqual => ordering != Ordering::Less,
    }
}

fn compare(actual: Option<Value<'_>>, op: CompareOp, expected: &Literal) -> bool {
    let Some(actual) = actual else {
        return op == CompareOp::NotEq;
    };
    match actual {
        Value::Int(n) => match literal_int(expected) {
            Some(m) => ordered(op, n.cmp(&m)),
            None => op == CompareOp::NotEq,
        },
        Value::Text(s) => match op {
            CompareOp::Eq => s == literal_text(expected),
            CompareOp::NotEq => s != literal_text(expected),
            _ => match (s.trim().parse::<i64>(), literal_int(expected)) {
                (Ok(n), Some(m)) => ordered(op, n.cmp(&m)),
                _ => false,
            },
        },
        Value::States(set) => {
            let wanted = literal_text(expected);
            let holds = if wanted.trim().is_empty() {
                set.is_empty()
            } else {
                split_states(&wanted).all(|state| set.contains(state))
            };
            match op {
                CompareOp::Eq => holds,
                CompareOp::NotEq => !holds,
                _ => false,
            }
        }
    }
}

fn apply(func: StringFunction, actual: Option<Value<'_>>, needle: &str) -> bool {
    let text = match actual {
        None => return false,
        Some(Value::States(set)) => return apply_to_states(func, set, needle),
        Some(Value::Text(s)) => Cow::Borrowed(s),
        Some(Value::Int(n)) => Cow::Owned(n.to_string()),
    };
    match func {
        StringFunction::StartsWith => text.starts_with(needle),
        StringFunction::EndsWith => text.ends_with(needle),
        StringFunction::Contains => text.contains(needle),
    }
}

fn apply_to_states(func: StringFunction, set: &BTreeSet<String>, needle: &str) -> bool {
    match func {
        StringFunction::Contains => split_states(needle).all(|state| set.contains(state)),
        StringFunction::StartsWith => set.iter().any(|state| state.starts_with(needle)),
        StringFunction::EndsWith => set.iter().any(|state| state.ends_with(needle)),
    }
}
