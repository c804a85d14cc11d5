//! Defines the parsed form of a query: steps, role tests and predicate trees.

use itertools::Itertools;
use std::fmt;

/// The relation between a step and the nodes selected by the previous step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    /// `.`: the previous nodes themselves.
    SelfAxis,
    /// `/role`: direct children.
    Child,
    /// `//role`: every node below, in document order.
    Descendant,
    /// `//*`: every node below, regardless of role.
    Any,
}

/// The role a node must have to be selected by a step.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RoleTest {
    /// A literal `en_US` role name, such as `check box`.
    Role(String),
    /// `*`, or the implicit test of `.` and `//*`.
    Wildcard,
}

impl RoleTest {
    pub fn matches(&self, role: Option<&str>) -> bool {
        match self {
            RoleTest::Wildcard => true,
            RoleTest::Role(expected) => role == Some(expected.as_str()),
        }
    }
}

/// One step of a query, such as `//check box[@name='Chin']`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    pub axis: Axis,
    pub role_test: RoleTest,
    pub predicate: Option<Predicate>,
}

impl Step {
    /// The role test actually applied; `Any` always behaves as a wildcard.
    pub fn effective_role_test(&self) -> &RoleTest {
        match self.axis {
            Axis::Any => &RoleTest::Wildcard,
            _ => &self.role_test,
        }
    }
}

/// The attribute a comparison or string function reads.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AttrRef {
    /// `@name`, `@states`, `@objectdepth`, ... Unknown names are allowed and
    /// read as absent.
    Named(String),
    /// `text()`: the name, or the description when the name is empty.
    Text,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompareOp {
    Eq,
    NotEq,
    Less,
    LessOrEqual,
    Greater,
    GreaterOrEqual,
}

impl CompareOp {
    pub fn as_str(self) -> &'static str {
        match self {
            CompareOp::Eq => "=",
            CompareOp::NotEq => "!=",
            CompareOp::Less => "<",
            CompareOp::LessOrEqual => "<=",
            CompareOp::Greater => ">",
            CompareOp::GreaterOrEqual => ">=",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StringFunction {
    StartsWith,
    EndsWith,
    Contains,
}

impl StringFunction {
    pub fn as_str(self) -> &'static str {
        match self {
            StringFunction::StartsWith => "starts-with",
            StringFunction::EndsWith => "ends-with",
            StringFunction::Contains => "contains",
        }
    }
}

/// The right-hand side of a comparison.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Literal {
    Str(String),
    Int(i64),
}

/// A boolean filter attached to a step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Predicate {
    Comparison {
        attr: AttrRef,
        op: CompareOp,
        value: Literal,
    },
    Function {
        func: StringFunction,
        attr: AttrRef,
        value: String,
    },
    /// 1-based position among the node's siblings.
    Position(u32),
    Last,
    And(Box<Predicate>, Box<Predicate>),
    Or(Box<Predicate>, Box<Predicate>),
}

impl Predicate {
    pub fn and(left: Predicate, right: Predicate) -> Self {
        Predicate::And(Box::new(left), Box::new(right))
    }

    pub fn or(left: Predicate, right: Predicate) -> Self {
        Predicate::Or(Box::new(left), Box::new(right))
    }

    /// Whether evaluating this predicate needs the node's sibling position.
    pub fn uses_position(&self) -> bool {
        match self {
            Predicate::Position(_) | Predicate::Last => true,
            Predicate::And(l, r) | Predicate::Or(l, r) => l.uses_position() || r.uses_position(),
            Predicate::Comparison { .. } | Predicate::Function { .. } => false,
        }
    }

    /// Whether evaluating this predicate needs the node's attribute snapshot.
    pub fn uses_attributes(&self) -> bool {
        match self {
            Predicate::Comparison { .. } | Predicate::Function { .. } => true,
            Predicate::And(l, r) | Predicate::Or(l, r) => {
                l.uses_attributes() || r.uses_attributes()
            }
            Predicate::Position(_) | Predicate::Last => false,
        }
    }

    /// Splits a chain of `And` nodes into its operands, left to right.
    pub fn conjuncts(&self) -> Vec<&Predicate> {
        match self {
            Predicate::And(l, r) => {
                let mut parts = l.conjuncts();
                parts.extend(r.conjuncts());
                parts
            }
            other => vec![other],
        }
    }
}

// --- Canonical text form ---

impl fmt::Display for AttrRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttrRef::Named(name) => write!(f, "@{}", name),
            AttrRef::Text => f.write_str("text()"),
        }
    }
}

/// Quotes with `'` unless the text contains one. The grammar has no escapes,
/// so text holding both quote kinds prints in a form that does not parse.
fn write_quoted(f: &mut fmt::Formatter<'_>, s: &str) -> fmt::Result {
    if s.contains('\'') {
        write!(f, "\"{}\"", s)
    } else {
        write!(f, "'{}'", s)
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Str(s) => write_quoted(f, s),
            Literal::Int(n) => write!(f, "{}", n),
        }
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Predicate::Comparison { attr, op, value } => {
                write!(f, "{} {} {}", attr, op.as_str(), value)
            }
            Predicate::Function { func, attr, value } => {
                write!(f, "{}({}, ", func.as_str(), attr)?;
                write_quoted(f, value)?;
                f.write_str(")")
            }
            Predicate::Position(n) => write!(f, "{}", n),
            Predicate::Last => f.write_str("last()"),
            Predicate::And(l, r) => write!(f, "{} and {}", l, r),
            Predicate::Or(l, r) => write!(f, "{} or {}", l, r),
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.axis, &self.role_test) {
            (Axis::SelfAxis, _) => f.write_str("/.")?,
            (Axis::Any, _) => f.write_str("//*")?,
            (Axis::Child, role) => write!(f, "/{}", RoleText(role))?,
            (Axis::Descendant, role) => write!(f, "//{}", RoleText(role))?,
        }
        if let Some(predicate) = &self.predicate {
            // Each conjunct gets its own brackets, so an `or` nested under an
            // `and` keeps its grouping without parentheses.
            let groups = predicate.conjuncts().iter().map(|p| format!("[{}]", p)).join("");
            f.write_str(&groups)?;
        }
        Ok(())
    }
}

struct RoleText<'r>(&'r RoleTest);

impl fmt::Display for RoleText<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            RoleTest::Role(role) => f.write_str(role),
            RoleTest::Wildcard => f.write_str("*"),
        }
    }
}
