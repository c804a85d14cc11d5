//! The axpath query language: a constrained XPath subset for addressing nodes
//! of an accessibility tree.
//!
//! ```text
//! //panel/check box[@name='Chin']
//! //text[starts-with(@name, 'user') and @states='editable']
//! //page tab list/*[last()]
//! ```

pub mod ast;
pub mod error;
pub mod lexer;
pub mod locator;
pub mod parser;
pub mod query;

pub use ast::{AttrRef, Axis, CompareOp, Literal, Predicate, RoleTest, Step, StringFunction};
pub use error::ParseError;
pub use lexer::{RawStep, segment};
pub use locator::By;
pub use parser::parse_predicate;
pub use query::{Query, parse};
