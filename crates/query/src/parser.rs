//! A `nom`-based parser for the contents of one `[...]` predicate group.
//!
//! Grammar, loosest binding first:
//!
//! ```text
//! predicate  := and_expr ( "or" and_expr )*
//! and_expr   := term ( "and" term )*
//! term       := "last()" | "position()" "=" INT | function | comparison | INT
//! function   := ("starts-with" | "ends-with" | "contains") "(" attr "," literal ")"
//! comparison := attr OP ( literal | function-name "(" STRING ")" )
//! attr       := "@" NAME | "text()"
//! literal    := STRING | INT
//! ```
//!
//! There is no grouping with parentheses.

use crate::ast::{AttrRef, CompareOp, Literal, Predicate, StringFunction};
use crate::error::ParseError;
use nom::{
    IResult, Parser,
    branch::alt,
    bytes::complete::{tag, take_while, take_while1},
    character::complete::{char, i64 as int64, multispace0, satisfy, u32 as uint32},
    combinator::{all_consuming, map, map_res, not, peek, recognize, value},
    multi::{many0, separated_list0},
    sequence::{delimited, pair, preceded, separated_pair, terminated},
};

// --- Main Public Parser ---

/// Parses the text between `[` and `]`. Blank input means "no predicate".
pub fn parse_predicate(raw: &str) -> Result<Option<Predicate>, ParseError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    match all_consuming(or_expr).parse(trimmed) {
        Ok((_, predicate)) => Ok(Some(predicate)),
        Err(_) => Err(ParseError::InvalidPredicate(raw.to_string())),
    }
}

// --- Combinators & Helpers ---

fn ws<'a, F, O, E>(inner: F) -> impl Parser<&'a str, Output = O, Error = E>
where
    F: Parser<&'a str, Output = O, Error = E>,
    E: nom::error::ParseError<&'a str>,
{
    delimited(multispace0, inner, multispace0)
}

fn is_name_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '-'
}

/// A keyword that must not run into a following name character (`and` but not `andy`).
fn keyword<'a>(word: &'static str) -> impl Parser<&'a str, Output = &'a str, Error = nom::error::Error<&'a str>> {
    ws(terminated(tag(word), not(peek(satisfy(is_name_char)))))
}

fn build_logical_parser<'a, F>(
    operand: F,
    op: &'static str,
    join: fn(Predicate, Predicate) -> Predicate,
) -> impl FnMut(&'a str) -> IResult<&'a str, Predicate>
where
    F: Parser<&'a str, Output = Predicate, Error = nom::error::Error<&'a str>> + Clone,
{
    move |input: &'a str| {
        let (input, mut left) = operand.clone().parse(input)?;
        let (input, remainder) = many0(preceded(keyword(op), operand.clone())).parse(input)?;
        for right in remainder {
            left = join(left, right);
        }
        Ok((input, left))
    }
}

// --- Logical Operators (in order of precedence) ---

fn or_expr(input: &str) -> IResult<&str, Predicate> {
    build_logical_parser(and_expr, "or", Predicate::or)(input)
}

fn and_expr(input: &str) -> IResult<&str, Predicate> {
    build_logical_parser(term, "and", Predicate::and)(input)
}

fn term(input: &str) -> IResult<&str, Predicate> {
    ws(alt((last_call, position_call, function_call, comparison, position_number))).parse(input)
}

// --- Position Parsers ---

fn empty_call<'a>(name: &'static str) -> impl Parser<&'a str, Output = (), Error = nom::error::Error<&'a str>> {
    value((), (tag(name), ws(char('(')), char(')')))
}

fn last_call(input: &str) -> IResult<&str, Predicate> {
    value(Predicate::Last, empty_call("last")).parse(input)
}

/// Positions are 1-based; `0` can never match and is rejected.
fn position_number(input: &str) -> IResult<&str, Predicate> {
    map_res(uint32, |n: u32| {
        if n == 0 {
            Err("positions start at 1")
        } else {
            Ok(Predicate::Position(n))
        }
    })
    .parse(input)
}

fn position_call(input: &str) -> IResult<&str, Predicate> {
    preceded((empty_call("position"), ws(char('='))), position_number).parse(input)
}

// --- Literal & Attribute Parsers ---

fn string_literal(input: &str) -> IResult<&str, String> {
    map(
        alt((
            delimited(char('\''), take_while(|c| c != '\''), char('\'')),
            delimited(char('"'), take_while(|c| c != '"'), char('"')),
        )),
        |s: &str| s.to_string(),
    )
    .parse(input)
}

fn literal(input: &str) -> IResult<&str, Literal> {
    alt((
        map(string_literal, Literal::Str),
        map(terminated(int64, not(peek(satisfy(is_name_char)))), Literal::Int),
    ))
    .parse(input)
}

fn attribute_name(input: &str) -> IResult<&str, &str> {
    recognize(pair(
        take_while1(|c: char| c.is_alphabetic() || c == '_'),
        take_while(|c: char| c.is_alphanumeric() || c == '_'),
    ))
    .parse(input)
}

fn attr_ref(input: &str) -> IResult<&str, AttrRef> {
    alt((
        map(preceded(char('@'), attribute_name), |name: &str| {
            AttrRef::Named(name.to_string())
        }),
        value(AttrRef::Text, empty_call("text")),
    ))
    .parse(input)
}

fn compare_op(input: &str) -> IResult<&str, CompareOp> {
    alt((
        value(CompareOp::NotEq, tag("!=")),
        value(CompareOp::LessOrEqual, tag("<=")),
        value(CompareOp::GreaterOrEqual, tag(">=")),
        value(CompareOp::Eq, tag("=")),
        value(CompareOp::Less, tag("<")),
        value(CompareOp::Greater, tag(">")),
    ))
    .parse(input)
}

// --- Function Parsers ---

fn function_name(input: &str) -> IResult<&str, StringFunction> {
    alt((
        value(StringFunction::StartsWith, tag("starts-with")),
        value(StringFunction::EndsWith, tag("ends-with")),
        value(StringFunction::Contains, tag("contains")),
    ))
    .parse(input)
}

#[derive(Debug)]
enum Argument {
    Attr(AttrRef),
    Value(Literal),
}

fn argument(input: &str) -> IResult<&str, Argument> {
    ws(alt((map(attr_ref, Argument::Attr), map(literal, Argument::Value)))).parse(input)
}

/// `contains(@name, 'x')`: exactly an attribute followed by a literal.
fn function_call(input: &str) -> IResult<&str, Predicate> {
    map_res(
        pair(
            function_name,
            delimited(ws(char('(')), separated_list0(char(','), argument), char(')')),
        ),
        |(func, args)| match <[Argument; 2]>::try_from(args) {
            Ok([Argument::Attr(attr), Argument::Value(value)]) => Ok(Predicate::Function {
                func,
                attr,
                value: match value {
                    Literal::Str(s) => s,
                    Literal::Int(n) => n.to_string(),
                },
            }),
            _ => Err("string functions take an attribute and a literal"),
        },
    )
    .parse(input)
}

/// The older `@name=contains('x')` spelling of `contains(@name, 'x')`.
fn legacy_function(input: &str) -> IResult<&str, (StringFunction, String)> {
    pair(
        function_name,
        delimited(ws(char('(')), string_literal, ws(char(')'))),
    )
    .parse(input)
}

#[derive(Debug)]
enum RightHand {
    Value(Literal),
    Legacy(StringFunction, String),
}

fn comparison(input: &str) -> IResult<&str, Predicate> {
    map_res(
        separated_pair(
            attr_ref,
            multispace0,
            pair(
                ws(compare_op),
                alt((
                    map(legacy_function, |(f, s)| RightHand::Legacy(f, s)),
                    map(literal, RightHand::Value),
                )),
            ),
        ),
        |(attr, (op, rhs))| match (op, rhs) {
            (op, RightHand::Value(value)) => Ok(Predicate::Comparison { attr, op, value }),
            (CompareOp::Eq, RightHand::Legacy(func, value)) => {
                Ok(Predicate::Function { func, attr, value })
            }
            (_, RightHand::Legacy(..)) => Err("function values only combine with '='"),
        },
    )
    .parse(input)
}
