//! Splits a query string into path steps.
//!
//! The segmenter only finds step boundaries, axes, role tokens and the raw text
//! of each `[...]` group. Predicate text is parsed separately by
//! [`crate::parser::parse_predicate`].

use crate::ast::Axis;
use crate::error::ParseError;

/// One unparsed step of a query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawStep<'a> {
    pub axis: Axis,
    /// The role token: a role name, `*` or `.`.
    pub role: &'a str,
    /// The contents of each `[...]` group, in order, without the brackets.
    pub predicates: Vec<&'a str>,
}

/// Splits `query` into raw steps.
pub fn segment(query: &str) -> Result<Vec<RawStep<'_>>, ParseError> {
    let query = query.trim();
    if query.is_empty() {
        return Err(ParseError::InvalidQuery("empty query".to_string()));
    }
    if !query.starts_with('/') {
        return Err(ParseError::InvalidQuery("must start with / or //".to_string()));
    }

    let bytes = query.as_bytes();
    let mut steps = Vec::new();
    let mut pos = 0;
    while pos < bytes.len() {
        let slashes = bytes[pos..].iter().take_while(|&&b| b == b'/').count();
        if slashes > 2 {
            return Err(ParseError::InvalidQuery(format!(
                "too many '/' at offset {} in '{}'",
                pos, query
            )));
        }
        let start = pos + slashes;
        let end = step_end(query, start)?;
        let text = &query[start..end];
        if text.trim().is_empty() {
            return Err(ParseError::InvalidQuery(format!(
                "empty step at offset {} in '{}'",
                pos, query
            )));
        }
        steps.push(split_step(text, slashes)?);
        pos = end;
    }
    Ok(steps)
}

/// Finds the byte offset of the next step separator at or after `start`,
/// skipping `/` characters inside brackets and quoted strings.
fn step_end(query: &str, start: usize) -> Result<usize, ParseError> {
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    for (offset, c) in query[start..].char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '\'' | '"') if depth > 0 => quote = Some(c),
            (None, '[') => depth += 1,
            (None, ']') => {
                if depth == 0 {
                    return Err(ParseError::InvalidPredicate(query[start..].to_string()));
                }
                depth -= 1;
            }
            (None, '/') if depth == 0 => return Ok(start + offset),
            _ => {}
        }
    }
    if depth > 0 || quote.is_some() {
        return Err(ParseError::InvalidPredicate(query[start..].to_string()));
    }
    Ok(query.len())
}

/// Returns the offset of the `]` closing the group opened at `text[0]`.
fn group_end(text: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    for (offset, c) in text.char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '\'' | '"') => quote = Some(c),
            (None, '[') => depth += 1,
            (None, ']') => {
                depth -= 1;
                if depth == 0 {
                    return Some(offset);
                }
            }
            _ => {}
        }
    }
    None
}

pub(crate) fn is_role_char(c: char) -> bool {
    c.is_alphanumeric() || c == ' ' || c == '_' || c == '-'
}

fn split_step(text: &str, slashes: usize) -> Result<RawStep<'_>, ParseError> {
    let text = text.trim();
    let role_end = text.find('[').unwrap_or(text.len());
    let role = text[..role_end].trim();

    let mut predicates = Vec::new();
    let mut rest = &text[role_end..];
    loop {
        rest = rest.trim_start();
        if rest.is_empty() {
            break;
        }
        if !rest.starts_with('[') {
            return Err(ParseError::InvalidQuery(format!(
                "unexpected '{}' after predicate in step '{}'",
                rest, text
            )));
        }
        let close = group_end(rest).ok_or_else(|| ParseError::InvalidPredicate(rest.to_string()))?;
        predicates.push(&rest[1..close]);
        rest = &rest[close + 1..];
    }

    if role.is_empty() {
        // `[...]` with nothing to filter: the predicate has no subject.
        return Err(ParseError::InvalidPredicate(text.to_string()));
    }
    if role != "*" && role != "." && !role.chars().all(is_role_char) {
        return Err(ParseError::InvalidQuery(format!("invalid role test '{}'", role)));
    }

    let axis = match (role, slashes) {
        (".", 1) => Axis::SelfAxis,
        (".", _) => {
            return Err(ParseError::InvalidQuery(
                "'.' must follow a single '/'".to_string(),
            ));
        }
        ("*", 2) if predicates.is_empty() => Axis::Any,
        (_, 2) => Axis::Descendant,
        _ => Axis::Child,
    };
    Ok(RawStep {
        axis,
        role,
        predicates,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_segment_axes() {
        let steps = segment("//panel/combo box//list").unwrap();
        assert_eq!(
            steps,
            vec![
                RawStep { axis: Axis::Descendant, role: "panel", predicates: vec![] },
                RawStep { axis: Axis::Child, role: "combo box", predicates: vec![] },
                RawStep { axis: Axis::Descendant, role: "list", predicates: vec![] },
            ]
        );
    }

    #[test]
    fn test_segment_wildcards_and_self() {
        let steps = segment("//*/./*[2]//*[last()]").unwrap();
        let axes: Vec<Axis> = steps.iter().map(|s| s.axis).collect();
        assert_eq!(
            axes,
            vec![Axis::Any, Axis::SelfAxis, Axis::Child, Axis::Descendant]
        );
        assert_eq!(steps[2].predicates, vec!["2"]);
        assert_eq!(steps[3].predicates, vec!["last()"]);
    }

    #[test]
    fn test_slash_inside_predicate_is_not_a_separator() {
        let steps = segment("//text[@name='a/b' or @description=\"c//d\"]/label").unwrap();
        assert_eq!(steps.len(), 2);
        assert_eq!(steps[0].predicates, vec!["@name='a/b' or @description=\"c//d\""]);
        assert_eq!(steps[1].role, "label");
    }

    #[test]
    fn test_multiple_predicate_groups() {
        let steps = segment("//text[1] [@name='test']").unwrap();
        assert_eq!(steps[0].predicates, vec!["1", "@name='test'"]);
    }

    #[test]
    fn test_bracket_inside_string() {
        let steps = segment("//text[@name='[x]']").unwrap();
        assert_eq!(steps[0].predicates, vec!["@name='[x]'"]);
    }

    #[test]
    fn test_rejects_malformed_paths() {
        for bad in ["", "   ", "panel", "/", "//", "///panel", "/panel//", "/panel/ /text", "//.", "/pa$nel"] {
            assert!(
                matches!(segment(bad), Err(ParseError::InvalidQuery(_))),
                "expected InvalidQuery for {:?}",
                bad
            );
        }
    }

    #[test]
    fn test_start_error_message() {
        assert_eq!(
            segment("panel/text"),
            Err(ParseError::InvalidQuery("must start with / or //".to_string()))
        );
    }

    #[test]
    fn test_rejects_malformed_brackets() {
        for bad in ["/[@role='bogus$$']", "//text[@name='x'", "//text]", "//text[@name='x]", "//text[1]x"] {
            assert!(segment(bad).is_err(), "expected an error for {:?}", bad);
        }
        assert!(matches!(
            segment("/[@role='bogus$$']"),
            Err(ParseError::InvalidPredicate(_))
        ));
        assert!(matches!(
            segment("//text[1]x"),
            Err(ParseError::InvalidQuery(_))
        ));
    }
}
