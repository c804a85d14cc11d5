//! Point-in-time copies of a node's attributes.
//!
//! A snapshot is fetched from the bridge in one round trip and is never
//! refreshed; it stays readable after the node's handle has been released, but
//! it no longer says anything about the live node.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

pub const NAME: &str = "name";
pub const DESCRIPTION: &str = "description";
pub const ROLE: &str = "role";
pub const ROLE_EN_US: &str = "role_en_us";
pub const STATES: &str = "states";
pub const STATES_EN_US: &str = "states_en_us";
pub const INDEX_IN_PARENT: &str = "index_in_parent";
pub const CHILDREN_COUNT: &str = "children_count";
pub const OBJECT_DEPTH: &str = "object_depth";
pub const X: &str = "x";
pub const Y: &str = "y";
pub const WIDTH: &str = "width";
pub const HEIGHT: &str = "height";

/// A typed attribute value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttrValue {
    Int(i64),
    Text(String),
    States(BTreeSet<String>),
}

impl AttrValue {
    /// Builds a state set from the comma-separated form the bridge reports.
    pub fn states_from_csv(csv: &str) -> Self {
        AttrValue::States(split_states(csv).map(str::to_string).collect())
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            AttrValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            AttrValue::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_states(&self) -> Option<&BTreeSet<String>> {
        match self {
            AttrValue::States(set) => Some(set),
            _ => None,
        }
    }
}

impl From<&str> for AttrValue {
    fn from(s: &str) -> Self {
        AttrValue::Text(s.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(s: String) -> Self {
        AttrValue::Text(s)
    }
}

impl From<i64> for AttrValue {
    fn from(n: i64) -> Self {
        AttrValue::Int(n)
    }
}

impl From<i32> for AttrValue {
    fn from(n: i32) -> Self {
        AttrValue::Int(n.into())
    }
}

/// Splits a comma-separated state list, trimming blanks and dropping empty items.
pub fn split_states(csv: &str) -> impl Iterator<Item = &str> {
    csv.split(',').map(str::trim).filter(|s| !s.is_empty())
}

/// Maps an attribute name, including the legacy spellings used in queries
/// (`objectdepth`, `role_en_US`, ...), to its canonical snapshot key.
pub fn canonical_name(name: &str) -> String {
    let lower = name.to_ascii_lowercase();
    match lower.as_str() {
        "objectdepth" => OBJECT_DEPTH.to_string(),
        "childrencount" => CHILDREN_COUNT.to_string(),
        "indexinparent" => INDEX_IN_PARENT.to_string(),
        "roleenus" => ROLE_EN_US.to_string(),
        "stateenus" | "statesenus" => STATES_EN_US.to_string(),
        _ => lower,
    }
}

/// A read-only mapping from attribute name to value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AttributeSnapshot {
    values: BTreeMap<String, AttrValue>,
}

impl AttributeSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an attribute under its canonical name. Intended for bridges
    /// assembling a snapshot; consumers only read.
    pub fn with(mut self, name: &str, value: impl Into<AttrValue>) -> Self {
        self.values.insert(canonical_name(name), value.into());
        self
    }

    pub fn insert(&mut self, name: &str, value: impl Into<AttrValue>) {
        self.values.insert(canonical_name(name), value.into());
    }

    /// Looks up an attribute by any accepted spelling of its name.
    pub fn get(&self, name: &str) -> Option<&AttrValue> {
        self.values
            .get(name)
            .or_else(|| self.values.get(&canonical_name(name)))
    }

    pub fn text(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(AttrValue::as_text)
    }

    pub fn int(&self, name: &str) -> Option<i64> {
        self.get(name).and_then(AttrValue::as_int)
    }

    pub fn name(&self) -> Option<&str> {
        self.text(NAME)
    }

    /// The role used for role tests: `role_en_us`, or `role` when the
    /// localized-neutral form is absent.
    pub fn role(&self) -> Option<&str> {
        self.text(ROLE_EN_US).or_else(|| self.text(ROLE))
    }

    /// The value of the `text()` pseudo-attribute: the name, or the
    /// description when the name is empty or missing.
    pub fn text_content(&self) -> Option<&str> {
        match self.name() {
            Some(name) if !name.is_empty() => Some(name),
            other => self.text(DESCRIPTION).or(other),
        }
    }

    /// Whether the node reports `state` in `states_en_us` (or `states`).
    pub fn has_state(&self, state: &str) -> bool {
        self.get(STATES_EN_US)
            .or_else(|| self.get(STATES))
            .and_then(AttrValue::as_states)
            .is_some_and(|set| set.contains(state))
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &AttrValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }
}
