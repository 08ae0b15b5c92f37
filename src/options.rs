//! Recipe options: declared domains, values and the resolved option set.
//!
//! An option domain is a list of accepted values. Booleans and strings may be
//! mixed, and the string `"ANY"` admits any free-form string:
//!
//! ```toml
//! [options]
//! shared = { values = [true, false], default = false }
//! with_ssl = { values = [false, "openssl", "wolfssl"], default = "openssl" }
//! with_ca_bundle = { values = [false, "auto", "ANY"], default = "auto" }
//! ```
//!
//! [`ResolvedOptions`] is the read-only result of resolution. Options removed
//! by a rule are absent from it; lookups return `None` instead of failing.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Domain marker for free-form string values.
pub const ANY: &str = "ANY";

/// A single option value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OptionValue {
    Bool(bool),
    Str(String),
}

impl OptionValue {
    /// Option truthiness: `False` and the empty string are false.
    pub fn is_truthy(&self) -> bool {
        match self {
            OptionValue::Bool(b) => *b,
            OptionValue::Str(s) => !s.is_empty(),
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            OptionValue::Bool(b) => Some(*b),
            OptionValue::Str(_) => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            OptionValue::Str(s) => Some(s),
            OptionValue::Bool(_) => None,
        }
    }
}

impl fmt::Display for OptionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptionValue::Bool(true) => f.write_str("True"),
            OptionValue::Bool(false) => f.write_str("False"),
            OptionValue::Str(s) => f.write_str(s),
        }
    }
}

impl From<bool> for OptionValue {
    fn from(b: bool) -> Self {
        OptionValue::Bool(b)
    }
}

impl From<&str> for OptionValue {
    fn from(s: &str) -> Self {
        OptionValue::Str(s.to_string())
    }
}

/// Declaration of one option.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OptionDef {
    pub values: Vec<OptionValue>,
    pub default: OptionValue,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl OptionDef {
    pub fn boolean(default: bool) -> Self {
        Self {
            values: vec![OptionValue::Bool(true), OptionValue::Bool(false)],
            default: OptionValue::Bool(default),
            description: None,
        }
    }

    pub fn choice(values: &[OptionValue], default: OptionValue) -> Self {
        Self {
            values: values.to_vec(),
            default,
            description: None,
        }
    }

    fn allows_any(&self) -> bool {
        self.values.iter().any(|v| v.as_str() == Some(ANY))
    }

    fn allows_bools(&self) -> bool {
        self.values.iter().any(|v| v.as_bool().is_some())
    }

    /// Whether `value` is inside the domain.
    pub fn accepts(&self, value: &OptionValue) -> bool {
        if self.values.contains(value) {
            return true;
        }
        matches!(value, OptionValue::Str(_)) && self.allows_any()
    }

    /// Interpret a raw user string against this domain.
    ///
    /// `True`/`False` (any case) become booleans when the domain has booleans,
    /// and must then be listed themselves: `True` is rejected for
    /// `[False, "openssl"]` even though `ANY` would take the string.
    /// Other strings must be listed or the domain must allow `ANY`.
    pub fn parse_value(&self, raw: &str) -> Option<OptionValue> {
        let raw = raw.trim();
        let value = match raw.to_ascii_lowercase().as_str() {
            "true" if self.allows_bools() => OptionValue::Bool(true),
            "false" if self.allows_bools() => OptionValue::Bool(false),
            _ => OptionValue::Str(raw.to_string()),
        };
        self.accepts(&value).then_some(value)
    }

    /// Human-readable domain, e.g. `[True, False]`.
    pub fn describe_domain(&self) -> String {
        let items: Vec<String> = self.values.iter().map(|v| v.to_string()).collect();
        format!("[{}]", items.join(", "))
    }
}

/// Option schema of a recipe, keyed by option name.
pub type OptionSchema = BTreeMap<String, OptionDef>;

/// Resolved option values. Removed options are absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResolvedOptions {
    values: BTreeMap<String, OptionValue>,
}

impl ResolvedOptions {
    /// Defaults of every option in the schema.
    pub(crate) fn from_defaults(schema: &OptionSchema) -> Self {
        Self {
            values: schema
                .iter()
                .map(|(name, def)| (name.clone(), def.default.clone()))
                .collect(),
        }
    }

    pub(crate) fn set(&mut self, name: &str, value: OptionValue) {
        self.values.insert(name.to_string(), value);
    }

    /// Remove an option if present (`rm_safe`).
    pub(crate) fn remove(&mut self, name: &str) -> bool {
        self.values.remove(name).is_some()
    }

    /// Value of an option, `None` if removed or never declared (`get_safe`).
    pub fn get(&self, name: &str) -> Option<&OptionValue> {
        self.values.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// True if the option exists and is truthy.
    pub fn is_enabled(&self, name: &str) -> bool {
        self.get(name).is_some_and(OptionValue::is_truthy)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &OptionValue)> {
        self.values.iter()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl fmt::Display for ResolvedOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .values
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect();
        f.write_str(&parts.join(", "))
    }
}

/// One user override, optionally scoped to a recipe (`zlib:shared=True`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionOverride {
    /// `None` applies to the recipe being built; `Some("*")` to every recipe.
    pub scope: Option<String>,
    pub name: String,
    pub value: String,
}

impl OptionOverride {
    /// Parse `name=value`, `pkg:name=value` or `*:name=value`.
    pub fn parse(s: &str) -> Option<Self> {
        let (lhs, value) = s.split_once('=')?;
        let (scope, name) = match lhs.split_once(':') {
            Some((scope, name)) => (Some(scope.trim().to_string()), name),
            None => (None, lhs),
        };
        let name = name.trim();
        if name.is_empty() {
            return None;
        }
        Some(Self {
            scope,
            name: name.to_string(),
            value: value.trim().to_string(),
        })
    }

    fn applies_to(&self, recipe: &str) -> bool {
        match self.scope.as_deref() {
            None | Some("*") => true,
            Some(scope) => scope == recipe,
        }
    }
}

/// Ordered list of overrides. Later entries win.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OptionOverrides(Vec<OptionOverride>);

impl OptionOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, ov: OptionOverride) {
        self.0.push(ov);
    }

    pub fn extend(&mut self, other: OptionOverrides) {
        self.0.extend(other.0);
    }

    /// Overrides that apply to `recipe`, as `name -> raw value`.
    ///
    /// Wildcard (`*:`) entries are dropped for options the recipe does not
    /// declare; unscoped and recipe-scoped entries are kept so the resolver
    /// can reject unknown names.
    pub fn for_recipe(&self, recipe: &str, schema: &OptionSchema) -> BTreeMap<String, String> {
        self.0
            .iter()
            .filter(|ov| ov.applies_to(recipe))
            .filter(|ov| ov.scope.as_deref() != Some("*") || schema.contains_key(&ov.name))
            .map(|ov| (ov.name.clone(), ov.value.clone()))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<OptionOverride> for OptionOverrides {
    fn from_iter<I: IntoIterator<Item = OptionOverride>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}
