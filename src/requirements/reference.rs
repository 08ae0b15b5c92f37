//! Package references: `name/version` and `name/[range]`.

use super::ranges::parse_range;
use crate::error::RequirementError;
use crate::version::parse_lenient;
use pubgrub::Ranges;
use semver::Version;
use std::fmt;

/// Version constraint of a reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionConstraint {
    /// Exact version. `semver` is `None` for opaque versions like `cci.latest`.
    Pin {
        version: String,
        semver: Option<Version>,
    },
    /// Bracketed range expression.
    Range {
        expr: String,
        ranges: Ranges<Version>,
    },
}

impl VersionConstraint {
    /// Whether `version` satisfies this constraint.
    pub fn matches(&self, version: &str) -> bool {
        match self {
            VersionConstraint::Pin { version: pinned, semver } => {
                pinned == version
                    || match (semver, parse_lenient(version)) {
                        (Some(a), Some(b)) => *a == b,
                        _ => false,
                    }
            }
            VersionConstraint::Range { ranges, .. } => {
                parse_lenient(version).is_some_and(|v| ranges.contains(&v))
            }
        }
    }

    /// Whether some version could satisfy both constraints.
    pub fn is_compatible(&self, other: &VersionConstraint) -> bool {
        use VersionConstraint::*;
        match (self, other) {
            (Pin { version, .. }, c) | (c, Pin { version, .. }) => c.matches(version),
            (Range { ranges: a, .. }, Range { ranges: b, .. }) => {
                a.intersection(b) != Ranges::empty()
            }
        }
    }
}

impl VersionConstraint {
    /// Whether both constraints admit exactly the same versions, whatever
    /// the spelling: `1.2` and `1.2.0`, `[>=1 <2]` and `[>=1, <2]`.
    pub fn is_equivalent(&self, other: &VersionConstraint) -> bool {
        use VersionConstraint::*;
        match (self, other) {
            (Pin { version: a, semver: sa }, Pin { version: b, semver: sb }) => {
                a == b || matches!((sa, sb), (Some(x), Some(y)) if x == y)
            }
            (Range { ranges: a, .. }, Range { ranges: b, .. }) => a == b,
            (Pin { semver, .. }, Range { ranges, .. }) | (Range { ranges, .. }, Pin { semver, .. }) => {
                semver
                    .as_ref()
                    .is_some_and(|v| *ranges == Ranges::singleton(v.clone()))
            }
        }
    }

    /// Constraint admitting only versions both admit.
    ///
    /// A pin wins over a range. Two ranges intersect, and their expressions
    /// are combined alternative by alternative so the text still parses to
    /// the same set. Only meaningful for compatible constraints.
    pub fn narrow(&self, other: &VersionConstraint) -> VersionConstraint {
        use VersionConstraint::*;
        match (self, other) {
            (Pin { .. }, _) => self.clone(),
            (_, Pin { .. }) => other.clone(),
            (Range { expr: ea, ranges: ra }, Range { expr: eb, ranges: rb }) => {
                let alternatives = |e: &str| -> Vec<String> {
                    e.split("||")
                        .map(str::trim)
                        .filter(|a| !a.is_empty())
                        .map(str::to_string)
                        .collect()
                };
                let (alts_a, alts_b) = (alternatives(ea), alternatives(eb));
                let expr = alts_a
                    .iter()
                    .flat_map(|a| alts_b.iter().map(move |b| format!("{}, {}", a, b)))
                    .collect::<Vec<_>>()
                    .join(" || ");
                Range {
                    expr,
                    ranges: ra.intersection(rb),
                }
            }
        }
    }
}

impl fmt::Display for VersionConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VersionConstraint::Pin { version, .. } => f.write_str(version),
            VersionConstraint::Range { expr, .. } => write!(f, "[{}]", expr),
        }
    }
}

/// A reference to another recipe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    pub name: String,
    pub constraint: VersionConstraint,
}

impl Reference {
    /// Parse `zlib/1.2.13`, `zlib/[>=1.2 <2]` or `msys2/cci.latest`.
    pub fn parse(s: &str) -> Result<Self, RequirementError> {
        let s = s.trim();
        let bad = |reason: &str| RequirementError::InvalidReference {
            reference: s.to_string(),
            reason: reason.to_string(),
        };

        if s.contains('@') || s.contains('#') {
            return Err(bad("user/channel and revisions are not supported"));
        }
        let (name, version) = s
            .split_once('/')
            .ok_or_else(|| bad("expected name/version"))?;
        let name = name.trim();
        let version = version.trim();

        if name.is_empty() {
            return Err(bad("empty name"));
        }
        if !name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '+'))
        {
            return Err(bad("invalid characters in name"));
        }
        if version.is_empty() {
            return Err(bad("empty version"));
        }

        let constraint = if let Some(inner) = version.strip_prefix('[') {
            let expr = inner
                .strip_suffix(']')
                .ok_or_else(|| bad("unterminated version range"))?
                .trim();
            VersionConstraint::Range {
                expr: expr.to_string(),
                ranges: parse_range(expr)?,
            }
        } else {
            if version.contains(char::is_whitespace) || version.contains('/') {
                return Err(bad("invalid version"));
            }
            VersionConstraint::Pin {
                version: version.to_string(),
                semver: parse_lenient(version),
            }
        };

        Ok(Self {
            name: name.to_string(),
            constraint,
        })
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.name, self.constraint)
    }
}
