//! Loose version handling.
//!
//! Recipe versions are not always semver (`cci.20230301`, `2.4.7`, `1.2.13.1`,
//! `191`), so comparisons in conditions, compiler checks and catalog sorting
//! use a component-wise ordering. Requirement ranges convert to strict
//! [`semver::Version`] through [`parse_lenient`].

use semver::Version;
use std::cmp::Ordering;
use std::fmt;

/// Compare two version strings component-wise.
///
/// Components are split on `.`; numeric components compare numerically,
/// anything else lexically. Missing components count as `0`, so
/// `"1.2" == "1.2.0"`. A `-suffix` is a pre-release: `1.2.13-rc1` sorts
/// before `1.2.13` and pre-releases order among themselves the same way.
pub fn compare(a: &str, b: &str) -> Ordering {
    let (main_a, pre_a) = split_pre(a);
    let (main_b, pre_b) = split_pre(b);
    compare_components(main_a, main_b, Some("0")).then_with(|| match (pre_a, pre_b) {
        (None, None) => Ordering::Equal,
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (Some(x), Some(y)) => compare_components(x, y, None),
    })
}

fn split_pre(s: &str) -> (&str, Option<&str>) {
    let s = s.trim().trim_start_matches('v');
    match s.split_once('-') {
        Some((main, pre)) => (main, Some(pre)),
        None => (s, None),
    }
}

/// `fill` stands in for missing components; `None` makes the shorter
/// list sort first.
fn compare_components(a: &str, b: &str, fill: Option<&str>) -> Ordering {
    let left: Vec<&str> = a.split(['.', '-']).filter(|p| !p.is_empty()).collect();
    let right: Vec<&str> = b.split(['.', '-']).filter(|p| !p.is_empty()).collect();

    for i in 0..left.len().max(right.len()) {
        let (l, r) = match (left.get(i).copied().or(fill), right.get(i).copied().or(fill)) {
            (Some(l), Some(r)) => (l, r),
            (None, _) => return Ordering::Less,
            (_, None) => return Ordering::Greater,
        };
        let ord = match (l.parse::<u64>(), r.parse::<u64>()) {
            (Ok(x), Ok(y)) => x.cmp(&y),
            // Numbers sort before words so the order stays total
            (Ok(_), Err(_)) => Ordering::Less,
            (Err(_), Ok(_)) => Ordering::Greater,
            (Err(_), Err(_)) => l.cmp(r),
        };
        if ord != Ordering::Equal {
            return ord;
        }
    }
    Ordering::Equal
}

/// Parse a version leniently into semver.
///
/// - `1` → `1.0.0`, `1.2` → `1.2.0`
/// - leading `v` is ignored
/// - a fourth numeric component is folded into build metadata (`1.2.13.1` → `1.2.13+1`)
///
/// Returns `None` for non-numeric versions such as `cci.20230301`.
pub fn parse_lenient(s: &str) -> Option<Version> {
    let s = s.trim().trim_start_matches('v');
    if let Ok(v) = Version::parse(s) {
        return Some(v);
    }

    let (core, pre) = match s.split_once('-') {
        Some((c, p)) => (c, Some(p)),
        None => (s, None),
    };
    let parts: Vec<&str> = core.split('.').collect();
    if parts.is_empty() || parts.iter().any(|p| p.parse::<u64>().is_err()) {
        return None;
    }

    let mut normalized = match parts.len() {
        1 => format!("{}.0.0", parts[0]),
        2 => format!("{}.{}.0", parts[0], parts[1]),
        3 => parts.join("."),
        _ => format!("{}+{}", parts[..3].join("."), parts[3..].join(".")),
    };
    if let Some(pre) = pre {
        // Pre-release goes before build metadata
        match normalized.split_once('+') {
            Some((c, b)) => normalized = format!("{}-{}+{}", c, pre, b),
            None => normalized = format!("{}-{}", normalized, pre),
        }
    }
    Version::parse(&normalized).ok()
}

/// Sort versions newest-first using [`compare`].
pub fn sort_desc(versions: &mut [String]) {
    versions.sort_by(|a, b| compare(b, a));
}

/// Comparison operator in a version predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl Op {
    fn as_str(self) -> &'static str {
        match self {
            Op::Eq => "==",
            Op::Ne => "!=",
            Op::Lt => "<",
            Op::Le => "<=",
            Op::Gt => ">",
            Op::Ge => ">=",
        }
    }
}

/// A single comparison like `>=7.78.0`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Predicate {
    pub op: Op,
    pub version: String,
}

impl Predicate {
    /// Parse one predicate. A bare version means `==`.
    pub fn parse(s: &str) -> Result<Self, String> {
        let s = s.trim();
        // Longest operators first
        let ops = [
            (">=", Op::Ge),
            ("<=", Op::Le),
            ("==", Op::Eq),
            ("!=", Op::Ne),
            (">", Op::Gt),
            ("<", Op::Lt),
            ("=", Op::Eq),
        ];
        let (op, rest) = ops
            .iter()
            .find_map(|(prefix, op)| s.strip_prefix(prefix).map(|rest| (*op, rest)))
            .unwrap_or((Op::Eq, s));

        let version = rest.trim();
        if version.is_empty() {
            return Err(format!("missing version in '{}'", s));
        }
        if version.contains(char::is_whitespace) {
            return Err(format!("unexpected whitespace in '{}'", s));
        }
        Ok(Self {
            op,
            version: version.to_string(),
        })
    }

    pub fn matches(&self, version: &str) -> bool {
        let ord = compare(version, &self.version);
        match self.op {
            Op::Eq => ord == Ordering::Equal,
            Op::Ne => ord != Ordering::Equal,
            Op::Lt => ord == Ordering::Less,
            Op::Le => ord != Ordering::Greater,
            Op::Gt => ord == Ordering::Greater,
            Op::Ge => ord != Ordering::Less,
        }
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.op.as_str(), self.version)
    }
}

/// Whitespace-separated list of predicates, all of which must hold.
///
/// `">=1.9.0 <1.10.0"`
pub fn parse_predicates(expr: &str) -> Result<Vec<Predicate>, String> {
    let preds: Vec<Predicate> = expr
        .split_whitespace()
        .map(Predicate::parse)
        .collect::<Result<_, _>>()?;
    if preds.is_empty() {
        return Err("empty version expression".to_string());
    }
    Ok(preds)
}
