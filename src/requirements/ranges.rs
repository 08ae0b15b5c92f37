//! Conan version ranges to PubGrub Ranges conversion.
//!
//! Converts the expression inside `name/[...]` into `Ranges<Version>`.

use crate::error::RequirementError;
use crate::version::parse_lenient;
use pubgrub::Ranges;
use semver::Version;

/// Parse the expression inside `name/[...]`.
///
/// Space or comma separated terms intersect, `||` separates alternatives.
/// A term is `*`, a bare version (exact), `=v`, `>v`, `>=v`, `<v`, `<=v`,
/// `^v` (up to the next breaking release) or `~v` (up to the next minor,
/// or next major for `~1`). Flags such as `include_prerelease` are ignored.
pub fn parse_range(expr: &str) -> Result<Ranges<Version>, RequirementError> {
    let expr = expr.trim();
    if expr.is_empty() || expr == "*" {
        return Ok(Ranges::full());
    }

    let alternatives: Vec<&str> = expr.split("||").map(str::trim).filter(|a| !a.is_empty()).collect();
    if alternatives.is_empty() {
        return Err(invalid(expr, "empty union"));
    }
    alternatives
        .into_iter()
        .try_fold(Ranges::empty(), |acc, alt| -> Result<_, RequirementError> {
            Ok(acc.union(&parse_terms(alt, expr)?))
        })
}

/// Intersection of the terms in one alternative. Only flags means any version.
fn parse_terms(alt: &str, full: &str) -> Result<Ranges<Version>, RequirementError> {
    let mut acc = Ranges::full();
    for term in alt.split(|c: char| c == ',' || c.is_whitespace()).filter(|t| !t.is_empty()) {
        if is_flag(term) {
            log::debug!("ranges: ignoring flag '{}' in [{}]", term, full);
            continue;
        }
        acc = acc.intersection(&parse_term(term, full)?);
    }
    Ok(acc)
}

fn is_flag(token: &str) -> bool {
    token
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic())
        && (token.contains('=') || token == "include_prerelease")
}

/// Two-char operators first so `>=` is not read as `>`.
const OPERATORS: [&str; 5] = [">=", "<=", ">", "<", "="];

fn bound(op: &str, v: Version) -> Ranges<Version> {
    match op {
        ">=" => Ranges::higher_than(v),
        "<=" => Ranges::lower_than(v),
        ">" => Ranges::strictly_higher_than(v),
        "<" => Ranges::strictly_lower_than(v),
        _ => Ranges::singleton(v),
    }
}

fn parse_term(term: &str, full: &str) -> Result<Ranges<Version>, RequirementError> {
    if term == "*" {
        return Ok(Ranges::full());
    }
    if let Some(rest) = term.strip_prefix('^') {
        let low = parse_version(rest, full)?;
        let high = next_breaking(&low).ok_or_else(|| overflow(term, full))?;
        return Ok(Ranges::between(low, high));
    }
    if let Some(rest) = term.strip_prefix('~') {
        let low = parse_version(rest, full)?;
        let high = if rest.contains('.') {
            low.minor.checked_add(1).map(|minor| Version::new(low.major, minor, 0))
        } else {
            low.major.checked_add(1).map(|major| Version::new(major, 0, 0))
        };
        let high = high.ok_or_else(|| overflow(term, full))?;
        return Ok(Ranges::between(low, high));
    }
    for op in OPERATORS {
        if let Some(rest) = term.strip_prefix(op) {
            return Ok(bound(op, parse_version(rest, full)?));
        }
    }
    Ok(Ranges::singleton(parse_version(term, full)?))
}

/// First version a caret range excludes: the leftmost non-zero part bumps.
/// `None` when that part is already `u64::MAX`.
fn next_breaking(v: &Version) -> Option<Version> {
    match (v.major, v.minor) {
        (0, 0) => v.patch.checked_add(1).map(|patch| Version::new(0, 0, patch)),
        (0, minor) => minor.checked_add(1).map(|minor| Version::new(0, minor, 0)),
        (major, _) => major.checked_add(1).map(|major| Version::new(major, 0, 0)),
    }
}

fn overflow(term: &str, full: &str) -> RequirementError {
    invalid(full, &format!("no upper bound for '{}'", term))
}

fn parse_version(s: &str, full: &str) -> Result<Version, RequirementError> {
    let s = s.trim();
    parse_lenient(s).ok_or_else(|| invalid(full, &format!("cannot parse version '{}'", s)))
}

fn invalid(expr: &str, reason: &str) -> RequirementError {
    RequirementError::InvalidRange {
        expr: expr.to_string(),
        reason: reason.to_string(),
    }
}
