//! Dependency declarator.
//!
//! Turns a recipe's `[[requires]]` and `[[tool_requires]]` tables into an
//! ordered list of [`Requirement`]s for one resolved configuration.
//!
//! ```toml
//! [[requires]]
//! ref = "zlib/[>=1.2.11 <2]"
//!
//! [[requires]]
//! ref = "openssl/[>=1.1 <4]"
//! when = { options = { with_ssl = "openssl" } }
//!
//! [[tool_requires]]
//! ref = "pkgconf/2.1.0"
//! when = { not = { os = ["Windows"] } }
//! ```
//!
//! Output order is declaration order, regular requirements first. The same
//! name declared twice is kept once: equivalent constraints collapse,
//! overlapping ones narrow to their intersection, disjoint ones are an error. Nothing here looks at other recipes: picking
//! concrete versions across a graph is the package manager's job.

mod ranges;
mod reference;

pub use ranges::parse_range;
pub use reference::{Reference, VersionConstraint};

use crate::condition::{Condition, EvalContext};
use crate::error::RequirementError;
use crate::recipe::Recipe;
use crate::resolver::ResolvedConfig;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Requirement kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequirementKind {
    /// Linked into the package (`requires`).
    Regular,
    /// Needed only to build (`tool_requires`).
    Tool,
}

impl fmt::Display for RequirementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequirementKind::Regular => f.write_str("requires"),
            RequirementKind::Tool => f.write_str("tool_requires"),
        }
    }
}

/// A requirement as written in recipe.toml.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RequirementDecl {
    #[serde(rename = "ref")]
    pub reference: String,
    #[serde(default, skip_serializing_if = "Condition::is_always")]
    pub when: Condition,
    /// Consumers also see this dependency's headers.
    #[serde(default)]
    pub transitive_headers: bool,
    /// Consumers also link this dependency's libraries.
    #[serde(default)]
    pub transitive_libs: bool,
}

/// A declared requirement for one configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Requirement {
    pub reference: Reference,
    pub kind: RequirementKind,
    pub transitive_headers: bool,
    pub transitive_libs: bool,
}

impl Requirement {
    pub fn name(&self) -> &str {
        &self.reference.name
    }
}

impl fmt::Display for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind, self.reference)
    }
}

/// Declare requirements for a resolved configuration.
///
/// Pure: same recipe and configuration always give the same list.
pub fn declare(recipe: &Recipe, resolved: &ResolvedConfig) -> Result<Vec<Requirement>, RequirementError> {
    let ctx = EvalContext {
        settings: &resolved.settings,
        options: &resolved.options,
        version: &resolved.version,
    };

    let decls = recipe
        .requires
        .iter()
        .map(|d| (d, RequirementKind::Regular))
        .chain(recipe.tool_requires.iter().map(|d| (d, RequirementKind::Tool)));

    let mut out: Vec<Requirement> = Vec::new();
    for (decl, kind) in decls {
        if !decl.when.eval(&ctx) {
            log::trace!("{}: skipping {} {} (condition false)", recipe.name, kind, decl.reference);
            continue;
        }
        let reference = Reference::parse(&decl.reference)?;

        if let Some(existing) = out
            .iter_mut()
            .find(|r| r.kind == kind && r.reference.name == reference.name)
        {
            let (first, second) = (&existing.reference.constraint, &reference.constraint);
            if first.is_equivalent(second) {
                log::debug!("{}: duplicate {} {} ignored", recipe.name, kind, reference);
            } else if first.is_compatible(second) {
                let narrowed = first.narrow(second);
                log::debug!(
                    "{}: {} {} narrowed by {} to {}",
                    recipe.name, kind, existing.reference, second, narrowed
                );
                existing.reference.constraint = narrowed;
            } else {
                return Err(RequirementError::Conflict {
                    recipe: recipe.name.clone(),
                    name: reference.name.clone(),
                    first: first.to_string(),
                    second: second.to_string(),
                });
            }
            existing.transitive_headers |= decl.transitive_headers;
            existing.transitive_libs |= decl.transitive_libs;
            continue;
        }

        out.push(Requirement {
            reference,
            kind,
            transitive_headers: decl.transitive_headers,
            transitive_libs: decl.transitive_libs,
        });
    }

    log::debug!(
        "{}/{}: declared {} requirement(s)",
        recipe.name,
        resolved.version,
        out.len()
    );
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::OptionOverrides;
    use crate::recipe::Recipe;
    use crate::resolver::resolve;
    use crate::settings::{Arch, Compiler, CompilerKind, Os, Settings};

    const CURL: &str = r#"
[recipe]
name = "libcurl"
license = "curl"

[options]
shared = { values = [true, false], default = false }
with_ssl = { values = [false, "openssl", "wolfssl"], default = "openssl" }
with_zlib = { values = [true, false], default = true }

[[requires]]
ref = "openssl/[>=1.1 <4]"
when = { options = { with_ssl = "openssl" } }

[[requires]]
ref = "wolfssl/5.6.6"
when = { options = { with_ssl = "wolfssl" } }

[[requires]]
ref = "zlib/[>=1.2.11 <2]"
when = { enabled = ["with_zlib"] }

[[tool_requires]]
ref = "libtool/2.4.7"
when = { not = { os = ["Windows"] } }

[build]
system = "autotools"
"#;

    fn settings(os: Os) -> Settings {
        Settings::new(os, Arch::X86_64)
            .with_compiler(Compiler::new(CompilerKind::Gcc).with_version("11"))
    }

    fn names(reqs: &[Requirement]) -> Vec<String> {
        reqs.iter().map(|r| r.reference.to_string()).collect()
    }

    fn declared(recipe: &Recipe, os: Os, overrides: &[&str]) -> Vec<Requirement> {
        let ovs: OptionOverrides = overrides
            .iter()
            .filter_map(|s| crate::options::OptionOverride::parse(s))
            .collect();
        let resolved = resolve(recipe, &settings(os), &ovs.for_recipe(&recipe.name, &recipe.options)).unwrap();
        declare(recipe, &resolved).unwrap()
    }

    #[test]
    fn ssl_option_toggles_requirement() {
        let recipe = Recipe::from_toml_str(CURL, "8.4.0").unwrap();

        let with = declared(&recipe, Os::Linux, &[]);
        assert_eq!(
            names(&with),
            vec!["openssl/[>=1.1 <4]", "zlib/[>=1.2.11 <2]", "libtool/2.4.7"]
        );

        let without = declared(&recipe, Os::Linux, &["with_ssl=False"]);
        assert_eq!(names(&without), vec!["zlib/[>=1.2.11 <2]", "libtool/2.4.7"]);

        let wolf = declared(&recipe, Os::Windows, &["with_ssl=wolfssl", "with_zlib=False"]);
        assert_eq!(names(&wolf), vec!["wolfssl/5.6.6"]);
        assert_eq!(wolf[0].kind, RequirementKind::Regular);
    }

    #[test]
    fn declaration_is_deterministic() {
        let recipe = Recipe::from_toml_str(CURL, "8.4.0").unwrap();
        assert_eq!(declared(&recipe, Os::Linux, &[]), declared(&recipe, Os::Linux, &[]));
    }

    #[test]
    fn duplicates_and_conflicts() {
        let base = r#"
[recipe]
name = "app"

[build]
system = "cmake"
"#;
        let dup = format!("{}\n[[requires]]\nref = \"fmt/10.1.1\"\n[[requires]]\nref = \"fmt/10.1.1\"\n", base);
        let recipe = Recipe::from_toml_str(&dup, "1.0").unwrap();
        let resolved = resolve(&recipe, &settings(Os::Linux), &Default::default()).unwrap();
        assert_eq!(declare(&recipe, &resolved).unwrap().len(), 1);

        let respelled = format!(
            "{}\n[[requires]]\nref = \"fmt/[>=10 <11]\"\n[[requires]]\nref = \"fmt/[>=10, <11]\"\n[[requires]]\nref = \"zlib/1.3\"\n[[requires]]\nref = \"zlib/1.3.0\"\n",
            base
        );
        let recipe = Recipe::from_toml_str(&respelled, "1.0").unwrap();
        let resolved = resolve(&recipe, &settings(Os::Linux), &Default::default()).unwrap();
        let reqs = declare(&recipe, &resolved).unwrap();
        assert_eq!(names(&reqs), vec!["fmt/[>=10 <11]", "zlib/1.3"]);

        let overlap = format!(
            "{}\n[[requires]]\nref = \"fmt/[>=9 <11]\"\n[[requires]]\nref = \"fmt/[>=10]\"\ntransitive_headers = true\n",
            base
        );
        let recipe = Recipe::from_toml_str(&overlap, "1.0").unwrap();
        let resolved = resolve(&recipe, &settings(Os::Linux), &Default::default()).unwrap();
        let reqs = declare(&recipe, &resolved).unwrap();
        assert_eq!(reqs.len(), 1);
        assert!(reqs[0].reference.constraint.matches("10.2.1"));
        assert!(!reqs[0].reference.constraint.matches("9.1.0"));
        assert!(reqs[0].transitive_headers);

        let clash = format!("{}\n[[requires]]\nref = \"fmt/10.1.1\"\n[[requires]]\nref = \"fmt/[<10]\"\n", base);
        let recipe = Recipe::from_toml_str(&clash, "1.0").unwrap();
        let resolved = resolve(&recipe, &settings(Os::Linux), &Default::default()).unwrap();
        assert!(matches!(
            declare(&recipe, &resolved),
            Err(RequirementError::Conflict { .. })
        ));
    }
}
