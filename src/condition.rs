//! Typed conditions used by rules, requirements and build definitions.
//!
//! A condition is a TOML table whose clauses are ANDed; an empty table is
//! always true.
//!
//! ```toml
//! when = { os = ["Windows"] }
//! when = { apple = true, options = { with_ssl = "darwinssl" } }
//! when = { enabled = ["with_zstd"], version = ">=7.72.0" }
//! when = { not = { os = ["Windows"] }, enabled = ["wchar_support"] }
//! when = { any = [{ compiler = ["msvc"] }, { os = ["Windows"] }] }
//! ```
//!
//! Option clauses see the option state at the point the condition is
//! evaluated: a removed option is never equal to anything and never enabled.

use crate::options::{OptionSchema, OptionValue, ResolvedOptions};
use crate::settings::{Arch, BuildType, CompilerKind, Os, Settings};
use crate::version;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A condition over settings, options and the recipe version.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Condition {
    /// OS is one of these.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub os: Vec<Os>,
    /// OS is (or is not) an Apple platform.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub apple: Option<bool>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub arch: Vec<Arch>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub compiler: Vec<CompilerKind>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub build_type: Vec<BuildType>,
    /// Options equal to the given values.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub options: BTreeMap<String, OptionValue>,
    /// Options present and truthy.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub enabled: Vec<String>,
    /// Options present and falsy.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub disabled: Vec<String>,
    /// Recipe version predicates, e.g. `">=1.10.0 <2"`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// At least one sub-condition holds.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub any: Vec<Condition>,
    /// Every sub-condition holds.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub all: Vec<Condition>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub not: Option<Box<Condition>>,
}

/// What a condition is evaluated against.
#[derive(Debug, Clone, Copy)]
pub struct EvalContext<'a> {
    pub settings: &'a Settings,
    pub options: &'a ResolvedOptions,
    pub version: &'a str,
}

impl Condition {
    /// Always-true condition.
    pub fn always() -> Self {
        Self::default()
    }

    pub fn is_always(&self) -> bool {
        *self == Self::default()
    }

    pub fn eval(&self, ctx: &EvalContext<'_>) -> bool {
        let settings = ctx.settings;

        if !self.os.is_empty() && !self.os.contains(&settings.os) {
            return false;
        }
        if let Some(apple) = self.apple {
            if settings.os.is_apple() != apple {
                return false;
            }
        }
        if !self.arch.is_empty() && !self.arch.contains(&settings.arch) {
            return false;
        }
        if !self.compiler.is_empty() {
            match settings.compiler_kind() {
                Some(kind) if self.compiler.contains(&kind) => {}
                _ => return false,
            }
        }
        if !self.build_type.is_empty() {
            match settings.build_type {
                Some(bt) if self.build_type.contains(&bt) => {}
                _ => return false,
            }
        }
        for (name, expected) in &self.options {
            if ctx.options.get(name) != Some(expected) {
                return false;
            }
        }
        if !self.enabled.iter().all(|name| ctx.options.is_enabled(name)) {
            return false;
        }
        let disabled_ok = self
            .disabled
            .iter()
            .all(|name| ctx.options.get(name).is_some_and(|v| !v.is_truthy()));
        if !disabled_ok {
            return false;
        }
        if let Some(expr) = &self.version {
            // Checked at load time; an unparsable expression never matches
            match version::parse_predicates(expr) {
                Ok(preds) if preds.iter().all(|p| p.matches(ctx.version)) => {}
                _ => return false,
            }
        }
        if !self.any.is_empty() && !self.any.iter().any(|c| c.eval(ctx)) {
            return false;
        }
        if !self.all.iter().all(|c| c.eval(ctx)) {
            return false;
        }
        if let Some(inner) = &self.not {
            if inner.eval(ctx) {
                return false;
            }
        }
        true
    }

    /// Load-time check: referenced options exist and version expressions parse.
    pub fn check(&self, schema: &OptionSchema) -> Result<(), String> {
        let names = self
            .options
            .keys()
            .chain(self.enabled.iter())
            .chain(self.disabled.iter());
        for name in names {
            if !schema.contains_key(name) {
                return Err(format!("condition references unknown option '{}'", name));
            }
        }
        for (name, value) in &self.options {
            if let Some(def) = schema.get(name) {
                if !def.accepts(value) {
                    return Err(format!(
                        "condition compares option '{}' with '{}', outside {}",
                        name,
                        value,
                        def.describe_domain()
                    ));
                }
            }
        }
        if let Some(expr) = &self.version {
            version::parse_predicates(expr)?;
        }
        for sub in self.any.iter().chain(self.all.iter()) {
            sub.check(schema)?;
        }
        if let Some(inner) = &self.not {
            inner.check(schema)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::OptionDef;
    use crate::settings::Compiler;

    fn linux() -> Settings {
        Settings::new(Os::Linux, Arch::X86_64)
            .with_compiler(Compiler::new(CompilerKind::Gcc).with_version("11"))
            .with_build_type(BuildType::Release)
    }

    fn schema() -> OptionSchema {
        let mut schema = OptionSchema::new();
        schema.insert("shared".to_string(), OptionDef::boolean(false));
        schema.insert(
            "with_ssl".to_string(),
            OptionDef::choice(&[false.into(), "openssl".into()], "openssl".into()),
        );
        schema
    }

    fn parse(s: &str) -> Condition {
        #[derive(Deserialize)]
        struct Wrap {
            when: Condition,
        }
        toml::from_str::<Wrap>(s).unwrap().when
    }

    #[test]
    fn empty_is_always_true() {
        let opts = ResolvedOptions::from_defaults(&schema());
        let ctx = EvalContext { settings: &linux(), options: &opts, version: "1.0" };
        assert!(Condition::always().eval(&ctx));
        assert!(Condition::always().is_always());
    }

    #[test]
    fn clauses_are_anded() {
        let settings = linux();
        let opts = ResolvedOptions::from_defaults(&schema());
        let ctx = EvalContext { settings: &settings, options: &opts, version: "7.80.0" };

        assert!(parse(r#"when = { os = ["Linux"], enabled = ["with_ssl"] }"#).eval(&ctx));
        assert!(!parse(r#"when = { os = ["Linux"], enabled = ["shared"] }"#).eval(&ctx));
        assert!(parse(r#"when = { disabled = ["shared"], version = ">=7.78.0" }"#).eval(&ctx));
        assert!(!parse(r#"when = { version = "<7.78.0" }"#).eval(&ctx));
        assert!(parse(r#"when = { options = { with_ssl = "openssl" } }"#).eval(&ctx));
    }

    #[test]
    fn nested_combinators() {
        let settings = linux();
        let opts = ResolvedOptions::from_defaults(&schema());
        let ctx = EvalContext { settings: &settings, options: &opts, version: "1.0" };

        assert!(parse(r#"when = { not = { os = ["Windows"] } }"#).eval(&ctx));
        assert!(parse(r#"when = { any = [{ os = ["Windows"] }, { compiler = ["gcc"] }] }"#).eval(&ctx));
        assert!(!parse(r#"when = { all = [{ apple = false }, { build_type = ["Debug"] }] }"#).eval(&ctx));
    }

    #[test]
    fn removed_option_never_matches() {
        let settings = linux();
        let mut opts = ResolvedOptions::from_defaults(&schema());
        opts.remove("shared");
        let ctx = EvalContext { settings: &settings, options: &opts, version: "1.0" };
        assert!(!parse(r#"when = { disabled = ["shared"] }"#).eval(&ctx));
        assert!(!parse(r#"when = { options = { shared = false } }"#).eval(&ctx));
    }

    #[test]
    fn check_rejects_unknown_option_and_bad_version() {
        let schema = schema();
        assert!(parse(r#"when = { enabled = ["with_zstd"] }"#).check(&schema).is_err());
        assert!(parse(r#"when = { any = [{ version = ">=" }] }"#).check(&schema).is_err());
        assert!(parse(r#"when = { options = { with_ssl = "gnutls" } }"#).check(&schema).is_err());
        assert!(parse(r#"when = { enabled = ["shared"] }"#).check(&schema).is_ok());
    }

    #[test]
    fn unknown_clause_is_a_parse_error() {
        #[derive(Deserialize, Debug)]
        #[allow(dead_code)]
        struct Wrap {
            when: Condition,
        }
        assert!(toml::from_str::<Wrap>(r#"when = { platform = "linux" }"#).is_err());
    }
}
