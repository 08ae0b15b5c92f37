//! Option/settings resolver.
//!
//! Decides which options exist for a configuration, what their values are,
//! and whether the recipe supports the configuration at all.
//!
//! # Order
//!
//! 1. Schema defaults.
//! 2. `config_options`: `fPIC` removed on Windows; header-library package
//!    type removes `shared` and `fPIC`.
//! 3. Recipe `set` rules, in declaration order (platform defaults).
//! 4. User overrides, checked against each option's domain.
//! 5. `configure`: `shared=True` removes `fPIC`; `header_only=True` removes
//!    `fPIC` and `shared`.
//! 6. Recipe `remove` rules, in declaration order.
//! 7. Settings pruning: C recipes drop `compiler.libcxx`/`compiler.cppstd`.
//!
//! Rules run once, in order, against the state left by the earlier steps, so
//! there are no cycles. [`validate`] then rejects unsupported configurations
//! before anything is downloaded or built.
//!
//! ```toml
//! [[rules]]
//! action = "set"
//! option = "with_ssl"
//! value = "darwinssl"
//! when = { apple = true }
//!
//! [[rules]]
//! action = "remove"
//! options = ["with_libmetalink"]
//! when = { version = ">=7.78.0" }
//!
//! [validate]
//! supported_os = ["Linux", "Macos", "Windows"]
//! compiler_min = { gcc = "5", clang = "3.4", apple-clang = "10", msvc = "191" }
//! min_cppstd = "11"
//!
//! [[validate.invalid]]
//! when = { not = { os = ["Windows"] }, enabled = ["wchar_support"] }
//! message = "wchar_support is only supported on Windows"
//! ```

use crate::condition::{Condition, EvalContext};
use crate::error::ConfigurationError;
use crate::options::{OptionValue, ResolvedOptions};
use crate::recipe::{Language, PackageType, Recipe};
use crate::settings::{cppstd_rank, BuildType, CompilerKind, Os, Settings};
use crate::version;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// Built-in option names with fixed semantics.
pub const OPT_SHARED: &str = "shared";
pub const OPT_FPIC: &str = "fPIC";
pub const OPT_HEADER_ONLY: &str = "header_only";

/// A recipe rule over options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case", deny_unknown_fields)]
pub enum OptionRule {
    /// Change an option's default when the condition holds.
    Set {
        option: String,
        value: OptionValue,
        #[serde(default)]
        when: Condition,
    },
    /// Delete options when the condition holds.
    Remove {
        options: Vec<String>,
        #[serde(default)]
        when: Condition,
    },
}

/// A configuration the recipe refuses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InvalidRule {
    pub when: Condition,
    pub message: String,
}

/// `[validate]` table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ValidateSpec {
    pub supported_os: Vec<Os>,
    pub supported_build_types: Vec<BuildType>,
    /// Minimum compiler version per compiler family.
    pub compiler_min: BTreeMap<CompilerKind, String>,
    /// Reject compilers missing from `compiler_min`.
    pub strict_compilers: bool,
    pub min_cppstd: Option<String>,
    pub invalid: Vec<InvalidRule>,
}

/// Result of resolution: recipe identity plus pruned settings and options.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResolvedConfig {
    pub name: String,
    pub version: String,
    pub settings: Settings,
    pub options: ResolvedOptions,
}

impl ResolvedConfig {
    /// `name/version`
    pub fn reference(&self) -> String {
        format!("{}/{}", self.name, self.version)
    }

    /// One-line description of settings and options for messages.
    pub fn summary(&self) -> String {
        if self.options.is_empty() {
            self.settings.to_string()
        } else {
            format!("{}; {}", self.settings, self.options)
        }
    }

    pub fn eval(&self, condition: &Condition) -> bool {
        condition.eval(&EvalContext {
            settings: &self.settings,
            options: &self.options,
            version: &self.version,
        })
    }

    pub fn is_shared(&self) -> bool {
        self.options.is_enabled(OPT_SHARED)
    }

    pub fn is_header_only(&self) -> bool {
        self.options.is_enabled(OPT_HEADER_ONLY)
    }
}

/// Resolve options and validate the configuration.
pub fn resolve(
    recipe: &Recipe,
    settings: &Settings,
    overrides: &BTreeMap<String, String>,
) -> Result<ResolvedConfig, ConfigurationError> {
    let resolved = resolve_options(recipe, settings, overrides)?;
    validate(recipe, &resolved)?;
    Ok(resolved)
}

/// Resolve options without validating support for the configuration.
///
/// Pure with respect to `settings`: the input is never modified, the returned
/// settings are a pruned copy.
pub fn resolve_options(
    recipe: &Recipe,
    settings: &Settings,
    overrides: &BTreeMap<String, String>,
) -> Result<ResolvedConfig, ConfigurationError> {
    let reference = recipe.reference();
    let mut options = ResolvedOptions::from_defaults(&recipe.options);

    // config_options
    if settings.os == Os::Windows && options.remove(OPT_FPIC) {
        log::trace!("{}: fPIC removed on Windows", reference);
    }
    if recipe.package_type == PackageType::HeaderLibrary {
        options.remove(OPT_SHARED);
        options.remove(OPT_FPIC);
    }

    for rule in &recipe.rules {
        if let OptionRule::Set { option, value, when } = rule {
            if options.contains(option) && eval(when, settings, &options, &recipe.version) {
                log::trace!("{}: rule sets {}={}", reference, option, value);
                options.set(option, value.clone());
            }
        }
    }

    for (name, raw) in overrides {
        let def = recipe.options.get(name).ok_or_else(|| ConfigurationError::UnknownOption {
            reference: reference.clone(),
            option: name.clone(),
        })?;
        let value = def
            .parse_value(raw)
            .ok_or_else(|| ConfigurationError::InvalidOptionValue {
                reference: reference.clone(),
                option: name.clone(),
                value: raw.clone(),
                allowed: def.describe_domain(),
            })?;
        if !options.contains(name) {
            log::debug!("{}: override {}={} ignored, option removed", reference, name, raw);
            continue;
        }
        options.set(name, value);
    }

    // configure
    if options.is_enabled(OPT_HEADER_ONLY) {
        options.remove(OPT_SHARED);
        options.remove(OPT_FPIC);
    }
    if options.is_enabled(OPT_SHARED) {
        options.remove(OPT_FPIC);
    }

    for rule in &recipe.rules {
        if let OptionRule::Remove { options: names, when } = rule {
            if eval(when, settings, &options, &recipe.version) {
                for name in names {
                    if options.remove(name) {
                        log::trace!("{}: rule removes {}", reference, name);
                    }
                }
            }
        }
    }

    let settings = match recipe.language {
        Language::C => settings.without_cpp(),
        Language::Cpp => settings.clone(),
    };

    Ok(ResolvedConfig {
        name: recipe.name.clone(),
        version: recipe.version.clone(),
        settings,
        options,
    })
}

fn eval(when: &Condition, settings: &Settings, options: &ResolvedOptions, version: &str) -> bool {
    when.eval(&EvalContext {
        settings,
        options,
        version,
    })
}

/// Reject configurations the recipe does not support.
pub fn validate(recipe: &Recipe, resolved: &ResolvedConfig) -> Result<(), ConfigurationError> {
    let spec = &recipe.validate;
    let settings = &resolved.settings;
    let invalid = |reason: String| ConfigurationError::Invalid {
        reference: resolved.reference(),
        configuration: resolved.summary(),
        reason,
    };

    if !spec.supported_os.is_empty() && !spec.supported_os.contains(&settings.os) {
        let list: Vec<&str> = spec.supported_os.iter().map(|o| o.as_str()).collect();
        return Err(invalid(format!(
            "os {} is not supported (supported: {})",
            settings.os,
            list.join(", ")
        )));
    }

    if !spec.supported_build_types.is_empty() {
        if let Some(bt) = settings.build_type {
            if !spec.supported_build_types.contains(&bt) {
                return Err(invalid(format!("build_type {} is not supported", bt)));
            }
        }
    }

    if recipe.build.system.as_deref() == Some("msbuild") && settings.os != Os::Windows {
        return Err(invalid("MSBuild projects only build on Windows".to_string()));
    }

    if let Some(compiler) = &settings.compiler {
        match (spec.compiler_min.get(&compiler.kind), compiler.version.as_deref()) {
            (Some(min), Some(actual)) => {
                if version::compare(actual, min) == Ordering::Less {
                    return Err(invalid(format!(
                        "requires {} >= {}, got {}",
                        compiler.kind, min, actual
                    )));
                }
            }
            (Some(min), None) => {
                log::warn!(
                    "{}: compiler.version not set, cannot check {} >= {}",
                    resolved.reference(),
                    compiler.kind,
                    min
                );
            }
            (None, _) if spec.compiler_min.is_empty() => {}
            (None, _) if spec.strict_compilers => {
                return Err(invalid(format!("compiler {} is not supported", compiler.kind)));
            }
            (None, _) => {
                log::warn!(
                    "{}: no known minimum version for compiler {}, assuming it works",
                    resolved.reference(),
                    compiler.kind
                );
            }
        }
    }

    if let (Some(min), Some(actual)) = (&spec.min_cppstd, settings.cppstd()) {
        match (cppstd_rank(min), cppstd_rank(actual)) {
            (Some(m), Some(a)) if a < m => {
                return Err(invalid(format!("requires C++{}, got compiler.cppstd={}", min, actual)));
            }
            (Some(_), Some(_)) => {}
            _ => log::warn!("{}: cannot compare cppstd '{}' with '{}'", resolved.reference(), actual, min),
        }
    }

    for rule in &spec.invalid {
        if resolved.eval(&rule.when) {
            return Err(invalid(rule.message.clone()));
        }
    }

    log::debug!("{}: configuration valid ({})", resolved.reference(), resolved.summary());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::{Arch, Compiler};

    const SPDLOG: &str = r#"
[recipe]
name = "spdlog"
license = "MIT"

[options]
shared = { values = [true, false], default = false }
fPIC = { values = [true, false], default = true }
header_only = { values = [true, false], default = false }
wchar_support = { values = [true, false], default = false }

[[rules]]
action = "remove"
options = ["wchar_support"]
when = { not = { os = ["Windows"] } }

[validate]
compiler_min = { gcc = "5", clang = "3.4", apple-clang = "10", msvc = "191" }
min_cppstd = "11"

[build]
system = "cmake"
"#;

    const CURL: &str = r#"
[recipe]
name = "libcurl"
language = "c"

[options]
shared = { values = [true, false], default = false }
fPIC = { values = [true, false], default = true }
with_ssl = { values = [false, "openssl", "darwinssl", "schannel"], default = "openssl" }
with_libmetalink = { values = [true, false], default = false }

[[rules]]
action = "set"
option = "with_ssl"
value = "darwinssl"
when = { apple = true }

[[rules]]
action = "set"
option = "with_ssl"
value = "schannel"
when = { os = ["Windows"] }

[[rules]]
action = "remove"
options = ["with_libmetalink"]
when = { version = ">=7.78.0" }

[[validate.invalid]]
when = { options = { with_ssl = "schannel" }, not = { os = ["Windows"] } }
message = "schannel only works on Windows"

[build]
system = "autotools"
"#;

    fn gcc(os: Os, version: &str) -> Settings {
        Settings::new(os, Arch::X86_64)
            .with_compiler(Compiler::new(CompilerKind::Gcc).with_version(version))
            .with_build_type(BuildType::Release)
    }

    fn ov(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn windows_removes_fpic() {
        let recipe = Recipe::from_toml_str(SPDLOG, "1.12.0").unwrap();
        let mut settings = gcc(Os::Windows, "11");
        settings.compiler = Some(Compiler::new(CompilerKind::Msvc).with_version("193"));
        let resolved = resolve(&recipe, &settings, &BTreeMap::new()).unwrap();
        assert!(!resolved.options.contains("fPIC"));
        assert!(resolved.options.contains("shared"));
        assert!(resolved.options.contains("wchar_support"));
    }

    #[test]
    fn shared_removes_fpic_and_round_trips() {
        let recipe = Recipe::from_toml_str(SPDLOG, "1.12.0").unwrap();
        let settings = gcc(Os::Linux, "11");

        let shared = resolve(&recipe, &settings, &ov(&[("shared", "True")])).unwrap();
        assert!(shared.options.get("fPIC").is_none());

        let static_ = resolve(&recipe, &settings, &ov(&[("shared", "False")])).unwrap();
        assert_eq!(static_.options.get("fPIC"), Some(&OptionValue::Bool(true)));
    }

    #[test]
    fn header_only_removes_shared_and_fpic() {
        let recipe = Recipe::from_toml_str(SPDLOG, "1.12.0").unwrap();
        let resolved = resolve(&recipe, &gcc(Os::Linux, "11"), &ov(&[("header_only", "True")])).unwrap();
        assert!(!resolved.options.contains("shared"));
        assert!(!resolved.options.contains("fPIC"));
        assert!(resolved.is_header_only());
    }

    #[test]
    fn old_gcc_is_rejected() {
        let recipe = Recipe::from_toml_str(SPDLOG, "1.12.0").unwrap();
        let err = resolve(&recipe, &gcc(Os::Linux, "4.9"), &BTreeMap::new()).unwrap_err();
        match err {
            ConfigurationError::Invalid { reference, reason, configuration } => {
                assert_eq!(reference, "spdlog/1.12.0");
                assert!(reason.contains("gcc >= 5"), "{}", reason);
                assert!(configuration.contains("compiler.version=4.9"));
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(resolve(&recipe, &gcc(Os::Linux, "5"), &BTreeMap::new()).is_ok());
    }

    #[test]
    fn unknown_compiler_version_warns_and_passes() {
        let recipe = Recipe::from_toml_str(SPDLOG, "1.12.0").unwrap();
        let mut settings = gcc(Os::Linux, "11");
        settings.compiler = Some(Compiler::new(CompilerKind::Gcc));
        assert!(resolve(&recipe, &settings, &BTreeMap::new()).is_ok());

        settings.compiler = Some(Compiler::new(CompilerKind::IntelCc).with_version("2021"));
        assert!(resolve(&recipe, &settings, &BTreeMap::new()).is_ok());
    }

    #[test]
    fn cppstd_too_old() {
        let recipe = Recipe::from_toml_str(SPDLOG, "1.12.0").unwrap();
        let mut settings = gcc(Os::Linux, "11");
        settings.set("compiler.cppstd", "98").unwrap();
        assert!(resolve(&recipe, &settings, &BTreeMap::new()).is_err());
        settings.set("compiler.cppstd", "gnu14").unwrap();
        assert!(resolve(&recipe, &settings, &BTreeMap::new()).is_ok());
    }

    #[test]
    fn override_errors() {
        let recipe = Recipe::from_toml_str(SPDLOG, "1.12.0").unwrap();
        let settings = gcc(Os::Linux, "11");
        assert!(matches!(
            resolve(&recipe, &settings, &ov(&[("with_zstd", "True")])),
            Err(ConfigurationError::UnknownOption { .. })
        ));
        assert!(matches!(
            resolve(&recipe, &settings, &ov(&[("shared", "maybe")])),
            Err(ConfigurationError::InvalidOptionValue { .. })
        ));
        // wchar_support is removed on Linux; a value for it is ignored
        let resolved = resolve(&recipe, &settings, &ov(&[("wchar_support", "True")])).unwrap();
        assert!(!resolved.options.contains("wchar_support"));
    }

    #[test]
    fn bool_override_outside_mixed_domain() {
        let recipe = Recipe::from_toml_str(CURL, "8.4.0").unwrap();
        let settings = gcc(Os::Linux, "11");
        assert!(matches!(
            resolve(&recipe, &settings, &ov(&[("with_ssl", "True")])),
            Err(ConfigurationError::InvalidOptionValue { .. })
        ));
        let resolved = resolve(&recipe, &settings, &ov(&[("with_ssl", "False")])).unwrap();
        assert_eq!(resolved.options.get("with_ssl"), Some(&OptionValue::Bool(false)));
    }

    #[test]
    fn set_rules_are_defaults_users_win() {
        let recipe = Recipe::from_toml_str(CURL, "8.4.0").unwrap();
        let mut mac = gcc(Os::Macos, "11");
        mac.compiler = Some(Compiler::new(CompilerKind::AppleClang).with_version("15"));

        let resolved = resolve(&recipe, &mac, &BTreeMap::new()).unwrap();
        assert_eq!(resolved.options.get("with_ssl"), Some(&"darwinssl".into()));

        let resolved = resolve(&recipe, &mac, &ov(&[("with_ssl", "openssl")])).unwrap();
        assert_eq!(resolved.options.get("with_ssl"), Some(&"openssl".into()));
    }

    #[test]
    fn invalid_rule_and_version_removal() {
        let recipe = Recipe::from_toml_str(CURL, "8.4.0").unwrap();
        let linux = gcc(Os::Linux, "11");
        let err = resolve(&recipe, &linux, &ov(&[("with_ssl", "schannel")])).unwrap_err();
        assert!(err.to_string().contains("schannel only works on Windows"));

        let resolved = resolve(&recipe, &linux, &BTreeMap::new()).unwrap();
        assert!(!resolved.options.contains("with_libmetalink"));
        let old = Recipe::from_toml_str(CURL, "7.77.0").unwrap();
        let resolved = resolve(&old, &linux, &BTreeMap::new()).unwrap();
        assert!(resolved.options.contains("with_libmetalink"));
    }

    #[test]
    fn c_recipe_prunes_cpp_settings_without_touching_input() {
        let recipe = Recipe::from_toml_str(CURL, "8.4.0").unwrap();
        let mut settings = gcc(Os::Linux, "11");
        settings.set("compiler.libcxx", "libstdc++11").unwrap();
        settings.set("compiler.cppstd", "17").unwrap();
        let before = settings.clone();

        let resolved = resolve(&recipe, &settings, &BTreeMap::new()).unwrap();
        assert_eq!(resolved.settings.cppstd(), None);
        assert_eq!(settings, before);
    }

    #[test]
    fn resolution_is_idempotent() {
        let recipe = Recipe::from_toml_str(CURL, "8.4.0").unwrap();
        let settings = gcc(Os::Linux, "11");
        let overrides = ov(&[("shared", "True")]);
        let a = resolve(&recipe, &settings, &overrides).unwrap();
        let b = resolve(&recipe, &settings, &overrides).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn supported_os_and_build_types() {
        let text = SPDLOG.replace(
            "min_cppstd = \"11\"",
            "min_cppstd = \"11\"\nsupported_os = [\"Linux\"]\nsupported_build_types = [\"Release\"]",
        );
        let recipe = Recipe::from_toml_str(&text, "1.12.0").unwrap();
        assert!(resolve(&recipe, &gcc(Os::FreeBSD, "11"), &BTreeMap::new()).is_err());
        let debug = gcc(Os::Linux, "11").with_build_type(BuildType::Debug);
        assert!(resolve(&recipe, &debug, &BTreeMap::new()).is_err());
        assert!(resolve(&recipe, &gcc(Os::Linux, "11"), &BTreeMap::new()).is_ok());
    }
}
