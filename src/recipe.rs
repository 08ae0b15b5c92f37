//! Recipe definition and loading.
//!
//! A recipe folder holds `recipe.toml` and, usually, `conandata.yml`:
//!
//! ```text
//! recipes/zlib/
//! ├── config.yml
//! └── all/
//!     ├── recipe.toml
//!     ├── conandata.yml
//!     └── patches/
//!         └── 1.3.1-0001-fix-cmake.patch
//! ```
//!
//! Loading binds the recipe to one version and checks it for consistency
//! (defaults inside their domains, conditions and rules naming declared
//! options, parseable references) so that a bad recipe fails at load time,
//! not halfway through a build.

use crate::adapters::{BuildSpec, BuildSystemRegistry};
use crate::conandata::ConanData;
use crate::error::LoadError;
use crate::options::OptionSchema;
use crate::package_info::PackageInfoSpec;
use crate::packager::PackageSpec;
use crate::requirements::{Reference, RequirementDecl};
use crate::resolver::{OptionRule, ValidateSpec};
use crate::source::SourceTweaks;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Recipe file name.
pub const RECIPE_FILE: &str = "recipe.toml";

/// What the package contains.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PackageType {
    #[default]
    Library,
    HeaderLibrary,
    Application,
    BuildScripts,
}

/// Source language; C recipes drop C++ settings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Language {
    #[serde(rename = "c", alias = "C")]
    C,
    #[default]
    #[serde(rename = "c++", alias = "C++", alias = "cpp")]
    Cpp,
}

/// `[recipe]` table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Metadata {
    pub name: String,
    /// Fixed version for recipes without conandata.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub homepage: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default)]
    pub topics: Vec<String>,
    #[serde(default)]
    pub package_type: PackageType,
    #[serde(default)]
    pub language: Language,
}

/// Raw recipe.toml layout.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RecipeFile {
    recipe: Metadata,
    #[serde(default)]
    options: OptionSchema,
    #[serde(default)]
    rules: Vec<OptionRule>,
    #[serde(default)]
    validate: ValidateSpec,
    #[serde(default)]
    requires: Vec<RequirementDecl>,
    #[serde(default)]
    tool_requires: Vec<RequirementDecl>,
    #[serde(default)]
    source: SourceTweaks,
    #[serde(default)]
    build: BuildSpec,
    #[serde(default)]
    package: PackageSpec,
    #[serde(default)]
    package_info: PackageInfoSpec,
}

/// A recipe bound to one version. Immutable once loaded.
#[derive(Debug, Clone)]
pub struct Recipe {
    pub name: String,
    pub version: String,
    pub description: Option<String>,
    pub license: Option<String>,
    pub homepage: Option<String>,
    pub url: Option<String>,
    pub topics: Vec<String>,
    pub package_type: PackageType,
    pub language: Language,
    pub options: OptionSchema,
    pub rules: Vec<OptionRule>,
    pub validate: ValidateSpec,
    pub requires: Vec<RequirementDecl>,
    pub tool_requires: Vec<RequirementDecl>,
    pub source: SourceTweaks,
    pub build: BuildSpec,
    pub package: PackageSpec,
    pub package_info: PackageInfoSpec,
    pub conandata: ConanData,
    /// Folder the recipe was loaded from (None for in-memory recipes).
    pub folder: Option<PathBuf>,
}

impl Recipe {
    /// Load from a recipe folder (or a path to its recipe.toml).
    ///
    /// `version` picks the conandata entry; without it the `[recipe] version`
    /// or the newest conandata version is used.
    pub fn load(path: &Path, version: Option<&str>) -> Result<Self, LoadError> {
        let (dir, file) = if path.is_dir() {
            (path.to_path_buf(), path.join(RECIPE_FILE))
        } else {
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."))
                .to_path_buf();
            (dir, path.to_path_buf())
        };
        if !file.exists() {
            return Err(LoadError::NotFound { path: file });
        }
        log::debug!("Recipe: loading {}", file.display());

        let text = std::fs::read_to_string(&file).map_err(|e| LoadError::Read {
            path: file.clone(),
            reason: e.to_string(),
        })?;
        let conandata = ConanData::load_dir(&dir)?;
        let mut recipe = Self::parse(&text, &file, conandata, version)?;
        recipe.folder = Some(dir);
        Ok(recipe)
    }

    /// Parse recipe TOML without conandata (tests, inline recipes).
    pub fn from_toml_str(text: &str, version: &str) -> Result<Self, LoadError> {
        Self::parse(text, Path::new("<memory>"), ConanData::default(), Some(version))
    }

    fn parse(
        text: &str,
        path: &Path,
        conandata: ConanData,
        version: Option<&str>,
    ) -> Result<Self, LoadError> {
        let file: RecipeFile = toml::from_str(text).map_err(|e| LoadError::Parse {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        let meta = file.recipe;

        let version = pick_version(&meta, &conandata, version)?;

        let recipe = Recipe {
            name: meta.name,
            version,
            description: meta.description,
            license: meta.license,
            homepage: meta.homepage,
            url: meta.url,
            topics: meta.topics,
            package_type: meta.package_type,
            language: meta.language,
            options: file.options,
            rules: file.rules,
            validate: file.validate,
            requires: file.requires,
            tool_requires: file.tool_requires,
            source: file.source,
            build: file.build,
            package: file.package,
            package_info: file.package_info,
            conandata,
            folder: None,
        };

        recipe.check().map_err(|reason| LoadError::Invalid {
            path: path.to_path_buf(),
            reason,
        })?;
        Ok(recipe)
    }

    /// `name/version`
    pub fn reference(&self) -> String {
        format!("{}/{}", self.name, self.version)
    }

    pub fn is_header_library(&self) -> bool {
        self.package_type == PackageType::HeaderLibrary
    }

    /// Versions with sources in conandata, newest first.
    pub fn available_versions(&self) -> Vec<String> {
        self.conandata.versions()
    }

    /// Consistency checks run at load time.
    fn check(&self) -> Result<(), String> {
        if self.name.is_empty()
            || !self
                .name
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '-' | '_' | '.' | '+'))
        {
            return Err(format!("invalid recipe name '{}'", self.name));
        }

        for (name, def) in &self.options {
            if def.values.is_empty() {
                return Err(format!("option '{}' has an empty domain", name));
            }
            if !def.accepts(&def.default) {
                return Err(format!(
                    "default '{}' of option '{}' is outside {}",
                    def.default,
                    name,
                    def.describe_domain()
                ));
            }
        }

        let known = |name: &str| -> Result<(), String> {
            if self.options.contains_key(name) {
                Ok(())
            } else {
                Err(format!("rule references unknown option '{}'", name))
            }
        };
        for rule in &self.rules {
            match rule {
                OptionRule::Set { option, value, when } => {
                    known(option)?;
                    if let Some(def) = self.options.get(option) {
                        if !def.accepts(value) {
                            return Err(format!(
                                "rule sets '{}' to '{}', outside {}",
                                option,
                                value,
                                def.describe_domain()
                            ));
                        }
                    }
                    when.check(&self.options)?;
                }
                OptionRule::Remove { options, when } => {
                    for option in options {
                        known(option)?;
                    }
                    when.check(&self.options)?;
                }
            }
        }

        for rule in &self.validate.invalid {
            rule.when.check(&self.options)?;
        }

        for decl in self.requires.iter().chain(self.tool_requires.iter()) {
            Reference::parse(&decl.reference).map_err(|e| e.to_string())?;
            decl.when.check(&self.options)?;
        }

        if let Some(system) = &self.build.system {
            if BuildSystemRegistry::new().by_name(system).is_none() {
                return Err(format!("unknown build system '{}'", system));
            }
        }
        for name in self.build.option_map.keys() {
            if !self.options.contains_key(name) {
                return Err(format!("[build.option_map] references unknown option '{}'", name));
            }
        }
        for cond in &self.build.conditional {
            cond.when.check(&self.options)?;
        }

        for extra in &self.package_info.when {
            extra.when.check(&self.options)?;
            if let Some(component) = &extra.component {
                if !self.package_info.components.contains_key(component) {
                    return Err(format!("[[package_info.when]] names unknown component '{}'", component));
                }
            }
        }
        for (name, component) in &self.package_info.components {
            for req in &component.requires {
                // "other" (sibling component) or "dep::component"
                if !req.contains("::") && !self.package_info.components.contains_key(req) {
                    return Err(format!("component '{}' requires unknown component '{}'", name, req));
                }
            }
        }

        for cond in &self.source.replace {
            cond.when.check(&self.options)?;
        }
        for rule in &self.package.copy {
            rule.when.check(&self.options)?;
        }

        Ok(())
    }
}

fn pick_version(meta: &Metadata, conandata: &ConanData, requested: Option<&str>) -> Result<String, LoadError> {
    let available = conandata.versions();
    match requested.or(meta.version.as_deref()) {
        Some(v) => {
            if !available.is_empty() && conandata.source(v).is_none() {
                return Err(LoadError::UnknownVersion {
                    recipe: meta.name.clone(),
                    version: v.to_string(),
                    available: available.join(", "),
                });
            }
            Ok(v.to_string())
        }
        None => available
            .into_iter()
            .next()
            .ok_or_else(|| LoadError::NoVersions {
                recipe: meta.name.clone(),
            }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const MINIMAL: &str = r#"
[recipe]
name = "zlib"
license = "Zlib"
language = "c"

[options]
shared = { values = [true, false], default = false }
fPIC = { values = [true, false], default = true }

[build]
system = "cmake"
"#;

    const CONANDATA: &str = r#"
sources:
  "1.3.1":
    url: "https://zlib.net/fossils/zlib-1.3.1.tar.gz"
    sha256: "9a93b2b7dfdac77ceba5a558a580e74667dd6fede4585b91eefb60f03b72df23"
  "1.2.13":
    url: "https://zlib.net/fossils/zlib-1.2.13.tar.gz"
    sha256: "b3a24de97a8fdbc835b9833169501030b8977031bcb54b3b3ac13740f846ab30"
"#;

    fn folder() -> TempDir {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(RECIPE_FILE), MINIMAL).unwrap();
        fs::write(dir.path().join("conandata.yml"), CONANDATA).unwrap();
        dir
    }

    #[test]
    fn load_picks_newest_version() {
        let dir = folder();
        let recipe = Recipe::load(dir.path(), None).unwrap();
        assert_eq!(recipe.reference(), "zlib/1.3.1");
        assert_eq!(recipe.language, Language::C);
        assert_eq!(recipe.folder.as_deref(), Some(dir.path()));
        assert_eq!(recipe.available_versions(), vec!["1.3.1", "1.2.13"]);
    }

    #[test]
    fn load_explicit_and_unknown_version() {
        let dir = folder();
        let recipe = Recipe::load(&dir.path().join(RECIPE_FILE), Some("1.2.13")).unwrap();
        assert_eq!(recipe.version, "1.2.13");
        assert!(matches!(
            Recipe::load(dir.path(), Some("0.9")),
            Err(LoadError::UnknownVersion { .. })
        ));
    }

    #[test]
    fn load_missing_file() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(Recipe::load(dir.path(), None), Err(LoadError::NotFound { .. })));
    }

    #[test]
    fn no_version_anywhere() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(RECIPE_FILE), MINIMAL).unwrap();
        assert!(matches!(Recipe::load(dir.path(), None), Err(LoadError::NoVersions { .. })));
    }

    #[test]
    fn invalid_recipes_fail_at_load() {
        let cases = [
            // default outside domain
            MINIMAL.replace("default = false", "default = \"yes\""),
            // rule on unknown option
            format!("{}\n[[rules]]\naction = \"remove\"\noptions = [\"nope\"]\n", MINIMAL),
            // bad requirement
            format!("{}\n[[requires]]\nref = \"zlib\"\n", MINIMAL),
            // range with no representable upper bound
            format!("{}\n[[requires]]\nref = \"zlib/[^18446744073709551615]\"\n", MINIMAL),
            // unknown build system
            MINIMAL.replace("system = \"cmake\"", "system = \"scons\""),
            // option_map on unknown option
            format!("{}option_map = {{ with_foo = \"FOO\" }}\n", MINIMAL),
        ];
        for text in cases {
            assert!(
                matches!(Recipe::from_toml_str(&text, "1.0"), Err(LoadError::Invalid { .. })),
                "accepted:\n{}",
                text
            );
        }
    }

    #[test]
    fn unknown_table_is_parse_error() {
        let text = format!("{}\n[hooks]\npre = 1\n", MINIMAL);
        assert!(matches!(
            Recipe::from_toml_str(&text, "1.0"),
            Err(LoadError::Parse { .. })
        ));
    }
}
