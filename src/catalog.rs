//! Recipe catalog: discovery of recipes on disk.
//!
//! A catalog root holds one directory per recipe:
//!
//! ```text
//! recipes/
//! ├── zlib/
//! │   ├── config.yml        # versions: {"1.3.1": {folder: all}}
//! │   └── all/
//! │       ├── recipe.toml
//! │       └── conandata.yml
//! └── libcurl/
//!     ├── config.yml
//!     └── all/ ...
//! ```
//!
//! A recipe directory without `config.yml` but with `recipe.toml` is also
//! accepted; its versions come from its conandata.yml.
//!
//! Roots are walked with jwalk. When two roots define the same recipe the
//! first root wins and a warning is recorded.

use crate::conandata::{self, ConanData};
use crate::error::CatalogError;
use crate::recipe::{Recipe, RECIPE_FILE};
use crate::requirements::VersionConstraint;
use crate::version;
use jwalk::WalkDir;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Per-recipe version index.
pub const CONFIG_FILE: &str = "config.yml";

#[derive(Debug, Deserialize)]
struct VersionEntry {
    folder: String,
}

/// One recipe in the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    pub name: String,
    /// Recipe directory (holding config.yml or recipe.toml).
    pub dir: PathBuf,
    /// version → recipe folder
    pub versions: BTreeMap<String, PathBuf>,
}

impl CatalogEntry {
    /// Versions, newest first.
    pub fn sorted_versions(&self) -> Vec<String> {
        let mut versions: Vec<String> = self.versions.keys().cloned().collect();
        version::sort_desc(&mut versions);
        versions
    }
}

/// Recipes discovered under one or more roots.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    roots: Vec<PathBuf>,
    entries: BTreeMap<String, CatalogEntry>,
    warnings: Vec<String>,
}

impl Catalog {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Scan catalog roots. Missing roots are skipped.
    pub fn scan(roots: &[PathBuf]) -> Result<Self, CatalogError> {
        log::info!("Catalog: scanning {} root(s)", roots.len());
        let mut catalog = Self {
            roots: roots.to_vec(),
            ..Default::default()
        };

        for root in roots {
            if !root.is_dir() {
                log::debug!("Catalog: skipping missing root {}", root.display());
                continue;
            }
            let mut configs = Vec::new();
            let mut recipes = Vec::new();
            for entry in WalkDir::new(root).sort(true).into_iter().filter_map(|e| e.ok()) {
                if !entry.file_type().is_file() {
                    continue;
                }
                let name = entry.file_name().to_string_lossy();
                if name == CONFIG_FILE {
                    configs.push(entry.path());
                } else if name == RECIPE_FILE {
                    recipes.push(entry.path());
                }
            }
            log::debug!(
                "Catalog: {} config.yml, {} recipe.toml under {}",
                configs.len(),
                recipes.len(),
                root.display()
            );

            for path in &configs {
                match Self::read_config(path) {
                    Ok(entry) => catalog.add(entry),
                    Err(e) => catalog.warnings.push(format!("{}", e)),
                }
            }
            // recipe.toml not covered by a config.yml
            for path in &recipes {
                let Some(dir) = path.parent() else { continue };
                let indexed = dir
                    .parent()
                    .is_some_and(|p| p.join(CONFIG_FILE).is_file())
                    || dir.join(CONFIG_FILE).is_file();
                if indexed {
                    continue;
                }
                match Self::standalone(dir) {
                    Ok(entry) => catalog.add(entry),
                    Err(e) => catalog.warnings.push(format!("{}", e)),
                }
            }
        }

        for w in &catalog.warnings {
            log::warn!("Catalog: {}", w);
        }
        log::info!("Catalog: found {} recipe(s)", catalog.entries.len());
        Ok(catalog)
    }

    fn read_config(path: &Path) -> Result<CatalogEntry, CatalogError> {
        let scan_err = |reason: String| CatalogError::Scan {
            path: path.to_path_buf(),
            reason,
        };
        let dir = path
            .parent()
            .ok_or_else(|| scan_err("config.yml has no parent".to_string()))?;
        let name = dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| scan_err("cannot name recipe".to_string()))?;
        let text = std::fs::read_to_string(path).map_err(|e| scan_err(e.to_string()))?;
        let root: serde_yaml::Value = serde_yaml::from_str(&text).map_err(|e| scan_err(e.to_string()))?;
        let versions = root
            .get("versions")
            .ok_or_else(|| scan_err("missing 'versions'".to_string()))?;
        let versions: BTreeMap<String, VersionEntry> =
            conandata::versioned(versions, "versions").map_err(scan_err)?;
        Ok(CatalogEntry {
            name,
            dir: dir.to_path_buf(),
            versions: versions
                .into_iter()
                .map(|(v, e)| (v, dir.join(e.folder)))
                .collect(),
        })
    }

    fn standalone(dir: &Path) -> Result<CatalogEntry, CatalogError> {
        let name = dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| CatalogError::Scan {
                path: dir.to_path_buf(),
                reason: "cannot name recipe".to_string(),
            })?;
        let data = ConanData::load_dir(dir)?;
        Ok(CatalogEntry {
            name,
            dir: dir.to_path_buf(),
            versions: data
                .versions()
                .into_iter()
                .map(|v| (v, dir.to_path_buf()))
                .collect(),
        })
    }

    /// Add an entry; an existing entry with the same name wins.
    pub fn add(&mut self, entry: CatalogEntry) {
        if let Some(existing) = self.entries.get(&entry.name) {
            self.warnings.push(format!(
                "duplicate recipe '{}': ignoring {} (using {})",
                entry.name,
                entry.dir.display(),
                existing.dir.display()
            ));
            return;
        }
        log::trace!("Catalog: {} ({} versions)", entry.name, entry.versions.len());
        self.entries.insert(entry.name.clone(), entry);
    }

    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        self.entries.keys().map(String::as_str).collect()
    }

    pub fn get(&self, name: &str) -> Option<&CatalogEntry> {
        self.entries.get(name)
    }

    pub fn entries(&self) -> impl Iterator<Item = &CatalogEntry> {
        self.entries.values()
    }

    /// Versions of a recipe, newest first.
    pub fn versions(&self, name: &str) -> Result<Vec<String>, CatalogError> {
        self.entry(name).map(CatalogEntry::sorted_versions)
    }

    fn entry(&self, name: &str) -> Result<&CatalogEntry, CatalogError> {
        self.entries.get(name).ok_or_else(|| CatalogError::NotFound {
            name: name.to_string(),
        })
    }

    /// Recipe names matching a `*`/`?` pattern (case-insensitive).
    pub fn find(&self, pattern: &str) -> Vec<&str> {
        let mut re = String::from("(?i)^");
        for c in pattern.chars() {
            match c {
                '*' => re.push_str(".*"),
                '?' => re.push('.'),
                other => re.push_str(&regex::escape(&other.to_string())),
            }
        }
        re.push('$');
        match regex::Regex::new(&re) {
            Ok(re) => self
                .entries
                .keys()
                .filter(|n| re.is_match(n))
                .map(String::as_str)
                .collect(),
            Err(_) => Vec::new(),
        }
    }

    /// Newest catalog version satisfying `constraint`.
    pub fn latest_matching(&self, name: &str, constraint: &VersionConstraint) -> Result<Option<String>, CatalogError> {
        Ok(self
            .versions(name)?
            .into_iter()
            .find(|v| constraint.matches(v)))
    }

    /// Recipe folder for one version.
    pub fn folder(&self, name: &str, version: &str) -> Result<&Path, CatalogError> {
        self.entry(name)?
            .versions
            .get(version)
            .map(PathBuf::as_path)
            .ok_or_else(|| CatalogError::VersionNotFound {
                name: name.to_string(),
                version: version.to_string(),
            })
    }

    /// Load a recipe; `None` picks the newest version.
    pub fn load(&self, name: &str, version: Option<&str>) -> Result<Recipe, CatalogError> {
        let version = match version {
            Some(v) => v.to_string(),
            None => self
                .versions(name)?
                .into_iter()
                .next()
                .ok_or_else(|| CatalogError::NotFound {
                    name: name.to_string(),
                })?,
        };
        let folder = self.folder(name, &version)?;
        Ok(Recipe::load(folder, Some(&version))?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::requirements::Reference;
    use std::fs;
    use tempfile::TempDir;

    fn recipe_dir(root: &Path, name: &str, versions: &[&str]) {
        let dir = root.join(name);
        let folder = dir.join("all");
        fs::create_dir_all(&folder).unwrap();
        let mut config = String::from("versions:\n");
        let mut data = String::from("sources:\n");
        for v in versions {
            config.push_str(&format!("  \"{}\":\n    folder: all\n", v));
            data.push_str(&format!("  \"{}\":\n    url: \"https://example.com/{}-{}.tar.gz\"\n    sha256: \"00\"\n", v, name, v));
        }
        fs::write(dir.join(CONFIG_FILE), config).unwrap();
        fs::write(folder.join("conandata.yml"), data).unwrap();
        fs::write(
            folder.join(RECIPE_FILE),
            format!("[recipe]\nname = \"{}\"\nlicense = \"MIT\"\n", name),
        )
        .unwrap();
    }

    fn catalog() -> (TempDir, Catalog) {
        let tmp = TempDir::new().unwrap();
        recipe_dir(tmp.path(), "zlib", &["1.2.13", "1.3.1", "1.3"]);
        recipe_dir(tmp.path(), "libcurl", &["8.4.0", "8.5.0"]);
        let catalog = Catalog::scan(&[tmp.path().to_path_buf()]).unwrap();
        (tmp, catalog)
    }

    #[test]
    fn scan_and_versions() {
        let (_tmp, catalog) = catalog();
        assert_eq!(catalog.names(), vec!["libcurl", "zlib"]);
        assert_eq!(catalog.versions("zlib").unwrap(), vec!["1.3.1", "1.3", "1.2.13"]);
        assert!(matches!(catalog.versions("openssl"), Err(CatalogError::NotFound { .. })));
        assert!(catalog.warnings().is_empty());
    }

    #[test]
    fn latest_matching_range() {
        let (_tmp, catalog) = catalog();
        let r = Reference::parse("zlib/[>=1.2 <1.3.1]").unwrap();
        assert_eq!(catalog.latest_matching("zlib", &r.constraint).unwrap().as_deref(), Some("1.3"));
        let r = Reference::parse("zlib/[>=2]").unwrap();
        assert_eq!(catalog.latest_matching("zlib", &r.constraint).unwrap(), None);
    }

    #[test]
    fn load_recipe() {
        let (_tmp, catalog) = catalog();
        let recipe = catalog.load("libcurl", None).unwrap();
        assert_eq!(recipe.reference(), "libcurl/8.5.0");
        let recipe = catalog.load("zlib", Some("1.2.13")).unwrap();
        assert_eq!(recipe.version, "1.2.13");
        assert!(matches!(
            catalog.load("zlib", Some("9.9")),
            Err(CatalogError::VersionNotFound { .. })
        ));
    }

    #[test]
    fn find_and_duplicates() {
        let (tmp, catalog) = catalog();
        assert_eq!(catalog.find("LIB*"), vec!["libcurl"]);
        assert_eq!(catalog.find("z?ib"), vec!["zlib"]);

        let other = TempDir::new().unwrap();
        recipe_dir(other.path(), "zlib", &["1.0"]);
        let both = Catalog::scan(&[tmp.path().to_path_buf(), other.path().to_path_buf()]).unwrap();
        assert_eq!(both.versions("zlib").unwrap().len(), 3);
        assert_eq!(both.warnings().len(), 1);
    }

    #[test]
    fn standalone_recipe_folder() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("fmt");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join(RECIPE_FILE), "[recipe]\nname = \"fmt\"\n").unwrap();
        fs::write(
            dir.join("conandata.yml"),
            "sources:\n  \"10.2.1\":\n    url: \"https://example.com/fmt.zip\"\n    sha256: \"00\"\n",
        )
        .unwrap();
        let catalog = Catalog::scan(&[tmp.path().to_path_buf()]).unwrap();
        assert_eq!(catalog.versions("fmt").unwrap(), vec!["10.2.1"]);
        assert_eq!(catalog.folder("fmt", "10.2.1").unwrap(), dir.as_path());
    }
}
