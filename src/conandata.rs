//! conandata.yml: source archives and patches per version.
//!
//! ```yaml
//! sources:
//!   "1.3.1":
//!     url:
//!       - "https://zlib.net/fossils/zlib-1.3.1.tar.gz"
//!       - "https://github.com/madler/zlib/releases/download/v1.3.1/zlib-1.3.1.tar.gz"
//!     sha256: "9a93b2b7dfdac77ceba5a558a580e74667dd6fede4585b91eefb60f03b72df23"
//! patches:
//!   "1.3.1":
//!     - patch_file: "patches/1.3.1-0001-fix-cmake.patch"
//!       patch_description: "separate static/shared builds"
//!       patch_type: "conan"
//! ```
//!
//! Version keys may be written unquoted; YAML numbers are converted back to
//! text. Floats lose trailing zeros (`1.10` reads as `1.1`), so quote those.

use crate::error::LoadError;
use crate::version;
use serde::{Deserialize, Serialize};
use serde_yaml::Value;
use std::collections::BTreeMap;
use std::path::Path;

/// File name next to recipe.toml.
pub const CONANDATA_FILE: &str = "conandata.yml";

/// One URL or a list of mirrors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Urls {
    One(String),
    Many(Vec<String>),
}

impl Urls {
    pub fn as_slice(&self) -> &[String] {
        match self {
            Urls::One(url) => std::slice::from_ref(url),
            Urls::Many(urls) => urls,
        }
    }
}

/// Source archive for one version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceSpec {
    pub url: Urls,
    pub sha256: String,
    /// Drop the single top-level directory of the archive. Defaults to true.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strip_root: Option<bool>,
}

impl SourceSpec {
    pub fn strip_root(&self) -> bool {
        self.strip_root.unwrap_or(true)
    }
}

/// One patch entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatchSpec {
    pub patch_file: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patch_description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patch_type: Option<String>,
    /// Directory inside the source tree the patch applies to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patch_source: Option<String>,
}

/// Parsed conandata.yml.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConanData {
    pub sources: BTreeMap<String, SourceSpec>,
    pub patches: BTreeMap<String, Vec<PatchSpec>>,
}

impl ConanData {
    /// Load conandata.yml from a recipe folder. Missing file → empty data.
    pub fn load_dir(dir: &Path) -> Result<Self, LoadError> {
        let path = dir.join(CONANDATA_FILE);
        if !path.exists() {
            log::debug!("conandata: {} not present", path.display());
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(&path).map_err(|e| LoadError::Read {
            path: path.clone(),
            reason: e.to_string(),
        })?;
        Self::parse(&text).map_err(|reason| LoadError::Parse { path, reason })
    }

    /// Parse conandata YAML text.
    pub fn parse(text: &str) -> Result<Self, String> {
        let root: Value = serde_yaml::from_str(text).map_err(|e| e.to_string())?;
        if root.is_null() {
            return Ok(Self::default());
        }
        let root = root
            .as_mapping()
            .ok_or_else(|| "top level must be a mapping".to_string())?;

        let mut data = Self::default();
        for (key, value) in root {
            match key.as_str() {
                Some("sources") => data.sources = versioned(value, "sources")?,
                Some("patches") => data.patches = versioned(value, "patches")?,
                // Recipes may keep their own data here
                _ => log::trace!("conandata: ignoring key {:?}", key),
            }
        }
        Ok(data)
    }

    pub fn source(&self, version: &str) -> Option<&SourceSpec> {
        self.sources.get(version)
    }

    pub fn patches(&self, version: &str) -> &[PatchSpec] {
        self.patches.get(version).map(Vec::as_slice).unwrap_or_default()
    }

    /// Versions with sources, newest first.
    pub fn versions(&self) -> Vec<String> {
        let mut versions: Vec<String> = self.sources.keys().cloned().collect();
        version::sort_desc(&mut versions);
        versions
    }
}

/// Deserialize a `version -> T` mapping with scalar keys.
pub(crate) fn versioned<T>(value: &Value, what: &str) -> Result<BTreeMap<String, T>, String>
where
    T: serde::de::DeserializeOwned,
{
    let mut out = BTreeMap::new();
    if value.is_null() {
        return Ok(out);
    }
    let map = value
        .as_mapping()
        .ok_or_else(|| format!("'{}' must be a mapping of versions", what))?;
    for (key, entry) in map {
        let version = key_to_string(key).ok_or_else(|| format!("bad version key in '{}'", what))?;
        let parsed: T = serde_yaml::from_value(entry.clone())
            .map_err(|e| format!("{}[{}]: {}", what, version, e))?;
        out.insert(version, parsed);
    }
    Ok(out)
}

pub(crate) fn key_to_string(key: &Value) -> Option<String> {
    match key {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
