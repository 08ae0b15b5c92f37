//! Package id: SHA-1 over the inputs that change the binary.
//!
//! The hashed text lists recipe identity, resolved settings, resolved options
//! and regular requirements, one `key=value` per line under section headers.
//! Tool requirements are not part of the id. Header libraries (and
//! `header_only=True` builds) keep only their identity, so every
//! configuration maps to one package.

use crate::recipe::Recipe;
use crate::requirements::{Requirement, RequirementKind};
use crate::resolver::ResolvedConfig;
use serde::{Deserialize, Serialize};
use sha1::{Digest, Sha1};
use std::collections::BTreeMap;
use std::fmt::Write as _;

/// File written into the package folder.
pub const CONANINFO_FILE: &str = "conaninfo.json";

/// Identity of one binary package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConanInfo {
    pub name: String,
    pub version: String,
    pub settings: BTreeMap<String, String>,
    pub options: BTreeMap<String, String>,
    pub requires: Vec<String>,
    pub package_id: String,
}

impl ConanInfo {
    pub fn new(recipe: &Recipe, config: &ResolvedConfig, requirements: &[Requirement]) -> Self {
        let mut info = Self {
            name: recipe.name.clone(),
            version: recipe.version.clone(),
            settings: BTreeMap::new(),
            options: BTreeMap::new(),
            requires: Vec::new(),
            package_id: String::new(),
        };
        if !(recipe.is_header_library() || config.is_header_only()) {
            info.settings = config.settings.to_pairs().into_iter().collect();
            info.options = config
                .options
                .iter()
                .map(|(k, v)| (k.clone(), v.to_string()))
                .collect();
            info.requires = requirements
                .iter()
                .filter(|r| r.kind == RequirementKind::Regular)
                .map(|r| r.reference.to_string())
                .collect();
        }
        info.package_id = info.compute_id();
        info
    }

    /// Canonical text the id is computed from.
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "[recipe]\nname={}\nversion={}", self.name, self.version);
        if !self.settings.is_empty() {
            out.push_str("[settings]\n");
            for (k, v) in &self.settings {
                let _ = writeln!(out, "{}={}", k, v);
            }
        }
        if !self.options.is_empty() {
            out.push_str("[options]\n");
            for (k, v) in &self.options {
                let _ = writeln!(out, "{}={}", k, v);
            }
        }
        if !self.requires.is_empty() {
            out.push_str("[requires]\n");
            for r in &self.requires {
                let _ = writeln!(out, "{}", r);
            }
        }
        out
    }

    fn compute_id(&self) -> String {
        let mut hasher = Sha1::new();
        hasher.update(self.to_text().as_bytes());
        format!("{:x}", hasher.finalize())
    }
}

/// Package id for a resolved configuration.
pub fn package_id(recipe: &Recipe, config: &ResolvedConfig, requirements: &[Requirement]) -> String {
    ConanInfo::new(recipe, config, requirements).package_id
}
