//! Consumption metadata (`package_info.json`).
//!
//! ```toml
//! [package_info]
//! libs = ["spdlog"]
//! defines = ["SPDLOG_COMPILED_LIB"]
//! debug_postfix = "d"
//! cmake_target_name = "spdlog::spdlog"
//!
//! [[package_info.when]]
//! when = { os = ["Linux", "FreeBSD"] }
//! system_libs = ["pthread"]
//!
//! [package_info.components.curl]
//! libs = ["curl"]
//! requires = ["openssl::ssl"]
//! ```

use crate::condition::Condition;
use crate::recipe::{PackageType, Recipe};
use crate::requirements::{Requirement, RequirementKind};
use crate::resolver::ResolvedConfig;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// File written into the package folder.
pub const PACKAGE_INFO_FILE: &str = "package_info.json";

/// `[package_info]` table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PackageInfoSpec {
    pub libs: Vec<String>,
    pub system_libs: Vec<String>,
    pub defines: Vec<String>,
    pub frameworks: Vec<String>,
    /// Include dirs relative to the package. Default `["include"]`.
    pub include_dirs: Option<Vec<String>>,
    /// Appended to library names in Debug builds.
    pub debug_postfix: Option<String>,
    pub cmake_file_name: Option<String>,
    pub cmake_target_name: Option<String>,
    pub pkg_config_name: Option<String>,
    pub components: BTreeMap<String, ComponentSpec>,
    pub when: Vec<ConditionalInfo>,
}

/// One component of a multi-library package.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ComponentSpec {
    pub libs: Vec<String>,
    /// Sibling component names or `dep::component`.
    pub requires: Vec<String>,
    pub system_libs: Vec<String>,
    pub defines: Vec<String>,
    pub frameworks: Vec<String>,
    pub cmake_target_name: Option<String>,
    pub pkg_config_name: Option<String>,
}

/// Additions applied when a condition holds, to the root or one component.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConditionalInfo {
    pub when: Condition,
    pub component: Option<String>,
    pub libs: Vec<String>,
    pub system_libs: Vec<String>,
    pub defines: Vec<String>,
    pub frameworks: Vec<String>,
    pub requires: Vec<String>,
}

/// Resolved component metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Component {
    pub libs: Vec<String>,
    pub requires: Vec<String>,
    pub system_libs: Vec<String>,
    pub defines: Vec<String>,
    pub frameworks: Vec<String>,
    pub cmake_target_name: String,
    pub pkg_config_name: String,
}

/// What consumers need to use a package.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CppInfo {
    pub name: String,
    pub version: String,
    pub libs: Vec<String>,
    pub system_libs: Vec<String>,
    pub defines: Vec<String>,
    pub frameworks: Vec<String>,
    pub include_dirs: Vec<String>,
    pub lib_dirs: Vec<String>,
    pub bin_dirs: Vec<String>,
    pub cmake_file_name: String,
    pub cmake_target_name: String,
    pub pkg_config_name: String,
    /// Names of regular (non-tool) requirements.
    pub requires: Vec<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub components: BTreeMap<String, Component>,
}

impl CppInfo {
    /// Root libs followed by component libs, without duplicates.
    pub fn all_libs(&self) -> Vec<&str> {
        let mut libs: Vec<&str> = Vec::new();
        let component_libs = self.components.values().flat_map(|c| c.libs.iter());
        for lib in self.libs.iter().chain(component_libs) {
            if !libs.contains(&lib.as_str()) {
                libs.push(lib);
            }
        }
        libs
    }
}

fn push_unique(dst: &mut Vec<String>, items: &[String]) {
    for item in items {
        if !dst.contains(item) {
            dst.push(item.clone());
        }
    }
}

fn with_postfix(libs: &[String], postfix: Option<&str>) -> Vec<String> {
    match postfix {
        Some(p) => libs.iter().map(|l| format!("{}{}", l, p)).collect(),
        None => libs.to_vec(),
    }
}

/// Compute the package info for a resolved configuration.
pub fn compute(recipe: &Recipe, config: &ResolvedConfig, requirements: &[Requirement]) -> CppInfo {
    let spec = &recipe.package_info;
    let header_only = recipe.is_header_library() || config.is_header_only();
    let postfix = spec
        .debug_postfix
        .as_deref()
        .filter(|_| config.settings.is_debug());

    let mut info = CppInfo {
        name: recipe.name.clone(),
        version: recipe.version.clone(),
        libs: spec.libs.clone(),
        system_libs: spec.system_libs.clone(),
        defines: spec.defines.clone(),
        frameworks: spec.frameworks.clone(),
        include_dirs: spec
            .include_dirs
            .clone()
            .unwrap_or_else(|| vec!["include".to_string()]),
        cmake_file_name: spec.cmake_file_name.clone().unwrap_or_else(|| recipe.name.clone()),
        cmake_target_name: spec
            .cmake_target_name
            .clone()
            .unwrap_or_else(|| format!("{0}::{0}", recipe.name)),
        pkg_config_name: spec.pkg_config_name.clone().unwrap_or_else(|| recipe.name.clone()),
        requires: requirements
            .iter()
            .filter(|r| r.kind == RequirementKind::Regular)
            .map(|r| r.name().to_string())
            .collect(),
        ..Default::default()
    };

    for (name, c) in &spec.components {
        let component = Component {
            libs: c.libs.clone(),
            requires: c.requires.clone(),
            system_libs: c.system_libs.clone(),
            defines: c.defines.clone(),
            frameworks: c.frameworks.clone(),
            cmake_target_name: c
                .cmake_target_name
                .clone()
                .unwrap_or_else(|| format!("{}::{}", info.cmake_file_name, name)),
            pkg_config_name: c
                .pkg_config_name
                .clone()
                .unwrap_or_else(|| format!("{}-{}", info.pkg_config_name, name)),
        };
        info.components.insert(name.clone(), component);
    }

    for extra in spec.when.iter().filter(|e| config.eval(&e.when)) {
        log::trace!("{}: package_info addition applies: {:?}", config.reference(), extra.when);
        match extra.component.as_ref().and_then(|n| info.components.get_mut(n)) {
            Some(c) => {
                push_unique(&mut c.libs, &extra.libs);
                push_unique(&mut c.system_libs, &extra.system_libs);
                push_unique(&mut c.defines, &extra.defines);
                push_unique(&mut c.frameworks, &extra.frameworks);
                push_unique(&mut c.requires, &extra.requires);
            }
            None => {
                push_unique(&mut info.libs, &extra.libs);
                push_unique(&mut info.system_libs, &extra.system_libs);
                push_unique(&mut info.defines, &extra.defines);
                push_unique(&mut info.frameworks, &extra.frameworks);
            }
        }
    }

    if header_only {
        info.libs.clear();
        for c in info.components.values_mut() {
            c.libs.clear();
        }
    } else {
        info.libs = with_postfix(&info.libs, postfix);
        for c in info.components.values_mut() {
            c.libs = with_postfix(&c.libs, postfix);
        }
        info.lib_dirs = vec!["lib".to_string()];
        info.bin_dirs = vec!["bin".to_string()];
    }
    if recipe.package_type == PackageType::Application {
        info.include_dirs.clear();
        info.lib_dirs.clear();
        info.bin_dirs = vec!["bin".to_string()];
    }
    info
}
