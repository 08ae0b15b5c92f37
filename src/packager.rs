//! Packager: copy build outputs into the package layout.
//!
//! By default the whole install prefix is copied and license files are
//! collected from the top of the source tree. Recipes add rules for what
//! the install step misses and prune what consumers should not see:
//!
//! ```toml
//! [package]
//! license_files = ["LICENSE.md"]
//! remove = ["lib/cmake", "lib/pkgconfig", "share"]
//!
//! [[package.copy]]
//! pattern = "*.h"
//! from = "source"
//! src = "include"
//! dst = "include"
//! ```
//!
//! After copying, the layout is checked against the package info: every
//! library must exist for the platform and linkage, header-only packages
//! need `include/`, and a license is required.

use crate::condition::Condition;
use crate::error::PackagingError;
use crate::package_id::{ConanInfo, CONANINFO_FILE};
use crate::package_info::{self, CppInfo, PACKAGE_INFO_FILE};
use crate::recipe::{PackageType, Recipe};
use crate::requirements::Requirement;
use crate::resolver::ResolvedConfig;
use crate::settings::{CompilerKind, Os};
use jwalk::WalkDir;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Where a copy rule reads from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Origin {
    Source,
    Build,
    #[default]
    Install,
}

/// One `[[package.copy]]` rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CopyRule {
    pub pattern: String,
    #[serde(default)]
    pub from: Origin,
    /// Sub-directory of the origin to search.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub src: Option<String>,
    /// Destination inside the package.
    #[serde(default)]
    pub dst: String,
    /// Keep the path relative to `src`; otherwise flatten to file names.
    #[serde(default = "default_true")]
    pub keep_path: bool,
    #[serde(default, skip_serializing_if = "Condition::is_always")]
    pub when: Condition,
}

fn default_true() -> bool {
    true
}

/// `[package]` table of a recipe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PackageSpec {
    pub copy: Vec<CopyRule>,
    /// License file patterns at the top of the source tree.
    pub license_files: Vec<String>,
    /// Paths (or patterns) deleted from the package after copying.
    pub remove: Vec<String>,
    /// Copy the whole install prefix.
    pub copy_install: bool,
}

impl Default for PackageSpec {
    fn default() -> Self {
        Self {
            copy: Vec::new(),
            license_files: Vec::new(),
            remove: Vec::new(),
            copy_install: true,
        }
    }
}

const DEFAULT_LICENSE_FILES: [&str; 2] = ["LICENSE*", "COPYING*"];

/// Compiled glob pattern.
///
/// `*` and `?` stay inside one path component, `**` crosses directories.
/// A pattern without `/` is matched against the file name only.
#[derive(Debug, Clone)]
pub struct Glob {
    re: Regex,
    name_only: bool,
}

impl Glob {
    pub fn new(pattern: &str) -> Result<Self, regex::Error> {
        let mut re = String::from("^");
        let mut chars = pattern.chars().peekable();
        while let Some(c) = chars.next() {
            match c {
                '*' if chars.peek() == Some(&'*') => {
                    chars.next();
                    if chars.peek() == Some(&'/') {
                        chars.next();
                        re.push_str("(?:.*/)?");
                    } else {
                        re.push_str(".*");
                    }
                }
                '*' => re.push_str("[^/]*"),
                '?' => re.push_str("[^/]"),
                other => re.push_str(&regex::escape(&other.to_string())),
            }
        }
        re.push('$');
        Ok(Self {
            re: Regex::new(&re)?,
            name_only: !pattern.contains('/'),
        })
    }

    /// Match a `/`-separated relative path.
    pub fn matches(&self, rel: &str) -> bool {
        if self.name_only {
            let name = rel.rsplit('/').next().unwrap_or(rel);
            self.re.is_match(name)
        } else {
            self.re.is_match(rel)
        }
    }
}

fn rel_string(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Files under `root`, relative, sorted.
fn files_under(root: &Path) -> Vec<PathBuf> {
    if !root.is_dir() {
        return Vec::new();
    }
    let mut files: Vec<PathBuf> = WalkDir::new(root)
        .sort(true)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file() || e.file_type().is_symlink())
        .filter_map(|e| e.path().strip_prefix(root).ok().map(Path::to_path_buf))
        .collect();
    files.sort();
    files
}

fn copy_file(from: &Path, to: &Path) -> Result<(), PackagingError> {
    let fail = |e: io::Error| PackagingError::Copy {
        path: from.to_path_buf(),
        reason: e.to_string(),
    };
    if let Some(parent) = to.parent() {
        fs::create_dir_all(parent).map_err(fail)?;
    }
    fs::copy(from, to).map_err(fail)?;
    Ok(())
}

/// Everything the packager needs.
pub struct PackageContext<'a> {
    pub recipe: &'a Recipe,
    pub config: &'a ResolvedConfig,
    pub requirements: &'a [Requirement],
    pub source_dir: &'a Path,
    pub build_dir: &'a Path,
    pub install_dir: &'a Path,
    pub package_dir: &'a Path,
}

impl PackageContext<'_> {
    fn origin(&self, origin: Origin) -> &Path {
        match origin {
            Origin::Source => self.source_dir,
            Origin::Build => self.build_dir,
            Origin::Install => self.install_dir,
        }
    }
}

/// A populated package folder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PackageLayout {
    pub root: PathBuf,
    /// Packaged files relative to `root`, sorted.
    pub files: Vec<PathBuf>,
    pub cpp_info: CppInfo,
    pub info: ConanInfo,
}

impl PackageLayout {
    pub fn package_id(&self) -> &str {
        &self.info.package_id
    }
}

/// Populate the package folder and check it.
///
/// On failure the folder is removed, so a package folder on disk is always
/// complete and carries its metadata files.
pub fn package(ctx: &PackageContext<'_>) -> Result<PackageLayout, PackagingError> {
    let recipe = ctx.recipe;
    let root = ctx.package_dir;
    if root.exists() {
        fs::remove_dir_all(root)?;
    }
    fs::create_dir_all(root)?;

    let (cpp_info, info) = match populate(ctx) {
        Ok(done) => done,
        Err(e) => {
            if let Err(rm) = fs::remove_dir_all(root) {
                log::warn!("{}: could not remove {}: {}", recipe.reference(), root.display(), rm);
            }
            return Err(e);
        }
    };

    let layout = PackageLayout {
        root: root.to_path_buf(),
        files: files_under(root),
        cpp_info,
        info,
    };
    log::info!(
        "{}: packaged {} file(s), package id {}",
        recipe.reference(),
        layout.files.len(),
        layout.package_id()
    );
    Ok(layout)
}

/// Copy, prune, check the contract and write the metadata files.
fn populate(ctx: &PackageContext<'_>) -> Result<(CppInfo, ConanInfo), PackagingError> {
    let recipe = ctx.recipe;
    let spec = &recipe.package;
    let root = ctx.package_dir;

    let mut copied = 0usize;
    if spec.copy_install {
        for rel in files_under(ctx.install_dir) {
            copy_file(&ctx.install_dir.join(&rel), &root.join(&rel))?;
            copied += 1;
        }
    }
    for rule in spec.copy.iter().filter(|r| ctx.config.eval(&r.when)) {
        copied += apply_copy_rule(ctx, rule)?;
    }
    copied += copy_licenses(ctx)?;
    log::debug!("{}: {} file(s) copied into {}", recipe.reference(), copied, root.display());

    remove_paths(root, &spec.remove)?;

    let cpp_info = package_info::compute(recipe, ctx.config, ctx.requirements);
    let info = ConanInfo::new(recipe, ctx.config, ctx.requirements);
    check_contract(ctx, &cpp_info)?;

    write_json(&root.join(PACKAGE_INFO_FILE), &cpp_info)?;
    write_json(&root.join(CONANINFO_FILE), &info)?;
    Ok((cpp_info, info))
}

fn bad_pattern(pattern: &str, e: regex::Error) -> PackagingError {
    PackagingError::Copy {
        path: PathBuf::from(pattern),
        reason: e.to_string(),
    }
}

fn apply_copy_rule(ctx: &PackageContext<'_>, rule: &CopyRule) -> Result<usize, PackagingError> {
    let glob = Glob::new(&rule.pattern).map_err(|e| bad_pattern(&rule.pattern, e))?;
    let base = match &rule.src {
        Some(src) => ctx.origin(rule.from).join(src),
        None => ctx.origin(rule.from).to_path_buf(),
    };
    let dst = ctx.package_dir.join(&rule.dst);
    let mut n = 0;
    for rel in files_under(&base) {
        if !glob.matches(&rel_string(&rel)) {
            continue;
        }
        let target = if rule.keep_path {
            dst.join(&rel)
        } else {
            match rel.file_name() {
                Some(name) => dst.join(name),
                None => continue,
            }
        };
        copy_file(&base.join(&rel), &target)?;
        n += 1;
    }
    log::trace!("copy rule '{}' from {:?}: {} file(s)", rule.pattern, rule.from, n);
    Ok(n)
}

fn copy_licenses(ctx: &PackageContext<'_>) -> Result<usize, PackagingError> {
    let patterns: Vec<String> = if ctx.recipe.package.license_files.is_empty() {
        DEFAULT_LICENSE_FILES.iter().map(|s| s.to_string()).collect()
    } else {
        ctx.recipe.package.license_files.clone()
    };
    let globs = patterns
        .iter()
        .map(|p| Glob::new(p).map_err(|e| bad_pattern(p, e)))
        .collect::<Result<Vec<_>, _>>()?;

    let licenses = ctx.package_dir.join("licenses");
    let mut n = 0;
    let Ok(entries) = fs::read_dir(ctx.source_dir) else {
        return Ok(0);
    };
    let mut files: Vec<PathBuf> = entries
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_file())
        .collect();
    files.sort();
    for file in files {
        let Some(name) = file.file_name() else { continue };
        if globs.iter().any(|g| g.matches(&name.to_string_lossy())) {
            copy_file(&file, &licenses.join(name))?;
            n += 1;
        }
    }
    Ok(n)
}

/// Delete entries matching `patterns` (plain relative paths or globs).
fn remove_paths(root: &Path, patterns: &[String]) -> Result<(), PackagingError> {
    for pattern in patterns {
        let plain = root.join(pattern);
        if !pattern.contains(['*', '?']) {
            if plain.is_dir() {
                fs::remove_dir_all(&plain)?;
            } else if plain.exists() {
                fs::remove_file(&plain)?;
            }
            continue;
        }
        let glob = Glob::new(pattern).map_err(|e| bad_pattern(pattern, e))?;
        for rel in files_under(root) {
            if glob.matches(&rel_string(&rel)) {
                fs::remove_file(root.join(&rel))?;
            }
        }
    }
    Ok(())
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), PackagingError> {
    let text = serde_json::to_string_pretty(value).map_err(io::Error::from)?;
    fs::write(path, text)?;
    Ok(())
}

/// File name patterns a library may have for this platform and linkage.
fn library_patterns(lib: &str, os: Os, compiler: Option<CompilerKind>, shared: bool) -> Vec<String> {
    let name = regex::escape(lib);
    match (os, shared) {
        (Os::Windows, _) if compiler == Some(CompilerKind::Msvc) => vec![format!("{}\\.lib", name)],
        (Os::Windows, false) => vec![format!("lib{}\\.a", name), format!("{}\\.lib", name)],
        (Os::Windows, true) => vec![format!("lib{}\\.dll\\.a", name), format!("{}\\.lib", name)],
        (o, true) if o.is_apple() => vec![format!("lib{}(\\.[0-9]+)*\\.dylib", name)],
        (_, true) => vec![format!("lib{}\\.so(\\.[0-9]+)*", name)],
        (_, false) => vec![format!("lib{}\\.a", name)],
    }
}

fn dir_has_match(dir: &Path, patterns: &[String]) -> Result<bool, PackagingError> {
    let res = patterns
        .iter()
        .map(|p| Regex::new(&format!("^{}$", p)).map_err(|e| bad_pattern(p, e)))
        .collect::<Result<Vec<_>, _>>()?;
    let Ok(entries) = fs::read_dir(dir) else {
        return Ok(false);
    };
    Ok(entries
        .filter_map(|e| e.ok())
        .any(|e| res.iter().any(|re| re.is_match(&e.file_name().to_string_lossy()))))
}

fn check_contract(ctx: &PackageContext<'_>, info: &CppInfo) -> Result<(), PackagingError> {
    let root = ctx.package_dir;
    let recipe = ctx.recipe;

    let licenses = root.join("licenses");
    let has_license = fs::read_dir(&licenses)
        .map(|mut entries| entries.next().is_some())
        .unwrap_or(false);
    if !has_license {
        return Err(PackagingError::MissingLicense {
            reference: recipe.reference(),
        });
    }

    let header_only = recipe.is_header_library() || ctx.config.is_header_only();
    if header_only && !root.join("include").is_dir() {
        return Err(PackagingError::MissingArtifact {
            artifact: "include/".to_string(),
            searched: root.display().to_string(),
        });
    }
    if recipe.package_type == PackageType::Application && !root.join("bin").is_dir() {
        return Err(PackagingError::MissingArtifact {
            artifact: "bin/".to_string(),
            searched: root.display().to_string(),
        });
    }

    let settings = &ctx.config.settings;
    let shared = ctx.config.is_shared();
    for lib in info.all_libs() {
        let patterns = library_patterns(lib, settings.os, settings.compiler_kind(), shared);
        let found = info
            .lib_dirs
            .iter()
            .map(|d| root.join(d))
            .map(|d| dir_has_match(&d, &patterns))
            .collect::<Result<Vec<_>, _>>()?
            .into_iter()
            .any(|hit| hit);
        if !found {
            return Err(PackagingError::MissingArtifact {
                artifact: lib.to_string(),
                searched: format!("{} in {}", patterns.join(" | "), info.lib_dirs.join(", ")),
            });
        }
        if shared && settings.os == Os::Windows {
            let dll = vec![format!("(lib)?{}[-0-9]*\\.dll", regex::escape(lib))];
            let bins = info.bin_dirs.iter().map(|d| root.join(d));
            let mut found_dll = false;
            for dir in bins {
                found_dll |= dir_has_match(&dir, &dll)?;
            }
            if !found_dll {
                return Err(PackagingError::MissingArtifact {
                    artifact: format!("{}.dll", lib),
                    searched: info.bin_dirs.join(", "),
                });
            }
        }
    }
    Ok(())
}
