//! Source step: fetch, verify, extract, patch.
//!
//! Archives come from conandata.yml. Downloads are cached under
//! `<cache_dir>/downloads/<sha256>/<file name>`, so a second build of the same
//! version never touches the network. URLs are tried in order; `file://` URLs
//! and plain paths (relative to the recipe folder) are copied.
//!
//! After extraction, patches run in conandata order with `patch -p1`, then
//! literal replacements from `[[source.replace]]`:
//!
//! ```toml
//! [[source.replace]]
//! file = "CMakeLists.txt"
//! search = "set(CMAKE_DEBUG_POSTFIX d)"
//! replace = ""
//! when = { os = ["Windows"] }
//! ```

use crate::adapters::{CommandRunner, Invocation};
use crate::condition::Condition;
use crate::conandata::SourceSpec;
use crate::config::Programs;
use crate::error::SourceError;
use crate::recipe::Recipe;
use crate::resolver::ResolvedConfig;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

/// `[source]` table of a recipe.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SourceTweaks {
    pub replace: Vec<ReplaceSpec>,
}

/// Literal text replacement in one source file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReplaceSpec {
    /// Path relative to the source root.
    pub file: String,
    pub search: String,
    pub replace: String,
    #[serde(default)]
    pub when: Condition,
    /// Fail when `search` is absent. Default true.
    #[serde(default = "default_strict")]
    pub strict: bool,
}

fn default_strict() -> bool {
    true
}

/// Archive formats understood by [`extract`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveKind {
    TarGz,
    TarXz,
    Tar,
    Zip,
}

impl ArchiveKind {
    /// Detect from the file name. `None` for unsupported formats.
    pub fn from_path(path: &Path) -> Option<Self> {
        let name = path.file_name()?.to_string_lossy().to_lowercase();
        if name.ends_with(".tar.gz") || name.ends_with(".tgz") {
            Some(ArchiveKind::TarGz)
        } else if name.ends_with(".tar.xz") || name.ends_with(".txz") {
            Some(ArchiveKind::TarXz)
        } else if name.ends_with(".tar") {
            Some(ArchiveKind::Tar)
        } else if name.ends_with(".zip") {
            Some(ArchiveKind::Zip)
        } else {
            None
        }
    }
}

/// Inputs of the source step.
pub struct SourceContext<'a> {
    pub recipe: &'a Recipe,
    pub config: &'a ResolvedConfig,
    pub cache_dir: &'a Path,
    pub programs: &'a Programs,
    pub runner: &'a dyn CommandRunner,
}

/// Populate `dest` with the patched sources of the recipe's version.
pub fn retrieve(ctx: &SourceContext<'_>, dest: &Path) -> Result<(), SourceError> {
    let recipe = ctx.recipe;
    let spec = recipe
        .conandata
        .source(&recipe.version)
        .ok_or_else(|| SourceError::UnknownVersion {
            recipe: recipe.name.clone(),
            version: recipe.version.clone(),
        })?;

    let archive = fetch(spec, recipe.folder.as_deref(), ctx.cache_dir)?;
    if dest.exists() {
        log::debug!("Source: clearing {}", dest.display());
        fs::remove_dir_all(dest)?;
    }
    extract(&archive, dest, spec.strip_root())?;
    apply_patches(ctx, dest)?;
    apply_replacements(recipe, ctx.config, dest)?;
    log::info!("{}: sources ready in {}", recipe.reference(), dest.display());
    Ok(())
}

/// Hex sha256 of a file.
pub fn sha256_file(path: &Path) -> io::Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buffer = [0u8; 64 * 1024];
    loop {
        let n = file.read(&mut buffer)?;
        if n == 0 {
            break;
        }
        hasher.update(&buffer[..n]);
    }
    Ok(format!("{:x}", hasher.finalize()))
}

fn file_name_of(url: &str) -> String {
    let trimmed = url.split(['?', '#']).next().unwrap_or(url);
    trimmed
        .rsplit(['/', '\\'])
        .find(|s| !s.is_empty())
        .unwrap_or("source")
        .to_string()
}

/// Download (or reuse) the archive for `spec`, verified against its sha256.
pub fn fetch(spec: &SourceSpec, recipe_dir: Option<&Path>, cache_dir: &Path) -> Result<PathBuf, SourceError> {
    let urls = spec.url.as_slice();
    let expected = spec.sha256.to_lowercase();
    let slot = cache_dir.join("downloads").join(&expected);

    let mut last_error = None;
    for url in urls {
        let cached = slot.join(file_name_of(url));
        if cached.exists() {
            if sha256_file(&cached)? == expected {
                log::debug!("Source: cache hit {}", cached.display());
                return Ok(cached);
            }
            log::warn!("Source: cached {} is corrupt, fetching again", cached.display());
            fs::remove_file(&cached)?;
        }

        fs::create_dir_all(&slot)?;
        let mut staged = tempfile::NamedTempFile::new_in(&slot)?;
        match download(url, recipe_dir, staged.as_file_mut()) {
            Ok(()) => {}
            Err(e) => {
                log::warn!("Source: {}", e);
                last_error = Some(e);
                continue;
            }
        }

        let actual = sha256_file(staged.path())?;
        if actual != expected {
            return Err(SourceError::ChecksumMismatch {
                path: cached,
                expected,
                actual,
            });
        }
        staged.persist(&cached).map_err(|e| SourceError::Io(e.error))?;
        log::info!("Source: downloaded {}", url);
        return Ok(cached);
    }

    Err(last_error.unwrap_or_else(|| SourceError::Download {
        url: String::new(),
        reason: "no urls listed".to_string(),
    }))
}

fn download(url: &str, recipe_dir: Option<&Path>, out: &mut File) -> Result<(), SourceError> {
    let fail = |reason: String| SourceError::Download {
        url: url.to_string(),
        reason,
    };

    if url.starts_with("http://") || url.starts_with("https://") {
        log::info!("Downloading {}", url);
        let response = ureq::get(url).call().map_err(|e| fail(e.to_string()))?;
        let mut reader = response.into_body().into_reader();
        io::copy(&mut reader, out).map_err(|e| fail(e.to_string()))?;
    } else {
        let path = match url.strip_prefix("file://") {
            Some(p) => PathBuf::from(p),
            None => {
                let p = PathBuf::from(url);
                match recipe_dir {
                    Some(dir) if p.is_relative() => dir.join(p),
                    _ => p,
                }
            }
        };
        let mut src = File::open(&path).map_err(|e| fail(format!("{}: {}", path.display(), e)))?;
        io::copy(&mut src, out).map_err(|e| fail(e.to_string()))?;
    }
    out.flush()?;
    Ok(())
}

/// Extract `archive` into `dest`, dropping the single top-level directory
/// when `strip_root` is set.
pub fn extract(archive: &Path, dest: &Path, strip_root: bool) -> Result<(), SourceError> {
    let kind = ArchiveKind::from_path(archive).ok_or_else(|| SourceError::UnsupportedArchive {
        path: archive.to_path_buf(),
    })?;
    let extract_err = |reason: String| SourceError::Extract {
        path: archive.to_path_buf(),
        reason,
    };

    let parent = dest.parent().unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(parent)?;
    let staging = tempfile::Builder::new().prefix(".extract-").tempdir_in(parent)?;

    log::debug!("Source: extracting {} ({:?})", archive.display(), kind);
    let file = File::open(archive)?;
    match kind {
        ArchiveKind::TarGz => unpack_tar(flate2::read::GzDecoder::new(file), staging.path()),
        ArchiveKind::TarXz => unpack_tar(xz2::read::XzDecoder::new(file), staging.path()),
        ArchiveKind::Tar => unpack_tar(file, staging.path()),
        ArchiveKind::Zip => unpack_zip(file, staging.path()),
    }
    .map_err(extract_err)?;

    let root = if strip_root {
        single_root(staging.path()).map_err(extract_err)?
    } else {
        staging.path().to_path_buf()
    };
    fs::rename(&root, dest)?;
    Ok(())
}

fn unpack_tar<R: Read>(reader: R, dest: &Path) -> Result<(), String> {
    let mut archive = tar::Archive::new(reader);
    archive.set_preserve_permissions(true);
    // unpack() refuses entries escaping dest
    archive.unpack(dest).map_err(|e| e.to_string())
}

fn unpack_zip(file: File, dest: &Path) -> Result<(), String> {
    let mut archive = zip::ZipArchive::new(file).map_err(|e| e.to_string())?;
    for i in 0..archive.len() {
        let mut entry = archive.by_index(i).map_err(|e| e.to_string())?;
        let rel = entry
            .enclosed_name()
            .ok_or_else(|| format!("unsafe path in archive: {}", entry.name()))?;
        let outpath = dest.join(rel);

        if entry.is_dir() {
            fs::create_dir_all(&outpath).map_err(|e| e.to_string())?;
            continue;
        }
        if let Some(p) = outpath.parent() {
            fs::create_dir_all(p).map_err(|e| e.to_string())?;
        }
        let mut outfile = File::create(&outpath).map_err(|e| e.to_string())?;
        io::copy(&mut entry, &mut outfile).map_err(|e| e.to_string())?;

        #[cfg(unix)]
        if let Some(mode) = entry.unix_mode() {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&outpath, fs::Permissions::from_mode(mode))
                .map_err(|e| e.to_string())?;
        }
    }
    Ok(())
}

/// The only child of `dir`, which must be a directory.
fn single_root(dir: &Path) -> Result<PathBuf, String> {
    let entries: Vec<PathBuf> = fs::read_dir(dir)
        .map_err(|e| e.to_string())?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .collect();
    match entries.as_slice() {
        [only] if only.is_dir() => Ok(only.clone()),
        _ => Err(format!(
            "strip_root needs exactly one top-level directory, found {} entries",
            entries.len()
        )),
    }
}

/// Apply conandata patches for the recipe's version, in order.
pub fn apply_patches(ctx: &SourceContext<'_>, source_dir: &Path) -> Result<usize, SourceError> {
    let recipe = ctx.recipe;
    let patches = recipe.conandata.patches(&recipe.version);
    let recipe_dir = recipe.folder.as_deref().unwrap_or_else(|| Path::new("."));

    for spec in patches {
        let patch = crate::adapters::abs_path(&recipe_dir.join(&spec.patch_file));
        if !patch.is_file() {
            return Err(SourceError::PatchMissing { path: patch });
        }
        let target = match &spec.base_path {
            Some(base) => source_dir.join(base),
            None => source_dir.to_path_buf(),
        };
        if let Some(description) = &spec.patch_description {
            log::info!("{}: patch {}: {}", recipe.reference(), spec.patch_file, description);
        }
        let inv = Invocation::new(
            ctx.programs.patch.as_str(),
            [
                "-p1".to_string(),
                "--forward".to_string(),
                "-i".to_string(),
                patch.display().to_string(),
            ],
            crate::adapters::abs_path(&target),
        );
        ctx.runner
            .run(&inv, &Default::default())
            .map_err(|source| SourceError::PatchFailed {
                patch: spec.patch_file.clone(),
                source,
            })?;
    }
    Ok(patches.len())
}

/// Apply `[[source.replace]]` entries whose condition holds.
pub fn apply_replacements(
    recipe: &Recipe,
    config: &ResolvedConfig,
    source_dir: &Path,
) -> Result<usize, SourceError> {
    let mut applied = 0;
    for spec in &recipe.source.replace {
        if !config.eval(&spec.when) {
            continue;
        }
        let file = source_dir.join(&spec.file);
        let text = fs::read_to_string(&file)?;
        if !text.contains(&spec.search) {
            if spec.strict {
                return Err(SourceError::ReplaceFailed {
                    file,
                    search: spec.search.clone(),
                });
            }
            log::warn!("{}: '{}' not found in {}", recipe.reference(), spec.search, file.display());
            continue;
        }
        fs::write(&file, text.replace(&spec.search, &spec.replace))?;
        applied += 1;
    }
    Ok(applied)
}
