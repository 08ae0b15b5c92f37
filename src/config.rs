//! Tool configuration (`config.toml`).
//!
//! Looked up at `$RECIPE_CONFIG`, else `<config_dir>/recipe/config.toml`
//! (`~/.config/recipe/config.toml` on Linux). A missing file means defaults.
//!
//! ```toml
//! cache_dir = "/var/cache/recipe"
//! recipes_path = ["/src/recipes"]
//! default_profile = "~/.config/recipe/profiles/linux-gcc11.toml"
//! jobs = 8
//!
//! [programs]
//! cmake = "/opt/cmake-3.28/bin/cmake"
//! ```
//!
//! Environment overrides: `RECIPE_CACHE_DIR`, `RECIPE_JOBS`, `RECIPE_PATH`
//! (path-list of catalog roots, prepended to `recipes_path`).
//!
//! The loaded [`Config`] is a plain value handed to whoever needs it; there
//! is no process-wide instance.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const CONFIG_ENV: &str = "RECIPE_CONFIG";
pub const CACHE_DIR_ENV: &str = "RECIPE_CACHE_DIR";
pub const JOBS_ENV: &str = "RECIPE_JOBS";
pub const RECIPE_PATH_ENV: &str = "RECIPE_PATH";

/// External programs used by adapters and the source step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Programs {
    pub cmake: String,
    pub meson: String,
    pub make: String,
    pub autoreconf: String,
    pub msbuild: String,
    pub patch: String,
}

impl Default for Programs {
    fn default() -> Self {
        Self {
            cmake: "cmake".to_string(),
            meson: "meson".to_string(),
            make: "make".to_string(),
            autoreconf: "autoreconf".to_string(),
            msbuild: "msbuild".to_string(),
            patch: "patch".to_string(),
        }
    }
}

/// Tool configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Download cache root. Default: `<cache_dir>/recipe`.
    pub cache_dir: Option<PathBuf>,
    /// Catalog roots scanned for recipes.
    pub recipes_path: Vec<PathBuf>,
    /// Profile applied when `--profile` is not given.
    pub default_profile: Option<PathBuf>,
    /// Parallel jobs passed to build tools. Default: available parallelism.
    pub jobs: Option<usize>,
    pub programs: Programs,
}

impl Config {
    /// Default config file location.
    pub fn default_path() -> Option<PathBuf> {
        if let Some(p) = std::env::var_os(CONFIG_ENV) {
            return Some(PathBuf::from(p));
        }
        dirs::config_dir().map(|d| d.join("recipe").join("config.toml"))
    }

    /// Load from `path` (or the default location) and apply env overrides.
    ///
    /// An explicitly given path must exist; the default one may be missing.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(p) => Self::from_file(p)?,
            None => match Self::default_path() {
                Some(p) if p.exists() => Self::from_file(&p)?,
                _ => {
                    log::debug!("Config: no config file, using defaults");
                    Self::default()
                }
            },
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Parse one config file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        let mut config: Config = toml::from_str(&text).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        config.expand_home();
        log::debug!("Config: loaded {}", path.display());
        Ok(config)
    }

    /// Apply environment overrides through `lookup`.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(dir) = lookup(CACHE_DIR_ENV).filter(|s| !s.is_empty()) {
            self.cache_dir = Some(PathBuf::from(dir));
        }
        if let Some(jobs) = lookup(JOBS_ENV).filter(|s| !s.is_empty()) {
            let n: usize = jobs.trim().parse().map_err(|_| ConfigError::Invalid {
                key: JOBS_ENV.to_string(),
                reason: format!("'{}' is not a number", jobs),
            })?;
            self.jobs = Some(n);
        }
        if let Some(paths) = lookup(RECIPE_PATH_ENV).filter(|s| !s.is_empty()) {
            let mut roots: Vec<PathBuf> = std::env::split_paths(&paths).collect();
            roots.append(&mut self.recipes_path);
            self.recipes_path = roots;
        }
        Ok(())
    }

    /// Effective cache dir.
    pub fn cache_dir(&self) -> PathBuf {
        self.cache_dir.clone().unwrap_or_else(|| {
            dirs::cache_dir()
                .unwrap_or_else(std::env::temp_dir)
                .join("recipe")
        })
    }

    /// Effective job count, at least 1.
    pub fn jobs(&self) -> usize {
        self.jobs
            .unwrap_or_else(|| {
                std::thread::available_parallelism()
                    .map(|n| n.get())
                    .unwrap_or(1)
            })
            .max(1)
    }

    fn expand_home(&mut self) {
        self.cache_dir = self.cache_dir.take().map(|p| expand_tilde(&p));
        self.default_profile = self.default_profile.take().map(|p| expand_tilde(&p));
        for p in &mut self.recipes_path {
            *p = expand_tilde(p);
        }
    }
}

/// Expand a leading `~` to the home directory.
pub fn expand_tilde(path: &Path) -> PathBuf {
    match path.strip_prefix("~") {
        Ok(rest) => dirs::home_dir()
            .map(|h| h.join(rest))
            .unwrap_or_else(|| path.to_path_buf()),
        Err(_) => path.to_path_buf(),
    }
}
