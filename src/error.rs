//! Error types for the recipe library.
//!
//! This module defines all error types used throughout the crate.
//! Uses `thiserror` for ergonomic error handling and automatic `Display` impl.
//!
//! # Error Hierarchy
//!
//! - [`RecipeError`] - Top-level error enum, wraps all other errors
//! - [`ConfigurationError`] - Invalid option/settings combination (fail fast)
//! - [`BuildError`] - External build tool failures
//! - [`PackagingError`] - Build succeeded but the package contract is violated
//! - [`SourceError`] - Download, checksum, extraction and patch errors
//! - [`RequirementError`] - Malformed or conflicting requirement declarations
//! - [`LifecycleError`] - Hooks called out of order
//! - [`LoadError`] - recipe.toml / conandata.yml loading
//! - [`SettingsError`] - Bad settings assignments
//! - [`CatalogError`] - Recipe catalog scanning and lookup
//! - [`ConfigError`] - config.toml and profile loading
//!
//! # Usage
//!
//! Every error is terminal for the recipe being processed. Errors raised by
//! lifecycle hooks are wrapped in [`RecipeError::Hook`] so the message always
//! names the recipe reference and the failing configuration.

use crate::lifecycle::Stage;
use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for the recipe library.
#[derive(Error, Debug)]
pub enum RecipeError {
    /// Error from recipe loading
    #[error("load error: {0}")]
    Load(#[from] LoadError),

    /// Configuration rejected by the resolver
    #[error("invalid configuration: {0}")]
    Configuration(#[from] ConfigurationError),

    /// Error from requirement declaration
    #[error("requirement error: {0}")]
    Requirement(#[from] RequirementError),

    /// Error from the source step
    #[error("source error: {0}")]
    Source(#[from] SourceError),

    /// Error from the external build tool
    #[error("build error: {0}")]
    Build(#[from] BuildError),

    /// Error from the packager
    #[error("packaging error: {0}")]
    Packaging(#[from] PackagingError),

    /// Hook called in the wrong stage
    #[error("lifecycle error: {0}")]
    Lifecycle(#[from] LifecycleError),

    /// Error from settings parsing
    #[error("settings error: {0}")]
    Settings(#[from] SettingsError),

    /// Error from the recipe catalog
    #[error("catalog error: {0}")]
    Catalog(#[from] CatalogError),

    /// Error from config/profile loading
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// A lifecycle hook failed for a specific recipe and configuration.
    #[error("{reference} [{configuration}]: {hook}() failed: {source}")]
    Hook {
        /// Recipe reference (`name/version`)
        reference: String,
        /// Settings + options summary
        configuration: String,
        /// Hook name
        hook: &'static str,
        /// Underlying error
        source: Box<RecipeError>,
    },

    /// IO error (file operations)
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl RecipeError {
    /// Innermost error, looking through [`RecipeError::Hook`] wrappers.
    pub fn root(&self) -> &RecipeError {
        match self {
            RecipeError::Hook { source, .. } => source.root(),
            other => other,
        }
    }

    /// True if this is a configuration-invalid error (raised before any build step).
    pub fn is_configuration(&self) -> bool {
        matches!(self.root(), RecipeError::Configuration(_))
    }
}

/// Configuration-invalid errors from the option/settings resolver.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    /// The combination of settings and options is not supported by the recipe.
    #[error("{reference} does not support this configuration ({configuration}): {reason}")]
    Invalid {
        /// Recipe reference
        reference: String,
        /// Settings + options summary
        configuration: String,
        /// Why the configuration is rejected
        reason: String,
    },

    /// User override names an option the recipe does not declare.
    #[error("{reference}: unknown option '{option}'")]
    UnknownOption {
        /// Recipe reference
        reference: String,
        /// Option name
        option: String,
    },

    /// User override value is outside the option domain.
    #[error("{reference}: invalid value '{value}' for option '{option}', allowed: {allowed}")]
    InvalidOptionValue {
        /// Recipe reference
        reference: String,
        /// Option name
        option: String,
        /// Rejected value
        value: String,
        /// Domain description
        allowed: String,
    },
}

/// Errors from the external build tool.
#[derive(Error, Debug)]
pub enum BuildError {
    /// Build configuration error
    #[error("build config error: {0}")]
    Config(String),

    /// Build command failed
    #[error("build command failed: {command} (exit {code:?})")]
    CommandFailed {
        /// Command string
        command: String,
        /// Exit code (if available)
        code: Option<i32>,
    },

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors from the packager.
#[derive(Error, Debug)]
pub enum PackagingError {
    /// An artifact promised by the package info was not produced.
    #[error("expected artifact '{artifact}' not found (searched: {searched})")]
    MissingArtifact {
        /// Artifact description (library name or directory)
        artifact: String,
        /// Locations/file names that were checked
        searched: String,
    },

    /// No license file ended up in licenses/
    #[error("no license file packaged for {reference}")]
    MissingLicense {
        /// Recipe reference
        reference: String,
    },

    /// Copy failed
    #[error("copy failed for {}: {reason}", path.display())]
    Copy {
        /// Source path
        path: PathBuf,
        /// Error reason
        reason: String,
    },

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors from the source step.
#[derive(Error, Debug)]
pub enum SourceError {
    /// conandata has no entry for this version
    #[error("no sources for {recipe}/{version} in conandata")]
    UnknownVersion {
        /// Recipe name
        recipe: String,
        /// Requested version
        version: String,
    },

    /// Every mirror failed
    #[error("download failed for {url}: {reason}")]
    Download {
        /// URL
        url: String,
        /// Failure reason
        reason: String,
    },

    /// Checksum verification failed
    #[error("sha256 mismatch for {}: expected {expected}, got {actual}", path.display())]
    ChecksumMismatch {
        /// Downloaded file
        path: PathBuf,
        /// Expected hash
        expected: String,
        /// Actual hash
        actual: String,
    },

    /// Archive format not handled
    #[error("unsupported archive: {}", path.display())]
    UnsupportedArchive {
        /// Archive path
        path: PathBuf,
    },

    /// Archive extraction failed
    #[error("extract failed for {}: {reason}", path.display())]
    Extract {
        /// Archive path
        path: PathBuf,
        /// Failure reason
        reason: String,
    },

    /// Patch file listed in conandata is missing
    #[error("patch file not found: {}", path.display())]
    PatchMissing {
        /// Expected patch path
        path: PathBuf,
    },

    /// Patch tool failed
    #[error("patch {patch} failed: {source}")]
    PatchFailed {
        /// Patch file name
        patch: String,
        /// Tool error
        source: BuildError,
    },

    /// replace_in_file did not find its pattern
    #[error("pattern '{search}' not found in {}", file.display())]
    ReplaceFailed {
        /// File
        file: PathBuf,
        /// Search string
        search: String,
    },

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors from requirement declarations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RequirementError {
    /// Reference is not `name/version` or `name/[range]`
    #[error("invalid reference '{reference}': {reason}")]
    InvalidReference {
        /// The invalid reference
        reference: String,
        /// Reason
        reason: String,
    },

    /// Version range failed to parse
    #[error("invalid version range '{expr}': {reason}")]
    InvalidRange {
        /// Range expression
        expr: String,
        /// Reason
        reason: String,
    },

    /// Same dependency declared twice with incompatible constraints
    #[error("{recipe}: conflicting requirements for {name}: '{first}' vs '{second}'")]
    Conflict {
        /// Declaring recipe
        recipe: String,
        /// Dependency name
        name: String,
        /// First constraint
        first: String,
        /// Second constraint
        second: String,
    },
}

/// Hooks invoked out of order.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LifecycleError {
    /// Hook requires another stage
    #[error("{hook}() requires stage {expected:?}, recipe is in {actual:?}")]
    OutOfOrder {
        /// Hook name
        hook: &'static str,
        /// Stage the hook needs
        expected: Stage,
        /// Current stage
        actual: Stage,
    },

    /// An earlier hook failed
    #[error("{hook}() called after a previous hook failed")]
    AfterFailure {
        /// Hook name
        hook: &'static str,
    },
}

/// Errors from recipe.toml / conandata.yml loading.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LoadError {
    /// File not found
    #[error("file not found: {}", path.display())]
    NotFound {
        /// Missing path
        path: PathBuf,
    },

    /// Failed to read file
    #[error("read error for {}: {reason}", path.display())]
    Read {
        /// Path
        path: PathBuf,
        /// Reason
        reason: String,
    },

    /// TOML/YAML parse error
    #[error("parse error in {}: {reason}", path.display())]
    Parse {
        /// Path
        path: PathBuf,
        /// Reason
        reason: String,
    },

    /// Recipe parsed but is inconsistent (bad defaults, unknown option names, ...)
    #[error("invalid recipe {}: {reason}", path.display())]
    Invalid {
        /// Path
        path: PathBuf,
        /// Reason
        reason: String,
    },

    /// Version not listed in conandata
    #[error("{recipe}: unknown version '{version}' (available: {available})")]
    UnknownVersion {
        /// Recipe name
        recipe: String,
        /// Requested version
        version: String,
        /// Known versions
        available: String,
    },

    /// No version requested and conandata lists none
    #[error("{recipe}: no version given and conandata lists no sources")]
    NoVersions {
        /// Recipe name
        recipe: String,
    },
}

/// Errors from settings assignments.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SettingsError {
    /// Not a known settings key
    #[error("unknown setting '{0}'")]
    UnknownKey(String),

    /// Value not valid for the key
    #[error("invalid value '{value}' for setting '{key}'")]
    InvalidValue {
        /// Setting key
        key: String,
        /// Value
        value: String,
    },

    /// compiler.* subsetting without a compiler
    #[error("'{key}' set but no compiler is configured")]
    MissingCompiler {
        /// Setting key
        key: String,
    },

    /// Not `key=value`
    #[error("expected key=value, got '{0}'")]
    BadAssignment(String),
}

/// Errors from the recipe catalog.
#[derive(Error, Debug)]
pub enum CatalogError {
    /// No such recipe
    #[error("recipe not found: {name}")]
    NotFound {
        /// Recipe name
        name: String,
    },

    /// Version not in catalog
    #[error("version not found: {name}/{version}")]
    VersionNotFound {
        /// Recipe name
        name: String,
        /// Version
        version: String,
    },

    /// Scan failed
    #[error("scan failed for {}: {reason}", path.display())]
    Scan {
        /// Directory
        path: PathBuf,
        /// Reason
        reason: String,
    },

    /// Recipe load failed
    #[error("{0}")]
    Load(#[from] LoadError),
}

/// Errors from config.toml and profile loading.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Read failure
    #[error("read error for {}: {reason}", path.display())]
    Read {
        /// Path
        path: PathBuf,
        /// Reason
        reason: String,
    },

    /// Parse failure
    #[error("parse error in {}: {reason}", path.display())]
    Parse {
        /// Path
        path: PathBuf,
        /// Reason
        reason: String,
    },

    /// Invalid value
    #[error("invalid value for {key}: {reason}")]
    Invalid {
        /// Key
        key: String,
        /// Reason
        reason: String,
    },
}

/// Result type alias using RecipeError
pub type Result<T> = std::result::Result<T, RecipeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = BuildError::CommandFailed {
            command: "cmake --build build".to_string(),
            code: Some(2),
        };
        assert_eq!(
            err.to_string(),
            "build command failed: cmake --build build (exit Some(2))"
        );
    }

    #[test]
    fn hook_wraps_and_root_unwraps() {
        let inner: RecipeError = ConfigurationError::Invalid {
            reference: "zlib/1.3".to_string(),
            configuration: "os=Windows".to_string(),
            reason: "nope".to_string(),
        }
        .into();
        let err = RecipeError::Hook {
            reference: "zlib/1.3".to_string(),
            configuration: "os=Windows".to_string(),
            hook: "validate",
            source: Box::new(inner),
        };
        assert!(err.is_configuration());
        assert!(err.to_string().starts_with("zlib/1.3 [os=Windows]: validate() failed"));
    }
}
