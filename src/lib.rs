//! recipe: build recipes for C/C++ libraries.
//!
//! A recipe (`recipe.toml` + `conandata.yml`) describes how one library is
//! configured, fetched, built with its native build system and packaged
//! into a standard layout with consumption metadata.
//!
//! # Overview
//!
//! recipe provides:
//!
//! - **Option resolution** against host settings, with fail-fast validation
//! - **Requirement declaration** with conditional and range requirements
//! - **Build adapters** for CMake, Autotools, Meson and MSBuild
//! - **Packaging** into `include/`, `lib/`, `bin/`, `licenses/` with a package id
//! - **A lifecycle pipeline** that runs the hooks in order
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                            CLI                              │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Catalog   │  Pipeline (lifecycle)  │  Config / Profile     │
//! ├────────────┴────────────────────────┴───────────────────────┤
//! │ Resolver │ Requirements │ Source │ Adapters │ Packager      │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Settings  │  Options  │  Condition  │  Version  │ Recipe   │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Quick Start
//!
//! ```ignore
//! use recipe_lib::options::OptionOverride;
//! use recipe_lib::{Catalog, Config, Layout, OptionOverrides, Pipeline, ProcessRunner, Settings};
//!
//! let config = Config::load(None)?;
//! let catalog = Catalog::scan(&config.recipes_path)?;
//! let recipe = catalog.load("zlib", None)?;
//!
//! let settings = Settings::detect();
//! let overrides: OptionOverrides = OptionOverride::parse("zlib:shared=True").into_iter().collect();
//! let runner = ProcessRunner;
//! let mut pipeline = Pipeline::new(
//!     &recipe, &settings, &overrides, Layout::new("build/zlib".as_ref()), &config, &runner,
//! )?;
//! let package = pipeline.run()?;
//! println!("{} -> {}", package.package_id(), package.root.display());
//! ```
//!
//! # Modules
//!
//! - [`settings`] - Host settings (os, arch, compiler, build_type)
//! - [`options`] - Option schema, values and overrides
//! - [`condition`] - `when` expressions over settings and options
//! - [`resolver`] - config_options / configure / validate
//! - [`requirements`] - Dependency declarator and version ranges
//! - [`adapters`] - Build system adapters and command runners
//! - [`source`] - Download, extraction and patching
//! - [`packager`] - Package folder and contract checks
//! - [`package_info`] - Consumption metadata
//! - [`package_id`] - Binary identity
//! - [`lifecycle`] - Hook ordering
//! - [`catalog`] - Recipe discovery
//! - [`config`], [`profile`] - Tool configuration and profiles
//! - [`error`] - Error types

pub mod adapters;
pub mod catalog;
pub mod conandata;
pub mod condition;
pub mod config;
pub mod error;
pub mod lifecycle;
pub mod options;
pub mod package_id;
pub mod package_info;
pub mod packager;
pub mod profile;
pub mod recipe;
pub mod requirements;
pub mod resolver;
pub mod settings;
pub mod source;
pub mod version;

// Re-exports for convenience
pub use adapters::{BuildPlan, BuildSystem, BuildSystemRegistry, CommandRunner, ProcessRunner, RecordingRunner};
pub use catalog::Catalog;
pub use config::Config;
pub use error::{
    BuildError, CatalogError, ConfigError, ConfigurationError, LifecycleError, LoadError, PackagingError,
    RecipeError, RequirementError, Result, SettingsError, SourceError,
};
pub use lifecycle::{Layout, Pipeline, Stage};
pub use options::{OptionOverrides, OptionValue};
pub use package_info::CppInfo;
pub use packager::PackageLayout;
pub use profile::Profile;
pub use recipe::Recipe;
pub use requirements::{Reference, Requirement, RequirementKind};
pub use resolver::ResolvedConfig;
pub use settings::Settings;

/// Library version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn test_reexports() {
        let recipe = Recipe::from_toml_str("[recipe]\nname = \"zlib\"\n", "1.3.1").unwrap();
        assert_eq!(recipe.reference(), "zlib/1.3.1");
        let _registry = BuildSystemRegistry::new();
        let _runner = RecordingRunner::new();
        assert_eq!(Stage::Unconfigured.to_string(), "UNCONFIGURED");
    }
}
