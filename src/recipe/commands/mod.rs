//! Command implementations for the recipe CLI.

mod create;
mod deps;
mod inspect;
mod list;
mod plan;
mod resolve;
mod search;

pub use create::cmd_create;
pub use deps::cmd_deps;
pub use inspect::cmd_inspect;
pub use list::cmd_list;
pub use plan::cmd_plan;
pub use resolve::{cmd_resolve, cmd_validate};
pub use search::cmd_search_range;

use crate::cli::{Cli, TargetArgs};
use recipe_lib::options::OptionOverride;
use recipe_lib::{Catalog, Config, OptionOverrides, Profile, Recipe, RecipeError, Settings};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

/// Everything a command needs from the global flags.
pub struct Session {
    pub config: Config,
    pub settings: Settings,
    pub overrides: OptionOverrides,
    extra_roots: Vec<PathBuf>,
}

impl Session {
    /// Config, then profile, then `-s`/`-o` flags.
    pub fn from_cli(cli: &Cli) -> Result<Self, RecipeError> {
        let config = Config::load(cli.config.as_deref())?;

        let mut settings = Settings::detect();
        let mut overrides = OptionOverrides::new();
        let profile = cli.profile.clone().or_else(|| config.default_profile.clone());
        if let Some(path) = profile {
            let profile = Profile::load(&path)?;
            profile.apply_to(&mut settings)?;
            overrides.extend(profile.option_overrides());
        }
        for assignment in &cli.settings {
            settings.apply_assignment(assignment)?;
        }
        for raw in &cli.options {
            let ov = OptionOverride::parse(raw).ok_or_else(|| {
                RecipeError::Config(recipe_lib::ConfigError::Invalid {
                    key: raw.clone(),
                    reason: "expected [recipe:]name=value".to_string(),
                })
            })?;
            overrides.push(ov);
        }
        log::debug!("Session: settings {}", settings);

        Ok(Self {
            config,
            settings,
            overrides,
            extra_roots: cli.recipes.clone(),
        })
    }

    /// Catalog over `-r` roots followed by configured roots.
    pub fn catalog(&self) -> Result<Catalog, RecipeError> {
        let roots: Vec<PathBuf> = self
            .extra_roots
            .iter()
            .chain(self.config.recipes_path.iter())
            .cloned()
            .collect();
        Ok(Catalog::scan(&roots)?)
    }

    /// Load a recipe from a path or from the catalog.
    pub fn load_recipe(&self, args: &TargetArgs) -> Result<Recipe, RecipeError> {
        let path = Path::new(&args.target);
        if path.exists() {
            return Ok(Recipe::load(path, args.version.as_deref())?);
        }
        let (name, version) = match args.target.split_once('/') {
            Some((name, version)) => (name, Some(version)),
            None => (args.target.as_str(), args.version.as_deref()),
        };
        let catalog = self.catalog()?;
        Ok(catalog.load(name, version)?)
    }
}

/// Default build folder for a recipe.
pub fn default_build_folder(recipe: &Recipe) -> PathBuf {
    PathBuf::from("build").join(format!("{}-{}", recipe.name, recipe.version))
}

/// Print an error with its hook context and return failure.
pub fn report(err: &RecipeError) -> ExitCode {
    log::error!("{}", err);
    eprintln!("Error: {}", err);
    ExitCode::FAILURE
}
