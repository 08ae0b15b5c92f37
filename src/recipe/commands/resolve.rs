//! Resolve and validate commands.

use super::{report, Session};
use crate::cli::TargetArgs;
use recipe_lib::{package_id, requirements, resolver, RecipeError};
use serde_json::json;
use std::process::ExitCode;

/// Print the resolved settings and options plus the package id.
pub fn cmd_resolve(session: &Session, target: &TargetArgs, json: bool) -> ExitCode {
    let run = || -> Result<(), RecipeError> {
        let recipe = session.load_recipe(target)?;
        let overrides = session.overrides.for_recipe(&recipe.name, &recipe.options);
        let config = resolver::resolve_options(&recipe, &session.settings, &overrides)?;
        let reqs = requirements::declare(&recipe, &config)?;
        let id = package_id::package_id(&recipe, &config, &reqs);

        if json {
            let value = json!({
                "reference": config.reference(),
                "settings": config.settings,
                "options": config.options,
                "package_id": id,
            });
            println!("{}", serde_json::to_string_pretty(&value)?);
        } else {
            println!("{}", config.reference());
            println!("  Settings:");
            for (k, v) in config.settings.to_pairs() {
                println!("    {}={}", k, v);
            }
            if !config.options.is_empty() {
                println!("  Options:");
                for (k, v) in config.options.iter() {
                    println!("    {}={}", k, v);
                }
            }
            println!("  Package id: {}", id);
        }
        Ok(())
    };
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => report(&e),
    }
}

/// Resolve and validate; exit non-zero if the configuration is unsupported.
pub fn cmd_validate(session: &Session, target: &TargetArgs) -> ExitCode {
    let run = || -> Result<String, RecipeError> {
        let recipe = session.load_recipe(target)?;
        let overrides = session.overrides.for_recipe(&recipe.name, &recipe.options);
        let config = resolver::resolve(&recipe, &session.settings, &overrides)?;
        requirements::declare(&recipe, &config)?;
        Ok(format!("{}: OK ({})", config.reference(), config.summary()))
    };
    match run() {
        Ok(line) => {
            println!("{}", line);
            ExitCode::SUCCESS
        }
        Err(e) => report(&e),
    }
}
