//! List requirements command.

use super::{report, Session};
use crate::cli::TargetArgs;
use recipe_lib::{requirements, resolver, Catalog, RecipeError, Requirement};
use serde_json::json;
use std::process::ExitCode;

/// Newest catalog version for a requirement, if the catalog has the recipe.
fn pick(catalog: &Catalog, req: &Requirement) -> Option<String> {
    catalog
        .latest_matching(req.name(), &req.reference.constraint)
        .ok()
        .flatten()
}

/// Print declared requirements for the current configuration.
pub fn cmd_deps(session: &Session, target: &TargetArgs, json: bool) -> ExitCode {
    let run = || -> Result<(), RecipeError> {
        let recipe = session.load_recipe(target)?;
        let overrides = session.overrides.for_recipe(&recipe.name, &recipe.options);
        let config = resolver::resolve_options(&recipe, &session.settings, &overrides)?;
        let reqs = requirements::declare(&recipe, &config)?;
        let catalog = session.catalog().unwrap_or_else(|e| {
            log::warn!("Catalog unavailable: {}", e);
            Catalog::empty()
        });

        if json {
            let items: Vec<serde_json::Value> = reqs
                .iter()
                .map(|r| {
                    json!({
                        "name": r.name(),
                        "constraint": r.reference.constraint.to_string(),
                        "kind": r.kind,
                        "transitive_headers": r.transitive_headers,
                        "transitive_libs": r.transitive_libs,
                        "catalog_pick": pick(&catalog, r),
                    })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&items)?);
            return Ok(());
        }

        if reqs.is_empty() {
            println!("{}: no requirements", config.reference());
            return Ok(());
        }
        println!("{} ({}):", config.reference(), config.summary());
        for req in &reqs {
            match pick(&catalog, req) {
                Some(v) => println!("  {} -> {}/{}", req, req.name(), v),
                None => println!("  {}", req),
            }
        }
        Ok(())
    };
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => report(&e),
    }
}
