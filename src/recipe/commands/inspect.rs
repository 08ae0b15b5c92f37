//! Show recipe details command.

use super::{report, Session};
use crate::cli::TargetArgs;
use recipe_lib::Recipe;
use serde_json::json;
use std::process::ExitCode;

fn recipe_json(recipe: &Recipe) -> serde_json::Value {
    let options: serde_json::Map<String, serde_json::Value> = recipe
        .options
        .iter()
        .map(|(name, def)| {
            (
                name.clone(),
                json!({ "values": def.values, "default": def.default, "description": def.description }),
            )
        })
        .collect();
    json!({
        "name": recipe.name,
        "version": recipe.version,
        "description": recipe.description,
        "license": recipe.license,
        "homepage": recipe.homepage,
        "topics": recipe.topics,
        "package_type": recipe.package_type,
        "language": recipe.language,
        "options": options,
        "requires": recipe.requires,
        "tool_requires": recipe.tool_requires,
        "build_system": recipe.build.system,
        "versions": recipe.available_versions(),
        "folder": recipe.folder,
    })
}

/// Show recipe metadata, options, requirements and versions.
pub fn cmd_inspect(session: &Session, target: &TargetArgs, json: bool) -> ExitCode {
    let recipe = match session.load_recipe(target) {
        Ok(r) => r,
        Err(e) => return report(&e),
    };
    let value = recipe_json(&recipe);

    if json {
        println!("{}", serde_json::to_string_pretty(&value).unwrap_or_default());
        return ExitCode::SUCCESS;
    }

    println!("Recipe: {}", recipe.reference());
    if let Some(desc) = &recipe.description {
        println!("  Description: {}", desc);
    }
    if let Some(license) = &recipe.license {
        println!("  License: {}", license);
    }
    if let Some(home) = &recipe.homepage {
        println!("  Homepage: {}", home);
    }
    println!("  Type: {}", value["package_type"].as_str().unwrap_or_default());
    println!("  Language: {}", value["language"].as_str().unwrap_or_default());
    if let Some(system) = &recipe.build.system {
        println!("  Build system: {}", system);
    }

    if !recipe.options.is_empty() {
        println!("  Options:");
        for (name, def) in &recipe.options {
            println!("    {} = {} ({})", name, def.default, def.describe_domain());
        }
    }
    if !recipe.requires.is_empty() || !recipe.tool_requires.is_empty() {
        println!("  Requirements:");
        for decl in &recipe.requires {
            println!("    - {}", decl.reference);
        }
        for decl in &recipe.tool_requires {
            println!("    - {} (tool)", decl.reference);
        }
    }
    let versions = recipe.available_versions();
    if !versions.is_empty() {
        println!("  Versions: {}", versions.join(", "));
    }

    ExitCode::SUCCESS
}
