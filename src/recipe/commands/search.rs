//! Search catalog versions for a reference.

use super::report;
use recipe_lib::{Catalog, RecipeError, Reference};
use std::process::ExitCode;

/// Print every catalog version matching `reference`, newest first.
pub fn cmd_search_range(catalog: &Catalog, reference: &str) -> ExitCode {
    let run = || -> Result<Vec<String>, RecipeError> {
        let reference = Reference::parse(reference)?;
        let versions = catalog.versions(&reference.name)?;
        Ok(versions
            .into_iter()
            .filter(|v| reference.constraint.matches(v))
            .map(|v| format!("{}/{}", reference.name, v))
            .collect())
    };
    match run() {
        Ok(matches) if matches.is_empty() => {
            eprintln!("No versions match {}", reference);
            ExitCode::FAILURE
        }
        Ok(matches) => {
            for m in matches {
                println!("{}", m);
            }
            ExitCode::SUCCESS
        }
        Err(e) => report(&e),
    }
}
