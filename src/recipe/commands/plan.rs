//! Print build plan command.

use super::{default_build_folder, report, Session};
use crate::cli::TargetArgs;
use recipe_lib::{Layout, Pipeline, RecipeError, RecordingRunner};
use std::path::PathBuf;
use std::process::ExitCode;

/// Resolve the configuration and print the plan. Nothing is executed.
pub fn cmd_plan(session: &Session, target: &TargetArgs, build_folder: Option<PathBuf>, json: bool) -> ExitCode {
    let run = || -> Result<(), RecipeError> {
        let recipe = session.load_recipe(target)?;
        let folder = build_folder.unwrap_or_else(|| default_build_folder(&recipe));
        let runner = RecordingRunner::new();
        let pipeline = Pipeline::new(
            &recipe,
            &session.settings,
            &session.overrides,
            Layout::new(&folder),
            &session.config,
            &runner,
        )?;
        let plan = pipeline.build_plan()?;
        if json {
            println!("{}", serde_json::to_string_pretty(&plan)?);
        } else {
            println!("{} ({})", recipe.reference(), pipeline.config().summary());
            print!("{}", plan);
        }
        Ok(())
    };
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => report(&e),
    }
}
