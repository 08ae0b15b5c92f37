//! Create (source, build, package) command.

use super::{default_build_folder, report, Session};
use crate::cli::TargetArgs;
use recipe_lib::adapters;
use recipe_lib::{CommandRunner, Layout, Pipeline, ProcessRunner, RecipeError, RecordingRunner};
use std::path::PathBuf;
use std::process::ExitCode;

/// Run the full lifecycle, or record the plan with `--dry-run`.
pub fn cmd_create(
    session: &Session,
    target: &TargetArgs,
    build_folder: Option<PathBuf>,
    deps: Vec<PathBuf>,
    dry_run: bool,
) -> ExitCode {
    let run = || -> Result<(), RecipeError> {
        let recipe = session.load_recipe(target)?;
        let folder = build_folder.unwrap_or_else(|| default_build_folder(&recipe));
        let layout = Layout::new(&folder);

        if dry_run {
            let runner = RecordingRunner::new();
            let pipeline = Pipeline::new(
                &recipe,
                &session.settings,
                &session.overrides,
                layout,
                &session.config,
                &runner,
            )?
            .with_dependency_dirs(deps);
            if let Some(spec) = recipe.conandata.source(&recipe.version) {
                println!("[source] {}", spec.url.as_slice().join(" | "));
            }
            for patch in recipe.conandata.patches(&recipe.version) {
                println!("[patch] {}", patch.patch_file);
            }
            let plan = pipeline.build_plan()?;
            adapters::execute(&plan, &runner, &pipeline.layout().install)?;
            for (phase, inv) in plan.invocations() {
                println!("[{}] {}", phase, inv);
            }
            println!("Dry run: {} step(s) recorded", runner.calls().len());
            return Ok(());
        }

        let runner = ProcessRunner;
        let runner: &dyn CommandRunner = &runner;
        let mut pipeline = Pipeline::new(
            &recipe,
            &session.settings,
            &session.overrides,
            layout,
            &session.config,
            runner,
        )?
        .with_dependency_dirs(deps);
        let package = pipeline.run()?;
        log::info!("{}: packaged {} file(s)", recipe.reference(), package.files.len());
        println!("{}:{}", recipe.reference(), package.package_id());
        println!("  Package folder: {}", package.root.display());
        let info = &package.cpp_info;
        if !info.libs.is_empty() {
            println!("  Libs: {}", info.libs.join(", "));
        }
        if !info.components.is_empty() {
            let names: Vec<&str> = info.components.keys().map(String::as_str).collect();
            println!("  Components: {}", names.join(", "));
        }
        Ok(())
    };
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => report(&e),
    }
}
