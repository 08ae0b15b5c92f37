//! recipe CLI - build and package C/C++ libraries from recipes.
//!
//! # Commands
//!
//! - `inspect <target>` - Show recipe details
//! - `resolve <target>` - Resolve settings and options
//! - `validate <target>` - Check a configuration is supported
//! - `deps <target>` - List requirements
//! - `plan <target>` - Print the build plan
//! - `create <target>` - Source, build and package
//! - `ls [patterns]` - List catalog recipes
//! - `search-range <ref>` - Catalog versions matching a reference

mod cli;
mod commands;

use clap::{CommandFactory, Parser};
use clap_complete::generate;
use cli::{Cli, Commands};
use commands::{report, Session};
use log::{debug, info, trace};
use std::path::PathBuf;
use std::process::ExitCode;

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging
    init_logging(cli.verbose, &cli.log_file);

    info!("recipe v{} starting", recipe_lib::VERSION);
    trace!("CLI args: settings={:?}, options={:?}", cli.settings, cli.options);

    // Show help if no command
    let Some(command) = &cli.command else {
        print_usage();
        return ExitCode::SUCCESS;
    };

    // Commands that don't need a session
    match command {
        Commands::Version => {
            println!("recipe {}", recipe_lib::VERSION);
            return ExitCode::SUCCESS;
        }
        Commands::Completions { shell } => return cmd_completions(*shell),
        _ => {}
    }

    let session = match Session::from_cli(&cli) {
        Ok(s) => s,
        Err(e) => return report(&e),
    };

    match command {
        Commands::Inspect { target, json } => {
            debug!("cmd: inspect target={}", target.target);
            commands::cmd_inspect(&session, target, *json)
        }
        Commands::Resolve { target, json } => {
            debug!("cmd: resolve target={}", target.target);
            commands::cmd_resolve(&session, target, *json)
        }
        Commands::Validate { target } => {
            debug!("cmd: validate target={}", target.target);
            commands::cmd_validate(&session, target)
        }
        Commands::Deps { target, json } => {
            debug!("cmd: deps target={}", target.target);
            commands::cmd_deps(&session, target, *json)
        }
        Commands::Plan {
            target,
            build_folder,
            json,
        } => {
            debug!("cmd: plan target={} build_folder={:?}", target.target, build_folder);
            commands::cmd_plan(&session, target, build_folder.clone(), *json)
        }
        Commands::Create {
            target,
            build_folder,
            deps,
            dry_run,
        } => {
            debug!(
                "cmd: create target={} build_folder={:?} deps={:?} dry_run={}",
                target.target, build_folder, deps, dry_run
            );
            commands::cmd_create(&session, target, build_folder.clone(), deps.clone(), *dry_run)
        }
        Commands::List {
            patterns,
            latest,
            json,
        } => {
            debug!("cmd: ls patterns={:?} latest={}", patterns, latest);
            match session.catalog() {
                Ok(catalog) => {
                    print_warnings(&catalog, cli.verbose);
                    commands::cmd_list(&catalog, patterns.clone(), *latest, *json)
                }
                Err(e) => report(&e),
            }
        }
        Commands::SearchRange { reference } => {
            debug!("cmd: search-range reference={}", reference);
            match session.catalog() {
                Ok(catalog) => {
                    print_warnings(&catalog, cli.verbose);
                    commands::cmd_search_range(&catalog, reference)
                }
                Err(e) => report(&e),
            }
        }
        Commands::Version | Commands::Completions { .. } => ExitCode::SUCCESS,
    }
}

/// Print catalog warnings in verbose mode.
fn print_warnings(catalog: &recipe_lib::Catalog, verbose: u8) {
    if verbose > 0 && !catalog.warnings().is_empty() {
        eprintln!("Warnings:");
        for w in catalog.warnings() {
            eprintln!("  - {}", w);
        }
    }
}

/// Initialize logging based on verbosity level.
fn init_logging(verbosity: u8, log_file: &Option<Option<PathBuf>>) {
    use std::io::Write;

    let level = match verbosity {
        0 => log::LevelFilter::Warn,  // default: warnings only
        1 => log::LevelFilter::Info,  // -v: info
        2 => log::LevelFilter::Debug, // -vv: debug
        _ => log::LevelFilter::Trace, // -vvv: trace
    };

    let mut builder = env_logger::Builder::new();
    builder.filter_level(level);
    builder.format(|buf, record| writeln!(buf, "[{} {}] {}", record.level(), record.target(), record.args()));

    if let Some(maybe_path) = log_file {
        let log_path = match maybe_path {
            Some(p) => p.clone(),
            None => std::env::current_exe()
                .ok()
                .and_then(|p| p.parent().map(|d| d.join("recipe.log")))
                .unwrap_or_else(|| PathBuf::from("recipe.log")),
        };

        if let Ok(file) = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_path)
        {
            builder.target(env_logger::Target::Pipe(Box::new(file)));
            eprintln!("Logging to: {}", log_path.display());
        }
    }

    builder.init();
}

/// Print usage help.
fn print_usage() {
    let _ = Cli::command().print_long_help();
}

/// Generate shell completions.
fn cmd_completions(shell: clap_complete::Shell) -> ExitCode {
    let mut cmd = Cli::command();
    generate(shell, &mut cmd, "recipe", &mut std::io::stdout());
    ExitCode::SUCCESS
}
