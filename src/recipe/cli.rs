//! CLI definitions for the recipe command.

use clap::{Parser, Subcommand};
use clap_complete::Shell as CompletionShell;
use std::path::PathBuf;

/// recipe - Build recipes for C/C++ libraries
#[derive(Parser)]
#[command(name = "recipe")]
#[command(author, version)]
#[command(help_template = "{about-section}\n{usage-heading} {usage}\n\n{all-args}\n\n{after-help}")]
#[command(about = "recipe - Build and package C/C++ libraries from recipes.\n\n\
    Resolves options against host settings, declares requirements,\n\
    drives CMake/Autotools/Meson/MSBuild and packages the result.\n\n\
    EXAMPLES:\n\
    \x20 recipe ls                         List catalog recipes\n\
    \x20 recipe inspect zlib               Show recipe details\n\
    \x20 recipe resolve zlib -o shared=True\n\
    \x20 recipe plan libcurl -s os=Windows  Print the build plan\n\
    \x20 recipe create ./recipes/zlib/all   Build and package")]
#[command(after_help = "TARGETS:\n\
    A target is a recipe folder, a path to recipe.toml, or name[/version]\n\
    looked up in the catalog (-r, config recipes_path, RECIPE_PATH).\n\n\
    OPTIONS:\n\
    \x20 -s os=Linux -s compiler=gcc -s compiler.version=13\n\
    \x20 -o shared=True -o libcurl:with_ssl=openssl -o *:fPIC=False")]
pub struct Cli {
    /// Verbosity: -v (info), -vv (debug), -vvv (trace)
    #[arg(short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Log to file (default: recipe.log next to binary)
    #[arg(short = 'l', long = "log", global = true)]
    pub log_file: Option<Option<PathBuf>>,

    /// Tool configuration file (default: ~/.config/recipe/config.toml)
    #[arg(long = "config", global = true)]
    pub config: Option<PathBuf>,

    /// Profile with [settings] and [options]
    #[arg(long = "profile", global = true)]
    pub profile: Option<PathBuf>,

    /// Setting assignment key=value (can repeat)
    #[arg(short = 's', long = "setting", global = true)]
    pub settings: Vec<String>,

    /// Option override [recipe:]name=value (can repeat)
    #[arg(short = 'o', long = "option", global = true)]
    pub options: Vec<String>,

    /// Extra catalog roots (can repeat)
    #[arg(short = 'r', long = "recipes", global = true)]
    pub recipes: Vec<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Recipe target plus version selector.
#[derive(clap::Args, Debug, Clone)]
pub struct TargetArgs {
    /// Recipe folder, recipe.toml, or name[/version]
    pub target: String,
    /// Version to load (default: newest)
    #[arg(long = "recipe-version")]
    pub version: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show recipe metadata, options and versions
    Inspect {
        #[command(flatten)]
        target: TargetArgs,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Resolve options and settings for a configuration
    Resolve {
        #[command(flatten)]
        target: TargetArgs,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Check that a configuration is supported
    Validate {
        #[command(flatten)]
        target: TargetArgs,
    },

    /// List requirements for a configuration
    Deps {
        #[command(flatten)]
        target: TargetArgs,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the build plan without running it
    Plan {
        #[command(flatten)]
        target: TargetArgs,
        /// Build folder (default: ./build/<name>-<version>)
        #[arg(short = 'b', long = "build-folder")]
        build_folder: Option<PathBuf>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Source, build and package a recipe
    Create {
        #[command(flatten)]
        target: TargetArgs,
        /// Build folder (default: ./build/<name>-<version>)
        #[arg(short = 'b', long = "build-folder")]
        build_folder: Option<PathBuf>,
        /// Package folders of built dependencies (can repeat)
        #[arg(short = 'd', long = "dep")]
        deps: Vec<PathBuf>,
        /// Record commands instead of running them
        #[arg(short = 'n', long)]
        dry_run: bool,
    },

    /// List catalog recipes
    #[command(visible_alias = "ls")]
    List {
        /// Name patterns (glob: zlib, lib*, ?lib)
        patterns: Vec<String>,
        /// Show only latest versions
        #[arg(short = 'L', long)]
        latest: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show catalog versions matching a reference
    #[command(name = "search-range")]
    SearchRange {
        /// Reference: name/version or name/[range]
        reference: String,
    },

    /// Show version and build info
    Version,

    /// Generate shell completions
    Completions {
        /// Shell type
        shell: CompletionShell,
    },
}
