//! Build-system adapters.
//!
//! Each adapter translates a resolved configuration into a [`BuildPlan`]: the
//! ordered configure/build/install invocations for one external tool. Plans
//! are plain values, so they can be printed or inspected without running
//! anything; [`execute`] and [`build`] run them through a [`CommandRunner`].
//!
//! ```toml
//! [build]
//! system = "cmake"
//! definitions = { SPDLOG_BUILD_EXAMPLE = false, SPDLOG_FMT_EXTERNAL = true }
//! option_map = { wchar_support = "SPDLOG_WCHAR_SUPPORT" }
//!
//! [[build.conditional]]
//! when = { os = ["Windows"] }
//! definitions = { SPDLOG_WCHAR_FILENAMES = true }
//! ```

mod autotools;
mod cmake;
mod meson;
mod msbuild;
mod runner;

pub use autotools::AutotoolsBuildSystem;
pub use cmake::CmakeBuildSystem;
pub use meson::MesonBuildSystem;
pub use msbuild::MsbuildBuildSystem;
pub use runner::{CommandRunner, ProcessRunner, RecordingRunner};

use crate::condition::Condition;
use crate::config::Programs;
use crate::error::BuildError;
use crate::options::OptionValue;
use crate::recipe::Recipe;
use crate::resolver::{ResolvedConfig, OPT_FPIC, OPT_SHARED};
use crate::settings::BuildType;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

/// A build-system variable value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Definition {
    Bool(bool),
    Int(i64),
    Str(String),
}

impl From<&OptionValue> for Definition {
    fn from(value: &OptionValue) -> Self {
        match value {
            OptionValue::Bool(b) => Definition::Bool(*b),
            OptionValue::Str(s) => Definition::Str(s.clone()),
        }
    }
}

impl fmt::Display for Definition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Definition::Bool(b) => write!(f, "{}", b),
            Definition::Int(i) => write!(f, "{}", i),
            Definition::Str(s) => f.write_str(s),
        }
    }
}

/// Definitions and args applied when a condition holds.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConditionalDefinitions {
    pub when: Condition,
    pub definitions: BTreeMap<String, Definition>,
    pub args: Vec<String>,
}

/// `[build]` table of a recipe.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BuildSpec {
    /// Adapter name; detected from the source tree when absent.
    pub system: Option<String>,
    /// Directory inside the source tree holding the build files.
    pub source_subdir: Option<String>,
    pub definitions: BTreeMap<String, Definition>,
    /// Option name → build variable.
    pub option_map: BTreeMap<String, String>,
    pub conditional: Vec<ConditionalDefinitions>,
    /// Extra configure arguments.
    pub args: Vec<String>,
    /// Solution/project file (MSBuild).
    pub project_file: Option<String>,
    /// Extra environment for every step.
    pub env: BTreeMap<String, String>,
}

/// Build phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildPhase {
    Configure,
    Build,
    Install,
}

impl fmt::Display for BuildPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuildPhase::Configure => f.write_str("configure"),
            BuildPhase::Build => f.write_str("build"),
            BuildPhase::Install => f.write_str("install"),
        }
    }
}

/// One external command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: PathBuf,
}

impl Invocation {
    pub fn new<I, S>(program: impl Into<String>, args: I, cwd: PathBuf) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
            cwd,
        }
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let words = std::iter::once(&self.program).chain(self.args.iter());
        f.write_str(&shell_words::join(words))
    }
}

/// Ordered invocations for one build.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildPlan {
    pub system: String,
    pub configure: Vec<Invocation>,
    pub build: Vec<Invocation>,
    pub install: Vec<Invocation>,
    pub env: BTreeMap<String, String>,
}

impl BuildPlan {
    pub fn new(system: &str) -> Self {
        Self {
            system: system.to_string(),
            ..Default::default()
        }
    }

    pub fn phase(&self, phase: BuildPhase) -> &[Invocation] {
        match phase {
            BuildPhase::Configure => &self.configure,
            BuildPhase::Build => &self.build,
            BuildPhase::Install => &self.install,
        }
    }

    /// All invocations in execution order.
    pub fn invocations(&self) -> impl Iterator<Item = (BuildPhase, &Invocation)> {
        [BuildPhase::Configure, BuildPhase::Build, BuildPhase::Install]
            .into_iter()
            .flat_map(move |phase| self.phase(phase).iter().map(move |inv| (phase, inv)))
    }
}

impl fmt::Display for BuildPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "# {}", self.system)?;
        for (key, value) in &self.env {
            writeln!(f, "{}={}", key, value)?;
        }
        for (phase, inv) in self.invocations() {
            writeln!(f, "[{}] (cd {}) {}", phase, inv.cwd.display(), inv)?;
        }
        Ok(())
    }
}

/// What a finished build leaves behind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildArtifacts {
    pub install_dir: PathBuf,
    pub steps: usize,
}

/// Everything an adapter needs to plan a build.
#[derive(Debug, Clone, Copy)]
pub struct BuildContext<'a> {
    pub recipe: &'a Recipe,
    pub config: &'a ResolvedConfig,
    pub source_dir: &'a Path,
    pub build_dir: &'a Path,
    pub install_dir: &'a Path,
    /// Package folders of already-built dependencies.
    pub dependency_dirs: &'a [PathBuf],
    pub programs: &'a Programs,
    pub jobs: usize,
}

impl BuildContext<'_> {
    /// Source dir plus `source_subdir`, absolute.
    pub fn project_dir(&self) -> PathBuf {
        let dir = match &self.recipe.build.source_subdir {
            Some(sub) => self.source_dir.join(sub),
            None => self.source_dir.to_path_buf(),
        };
        abs_path(&dir)
    }

    pub fn build_type(&self) -> Option<BuildType> {
        self.config.settings.build_type
    }

    /// `shared` option value, if the recipe has it.
    pub fn shared(&self) -> Option<bool> {
        self.config.options.get(OPT_SHARED).map(OptionValue::is_truthy)
    }

    /// `fPIC` option value, if present after resolution.
    pub fn fpic(&self) -> Option<bool> {
        self.config.options.get(OPT_FPIC).map(OptionValue::is_truthy)
    }

    /// Static definitions, then mapped options, then conditional ones.
    /// Later sources override earlier ones.
    pub fn definitions(&self) -> BTreeMap<String, Definition> {
        let spec = &self.recipe.build;
        let mut defs = spec.definitions.clone();
        for (option, variable) in &spec.option_map {
            if let Some(value) = self.config.options.get(option) {
                defs.insert(variable.clone(), value.into());
            }
        }
        for cond in &spec.conditional {
            if self.config.eval(&cond.when) {
                defs.extend(cond.definitions.iter().map(|(k, v)| (k.clone(), v.clone())));
            }
        }
        defs
    }

    /// Recipe args plus conditional args.
    pub fn extra_args(&self) -> Vec<String> {
        let spec = &self.recipe.build;
        let mut args = spec.args.clone();
        for cond in &spec.conditional {
            if self.config.eval(&cond.when) {
                args.extend(cond.args.iter().cloned());
            }
        }
        args
    }

    /// Base environment: recipe env plus PKG_CONFIG_PATH from dependencies.
    pub fn base_env(&self) -> BTreeMap<String, String> {
        let mut env = self.recipe.build.env.clone();
        let pc_dirs: Vec<PathBuf> = self
            .dependency_dirs
            .iter()
            .map(|d| d.join("lib").join("pkgconfig"))
            .collect();
        if let Some(joined) = join_paths(&pc_dirs) {
            env.insert("PKG_CONFIG_PATH".to_string(), joined);
        }
        env
    }
}

pub(crate) fn abs_path(path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else if let Ok(cwd) = std::env::current_dir() {
        cwd.join(path)
    } else {
        path.to_path_buf()
    }
}

pub(crate) fn join_paths(paths: &[PathBuf]) -> Option<String> {
    if paths.is_empty() {
        return None;
    }
    std::env::join_paths(paths)
        .ok()
        .map(|p| p.to_string_lossy().into_owned())
}

/// Trait implemented by build systems.
pub trait BuildSystem {
    fn name(&self) -> &'static str;

    fn detects_source(&self, _source_dir: &Path) -> bool {
        false
    }

    /// Plan the build. Pure: nothing is executed.
    fn configure(&self, ctx: &BuildContext<'_>) -> Result<BuildPlan, BuildError>;
}

/// Registry for available build systems.
pub struct BuildSystemRegistry {
    systems: Vec<Box<dyn BuildSystem>>,
}

impl Default for BuildSystemRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl BuildSystemRegistry {
    pub fn new() -> Self {
        Self {
            // Detection order: a tree with both CMakeLists.txt and meson.build builds with CMake
            systems: vec![
                Box::new(CmakeBuildSystem),
                Box::new(MesonBuildSystem),
                Box::new(AutotoolsBuildSystem),
                Box::new(MsbuildBuildSystem),
            ],
        }
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.systems.iter().map(|s| s.name()).collect()
    }

    pub fn by_name(&self, name: &str) -> Option<&dyn BuildSystem> {
        self.systems
            .iter()
            .map(|s| s.as_ref())
            .find(|s| s.name() == name)
    }

    pub fn detect(&self, source_dir: &Path) -> Option<&dyn BuildSystem> {
        self.systems
            .iter()
            .map(|s| s.as_ref())
            .find(|s| s.detects_source(source_dir))
    }

    /// Adapter named by the recipe, else detected from the project dir.
    pub fn select(&self, ctx: &BuildContext<'_>) -> Result<&dyn BuildSystem, BuildError> {
        match &ctx.recipe.build.system {
            Some(name) => self
                .by_name(name)
                .ok_or_else(|| BuildError::Config(format!("unknown build system '{}'", name))),
            None => {
                let dir = ctx.project_dir();
                let system = self.detect(&dir).ok_or_else(|| {
                    BuildError::Config(format!("no build system detected in {}", dir.display()))
                })?;
                log::info!("{}: detected build system {}", ctx.config.reference(), system.name());
                Ok(system)
            }
        }
    }
}

/// Run one phase of a plan.
pub fn execute_phase(
    plan: &BuildPlan,
    phase: BuildPhase,
    runner: &dyn CommandRunner,
) -> Result<usize, BuildError> {
    let steps = plan.phase(phase);
    log::debug!("{}: {} phase, {} step(s)", plan.system, phase, steps.len());
    for inv in steps {
        runner.run(inv, &plan.env)?;
    }
    Ok(steps.len())
}

/// Run the build and install phases.
pub fn build(
    plan: &BuildPlan,
    runner: &dyn CommandRunner,
    install_dir: &Path,
) -> Result<BuildArtifacts, BuildError> {
    let mut steps = execute_phase(plan, BuildPhase::Build, runner)?;
    steps += execute_phase(plan, BuildPhase::Install, runner)?;
    Ok(BuildArtifacts {
        install_dir: install_dir.to_path_buf(),
        steps,
    })
}

/// Run every phase in order. The first failure stops the plan.
pub fn execute(
    plan: &BuildPlan,
    runner: &dyn CommandRunner,
    install_dir: &Path,
) -> Result<BuildArtifacts, BuildError> {
    let configured = execute_phase(plan, BuildPhase::Configure, runner)?;
    let mut artifacts = build(plan, runner, install_dir)?;
    artifacts.steps += configured;
    Ok(artifacts)
}


#[cfg(test)]
mod tests {
    use super::testutil::Fixture;
    use super::*;
    use crate::settings::{Arch, Os, Settings};

    const RECIPE: &str = r#"
[recipe]
name = "demo"

[options]
shared = { values = [true, false], default = false }
with_zstd = { values = [true, false], default = true }

[build]
system = "cmake"
definitions = { DEMO_TESTS = false, DEMO_LEVEL = 3, DEMO_NAME = "x" }
option_map = { with_zstd = "DEMO_ZSTD" }
args = ["--log-level=VERBOSE"]

[[build.conditional]]
when = { os = ["Linux"] }
definitions = { DEMO_TESTS = true }
args = ["-Wno-dev"]
"#;

    #[test]
    fn definitions_merge_in_order() {
        let fx = Fixture::new(RECIPE, &Settings::new(Os::Linux, Arch::X86_64), &["with_zstd=False"]);
        let defs = fx.ctx().definitions();
        assert_eq!(defs.get("DEMO_TESTS"), Some(&Definition::Bool(true)));
        assert_eq!(defs.get("DEMO_ZSTD"), Some(&Definition::Bool(false)));
        assert_eq!(defs.get("DEMO_LEVEL"), Some(&Definition::Int(3)));
        assert_eq!(fx.ctx().extra_args(), vec!["--log-level=VERBOSE", "-Wno-dev"]);

        let fx = Fixture::new(RECIPE, &Settings::new(Os::Macos, Arch::Armv8), &[]);
        assert_eq!(fx.ctx().definitions().get("DEMO_TESTS"), Some(&Definition::Bool(false)));
        assert_eq!(fx.ctx().extra_args().len(), 1);
    }

    #[test]
    fn base_env_has_pkg_config_path() {
        let fx = Fixture::new(RECIPE, &Settings::new(Os::Linux, Arch::X86_64), &[]);
        let env = fx.ctx().base_env();
        assert!(env["PKG_CONFIG_PATH"].contains("pkgconfig"));
    }

    #[test]
    fn registry_lookup_and_detect() {
        let registry = BuildSystemRegistry::new();
        assert_eq!(registry.names(), vec!["cmake", "meson", "autotools", "msbuild"]);
        assert!(registry.by_name("scons").is_none());

        let dir = tempfile::TempDir::new().unwrap();
        std::fs::write(dir.path().join("meson.build"), "project('x')").unwrap();
        assert_eq!(registry.detect(dir.path()).map(|s| s.name()), Some("meson"));
        std::fs::write(dir.path().join("CMakeLists.txt"), "").unwrap();
        assert_eq!(registry.detect(dir.path()).map(|s| s.name()), Some("cmake"));
    }

    #[test]
    fn execute_stops_at_first_failure() {
        let fx = Fixture::new(RECIPE, &Settings::new(Os::Linux, Arch::X86_64), &[]);
        let plan = CmakeBuildSystem.configure(&fx.ctx()).unwrap();
        let runner = RecordingRunner::new().failing_on("cmake");
        let err = execute(&plan, &runner, &fx.install).unwrap_err();
        assert!(matches!(err, BuildError::CommandFailed { .. }));
        assert_eq!(runner.calls().len(), 1);

        let runner = RecordingRunner::new();
        let artifacts = execute(&plan, &runner, &fx.install).unwrap();
        assert_eq!(artifacts.steps, 3);
        assert_eq!(runner.calls(), plan.invocations().map(|(_, i)| i.clone()).collect::<Vec<_>>());
    }

    #[test]
    fn plan_display_lists_phases() {
        let fx = Fixture::new(RECIPE, &Settings::new(Os::Linux, Arch::X86_64), &[]);
        let plan = CmakeBuildSystem.configure(&fx.ctx()).unwrap();
        let text = plan.to_string();
        assert!(text.starts_with("# cmake"));
        assert!(text.contains("[configure]") && text.contains("[install]"));
    }
}
