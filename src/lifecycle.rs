//! Recipe lifecycle.
//!
//! A [`Pipeline`] drives one recipe through its hooks in a fixed order:
//!
//! ```text
//! new():  config_options, configure, requirements, build_requirements, validate
//!         UNCONFIGURED --source()--> SOURCED --generate()--> CONFIGURED
//!         --build()--> BUILT --package()--> PACKAGED --package_info()
//! ```
//!
//! Each hook may only run from the stage before it. A failing hook moves the
//! pipeline to FAILED, after which every hook is refused. Errors are wrapped
//! with the recipe reference and configuration summary.

use crate::adapters::{self, BuildArtifacts, BuildContext, BuildPhase, BuildPlan, BuildSystemRegistry, CommandRunner};
use crate::config::Config;
use crate::error::{LifecycleError, RecipeError, Result};
use crate::options::OptionOverrides;
use crate::package_info::CppInfo;
use crate::packager::{self, PackageContext, PackageLayout};
use crate::recipe::Recipe;
use crate::requirements::{self, Requirement};
use crate::resolver::{self, ResolvedConfig};
use crate::settings::Settings;
use crate::source::{self, SourceContext};
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};

/// Pipeline stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Stage {
    Unconfigured,
    Sourced,
    Configured,
    Built,
    Packaged,
    Failed,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Stage::Unconfigured => "UNCONFIGURED",
            Stage::Sourced => "SOURCED",
            Stage::Configured => "CONFIGURED",
            Stage::Built => "BUILT",
            Stage::Packaged => "PACKAGED",
            Stage::Failed => "FAILED",
        };
        f.write_str(s)
    }
}

/// Working folders of one build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Layout {
    pub source: PathBuf,
    pub build: PathBuf,
    pub install: PathBuf,
    pub package: PathBuf,
}

impl Layout {
    /// `src/`, `build/`, `install/` and `package/` under `root`.
    pub fn new(root: &Path) -> Self {
        let root = adapters::abs_path(root);
        Self {
            source: root.join("src"),
            build: root.join("build"),
            install: root.join("install"),
            package: root.join("package"),
        }
    }
}

/// Drives one recipe and configuration through the lifecycle.
pub struct Pipeline<'a> {
    recipe: &'a Recipe,
    config: ResolvedConfig,
    requirements: Vec<Requirement>,
    layout: Layout,
    tool_config: &'a Config,
    runner: &'a dyn CommandRunner,
    dependency_dirs: Vec<PathBuf>,
    stage: Stage,
    plan: Option<BuildPlan>,
    package: Option<PackageLayout>,
}

impl<'a> Pipeline<'a> {
    /// Resolve, declare requirements and validate.
    ///
    /// An unsupported configuration fails here, before any command runs.
    pub fn new(
        recipe: &'a Recipe,
        settings: &Settings,
        overrides: &OptionOverrides,
        layout: Layout,
        tool_config: &'a Config,
        runner: &'a dyn CommandRunner,
    ) -> Result<Self> {
        let reference = recipe.reference();
        let wrap = |hook: &'static str, configuration: String, err: RecipeError| RecipeError::Hook {
            reference: reference.clone(),
            configuration,
            hook,
            source: Box::new(err),
        };

        let overrides = overrides.for_recipe(&recipe.name, &recipe.options);
        let config = resolver::resolve_options(recipe, settings, &overrides)
            .map_err(|e| wrap("configure", settings.to_string(), e.into()))?;
        let requirements = requirements::declare(recipe, &config)
            .map_err(|e| wrap("requirements", config.summary(), e.into()))?;
        resolver::validate(recipe, &config).map_err(|e| wrap("validate", config.summary(), e.into()))?;

        log::info!("{}: configuration {}", reference, config.summary());
        for req in &requirements {
            log::debug!("{}: {}", reference, req);
        }

        Ok(Self {
            recipe,
            config,
            requirements,
            layout,
            tool_config,
            runner,
            dependency_dirs: Vec::new(),
            stage: Stage::Unconfigured,
            plan: None,
            package: None,
        })
    }

    /// Package folders of already-built dependencies.
    pub fn with_dependency_dirs(mut self, dirs: Vec<PathBuf>) -> Self {
        self.dependency_dirs = dirs;
        self
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn recipe(&self) -> &Recipe {
        self.recipe
    }

    pub fn config(&self) -> &ResolvedConfig {
        &self.config
    }

    pub fn requirements(&self) -> &[Requirement] {
        &self.requirements
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    /// Plan made by [`Pipeline::generate`], if it ran.
    pub fn plan(&self) -> Option<&BuildPlan> {
        self.plan.as_ref()
    }

    fn enter(&self, hook: &'static str, expected: Stage) -> std::result::Result<(), LifecycleError> {
        match self.stage {
            Stage::Failed => Err(LifecycleError::AfterFailure { hook }),
            actual if actual != expected => Err(LifecycleError::OutOfOrder {
                hook,
                expected,
                actual,
            }),
            _ => Ok(()),
        }
    }

    /// Run `f` as hook `hook`: check the stage, advance on success, fail otherwise.
    fn hook<T>(
        &mut self,
        hook: &'static str,
        expected: Stage,
        next: Stage,
        f: impl FnOnce(&Self) -> Result<T>,
    ) -> Result<T> {
        self.enter(hook, expected)?;
        log::debug!("{}: {}()", self.recipe.reference(), hook);
        match f(&*self) {
            Ok(value) => {
                self.stage = next;
                Ok(value)
            }
            Err(err) => {
                self.stage = Stage::Failed;
                log::error!("{}: {}() failed", self.recipe.reference(), hook);
                Err(RecipeError::Hook {
                    reference: self.recipe.reference(),
                    configuration: self.config.summary(),
                    hook,
                    source: Box::new(err),
                })
            }
        }
    }

    fn build_context(&self) -> BuildContext<'_> {
        BuildContext {
            recipe: self.recipe,
            config: &self.config,
            source_dir: &self.layout.source,
            build_dir: &self.layout.build,
            install_dir: &self.layout.install,
            dependency_dirs: &self.dependency_dirs,
            programs: &self.tool_config.programs,
            jobs: self.tool_config.jobs(),
        }
    }

    /// Plan the build without running anything.
    ///
    /// Header libraries without a build system get an empty plan.
    pub fn build_plan(&self) -> Result<BuildPlan> {
        if self.recipe.is_header_library() && self.recipe.build.system.is_none() {
            return Ok(BuildPlan::new("none"));
        }
        let registry = BuildSystemRegistry::new();
        let ctx = self.build_context();
        let system = registry.select(&ctx)?;
        Ok(system.configure(&ctx)?)
    }

    /// Fetch, extract and patch sources.
    pub fn source(&mut self) -> Result<()> {
        self.hook("source", Stage::Unconfigured, Stage::Sourced, |p| {
            let cache_dir = p.tool_config.cache_dir();
            let ctx = SourceContext {
                recipe: p.recipe,
                config: &p.config,
                cache_dir: &cache_dir,
                programs: &p.tool_config.programs,
                runner: p.runner,
            };
            source::retrieve(&ctx, &p.layout.source)?;
            Ok(())
        })
    }

    /// Plan the build and run the configure phase.
    pub fn generate(&mut self) -> Result<()> {
        let plan = self.hook("generate", Stage::Sourced, Stage::Configured, |p| {
            let plan = p.build_plan()?;
            adapters::execute_phase(&plan, BuildPhase::Configure, p.runner)?;
            Ok(plan)
        })?;
        self.plan = Some(plan);
        Ok(())
    }

    /// Run the build and install phases.
    pub fn build(&mut self) -> Result<BuildArtifacts> {
        self.hook("build", Stage::Configured, Stage::Built, |p| {
            let plan = p
                .plan
                .as_ref()
                .ok_or_else(|| LifecycleError::OutOfOrder {
                    hook: "build",
                    expected: Stage::Configured,
                    actual: Stage::Sourced,
                })?;
            Ok(adapters::build(plan, p.runner, &p.layout.install)?)
        })
    }

    /// Copy outputs into the package folder and check the result.
    pub fn package(&mut self) -> Result<&PackageLayout> {
        let layout = self.hook("package", Stage::Built, Stage::Packaged, |p| {
            let ctx = PackageContext {
                recipe: p.recipe,
                config: &p.config,
                requirements: &p.requirements,
                source_dir: &p.layout.source,
                build_dir: &p.layout.build,
                install_dir: &p.layout.install,
                package_dir: &p.layout.package,
            };
            Ok(packager::package(&ctx)?)
        })?;
        Ok(self.package.insert(layout))
    }

    /// Consumption metadata. Only available once packaged.
    pub fn package_info(&self) -> Result<&CppInfo> {
        self.enter("package_info", Stage::Packaged)?;
        match &self.package {
            Some(layout) => Ok(&layout.cpp_info),
            None => Err(LifecycleError::OutOfOrder {
                hook: "package_info",
                expected: Stage::Packaged,
                actual: self.stage,
            }
            .into()),
        }
    }

    /// Run every remaining hook in order.
    pub fn run(&mut self) -> Result<PackageLayout> {
        self.source()?;
        self.generate()?;
        self.build()?;
        Ok(self.package()?.clone())
    }
}
