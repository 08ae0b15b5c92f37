//! MSBuild (Visual Studio solutions and projects).
//!
//! There is no install step: outputs land in the build dir (`OutDir`) and the
//! recipe's `[[package.copy]]` rules pick them up from there.

use super::{abs_path, BuildContext, BuildPlan, BuildSystem, Definition, Invocation};
use crate::error::BuildError;
use crate::settings::{Arch, BuildType};
use std::path::{Path, MAIN_SEPARATOR};

pub struct MsbuildBuildSystem;

fn platform(arch: Arch) -> Result<&'static str, BuildError> {
    match arch {
        Arch::X86 => Ok("Win32"),
        Arch::X86_64 => Ok("x64"),
        Arch::Armv7 => Ok("ARM"),
        Arch::Armv8 => Ok("ARM64"),
        other => Err(BuildError::Config(format!("MSBuild has no platform for arch {}", other))),
    }
}

fn configuration(bt: Option<BuildType>) -> &'static str {
    match bt {
        Some(BuildType::Debug) => "Debug",
        _ => "Release",
    }
}

fn property(name: &str, value: &Definition) -> String {
    format!("/p:{}={}", name, value)
}

impl BuildSystem for MsbuildBuildSystem {
    fn name(&self) -> &'static str {
        "msbuild"
    }

    fn detects_source(&self, source_dir: &Path) -> bool {
        std::fs::read_dir(source_dir)
            .map(|entries| {
                entries.filter_map(|e| e.ok()).any(|e| {
                    e.path()
                        .extension()
                        .is_some_and(|ext| ext == "sln" || ext == "vcxproj")
                })
            })
            .unwrap_or(false)
    }

    fn configure(&self, ctx: &BuildContext<'_>) -> Result<BuildPlan, BuildError> {
        let project = ctx.recipe.build.project_file.as_deref().ok_or_else(|| {
            BuildError::Config("msbuild requires [build] project_file".to_string())
        })?;
        let project_abs = ctx.project_dir().join(project);
        let build_root_abs = abs_path(ctx.build_dir);

        let mut args = vec![
            project_abs.display().to_string(),
            format!("/p:Configuration={}", configuration(ctx.build_type())),
            format!("/p:Platform={}", platform(ctx.config.settings.arch)?),
            // OutDir must end with a separator
            format!("/p:OutDir={}{}", build_root_abs.display(), MAIN_SEPARATOR),
            format!("/m:{}", ctx.jobs.max(1)),
            "/nologo".to_string(),
        ];
        if let Some(runtime) = ctx
            .config
            .settings
            .compiler
            .as_ref()
            .and_then(|c| c.runtime.as_deref())
        {
            let lib = match (runtime, ctx.build_type()) {
                ("static", Some(BuildType::Debug)) => "MultiThreadedDebug",
                ("static", _) => "MultiThreaded",
                (_, Some(BuildType::Debug)) => "MultiThreadedDebugDLL",
                _ => "MultiThreadedDLL",
            };
            args.push(format!("/p:RuntimeLibrary={}", lib));
        }
        for (name, value) in ctx.definitions() {
            args.push(property(&name, &value));
        }
        args.extend(ctx.extra_args());

        let mut plan = BuildPlan::new(self.name());
        plan.env = ctx.base_env();
        plan.build.push(Invocation::new(
            ctx.programs.msbuild.as_str(),
            args,
            build_root_abs,
        ));
        Ok(plan)
    }
}

#[cfg(test)]
mod tests {
    use super::super::testutil::Fixture;
    use super::*;
    use crate::settings::{Compiler, CompilerKind, Os, Settings};

    const RECIPE: &str = r#"
[recipe]
name = "winlib"

[options]
shared = { values = [true, false], default = false }

[build]
system = "msbuild"
project_file = "build/winlib.sln"
option_map = { shared = "WinlibShared" }
"#;

    fn windows(arch: Arch) -> Settings {
        let mut compiler = Compiler::new(CompilerKind::Msvc).with_version("193");
        compiler.runtime = Some("static".to_string());
        Settings::new(Os::Windows, arch)
            .with_compiler(compiler)
            .with_build_type(BuildType::Debug)
    }

    #[test]
    fn build_invocation() {
        let fx = Fixture::new(RECIPE, &windows(Arch::X86_64), &[]);
        let plan = MsbuildBuildSystem.configure(&fx.ctx()).unwrap();
        assert!(plan.configure.is_empty());
        assert!(plan.install.is_empty());

        let inv = &plan.build[0];
        assert_eq!(inv.program, "msbuild");
        assert!(inv.args[0].ends_with("winlib.sln"));
        for expected in [
            "/p:Configuration=Debug",
            "/p:Platform=x64",
            "/m:4",
            "/p:RuntimeLibrary=MultiThreadedDebug",
            "/p:WinlibShared=false",
        ] {
            assert!(inv.args.iter().any(|a| a == expected), "missing {} in {:?}", expected, inv.args);
        }
    }

    #[test]
    fn platforms() {
        assert_eq!(platform(Arch::X86).unwrap(), "Win32");
        assert_eq!(platform(Arch::Armv8).unwrap(), "ARM64");
        assert!(platform(Arch::S390x).is_err());
    }

    #[test]
    fn missing_project_file() {
        let text = RECIPE.replace("project_file = \"build/winlib.sln\"\n", "");
        let fx = Fixture::new(&text, &windows(Arch::X86), &[]);
        assert!(matches!(
            MsbuildBuildSystem.configure(&fx.ctx()),
            Err(BuildError::Config(_))
        ));
    }
}
