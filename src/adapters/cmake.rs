//! CMake build system.

use super::{abs_path, join_paths, BuildContext, BuildPlan, BuildSystem, Definition, Invocation};
use crate::error::BuildError;
use std::path::Path;

pub struct CmakeBuildSystem;

/// `-DNAME=value` with booleans as ON/OFF.
fn cache_var(name: &str, value: &Definition) -> String {
    match value {
        Definition::Bool(true) => format!("-D{}=ON", name),
        Definition::Bool(false) => format!("-D{}=OFF", name),
        other => format!("-D{}={}", name, other),
    }
}

fn on_off(b: bool) -> &'static str {
    if b {
        "ON"
    } else {
        "OFF"
    }
}

impl BuildSystem for CmakeBuildSystem {
    fn name(&self) -> &'static str {
        "cmake"
    }

    fn detects_source(&self, source_dir: &Path) -> bool {
        source_dir.join("CMakeLists.txt").exists()
    }

    fn configure(&self, ctx: &BuildContext<'_>) -> Result<BuildPlan, BuildError> {
        let cmake = ctx.programs.cmake.as_str();
        let source_dir_abs = ctx.project_dir();
        let build_root_abs = abs_path(ctx.build_dir);
        let install_abs = abs_path(ctx.install_dir);

        let mut configure_args = vec![
            "-S".to_string(),
            source_dir_abs.display().to_string(),
            "-B".to_string(),
            build_root_abs.display().to_string(),
            format!("-DCMAKE_INSTALL_PREFIX={}", install_abs.display()),
        ];
        if let Some(bt) = ctx.build_type() {
            configure_args.push(format!("-DCMAKE_BUILD_TYPE={}", bt));
        }
        if let Some(shared) = ctx.shared() {
            configure_args.push(format!("-DBUILD_SHARED_LIBS={}", on_off(shared)));
        }
        if let Some(fpic) = ctx.fpic() {
            configure_args.push(format!("-DCMAKE_POSITION_INDEPENDENT_CODE={}", on_off(fpic)));
        }
        let prefixes: Vec<_> = ctx.dependency_dirs.iter().map(|d| abs_path(d)).collect();
        if !prefixes.is_empty() {
            // CMake lists are ';'-separated on every platform
            let joined: Vec<String> = prefixes.iter().map(|p| p.display().to_string()).collect();
            configure_args.push(format!("-DCMAKE_PREFIX_PATH={}", joined.join(";")));
        }
        for (name, value) in ctx.definitions() {
            configure_args.push(cache_var(&name, &value));
        }
        configure_args.extend(ctx.extra_args());

        let mut build_cmd_args = vec!["--build".to_string(), build_root_abs.display().to_string()];
        let mut install_args = vec!["--install".to_string(), build_root_abs.display().to_string()];
        if let Some(bt) = ctx.build_type() {
            // Multi-config generators (Visual Studio, Xcode) need the config at build time
            build_cmd_args.extend(["--config".to_string(), bt.to_string()]);
            install_args.extend(["--config".to_string(), bt.to_string()]);
        }
        build_cmd_args.extend(["--parallel".to_string(), ctx.jobs.max(1).to_string()]);

        let mut plan = BuildPlan::new(self.name());
        plan.env = ctx.base_env();
        if let Some(paths) = join_paths(&prefixes) {
            plan.env.insert("CMAKE_PREFIX_PATH".to_string(), paths);
        }
        plan.configure
            .push(Invocation::new(cmake, configure_args, build_root_abs.clone()));
        plan.build
            .push(Invocation::new(cmake, build_cmd_args, build_root_abs.clone()));
        plan.install
            .push(Invocation::new(cmake, install_args, build_root_abs));
        Ok(plan)
    }
}
