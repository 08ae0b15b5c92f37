//! Meson build system.

use super::{abs_path, join_paths, BuildContext, BuildPlan, BuildSystem, Definition, Invocation};
use crate::error::BuildError;
use crate::settings::BuildType;
use std::path::{Path, PathBuf};

pub struct MesonBuildSystem;

fn buildtype(bt: BuildType) -> &'static str {
    match bt {
        BuildType::Debug => "debug",
        BuildType::Release => "release",
        BuildType::RelWithDebInfo => "debugoptimized",
        BuildType::MinSizeRel => "minsize",
    }
}

fn meson_option(name: &str, value: &Definition) -> String {
    match value {
        Definition::Bool(b) => format!("-D{}={}", name, b),
        other => format!("-D{}={}", name, other),
    }
}

impl BuildSystem for MesonBuildSystem {
    fn name(&self) -> &'static str {
        "meson"
    }

    fn detects_source(&self, source_dir: &Path) -> bool {
        source_dir.join("meson.build").exists()
    }

    fn configure(&self, ctx: &BuildContext<'_>) -> Result<BuildPlan, BuildError> {
        let meson = ctx.programs.meson.as_str();
        let source_dir_abs = ctx.project_dir();
        let build_root_abs = abs_path(ctx.build_dir);
        let install_abs = abs_path(ctx.install_dir);

        let mut setup_args = vec![
            "setup".to_string(),
            build_root_abs.display().to_string(),
            source_dir_abs.display().to_string(),
            format!("--prefix={}", install_abs.display()),
            // Keep the package layout flat regardless of distro conventions
            "--libdir=lib".to_string(),
            "--bindir=bin".to_string(),
            "--includedir=include".to_string(),
        ];
        if let Some(bt) = ctx.build_type() {
            setup_args.push(format!("--buildtype={}", buildtype(bt)));
        }
        if let Some(shared) = ctx.shared() {
            let lib = if shared { "shared" } else { "static" };
            setup_args.push(format!("--default-library={}", lib));
        }
        if let Some(fpic) = ctx.fpic() {
            setup_args.push(format!("-Db_staticpic={}", fpic));
        }
        let pc_dirs: Vec<PathBuf> = ctx
            .dependency_dirs
            .iter()
            .map(|d| abs_path(&d.join("lib").join("pkgconfig")))
            .collect();
        if let Some(paths) = join_paths(&pc_dirs) {
            setup_args.push(format!("--pkg-config-path={}", paths));
        }
        for (name, value) in ctx.definitions() {
            setup_args.push(meson_option(&name, &value));
        }
        setup_args.extend(ctx.extra_args());

        let mut plan = BuildPlan::new(self.name());
        plan.env = ctx.base_env();
        plan.configure
            .push(Invocation::new(meson, setup_args, build_root_abs.clone()));
        plan.build.push(Invocation::new(
            meson,
            [
                "compile".to_string(),
                "-C".to_string(),
                build_root_abs.display().to_string(),
                "-j".to_string(),
                ctx.jobs.max(1).to_string(),
            ],
            build_root_abs.clone(),
        ));
        plan.install.push(Invocation::new(
            meson,
            ["install".to_string(), "-C".to_string(), build_root_abs.display().to_string()],
            build_root_abs,
        ));
        Ok(plan)
    }
}
