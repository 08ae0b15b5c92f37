//! Autotools (configure + make) build system.

use super::{abs_path, BuildContext, BuildPlan, BuildSystem, Definition, Invocation};
use crate::error::BuildError;
use crate::settings::BuildType;
use std::path::Path;

pub struct AutotoolsBuildSystem;

/// Translate one definition into a configure flag.
///
/// - `ftp = false` → `--disable-ftp`
/// - `with-zlib = true` → `--with-zlib`, `with-zlib = false` → `--without-zlib`
/// - `with-ssl = "/opt/ssl"` → `--with-ssl=/opt/ssl`
/// - `ca-bundle = "auto"` → `--with-ca-bundle=auto`
/// - `enable-debug = "yes"` → `--enable-debug=yes`
fn configure_flag(name: &str, value: &Definition) -> String {
    let name = name.trim_start_matches("--").replace('_', "-");
    if let Some(stem) = name.strip_prefix("with-") {
        return match value {
            Definition::Bool(true) => format!("--with-{}", stem),
            Definition::Bool(false) => format!("--without-{}", stem),
            other => format!("--with-{}={}", stem, other),
        };
    }
    if let Some(stem) = name.strip_prefix("enable-") {
        return match value {
            Definition::Bool(true) => format!("--enable-{}", stem),
            Definition::Bool(false) => format!("--disable-{}", stem),
            other => format!("--enable-{}={}", stem, other),
        };
    }
    match value {
        Definition::Bool(true) => format!("--enable-{}", name),
        Definition::Bool(false) => format!("--disable-{}", name),
        other => format!("--with-{}={}", name, other),
    }
}

fn compiler_flags(build_type: Option<BuildType>) -> Option<&'static str> {
    match build_type? {
        BuildType::Debug => Some("-g -O0"),
        BuildType::Release => Some("-O3 -DNDEBUG"),
        BuildType::RelWithDebInfo => Some("-g -O2 -DNDEBUG"),
        BuildType::MinSizeRel => Some("-Os -DNDEBUG"),
    }
}

impl BuildSystem for AutotoolsBuildSystem {
    fn name(&self) -> &'static str {
        "autotools"
    }

    fn detects_source(&self, source_dir: &Path) -> bool {
        source_dir.join("configure").exists() || source_dir.join("configure.ac").exists()
    }

    fn configure(&self, ctx: &BuildContext<'_>) -> Result<BuildPlan, BuildError> {
        let source_dir_abs = ctx.project_dir();
        let build_root_abs = abs_path(ctx.build_dir);
        let install_abs = abs_path(ctx.install_dir);
        let make = ctx.programs.make.as_str();

        let mut plan = BuildPlan::new(self.name());
        plan.env = ctx.base_env();

        if !source_dir_abs.join("configure").exists() && source_dir_abs.join("configure.ac").exists() {
            plan.configure.push(Invocation::new(
                ctx.programs.autoreconf.as_str(),
                ["-fiv"],
                source_dir_abs.clone(),
            ));
        }

        let mut configure_args = vec![format!("--prefix={}", install_abs.display())];
        match ctx.shared() {
            Some(true) => configure_args.extend(["--enable-shared".to_string(), "--disable-static".to_string()]),
            Some(false) => configure_args.extend(["--disable-shared".to_string(), "--enable-static".to_string()]),
            None => {}
        }
        match ctx.fpic() {
            Some(true) => configure_args.push("--with-pic".to_string()),
            Some(false) => configure_args.push("--without-pic".to_string()),
            None => {}
        }
        for (name, value) in ctx.definitions() {
            configure_args.push(configure_flag(&name, &value));
        }
        configure_args.extend(ctx.extra_args());

        if let Some(flags) = compiler_flags(ctx.build_type()) {
            plan.env.insert("CFLAGS".to_string(), flags.to_string());
            plan.env.insert("CXXFLAGS".to_string(), flags.to_string());
        }
        let includes: Vec<String> = ctx
            .dependency_dirs
            .iter()
            .map(|d| format!("-I{}", abs_path(&d.join("include")).display()))
            .collect();
        let libdirs: Vec<String> = ctx
            .dependency_dirs
            .iter()
            .map(|d| format!("-L{}", abs_path(&d.join("lib")).display()))
            .collect();
        if !includes.is_empty() {
            plan.env.insert("CPPFLAGS".to_string(), includes.join(" "));
            plan.env.insert("LDFLAGS".to_string(), libdirs.join(" "));
        }

        let configure_script = source_dir_abs.join("configure");
        plan.configure.push(Invocation::new(
            configure_script.display().to_string(),
            configure_args,
            build_root_abs.clone(),
        ));
        plan.build.push(Invocation::new(
            make,
            [format!("-j{}", ctx.jobs.max(1))],
            build_root_abs.clone(),
        ));
        plan.install
            .push(Invocation::new(make, ["install"], build_root_abs));
        Ok(plan)
    }
}

#[cfg(test)]
mod tests {
    use super::super::testutil::Fixture;
    use super::*;
    use crate::settings::{Arch, Os, Settings};

    const RECIPE: &str = r#"
[recipe]
name = "libcurl"
language = "c"

[options]
shared = { values = [true, false], default = false }
fPIC = { values = [true, false], default = true }
with_ftp = { values = [true, false], default = true }
with_ca_bundle = { values = [false, "auto", "ANY"], default = "auto" }

[build]
system = "autotools"
option_map = { with_ftp = "ftp", with_ca_bundle = "ca-bundle" }
definitions = { with_zlib = true, with_brotli = false, enable_debug = "yes" }
"#;

    #[test]
    fn flag_translation() {
        assert_eq!(configure_flag("ftp", &Definition::Bool(false)), "--disable-ftp");
        assert_eq!(configure_flag("ftp", &Definition::Bool(true)), "--enable-ftp");
        assert_eq!(configure_flag("with_zlib", &Definition::Bool(false)), "--without-zlib");
        assert_eq!(
            configure_flag("with-ssl", &Definition::Str("/opt/ssl".into())),
            "--with-ssl=/opt/ssl"
        );
        assert_eq!(
            configure_flag("ca-bundle", &Definition::Str("auto".into())),
            "--with-ca-bundle=auto"
        );
        assert_eq!(configure_flag("--enable-debug", &Definition::Str("yes".into())), "--enable-debug=yes");
    }

    #[test]
    fn configure_plan() {
        let settings = Settings::new(Os::Linux, Arch::X86_64)
            .with_build_type(crate::settings::BuildType::Debug);
        let fx = Fixture::new(RECIPE, &settings, &["with_ftp=False"]);
        let plan = AutotoolsBuildSystem.configure(&fx.ctx()).unwrap();

        // Source dir does not exist, so no autoreconf step
        assert_eq!(plan.configure.len(), 1);
        let configure = &plan.configure[0];
        assert_eq!(configure.program, "/work/src/configure");
        assert_eq!(configure.cwd, Path::new("/work/build"));
        for expected in [
            "--prefix=/work/install",
            "--disable-shared",
            "--enable-static",
            "--with-pic",
            "--disable-ftp",
            "--with-ca-bundle=auto",
            "--with-zlib",
            "--without-brotli",
            "--enable-debug=yes",
        ] {
            assert!(configure.args.iter().any(|a| a == expected), "missing {}", expected);
        }
        assert_eq!(plan.env["CFLAGS"], "-g -O0");
        assert_eq!(plan.env["CPPFLAGS"], "-I/deps/zlib/include");
        assert_eq!(plan.build[0].args, vec!["-j4"]);
        assert_eq!(plan.install[0].args, vec!["install"]);
    }

    #[test]
    fn autoreconf_when_only_configure_ac() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::write(dir.path().join("configure.ac"), "AC_INIT").unwrap();
        let mut fx = Fixture::new(RECIPE, &Settings::new(Os::Linux, Arch::X86_64), &["shared=True"]);
        fx.source = dir.path().to_path_buf();
        let plan = AutotoolsBuildSystem.configure(&fx.ctx()).unwrap();
        assert_eq!(plan.configure.len(), 2);
        assert_eq!(plan.configure[0].program, "autoreconf");
        assert_eq!(plan.configure[0].args, vec!["-fiv"]);
        let args = &plan.configure[1].args;
        assert!(args.iter().any(|a| a == "--enable-shared"));
        assert!(!args.iter().any(|a| a.contains("pic")));
    }
}
