//! Integration tests for recipe.
//!
//! Uses tempdir to build an isolated catalog with a local source archive.
//! External tools are never run: a recording runner fakes the files the
//! install step would produce.

use flate2::write::GzEncoder;
use flate2::Compression;
use recipe_lib::adapters::Invocation;
use recipe_lib::error::{BuildError, PackagingError, SourceError};
use recipe_lib::options::OptionOverride;
use recipe_lib::settings::{Arch, BuildType, Compiler, CompilerKind, Os};
use recipe_lib::source::sha256_file;
use recipe_lib::{
    Catalog, Config, Layout, OptionOverrides, Pipeline, Profile, RecipeError, RecordingRunner, Settings, Stage,
};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const RECIPE: &str = r#"
[recipe]
name = "demo"
license = "MIT"
language = "c"

[options]
shared = { values = [true, false], default = false }
fPIC = { values = [true, false], default = true }
with_tools = { values = [true, false], default = false }

[validate]
supported_os = ["Linux", "Macos", "Windows"]

[[requires]]
ref = "zlib/[>=1.2.11 <2]"

[[tool_requires]]
ref = "cmake/[>=3.15]"

[build]
system = "cmake"
option_map = { with_tools = "DEMO_BUILD_TOOLS" }

[package]
remove = ["lib/cmake"]

[package_info]
libs = ["demo"]
cmake_file_name = "Demo"
"#;

/// Write a tar.gz with one top-level directory.
fn source_archive(path: &Path) {
    let file = fs::File::create(path).unwrap();
    let mut builder = tar::Builder::new(GzEncoder::new(file, Compression::default()));
    let files = [
        ("demo-1.0.0/CMakeLists.txt", "project(demo C)\nadd_library(demo demo.c)\n"),
        ("demo-1.0.0/demo.c", "int demo(void) { return 1; }\n"),
        ("demo-1.0.0/include/demo.h", "int demo(void);\n"),
        ("demo-1.0.0/LICENSE", "MIT License\n"),
    ];
    for (name, text) in files {
        let mut header = tar::Header::new_gnu();
        header.set_size(text.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder.append_data(&mut header, name, text.as_bytes()).unwrap();
    }
    builder.into_inner().unwrap().finish().unwrap();
}

/// Catalog root with one recipe `demo/1.0.0` whose source is a local archive.
fn create_catalog(dir: &Path, sha256: Option<&str>) -> PathBuf {
    let archive = dir.join("demo-1.0.0.tar.gz");
    source_archive(&archive);
    let sha = sha256
        .map(str::to_string)
        .unwrap_or_else(|| sha256_file(&archive).unwrap());

    let root = dir.join("recipes");
    let folder = root.join("demo").join("all");
    fs::create_dir_all(&folder).unwrap();
    fs::write(
        root.join("demo").join("config.yml"),
        "versions:\n  \"1.0.0\":\n    folder: all\n",
    )
    .unwrap();
    fs::write(folder.join("recipe.toml"), RECIPE).unwrap();
    fs::write(
        folder.join("conandata.yml"),
        format!(
            "sources:\n  \"1.0.0\":\n    url: \"file://{}\"\n    sha256: \"{}\"\n",
            archive.display(),
            sha
        ),
    )
    .unwrap();
    root
}

/// Runner that writes a static library and header when cmake installs.
fn fake_install(install: PathBuf, lib_name: &'static str) -> RecordingRunner {
    RecordingRunner::new().with_hook(move |inv: &Invocation| {
        if inv.args.first().map(String::as_str) == Some("--install") {
            fs::create_dir_all(install.join("include"))?;
            fs::create_dir_all(install.join("lib").join("cmake"))?;
            fs::write(install.join("include").join("demo.h"), "int demo(void);\n")?;
            fs::write(install.join("lib").join(lib_name), "!<arch>\n")?;
            fs::write(install.join("lib").join("cmake").join("demo-config.cmake"), "")?;
        }
        Ok(())
    })
}

fn linux_gcc() -> Settings {
    Settings::new(Os::Linux, Arch::X86_64)
        .with_build_type(BuildType::Release)
        .with_compiler(Compiler::new(CompilerKind::Gcc).with_version("13"))
}

fn overrides(items: &[&str]) -> OptionOverrides {
    items.iter().filter_map(|s| OptionOverride::parse(s)).collect()
}

fn tool_config(dir: &Path) -> Config {
    Config {
        cache_dir: Some(dir.join("cache")),
        jobs: Some(2),
        ..Default::default()
    }
}

#[test]
fn test_create_static_package() {
    let tmp = TempDir::new().unwrap();
    let root = create_catalog(tmp.path(), None);
    let catalog = Catalog::scan(&[root]).unwrap();
    let recipe = catalog.load("demo", None).unwrap();
    assert_eq!(recipe.reference(), "demo/1.0.0");

    let config = tool_config(tmp.path());
    let layout = Layout::new(&tmp.path().join("work"));
    let runner = fake_install(layout.install.clone(), "libdemo.a");
    let ovs = overrides(&["demo:with_tools=True"]);
    let mut pipeline = Pipeline::new(&recipe, &linux_gcc(), &ovs, layout, &config, &runner).unwrap();

    let package = pipeline.run().unwrap();
    assert_eq!(pipeline.stage(), Stage::Packaged);

    let calls = runner.calls();
    assert_eq!(calls.len(), 3);
    assert!(calls.iter().all(|c| c.program == "cmake"));
    assert!(calls[0].args.contains(&"-DDEMO_BUILD_TOOLS=ON".to_string()));
    assert!(calls[0].args.contains(&"-DBUILD_SHARED_LIBS=OFF".to_string()));
    assert!(calls[1].args.contains(&"--parallel".to_string()));
    assert_eq!(calls[2].args[0], "--install");

    let root = &package.root;
    assert!(root.join("include/demo.h").is_file());
    assert!(root.join("lib/libdemo.a").is_file());
    assert!(root.join("licenses/LICENSE").is_file());
    assert!(!root.join("lib/cmake").exists());
    assert!(root.join("package_info.json").is_file());
    assert!(root.join("conaninfo.json").is_file());

    let info = pipeline.package_info().unwrap();
    assert_eq!(info.libs, vec!["demo"]);
    assert_eq!(info.cmake_file_name, "Demo");
    assert_eq!(info.lib_dirs, vec!["lib"]);

    // Tool requirements do not change the id, regular ones do
    assert!(package.info.requires.iter().any(|r| r.starts_with("zlib/")));
    assert!(!package.info.requires.iter().any(|r| r.starts_with("cmake/")));
    assert_eq!(package.package_id().len(), 40);

    // Source archive is cached by checksum
    assert!(tmp.path().join("cache").join("downloads").is_dir());
}

#[test]
fn test_shared_build_missing_artifact() {
    let tmp = TempDir::new().unwrap();
    let root = create_catalog(tmp.path(), None);
    let recipe = Catalog::scan(&[root]).unwrap().load("demo", None).unwrap();

    let config = tool_config(tmp.path());
    let layout = Layout::new(&tmp.path().join("work"));
    // Install produces only a static archive
    let runner = fake_install(layout.install.clone(), "libdemo.a");
    let ovs = overrides(&["shared=True"]);
    let mut pipeline = Pipeline::new(&recipe, &linux_gcc(), &ovs, layout, &config, &runner).unwrap();
    assert!(!pipeline.config().options.contains("fPIC"));

    let err = pipeline.run().unwrap_err();
    assert!(matches!(err, RecipeError::Hook { hook: "package", .. }));
    assert!(matches!(
        err.root(),
        RecipeError::Packaging(PackagingError::MissingArtifact { .. })
    ));
    assert_eq!(pipeline.stage(), Stage::Failed);
    assert!(pipeline.package_info().is_err());
    assert!(!pipeline.layout().package.exists());
}

#[test]
fn test_checksum_mismatch_stops_before_build() {
    let tmp = TempDir::new().unwrap();
    let bad = "0".repeat(64);
    let root = create_catalog(tmp.path(), Some(&bad));
    let recipe = Catalog::scan(&[root]).unwrap().load("demo", None).unwrap();

    let config = tool_config(tmp.path());
    let runner = RecordingRunner::new();
    let mut pipeline = Pipeline::new(
        &recipe,
        &linux_gcc(),
        &OptionOverrides::new(),
        Layout::new(&tmp.path().join("work")),
        &config,
        &runner,
    )
    .unwrap();

    let err = pipeline.run().unwrap_err();
    assert!(matches!(
        err.root(),
        RecipeError::Source(SourceError::ChecksumMismatch { .. })
    ));
    assert!(runner.calls().is_empty());
    assert_eq!(pipeline.stage(), Stage::Failed);
}

#[test]
fn test_unsupported_configuration_fails_fast() {
    let tmp = TempDir::new().unwrap();
    let root = create_catalog(tmp.path(), None);
    let recipe = Catalog::scan(&[root]).unwrap().load("demo", None).unwrap();

    let config = tool_config(tmp.path());
    let runner = RecordingRunner::new();
    let settings = Settings::new(Os::Android, Arch::Armv8);
    let err = Pipeline::new(
        &recipe,
        &settings,
        &OptionOverrides::new(),
        Layout::new(&tmp.path().join("work")),
        &config,
        &runner,
    )
    .err()
    .unwrap();

    assert!(err.is_configuration());
    assert!(err.to_string().contains("demo/1.0.0"));
    assert!(runner.calls().is_empty());
    assert!(!tmp.path().join("work").exists());
}

#[test]
fn test_build_failure_is_terminal() {
    let tmp = TempDir::new().unwrap();
    let root = create_catalog(tmp.path(), None);
    let recipe = Catalog::scan(&[root]).unwrap().load("demo", None).unwrap();

    let config = tool_config(tmp.path());
    let runner = RecordingRunner::new().failing_on("cmake");
    let mut pipeline = Pipeline::new(
        &recipe,
        &linux_gcc(),
        &OptionOverrides::new(),
        Layout::new(&tmp.path().join("work")),
        &config,
        &runner,
    )
    .unwrap();

    pipeline.source().unwrap();
    let err = pipeline.generate().unwrap_err();
    assert!(matches!(
        err.root(),
        RecipeError::Build(BuildError::CommandFailed { code: Some(1), .. })
    ));
    // Configure failed once, nothing retried
    assert_eq!(runner.calls().len(), 1);
    assert!(pipeline.build().is_err());
    assert_eq!(runner.calls().len(), 1);
}

#[test]
fn test_profile_and_config_files() {
    let tmp = TempDir::new().unwrap();
    let root = create_catalog(tmp.path(), None);

    let config_path = tmp.path().join("config.toml");
    fs::write(
        &config_path,
        format!(
            "recipes_path = [\"{}\"]\ncache_dir = \"{}\"\n\n[programs]\ncmake = \"/opt/cmake/bin/cmake\"\n",
            root.display(),
            tmp.path().join("cache").display()
        ),
    )
    .unwrap();
    let config = Config::from_file(&config_path).unwrap();
    assert_eq!(config.programs.cmake, "/opt/cmake/bin/cmake");

    let profile_path = tmp.path().join("windows.toml");
    fs::write(
        &profile_path,
        "[settings]\nos = \"Windows\"\narch = \"x86_64\"\ncompiler = \"msvc\"\n\"compiler.version\" = \"193\"\nbuild_type = \"Debug\"\n\n[options]\n\"demo:shared\" = true\n",
    )
    .unwrap();
    let profile = Profile::load(&profile_path).unwrap();
    let mut settings = Settings::new(Os::Linux, Arch::X86_64);
    profile.apply_to(&mut settings).unwrap();
    assert_eq!(settings.os, Os::Windows);

    let catalog = Catalog::scan(&config.recipes_path).unwrap();
    let recipe = catalog.load("demo", Some("1.0.0")).unwrap();
    let runner = RecordingRunner::new();
    let pipeline = Pipeline::new(
        &recipe,
        &settings,
        &profile.option_overrides(),
        Layout::new(&tmp.path().join("work")),
        &config,
        &runner,
    )
    .unwrap();

    assert!(pipeline.config().is_shared());
    // fPIC is removed on Windows
    assert!(!pipeline.config().options.contains("fPIC"));
    let plan = pipeline.build_plan().unwrap();
    assert_eq!(plan.configure[0].program, "/opt/cmake/bin/cmake");
    assert!(plan.build[0].args.contains(&"Debug".to_string()));
    assert!(runner.calls().is_empty());
}

fn demo_catalog() -> Catalog {
    let root = Path::new(env!("CARGO_MANIFEST_DIR")).join("recipes");
    Catalog::scan(&[root]).unwrap()
}

#[test]
fn test_demo_catalog_recipes() {
    let catalog = demo_catalog();
    assert_eq!(catalog.names(), vec!["libcurl", "spdlog", "zlib"]);
    assert!(catalog.warnings().is_empty());

    for name in catalog.names() {
        for version in catalog.versions(name).unwrap() {
            let recipe = catalog.load(name, Some(&version)).unwrap();
            let config = recipe_lib::resolver::resolve(&recipe, &linux_gcc(), &Default::default()).unwrap();
            recipe_lib::requirements::declare(&recipe, &config).unwrap();
        }
    }
}

#[test]
fn test_demo_libcurl_ssl_backends() {
    let catalog = demo_catalog();
    let recipe = catalog.load("libcurl", None).unwrap();
    let config = tool_config(Path::new("/nonexistent"));
    let runner = RecordingRunner::new();
    let layout = || Layout::new(Path::new("/tmp/recipe-demo"));

    let linux = Pipeline::new(&recipe, &linux_gcc(), &OptionOverrides::new(), layout(), &config, &runner).unwrap();
    assert!(linux.requirements().iter().any(|r| r.name() == "openssl"));
    assert!(linux.config().options.contains("with_ca_bundle"));

    let mac = Settings::new(Os::Macos, Arch::Armv8).with_compiler(Compiler::new(CompilerKind::AppleClang).with_version("15"));
    let mac = Pipeline::new(&recipe, &mac, &OptionOverrides::new(), layout(), &config, &runner).unwrap();
    assert_eq!(mac.config().options.get("with_ssl").map(|v| v.to_string()).as_deref(), Some("darwinssl"));
    assert!(!mac.requirements().iter().any(|r| r.name() == "openssl"));
    let plan = mac.build_plan().unwrap();
    assert!(plan.configure[0].args.contains(&"-DCURL_USE_SECTRANSP=ON".to_string()));

    let err = Pipeline::new(&recipe, &linux_gcc(), &overrides(&["libcurl:with_ssl=schannel"]), layout(), &config, &runner)
        .err()
        .unwrap();
    assert!(err.is_configuration());
    assert!(runner.calls().is_empty());
}

#[test]
fn test_demo_spdlog_versioned_requirements() {
    let catalog = demo_catalog();
    let old = catalog.load("spdlog", Some("1.9.2")).unwrap();
    let new = catalog.load("spdlog", None).unwrap();
    assert_eq!(new.version, "1.12.0");

    let fmt_pin = |recipe: &recipe_lib::Recipe| {
        let config = recipe_lib::resolver::resolve(recipe, &linux_gcc(), &Default::default()).unwrap();
        let reqs = recipe_lib::requirements::declare(recipe, &config).unwrap();
        assert_eq!(reqs.len(), 1);
        reqs[0].reference.to_string()
    };
    assert_eq!(fmt_pin(&old), "fmt/8.0.1");
    assert_eq!(fmt_pin(&new), "fmt/9.1.0");

    let mut ovs = std::collections::BTreeMap::new();
    ovs.insert("header_only".to_string(), "True".to_string());
    let config = recipe_lib::resolver::resolve(&new, &linux_gcc(), &ovs).unwrap();
    assert!(!config.options.contains("shared"));
    assert!(!config.options.contains("fPIC"));
}
