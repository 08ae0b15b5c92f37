//! Benchmarks for option resolution, requirement declaration and catalog scanning.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use recipe_lib::package_id::package_id;
use recipe_lib::requirements::{declare, parse_range};
use recipe_lib::resolver::resolve;
use recipe_lib::settings::{Arch, BuildType, Compiler, CompilerKind, Os};
use recipe_lib::{Catalog, Recipe, Settings};
use std::collections::BTreeMap;
use std::fs;
use std::hint::black_box;
use std::path::Path;
use tempfile::TempDir;

/// Recipe with `n` boolean options, each with a set rule and a conditional requirement.
fn wide_recipe(n: usize) -> Recipe {
    let mut text = String::from(
        "[recipe]\nname = \"wide\"\nlicense = \"MIT\"\n\n[options]\nshared = { values = [true, false], default = false }\nfPIC = { values = [true, false], default = true }\n",
    );
    for i in 0..n {
        text.push_str(&format!("with_f{} = {{ values = [true, false], default = false }}\n", i));
    }
    for i in 0..n {
        text.push_str(&format!(
            "\n[[rules]]\naction = \"set\"\noption = \"with_f{}\"\nvalue = true\nwhen = {{ os = [\"Linux\"] }}\n",
            i
        ));
    }
    for i in 0..n {
        text.push_str(&format!(
            "\n[[requires]]\nref = \"dep{}/[>=1.{} <2]\"\nwhen = {{ enabled = [\"with_f{}\"] }}\n",
            i, i, i
        ));
    }
    Recipe::from_toml_str(&text, "1.0.0").unwrap()
}

fn settings() -> Settings {
    Settings::new(Os::Linux, Arch::X86_64)
        .with_build_type(BuildType::Release)
        .with_compiler(Compiler::new(CompilerKind::Gcc).with_version("13"))
}

/// Catalog root with `n` recipes, three versions each.
fn create_catalog(n: usize) -> TempDir {
    let dir = TempDir::new().unwrap();
    for i in 0..n {
        create_recipe(dir.path(), &format!("lib{}", i));
    }
    dir
}

fn create_recipe(root: &Path, name: &str) {
    let folder = root.join(name).join("all");
    fs::create_dir_all(&folder).unwrap();
    let mut config = String::from("versions:\n");
    for v in ["1.0.0", "1.1.0", "2.0.0"] {
        config.push_str(&format!("  \"{}\":\n    folder: all\n", v));
    }
    fs::write(root.join(name).join("config.yml"), config).unwrap();
    fs::write(folder.join("recipe.toml"), format!("[recipe]\nname = \"{}\"\n", name)).unwrap();
}

fn bench_resolve(c: &mut Criterion) {
    let mut group = c.benchmark_group("resolve");
    let settings = settings();
    let overrides = BTreeMap::new();

    for n in [5, 20, 50] {
        let recipe = wide_recipe(n);
        group.bench_with_input(BenchmarkId::new("options", n), &n, |b, _| {
            b.iter(|| black_box(resolve(&recipe, &settings, &overrides).unwrap()));
        });

        let config = resolve(&recipe, &settings, &overrides).unwrap();
        group.bench_with_input(BenchmarkId::new("declare", n), &n, |b, _| {
            b.iter(|| black_box(declare(&recipe, &config).unwrap()));
        });

        let reqs = declare(&recipe, &config).unwrap();
        group.bench_with_input(BenchmarkId::new("package_id", n), &n, |b, _| {
            b.iter(|| black_box(package_id(&recipe, &config, &reqs)));
        });
    }

    group.bench_function("parse_range", |b| {
        b.iter(|| black_box(parse_range(">=1.2 <2 || ~3.1").unwrap()));
    });

    group.finish();
}

fn bench_catalog(c: &mut Criterion) {
    let mut group = c.benchmark_group("catalog_scan");

    for size in [10, 100, 500] {
        let dir = create_catalog(size);
        let roots = vec![dir.path().to_path_buf()];

        group.bench_with_input(BenchmarkId::new("scan", size), &size, |b, _| {
            b.iter(|| black_box(Catalog::scan(&roots).unwrap()));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_resolve, bench_catalog);
criterion_main!(benches);
