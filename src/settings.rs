//! Build settings: os, arch, compiler and build type.
//!
//! Settings are supplied from outside a recipe (host detection, a profile,
//! `-s key=value` flags) and never mutated by resolution. The resolver works
//! on a copy and prunes fields that do not apply (see
//! [`Settings::without_cpp`]).
//!
//! # Keys
//!
//! | key               | example          |
//! |-------------------|------------------|
//! | `os`              | `Linux`          |
//! | `arch`            | `x86_64`         |
//! | `compiler`        | `gcc`            |
//! | `compiler.version`| `11`             |
//! | `compiler.libcxx` | `libstdc++11`    |
//! | `compiler.cppstd` | `17`             |
//! | `compiler.runtime`| `dynamic`        |
//! | `build_type`      | `Release`        |

use crate::error::SettingsError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Declares a closed settings enum with canonical names and aliases.
///
/// Parsing is case-insensitive; serde goes through the same table so recipe
/// files accept `linux` as well as `Linux`.
macro_rules! setting_enum {
    (
        $(#[$meta:meta])*
        $name:ident, $key:literal {
            $( $variant:ident => $canon:literal $(| $alias:literal)* ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub enum $name {
            $( $variant ),+
        }

        impl $name {
            /// All variants in declaration order.
            pub const ALL: &'static [$name] = &[$( $name::$variant ),+];

            /// Canonical name.
            pub fn as_str(self) -> &'static str {
                match self {
                    $( $name::$variant => $canon ),+
                }
            }
        }

        impl FromStr for $name {
            type Err = SettingsError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let s = s.trim();
                $(
                    if s.eq_ignore_ascii_case($canon) $(|| s.eq_ignore_ascii_case($alias))* {
                        return Ok($name::$variant);
                    }
                )+
                Err(SettingsError::InvalidValue {
                    key: $key.to_string(),
                    value: s.to_string(),
                })
            }
        }

        impl TryFrom<String> for $name {
            type Error = SettingsError;

            fn try_from(s: String) -> Result<Self, Self::Error> {
                s.parse()
            }
        }

        impl From<$name> for String {
            fn from(v: $name) -> String {
                v.as_str().to_string()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

setting_enum! {
    /// Target operating system.
    Os, "os" {
        Windows => "Windows",
        Linux => "Linux",
        Macos => "Macos" | "macOS" | "darwin",
        FreeBSD => "FreeBSD",
        Android => "Android",
        Ios => "iOS",
        Tvos => "tvOS",
        Watchos => "watchOS",
        Emscripten => "Emscripten",
    }
}

setting_enum! {
    /// Target architecture.
    Arch, "arch" {
        X86 => "x86" | "i686",
        X86_64 => "x86_64" | "amd64" | "x64",
        Armv7 => "armv7" | "arm",
        Armv8 => "armv8" | "aarch64" | "arm64",
        Ppc64le => "ppc64le",
        S390x => "s390x",
        Riscv64 => "riscv64",
        Wasm => "wasm",
    }
}

setting_enum! {
    /// Compiler family.
    CompilerKind, "compiler" {
        Gcc => "gcc",
        Clang => "clang",
        AppleClang => "apple-clang",
        Msvc => "msvc" | "Visual Studio",
        IntelCc => "intel-cc",
    }
}

setting_enum! {
    /// Build configuration.
    BuildType, "build_type" {
        Debug => "Debug",
        Release => "Release",
        RelWithDebInfo => "RelWithDebInfo",
        MinSizeRel => "MinSizeRel",
    }
}

impl Os {
    /// macOS, iOS, tvOS, watchOS.
    pub fn is_apple(self) -> bool {
        matches!(self, Os::Macos | Os::Ios | Os::Tvos | Os::Watchos)
    }

    /// Host OS from `std::env::consts::OS`.
    pub fn host() -> Option<Self> {
        match std::env::consts::OS {
            "windows" => Some(Os::Windows),
            "linux" => Some(Os::Linux),
            "macos" => Some(Os::Macos),
            "freebsd" => Some(Os::FreeBSD),
            "android" => Some(Os::Android),
            "ios" => Some(Os::Ios),
            _ => None,
        }
    }
}

impl Arch {
    /// Host arch from `std::env::consts::ARCH`.
    pub fn host() -> Option<Self> {
        match std::env::consts::ARCH {
            "x86" => Some(Arch::X86),
            "x86_64" => Some(Arch::X86_64),
            "arm" => Some(Arch::Armv7),
            "aarch64" => Some(Arch::Armv8),
            "powerpc64" => Some(Arch::Ppc64le),
            "s390x" => Some(Arch::S390x),
            "riscv64" => Some(Arch::Riscv64),
            "wasm32" => Some(Arch::Wasm),
            _ => None,
        }
    }
}

/// Compiler setting with its subsettings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Compiler {
    pub kind: CompilerKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub libcxx: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cppstd: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub runtime: Option<String>,
}

impl Compiler {
    pub fn new(kind: CompilerKind) -> Self {
        Self {
            kind,
            version: None,
            libcxx: None,
            cppstd: None,
            runtime: None,
        }
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }
}

/// The settings context for one build.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Settings {
    pub os: Os,
    pub arch: Arch,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compiler: Option<Compiler>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build_type: Option<BuildType>,
}

impl Settings {
    pub fn new(os: Os, arch: Arch) -> Self {
        Self {
            os,
            arch,
            compiler: None,
            build_type: None,
        }
    }

    pub fn with_compiler(mut self, compiler: Compiler) -> Self {
        self.compiler = Some(compiler);
        self
    }

    pub fn with_build_type(mut self, build_type: BuildType) -> Self {
        self.build_type = Some(build_type);
        self
    }

    /// Settings for the running host.
    ///
    /// Compiler family follows the platform default (msvc on Windows,
    /// apple-clang on Apple, gcc elsewhere); its version is left unset.
    pub fn detect() -> Self {
        let os = Os::host().unwrap_or(Os::Linux);
        let arch = Arch::host().unwrap_or(Arch::X86_64);
        let kind = match os {
            Os::Windows => CompilerKind::Msvc,
            o if o.is_apple() => CompilerKind::AppleClang,
            Os::FreeBSD => CompilerKind::Clang,
            _ => CompilerKind::Gcc,
        };
        log::debug!("Settings: detected host os={} arch={} compiler={}", os, arch, kind);
        Settings::new(os, arch)
            .with_compiler(Compiler::new(kind))
            .with_build_type(BuildType::Release)
    }

    /// Apply one `key=value` assignment.
    ///
    /// Setting `compiler` to a different family clears its subsettings.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), SettingsError> {
        let key = key.trim();
        let value = value.trim();
        match key {
            "os" => self.os = value.parse()?,
            "arch" => self.arch = value.parse()?,
            "build_type" => self.build_type = Some(value.parse()?),
            "compiler" => {
                let kind: CompilerKind = value.parse()?;
                if self.compiler.as_ref().map(|c| c.kind) != Some(kind) {
                    self.compiler = Some(Compiler::new(kind));
                }
            }
            sub if sub.starts_with("compiler.") => {
                let compiler = self
                    .compiler
                    .as_mut()
                    .ok_or_else(|| SettingsError::MissingCompiler { key: sub.to_string() })?;
                let slot = match &sub["compiler.".len()..] {
                    "version" => &mut compiler.version,
                    "libcxx" => &mut compiler.libcxx,
                    "cppstd" => &mut compiler.cppstd,
                    "runtime" => &mut compiler.runtime,
                    _ => return Err(SettingsError::UnknownKey(sub.to_string())),
                };
                *slot = if value.is_empty() { None } else { Some(value.to_string()) };
            }
            other => return Err(SettingsError::UnknownKey(other.to_string())),
        }
        Ok(())
    }

    /// Apply a `key=value` string (as given to `-s`).
    pub fn apply_assignment(&mut self, assignment: &str) -> Result<(), SettingsError> {
        let (key, value) = assignment
            .split_once('=')
            .ok_or_else(|| SettingsError::BadAssignment(assignment.to_string()))?;
        self.set(key, value)
    }

    /// Copy without C++-only subsettings (`compiler.libcxx`, `compiler.cppstd`).
    pub fn without_cpp(&self) -> Self {
        let mut copy = self.clone();
        if let Some(c) = copy.compiler.as_mut() {
            c.libcxx = None;
            c.cppstd = None;
        }
        copy
    }

    pub fn compiler_kind(&self) -> Option<CompilerKind> {
        self.compiler.as_ref().map(|c| c.kind)
    }

    pub fn compiler_version(&self) -> Option<&str> {
        self.compiler.as_ref().and_then(|c| c.version.as_deref())
    }

    pub fn cppstd(&self) -> Option<&str> {
        self.compiler.as_ref().and_then(|c| c.cppstd.as_deref())
    }

    pub fn is_debug(&self) -> bool {
        self.build_type == Some(BuildType::Debug)
    }

    /// Flattened `key=value` pairs in a stable order.
    pub fn to_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = vec![
            ("os".to_string(), self.os.to_string()),
            ("arch".to_string(), self.arch.to_string()),
        ];
        if let Some(c) = &self.compiler {
            pairs.push(("compiler".to_string(), c.kind.to_string()));
            let subs = [
                ("compiler.version", &c.version),
                ("compiler.libcxx", &c.libcxx),
                ("compiler.cppstd", &c.cppstd),
                ("compiler.runtime", &c.runtime),
            ];
            for (key, value) in subs {
                if let Some(v) = value {
                    pairs.push((key.to_string(), v.clone()));
                }
            }
        }
        if let Some(bt) = self.build_type {
            pairs.push(("build_type".to_string(), bt.to_string()));
        }
        pairs
    }
}

impl fmt::Display for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .to_pairs()
            .into_iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect();
        f.write_str(&parts.join(", "))
    }
}

/// Order C++ standards: `98 < 11 < 14 < 17 < 20 < 23`, `gnu17 == 17`.
pub fn cppstd_rank(std: &str) -> Option<u32> {
    let digits = std.trim().trim_start_matches("gnu");
    let n: u32 = digits.parse().ok()?;
    Some(if n >= 98 { 1900 + n } else { 2000 + n })
}
