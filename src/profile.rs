//! Build profiles: named settings and option overrides in a TOML file.
//!
//! ```toml
//! [settings]
//! os = "Linux"
//! arch = "x86_64"
//! compiler = "gcc"
//! "compiler.version" = 11
//! "compiler.libcxx" = "libstdc++11"
//! build_type = "Release"
//!
//! [options]
//! "*:shared" = false
//! "libcurl:with_ssl" = "openssl"
//! ```
//!
//! A profile is applied on top of detected or default settings; `-s` and
//! `-o` command line values are applied after it.

use crate::error::{ConfigError, SettingsError};
use crate::options::{OptionOverride, OptionOverrides};
use crate::settings::Settings;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Profile {
    pub settings: BTreeMap<String, toml::Value>,
    pub options: BTreeMap<String, toml::Value>,
    #[serde(skip)]
    pub path: Option<PathBuf>,
}

/// Scalar TOML value as a plain string (`11` → "11", `true` → "True").
fn scalar(value: &toml::Value) -> Option<String> {
    match value {
        toml::Value::String(s) => Some(s.clone()),
        toml::Value::Integer(i) => Some(i.to_string()),
        toml::Value::Float(f) => Some(f.to_string()),
        toml::Value::Boolean(true) => Some("True".to_string()),
        toml::Value::Boolean(false) => Some("False".to_string()),
        _ => None,
    }
}

impl Profile {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        let mut profile = Self::parse(&text).map_err(|reason| ConfigError::Parse {
            path: path.to_path_buf(),
            reason,
        })?;
        profile.path = Some(path.to_path_buf());
        log::debug!("Profile: loaded {}", path.display());
        Ok(profile)
    }

    pub fn parse(text: &str) -> Result<Self, String> {
        let profile: Profile = toml::from_str(text).map_err(|e| e.to_string())?;
        for (key, value) in profile.settings.iter().chain(profile.options.iter()) {
            if scalar(value).is_none() {
                return Err(format!("'{}' must be a string, number or boolean", key));
            }
        }
        Ok(profile)
    }

    /// Apply `[settings]` to `settings`.
    ///
    /// Keys are applied in sorted order, so `compiler` lands before its
    /// `compiler.*` subsettings.
    pub fn apply_to(&self, settings: &mut Settings) -> Result<(), SettingsError> {
        for (key, value) in &self.settings {
            let value = scalar(value).unwrap_or_default();
            settings.set(key, &value)?;
        }
        Ok(())
    }

    /// `[options]` as overrides (`name`, `pkg:name` or `*:name` keys).
    pub fn option_overrides(&self) -> OptionOverrides {
        self.options
            .iter()
            .filter_map(|(key, value)| {
                let value = scalar(value)?;
                OptionOverride::parse(&format!("{}={}", key, value))
            })
            .collect()
    }
}
