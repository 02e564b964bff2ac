//! Expansion Configuration
//!
//! Feature flags and module locations for an expansion run.
//!
//! ## Priority Order (highest to lowest)
//!
//! 1. CLI flags
//! 2. Environment variables (`MODEX_DISABLE_IMPLICIT_CONFIG`, `MODEX_ENABLE_DYNAMIC_CONFIG_REF`)
//! 3. Config file (`modex.yaml`)
//! 4. Defaults

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::Result;

pub const ENV_DISABLE_IMPLICIT_CONFIG: &str = "MODEX_DISABLE_IMPLICIT_CONFIG";
pub const ENV_DYNAMIC_CONFIG_REF: &str = "MODEX_ENABLE_DYNAMIC_CONFIG_REF";

/// Booleans consulted by the expander.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub struct FeatureFlags {
    /// Never synthesize an implicit `config` element
    #[serde(default)]
    pub disable_implicit_config: bool,

    /// Expression-valued config-refs skip literal property extraction
    #[serde(default)]
    pub dynamic_config_ref: bool,
}

impl FeatureFlags {
    /// Overlay flags set in the environment.
    pub fn with_env(self) -> Self {
        self.with_vars(|key| std::env::var(key).ok())
    }

    fn with_vars(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(value) = lookup(ENV_DISABLE_IMPLICIT_CONFIG) {
            self.disable_implicit_config = parse_switch(&value);
        }
        if let Some(value) = lookup(ENV_DYNAMIC_CONFIG_REF) {
            self.dynamic_config_ref = parse_switch(&value);
        }
        self
    }
}

fn parse_switch(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

/// Contents of a `modex.yaml` file
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct ExpansionConfig {
    #[serde(default)]
    pub flags: FeatureFlags,

    /// Module documents or directories holding `*.module.yaml` files
    #[serde(default)]
    pub modules: Vec<PathBuf>,

    /// Namespaces of native (non-expandable) connectors
    #[serde(default)]
    pub native: Vec<String>,
}

impl ExpansionConfig {
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Load from file. Relative module paths resolve against the file's directory.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        let mut config = Self::from_yaml(&content)?;

        if let Some(base) = path.parent() {
            config.modules = config
                .modules
                .into_iter()
                .map(|m| if m.is_relative() { base.join(m) } else { m })
                .collect();
        }
        Ok(config)
    }

    pub fn with_env(mut self) -> Self {
        self.flags = self.flags.with_env();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_default_off() {
        let flags = FeatureFlags::default();
        assert!(!flags.disable_implicit_config);
        assert!(!flags.dynamic_config_ref);
    }

    #[test]
    fn test_parse_config_yaml() {
        let yaml = r#"
flags:
  disable-implicit-config: true
modules:
  - modules/
native: [http, db]
"#;
        let config = ExpansionConfig::from_yaml(yaml).unwrap();
        assert!(config.flags.disable_implicit_config);
        assert!(!config.flags.dynamic_config_ref);
        assert_eq!(config.modules, vec![PathBuf::from("modules/")]);
        assert_eq!(config.native, vec!["http", "db"]);
    }

    #[test]
    fn test_env_overrides_flags() {
        let flags = FeatureFlags::default().with_vars(|key| match key {
            ENV_DYNAMIC_CONFIG_REF => Some("TRUE".to_string()),
            ENV_DISABLE_IMPLICIT_CONFIG => Some("0".to_string()),
            _ => None,
        });
        assert!(flags.dynamic_config_ref);
        assert!(!flags.disable_implicit_config);
    }

    #[test]
    fn test_load_resolves_relative_modules() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("modex.yaml");
        fs::write(&path, "modules: [mods]\n").unwrap();

        let config = ExpansionConfig::load(&path).unwrap();
        assert_eq!(config.modules, vec![dir.path().join("mods")]);
    }
}
