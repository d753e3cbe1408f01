//! Configuration file support for srcscan.
//!
//! srcscan reads two configuration file locations:
//! - Global: `~/.srcscan/config.toml` - User-wide defaults
//! - Project: `.srcscan/config.toml` - Project-specific overrides
//!
//! Project config takes precedence over global config. A file passed with
//! `--config` replaces both.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::output::OutputFormat;
use crate::util::diagnostic::ConfigParseError;

/// srcscan configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Scanner settings
    pub scan: ScanConfig,

    /// Symbol filtering
    pub filter: FilterConfig,

    /// Output settings
    pub output: OutputConfig,
}

/// Scanner settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Glob patterns of headers whose `#define`s seed the macro table
    pub macro_files: Vec<String>,

    /// Macros defined before scanning, as with `-D NAME=VALUE`
    pub defines: BTreeMap<String, String>,

    /// Emit object-like macros as constants
    pub macro_scan: bool,
}

/// Which symbols to report.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    /// Only report symbols matching these names (supports `prefix*`)
    pub include: Vec<String>,

    /// Never report symbols matching these names (supports `prefix*`)
    pub exclude: Vec<String>,

    /// Prefix removed from reported names
    pub strip_prefix: Option<String>,
}

/// Output settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Default output format (json, text, xml)
    pub format: Option<String>,

    /// Indentation of XML elements
    pub self_indent: Option<usize>,
}

impl Config {
    /// Load configuration from a file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;

        toml::from_str(&contents).map_err(|e| {
            ConfigParseError::from_toml(path.display().to_string(), contents.clone(), &e).into()
        })
    }

    /// Load configuration with fallback to defaults if file doesn't exist.
    pub fn load_or_default(path: &Path) -> Self {
        if path.exists() {
            Self::load(path).unwrap_or_else(|e| {
                tracing::warn!("Failed to load config from {}: {}", path.display(), e);
                Self::default()
            })
        } else {
            Self::default()
        }
    }

    /// Merge another config into this one (other takes precedence).
    pub fn merge(&mut self, other: Config) {
        if !other.scan.macro_files.is_empty() {
            self.scan.macro_files = other.scan.macro_files;
        }
        self.scan.defines.extend(other.scan.defines);
        if other.scan.macro_scan {
            self.scan.macro_scan = true;
        }

        if !other.filter.include.is_empty() {
            self.filter.include = other.filter.include;
        }
        if !other.filter.exclude.is_empty() {
            self.filter.exclude = other.filter.exclude;
        }
        if other.filter.strip_prefix.is_some() {
            self.filter.strip_prefix = other.filter.strip_prefix;
        }

        if other.output.format.is_some() {
            self.output.format = other.output.format;
        }
        if other.output.self_indent.is_some() {
            self.output.self_indent = other.output.self_indent;
        }
    }

    /// Parse the output format from config string.
    pub fn format(&self) -> Option<OutputFormat> {
        self.output.format.as_ref().and_then(|s| s.parse().ok())
    }
}

/// Load merged configuration from global and project locations.
///
/// Order of precedence (highest to lowest):
/// 1. Project config (.srcscan/config.toml)
/// 2. Global config (~/.srcscan/config.toml)
/// 3. Defaults
pub fn load_config(global_path: &Path, project_path: &Path) -> Config {
    let mut config = Config::default();

    if global_path.exists() {
        config.merge(Config::load_or_default(global_path));
    }

    if project_path.exists() {
        config.merge(Config::load_or_default(project_path));
    }

    config
}

/// Get the global srcscan config directory (~/.srcscan).
pub fn global_config_dir() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|b| b.home_dir().join(".srcscan"))
}

/// Get the global config path (~/.srcscan/config.toml).
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("config.toml"))
}

/// Get the project config path (.srcscan/config.toml).
pub fn project_config_path(project_root: &Path) -> PathBuf {
    project_root.join(".srcscan").join("config.toml")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert!(config.scan.macro_files.is_empty());
        assert!(!config.scan.macro_scan);
        assert!(config.filter.strip_prefix.is_none());
        assert!(config.format().is_none());
    }

    #[test]
    fn test_config_load() {
        let tmp = TempDir::new().unwrap();
        let config_path = tmp.path().join("config.toml");

        std::fs::write(
            &config_path,
            r#"
[scan]
macro_files = ["include/*-config.h"]
macro_scan = true

[scan.defines]
G_BEGIN_DECLS = ""
GLIB_VERSION = "2"

[filter]
include = ["g_*"]
strip_prefix = "g_"

[output]
format = "xml"
self_indent = 4
"#,
        )
        .unwrap();

        let config = Config::load(&config_path).unwrap();
        assert_eq!(config.scan.macro_files, vec!["include/*-config.h"]);
        assert!(config.scan.macro_scan);
        assert_eq!(config.scan.defines.get("GLIB_VERSION"), Some(&"2".to_string()));
        assert_eq!(config.filter.include, vec!["g_*"]);
        assert_eq!(config.filter.strip_prefix, Some("g_".to_string()));
        assert_eq!(config.format(), Some(OutputFormat::Xml));
        assert_eq!(config.output.self_indent, Some(4));
    }

    #[test]
    fn test_config_load_invalid() {
        let tmp = TempDir::new().unwrap();
        let config_path = tmp.path().join("config.toml");
        std::fs::write(&config_path, "[scan]\nmacro_scan = maybe\n").unwrap();

        let err = Config::load(&config_path).unwrap_err();
        assert!(err.downcast_ref::<ConfigParseError>().is_some());
        assert_eq!(Config::load_or_default(&config_path), Config::default());
    }

    #[test]
    fn test_config_merge() {
        let mut base = Config::default();
        base.filter.strip_prefix = Some("g_".to_string());
        base.scan.defines.insert("A".into(), "1".into());
        base.scan.defines.insert("B".into(), "1".into());

        let mut override_cfg = Config::default();
        override_cfg.filter.strip_prefix = Some("gtk_".to_string());
        override_cfg.scan.defines.insert("B".into(), "2".into());

        base.merge(override_cfg);

        assert_eq!(base.filter.strip_prefix, Some("gtk_".to_string()));
        assert_eq!(base.scan.defines.get("A"), Some(&"1".to_string()));
        assert_eq!(base.scan.defines.get("B"), Some(&"2".to_string()));
    }

    #[test]
    fn test_load_config_precedence() {
        let tmp = TempDir::new().unwrap();
        let global_path = tmp.path().join("global.toml");
        let project_path = tmp.path().join("project.toml");

        std::fs::write(
            &global_path,
            "[output]\nformat = \"text\"\nself_indent = 2\n",
        )
        .unwrap();
        std::fs::write(&project_path, "[output]\nformat = \"json\"\n").unwrap();

        let config = load_config(&global_path, &project_path);
        assert_eq!(config.format(), Some(OutputFormat::Json));
        assert_eq!(config.output.self_indent, Some(2));
    }
}
