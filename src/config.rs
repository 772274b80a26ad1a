use crate::heuristic_config::{
    validate_email_heuristics, validate_url_heuristics, EmailHeuristics, UrlHeuristics,
};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_PATH: &str = "phishguard.yaml";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub models_dir: PathBuf,
    pub data_dir: PathBuf,
    pub log_dir: PathBuf,
    pub url: UrlHeuristics,
    pub email: EmailHeuristics,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    pub enabled: bool,
    /// Inputs are cut to this many characters before they reach the detection log.
    pub input_truncate_chars: usize,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            input_truncate_chars: 100,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            models_dir: PathBuf::from("models"),
            data_dir: PathBuf::from("data"),
            log_dir: PathBuf::from("logs"),
            url: UrlHeuristics::default(),
            email: EmailHeuristics::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Config {
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read configuration: {}", path.display()))?;
        let config: Config = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse configuration: {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Loads `path` when it exists, otherwise falls back to the built-in defaults.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load_from_file(path)
        } else {
            log::warn!(
                "Configuration file not found: {}, using defaults",
                path.display()
            );
            Ok(Self::default())
        }
    }

    pub fn validate(&self) -> Result<()> {
        validate_url_heuristics(&self.url)?;
        validate_email_heuristics(&self.email)?;
        if self.logging.input_truncate_chars == 0 {
            anyhow::bail!("logging.input_truncate_chars must be at least 1");
        }
        Ok(())
    }

    pub fn write_default(path: &Path) -> Result<()> {
        let yaml = serde_yaml::to_string(&Self::default())?;
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create config directory: {}", parent.display())
                })?;
            }
        }
        fs::write(path, yaml)
            .with_context(|| format!("Failed to write configuration: {}", path.display()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_config_round_trips_through_yaml() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("phishguard.yaml");
        Config::write_default(&path).unwrap();

        let loaded = Config::load_from_file(&path).unwrap();
        assert_eq!(loaded, Config::default());
    }

    #[test]
    fn test_partial_config_keeps_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("partial.yaml");
        fs::write(
            &path,
            "models_dir: /opt/phishguard/models\nurl:\n  uncertainty_band:\n    lower: 0.2\n    upper: 0.8\n",
        )
        .unwrap();

        let config = Config::load_from_file(&path).unwrap();
        assert_eq!(config.models_dir, PathBuf::from("/opt/phishguard/models"));
        assert_eq!(config.url.uncertainty_band.lower, 0.2);
        assert_eq!(config.url.safe_domains.len(), 6);
        assert_eq!(config.email.keyword_floor, 0.6);
    }

    #[test]
    fn test_unknown_field_is_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.yaml");
        fs::write(&path, "modelz_dir: nowhere\n").unwrap();
        assert!(Config::load_from_file(&path).is_err());
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempdir().unwrap();
        let config = Config::load_or_default(&dir.path().join("absent.yaml")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_invalid_band_fails_to_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("band.yaml");
        fs::write(
            &path,
            "url:\n  uncertainty_band:\n    lower: 0.9\n    upper: 0.1\n",
        )
        .unwrap();
        assert!(Config::load_from_file(&path).is_err());
    }
}
