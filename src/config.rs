use anyhow::{Context, Result, anyhow};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::refresh::MIN_INTERVAL;
use crate::sort::{SortColumn, SortDirection, SortState};

/// Application configuration
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Auto-refresh interval in milliseconds
    pub refresh_interval: u64,
    /// Start with auto-refresh enabled
    pub auto_refresh: bool,
    /// Initial filter query
    pub filter: String,
    /// Initial sort column name (see `SortColumn::from_name`)
    pub sort_column: Option<String>,
    pub sort_descending: bool,
    /// Mark every row as new on the very first refresh. When off, the first
    /// pass shows everything unchanged.
    pub highlight_first_refresh: bool,
    /// File the configuration was read from
    #[serde(skip)]
    pub config_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            refresh_interval: 3000,
            auto_refresh: false,
            filter: String::new(),
            sort_column: None,
            sort_descending: false,
            highlight_first_refresh: true,
            config_path: None,
        }
    }
}

impl Config {
    /// Load configuration from file. A missing file yields the defaults.
    pub fn load(path: Option<&str>) -> Result<Self> {
        let config_path = match path {
            Some(path) => PathBuf::from(path),
            None => Self::find_config_file()?,
        };

        if !config_path.exists() {
            if path.is_some() {
                return Err(anyhow!(
                    "Configuration file {} does not exist",
                    config_path.display()
                ));
            }
            return Ok(Config::default());
        }

        let mut config = Self::from_file(&config_path)?;
        config.config_path = Some(config_path);
        Ok(config)
    }

    fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Self::from_yaml(&content)
            .with_context(|| format!("Invalid configuration in {}", path.display()))
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        // An empty document is valid and means "all defaults"
        if content.trim().is_empty() {
            return Ok(Config::default());
        }
        let config: Config = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the command line would also refuse
    fn validate(&self) -> Result<()> {
        if self.refresh_interval() < MIN_INTERVAL {
            return Err(anyhow!(
                "refresh_interval must be at least {}ms, got {}ms",
                MIN_INTERVAL.as_millis(),
                self.refresh_interval
            ));
        }
        self.sort_state()?;
        Ok(())
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_millis(self.refresh_interval)
    }

    /// Initial sort selection described by `sort_column`/`sort_descending`
    pub fn sort_state(&self) -> Result<SortState> {
        let Some(name) = &self.sort_column else {
            return Ok(SortState::default());
        };
        let column =
            SortColumn::from_name(name).ok_or_else(|| anyhow!("Unknown sort column '{}'", name))?;
        let direction = if self.sort_descending {
            SortDirection::Descending
        } else {
            SortDirection::Ascending
        };
        Ok(SortState::new(column, direction))
    }

    /// Find configuration file
    fn find_config_file() -> Result<PathBuf> {
        // Try XDG config directory first
        if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME") {
            let xdg_path = PathBuf::from(xdg_config).join("connview/config.yml");
            if xdg_path.exists() {
                return Ok(xdg_path);
            }
        }

        // Try ~/.config/connview
        let home = Self::get_home_dir()?;
        let home_config = home.join(".config/connview/config.yml");
        if home_config.exists() {
            return Ok(home_config);
        }

        // Try current directory
        let current_config = PathBuf::from("config.yml");
        if current_config.exists() {
            return Ok(current_config);
        }

        // Default to home config path
        Ok(home_config)
    }

    /// Get home directory
    fn get_home_dir() -> Result<PathBuf> {
        if let Ok(home) = std::env::var("HOME") {
            return Ok(PathBuf::from(home));
        }

        if let Ok(userprofile) = std::env::var("USERPROFILE") {
            return Ok(PathBuf::from(userprofile));
        }

        Err(anyhow!("Could not determine home directory"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.refresh_interval(), Duration::from_secs(3));
        assert!(!config.auto_refresh);
        assert_eq!(config.sort_state().unwrap(), SortState::default());
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let config = Config::from_yaml("auto_refresh: true\nfilter: \"name:ssh\"\n").unwrap();
        assert!(config.auto_refresh);
        assert_eq!(config.filter, "name:ssh");
        assert_eq!(config.refresh_interval, 3000);
    }

    #[test]
    fn test_empty_yaml() {
        assert_eq!(Config::from_yaml("").unwrap(), Config::default());
    }

    #[test]
    fn test_sort_settings() {
        let config = Config::from_yaml("sort_column: port\nsort_descending: true\n").unwrap();
        assert_eq!(
            config.sort_state().unwrap(),
            SortState::new(SortColumn::LocalPort, SortDirection::Descending)
        );
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(Config::from_yaml("refresh_interval: soon\n").is_err());
        assert!(Config::from_yaml("sort_column: color\n").is_err());
    }

    #[test]
    fn test_refresh_interval_below_minimum_rejected() {
        let err = Config::from_yaml("refresh_interval: 10\n").unwrap_err();
        assert!(err.to_string().contains("at least 250ms"));
        assert!(Config::from_yaml("refresh_interval: 249\n").is_err());

        let config = Config::from_yaml("refresh_interval: 250\n").unwrap();
        assert_eq!(config.refresh_interval(), MIN_INTERVAL);
    }

    #[test]
    fn test_explicit_missing_file_is_error() {
        assert!(Config::load(Some("/nonexistent/connview/config.yml")).is_err());
    }
}
