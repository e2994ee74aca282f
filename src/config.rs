//! Application configuration: a small TOML file under the user config dir.
//! Every section defaults; a missing file is not an error.

use color_eyre::eyre::eyre;
use color_eyre::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Manages config directory and config file operations
#[derive(Clone)]
pub struct ConfigManager {
    config_dir: PathBuf,
}

impl ConfigManager {
    /// Create a ConfigManager with a custom config directory (primarily for testing)
    pub fn with_dir(config_dir: PathBuf) -> Self {
        Self { config_dir }
    }

    /// Create a new ConfigManager for the given app name
    pub fn new(app_name: &str) -> Result<Self> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| eyre!("Could not determine config directory"))?
            .join(app_name);
        Ok(Self { config_dir })
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    pub fn config_path(&self) -> PathBuf {
        self.config_dir.join("config.toml")
    }

    /// Load config.toml, or defaults when the file does not exist. A file
    /// that exists but does not parse is an error the caller surfaces.
    pub fn load(&self) -> Result<AppConfig> {
        let path = self.config_path();
        if !path.exists() {
            return Ok(AppConfig::default());
        }
        let raw = std::fs::read_to_string(&path)?;
        let config: AppConfig =
            toml::from_str(&raw).map_err(|e| eyre!("{}: {}", path.display(), e))?;
        Ok(config)
    }

    /// Write the default configuration template, refusing to clobber an
    /// existing file unless forced.
    pub fn write_default_config(&self, force: bool) -> Result<PathBuf> {
        let path = self.config_path();
        if path.exists() && !force {
            return Err(eyre!(
                "Config file already exists at {}. Use --force to overwrite.",
                path.display()
            ));
        }
        std::fs::create_dir_all(&self.config_dir)?;
        let default = toml::to_string_pretty(&AppConfig::default())?;
        std::fs::write(&path, default)?;
        Ok(path)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub file_loading: FileLoadingConfig,
    pub charts: ChartConfig,
    pub export: ExportConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FileLoadingConfig {
    pub delimiter: Option<u8>,
    pub has_header: Option<bool>,
    /// Excel worksheet by name or 0-based index.
    pub sheet: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ChartConfig {
    /// Histogram bin count for the sales distribution chart.
    pub histogram_bins: usize,
}

impl Default for ChartConfig {
    fn default() -> Self {
        Self { histogram_bins: 20 }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ExportConfig {
    /// Directory artifacts are written into; defaults to the current dir.
    pub out_dir: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let manager = ConfigManager::with_dir(dir.path().to_path_buf());
        let config = manager.load().unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.charts.histogram_bins, 20);
    }

    #[test]
    fn partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("config.toml"),
            "[charts]\nhistogram_bins = 35\n",
        )
        .unwrap();
        let manager = ConfigManager::with_dir(dir.path().to_path_buf());
        let config = manager.load().unwrap();
        assert_eq!(config.charts.histogram_bins, 35);
        assert!(config.export.out_dir.is_none());
    }

    #[test]
    fn invalid_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("config.toml"), "not = [valid").unwrap();
        let manager = ConfigManager::with_dir(dir.path().to_path_buf());
        assert!(manager.load().is_err());
    }

    #[test]
    fn write_default_refuses_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let manager = ConfigManager::with_dir(dir.path().to_path_buf());
        manager.write_default_config(false).unwrap();
        assert!(manager.write_default_config(false).is_err());
        assert!(manager.write_default_config(true).is_ok());
    }
}
