use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::SettingsError;
use crate::pdf::{
    DEFAULT_CACHE_SIZE, DEFAULT_PREFETCH_MARGIN, DEFAULT_RESIZE_DEBOUNCE_MS, DEFAULT_WORKERS,
};

pub const CURRENT_VERSION: u32 = 1;
const SETTINGS_FILENAME: &str = "config.yaml";
const APP_NAME: &str = "pdfpane";

/// Engine tuning shared by every viewer the process creates.
///
/// Each viewer gets its own copy; nothing here is global.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineSettings {
    #[serde(default = "default_version")]
    pub version: u32,

    /// Render worker threads per viewer
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Rendered pages kept per viewer
    #[serde(default = "default_cache_size")]
    pub cache_size: usize,

    /// CSS pixels above and below the viewport that are rendered ahead
    #[serde(default = "default_prefetch_margin")]
    pub prefetch_margin: f32,

    #[serde(default = "default_resize_debounce_ms")]
    pub resize_debounce_ms: u64,
}

fn default_version() -> u32 {
    CURRENT_VERSION
}

fn default_workers() -> usize {
    DEFAULT_WORKERS
}

fn default_cache_size() -> usize {
    DEFAULT_CACHE_SIZE
}

fn default_prefetch_margin() -> f32 {
    DEFAULT_PREFETCH_MARGIN
}

fn default_resize_debounce_ms() -> u64 {
    DEFAULT_RESIZE_DEBOUNCE_MS
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            version: CURRENT_VERSION,
            workers: default_workers(),
            cache_size: default_cache_size(),
            prefetch_margin: default_prefetch_margin(),
            resize_debounce_ms: default_resize_debounce_ms(),
        }
    }
}

impl EngineSettings {
    #[must_use]
    pub fn resize_debounce(&self) -> Duration {
        Duration::from_millis(self.resize_debounce_ms)
    }

    /// Load from the user's config directory, creating the file with
    /// defaults when it does not exist. Problems are logged and fall back to
    /// defaults.
    #[must_use]
    pub fn load() -> Self {
        let Some(path) = preferred_config_path() else {
            warn!("Could not determine config directory, using default settings");
            return Self::default();
        };

        if path.exists() {
            match Self::load_from_path(&path) {
                Ok(settings) => settings,
                Err(e) => {
                    error!("Failed to load settings file {path:?}: {e}");
                    Self::default()
                }
            }
        } else {
            info!("Settings file not found, creating with defaults at {path:?}");
            let settings = Self::default();
            if let Err(e) = settings.save_to_path(&path) {
                error!("Failed to save settings to {path:?}: {e}");
            }
            settings
        }
    }

    pub fn load_from_path(path: &Path) -> Result<Self, SettingsError> {
        let content = fs::read_to_string(path)?;
        let mut settings: Self = serde_yaml::from_str(&content)?;
        debug!("Loaded settings from {path:?}");

        if settings.workers == 0 {
            warn!("workers must be at least 1, using {DEFAULT_WORKERS}");
            settings.workers = DEFAULT_WORKERS;
        }
        if !settings.prefetch_margin.is_finite() || settings.prefetch_margin < 0.0 {
            warn!(
                "Invalid prefetch_margin {}, using {DEFAULT_PREFETCH_MARGIN}",
                settings.prefetch_margin
            );
            settings.prefetch_margin = DEFAULT_PREFETCH_MARGIN;
        }
        if settings.version < CURRENT_VERSION {
            info!(
                "Migrating settings from v{} to v{}",
                settings.version, CURRENT_VERSION
            );
            settings.version = CURRENT_VERSION;
        }
        Ok(settings)
    }

    pub fn save_to_path(&self, path: &Path) -> Result<(), SettingsError> {
        if let Some(parent) = path.parent() {
            if !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }

        let mut content = String::from(SETTINGS_HEADER);
        content.push_str(&serde_yaml::to_string(self)?);
        fs::write(path, content)?;
        debug!("Saved settings to {path:?}");
        Ok(())
    }
}

fn preferred_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|config| config.join(APP_NAME).join(SETTINGS_FILENAME))
}

const SETTINGS_HEADER: &str = r#"# ============================================================================
# pdfpane engine settings
# ============================================================================
# workers:            render threads per viewer
# cache_size:         rendered pages kept in memory per viewer
# prefetch_margin:    pixels beyond the viewport rendered ahead of scrolling
# resize_debounce_ms: quiet period before a container resize relayouts

"#;

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_keys_take_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.yaml");
        fs::write(&path, "workers: 4\n").unwrap();

        let settings = EngineSettings::load_from_path(&path).unwrap();
        assert_eq!(settings.workers, 4);
        assert_eq!(settings.cache_size, DEFAULT_CACHE_SIZE);
        assert_eq!(
            settings.resize_debounce(),
            Duration::from_millis(DEFAULT_RESIZE_DEBOUNCE_MS)
        );
    }

    #[test]
    fn save_then_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.yaml");
        let settings = EngineSettings {
            cache_size: 7,
            prefetch_margin: 120.0,
            ..EngineSettings::default()
        };
        settings.save_to_path(&path).unwrap();

        let written = fs::read_to_string(&path).unwrap();
        assert!(written.starts_with("# ===="));
        assert_eq!(EngineSettings::load_from_path(&path).unwrap(), settings);
    }

    #[test]
    fn invalid_values_are_repaired() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.yaml");
        fs::write(&path, "workers: 0\nprefetch_margin: -5\n").unwrap();

        let settings = EngineSettings::load_from_path(&path).unwrap();
        assert_eq!(settings.workers, DEFAULT_WORKERS);
        assert_eq!(settings.prefetch_margin, DEFAULT_PREFETCH_MARGIN);
    }

    #[test]
    fn parse_errors_are_reported() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.yaml");
        fs::write(&path, "workers: [not, a, number]\n").unwrap();

        assert!(matches!(
            EngineSettings::load_from_path(&path),
            Err(SettingsError::Parse(_))
        ));
    }
}
