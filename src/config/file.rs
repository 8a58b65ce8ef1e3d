//! Settings persistence
//!
//! Settings live in `~/.config/herald/settings.toml` by default. A missing or
//! unreadable file is not an error; defaults are used instead.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use super::Settings;
use crate::{Error, Result};

/// Loads and saves [`Settings`]
pub trait SettingsStore: Send + Sync {
    /// Current stored settings, or defaults
    fn load(&self) -> Settings;

    /// Persist settings
    ///
    /// # Errors
    ///
    /// Returns error if the settings cannot be written
    fn save(&self, settings: &Settings) -> Result<()>;
}

/// Return the settings file path: `~/.config/herald/settings.toml`
#[must_use]
pub fn settings_file_path() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|d| d.config_dir().join("herald").join("settings.toml"))
}

/// TOML file backed settings
#[derive(Debug, Clone)]
pub struct FileSettingsStore {
    path: PathBuf,
}

impl FileSettingsStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store at the standard location
    ///
    /// # Errors
    ///
    /// Returns error if no home directory can be determined
    pub fn standard() -> Result<Self> {
        settings_file_path()
            .map(Self::new)
            .ok_or_else(|| Error::Config("could not determine config directory".to_string()))
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SettingsStore for FileSettingsStore {
    fn load(&self) -> Settings {
        let path = &self.path;
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no settings file, using defaults");
            return Settings::default();
        }

        match std::fs::read_to_string(path) {
            Ok(content) => match toml::from_str::<Settings>(&content) {
                Ok(settings) => {
                    tracing::info!(path = %path.display(), "loaded settings");
                    settings.normalized()
                }
                Err(e) => {
                    tracing::warn!(
                        path = %path.display(),
                        error = %e,
                        "failed to parse settings file, using defaults"
                    );
                    Settings::default()
                }
            },
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "failed to read settings file"
                );
                Settings::default()
            }
        }
    }

    fn save(&self, settings: &Settings) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(&settings.clone().normalized())?;
        std::fs::write(&self.path, content)?;
        tracing::info!(path = %self.path.display(), "settings saved");
        Ok(())
    }
}

/// In-memory settings, for tests and ephemeral sessions
#[derive(Debug, Default)]
pub struct MemorySettingsStore {
    settings: Mutex<Settings>,
}

impl MemorySettingsStore {
    #[must_use]
    pub fn new(settings: Settings) -> Self {
        Self {
            settings: Mutex::new(settings),
        }
    }
}

impl SettingsStore for MemorySettingsStore {
    fn load(&self) -> Settings {
        self.settings
            .lock()
            .map(|s| s.clone())
            .unwrap_or_default()
    }

    fn save(&self, settings: &Settings) -> Result<()> {
        let mut stored = self
            .settings
            .lock()
            .map_err(|_| Error::Config("settings lock poisoned".to_string()))?;
        *stored = settings.clone().normalized();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_loads_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSettingsStore::new(dir.path().join("nope.toml"));
        assert_eq!(store.load(), Settings::default());
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSettingsStore::new(dir.path().join("nested").join("settings.toml"));
        let settings = Settings {
            voice_id: "abc".to_string(),
            volume: 0.4,
            continuous_listening: true,
            ..Settings::default()
        };

        store.save(&settings).unwrap();
        assert_eq!(store.load(), settings);
    }

    #[test]
    fn test_corrupt_file_loads_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.toml");
        std::fs::write(&path, "volume = \"loud\"").unwrap();
        assert_eq!(FileSettingsStore::new(path).load(), Settings::default());
    }

    #[test]
    fn test_out_of_range_values_clamped_on_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.toml");
        std::fs::write(&path, "speech_speed = 9.0\nvolume = 2.0\n").unwrap();

        let settings = FileSettingsStore::new(path).load();
        assert!((settings.speech_speed - 2.0).abs() < f32::EPSILON);
        assert!((settings.volume - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_memory_store() {
        let store = MemorySettingsStore::default();
        assert_eq!(store.load(), Settings::default());
        let settings = Settings {
            api_key: "k".to_string(),
            ..Settings::default()
        };
        store.save(&settings).unwrap();
        assert!(store.load().synthesis_enabled());
    }
}
