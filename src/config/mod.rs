//! Configuration management for Herald
//!
//! [`Settings`] holds the user-adjustable voice preferences. They persist
//! through a [`SettingsStore`](file::SettingsStore) and
//! [`SettingsOverrides`] from CLI flags layer over them for one session.

pub mod file;

use std::fmt;
use std::time::Duration;

use secrecy::SecretString;
use serde::{Deserialize, Serialize};

use crate::session::SessionOptions;

pub use file::{FileSettingsStore, MemorySettingsStore, SettingsStore, settings_file_path};

/// Default `ElevenLabs` voice ("Rachel")
pub const DEFAULT_VOICE_ID: &str = "21m00Tcm4TlvDq8ikWAM";

pub const DEFAULT_SPEECH_SPEED: f32 = 1.0;
pub const DEFAULT_VOLUME: f32 = 0.8;

const SPEED_RANGE: (f32, f32) = (0.0, 2.0);
const VOLUME_RANGE: (f32, f32) = (0.0, 1.0);

/// Persisted user settings
///
/// Every field has a default, so a stored file only needs the keys it
/// changes.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// `ElevenLabs` voice identifier
    pub voice_id: String,

    /// Speaking rate multiplier (0.0 to 2.0)
    pub speech_speed: f32,

    /// Playback volume (0.0 to 1.0)
    pub volume: f32,

    /// `ElevenLabs` API key; empty disables voice responses
    pub api_key: String,

    /// Re-arm listening after each completed turn
    pub continuous_listening: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            voice_id: DEFAULT_VOICE_ID.to_string(),
            speech_speed: DEFAULT_SPEECH_SPEED,
            volume: DEFAULT_VOLUME,
            api_key: String::new(),
            continuous_listening: false,
        }
    }
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("voice_id", &self.voice_id)
            .field("speech_speed", &self.speech_speed)
            .field("volume", &self.volume)
            .field(
                "api_key",
                &if self.api_key.is_empty() { "" } else { "[REDACTED]" },
            )
            .field("continuous_listening", &self.continuous_listening)
            .finish()
    }
}

impl Settings {
    /// Clamp numeric fields into range and tidy strings
    #[must_use]
    pub fn normalized(mut self) -> Self {
        self.speech_speed = clamp_or(self.speech_speed, SPEED_RANGE, DEFAULT_SPEECH_SPEED);
        self.volume = clamp_or(self.volume, VOLUME_RANGE, DEFAULT_VOLUME);
        self.api_key = self.api_key.trim().to_string();
        self.voice_id = self.voice_id.trim().to_string();
        if self.voice_id.is_empty() {
            self.voice_id = DEFAULT_VOICE_ID.to_string();
        }
        self
    }

    /// Voice responses are on when a credential is configured
    #[must_use]
    pub fn synthesis_enabled(&self) -> bool {
        !self.api_key.trim().is_empty()
    }

    #[must_use]
    pub fn api_key_secret(&self) -> SecretString {
        SecretString::from(self.api_key.clone())
    }

    /// Session switches derived from these settings
    #[must_use]
    pub fn session_options(&self, restart_delay: Duration) -> SessionOptions {
        SessionOptions {
            continuous: self.continuous_listening,
            synthesis_enabled: self.synthesis_enabled(),
            restart_delay,
        }
    }
}

/// Session-only values from the command line or environment
///
/// Layered over stored settings for one run and never written back.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct SettingsOverrides {
    pub api_key: Option<String>,
    pub voice_id: Option<String>,
    /// Forces continuous listening on; `false` leaves the stored value
    pub continuous_listening: bool,
}

impl fmt::Debug for SettingsOverrides {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SettingsOverrides")
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("voice_id", &self.voice_id)
            .field("continuous_listening", &self.continuous_listening)
            .finish()
    }
}

impl SettingsOverrides {
    /// Effective settings for the session
    #[must_use]
    pub fn apply(&self, mut settings: Settings) -> Settings {
        if let Some(key) = &self.api_key {
            settings.api_key.clone_from(key);
        }
        if let Some(voice) = &self.voice_id {
            settings.voice_id.clone_from(voice);
        }
        if self.continuous_listening {
            settings.continuous_listening = true;
        }
        settings.normalized()
    }

    /// What to persist for `edited`, given the currently stored settings
    ///
    /// A field still holding its override value was not edited by the user,
    /// so the stored value is kept.
    #[must_use]
    pub fn persistable(&self, mut edited: Settings, stored: &Settings) -> Settings {
        let applied = self.apply(stored.clone());
        if self.api_key.is_some() && edited.api_key.trim() == applied.api_key {
            edited.api_key.clone_from(&stored.api_key);
        }
        if self.voice_id.is_some() && edited.voice_id.trim() == applied.voice_id {
            edited.voice_id.clone_from(&stored.voice_id);
        }
        if self.continuous_listening && edited.continuous_listening {
            edited.continuous_listening = stored.continuous_listening;
        }
        edited.normalized()
    }
}

fn clamp_or(value: f32, (min, max): (f32, f32), fallback: f32) -> f32 {
    if value.is_nan() {
        fallback
    } else {
        value.clamp(min, max)
    }
}
