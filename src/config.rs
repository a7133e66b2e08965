// Engine configuration - RON-loadable settings for clock, playback and MPE

use crate::clock::tempo::{MAX_BPM, MIN_BPM};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Config error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("RON error: {0}")]
    Ron(#[from] ron::error::SpannedError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Engine configuration
///
/// Every field has a default, so a RON file only needs the values it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Clock ticks per quarter note (24 = standard MIDI clock)
    pub time_division: u16,

    /// Initial tempo in beats per minute
    pub bpm: f64,

    /// Scheduling horizon of each clock pass, in ms
    pub look_ahead_ms: f64,

    /// Period of the timer driving the clock, in ms
    pub resolution_ms: f64,

    /// Velocity of the note-offs sent when the transport stops
    pub note_off_velocity: u8,

    /// Controller number carrying MPE timbre
    pub timbre_controller: u8,

    /// Inbound buffer size of each pipeline, in messages
    pub pipeline_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            time_division: 24,
            bpm: 120.0,
            look_ahead_ms: 150.0,
            resolution_ms: 25.0,
            note_off_velocity: 127,
            timbre_controller: 74,
            pipeline_capacity: 512,
        }
    }
}

impl EngineConfig {
    /// Parse and validate a RON document
    pub fn from_ron_str(data: &str) -> Result<Self, ConfigError> {
        let config: Self = ron::from_str(data)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a RON file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let data = fs::read_to_string(path)?;
        let config = Self::from_ron_str(&data)?;
        log::debug!("loaded engine config from {}", path.display());
        Ok(config)
    }

    pub fn to_ron(&self) -> Result<String, ConfigError> {
        ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
            .map_err(|e| ConfigError::Invalid(e.to_string()))
    }

    /// Check value ranges
    /// The look-ahead must cover at least one timer period or ticks get lost
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.time_division == 0 {
            return Err(ConfigError::Invalid("time_division must be > 0".into()));
        }
        if !(MIN_BPM..=MAX_BPM).contains(&self.bpm) {
            return Err(ConfigError::Invalid(format!(
                "bpm must be within {}..={}, got {}",
                MIN_BPM, MAX_BPM, self.bpm
            )));
        }
        if !self.resolution_ms.is_finite() || self.resolution_ms <= 0.0 {
            return Err(ConfigError::Invalid(format!(
                "resolution_ms must be positive, got {}",
                self.resolution_ms
            )));
        }
        if !self.look_ahead_ms.is_finite() || self.look_ahead_ms < self.resolution_ms {
            return Err(ConfigError::Invalid(format!(
                "look_ahead_ms ({}) must be >= resolution_ms ({})",
                self.look_ahead_ms, self.resolution_ms
            )));
        }
        if self.note_off_velocity > 127 {
            return Err(ConfigError::Invalid("note_off_velocity must be <= 127".into()));
        }
        if self.timbre_controller > 127 {
            return Err(ConfigError::Invalid("timbre_controller must be <= 127".into()));
        }
        if self.pipeline_capacity == 0 {
            return Err(ConfigError::Invalid("pipeline_capacity must be > 0".into()));
        }
        Ok(())
    }
}
