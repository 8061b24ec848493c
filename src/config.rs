//! Configuration
//!
//! TOML configuration file with compiled defaults. Carries the user
//! settings of the device (track table, alarms, timezone) plus daemon
//! wiring (port, library root, audio device, silence flush length).

use crate::error::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Most alarms a device will hold.
pub const MAX_ALARMS: usize = 10;

/// Daemon configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// HTTP command surface port.
    pub port: u16,

    /// Root folder containing the audio files.
    pub root_folder: PathBuf,

    /// Audio output device name (None = default device).
    pub device: Option<String>,

    /// Length of the silence burst flushed at the end of every playback
    /// episode, in milliseconds.
    pub silence_flush_ms: u64,

    /// POSIX TZ string applied at startup (None = inherit environment).
    pub timezone: Option<String>,

    /// Track table: file paths relative to `root_folder`, addressed by
    /// index from commands and alarms.
    pub tracks: Vec<String>,

    /// Daily alarms.
    pub alarms: Vec<AlarmConfig>,
}

/// One daily alarm entry.
#[derive(Debug, Clone, Deserialize)]
pub struct AlarmConfig {
    /// Local hour, 0-23.
    pub hour: u8,
    /// Local minute, 0-59.
    pub minute: u8,
    /// Disabled alarms stay configured but never fire.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Track table index to play.
    pub track: usize,
}

fn default_enabled() -> bool {
    true
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 5750,
            root_folder: PathBuf::from("/var/lib/jive-stick"),
            device: None,
            silence_flush_ms: 128,
            timezone: None,
            tracks: Vec::new(),
            alarms: Vec::new(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read {}: {}", path.display(), e)))?;
        let config: Config = toml::from_str(&text)
            .map_err(|e| Error::Config(format!("Failed to parse {}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate field ranges and cross-references.
    pub fn validate(&self) -> Result<()> {
        if self.alarms.len() > MAX_ALARMS {
            return Err(Error::Config(format!(
                "Too many alarms configured ({}, maximum {})",
                self.alarms.len(),
                MAX_ALARMS
            )));
        }
        for (i, alarm) in self.alarms.iter().enumerate() {
            if alarm.hour > 23 || alarm.minute > 59 {
                return Err(Error::Config(format!(
                    "Alarm {} has invalid time {:02}:{:02}",
                    i, alarm.hour, alarm.minute
                )));
            }
            if alarm.track >= self.tracks.len() {
                return Err(Error::Config(format!(
                    "Alarm {} references track {} but only {} tracks are configured",
                    i,
                    alarm.track,
                    self.tracks.len()
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.port, 5750);
        assert_eq!(config.silence_flush_ms, 128);
        assert!(config.tracks.is_empty());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_full_config() {
        let text = r#"
            port = 8080
            root_folder = "/srv/audio"
            silence_flush_ms = 200
            timezone = "EST5EDT,M3.2.0/2,M11.1.0/2"
            tracks = ["chime.wav", "song1.wav"]

            [[alarms]]
            hour = 7
            minute = 30
            track = 1

            [[alarms]]
            hour = 21
            minute = 0
            enabled = false
            track = 0
        "#;
        let config: Config = toml::from_str(text).unwrap();
        config.validate().unwrap();

        assert_eq!(config.port, 8080);
        assert_eq!(config.tracks.len(), 2);
        assert_eq!(config.alarms.len(), 2);
        assert!(config.alarms[0].enabled);
        assert!(!config.alarms[1].enabled);
    }

    #[test]
    fn test_invalid_alarm_time_rejected() {
        let config = Config {
            tracks: vec!["a.wav".to_string()],
            alarms: vec![AlarmConfig { hour: 24, minute: 0, enabled: true, track: 0 }],
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_too_many_alarms_rejected() {
        let config = Config {
            tracks: vec!["a.wav".to_string()],
            alarms: (0..11)
                .map(|_| AlarmConfig { hour: 7, minute: 0, enabled: true, track: 0 })
                .collect(),
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_alarm_track_out_of_range_rejected() {
        let config = Config {
            tracks: vec!["a.wav".to_string()],
            alarms: vec![AlarmConfig { hour: 7, minute: 0, enabled: true, track: 3 }],
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }
}
