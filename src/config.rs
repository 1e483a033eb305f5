//! Voice session configuration
//!
//! Plain scalar settings persisted as TOML. Missing keys fall back to the
//! protocol defaults in [`crate::constants`].

use std::fs;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::constants::*;
use crate::error::{Error, Result};

const CONFIG_FILE_NAME: &str = "voice.toml";

/// Receive-side and capture-side settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VoiceConfig {
    /// Playback ring duration in seconds, used to size sinks at join time
    pub buffer_delay_threshold: f32,

    /// Jitter buffer capacity in packets
    pub max_jitter_buffer_size: usize,

    /// Fill gaps with the last good payload instead of silence
    pub use_sample_stretching: bool,

    /// Emit per-packet traces
    pub debug: bool,

    /// Pitch scale used while the jitter buffer is shallow
    pub stream_standard_pitch: f32,

    /// Pitch scale used to drain a deep jitter buffer
    pub stream_speedup_pitch: f32,

    /// Jitter buffer depth above which playback speeds up
    pub jitter_buffer_speedup: usize,

    /// Jitter buffer depth below which playback returns to standard pitch
    pub jitter_buffer_slowdown: usize,

    pub capture: CaptureConfig,
}

/// Capture-side settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Sample rate of the capture device
    pub device_sample_rate: u32,

    /// Capacity of the outbound frame ring
    pub max_pending_frames: usize,

    /// Frames queued for the speech recognizer before new ones are dropped
    pub recognizer_queue_depth: usize,
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            buffer_delay_threshold: DEFAULT_BUFFER_DELAY_THRESHOLD,
            max_jitter_buffer_size: DEFAULT_MAX_JITTER_BUFFER_SIZE,
            use_sample_stretching: true,
            debug: false,
            stream_standard_pitch: DEFAULT_STREAM_STANDARD_PITCH,
            stream_speedup_pitch: DEFAULT_STREAM_SPEEDUP_PITCH,
            jitter_buffer_speedup: DEFAULT_JITTER_BUFFER_SPEEDUP,
            jitter_buffer_slowdown: DEFAULT_JITTER_BUFFER_SLOWDOWN,
            capture: CaptureConfig::default(),
        }
    }
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            device_sample_rate: DEFAULT_DEVICE_SAMPLE_RATE,
            max_pending_frames: MAX_PENDING_FRAMES,
            recognizer_queue_depth: DEFAULT_RECOGNIZER_QUEUE_DEPTH,
        }
    }
}

impl VoiceConfig {
    /// Default config file location for this user
    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "voice-transport")
            .map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
    }

    /// Parse and validate a config from TOML text
    pub fn from_toml(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a config file
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Self::from_toml(&text)
    }

    /// Load from the default location, falling back to defaults when absent
    pub fn load_or_default() -> Result<Self> {
        match Self::default_path() {
            Some(path) if path.exists() => Self::load(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Write the config as TOML, creating parent directories
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, toml::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Reject settings the transport cannot run with
    pub fn validate(&self) -> Result<()> {
        if !(self.buffer_delay_threshold > 0.0) {
            return Err(Error::Config(format!(
                "buffer_delay_threshold must be positive, got {}",
                self.buffer_delay_threshold
            )));
        }
        if self.max_jitter_buffer_size == 0 {
            return Err(Error::Config("max_jitter_buffer_size must be at least 1".into()));
        }
        if !(self.stream_standard_pitch > 0.0) || !(self.stream_speedup_pitch > 0.0) {
            return Err(Error::Config("stream pitch scales must be positive".into()));
        }
        if self.jitter_buffer_slowdown > self.jitter_buffer_speedup {
            return Err(Error::Config(format!(
                "jitter_buffer_slowdown ({}) exceeds jitter_buffer_speedup ({})",
                self.jitter_buffer_slowdown, self.jitter_buffer_speedup
            )));
        }
        if self.capture.device_sample_rate == 0 {
            return Err(Error::Config("capture.device_sample_rate must be positive".into()));
        }
        if self.capture.max_pending_frames == 0 {
            return Err(Error::Config("capture.max_pending_frames must be at least 1".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = VoiceConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.max_jitter_buffer_size, 16);
        assert!(config.use_sample_stretching);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config = VoiceConfig::from_toml(
            "max_jitter_buffer_size = 24\ndebug = true\n[capture]\ndevice_sample_rate = 44100\n",
        )
        .unwrap();

        assert_eq!(config.max_jitter_buffer_size, 24);
        assert!(config.debug);
        assert_eq!(config.capture.device_sample_rate, 44100);
        assert_eq!(config.capture.max_pending_frames, MAX_PENDING_FRAMES);
        assert_eq!(config.buffer_delay_threshold, DEFAULT_BUFFER_DELAY_THRESHOLD);
    }

    #[test]
    fn test_rejects_zero_jitter_size() {
        let result = VoiceConfig::from_toml("max_jitter_buffer_size = 0");
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_rejects_inverted_thresholds() {
        let mut config = VoiceConfig::default();
        config.jitter_buffer_slowdown = 20;
        config.jitter_buffer_speedup = 4;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_save_and_load() {
        let dir = std::env::temp_dir().join(format!("voice-transport-cfg-{}", std::process::id()));
        let path = dir.join(CONFIG_FILE_NAME);

        let mut config = VoiceConfig::default();
        config.use_sample_stretching = false;
        config.save(&path).unwrap();

        let loaded = VoiceConfig::load(&path).unwrap();
        assert_eq!(loaded, config);

        let _ = fs::remove_dir_all(&dir);
    }
}
