//! Bridge settings structs, defaults and TOML persistence.
//!
//! All structs implement `Serialize`, `Deserialize`, `Default` and `Clone`
//! so they can be round-tripped through TOML files and shared across threads.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use super::ConfigPaths;
use crate::stream::{AudioEncoding, EventInput, InputAudioConfig, StreamingConfig};

pub use crate::stream::RemoteProfile;

// ---------------------------------------------------------------------------
// StreamSettings
// ---------------------------------------------------------------------------

/// Remote stream parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamSettings {
    pub profile: RemoteProfile,
    /// Project / agent identifier used to build the session path.
    pub project_id: String,
    /// Default BCP-47 language code, e.g. `"en-US"`.
    pub language: String,
    /// Sample rate the remote service expects, in Hz.
    pub sample_rate: u32,
    pub encoding: AudioEncoding,
    pub single_utterance: bool,
    pub interim_results: bool,
    /// Event sent with the configuration message, if any.
    pub trigger_event: Option<String>,
    /// Upper bound on waiting for the terminal status after half-close.
    pub finish_timeout_ms: u64,
    /// How often a blocked read re-checks for cancellation.
    pub read_poll_ms: u64,
}

impl Default for StreamSettings {
    fn default() -> Self {
        Self {
            profile: RemoteProfile::default(),
            project_id: String::new(),
            language: "en-US".into(),
            sample_rate: 16_000,
            encoding: AudioEncoding::Linear16,
            single_utterance: true,
            interim_results: true,
            trigger_event: None,
            finish_timeout_ms: 10_000,
            read_poll_ms: 100,
        }
    }
}

impl StreamSettings {
    pub fn finish_timeout(&self) -> Duration {
        Duration::from_millis(self.finish_timeout_ms)
    }

    pub fn read_poll(&self) -> Duration {
        Duration::from_millis(self.read_poll_ms)
    }

    /// Build the configuration message body, applying per-call overrides.
    ///
    /// Trigger events and single-utterance mode only exist for
    /// [`RemoteProfile::DetectIntent`]; a transcription stream never
    /// carries them.
    pub fn streaming_config(&self, options: &SessionOptions) -> StreamingConfig {
        let language = options
            .language
            .clone()
            .unwrap_or_else(|| self.language.clone());
        let intent = self.profile == RemoteProfile::DetectIntent;
        let event = options
            .trigger_event
            .as_ref()
            .or(self.trigger_event.as_ref())
            .filter(|_| intent)
            .map(|name| EventInput {
                name: name.clone(),
                language_code: language.clone(),
            });

        StreamingConfig {
            profile: self.profile,
            audio: InputAudioConfig {
                encoding: self.encoding,
                sample_rate_hertz: self.sample_rate,
                language_code: language,
                single_utterance: intent && self.single_utterance,
                interim_results: self.interim_results,
            },
            event,
        }
    }
}

// ---------------------------------------------------------------------------
// AudioSettings
// ---------------------------------------------------------------------------

/// Host-side audio format and resampler sizing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioSettings {
    /// Sample rate of frames delivered by the host, in Hz.
    pub input_rate: u32,
    pub channels: u16,
    /// Resampler processing block length in milliseconds.
    pub block_ms: u32,
    /// Largest frame (per channel) the host will ever deliver.
    pub max_frame_samples: usize,
}

impl Default for AudioSettings {
    fn default() -> Self {
        Self {
            input_rate: 8_000,
            channels: 1,
            block_ms: 10,
            max_frame_samples: 1_920,
        }
    }
}

impl AudioSettings {
    /// Processing block length in frames.
    pub fn block_frames(&self) -> usize {
        (self.input_rate as usize * self.block_ms as usize / 1_000).max(1)
    }
}

// ---------------------------------------------------------------------------
// ArtifactSettings / CredentialSettings
// ---------------------------------------------------------------------------

/// Where synthesized audio is written.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ArtifactSettings {
    /// `None` means the platform temp directory.
    pub dir: Option<PathBuf>,
}

impl ArtifactSettings {
    pub fn resolve_dir(&self) -> PathBuf {
        self.dir
            .clone()
            .unwrap_or_else(|| ConfigPaths::new().artifacts_dir)
    }
}

/// How service credentials are discovered at startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CredentialSettings {
    /// Environment variable naming the service-account key file.
    pub env_var: String,
}

impl Default for CredentialSettings {
    fn default() -> Self {
        Self {
            env_var: "GOOGLE_APPLICATION_CREDENTIALS".into(),
        }
    }
}

// ---------------------------------------------------------------------------
// SessionOptions
// ---------------------------------------------------------------------------

/// Per-call overrides supplied by the host when a session starts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionOptions {
    pub language: Option<String>,
    pub trigger_event: Option<String>,
}

// ---------------------------------------------------------------------------
// BridgeConfig  (top-level)
// ---------------------------------------------------------------------------

/// Top-level bridge configuration, serialised as `settings.toml`.
///
/// ```rust,no_run
/// use voice_stream_bridge::config::BridgeConfig;
///
/// // Load (returns Default when file is missing)
/// let config = BridgeConfig::load().unwrap();
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    pub stream: StreamSettings,
    pub audio: AudioSettings,
    pub artifacts: ArtifactSettings,
    pub credentials: CredentialSettings,
}

impl BridgeConfig {
    /// Load configuration from the platform-appropriate `settings.toml`.
    ///
    /// Returns `Ok(BridgeConfig::default())` when the file does not exist.
    pub fn load() -> Result<Self> {
        Self::load_from(&ConfigPaths::new().settings_file)
    }

    /// Load from an explicit path.
    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save to an explicit path, creating parent directories as needed.
    pub fn save_to(&self, path: &std::path::Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn default_values() {
        let cfg = BridgeConfig::default();

        assert_eq!(cfg.stream.profile, RemoteProfile::DetectIntent);
        assert_eq!(cfg.stream.language, "en-US");
        assert_eq!(cfg.stream.sample_rate, 16_000);
        assert!(cfg.stream.single_utterance);
        assert!(cfg.stream.trigger_event.is_none());
        assert_eq!(cfg.stream.finish_timeout(), Duration::from_secs(10));
        assert_eq!(cfg.audio.input_rate, 8_000);
        assert_eq!(cfg.audio.block_frames(), 80);
        assert_eq!(cfg.credentials.env_var, "GOOGLE_APPLICATION_CREDENTIALS");
    }

    #[test]
    fn round_trip_modified_values() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("nested").join("settings.toml");

        let mut cfg = BridgeConfig::default();
        cfg.stream.profile = RemoteProfile::Transcribe;
        cfg.stream.project_id = "agent-42".into();
        cfg.stream.trigger_event = Some("WELCOME".into());
        cfg.stream.finish_timeout_ms = 2_500;
        cfg.audio.channels = 2;
        cfg.artifacts.dir = Some(dir.path().join("audio"));

        cfg.save_to(&path).expect("save");
        let loaded = BridgeConfig::load_from(&path).expect("load");

        assert_eq!(loaded.stream.profile, RemoteProfile::Transcribe);
        assert_eq!(loaded.stream.project_id, "agent-42");
        assert_eq!(loaded.stream.trigger_event.as_deref(), Some("WELCOME"));
        assert_eq!(loaded.stream.finish_timeout_ms, 2_500);
        assert_eq!(loaded.audio.channels, 2);
        assert_eq!(loaded.artifacts.dir, Some(dir.path().join("audio")));
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("settings.toml");
        std::fs::write(&path, "[stream]\nproject_id = \"agent-7\"\n").expect("write");

        let cfg = BridgeConfig::load_from(&path).expect("load");
        assert_eq!(cfg.stream.project_id, "agent-7");
        assert_eq!(cfg.stream.sample_rate, 16_000);
        assert_eq!(cfg.audio.input_rate, 8_000);
    }

    #[test]
    fn load_missing_returns_default() {
        let dir = tempdir().expect("temp dir");
        let cfg = BridgeConfig::load_from(&dir.path().join("missing.toml")).expect("load");
        assert_eq!(cfg.stream.language, "en-US");
    }

    #[test]
    fn session_options_override_language_and_event() {
        let mut settings = StreamSettings::default();
        settings.trigger_event = Some("DEFAULT".into());

        let options = SessionOptions {
            language: Some("de-DE".into()),
            trigger_event: Some("GREETING".into()),
        };
        let config = settings.streaming_config(&options);
        assert_eq!(config.audio.language_code, "de-DE");
        let event = config.event.expect("event");
        assert_eq!(event.name, "GREETING");
        assert_eq!(event.language_code, "de-DE");
    }

    #[test]
    fn transcribe_profile_drops_intent_only_fields() {
        let mut settings = StreamSettings::default();
        settings.profile = RemoteProfile::Transcribe;
        settings.trigger_event = Some("WELCOME".into());

        let options = SessionOptions {
            language: None,
            trigger_event: Some("GREETING".into()),
        };
        let config = settings.streaming_config(&options);
        assert_eq!(config.profile, RemoteProfile::Transcribe);
        assert!(config.event.is_none());
        assert!(!config.audio.single_utterance);
        assert!(config.audio.interim_results);
    }

    #[test]
    fn no_event_unless_configured() {
        let config = StreamSettings::default().streaming_config(&SessionOptions::default());
        assert_eq!(config.profile, RemoteProfile::DetectIntent);
        assert!(config.audio.single_utterance);
        assert!(config.event.is_none());
        assert_eq!(config.audio.sample_rate_hertz, 16_000);
    }
}
