//! Cross-platform paths using the `dirs` crate.
//!
//! Config dir (settings):
//!   Windows: %APPDATA%\voice-stream-bridge\
//!   macOS:   ~/Library/Application Support/voice-stream-bridge/
//!   Linux:   ~/.config/voice-stream-bridge/
//!
//! Synthesized audio defaults to the OS temp directory.

use std::path::PathBuf;

/// Holds all resolved directory/file paths.
#[derive(Debug, Clone)]
pub struct ConfigPaths {
    pub config_dir: PathBuf,
    /// Full path to `settings.toml`.
    pub settings_file: PathBuf,
    /// Default directory for synthesized audio artifacts.
    pub artifacts_dir: PathBuf,
}

impl ConfigPaths {
    const APP_NAME: &'static str = "voice-stream-bridge";

    /// Falls back to the current directory if the platform cannot provide a
    /// config directory.
    pub fn new() -> Self {
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(Self::APP_NAME);
        let settings_file = config_dir.join("settings.toml");

        Self {
            config_dir,
            settings_file,
            artifacts_dir: std::env::temp_dir(),
        }
    }
}

impl Default for ConfigPaths {
    fn default() -> Self {
        Self::new()
    }
}
