//! Configuration module.
//!
//! Provides `BridgeConfig` (top-level settings) with one sub-config per
//! concern, `ConfigPaths` for cross-platform locations, `Credentials` for the
//! process-wide startup check, and TOML persistence via
//! `BridgeConfig::load_from` / `BridgeConfig::save_to`.

pub mod credentials;
pub mod paths;
pub mod settings;

pub use credentials::{Credentials, CredentialsError};
pub use paths::ConfigPaths;
pub use settings::{
    ArtifactSettings, AudioSettings, BridgeConfig, CredentialSettings, RemoteProfile,
    SessionOptions, StreamSettings,
};
