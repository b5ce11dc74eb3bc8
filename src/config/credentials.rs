//! Process-wide credential discovery.
//!
//! The remote service authenticates with a service-account key file named by
//! an environment variable.  Discovery runs once at startup; a missing or
//! unreadable key is fatal for the whole process, not a per-call error.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CredentialsError {
    #[error("\"{0}\" must be set to the path of the service account key file")]
    Missing(String),

    #[error("credentials file {path} named by \"{var}\" is not a readable file")]
    Unreadable { var: String, path: PathBuf },
}

/// Proof that credentials were discovered.  Required to build a
/// [`Bridge`](crate::session::Bridge).
#[derive(Debug, Clone)]
pub struct Credentials {
    key_file: PathBuf,
}

impl Credentials {
    /// Read `env_var` from the process environment.
    pub fn discover(env_var: &str) -> Result<Self, CredentialsError> {
        Self::from_value(env_var, std::env::var_os(env_var))
    }

    /// Validate an already-read variable value.
    pub fn from_value(env_var: &str, value: Option<OsString>) -> Result<Self, CredentialsError> {
        let value = value
            .filter(|v| !v.is_empty())
            .ok_or_else(|| CredentialsError::Missing(env_var.to_string()))?;

        let key_file = PathBuf::from(value);
        if !key_file.is_file() {
            return Err(CredentialsError::Unreadable {
                var: env_var.to_string(),
                path: key_file,
            });
        }

        log::info!("using service credentials from {}", key_file.display());
        Ok(Self { key_file })
    }

    pub fn key_file(&self) -> &Path {
        &self.key_file
    }
}
