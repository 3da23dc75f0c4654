//! Service credentials.
//!
//! Read from the config file, a `credentials.json` style file, or the
//! `DISCOVERY_USERNAME` / `DISCOVERY_PASSWORD` environment variables.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::Path;

use crate::error::{Error, Result};

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            Error::Config(format!(
                "cannot read credentials file {}: {}",
                path.display(),
                e
            ))
        })?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Both variables must be set; otherwise `None`.
    pub fn from_env() -> Option<Self> {
        let username = std::env::var("DISCOVERY_USERNAME").ok()?;
        let password = std::env::var("DISCOVERY_PASSWORD").ok()?;
        Some(Self::new(username, password))
    }
}
