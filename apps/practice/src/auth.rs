//! Persisted login token.
//!
//! The token is opaque to this crate: whatever `/auth/login` or
//! `/auth/signup` returned is stored verbatim and sent back as a bearer token.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{debug, info};

#[derive(Debug)]
pub struct TokenStore {
    path: PathBuf,
    token: Option<String>,
}

impl TokenStore {
    /// Reads the token file. A missing or blank file means logged out.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let token = match std::fs::read_to_string(&path) {
            Ok(contents) => Some(contents.trim().to_string()).filter(|t| !t.is_empty()),
            Err(e) if e.kind() == ErrorKind::NotFound => None,
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to read token file {}", path.display()))
            }
        };
        debug!(path = %path.display(), authenticated = token.is_some(), "Token store loaded");
        Ok(Self { path, token })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    pub fn store(&mut self, token: &str) -> Result<()> {
        std::fs::write(&self.path, token)
            .with_context(|| format!("Failed to write token file {}", self.path.display()))?;
        self.token = Some(token.to_string());
        info!("Logged in");
        Ok(())
    }

    /// Logs out. Succeeds when there was nothing to remove.
    pub fn clear(&mut self) -> Result<()> {
        self.token = None;
        match std::fs::remove_file(&self.path) {
            Ok(()) => {
                info!("Logged out");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e)
                .with_context(|| format!("Failed to remove token file {}", self.path.display())),
        }
    }
}
