//! Client-side configuration: where notes live and how passwords are hashed.
//!
//! The binary fills this from flags or these environment variables:
//! - `NOTEKEEPER_DATA_DIR` - directory of the local notes file
//! - `NOTEKEEPER_URL` - API base URL (default: [`DEFAULT_URL`])
//! - `NOTEKEEPER_TOKEN` - bearer token; when set, notes are stored remotely

use std::path::{Path, PathBuf};

use crate::guard::HasherConfig;
use crate::repository::DEFAULT_URL;

const APP_NAME: &str = "notekeeper";

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub data_dir: PathBuf,
    pub url: String,
    pub token: Option<String>,
    pub hasher: HasherConfig,
}

/// Which repository the store should talk to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Backend<'a> {
    Local { data_dir: &'a Path },
    Remote { url: &'a str, token: &'a str },
}

impl ClientConfig {
    /// Local storage in `data_dir`, default hasher settings.
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            url: DEFAULT_URL.to_string(),
            token: None,
            hasher: HasherConfig::default(),
        }
    }

    pub fn with_remote(mut self, url: impl Into<String>, token: impl Into<String>) -> Self {
        self.url = url.into();
        self.token = Some(token.into());
        self
    }

    /// Remote when a non-blank token is configured, local otherwise.
    pub fn backend(&self) -> Backend<'_> {
        match self.token.as_deref() {
            Some(token) if !token.trim().is_empty() => Backend::Remote {
                url: &self.url,
                token,
            },
            _ => Backend::Local {
                data_dir: &self.data_dir,
            },
        }
    }
}

/// Platform data directory, falling back to `./.notekeeper`.
pub fn default_data_dir() -> PathBuf {
    directories::ProjectDirs::from("", "", APP_NAME)
        .map(|dirs| dirs.data_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from(".notekeeper"))
}

/// Default SQLite file for the server.
pub fn default_db_path() -> PathBuf {
    default_data_dir().join("notekeeper.db")
}
