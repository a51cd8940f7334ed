//! Persistence adapters behind the notes store.
//!
//! [`NoteRepository`] is the only thing the store knows about storage. Two
//! implementations exist:
//!
//! - [`LocalRepository`]: one JSON document on disk, no owner.
//! - [`RemoteRepository`]: the HTTP API, scoped to the authenticated owner.
//!
//! [`open`] picks one at startup from the configuration.

mod local;
mod remote;

pub use local::{LocalRepository, STORAGE_FILE};
pub use remote::{RemoteRepository, DEFAULT_URL};

use async_trait::async_trait;
use uuid::Uuid;

use crate::config::{Backend, ClientConfig};
use crate::error::Result;
use crate::models::{NewNote, Note, NotePatch};

/// Durable storage for notes.
///
/// Implementations return canonical records: ids and timestamps are always
/// assigned here, never by the caller.
#[async_trait]
pub trait NoteRepository: Send + Sync {
    /// All visible notes, pinned first, then most recently updated.
    async fn list(&self) -> Result<Vec<Note>>;

    /// Store a new note. Fails with `Validation` on a blank title.
    async fn create(&self, note: NewNote) -> Result<Note>;

    /// Merge `patch` into an existing note and refresh `updated_at`.
    async fn update(&self, id: Uuid, patch: NotePatch) -> Result<Note>;

    /// Remove a note. Fails with `NotFound` if it does not exist.
    async fn delete(&self, id: Uuid) -> Result<()>;
}

/// Build the repository the configuration asks for.
pub async fn open(config: &ClientConfig) -> Result<Box<dyn NoteRepository>> {
    match config.backend() {
        Backend::Remote { url, token } => {
            tracing::info!("Using remote notes at {}", url);
            Ok(Box::new(RemoteRepository::new(url, token)))
        }
        Backend::Local { data_dir } => {
            tracing::info!("Using local notes in {}", data_dir.display());
            Ok(Box::new(LocalRepository::open(data_dir).await?))
        }
    }
}
