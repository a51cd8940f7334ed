//! Notes kept in a single JSON document on the local disk.
//!
//! The whole collection is one JSON array under a fixed file name in the data
//! directory. Every mutation rewrites the full array (temp file + rename)
//! before the in-memory copy changes.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::NoteRepository;
use crate::error::{NotesError, Result};
use crate::models::{validate_title, NewNote, Note, NotePatch};
use crate::projection::display_order;

/// File name of the serialized collection inside the data directory.
pub const STORAGE_FILE: &str = "notes-app-data.json";

pub struct LocalRepository {
    path: PathBuf,
    notes: Mutex<Vec<Note>>,
}

impl LocalRepository {
    /// Open (or start) the collection stored in `dir`.
    ///
    /// An unreadable or malformed file is logged and treated as "no notes".
    pub async fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        tokio::fs::create_dir_all(dir).await?;
        let path = dir.join(STORAGE_FILE);
        let notes = load(&path).await;
        tracing::debug!("Loaded {} notes from {}", notes.len(), path.display());

        Ok(Self {
            path,
            notes: Mutex::new(notes),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn persist(&self, notes: &[Note]) -> Result<()> {
        let json = serde_json::to_vec_pretty(notes)?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

async fn load(path: &Path) -> Vec<Note> {
    let raw = match tokio::fs::read_to_string(path).await {
        Ok(raw) => raw,
        Err(e) if e.kind() == ErrorKind::NotFound => return Vec::new(),
        Err(e) => {
            tracing::warn!("Error loading notes from {}: {}", path.display(), e);
            return Vec::new();
        }
    };

    match serde_json::from_str(&raw) {
        Ok(notes) => notes,
        Err(e) => {
            tracing::warn!("Error loading notes from {}: {}", path.display(), e);
            Vec::new()
        }
    }
}

#[async_trait]
impl NoteRepository for LocalRepository {
    async fn list(&self) -> Result<Vec<Note>> {
        let mut notes = self.notes.lock().await.clone();
        notes.sort_by(display_order);
        Ok(notes)
    }

    async fn create(&self, input: NewNote) -> Result<Note> {
        validate_title(&input.title)?;

        let mut notes = self.notes.lock().await;
        let note = Note::from_new(input, None);

        let mut next = Vec::with_capacity(notes.len() + 1);
        next.push(note.clone());
        next.extend(notes.iter().cloned());
        self.persist(&next).await?;
        *notes = next;

        Ok(note)
    }

    async fn update(&self, id: Uuid, patch: NotePatch) -> Result<Note> {
        if let Some(title) = &patch.title {
            validate_title(title)?;
        }

        let mut notes = self.notes.lock().await;
        let index = notes
            .iter()
            .position(|n| n.id == id)
            .ok_or(NotesError::NotFound(id))?;

        let mut next = notes.clone();
        next[index].apply(patch);
        let updated = next[index].clone();
        self.persist(&next).await?;
        *notes = next;

        Ok(updated)
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        let mut notes = self.notes.lock().await;
        if !notes.iter().any(|n| n.id == id) {
            return Err(NotesError::NotFound(id));
        }

        let next: Vec<Note> = notes.iter().filter(|n| n.id != id).cloned().collect();
        self.persist(&next).await?;
        *notes = next;

        Ok(())
    }
}
