//! The notes store: the in-memory collection a client works against.
//!
//! The store owns the collection and applies a repository's canonical
//! response only after the repository confirms a write, so a failed call
//! never leaves a partial change behind. Every failure is logged, queued as
//! a [`Notification`] and returned to the caller.

use std::collections::HashSet;

use uuid::Uuid;

use crate::config::ClientConfig;
use crate::error::{NotesError, Result};
use crate::guard::PasswordGuard;
use crate::models::{
    validate_title, NewNote, Note, NoteInput, NotePatch, NoteSummary, PasswordHash,
    UpdateNoteInput,
};
use crate::projection::project;
use crate::repository::{self, NoteRepository};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Info,
    Error,
}

/// A user-facing message produced by a store operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub title: String,
    pub description: String,
    pub level: Level,
}

impl Notification {
    fn info(title: &str, description: impl Into<String>) -> Self {
        Self {
            title: title.to_string(),
            description: description.into(),
            level: Level::Info,
        }
    }

    fn error(title: &str, err: &NotesError) -> Self {
        Self {
            title: title.to_string(),
            description: err.user_message(),
            level: Level::Error,
        }
    }
}

pub struct NotesStore {
    repo: Box<dyn NoteRepository>,
    guard: PasswordGuard,
    notes: Vec<Note>,
    query: String,
    /// Protected notes whose password was verified this session. Never persisted.
    unlocked: HashSet<Uuid>,
    notifications: Vec<Notification>,
    loading: bool,
}

impl NotesStore {
    pub fn new(repo: Box<dyn NoteRepository>, guard: PasswordGuard) -> Self {
        Self {
            repo,
            guard,
            notes: Vec::new(),
            query: String::new(),
            unlocked: HashSet::new(),
            notifications: Vec::new(),
            loading: false,
        }
    }

    /// Build the store for `config` and load its notes.
    ///
    /// A failed initial load is not fatal: the store starts empty and the
    /// failure is left in the notification queue.
    pub async fn open(config: &ClientConfig) -> Result<Self> {
        let repo = repository::open(config).await?;
        let guard = PasswordGuard::new(config.hasher)?;
        let mut store = Self::new(repo, guard);
        let _ = store.load().await;
        Ok(store)
    }

    // ============================================================
    // Reads
    // ============================================================

    /// The raw collection, in no particular order.
    pub fn notes(&self) -> &[Note] {
        &self.notes
    }

    pub fn get(&self, id: Uuid) -> Option<&Note> {
        self.notes.iter().find(|n| n.id == id)
    }

    /// Notes matching the current search query, pinned first, newest first.
    pub fn visible_notes(&self) -> Vec<Note> {
        project(&self.notes, &self.query)
    }

    /// [`visible_notes`](Self::visible_notes) as display summaries.
    pub fn summaries(&self) -> Vec<NoteSummary> {
        self.visible_notes()
            .iter()
            .map(|n| NoteSummary::new(n, self.unlocked.contains(&n.id)))
            .collect()
    }

    pub fn search_query(&self) -> &str {
        &self.query
    }

    pub fn set_search_query(&mut self, query: impl Into<String>) {
        self.query = query.into();
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// Drain queued notifications, oldest first.
    pub fn take_notifications(&mut self) -> Vec<Notification> {
        std::mem::take(&mut self.notifications)
    }

    // ============================================================
    // Writes
    // ============================================================

    /// Replace the collection with the repository's current contents.
    pub async fn load(&mut self) -> Result<()> {
        self.loading = true;
        let result = self.repo.list().await;
        self.loading = false;

        match result {
            Ok(notes) => {
                tracing::debug!("Loaded {} notes", notes.len());
                self.notes = notes;
                Ok(())
            }
            Err(e) => self.fail("Error loading notes", e),
        }
    }

    pub async fn refresh(&mut self) -> Result<()> {
        self.load().await
    }

    pub async fn create(&mut self, input: NoteInput) -> Result<Note> {
        match self.try_create(input).await {
            Ok(note) => {
                self.merge(note.clone(), true);
                self.notify(Notification::info(
                    "Note created",
                    "Your note has been created successfully.",
                ));
                Ok(note)
            }
            Err(e) => self.fail("Error creating note", e),
        }
    }

    async fn try_create(&self, input: NoteInput) -> Result<Note> {
        validate_title(&input.title)?;
        let password_hash = self.hash_password(input.password.as_deref()).await?;

        self.repo
            .create(NewNote {
                title: input.title,
                content: input.content,
                tags: input.tags,
                is_pinned: input.is_pinned,
                password_hash,
            })
            .await
    }

    pub async fn update(&mut self, id: Uuid, input: UpdateNoteInput) -> Result<Note> {
        let changes_protection = input.password.is_some();

        match self.try_update(id, input).await {
            Ok(note) => {
                if changes_protection {
                    self.unlocked.remove(&id);
                }
                self.merge(note.clone(), false);
                self.notify(Notification::info(
                    "Note updated",
                    "Your note has been updated successfully.",
                ));
                Ok(note)
            }
            Err(e) => self.fail("Error updating note", e),
        }
    }

    async fn try_update(&self, id: Uuid, input: UpdateNoteInput) -> Result<Note> {
        if let Some(title) = &input.title {
            validate_title(title)?;
        }

        let password_hash = match input.password {
            Some(password) => Some(self.hash_password(Some(&password)).await?),
            None => None,
        };

        self.repo
            .update(
                id,
                NotePatch {
                    title: input.title,
                    content: input.content,
                    tags: input.tags,
                    is_pinned: input.is_pinned,
                    password_hash,
                },
            )
            .await
    }

    /// Delete a note. A note the repository no longer has counts as deleted.
    pub async fn delete(&mut self, id: Uuid) -> Result<()> {
        match self.repo.delete(id).await {
            Ok(()) => {}
            Err(NotesError::NotFound(_)) => {
                tracing::debug!("Note {} already gone from repository", id);
            }
            Err(e) => return self.fail("Error deleting note", e),
        }

        self.notes.retain(|n| n.id != id);
        self.unlocked.remove(&id);
        self.notify(Notification::info(
            "Note deleted",
            "Your note has been deleted successfully.",
        ));
        Ok(())
    }

    /// Flip the pin flag. An id not in the collection is a failed no-op.
    pub async fn toggle_pin(&mut self, id: Uuid) -> Result<Note> {
        let Some(was_pinned) = self.get(id).map(|n| n.is_pinned) else {
            return self.fail("Error updating note", NotesError::NotFound(id));
        };

        match self.repo.update(id, NotePatch::pin(!was_pinned)).await {
            Ok(note) => {
                let (title, verb) = if note.is_pinned {
                    ("Note pinned", "pinned")
                } else {
                    ("Note unpinned", "unpinned")
                };
                self.notify(Notification::info(
                    title,
                    format!("\"{}\" has been {}.", note.title, verb),
                ));
                self.merge(note.clone(), false);
                Ok(note)
            }
            Err(e) => self.fail("Error updating note", e),
        }
    }

    // ============================================================
    // Password protection
    // ============================================================

    /// Check a password against a note without changing unlock state.
    pub async fn verify_password(&self, id: Uuid, plaintext: &str) -> Result<bool> {
        let hash = self
            .get(id)
            .ok_or(NotesError::NotFound(id))?
            .password_hash
            .clone();
        self.verify_blocking(plaintext.to_string(), hash).await
    }

    /// Verify `plaintext` and, on success, keep the note unlocked for this session.
    pub async fn unlock(&mut self, id: Uuid, plaintext: &str) -> Result<()> {
        match self.verify_password(id, plaintext).await {
            Ok(true) => {
                self.unlocked.insert(id);
                Ok(())
            }
            Ok(false) => self.fail("Unlock failed", NotesError::Password),
            Err(e) => self.fail("Unlock failed", e),
        }
    }

    pub fn lock(&mut self, id: Uuid) {
        self.unlocked.remove(&id);
    }

    /// Unprotected notes are always unlocked.
    pub fn is_unlocked(&self, id: Uuid) -> bool {
        match self.get(id) {
            Some(note) => !note.is_protected() || self.unlocked.contains(&id),
            None => false,
        }
    }

    /// A note's content, if it is not locked.
    pub fn content(&self, id: Uuid) -> Result<&str> {
        let note = self.get(id).ok_or(NotesError::NotFound(id))?;
        if note.is_protected() && !self.unlocked.contains(&id) {
            return Err(NotesError::Locked(id));
        }
        Ok(&note.content)
    }

    // ============================================================
    // Internals
    // ============================================================

    /// Hash a password on the blocking pool. Blank means "no protection".
    async fn hash_password(&self, password: Option<&str>) -> Result<Option<PasswordHash>> {
        let Some(password) = password.filter(|p| !p.trim().is_empty()) else {
            return Ok(None);
        };

        let guard = self.guard.clone();
        let password = password.to_string();
        let hash = tokio::task::spawn_blocking(move || guard.hash(&password))
            .await
            .map_err(|e| NotesError::Hashing(e.to_string()))??;
        Ok(Some(hash))
    }

    async fn verify_blocking(&self, plaintext: String, hash: Option<PasswordHash>) -> Result<bool> {
        let guard = self.guard.clone();
        tokio::task::spawn_blocking(move || guard.verify(&plaintext, hash.as_ref()))
            .await
            .map_err(|e| NotesError::Hashing(e.to_string()))?
    }

    /// Put a canonical note into the collection, replacing any copy with the same id.
    fn merge(&mut self, note: Note, prepend: bool) {
        if let Some(existing) = self.notes.iter_mut().find(|n| n.id == note.id) {
            *existing = note;
        } else if prepend {
            self.notes.insert(0, note);
        } else {
            self.notes.push(note);
        }
    }

    fn notify(&mut self, notification: Notification) {
        self.notifications.push(notification);
    }

    fn fail<T>(&mut self, title: &str, err: NotesError) -> Result<T> {
        match &err {
            NotesError::Validation(_) | NotesError::Password | NotesError::NotFound(_) => {
                tracing::warn!("{}: {}", title, err)
            }
            _ => tracing::error!("{}: {}", title, err),
        }
        self.notify(Notification::error(title, &err));
        Err(err)
    }
}
