use std::fmt;

use chrono::{DateTime, SubsecRound, TimeDelta, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use crate::error::{NotesError, Result};

/// A personal note.
///
/// `content` is an opaque formatted-text blob produced by whatever editor the
/// client uses. Nothing in the crate parses it except to strip markup for
/// previews. `password_hash` is present iff the note is protected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub is_pinned: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password_hash: Option<PasswordHash>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Set by the remote backend only; local notes have no owner.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<String>,
}

impl Note {
    /// Build a fresh note from validated fields. Both timestamps are equal.
    pub fn from_new(input: NewNote, owner_id: Option<String>) -> Self {
        let now = now();
        Self {
            id: Uuid::new_v4(),
            title: input.title,
            content: input.content,
            tags: input.tags,
            is_pinned: input.is_pinned,
            password_hash: input.password_hash,
            created_at: now,
            updated_at: now,
            owner_id,
        }
    }

    pub fn is_protected(&self) -> bool {
        self.password_hash.is_some()
    }

    /// Merge the fields present in `patch` and advance `updated_at`.
    pub fn apply(&mut self, patch: NotePatch) {
        if let Some(title) = patch.title {
            self.title = title;
        }
        if let Some(content) = patch.content {
            self.content = content;
        }
        if let Some(tags) = patch.tags {
            self.tags = tags;
        }
        if let Some(is_pinned) = patch.is_pinned {
            self.is_pinned = is_pinned;
        }
        if let Some(password_hash) = patch.password_hash {
            self.password_hash = password_hash;
        }
        self.updated_at = touch(self.updated_at);
    }
}

/// A salted one-way password hash in PHC string format.
///
/// Never prints its value: `Debug` is redacted and there is no `Display`.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PasswordHash(String);

impl PasswordHash {
    pub fn new(encoded: impl Into<String>) -> Self {
        Self(encoded.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for PasswordHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PasswordHash(<redacted>)")
    }
}

/// Form data for creating a note. `password` is plaintext and is hashed by
/// the store before anything reaches a repository.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NoteInput {
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub is_pinned: bool,
    #[serde(default)]
    pub password: Option<String>,
}

impl NoteInput {
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
            ..Default::default()
        }
    }

    /// Add a tag unless it is blank or already present. Returns whether it was added.
    pub fn add_tag(&mut self, tag: &str) -> bool {
        add_tag(&mut self.tags, tag)
    }
}

/// Partial form data for updating a note. Omitted fields are left unchanged.
///
/// `password`: `None` leaves protection as is, `Some("")` removes it, any
/// other value replaces it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateNoteInput {
    pub title: Option<String>,
    pub content: Option<String>,
    pub tags: Option<Vec<String>>,
    pub is_pinned: Option<bool>,
    pub password: Option<String>,
}

impl UpdateNoteInput {
    /// True when applying this would change nothing.
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.content.is_none()
            && self.tags.is_none()
            && self.is_pinned.is_none()
            && self.password.is_none()
    }
}

/// A validated note as handed to a repository: the password is already hashed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewNote {
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub is_pinned: bool,
    #[serde(default)]
    pub password_hash: Option<PasswordHash>,
}

/// Partial update as handed to a repository.
///
/// `password_hash` distinguishes three cases on the wire: field absent
/// (unchanged), `null` (clear protection), a string (new hash).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NotePatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_pinned: Option<bool>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "present_or_null"
    )]
    pub password_hash: Option<Option<PasswordHash>>,
}

impl NotePatch {
    pub fn pin(is_pinned: bool) -> Self {
        Self {
            is_pinned: Some(is_pinned),
            ..Default::default()
        }
    }
}

fn present_or_null<'de, D, T>(deserializer: D) -> std::result::Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Reject blank titles.
pub fn validate_title(title: &str) -> Result<()> {
    if title.trim().is_empty() {
        return Err(NotesError::Validation("Title is required".to_string()));
    }
    Ok(())
}

/// Append a trimmed tag unless it is blank or an exact duplicate.
pub fn add_tag(tags: &mut Vec<String>, tag: &str) -> bool {
    let tag = tag.trim();
    if tag.is_empty() || tags.iter().any(|t| t == tag) {
        return false;
    }
    tags.push(tag.to_string());
    true
}

/// Remove every exact (case-sensitive) match of `tag`. Returns how many were removed.
pub fn remove_tag(tags: &mut Vec<String>, tag: &str) -> usize {
    let before = tags.len();
    tags.retain(|t| t != tag);
    before - tags.len()
}

/// Current time at the precision notes are stored with.
pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

/// A timestamp strictly later than `previous`, even if the clock has not moved.
pub fn touch(previous: DateTime<Utc>) -> DateTime<Utc> {
    let now = now();
    if now > previous {
        now
    } else {
        previous + TimeDelta::microseconds(1)
    }
}
