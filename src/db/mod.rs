mod schema;

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::Result;
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{Connection, OptionalExtension, Row};
use uuid::Uuid;

use crate::models::{validate_title, NewNote, Note, NotePatch, PasswordHash};

const NOTE_COLUMNS: &str =
    "id, owner_id, title, content, tags, is_pinned, password_hash, created_at, updated_at";

/// Server-side note storage. Every operation is scoped to one owner.
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    pub fn open(path: PathBuf) -> Result<Self> {
        let parent = path
            .parent()
            .ok_or_else(|| anyhow::anyhow!("Database path has no parent directory"))?;
        std::fs::create_dir_all(parent)?;
        let conn = Connection::open(&path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn migrate(&self) -> Result<()> {
        let mut conn = self.conn.lock().expect("database lock poisoned");
        schema::run_migrations(&mut conn)
    }

    // ============================================================
    // Note operations
    // ============================================================

    /// The owner's notes, pinned first, then most recently updated.
    pub fn list_notes(&self, owner: &str) -> Result<Vec<Note>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let mut stmt = conn.prepare(&format!(
            "SELECT {NOTE_COLUMNS} FROM notes
             WHERE owner_id = ? ORDER BY is_pinned DESC, updated_at DESC"
        ))?;

        let notes = stmt
            .query_map([owner], note_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(notes)
    }

    pub fn get_note(&self, owner: &str, id: Uuid) -> Result<Option<Note>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let mut stmt = conn.prepare(&format!(
            "SELECT {NOTE_COLUMNS} FROM notes WHERE owner_id = ? AND id = ?"
        ))?;

        let mut rows = stmt.query((owner, id.to_string()))?;
        match rows.next()? {
            Some(row) => Ok(Some(note_from_row(row)?)),
            None => Ok(None),
        }
    }

    pub fn create_note(&self, owner: &str, input: NewNote) -> Result<Note> {
        validate_title(&input.title)?;
        let note = Note::from_new(input, Some(owner.to_string()));

        let conn = self.conn.lock().expect("database lock poisoned");
        conn.execute(
            &format!("INSERT INTO notes ({NOTE_COLUMNS}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)"),
            (
                note.id.to_string(),
                owner,
                &note.title,
                &note.content,
                serde_json::to_string(&note.tags)?,
                note.is_pinned,
                note.password_hash.as_ref().map(PasswordHash::as_str),
                format_datetime(note.created_at),
                format_datetime(note.updated_at),
            ),
        )?;

        Ok(note)
    }

    /// Merge `patch` into the owner's note. `None` if the owner has no such note.
    ///
    /// The read and the write share one transaction under the connection lock,
    /// so concurrent patches and deletes cannot interleave between them.
    pub fn update_note(&self, owner: &str, id: Uuid, patch: NotePatch) -> Result<Option<Note>> {
        if let Some(title) = &patch.title {
            validate_title(title)?;
        }

        let mut conn = self.conn.lock().expect("database lock poisoned");
        let tx = conn.transaction()?;

        let current = tx
            .query_row(
                &format!("SELECT {NOTE_COLUMNS} FROM notes WHERE owner_id = ? AND id = ?"),
                (owner, id.to_string()),
                note_from_row,
            )
            .optional()?;
        let Some(mut note) = current else {
            return Ok(None);
        };
        note.apply(patch);

        let changed = tx.execute(
            "UPDATE notes SET title = ?, content = ?, tags = ?, is_pinned = ?, password_hash = ?, updated_at = ?
             WHERE owner_id = ? AND id = ?",
            (
                &note.title,
                &note.content,
                serde_json::to_string(&note.tags)?,
                note.is_pinned,
                note.password_hash.as_ref().map(PasswordHash::as_str),
                format_datetime(note.updated_at),
                owner,
                id.to_string(),
            ),
        )?;
        if changed == 0 {
            return Ok(None);
        }
        tx.commit()?;

        Ok(Some(note))
    }

    pub fn delete_note(&self, owner: &str, id: Uuid) -> Result<bool> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let rows = conn.execute(
            "DELETE FROM notes WHERE owner_id = ? AND id = ?",
            (owner, id.to_string()),
        )?;
        Ok(rows > 0)
    }
}

impl Clone for Database {
    fn clone(&self) -> Self {
        Self {
            conn: self.conn.clone(),
        }
    }
}

fn note_from_row(row: &Row<'_>) -> rusqlite::Result<Note> {
    let id: String = row.get(0)?;
    Ok(Note {
        id: parse_uuid(&id),
        owner_id: Some(row.get(1)?),
        title: row.get(2)?,
        content: row.get(3)?,
        tags: parse_tags(&id, &row.get::<_, String>(4)?),
        is_pinned: row.get(5)?,
        password_hash: row.get::<_, Option<String>>(6)?.map(PasswordHash::new),
        created_at: parse_datetime(&id, &row.get::<_, String>(7)?),
        updated_at: parse_datetime(&id, &row.get::<_, String>(8)?),
    })
}

/// Fixed-width RFC 3339 so that text ordering matches time ordering.
fn format_datetime(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_uuid(s: &str) -> Uuid {
    Uuid::parse_str(s).unwrap_or_else(|e| {
        tracing::warn!(id = s, "Stored note has an invalid id: {}", e);
        Uuid::nil()
    })
}

fn parse_tags(id: &str, s: &str) -> Vec<String> {
    serde_json::from_str(s).unwrap_or_else(|e| {
        tracing::warn!(id, "Stored tags are not a JSON string array, dropping them: {}", e);
        Vec::new()
    })
}

fn parse_datetime(id: &str, s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|e| {
            tracing::warn!(id, value = s, "Stored timestamp is invalid, using now: {}", e);
            Utc::now()
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn corrupt_columns_fall_back_instead_of_failing_the_read() {
        let db = Database::open_memory().unwrap();
        db.migrate().unwrap();
        let id = Uuid::new_v4();
        {
            let conn = db.conn.lock().unwrap();
            conn.execute(
                &format!("INSERT INTO notes ({NOTE_COLUMNS}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)"),
                (
                    id.to_string(),
                    "alice",
                    "broken",
                    "",
                    "not json",
                    false,
                    None::<String>,
                    "yesterday",
                    format_datetime(Utc::now()),
                ),
            )
            .unwrap();
        }

        let note = db.get_note("alice", id).unwrap().unwrap();
        assert_eq!(note.id, id);
        assert!(note.tags.is_empty());
        assert_eq!(note.title, "broken");
    }
}
