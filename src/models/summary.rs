use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Note;

/// Title shown for notes saved with an empty title.
pub const UNTITLED: &str = "Untitled Note";

/// Default preview length, in characters of stripped text.
pub const PREVIEW_LEN: usize = 150;

/// Display-oriented view of a note, used for list rendering.
///
/// Never carries the password hash. For a locked note the preview is empty.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NoteSummary {
    pub id: Uuid,
    pub title: String,
    pub preview: String,
    pub char_count: usize,
    pub tags: Vec<String>,
    pub is_pinned: bool,
    pub is_protected: bool,
    pub is_locked: bool,
    pub updated_at: DateTime<Utc>,
}

impl NoteSummary {
    pub fn new(note: &Note, unlocked: bool) -> Self {
        let is_locked = note.is_protected() && !unlocked;
        let text = strip_markup(&note.content);
        let title = if note.title.trim().is_empty() {
            UNTITLED.to_string()
        } else {
            note.title.clone()
        };

        Self {
            id: note.id,
            title,
            preview: if is_locked {
                String::new()
            } else {
                preview(&text, PREVIEW_LEN)
            },
            char_count: text.chars().count(),
            tags: note.tags.clone(),
            is_pinned: note.is_pinned,
            is_protected: note.is_protected(),
            is_locked,
            updated_at: note.updated_at,
        }
    }
}

/// Plain text of an HTML-ish blob: tags removed, common entities decoded.
pub fn strip_markup(content: &str) -> String {
    let mut out = String::with_capacity(content.len());
    let mut chars = content.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '<' => {
                for c in chars.by_ref() {
                    if c == '>' {
                        break;
                    }
                }
            }
            '&' => {
                let mut entity = String::new();
                while let Some(&next) = chars.peek() {
                    if matches!(next, ';' | '<' | '&') || next.is_whitespace() || entity.len() > 8
                    {
                        break;
                    }
                    entity.push(next);
                    chars.next();
                }
                match (chars.peek(), decode_entity(&entity)) {
                    (Some(';'), Some(decoded)) => {
                        chars.next();
                        out.push(decoded);
                    }
                    _ => {
                        out.push('&');
                        out.push_str(&entity);
                    }
                }
            }
            _ => out.push(c),
        }
    }

    out
}

fn decode_entity(entity: &str) -> Option<char> {
    match entity {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" | "#39" => Some('\''),
        "nbsp" => Some('\u{a0}'),
        _ => None,
    }
}

/// First `max_len` characters of `text`, with "..." appended when truncated.
pub fn preview(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        let mut cut: String = text.chars().take(max_len).collect();
        cut.push_str("...");
        cut
    } else {
        text.to_string()
    }
}

/// "Today", "Yesterday", "N days ago" within a week, else the calendar date.
pub fn relative_date(date: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let elapsed = (now - date).num_seconds().unsigned_abs();
    let days = elapsed.div_ceil(86_400);

    match days {
        0 | 1 => "Today".to_string(),
        2 => "Yesterday".to_string(),
        3..=7 => format!("{} days ago", days - 1),
        _ => date.format("%Y-%m-%d").to_string(),
    }
}
