//! Search filtering and display ordering of a notes collection.

use std::cmp::Ordering;

use crate::models::Note;

/// Case-insensitive substring match on title, raw content (markup included)
/// or any tag. A whitespace-only query matches everything; otherwise the
/// query is used as typed, surrounding spaces included.
pub fn matches(note: &Note, query: &str) -> bool {
    if query.trim().is_empty() {
        return true;
    }
    let query = query.to_lowercase();

    note.title.to_lowercase().contains(&query)
        || note.content.to_lowercase().contains(&query)
        || note.tags.iter().any(|t| t.to_lowercase().contains(&query))
}

/// Pinned notes first, then most recently updated.
pub fn display_order(a: &Note, b: &Note) -> Ordering {
    b.is_pinned
        .cmp(&a.is_pinned)
        .then_with(|| b.updated_at.cmp(&a.updated_at))
}

/// The notes matching `query`, in display order. Ties keep their input order.
pub fn project(notes: &[Note], query: &str) -> Vec<Note> {
    let mut visible: Vec<Note> = notes
        .iter()
        .filter(|n| matches(n, query))
        .cloned()
        .collect();
    visible.sort_by(display_order);
    visible
}
