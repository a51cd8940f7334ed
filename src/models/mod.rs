//! Domain models for notekeeper.
//!
//! # Core Concepts
//!
//! - [`Note`]: the only entity. Title, opaque rich-text content, tags, pin flag,
//!   optional password hash and timestamps.
//! - [`NoteInput`] / [`UpdateNoteInput`]: form data as the user enters it,
//!   including a plaintext password.
//! - [`NewNote`] / [`NotePatch`]: what repositories receive once the store has
//!   validated the input and hashed any password.
//! - [`NoteSummary`]: list-rendering view with a stripped-markup preview.

mod note;
mod summary;

pub use note::*;
pub use summary::*;
