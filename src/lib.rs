//! Personal notes: tags, pinning, search and optional password protection.
//!
//! The [`store::NotesStore`] is what a client works against. It talks to a
//! [`repository::NoteRepository`], either a JSON file on disk or the HTTP API
//! served by [`api::create_router`] on top of [`db::Database`].

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod guard;
pub mod models;
pub mod projection;
pub mod repository;
pub mod store;

pub use error::{NotesError, Result};
