use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use uuid::Uuid;

use super::middleware::Owner;
use crate::db::Database;
use crate::error::NotesError;
use crate::models::*;

// ============================================================
// Error Handling
// ============================================================

/// Log an internal error and return a sanitized response to the client.
///
/// Validation failures are safe to expose and come back as 400 with their
/// message; everything else is a generic 500.
fn internal_error(e: anyhow::Error) -> (StatusCode, String) {
    if let Some(NotesError::Validation(msg)) = e.downcast_ref::<NotesError>() {
        tracing::warn!("Validation error: {}", msg);
        return (StatusCode::BAD_REQUEST, msg.clone());
    }

    tracing::error!("Internal error: {:#}", e);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "Internal server error".to_string(),
    )
}

fn not_found() -> (StatusCode, String) {
    (StatusCode::NOT_FOUND, "Note not found".to_string())
}

// ============================================================
// Health
// ============================================================

pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

// ============================================================
// Notes
// ============================================================

pub async fn list_notes(
    State(db): State<Database>,
    Extension(Owner(owner)): Extension<Owner>,
) -> Result<Json<Vec<Note>>, (StatusCode, String)> {
    db.list_notes(&owner).map(Json).map_err(internal_error)
}

pub async fn get_note(
    State(db): State<Database>,
    Extension(Owner(owner)): Extension<Owner>,
    Path(id): Path<Uuid>,
) -> Result<Json<Note>, (StatusCode, String)> {
    db.get_note(&owner, id)
        .map_err(internal_error)?
        .map(Json)
        .ok_or_else(not_found)
}

pub async fn create_note(
    State(db): State<Database>,
    Extension(Owner(owner)): Extension<Owner>,
    Json(input): Json<NewNote>,
) -> Result<(StatusCode, Json<Note>), (StatusCode, String)> {
    db.create_note(&owner, input)
        .map(|n| {
            tracing::debug!("Created note {} for {}", n.id, owner);
            (StatusCode::CREATED, Json(n))
        })
        .map_err(internal_error)
}

pub async fn update_note(
    State(db): State<Database>,
    Extension(Owner(owner)): Extension<Owner>,
    Path(id): Path<Uuid>,
    Json(patch): Json<NotePatch>,
) -> Result<Json<Note>, (StatusCode, String)> {
    db.update_note(&owner, id, patch)
        .map_err(internal_error)?
        .map(Json)
        .ok_or_else(not_found)
}

pub async fn delete_note(
    State(db): State<Database>,
    Extension(Owner(owner)): Extension<Owner>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, (StatusCode, String)> {
    if db.delete_note(&owner, id).map_err(internal_error)? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(not_found())
    }
}
