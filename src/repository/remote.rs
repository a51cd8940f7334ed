//! HTTP client for the notekeeper API.
//!
//! Every request carries the bearer token; the server resolves it to an owner
//! and scopes all reads and writes to that owner's notes.

use async_trait::async_trait;
use reqwest::{Client, Method, StatusCode};
use serde::de::DeserializeOwned;
use uuid::Uuid;

use super::NoteRepository;
use crate::error::{NotesError, Result};
use crate::models::{validate_title, NewNote, Note, NotePatch};

/// Default URL for a backend running on the same machine.
pub const DEFAULT_URL: &str = "http://127.0.0.1:3000/api/v1";

#[derive(Debug, Clone)]
pub struct RemoteRepository {
    base_url: String,
    token: String,
    client: Client,
}

impl RemoteRepository {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
            client: Client::new(),
        }
    }

    fn request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        self.client.request(method, &url).bearer_auth(&self.token)
    }

    /// Convert HTTP failures into store errors. `id` names the target note
    /// for 404s on single-note routes.
    async fn check(response: reqwest::Response, id: Option<Uuid>) -> Result<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(match status {
            StatusCode::BAD_REQUEST => NotesError::Validation(body),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => NotesError::Auth(body),
            StatusCode::NOT_FOUND => match id {
                Some(id) => NotesError::NotFound(id),
                None => NotesError::Transport(format!("{}: {}", status, body)),
            },
            _ => NotesError::Transport(format!("{}: {}", status, body)),
        })
    }

    async fn json<T: DeserializeOwned>(response: reqwest::Response, id: Option<Uuid>) -> Result<T> {
        Ok(Self::check(response, id).await?.json().await?)
    }
}

#[async_trait]
impl NoteRepository for RemoteRepository {
    async fn list(&self) -> Result<Vec<Note>> {
        let response = self.request(Method::GET, "/notes").send().await?;
        Self::json(response, None).await
    }

    async fn create(&self, note: NewNote) -> Result<Note> {
        validate_title(&note.title)?;
        let response = self
            .request(Method::POST, "/notes")
            .json(&note)
            .send()
            .await?;
        Self::json(response, None).await
    }

    async fn update(&self, id: Uuid, patch: NotePatch) -> Result<Note> {
        if let Some(title) = &patch.title {
            validate_title(title)?;
        }
        let response = self
            .request(Method::PUT, &format!("/notes/{}", id))
            .json(&patch)
            .send()
            .await?;
        Self::json(response, Some(id)).await
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        let response = self
            .request(Method::DELETE, &format!("/notes/{}", id))
            .send()
            .await?;
        Self::check(response, Some(id)).await?;
        Ok(())
    }
}
