//! Bearer-token authentication for the notes API.

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    middleware::Next,
    response::Response,
};

/// The authenticated user a request acts for.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Owner(pub String);

/// Security configuration loaded from environment variables.
#[derive(Clone, Debug, Default)]
pub struct SecurityConfig {
    /// Bearer token -> owner id (from NOTEKEEPER_TOKENS, `owner=token` pairs, comma-separated)
    pub tokens: Arc<HashMap<String, String>>,
    /// Allowed CORS origins (from NOTEKEEPER_CORS_ORIGINS, comma-separated)
    pub cors_origins: Option<Vec<String>>,
}

impl SecurityConfig {
    /// Load security configuration from environment variables.
    pub fn from_env() -> Self {
        let tokens = std::env::var("NOTEKEEPER_TOKENS")
            .map(|s| parse_tokens(&s))
            .unwrap_or_default();

        let cors_origins = std::env::var("NOTEKEEPER_CORS_ORIGINS")
            .ok()
            .map(|s| s.split(',').map(|s| s.trim().to_string()).collect());

        if tokens.is_empty() {
            tracing::warn!("NOTEKEEPER_TOKENS is empty; every notes request will be rejected");
        }

        Self {
            tokens: Arc::new(tokens),
            cors_origins,
        }
    }

    /// A config that accepts `token` as `owner` (for testing).
    pub fn with_token(owner: impl Into<String>, token: impl Into<String>) -> Self {
        Self::default().and_token(owner, token)
    }

    pub fn and_token(mut self, owner: impl Into<String>, token: impl Into<String>) -> Self {
        Arc::make_mut(&mut self.tokens).insert(token.into(), owner.into());
        self
    }

    fn owner_for(&self, token: &str) -> Option<Owner> {
        self.tokens.get(token).cloned().map(Owner)
    }
}

/// Parse `owner=token,owner2=token2`. Malformed entries are skipped.
pub fn parse_tokens(raw: &str) -> HashMap<String, String> {
    raw.split(',')
        .filter_map(|pair| {
            let (owner, token) = pair.split_once('=')?;
            let (owner, token) = (owner.trim(), token.trim());
            if owner.is_empty() || token.is_empty() {
                tracing::warn!("Ignoring malformed token entry");
                return None;
            }
            Some((token.to_string(), owner.to_string()))
        })
        .collect()
}

/// Resolve the bearer token to an [`Owner`] and attach it to the request.
pub async fn auth_middleware(
    State(config): State<SecurityConfig>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, StatusCode> {
    let auth_header = request
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok());

    let owner = match auth_header.and_then(|h| h.strip_prefix("Bearer ")) {
        Some(token) => match config.owner_for(token) {
            Some(owner) => owner,
            None => {
                tracing::warn!("Invalid bearer token provided");
                return Err(StatusCode::UNAUTHORIZED);
            }
        },
        None if auth_header.is_some() => {
            tracing::warn!("Invalid Authorization header format");
            return Err(StatusCode::UNAUTHORIZED);
        }
        None => {
            tracing::warn!("Missing Authorization header");
            return Err(StatusCode::UNAUTHORIZED);
        }
    };

    request.extensions_mut().insert(owner);
    Ok(next.run(request).await)
}
