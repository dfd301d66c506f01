use axum::{extract::Request, http::HeaderMap, middleware::Next, response::Response};
use uuid::Uuid;

use crate::auth::decode_token;
use crate::config;

/// Per-request caller identity. Guests are first-class: writes by a guest
/// are attached to the shared anonymous account rather than rejected.
#[derive(Clone, Debug)]
pub enum Identity {
    User { id: Uuid, username: String },
    Guest,
}

impl Identity {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, Identity::User { .. })
    }

    pub fn user_id(&self) -> Option<Uuid> {
        match self {
            Identity::User { id, .. } => Some(*id),
            Identity::Guest => None,
        }
    }
}

/// Resolve the caller identity from a bearer token and inject it into the
/// request extensions. Invalid or absent tokens degrade to Guest.
pub async fn identity_middleware(headers: HeaderMap, mut request: Request, next: Next) -> Response {
    let secret = &config::config().security.jwt_secret;
    let identity = identity_from_headers(&headers, secret);
    request.extensions_mut().insert(identity);
    next.run(request).await
}

fn identity_from_headers(headers: &HeaderMap, secret: &str) -> Identity {
    let Some(token) = bearer_token(headers) else {
        return Identity::Guest;
    };

    match decode_token(token, secret) {
        Ok(claims) => Identity::User { id: claims.user_id, username: claims.username },
        Err(reason) => {
            tracing::debug!("Rejecting bearer token, continuing as guest: {}", reason);
            Identity::Guest
        }
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let auth_str = headers.get("authorization")?.to_str().ok()?;
    let token = auth_str.strip_prefix("Bearer ")?.trim();
    if token.is_empty() {
        None
    } else {
        Some(token)
    }
}
