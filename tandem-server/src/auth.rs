//! Authenticated viewer identity.
//!
//! Authentication itself happens upstream. The gateway verifies the session and forwards the
//! user id in a trusted header; handlers never take the viewer from a path or body.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use tandem_common::UserId;

use crate::error::AppError;
use crate::state::AppState;

/// The user on whose behalf an operation runs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Viewer {
    id: UserId,
}

impl Viewer {
    pub fn new(id: UserId) -> Self {
        Self { id }
    }

    pub fn id(&self) -> &UserId {
        &self.id
    }
}

impl<S> FromRequestParts<S> for Viewer
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header = parts
            .extensions
            .get::<AppState>()
            .map(|state| state.config.auth_header.clone())
            .ok_or_else(|| AppError::Unauthorized("no authentication configured".into()))?;
        let value = parts
            .headers
            .get(header.as_str())
            .ok_or_else(|| AppError::Unauthorized(format!("missing {header} header")))?;
        let id = value
            .to_str()
            .map_err(|_| AppError::Unauthorized(format!("malformed {header} header")))?
            .trim();
        if id.is_empty() {
            return Err(AppError::Unauthorized(format!("empty {header} header")));
        }
        Ok(Viewer::new(UserId(id.to_string())))
    }
}
