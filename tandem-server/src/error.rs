//! Error types for the social graph and the HTTP boundary.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use tandem_common::responses::{ErrorKind, ErrorResponse};
use tandem_common::{FriendRequestId, RequestStatus, UserId};
use thiserror::Error;

/// Failures of relationship, recommendation and query operations.
#[derive(Debug, Error)]
pub enum SocialError {
    #[error("user '{0}' not found")]
    UserNotFound(UserId),

    #[error("friend request '{0}' not found")]
    RequestNotFound(FriendRequestId),

    /// Only the recipient of a request may answer it.
    #[error("user '{viewer}' is not the recipient of friend request '{request}'")]
    Forbidden {
        viewer: UserId,
        request: FriendRequestId,
    },

    #[error("friend request '{request}' is already {status:?}")]
    InvalidState {
        request: FriendRequestId,
        status: RequestStatus,
    },

    #[error("you can't send a friend request to yourself")]
    InvalidTarget,

    #[error("you are already friends with user '{0}'")]
    AlreadyFriends(UserId),

    #[error("a friend request already exists between you and user '{0}'")]
    DuplicateRequest(UserId),

    #[error("user '{0}' is not in your friends list")]
    NotAFriend(UserId),

    #[error("profile is missing required fields: {}", .0.join(", "))]
    InvalidProfile(Vec<&'static str>),

    #[error("storage error: {0}")]
    Storage(#[from] sled::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl SocialError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SocialError::UserNotFound(_) | SocialError::RequestNotFound(_) => ErrorKind::NotFound,
            SocialError::Forbidden { .. } => ErrorKind::Forbidden,
            SocialError::InvalidState { .. } => ErrorKind::InvalidState,
            SocialError::InvalidTarget => ErrorKind::InvalidTarget,
            SocialError::AlreadyFriends(_) => ErrorKind::AlreadyFriends,
            SocialError::DuplicateRequest(_) => ErrorKind::DuplicateRequest,
            SocialError::NotAFriend(_) => ErrorKind::NotAFriend,
            SocialError::InvalidProfile(_) => ErrorKind::InvalidProfile,
            SocialError::Storage(_) | SocialError::Serialization(_) => ErrorKind::Internal,
        }
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

/// Errors surfaced by HTTP handlers.
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Social(#[from] SocialError),

    #[error("authentication required: {0}")]
    Unauthorized(String),
}

impl AppError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::Social(err) => err.kind(),
            AppError::Unauthorized(_) => ErrorKind::Unauthorized,
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self.kind() {
            ErrorKind::NotFound | ErrorKind::NotAFriend => StatusCode::NOT_FOUND,
            ErrorKind::Forbidden => StatusCode::FORBIDDEN,
            ErrorKind::InvalidState => StatusCode::CONFLICT,
            ErrorKind::InvalidTarget
            | ErrorKind::AlreadyFriends
            | ErrorKind::DuplicateRequest
            | ErrorKind::InvalidProfile => StatusCode::BAD_REQUEST,
            ErrorKind::Unauthorized => StatusCode::UNAUTHORIZED,
            ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

// Tell axum how to convert `AppError` into a response.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        let body = ErrorResponse {
            error: self.kind(),
            message: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}
