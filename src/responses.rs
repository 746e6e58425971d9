use serde::{Deserialize, Serialize};

use crate::{FriendRequestId, FriendRequestView, RequestStatus};

#[derive(Clone, Debug, Serialize, Deserialize, Eq, PartialEq)]
pub struct SendFriendRequestResponse {
    pub id: FriendRequestId,
    pub status: RequestStatus,
}

#[derive(Clone, Debug, Serialize, Deserialize, Eq, PartialEq)]
pub struct SuccessResponse {
    pub success: bool,
}
impl SuccessResponse {
    pub fn ok() -> Self {
        Self { success: true }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, Default, Eq, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FriendRequestsResponse {
    pub incoming_reqs: Vec<FriendRequestView>,
    pub accepted_reqs: Vec<FriendRequestView>,
}

#[derive(Clone, Debug, Serialize, Deserialize, Eq, PartialEq)]
pub struct HealthResponse {
    pub status: String,
}

/// Machine readable failure kind, so callers can tell "already requested" apart from a generic error.
#[derive(Copy, Clone, Debug, Serialize, Deserialize, Eq, PartialEq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    NotFound,
    Forbidden,
    InvalidState,
    InvalidTarget,
    AlreadyFriends,
    DuplicateRequest,
    NotAFriend,
    InvalidProfile,
    Unauthorized,
    Internal,
}

#[derive(Clone, Debug, Serialize, Deserialize, Eq, PartialEq)]
pub struct ErrorResponse {
    pub error: ErrorKind,
    pub message: String,
}
