pub mod responses;

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Eq, PartialEq, Ord, PartialOrd, Hash, Clone, Debug, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct UserId(pub String);
impl AsRef<str> for UserId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Eq, PartialEq, Ord, PartialOrd, Hash, Clone, Debug, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct FriendRequestId(pub String);
impl AsRef<str> for FriendRequestId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
impl fmt::Display for FriendRequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Editable profile attributes of a user.
#[derive(Clone, Debug, Serialize, Deserialize, Default, Eq, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct Profile {
    pub full_name: String,
    pub profile_pic: String,
    pub native_language: String,
    pub learning_language: String,
    pub location: String,
    pub bio: String,
}

/// Public projection of a user, as returned by every listing endpoint.
#[derive(Clone, Debug, Serialize, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: UserId,
    #[serde(flatten)]
    pub profile: Profile,
    pub is_onboarded: bool,
}

#[derive(Copy, Clone, Debug, Serialize, Deserialize, Eq, PartialEq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    Pending,
    Accepted,
}

/// A stored friend request. Rejected requests are deleted, so there is no rejected status.
#[derive(Clone, Debug, Serialize, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FriendRequest {
    pub id: FriendRequestId,
    pub sender: UserId,
    pub recipient: UserId,
    pub status: RequestStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
impl FriendRequest {
    pub fn involves(&self, user: &UserId) -> bool {
        &self.sender == user || &self.recipient == user
    }
}

/// A friend request joined with both parties' profiles.
#[derive(Clone, Debug, Serialize, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FriendRequestView {
    pub id: FriendRequestId,
    pub status: RequestStatus,
    pub sender: UserSummary,
    pub recipient: UserSummary,
    pub created_at: DateTime<Utc>,
}
