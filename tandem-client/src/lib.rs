use tandem_common::responses::{ErrorKind, ErrorResponse};
use tandem_common::UserId;
use thiserror::Error;

pub use reqwest::Client;

/// Where the API lives and whom requests are made for.
///
/// `user` is sent in the identity header the authentication gateway would normally set.
#[derive(Clone, Debug)]
pub struct Endpoint {
    pub base_url: String,
    pub user: UserId,
    pub auth_header: String,
}
impl Endpoint {
    pub fn new(base_url: impl Into<String>, user: UserId) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            user,
            auth_header: String::from("x-authenticated-user"),
        }
    }
    pub fn url(&self, path: &str) -> String {
        self.base_url.clone() + path
    }
}

/// A non-success response from the API, decoded from the error envelope.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{status} {kind:?}: {message}")]
pub struct ApiError {
    pub status: u16,
    pub kind: ErrorKind,
    pub message: String,
}

/// Returns the API error behind `err`, if the failure came from the server.
pub fn api_error(err: &anyhow::Error) -> Option<&ApiError> {
    err.downcast_ref::<ApiError>()
}

pub mod client {
    use anyhow::{Context, Result};
    use reqwest::{Client, RequestBuilder, Response};
    use serde::de::DeserializeOwned;
    use tandem_common::responses::{
        FriendRequestsResponse, SendFriendRequestResponse, SuccessResponse,
    };
    use tandem_common::{FriendRequestId, FriendRequestView, Profile, UserId, UserSummary};

    use crate::{ApiError, Endpoint, ErrorResponse};

    async fn decode<T: DeserializeOwned>(response: Response) -> Result<T> {
        let status = response.status();
        if status.is_success() {
            return Ok(response.json::<T>().await?);
        }
        let body: ErrorResponse = response
            .json()
            .await
            .with_context(|| format!("unexpected {status} response"))?;
        Err(ApiError {
            status: status.as_u16(),
            kind: body.error,
            message: body.message,
        }
        .into())
    }

    async fn send<T: DeserializeOwned>(endpoint: &Endpoint, request: RequestBuilder) -> Result<T> {
        decode(
            request
                .header(endpoint.auth_header.as_str(), endpoint.user.0.as_str())
                .send()
                .await?,
        )
        .await
    }

    pub async fn create_account(client: &Client, base_url: &str, profile: &Profile) -> Result<UserSummary> {
        decode(
            client
                .post(base_url.trim_end_matches('/').to_string() + "/api/accounts")
                .json(profile)
                .send()
                .await?,
        )
        .await
    }
    pub async fn complete_onboarding(client: &Client, endpoint: &Endpoint, profile: &Profile) -> Result<UserSummary> {
        send(endpoint, client.put(endpoint.url("/api/users/onboarding")).json(profile)).await
    }
    pub async fn get_recommended_users(client: &Client, endpoint: &Endpoint) -> Result<Vec<UserSummary>> {
        send(endpoint, client.get(endpoint.url("/api/users"))).await
    }
    pub async fn get_friends(client: &Client, endpoint: &Endpoint) -> Result<Vec<UserSummary>> {
        send(endpoint, client.get(endpoint.url("/api/users/friends"))).await
    }
    pub async fn send_friend_request(client: &Client, endpoint: &Endpoint, target: &UserId) -> Result<SendFriendRequestResponse> {
        send(endpoint, client.post(endpoint.url("/api/users/friend-request/") + &target.0)).await
    }
    pub async fn accept_friend_request(client: &Client, endpoint: &Endpoint, id: &FriendRequestId) -> Result<()> {
        let _: SuccessResponse = send(
            endpoint,
            client.put(endpoint.url("/api/users/friend-request/") + &id.0 + "/accept"),
        )
        .await?;
        Ok(())
    }
    pub async fn reject_friend_request(client: &Client, endpoint: &Endpoint, id: &FriendRequestId) -> Result<()> {
        let _: SuccessResponse = send(
            endpoint,
            client.put(endpoint.url("/api/users/friend-request/") + &id.0 + "/reject"),
        )
        .await?;
        Ok(())
    }
    pub async fn remove_friend(client: &Client, endpoint: &Endpoint, friend: &UserId) -> Result<()> {
        let _: SuccessResponse = send(
            endpoint,
            client.delete(endpoint.url("/api/users/remove-friend/") + &friend.0),
        )
        .await?;
        Ok(())
    }
    pub async fn get_friend_requests(client: &Client, endpoint: &Endpoint) -> Result<FriendRequestsResponse> {
        send(endpoint, client.get(endpoint.url("/api/users/friend-requests"))).await
    }
    pub async fn get_outgoing_friend_requests(client: &Client, endpoint: &Endpoint) -> Result<Vec<FriendRequestView>> {
        send(endpoint, client.get(endpoint.url("/api/users/outgoing-friend-requests"))).await
    }
}
