use axum::extract::Path;
use axum::routing::{delete, get, post, put};
use axum::{Extension, Json, Router};
use tandem_common::responses::{
    FriendRequestsResponse, HealthResponse, SendFriendRequestResponse, SuccessResponse,
};
use tandem_common::{FriendRequestId, FriendRequestView, Profile, UserId, UserSummary};
use tower_http::trace::TraceLayer;

use crate::error::Result;
use crate::state::AppState;
use crate::Viewer;

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/accounts", post(create_account))
        .route("/api/users", get(get_recommended_users))
        .route("/api/users/onboarding", put(complete_onboarding))
        .route("/api/users/friends", get(get_my_friends))
        .route("/api/users/friend-request/{id}", post(send_friend_request))
        .route("/api/users/friend-request/{id}/accept", put(accept_friend_request))
        .route("/api/users/friend-request/{id}/reject", put(reject_friend_request))
        .route("/api/users/remove-friend/{id}", delete(remove_friend))
        .route("/api/users/friend-requests", get(get_friend_requests))
        .route("/api/users/outgoing-friend-requests", get(get_outgoing_friend_requests))
        .layer(Extension(state))
        .layer(TraceLayer::new_for_http())
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

async fn create_account(
    Extension(state): Extension<AppState>,
    Json(profile): Json<Profile>,
) -> Result<Json<UserSummary>> {
    Ok(Json(state.directory.create_account(profile)?))
}

async fn complete_onboarding(
    Extension(state): Extension<AppState>,
    viewer: Viewer,
    Json(profile): Json<Profile>,
) -> Result<Json<UserSummary>> {
    Ok(Json(state.directory.complete_onboarding(&viewer, profile)?))
}

async fn get_recommended_users(
    Extension(state): Extension<AppState>,
    viewer: Viewer,
) -> Result<Json<Vec<UserSummary>>> {
    let recommendations = state.recommendations.recommended_users(&viewer)?;
    Ok(Json(recommendations.collect()?))
}

async fn get_my_friends(
    Extension(state): Extension<AppState>,
    viewer: Viewer,
) -> Result<Json<Vec<UserSummary>>> {
    Ok(Json(state.queries.my_friends(&viewer)?))
}

async fn send_friend_request(
    Extension(state): Extension<AppState>,
    viewer: Viewer,
    Path(target): Path<String>,
) -> Result<Json<SendFriendRequestResponse>> {
    Ok(Json(
        state
            .relationships
            .send_friend_request(&viewer, &UserId(target))?,
    ))
}

async fn accept_friend_request(
    Extension(state): Extension<AppState>,
    viewer: Viewer,
    Path(id): Path<String>,
) -> Result<Json<SuccessResponse>> {
    state
        .relationships
        .accept_friend_request(&viewer, &FriendRequestId(id))?;
    Ok(Json(SuccessResponse::ok()))
}

async fn reject_friend_request(
    Extension(state): Extension<AppState>,
    viewer: Viewer,
    Path(id): Path<String>,
) -> Result<Json<SuccessResponse>> {
    state
        .relationships
        .reject_friend_request(&viewer, &FriendRequestId(id))?;
    Ok(Json(SuccessResponse::ok()))
}

async fn remove_friend(
    Extension(state): Extension<AppState>,
    viewer: Viewer,
    Path(other): Path<String>,
) -> Result<Json<SuccessResponse>> {
    state.relationships.remove_friend(&viewer, &UserId(other))?;
    Ok(Json(SuccessResponse::ok()))
}

async fn get_friend_requests(
    Extension(state): Extension<AppState>,
    viewer: Viewer,
) -> Result<Json<FriendRequestsResponse>> {
    Ok(Json(state.queries.friend_requests(&viewer)?))
}

async fn get_outgoing_friend_requests(
    Extension(state): Extension<AppState>,
    viewer: Viewer,
) -> Result<Json<Vec<FriendRequestView>>> {
    Ok(Json(state.queries.outgoing_friend_requests(&viewer)?))
}
