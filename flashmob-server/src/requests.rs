use axum::{
    extract::Path,
    routing::{get, post},
    Json,
};

use crate::{
    auth::Caller,
    context::ServerContext,
    errors::ServerResult,
    serialized::{JoinRequest, PendingRequest, ToSerialized},
    Router,
};

#[utoipa::path(
    post,
    path = "/v1/sessions/{id}/join",
    tag = "join requests",
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, description = "The request awaits the host", body = JoinRequest),
        (status = 409, description = "The session is full, not active, or the caller is already in it or waiting")
    )
)]
async fn request_to_join(
    caller: Caller,
    context: ServerContext,
    Path(session_id): Path<String>,
) -> ServerResult<Json<JoinRequest>> {
    let request = context
        .collab
        .requests
        .request(&caller.user, &session_id)
        .await?;

    Ok(Json(request.to_serialized()))
}

#[utoipa::path(
    get,
    path = "/v1/sessions/{id}/join-requests",
    tag = "join requests",
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, description = "Pending requests, for the host only", body = Vec<PendingRequest>)
    )
)]
async fn pending_requests(
    caller: Caller,
    context: ServerContext,
    Path(session_id): Path<String>,
) -> ServerResult<Json<Vec<PendingRequest>>> {
    let requests = context
        .collab
        .requests
        .list_pending(&caller.user, &session_id)
        .await?;

    Ok(Json(requests.to_serialized()))
}

#[utoipa::path(
    get,
    path = "/v1/sessions/{id}/join-requests/mine",
    tag = "join requests",
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, description = "The latest request of the caller, if any", body = Option<JoinRequest>)
    )
)]
async fn my_request(
    caller: Caller,
    context: ServerContext,
    Path(session_id): Path<String>,
) -> ServerResult<Json<Option<JoinRequest>>> {
    let request = context
        .collab
        .requests
        .my_request(&caller.user, &session_id)
        .await?;

    Ok(Json(request.to_serialized()))
}

#[utoipa::path(
    post,
    path = "/v1/sessions/{id}/join-requests/{request_id}/approve",
    tag = "join requests",
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, description = "The requester is now a participant", body = JoinRequest),
        (status = 409, description = "The session is full, or the request was already handled")
    )
)]
async fn approve_request(
    caller: Caller,
    context: ServerContext,
    Path((session_id, request_id)): Path<(String, String)>,
) -> ServerResult<Json<JoinRequest>> {
    let request = context
        .collab
        .requests
        .approve(&caller.user, &session_id, &request_id)
        .await?;

    Ok(Json(request.to_serialized()))
}

#[utoipa::path(
    post,
    path = "/v1/sessions/{id}/join-requests/{request_id}/reject",
    tag = "join requests",
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = JoinRequest),
        (status = 409, description = "The request was already handled")
    )
)]
async fn reject_request(
    caller: Caller,
    context: ServerContext,
    Path((session_id, request_id)): Path<(String, String)>,
) -> ServerResult<Json<JoinRequest>> {
    let request = context
        .collab
        .requests
        .reject(&caller.user, &session_id, &request_id)
        .await?;

    Ok(Json(request.to_serialized()))
}

pub fn router() -> Router {
    Router::new()
        .route("/:id/join", post(request_to_join))
        .route("/:id/join-requests", get(pending_requests))
        .route("/:id/join-requests/mine", get(my_request))
        .route("/:id/join-requests/:request_id/approve", post(approve_request))
        .route("/:id/join-requests/:request_id/reject", post(reject_request))
}
