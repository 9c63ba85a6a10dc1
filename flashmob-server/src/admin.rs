use axum::{
    extract::Path,
    routing::{delete, get, post},
    Json,
};
use flashmob_collab::UserId;

use crate::{
    auth::Caller,
    context::ServerContext,
    errors::ServerResult,
    serialized::{PendingSession, Session, Stats, ToSerialized, User},
    Router,
};

#[utoipa::path(
    get,
    path = "/v1/admin/users",
    tag = "admin",
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = Vec<User>),
        (status = 403, description = "The caller is not an admin")
    )
)]
async fn list_users(caller: Caller, context: ServerContext) -> ServerResult<Json<Vec<User>>> {
    let users = context.collab.users.list_users(&caller.user).await?;

    Ok(Json(users.to_serialized()))
}

#[utoipa::path(
    post,
    path = "/v1/admin/users/{id}/suspend",
    tag = "admin",
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = User),
        (status = 404, description = "User not found")
    )
)]
async fn suspend_user(
    caller: Caller,
    context: ServerContext,
    Path(user_id): Path<UserId>,
) -> ServerResult<Json<User>> {
    let user = context
        .collab
        .users
        .suspend_user(&caller.user, user_id)
        .await?;

    Ok(Json(user.to_serialized()))
}

#[utoipa::path(
    get,
    path = "/v1/admin/sessions/pending",
    tag = "admin",
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, description = "Sessions awaiting review, newest first", body = Vec<PendingSession>)
    )
)]
async fn pending_sessions(
    caller: Caller,
    context: ServerContext,
) -> ServerResult<Json<Vec<PendingSession>>> {
    let sessions = context.collab.sessions.list_pending(&caller.user).await?;

    Ok(Json(sessions.to_serialized()))
}

#[utoipa::path(
    post,
    path = "/v1/admin/sessions/{id}/approve",
    tag = "admin",
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, description = "The session is now active", body = Session),
        (status = 409, description = "The session is not awaiting review")
    )
)]
async fn approve_session(
    caller: Caller,
    context: ServerContext,
    Path(session_id): Path<String>,
) -> ServerResult<Json<Session>> {
    let session = context
        .collab
        .sessions
        .approve(&caller.user, &session_id)
        .await?;

    Ok(Json(session.to_serialized()))
}

#[utoipa::path(
    post,
    path = "/v1/admin/sessions/{id}/reject",
    tag = "admin",
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = Session),
        (status = 409, description = "The session is not awaiting review")
    )
)]
async fn reject_session(
    caller: Caller,
    context: ServerContext,
    Path(session_id): Path<String>,
) -> ServerResult<Json<Session>> {
    let session = context
        .collab
        .sessions
        .reject(&caller.user, &session_id)
        .await?;

    Ok(Json(session.to_serialized()))
}

#[utoipa::path(
    delete,
    path = "/v1/admin/sessions/{id}",
    tag = "admin",
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, description = "The session and everything in it was deleted")
    )
)]
async fn delete_session(
    caller: Caller,
    context: ServerContext,
    Path(session_id): Path<String>,
) -> ServerResult<()> {
    context
        .collab
        .sessions
        .delete(&caller.user, &session_id)
        .await?;

    Ok(())
}

#[utoipa::path(
    get,
    path = "/v1/admin/stats",
    tag = "admin",
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = Stats)
    )
)]
async fn stats(caller: Caller, context: ServerContext) -> ServerResult<Json<Stats>> {
    let stats = context.collab.users.platform_stats(&caller.user).await?;

    Ok(Json(stats.to_serialized()))
}

pub fn router() -> Router {
    Router::new()
        .route("/users", get(list_users))
        .route("/users/:id/suspend", post(suspend_user))
        .route("/sessions/pending", get(pending_sessions))
        .route("/sessions/:id/approve", post(approve_session))
        .route("/sessions/:id/reject", post(reject_session))
        .route("/sessions/:id", delete(delete_session))
        .route("/stats", get(stats))
}
