use axum::{
    extract::{Path, Query},
    routing::{delete, get, post},
    Json,
};

use crate::{
    auth::Caller,
    context::ServerContext,
    errors::ServerResult,
    schemas::{NearbyParams, NewSessionSchema, ValidatedJson},
    serialized::{NearbySession, Participant, Session, ToSerialized},
    Router,
};

#[utoipa::path(
    get,
    path = "/v1/sessions",
    tag = "sessions",
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, description = "Every session for admins, otherwise only approved ones", body = Vec<Session>)
    )
)]
async fn list_sessions(caller: Caller, context: ServerContext) -> ServerResult<Json<Vec<Session>>> {
    let sessions = context.collab.sessions.list_all(&caller.user).await?;

    Ok(Json(sessions.to_serialized()))
}

#[utoipa::path(
    post,
    path = "/v1/sessions",
    tag = "sessions",
    request_body = NewSessionSchema,
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, description = "The session awaits admin review", body = Session),
        (status = 400, description = "Duration or size out of range"),
        (status = 404, description = "Venue not found")
    )
)]
async fn create_session(
    caller: Caller,
    context: ServerContext,
    ValidatedJson(body): ValidatedJson<NewSessionSchema>,
) -> ServerResult<Json<Session>> {
    let session = context
        .collab
        .sessions
        .create(&caller.user, body.into())
        .await?;

    Ok(Json(session.to_serialized()))
}

#[utoipa::path(
    get,
    path = "/v1/sessions/mine",
    tag = "sessions",
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, description = "Sessions the caller is part of", body = Vec<Session>)
    )
)]
async fn my_sessions(caller: Caller, context: ServerContext) -> ServerResult<Json<Vec<Session>>> {
    let sessions = context.collab.sessions.list_mine(&caller.user).await?;

    Ok(Json(sessions.to_serialized()))
}

#[utoipa::path(
    get,
    path = "/v1/sessions/nearby",
    tag = "sessions",
    params(NearbyParams),
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, description = "Upcoming active sessions, closest first", body = Vec<NearbySession>)
    )
)]
async fn nearby_sessions(
    caller: Caller,
    context: ServerContext,
    Query(params): Query<NearbyParams>,
) -> ServerResult<Json<Vec<NearbySession>>> {
    let sessions = context
        .collab
        .sessions
        .list_nearby(&caller.user, params.into_query()?)
        .await?;

    Ok(Json(sessions.to_serialized()))
}

#[utoipa::path(
    get,
    path = "/v1/sessions/recommended",
    tag = "sessions",
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, description = "Upcoming sessions matching the preferences of the caller", body = Vec<NearbySession>)
    )
)]
async fn recommended_sessions(
    caller: Caller,
    context: ServerContext,
) -> ServerResult<Json<Vec<NearbySession>>> {
    let sessions = context
        .collab
        .sessions
        .list_recommended(&caller.user)
        .await?;

    Ok(Json(sessions.to_serialized()))
}

#[utoipa::path(
    get,
    path = "/v1/sessions/{id}",
    tag = "sessions",
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = Session),
        (status = 404, description = "Session not found")
    )
)]
async fn session(
    caller: Caller,
    context: ServerContext,
    Path(session_id): Path<String>,
) -> ServerResult<Json<Session>> {
    let session = context.collab.sessions.get(&caller.user, &session_id).await?;

    Ok(Json(session.to_serialized()))
}

#[utoipa::path(
    delete,
    path = "/v1/sessions/{id}",
    tag = "sessions",
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, description = "The session was cancelled by its host", body = Session),
        (status = 403, description = "Only the host can cancel"),
        (status = 409, description = "The session already ended")
    )
)]
async fn cancel_session(
    caller: Caller,
    context: ServerContext,
    Path(session_id): Path<String>,
) -> ServerResult<Json<Session>> {
    let session = context
        .collab
        .sessions
        .cancel(&caller.user, &session_id)
        .await?;

    Ok(Json(session.to_serialized()))
}

#[utoipa::path(
    post,
    path = "/v1/sessions/{id}/checkin",
    tag = "sessions",
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = Participant),
        (status = 403, description = "The caller is not a participant"),
        (status = 422, description = "Check-in opens 15 minutes before the start and closes at the end")
    )
)]
async fn check_in(
    caller: Caller,
    context: ServerContext,
    Path(session_id): Path<String>,
) -> ServerResult<Json<Participant>> {
    let participant = context
        .collab
        .sessions
        .check_in(&caller.user, &session_id)
        .await?;

    Ok(Json(participant.to_serialized()))
}

#[utoipa::path(
    delete,
    path = "/v1/sessions/{id}/participants/{user_id}",
    tag = "sessions",
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = Session),
        (status = 403, description = "Only the host can remove participants"),
        (status = 409, description = "The host cannot be removed")
    )
)]
async fn remove_participant(
    caller: Caller,
    context: ServerContext,
    Path((session_id, user_id)): Path<(String, i32)>,
) -> ServerResult<Json<Session>> {
    let session = context
        .collab
        .sessions
        .remove_participant(&caller.user, &session_id, user_id)
        .await?;

    Ok(Json(session.to_serialized()))
}

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_sessions))
        .route("/", post(create_session))
        .route("/mine", get(my_sessions))
        .route("/nearby", get(nearby_sessions))
        .route("/recommended", get(recommended_sessions))
        .route("/:id", get(session))
        .route("/:id", delete(cancel_session))
        .route("/:id/checkin", post(check_in))
        .route("/:id/participants/:user_id", delete(remove_participant))
}
