use axum::{extract::Path, routing::get, Json};

use crate::{
    auth::Caller,
    context::ServerContext,
    errors::ServerResult,
    schemas::{NewMessageSchema, ValidatedJson},
    serialized::{Message, ToSerialized},
    Router,
};

#[utoipa::path(
    get,
    path = "/v1/sessions/{id}/messages",
    tag = "messages",
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, description = "Oldest first", body = Vec<Message>),
        (status = 403, description = "The caller is not a participant")
    )
)]
async fn list_messages(
    caller: Caller,
    context: ServerContext,
    Path(session_id): Path<String>,
) -> ServerResult<Json<Vec<Message>>> {
    let messages = context
        .collab
        .messages
        .list(&caller.user, &session_id)
        .await?;

    Ok(Json(messages.to_serialized()))
}

#[utoipa::path(
    post,
    path = "/v1/sessions/{id}/messages",
    tag = "messages",
    request_body = NewMessageSchema,
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = Message),
        (status = 400, description = "The message is empty or longer than 500 characters"),
        (status = 403, description = "The caller is not a participant")
    )
)]
async fn post_message(
    caller: Caller,
    context: ServerContext,
    Path(session_id): Path<String>,
    ValidatedJson(body): ValidatedJson<NewMessageSchema>,
) -> ServerResult<Json<Message>> {
    let message = context
        .collab
        .messages
        .post(&caller.user, &session_id, &body.body)
        .await?;

    Ok(Json(message.to_serialized()))
}

pub fn router() -> Router {
    Router::new().route("/:id/messages", get(list_messages).post(post_message))
}
