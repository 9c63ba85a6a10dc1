use axum::{
    routing::{get, put},
    Json,
};

use crate::{
    auth::Caller,
    context::ServerContext,
    errors::ServerResult,
    schemas::{AddressSchema, PreferencesSchema, ValidatedJson},
    serialized::{Profile, ToSerialized, User},
    Router,
};

#[utoipa::path(
    get,
    path = "/v1/users/me",
    tag = "users",
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = Profile)
    )
)]
async fn me(caller: Caller, context: ServerContext) -> ServerResult<Json<Profile>> {
    let profile = context.collab.users.profile(&caller.user).await?;

    Ok(Json(profile.to_serialized()))
}

#[utoipa::path(
    put,
    path = "/v1/users/me/preferences",
    tag = "users",
    request_body = PreferencesSchema,
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, description = "Fields left out are reset to their defaults", body = User)
    )
)]
async fn update_preferences(
    caller: Caller,
    context: ServerContext,
    ValidatedJson(body): ValidatedJson<PreferencesSchema>,
) -> ServerResult<Json<User>> {
    let user = context
        .collab
        .users
        .update_preferences(&caller.user, body.into_update())
        .await?;

    Ok(Json(user.to_serialized()))
}

#[utoipa::path(
    put,
    path = "/v1/users/me/address",
    tag = "users",
    request_body = AddressSchema,
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = User)
    )
)]
async fn update_address(
    caller: Caller,
    context: ServerContext,
    ValidatedJson(body): ValidatedJson<AddressSchema>,
) -> ServerResult<Json<User>> {
    let user = context
        .collab
        .users
        .update_address(&caller.user, &body.address)
        .await?;

    Ok(Json(user.to_serialized()))
}

pub fn router() -> Router {
    Router::new()
        .route("/me", get(me))
        .route("/me/preferences", put(update_preferences))
        .route("/me/address", put(update_address))
}
