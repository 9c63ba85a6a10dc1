use std::borrow::BorrowMut;

use axum::{response::IntoResponse, Json};
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};

use crate::{admin, auth, messages, requests, schemas, serialized, sessions, users, venues};

#[derive(OpenApi)]
#[openapi(
    paths(
        auth::register,
        auth::login,
        auth::logout,
        users::me,
        users::update_preferences,
        users::update_address,
        sessions::list_sessions,
        sessions::create_session,
        sessions::my_sessions,
        sessions::nearby_sessions,
        sessions::recommended_sessions,
        sessions::session,
        sessions::cancel_session,
        sessions::check_in,
        sessions::remove_participant,
        requests::request_to_join,
        requests::pending_requests,
        requests::my_request,
        requests::approve_request,
        requests::reject_request,
        messages::list_messages,
        messages::post_message,
        venues::list_venues,
        venues::nearby_venues,
        venues::venue,
        admin::list_users,
        admin::suspend_user,
        admin::pending_sessions,
        admin::approve_session,
        admin::reject_session,
        admin::delete_session,
        admin::stats,
    ),
    components(schemas(
        schemas::LoginSchema,
        schemas::RegisterSchema,
        schemas::PreferencesSchema,
        schemas::AddressSchema,
        schemas::NewSessionSchema,
        schemas::NewMessageSchema,
        serialized::Point,
        serialized::Preferences,
        serialized::User,
        serialized::UserSummary,
        serialized::LoginResult,
        serialized::Profile,
        serialized::Venue,
        serialized::NearbyVenue,
        serialized::Location,
        serialized::Participant,
        serialized::Review,
        serialized::Session,
        serialized::NearbySession,
        serialized::PendingSession,
        serialized::JoinRequest,
        serialized::PendingRequest,
        serialized::Message,
        serialized::Stats,
    )),
    modifiers(&Security),
    info(
        description = "flashmob-server exposes endpoints to find, host and join study sessions"
    )
)]
pub struct ApiDoc;

struct Security;

impl Modify for Security {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.borrow_mut() {
            let scheme = HttpBuilder::new()
                .scheme(HttpAuthScheme::Bearer)
                .bearer_format("Bearer <token>")
                .build();

            components.add_security_scheme("BearerAuth", SecurityScheme::Http(scheme))
        }
    }
}

pub async fn docs() -> impl IntoResponse {
    Json(ApiDoc::openapi())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_document_lists_routes() {
        let doc = ApiDoc::openapi();

        assert!(doc.paths.paths.contains_key("/v1/sessions/{id}/join"));
        assert!(doc.paths.paths.contains_key("/v1/admin/stats"));

        let components = doc.components.unwrap();
        assert!(components.security_schemes.contains_key("BearerAuth"));
    }
}
