use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts},
    routing::post,
    Json,
};
use flashmob_collab::{Credentials, NewAccount, UserData};

use crate::{
    context::ServerContext,
    errors::{ServerError, ServerResult},
    schemas::{LoginSchema, RegisterSchema, ValidatedJson},
    serialized::{LoginResult, ToSerialized},
    Router,
};

/// The user making the request, identified by the bearer token
pub struct Caller {
    pub user: UserData,
    pub token: String,
}

#[async_trait]
impl<S> FromRequestParts<S> for Caller
where
    ServerContext: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ServerError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let context = ServerContext::from_ref(state);

        let header = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|x| x.to_str().ok())
            .ok_or(ServerError::MissingAuthorization)?;

        let parts: Vec<_> = header.split_ascii_whitespace().collect();

        let token = match parts.as_slice() {
            ["Bearer", token] => token.to_string(),
            _ => return Err(ServerError::MalformedAuthorization),
        };

        let user = context.collab.auth.verify(&token).await?;

        Ok(Self { user, token })
    }
}

#[utoipa::path(
    post,
    path = "/v1/auth/register",
    tag = "auth",
    request_body = RegisterSchema,
    responses(
        (status = 200, body = LoginResult),
        (status = 400, description = "The body is invalid"),
        (status = 409, description = "The email is already registered")
    )
)]
async fn register(
    context: ServerContext,
    ValidatedJson(body): ValidatedJson<RegisterSchema>,
) -> ServerResult<Json<LoginResult>> {
    let token = context
        .collab
        .auth
        .register(NewAccount {
            email: body.email,
            password: body.password,
            name: body.name,
            address: body.address,
            preferences: body.preferences.map(|p| p.into_preferences()),
        })
        .await?;

    Ok(Json(token.to_serialized()))
}

#[utoipa::path(
    post,
    path = "/v1/auth/login",
    tag = "auth",
    request_body = LoginSchema,
    responses(
        (status = 200, body = LoginResult),
        (status = 400, description = "Invalid credentials"),
        (status = 403, description = "The account is suspended")
    )
)]
async fn login(
    context: ServerContext,
    ValidatedJson(body): ValidatedJson<LoginSchema>,
) -> ServerResult<Json<LoginResult>> {
    let token = context
        .collab
        .auth
        .login(Credentials {
            email: body.email,
            password: body.password,
        })
        .await?;

    Ok(Json(token.to_serialized()))
}

#[utoipa::path(
    post,
    path = "/v1/auth/logout",
    tag = "auth",
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, description = "The token no longer works")
    )
)]
async fn logout(caller: Caller, context: ServerContext) -> ServerResult<()> {
    context.collab.auth.logout(&caller.token).await?;
    Ok(())
}

pub fn router() -> Router {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/logout", post(logout))
}

#[cfg(test)]
mod test {
    use std::sync::Arc;

    use axum::http::Request;
    use flashmob_collab::{Collab, MemoryDatabase};
    use flashmob_core::{Config, ErrorKind};

    use super::*;

    async fn context() -> (ServerContext, String) {
        let collab = Collab::new(Config::default(), MemoryDatabase::new());

        let token = collab
            .auth
            .register(NewAccount {
                email: "ada@example.com".to_string(),
                password: "password".to_string(),
                name: "Ada".to_string(),
                address: "Warrensburg, MO".to_string(),
                preferences: None,
            })
            .await
            .unwrap();

        let context = ServerContext {
            collab: Arc::new(collab),
        };

        (context, token.token)
    }

    async fn extract(context: &ServerContext, authorization: Option<&str>) -> Result<Caller, ServerError> {
        let mut request = Request::builder().uri("/v1/users/me");

        if let Some(value) = authorization {
            request = request.header(header::AUTHORIZATION, value);
        }

        let (mut parts, _) = request.body(()).unwrap().into_parts();
        Caller::from_request_parts(&mut parts, context).await
    }

    #[tokio::test]
    async fn test_bearer_token() {
        let (context, token) = context().await;

        let caller = extract(&context, Some(format!("Bearer {}", token).as_str()))
            .await
            .unwrap();
        assert_eq!(caller.user.email, "ada@example.com");
        assert_eq!(caller.token, token);
    }

    #[tokio::test]
    async fn test_refused_authorization() {
        let (context, token) = context().await;

        let error = extract(&context, None).await.err().unwrap();
        assert!(matches!(error, ServerError::MissingAuthorization));

        let error = extract(&context, Some(format!("Basic {}", token).as_str()))
            .await
            .err()
            .unwrap();
        assert!(matches!(error, ServerError::MalformedAuthorization));

        let error = extract(&context, Some("Bearer nope")).await.err().unwrap();
        assert_eq!(error.kind(), ErrorKind::Unauthorized);
    }
}
