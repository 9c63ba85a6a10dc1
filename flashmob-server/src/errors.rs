use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use flashmob_collab::{
    AuthError, DatabaseError, MessageError, SessionError, UserError, VenueError,
};
use flashmob_core::ErrorKind;
use log::error;
use thiserror::Error;

pub type ServerResult<T> = Result<T, ServerError>;

#[derive(Debug, Error)]
pub enum ServerError {
    /// An operation of the collab system failed
    #[error("{message}")]
    Operation { kind: ErrorKind, message: String },
    #[error("Missing authorization")]
    MissingAuthorization,
    #[error("Authorization must be Bearer")]
    MalformedAuthorization,
    #[error("Request body is invalid: {0}")]
    InvalidBody(String),
    #[error("Query is invalid: {0}")]
    InvalidQuery(String),
}

impl ServerError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Operation { kind, .. } => *kind,
            Self::MissingAuthorization => ErrorKind::Unauthorized,
            Self::MalformedAuthorization | Self::InvalidBody(_) | Self::InvalidQuery(_) => {
                ErrorKind::Validation
            }
        }
    }

    fn as_status_code(&self) -> StatusCode {
        match self.kind() {
            ErrorKind::Validation | ErrorKind::InvalidCredentials => StatusCode::BAD_REQUEST,
            ErrorKind::Unauthorized => StatusCode::UNAUTHORIZED,
            ErrorKind::Forbidden | ErrorKind::NotParticipant => StatusCode::FORBIDDEN,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::Conflict | ErrorKind::InvalidState => StatusCode::CONFLICT,
            ErrorKind::WindowClosed => StatusCode::UNPROCESSABLE_ENTITY,
            ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn operation(kind: ErrorKind, error: &dyn std::error::Error) -> Self {
        Self::Operation {
            kind,
            message: error.to_string(),
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.as_status_code();

        // Store failures are logged, not shown
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            error!("Request failed: {}", self);
            return (status, "Internal server error").into_response();
        }

        (status, self.to_string()).into_response()
    }
}

impl From<AuthError> for ServerError {
    fn from(value: AuthError) -> Self {
        Self::operation(value.kind(), &value)
    }
}

impl From<UserError> for ServerError {
    fn from(value: UserError) -> Self {
        Self::operation(value.kind(), &value)
    }
}

impl From<SessionError> for ServerError {
    fn from(value: SessionError) -> Self {
        Self::operation(value.kind(), &value)
    }
}

impl From<VenueError> for ServerError {
    fn from(value: VenueError) -> Self {
        Self::operation(value.kind(), &value)
    }
}

impl From<MessageError> for ServerError {
    fn from(value: MessageError) -> Self {
        Self::operation(value.kind(), &value)
    }
}

impl From<DatabaseError> for ServerError {
    fn from(value: DatabaseError) -> Self {
        Self::operation(value.kind(), &value)
    }
}
