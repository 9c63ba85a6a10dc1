use async_trait::async_trait;
use chrono::{DateTime, Utc};
use flashmob_core::{Coordinates, ErrorKind, JoinRequestStatus, SessionStatus};
use thiserror::Error;

mod data;
pub use data::*;

mod memory;
pub use memory::*;

mod pg;
pub use pg::*;

pub type Result<T> = std::result::Result<T, DatabaseError>;

#[derive(Debug, Error)]
pub enum DatabaseError {
    /// An unknown or internal error happened with the database
    #[error(transparent)]
    Internal(Box<dyn std::error::Error + Send + Sync>),
    /// A resource already exists, or a write would break a constraint
    #[error("{resource} with {field} of value {value} already exists")]
    Conflict {
        /// The resource in question
        resource: &'static str,
        /// The field that is conflicting
        field: &'static str,
        /// The conflicting value
        value: String,
    },
    /// A resource in the database doesn't exist
    #[error("{resource}:{identifier} doesn't exist")]
    NotFound {
        resource: &'static str,
        identifier: &'static str,
    },
}

impl DatabaseError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DatabaseError::Internal(_) => ErrorKind::Internal,
            DatabaseError::Conflict { .. } => ErrorKind::Conflict,
            DatabaseError::NotFound { .. } => ErrorKind::NotFound,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, DatabaseError::NotFound { .. })
    }
}

/// Helper trait to reduce boilerplate
pub trait IntoDatabaseError {
    fn not_found_or(self, resource: &'static str, identifier: &'static str) -> DatabaseError;
    fn any(self) -> DatabaseError;
}

/// Helper trait to reduce boilerplate
pub trait DatabaseResult {
    /// Turns the Result into a conflict error if it's Ok()
    fn conflict_or_ok(self, resource: &'static str, field: &'static str, value: &str)
        -> Result<()>;
}

impl<T> DatabaseResult for Result<T> {
    fn conflict_or_ok(
        self,
        resource: &'static str,
        field: &'static str,
        value: &str,
    ) -> Result<()> {
        match self {
            Ok(_) => Err(DatabaseError::Conflict {
                resource,
                field,
                value: value.to_string(),
            }),
            Err(DatabaseError::NotFound { .. }) => Ok(()),
            Err(e) => Err(e),
        }
    }
}

/// Represents a type that can store flashmob data.
///
/// Every method is a single atomic unit. Writes that touch several records,
/// like creating a session along with its host, either happen completely or not at all.
#[async_trait]
pub trait Database: Send + Sync {
    async fn user_by_id(&self, user_id: UserId) -> Result<UserData>;
    async fn user_by_email(&self, email: &str) -> Result<UserData>;
    async fn list_users(&self) -> Result<Vec<UserData>>;
    async fn create_user(&self, new_user: NewUser) -> Result<UserData>;
    async fn update_user(&self, updated_user: UpdatedUser) -> Result<UserData>;

    async fn token(&self, token: &str) -> Result<TokenData>;
    async fn create_token(&self, new_token: NewToken) -> Result<TokenData>;
    async fn delete_token(&self, token: &str) -> Result<()>;
    async fn clear_expired_tokens(&self) -> Result<()>;

    async fn venue_by_id(&self, venue_id: &str) -> Result<VenueData>;
    async fn list_venues(&self) -> Result<Vec<VenueData>>;

    async fn session_by_id(&self, session_id: &str) -> Result<SessionData>;
    /// Lists sessions matching the filter, ordered by start time
    async fn list_sessions(&self, filter: SessionFilter) -> Result<Vec<SessionData>>;
    /// Creates the session and its host participant
    async fn create_session(&self, new_session: NewSession) -> Result<SessionData>;
    /// Moves a session to a new status, failing with a conflict if it isn't in `from` anymore
    async fn update_session_status(&self, update: SessionStatusUpdate) -> Result<SessionData>;
    /// Deletes a session along with its participants, join requests and messages
    async fn delete_session(&self, session_id: &str) -> Result<()>;

    async fn participant(&self, session_id: &str, user_id: UserId) -> Result<ParticipantData>;
    /// Adds a participant, refusing to go past the capacity of the session.
    /// If a join request is given, it is marked approved in the same unit.
    async fn add_participant(&self, new_participant: NewParticipant) -> Result<ParticipantData>;
    async fn remove_participant(&self, session_id: &str, user_id: UserId) -> Result<()>;
    /// Marks a participant as checked in. The first check-in time is kept.
    async fn check_in_participant(
        &self,
        session_id: &str,
        user_id: UserId,
        at: DateTime<Utc>,
    ) -> Result<ParticipantData>;

    async fn join_request_by_id(&self, request_id: &str) -> Result<JoinRequestData>;
    /// Lists join requests of a session, oldest first
    async fn list_join_requests(&self, filter: JoinRequestFilter) -> Result<Vec<JoinRequestData>>;
    /// Creates a pending request, failing if the user already has one for the session
    async fn create_join_request(&self, new_request: NewJoinRequest) -> Result<JoinRequestData>;
    /// Settles a pending request
    async fn review_join_request(&self, review: JoinRequestReview) -> Result<JoinRequestData>;

    async fn create_message(&self, new_message: NewMessage) -> Result<MessageData>;
    /// Lists messages of a session, oldest first
    async fn list_messages(&self, session_id: &str) -> Result<Vec<MessageData>>;

    async fn platform_stats(&self) -> Result<PlatformStats>;
}

#[derive(Debug)]
pub struct NewUser {
    pub email: String,
    pub password: String,
    pub name: String,
    pub address: String,
    pub coordinates: Coordinates,
    pub is_admin: bool,
    pub preferences: Preferences,
}

#[derive(Debug, Default)]
pub struct UpdatedUser {
    pub id: UserId,
    pub name: Option<String>,
    pub password: Option<String>,
    pub address: Option<(String, Coordinates)>,
    pub preferences: Option<Preferences>,
    pub is_admin: Option<bool>,
    pub suspended: Option<bool>,
}

#[derive(Debug)]
pub struct NewToken {
    pub token: String,
    pub user_id: UserId,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
pub struct SessionFilter {
    /// Only sessions in one of these statuses
    pub statuses: Option<Vec<SessionStatus>>,
    /// Only sessions this user participates in
    pub participant: Option<UserId>,
}

impl SessionFilter {
    /// The sessions a user counts as theirs, which excludes rejected and cancelled ones
    pub fn memberships(user_id: UserId) -> Self {
        Self {
            statuses: Some(SessionStatus::HOLDING_MEMBERSHIP.to_vec()),
            participant: Some(user_id),
        }
    }
}

#[derive(Debug)]
pub struct NewSession {
    pub creator_id: UserId,
    pub subject: String,
    pub topic: String,
    pub location: LocationData,
    pub start_time: DateTime<Utc>,
    pub duration: i32,
    pub max_participants: i32,
}

#[derive(Debug)]
pub struct SessionStatusUpdate {
    pub session_id: String,
    pub from: SessionStatus,
    pub to: SessionStatus,
    pub review: Option<AdminReview>,
}

#[derive(Debug)]
pub struct NewParticipant {
    pub session_id: String,
    pub user_id: UserId,
    /// A pending request to settle as approved along with the insert
    pub approves: Option<JoinRequestReview>,
}

#[derive(Debug, Default)]
pub struct JoinRequestFilter {
    pub session_id: String,
    pub user_id: Option<UserId>,
    pub status: Option<JoinRequestStatus>,
}

#[derive(Debug)]
pub struct NewJoinRequest {
    pub session_id: String,
    pub user_id: UserId,
}

#[derive(Debug, Clone)]
pub struct JoinRequestReview {
    pub request_id: String,
    pub status: JoinRequestStatus,
    pub reviewed_by: UserId,
    pub reviewed_at: DateTime<Utc>,
}

#[derive(Debug)]
pub struct NewMessage {
    pub session_id: String,
    pub author_id: UserId,
    pub body: String,
}
