mod locks;
mod requests;

pub use locks::*;
pub use requests::*;

use chrono::{DateTime, Utc};
use flashmob_core::{
    validate_duration, validate_max_participants, validate_radius, BoundsError, Coordinates,
    ErrorKind, SessionAction, SessionStatus, TransitionError,
};
use log::{debug, info};
use thiserror::Error;

use crate::{
    require_admin, require_host, AccessError, AdminReview, CollabContext, DatabaseError,
    LocationData, NewSession, ParticipantData, SessionData, SessionFilter, SessionStatusUpdate,
    UserData, UserId, UserSummary,
};

/// Creates sessions and moves them through their lifecycle
pub struct SessionManager {
    context: CollabContext,
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Access(#[from] AccessError),
    #[error(transparent)]
    Bounds(#[from] BoundsError),
    #[error(transparent)]
    Transition(#[from] TransitionError),
    #[error("{0} cannot be empty")]
    MissingField(&'static str),
    #[error("Session not found")]
    NotFound,
    #[error("Venue not found")]
    VenueNotFound,
    #[error("Session is not active")]
    NotActive,
    #[error("Session is already {0}")]
    StatusChanged(String),
    #[error("Session is full")]
    SessionFull,
    #[error("Already a participant of this session")]
    AlreadyMember,
    #[error("A join request for this session is already pending")]
    DuplicatePending,
    #[error("Join request not found")]
    RequestNotFound,
    #[error("Join request has already been processed")]
    AlreadyProcessed,
    #[error("The host cannot be removed from their own session")]
    CannotRemoveHost,
    #[error("Not a participant of this session")]
    NotParticipant,
    #[error("Check-in is not open for this session")]
    WindowClosed,
    #[error(transparent)]
    Database(DatabaseError),
}

impl SessionError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SessionError::Access(e) => e.kind(),
            SessionError::Bounds(_) | SessionError::MissingField(_) => ErrorKind::Validation,
            SessionError::NotFound | SessionError::VenueNotFound | SessionError::RequestNotFound => {
                ErrorKind::NotFound
            }
            SessionError::Transition(_)
            | SessionError::NotActive
            | SessionError::StatusChanged(_)
            | SessionError::AlreadyProcessed
            | SessionError::CannotRemoveHost => ErrorKind::InvalidState,
            SessionError::SessionFull
            | SessionError::AlreadyMember
            | SessionError::DuplicatePending => ErrorKind::Conflict,
            SessionError::NotParticipant => ErrorKind::NotParticipant,
            SessionError::WindowClosed => ErrorKind::WindowClosed,
            SessionError::Database(e) => e.kind(),
        }
    }
}

impl From<DatabaseError> for SessionError {
    fn from(value: DatabaseError) -> Self {
        match value {
            DatabaseError::NotFound {
                resource: "session",
                ..
            } => SessionError::NotFound,
            DatabaseError::NotFound {
                resource: "venue", ..
            } => SessionError::VenueNotFound,
            DatabaseError::NotFound {
                resource: "join request",
                ..
            } => SessionError::RequestNotFound,
            DatabaseError::NotFound {
                resource: "participant",
                ..
            } => SessionError::NotParticipant,
            DatabaseError::Conflict {
                resource: "session",
                field: "participants",
                ..
            } => SessionError::SessionFull,
            DatabaseError::Conflict {
                resource: "session",
                field: "status",
                value,
            } => SessionError::StatusChanged(value),
            DatabaseError::Conflict {
                resource: "participant",
                ..
            } => SessionError::AlreadyMember,
            DatabaseError::Conflict {
                resource: "join request",
                field: "user_id",
                ..
            } => SessionError::DuplicatePending,
            DatabaseError::Conflict {
                resource: "join request",
                field: "status",
                ..
            } => SessionError::AlreadyProcessed,
            e => SessionError::Database(e),
        }
    }
}

/// What a user fills in to create a session
#[derive(Debug, Clone)]
pub struct SessionDraft {
    pub subject: String,
    pub topic: String,
    pub venue_id: String,
    pub meeting_spot: Option<String>,
    pub start_time: DateTime<Utc>,
    /// In minutes
    pub duration: i32,
    pub max_participants: i32,
}

#[derive(Debug, Clone, Default)]
pub struct NearbyQuery {
    pub point: Option<Coordinates>,
    /// In miles, the configured default is used when absent
    pub radius: Option<f64>,
    pub subject: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NearbySession {
    pub session: SessionData,
    /// In miles
    pub distance: f64,
}

/// A session awaiting review, along with who created it
#[derive(Debug, Clone)]
pub struct PendingSession {
    pub session: SessionData,
    pub creator: UserSummary,
}

impl SessionManager {
    pub fn new(context: &CollabContext) -> Self {
        Self {
            context: context.clone(),
        }
    }

    /// Creates a session that awaits review by a platform admin.
    /// The creator becomes its host and first participant.
    pub async fn create(
        &self,
        creator: &UserData,
        draft: SessionDraft,
    ) -> Result<SessionData, SessionError> {
        let subject = non_empty(&draft.subject, "Subject")?;
        let topic = non_empty(&draft.topic, "Topic")?;
        let duration = validate_duration(draft.duration)?;
        let max_participants = validate_max_participants(draft.max_participants)?;

        let venue = self.context.database.venue_by_id(&draft.venue_id).await?;
        let meeting_spot = draft
            .meeting_spot
            .map(|spot| spot.trim().to_string())
            .filter(|spot| !spot.is_empty());

        let session = self
            .context
            .database
            .create_session(NewSession {
                creator_id: creator.id,
                subject,
                topic,
                location: LocationData {
                    venue_id: venue.id,
                    venue_name: venue.name,
                    coordinates: venue.coordinates,
                    meeting_spot,
                },
                start_time: draft.start_time,
                duration,
                max_participants,
            })
            .await?;

        info!(
            "Session {} was created by user {}, awaiting review",
            session.id, creator.id
        );

        Ok(session)
    }

    pub async fn approve(&self, admin: &UserData, session_id: &str) -> Result<SessionData, SessionError> {
        self.review(admin, session_id, SessionAction::Approve).await
    }

    pub async fn reject(&self, admin: &UserData, session_id: &str) -> Result<SessionData, SessionError> {
        self.review(admin, session_id, SessionAction::Reject).await
    }

    /// Cancels a session that hasn't ended. Only the host can do this.
    pub async fn cancel(&self, user: &UserData, session_id: &str) -> Result<SessionData, SessionError> {
        let _guard = self.context.locks.lock(session_id).await;
        let session = visible_session(&self.context, user, session_id).await?;

        require_host(&session, user)?;

        self.transition(&session, SessionAction::Cancel, None).await
    }

    /// Destroys a session along with everything that belongs to it
    pub async fn delete(&self, admin: &UserData, session_id: &str) -> Result<(), SessionError> {
        require_admin(admin)?;

        let _guard = self.context.locks.lock(session_id).await;
        self.context.database.delete_session(session_id).await?;

        info!("Session {} was deleted by admin {}", session_id, admin.id);
        Ok(())
    }

    /// Removes a participant from a session. Removing someone who isn't in it does nothing.
    pub async fn remove_participant(
        &self,
        host: &UserData,
        session_id: &str,
        user_id: UserId,
    ) -> Result<SessionData, SessionError> {
        let _guard = self.context.locks.lock(session_id).await;
        let session = visible_session(&self.context, host, session_id).await?;

        require_host(&session, host)?;

        if session.is_host(user_id) {
            return Err(SessionError::CannotRemoveHost);
        }

        if !session.has_participant(user_id) {
            return Ok(session);
        }

        self.context
            .database
            .remove_participant(session_id, user_id)
            .await?;

        info!("User {} was removed from session {}", user_id, session_id);

        Ok(self.context.database.session_by_id(session_id).await?)
    }

    pub async fn check_in(&self, user: &UserData, session_id: &str) -> Result<ParticipantData, SessionError> {
        self.check_in_at(user, session_id, Utc::now()).await
    }

    /// Checks a participant in, if the window is open at `now`
    pub async fn check_in_at(
        &self,
        user: &UserData,
        session_id: &str,
        now: DateTime<Utc>,
    ) -> Result<ParticipantData, SessionError> {
        let _guard = self.context.locks.lock(session_id).await;
        let session = visible_session(&self.context, user, session_id).await?;

        if !session.has_participant(user.id) {
            return Err(SessionError::NotParticipant);
        }

        if !session.is_checkin_open(now) {
            return Err(SessionError::WindowClosed);
        }

        let participant = self
            .context
            .database
            .check_in_participant(session_id, user.id, now)
            .await?;

        debug!("User {} checked in to session {}", user.id, session_id);
        Ok(participant)
    }

    /// Lists every session the caller may see, by start time
    pub async fn list_all(&self, caller: &UserData) -> Result<Vec<SessionData>, SessionError> {
        let filter = if caller.is_admin {
            SessionFilter::default()
        } else {
            SessionFilter {
                statuses: Some(SessionStatus::PUBLIC.to_vec()),
                participant: None,
            }
        };

        Ok(self.context.database.list_sessions(filter).await?)
    }

    pub async fn get(&self, caller: &UserData, session_id: &str) -> Result<SessionData, SessionError> {
        visible_session(&self.context, caller, session_id).await
    }

    /// Lists the sessions the user counts as theirs
    pub async fn list_mine(&self, user: &UserData) -> Result<Vec<SessionData>, SessionError> {
        Ok(self
            .context
            .database
            .list_sessions(SessionFilter::memberships(user.id))
            .await?)
    }

    /// Lists sessions awaiting review, newest first
    pub async fn list_pending(&self, admin: &UserData) -> Result<Vec<PendingSession>, SessionError> {
        require_admin(admin)?;

        let sessions = self
            .context
            .database
            .list_sessions(SessionFilter {
                statuses: Some(vec![SessionStatus::PendingAdminApproval]),
                participant: None,
            })
            .await?;

        let mut pending = Vec::with_capacity(sessions.len());

        for session in sessions {
            let creator = self.context.database.user_by_id(session.creator_id).await?;

            pending.push(PendingSession {
                creator: creator.summary(),
                session,
            });
        }

        pending.sort_by(|a, b| b.session.created_at.cmp(&a.session.created_at));
        Ok(pending)
    }

    pub async fn list_nearby(
        &self,
        caller: &UserData,
        query: NearbyQuery,
    ) -> Result<Vec<NearbySession>, SessionError> {
        self.list_nearby_at(caller, query, Utc::now()).await
    }

    /// Lists active sessions starting after `now` around a point, closest first.
    /// The point defaults to the location of the caller.
    pub async fn list_nearby_at(
        &self,
        caller: &UserData,
        query: NearbyQuery,
        now: DateTime<Utc>,
    ) -> Result<Vec<NearbySession>, SessionError> {
        let point = query.point.unwrap_or(caller.coordinates);
        let radius = query
            .radius
            .unwrap_or(self.context.config.default_search_radius);

        let subjects: Vec<_> = query.subject.into_iter().collect();
        self.nearby(point, radius, &subjects, now).await
    }

    pub async fn list_recommended(&self, user: &UserData) -> Result<Vec<NearbySession>, SessionError> {
        self.list_recommended_at(user, Utc::now()).await
    }

    /// Lists upcoming sessions within the travel distance of the user, in subjects they like
    pub async fn list_recommended_at(
        &self,
        user: &UserData,
        now: DateTime<Utc>,
    ) -> Result<Vec<NearbySession>, SessionError> {
        let preferences = &user.preferences;

        self.nearby(
            user.coordinates,
            preferences.max_distance,
            &preferences.subjects,
            now,
        )
        .await
    }

    async fn nearby(
        &self,
        point: Coordinates,
        radius: f64,
        subjects: &[String],
        now: DateTime<Utc>,
    ) -> Result<Vec<NearbySession>, SessionError> {
        let radius = validate_radius(radius)?;

        let sessions = self
            .context
            .database
            .list_sessions(SessionFilter {
                statuses: Some(vec![SessionStatus::Active]),
                participant: None,
            })
            .await?;

        let mut nearby: Vec<_> = sessions
            .into_iter()
            .filter(|s| s.start_time > now)
            .filter(|s| {
                subjects.is_empty()
                    || subjects
                        .iter()
                        .any(|subject| subject.trim().eq_ignore_ascii_case(&s.subject))
            })
            .map(|session| NearbySession {
                distance: point.distance_to(&session.location.coordinates),
                session,
            })
            .filter(|s| s.distance <= radius)
            .collect();

        nearby.sort_by(|a, b| {
            a.distance
                .total_cmp(&b.distance)
                .then(a.session.start_time.cmp(&b.session.start_time))
        });
        nearby.truncate(self.context.config.nearby_limit);

        Ok(nearby)
    }

    async fn review(
        &self,
        admin: &UserData,
        session_id: &str,
        action: SessionAction,
    ) -> Result<SessionData, SessionError> {
        require_admin(admin)?;

        let _guard = self.context.locks.lock(session_id).await;
        let session = self.context.database.session_by_id(session_id).await?;

        let review = AdminReview {
            approved: action == SessionAction::Approve,
            reviewed_by: admin.id,
            reviewed_at: Utc::now(),
        };

        self.transition(&session, action, Some(review)).await
    }

    async fn transition(
        &self,
        session: &SessionData,
        action: SessionAction,
        review: Option<AdminReview>,
    ) -> Result<SessionData, SessionError> {
        let to = session.status.apply(action)?;

        let updated = self
            .context
            .database
            .update_session_status(SessionStatusUpdate {
                session_id: session.id.clone(),
                from: session.status,
                to,
                review,
            })
            .await?;

        info!("Session {} went from {} to {}", session.id, session.status, to);
        Ok(updated)
    }
}

/// Fetches a session, hiding sessions under review from anyone not involved
pub(crate) async fn visible_session(
    context: &CollabContext,
    user: &UserData,
    session_id: &str,
) -> Result<SessionData, SessionError> {
    let session = context.database.session_by_id(session_id).await?;

    if !session.is_visible_to(user) {
        return Err(SessionError::NotFound);
    }

    Ok(session)
}

fn non_empty(value: &str, field: &'static str) -> Result<String, SessionError> {
    let value = value.trim();

    if value.is_empty() {
        return Err(SessionError::MissingField(field));
    }

    Ok(value.to_string())
}

#[cfg(test)]
mod test {
    use chrono::Duration;

    use flashmob_core::ParticipantRole;

    use crate::testing::{draft, tomorrow, Harness};

    use super::*;

    #[tokio::test]
    async fn test_create_session() {
        let harness = Harness::new().await;
        let session = harness.pending_session(tomorrow(), 4).await;

        assert_eq!(session.status, SessionStatus::PendingAdminApproval);
        assert_eq!(session.creator_id, harness.host.id);
        assert_eq!(session.location.venue_name, "UCM James C. Kirkpatrick Library");
        assert_eq!(session.location.meeting_spot.as_deref(), Some("Second floor"));
        assert_eq!(session.participants.len(), 1);
        assert_eq!(session.participants[0].user_id, harness.host.id);
        assert_eq!(session.participants[0].role, ParticipantRole::Host);

        let mine = harness.collab.sessions.list_mine(&harness.host).await.unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].id, session.id);
    }

    #[tokio::test]
    async fn test_create_session_validation() {
        let harness = Harness::new().await;
        let sessions = &harness.collab.sessions;

        let cases = [
            SessionDraft {
                duration: 29,
                ..draft(tomorrow(), 4)
            },
            SessionDraft {
                duration: 181,
                ..draft(tomorrow(), 4)
            },
            draft(tomorrow(), 2),
            draft(tomorrow(), 9),
            SessionDraft {
                subject: "  ".to_string(),
                ..draft(tomorrow(), 4)
            },
            SessionDraft {
                topic: String::new(),
                ..draft(tomorrow(), 4)
            },
        ];

        for case in cases {
            let error = sessions.create(&harness.host, case).await.unwrap_err();
            assert_eq!(error.kind(), ErrorKind::Validation, "{error}");
        }

        let error = sessions
            .create(
                &harness.host,
                SessionDraft {
                    venue_id: "V999".to_string(),
                    ..draft(tomorrow(), 4)
                },
            )
            .await
            .unwrap_err();

        assert!(matches!(error, SessionError::VenueNotFound));
        assert!(sessions.list_mine(&harness.host).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_reject_then_approve_fails() {
        let harness = Harness::new().await;
        let sessions = &harness.collab.sessions;
        let session = harness.pending_session(tomorrow(), 4).await;

        let rejected = sessions.reject(&harness.admin, &session.id).await.unwrap();
        assert_eq!(rejected.status, SessionStatus::Rejected);

        let review = rejected.review.unwrap();
        assert!(!review.approved);
        assert_eq!(review.reviewed_by, harness.admin.id);

        let error = sessions.approve(&harness.admin, &session.id).await.unwrap_err();
        assert_eq!(error.kind(), ErrorKind::InvalidState);
    }

    #[tokio::test]
    async fn test_reject_removes_from_active_sessions_but_approve_does_not() {
        let harness = Harness::new().await;
        let sessions = &harness.collab.sessions;

        let approved = harness.pending_session(tomorrow(), 4).await;
        let rejected = harness.pending_session(tomorrow(), 4).await;

        sessions.approve(&harness.admin, &approved.id).await.unwrap();
        sessions.reject(&harness.admin, &rejected.id).await.unwrap();

        let mine: Vec<_> = sessions
            .list_mine(&harness.host)
            .await
            .unwrap()
            .into_iter()
            .map(|s| s.id)
            .collect();

        assert_eq!(mine, vec![approved.id]);

        // The host is still recorded as a participant of the rejected session
        let rejected = sessions.get(&harness.host, &rejected.id).await.unwrap();
        assert!(rejected.has_participant(harness.host.id));
    }

    #[tokio::test]
    async fn test_review_requires_admin() {
        let harness = Harness::new().await;
        let session = harness.pending_session(tomorrow(), 4).await;

        let error = harness
            .collab
            .sessions
            .approve(&harness.host, &session.id)
            .await
            .unwrap_err();

        assert_eq!(error.kind(), ErrorKind::Forbidden);

        let error = harness
            .collab
            .sessions
            .approve(&harness.admin, "S00000000")
            .await
            .unwrap_err();

        assert_eq!(error.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_cancel() {
        let harness = Harness::new().await;
        let sessions = &harness.collab.sessions;
        let other = harness.user("other@example.com").await;

        let pending = harness.pending_session(tomorrow(), 4).await;
        let cancelled = sessions.cancel(&harness.host, &pending.id).await.unwrap();
        assert_eq!(cancelled.status, SessionStatus::Cancelled);

        let active = harness.active_session(tomorrow(), 4).await;
        let error = sessions.cancel(&other, &active.id).await.unwrap_err();
        assert_eq!(error.kind(), ErrorKind::Forbidden);

        sessions.cancel(&harness.host, &active.id).await.unwrap();

        let error = sessions.cancel(&harness.host, &active.id).await.unwrap_err();
        assert_eq!(error.kind(), ErrorKind::InvalidState);

        assert!(sessions.list_mine(&harness.host).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_pending_sessions_are_hidden() {
        let harness = Harness::new().await;
        let sessions = &harness.collab.sessions;
        let other = harness.user("other@example.com").await;

        let pending = harness.pending_session(tomorrow(), 4).await;
        let active = harness.active_session(tomorrow() + Duration::hours(1), 4).await;

        let error = sessions.get(&other, &pending.id).await.unwrap_err();
        assert_eq!(error.kind(), ErrorKind::NotFound);

        assert!(sessions.get(&harness.host, &pending.id).await.is_ok());
        assert!(sessions.get(&harness.admin, &pending.id).await.is_ok());

        let listed: Vec<_> = sessions
            .list_all(&other)
            .await
            .unwrap()
            .into_iter()
            .map(|s| s.id)
            .collect();
        assert_eq!(listed, vec![active.id.clone()]);

        let listed: Vec<_> = sessions
            .list_all(&harness.admin)
            .await
            .unwrap()
            .into_iter()
            .map(|s| s.id)
            .collect();
        assert_eq!(listed, vec![pending.id.clone(), active.id]);

        let queue = sessions.list_pending(&harness.admin).await.unwrap();
        assert_eq!(queue.len(), 1);
        assert_eq!(queue[0].session.id, pending.id);
        assert_eq!(queue[0].creator.email, "host@example.com");

        assert!(sessions.list_pending(&other).await.is_err());
    }

    #[tokio::test]
    async fn test_delete_by_admin() {
        let harness = Harness::new().await;
        let sessions = &harness.collab.sessions;
        let session = harness.active_session(tomorrow(), 4).await;

        let error = sessions.delete(&harness.host, &session.id).await.unwrap_err();
        assert_eq!(error.kind(), ErrorKind::Forbidden);

        sessions.delete(&harness.admin, &session.id).await.unwrap();

        let error = sessions.get(&harness.admin, &session.id).await.unwrap_err();
        assert_eq!(error.kind(), ErrorKind::NotFound);
        assert!(sessions.list_mine(&harness.host).await.unwrap().is_empty());

        let error = sessions.delete(&harness.admin, &session.id).await.unwrap_err();
        assert_eq!(error.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_remove_participant() {
        let harness = Harness::new().await;
        let sessions = &harness.collab.sessions;
        let member = harness.user("member@example.com").await;
        let stranger = harness.user("stranger@example.com").await;

        let session = harness.active_session(tomorrow(), 4).await;
        harness.join(&member, &session.id).await;

        let error = sessions
            .remove_participant(&harness.host, &session.id, harness.host.id)
            .await
            .unwrap_err();
        assert_eq!(error.kind(), ErrorKind::InvalidState);

        let error = sessions
            .remove_participant(&member, &session.id, stranger.id)
            .await
            .unwrap_err();
        assert_eq!(error.kind(), ErrorKind::Forbidden);

        // Not a participant, nothing happens
        let unchanged = sessions
            .remove_participant(&harness.host, &session.id, stranger.id)
            .await
            .unwrap();
        assert_eq!(unchanged.participants.len(), 2);

        let updated = sessions
            .remove_participant(&harness.host, &session.id, member.id)
            .await
            .unwrap();
        assert!(!updated.has_participant(member.id));
        assert!(sessions.list_mine(&member).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_check_in_requires_participant_before_window() {
        let harness = Harness::new().await;
        let sessions = &harness.collab.sessions;
        let stranger = harness.user("stranger@example.com").await;

        let start = tomorrow();
        let session = harness.active_session(start, 4).await;

        // Inside and outside the window alike
        for now in [start, start - Duration::hours(3)] {
            let error = sessions
                .check_in_at(&stranger, &session.id, now)
                .await
                .unwrap_err();
            assert!(matches!(error, SessionError::NotParticipant));
        }
    }

    #[tokio::test]
    async fn test_check_in_window() {
        let harness = Harness::new().await;
        let sessions = &harness.collab.sessions;

        // Sessions in the harness last 90 minutes
        let start = tomorrow();
        let session = harness.active_session(start, 4).await;
        let host = &harness.host;

        let error = sessions
            .check_in_at(host, &session.id, start - Duration::minutes(16))
            .await
            .unwrap_err();
        assert!(matches!(error, SessionError::WindowClosed));

        let error = sessions
            .check_in_at(host, &session.id, start + Duration::minutes(91))
            .await
            .unwrap_err();
        assert_eq!(error.kind(), ErrorKind::WindowClosed);

        let opens_at = start - Duration::minutes(15);
        let participant = sessions
            .check_in_at(host, &session.id, opens_at)
            .await
            .unwrap();
        assert!(participant.checked_in);
        assert_eq!(participant.check_in_time, Some(opens_at));

        // Checking in again keeps the first time
        let participant = sessions
            .check_in_at(host, &session.id, start + Duration::minutes(90))
            .await
            .unwrap();
        assert_eq!(participant.check_in_time, Some(opens_at));
    }

    #[tokio::test]
    async fn test_check_in_requires_active_session() {
        let harness = Harness::new().await;
        let start = tomorrow();
        let session = harness.pending_session(start, 4).await;

        let error = harness
            .collab
            .sessions
            .check_in_at(&harness.host, &session.id, start)
            .await
            .unwrap_err();

        assert!(matches!(error, SessionError::WindowClosed));
    }

    #[tokio::test]
    async fn test_list_nearby() {
        let harness = Harness::new().await;
        let sessions = &harness.collab.sessions;
        let now = Utc::now();

        let upcoming = harness.active_session(now + Duration::hours(2), 4).await;
        // One that already started, and one still awaiting review
        harness.active_session(now - Duration::minutes(5), 4).await;
        harness.pending_session(now + Duration::hours(2), 4).await;

        let kansas_city = harness
            .collab
            .sessions
            .create(
                &harness.host,
                SessionDraft {
                    venue_id: "V006".to_string(),
                    subject: "Physics".to_string(),
                    ..draft(now + Duration::hours(3), 4)
                },
            )
            .await
            .unwrap();
        sessions.approve(&harness.admin, &kansas_city.id).await.unwrap();

        let ids = |found: Vec<NearbySession>| {
            found
                .into_iter()
                .map(|s| s.session.id)
                .collect::<Vec<_>>()
        };

        let close = sessions
            .list_nearby_at(
                &harness.host,
                NearbyQuery {
                    radius: Some(10.),
                    ..Default::default()
                },
                now,
            )
            .await
            .unwrap();
        assert_eq!(ids(close), vec![upcoming.id.clone()]);

        let wide = sessions
            .list_nearby_at(
                &harness.host,
                NearbyQuery {
                    radius: Some(100.),
                    ..Default::default()
                },
                now,
            )
            .await
            .unwrap();
        assert_eq!(wide.len(), 2);
        assert!(wide[0].distance <= wide[1].distance);

        let physics = sessions
            .list_nearby_at(
                &harness.host,
                NearbyQuery {
                    radius: Some(100.),
                    subject: Some("physics".to_string()),
                    point: None,
                },
                now,
            )
            .await
            .unwrap();
        assert_eq!(ids(physics), vec![kansas_city.id]);

        let error = sessions
            .list_nearby_at(
                &harness.host,
                NearbyQuery {
                    radius: Some(f64::NAN),
                    ..Default::default()
                },
                now,
            )
            .await
            .unwrap_err();
        assert_eq!(error.kind(), ErrorKind::Validation);
    }

    #[tokio::test]
    async fn test_list_nearby_is_capped() {
        let harness = Harness::new().await;
        let start = tomorrow();

        for _ in 0..22 {
            harness.active_session(start, 3).await;
        }

        let found = harness
            .collab
            .sessions
            .list_nearby(&harness.host, NearbyQuery::default())
            .await
            .unwrap();

        assert_eq!(found.len(), 20);
    }

    #[tokio::test]
    async fn test_list_recommended_uses_preferences() {
        let harness = Harness::new().await;
        let start = tomorrow();
        let calculus = harness.active_session(start, 4).await;

        let user = harness.user("ada@example.com").await;
        let recommended = harness.collab.sessions.list_recommended(&user).await.unwrap();
        assert_eq!(recommended.len(), 1);

        let user = harness
            .collab
            .users
            .update_preferences(
                &user,
                crate::PreferencesUpdate {
                    subjects: Some(vec!["Chemistry".to_string()]),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let recommended = harness.collab.sessions.list_recommended(&user).await.unwrap();
        assert!(recommended.is_empty());

        let user = harness
            .collab
            .users
            .update_preferences(
                &user,
                crate::PreferencesUpdate {
                    subjects: Some(vec!["calculus".to_string()]),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let recommended = harness.collab.sessions.list_recommended(&user).await.unwrap();
        assert_eq!(recommended[0].session.id, calculus.id);
    }
}
