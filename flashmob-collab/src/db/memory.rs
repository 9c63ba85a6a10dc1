use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use chrono::{DateTime, Datelike, Utc};
use flashmob_core::{JoinRequestStatus, ParticipantRole, Sequence, SessionStatus};
use parking_lot::Mutex;

use crate::venues::seed_venues;

use super::*;

/// The id of the first user of a fresh store
pub const FIRST_USER_ID: UserId = 101;

/// A database that keeps everything in memory.
/// Every method takes the table lock once, so each call is atomic.
pub struct MemoryDatabase {
    tables: Mutex<Tables>,
}

#[derive(Default)]
struct Tables {
    users: BTreeMap<UserId, UserData>,
    tokens: HashMap<String, StoredToken>,
    venues: BTreeMap<String, VenueData>,
    /// Participants live in their own table, the stored sessions have none
    sessions: BTreeMap<String, SessionData>,
    participants: Vec<StoredParticipant>,
    join_requests: BTreeMap<String, JoinRequestData>,
    messages: Vec<StoredMessage>,
    sequences: HashMap<(Sequence, i32), i32>,
}

struct StoredToken {
    user_id: UserId,
    expires_at: DateTime<Utc>,
}

struct StoredParticipant {
    session_id: String,
    user_id: UserId,
    role: ParticipantRole,
    checked_in: bool,
    check_in_time: Option<DateTime<Utc>>,
    joined_at: DateTime<Utc>,
}

struct StoredMessage {
    id: String,
    session_id: String,
    author_id: UserId,
    body: String,
    created_at: DateTime<Utc>,
}

impl MemoryDatabase {
    /// Creates an empty store with the built-in venues
    pub fn new() -> Self {
        Self::with_venues(seed_venues())
    }

    pub fn with_venues(venues: Vec<VenueData>) -> Self {
        let tables = Tables {
            venues: venues.into_iter().map(|v| (v.id.clone(), v)).collect(),
            ..Default::default()
        };

        Self {
            tables: Mutex::new(tables),
        }
    }
}

impl Default for MemoryDatabase {
    fn default() -> Self {
        Self::new()
    }
}

impl Tables {
    fn next_id(&mut self, sequence: Sequence, now: DateTime<Utc>) -> String {
        let year = now.year();
        let value = self.sequences.entry((sequence, year)).or_insert(0);
        *value += 1;

        sequence.format(year, *value)
    }

    fn user(&self, user_id: UserId) -> Result<&UserData> {
        self.users.get(&user_id).ok_or(DatabaseError::NotFound {
            resource: "user",
            identifier: "id",
        })
    }

    fn user_name(&self, user_id: UserId) -> String {
        self.users
            .get(&user_id)
            .map(|u| u.name.clone())
            .unwrap_or_else(|| "Unknown".to_string())
    }

    fn participant_data(&self, stored: &StoredParticipant) -> ParticipantData {
        ParticipantData {
            session_id: stored.session_id.clone(),
            user_id: stored.user_id,
            name: self.user_name(stored.user_id),
            role: stored.role,
            checked_in: stored.checked_in,
            check_in_time: stored.check_in_time,
            joined_at: stored.joined_at,
        }
    }

    fn participants_of(&self, session_id: &str) -> Vec<ParticipantData> {
        self.participants
            .iter()
            .filter(|p| p.session_id == session_id)
            .map(|p| self.participant_data(p))
            .collect()
    }

    fn participant(&self, session_id: &str, user_id: UserId) -> Result<ParticipantData> {
        self.participants
            .iter()
            .find(|p| p.session_id == session_id && p.user_id == user_id)
            .map(|p| self.participant_data(p))
            .ok_or(DatabaseError::NotFound {
                resource: "participant",
                identifier: "user_id",
            })
    }

    fn session(&self, session_id: &str) -> Result<SessionData> {
        let stored = self.sessions.get(session_id).ok_or(DatabaseError::NotFound {
            resource: "session",
            identifier: "id",
        })?;

        Ok(SessionData {
            participants: self.participants_of(session_id),
            ..stored.clone()
        })
    }

    fn message_data(&self, stored: &StoredMessage) -> MessageData {
        MessageData {
            id: stored.id.clone(),
            session_id: stored.session_id.clone(),
            author_id: stored.author_id,
            author_name: self.user_name(stored.author_id),
            body: stored.body.clone(),
            created_at: stored.created_at,
        }
    }
}

#[async_trait]
impl Database for MemoryDatabase {
    async fn user_by_id(&self, user_id: UserId) -> Result<UserData> {
        self.tables.lock().user(user_id).cloned()
    }

    async fn user_by_email(&self, email: &str) -> Result<UserData> {
        self.tables
            .lock()
            .users
            .values()
            .find(|u| u.email == email)
            .cloned()
            .ok_or(DatabaseError::NotFound {
                resource: "user",
                identifier: "email",
            })
    }

    async fn list_users(&self) -> Result<Vec<UserData>> {
        Ok(self.tables.lock().users.values().cloned().collect())
    }

    async fn create_user(&self, new_user: NewUser) -> Result<UserData> {
        let mut tables = self.tables.lock();

        if tables.users.values().any(|u| u.email == new_user.email) {
            return Err(DatabaseError::Conflict {
                resource: "user",
                field: "email",
                value: new_user.email,
            });
        }

        let id = tables
            .users
            .keys()
            .next_back()
            .map_or(FIRST_USER_ID, |last| last + 1);

        let user = UserData {
            id,
            email: new_user.email,
            password: new_user.password,
            name: new_user.name,
            address: new_user.address,
            coordinates: new_user.coordinates,
            is_admin: new_user.is_admin,
            suspended: false,
            preferences: new_user.preferences,
            created_at: Utc::now(),
        };

        tables.users.insert(id, user.clone());
        Ok(user)
    }

    async fn update_user(&self, updated_user: UpdatedUser) -> Result<UserData> {
        let mut tables = self.tables.lock();
        let user = tables
            .users
            .get_mut(&updated_user.id)
            .ok_or(DatabaseError::NotFound {
                resource: "user",
                identifier: "id",
            })?;

        if let Some(name) = updated_user.name {
            user.name = name;
        }
        if let Some(password) = updated_user.password {
            user.password = password;
        }
        if let Some((address, coordinates)) = updated_user.address {
            user.address = address;
            user.coordinates = coordinates;
        }
        if let Some(preferences) = updated_user.preferences {
            user.preferences = preferences;
        }
        if let Some(is_admin) = updated_user.is_admin {
            user.is_admin = is_admin;
        }
        if let Some(suspended) = updated_user.suspended {
            user.suspended = suspended;
        }

        Ok(user.clone())
    }

    async fn token(&self, token: &str) -> Result<TokenData> {
        let tables = self.tables.lock();
        let stored = tables.tokens.get(token).ok_or(DatabaseError::NotFound {
            resource: "token",
            identifier: "token",
        })?;

        Ok(TokenData {
            token: token.to_string(),
            expires_at: stored.expires_at,
            user: tables.user(stored.user_id)?.clone(),
        })
    }

    async fn create_token(&self, new_token: NewToken) -> Result<TokenData> {
        let mut tables = self.tables.lock();

        if tables.tokens.contains_key(&new_token.token) {
            return Err(DatabaseError::Conflict {
                resource: "token",
                field: "token",
                value: new_token.token,
            });
        }

        let user = tables.user(new_token.user_id)?.clone();

        tables.tokens.insert(
            new_token.token.clone(),
            StoredToken {
                user_id: new_token.user_id,
                expires_at: new_token.expires_at,
            },
        );

        Ok(TokenData {
            token: new_token.token,
            expires_at: new_token.expires_at,
            user,
        })
    }

    async fn delete_token(&self, token: &str) -> Result<()> {
        self.tables
            .lock()
            .tokens
            .remove(token)
            .map(|_| ())
            .ok_or(DatabaseError::NotFound {
                resource: "token",
                identifier: "token",
            })
    }

    async fn clear_expired_tokens(&self) -> Result<()> {
        let now = Utc::now();
        self.tables.lock().tokens.retain(|_, t| t.expires_at > now);

        Ok(())
    }

    async fn venue_by_id(&self, venue_id: &str) -> Result<VenueData> {
        self.tables
            .lock()
            .venues
            .get(venue_id)
            .cloned()
            .ok_or(DatabaseError::NotFound {
                resource: "venue",
                identifier: "id",
            })
    }

    async fn list_venues(&self) -> Result<Vec<VenueData>> {
        Ok(self.tables.lock().venues.values().cloned().collect())
    }

    async fn session_by_id(&self, session_id: &str) -> Result<SessionData> {
        self.tables.lock().session(session_id)
    }

    async fn list_sessions(&self, filter: SessionFilter) -> Result<Vec<SessionData>> {
        let tables = self.tables.lock();

        let mut sessions: Vec<_> = tables
            .sessions
            .values()
            .filter(|s| {
                filter
                    .statuses
                    .as_ref()
                    .map_or(true, |statuses| statuses.contains(&s.status))
            })
            .filter(|s| {
                filter.participant.map_or(true, |user_id| {
                    tables
                        .participants
                        .iter()
                        .any(|p| p.session_id == s.id && p.user_id == user_id)
                })
            })
            .map(|s| tables.session(&s.id))
            .collect::<Result<_>>()?;

        sessions.sort_by(|a, b| a.start_time.cmp(&b.start_time).then(a.id.cmp(&b.id)));
        Ok(sessions)
    }

    async fn create_session(&self, new_session: NewSession) -> Result<SessionData> {
        let mut tables = self.tables.lock();
        tables.user(new_session.creator_id)?;

        let now = Utc::now();
        let id = tables.next_id(Sequence::Session, now);

        tables.sessions.insert(
            id.clone(),
            SessionData {
                id: id.clone(),
                creator_id: new_session.creator_id,
                subject: new_session.subject,
                topic: new_session.topic,
                location: new_session.location,
                start_time: new_session.start_time,
                duration: new_session.duration,
                max_participants: new_session.max_participants,
                status: SessionStatus::PendingAdminApproval,
                review: None,
                participants: vec![],
                created_at: now,
            },
        );

        tables.participants.push(StoredParticipant {
            session_id: id.clone(),
            user_id: new_session.creator_id,
            role: ParticipantRole::Host,
            checked_in: false,
            check_in_time: None,
            joined_at: now,
        });

        tables.session(&id)
    }

    async fn update_session_status(&self, update: SessionStatusUpdate) -> Result<SessionData> {
        let mut tables = self.tables.lock();
        let session =
            tables
                .sessions
                .get_mut(&update.session_id)
                .ok_or(DatabaseError::NotFound {
                    resource: "session",
                    identifier: "id",
                })?;

        if session.status != update.from {
            return Err(DatabaseError::Conflict {
                resource: "session",
                field: "status",
                value: session.status.to_string(),
            });
        }

        session.status = update.to;
        if update.review.is_some() {
            session.review = update.review;
        }

        tables.session(&update.session_id)
    }

    async fn delete_session(&self, session_id: &str) -> Result<()> {
        let mut tables = self.tables.lock();

        if tables.sessions.remove(session_id).is_none() {
            return Err(DatabaseError::NotFound {
                resource: "session",
                identifier: "id",
            });
        }

        tables.participants.retain(|p| p.session_id != session_id);
        tables.join_requests.retain(|_, r| r.session_id != session_id);
        tables.messages.retain(|m| m.session_id != session_id);

        Ok(())
    }

    async fn participant(&self, session_id: &str, user_id: UserId) -> Result<ParticipantData> {
        self.tables.lock().participant(session_id, user_id)
    }

    async fn add_participant(&self, new_participant: NewParticipant) -> Result<ParticipantData> {
        let mut tables = self.tables.lock();
        let NewParticipant {
            session_id,
            user_id,
            approves,
        } = new_participant;

        let session = tables.session(&session_id)?;
        tables.user(user_id)?;

        if session.has_participant(user_id) {
            return Err(DatabaseError::Conflict {
                resource: "participant",
                field: "user_id",
                value: user_id.to_string(),
            });
        }

        if session.is_full() {
            return Err(DatabaseError::Conflict {
                resource: "session",
                field: "participants",
                value: format!("{}/{}", session.participant_count(), session.max_participants),
            });
        }

        if let Some(review) = approves {
            let request = tables
                .join_requests
                .get_mut(&review.request_id)
                .filter(|r| r.session_id == session_id && r.user_id == user_id)
                .ok_or(DatabaseError::NotFound {
                    resource: "join request",
                    identifier: "id",
                })?;

            if !request.status.is_pending() {
                return Err(DatabaseError::Conflict {
                    resource: "join request",
                    field: "status",
                    value: request.status.to_string(),
                });
            }

            request.status = JoinRequestStatus::Approved;
            request.reviewed_by = Some(review.reviewed_by);
            request.reviewed_at = Some(review.reviewed_at);
        }

        tables.participants.push(StoredParticipant {
            session_id: session_id.clone(),
            user_id,
            role: ParticipantRole::Participant,
            checked_in: false,
            check_in_time: None,
            joined_at: Utc::now(),
        });

        tables.participant(&session_id, user_id)
    }

    async fn remove_participant(&self, session_id: &str, user_id: UserId) -> Result<()> {
        let mut tables = self.tables.lock();
        let index = tables
            .participants
            .iter()
            .position(|p| p.session_id == session_id && p.user_id == user_id)
            .ok_or(DatabaseError::NotFound {
                resource: "participant",
                identifier: "user_id",
            })?;

        tables.participants.remove(index);
        Ok(())
    }

    async fn check_in_participant(
        &self,
        session_id: &str,
        user_id: UserId,
        at: DateTime<Utc>,
    ) -> Result<ParticipantData> {
        let mut tables = self.tables.lock();
        let participant = tables
            .participants
            .iter_mut()
            .find(|p| p.session_id == session_id && p.user_id == user_id)
            .ok_or(DatabaseError::NotFound {
                resource: "participant",
                identifier: "user_id",
            })?;

        participant.checked_in = true;
        participant.check_in_time.get_or_insert(at);

        tables.participant(session_id, user_id)
    }

    async fn join_request_by_id(&self, request_id: &str) -> Result<JoinRequestData> {
        self.tables
            .lock()
            .join_requests
            .get(request_id)
            .cloned()
            .ok_or(DatabaseError::NotFound {
                resource: "join request",
                identifier: "id",
            })
    }

    async fn list_join_requests(&self, filter: JoinRequestFilter) -> Result<Vec<JoinRequestData>> {
        let tables = self.tables.lock();

        let mut requests: Vec<_> = tables
            .join_requests
            .values()
            .filter(|r| r.session_id == filter.session_id)
            .filter(|r| filter.user_id.map_or(true, |id| r.user_id == id))
            .filter(|r| filter.status.map_or(true, |status| r.status == status))
            .cloned()
            .collect();

        requests.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(requests)
    }

    async fn create_join_request(&self, new_request: NewJoinRequest) -> Result<JoinRequestData> {
        let mut tables = self.tables.lock();
        tables.session(&new_request.session_id)?;
        tables.user(new_request.user_id)?;

        let has_pending = tables.join_requests.values().any(|r| {
            r.session_id == new_request.session_id
                && r.user_id == new_request.user_id
                && r.status.is_pending()
        });

        if has_pending {
            return Err(DatabaseError::Conflict {
                resource: "join request",
                field: "user_id",
                value: new_request.user_id.to_string(),
            });
        }

        let now = Utc::now();
        let request = JoinRequestData {
            id: tables.next_id(Sequence::JoinRequest, now),
            session_id: new_request.session_id,
            user_id: new_request.user_id,
            status: JoinRequestStatus::Pending,
            created_at: now,
            reviewed_at: None,
            reviewed_by: None,
        };

        tables
            .join_requests
            .insert(request.id.clone(), request.clone());

        Ok(request)
    }

    async fn review_join_request(&self, review: JoinRequestReview) -> Result<JoinRequestData> {
        let mut tables = self.tables.lock();
        let request =
            tables
                .join_requests
                .get_mut(&review.request_id)
                .ok_or(DatabaseError::NotFound {
                    resource: "join request",
                    identifier: "id",
                })?;

        if !request.status.is_pending() {
            return Err(DatabaseError::Conflict {
                resource: "join request",
                field: "status",
                value: request.status.to_string(),
            });
        }

        request.status = review.status;
        request.reviewed_by = Some(review.reviewed_by);
        request.reviewed_at = Some(review.reviewed_at);

        Ok(request.clone())
    }

    async fn create_message(&self, new_message: NewMessage) -> Result<MessageData> {
        let mut tables = self.tables.lock();
        tables.session(&new_message.session_id)?;

        let now = Utc::now();
        let message = StoredMessage {
            id: tables.next_id(Sequence::Message, now),
            session_id: new_message.session_id,
            author_id: new_message.author_id,
            body: new_message.body,
            created_at: now,
        };

        let data = tables.message_data(&message);
        tables.messages.push(message);

        Ok(data)
    }

    async fn list_messages(&self, session_id: &str) -> Result<Vec<MessageData>> {
        let tables = self.tables.lock();

        let mut messages: Vec<_> = tables
            .messages
            .iter()
            .filter(|m| m.session_id == session_id)
            .map(|m| tables.message_data(m))
            .collect();

        messages.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(messages)
    }

    async fn platform_stats(&self) -> Result<PlatformStats> {
        let tables = self.tables.lock();
        let count_status = |status| {
            tables
                .sessions
                .values()
                .filter(|s| s.status == status)
                .count() as i64
        };

        Ok(PlatformStats {
            total_users: tables.users.len() as i64,
            total_sessions: tables.sessions.len() as i64,
            active_sessions: count_status(SessionStatus::Active),
            pending_sessions: count_status(SessionStatus::PendingAdminApproval),
            total_venues: tables.venues.len() as i64,
        })
    }
}

#[cfg(test)]
mod test {
    use chrono::Duration;
    use flashmob_core::Coordinates;

    use super::*;

    async fn user(db: &MemoryDatabase, email: &str) -> UserData {
        db.create_user(NewUser {
            email: email.to_string(),
            password: "hash".to_string(),
            name: email.to_string(),
            address: "Warrensburg, MO".to_string(),
            coordinates: Coordinates::new(38.7625, -93.7344),
            is_admin: false,
            preferences: Preferences::default(),
        })
        .await
        .unwrap()
    }

    async fn session(db: &MemoryDatabase, creator: UserId, max_participants: i32) -> SessionData {
        let venue = db.venue_by_id("V001").await.unwrap();

        db.create_session(NewSession {
            creator_id: creator,
            subject: "Calculus".to_string(),
            topic: "Limits".to_string(),
            location: LocationData {
                venue_id: venue.id,
                venue_name: venue.name,
                coordinates: venue.coordinates,
                meeting_spot: None,
            },
            start_time: Utc::now() + Duration::days(1),
            duration: 60,
            max_participants,
        })
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn test_user_ids_start_at_101() {
        let db = MemoryDatabase::new();

        assert_eq!(user(&db, "a@example.com").await.id, 101);
        assert_eq!(user(&db, "b@example.com").await.id, 102);

        let duplicate = db
            .create_user(NewUser {
                email: "a@example.com".to_string(),
                password: String::new(),
                name: String::new(),
                address: String::new(),
                coordinates: Coordinates::new(0., 0.),
                is_admin: false,
                preferences: Preferences::default(),
            })
            .await;

        assert!(matches!(duplicate, Err(DatabaseError::Conflict { .. })));
    }

    #[tokio::test]
    async fn test_create_session_adds_host() {
        let db = MemoryDatabase::new();
        let host = user(&db, "host@example.com").await;
        let session = session(&db, host.id, 3).await;

        let year = Utc::now().year();
        assert_eq!(session.id, format!("S{year}0001"));
        assert_eq!(session.status, SessionStatus::PendingAdminApproval);
        assert_eq!(session.participants.len(), 1);
        assert_eq!(session.participants[0].role, ParticipantRole::Host);
        assert_eq!(session.participants[0].name, "host@example.com");
    }

    #[tokio::test]
    async fn test_add_participant_refuses_past_capacity() {
        let db = MemoryDatabase::new();
        let host = user(&db, "host@example.com").await;
        let session = session(&db, host.id, 3).await;

        for email in ["b@example.com", "c@example.com"] {
            let member = user(&db, email).await;
            db.add_participant(NewParticipant {
                session_id: session.id.clone(),
                user_id: member.id,
                approves: None,
            })
            .await
            .unwrap();
        }

        let late = user(&db, "d@example.com").await;
        let request = db
            .create_join_request(NewJoinRequest {
                session_id: session.id.clone(),
                user_id: late.id,
            })
            .await
            .unwrap();

        let result = db
            .add_participant(NewParticipant {
                session_id: session.id.clone(),
                user_id: late.id,
                approves: Some(JoinRequestReview {
                    request_id: request.id.clone(),
                    status: JoinRequestStatus::Approved,
                    reviewed_by: host.id,
                    reviewed_at: Utc::now(),
                }),
            })
            .await;

        assert!(matches!(result, Err(DatabaseError::Conflict { .. })));

        // Nothing was written
        let request = db.join_request_by_id(&request.id).await.unwrap();
        assert_eq!(request.status, JoinRequestStatus::Pending);
        assert_eq!(db.session_by_id(&session.id).await.unwrap().participants.len(), 3);
    }

    #[tokio::test]
    async fn test_status_update_checks_current_status() {
        let db = MemoryDatabase::new();
        let host = user(&db, "host@example.com").await;
        let session = session(&db, host.id, 4).await;

        let update = |from| SessionStatusUpdate {
            session_id: session.id.clone(),
            from,
            to: SessionStatus::Cancelled,
            review: None,
        };

        assert!(db.update_session_status(update(SessionStatus::Active)).await.is_err());

        let cancelled = db
            .update_session_status(update(SessionStatus::PendingAdminApproval))
            .await
            .unwrap();

        assert_eq!(cancelled.status, SessionStatus::Cancelled);
    }

    #[tokio::test]
    async fn test_delete_session_cascades() {
        let db = MemoryDatabase::new();
        let host = user(&db, "host@example.com").await;
        let other = user(&db, "other@example.com").await;
        let session = session(&db, host.id, 4).await;

        db.create_join_request(NewJoinRequest {
            session_id: session.id.clone(),
            user_id: other.id,
        })
        .await
        .unwrap();

        db.create_message(NewMessage {
            session_id: session.id.clone(),
            author_id: host.id,
            body: "hi".to_string(),
        })
        .await
        .unwrap();

        db.delete_session(&session.id).await.unwrap();

        assert!(db.session_by_id(&session.id).await.unwrap_err().is_not_found());
        assert!(db.list_messages(&session.id).await.unwrap().is_empty());
        assert!(db
            .list_join_requests(JoinRequestFilter {
                session_id: session.id.clone(),
                ..Default::default()
            })
            .await
            .unwrap()
            .is_empty());
        assert!(db
            .list_sessions(SessionFilter {
                participant: Some(host.id),
                ..Default::default()
            })
            .await
            .unwrap()
            .is_empty());
    }
}
