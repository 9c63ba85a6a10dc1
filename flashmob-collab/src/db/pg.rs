use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Datelike, Utc};
use flashmob_core::{Coordinates, JoinRequestStatus, Sequence, SessionStatus};
use log::info;
use sqlx::{
    postgres::PgPoolOptions, query, query_as, query_scalar, Error as SqlxError, FromRow, PgPool,
    Postgres, Transaction,
};

use crate::venues::seed_venues;

use super::*;

/// Statements run by [PgDatabase::migrate], in order
const SCHEMA: &[&str] = &[
    "CREATE SEQUENCE IF NOT EXISTS user_ids START 101",
    "CREATE TABLE IF NOT EXISTS users (
        id INTEGER PRIMARY KEY DEFAULT nextval('user_ids'),
        email TEXT NOT NULL UNIQUE,
        password TEXT NOT NULL,
        name TEXT NOT NULL,
        address TEXT NOT NULL,
        lat DOUBLE PRECISION NOT NULL,
        lng DOUBLE PRECISION NOT NULL,
        is_admin BOOLEAN NOT NULL DEFAULT false,
        suspended BOOLEAN NOT NULL DEFAULT false,
        subjects TEXT[] NOT NULL DEFAULT '{}',
        max_distance DOUBLE PRECISION NOT NULL DEFAULT 5,
        favorite_venues TEXT[] NOT NULL DEFAULT '{}',
        created_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )",
    "CREATE TABLE IF NOT EXISTS tokens (
        token TEXT PRIMARY KEY,
        user_id INTEGER NOT NULL REFERENCES users (id) ON DELETE CASCADE,
        expires_at TIMESTAMPTZ NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS venues (
        id TEXT PRIMARY KEY,
        name TEXT NOT NULL,
        address TEXT NOT NULL,
        lat DOUBLE PRECISION NOT NULL,
        lng DOUBLE PRECISION NOT NULL,
        category TEXT NOT NULL,
        wifi_quality INTEGER NOT NULL,
        noise_level INTEGER NOT NULL,
        study_rating DOUBLE PRECISION NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS sessions (
        id TEXT PRIMARY KEY,
        creator_id INTEGER NOT NULL REFERENCES users (id),
        subject TEXT NOT NULL,
        topic TEXT NOT NULL,
        venue_id TEXT NOT NULL,
        venue_name TEXT NOT NULL,
        lat DOUBLE PRECISION NOT NULL,
        lng DOUBLE PRECISION NOT NULL,
        meeting_spot TEXT,
        start_time TIMESTAMPTZ NOT NULL,
        duration INTEGER NOT NULL,
        max_participants INTEGER NOT NULL,
        status TEXT NOT NULL,
        admin_approved BOOLEAN,
        reviewed_by INTEGER,
        reviewed_at TIMESTAMPTZ,
        created_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )",
    "CREATE TABLE IF NOT EXISTS participants (
        session_id TEXT NOT NULL REFERENCES sessions (id) ON DELETE CASCADE,
        user_id INTEGER NOT NULL REFERENCES users (id),
        role TEXT NOT NULL,
        checked_in BOOLEAN NOT NULL DEFAULT false,
        check_in_time TIMESTAMPTZ,
        joined_at TIMESTAMPTZ NOT NULL DEFAULT clock_timestamp(),
        PRIMARY KEY (session_id, user_id)
    )",
    "CREATE TABLE IF NOT EXISTS join_requests (
        id TEXT PRIMARY KEY,
        session_id TEXT NOT NULL REFERENCES sessions (id) ON DELETE CASCADE,
        user_id INTEGER NOT NULL REFERENCES users (id),
        status TEXT NOT NULL,
        created_at TIMESTAMPTZ NOT NULL DEFAULT clock_timestamp(),
        reviewed_at TIMESTAMPTZ,
        reviewed_by INTEGER
    )",
    "CREATE UNIQUE INDEX IF NOT EXISTS join_requests_one_pending
        ON join_requests (session_id, user_id) WHERE status = 'pending'",
    "CREATE TABLE IF NOT EXISTS messages (
        id TEXT PRIMARY KEY,
        session_id TEXT NOT NULL REFERENCES sessions (id) ON DELETE CASCADE,
        author_id INTEGER NOT NULL REFERENCES users (id),
        body TEXT NOT NULL,
        created_at TIMESTAMPTZ NOT NULL DEFAULT clock_timestamp()
    )",
    "CREATE TABLE IF NOT EXISTS sequences (
        kind TEXT NOT NULL,
        year INTEGER NOT NULL,
        value INTEGER NOT NULL,
        PRIMARY KEY (kind, year)
    )",
];

const SESSION_COLUMNS: &str = "id, creator_id, subject, topic, venue_id, venue_name, lat, lng, \
    meeting_spot, start_time, duration, max_participants, status, admin_approved, reviewed_by, \
    reviewed_at, created_at";

const PARTICIPANT_QUERY: &str = "
    SELECT participants.*, users.name
    FROM participants
        INNER JOIN users ON participants.user_id = users.id";

const MESSAGE_QUERY: &str = "
    SELECT messages.*, users.name AS author_name
    FROM messages
        INNER JOIN users ON messages.author_id = users.id";

/// A postgres database implementation for flashmob
pub struct PgDatabase {
    pool: PgPool,
}

#[derive(FromRow)]
struct UserRow {
    id: i32,
    email: String,
    password: String,
    name: String,
    address: String,
    lat: f64,
    lng: f64,
    is_admin: bool,
    suspended: bool,
    subjects: Vec<String>,
    max_distance: f64,
    favorite_venues: Vec<String>,
    created_at: DateTime<Utc>,
}

impl From<UserRow> for UserData {
    fn from(row: UserRow) -> Self {
        Self {
            id: row.id,
            email: row.email,
            password: row.password,
            name: row.name,
            address: row.address,
            coordinates: Coordinates::new(row.lat, row.lng),
            is_admin: row.is_admin,
            suspended: row.suspended,
            preferences: Preferences {
                subjects: row.subjects,
                max_distance: row.max_distance,
                favorite_venues: row.favorite_venues,
            },
            created_at: row.created_at,
        }
    }
}

#[derive(FromRow)]
struct TokenRow {
    token: String,
    expires_at: DateTime<Utc>,
    user_id: i32,
}

#[derive(FromRow)]
struct VenueRow {
    id: String,
    name: String,
    address: String,
    lat: f64,
    lng: f64,
    category: String,
    wifi_quality: i32,
    noise_level: i32,
    study_rating: f64,
}

impl From<VenueRow> for VenueData {
    fn from(row: VenueRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            address: row.address,
            coordinates: Coordinates::new(row.lat, row.lng),
            category: row.category,
            wifi_quality: row.wifi_quality,
            noise_level: row.noise_level,
            study_rating: row.study_rating,
        }
    }
}

#[derive(FromRow)]
struct SessionRow {
    id: String,
    creator_id: i32,
    subject: String,
    topic: String,
    venue_id: String,
    venue_name: String,
    lat: f64,
    lng: f64,
    meeting_spot: Option<String>,
    start_time: DateTime<Utc>,
    duration: i32,
    max_participants: i32,
    status: String,
    admin_approved: Option<bool>,
    reviewed_by: Option<i32>,
    reviewed_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl SessionRow {
    fn into_data(self, participants: Vec<ParticipantData>) -> Result<SessionData> {
        let review = match (self.admin_approved, self.reviewed_by, self.reviewed_at) {
            (Some(approved), Some(reviewed_by), Some(reviewed_at)) => Some(AdminReview {
                approved,
                reviewed_by,
                reviewed_at,
            }),
            _ => None,
        };

        Ok(SessionData {
            status: self
                .status
                .parse::<SessionStatus>()
                .map_err(|e| DatabaseError::Internal(Box::new(e)))?,
            id: self.id,
            creator_id: self.creator_id,
            subject: self.subject,
            topic: self.topic,
            location: LocationData {
                venue_id: self.venue_id,
                venue_name: self.venue_name,
                coordinates: Coordinates::new(self.lat, self.lng),
                meeting_spot: self.meeting_spot,
            },
            start_time: self.start_time,
            duration: self.duration,
            max_participants: self.max_participants,
            review,
            participants,
            created_at: self.created_at,
        })
    }
}

#[derive(FromRow)]
struct ParticipantRow {
    session_id: String,
    user_id: i32,
    name: String,
    role: String,
    checked_in: bool,
    check_in_time: Option<DateTime<Utc>>,
    joined_at: DateTime<Utc>,
}

impl TryFrom<ParticipantRow> for ParticipantData {
    type Error = DatabaseError;

    fn try_from(row: ParticipantRow) -> Result<Self> {
        Ok(Self {
            role: row.role.parse().map_err(|e| DatabaseError::Internal(Box::new(e)))?,
            session_id: row.session_id,
            user_id: row.user_id,
            name: row.name,
            checked_in: row.checked_in,
            check_in_time: row.check_in_time,
            joined_at: row.joined_at,
        })
    }
}

#[derive(FromRow)]
struct JoinRequestRow {
    id: String,
    session_id: String,
    user_id: i32,
    status: String,
    created_at: DateTime<Utc>,
    reviewed_at: Option<DateTime<Utc>>,
    reviewed_by: Option<i32>,
}

impl TryFrom<JoinRequestRow> for JoinRequestData {
    type Error = DatabaseError;

    fn try_from(row: JoinRequestRow) -> Result<Self> {
        Ok(Self {
            status: row.status.parse().map_err(|e| DatabaseError::Internal(Box::new(e)))?,
            id: row.id,
            session_id: row.session_id,
            user_id: row.user_id,
            created_at: row.created_at,
            reviewed_at: row.reviewed_at,
            reviewed_by: row.reviewed_by,
        })
    }
}

#[derive(FromRow)]
struct MessageRow {
    id: String,
    session_id: String,
    author_id: i32,
    author_name: String,
    body: String,
    created_at: DateTime<Utc>,
}

impl From<MessageRow> for MessageData {
    fn from(row: MessageRow) -> Self {
        Self {
            id: row.id,
            session_id: row.session_id,
            author_id: row.author_id,
            author_name: row.author_name,
            body: row.body,
            created_at: row.created_at,
        }
    }
}

#[derive(FromRow)]
struct StatsRow {
    total_users: i64,
    total_sessions: i64,
    active_sessions: i64,
    pending_sessions: i64,
    total_venues: i64,
}

impl PgDatabase {
    pub async fn new(url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(url)
            .await
            .map_err(|e| e.any())?;

        Ok(Self { pool })
    }

    /// Creates the schema if it doesn't exist and seeds the venue catalog
    pub async fn migrate(&self) -> Result<()> {
        for statement in SCHEMA {
            query(statement)
                .execute(&self.pool)
                .await
                .map_err(|e| e.any())?;
        }

        let venue_count: i64 = query_scalar("SELECT COUNT(*) FROM venues")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| e.any())?;

        if venue_count == 0 {
            let venues = seed_venues();
            info!("Seeding {} venues", venues.len());

            for venue in venues {
                query(
                    "INSERT INTO venues (id, name, address, lat, lng, category, wifi_quality, noise_level, study_rating)
                    VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) ON CONFLICT (id) DO NOTHING",
                )
                .bind(venue.id)
                .bind(venue.name)
                .bind(venue.address)
                .bind(venue.coordinates.lat)
                .bind(venue.coordinates.lng)
                .bind(venue.category)
                .bind(venue.wifi_quality)
                .bind(venue.noise_level)
                .bind(venue.study_rating)
                .execute(&self.pool)
                .await
                .map_err(|e| e.any())?;
            }
        }

        Ok(())
    }

    /// Hands out the next id of a sequence within the transaction
    async fn next_id(tx: &mut Transaction<'_, Postgres>, sequence: Sequence) -> Result<String> {
        let year = Utc::now().year();

        let value: i32 = query_scalar(
            "INSERT INTO sequences (kind, year, value) VALUES ($1, $2, 1)
            ON CONFLICT (kind, year) DO UPDATE SET value = sequences.value + 1
            RETURNING value",
        )
        .bind(sequence.key())
        .bind(year)
        .fetch_one(&mut **tx)
        .await
        .map_err(|e| e.any())?;

        Ok(sequence.format(year, value))
    }

    async fn participants_of(&self, session_ids: &[String]) -> Result<Vec<ParticipantData>> {
        let sql = format!(
            "{PARTICIPANT_QUERY} WHERE participants.session_id = ANY($1) ORDER BY participants.joined_at"
        );

        query_as::<_, ParticipantRow>(&sql)
            .bind(session_ids)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| e.any())?
            .into_iter()
            .map(ParticipantData::try_from)
            .collect()
    }

    /// Attaches the participants to session rows
    async fn hydrate(&self, rows: Vec<SessionRow>) -> Result<Vec<SessionData>> {
        let ids: Vec<_> = rows.iter().map(|r| r.id.clone()).collect();
        let mut by_session: HashMap<String, Vec<ParticipantData>> = HashMap::new();

        for participant in self.participants_of(&ids).await? {
            by_session
                .entry(participant.session_id.clone())
                .or_default()
                .push(participant);
        }

        rows.into_iter()
            .map(|row| {
                let participants = by_session.remove(&row.id).unwrap_or_default();
                row.into_data(participants)
            })
            .collect()
    }
}

#[async_trait]
impl Database for PgDatabase {
    async fn user_by_id(&self, user_id: UserId) -> Result<UserData> {
        query_as::<_, UserRow>("SELECT * FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await
            .map(UserData::from)
            .map_err(|e| e.not_found_or("user", "id"))
    }

    async fn user_by_email(&self, email: &str) -> Result<UserData> {
        query_as::<_, UserRow>("SELECT * FROM users WHERE email = $1")
            .bind(email)
            .fetch_one(&self.pool)
            .await
            .map(UserData::from)
            .map_err(|e| e.not_found_or("user", "email"))
    }

    async fn list_users(&self) -> Result<Vec<UserData>> {
        let rows = query_as::<_, UserRow>("SELECT * FROM users ORDER BY id")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| e.any())?;

        Ok(rows.into_iter().map(UserData::from).collect())
    }

    async fn create_user(&self, new_user: NewUser) -> Result<UserData> {
        self.user_by_email(&new_user.email)
            .await
            .conflict_or_ok("user", "email", &new_user.email)?;

        query_as::<_, UserRow>(
            "INSERT INTO users (email, password, name, address, lat, lng, is_admin, subjects, max_distance, favorite_venues)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) RETURNING *",
        )
        .bind(new_user.email)
        .bind(new_user.password)
        .bind(new_user.name)
        .bind(new_user.address)
        .bind(new_user.coordinates.lat)
        .bind(new_user.coordinates.lng)
        .bind(new_user.is_admin)
        .bind(new_user.preferences.subjects)
        .bind(new_user.preferences.max_distance)
        .bind(new_user.preferences.favorite_venues)
        .fetch_one(&self.pool)
        .await
        .map(UserData::from)
        .map_err(|e| e.any())
    }

    async fn update_user(&self, updated_user: UpdatedUser) -> Result<UserData> {
        let user = self.user_by_id(updated_user.id).await?;
        let (address, coordinates) = updated_user
            .address
            .unwrap_or((user.address, user.coordinates));
        let preferences = updated_user.preferences.unwrap_or(user.preferences);

        query(
            "UPDATE users SET name = $1, password = $2, address = $3, lat = $4, lng = $5,
                is_admin = $6, suspended = $7, subjects = $8, max_distance = $9, favorite_venues = $10
            WHERE id = $11",
        )
        .bind(updated_user.name.unwrap_or(user.name))
        .bind(updated_user.password.unwrap_or(user.password))
        .bind(address)
        .bind(coordinates.lat)
        .bind(coordinates.lng)
        .bind(updated_user.is_admin.unwrap_or(user.is_admin))
        .bind(updated_user.suspended.unwrap_or(user.suspended))
        .bind(preferences.subjects)
        .bind(preferences.max_distance)
        .bind(preferences.favorite_venues)
        .bind(updated_user.id)
        .execute(&self.pool)
        .await
        .map_err(|e| e.any())?;

        self.user_by_id(updated_user.id).await
    }

    async fn token(&self, token: &str) -> Result<TokenData> {
        let row = query_as::<_, TokenRow>("SELECT * FROM tokens WHERE token = $1")
            .bind(token)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| e.not_found_or("token", "token"))?;

        Ok(TokenData {
            token: row.token,
            expires_at: row.expires_at,
            user: self.user_by_id(row.user_id).await?,
        })
    }

    async fn create_token(&self, new_token: NewToken) -> Result<TokenData> {
        self.token(&new_token.token)
            .await
            .conflict_or_ok("token", "token", &new_token.token)?;

        query("INSERT INTO tokens (token, user_id, expires_at) VALUES ($1, $2, $3)")
            .bind(&new_token.token)
            .bind(new_token.user_id)
            .bind(new_token.expires_at)
            .execute(&self.pool)
            .await
            .map_err(|e| e.any())?;

        self.token(&new_token.token).await
    }

    async fn delete_token(&self, token: &str) -> Result<()> {
        // Ensure token exists
        let _ = self.token(token).await?;

        query("DELETE FROM tokens WHERE token = $1")
            .bind(token)
            .execute(&self.pool)
            .await
            .map_err(|e| e.any())
            .map(|_| ())
    }

    async fn clear_expired_tokens(&self) -> Result<()> {
        query("DELETE FROM tokens WHERE now() >= expires_at")
            .execute(&self.pool)
            .await
            .map_err(|e| e.any())
            .map(|_| ())
    }

    async fn venue_by_id(&self, venue_id: &str) -> Result<VenueData> {
        query_as::<_, VenueRow>("SELECT * FROM venues WHERE id = $1")
            .bind(venue_id)
            .fetch_one(&self.pool)
            .await
            .map(VenueData::from)
            .map_err(|e| e.not_found_or("venue", "id"))
    }

    async fn list_venues(&self) -> Result<Vec<VenueData>> {
        let rows = query_as::<_, VenueRow>("SELECT * FROM venues ORDER BY id")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| e.any())?;

        Ok(rows.into_iter().map(VenueData::from).collect())
    }

    async fn session_by_id(&self, session_id: &str) -> Result<SessionData> {
        let sql = format!("SELECT {SESSION_COLUMNS} FROM sessions WHERE id = $1");

        let row = query_as::<_, SessionRow>(&sql)
            .bind(session_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| e.not_found_or("session", "id"))?;

        let participants = self.participants_of(&[row.id.clone()]).await?;
        row.into_data(participants)
    }

    async fn list_sessions(&self, filter: SessionFilter) -> Result<Vec<SessionData>> {
        let statuses: Option<Vec<String>> = filter
            .statuses
            .map(|s| s.iter().map(|s| s.as_str().to_string()).collect());

        let sql = format!(
            "SELECT {SESSION_COLUMNS} FROM sessions
            WHERE ($1::TEXT[] IS NULL OR status = ANY($1))
                AND ($2::INTEGER IS NULL OR EXISTS (
                    SELECT 1 FROM participants
                    WHERE participants.session_id = sessions.id AND participants.user_id = $2
                ))
            ORDER BY start_time, id"
        );

        let rows = query_as::<_, SessionRow>(&sql)
            .bind(statuses)
            .bind(filter.participant)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| e.any())?;

        self.hydrate(rows).await
    }

    async fn create_session(&self, new_session: NewSession) -> Result<SessionData> {
        let mut tx = self.pool.begin().await.map_err(|e| e.any())?;
        let id = Self::next_id(&mut tx, Sequence::Session).await?;

        query(
            "INSERT INTO sessions (id, creator_id, subject, topic, venue_id, venue_name, lat, lng,
                meeting_spot, start_time, duration, max_participants, status)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)",
        )
        .bind(&id)
        .bind(new_session.creator_id)
        .bind(new_session.subject)
        .bind(new_session.topic)
        .bind(new_session.location.venue_id)
        .bind(new_session.location.venue_name)
        .bind(new_session.location.coordinates.lat)
        .bind(new_session.location.coordinates.lng)
        .bind(new_session.location.meeting_spot)
        .bind(new_session.start_time)
        .bind(new_session.duration)
        .bind(new_session.max_participants)
        .bind(SessionStatus::PendingAdminApproval.as_str())
        .execute(&mut *tx)
        .await
        .map_err(|e| e.any())?;

        query("INSERT INTO participants (session_id, user_id, role) VALUES ($1, $2, 'host')")
            .bind(&id)
            .bind(new_session.creator_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| e.any())?;

        tx.commit().await.map_err(|e| e.any())?;

        self.session_by_id(&id).await
    }

    async fn update_session_status(&self, update: SessionStatusUpdate) -> Result<SessionData> {
        let (approved, reviewed_by, reviewed_at) = match update.review {
            Some(review) => (
                Some(review.approved),
                Some(review.reviewed_by),
                Some(review.reviewed_at),
            ),
            None => (None, None, None),
        };

        let result = query(
            "UPDATE sessions SET status = $1,
                admin_approved = COALESCE($2, admin_approved),
                reviewed_by = COALESCE($3, reviewed_by),
                reviewed_at = COALESCE($4, reviewed_at)
            WHERE id = $5 AND status = $6",
        )
        .bind(update.to.as_str())
        .bind(approved)
        .bind(reviewed_by)
        .bind(reviewed_at)
        .bind(&update.session_id)
        .bind(update.from.as_str())
        .execute(&self.pool)
        .await
        .map_err(|e| e.any())?;

        let session = self.session_by_id(&update.session_id).await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::Conflict {
                resource: "session",
                field: "status",
                value: session.status.to_string(),
            });
        }

        Ok(session)
    }

    async fn delete_session(&self, session_id: &str) -> Result<()> {
        // Ensure session exists
        let _ = self.session_by_id(session_id).await?;

        // Participants, join requests and messages cascade
        query("DELETE FROM sessions WHERE id = $1")
            .bind(session_id)
            .execute(&self.pool)
            .await
            .map_err(|e| e.any())
            .map(|_| ())
    }

    async fn participant(&self, session_id: &str, user_id: UserId) -> Result<ParticipantData> {
        let sql = format!(
            "{PARTICIPANT_QUERY} WHERE participants.session_id = $1 AND participants.user_id = $2"
        );

        query_as::<_, ParticipantRow>(&sql)
            .bind(session_id)
            .bind(user_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| e.not_found_or("participant", "user_id"))?
            .try_into()
    }

    async fn add_participant(&self, new_participant: NewParticipant) -> Result<ParticipantData> {
        let NewParticipant {
            session_id,
            user_id,
            approves,
        } = new_participant;

        let mut tx = self.pool.begin().await.map_err(|e| e.any())?;

        // Locks the session row until the transaction ends
        let max_participants: i32 =
            query_scalar("SELECT max_participants FROM sessions WHERE id = $1 FOR UPDATE")
                .bind(&session_id)
                .fetch_one(&mut *tx)
                .await
                .map_err(|e| e.not_found_or("session", "id"))?;

        let members: Vec<i32> =
            query_scalar("SELECT user_id FROM participants WHERE session_id = $1")
                .bind(&session_id)
                .fetch_all(&mut *tx)
                .await
                .map_err(|e| e.any())?;

        if members.contains(&user_id) {
            return Err(DatabaseError::Conflict {
                resource: "participant",
                field: "user_id",
                value: user_id.to_string(),
            });
        }

        if members.len() as i64 >= max_participants as i64 {
            return Err(DatabaseError::Conflict {
                resource: "session",
                field: "participants",
                value: format!("{}/{}", members.len(), max_participants),
            });
        }

        if let Some(review) = approves {
            let result = query(
                "UPDATE join_requests SET status = 'approved', reviewed_by = $1, reviewed_at = $2
                WHERE id = $3 AND session_id = $4 AND user_id = $5 AND status = 'pending'",
            )
            .bind(review.reviewed_by)
            .bind(review.reviewed_at)
            .bind(&review.request_id)
            .bind(&session_id)
            .bind(user_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| e.any())?;

            if result.rows_affected() == 0 {
                return Err(DatabaseError::Conflict {
                    resource: "join request",
                    field: "status",
                    value: review.request_id,
                });
            }
        }

        query("INSERT INTO participants (session_id, user_id, role) VALUES ($1, $2, 'participant')")
            .bind(&session_id)
            .bind(user_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| e.any())?;

        tx.commit().await.map_err(|e| e.any())?;

        self.participant(&session_id, user_id).await
    }

    async fn remove_participant(&self, session_id: &str, user_id: UserId) -> Result<()> {
        let result = query("DELETE FROM participants WHERE session_id = $1 AND user_id = $2")
            .bind(session_id)
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(|e| e.any())?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound {
                resource: "participant",
                identifier: "user_id",
            });
        }

        Ok(())
    }

    async fn check_in_participant(
        &self,
        session_id: &str,
        user_id: UserId,
        at: DateTime<Utc>,
    ) -> Result<ParticipantData> {
        let result = query(
            "UPDATE participants SET checked_in = true, check_in_time = COALESCE(check_in_time, $1)
            WHERE session_id = $2 AND user_id = $3",
        )
        .bind(at)
        .bind(session_id)
        .bind(user_id)
        .execute(&self.pool)
        .await
        .map_err(|e| e.any())?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound {
                resource: "participant",
                identifier: "user_id",
            });
        }

        self.participant(session_id, user_id).await
    }

    async fn join_request_by_id(&self, request_id: &str) -> Result<JoinRequestData> {
        query_as::<_, JoinRequestRow>("SELECT * FROM join_requests WHERE id = $1")
            .bind(request_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| e.not_found_or("join request", "id"))?
            .try_into()
    }

    async fn list_join_requests(&self, filter: JoinRequestFilter) -> Result<Vec<JoinRequestData>> {
        query_as::<_, JoinRequestRow>(
            "SELECT * FROM join_requests
            WHERE session_id = $1
                AND ($2::INTEGER IS NULL OR user_id = $2)
                AND ($3::TEXT IS NULL OR status = $3)
            ORDER BY created_at, id",
        )
        .bind(&filter.session_id)
        .bind(filter.user_id)
        .bind(filter.status.map(|s| s.as_str()))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| e.any())?
        .into_iter()
        .map(JoinRequestData::try_from)
        .collect()
    }

    async fn create_join_request(&self, new_request: NewJoinRequest) -> Result<JoinRequestData> {
        let pending = self
            .list_join_requests(JoinRequestFilter {
                session_id: new_request.session_id.clone(),
                user_id: Some(new_request.user_id),
                status: Some(JoinRequestStatus::Pending),
            })
            .await?;

        if !pending.is_empty() {
            return Err(DatabaseError::Conflict {
                resource: "join request",
                field: "user_id",
                value: new_request.user_id.to_string(),
            });
        }

        let mut tx = self.pool.begin().await.map_err(|e| e.any())?;
        let id = Self::next_id(&mut tx, Sequence::JoinRequest).await?;

        let result = query(
            "INSERT INTO join_requests (id, session_id, user_id, status) VALUES ($1, $2, $3, 'pending')",
        )
        .bind(&id)
        .bind(&new_request.session_id)
        .bind(new_request.user_id)
        .execute(&mut *tx)
        .await;

        match result {
            // The partial index catches a request created since the check above
            Err(SqlxError::Database(e)) if e.is_unique_violation() => {
                return Err(DatabaseError::Conflict {
                    resource: "join request",
                    field: "user_id",
                    value: new_request.user_id.to_string(),
                })
            }
            Err(SqlxError::Database(e)) if e.is_foreign_key_violation() => {
                return Err(DatabaseError::NotFound {
                    resource: "session",
                    identifier: "id",
                })
            }
            Err(e) => return Err(e.any()),
            Ok(_) => {}
        }

        tx.commit().await.map_err(|e| e.any())?;

        self.join_request_by_id(&id).await
    }

    async fn review_join_request(&self, review: JoinRequestReview) -> Result<JoinRequestData> {
        let result = query(
            "UPDATE join_requests SET status = $1, reviewed_by = $2, reviewed_at = $3
            WHERE id = $4 AND status = 'pending'",
        )
        .bind(review.status.as_str())
        .bind(review.reviewed_by)
        .bind(review.reviewed_at)
        .bind(&review.request_id)
        .execute(&self.pool)
        .await
        .map_err(|e| e.any())?;

        let request = self.join_request_by_id(&review.request_id).await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::Conflict {
                resource: "join request",
                field: "status",
                value: request.status.to_string(),
            });
        }

        Ok(request)
    }

    async fn create_message(&self, new_message: NewMessage) -> Result<MessageData> {
        let mut tx = self.pool.begin().await.map_err(|e| e.any())?;
        let id = Self::next_id(&mut tx, Sequence::Message).await?;

        query("INSERT INTO messages (id, session_id, author_id, body) VALUES ($1, $2, $3, $4)")
            .bind(&id)
            .bind(&new_message.session_id)
            .bind(new_message.author_id)
            .bind(new_message.body)
            .execute(&mut *tx)
            .await
            .map_err(|e| e.any())?;

        tx.commit().await.map_err(|e| e.any())?;

        let sql = format!("{MESSAGE_QUERY} WHERE messages.id = $1");

        query_as::<_, MessageRow>(&sql)
            .bind(&id)
            .fetch_one(&self.pool)
            .await
            .map(MessageData::from)
            .map_err(|e| e.not_found_or("message", "id"))
    }

    async fn list_messages(&self, session_id: &str) -> Result<Vec<MessageData>> {
        let sql = format!(
            "{MESSAGE_QUERY} WHERE messages.session_id = $1 ORDER BY messages.created_at, messages.id"
        );

        let rows = query_as::<_, MessageRow>(&sql)
            .bind(session_id)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| e.any())?;

        Ok(rows.into_iter().map(MessageData::from).collect())
    }

    async fn platform_stats(&self) -> Result<PlatformStats> {
        let row = query_as::<_, StatsRow>(
            "SELECT
                (SELECT COUNT(*) FROM users) AS total_users,
                (SELECT COUNT(*) FROM sessions) AS total_sessions,
                (SELECT COUNT(*) FROM sessions WHERE status = 'active') AS active_sessions,
                (SELECT COUNT(*) FROM sessions WHERE status = 'pending_admin_approval') AS pending_sessions,
                (SELECT COUNT(*) FROM venues) AS total_venues",
        )
        .fetch_one(&self.pool)
        .await
        .map_err(|e| e.any())?;

        Ok(PlatformStats {
            total_users: row.total_users,
            total_sessions: row.total_sessions,
            active_sessions: row.active_sessions,
            pending_sessions: row.pending_sessions,
            total_venues: row.total_venues,
        })
    }
}

impl IntoDatabaseError for SqlxError {
    fn any(self) -> DatabaseError {
        DatabaseError::Internal(Box::new(self))
    }

    fn not_found_or(self, resource: &'static str, identifier: &'static str) -> DatabaseError {
        match self {
            SqlxError::RowNotFound => DatabaseError::NotFound {
                resource,
                identifier,
            },
            e => Self::any(e),
        }
    }
}
