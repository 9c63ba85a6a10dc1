use chrono::{DateTime, Utc};
use flashmob_core::{
    is_checkin_open, CheckinWindow, Coordinates, JoinRequestStatus, ParticipantRole, SessionStatus,
};

pub type UserId = i32;

/// The default distance a user is willing to travel, in miles
pub const DEFAULT_MAX_DISTANCE: f64 = 5.;

#[derive(Debug, Clone, PartialEq)]
pub struct Preferences {
    pub subjects: Vec<String>,
    /// In miles
    pub max_distance: f64,
    pub favorite_venues: Vec<String>,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            subjects: vec![],
            max_distance: DEFAULT_MAX_DISTANCE,
            favorite_venues: vec![],
        }
    }
}

#[derive(Debug, Clone)]
pub struct UserData {
    pub id: UserId,
    pub email: String,
    /// The argon2 hash of the password
    pub password: String,
    pub name: String,
    pub address: String,
    pub coordinates: Coordinates,
    pub is_admin: bool,
    pub suspended: bool,
    pub preferences: Preferences,
    pub created_at: DateTime<Utc>,
}

/// The public identity of a user, shown next to things they did
#[derive(Debug, Clone, PartialEq)]
pub struct UserSummary {
    pub id: UserId,
    pub name: String,
    pub email: String,
}

impl UserData {
    pub fn summary(&self) -> UserSummary {
        UserSummary {
            id: self.id,
            name: self.name.clone(),
            email: self.email.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct TokenData {
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub user: UserData,
}

impl TokenData {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct VenueData {
    pub id: String,
    pub name: String,
    pub address: String,
    pub coordinates: Coordinates,
    /// A tag like `library` or `cafe`
    pub category: String,
    /// 1 to 5
    pub wifi_quality: i32,
    /// 1 to 5, higher is louder
    pub noise_level: i32,
    /// 0 to 5
    pub study_rating: f64,
}

/// Where a session takes place. Copied from the venue when the session is created.
#[derive(Debug, Clone, PartialEq)]
pub struct LocationData {
    pub venue_id: String,
    pub venue_name: String,
    pub coordinates: Coordinates,
    pub meeting_spot: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ParticipantData {
    pub session_id: String,
    pub user_id: UserId,
    /// The display name of the user
    pub name: String,
    pub role: ParticipantRole,
    pub checked_in: bool,
    pub check_in_time: Option<DateTime<Utc>>,
    pub joined_at: DateTime<Utc>,
}

/// The outcome of the admin review of a session
#[derive(Debug, Clone, PartialEq)]
pub struct AdminReview {
    pub approved: bool,
    pub reviewed_by: UserId,
    pub reviewed_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct SessionData {
    pub id: String,
    pub creator_id: UserId,
    pub subject: String,
    pub topic: String,
    pub location: LocationData,
    pub start_time: DateTime<Utc>,
    pub duration: i32,
    pub max_participants: i32,
    pub status: SessionStatus,
    pub review: Option<AdminReview>,
    /// Ordered by the time they joined, host first
    pub participants: Vec<ParticipantData>,
    pub created_at: DateTime<Utc>,
}

impl SessionData {
    pub fn participant_count(&self) -> usize {
        self.participants.len()
    }

    pub fn is_full(&self) -> bool {
        self.participants.len() as i64 >= self.max_participants as i64
    }

    pub fn participant(&self, user_id: UserId) -> Option<&ParticipantData> {
        self.participants.iter().find(|p| p.user_id == user_id)
    }

    pub fn has_participant(&self, user_id: UserId) -> bool {
        self.participant(user_id).is_some()
    }

    pub fn is_host(&self, user_id: UserId) -> bool {
        self.creator_id == user_id
    }

    pub fn checkin_window(&self) -> CheckinWindow {
        CheckinWindow::new(self.start_time, self.duration)
    }

    pub fn is_checkin_open(&self, now: DateTime<Utc>) -> bool {
        is_checkin_open(self.status, self.start_time, self.duration, now)
    }

    /// Sessions awaiting review are only shown to admins and the people in them
    pub fn is_visible_to(&self, user: &UserData) -> bool {
        self.status != SessionStatus::PendingAdminApproval
            || user.is_admin
            || self.has_participant(user.id)
    }
}

#[derive(Debug, Clone)]
pub struct JoinRequestData {
    pub id: String,
    pub session_id: String,
    pub user_id: UserId,
    pub status: JoinRequestStatus,
    pub created_at: DateTime<Utc>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub reviewed_by: Option<UserId>,
}

#[derive(Debug, Clone)]
pub struct MessageData {
    pub id: String,
    pub session_id: String,
    pub author_id: UserId,
    /// Resolved when the message is read, so renames show up
    pub author_name: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PlatformStats {
    pub total_users: i64,
    pub total_sessions: i64,
    pub active_sessions: i64,
    pub pending_sessions: i64,
    pub total_venues: i64,
}
