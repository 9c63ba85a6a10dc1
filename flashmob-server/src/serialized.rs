//! All schemas that are exposed from endpoints are defined here
//! along with the ToSerialized impls

use chrono::{DateTime, Utc};
use flashmob_collab::{
    AdminReview, JoinRequestData, LocationData, MessageData, NearbySession as CollabNearbySession,
    NearbyVenue as CollabNearbyVenue, ParticipantData, PendingRequest as CollabPendingRequest,
    PendingSession as CollabPendingSession, PlatformStats, Preferences as CollabPreferences,
    Profile as CollabProfile, SessionData, TokenData, UserData, UserSummary as CollabUserSummary,
    VenueData,
};
use flashmob_core::Coordinates;
use serde::Serialize;
use utoipa::ToSchema;

#[derive(Debug, Serialize, ToSchema)]
pub struct Point {
    lat: f64,
    lng: f64,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Preferences {
    subjects: Vec<String>,
    max_distance: f64,
    favorite_venues: Vec<String>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct User {
    id: i32,
    email: String,
    name: String,
    address: String,
    coordinates: Point,
    is_admin: bool,
    suspended: bool,
    preferences: Preferences,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UserSummary {
    id: i32,
    name: String,
    email: String,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoginResult {
    token: String,
    expires_at: DateTime<Utc>,
    user: User,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    user: User,
    active_sessions: Vec<Session>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Venue {
    id: String,
    name: String,
    address: String,
    coordinates: Point,
    category: String,
    wifi_quality: i32,
    noise_level: i32,
    study_rating: f64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct NearbyVenue {
    venue: Venue,
    /// In miles
    distance: f64,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    venue_id: String,
    venue_name: String,
    coordinates: Point,
    meeting_spot: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    user_id: i32,
    name: String,
    /// `host` or `participant`
    role: String,
    checked_in: bool,
    check_in_time: Option<DateTime<Utc>>,
    joined_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    approved: bool,
    reviewed_by: i32,
    reviewed_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    id: String,
    creator_id: i32,
    subject: String,
    topic: String,
    location: Location,
    start_time: DateTime<Utc>,
    /// In minutes
    duration: i32,
    max_participants: i32,
    participant_count: usize,
    status: String,
    review: Option<Review>,
    participants: Vec<Participant>,
    checkin_opens_at: DateTime<Utc>,
    checkin_closes_at: DateTime<Utc>,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct NearbySession {
    session: Session,
    /// In miles
    distance: f64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PendingSession {
    session: Session,
    creator: UserSummary,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct JoinRequest {
    id: String,
    session_id: String,
    user_id: i32,
    /// `pending`, `approved` or `rejected`
    status: String,
    created_at: DateTime<Utc>,
    reviewed_at: Option<DateTime<Utc>>,
    reviewed_by: Option<i32>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PendingRequest {
    request: JoinRequest,
    requester: UserSummary,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    id: String,
    session_id: String,
    author_id: i32,
    author_name: String,
    body: String,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    total_users: i64,
    total_sessions: i64,
    active_sessions: i64,
    pending_sessions: i64,
    total_venues: i64,
}

/// Helper trait to convert any type into a serialized version
pub trait ToSerialized<T>
where
    T: Serialize,
{
    fn to_serialized(&self) -> T;
}

impl<I, O> ToSerialized<Vec<O>> for Vec<I>
where
    I: ToSerialized<O>,
    O: Serialize,
{
    fn to_serialized(&self) -> Vec<O> {
        self.iter().map(|x| x.to_serialized()).collect()
    }
}

impl<I, O> ToSerialized<Option<O>> for Option<I>
where
    I: ToSerialized<O>,
    O: Serialize,
{
    fn to_serialized(&self) -> Option<O> {
        self.as_ref().map(|x| x.to_serialized())
    }
}

impl ToSerialized<Point> for Coordinates {
    fn to_serialized(&self) -> Point {
        Point {
            lat: self.lat,
            lng: self.lng,
        }
    }
}

impl ToSerialized<Preferences> for CollabPreferences {
    fn to_serialized(&self) -> Preferences {
        Preferences {
            subjects: self.subjects.clone(),
            max_distance: self.max_distance,
            favorite_venues: self.favorite_venues.clone(),
        }
    }
}

impl ToSerialized<User> for UserData {
    fn to_serialized(&self) -> User {
        User {
            id: self.id,
            email: self.email.clone(),
            name: self.name.clone(),
            address: self.address.clone(),
            coordinates: self.coordinates.to_serialized(),
            is_admin: self.is_admin,
            suspended: self.suspended,
            preferences: self.preferences.to_serialized(),
            created_at: self.created_at,
        }
    }
}

impl ToSerialized<UserSummary> for CollabUserSummary {
    fn to_serialized(&self) -> UserSummary {
        UserSummary {
            id: self.id,
            name: self.name.clone(),
            email: self.email.clone(),
        }
    }
}

impl ToSerialized<LoginResult> for TokenData {
    fn to_serialized(&self) -> LoginResult {
        LoginResult {
            token: self.token.clone(),
            expires_at: self.expires_at,
            user: self.user.to_serialized(),
        }
    }
}

impl ToSerialized<Profile> for CollabProfile {
    fn to_serialized(&self) -> Profile {
        Profile {
            user: self.user.to_serialized(),
            active_sessions: self.active_sessions.to_serialized(),
        }
    }
}

impl ToSerialized<Venue> for VenueData {
    fn to_serialized(&self) -> Venue {
        Venue {
            id: self.id.clone(),
            name: self.name.clone(),
            address: self.address.clone(),
            coordinates: self.coordinates.to_serialized(),
            category: self.category.clone(),
            wifi_quality: self.wifi_quality,
            noise_level: self.noise_level,
            study_rating: self.study_rating,
        }
    }
}

impl ToSerialized<NearbyVenue> for CollabNearbyVenue {
    fn to_serialized(&self) -> NearbyVenue {
        NearbyVenue {
            venue: self.venue.to_serialized(),
            distance: self.distance,
        }
    }
}

impl ToSerialized<Location> for LocationData {
    fn to_serialized(&self) -> Location {
        Location {
            venue_id: self.venue_id.clone(),
            venue_name: self.venue_name.clone(),
            coordinates: self.coordinates.to_serialized(),
            meeting_spot: self.meeting_spot.clone(),
        }
    }
}

impl ToSerialized<Participant> for ParticipantData {
    fn to_serialized(&self) -> Participant {
        Participant {
            user_id: self.user_id,
            name: self.name.clone(),
            role: self.role.as_str().to_string(),
            checked_in: self.checked_in,
            check_in_time: self.check_in_time,
            joined_at: self.joined_at,
        }
    }
}

impl ToSerialized<Review> for AdminReview {
    fn to_serialized(&self) -> Review {
        Review {
            approved: self.approved,
            reviewed_by: self.reviewed_by,
            reviewed_at: self.reviewed_at,
        }
    }
}

impl ToSerialized<Session> for SessionData {
    fn to_serialized(&self) -> Session {
        let window = self.checkin_window();

        Session {
            id: self.id.clone(),
            creator_id: self.creator_id,
            subject: self.subject.clone(),
            topic: self.topic.clone(),
            location: self.location.to_serialized(),
            start_time: self.start_time,
            duration: self.duration,
            max_participants: self.max_participants,
            participant_count: self.participant_count(),
            status: self.status.as_str().to_string(),
            review: self.review.to_serialized(),
            participants: self.participants.to_serialized(),
            checkin_opens_at: window.opens_at,
            checkin_closes_at: window.closes_at,
            created_at: self.created_at,
        }
    }
}

impl ToSerialized<NearbySession> for CollabNearbySession {
    fn to_serialized(&self) -> NearbySession {
        NearbySession {
            session: self.session.to_serialized(),
            distance: self.distance,
        }
    }
}

impl ToSerialized<PendingSession> for CollabPendingSession {
    fn to_serialized(&self) -> PendingSession {
        PendingSession {
            session: self.session.to_serialized(),
            creator: self.creator.to_serialized(),
        }
    }
}

impl ToSerialized<JoinRequest> for JoinRequestData {
    fn to_serialized(&self) -> JoinRequest {
        JoinRequest {
            id: self.id.clone(),
            session_id: self.session_id.clone(),
            user_id: self.user_id,
            status: self.status.as_str().to_string(),
            created_at: self.created_at,
            reviewed_at: self.reviewed_at,
            reviewed_by: self.reviewed_by,
        }
    }
}

impl ToSerialized<PendingRequest> for CollabPendingRequest {
    fn to_serialized(&self) -> PendingRequest {
        PendingRequest {
            request: self.request.to_serialized(),
            requester: self.requester.to_serialized(),
        }
    }
}

impl ToSerialized<Message> for MessageData {
    fn to_serialized(&self) -> Message {
        Message {
            id: self.id.clone(),
            session_id: self.session_id.clone(),
            author_id: self.author_id,
            author_name: self.author_name.clone(),
            body: self.body.clone(),
            created_at: self.created_at,
        }
    }
}

impl ToSerialized<Stats> for PlatformStats {
    fn to_serialized(&self) -> Stats {
        Stats {
            total_users: self.total_users,
            total_sessions: self.total_sessions,
            active_sessions: self.active_sessions,
            pending_sessions: self.pending_sessions,
            total_venues: self.total_venues,
        }
    }
}
