//! Shared setup for the manager tests

use chrono::{DateTime, Duration, Utc};
use flashmob_core::Config;

use crate::{Collab, MemoryDatabase, NewAccount, SessionData, SessionDraft, UserData};

pub struct Harness {
    pub collab: Collab,
    pub admin: UserData,
    pub host: UserData,
}

impl Harness {
    pub async fn new() -> Self {
        let collab = Collab::new(Config::default(), MemoryDatabase::new());

        let admin = collab
            .auth
            .bootstrap_admin("admin@example.com", "password", "Admin")
            .await
            .unwrap();

        let host = register(&collab, "host@example.com").await;

        Self {
            collab,
            admin,
            host,
        }
    }

    pub async fn user(&self, email: &str) -> UserData {
        register(&self.collab, email).await
    }

    /// Creates a session hosted by `host` that still awaits review
    pub async fn pending_session(&self, start_time: DateTime<Utc>, max_participants: i32) -> SessionData {
        self.collab
            .sessions
            .create(&self.host, draft(start_time, max_participants))
            .await
            .unwrap()
    }

    /// Creates and approves a session hosted by `host`
    pub async fn active_session(&self, start_time: DateTime<Utc>, max_participants: i32) -> SessionData {
        let session = self.pending_session(start_time, max_participants).await;

        self.collab
            .sessions
            .approve(&self.admin, &session.id)
            .await
            .unwrap()
    }

    /// Requests to join and gets approved by the host
    pub async fn join(&self, user: &UserData, session_id: &str) {
        let request = self.collab.requests.request(user, session_id).await.unwrap();

        self.collab
            .requests
            .approve(&self.host, session_id, &request.id)
            .await
            .unwrap();
    }
}

pub async fn register(collab: &Collab, email: &str) -> UserData {
    collab
        .auth
        .register(NewAccount {
            email: email.to_string(),
            password: "password".to_string(),
            name: email.split('@').next().unwrap_or(email).to_string(),
            address: "100 E South St, Warrensburg, MO".to_string(),
            preferences: None,
        })
        .await
        .unwrap()
        .user
}

pub fn draft(start_time: DateTime<Utc>, max_participants: i32) -> SessionDraft {
    SessionDraft {
        subject: "Calculus".to_string(),
        topic: "Limits and continuity".to_string(),
        venue_id: "V001".to_string(),
        meeting_spot: Some("Second floor".to_string()),
        start_time,
        duration: 90,
        max_participants,
    }
}

pub fn tomorrow() -> DateTime<Utc> {
    Utc::now() + Duration::days(1)
}
