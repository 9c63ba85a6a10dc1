use chrono::Utc;
use flashmob_core::{JoinRequestStatus, SessionStatus};
use log::info;

use crate::{
    require_host, CollabContext, JoinRequestData, JoinRequestFilter, JoinRequestReview,
    NewJoinRequest, NewParticipant, SessionData, SessionError, UserData, UserSummary,
};

use super::visible_session;

/// Requests to join sessions, reviewed by the session host
pub struct JoinRequests {
    context: CollabContext,
}

/// A pending request along with who sent it
#[derive(Debug, Clone)]
pub struct PendingRequest {
    pub request: JoinRequestData,
    pub requester: UserSummary,
}

impl JoinRequests {
    pub fn new(context: &CollabContext) -> Self {
        Self {
            context: context.clone(),
        }
    }

    /// Asks to join an active session
    pub async fn request(&self, user: &UserData, session_id: &str) -> Result<JoinRequestData, SessionError> {
        let _guard = self.context.locks.lock(session_id).await;
        let session = visible_session(&self.context, user, session_id).await?;

        if session.status != SessionStatus::Active {
            return Err(SessionError::NotActive);
        }

        if session.is_full() {
            return Err(SessionError::SessionFull);
        }

        if session.has_participant(user.id) {
            return Err(SessionError::AlreadyMember);
        }

        let request = self
            .context
            .database
            .create_join_request(NewJoinRequest {
                session_id: session.id,
                user_id: user.id,
            })
            .await?;

        info!(
            "User {} requested to join session {} ({})",
            user.id, request.session_id, request.id
        );

        Ok(request)
    }

    /// Approves a pending request, adding the requester to the session if there's still room
    pub async fn approve(
        &self,
        host: &UserData,
        session_id: &str,
        request_id: &str,
    ) -> Result<JoinRequestData, SessionError> {
        let _guard = self.context.locks.lock(session_id).await;
        let (session, request) = self.reviewable(host, session_id, request_id).await?;

        if session.status != SessionStatus::Active {
            return Err(SessionError::NotActive);
        }

        // Capacity is checked again by the store, in the same unit as the insert
        if session.is_full() {
            return Err(SessionError::SessionFull);
        }

        self.context
            .database
            .add_participant(NewParticipant {
                session_id: session.id.clone(),
                user_id: request.user_id,
                approves: Some(JoinRequestReview {
                    request_id: request.id.clone(),
                    status: JoinRequestStatus::Approved,
                    reviewed_by: host.id,
                    reviewed_at: Utc::now(),
                }),
            })
            .await?;

        info!(
            "User {} joined session {} through {}",
            request.user_id, session.id, request.id
        );

        Ok(self.context.database.join_request_by_id(&request.id).await?)
    }

    pub async fn reject(
        &self,
        host: &UserData,
        session_id: &str,
        request_id: &str,
    ) -> Result<JoinRequestData, SessionError> {
        let _guard = self.context.locks.lock(session_id).await;
        let (session, request) = self.reviewable(host, session_id, request_id).await?;

        let request = self
            .context
            .database
            .review_join_request(JoinRequestReview {
                request_id: request.id,
                status: JoinRequestStatus::Rejected,
                reviewed_by: host.id,
                reviewed_at: Utc::now(),
            })
            .await?;

        info!("Request {} to join session {} was rejected", request.id, session.id);
        Ok(request)
    }

    /// Lists the requests awaiting the host, oldest first
    pub async fn list_pending(
        &self,
        host: &UserData,
        session_id: &str,
    ) -> Result<Vec<PendingRequest>, SessionError> {
        let session = visible_session(&self.context, host, session_id).await?;
        require_host(&session, host)?;

        let requests = self
            .context
            .database
            .list_join_requests(JoinRequestFilter {
                session_id: session.id,
                user_id: None,
                status: Some(JoinRequestStatus::Pending),
            })
            .await?;

        let mut pending = Vec::with_capacity(requests.len());

        for request in requests {
            let requester = self.context.database.user_by_id(request.user_id).await?;

            pending.push(PendingRequest {
                requester: requester.summary(),
                request,
            });
        }

        Ok(pending)
    }

    /// Returns the latest request of the user for the session, if any
    pub async fn my_request(
        &self,
        user: &UserData,
        session_id: &str,
    ) -> Result<Option<JoinRequestData>, SessionError> {
        let session = visible_session(&self.context, user, session_id).await?;

        let requests = self
            .context
            .database
            .list_join_requests(JoinRequestFilter {
                session_id: session.id,
                user_id: Some(user.id),
                status: None,
            })
            .await?;

        Ok(requests.into_iter().last())
    }

    /// Loads a session and one of its pending requests for review by the host
    async fn reviewable(
        &self,
        host: &UserData,
        session_id: &str,
        request_id: &str,
    ) -> Result<(SessionData, JoinRequestData), SessionError> {
        let session = visible_session(&self.context, host, session_id).await?;
        require_host(&session, host)?;

        let request = self.context.database.join_request_by_id(request_id).await?;

        if request.session_id != session.id {
            return Err(SessionError::RequestNotFound);
        }

        if !request.status.is_pending() {
            return Err(SessionError::AlreadyProcessed);
        }

        Ok((session, request))
    }
}

#[cfg(test)]
mod test {
    use flashmob_core::ErrorKind;

    use crate::testing::{tomorrow, Harness};

    use super::*;

    #[tokio::test]
    async fn test_request_and_approve() {
        let harness = Harness::new().await;
        let requests = &harness.collab.requests;
        let user = harness.user("ada@example.com").await;
        let session = harness.active_session(tomorrow(), 4).await;

        let request = requests.request(&user, &session.id).await.unwrap();
        assert_eq!(request.status, JoinRequestStatus::Pending);
        assert!(request.id.starts_with("JR"));

        let pending = requests.list_pending(&harness.host, &session.id).await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].requester.email, "ada@example.com");

        let mine = requests.my_request(&user, &session.id).await.unwrap();
        assert_eq!(mine.map(|r| r.id), Some(request.id.clone()));

        let approved = requests
            .approve(&harness.host, &session.id, &request.id)
            .await
            .unwrap();
        assert_eq!(approved.status, JoinRequestStatus::Approved);
        assert_eq!(approved.reviewed_by, Some(harness.host.id));
        assert!(approved.reviewed_at.is_some());

        let session = harness.collab.sessions.get(&user, &session.id).await.unwrap();
        assert!(session.has_participant(user.id));

        let mine = harness.collab.sessions.list_mine(&user).await.unwrap();
        assert_eq!(mine.len(), 1);

        let error = requests.request(&user, &session.id).await.unwrap_err();
        assert!(matches!(error, SessionError::AlreadyMember));
    }

    #[tokio::test]
    async fn test_request_checks() {
        let harness = Harness::new().await;
        let requests = &harness.collab.requests;
        let user = harness.user("ada@example.com").await;

        let pending = harness.pending_session(tomorrow(), 4).await;
        let error = requests.request(&user, &pending.id).await.unwrap_err();
        assert_eq!(error.kind(), ErrorKind::NotFound, "hidden while under review");

        let error = requests.request(&harness.admin, &pending.id).await.unwrap_err();
        assert!(matches!(error, SessionError::NotActive));

        let session = harness.active_session(tomorrow(), 4).await;
        requests.request(&user, &session.id).await.unwrap();

        let error = requests.request(&user, &session.id).await.unwrap_err();
        assert!(matches!(error, SessionError::DuplicatePending));
        assert_eq!(error.kind(), ErrorKind::Conflict);
    }

    #[tokio::test]
    async fn test_full_session_refuses_requests() {
        let harness = Harness::new().await;
        let session = harness.active_session(tomorrow(), 3).await;

        for email in ["b@example.com", "c@example.com"] {
            let user = harness.user(email).await;
            harness.join(&user, &session.id).await;
        }

        let late = harness.user("d@example.com").await;
        let error = harness
            .collab
            .requests
            .request(&late, &session.id)
            .await
            .unwrap_err();

        assert!(matches!(error, SessionError::SessionFull));
    }

    #[tokio::test]
    async fn test_last_slot_goes_to_one_request() {
        let harness = Harness::new().await;
        let requests = &harness.collab.requests;
        let session = harness.active_session(tomorrow(), 3).await;

        let member = harness.user("b@example.com").await;
        harness.join(&member, &session.id).await;

        // Two pending requests for the one remaining slot
        let winner = harness.user("c@example.com").await;
        let loser = harness.user("d@example.com").await;
        let first = requests.request(&winner, &session.id).await.unwrap();
        let second = requests.request(&loser, &session.id).await.unwrap();

        requests
            .approve(&harness.host, &session.id, &first.id)
            .await
            .unwrap();

        let error = requests
            .approve(&harness.host, &session.id, &second.id)
            .await
            .unwrap_err();
        assert!(matches!(error, SessionError::SessionFull));

        // Nothing changed for the losing request
        let second = requests
            .my_request(&loser, &session.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(second.status, JoinRequestStatus::Pending);

        let session = harness.collab.sessions.get(&harness.host, &session.id).await.unwrap();
        assert_eq!(session.participants.len(), 3);
    }

    #[tokio::test]
    async fn test_concurrent_approvals_respect_capacity() {
        let harness = Harness::new().await;
        let requests = &harness.collab.requests;
        let session = harness.active_session(tomorrow(), 3).await;

        let member = harness.user("b@example.com").await;
        harness.join(&member, &session.id).await;

        let first = harness.user("c@example.com").await;
        let second = harness.user("d@example.com").await;
        let first = requests.request(&first, &session.id).await.unwrap();
        let second = requests.request(&second, &session.id).await.unwrap();

        let (a, b) = tokio::join!(
            requests.approve(&harness.host, &session.id, &first.id),
            requests.approve(&harness.host, &session.id, &second.id),
        );

        assert!(a.is_ok() != b.is_ok(), "exactly one approval should succeed");

        let loser = a.err().or(b.err()).unwrap();
        assert_eq!(loser.kind(), ErrorKind::Conflict);

        let session = harness.collab.sessions.get(&harness.host, &session.id).await.unwrap();
        assert_eq!(session.participants.len(), 3);
    }

    #[tokio::test]
    async fn test_review_checks() {
        let harness = Harness::new().await;
        let requests = &harness.collab.requests;
        let user = harness.user("ada@example.com").await;

        let session = harness.active_session(tomorrow(), 4).await;
        let other = harness.active_session(tomorrow(), 4).await;
        let request = requests.request(&user, &session.id).await.unwrap();

        let error = requests
            .approve(&user, &session.id, &request.id)
            .await
            .unwrap_err();
        assert_eq!(error.kind(), ErrorKind::Forbidden);

        // The request belongs to another session
        let error = requests
            .approve(&harness.host, &other.id, &request.id)
            .await
            .unwrap_err();
        assert!(matches!(error, SessionError::RequestNotFound));

        let rejected = requests
            .reject(&harness.host, &session.id, &request.id)
            .await
            .unwrap();
        assert_eq!(rejected.status, JoinRequestStatus::Rejected);

        let error = requests
            .approve(&harness.host, &session.id, &request.id)
            .await
            .unwrap_err();
        assert!(matches!(error, SessionError::AlreadyProcessed));
        assert_eq!(error.kind(), ErrorKind::InvalidState);

        // A new request can be made after a rejection
        let retry = requests.request(&user, &session.id).await.unwrap();
        assert_ne!(retry.id, request.id);
        assert!(requests
            .list_pending(&harness.host, &session.id)
            .await
            .unwrap()
            .iter()
            .all(|p| p.request.id == retry.id));
    }

    #[tokio::test]
    async fn test_approve_requires_active_session() {
        let harness = Harness::new().await;
        let requests = &harness.collab.requests;
        let user = harness.user("ada@example.com").await;

        let session = harness.active_session(tomorrow(), 4).await;
        let request = requests.request(&user, &session.id).await.unwrap();

        harness
            .collab
            .sessions
            .cancel(&harness.host, &session.id)
            .await
            .unwrap();

        let error = requests
            .approve(&harness.host, &session.id, &request.id)
            .await
            .unwrap_err();
        assert!(matches!(error, SessionError::NotActive));
    }
}
