use std::{fmt::Display, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The lifecycle of a study session.
///
/// A session starts out waiting for a platform admin. From there it either
/// becomes active or is rejected, and an active session can be cancelled by its host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    PendingAdminApproval,
    Active,
    InProgress,
    Completed,
    Cancelled,
    Rejected,
}

/// An action that moves a session from one status to another
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionAction {
    Approve,
    Reject,
    Cancel,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Cannot {action} a session that is {from}")]
pub struct TransitionError {
    pub from: SessionStatus,
    pub action: SessionAction,
}

impl SessionStatus {
    pub const ALL: [SessionStatus; 6] = [
        Self::PendingAdminApproval,
        Self::Active,
        Self::InProgress,
        Self::Completed,
        Self::Cancelled,
        Self::Rejected,
    ];

    /// The statuses a non-admin may see in bulk listings
    pub const PUBLIC: [SessionStatus; 3] = [Self::Active, Self::InProgress, Self::Completed];

    /// The statuses in which participants still count the session as one of theirs
    pub const HOLDING_MEMBERSHIP: [SessionStatus; 4] = [
        Self::PendingAdminApproval,
        Self::Active,
        Self::InProgress,
        Self::Completed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PendingAdminApproval => "pending_admin_approval",
            Self::Active => "active",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
            Self::Rejected => "rejected",
        }
    }

    /// No further transitions are possible from a terminal status
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled | Self::Rejected)
    }

    /// Applies an action, returning the resulting status
    pub fn apply(self, action: SessionAction) -> Result<SessionStatus, TransitionError> {
        let next = match (self, action) {
            (Self::PendingAdminApproval, SessionAction::Approve) => Self::Active,
            (Self::PendingAdminApproval, SessionAction::Reject) => Self::Rejected,
            (from, SessionAction::Cancel) if !from.is_terminal() => Self::Cancelled,
            (from, action) => return Err(TransitionError { from, action }),
        };

        Ok(next)
    }
}

impl Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Display for SessionAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let verb = match self {
            Self::Approve => "approve",
            Self::Reject => "reject",
            Self::Cancel => "cancel",
        };

        f.write_str(verb)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Unknown {kind}: {value}")]
pub struct ParseStatusError {
    pub kind: &'static str,
    pub value: String,
}

impl FromStr for SessionStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| ParseStatusError {
                kind: "session status",
                value: s.to_string(),
            })
    }
}

/// The state of a request to join a session. Only pending requests can be reviewed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JoinRequestStatus {
    Pending,
    Approved,
    Rejected,
}

impl JoinRequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending)
    }
}

impl Display for JoinRequestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JoinRequestStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            other => Err(ParseStatusError {
                kind: "join request status",
                value: other.to_string(),
            }),
        }
    }
}

/// The role a user has within a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParticipantRole {
    Host,
    Participant,
}

impl ParticipantRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Host => "host",
            Self::Participant => "participant",
        }
    }
}

impl Display for ParticipantRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ParticipantRole {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "host" => Ok(Self::Host),
            "participant" => Ok(Self::Participant),
            other => Err(ParseStatusError {
                kind: "participant role",
                value: other.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_admin_review_transitions() {
        let pending = SessionStatus::PendingAdminApproval;

        assert_eq!(pending.apply(SessionAction::Approve), Ok(SessionStatus::Active));
        assert_eq!(pending.apply(SessionAction::Reject), Ok(SessionStatus::Rejected));

        // A review can only happen once
        for status in [SessionStatus::Active, SessionStatus::Rejected] {
            assert_eq!(
                status.apply(SessionAction::Approve),
                Err(TransitionError {
                    from: status,
                    action: SessionAction::Approve
                })
            );
            assert!(status.apply(SessionAction::Reject).is_err());
        }
    }

    #[test]
    fn test_cancel_only_from_non_terminal() {
        for status in SessionStatus::ALL {
            let result = status.apply(SessionAction::Cancel);

            if status.is_terminal() {
                assert!(result.is_err(), "{status} should not be cancellable");
            } else {
                assert_eq!(result, Ok(SessionStatus::Cancelled));
            }
        }
    }

    #[test]
    fn test_status_round_trips_through_str() {
        for status in SessionStatus::ALL {
            assert_eq!(status.as_str().parse::<SessionStatus>(), Ok(status));
        }

        assert!("archived".parse::<SessionStatus>().is_err());
        assert_eq!("approved".parse(), Ok(JoinRequestStatus::Approved));
        assert_eq!("host".parse(), Ok(ParticipantRole::Host));
    }

    #[test]
    fn test_transition_error_message() {
        let error = SessionStatus::Rejected
            .apply(SessionAction::Approve)
            .unwrap_err();

        assert_eq!(error.to_string(), "Cannot approve a session that is rejected");
    }

    #[test]
    fn test_visibility_sets() {
        let public = SessionStatus::PUBLIC;
        let holding = SessionStatus::HOLDING_MEMBERSHIP;

        assert!(!public.contains(&SessionStatus::PendingAdminApproval));
        assert!(holding.contains(&SessionStatus::PendingAdminApproval));
        assert!(!holding.contains(&SessionStatus::Rejected));
        assert!(!holding.contains(&SessionStatus::Cancelled));
        assert!(public.contains(&SessionStatus::Completed));
    }
}
