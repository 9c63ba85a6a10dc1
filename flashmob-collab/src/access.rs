use flashmob_core::ErrorKind;
use thiserror::Error;

use crate::{SessionData, UserData};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AccessError {
    #[error("Only platform admins can do this")]
    AdminOnly,
    #[error("Only the host of the session can do this")]
    HostOnly,
}

impl AccessError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::Forbidden
    }
}

pub fn require_admin(user: &UserData) -> Result<(), AccessError> {
    if user.is_admin {
        Ok(())
    } else {
        Err(AccessError::AdminOnly)
    }
}

/// Platform admins are not hosts of sessions they didn't create
pub fn require_host(session: &SessionData, user: &UserData) -> Result<(), AccessError> {
    if session.is_host(user.id) {
        Ok(())
    } else {
        Err(AccessError::HostOnly)
    }
}
