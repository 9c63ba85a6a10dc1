use flashmob_core::{message_body, BoundsError, ErrorKind};
use log::debug;
use thiserror::Error;

use crate::{
    sessions::visible_session, CollabContext, DatabaseError, MessageData, NewMessage, SessionError,
    UserData,
};

/// Chat messages scoped to a session, readable and writable by its participants
pub struct MessageLog {
    context: CollabContext,
}

#[derive(Debug, Error)]
pub enum MessageError {
    #[error("Session does not exist")]
    NotFound,
    #[error("Only participants of the session can read or post messages")]
    NotParticipant,
    #[error(transparent)]
    Bounds(#[from] BoundsError),
    #[error(transparent)]
    Database(DatabaseError),
}

impl MessageError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            MessageError::NotFound => ErrorKind::NotFound,
            MessageError::NotParticipant => ErrorKind::NotParticipant,
            MessageError::Bounds(_) => ErrorKind::Validation,
            MessageError::Database(e) => e.kind(),
        }
    }
}

impl From<DatabaseError> for MessageError {
    fn from(value: DatabaseError) -> Self {
        match value {
            DatabaseError::NotFound {
                resource: "session",
                ..
            } => MessageError::NotFound,
            e => MessageError::Database(e),
        }
    }
}

impl From<SessionError> for MessageError {
    fn from(value: SessionError) -> Self {
        match value {
            SessionError::NotFound => MessageError::NotFound,
            SessionError::Database(e) => e.into(),
            // visible_session only fails with the above
            e => MessageError::Database(DatabaseError::Internal(Box::new(e))),
        }
    }
}

impl MessageLog {
    pub fn new(context: &CollabContext) -> Self {
        Self {
            context: context.clone(),
        }
    }

    /// Appends a message to the session, with the body trimmed
    pub async fn post(&self, user: &UserData, session_id: &str, body: &str) -> Result<MessageData, MessageError> {
        // Held until the message is stored, so a removal can't slip in between
        let _guard = self.context.locks.lock(session_id).await;
        self.require_participant(user, session_id).await?;
        let body = message_body(body)?;

        let message = self
            .context
            .database
            .create_message(NewMessage {
                session_id: session_id.to_string(),
                author_id: user.id,
                body: body.to_string(),
            })
            .await?;

        debug!("User {} posted {} in session {}", user.id, message.id, session_id);
        Ok(message)
    }

    /// Lists the messages of a session, oldest first
    pub async fn list(&self, user: &UserData, session_id: &str) -> Result<Vec<MessageData>, MessageError> {
        self.require_participant(user, session_id).await?;
        Ok(self.context.database.list_messages(session_id).await?)
    }

    async fn require_participant(&self, user: &UserData, session_id: &str) -> Result<(), MessageError> {
        let session = visible_session(&self.context, user, session_id).await?;

        if session.has_participant(user.id) {
            Ok(())
        } else {
            Err(MessageError::NotParticipant)
        }
    }
}
