use flashmob_core::{validate_max_distance, BoundsError, ErrorKind};
use log::info;
use thiserror::Error;

use crate::{
    require_admin, AccessError, CollabContext, DatabaseError, GeocodeError, PlatformStats,
    Preferences, SessionData, SessionFilter, UpdatedUser, UserData, UserId, DEFAULT_MAX_DISTANCE,
};

pub struct UserManager {
    context: CollabContext,
}

#[derive(Debug, Error)]
pub enum UserError {
    #[error(transparent)]
    Access(#[from] AccessError),
    #[error(transparent)]
    Bounds(#[from] BoundsError),
    #[error(transparent)]
    Geocode(#[from] GeocodeError),
    #[error("User not found")]
    NotFound,
    #[error("Admins cannot suspend themselves")]
    SuspendSelf,
    #[error(transparent)]
    Database(DatabaseError),
}

impl UserError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            UserError::Access(e) => e.kind(),
            UserError::Bounds(_) | UserError::Geocode(_) => ErrorKind::Validation,
            UserError::NotFound => ErrorKind::NotFound,
            UserError::SuspendSelf => ErrorKind::InvalidState,
            UserError::Database(e) => e.kind(),
        }
    }
}

impl From<DatabaseError> for UserError {
    fn from(value: DatabaseError) -> Self {
        match value {
            DatabaseError::NotFound { .. } => UserError::NotFound,
            e => UserError::Database(e),
        }
    }
}

/// A user along with the sessions they count as theirs
#[derive(Debug, Clone)]
pub struct Profile {
    pub user: UserData,
    pub active_sessions: Vec<SessionData>,
}

/// New study preferences. Omitted fields go back to their defaults.
#[derive(Debug, Default)]
pub struct PreferencesUpdate {
    pub subjects: Option<Vec<String>>,
    pub max_distance: Option<f64>,
    pub favorite_venues: Option<Vec<String>>,
}

impl UserManager {
    pub fn new(context: &CollabContext) -> Self {
        Self {
            context: context.clone(),
        }
    }

    pub async fn profile(&self, user: &UserData) -> Result<Profile, UserError> {
        let user = self.context.database.user_by_id(user.id).await?;
        let active_sessions = self
            .context
            .database
            .list_sessions(SessionFilter::memberships(user.id))
            .await?;

        Ok(Profile {
            user,
            active_sessions,
        })
    }

    pub async fn update_preferences(
        &self,
        user: &UserData,
        update: PreferencesUpdate,
    ) -> Result<UserData, UserError> {
        let max_distance = validate_max_distance(update.max_distance.unwrap_or(DEFAULT_MAX_DISTANCE))?;

        let preferences = Preferences {
            subjects: clean_list(update.subjects.unwrap_or_default()),
            max_distance,
            favorite_venues: clean_list(update.favorite_venues.unwrap_or_default()),
        };

        let user = self
            .context
            .database
            .update_user(UpdatedUser {
                id: user.id,
                preferences: Some(preferences),
                ..Default::default()
            })
            .await?;

        Ok(user)
    }

    /// Changes the address of a user, locating it again
    pub async fn update_address(&self, user: &UserData, address: &str) -> Result<UserData, UserError> {
        let address = address.trim().to_string();
        let coordinates = self.context.geocoder.geocode(&address).await?;

        let user = self
            .context
            .database
            .update_user(UpdatedUser {
                id: user.id,
                address: Some((address, coordinates)),
                ..Default::default()
            })
            .await?;

        Ok(user)
    }

    pub async fn list_users(&self, admin: &UserData) -> Result<Vec<UserData>, UserError> {
        require_admin(admin)?;

        Ok(self.context.database.list_users().await?)
    }

    pub async fn suspend_user(&self, admin: &UserData, user_id: UserId) -> Result<UserData, UserError> {
        require_admin(admin)?;

        if admin.id == user_id {
            return Err(UserError::SuspendSelf);
        }

        let user = self
            .context
            .database
            .update_user(UpdatedUser {
                id: user_id,
                suspended: Some(true),
                ..Default::default()
            })
            .await?;

        info!("User {} was suspended by admin {}", user.id, admin.id);
        Ok(user)
    }

    pub async fn platform_stats(&self, admin: &UserData) -> Result<PlatformStats, UserError> {
        require_admin(admin)?;

        Ok(self.context.database.platform_stats().await?)
    }
}

/// Trims entries and drops empty ones
fn clean_list(values: Vec<String>) -> Vec<String> {
    values
        .into_iter()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .collect()
}

#[cfg(test)]
mod test {
    use flashmob_core::{Config, Coordinates};

    use crate::{Collab, MemoryDatabase, NewAccount};

    use super::*;

    async fn register(collab: &Collab, email: &str, address: &str) -> UserData {
        collab
            .auth
            .register(NewAccount {
                email: email.to_string(),
                password: "password".to_string(),
                name: email.to_string(),
                address: address.to_string(),
                preferences: None,
            })
            .await
            .unwrap()
            .user
    }

    #[tokio::test]
    async fn test_update_preferences_resets_omitted_fields() {
        let collab = Collab::new(Config::default(), MemoryDatabase::new());
        let user = register(&collab, "ada@example.com", "Warrensburg, MO").await;

        let user = collab
            .users
            .update_preferences(
                &user,
                PreferencesUpdate {
                    subjects: Some(vec![" Calculus ".to_string(), "".to_string()]),
                    max_distance: Some(25.),
                    favorite_venues: Some(vec!["V001".to_string()]),
                },
            )
            .await
            .unwrap();

        assert_eq!(user.preferences.subjects, vec!["Calculus"]);
        assert_eq!(user.preferences.max_distance, 25.);

        let user = collab
            .users
            .update_preferences(&user, PreferencesUpdate::default())
            .await
            .unwrap();

        assert_eq!(user.preferences, Preferences::default());
    }

    #[tokio::test]
    async fn test_update_preferences_rejects_bad_distance() {
        let collab = Collab::new(Config::default(), MemoryDatabase::new());
        let user = register(&collab, "ada@example.com", "Warrensburg, MO").await;

        for distance in [0., -3., 501.] {
            let error = collab
                .users
                .update_preferences(
                    &user,
                    PreferencesUpdate {
                        max_distance: Some(distance),
                        ..Default::default()
                    },
                )
                .await
                .unwrap_err();

            assert_eq!(error.kind(), ErrorKind::Validation, "{distance}");
        }
    }

    #[tokio::test]
    async fn test_update_address_relocates() {
        let collab = Collab::new(Config::default(), MemoryDatabase::new());
        let user = register(&collab, "ada@example.com", "Warrensburg, MO").await;

        let user = collab
            .users
            .update_address(&user, "1 Main St, Denver, CO")
            .await
            .unwrap();

        assert_eq!(user.address, "1 Main St, Denver, CO");
        assert_eq!(user.coordinates, Coordinates::new(39.7392, -104.9903));
    }

    #[tokio::test]
    async fn test_admin_operations_require_admin() {
        let collab = Collab::new(Config::default(), MemoryDatabase::new());
        let user = register(&collab, "ada@example.com", "Warrensburg, MO").await;
        let admin = collab
            .auth
            .bootstrap_admin("admin@example.com", "password", "Admin")
            .await
            .unwrap();

        let error = collab.users.list_users(&user).await.unwrap_err();
        assert_eq!(error.kind(), ErrorKind::Forbidden);

        let error = collab.users.suspend_user(&user, admin.id).await.unwrap_err();
        assert_eq!(error.kind(), ErrorKind::Forbidden);

        assert_eq!(collab.users.list_users(&admin).await.unwrap().len(), 2);

        let stats = collab.users.platform_stats(&admin).await.unwrap();
        assert_eq!(stats.total_users, 2);
        assert_eq!(stats.total_sessions, 0);
        assert!(stats.total_venues > 0);

        let error = collab.users.suspend_user(&admin, 999).await.unwrap_err();
        assert_eq!(error.kind(), ErrorKind::NotFound);

        let error = collab.users.suspend_user(&admin, admin.id).await.unwrap_err();
        assert_eq!(error.kind(), ErrorKind::InvalidState);
    }
}
