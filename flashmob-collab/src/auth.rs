use argon2::{
    password_hash::{Encoding, SaltString},
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
};
use chrono::Utc;
use flashmob_core::{validate_max_distance, BoundsError, ErrorKind};
use log::info;
use rand::rngs::OsRng;
use thiserror::Error;

use crate::{
    util::random_string, CollabContext, DatabaseError, GeocodeError, NewToken, NewUser,
    Preferences, TokenData, UpdatedUser, UserData, DEFAULT_LOCATION,
};

/// The shortest password accepted at registration
pub const MIN_PASSWORD_LENGTH: usize = 6;
const TOKEN_LENGTH: usize = 32;

pub struct Auth {
    context: CollabContext,
    argon: Argon2<'static>,
}

#[derive(Debug, Error)]
pub enum AuthError {
    /// Email or password is incorrect
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("This account has been suspended")]
    Suspended,
    /// The token is missing, unknown, or expired
    #[error("Authentication required")]
    Unauthorized,
    #[error("Email is already registered")]
    EmailTaken,
    #[error("Password must be at least 6 characters")]
    PasswordTooShort,
    #[error("{0} cannot be empty")]
    MissingField(&'static str),
    #[error(transparent)]
    Bounds(#[from] BoundsError),
    #[error(transparent)]
    Geocode(#[from] GeocodeError),
    /// Something else went wrong with the database
    #[error(transparent)]
    Db(DatabaseError),
    #[error("HashError: {0}")]
    HashError(String),
}

impl AuthError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AuthError::InvalidCredentials => ErrorKind::InvalidCredentials,
            AuthError::Suspended => ErrorKind::Forbidden,
            AuthError::Unauthorized => ErrorKind::Unauthorized,
            AuthError::EmailTaken => ErrorKind::Conflict,
            AuthError::PasswordTooShort
            | AuthError::MissingField(_)
            | AuthError::Bounds(_)
            | AuthError::Geocode(_) => ErrorKind::Validation,
            AuthError::Db(e) => e.kind(),
            AuthError::HashError(_) => ErrorKind::Internal,
        }
    }
}

#[derive(Debug)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

#[derive(Debug)]
pub struct NewAccount {
    pub email: String,
    pub password: String,
    pub name: String,
    pub address: String,
    pub preferences: Option<Preferences>,
}

impl Auth {
    pub fn new(context: &CollabContext) -> Self {
        Self {
            context: context.clone(),
            argon: Argon2::default(),
        }
    }

    /// Registers a new user and logs them in
    pub async fn register(&self, account: NewAccount) -> Result<TokenData, AuthError> {
        let email = normalize_email(&account.email);
        let name = account.name.trim().to_string();

        if email.is_empty() {
            return Err(AuthError::MissingField("Email"));
        }

        if name.is_empty() {
            return Err(AuthError::MissingField("Name"));
        }

        if account.password.chars().count() < MIN_PASSWORD_LENGTH {
            return Err(AuthError::PasswordTooShort);
        }

        let preferences = account.preferences.unwrap_or_default();
        validate_max_distance(preferences.max_distance)?;

        let address = account.address.trim().to_string();
        let coordinates = self.context.geocoder.geocode(&address).await?;

        let user = self
            .context
            .database
            .create_user(NewUser {
                email,
                password: self.hash(&account.password)?,
                name,
                address,
                coordinates,
                is_admin: false,
                preferences,
            })
            .await
            .map_err(|e| match e {
                DatabaseError::Conflict { .. } => AuthError::EmailTaken,
                e => AuthError::Db(e),
            })?;

        info!("Registered user {} ({})", user.id, user.email);

        self.issue_token(&user).await
    }

    /// Logs in a user, returning a new token
    pub async fn login(&self, credentials: Credentials) -> Result<TokenData, AuthError> {
        self.clear_expired().await?;

        let user = self
            .context
            .database
            .user_by_email(&normalize_email(&credentials.email))
            .await
            .map_err(|e| match e {
                DatabaseError::NotFound { .. } => AuthError::InvalidCredentials,
                e => AuthError::Db(e),
            })?;

        self.verify_password(&user, &credentials.password)?;

        if user.suspended {
            return Err(AuthError::Suspended);
        }

        self.issue_token(&user).await
    }

    /// Deletes the token, if it exists
    pub async fn logout(&self, token: &str) -> Result<(), AuthError> {
        self.context
            .database
            .delete_token(token)
            .await
            .map_err(|e| match e {
                DatabaseError::NotFound { .. } => AuthError::Unauthorized,
                e => AuthError::Db(e),
            })
    }

    /// Returns the user a token belongs to
    pub async fn verify(&self, token: &str) -> Result<UserData, AuthError> {
        let token = self
            .context
            .database
            .token(token)
            .await
            .map_err(|e| match e {
                DatabaseError::NotFound { .. } => AuthError::Unauthorized,
                e => AuthError::Db(e),
            })?;

        if token.is_expired(Utc::now()) {
            return Err(AuthError::Unauthorized);
        }

        if token.user.suspended {
            return Err(AuthError::Suspended);
        }

        Ok(token.user)
    }

    /// Creates a platform admin, or promotes an existing user to one with the given password
    pub async fn bootstrap_admin(
        &self,
        email: &str,
        password: &str,
        name: &str,
    ) -> Result<UserData, AuthError> {
        let email = normalize_email(email);

        if password.chars().count() < MIN_PASSWORD_LENGTH {
            return Err(AuthError::PasswordTooShort);
        }

        let password = self.hash(password)?;
        let existing = self.context.database.user_by_email(&email).await;

        let admin = match existing {
            Ok(user) => {
                info!("Promoting user {} ({}) to admin", user.id, user.email);

                self.context
                    .database
                    .update_user(UpdatedUser {
                        id: user.id,
                        password: Some(password),
                        is_admin: Some(true),
                        suspended: Some(false),
                        ..Default::default()
                    })
                    .await
                    .map_err(AuthError::Db)?
            }
            Err(DatabaseError::NotFound { .. }) => {
                let user = self
                    .context
                    .database
                    .create_user(NewUser {
                        email,
                        password,
                        name: name.trim().to_string(),
                        address: String::new(),
                        coordinates: DEFAULT_LOCATION,
                        is_admin: true,
                        preferences: Preferences::default(),
                    })
                    .await
                    .map_err(AuthError::Db)?;

                info!("Created admin {} ({})", user.id, user.email);
                user
            }
            Err(e) => return Err(AuthError::Db(e)),
        };

        Ok(admin)
    }

    async fn issue_token(&self, user: &UserData) -> Result<TokenData, AuthError> {
        let expires_at = Utc::now() + self.context.config.token_lifetime();

        self.context
            .database
            .create_token(NewToken {
                token: random_string(TOKEN_LENGTH),
                user_id: user.id,
                expires_at,
            })
            .await
            .map_err(AuthError::Db)
    }

    fn hash(&self, password: &str) -> Result<String, AuthError> {
        let salt = SaltString::generate(&mut OsRng);

        self.argon
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| AuthError::HashError(e.to_string()))
    }

    fn verify_password(&self, user: &UserData, password: &str) -> Result<(), AuthError> {
        let stored_password = PasswordHash::parse(&user.password, Encoding::default())
            .map_err(|e| AuthError::HashError(e.to_string()))?;

        self.argon
            .verify_password(password.as_bytes(), &stored_password)
            .map_err(|_| AuthError::InvalidCredentials)
    }

    async fn clear_expired(&self) -> Result<(), AuthError> {
        self.context
            .database
            .clear_expired_tokens()
            .await
            .map_err(AuthError::Db)
    }
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
