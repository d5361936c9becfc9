//! Session authentication: signup, login, logout, cookie lookup.

use std::sync::Arc;

use argon2::password_hash::{rand_core::OsRng as HashOsRng, PasswordHash, SaltString};
use argon2::{Argon2, PasswordHasher, PasswordVerifier};
use rand::RngCore;
use thiserror::Error;

use crate::application::repos::{CreateUserParams, RepoError, SessionsRepo, UsersRepo};
use crate::domain::entities::UserRecord;

pub const SESSION_COOKIE: &str = "rivista_session";

const MIN_PASSWORD_LEN: usize = 8;
const MAX_USERNAME_LEN: usize = 150;
const SESSION_TOKEN_BYTES: usize = 32;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("username is already taken")]
    UsernameTaken,
    #[error("invalid signup input: {0}")]
    InvalidInput(&'static str),
    /// Unknown username and wrong password collapse into one variant so
    /// the login form cannot be used to probe for accounts.
    #[error("bad credentials")]
    BadCredentials,
    #[error("password hashing failed: {0}")]
    Hashing(String),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

/// A freshly authenticated user together with the session token to set
/// as a cookie.
pub struct AuthenticatedSession {
    pub user: UserRecord,
    pub token: String,
}

pub struct AuthService {
    users: Arc<dyn UsersRepo>,
    sessions: Arc<dyn SessionsRepo>,
}

impl AuthService {
    pub fn new(users: Arc<dyn UsersRepo>, sessions: Arc<dyn SessionsRepo>) -> Self {
        Self { users, sessions }
    }

    pub async fn signup(
        &self,
        username: &str,
        password: &str,
    ) -> Result<AuthenticatedSession, AuthError> {
        let username = validate_username(username)?;
        if password.len() < MIN_PASSWORD_LEN {
            return Err(AuthError::InvalidInput(
                "Password must be at least 8 characters.",
            ));
        }
        let password_hash = hash_password(password)?;
        let user = self
            .users
            .create_user(CreateUserParams {
                username: username.to_owned(),
                password_hash,
            })
            .await
            .map_err(|err| match err {
                RepoError::Duplicate { .. } => AuthError::UsernameTaken,
                other => AuthError::Repo(other),
            })?;
        let token = self.open_session(&user).await?;
        Ok(AuthenticatedSession { user, token })
    }

    pub async fn login(
        &self,
        username: &str,
        password: &str,
    ) -> Result<AuthenticatedSession, AuthError> {
        let Some(user) = self.users.find_by_username(username.trim()).await? else {
            return Err(AuthError::BadCredentials);
        };
        if !verify_password(password, &user.password_hash)? {
            return Err(AuthError::BadCredentials);
        }
        let token = self.open_session(&user).await?;
        Ok(AuthenticatedSession { user, token })
    }

    pub async fn logout(&self, token: &str) -> Result<(), AuthError> {
        self.sessions.delete_session(token).await?;
        Ok(())
    }

    /// Resolve a session cookie to its user, if the session still exists.
    pub async fn user_for_token(&self, token: &str) -> Result<Option<UserRecord>, RepoError> {
        self.sessions.find_user_by_token(token).await
    }

    async fn open_session(&self, user: &UserRecord) -> Result<String, AuthError> {
        let token = generate_token();
        self.sessions.insert_session(&token, user.id).await?;
        Ok(token)
    }
}

fn validate_username(raw: &str) -> Result<&str, AuthError> {
    let username = raw.trim();
    if username.is_empty() {
        return Err(AuthError::InvalidInput("Username is required."));
    }
    if username.len() > MAX_USERNAME_LEN {
        return Err(AuthError::InvalidInput("Username is too long."));
    }
    let valid = username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if !valid {
        return Err(AuthError::InvalidInput(
            "Username may only contain letters, digits, `_` and `-`.",
        ));
    }
    Ok(username)
}

fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut HashOsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|err| AuthError::Hashing(err.to_string()))
}

fn verify_password(password: &str, stored_hash: &str) -> Result<bool, AuthError> {
    let parsed = PasswordHash::new(stored_hash).map_err(|err| AuthError::Hashing(err.to_string()))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

fn generate_token() -> String {
    let mut bytes = [0u8; SESSION_TOKEN_BYTES];
    rand::rngs::OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}
