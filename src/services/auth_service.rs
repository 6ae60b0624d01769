//! Domain service for registration and login.

use serde::Serialize;
use thiserror::Error;

use crate::db::User;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("User not found")]
    UserNotFound,

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<sea_orm::DbErr> for AuthError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<anyhow::Error> for AuthError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

/// Login result: the bearer token plus basic profile fields.
#[derive(Debug, Clone, Serialize)]
pub struct LoginResult {
    pub id: i32,
    pub email: String,
    pub token: String,
}

#[async_trait::async_trait]
pub trait AuthService: Send + Sync {
    /// Create an account with a hashed password and a fresh token.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Validation`] if the email is taken or the
    /// password too short.
    async fn register(
        &self,
        email: &str,
        password: &str,
        phone: Option<&str>,
        city: Option<&str>,
    ) -> Result<User, AuthError>;

    /// Verify credentials, stamp `last_login` and return the token.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidCredentials`] if login fails.
    async fn login(&self, email: &str, password: &str) -> Result<LoginResult, AuthError>;

    /// Resolve a bearer token to its active user.
    async fn verify_token(&self, token: &str) -> Result<Option<User>, AuthError>;
}
