//! `SeaORM` implementation of the `AuthService` trait.

use async_trait::async_trait;

use crate::db::{Store, User};
use crate::services::auth_service::{AuthError, AuthService, LoginResult};

pub struct SeaOrmAuthService {
    store: Store,
}

impl SeaOrmAuthService {
    #[must_use]
    pub const fn new(store: Store) -> Self {
        Self { store }
    }
}

#[async_trait]
impl AuthService for SeaOrmAuthService {
    async fn register(
        &self,
        email: &str,
        password: &str,
        phone: Option<&str>,
        city: Option<&str>,
    ) -> Result<User, AuthError> {
        if email.trim().is_empty() || !email.contains('@') {
            return Err(AuthError::Validation("Некорректный email".to_string()));
        }

        if password.len() < 8 {
            return Err(AuthError::Validation(
                "Пароль должен быть не короче 8 символов".to_string(),
            ));
        }

        if self.store.get_user_by_email(email).await?.is_some() {
            return Err(AuthError::Validation(
                "Пользователь с таким email уже существует".to_string(),
            ));
        }

        let user = self.store.create_user(email, password, phone, city).await?;
        Ok(user)
    }

    async fn login(&self, email: &str, password: &str) -> Result<LoginResult, AuthError> {
        let is_valid = self.store.verify_user_password(email, password).await?;

        if !is_valid {
            return Err(AuthError::InvalidCredentials);
        }

        let user = self
            .store
            .get_user_by_email(email)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        // Inactive accounts stay locked out even with a correct password.
        if !user.is_active {
            return Err(AuthError::InvalidCredentials);
        }

        self.store.touch_last_login(user.id).await?;

        Ok(LoginResult {
            id: user.id,
            email: user.email,
            token: user.token,
        })
    }

    async fn verify_token(&self, token: &str) -> Result<Option<User>, AuthError> {
        Ok(self.store.verify_token(token).await?)
    }
}
