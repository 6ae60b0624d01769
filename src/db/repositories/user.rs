use anyhow::{Context, Result};
use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};
use tokio::task;

use crate::entities::{user_groups, users};

/// Group whose members get elevated read/update rights.
pub const MODERATORS_GROUP: &str = "moderators";

/// User data returned from the repository (without the password hash)
#[derive(Debug, Clone)]
pub struct User {
    pub id: i32,
    pub email: String,
    pub token: String,
    pub phone: Option<String>,
    pub city: Option<String>,
    pub avatar: Option<String>,
    pub is_active: bool,
    pub last_login: Option<String>,
    pub created_at: String,
}

impl From<users::Model> for User {
    fn from(model: users::Model) -> Self {
        Self {
            id: model.id,
            email: model.email,
            token: model.token,
            phone: model.phone,
            city: model.city,
            avatar: model.avatar,
            is_active: model.is_active,
            last_login: model.last_login,
            created_at: model.created_at,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct UserUpdate {
    pub phone: Option<String>,
    pub city: Option<String>,
    pub avatar: Option<String>,
}

pub struct UserRepository {
    conn: DatabaseConnection,
}

impl UserRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    /// Create an active user with a hashed password and a fresh token.
    pub async fn create(
        &self,
        email: &str,
        password: &str,
        phone: Option<&str>,
        city: Option<&str>,
    ) -> Result<User> {
        let password = password.to_string();
        let password_hash = task::spawn_blocking(move || hash_password(&password))
            .await
            .context("Password hashing task panicked")??;

        let now = chrono::Utc::now().to_rfc3339();

        let active_model = users::ActiveModel {
            email: Set(email.to_string()),
            password_hash: Set(password_hash),
            token: Set(generate_token()),
            phone: Set(phone.map(str::to_string)),
            city: Set(city.map(str::to_string)),
            avatar: Set(None),
            is_active: Set(true),
            last_login: Set(None),
            created_at: Set(now),
            ..Default::default()
        };

        let model = active_model.insert(&self.conn).await?;
        Ok(User::from(model))
    }

    pub async fn get(&self, id: i32) -> Result<Option<User>> {
        let user = users::Entity::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query user by id")?;

        Ok(user.map(User::from))
    }

    pub async fn get_by_email(&self, email: &str) -> Result<Option<User>> {
        let user = users::Entity::find()
            .filter(users::Column::Email.eq(email))
            .one(&self.conn)
            .await
            .context("Failed to query user by email")?;

        Ok(user.map(User::from))
    }

    pub async fn list(&self) -> Result<Vec<User>> {
        let rows = users::Entity::find()
            .order_by_asc(users::Column::Id)
            .all(&self.conn)
            .await?;

        Ok(rows.into_iter().map(User::from).collect())
    }

    pub async fn update(&self, id: i32, changes: UserUpdate) -> Result<Option<User>> {
        let Some(user) = users::Entity::find_by_id(id).one(&self.conn).await? else {
            return Ok(None);
        };

        let mut active: users::ActiveModel = user.into();
        if let Some(phone) = changes.phone {
            active.phone = Set(Some(phone));
        }
        if let Some(city) = changes.city {
            active.city = Set(Some(city));
        }
        if let Some(avatar) = changes.avatar {
            active.avatar = Set(Some(avatar));
        }
        let model = active.update(&self.conn).await?;
        Ok(Some(User::from(model)))
    }

    /// Verify a password. Argon2 is CPU-intensive, so the check runs in a
    /// blocking task.
    pub async fn verify_password(&self, email: &str, password: &str) -> Result<bool> {
        let user = users::Entity::find()
            .filter(users::Column::Email.eq(email))
            .one(&self.conn)
            .await
            .context("Failed to query user for password verification")?;

        let Some(user) = user else {
            return Ok(false);
        };

        let password_hash = user.password_hash;
        let password = password.to_string();

        let is_valid = task::spawn_blocking(move || {
            let parsed_hash = PasswordHash::new(&password_hash)
                .map_err(|e| anyhow::anyhow!("Invalid password hash format: {e}"))?;

            let argon2 = Argon2::default();
            Ok::<bool, anyhow::Error>(
                argon2
                    .verify_password(password.as_bytes(), &parsed_hash)
                    .is_ok(),
            )
        })
        .await
        .context("Password verification task panicked")??;

        Ok(is_valid)
    }

    /// Verify a bearer token and return the associated active user.
    pub async fn verify_token(&self, token: &str) -> Result<Option<User>> {
        let user = users::Entity::find()
            .filter(users::Column::Token.eq(token))
            .filter(users::Column::IsActive.eq(true))
            .one(&self.conn)
            .await
            .context("Failed to query user by token")?;

        Ok(user.map(User::from))
    }

    /// Stamp last_login with the current time.
    pub async fn touch_last_login(&self, id: i32) -> Result<()> {
        let now = chrono::Utc::now().to_rfc3339();

        users::Entity::update_many()
            .col_expr(users::Column::LastLogin, Expr::value(now))
            .filter(users::Column::Id.eq(id))
            .exec(&self.conn)
            .await?;

        Ok(())
    }

    pub async fn is_moderator(&self, user_id: i32) -> Result<bool> {
        let count = user_groups::Entity::find()
            .filter(user_groups::Column::UserId.eq(user_id))
            .filter(user_groups::Column::Name.eq(MODERATORS_GROUP))
            .one(&self.conn)
            .await?;

        Ok(count.is_some())
    }

    pub async fn add_to_group(&self, user_id: i32, group: &str) -> Result<()> {
        let active_model = user_groups::ActiveModel {
            user_id: Set(user_id),
            name: Set(group.to_string()),
            ..Default::default()
        };

        user_groups::Entity::insert(active_model)
            .exec(&self.conn)
            .await?;

        Ok(())
    }

    /// Bulk-deactivate active users whose last login precedes the cutoff.
    /// Users that never logged in are left alone. Returns rows affected.
    pub async fn deactivate_stale(&self, cutoff: &str) -> Result<u64> {
        let result = users::Entity::update_many()
            .col_expr(users::Column::IsActive, Expr::value(false))
            .filter(users::Column::IsActive.eq(true))
            .filter(users::Column::LastLogin.is_not_null())
            .filter(users::Column::LastLogin.lt(cutoff))
            .exec(&self.conn)
            .await?;

        Ok(result.rows_affected)
    }
}

/// Hash a password using Argon2id with default params.
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    let hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("Failed to hash password: {e}"))?;

    Ok(hash.to_string())
}

/// Generate a random bearer token (64 character hex string)
#[must_use]
pub fn generate_token() -> String {
    use rand::Rng;

    let mut rng = rand::rng();
    let bytes: [u8; 32] = rng.random();

    bytes.iter().fold(String::with_capacity(64), |mut acc, b| {
        use std::fmt::Write;
        let _ = write!(acc, "{b:02x}");
        acc
    })
}
