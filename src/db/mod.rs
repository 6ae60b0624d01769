use anyhow::Result;
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, Statement};
use std::path::Path;
use std::time::Duration;
use tracing::info;

use crate::entities::{courses, lessons, payments, subscriptions};

pub mod migrator;
pub mod repositories;

pub use repositories::course::CourseUpdate;
pub use repositories::lesson::LessonUpdate;
pub use repositories::payment::PaymentFilter;
pub use repositories::user::{MODERATORS_GROUP, User, UserUpdate};

#[derive(Clone)]
pub struct Store {
    pub conn: DatabaseConnection,
}

impl Store {
    pub async fn new(db_url: &str) -> Result<Self> {
        Self::with_pool_options(db_url, 5, 1).await
    }

    pub async fn with_pool_options(
        db_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self> {
        use sea_orm_migration::MigratorTrait;

        let path_str = db_url.trim_start_matches("sqlite:");
        if !path_str.starts_with(":memory:") && !db_url.contains("mode=memory") {
            if let Some(parent) = Path::new(path_str).parent() {
                tokio::fs::create_dir_all(parent).await.ok();
            }
            if !Path::new(path_str).exists() {
                std::fs::File::create(path_str)?;
            }
        }

        let mut opt = ConnectOptions::new(db_url.to_string());
        opt.max_connections(max_connections)
            .min_connections(min_connections)
            .connect_timeout(Duration::from_secs(10))
            .acquire_timeout(Duration::from_secs(10))
            .idle_timeout(Duration::from_secs(300))
            .max_lifetime(Duration::from_secs(600))
            .sqlx_logging(false);

        let conn = Database::connect(opt).await?;

        migrator::Migrator::up(&conn, None).await?;

        info!(
            "Database connected & migrations applied (pool: {}-{})",
            min_connections, max_connections
        );

        Ok(Self { conn })
    }

    pub async fn ping(&self) -> Result<()> {
        let backend = self.conn.get_database_backend();
        self.conn
            .query_one(Statement::from_string(backend, "SELECT 1".to_string()))
            .await?;
        Ok(())
    }

    fn course_repo(&self) -> repositories::course::CourseRepository {
        repositories::course::CourseRepository::new(self.conn.clone())
    }

    fn lesson_repo(&self) -> repositories::lesson::LessonRepository {
        repositories::lesson::LessonRepository::new(self.conn.clone())
    }

    fn subscription_repo(&self) -> repositories::subscription::SubscriptionRepository {
        repositories::subscription::SubscriptionRepository::new(self.conn.clone())
    }

    fn payment_repo(&self) -> repositories::payment::PaymentRepository {
        repositories::payment::PaymentRepository::new(self.conn.clone())
    }

    #[must_use]
    pub fn user_repo(&self) -> repositories::user::UserRepository {
        repositories::user::UserRepository::new(self.conn.clone())
    }

    // ========== Courses ==========

    pub async fn add_course(
        &self,
        name: &str,
        description: Option<&str>,
        picture: Option<&str>,
        owner_id: i32,
    ) -> Result<courses::Model> {
        self.course_repo()
            .create(name, description, picture, owner_id)
            .await
    }

    pub async fn get_course(&self, id: i32) -> Result<Option<courses::Model>> {
        self.course_repo().get(id).await
    }

    pub async fn list_courses(
        &self,
        viewer_id: i32,
        is_moderator: bool,
        page: u64,
        page_size: u64,
    ) -> Result<(Vec<courses::Model>, u64)> {
        self.course_repo()
            .list_visible(viewer_id, is_moderator, page, page_size)
            .await
    }

    pub async fn update_course(
        &self,
        id: i32,
        changes: CourseUpdate,
    ) -> Result<Option<courses::Model>> {
        self.course_repo().update(id, changes).await
    }

    pub async fn remove_course(&self, id: i32) -> Result<bool> {
        self.course_repo().remove(id).await
    }

    pub async fn lessons_for_course(&self, course_id: i32) -> Result<Vec<lessons::Model>> {
        self.course_repo().lessons_for_course(course_id).await
    }

    pub async fn lesson_count(&self, course_id: i32) -> Result<u64> {
        self.course_repo().lesson_count(course_id).await
    }

    // ========== Lessons ==========

    #[allow(clippy::too_many_arguments)]
    pub async fn add_lesson(
        &self,
        name: &str,
        course_id: i32,
        description: Option<&str>,
        picture: Option<&str>,
        video_url: Option<&str>,
        owner_id: i32,
    ) -> Result<lessons::Model> {
        self.lesson_repo()
            .create(name, course_id, description, picture, video_url, owner_id)
            .await
    }

    pub async fn get_lesson(&self, id: i32) -> Result<Option<lessons::Model>> {
        self.lesson_repo().get(id).await
    }

    pub async fn list_lessons(
        &self,
        viewer_id: i32,
        is_moderator: bool,
        page: u64,
        page_size: u64,
    ) -> Result<(Vec<lessons::Model>, u64)> {
        self.lesson_repo()
            .list_visible(viewer_id, is_moderator, page, page_size)
            .await
    }

    pub async fn update_lesson(
        &self,
        id: i32,
        changes: LessonUpdate,
    ) -> Result<Option<lessons::Model>> {
        self.lesson_repo().update(id, changes).await
    }

    pub async fn remove_lesson(&self, id: i32) -> Result<bool> {
        self.lesson_repo().remove(id).await
    }

    // ========== Subscriptions ==========

    pub async fn find_subscription(
        &self,
        user_id: i32,
        course_id: i32,
    ) -> Result<Option<subscriptions::Model>> {
        self.subscription_repo().find_pair(user_id, course_id).await
    }

    pub async fn add_subscription(
        &self,
        user_id: i32,
        course_id: i32,
    ) -> Result<subscriptions::Model> {
        self.subscription_repo()
            .insert_pair(user_id, course_id)
            .await
    }

    pub async fn remove_subscription(&self, user_id: i32, course_id: i32) -> Result<bool> {
        self.subscription_repo()
            .delete_pair(user_id, course_id)
            .await
    }

    pub async fn subscription_count(&self, user_id: i32, course_id: i32) -> Result<u64> {
        self.subscription_repo()
            .count_pair(user_id, course_id)
            .await
    }

    pub async fn is_subscribed(&self, user_id: i32, course_id: i32) -> Result<bool> {
        self.subscription_repo()
            .is_subscribed(user_id, course_id)
            .await
    }

    /// Emails of every subscriber of a course, for update notifications.
    pub async fn subscriber_emails(&self, course_id: i32) -> Result<Vec<String>> {
        let subs = self.subscription_repo().for_course(course_id).await?;
        let users = self.user_repo();

        let mut emails = Vec::with_capacity(subs.len());
        for sub in subs {
            if let Some(user) = users.get(sub.user_id).await? {
                emails.push(user.email);
            }
        }

        Ok(emails)
    }

    // ========== Payments ==========

    pub async fn add_pending_payment(
        &self,
        user_id: i32,
        course_id: Option<i32>,
        lesson_id: Option<i32>,
        amount: f64,
        method: &str,
    ) -> Result<payments::Model> {
        self.payment_repo()
            .create_pending(user_id, course_id, lesson_id, amount, method)
            .await
    }

    pub async fn set_payment_session(
        &self,
        payment_id: i32,
        session_id: &str,
        link: &str,
    ) -> Result<payments::Model> {
        self.payment_repo()
            .set_session(payment_id, session_id, link)
            .await
    }

    pub async fn list_payments(&self, filter: PaymentFilter) -> Result<Vec<payments::Model>> {
        self.payment_repo().list(filter).await
    }

    pub async fn payments_for_user(&self, user_id: i32) -> Result<Vec<payments::Model>> {
        self.payment_repo().for_user(user_id).await
    }

    // ========== Users ==========

    pub async fn create_user(
        &self,
        email: &str,
        password: &str,
        phone: Option<&str>,
        city: Option<&str>,
    ) -> Result<User> {
        self.user_repo().create(email, password, phone, city).await
    }

    pub async fn get_user(&self, id: i32) -> Result<Option<User>> {
        self.user_repo().get(id).await
    }

    pub async fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        self.user_repo().get_by_email(email).await
    }

    pub async fn list_users(&self) -> Result<Vec<User>> {
        self.user_repo().list().await
    }

    pub async fn update_user(&self, id: i32, changes: UserUpdate) -> Result<Option<User>> {
        self.user_repo().update(id, changes).await
    }

    pub async fn verify_user_password(&self, email: &str, password: &str) -> Result<bool> {
        self.user_repo().verify_password(email, password).await
    }

    pub async fn verify_token(&self, token: &str) -> Result<Option<User>> {
        self.user_repo().verify_token(token).await
    }

    pub async fn touch_last_login(&self, id: i32) -> Result<()> {
        self.user_repo().touch_last_login(id).await
    }

    pub async fn is_moderator(&self, user_id: i32) -> Result<bool> {
        self.user_repo().is_moderator(user_id).await
    }

    pub async fn add_user_to_group(&self, user_id: i32, group: &str) -> Result<()> {
        self.user_repo().add_to_group(user_id, group).await
    }

    pub async fn deactivate_stale_users(&self, cutoff: &str) -> Result<u64> {
        self.user_repo().deactivate_stale(cutoff).await
    }
}
