//! `SeaORM` implementation of the `SubscriptionService` trait.

use async_trait::async_trait;
use tracing::info;

use crate::db::Store;
use crate::services::subscription_service::{SubscriptionError, SubscriptionService};

pub struct SeaOrmSubscriptionService {
    store: Store,
}

impl SeaOrmSubscriptionService {
    #[must_use]
    pub const fn new(store: Store) -> Self {
        Self { store }
    }
}

#[async_trait]
impl SubscriptionService for SeaOrmSubscriptionService {
    async fn toggle(&self, user_id: i32, course_id: i32) -> Result<String, SubscriptionError> {
        if self.store.get_course(course_id).await?.is_none() {
            return Err(SubscriptionError::CourseNotFound);
        }

        let message = if self.store.find_subscription(user_id, course_id).await?.is_some() {
            self.store.remove_subscription(user_id, course_id).await?;
            info!("User {user_id} unsubscribed from course {course_id}");
            "подписка удалена"
        } else {
            self.store.add_subscription(user_id, course_id).await?;
            "подписка добавлена"
        };

        Ok(message.to_string())
    }
}
