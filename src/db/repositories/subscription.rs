use anyhow::Result;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    Set,
};
use tracing::info;

use crate::entities::subscriptions;

/// Repository for (user, course) subscription rows. The toggle service
/// works on row existence, so this layer exposes find/insert/delete
/// rather than an upsert.
pub struct SubscriptionRepository {
    conn: DatabaseConnection,
}

impl SubscriptionRepository {
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn find_pair(
        &self,
        user_id: i32,
        course_id: i32,
    ) -> Result<Option<subscriptions::Model>> {
        let row = subscriptions::Entity::find()
            .filter(subscriptions::Column::UserId.eq(user_id))
            .filter(subscriptions::Column::CourseId.eq(course_id))
            .one(&self.conn)
            .await?;

        Ok(row)
    }

    pub async fn insert_pair(&self, user_id: i32, course_id: i32) -> Result<subscriptions::Model> {
        let active_model = subscriptions::ActiveModel {
            user_id: Set(user_id),
            course_id: Set(course_id),
            is_active: Set(true),
            created_at: Set(chrono::Utc::now().to_rfc3339()),
            ..Default::default()
        };

        let model = active_model.insert(&self.conn).await?;
        info!("User {} subscribed to course {}", user_id, course_id);
        Ok(model)
    }

    pub async fn delete_pair(&self, user_id: i32, course_id: i32) -> Result<bool> {
        let result = subscriptions::Entity::delete_many()
            .filter(subscriptions::Column::UserId.eq(user_id))
            .filter(subscriptions::Column::CourseId.eq(course_id))
            .exec(&self.conn)
            .await?;

        Ok(result.rows_affected > 0)
    }

    pub async fn count_pair(&self, user_id: i32, course_id: i32) -> Result<u64> {
        let count = subscriptions::Entity::find()
            .filter(subscriptions::Column::UserId.eq(user_id))
            .filter(subscriptions::Column::CourseId.eq(course_id))
            .count(&self.conn)
            .await?;

        Ok(count)
    }

    pub async fn is_subscribed(&self, user_id: i32, course_id: i32) -> Result<bool> {
        Ok(self.find_pair(user_id, course_id).await?.is_some())
    }

    pub async fn for_course(&self, course_id: i32) -> Result<Vec<subscriptions::Model>> {
        let rows = subscriptions::Entity::find()
            .filter(subscriptions::Column::CourseId.eq(course_id))
            .all(&self.conn)
            .await?;

        Ok(rows)
    }
}
