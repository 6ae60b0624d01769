use anyhow::Result;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};
use tracing::info;

use crate::entities::{courses, lessons};

/// Repository for course rows and their lessons aggregate.
pub struct CourseRepository {
    conn: DatabaseConnection,
}

#[derive(Debug, Clone, Default)]
pub struct CourseUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub picture: Option<String>,
}

impl CourseRepository {
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn create(
        &self,
        name: &str,
        description: Option<&str>,
        picture: Option<&str>,
        owner_id: i32,
    ) -> Result<courses::Model> {
        let now = chrono::Utc::now().to_rfc3339();

        let active_model = courses::ActiveModel {
            name: Set(name.to_string()),
            description: Set(description.map(str::to_string)),
            picture: Set(picture.map(str::to_string)),
            owner_id: Set(Some(owner_id)),
            updated_at: Set(now),
            ..Default::default()
        };

        let model = active_model.insert(&self.conn).await?;
        info!("Created course {} ({})", model.id, model.name);
        Ok(model)
    }

    pub async fn get(&self, id: i32) -> Result<Option<courses::Model>> {
        Ok(courses::Entity::find_by_id(id).one(&self.conn).await?)
    }

    /// Page of courses visible to the caller: moderators see everything,
    /// everyone else only what they own.
    pub async fn list_visible(
        &self,
        viewer_id: i32,
        is_moderator: bool,
        page: u64,
        page_size: u64,
    ) -> Result<(Vec<courses::Model>, u64)> {
        let mut query = courses::Entity::find().order_by_asc(courses::Column::Id);

        if !is_moderator {
            query = query.filter(courses::Column::OwnerId.eq(viewer_id));
        }

        let paginator = query.paginate(&self.conn, page_size);
        let total = paginator.num_items().await?;
        let rows = paginator.fetch_page(page.saturating_sub(1)).await?;

        Ok((rows, total))
    }

    pub async fn update(&self, id: i32, changes: CourseUpdate) -> Result<Option<courses::Model>> {
        let Some(course) = courses::Entity::find_by_id(id).one(&self.conn).await? else {
            return Ok(None);
        };

        let mut active: courses::ActiveModel = course.into();
        if let Some(name) = changes.name {
            active.name = Set(name);
        }
        if let Some(description) = changes.description {
            active.description = Set(Some(description));
        }
        if let Some(picture) = changes.picture {
            active.picture = Set(Some(picture));
        }
        active.updated_at = Set(chrono::Utc::now().to_rfc3339());

        let model = active.update(&self.conn).await?;
        Ok(Some(model))
    }

    /// Deleting a course cascades to its lessons and subscriptions;
    /// payments keep a nulled reference.
    pub async fn remove(&self, id: i32) -> Result<bool> {
        let result = courses::Entity::delete_by_id(id).exec(&self.conn).await?;
        Ok(result.rows_affected > 0)
    }

    pub async fn lessons_for_course(&self, course_id: i32) -> Result<Vec<lessons::Model>> {
        let rows = lessons::Entity::find()
            .filter(lessons::Column::CourseId.eq(course_id))
            .order_by_asc(lessons::Column::Id)
            .all(&self.conn)
            .await?;

        Ok(rows)
    }

    pub async fn lesson_count(&self, course_id: i32) -> Result<u64> {
        let count = lessons::Entity::find()
            .filter(lessons::Column::CourseId.eq(course_id))
            .count(&self.conn)
            .await?;

        Ok(count)
    }
}
