use anyhow::Result;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};

use crate::entities::lessons;

pub struct LessonRepository {
    conn: DatabaseConnection,
}

#[derive(Debug, Clone, Default)]
pub struct LessonUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub picture: Option<String>,
    pub video_url: Option<String>,
}

impl LessonRepository {
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn create(
        &self,
        name: &str,
        course_id: i32,
        description: Option<&str>,
        picture: Option<&str>,
        video_url: Option<&str>,
        owner_id: i32,
    ) -> Result<lessons::Model> {
        let active_model = lessons::ActiveModel {
            name: Set(name.to_string()),
            course_id: Set(course_id),
            description: Set(description.map(str::to_string)),
            picture: Set(picture.map(str::to_string)),
            video_url: Set(video_url.map(str::to_string)),
            owner_id: Set(Some(owner_id)),
            ..Default::default()
        };

        Ok(active_model.insert(&self.conn).await?)
    }

    pub async fn get(&self, id: i32) -> Result<Option<lessons::Model>> {
        Ok(lessons::Entity::find_by_id(id).one(&self.conn).await?)
    }

    pub async fn list_visible(
        &self,
        viewer_id: i32,
        is_moderator: bool,
        page: u64,
        page_size: u64,
    ) -> Result<(Vec<lessons::Model>, u64)> {
        let mut query = lessons::Entity::find().order_by_asc(lessons::Column::Id);

        if !is_moderator {
            query = query.filter(lessons::Column::OwnerId.eq(viewer_id));
        }

        let paginator = query.paginate(&self.conn, page_size);
        let total = paginator.num_items().await?;
        let rows = paginator.fetch_page(page.saturating_sub(1)).await?;

        Ok((rows, total))
    }

    pub async fn update(&self, id: i32, changes: LessonUpdate) -> Result<Option<lessons::Model>> {
        let Some(lesson) = lessons::Entity::find_by_id(id).one(&self.conn).await? else {
            return Ok(None);
        };

        let mut active: lessons::ActiveModel = lesson.into();
        if let Some(name) = changes.name {
            active.name = Set(name);
        }
        if let Some(description) = changes.description {
            active.description = Set(Some(description));
        }
        if let Some(picture) = changes.picture {
            active.picture = Set(Some(picture));
        }
        if let Some(video_url) = changes.video_url {
            active.video_url = Set(Some(video_url));
        }

        let model = active.update(&self.conn).await?;
        Ok(Some(model))
    }

    pub async fn remove(&self, id: i32) -> Result<bool> {
        let result = lessons::Entity::delete_by_id(id).exec(&self.conn).await?;
        Ok(result.rows_affected > 0)
    }
}
