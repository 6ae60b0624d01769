use std::sync::Arc;

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
};

use crate::api::auth::CurrentUser;
use crate::api::types::validate_video_url;
use crate::api::{
    ApiError, AppState, LessonCreateRequest, LessonDto, LessonUpdateRequest, PageQuery, Paginated,
};
use crate::db::LessonUpdate;
use crate::entities::lessons;
use crate::permissions::{self, AccessContext};

fn access_context(current: &CurrentUser, lesson: &lessons::Model) -> AccessContext {
    AccessContext {
        authenticated: true,
        is_moderator: current.is_moderator,
        is_owner: lesson.owner_id == Some(current.id),
    }
}

pub async fn list_lessons(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
    Query(query): Query<PageQuery>,
) -> Result<Json<Paginated<LessonDto>>, ApiError> {
    let pagination = state.shared.config.read().await.pagination.clone();
    let (page, page_size) = query.resolve(&pagination);

    let (rows, count) = state
        .store()
        .list_lessons(current.id, current.is_moderator, page, page_size)
        .await?;

    Ok(Json(Paginated {
        count,
        results: rows.into_iter().map(LessonDto::from).collect(),
    }))
}

pub async fn create_lesson(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
    Json(request): Json<LessonCreateRequest>,
) -> Result<(StatusCode, Json<LessonDto>), ApiError> {
    let ctx = AccessContext {
        authenticated: true,
        is_moderator: current.is_moderator,
        is_owner: false,
    };
    if !permissions::can_create().evaluate(&ctx) {
        return Err(ApiError::forbidden());
    }

    if request.name.trim().is_empty() {
        return Err(ApiError::validation("Название урока обязательно"));
    }

    if let Some(url) = &request.video_url {
        validate_video_url(url)?;
    }

    if state.store().get_course(request.course_id).await?.is_none() {
        return Err(ApiError::course_not_found(request.course_id));
    }

    let lesson = state
        .store()
        .add_lesson(
            &request.name,
            request.course_id,
            request.description.as_deref(),
            request.picture.as_deref(),
            request.video_url.as_deref(),
            current.id,
        )
        .await?;

    Ok((StatusCode::CREATED, Json(LessonDto::from(lesson))))
}

pub async fn get_lesson(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<i32>,
) -> Result<Json<LessonDto>, ApiError> {
    let lesson = state
        .store()
        .get_lesson(id)
        .await?
        .ok_or_else(|| ApiError::lesson_not_found(id))?;

    if !permissions::can_view_or_edit().evaluate(&access_context(&current, &lesson)) {
        return Err(ApiError::forbidden());
    }

    Ok(Json(LessonDto::from(lesson)))
}

pub async fn update_lesson(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<i32>,
    Json(request): Json<LessonUpdateRequest>,
) -> Result<Json<LessonDto>, ApiError> {
    let lesson = state
        .store()
        .get_lesson(id)
        .await?
        .ok_or_else(|| ApiError::lesson_not_found(id))?;

    if !permissions::can_view_or_edit().evaluate(&access_context(&current, &lesson)) {
        return Err(ApiError::forbidden());
    }

    if let Some(url) = &request.video_url {
        validate_video_url(url)?;
    }

    let changes = LessonUpdate {
        name: request.name,
        description: request.description,
        picture: request.picture,
        video_url: request.video_url,
    };

    let lesson = state
        .store()
        .update_lesson(id, changes)
        .await?
        .ok_or_else(|| ApiError::lesson_not_found(id))?;

    Ok(Json(LessonDto::from(lesson)))
}

pub async fn delete_lesson(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<i32>,
) -> Result<StatusCode, ApiError> {
    let lesson = state
        .store()
        .get_lesson(id)
        .await?
        .ok_or_else(|| ApiError::lesson_not_found(id))?;

    if !permissions::can_delete().evaluate(&access_context(&current, &lesson)) {
        return Err(ApiError::forbidden());
    }

    state.store().remove_lesson(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
