use std::sync::Arc;

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
};

use crate::api::auth::CurrentUser;
use crate::api::{
    ApiError, AppState, CourseCreateRequest, CourseDetailDto, CourseDto, CourseUpdateRequest,
    LessonDto, PageQuery, Paginated,
};
use crate::db::CourseUpdate;
use crate::entities::courses;
use crate::permissions::{self, AccessContext};

fn access_context(current: &CurrentUser, course: &courses::Model) -> AccessContext {
    AccessContext {
        authenticated: true,
        is_moderator: current.is_moderator,
        is_owner: course.owner_id == Some(current.id),
    }
}

pub async fn list_courses(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
    Query(query): Query<PageQuery>,
) -> Result<Json<Paginated<CourseDto>>, ApiError> {
    let pagination = state.shared.config.read().await.pagination.clone();
    let (page, page_size) = query.resolve(&pagination);

    let (rows, count) = state
        .store()
        .list_courses(current.id, current.is_moderator, page, page_size)
        .await?;

    Ok(Json(Paginated {
        count,
        results: rows.into_iter().map(CourseDto::from).collect(),
    }))
}

pub async fn create_course(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
    Json(request): Json<CourseCreateRequest>,
) -> Result<(StatusCode, Json<CourseDto>), ApiError> {
    let ctx = AccessContext {
        authenticated: true,
        is_moderator: current.is_moderator,
        is_owner: false,
    };
    if !permissions::can_create().evaluate(&ctx) {
        return Err(ApiError::forbidden());
    }

    if request.name.trim().is_empty() {
        return Err(ApiError::validation("Название курса обязательно"));
    }

    let course = state
        .store()
        .add_course(
            &request.name,
            request.description.as_deref(),
            request.picture.as_deref(),
            current.id,
        )
        .await?;

    Ok((StatusCode::CREATED, Json(CourseDto::from(course))))
}

pub async fn get_course(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<i32>,
) -> Result<Json<CourseDetailDto>, ApiError> {
    let course = state
        .store()
        .get_course(id)
        .await?
        .ok_or_else(|| ApiError::course_not_found(id))?;

    if !permissions::can_view_or_edit().evaluate(&access_context(&current, &course)) {
        return Err(ApiError::forbidden());
    }

    let lessons = state.store().lessons_for_course(id).await?;
    let count_lessons = state.store().lesson_count(id).await?;
    let is_subscribed = state.store().is_subscribed(current.id, id).await?;

    Ok(Json(CourseDetailDto {
        course: CourseDto::from(course),
        lessons: lessons.into_iter().map(LessonDto::from).collect(),
        count_lessons,
        is_subscribed,
    }))
}

/// Successful updates fan out an email to every subscriber; the enqueue
/// never affects the HTTP response.
pub async fn update_course(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<i32>,
    Json(request): Json<CourseUpdateRequest>,
) -> Result<Json<CourseDto>, ApiError> {
    let course = state
        .store()
        .get_course(id)
        .await?
        .ok_or_else(|| ApiError::course_not_found(id))?;

    if !permissions::can_view_or_edit().evaluate(&access_context(&current, &course)) {
        return Err(ApiError::forbidden());
    }

    let changes = CourseUpdate {
        name: request.name,
        description: request.description,
        picture: request.picture,
    };

    let course = state
        .store()
        .update_course(id, changes)
        .await?
        .ok_or_else(|| ApiError::course_not_found(id))?;

    state.shared.notifier.course_updated(&course).await;

    Ok(Json(CourseDto::from(course)))
}

pub async fn delete_course(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<i32>,
) -> Result<StatusCode, ApiError> {
    let course = state
        .store()
        .get_course(id)
        .await?
        .ok_or_else(|| ApiError::course_not_found(id))?;

    if !permissions::can_delete().evaluate(&access_context(&current, &course)) {
        return Err(ApiError::forbidden());
    }

    state.store().remove_course(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
