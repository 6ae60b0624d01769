use std::sync::Arc;

use axum::{Extension, Json, extract::State};
use serde_json::{Value, json};

use crate::api::auth::CurrentUser;
use crate::api::{ApiError, AppState, SubscriptionRequest};

/// Toggle the caller's subscription for a course.
pub async fn toggle_subscription(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
    Json(request): Json<SubscriptionRequest>,
) -> Result<Json<Value>, ApiError> {
    let course_id = request
        .course_id
        .ok_or_else(|| ApiError::validation("course_id обязателен"))?;

    let message = state
        .shared
        .subscription_service
        .toggle(current.id, course_id)
        .await?;

    Ok(Json(json!({ "message": message })))
}
