use std::sync::Arc;

use axum::{
    Extension, Json,
    extract::{Path, State},
    response::{IntoResponse, Response},
};

use crate::api::auth::CurrentUser;
use crate::api::{ApiError, AppState, PaymentDto, UserDetailDto, UserDto, UserUpdateRequest};
use crate::db::UserUpdate;

pub async fn list_users(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<UserDto>>, ApiError> {
    let users = state.store().list_users().await?;
    Ok(Json(users.into_iter().map(UserDto::from).collect()))
}

/// Own profile (or a moderator's view) embeds the payment history;
/// anyone else sees the public fields only.
pub async fn get_user(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<i32>,
) -> Result<Response, ApiError> {
    let user = state
        .store()
        .get_user(id)
        .await?
        .ok_or_else(|| ApiError::user_not_found(id))?;

    if current.id == id || current.is_moderator {
        let payments = state.store().payments_for_user(id).await?;
        let detail = UserDetailDto {
            user: UserDto::from(user),
            payments: payments.into_iter().map(PaymentDto::from).collect(),
        };
        return Ok(Json(detail).into_response());
    }

    Ok(Json(UserDto::from(user)).into_response())
}

pub async fn update_user(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<i32>,
    Json(request): Json<UserUpdateRequest>,
) -> Result<Json<UserDto>, ApiError> {
    if current.id != id {
        return Err(ApiError::forbidden());
    }

    let changes = UserUpdate {
        phone: request.phone,
        city: request.city,
        avatar: request.avatar,
    };

    let user = state
        .store()
        .update_user(id, changes)
        .await?
        .ok_or_else(|| ApiError::user_not_found(id))?;

    Ok(Json(UserDto::from(user)))
}
