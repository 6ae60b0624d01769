use std::sync::Arc;

use axum::{
    Json,
    extract::{Request, State},
    http::{StatusCode, header},
    middleware::Next,
    response::Response,
};

use crate::api::{ApiError, AppState, LoginRequest, RegisterRequest, UserDto};
use crate::services::LoginResult;

/// Authenticated caller, inserted into request extensions by the
/// middleware and read by handlers.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub id: i32,
    pub email: String,
    pub is_moderator: bool,
}

/// Bearer-token guard for the protected routes.
pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .ok_or_else(|| ApiError::Unauthorized("Требуется авторизация".to_string()))?;

    let user = state
        .shared
        .auth_service
        .verify_token(token)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("Недействительный токен".to_string()))?;

    let is_moderator = state.store().is_moderator(user.id).await?;

    request.extensions_mut().insert(CurrentUser {
        id: user.id,
        email: user.email,
        is_moderator,
    });

    Ok(next.run(request).await)
}

pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(request): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<UserDto>), ApiError> {
    let user = state
        .shared
        .auth_service
        .register(
            &request.email,
            &request.password,
            request.phone.as_deref(),
            request.city.as_deref(),
        )
        .await?;

    Ok((StatusCode::CREATED, Json(UserDto::from(user))))
}

pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<LoginResult>, ApiError> {
    let result = state
        .shared
        .auth_service
        .login(&request.email, &request.password)
        .await?;

    Ok(Json(result))
}
