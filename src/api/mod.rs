use axum::{
    Json, Router,
    extract::State,
    http::HeaderValue,
    middleware,
    routing::{delete, get, patch, post, put},
};
use serde_json::json;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::state::SharedState;

pub mod auth;
mod courses;
mod error;
mod lessons;
mod payments;
mod subscriptions;
mod types;
mod users;

pub use error::ApiError;
pub use types::*;

#[derive(Clone)]
pub struct AppState {
    pub shared: Arc<SharedState>,

    pub start_time: std::time::Instant,
}

impl AppState {
    #[must_use]
    pub fn store(&self) -> &crate::db::Store {
        &self.shared.store
    }
}

pub fn create_app_state(shared: Arc<SharedState>) -> Arc<AppState> {
    Arc::new(AppState {
        shared,
        start_time: std::time::Instant::now(),
    })
}

pub async fn create_app_state_from_config(config: Config) -> anyhow::Result<Arc<AppState>> {
    let shared = Arc::new(SharedState::new(config).await?);
    Ok(create_app_state(shared))
}

pub async fn router(state: Arc<AppState>) -> Router {
    let cors_origins = {
        let config = state.shared.config.read().await;
        config.server.cors_allowed_origins.clone()
    };

    let protected_routes = create_protected_router(state.clone());

    let api_router = Router::new()
        .merge(protected_routes)
        .route("/health", get(health_check))
        .route("/users/register", post(auth::register))
        .route("/users/register/", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/login/", post(auth::login))
        .with_state(state);

    let cors_layer = if cors_origins.contains(&"*".to_string()) {
        CorsLayer::new().allow_origin(Any)
    } else {
        let origins: Vec<HeaderValue> =
            cors_origins.iter().filter_map(|s| s.parse().ok()).collect();
        CorsLayer::new().allow_origin(origins)
    };

    Router::new()
        .nest("/api", api_router)
        .layer(cors_layer.allow_methods(Any).allow_headers(Any))
        .layer(TraceLayer::new_for_http())
}

async fn health_check(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let db_ok = state.store().ping().await.is_ok();

    Json(json!({
        "status": if db_ok { "ok" } else { "degraded" },
        "version": env!("CARGO_PKG_VERSION"),
        "uptime_seconds": state.start_time.elapsed().as_secs(),
    }))
}

// Collection routes are registered with and without a trailing slash; the
// previous API used slash-terminated paths and existing clients still do.
fn create_protected_router(state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .route("/users", get(users::list_users))
        .route("/users/{id}", get(users::get_user))
        .route("/users/{id}", patch(users::update_user))
        .route("/courses", get(courses::list_courses))
        .route("/courses", post(courses::create_course))
        .route("/courses/", get(courses::list_courses))
        .route("/courses/", post(courses::create_course))
        .route("/courses/{id}", get(courses::get_course))
        .route("/courses/{id}", patch(courses::update_course))
        .route("/courses/{id}", put(courses::update_course))
        .route("/courses/{id}", delete(courses::delete_course))
        .route("/lessons", get(lessons::list_lessons))
        .route("/lessons", post(lessons::create_lesson))
        .route("/lessons/", get(lessons::list_lessons))
        .route("/lessons/", post(lessons::create_lesson))
        .route("/lessons/{id}", get(lessons::get_lesson))
        .route("/lessons/{id}", patch(lessons::update_lesson))
        .route("/lessons/{id}", delete(lessons::delete_lesson))
        .route("/subscriptions", post(subscriptions::toggle_subscription))
        .route("/subscriptions/", post(subscriptions::toggle_subscription))
        .route("/payments", post(payments::create_payment))
        .route("/payments", get(payments::list_payments))
        .route("/payments/", post(payments::create_payment))
        .route("/payments/", get(payments::list_payments))
        .route_layer(middleware::from_fn_with_state(state, auth::auth_middleware))
}
