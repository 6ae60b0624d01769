use std::sync::{
    Arc, Mutex,
    atomic::{AtomicBool, Ordering},
};

use anyhow::Result;
use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use http_body_util::BodyExt;
use tower::ServiceExt;

use kursy::api;
use kursy::clients::{CheckoutSession, Mailer, PaymentGateway};
use kursy::clients::stripe::to_minor_units;
use kursy::config::Config;
use kursy::scheduler::sweep_inactive_users;
use kursy::state::SharedState;

/// Gateway mock that records every checkout request.
#[derive(Default)]
struct MockGateway {
    calls: Mutex<Vec<(String, f64)>>,
    fail: AtomicBool,
}

#[async_trait]
impl PaymentGateway for MockGateway {
    async fn create_checkout(&self, product_name: &str, amount: f64) -> Result<CheckoutSession> {
        self.calls
            .lock()
            .unwrap()
            .push((product_name.to_string(), amount));

        if self.fail.load(Ordering::SeqCst) {
            anyhow::bail!("simulated gateway outage");
        }

        Ok(CheckoutSession {
            session_id: "cs_test_123".to_string(),
            payment_link: "https://checkout.example/cs_test_123".to_string(),
        })
    }
}

/// Mailer mock that records every outgoing message.
#[derive(Default)]
struct MockMailer {
    sent: Mutex<Vec<(String, String, String)>>,
}

#[async_trait]
impl Mailer for MockMailer {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<()> {
        self.sent
            .lock()
            .unwrap()
            .push((to.to_string(), subject.to_string(), body.to_string()));
        Ok(())
    }
}

struct TestApp {
    router: Router,
    shared: Arc<SharedState>,
    gateway: Arc<MockGateway>,
    mailer: Arc<MockMailer>,
}

async fn spawn_app() -> TestApp {
    let mut config = Config::default();
    config.general.database_path = "sqlite::memory:".to_string();
    // A single pooled connection keeps the in-memory database shared.
    config.general.max_db_connections = 1;
    config.general.min_db_connections = 1;
    config.scheduler.enabled = false;

    let gateway = Arc::new(MockGateway::default());
    let mailer = Arc::new(MockMailer::default());

    let shared = Arc::new(
        SharedState::with_clients(config, gateway.clone(), mailer.clone())
            .await
            .expect("Failed to create app state"),
    );

    let state = api::create_app_state(shared.clone());
    let router = api::router(state).await;

    TestApp {
        router,
        shared,
        gateway,
        mailer,
    }
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let body = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&body).unwrap()
}

fn post_json(uri: &str, token: Option<&str>, body: &serde_json::Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header("Content-Type", "application/json");
    if let Some(token) = token {
        builder = builder.header("Authorization", format!("Bearer {token}"));
    }
    builder
        .body(Body::from(serde_json::to_string(body).unwrap()))
        .unwrap()
}

fn get(uri: &str, token: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header("Authorization", format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap()
}

/// Register a user through the API and return (id, token).
async fn register_user(app: &TestApp, email: &str) -> (i32, String) {
    let response = app
        .router
        .clone()
        .oneshot(post_json(
            "/api/users/register",
            None,
            &serde_json::json!({ "email": email, "password": "correct-horse" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let user = body_json(response).await;
    let id = user["id"].as_i64().unwrap() as i32;

    let response = app
        .router
        .clone()
        .oneshot(post_json(
            "/api/auth/login",
            None,
            &serde_json::json!({ "email": email, "password": "correct-horse" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let login = body_json(response).await;

    (id, login["token"].as_str().unwrap().to_string())
}

async fn create_course(app: &TestApp, token: &str, name: &str) -> i32 {
    let response = app
        .router
        .clone()
        .oneshot(post_json(
            "/api/courses",
            Some(token),
            &serde_json::json!({ "name": name }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    body_json(response).await["id"].as_i64().unwrap() as i32
}

#[tokio::test]
async fn test_health_check() {
    let app = spawn_app().await;

    let response = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_registration_and_login_issue_usable_token() {
    let app = spawn_app().await;
    let (id, token) = register_user(&app, "student@example.com").await;

    // Protected route rejects anonymous callers.
    let response = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/courses")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // And accepts the issued bearer token.
    let response = app
        .router
        .clone()
        .oneshot(get("/api/courses", &token))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // Login stamped last_login.
    let user = app.shared.store.get_user(id).await.unwrap().unwrap();
    assert!(user.last_login.is_some());
}

#[tokio::test]
async fn test_subscription_toggle_twice_restores_state() {
    let app = spawn_app().await;
    let (owner_id, token) = register_user(&app, "owner@example.com").await;
    let course_id = create_course(&app, &token, "Rust").await;

    let body = serde_json::json!({ "course_id": course_id });

    let response = app
        .router
        .clone()
        .oneshot(post_json("/api/subscriptions", Some(&token), &body))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        body_json(response).await["message"],
        "подписка добавлена"
    );
    assert_eq!(
        app.shared
            .store
            .subscription_count(owner_id, course_id)
            .await
            .unwrap(),
        1
    );

    let response = app
        .router
        .clone()
        .oneshot(post_json("/api/subscriptions", Some(&token), &body))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        body_json(response).await["message"],
        "подписка удалена"
    );
    assert_eq!(
        app.shared
            .store
            .subscription_count(owner_id, course_id)
            .await
            .unwrap(),
        0
    );
}

#[tokio::test]
async fn test_subscription_toggle_unknown_course_is_not_found() {
    let app = spawn_app().await;
    let (_, token) = register_user(&app, "user@example.com").await;

    let response = app
        .router
        .clone()
        .oneshot(post_json(
            "/api/subscriptions",
            Some(&token),
            &serde_json::json!({ "course_id": 9999 }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_subscription_without_course_id_is_rejected() {
    let app = spawn_app().await;
    let (_, token) = register_user(&app, "user@example.com").await;

    let response = app
        .router
        .clone()
        .oneshot(post_json(
            "/api/subscriptions",
            Some(&token),
            &serde_json::json!({}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "course_id обязателен");
}

#[tokio::test]
async fn test_payment_without_target_never_reaches_gateway() {
    let app = spawn_app().await;
    let (_, token) = register_user(&app, "payer@example.com").await;

    let response = app
        .router
        .clone()
        .oneshot(post_json(
            "/api/payments",
            Some(&token),
            &serde_json::json!({ "amount": 100.0, "method_payment": "stripe" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(app.gateway.calls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_payment_amount_converts_to_minor_units() {
    let app = spawn_app().await;
    let (_, token) = register_user(&app, "payer@example.com").await;
    let course_id = create_course(&app, &token, "Async Rust").await;

    let response = app
        .router
        .clone()
        .oneshot(post_json(
            "/api/payments",
            Some(&token),
            &serde_json::json!({ "course_paid": course_id, "amount": 100.0, "method_payment": "stripe" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let payment = body_json(response).await;
    assert_eq!(payment["session_id"], "cs_test_123");
    assert_eq!(payment["link"], "https://checkout.example/cs_test_123");
    assert_eq!(payment["course_paid"], course_id);
    assert_eq!(payment["method_payment"], "stripe");

    let calls = app.gateway.calls.lock().unwrap();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].0, "Async Rust");
    assert_eq!(to_minor_units(calls[0].1), 10_000);
}

#[tokio::test]
async fn test_gateway_failure_keeps_pending_payment() {
    let app = spawn_app().await;
    let (user_id, token) = register_user(&app, "payer@example.com").await;
    let course_id = create_course(&app, &token, "Rust").await;

    app.gateway.fail.store(true, Ordering::SeqCst);

    let response = app
        .router
        .clone()
        .oneshot(post_json(
            "/api/payments",
            Some(&token),
            &serde_json::json!({ "course_paid": course_id, "amount": 50.0, "method_payment": "stripe" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);

    // The pending row survives for reconciliation, without references.
    let payments = app.shared.store.payments_for_user(user_id).await.unwrap();
    assert_eq!(payments.len(), 1);
    assert!(payments[0].session_id.is_none());
    assert!(payments[0].link.is_none());
}

#[tokio::test]
async fn test_course_delete_cascades_and_nulls_payment_refs() {
    let app = spawn_app().await;
    let (user_id, token) = register_user(&app, "owner@example.com").await;
    let course_id = create_course(&app, &token, "Rust").await;

    let response = app
        .router
        .clone()
        .oneshot(post_json(
            "/api/lessons",
            Some(&token),
            &serde_json::json!({ "name": "Intro", "course_id": course_id }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let lesson_id = body_json(response).await["id"].as_i64().unwrap() as i32;

    let response = app
        .router
        .clone()
        .oneshot(post_json(
            "/api/payments",
            Some(&token),
            &serde_json::json!({ "course_paid": course_id, "amount": 10.0, "method_payment": "cash" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri(format!("/api/courses/{course_id}"))
                .header("Authorization", format!("Bearer {token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    assert!(app.shared.store.get_course(course_id).await.unwrap().is_none());
    assert!(app.shared.store.get_lesson(lesson_id).await.unwrap().is_none());

    let payments = app.shared.store.payments_for_user(user_id).await.unwrap();
    assert_eq!(payments.len(), 1);
    assert_eq!(payments[0].course_id, None);

    // The paying user survives the cascade.
    assert!(app.shared.store.get_user(user_id).await.unwrap().is_some());
}

#[tokio::test]
async fn test_course_update_notifies_every_subscriber() {
    let app = spawn_app().await;
    let (_, owner_token) = register_user(&app, "owner@example.com").await;
    let course_id = create_course(&app, &owner_token, "Rust").await;

    for email in ["a@example.com", "b@example.com", "c@example.com"] {
        let (_, token) = register_user(&app, email).await;
        let response = app
            .router
            .clone()
            .oneshot(post_json(
                "/api/subscriptions",
                Some(&token),
                &serde_json::json!({ "course_id": course_id }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    let response = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .method("PATCH")
                .uri(format!("/api/courses/{course_id}"))
                .header("Authorization", format!("Bearer {owner_token}"))
                .header("Content-Type", "application/json")
                .body(Body::from(r#"{"description":"new material"}"#))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // Fan-out runs on a background worker.
    let mut sent = Vec::new();
    for _ in 0..50 {
        sent = app.mailer.sent.lock().unwrap().clone();
        if sent.len() == 3 {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    }

    assert_eq!(sent.len(), 3);
    for (_, subject, body) in &sent {
        assert_eq!(subject, "Курс обновлен");
        assert!(body.contains("Rust"));
    }
}

#[tokio::test]
async fn test_course_update_skips_later_subscribers() {
    let app = spawn_app().await;
    let (_, owner_token) = register_user(&app, "owner@example.com").await;
    let course_id = create_course(&app, &owner_token, "Rust").await;

    let (_, early_token) = register_user(&app, "early@example.com").await;
    let response = app
        .router
        .clone()
        .oneshot(post_json(
            "/api/subscriptions",
            Some(&early_token),
            &serde_json::json!({ "course_id": course_id }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .method("PATCH")
                .uri(format!("/api/courses/{course_id}"))
                .header("Authorization", format!("Bearer {owner_token}"))
                .header("Content-Type", "application/json")
                .body(Body::from(r#"{"description":"new material"}"#))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // The recipient list was fixed when the update happened, so a
    // subscription created afterwards gets nothing.
    let (_, late_token) = register_user(&app, "late@example.com").await;
    let response = app
        .router
        .clone()
        .oneshot(post_json(
            "/api/subscriptions",
            Some(&late_token),
            &serde_json::json!({ "course_id": course_id }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let mut sent = Vec::new();
    for _ in 0..50 {
        sent = app.mailer.sent.lock().unwrap().clone();
        if !sent.is_empty() {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    }
    tokio::time::sleep(std::time::Duration::from_millis(100)).await;
    sent = app.mailer.sent.lock().unwrap().clone();

    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].0, "early@example.com");
}

#[tokio::test]
async fn test_non_owner_cannot_update_course() {
    let app = spawn_app().await;
    let (_, owner_token) = register_user(&app, "owner@example.com").await;
    let course_id = create_course(&app, &owner_token, "Rust").await;

    let (_, stranger_token) = register_user(&app, "stranger@example.com").await;

    let response = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .method("PATCH")
                .uri(format!("/api/courses/{course_id}"))
                .header("Authorization", format!("Bearer {stranger_token}"))
                .header("Content-Type", "application/json")
                .body(Body::from(r#"{"name":"Hijacked"}"#))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let course = app.shared.store.get_course(course_id).await.unwrap().unwrap();
    assert_eq!(course.name, "Rust");
}

#[tokio::test]
async fn test_moderator_can_view_but_not_delete() {
    let app = spawn_app().await;
    let (_, owner_token) = register_user(&app, "owner@example.com").await;
    let course_id = create_course(&app, &owner_token, "Rust").await;

    let (moder_id, moder_token) = register_user(&app, "moder@example.com").await;
    app.shared
        .store
        .add_user_to_group(moder_id, "moderators")
        .await
        .unwrap();

    let response = app
        .router
        .clone()
        .oneshot(get(&format!("/api/courses/{course_id}"), &moder_token))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri(format!("/api/courses/{course_id}"))
                .header("Authorization", format!("Bearer {moder_token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_owner_keeps_delete_after_moderator_promotion() {
    let app = spawn_app().await;
    let (owner_id, token) = register_user(&app, "owner@example.com").await;
    let course_id = create_course(&app, &token, "Rust").await;

    app.shared
        .store
        .add_user_to_group(owner_id, "moderators")
        .await
        .unwrap();

    let response = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri(format!("/api/courses/{course_id}"))
                .header("Authorization", format!("Bearer {token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert!(app.shared.store.get_course(course_id).await.unwrap().is_none());
}

#[tokio::test]
async fn test_trailing_slash_paths_are_accepted() {
    let app = spawn_app().await;

    let response = app
        .router
        .clone()
        .oneshot(post_json(
            "/api/users/register/",
            None,
            &serde_json::json!({ "email": "slash@example.com", "password": "correct-horse" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let (_, token) = register_user(&app, "user@example.com").await;
    let course_id = create_course(&app, &token, "Rust").await;

    let response = app
        .router
        .clone()
        .oneshot(post_json(
            "/api/subscriptions/",
            Some(&token),
            &serde_json::json!({ "course_id": course_id }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["message"], "подписка добавлена");
}

#[tokio::test]
async fn test_lesson_video_url_must_be_youtube() {
    let app = spawn_app().await;
    let (_, token) = register_user(&app, "owner@example.com").await;
    let course_id = create_course(&app, &token, "Rust").await;

    let response = app
        .router
        .clone()
        .oneshot(post_json(
            "/api/lessons",
            Some(&token),
            &serde_json::json!({
                "name": "Intro",
                "course_id": course_id,
                "video_url": "https://vimeo.com/123"
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .router
        .clone()
        .oneshot(post_json(
            "/api/lessons",
            Some(&token),
            &serde_json::json!({
                "name": "Intro",
                "course_id": course_id,
                "video_url": "https://www.youtube.com/watch?v=abc"
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
}

#[tokio::test]
async fn test_course_detail_embeds_lessons_and_subscription_flag() {
    let app = spawn_app().await;
    let (_, token) = register_user(&app, "owner@example.com").await;
    let course_id = create_course(&app, &token, "Rust").await;

    for name in ["Intro", "Ownership"] {
        let response = app
            .router
            .clone()
            .oneshot(post_json(
                "/api/lessons",
                Some(&token),
                &serde_json::json!({ "name": name, "course_id": course_id }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    let response = app
        .router
        .clone()
        .oneshot(post_json(
            "/api/subscriptions",
            Some(&token),
            &serde_json::json!({ "course_id": course_id }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .router
        .clone()
        .oneshot(get(&format!("/api/courses/{course_id}"), &token))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let detail = body_json(response).await;
    assert_eq!(detail["count_lessons"], 2);
    assert_eq!(detail["lessons"].as_array().unwrap().len(), 2);
    assert_eq!(detail["is_subscribed"], true);
}

#[tokio::test]
async fn test_course_list_pagination_defaults() {
    let app = spawn_app().await;
    let (_, token) = register_user(&app, "owner@example.com").await;

    for i in 0..5 {
        create_course(&app, &token, &format!("Course {i}")).await;
    }

    let response = app
        .router
        .clone()
        .oneshot(get("/api/courses", &token))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let page = body_json(response).await;
    assert_eq!(page["count"], 5);
    assert_eq!(page["results"].as_array().unwrap().len(), 2);

    // page_size is clamped to the configured maximum.
    let response = app
        .router
        .clone()
        .oneshot(get("/api/courses?page=1&page_size=100", &token))
        .await
        .unwrap();
    let page = body_json(response).await;
    assert_eq!(page["results"].as_array().unwrap().len(), 5);
}

#[tokio::test]
async fn test_inactivity_sweep_is_idempotent() {
    use sea_orm::sea_query::Expr;
    use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};

    use kursy::entities::users;

    let app = spawn_app().await;
    let (stale_id, _) = register_user(&app, "stale@example.com").await;
    let (fresh_id, _) = register_user(&app, "fresh@example.com").await;

    // A user that never logged in must be left alone.
    let dormant = app
        .shared
        .store
        .create_user("dormant@example.com", "correct-horse", None, None)
        .await
        .unwrap();

    let old = (chrono::Utc::now() - chrono::Duration::days(90)).to_rfc3339();
    users::Entity::update_many()
        .col_expr(users::Column::LastLogin, Expr::value(old))
        .filter(users::Column::Id.eq(stale_id))
        .exec(&app.shared.store.conn)
        .await
        .unwrap();

    let swept = sweep_inactive_users(&app.shared.store, 30).await.unwrap();
    assert_eq!(swept, 1);

    let stale = app.shared.store.get_user(stale_id).await.unwrap().unwrap();
    assert!(!stale.is_active);
    let fresh = app.shared.store.get_user(fresh_id).await.unwrap().unwrap();
    assert!(fresh.is_active);
    let dormant = app.shared.store.get_user(dormant.id).await.unwrap().unwrap();
    assert!(dormant.is_active);

    // Rerunning the sweep is a no-op.
    let swept = sweep_inactive_users(&app.shared.store, 30).await.unwrap();
    assert_eq!(swept, 0);
}
