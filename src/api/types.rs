use serde::{Deserialize, Serialize};

use crate::api::ApiError;
use crate::config::PaginationConfig;
use crate::db::User;
use crate::entities::{courses, lessons, payments};

// ========== Requests ==========

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub phone: Option<String>,
    pub city: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct UserUpdateRequest {
    pub phone: Option<String>,
    pub city: Option<String>,
    pub avatar: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CourseCreateRequest {
    pub name: String,
    pub description: Option<String>,
    pub picture: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CourseUpdateRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub picture: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LessonCreateRequest {
    pub name: String,
    pub course_id: i32,
    pub description: Option<String>,
    pub picture: Option<String>,
    pub video_url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LessonUpdateRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub picture: Option<String>,
    pub video_url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SubscriptionRequest {
    pub course_id: Option<i32>,
}

/// Payment wire contract keeps the historical field names
/// (`course_paid`, `lesson_paid`, `method_payment`).
#[derive(Debug, Deserialize)]
pub struct PaymentCreateRequest {
    #[serde(rename = "course_paid")]
    pub course_id: Option<i32>,
    #[serde(rename = "lesson_paid")]
    pub lesson_id: Option<i32>,
    pub amount: f64,
    #[serde(rename = "method_payment")]
    pub method: String,
}

#[derive(Debug, Deserialize)]
pub struct PaymentListQuery {
    #[serde(rename = "course_paid")]
    pub course_id: Option<i32>,
    #[serde(rename = "lesson_paid")]
    pub lesson_id: Option<i32>,
    #[serde(rename = "method_payment")]
    pub method: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
pub struct PageQuery {
    pub page: Option<u64>,
    pub page_size: Option<u64>,
}

impl PageQuery {
    /// Resolve to (page, page_size) with defaults applied and the size
    /// clamped to the configured maximum.
    #[must_use]
    pub fn resolve(&self, config: &PaginationConfig) -> (u64, u64) {
        let page = self.page.unwrap_or(1).max(1);
        let size = self
            .page_size
            .unwrap_or(config.default_page_size)
            .clamp(1, config.max_page_size);
        (page, size)
    }
}

// ========== Responses ==========

#[derive(Debug, Serialize)]
pub struct Paginated<T> {
    pub count: u64,
    pub results: Vec<T>,
}

#[derive(Debug, Clone, Serialize)]
pub struct UserDto {
    pub id: i32,
    pub email: String,
    pub phone: Option<String>,
    pub city: Option<String>,
    pub avatar: Option<String>,
    pub is_active: bool,
    pub last_login: Option<String>,
    pub created_at: String,
}

impl From<User> for UserDto {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            phone: user.phone,
            city: user.city,
            avatar: user.avatar,
            is_active: user.is_active,
            last_login: user.last_login,
            created_at: user.created_at,
        }
    }
}

/// Profile detail with the embedded payment history.
#[derive(Debug, Serialize)]
pub struct UserDetailDto {
    #[serde(flatten)]
    pub user: UserDto,
    pub payments: Vec<PaymentDto>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CourseDto {
    pub id: i32,
    pub name: String,
    pub description: Option<String>,
    pub picture: Option<String>,
    pub owner_id: Option<i32>,
    pub updated_at: String,
}

impl From<courses::Model> for CourseDto {
    fn from(model: courses::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            description: model.description,
            picture: model.picture,
            owner_id: model.owner_id,
            updated_at: model.updated_at,
        }
    }
}

/// Course detail with lessons and computed fields.
#[derive(Debug, Serialize)]
pub struct CourseDetailDto {
    #[serde(flatten)]
    pub course: CourseDto,
    pub lessons: Vec<LessonDto>,
    pub count_lessons: u64,
    pub is_subscribed: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct LessonDto {
    pub id: i32,
    pub name: String,
    pub description: Option<String>,
    pub picture: Option<String>,
    pub video_url: Option<String>,
    pub course_id: i32,
    pub owner_id: Option<i32>,
}

impl From<lessons::Model> for LessonDto {
    fn from(model: lessons::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            description: model.description,
            picture: model.picture,
            video_url: model.video_url,
            course_id: model.course_id,
            owner_id: model.owner_id,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PaymentDto {
    pub id: i32,
    pub user_id: i32,
    #[serde(rename = "course_paid")]
    pub course_id: Option<i32>,
    #[serde(rename = "lesson_paid")]
    pub lesson_id: Option<i32>,
    pub amount: f64,
    #[serde(rename = "method_payment")]
    pub method: String,
    pub session_id: Option<String>,
    pub link: Option<String>,
    pub date_payment: String,
}

impl From<payments::Model> for PaymentDto {
    fn from(model: payments::Model) -> Self {
        Self {
            id: model.id,
            user_id: model.user_id,
            course_id: model.course_id,
            lesson_id: model.lesson_id,
            amount: model.amount,
            method: model.method,
            session_id: model.session_id,
            link: model.link,
            date_payment: model.date_payment,
        }
    }
}

// ========== Validation ==========

/// Lesson videos may only link to youtube.com.
pub fn validate_video_url(url: &str) -> Result<(), ApiError> {
    let allowed = url.starts_with("https://www.youtube.com/")
        || url.starts_with("https://youtube.com/")
        || url.starts_with("https://youtu.be/");

    if allowed {
        Ok(())
    } else {
        Err(ApiError::validation(
            "Размещать можно только ссылки на youtube.com",
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_video_url_allows_youtube() {
        assert!(validate_video_url("https://www.youtube.com/watch?v=abc").is_ok());
        assert!(validate_video_url("https://youtu.be/abc").is_ok());
    }

    #[test]
    fn test_video_url_rejects_other_hosts() {
        assert!(validate_video_url("https://vimeo.com/123").is_err());
        assert!(validate_video_url("https://evil.com/?u=youtube.com").is_err());
        assert!(validate_video_url("http://www.youtube.com/watch").is_err());
    }

    #[test]
    fn test_page_query_defaults_and_clamp() {
        let config = PaginationConfig {
            default_page_size: 2,
            max_page_size: 10,
        };

        assert_eq!(PageQuery::default().resolve(&config), (1, 2));

        let query = PageQuery {
            page: Some(3),
            page_size: Some(50),
        };
        assert_eq!(query.resolve(&config), (3, 10));

        let query = PageQuery {
            page: Some(0),
            page_size: Some(0),
        };
        assert_eq!(query.resolve(&config), (1, 1));
    }
}
