//! Domain service for the subscription toggle.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SubscriptionError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Course not found")]
    CourseNotFound,

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<sea_orm::DbErr> for SubscriptionError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<anyhow::Error> for SubscriptionError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

#[async_trait::async_trait]
pub trait SubscriptionService: Send + Sync {
    /// Flip the (user, course) subscription: delete the row if it exists,
    /// insert it otherwise. Returns the status message for the response.
    ///
    /// # Errors
    ///
    /// Returns [`SubscriptionError::CourseNotFound`] for an unknown course.
    async fn toggle(&self, user_id: i32, course_id: i32) -> Result<String, SubscriptionError>;
}
