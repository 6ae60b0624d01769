//! Domain service for recording payments and opening checkout sessions.

use std::fmt;

use thiserror::Error;

use crate::entities::payments;

#[derive(Debug, Error)]
pub enum PaymentError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("{0} not found")]
    TargetNotFound(&'static str),

    #[error("Payment gateway error: {0}")]
    Gateway(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<sea_orm::DbErr> for PaymentError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<anyhow::Error> for PaymentError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentMethod {
    Cash,
    Transfer,
    Stripe,
}

impl PaymentMethod {
    pub fn parse(raw: &str) -> Result<Self, PaymentError> {
        match raw {
            "cash" => Ok(Self::Cash),
            "transfer" => Ok(Self::Transfer),
            "stripe" => Ok(Self::Stripe),
            other => Err(PaymentError::Validation(format!(
                "Неизвестный способ оплаты: {other}"
            ))),
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Cash => "cash",
            Self::Transfer => "transfer",
            Self::Stripe => "stripe",
        }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Input for a new payment. Exactly one of `course_id` / `lesson_id`
/// must be set.
#[derive(Debug, Clone)]
pub struct NewPayment {
    pub course_id: Option<i32>,
    pub lesson_id: Option<i32>,
    pub amount: f64,
    pub method: PaymentMethod,
}

#[async_trait::async_trait]
pub trait PaymentService: Send + Sync {
    /// Validate the request, persist the payment and open a checkout
    /// session for it. The row is written before the gateway call, so a
    /// gateway failure leaves a payment without session references.
    ///
    /// # Errors
    ///
    /// Returns [`PaymentError::Validation`] for malformed input,
    /// [`PaymentError::TargetNotFound`] for an unknown course/lesson and
    /// [`PaymentError::Gateway`] when the provider rejects the session.
    async fn create(&self, user_id: i32, input: NewPayment)
    -> Result<payments::Model, PaymentError>;
}
