//! `SeaORM` implementation of the `PaymentService` trait.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{error, info};

use crate::clients::PaymentGateway;
use crate::db::Store;
use crate::entities::payments;
use crate::services::payment_service::{NewPayment, PaymentError, PaymentService};

pub struct SeaOrmPaymentService {
    store: Store,
    gateway: Arc<dyn PaymentGateway>,
}

impl SeaOrmPaymentService {
    #[must_use]
    pub fn new(store: Store, gateway: Arc<dyn PaymentGateway>) -> Self {
        Self { store, gateway }
    }

    /// Resolve the paid-for item to its display name, checking existence
    /// before anything is written.
    async fn resolve_target(&self, input: &NewPayment) -> Result<String, PaymentError> {
        match (input.course_id, input.lesson_id) {
            (Some(course_id), None) => {
                let course = self
                    .store
                    .get_course(course_id)
                    .await?
                    .ok_or(PaymentError::TargetNotFound("Курс"))?;
                Ok(course.name)
            }
            (None, Some(lesson_id)) => {
                let lesson = self
                    .store
                    .get_lesson(lesson_id)
                    .await?
                    .ok_or(PaymentError::TargetNotFound("Урок"))?;
                Ok(lesson.name)
            }
            _ => Err(PaymentError::Validation(
                "Укажите либо course_id, либо lesson_id".to_string(),
            )),
        }
    }
}

#[async_trait]
impl PaymentService for SeaOrmPaymentService {
    async fn create(
        &self,
        user_id: i32,
        input: NewPayment,
    ) -> Result<payments::Model, PaymentError> {
        if input.amount <= 0.0 || !input.amount.is_finite() {
            return Err(PaymentError::Validation(
                "Сумма должна быть положительной".to_string(),
            ));
        }

        let product_name = self.resolve_target(&input).await?;

        let payment = self
            .store
            .add_pending_payment(
                user_id,
                input.course_id,
                input.lesson_id,
                input.amount,
                input.method.as_str(),
            )
            .await?;

        let session = match self
            .gateway
            .create_checkout(&product_name, input.amount)
            .await
        {
            Ok(session) => session,
            Err(err) => {
                // The pending row stays for reconciliation.
                error!("Checkout session failed for payment {}: {err}", payment.id);
                return Err(PaymentError::Gateway(err.to_string()));
            }
        };

        let payment = self
            .store
            .set_payment_session(payment.id, &session.session_id, &session.payment_link)
            .await?;

        info!(
            "Payment {} recorded ({} {})",
            payment.id, payment.amount, payment.method
        );

        Ok(payment)
    }
}
