use std::sync::Arc;

use axum::{
    Extension, Json,
    extract::{Query, State},
    http::StatusCode,
};

use crate::api::auth::CurrentUser;
use crate::api::{ApiError, AppState, PaymentCreateRequest, PaymentDto, PaymentListQuery};
use crate::db::PaymentFilter;
use crate::services::{NewPayment, PaymentMethod};

pub async fn create_payment(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
    Json(request): Json<PaymentCreateRequest>,
) -> Result<(StatusCode, Json<PaymentDto>), ApiError> {
    let method = PaymentMethod::parse(&request.method)?;

    let payment = state
        .shared
        .payment_service
        .create(
            current.id,
            NewPayment {
                course_id: request.course_id,
                lesson_id: request.lesson_id,
                amount: request.amount,
                method,
            },
        )
        .await?;

    Ok((StatusCode::CREATED, Json(PaymentDto::from(payment))))
}

/// Payment history, newest first. Moderators see every payment, other
/// callers only their own.
pub async fn list_payments(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
    Query(query): Query<PaymentListQuery>,
) -> Result<Json<Vec<PaymentDto>>, ApiError> {
    let filter = PaymentFilter {
        course_id: query.course_id,
        lesson_id: query.lesson_id,
        method: query.method,
        user_id: (!current.is_moderator).then_some(current.id),
    };

    let payments = state.store().list_payments(filter).await?;
    Ok(Json(payments.into_iter().map(PaymentDto::from).collect()))
}
