use anyhow::Result;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};

use crate::entities::payments;

pub struct PaymentRepository {
    conn: DatabaseConnection,
}

/// Optional filters for the payment list endpoint.
#[derive(Debug, Clone, Default)]
pub struct PaymentFilter {
    pub course_id: Option<i32>,
    pub lesson_id: Option<i32>,
    pub method: Option<String>,
    pub user_id: Option<i32>,
}

impl PaymentRepository {
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    /// Persist a pending payment: session id and link stay empty until the
    /// gateway flow completes.
    pub async fn create_pending(
        &self,
        user_id: i32,
        course_id: Option<i32>,
        lesson_id: Option<i32>,
        amount: f64,
        method: &str,
    ) -> Result<payments::Model> {
        let active_model = payments::ActiveModel {
            user_id: Set(user_id),
            course_id: Set(course_id),
            lesson_id: Set(lesson_id),
            amount: Set(amount),
            method: Set(method.to_string()),
            session_id: Set(None),
            link: Set(None),
            date_payment: Set(chrono::Utc::now().to_rfc3339()),
            ..Default::default()
        };

        Ok(active_model.insert(&self.conn).await?)
    }

    /// Record the external references once the checkout session exists.
    pub async fn set_session(
        &self,
        payment_id: i32,
        session_id: &str,
        link: &str,
    ) -> Result<payments::Model> {
        let payment = payments::Entity::find_by_id(payment_id)
            .one(&self.conn)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Payment {payment_id} not found"))?;

        let mut active: payments::ActiveModel = payment.into();
        active.session_id = Set(Some(session_id.to_string()));
        active.link = Set(Some(link.to_string()));

        Ok(active.update(&self.conn).await?)
    }

    /// Newest first, optionally filtered by course, lesson, method or user.
    pub async fn list(&self, filter: PaymentFilter) -> Result<Vec<payments::Model>> {
        let mut query =
            payments::Entity::find().order_by_desc(payments::Column::DatePayment);

        if let Some(course_id) = filter.course_id {
            query = query.filter(payments::Column::CourseId.eq(course_id));
        }
        if let Some(lesson_id) = filter.lesson_id {
            query = query.filter(payments::Column::LessonId.eq(lesson_id));
        }
        if let Some(method) = filter.method {
            query = query.filter(payments::Column::Method.eq(method));
        }
        if let Some(user_id) = filter.user_id {
            query = query.filter(payments::Column::UserId.eq(user_id));
        }

        Ok(query.all(&self.conn).await?)
    }

    pub async fn for_user(&self, user_id: i32) -> Result<Vec<payments::Model>> {
        let rows = payments::Entity::find()
            .filter(payments::Column::UserId.eq(user_id))
            .order_by_desc(payments::Column::DatePayment)
            .all(&self.conn)
            .await?;

        Ok(rows)
    }
}
