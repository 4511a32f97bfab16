use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::AppResult;
use crate::models::{Payment, PaymentMethod, ReviewDecision};

/// Fields written when a tenant's submission moves a payment to `paid`.
#[derive(Debug, Clone, PartialEq)]
pub struct PaidTransition {
    pub method: PaymentMethod,
    /// `None` keeps whatever reference the payment already has.
    pub reference: Option<String>,
    pub notes: Option<String>,
    pub payment_date: NaiveDate,
    pub paid_at: DateTime<Utc>,
}

/// Persistence for payments.
///
/// Transitions are conditional updates: they apply only while the stored status
/// still allows them and return `None` otherwise, so callers never need a
/// separate read-then-write.
#[async_trait]
pub trait PaymentStore: Send + Sync {
    async fn find(&self, id: Uuid) -> AppResult<Option<Payment>>;

    async fn list_for_tenant(&self, tenant_id: Uuid) -> AppResult<Vec<Payment>>;

    /// Inserts the payment unless one already exists for the same tenant, period and type.
    async fn insert_if_absent(&self, payment: &Payment) -> AppResult<bool>;

    /// pending/rejected → paid, scoped to the owning tenant.
    async fn mark_paid(
        &self,
        id: Uuid,
        tenant_id: Uuid,
        transition: &PaidTransition,
    ) -> AppResult<Option<Payment>>;

    /// paid → confirmed/rejected.
    async fn review(
        &self,
        id: Uuid,
        decision: &ReviewDecision,
        now: DateTime<Utc>,
    ) -> AppResult<Option<Payment>>;

    /// Payments due a reminder on business date `today`; `offset` is that
    /// date's timezone.
    async fn list_needing_reminder(
        &self,
        today: NaiveDate,
        offset: FixedOffset,
    ) -> AppResult<Vec<Payment>>;

    async fn mark_notified(&self, id: Uuid, now: DateTime<Utc>) -> AppResult<Option<Payment>>;
}

#[derive(Clone)]
pub struct PgPaymentStore {
    pool: PgPool,
}

impl PgPaymentStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PaymentStore for PgPaymentStore {
    async fn find(&self, id: Uuid) -> AppResult<Option<Payment>> {
        let payment = sqlx::query_as::<_, Payment>("SELECT * FROM payments WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(payment)
    }

    async fn list_for_tenant(&self, tenant_id: Uuid) -> AppResult<Vec<Payment>> {
        let payments = sqlx::query_as::<_, Payment>(
            r#"
            SELECT * FROM payments
            WHERE tenant_id = $1
            ORDER BY period_year DESC, period_month DESC, id DESC
            "#,
        )
        .bind(tenant_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(payments)
    }

    async fn insert_if_absent(&self, payment: &Payment) -> AppResult<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO payments (
                id, tenant_id, room_id, payment_type, amount, due_date,
                status, period_month, period_year, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            ON CONFLICT (tenant_id, period_year, period_month, payment_type) DO NOTHING
            "#,
        )
        .bind(payment.id)
        .bind(payment.tenant_id)
        .bind(payment.room_id)
        .bind(payment.payment_type)
        .bind(payment.amount)
        .bind(payment.due_date)
        .bind(payment.status)
        .bind(payment.period_month)
        .bind(payment.period_year)
        .bind(payment.created_at)
        .bind(payment.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn mark_paid(
        &self,
        id: Uuid,
        tenant_id: Uuid,
        transition: &PaidTransition,
    ) -> AppResult<Option<Payment>> {
        // legacy 'overdue' rows are treated as pending
        let payment = sqlx::query_as::<_, Payment>(
            r#"
            UPDATE payments SET
                status = 'paid',
                payment_method = $3,
                reference = COALESCE($4, reference),
                notes = $5,
                payment_date = $6,
                paid_at = $7,
                updated_at = $7
            WHERE id = $1
              AND tenant_id = $2
              AND status IN ('pending', 'rejected', 'overdue')
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(tenant_id)
        .bind(transition.method)
        .bind(&transition.reference)
        .bind(&transition.notes)
        .bind(transition.payment_date)
        .bind(transition.paid_at)
        .fetch_optional(&self.pool)
        .await?;

        Ok(payment)
    }

    async fn review(
        &self,
        id: Uuid,
        decision: &ReviewDecision,
        now: DateTime<Utc>,
    ) -> AppResult<Option<Payment>> {
        let payment = match decision {
            ReviewDecision::Confirm => {
                sqlx::query_as::<_, Payment>(
                    r#"
                    UPDATE payments SET status = 'confirmed', updated_at = $2
                    WHERE id = $1 AND status = 'paid'
                    RETURNING *
                    "#,
                )
                .bind(id)
                .bind(now)
                .fetch_optional(&self.pool)
                .await?
            }
            ReviewDecision::Reject { reason } => {
                sqlx::query_as::<_, Payment>(
                    r#"
                    UPDATE payments SET status = 'rejected', notes = $2, updated_at = $3
                    WHERE id = $1 AND status = 'paid'
                    RETURNING *
                    "#,
                )
                .bind(id)
                .bind(reason)
                .bind(now)
                .fetch_optional(&self.pool)
                .await?
            }
        };

        Ok(payment)
    }

    async fn list_needing_reminder(
        &self,
        today: NaiveDate,
        offset: FixedOffset,
    ) -> AppResult<Vec<Payment>> {
        // last_notified_at is compared on its business date, not the session's
        let payments = sqlx::query_as::<_, Payment>(
            r#"
            SELECT * FROM payments
            WHERE status IN ('pending', 'overdue')
              AND due_date <= $1
              AND (
                last_notified_at IS NULL
                OR ((last_notified_at AT TIME ZONE 'UTC') + make_interval(secs => $2))::date < $1
              )
            ORDER BY due_date, id
            "#,
        )
        .bind(today)
        .bind(f64::from(offset.local_minus_utc()))
        .fetch_all(&self.pool)
        .await?;

        Ok(payments)
    }

    async fn mark_notified(&self, id: Uuid, now: DateTime<Utc>) -> AppResult<Option<Payment>> {
        let payment = sqlx::query_as::<_, Payment>(
            "UPDATE payments SET last_notified_at = $2, updated_at = $2 WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;

        Ok(payment)
    }
}
