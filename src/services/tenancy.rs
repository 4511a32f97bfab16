use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{Room, Tenant};

/// An active tenant occupying a priced room, billed when a period opens.
#[derive(Debug, Clone, PartialEq)]
pub struct BillableTenant {
    pub tenant_id: Uuid,
    pub room_id: Uuid,
    pub price: Decimal,
}

/// Resolves login identities to tenant records and their rooms.
#[async_trait]
pub trait TenancyDirectory: Send + Sync {
    async fn resolve_tenant(&self, user_id: Uuid) -> AppResult<Tenant>;

    async fn find_room(&self, room_id: Uuid) -> AppResult<Option<Room>>;

    async fn billable_tenants(&self) -> AppResult<Vec<BillableTenant>>;
}

pub(crate) fn tenant_not_found() -> AppError {
    AppError::NotFound("Data penghuni tidak ditemukan".to_string())
}

#[derive(Clone)]
pub struct PgTenancyDirectory {
    pool: PgPool,
}

impl PgTenancyDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TenancyDirectory for PgTenancyDirectory {
    async fn resolve_tenant(&self, user_id: Uuid) -> AppResult<Tenant> {
        sqlx::query_as::<_, Tenant>(
            "SELECT * FROM tenants WHERE user_id = $1 ORDER BY created_at DESC LIMIT 1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(tenant_not_found)
    }

    async fn find_room(&self, room_id: Uuid) -> AppResult<Option<Room>> {
        let room = sqlx::query_as::<_, Room>("SELECT * FROM rooms WHERE id = $1")
            .bind(room_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(room)
    }

    async fn billable_tenants(&self) -> AppResult<Vec<BillableTenant>> {
        let rows: Vec<(Uuid, Uuid, Decimal)> = sqlx::query_as(
            r#"
            SELECT t.id, r.id, r.price
            FROM tenants t
            JOIN rooms r ON r.id = t.room_id
            WHERE t.status = 'aktif'
            ORDER BY t.created_at
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(tenant_id, room_id, price)| BillableTenant {
                tenant_id,
                room_id,
                price,
            })
            .collect())
    }
}
