//! In-memory adapters for the ledger collaborators.
//!
//! Used by the test suites and for running the ledger without Postgres or a
//! media host. Each store is a cheap `Clone` handle over shared state.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{Payment, PaymentStatus, ReviewDecision, Room, Tenant};
use crate::services::evidence_store::{Evidence, EvidenceStore};
use crate::services::payment_store::{PaidTransition, PaymentStore};
use crate::services::tenancy::{tenant_not_found, BillableTenant, TenancyDirectory};

/// Minimal PNG signature, enough for format sniffing.
pub const SAMPLE_PNG: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0x0D];
/// Minimal JPEG signature, enough for format sniffing.
pub const SAMPLE_JPEG: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, b'J', b'F', b'I', b'F'];

#[derive(Default, Clone)]
pub struct InMemoryPaymentStore {
    payments: Arc<RwLock<HashMap<Uuid, Payment>>>,
}

impl InMemoryPaymentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds or overwrites a payment.
    pub async fn put(&self, payment: Payment) {
        self.payments.write().await.insert(payment.id, payment);
    }

    pub async fn len(&self) -> usize {
        self.payments.read().await.len()
    }
}

#[async_trait]
impl PaymentStore for InMemoryPaymentStore {
    async fn find(&self, id: Uuid) -> AppResult<Option<Payment>> {
        Ok(self.payments.read().await.get(&id).cloned())
    }

    async fn list_for_tenant(&self, tenant_id: Uuid) -> AppResult<Vec<Payment>> {
        let payments = self.payments.read().await;
        let mut owned: Vec<Payment> = payments
            .values()
            .filter(|p| p.tenant_id == tenant_id)
            .cloned()
            .collect();
        owned.sort_by(|a, b| b.period_key().cmp(&a.period_key()));
        Ok(owned)
    }

    async fn insert_if_absent(&self, payment: &Payment) -> AppResult<bool> {
        let mut payments = self.payments.write().await;
        let exists = payments.values().any(|p| {
            p.tenant_id == payment.tenant_id
                && p.period_year == payment.period_year
                && p.period_month == payment.period_month
                && p.payment_type == payment.payment_type
        });
        if exists {
            return Ok(false);
        }
        payments.insert(payment.id, payment.clone());
        Ok(true)
    }

    async fn mark_paid(
        &self,
        id: Uuid,
        tenant_id: Uuid,
        transition: &PaidTransition,
    ) -> AppResult<Option<Payment>> {
        // check and write under one lock
        let mut payments = self.payments.write().await;
        let Some(payment) = payments.get_mut(&id) else {
            return Ok(None);
        };
        if payment.tenant_id != tenant_id || !payment.status.accepts_submission() {
            return Ok(None);
        }

        payment.status = PaymentStatus::Paid;
        payment.payment_method = Some(transition.method);
        if let Some(reference) = &transition.reference {
            payment.reference = Some(reference.clone());
        }
        payment.notes = transition.notes.clone();
        payment.payment_date = Some(transition.payment_date);
        payment.paid_at = Some(transition.paid_at);
        payment.updated_at = transition.paid_at;

        Ok(Some(payment.clone()))
    }

    async fn review(
        &self,
        id: Uuid,
        decision: &ReviewDecision,
        now: DateTime<Utc>,
    ) -> AppResult<Option<Payment>> {
        let mut payments = self.payments.write().await;
        let Some(payment) = payments.get_mut(&id) else {
            return Ok(None);
        };
        if payment.status != PaymentStatus::Paid {
            return Ok(None);
        }

        match decision {
            ReviewDecision::Confirm => payment.status = PaymentStatus::Confirmed,
            ReviewDecision::Reject { reason } => {
                payment.status = PaymentStatus::Rejected;
                payment.notes = Some(reason.clone());
            }
        }
        payment.updated_at = now;

        Ok(Some(payment.clone()))
    }

    async fn list_needing_reminder(
        &self,
        today: NaiveDate,
        offset: FixedOffset,
    ) -> AppResult<Vec<Payment>> {
        let payments = self.payments.read().await;
        let mut due: Vec<Payment> = payments
            .values()
            .filter(|p| p.needs_reminder(today, offset))
            .cloned()
            .collect();
        due.sort_by_key(|p| (p.due_date, p.id));
        Ok(due)
    }

    async fn mark_notified(&self, id: Uuid, now: DateTime<Utc>) -> AppResult<Option<Payment>> {
        let mut payments = self.payments.write().await;
        Ok(payments.get_mut(&id).map(|payment| {
            payment.last_notified_at = Some(now);
            payment.updated_at = now;
            payment.clone()
        }))
    }
}

#[derive(Default, Clone)]
pub struct InMemoryTenancyDirectory {
    tenants: Arc<RwLock<HashMap<Uuid, Tenant>>>,
    rooms: Arc<RwLock<HashMap<Uuid, Room>>>,
}

impl InMemoryTenancyDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_tenant(&self, tenant: Tenant) {
        self.tenants.write().await.insert(tenant.id, tenant);
    }

    pub async fn add_room(&self, room: Room) {
        self.rooms.write().await.insert(room.id, room);
    }
}

#[async_trait]
impl TenancyDirectory for InMemoryTenancyDirectory {
    async fn resolve_tenant(&self, user_id: Uuid) -> AppResult<Tenant> {
        self.tenants
            .read()
            .await
            .values()
            .find(|t| t.user_id == Some(user_id))
            .cloned()
            .ok_or_else(tenant_not_found)
    }

    async fn find_room(&self, room_id: Uuid) -> AppResult<Option<Room>> {
        Ok(self.rooms.read().await.get(&room_id).cloned())
    }

    async fn billable_tenants(&self) -> AppResult<Vec<BillableTenant>> {
        let tenants = self.tenants.read().await;
        let rooms = self.rooms.read().await;

        let mut billable: Vec<BillableTenant> = tenants
            .values()
            .filter(|t| t.is_active())
            .filter_map(|t| {
                let room = rooms.get(&t.room_id?)?;
                Some(BillableTenant {
                    tenant_id: t.id,
                    room_id: room.id,
                    price: room.price,
                })
            })
            .collect();
        billable.sort_by_key(|b| b.tenant_id);
        Ok(billable)
    }
}

/// Keeps uploaded objects in memory under `https://memory.local/<folder>/<uuid>` URLs.
#[derive(Default, Clone)]
pub struct InMemoryEvidenceStore {
    objects: Arc<RwLock<HashMap<String, Vec<u8>>>>,
    fail_uploads: Arc<AtomicBool>,
}

impl InMemoryEvidenceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every following upload fail with `AppError::Upload`.
    pub fn fail_uploads(&self, fail: bool) {
        self.fail_uploads.store(fail, Ordering::SeqCst);
    }

    pub async fn contains(&self, url: &str) -> bool {
        self.objects.read().await.contains_key(url)
    }

    pub async fn len(&self) -> usize {
        self.objects.read().await.len()
    }
}

#[async_trait]
impl EvidenceStore for InMemoryEvidenceStore {
    async fn store(&self, evidence: Evidence, folder: &str) -> AppResult<String> {
        if self.fail_uploads.load(Ordering::SeqCst) {
            return Err(AppError::Upload("media host unavailable".to_string()));
        }

        let url = format!("https://memory.local/{}/{}", folder, Uuid::new_v4());
        self.objects.write().await.insert(url.clone(), evidence.data);
        Ok(url)
    }

    async fn delete(&self, url: &str) -> AppResult<()> {
        match self.objects.write().await.remove(url) {
            Some(_) => Ok(()),
            None => Err(AppError::Delete(format!("no such object: {}", url))),
        }
    }
}
