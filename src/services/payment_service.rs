use std::sync::Arc;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{
    BillingPeriod, Payment, PaymentMethod, PaymentStatus, PaymentType, PaymentView,
    ReviewDecision, Tenant,
};
use crate::services::evidence_store::{
    Evidence, EvidenceStore, MAX_EVIDENCE_SIZE, PAYMENT_PROOF_FOLDER,
};
use crate::services::ledger::{self, LedgerClock};
use crate::services::payment_store::{PaidTransition, PaymentStore};
use crate::services::tenancy::TenancyDirectory;
use crate::utils::validators::{normalize_notes, validate_notes, MAX_NOTES_LEN};

/// What a tenant sends when reporting that a payment was made.
#[derive(Debug, Clone)]
pub struct EvidenceSubmission {
    pub method: PaymentMethod,
    pub evidence: Option<Evidence>,
    pub notes: Option<String>,
}

/// Owns the payment state machine on top of the store and media collaborators.
#[derive(Clone)]
pub struct PaymentLedger {
    payments: Arc<dyn PaymentStore>,
    tenancy: Arc<dyn TenancyDirectory>,
    evidence: Arc<dyn EvidenceStore>,
}

impl PaymentLedger {
    pub fn new(
        payments: Arc<dyn PaymentStore>,
        tenancy: Arc<dyn TenancyDirectory>,
        evidence: Arc<dyn EvidenceStore>,
    ) -> Self {
        Self {
            payments,
            tenancy,
            evidence,
        }
    }

    pub fn tenancy(&self) -> &dyn TenancyDirectory {
        self.tenancy.as_ref()
    }

    pub fn evidence_store(&self) -> &dyn EvidenceStore {
        self.evidence.as_ref()
    }

    /// Moves a pending or rejected payment to `paid`.
    ///
    /// Evidence, when given, is uploaded before anything is written; an upload
    /// failure leaves the payment untouched.
    pub async fn submit_evidence(
        &self,
        tenant: &Tenant,
        payment_id: Uuid,
        submission: EvidenceSubmission,
        clock: LedgerClock,
    ) -> AppResult<Payment> {
        if !validate_notes(submission.notes.as_deref()) {
            return Err(AppError::Validation(format!(
                "Catatan maksimal {} karakter",
                MAX_NOTES_LEN
            )));
        }
        if let Some(evidence) = &submission.evidence {
            evidence.validate_image(MAX_EVIDENCE_SIZE)?;
        }

        let payment = self
            .payments
            .find(payment_id)
            .await?
            .ok_or_else(payment_not_found)?;

        if payment.tenant_id != tenant.id {
            tracing::warn!(
                payment_id = %payment_id,
                tenant_id = %tenant.id,
                "Tenant tried to submit evidence for another tenant's payment"
            );
            return Err(AppError::Forbidden);
        }
        if !payment.status.accepts_submission() {
            return Err(already_in_review());
        }

        let reference = match submission.evidence {
            Some(evidence) => Some(self.evidence.store(evidence, PAYMENT_PROOF_FOLDER).await?),
            None => None,
        };

        let transition = PaidTransition {
            method: submission.method,
            reference: reference.clone(),
            notes: normalize_notes(submission.notes.as_deref()),
            payment_date: clock.today,
            paid_at: clock.now,
        };

        match self
            .payments
            .mark_paid(payment_id, tenant.id, &transition)
            .await
        {
            Ok(Some(updated)) => {
                tracing::info!(
                    payment_id = %updated.id,
                    method = ?updated.payment_method,
                    with_evidence = reference.is_some(),
                    "Payment submitted for review"
                );
                Ok(updated)
            }
            Ok(None) => {
                // lost a race with a concurrent submission
                self.discard_upload(reference.as_deref()).await;
                Err(already_in_review())
            }
            Err(e) => {
                self.discard_upload(reference.as_deref()).await;
                Err(e)
            }
        }
    }

    async fn discard_upload(&self, url: Option<&str>) {
        if let Some(url) = url {
            if let Err(e) = self.evidence.delete(url).await {
                tracing::warn!(url = %url, error = %e, "Failed to delete orphaned evidence");
            }
        }
    }

    pub async fn list_for_tenant(
        &self,
        tenant: &Tenant,
        clock: LedgerClock,
    ) -> AppResult<Vec<PaymentView>> {
        let payments = self.payments.list_for_tenant(tenant.id).await?;
        Ok(ledger::build_ledger(&payments, clock.today))
    }

    pub async fn history_for_tenant(&self, tenant_id: Uuid) -> AppResult<Vec<Payment>> {
        self.payments.list_for_tenant(tenant_id).await
    }

    /// Admin decision on a payment waiting for approval.
    pub async fn review(
        &self,
        payment_id: Uuid,
        decision: ReviewDecision,
        clock: LedgerClock,
    ) -> AppResult<Payment> {
        let decision = match decision {
            ReviewDecision::Reject { reason } => {
                let reason = reason.trim().to_string();
                if reason.is_empty() {
                    return Err(AppError::Validation(
                        "Alasan penolakan wajib diisi".to_string(),
                    ));
                }
                if reason.chars().count() > MAX_NOTES_LEN {
                    return Err(AppError::Validation(format!(
                        "Alasan penolakan maksimal {} karakter",
                        MAX_NOTES_LEN
                    )));
                }
                ReviewDecision::Reject { reason }
            }
            confirm => confirm,
        };

        let payment = self
            .payments
            .find(payment_id)
            .await?
            .ok_or_else(payment_not_found)?;

        if payment.status != PaymentStatus::Paid {
            return Err(not_waiting_for_review());
        }

        let updated = self
            .payments
            .review(payment_id, &decision, clock.now)
            .await?
            .ok_or_else(not_waiting_for_review)?;

        tracing::info!(payment_id = %updated.id, status = ?updated.status, "Payment reviewed");
        Ok(updated)
    }

    /// Creates a pending rent payment for every billable tenant. Safe to repeat.
    pub async fn open_period(&self, period: BillingPeriod, now: DateTime<Utc>) -> AppResult<u64> {
        let billable = self.tenancy.billable_tenants().await?;
        let mut created = 0;

        for entry in billable {
            let payment = Payment::new_pending(
                entry.tenant_id,
                Some(entry.room_id),
                PaymentType::Rent,
                entry.price,
                period,
                now,
            )?;
            if self.payments.insert_if_absent(&payment).await? {
                created += 1;
            }
        }

        tracing::info!(period = %period, created, "Billing period opened");
        Ok(created)
    }

    pub async fn reminders(&self, clock: LedgerClock) -> AppResult<Vec<Payment>> {
        self.payments
            .list_needing_reminder(clock.today, clock.offset)
            .await
    }

    pub async fn mark_notified(&self, payment_id: Uuid, clock: LedgerClock) -> AppResult<Payment> {
        self.payments
            .mark_notified(payment_id, clock.now)
            .await?
            .ok_or_else(payment_not_found)
    }
}

fn payment_not_found() -> AppError {
    AppError::NotFound("Tagihan tidak ditemukan".to_string())
}

fn already_in_review() -> AppError {
    AppError::InvalidTransition("Pembayaran sudah dikonfirmasi atau sedang ditinjau".to_string())
}

fn not_waiting_for_review() -> AppError {
    AppError::InvalidTransition("Pembayaran tidak sedang menunggu konfirmasi".to_string())
}
