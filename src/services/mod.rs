pub mod auth_service;
pub mod evidence_store;
pub mod ledger;
pub mod memory;
pub mod payment_service;
pub mod payment_store;
pub mod tenancy;

pub use auth_service::AuthService;
pub use evidence_store::{Evidence, EvidenceStore, S3EvidenceStore};
pub use ledger::LedgerClock;
pub use payment_service::{EvidenceSubmission, PaymentLedger};
pub use payment_store::{PaymentStore, PgPaymentStore};
pub use tenancy::{PgTenancyDirectory, TenancyDirectory};
