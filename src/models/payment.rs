use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::error::{AppError, AppResult};

const MONTH_NAMES: [&str; 12] = [
    "Januari",
    "Februari",
    "Maret",
    "April",
    "Mei",
    "Juni",
    "Juli",
    "Agustus",
    "September",
    "Oktober",
    "November",
    "Desember",
];

/// Stored workflow status of a payment.
///
/// `Overdue` only exists so that legacy rows still decode. It is never written;
/// overdue is derived from the due date, see [`Payment::is_overdue`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, Hash, ToSchema)]
#[sqlx(type_name = "payment_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Paid,
    Confirmed,
    Rejected,
    Overdue,
}

impl Default for PaymentStatus {
    fn default() -> Self {
        Self::Pending
    }
}

impl PaymentStatus {
    pub fn normalized(self) -> Self {
        match self {
            Self::Overdue => Self::Pending,
            other => other,
        }
    }

    /// Whether the tenant may (re)submit evidence from this status.
    pub fn accepts_submission(self) -> bool {
        matches!(self.normalized(), Self::Pending | Self::Rejected)
    }

    /// Paid and confirmed payments are never overdue.
    pub fn is_settled(self) -> bool {
        matches!(self, Self::Paid | Self::Confirmed)
    }

    pub fn display(self) -> DisplayStatus {
        match self.normalized() {
            Self::Pending | Self::Overdue => DisplayStatus::Pending,
            Self::Paid => DisplayStatus::Paid,
            Self::Confirmed => DisplayStatus::Confirmed,
            Self::Rejected => DisplayStatus::Rejected,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum StatusColor {
    Yellow,
    Blue,
    Green,
    Red,
}

/// Status as shown to people. `Overdue` is a derived view, never stored.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum DisplayStatus {
    Pending,
    Paid,
    Confirmed,
    Rejected,
    Overdue,
}

impl DisplayStatus {
    pub fn label(self) -> &'static str {
        match self {
            Self::Pending => "Belum Bayar",
            Self::Paid => "Menunggu Konfirmasi",
            Self::Confirmed => "Lunas",
            Self::Rejected => "Ditolak",
            Self::Overdue => "Terlambat",
        }
    }

    pub fn color(self) -> StatusColor {
        match self {
            Self::Pending => StatusColor::Yellow,
            Self::Paid => StatusColor::Blue,
            Self::Confirmed => StatusColor::Green,
            Self::Rejected | Self::Overdue => StatusColor::Red,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, ToSchema)]
#[sqlx(type_name = "payment_method", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    Transfer,
    Qris,
}

impl FromStr for PaymentMethod {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "cash" => Ok(Self::Cash),
            "transfer" => Ok(Self::Transfer),
            "qris" => Ok(Self::Qris),
            other => Err(AppError::Validation(format!(
                "Metode pembayaran tidak dikenal: {}",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, ToSchema)]
#[sqlx(type_name = "payment_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PaymentType {
    Rent,
    Deposit,
    Utilities,
    Maintenance,
    Other,
}

impl Default for PaymentType {
    fn default() -> Self {
        Self::Rent
    }
}

impl PaymentType {
    pub fn label(self) -> &'static str {
        match self {
            Self::Rent => "Sewa Bulanan",
            Self::Deposit => "Deposit",
            Self::Utilities => "Utilitas",
            Self::Maintenance => "Maintenance",
            Self::Other => "Lainnya",
        }
    }
}

/// A (year, month) billing cycle. Orders by year, then month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BillingPeriod {
    year: i32,
    month: u32,
}

impl BillingPeriod {
    pub fn new(year: i32, month: u32) -> AppResult<Self> {
        if !(1..=12).contains(&month) {
            return Err(AppError::Validation(format!(
                "Bulan harus antara 1 dan 12, diterima {}",
                month
            )));
        }
        if NaiveDate::from_ymd_opt(year, month, 1).is_none() {
            return Err(AppError::Validation(format!("Tahun tidak valid: {}", year)));
        }
        Ok(Self { year, month })
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    /// Last calendar day of the month.
    pub fn due_date(&self) -> NaiveDate {
        let (next_year, next_month) = if self.month == 12 {
            (self.year + 1, 1)
        } else {
            (self.year, self.month + 1)
        };

        NaiveDate::from_ymd_opt(next_year, next_month, 1)
            .and_then(|first| first.pred_opt())
            .unwrap_or(NaiveDate::MAX)
    }

    pub fn name(&self) -> String {
        format!("{} {}", MONTH_NAMES[(self.month - 1) as usize], self.year)
    }
}

impl fmt::Display for BillingPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema, PartialEq)]
pub struct Payment {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub room_id: Option<Uuid>,
    pub payment_type: PaymentType,
    pub amount: Decimal,
    pub due_date: NaiveDate,
    pub payment_date: Option<NaiveDate>,
    pub status: PaymentStatus,
    pub payment_method: Option<PaymentMethod>,
    pub reference: Option<String>,
    pub notes: Option<String>,
    pub period_month: i32,
    pub period_year: i32,
    pub paid_at: Option<DateTime<Utc>>,
    pub last_notified_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Payment {
    /// A freshly opened, unpaid billing record.
    pub fn new_pending(
        tenant_id: Uuid,
        room_id: Option<Uuid>,
        payment_type: PaymentType,
        amount: Decimal,
        period: BillingPeriod,
        now: DateTime<Utc>,
    ) -> AppResult<Self> {
        if amount < Decimal::ZERO {
            return Err(AppError::Validation(
                "Jumlah pembayaran tidak boleh negatif".to_string(),
            ));
        }

        Ok(Self {
            id: Uuid::new_v4(),
            tenant_id,
            room_id,
            payment_type,
            amount,
            due_date: period.due_date(),
            payment_date: None,
            status: PaymentStatus::Pending,
            payment_method: None,
            reference: None,
            notes: None,
            period_month: period.month() as i32,
            period_year: period.year(),
            paid_at: None,
            last_notified_at: None,
            created_at: now,
            updated_at: now,
        })
    }

    /// Sort key for the ledger: period first, id as a tie-break so the order is total.
    pub fn period_key(&self) -> (i32, i32, Uuid) {
        (self.period_year, self.period_month, self.id)
    }

    pub fn period_name(&self) -> String {
        u32::try_from(self.period_month)
            .ok()
            .and_then(|month| BillingPeriod::new(self.period_year, month).ok())
            .map(|period| period.name())
            .unwrap_or_else(|| "-".to_string())
    }

    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        !self.status.is_settled() && self.due_date < today
    }

    /// A reminder goes out once per business day for unpaid payments that
    /// reached their due date. `offset` is the business timezone `today` is in.
    pub fn needs_reminder(&self, today: NaiveDate, offset: FixedOffset) -> bool {
        self.status.normalized() == PaymentStatus::Pending
            && self.due_date <= today
            && self
                .last_notified_at
                .map_or(true, |notified| notified.with_timezone(&offset).date_naive() < today)
    }
}

/// Ledger row as consumed by the tenant payment page.
#[derive(Debug, Clone, Serialize, ToSchema, PartialEq)]
pub struct PaymentView {
    pub id: Uuid,
    pub payment_type: PaymentType,
    pub payment_type_label: String,
    pub amount: Decimal,
    pub due_date: NaiveDate,
    pub payment_date: Option<NaiveDate>,
    pub status: PaymentStatus,
    pub status_label: String,
    pub status_color: StatusColor,
    /// Like `status_label`, but "Terlambat" once the payment is overdue.
    pub display_label: String,
    pub display_color: StatusColor,
    pub payment_method: Option<PaymentMethod>,
    pub reference: Option<String>,
    pub has_proof_image: bool,
    pub notes: Option<String>,
    pub period: String,
    pub period_year: i32,
    pub period_month: i32,
    pub is_overdue: bool,
}

#[derive(Debug, Clone, Copy, Default, Serialize, ToSchema, PartialEq, Eq)]
pub struct PaymentStats {
    pub total: usize,
    pub pending: usize,
    pub waiting_approval: usize,
    pub confirmed: usize,
    pub overdue: usize,
}

#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum StatusFilter {
    #[default]
    All,
    Pending,
    Paid,
    Confirmed,
}

#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct LedgerQuery {
    pub status: Option<StatusFilter>,
    pub sort: Option<SortOrder>,
    pub page: Option<usize>,
    pub per_page: Option<usize>,
}

#[derive(Debug, Clone, Copy, Serialize, ToSchema, PartialEq, Eq)]
pub struct Pagination {
    pub page: usize,
    pub per_page: usize,
    pub total_items: usize,
    pub total_pages: usize,
}

/// Admin decision on a submitted payment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReviewDecision {
    Confirm,
    Reject { reason: String },
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct RejectPaymentRequest {
    pub reason: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct OpenPeriodRequest {
    pub year: i32,
    pub month: u32,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OpenPeriodResponse {
    pub period: String,
    pub due_date: NaiveDate,
    pub created: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, TimeZone};
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn wib() -> FixedOffset {
        FixedOffset::east_opt(7 * 3600).unwrap()
    }

    fn payment(status: PaymentStatus, due: NaiveDate) -> Payment {
        let mut p = Payment::new_pending(
            Uuid::new_v4(),
            None,
            PaymentType::Rent,
            dec!(750000),
            BillingPeriod::new(due.year(), due.month()).unwrap(),
            Utc::now(),
        )
        .unwrap();
        p.status = status;
        p
    }

    #[test]
    fn test_due_date_is_end_of_month() {
        assert_eq!(BillingPeriod::new(2025, 1).unwrap().due_date(), date(2025, 1, 31));
        assert_eq!(BillingPeriod::new(2024, 2).unwrap().due_date(), date(2024, 2, 29));
        assert_eq!(BillingPeriod::new(2025, 2).unwrap().due_date(), date(2025, 2, 28));
        assert_eq!(BillingPeriod::new(2024, 12).unwrap().due_date(), date(2024, 12, 31));
        assert_eq!(BillingPeriod::new(2025, 4).unwrap().due_date(), date(2025, 4, 30));
    }

    #[test]
    fn test_period_validation() {
        assert!(matches!(BillingPeriod::new(2025, 0), Err(AppError::Validation(_))));
        assert!(matches!(BillingPeriod::new(2025, 13), Err(AppError::Validation(_))));
    }

    #[test]
    fn test_period_ordering_and_name() {
        let dec_2024 = BillingPeriod::new(2024, 12).unwrap();
        let jan_2025 = BillingPeriod::new(2025, 1).unwrap();
        assert!(dec_2024 < jan_2025);
        assert_eq!(jan_2025.name(), "Januari 2025");
        assert_eq!(dec_2024.to_string(), "2024-12");
    }

    #[test]
    fn test_status_labels_and_colors() {
        let cases = [
            (PaymentStatus::Pending, "Belum Bayar", StatusColor::Yellow),
            (PaymentStatus::Paid, "Menunggu Konfirmasi", StatusColor::Blue),
            (PaymentStatus::Confirmed, "Lunas", StatusColor::Green),
            (PaymentStatus::Rejected, "Ditolak", StatusColor::Red),
        ];
        for (status, label, color) in cases {
            assert_eq!(status.display().label(), label);
            assert_eq!(status.display().color(), color);
        }
        assert_eq!(DisplayStatus::Overdue.color(), StatusColor::Red);
    }

    #[test]
    fn test_legacy_overdue_is_recomputed() {
        assert_eq!(PaymentStatus::Overdue.normalized(), PaymentStatus::Pending);
        assert!(PaymentStatus::Overdue.accepts_submission());

        let legacy = payment(PaymentStatus::Overdue, date(2030, 1, 31));
        assert!(!legacy.is_overdue(date(2025, 2, 15)));
    }

    #[test]
    fn test_is_overdue() {
        let today = date(2025, 2, 15);
        let past = date(2025, 1, 31);

        assert!(payment(PaymentStatus::Pending, past).is_overdue(today));
        assert!(payment(PaymentStatus::Rejected, past).is_overdue(today));
        assert!(!payment(PaymentStatus::Paid, past).is_overdue(today));
        assert!(!payment(PaymentStatus::Confirmed, past).is_overdue(today));
        // due today is not yet overdue
        assert!(!payment(PaymentStatus::Pending, today).is_overdue(today));
    }

    #[test]
    fn test_needs_reminder() {
        let today = date(2025, 1, 31);
        let mut p = payment(PaymentStatus::Pending, today);
        assert!(p.needs_reminder(today, wib()));

        p.last_notified_at = Some(Utc.with_ymd_and_hms(2025, 1, 31, 2, 0, 0).unwrap());
        assert!(!p.needs_reminder(today, wib()));
        assert!(p.needs_reminder(date(2025, 2, 1), wib()));

        let paid = payment(PaymentStatus::Paid, today);
        assert!(!paid.needs_reminder(today, wib()));
    }

    #[test]
    fn test_reminder_uses_business_date_of_last_notification() {
        let mut p = payment(PaymentStatus::Pending, date(2025, 1, 31));
        // 20:00 UTC on the 31st is already 03:00 on the 1st in WIB
        p.last_notified_at = Some(Utc.with_ymd_and_hms(2025, 1, 31, 20, 0, 0).unwrap());

        assert!(!p.needs_reminder(date(2025, 2, 1), wib()));
        assert!(p.needs_reminder(date(2025, 2, 2), wib()));
    }

    #[test]
    fn test_negative_amount_rejected() {
        let result = Payment::new_pending(
            Uuid::new_v4(),
            None,
            PaymentType::Rent,
            dec!(-1),
            BillingPeriod::new(2025, 1).unwrap(),
            Utc::now(),
        );
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[test]
    fn test_payment_method_parsing() {
        assert_eq!("transfer".parse::<PaymentMethod>().unwrap(), PaymentMethod::Transfer);
        assert_eq!("qris".parse::<PaymentMethod>().unwrap(), PaymentMethod::Qris);
        assert!(matches!("card".parse::<PaymentMethod>(), Err(AppError::Validation(_))));
    }
}
