//! Pure derivations over a tenant's payments: display fields, statistics,
//! filtering, ordering and pagination.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use rust_decimal::Decimal;

use crate::config::Config;
use crate::models::{
    DisplayStatus, Pagination, Payment, PaymentStats, PaymentStatus, PaymentView,
    RejectedPayment, SortOrder, StatusFilter, TenantPaymentSummary, UnpaidMonth,
};

pub const DEFAULT_PER_PAGE: usize = 5;
pub const MAX_PER_PAGE: usize = 50;

const NO_REJECTION_REASON: &str = "Tidak ada alasan";

/// "Now" and "today" for one ledger operation, passed in explicitly.
///
/// `today` is the calendar date of `now` in the business timezone `offset`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedgerClock {
    pub now: DateTime<Utc>,
    pub today: NaiveDate,
    pub offset: FixedOffset,
}

impl LedgerClock {
    pub fn from_config(config: &Config) -> Self {
        Self::at(Utc::now(), config.business_offset())
    }

    pub fn at(now: DateTime<Utc>, offset: FixedOffset) -> Self {
        Self {
            now,
            today: now.with_timezone(&offset).date_naive(),
            offset,
        }
    }
}

pub fn to_view(payment: &Payment, today: NaiveDate) -> PaymentView {
    let status = payment.status.normalized();
    let is_overdue = payment.is_overdue(today);
    let display = status.display();
    let shown = display_status(status, is_overdue);

    PaymentView {
        id: payment.id,
        payment_type: payment.payment_type,
        payment_type_label: payment.payment_type.label().to_string(),
        amount: payment.amount,
        due_date: payment.due_date,
        payment_date: payment.payment_date,
        status,
        status_label: display.label().to_string(),
        status_color: display.color(),
        display_label: shown.label().to_string(),
        display_color: shown.color(),
        payment_method: payment.payment_method,
        reference: payment.reference.clone(),
        has_proof_image: payment.reference.is_some(),
        notes: payment.notes.clone(),
        period: payment.period_name(),
        period_year: payment.period_year,
        period_month: payment.period_month,
        is_overdue,
    }
}

/// All views for a tenant, most recent billing cycle first.
pub fn build_ledger(payments: &[Payment], today: NaiveDate) -> Vec<PaymentView> {
    let mut views: Vec<PaymentView> = payments.iter().map(|p| to_view(p, today)).collect();
    sort_views(&mut views, SortOrder::Desc);
    views
}

pub fn compute_stats(views: &[PaymentView]) -> PaymentStats {
    views.iter().fold(
        PaymentStats {
            total: views.len(),
            ..PaymentStats::default()
        },
        |mut stats, view| {
            match view.status {
                PaymentStatus::Pending => stats.pending += 1,
                PaymentStatus::Paid => stats.waiting_approval += 1,
                PaymentStatus::Confirmed => stats.confirmed += 1,
                PaymentStatus::Rejected | PaymentStatus::Overdue => {}
            }
            if view.is_overdue {
                stats.overdue += 1;
            }
            stats
        },
    )
}

fn filter_matches(filter: StatusFilter, status: PaymentStatus) -> bool {
    match filter {
        StatusFilter::All => true,
        // rejected payments still need the tenant to act
        StatusFilter::Pending => matches!(
            status,
            PaymentStatus::Pending | PaymentStatus::Rejected | PaymentStatus::Overdue
        ),
        StatusFilter::Paid => status == PaymentStatus::Paid,
        StatusFilter::Confirmed => status == PaymentStatus::Confirmed,
    }
}

fn compare_period(a: &PaymentView, b: &PaymentView) -> Ordering {
    (a.period_year, a.period_month, a.id).cmp(&(b.period_year, b.period_month, b.id))
}

fn sort_views(views: &mut [PaymentView], order: SortOrder) {
    match order {
        SortOrder::Asc => views.sort_by(compare_period),
        SortOrder::Desc => views.sort_by(|a, b| compare_period(b, a)),
    }
}

pub fn filter_and_sort(
    views: &[PaymentView],
    filter: StatusFilter,
    order: SortOrder,
) -> Vec<PaymentView> {
    let mut selected: Vec<PaymentView> = views
        .iter()
        .filter(|v| filter_matches(filter, v.status))
        .cloned()
        .collect();
    sort_views(&mut selected, order);
    selected
}

/// Slices an already ordered sequence into zero-based pages.
pub fn paginate(
    views: Vec<PaymentView>,
    page: usize,
    per_page: usize,
) -> (Vec<PaymentView>, Pagination) {
    let per_page = per_page.clamp(1, MAX_PER_PAGE);
    let total_items = views.len();
    let total_pages = total_items.div_ceil(per_page);

    let items = views
        .into_iter()
        .skip(page.saturating_mul(per_page))
        .take(per_page)
        .collect();

    (
        items,
        Pagination {
            page,
            per_page,
            total_items,
            total_pages,
        },
    )
}

/// Overdue wins over outstanding, outstanding wins over settled.
pub fn summarize_tenant(views: &[PaymentView]) -> TenantPaymentSummary {
    if views.iter().any(|v| v.is_overdue) {
        TenantPaymentSummary::Terlambat
    } else if views
        .iter()
        .any(|v| matches!(v.status, PaymentStatus::Pending | PaymentStatus::Rejected))
    {
        TenantPaymentSummary::Menunggu
    } else {
        TenantPaymentSummary::Lunas
    }
}

fn period_month(payment: &Payment) -> String {
    format!("{:04}-{:02}", payment.period_year, payment.period_month)
}

fn is_unpaid(payment: &Payment) -> bool {
    payment.status.normalized() == PaymentStatus::Pending
}

pub fn unpaid_count(payments: &[Payment]) -> usize {
    payments.iter().filter(|p| is_unpaid(p)).count()
}

/// Pending payments summed per billing period, oldest period first.
pub fn unpaid_months(payments: &[Payment]) -> Vec<UnpaidMonth> {
    let mut periods: BTreeMap<(i32, i32), (String, Decimal)> = BTreeMap::new();

    for payment in payments.iter().filter(|p| is_unpaid(p)) {
        let entry = periods
            .entry((payment.period_year, payment.period_month))
            .or_insert_with(|| (payment.period_name(), Decimal::ZERO));
        entry.1 += payment.amount;
    }

    periods
        .into_iter()
        .map(|((year, month), (month_name, total))| UnpaidMonth {
            month: format!("{:04}-{:02}", year, month),
            month_name,
            total,
        })
        .collect()
}

/// Rejected payments with the reviewer's reason, oldest period first.
pub fn rejected_payments(payments: &[Payment]) -> Vec<RejectedPayment> {
    let mut rejected: Vec<&Payment> = payments
        .iter()
        .filter(|p| p.status == PaymentStatus::Rejected)
        .collect();
    rejected.sort_by_key(|p| p.period_key());

    rejected
        .into_iter()
        .map(|p| RejectedPayment {
            payment_id: p.id,
            month: period_month(p),
            month_name: p.period_name(),
            reason: p
                .notes
                .as_deref()
                .map(str::trim)
                .filter(|reason| !reason.is_empty())
                .unwrap_or(NO_REJECTION_REASON)
                .to_string(),
        })
        .collect()
}

/// Status to show, with derived overdue taking precedence.
pub fn display_status(status: PaymentStatus, is_overdue: bool) -> DisplayStatus {
    if is_overdue {
        DisplayStatus::Overdue
    } else {
        status.display()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BillingPeriod, PaymentType, StatusColor};
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn payment(year: i32, month: u32, status: PaymentStatus) -> Payment {
        let mut p = Payment::new_pending(
            Uuid::nil(),
            None,
            PaymentType::Rent,
            dec!(850000),
            BillingPeriod::new(year, month).unwrap(),
            Utc::now(),
        )
        .unwrap();
        p.status = status;
        p
    }

    fn periods(views: &[PaymentView]) -> Vec<(i32, i32)> {
        views.iter().map(|v| (v.period_year, v.period_month)).collect()
    }

    #[test]
    fn test_overdue_scenario() {
        let today = date(2025, 2, 15);
        let payments = vec![
            payment(2024, 12, PaymentStatus::Confirmed),
            payment(2025, 1, PaymentStatus::Pending),
        ];

        let views = build_ledger(&payments, today);
        assert_eq!(periods(&views), vec![(2025, 1), (2024, 12)]);
        assert_eq!(views[0].due_date, date(2025, 1, 31));
        assert!(views[0].is_overdue);
        assert!(!views[1].is_overdue);
        assert_eq!(views[0].period, "Januari 2025");
        assert_eq!(views[1].status_label, "Lunas");
    }

    #[test]
    fn test_view_fields() {
        let mut p = payment(2025, 3, PaymentStatus::Paid);
        p.reference = Some("https://x/bukti.jpg".to_string());
        let view = to_view(&p, date(2025, 3, 1));

        assert_eq!(view.status_label, "Menunggu Konfirmasi");
        assert_eq!(view.status_color, StatusColor::Blue);
        assert_eq!(view.payment_type_label, "Sewa Bulanan");
        assert!(view.has_proof_image);
        assert!(!view.is_overdue);
    }

    #[test]
    fn test_legacy_overdue_row_reads_as_pending() {
        let legacy = payment(2025, 1, PaymentStatus::Overdue);
        let view = to_view(&legacy, date(2025, 1, 10));
        assert_eq!(view.status, PaymentStatus::Pending);
        assert_eq!(view.status_label, "Belum Bayar");
        assert!(!view.is_overdue);
    }

    #[test]
    fn test_stats_empty() {
        assert_eq!(compute_stats(&[]), PaymentStats::default());
    }

    #[test]
    fn test_stats_counts() {
        let today = date(2025, 1, 1);
        let payments = vec![
            payment(2025, 1, PaymentStatus::Pending),
            payment(2025, 2, PaymentStatus::Paid),
            payment(2025, 3, PaymentStatus::Paid),
            payment(2025, 4, PaymentStatus::Confirmed),
            payment(2025, 5, PaymentStatus::Rejected),
        ];
        let views = build_ledger(&payments, today);

        assert_eq!(
            compute_stats(&views),
            PaymentStats {
                total: 5,
                pending: 1,
                waiting_approval: 2,
                confirmed: 1,
                overdue: 0,
            }
        );
    }

    #[test]
    fn test_stats_overdue_counts_rejected_past_due() {
        let today = date(2025, 6, 15);
        let payments = vec![
            payment(2025, 1, PaymentStatus::Pending),
            payment(2025, 2, PaymentStatus::Rejected),
            payment(2025, 3, PaymentStatus::Paid),
            payment(2025, 7, PaymentStatus::Pending),
        ];
        let stats = compute_stats(&build_ledger(&payments, today));
        assert_eq!(stats.overdue, 2);
        assert_eq!(stats.total, 4);
    }

    #[test]
    fn test_pending_filter_includes_rejected() {
        let today = date(2025, 1, 1);
        let payments = vec![
            payment(2025, 1, PaymentStatus::Pending),
            payment(2025, 2, PaymentStatus::Rejected),
            payment(2025, 3, PaymentStatus::Paid),
            payment(2025, 4, PaymentStatus::Confirmed),
        ];
        let views = build_ledger(&payments, today);

        let pending = filter_and_sort(&views, StatusFilter::Pending, SortOrder::Desc);
        assert_eq!(periods(&pending), vec![(2025, 2), (2025, 1)]);

        let paid = filter_and_sort(&views, StatusFilter::Paid, SortOrder::Desc);
        assert_eq!(periods(&paid), vec![(2025, 3)]);

        let confirmed = filter_and_sort(&views, StatusFilter::Confirmed, SortOrder::Asc);
        assert_eq!(periods(&confirmed), vec![(2025, 4)]);

        assert_eq!(filter_and_sort(&views, StatusFilter::All, SortOrder::Desc).len(), 4);
    }

    #[test]
    fn test_reversing_order_reverses_sequence() {
        let today = date(2025, 1, 1);
        let payments = vec![
            payment(2024, 11, PaymentStatus::Confirmed),
            payment(2025, 2, PaymentStatus::Pending),
            payment(2024, 12, PaymentStatus::Paid),
            payment(2025, 1, PaymentStatus::Rejected),
        ];
        let views = build_ledger(&payments, today);

        let desc = filter_and_sort(&views, StatusFilter::All, SortOrder::Desc);
        let mut asc = filter_and_sort(&views, StatusFilter::All, SortOrder::Asc);
        asc.reverse();
        assert_eq!(desc, asc);
        assert_eq!(
            periods(&desc),
            vec![(2025, 2), (2025, 1), (2024, 12), (2024, 11)]
        );
    }

    #[test]
    fn test_ordering_is_stable_across_calls() {
        let today = date(2025, 1, 1);
        let payments: Vec<Payment> = (1..=12)
            .map(|m| payment(2024, m, PaymentStatus::Pending))
            .collect();
        let views = build_ledger(&payments, today);

        let first = filter_and_sort(&views, StatusFilter::All, SortOrder::Asc);
        let second = filter_and_sort(&views, StatusFilter::All, SortOrder::Asc);
        assert_eq!(first, second);
    }

    #[test]
    fn test_paginate() {
        let today = date(2025, 1, 1);
        let payments: Vec<Payment> = (1..=12)
            .map(|m| payment(2024, m, PaymentStatus::Pending))
            .collect();
        let views = build_ledger(&payments, today);

        let (page0, meta) = paginate(views.clone(), 0, DEFAULT_PER_PAGE);
        assert_eq!(page0.len(), 5);
        assert_eq!(meta.total_items, 12);
        assert_eq!(meta.total_pages, 3);
        assert_eq!(page0[0].period_month, 12);

        let (page2, _) = paginate(views.clone(), 2, DEFAULT_PER_PAGE);
        assert_eq!(page2.len(), 2);
        assert_eq!(page2[1].period_month, 1);

        let (beyond, _) = paginate(views.clone(), 9, DEFAULT_PER_PAGE);
        assert!(beyond.is_empty());

        let (_, empty_meta) = paginate(Vec::new(), 0, DEFAULT_PER_PAGE);
        assert_eq!(empty_meta.total_pages, 0);
    }

    #[test]
    fn test_unpaid_months_groups_by_period() {
        let rent = payment(2025, 2, PaymentStatus::Pending);
        let mut utilities = payment(2025, 2, PaymentStatus::Pending);
        utilities.payment_type = PaymentType::Utilities;
        utilities.amount = dec!(150000);
        let legacy = payment(2025, 1, PaymentStatus::Overdue);
        let payments = vec![
            rent,
            payment(2024, 12, PaymentStatus::Confirmed),
            utilities,
            legacy,
            payment(2025, 3, PaymentStatus::Paid),
        ];

        assert_eq!(unpaid_count(&payments), 3);

        let months = unpaid_months(&payments);
        assert_eq!(months.len(), 2);
        assert_eq!(months[0].month, "2025-01");
        assert_eq!(months[0].month_name, "Januari 2025");
        assert_eq!(months[0].total, dec!(850000));
        assert_eq!(months[1].month, "2025-02");
        assert_eq!(months[1].month_name, "Februari 2025");
        assert_eq!(months[1].total, dec!(1000000));
    }

    #[test]
    fn test_rejected_payments_carry_reason() {
        let mut with_reason = payment(2025, 2, PaymentStatus::Rejected);
        with_reason.notes = Some("Nominal kurang".to_string());
        let mut blank = payment(2025, 1, PaymentStatus::Rejected);
        blank.notes = Some("  ".to_string());
        let payments = vec![with_reason.clone(), blank, payment(2025, 3, PaymentStatus::Pending)];

        let rejected = rejected_payments(&payments);
        assert_eq!(rejected.len(), 2);
        assert_eq!(rejected[0].month, "2025-01");
        assert_eq!(rejected[0].reason, "Tidak ada alasan");
        assert_eq!(rejected[1].payment_id, with_reason.id);
        assert_eq!(rejected[1].month_name, "Februari 2025");
        assert_eq!(rejected[1].reason, "Nominal kurang");

        assert!(rejected_payments(&[]).is_empty());
        assert!(unpaid_months(&[]).is_empty());
    }

    #[test]
    fn test_summarize_tenant() {
        let today = date(2025, 2, 15);

        let overdue = build_ledger(&[payment(2025, 1, PaymentStatus::Pending)], today);
        assert_eq!(summarize_tenant(&overdue), TenantPaymentSummary::Terlambat);
        assert_eq!(overdue[0].display_label, "Terlambat");
        assert_eq!(overdue[0].display_color, StatusColor::Red);
        assert_eq!(overdue[0].status_label, "Belum Bayar");

        let outstanding = build_ledger(&[payment(2025, 2, PaymentStatus::Rejected)], today);
        assert_eq!(summarize_tenant(&outstanding), TenantPaymentSummary::Menunggu);

        let settled = build_ledger(
            &[
                payment(2025, 1, PaymentStatus::Confirmed),
                payment(2025, 2, PaymentStatus::Paid),
            ],
            today,
        );
        assert_eq!(summarize_tenant(&settled), TenantPaymentSummary::Lunas);
        assert_eq!(summarize_tenant(&[]), TenantPaymentSummary::Lunas);
    }
}
