//! Fine Ledger
//!
//! The overdue-fine formula and member-level fine aggregation. Payment and
//! waiver transitions live on the `Fine` row; the orchestrator wires them
//! into transactions.
//!
//! CRITICAL: All money values are i64 (cents)

use crate::core::clock::overdue_days;
use crate::models::config::LoanConfiguration;
use crate::models::fine::FineStatus;
use crate::models::store::CirculationStore;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Fine owed for a late return, in cents.
///
/// `billable_days = max(0, ceil(days late) - grace_period_days)`, charged
/// at the configured daily rate. Zero for on-time returns and for returns
/// inside the grace period.
///
/// # Example
/// ```
/// use chrono::{Duration, TimeZone, Utc};
/// use circulation_core_rs::fines::assess_overdue_fine;
/// use circulation_core_rs::models::config::LoanConfiguration;
///
/// let config = LoanConfiguration {
///     grace_period_days: 2,
///     daily_fine_cents: 150, // $1.50 per day
///     ..Default::default()
/// };
/// let due = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
///
/// // Ten days late, two forgiven: 8 * 150 = $12.00
/// assert_eq!(assess_overdue_fine(&config, due, due + Duration::days(10)), 1_200);
/// assert_eq!(assess_overdue_fine(&config, due, due), 0);
/// ```
pub fn assess_overdue_fine(
    config: &LoanConfiguration,
    due_date: DateTime<Utc>,
    return_date: DateTime<Utc>,
) -> i64 {
    let days_overdue = overdue_days(due_date, return_date);
    let billable_days = (days_overdue - config.grace_period_days as i64).max(0);
    billable_days * config.daily_fine_cents
}

/// Aggregated fine figures for one member.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MemberFineStats {
    /// Total assessed across all fines (cents)
    pub total_cents: i64,

    /// Outstanding across PENDING fines (cents)
    pub unpaid_cents: i64,

    /// Number of fines on record
    pub fine_count: usize,
}

/// Aggregate a member's fines across their loans.
pub fn member_fine_stats(store: &CirculationStore, member_id: &str) -> MemberFineStats {
    let fines = store.fines_for_member(member_id);

    let mut stats = MemberFineStats {
        fine_count: fines.len(),
        ..Default::default()
    };
    for fine in fines {
        stats.total_cents += fine.amount_cents();
        if fine.status() == FineStatus::Pending {
            stats.unpaid_cents += fine.outstanding_cents();
        }
    }
    stats
}
