//! Eligibility Policy
//!
//! Pure evaluation of whether a member may borrow or renew, given the
//! configured limits and the member's current loan/fine state. Evaluation
//! never short-circuits: every failing rule contributes a reason, so the
//! caller can present all blockers at once.
//!
//! Nothing here mutates state; the orchestrator runs these checks inside
//! its transaction and acts on the verdict.

use crate::models::loan::{Loan, LoanStatus};
use crate::models::member::{MemberCondition, MemberSnapshot};
use crate::models::store::CirculationStore;
use chrono::{DateTime, Utc};
use std::fmt;

/// One reason a borrow or renew request is blocked.
#[derive(Debug, Clone, PartialEq)]
pub enum DenialReason {
    /// Account is suspended in the member directory
    AccountSuspended,

    /// Member already has the configured maximum of open loans
    MaxActiveLoansReached { limit: u32 },

    /// Member has at least one loan in OVERDUE status
    OverdueLoan,

    /// Member owes unpaid fines and configuration disallows borrowing
    UnpaidFines { outstanding_cents: i64 },

    /// A standing directory condition blocks borrowing on its own
    BlockingCondition { condition: MemberCondition },

    /// Loan is not in a renewable status
    LoanNotActive { status: LoanStatus },

    /// Loan already used up its renewals
    RenewalLimitReached { limit: u32 },

    /// Renewal requested after the due date has passed
    PastDueDate,
}

impl fmt::Display for DenialReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DenialReason::AccountSuspended => write!(f, "Account is suspended"),
            DenialReason::MaxActiveLoansReached { limit } => {
                write!(f, "Maximum active loans reached ({})", limit)
            }
            DenialReason::OverdueLoan => write!(f, "Member has an overdue loan"),
            DenialReason::UnpaidFines { outstanding_cents } => {
                write!(f, "Member owes unpaid fines ({} cents)", outstanding_cents)
            }
            DenialReason::BlockingCondition { condition } => {
                write!(f, "Account condition blocks borrowing: {:?}", condition)
            }
            DenialReason::LoanNotActive { status } => {
                write!(f, "Loan is {:?} and cannot be renewed", status)
            }
            DenialReason::RenewalLimitReached { limit } => {
                write!(f, "Maximum renewals reached ({})", limit)
            }
            DenialReason::PastDueDate => write!(f, "Loan is past its due date"),
        }
    }
}

/// Outcome of an eligibility evaluation: allowed, or every failing reason.
#[derive(Debug, Clone, PartialEq)]
pub struct EligibilityAssessment {
    reasons: Vec<DenialReason>,
}

impl EligibilityAssessment {
    fn new(reasons: Vec<DenialReason>) -> Self {
        Self { reasons }
    }

    /// Whether the request may proceed
    pub fn allowed(&self) -> bool {
        self.reasons.is_empty()
    }

    /// Every failing reason, in evaluation order
    pub fn reasons(&self) -> &[DenialReason] {
        &self.reasons
    }

    /// Failing reasons rendered for the caller
    pub fn reason_messages(&self) -> Vec<String> {
        self.reasons.iter().map(|r| r.to_string()).collect()
    }
}

/// Evaluate whether a member may take out a new loan.
///
/// Rules run in order and all failures accumulate:
/// 1. suspended account
/// 2. open-loan count at the configured maximum
/// 3. any loan currently OVERDUE
/// 4. unpaid fines, unless configuration allows borrowing with fines
/// 5. standing directory conditions that block on their own
///
/// # Example
/// ```
/// use circulation_core_rs::models::config::LoanConfiguration;
/// use circulation_core_rs::models::member::{AccountState, MemberSnapshot};
/// use circulation_core_rs::models::store::CirculationStore;
/// use circulation_core_rs::policy::can_borrow;
///
/// let store = CirculationStore::new(LoanConfiguration::default());
/// let member = MemberSnapshot::new("m1".to_string(), AccountState::Active);
/// assert!(can_borrow(&store, &member).allowed());
/// ```
pub fn can_borrow(store: &CirculationStore, member: &MemberSnapshot) -> EligibilityAssessment {
    let config = store.config();
    let mut reasons = Vec::new();

    if member.is_suspended() {
        reasons.push(DenialReason::AccountSuspended);
    }

    let open_loans = store.open_loan_count(member.id());
    if open_loans >= config.max_active_loans as usize {
        reasons.push(DenialReason::MaxActiveLoansReached {
            limit: config.max_active_loans,
        });
    }

    if store.has_overdue_loan(member.id()) {
        reasons.push(DenialReason::OverdueLoan);
    }

    if !config.allow_loans_with_fines {
        let outstanding_cents = store.unpaid_fine_cents(member.id());
        if outstanding_cents > 0 {
            reasons.push(DenialReason::UnpaidFines { outstanding_cents });
        }
    }

    for condition in member.conditions() {
        // HasFine mirrors the fine ledger, which rule 4 already consults
        if *condition != MemberCondition::HasFine {
            reasons.push(DenialReason::BlockingCondition {
                condition: *condition,
            });
        }
    }

    EligibilityAssessment::new(reasons)
}

/// Evaluate whether a loan may be renewed at `now`.
///
/// A renewable loan is ACTIVE (overdue loans must come back first), under
/// the renewal cap, not yet past due, and its member passes the same
/// unpaid-fines gate as borrowing.
pub fn can_renew(
    store: &CirculationStore,
    loan: &Loan,
    now: DateTime<Utc>,
) -> EligibilityAssessment {
    let config = store.config();
    let mut reasons = Vec::new();

    if loan.status() != LoanStatus::Active {
        reasons.push(DenialReason::LoanNotActive {
            status: loan.status(),
        });
    }

    if loan.renewal_count() >= config.max_renewals {
        reasons.push(DenialReason::RenewalLimitReached {
            limit: config.max_renewals,
        });
    }

    if now > loan.due_date() {
        reasons.push(DenialReason::PastDueDate);
    }

    if !config.allow_loans_with_fines {
        let outstanding_cents = store.unpaid_fine_cents(loan.member_id());
        if outstanding_cents > 0 {
            reasons.push(DenialReason::UnpaidFines { outstanding_cents });
        }
    }

    EligibilityAssessment::new(reasons)
}
