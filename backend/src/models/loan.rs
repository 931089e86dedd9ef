//! Loan model
//!
//! Records one lending of one physical copy to one member. Each loan has:
//! - Member, copy, and processing staff ids
//! - Loan and due instants, plus the return instant once closed
//! - Renewal count
//! - Status (Active, Overdue, Returned, Cancelled)
//!
//! A loan is immutable once Returned or Cancelled. At most one loan in an
//! open status (Active or Overdue) may reference a given copy; the
//! orchestrator enforces that across rows.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Loan lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LoanStatus {
    /// Out on loan, within its due date
    Active,

    /// Past its due date; flipped by the overdue sweep
    Overdue,

    /// Copy came back; terminal
    Returned,

    /// Voided by staff without a return; terminal
    Cancelled,
}

/// Errors from loan state transitions
#[derive(Debug, Error, PartialEq)]
pub enum LoanError {
    #[error("Loan {loan_id} is {status:?} and cannot be returned")]
    NotOpen { loan_id: String, status: LoanStatus },

    #[error("Loan {loan_id} is {status:?} and cannot be renewed")]
    NotRenewable { loan_id: String, status: LoanStatus },

    #[error("Loan {loan_id} is already closed")]
    AlreadyClosed { loan_id: String },
}

/// One lending of a copy to a member.
///
/// # Example
/// ```
/// use chrono::{Duration, Utc};
/// use circulation_core_rs::models::loan::{Loan, LoanStatus};
///
/// let now = Utc::now();
/// let loan = Loan::new(
///     "member-1".to_string(),
///     "copy-1".to_string(),
///     "staff-1".to_string(),
///     now,
///     now + Duration::days(14),
/// );
/// assert_eq!(loan.status(), LoanStatus::Active);
/// assert_eq!(loan.renewal_count(), 0);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Loan {
    /// Unique loan identifier (UUID)
    id: String,

    /// Borrowing member id
    member_id: String,

    /// Copy out on this loan
    copy_id: String,

    /// Staff member who processed the checkout
    processed_by_id: String,

    /// Instant the loan was created
    loan_date: DateTime<Utc>,

    /// Instant the copy is due back
    due_date: DateTime<Utc>,

    /// Instant the copy actually came back (set on return)
    return_date: Option<DateTime<Utc>>,

    /// Number of renewals granted so far
    renewal_count: u32,

    /// Current status
    status: LoanStatus,

    /// Free-form staff notes
    notes: Option<String>,
}

impl Loan {
    /// Create a new active loan with zero renewals.
    pub fn new(
        member_id: String,
        copy_id: String,
        processed_by_id: String,
        loan_date: DateTime<Utc>,
        due_date: DateTime<Utc>,
    ) -> Self {
        assert!(due_date > loan_date, "due date must be after loan date");

        Self {
            id: uuid::Uuid::new_v4().to_string(),
            member_id,
            copy_id,
            processed_by_id,
            loan_date,
            due_date,
            return_date: None,
            renewal_count: 0,
            status: LoanStatus::Active,
            notes: None,
        }
    }

    /// Attach staff notes (builder pattern).
    pub fn with_notes(mut self, notes: String) -> Self {
        self.notes = Some(notes);
        self
    }

    /// Get loan id
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Get borrowing member id
    pub fn member_id(&self) -> &str {
        &self.member_id
    }

    /// Get copy id
    pub fn copy_id(&self) -> &str {
        &self.copy_id
    }

    /// Get processing staff id
    pub fn processed_by_id(&self) -> &str {
        &self.processed_by_id
    }

    /// Get loan creation instant
    pub fn loan_date(&self) -> DateTime<Utc> {
        self.loan_date
    }

    /// Get due instant
    pub fn due_date(&self) -> DateTime<Utc> {
        self.due_date
    }

    /// Get return instant, if returned
    pub fn return_date(&self) -> Option<DateTime<Utc>> {
        self.return_date
    }

    /// Get renewal count
    pub fn renewal_count(&self) -> u32 {
        self.renewal_count
    }

    /// Get current status
    pub fn status(&self) -> LoanStatus {
        self.status
    }

    /// Get staff notes
    pub fn notes(&self) -> Option<&str> {
        self.notes.as_deref()
    }

    /// Whether the loan is still open (Active or Overdue).
    pub fn is_open(&self) -> bool {
        matches!(self.status, LoanStatus::Active | LoanStatus::Overdue)
    }

    /// Whether the loan is past due at `now`, regardless of status row.
    pub fn is_past_due(&self, now: DateTime<Utc>) -> bool {
        now > self.due_date
    }

    /// Advance the due date for a granted renewal.
    ///
    /// Only Active loans renew; Overdue loans must be returned first.
    /// The caller computes `new_due_date` from the current schedule, so
    /// repeated renewals compound from the original due date rather than
    /// from the renewal instant.
    pub fn renew(&mut self, new_due_date: DateTime<Utc>) -> Result<(), LoanError> {
        if self.status != LoanStatus::Active {
            return Err(LoanError::NotRenewable {
                loan_id: self.id.clone(),
                status: self.status,
            });
        }

        self.due_date = new_due_date;
        self.renewal_count += 1;
        Ok(())
    }

    /// Flip an open loan past its due date to Overdue (idempotent).
    pub fn mark_overdue(&mut self) -> Result<(), LoanError> {
        match self.status {
            LoanStatus::Active | LoanStatus::Overdue => {
                self.status = LoanStatus::Overdue;
                Ok(())
            }
            LoanStatus::Returned | LoanStatus::Cancelled => Err(LoanError::AlreadyClosed {
                loan_id: self.id.clone(),
            }),
        }
    }

    /// Close the loan on return, stamping the return instant.
    pub fn close(&mut self, return_date: DateTime<Utc>) -> Result<(), LoanError> {
        if !self.is_open() {
            return Err(LoanError::NotOpen {
                loan_id: self.id.clone(),
                status: self.status,
            });
        }

        self.return_date = Some(return_date);
        self.status = LoanStatus::Returned;
        Ok(())
    }

    /// Void an open loan without a return.
    pub fn cancel(&mut self) -> Result<(), LoanError> {
        if !self.is_open() {
            return Err(LoanError::NotOpen {
                loan_id: self.id.clone(),
                status: self.status,
            });
        }

        self.status = LoanStatus::Cancelled;
        Ok(())
    }
}
