//! Fine model
//!
//! A monetary penalty recorded against a loan. Created by the return path
//! when a copy comes back past its due date beyond the grace period, or by
//! staff directly (damage, loss).
//!
//! CRITICAL: All money values are i64 (cents)

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Fine lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FineStatus {
    /// Outstanding; blocks borrowing unless configuration allows
    Pending,

    /// Paid in full; terminal
    Paid,

    /// Forgiven by staff; terminal
    Waived,
}

/// Errors from fine mutations
#[derive(Debug, Error, PartialEq)]
pub enum FineError {
    #[error("Fine {fine_id} is {status:?} and cannot change")]
    Closed { fine_id: String, status: FineStatus },

    #[error("Payment {paid_cents} exceeds fine amount {amount_cents}")]
    PaymentExceedsAmount { paid_cents: i64, amount_cents: i64 },

    #[error("Payment amount must be non-negative")]
    NegativePayment,
}

/// A penalty recorded against a loan.
///
/// # Example
/// ```
/// use chrono::Utc;
/// use circulation_core_rs::models::fine::{Fine, FineStatus};
///
/// let fine = Fine::new(
///     "loan-1".to_string(),
///     "staff-1".to_string(),
///     1_200, // $12.00 in cents
///     "Late return".to_string(),
///     Utc::now(),
/// );
/// assert_eq!(fine.status(), FineStatus::Pending);
/// assert_eq!(fine.outstanding_cents(), 1_200);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fine {
    /// Unique fine identifier (UUID)
    id: String,

    /// Loan the fine is recorded against
    loan_id: String,

    /// Staff member who issued the fine
    issued_by_id: String,

    /// Assessed amount (i64 cents)
    amount_cents: i64,

    /// Amount paid so far (i64 cents)
    paid_cents: i64,

    /// Current status
    status: FineStatus,

    /// Human-readable reason ("Late return", "Damaged copy", ...)
    reason: String,

    /// Instant the fine was issued
    issued_date: DateTime<Utc>,

    /// Instant the fine was settled in full
    paid_date: Option<DateTime<Utc>>,
}

impl Fine {
    /// Create a new pending fine.
    pub fn new(
        loan_id: String,
        issued_by_id: String,
        amount_cents: i64,
        reason: String,
        issued_date: DateTime<Utc>,
    ) -> Self {
        assert!(amount_cents > 0, "fine amount must be positive");

        Self {
            id: uuid::Uuid::new_v4().to_string(),
            loan_id,
            issued_by_id,
            amount_cents,
            paid_cents: 0,
            status: FineStatus::Pending,
            reason,
            issued_date,
            paid_date: None,
        }
    }

    /// Get fine id
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Get the loan this fine is recorded against
    pub fn loan_id(&self) -> &str {
        &self.loan_id
    }

    /// Get issuing staff id
    pub fn issued_by_id(&self) -> &str {
        &self.issued_by_id
    }

    /// Get assessed amount (cents)
    pub fn amount_cents(&self) -> i64 {
        self.amount_cents
    }

    /// Get amount paid so far (cents)
    pub fn paid_cents(&self) -> i64 {
        self.paid_cents
    }

    /// Get current status
    pub fn status(&self) -> FineStatus {
        self.status
    }

    /// Get reason text
    pub fn reason(&self) -> &str {
        &self.reason
    }

    /// Get issue instant
    pub fn issued_date(&self) -> DateTime<Utc> {
        self.issued_date
    }

    /// Get settlement instant, if paid in full
    pub fn paid_date(&self) -> Option<DateTime<Utc>> {
        self.paid_date
    }

    /// Amount still owed (cents). Zero once Paid or Waived.
    pub fn outstanding_cents(&self) -> i64 {
        match self.status {
            FineStatus::Pending => self.amount_cents - self.paid_cents,
            FineStatus::Paid | FineStatus::Waived => 0,
        }
    }

    /// Record the cumulative paid amount.
    ///
    /// `paid_cents` is the new total, not a delta. Reaching the assessed
    /// amount flips the fine to Paid and stamps `paid_date`. Payments
    /// above the assessed amount are rejected rather than clamped.
    pub fn record_payment(
        &mut self,
        paid_cents: i64,
        paid_date: DateTime<Utc>,
    ) -> Result<(), FineError> {
        if self.status != FineStatus::Pending {
            return Err(FineError::Closed {
                fine_id: self.id.clone(),
                status: self.status,
            });
        }
        if paid_cents < 0 {
            return Err(FineError::NegativePayment);
        }
        if paid_cents > self.amount_cents {
            return Err(FineError::PaymentExceedsAmount {
                paid_cents,
                amount_cents: self.amount_cents,
            });
        }

        self.paid_cents = paid_cents;
        if self.paid_cents >= self.amount_cents {
            self.status = FineStatus::Paid;
            self.paid_date = Some(paid_date);
        }
        Ok(())
    }

    /// Forgive a pending fine. Terminal; not reachable through payment.
    pub fn waive(&mut self) -> Result<(), FineError> {
        if self.status != FineStatus::Pending {
            return Err(FineError::Closed {
                fine_id: self.id.clone(),
                status: self.status,
            });
        }

        self.status = FineStatus::Waived;
        Ok(())
    }
}
