//! Loan configuration
//!
//! The singleton policy record read by eligibility evaluation and the
//! fine/renewal math. Mutated only through a validated administrative
//! update; the engine itself never writes it.
//!
//! CRITICAL: All money values are i64 (cents)

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from configuration validation
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("default_loan_days must be positive")]
    ZeroLoanDays,

    #[error("max_active_loans must be positive")]
    ZeroActiveLoans,

    #[error("reservation_hold_days must be positive")]
    ZeroHoldDays,

    #[error("daily_fine_cents must be non-negative")]
    NegativeFineRate,
}

/// Process-wide circulation policy.
///
/// Constructed with explicit defaults; there is no lazy row creation.
///
/// # Example
/// ```
/// use circulation_core_rs::models::config::LoanConfiguration;
///
/// let config = LoanConfiguration::default();
/// assert_eq!(config.default_loan_days, 14);
/// assert!(!config.allow_loans_with_fines);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanConfiguration {
    /// Loan length in days when the material has no override
    pub default_loan_days: u32,

    /// Maximum concurrently open loans per member
    pub max_active_loans: u32,

    /// Maximum renewals per loan
    pub max_renewals: u32,

    /// Days past due before overdue fines begin accruing
    pub grace_period_days: u32,

    /// Fine accrued per billable overdue day (cents)
    pub daily_fine_cents: i64,

    /// Whether members with unpaid fines may still borrow
    pub allow_loans_with_fines: bool,

    /// Pickup window for READY holds, in days
    pub reservation_hold_days: u32,
}

impl Default for LoanConfiguration {
    fn default() -> Self {
        Self {
            default_loan_days: 14,
            max_active_loans: 5,
            max_renewals: 2,
            grace_period_days: 2,
            daily_fine_cents: 50, // $0.50 per day
            allow_loans_with_fines: false,
            reservation_hold_days: 7,
        }
    }
}

impl LoanConfiguration {
    /// Check invariants on the current values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.default_loan_days == 0 {
            return Err(ConfigError::ZeroLoanDays);
        }
        if self.max_active_loans == 0 {
            return Err(ConfigError::ZeroActiveLoans);
        }
        if self.reservation_hold_days == 0 {
            return Err(ConfigError::ZeroHoldDays);
        }
        if self.daily_fine_cents < 0 {
            return Err(ConfigError::NegativeFineRate);
        }
        Ok(())
    }
}

/// Partial administrative update to the configuration.
///
/// Every optional field is enumerated; unset fields keep their current
/// value. The merged result is validated before anything is written.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigurationUpdate {
    pub default_loan_days: Option<u32>,
    pub max_active_loans: Option<u32>,
    pub max_renewals: Option<u32>,
    pub grace_period_days: Option<u32>,
    pub daily_fine_cents: Option<i64>,
    pub allow_loans_with_fines: Option<bool>,
    pub reservation_hold_days: Option<u32>,
}

impl ConfigurationUpdate {
    /// Merge into `current` and validate; returns the candidate without
    /// touching `current` on failure.
    pub fn apply_to(&self, current: &LoanConfiguration) -> Result<LoanConfiguration, ConfigError> {
        let candidate = LoanConfiguration {
            default_loan_days: self.default_loan_days.unwrap_or(current.default_loan_days),
            max_active_loans: self.max_active_loans.unwrap_or(current.max_active_loans),
            max_renewals: self.max_renewals.unwrap_or(current.max_renewals),
            grace_period_days: self.grace_period_days.unwrap_or(current.grace_period_days),
            daily_fine_cents: self.daily_fine_cents.unwrap_or(current.daily_fine_cents),
            allow_loans_with_fines: self
                .allow_loans_with_fines
                .unwrap_or(current.allow_loans_with_fines),
            reservation_hold_days: self
                .reservation_hold_days
                .unwrap_or(current.reservation_hold_days),
        };
        candidate.validate()?;
        Ok(candidate)
    }
}
