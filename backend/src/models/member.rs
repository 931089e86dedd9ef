//! Member snapshot
//!
//! Members live in an external directory; the engine only reads a snapshot
//! of the facts that gate circulation: account state and any standing
//! conditions that block borrowing on their own.

use serde::{Deserialize, Serialize};

/// Account standing in the member directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccountState {
    Active,
    Inactive,
    Suspended,
}

/// A standing condition on the account that can block borrowing
/// independently of the ledgers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MemberCondition {
    /// Directory flag mirroring an unpaid fine; the fine ledger is
    /// authoritative in-engine, so this alone does not block
    HasFine,

    /// Member has an unresolved lost copy on record
    LostCopy,
}

/// Read-only view of a member, as fed by the directory.
///
/// # Example
/// ```
/// use circulation_core_rs::models::member::{AccountState, MemberSnapshot};
///
/// let member = MemberSnapshot::new("member-1".to_string(), AccountState::Active);
/// assert!(member.is_active());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemberSnapshot {
    /// Directory member id
    id: String,

    /// Account standing
    account_state: AccountState,

    /// Standing conditions, unordered
    conditions: Vec<MemberCondition>,
}

impl MemberSnapshot {
    /// Create a snapshot with no conditions.
    pub fn new(id: String, account_state: AccountState) -> Self {
        Self {
            id,
            account_state,
            conditions: Vec::new(),
        }
    }

    /// Add a standing condition (builder pattern).
    pub fn with_condition(mut self, condition: MemberCondition) -> Self {
        if !self.conditions.contains(&condition) {
            self.conditions.push(condition);
        }
        self
    }

    /// Get member id
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Get account standing
    pub fn account_state(&self) -> AccountState {
        self.account_state
    }

    /// Get standing conditions
    pub fn conditions(&self) -> &[MemberCondition] {
        &self.conditions
    }

    /// Whether the account is in good standing for new loans.
    pub fn is_active(&self) -> bool {
        self.account_state == AccountState::Active
    }

    /// Whether the account is suspended.
    pub fn is_suspended(&self) -> bool {
        self.account_state == AccountState::Suspended
    }

    /// Whether a specific condition is on record.
    pub fn has_condition(&self, condition: MemberCondition) -> bool {
        self.conditions.contains(&condition)
    }
}
