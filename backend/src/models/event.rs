//! Event logging for auditing and notification hand-off.
//!
//! Every committed state transition appends one event. The log is the
//! durable record an external notifier observes (hold became READY, fine
//! issued); delivery itself is out of scope.
//!
//! # Event Types
//!
//! Events are categorized by entity:
//! - **Loan**: checked out, renewed, returned, marked overdue
//! - **Hold**: placed, ready, picked up, cancelled, expired
//! - **Fine**: issued, paid, waived
//! - **Configuration**: updated

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Circulation event capturing a committed state change.
///
/// All events carry the instant they were committed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CirculationEvent {
    /// A loan was created and its copy claimed
    LoanCheckedOut {
        at: DateTime<Utc>,
        loan_id: String,
        member_id: String,
        copy_id: String,
        due_date: DateTime<Utc>,
    },

    /// A loan's due date was advanced by renewal
    LoanRenewed {
        at: DateTime<Utc>,
        loan_id: String,
        member_id: String,
        renewal_count: u32,
        new_due_date: DateTime<Utc>,
    },

    /// A loan closed and its copy released or re-reserved
    LoanReturned {
        at: DateTime<Utc>,
        loan_id: String,
        member_id: String,
        copy_id: String,
        overdue: bool,
    },

    /// The overdue sweep flipped a loan past its due date
    LoanMarkedOverdue {
        at: DateTime<Utc>,
        loan_id: String,
        member_id: String,
    },

    /// A hold entered the queue (or was immediately ready)
    HoldPlaced {
        at: DateTime<Utc>,
        reservation_id: String,
        member_id: String,
        material_id: String,
        queue_position: Option<u32>,
    },

    /// A hold was bound to a copy and its pickup window opened.
    /// Notification sink: the member should be told to come in.
    HoldReady {
        at: DateTime<Utc>,
        reservation_id: String,
        member_id: String,
        material_id: String,
        copy_id: String,
        expiration_date: DateTime<Utc>,
    },

    /// The bound copy was handed over
    HoldPickedUp {
        at: DateTime<Utc>,
        reservation_id: String,
        member_id: String,
        copy_id: String,
    },

    /// A hold was withdrawn
    HoldCancelled {
        at: DateTime<Utc>,
        reservation_id: String,
        member_id: String,
        material_id: String,
    },

    /// A READY hold's pickup window lapsed
    HoldExpired {
        at: DateTime<Utc>,
        reservation_id: String,
        member_id: String,
        material_id: String,
    },

    /// A fine was recorded against a loan.
    /// Notification sink: the member should be told they owe.
    FineIssued {
        at: DateTime<Utc>,
        fine_id: String,
        loan_id: String,
        member_id: String,
        amount_cents: i64,
        reason: String,
    },

    /// A fine was settled in full
    FinePaid {
        at: DateTime<Utc>,
        fine_id: String,
        loan_id: String,
        member_id: String,
        paid_cents: i64,
    },

    /// A fine was forgiven
    FineWaived {
        at: DateTime<Utc>,
        fine_id: String,
        loan_id: String,
        member_id: String,
    },

    /// The policy record changed
    ConfigurationUpdated {
        at: DateTime<Utc>,
        updated_by: String,
    },
}

impl CirculationEvent {
    /// Get the instant this event was committed
    pub fn at(&self) -> DateTime<Utc> {
        match self {
            CirculationEvent::LoanCheckedOut { at, .. } => *at,
            CirculationEvent::LoanRenewed { at, .. } => *at,
            CirculationEvent::LoanReturned { at, .. } => *at,
            CirculationEvent::LoanMarkedOverdue { at, .. } => *at,
            CirculationEvent::HoldPlaced { at, .. } => *at,
            CirculationEvent::HoldReady { at, .. } => *at,
            CirculationEvent::HoldPickedUp { at, .. } => *at,
            CirculationEvent::HoldCancelled { at, .. } => *at,
            CirculationEvent::HoldExpired { at, .. } => *at,
            CirculationEvent::FineIssued { at, .. } => *at,
            CirculationEvent::FinePaid { at, .. } => *at,
            CirculationEvent::FineWaived { at, .. } => *at,
            CirculationEvent::ConfigurationUpdated { at, .. } => *at,
        }
    }

    /// Get a short description of the event kind
    pub fn kind(&self) -> &'static str {
        match self {
            CirculationEvent::LoanCheckedOut { .. } => "LoanCheckedOut",
            CirculationEvent::LoanRenewed { .. } => "LoanRenewed",
            CirculationEvent::LoanReturned { .. } => "LoanReturned",
            CirculationEvent::LoanMarkedOverdue { .. } => "LoanMarkedOverdue",
            CirculationEvent::HoldPlaced { .. } => "HoldPlaced",
            CirculationEvent::HoldReady { .. } => "HoldReady",
            CirculationEvent::HoldPickedUp { .. } => "HoldPickedUp",
            CirculationEvent::HoldCancelled { .. } => "HoldCancelled",
            CirculationEvent::HoldExpired { .. } => "HoldExpired",
            CirculationEvent::FineIssued { .. } => "FineIssued",
            CirculationEvent::FinePaid { .. } => "FinePaid",
            CirculationEvent::FineWaived { .. } => "FineWaived",
            CirculationEvent::ConfigurationUpdated { .. } => "ConfigurationUpdated",
        }
    }

    /// Get the member this event concerns, if any
    pub fn member_id(&self) -> Option<&str> {
        match self {
            CirculationEvent::LoanCheckedOut { member_id, .. } => Some(member_id),
            CirculationEvent::LoanRenewed { member_id, .. } => Some(member_id),
            CirculationEvent::LoanReturned { member_id, .. } => Some(member_id),
            CirculationEvent::LoanMarkedOverdue { member_id, .. } => Some(member_id),
            CirculationEvent::HoldPlaced { member_id, .. } => Some(member_id),
            CirculationEvent::HoldReady { member_id, .. } => Some(member_id),
            CirculationEvent::HoldPickedUp { member_id, .. } => Some(member_id),
            CirculationEvent::HoldCancelled { member_id, .. } => Some(member_id),
            CirculationEvent::HoldExpired { member_id, .. } => Some(member_id),
            CirculationEvent::FineIssued { member_id, .. } => Some(member_id),
            CirculationEvent::FinePaid { member_id, .. } => Some(member_id),
            CirculationEvent::FineWaived { member_id, .. } => Some(member_id),
            CirculationEvent::ConfigurationUpdated { .. } => None,
        }
    }

    /// Get the loan this event concerns, if any
    pub fn loan_id(&self) -> Option<&str> {
        match self {
            CirculationEvent::LoanCheckedOut { loan_id, .. } => Some(loan_id),
            CirculationEvent::LoanRenewed { loan_id, .. } => Some(loan_id),
            CirculationEvent::LoanReturned { loan_id, .. } => Some(loan_id),
            CirculationEvent::LoanMarkedOverdue { loan_id, .. } => Some(loan_id),
            CirculationEvent::FineIssued { loan_id, .. } => Some(loan_id),
            CirculationEvent::FinePaid { loan_id, .. } => Some(loan_id),
            CirculationEvent::FineWaived { loan_id, .. } => Some(loan_id),
            _ => None,
        }
    }
}

/// Append-only event log with convenience queries.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventLog {
    events: Vec<CirculationEvent>,
}

impl EventLog {
    /// Create a new empty event log
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    /// Append an event
    pub fn log(&mut self, event: CirculationEvent) {
        self.events.push(event);
    }

    /// Number of events logged
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Whether the log is empty
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// All events, oldest first
    pub fn events(&self) -> &[CirculationEvent] {
        &self.events
    }

    /// Events of a specific kind
    pub fn events_of_kind(&self, kind: &str) -> Vec<&CirculationEvent> {
        self.events.iter().filter(|e| e.kind() == kind).collect()
    }

    /// Events concerning a specific member
    pub fn events_for_member(&self, member_id: &str) -> Vec<&CirculationEvent> {
        self.events
            .iter()
            .filter(|e| e.member_id() == Some(member_id))
            .collect()
    }

    /// Events concerning a specific loan
    pub fn events_for_loan(&self, loan_id: &str) -> Vec<&CirculationEvent> {
        self.events
            .iter()
            .filter(|e| e.loan_id() == Some(loan_id))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn checked_out(loan_id: &str, member_id: &str) -> CirculationEvent {
        let now = Utc::now();
        CirculationEvent::LoanCheckedOut {
            at: now,
            loan_id: loan_id.to_string(),
            member_id: member_id.to_string(),
            copy_id: "copy-1".to_string(),
            due_date: now,
        }
    }

    #[test]
    fn test_event_kind_and_ids() {
        let event = checked_out("loan-1", "member-1");

        assert_eq!(event.kind(), "LoanCheckedOut");
        assert_eq!(event.member_id(), Some("member-1"));
        assert_eq!(event.loan_id(), Some("loan-1"));
    }

    #[test]
    fn test_log_queries() {
        let mut log = EventLog::new();
        log.log(checked_out("loan-1", "member-1"));
        log.log(checked_out("loan-2", "member-2"));
        log.log(CirculationEvent::FineIssued {
            at: Utc::now(),
            fine_id: "fine-1".to_string(),
            loan_id: "loan-1".to_string(),
            member_id: "member-1".to_string(),
            amount_cents: 500,
            reason: "Late return".to_string(),
        });

        assert_eq!(log.len(), 3);
        assert_eq!(log.events_of_kind("LoanCheckedOut").len(), 2);
        assert_eq!(log.events_for_member("member-1").len(), 2);
        assert_eq!(log.events_for_loan("loan-1").len(), 2);
    }

    #[test]
    fn test_serialized_form_is_tagged() {
        let json = serde_json::to_string(&checked_out("loan-1", "member-1")).unwrap();
        assert!(json.contains("\"type\":\"loan_checked_out\""));
    }
}
