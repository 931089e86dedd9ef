//! Library Circulation Core - Rust Engine
//!
//! Transactional circulation engine: checkout, renewal, return, overdue
//! detection, fine assessment, and a fairness-ordered hold queue over a
//! finite set of physical copies.
//!
//! # Architecture
//!
//! - **core**: Clock abstraction and calendar arithmetic
//! - **models**: Domain rows (Copy, Loan, Reservation, Fine) and the store
//! - **policy**: Borrow/renew eligibility evaluation
//! - **inventory**: Copy claim/release primitives
//! - **holds**: Per-material FIFO queue mechanics
//! - **fines**: Overdue-fine formula and member aggregates
//! - **orchestrator**: Transactional facade spanning all entities
//! - **api**: Authorization context and the external operation surface
//!
//! # Critical Invariants
//!
//! 1. All money values are i64 (cents)
//! 2. At most one open loan references a copy at any time, and a copy is
//!    BORROWED iff such a loan exists
//! 3. Every orchestrator operation is one atomic unit: queue renumbering
//!    commits with the status change that triggered it, and a failed
//!    operation commits nothing

// Module declarations
pub mod api;
pub mod core;
pub mod fines;
pub mod holds;
pub mod inventory;
pub mod models;
pub mod orchestrator;
pub mod policy;

// Re-exports for convenience
pub use crate::core::clock::{Clock, FixedClock, SystemClock};
pub use api::{AuthContext, CirculationApi};
pub use fines::{assess_overdue_fine, member_fine_stats, MemberFineStats};
pub use models::{
    config::{ConfigError, ConfigurationUpdate, LoanConfiguration},
    copy::{CopyCondition, CopyError, CopyStatus, MaterialCopy},
    event::{CirculationEvent, EventLog},
    fine::{Fine, FineError, FineStatus},
    loan::{Loan, LoanError, LoanStatus},
    member::{AccountState, MemberCondition, MemberSnapshot},
    reservation::{Reservation, ReservationError, ReservationStatus},
    store::{CirculationStore, MaterialRecord},
};
pub use orchestrator::{
    CheckoutRequest, CirculationEngine, CirculationError, CreateFineRequest, CreateHoldRequest,
    LoanQuery, MemberCirculationStats, ReturnRequest, UpdateFineRequest, UpdateHoldRequest,
};
pub use policy::{can_borrow, can_renew, DenialReason, EligibilityAssessment};
