//! Circulation Orchestrator
//!
//! The only component that spans transactions touching more than one
//! entity: checkout, return, renew, hold management, fines, and the batch
//! sweeps, each as one atomic unit.
//!
//! See `engine.rs` for full implementation.

pub mod engine;

// Re-export main types for convenience
pub use engine::{
    CheckoutRequest, CirculationEngine, CirculationError, CreateFineRequest, CreateHoldRequest,
    LoanQuery, MemberCirculationStats, ReturnRequest, UpdateFineRequest, UpdateHoldRequest,
};
