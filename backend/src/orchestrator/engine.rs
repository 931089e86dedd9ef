//! Circulation Engine
//!
//! Transactional facade over the circulation store. Every public
//! operation:
//!
//! 1. takes the store lock once (the transaction boundary),
//! 2. validates against live rows,
//! 3. mutates, and
//! 4. appends events,
//!
//! so a failing operation commits nothing and no two operations can both
//! observe a copy as AVAILABLE and both claim it. Queue-position
//! recomputation always runs inside the same locked scope as the status
//! change that triggered it.
//!
//! Batch sweeps (`update_overdue_loans`, `expire_holds`) continue past
//! per-row failures and report the ids they actually transitioned.
//!
//! # Example
//!
//! ```rust
//! use circulation_core_rs::models::config::LoanConfiguration;
//! use circulation_core_rs::models::copy::MaterialCopy;
//! use circulation_core_rs::models::member::{AccountState, MemberSnapshot};
//! use circulation_core_rs::models::store::MaterialRecord;
//! use circulation_core_rs::orchestrator::{CheckoutRequest, CirculationEngine};
//!
//! let engine = CirculationEngine::new(LoanConfiguration::default()).unwrap();
//! engine.register_member(MemberSnapshot::new("m1".to_string(), AccountState::Active));
//! engine.register_material(MaterialRecord::new("mat-1".to_string()));
//! let copy = MaterialCopy::new("mat-1".to_string());
//! let copy_id = copy.id().to_string();
//! engine.register_copy(copy);
//!
//! let loan = engine
//!     .checkout(CheckoutRequest {
//!         member_id: "m1".to_string(),
//!         copy_id,
//!         processed_by_id: "staff-1".to_string(),
//!         loan_date: None,
//!         notes: None,
//!     })
//!     .unwrap();
//! assert_eq!(loan.renewal_count(), 0);
//! ```

use crate::core::clock::{Clock, SystemClock};
use crate::fines::{self, MemberFineStats};
use crate::holds;
use crate::inventory::{self, ClaimKind, ReleaseTarget};
use crate::models::config::{ConfigError, ConfigurationUpdate, LoanConfiguration};
use crate::models::copy::{CopyError, CopyStatus, MaterialCopy};
use crate::models::event::{CirculationEvent, EventLog};
use crate::models::fine::{Fine, FineError, FineStatus};
use crate::models::loan::{Loan, LoanError, LoanStatus};
use crate::models::member::MemberSnapshot;
use crate::models::reservation::{Reservation, ReservationError, ReservationStatus};
use crate::models::store::{CirculationStore, MaterialRecord};
use crate::policy;
use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

// ============================================================================
// Error taxonomy
// ============================================================================

/// Circulation error categories surfaced to callers.
///
/// Every failure is one of: unknown id, operation illegal from the current
/// status, eligibility failure (carrying all reasons), state conflict, or
/// an authorization failure. Nothing is silently downgraded.
#[derive(Debug, Error, PartialEq)]
pub enum CirculationError {
    #[error("Member not found: {0}")]
    MemberNotFound(String),

    #[error("Material not found: {0}")]
    MaterialNotFound(String),

    #[error("Copy not found: {0}")]
    CopyNotFound(String),

    #[error("Loan not found: {0}")]
    LoanNotFound(String),

    #[error("Reservation not found: {0}")]
    ReservationNotFound(String),

    #[error("Fine not found: {0}")]
    FineNotFound(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Borrowing blocked: {}", .reasons.join("; "))]
    PolicyViolation { reasons: Vec<String> },

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),
}

impl From<CopyError> for CirculationError {
    fn from(err: CopyError) -> Self {
        match err {
            CopyError::NotClaimed { .. } | CopyError::NotReserved { .. } => {
                CirculationError::InvalidState(err.to_string())
            }
            CopyError::NotAvailable { .. } | CopyError::NotLendable { .. } => {
                CirculationError::Conflict(err.to_string())
            }
        }
    }
}

impl From<LoanError> for CirculationError {
    fn from(err: LoanError) -> Self {
        CirculationError::InvalidState(err.to_string())
    }
}

impl From<ReservationError> for CirculationError {
    fn from(err: ReservationError) -> Self {
        CirculationError::InvalidState(err.to_string())
    }
}

impl From<FineError> for CirculationError {
    fn from(err: FineError) -> Self {
        CirculationError::InvalidState(err.to_string())
    }
}

impl From<ConfigError> for CirculationError {
    fn from(err: ConfigError) -> Self {
        CirculationError::InvalidState(err.to_string())
    }
}

// ============================================================================
// Operation request types
// ============================================================================

/// Checkout command: create a loan and claim a copy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutRequest {
    /// Borrowing member
    pub member_id: String,

    /// Copy to lend
    pub copy_id: String,

    /// Staff member processing the checkout
    pub processed_by_id: String,

    /// Loan start; defaults to now
    pub loan_date: Option<DateTime<Utc>>,

    /// Free-form staff notes
    pub notes: Option<String>,
}

/// Return command: close a loan, assess a fine, fulfill the next hold.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReturnRequest {
    /// Loan being returned
    pub loan_id: String,

    /// Return instant; defaults to now
    pub return_date: Option<DateTime<Utc>>,
}

/// Hold placement command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateHoldRequest {
    /// Holding member
    pub member_id: String,

    /// Requested material
    pub material_id: String,

    /// Free-form notes
    pub notes: Option<String>,
}

/// Staff hold status update: every optional field enumerated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateHoldRequest {
    /// Reservation to update
    pub reservation_id: String,

    /// Target status
    pub status: ReservationStatus,

    /// Copy to bind; required when the target status is READY
    pub copy_id: Option<String>,

    /// Pickup-window end; defaults to now + configured hold days
    pub expiration_date: Option<DateTime<Utc>>,
}

/// Staff fine creation command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateFineRequest {
    /// Loan the fine is recorded against
    pub loan_id: String,

    /// Issuing staff member
    pub issued_by_id: String,

    /// Assessed amount (cents)
    pub amount_cents: i64,

    /// Human-readable reason
    pub reason: String,
}

/// Fine patch: record a payment and/or waive.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateFineRequest {
    /// Fine to update
    pub fine_id: String,

    /// New cumulative paid amount (cents)
    pub paid_cents: Option<i64>,

    /// Explicit status transition; only WAIVED is accepted here, PAID
    /// follows from payment
    pub status: Option<FineStatus>,

    /// Settlement stamp; defaults to now when payment completes
    pub paid_date: Option<DateTime<Utc>>,
}

/// Loan listing filters with optional paging.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoanQuery {
    /// Restrict to one member
    pub member_id: Option<String>,

    /// Restrict to one status
    pub status: Option<LoanStatus>,

    /// Restrict to loans currently past due
    pub overdue_only: bool,

    /// 1-based page number
    pub page: usize,

    /// Page size; 0 disables paging
    pub page_size: usize,
}

impl Default for LoanQuery {
    fn default() -> Self {
        Self {
            member_id: None,
            status: None,
            overdue_only: false,
            page: 1,
            page_size: 0,
        }
    }
}

/// Per-member circulation summary for the stats surface.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemberCirculationStats {
    pub member_id: String,

    /// Loans currently in ACTIVE status
    pub active_loans: usize,

    /// Loans currently in OVERDUE status
    pub overdue_loans: usize,

    /// Fine aggregates
    pub fines: MemberFineStats,

    /// Whether a new checkout would pass eligibility
    pub can_borrow: bool,

    /// Every failing eligibility reason, rendered
    pub reasons: Vec<String>,
}

// ============================================================================
// Engine
// ============================================================================

/// Rows and the event log, guarded together so events commit with the
/// state change that produced them.
#[derive(Debug)]
struct Inner {
    store: CirculationStore,
    events: EventLog,
}

/// Transactional circulation engine.
///
/// Invoked by many concurrent request handlers; all ordering guarantees
/// come from the single store lock. No operation holds the lock across
/// external I/O.
pub struct CirculationEngine {
    inner: Mutex<Inner>,
    clock: Arc<dyn Clock>,
}

impl CirculationEngine {
    /// Create an engine with the given policy record and the system clock.
    pub fn new(config: LoanConfiguration) -> Result<Self, CirculationError> {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Create an engine with an explicit clock (tests pin time with
    /// `FixedClock`).
    pub fn with_clock(
        config: LoanConfiguration,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, CirculationError> {
        config.validate()?;
        Ok(Self {
            inner: Mutex::new(Inner {
                store: CirculationStore::new(config),
                events: EventLog::new(),
            }),
            clock,
        })
    }

    // ------------------------------------------------------------------
    // Registration (fed by the catalog and member directory)
    // ------------------------------------------------------------------

    /// Register a member snapshot.
    pub fn register_member(&self, member: MemberSnapshot) {
        self.inner.lock().store.add_member(member);
    }

    /// Insert or refresh a member snapshot from the directory.
    pub fn sync_member(&self, member: MemberSnapshot) {
        self.inner.lock().store.sync_member(member);
    }

    /// Register a catalog material.
    pub fn register_material(&self, material: MaterialRecord) {
        self.inner.lock().store.add_material(material);
    }

    /// Register a physical copy.
    pub fn register_copy(&self, copy: MaterialCopy) {
        self.inner.lock().store.add_copy(copy);
    }

    // ------------------------------------------------------------------
    // Checkout
    // ------------------------------------------------------------------

    /// Create a loan for a member against a copy.
    ///
    /// One transaction: member gate, copy gate, full eligibility
    /// evaluation, due-date computation, copy claim, loan creation. A copy
    /// RESERVED for the borrowing member's own READY hold is accepted and
    /// the hold becomes PICKED_UP in the same transaction.
    pub fn checkout(&self, request: CheckoutRequest) -> Result<Loan, CirculationError> {
        let mut inner = self.inner.lock();
        let Inner { store, events } = &mut *inner;
        let now = self.clock.now();
        let loan_date = request.loan_date.unwrap_or(now);

        let member = store
            .get_member(&request.member_id)
            .ok_or_else(|| CirculationError::MemberNotFound(request.member_id.clone()))?;
        if !member.is_active() {
            return Err(CirculationError::InvalidState(format!(
                "member {} account is {:?}",
                member.id(),
                member.account_state()
            )));
        }
        let member = member.clone();

        let copy = store
            .get_copy(&request.copy_id)
            .ok_or_else(|| CirculationError::CopyNotFound(request.copy_id.clone()))?;
        if !copy.is_lendable() {
            return Err(CirculationError::Conflict(format!(
                "copy {} cannot circulate in condition {:?}",
                copy.id(),
                copy.condition()
            )));
        }
        let material_id = copy.material_id().to_string();

        // Plain shelf checkout, or hand-off of the member's own READY hold
        let held_reservation_id = match copy.status() {
            CopyStatus::Available => None,
            CopyStatus::Reserved => match store.ready_reservation_for_copy(&request.copy_id) {
                Some(r) if r.member_id() == request.member_id => Some(r.id().to_string()),
                _ => {
                    return Err(CirculationError::Conflict(format!(
                        "copy {} is held for another member",
                        request.copy_id
                    )))
                }
            },
            status => {
                return Err(CirculationError::Conflict(format!(
                    "copy {} is {}",
                    request.copy_id,
                    status.as_str()
                )))
            }
        };

        if store.open_loan_for_copy(&request.copy_id).is_some() {
            return Err(CirculationError::Conflict(format!(
                "copy {} already has an open loan",
                request.copy_id
            )));
        }

        let assessment = policy::can_borrow(store, &member);
        if !assessment.allowed() {
            return Err(CirculationError::PolicyViolation {
                reasons: assessment.reason_messages(),
            });
        }

        let material = store
            .get_material(&material_id)
            .ok_or_else(|| CirculationError::MaterialNotFound(material_id.clone()))?;
        let loan_days = material
            .loan_days_override()
            .unwrap_or(store.config().default_loan_days);
        let due_date = loan_date + Duration::days(loan_days as i64);

        {
            let copy = store
                .get_copy_mut(&request.copy_id)
                .expect("validated copy row exists");
            match held_reservation_id {
                Some(_) => inventory::handoff(copy)?,
                None => inventory::claim(copy, ClaimKind::Borrow)?,
            }
        }

        if let Some(reservation_id) = &held_reservation_id {
            let reservation = store
                .get_reservation_mut(reservation_id)
                .expect("validated reservation row exists");
            reservation.mark_picked_up()?;
            events.log(CirculationEvent::HoldPickedUp {
                at: now,
                reservation_id: reservation_id.clone(),
                member_id: request.member_id.clone(),
                copy_id: request.copy_id.clone(),
            });
        }

        let mut loan = Loan::new(
            request.member_id.clone(),
            request.copy_id.clone(),
            request.processed_by_id,
            loan_date,
            due_date,
        );
        if let Some(notes) = request.notes {
            loan = loan.with_notes(notes);
        }
        let snapshot = loan.clone();
        store.add_loan(loan);

        events.log(CirculationEvent::LoanCheckedOut {
            at: now,
            loan_id: snapshot.id().to_string(),
            member_id: request.member_id.clone(),
            copy_id: request.copy_id.clone(),
            due_date,
        });
        tracing::info!(
            loan_id = %snapshot.id(),
            member_id = %request.member_id,
            copy_id = %request.copy_id,
            "loan checked out"
        );

        Ok(snapshot)
    }

    // ------------------------------------------------------------------
    // Return
    // ------------------------------------------------------------------

    /// Close a loan, assess any overdue fine, and fulfill the next hold.
    ///
    /// One transaction. When a pending hold exists for the material the
    /// copy goes RESERVED to it instead of back to AVAILABLE, and the
    /// remaining queue renumbers in the same scope.
    pub fn return_loan(&self, request: ReturnRequest) -> Result<Loan, CirculationError> {
        let mut inner = self.inner.lock();
        let Inner { store, events } = &mut *inner;
        let now = self.clock.now();
        let return_date = request.return_date.unwrap_or(now);

        let loan = store
            .get_loan(&request.loan_id)
            .ok_or_else(|| CirculationError::LoanNotFound(request.loan_id.clone()))?;
        if !loan.is_open() {
            return Err(CirculationError::InvalidState(format!(
                "loan {} is {:?} and cannot be returned",
                loan.id(),
                loan.status()
            )));
        }
        let loan_id = loan.id().to_string();
        let member_id = loan.member_id().to_string();
        let copy_id = loan.copy_id().to_string();
        let processed_by_id = loan.processed_by_id().to_string();
        let due_date = loan.due_date();

        let copy = store
            .get_copy(&copy_id)
            .ok_or_else(|| CirculationError::CopyNotFound(copy_id.clone()))?;
        let material_id = copy.material_id().to_string();
        let copy_lendable = copy.is_lendable();

        let fine_cents = fines::assess_overdue_fine(store.config(), due_date, return_date);
        let was_late = return_date > due_date;

        store
            .get_loan_mut(&loan_id)
            .expect("validated loan row exists")
            .close(return_date)?;
        {
            let copy = store
                .get_copy_mut(&copy_id)
                .expect("validated copy row exists");
            inventory::release(copy, ReleaseTarget::Available)?;
        }
        events.log(CirculationEvent::LoanReturned {
            at: now,
            loan_id: loan_id.clone(),
            member_id: member_id.clone(),
            copy_id: copy_id.clone(),
            overdue: was_late,
        });

        if fine_cents > 0 {
            let fine = Fine::new(
                loan_id.clone(),
                processed_by_id,
                fine_cents,
                "Late return".to_string(),
                now,
            );
            events.log(CirculationEvent::FineIssued {
                at: now,
                fine_id: fine.id().to_string(),
                loan_id: loan_id.clone(),
                member_id: member_id.clone(),
                amount_cents: fine_cents,
                reason: fine.reason().to_string(),
            });
            tracing::info!(
                loan_id = %loan_id,
                member_id = %member_id,
                amount_cents = fine_cents,
                "overdue fine assessed"
            );
            store.add_fine(fine);
        }

        if copy_lendable {
            if let Some(reservation_id) =
                holds::fulfill_with_copy(store, &material_id, &copy_id, now)?
            {
                Self::log_hold_ready(store, events, &reservation_id, now);
            }
        }

        tracing::info!(loan_id = %loan_id, copy_id = %copy_id, "loan returned");
        Ok(store
            .get_loan(&loan_id)
            .expect("returned loan row exists")
            .clone())
    }

    // ------------------------------------------------------------------
    // Renewal
    // ------------------------------------------------------------------

    /// Advance a loan's due date by its loan length.
    ///
    /// The new due date compounds from the current schedule, not from the
    /// renewal instant. No copy or queue side effects.
    pub fn renew_loan(&self, loan_id: &str) -> Result<Loan, CirculationError> {
        let mut inner = self.inner.lock();
        let Inner { store, events } = &mut *inner;
        let now = self.clock.now();

        let loan = store
            .get_loan(loan_id)
            .ok_or_else(|| CirculationError::LoanNotFound(loan_id.to_string()))?
            .clone();

        let assessment = policy::can_renew(store, &loan, now);
        if !assessment.allowed() {
            return Err(CirculationError::PolicyViolation {
                reasons: assessment.reason_messages(),
            });
        }

        let copy = store
            .get_copy(loan.copy_id())
            .ok_or_else(|| CirculationError::CopyNotFound(loan.copy_id().to_string()))?;
        let material = store
            .get_material(copy.material_id())
            .ok_or_else(|| CirculationError::MaterialNotFound(copy.material_id().to_string()))?;
        let loan_days = material
            .loan_days_override()
            .unwrap_or(store.config().default_loan_days);
        let new_due_date = loan.due_date() + Duration::days(loan_days as i64);

        let row = store
            .get_loan_mut(loan_id)
            .expect("validated loan row exists");
        row.renew(new_due_date)?;
        let snapshot = row.clone();

        events.log(CirculationEvent::LoanRenewed {
            at: now,
            loan_id: snapshot.id().to_string(),
            member_id: snapshot.member_id().to_string(),
            renewal_count: snapshot.renewal_count(),
            new_due_date,
        });
        tracing::info!(
            loan_id = %snapshot.id(),
            renewal_count = snapshot.renewal_count(),
            "loan renewed"
        );

        Ok(snapshot)
    }

    // ------------------------------------------------------------------
    // Overdue sweep
    // ------------------------------------------------------------------

    /// Flip every ACTIVE loan past its due date to OVERDUE.
    ///
    /// Idempotent; already-OVERDUE loans are untouched. Returns the ids
    /// actually transitioned, continuing past per-row failures.
    pub fn update_overdue_loans(&self) -> Vec<String> {
        let mut inner = self.inner.lock();
        let Inner { store, events } = &mut *inner;
        let now = self.clock.now();

        let mut candidates: Vec<(DateTime<Utc>, String, String)> = store
            .loans()
            .filter(|l| l.status() == LoanStatus::Active && l.is_past_due(now))
            .map(|l| {
                (
                    l.loan_date(),
                    l.id().to_string(),
                    l.member_id().to_string(),
                )
            })
            .collect();
        candidates.sort();

        let mut updated = Vec::new();
        for (_, loan_id, member_id) in candidates {
            let Some(loan) = store.get_loan_mut(&loan_id) else {
                continue;
            };
            if loan.mark_overdue().is_err() {
                continue;
            }
            events.log(CirculationEvent::LoanMarkedOverdue {
                at: now,
                loan_id: loan_id.clone(),
                member_id,
            });
            updated.push(loan_id);
        }

        tracing::info!(count = updated.len(), "overdue sweep completed");
        updated
    }

    // ------------------------------------------------------------------
    // Holds
    // ------------------------------------------------------------------

    /// Place a hold on a material.
    ///
    /// Rejects a duplicate open hold for the same member and material.
    /// When an available copy exists the hold is READY immediately and the
    /// copy goes RESERVED; otherwise it joins the FIFO queue.
    pub fn create_hold(&self, request: CreateHoldRequest) -> Result<Reservation, CirculationError> {
        let mut inner = self.inner.lock();
        let Inner { store, events } = &mut *inner;
        let now = self.clock.now();

        store
            .get_member(&request.member_id)
            .ok_or_else(|| CirculationError::MemberNotFound(request.member_id.clone()))?;
        store
            .get_material(&request.material_id)
            .ok_or_else(|| CirculationError::MaterialNotFound(request.material_id.clone()))?;

        if store
            .open_reservation_for(&request.member_id, &request.material_id)
            .is_some()
        {
            return Err(CirculationError::Conflict(format!(
                "member {} already has an open reservation for material {}",
                request.member_id, request.material_id
            )));
        }

        let available_copy = store.available_copy_id_for_material(&request.material_id);

        let mut hold = match &available_copy {
            Some(copy_id) => {
                let hold_days = store.config().reservation_hold_days as i64;
                {
                    let copy = store
                        .get_copy_mut(copy_id)
                        .expect("available copy row exists");
                    inventory::claim(copy, ClaimKind::Hold)?;
                }
                Reservation::new_ready(
                    request.member_id.clone(),
                    request.material_id.clone(),
                    copy_id.clone(),
                    now,
                    now + Duration::days(hold_days),
                )
            }
            None => {
                let position = holds::next_queue_position(store, &request.material_id);
                Reservation::new_pending(
                    request.member_id.clone(),
                    request.material_id.clone(),
                    now,
                    position,
                )
            }
        };
        if let Some(notes) = request.notes {
            hold = hold.with_notes(notes);
        }
        let reservation_id = hold.id().to_string();
        store.add_reservation(hold);

        let snapshot = store
            .get_reservation(&reservation_id)
            .expect("inserted reservation row exists")
            .clone();

        events.log(CirculationEvent::HoldPlaced {
            at: now,
            reservation_id: reservation_id.clone(),
            member_id: request.member_id.clone(),
            material_id: request.material_id.clone(),
            queue_position: snapshot.queue_position(),
        });
        if snapshot.status() == ReservationStatus::Ready {
            Self::log_hold_ready(store, events, &reservation_id, now);
        }
        tracing::info!(
            reservation_id = %reservation_id,
            member_id = %request.member_id,
            material_id = %request.material_id,
            status = ?snapshot.status(),
            "hold placed"
        );

        Ok(snapshot)
    }

    /// Staff hold status update.
    ///
    /// - READY requires an explicit AVAILABLE copy; any previously bound
    ///   copy is released back to the shelf
    /// - PICKED_UP marks the bound copy BORROWED (the loan itself is
    ///   created by checkout)
    /// - CANCELLED / EXPIRED release the bound copy, renumber the queue,
    ///   and attempt one fulfillment, all in this transaction
    pub fn update_hold(&self, request: UpdateHoldRequest) -> Result<Reservation, CirculationError> {
        let mut inner = self.inner.lock();
        let Inner { store, events } = &mut *inner;
        let now = self.clock.now();

        let reservation = store
            .get_reservation(&request.reservation_id)
            .ok_or_else(|| CirculationError::ReservationNotFound(request.reservation_id.clone()))?;
        if reservation.status().is_terminal() {
            return Err(CirculationError::InvalidState(format!(
                "reservation {} is {:?} and cannot transition",
                reservation.id(),
                reservation.status()
            )));
        }
        let member_id = reservation.member_id().to_string();
        let material_id = reservation.material_id().to_string();
        let was_pending = reservation.status() == ReservationStatus::Pending;
        let previous_copy = reservation.copy_id().map(str::to_string);

        match request.status {
            ReservationStatus::Pending => {
                return Err(CirculationError::InvalidState(
                    "a reservation cannot transition back to PENDING".to_string(),
                ));
            }
            ReservationStatus::Ready => {
                let copy_id = request.copy_id.ok_or_else(|| {
                    CirculationError::InvalidState(
                        "transition to READY requires an explicit copy".to_string(),
                    )
                })?;
                store
                    .get_copy(&copy_id)
                    .ok_or_else(|| CirculationError::CopyNotFound(copy_id.clone()))?;

                let rebind = previous_copy.as_deref() != Some(copy_id.as_str());
                if rebind {
                    let copy = store
                        .get_copy_mut(&copy_id)
                        .expect("validated copy row exists");
                    inventory::claim(copy, ClaimKind::Hold)?;
                    if let Some(previous_id) = &previous_copy {
                        let previous = store
                            .get_copy_mut(previous_id)
                            .expect("bound copy row exists");
                        inventory::release(previous, ReleaseTarget::Available)?;
                    }
                }

                let hold_days = store.config().reservation_hold_days as i64;
                let expiration = request
                    .expiration_date
                    .unwrap_or(now + Duration::days(hold_days));
                store
                    .get_reservation_mut(&request.reservation_id)
                    .expect("validated reservation row exists")
                    .make_ready(copy_id, expiration)?;

                if was_pending {
                    holds::recompute_positions(store, &material_id);
                }
                Self::log_hold_ready(store, events, &request.reservation_id, now);
            }
            ReservationStatus::PickedUp => {
                if was_pending {
                    return Err(CirculationError::InvalidState(format!(
                        "reservation {} is PENDING and has no copy to pick up",
                        request.reservation_id
                    )));
                }
                let copy_id = previous_copy.clone().ok_or_else(|| {
                    CirculationError::InvalidState(format!(
                        "reservation {} has no bound copy to pick up",
                        request.reservation_id
                    ))
                })?;
                let copy = store
                    .get_copy_mut(&copy_id)
                    .expect("bound copy row exists");
                inventory::handoff(copy)?;
                store
                    .get_reservation_mut(&request.reservation_id)
                    .expect("validated reservation row exists")
                    .mark_picked_up()?;
                events.log(CirculationEvent::HoldPickedUp {
                    at: now,
                    reservation_id: request.reservation_id.clone(),
                    member_id,
                    copy_id,
                });
            }
            ReservationStatus::Cancelled | ReservationStatus::Expired => {
                let expire = request.status == ReservationStatus::Expired;
                Self::close_hold(store, events, &request.reservation_id, expire, now)?;
            }
        }

        Ok(store
            .get_reservation(&request.reservation_id)
            .expect("updated reservation row exists")
            .clone())
    }

    /// Withdraw an open hold (member- or staff-initiated).
    pub fn cancel_hold(&self, reservation_id: &str) -> Result<Reservation, CirculationError> {
        let mut inner = self.inner.lock();
        let Inner { store, events } = &mut *inner;
        let now = self.clock.now();

        let reservation = store
            .get_reservation(reservation_id)
            .ok_or_else(|| CirculationError::ReservationNotFound(reservation_id.to_string()))?;
        if !reservation.is_open() {
            return Err(CirculationError::InvalidState(format!(
                "reservation {} is {:?} and cannot be cancelled",
                reservation.id(),
                reservation.status()
            )));
        }

        Self::close_hold(store, events, reservation_id, false, now)?;
        Ok(store
            .get_reservation(reservation_id)
            .expect("cancelled reservation row exists")
            .clone())
    }

    /// Member's soft acknowledgement of a READY hold. Status unchanged.
    pub fn confirm_pickup(
        &self,
        reservation_id: &str,
        member_id: &str,
    ) -> Result<Reservation, CirculationError> {
        let mut inner = self.inner.lock();
        let now = self.clock.now();

        let reservation = inner
            .store
            .get_reservation_mut(reservation_id)
            .ok_or_else(|| CirculationError::ReservationNotFound(reservation_id.to_string()))?;
        if reservation.member_id() != member_id {
            return Err(CirculationError::Forbidden(format!(
                "reservation {} does not belong to member {}",
                reservation_id, member_id
            )));
        }

        reservation.confirm(now)?;
        Ok(reservation.clone())
    }

    /// Lapse every READY hold whose pickup window has passed.
    ///
    /// Each expiration cascades like a cancellation: the copy frees up,
    /// the queue renumbers, and the next pending hold may become READY.
    /// Returns the ids actually expired, continuing past per-row failures.
    pub fn expire_holds(&self) -> Vec<String> {
        let mut inner = self.inner.lock();
        let Inner { store, events } = &mut *inner;
        let now = self.clock.now();

        let mut candidates: Vec<(DateTime<Utc>, String)> = store
            .reservations()
            .filter(|r| {
                r.status() == ReservationStatus::Ready
                    && r.expiration_date().map(|e| e < now).unwrap_or(false)
            })
            .map(|r| (r.reservation_date(), r.id().to_string()))
            .collect();
        candidates.sort();

        let mut expired = Vec::new();
        for (_, reservation_id) in candidates {
            match Self::close_hold(store, events, &reservation_id, true, now) {
                Ok(()) => expired.push(reservation_id),
                Err(err) => {
                    tracing::warn!(
                        reservation_id = %reservation_id,
                        error = %err,
                        "hold expiration skipped"
                    );
                }
            }
        }

        tracing::info!(count = expired.len(), "hold expiration sweep completed");
        expired
    }

    /// Cancel or expire a hold: release the bound copy, renumber the
    /// queue, and attempt one fulfillment, all inside the caller's locked
    /// scope.
    fn close_hold(
        store: &mut CirculationStore,
        events: &mut EventLog,
        reservation_id: &str,
        expire: bool,
        now: DateTime<Utc>,
    ) -> Result<(), CirculationError> {
        let reservation = store
            .get_reservation(reservation_id)
            .ok_or_else(|| CirculationError::ReservationNotFound(reservation_id.to_string()))?;
        let member_id = reservation.member_id().to_string();
        let material_id = reservation.material_id().to_string();
        let bound_copy = reservation.copy_id().map(str::to_string);

        {
            let reservation = store
                .get_reservation_mut(reservation_id)
                .expect("validated reservation row exists");
            if expire {
                reservation.expire()?;
            } else {
                reservation.cancel()?;
            }
        }

        if let Some(copy_id) = bound_copy {
            let copy = store
                .get_copy_mut(&copy_id)
                .expect("bound copy row exists");
            inventory::release(copy, ReleaseTarget::Available)?;
        }

        holds::recompute_positions(store, &material_id);

        let event = if expire {
            CirculationEvent::HoldExpired {
                at: now,
                reservation_id: reservation_id.to_string(),
                member_id,
                material_id: material_id.clone(),
            }
        } else {
            CirculationEvent::HoldCancelled {
                at: now,
                reservation_id: reservation_id.to_string(),
                member_id,
                material_id: material_id.clone(),
            }
        };
        events.log(event);

        // Cascade: the freed copy can make the next pending hold READY
        if let Some(ready_id) = holds::attempt_fulfillment(store, &material_id, now)? {
            Self::log_hold_ready(store, events, &ready_id, now);
        }

        Ok(())
    }

    fn log_hold_ready(
        store: &CirculationStore,
        events: &mut EventLog,
        reservation_id: &str,
        now: DateTime<Utc>,
    ) {
        let Some(reservation) = store.get_reservation(reservation_id) else {
            return;
        };
        let (Some(copy_id), Some(expiration_date)) =
            (reservation.copy_id(), reservation.expiration_date())
        else {
            return;
        };
        events.log(CirculationEvent::HoldReady {
            at: now,
            reservation_id: reservation_id.to_string(),
            member_id: reservation.member_id().to_string(),
            material_id: reservation.material_id().to_string(),
            copy_id: copy_id.to_string(),
            expiration_date,
        });
        tracing::info!(
            reservation_id = %reservation_id,
            member_id = %reservation.member_id(),
            "hold ready for pickup"
        );
    }

    // ------------------------------------------------------------------
    // Fines
    // ------------------------------------------------------------------

    /// Record a staff-issued fine against a loan.
    pub fn create_fine(&self, request: CreateFineRequest) -> Result<Fine, CirculationError> {
        let mut inner = self.inner.lock();
        let Inner { store, events } = &mut *inner;
        let now = self.clock.now();

        let loan = store
            .get_loan(&request.loan_id)
            .ok_or_else(|| CirculationError::LoanNotFound(request.loan_id.clone()))?;
        let member_id = loan.member_id().to_string();

        if request.amount_cents <= 0 {
            return Err(CirculationError::InvalidState(
                "fine amount must be positive".to_string(),
            ));
        }

        let fine = Fine::new(
            request.loan_id.clone(),
            request.issued_by_id,
            request.amount_cents,
            request.reason,
            now,
        );
        let snapshot = fine.clone();
        store.add_fine(fine);

        events.log(CirculationEvent::FineIssued {
            at: now,
            fine_id: snapshot.id().to_string(),
            loan_id: request.loan_id,
            member_id,
            amount_cents: snapshot.amount_cents(),
            reason: snapshot.reason().to_string(),
        });

        Ok(snapshot)
    }

    /// Apply a fine patch: record a payment, or waive.
    ///
    /// PAID is never set directly; it follows from the paid amount
    /// reaching the assessed amount.
    pub fn update_fine(&self, request: UpdateFineRequest) -> Result<Fine, CirculationError> {
        let mut inner = self.inner.lock();
        let Inner { store, events } = &mut *inner;
        let now = self.clock.now();

        let fine = store
            .get_fine(&request.fine_id)
            .ok_or_else(|| CirculationError::FineNotFound(request.fine_id.clone()))?;
        let loan_id = fine.loan_id().to_string();
        let member_id = store
            .get_loan(&loan_id)
            .map(|l| l.member_id().to_string())
            .ok_or_else(|| CirculationError::LoanNotFound(loan_id.clone()))?;

        match request.status {
            Some(FineStatus::Waived) => {
                if request.paid_cents.is_some() {
                    return Err(CirculationError::InvalidState(
                        "cannot combine a payment with a waiver".to_string(),
                    ));
                }
                store
                    .get_fine_mut(&request.fine_id)
                    .expect("validated fine row exists")
                    .waive()?;
                events.log(CirculationEvent::FineWaived {
                    at: now,
                    fine_id: request.fine_id.clone(),
                    loan_id,
                    member_id,
                });
            }
            Some(status) => {
                return Err(CirculationError::InvalidState(format!(
                    "fine status {:?} cannot be set directly; it follows from payment",
                    status
                )));
            }
            None => {
                let paid_cents = request.paid_cents.ok_or_else(|| {
                    CirculationError::InvalidState("empty fine update".to_string())
                })?;
                let paid_date = request.paid_date.unwrap_or(now);
                let fine = store
                    .get_fine_mut(&request.fine_id)
                    .expect("validated fine row exists");
                fine.record_payment(paid_cents, paid_date)?;
                if fine.status() == FineStatus::Paid {
                    events.log(CirculationEvent::FinePaid {
                        at: now,
                        fine_id: request.fine_id.clone(),
                        loan_id,
                        member_id,
                        paid_cents,
                    });
                }
            }
        }

        Ok(store
            .get_fine(&request.fine_id)
            .expect("updated fine row exists")
            .clone())
    }

    // ------------------------------------------------------------------
    // Configuration
    // ------------------------------------------------------------------

    /// Current policy record.
    pub fn configuration(&self) -> LoanConfiguration {
        self.inner.lock().store.config().clone()
    }

    /// Apply a validated partial update to the policy record.
    pub fn update_configuration(
        &self,
        update: &ConfigurationUpdate,
        updated_by: &str,
    ) -> Result<LoanConfiguration, CirculationError> {
        let mut inner = self.inner.lock();
        let Inner { store, events } = &mut *inner;
        let now = self.clock.now();

        let merged = update.apply_to(store.config())?;
        store.set_config(merged.clone());
        events.log(CirculationEvent::ConfigurationUpdated {
            at: now,
            updated_by: updated_by.to_string(),
        });
        tracing::info!(updated_by = %updated_by, "loan configuration updated");

        Ok(merged)
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    /// Get a loan by id
    pub fn get_loan(&self, loan_id: &str) -> Option<Loan> {
        self.inner.lock().store.get_loan(loan_id).cloned()
    }

    /// Get a copy by id
    pub fn get_copy(&self, copy_id: &str) -> Option<MaterialCopy> {
        self.inner.lock().store.get_copy(copy_id).cloned()
    }

    /// Get a reservation by id
    pub fn get_reservation(&self, reservation_id: &str) -> Option<Reservation> {
        self.inner
            .lock()
            .store
            .get_reservation(reservation_id)
            .cloned()
    }

    /// Get a fine by id
    pub fn get_fine(&self, fine_id: &str) -> Option<Fine> {
        self.inner.lock().store.get_fine(fine_id).cloned()
    }

    /// Filtered loan listing, ordered by loan date then id.
    pub fn list_loans(&self, query: &LoanQuery) -> Vec<Loan> {
        let inner = self.inner.lock();
        let now = self.clock.now();

        let mut loans: Vec<Loan> = inner
            .store
            .loans()
            .filter(|l| {
                query
                    .member_id
                    .as_deref()
                    .map(|m| l.member_id() == m)
                    .unwrap_or(true)
            })
            .filter(|l| query.status.map(|s| l.status() == s).unwrap_or(true))
            .filter(|l| {
                !query.overdue_only
                    || l.status() == LoanStatus::Overdue
                    || (l.is_open() && l.is_past_due(now))
            })
            .cloned()
            .collect();
        loans.sort_by(|a, b| {
            a.loan_date()
                .cmp(&b.loan_date())
                .then_with(|| a.id().cmp(b.id()))
        });

        if query.page_size == 0 {
            return loans;
        }
        let start = query.page.saturating_sub(1) * query.page_size;
        loans
            .into_iter()
            .skip(start)
            .take(query.page_size)
            .collect()
    }

    /// Pending holds on a material in FIFO order.
    pub fn hold_queue(&self, material_id: &str) -> Vec<Reservation> {
        self.inner
            .lock()
            .store
            .pending_reservations_for_material(material_id)
            .into_iter()
            .cloned()
            .collect()
    }

    /// Per-member circulation summary.
    pub fn member_stats(&self, member_id: &str) -> Result<MemberCirculationStats, CirculationError> {
        let inner = self.inner.lock();
        let store = &inner.store;

        let member = store
            .get_member(member_id)
            .ok_or_else(|| CirculationError::MemberNotFound(member_id.to_string()))?;

        let active_loans = store
            .loans()
            .filter(|l| l.member_id() == member_id && l.status() == LoanStatus::Active)
            .count();
        let overdue_loans = store
            .loans()
            .filter(|l| l.member_id() == member_id && l.status() == LoanStatus::Overdue)
            .count();
        let assessment = policy::can_borrow(store, member);

        Ok(MemberCirculationStats {
            member_id: member_id.to_string(),
            active_loans,
            overdue_loans,
            fines: fines::member_fine_stats(store, member_id),
            can_borrow: assessment.allowed(),
            reasons: assessment.reason_messages(),
        })
    }

    /// All committed events, oldest first.
    pub fn events(&self) -> Vec<CirculationEvent> {
        self.inner.lock().events.events().to_vec()
    }

    /// Events concerning a member, oldest first.
    pub fn events_for_member(&self, member_id: &str) -> Vec<CirculationEvent> {
        self.inner
            .lock()
            .events
            .events_for_member(member_id)
            .into_iter()
            .cloned()
            .collect()
    }

    /// The event log serialized for an external notifier to consume.
    pub fn export_events_json(&self) -> Result<String, CirculationError> {
        let inner = self.inner.lock();
        serde_json::to_string_pretty(inner.events.events())
            .map_err(|err| CirculationError::InvalidState(format!("event export failed: {}", err)))
    }
}
