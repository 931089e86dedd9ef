//! Circulation store
//!
//! Owns every row the engine operates on: member and material snapshots,
//! copies, loans, reservations, fines, and the policy record. The
//! orchestrator wraps one store in a lock; one lock acquisition is one
//! transaction.
//!
//! # Critical Invariants
//!
//! 1. **Row Uniqueness**: each id appears exactly once per map
//! 2. **No Orphans**: every copy references a registered material; loans,
//!    reservations and fines reference rows that exist
//! 3. **FIFO Ordering**: pending reservations on a material are totally
//!    ordered by (reservation_date, arrival sequence)

use crate::models::config::LoanConfiguration;
use crate::models::copy::MaterialCopy;
use crate::models::fine::{Fine, FineStatus};
use crate::models::loan::Loan;
use crate::models::member::MemberSnapshot;
use crate::models::reservation::{Reservation, ReservationStatus};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Catalog facts the engine needs about a material: existence and an
/// optional loan-length override. Titles, authors and search live in the
/// external catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaterialRecord {
    /// Catalog material id
    id: String,

    /// Loan length override in days; None falls back to configuration
    loan_days_override: Option<u32>,
}

impl MaterialRecord {
    /// Register a material with no loan-length override.
    pub fn new(id: String) -> Self {
        Self {
            id,
            loan_days_override: None,
        }
    }

    /// Set a loan-length override (builder pattern).
    pub fn with_loan_days(mut self, days: u32) -> Self {
        assert!(days > 0, "loan days override must be positive");
        self.loan_days_override = Some(days);
        self
    }

    /// Get material id
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Get the loan-length override, if any
    pub fn loan_days_override(&self) -> Option<u32> {
        self.loan_days_override
    }
}

/// Complete circulation state.
#[derive(Debug, Clone)]
pub struct CirculationStore {
    /// Member snapshots from the directory, indexed by id
    members: HashMap<String, MemberSnapshot>,

    /// Catalog material facts, indexed by id
    materials: HashMap<String, MaterialRecord>,

    /// Physical copies, indexed by id
    copies: HashMap<String, MaterialCopy>,

    /// All loans, indexed by id
    loans: HashMap<String, Loan>,

    /// All reservations, indexed by id
    reservations: HashMap<String, Reservation>,

    /// All fines, indexed by id
    fines: HashMap<String, Fine>,

    /// The singleton policy record
    config: LoanConfiguration,

    /// Arrival counter for reservation FIFO tie-breaking
    next_sequence: u64,
}

impl CirculationStore {
    /// Create an empty store with the given policy record.
    pub fn new(config: LoanConfiguration) -> Self {
        Self {
            members: HashMap::new(),
            materials: HashMap::new(),
            copies: HashMap::new(),
            loans: HashMap::new(),
            reservations: HashMap::new(),
            fines: HashMap::new(),
            config,
            next_sequence: 0,
        }
    }

    // ------------------------------------------------------------------
    // Configuration
    // ------------------------------------------------------------------

    /// Get the policy record
    pub fn config(&self) -> &LoanConfiguration {
        &self.config
    }

    pub(crate) fn set_config(&mut self, config: LoanConfiguration) {
        self.config = config;
    }

    // ------------------------------------------------------------------
    // Registration
    // ------------------------------------------------------------------

    /// Add a member snapshot
    ///
    /// # Panics
    /// Panics if the member id already exists
    pub fn add_member(&mut self, member: MemberSnapshot) {
        let id = member.id().to_string();
        assert!(
            !self.members.contains_key(&id),
            "Member ID {} already exists",
            id
        );
        self.members.insert(id, member);
    }

    /// Insert or replace a member snapshot (directory refresh)
    pub fn sync_member(&mut self, member: MemberSnapshot) {
        self.members.insert(member.id().to_string(), member);
    }

    /// Add a material record
    ///
    /// # Panics
    /// Panics if the material id already exists
    pub fn add_material(&mut self, material: MaterialRecord) {
        let id = material.id().to_string();
        assert!(
            !self.materials.contains_key(&id),
            "Material ID {} already exists",
            id
        );
        self.materials.insert(id, material);
    }

    /// Add a physical copy
    ///
    /// # Panics
    /// Panics if the copy id already exists or its material is unknown
    pub fn add_copy(&mut self, copy: MaterialCopy) {
        let id = copy.id().to_string();
        assert!(
            !self.copies.contains_key(&id),
            "Copy ID {} already exists",
            id
        );
        assert!(
            self.materials.contains_key(copy.material_id()),
            "Copy {} references unknown material {}",
            id,
            copy.material_id()
        );
        self.copies.insert(id, copy);
    }

    /// Add a loan
    ///
    /// # Panics
    /// Panics if the loan id already exists
    pub fn add_loan(&mut self, loan: Loan) {
        let id = loan.id().to_string();
        assert!(
            !self.loans.contains_key(&id),
            "Loan ID {} already exists",
            id
        );
        self.loans.insert(id, loan);
    }

    /// Add a reservation, assigning its arrival sequence
    ///
    /// # Panics
    /// Panics if the reservation id already exists
    pub fn add_reservation(&mut self, mut reservation: Reservation) {
        let id = reservation.id().to_string();
        assert!(
            !self.reservations.contains_key(&id),
            "Reservation ID {} already exists",
            id
        );
        reservation.set_sequence(self.next_sequence);
        self.next_sequence += 1;
        self.reservations.insert(id, reservation);
    }

    /// Add a fine
    ///
    /// # Panics
    /// Panics if the fine id already exists
    pub fn add_fine(&mut self, fine: Fine) {
        let id = fine.id().to_string();
        assert!(
            !self.fines.contains_key(&id),
            "Fine ID {} already exists",
            id
        );
        self.fines.insert(id, fine);
    }

    // ------------------------------------------------------------------
    // Row access
    // ------------------------------------------------------------------

    /// Get a member snapshot by id
    pub fn get_member(&self, id: &str) -> Option<&MemberSnapshot> {
        self.members.get(id)
    }

    /// Get a material record by id
    pub fn get_material(&self, id: &str) -> Option<&MaterialRecord> {
        self.materials.get(id)
    }

    /// Get a copy by id
    pub fn get_copy(&self, id: &str) -> Option<&MaterialCopy> {
        self.copies.get(id)
    }

    /// Get a mutable copy by id
    pub fn get_copy_mut(&mut self, id: &str) -> Option<&mut MaterialCopy> {
        self.copies.get_mut(id)
    }

    /// Get a loan by id
    pub fn get_loan(&self, id: &str) -> Option<&Loan> {
        self.loans.get(id)
    }

    /// Get a mutable loan by id
    pub fn get_loan_mut(&mut self, id: &str) -> Option<&mut Loan> {
        self.loans.get_mut(id)
    }

    /// Get a reservation by id
    pub fn get_reservation(&self, id: &str) -> Option<&Reservation> {
        self.reservations.get(id)
    }

    /// Get a mutable reservation by id
    pub fn get_reservation_mut(&mut self, id: &str) -> Option<&mut Reservation> {
        self.reservations.get_mut(id)
    }

    /// Get a fine by id
    pub fn get_fine(&self, id: &str) -> Option<&Fine> {
        self.fines.get(id)
    }

    /// Get a mutable fine by id
    pub fn get_fine_mut(&mut self, id: &str) -> Option<&mut Fine> {
        self.fines.get_mut(id)
    }

    /// All loans, unordered
    pub fn loans(&self) -> impl Iterator<Item = &Loan> {
        self.loans.values()
    }

    /// All reservations, unordered
    pub fn reservations(&self) -> impl Iterator<Item = &Reservation> {
        self.reservations.values()
    }

    /// All fines, unordered
    pub fn fines(&self) -> impl Iterator<Item = &Fine> {
        self.fines.values()
    }

    // ------------------------------------------------------------------
    // Loan queries
    // ------------------------------------------------------------------

    /// Open (Active or Overdue) loans for a member
    pub fn open_loans_for_member(&self, member_id: &str) -> Vec<&Loan> {
        self.loans
            .values()
            .filter(|l| l.member_id() == member_id && l.is_open())
            .collect()
    }

    /// Number of open loans for a member
    pub fn open_loan_count(&self, member_id: &str) -> usize {
        self.open_loans_for_member(member_id).len()
    }

    /// Whether the member has any loan currently in Overdue status
    pub fn has_overdue_loan(&self, member_id: &str) -> bool {
        self.loans.values().any(|l| {
            l.member_id() == member_id && l.status() == crate::models::loan::LoanStatus::Overdue
        })
    }

    /// The open loan referencing a copy, if one exists
    pub fn open_loan_for_copy(&self, copy_id: &str) -> Option<&Loan> {
        self.loans
            .values()
            .find(|l| l.copy_id() == copy_id && l.is_open())
    }

    // ------------------------------------------------------------------
    // Reservation queries
    // ------------------------------------------------------------------

    /// Pending reservations on a material in FIFO order
    pub fn pending_reservations_for_material(&self, material_id: &str) -> Vec<&Reservation> {
        let mut pending: Vec<&Reservation> = self
            .reservations
            .values()
            .filter(|r| {
                r.material_id() == material_id && r.status() == ReservationStatus::Pending
            })
            .collect();
        pending.sort_by_key(|r| r.fifo_key());
        pending
    }

    /// Id of the oldest pending reservation on a material
    pub fn oldest_pending_reservation_id(&self, material_id: &str) -> Option<String> {
        self.pending_reservations_for_material(material_id)
            .first()
            .map(|r| r.id().to_string())
    }

    /// The member's open (Pending or Ready) reservation on a material
    pub fn open_reservation_for(&self, member_id: &str, material_id: &str) -> Option<&Reservation> {
        self.reservations
            .values()
            .find(|r| r.member_id() == member_id && r.material_id() == material_id && r.is_open())
    }

    /// The READY reservation a copy is bound to, if any
    pub fn ready_reservation_for_copy(&self, copy_id: &str) -> Option<&Reservation> {
        self.reservations
            .values()
            .find(|r| r.status() == ReservationStatus::Ready && r.copy_id() == Some(copy_id))
    }

    // ------------------------------------------------------------------
    // Copy queries
    // ------------------------------------------------------------------

    /// Id of an available, lendable copy of a material.
    ///
    /// The lexicographically smallest copy id wins so selection is
    /// deterministic across runs.
    pub fn available_copy_id_for_material(&self, material_id: &str) -> Option<String> {
        self.copies
            .values()
            .filter(|c| c.material_id() == material_id && c.is_available() && c.is_lendable())
            .map(|c| c.id().to_string())
            .min()
    }

    // ------------------------------------------------------------------
    // Fine queries
    // ------------------------------------------------------------------

    /// Fines recorded against a member's loans
    pub fn fines_for_member(&self, member_id: &str) -> Vec<&Fine> {
        self.fines
            .values()
            .filter(|f| {
                self.loans
                    .get(f.loan_id())
                    .map(|l| l.member_id() == member_id)
                    .unwrap_or(false)
            })
            .collect()
    }

    /// Outstanding cents across a member's PENDING fines
    pub fn unpaid_fine_cents(&self, member_id: &str) -> i64 {
        self.fines_for_member(member_id)
            .iter()
            .filter(|f| f.status() == FineStatus::Pending)
            .map(|f| f.outstanding_cents())
            .sum()
    }
}
