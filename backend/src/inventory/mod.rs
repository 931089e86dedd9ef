//! Copy Inventory
//!
//! The only code that flips a copy's availability status. Everything here
//! operates on a single copy row and knows nothing about loans or holds;
//! the orchestrator decides when these primitives run and what they mean.
//!
//! # Critical Invariants
//!
//! 1. **Atomicity**: a failed claim or release leaves the copy unchanged
//! 2. **Condition Gate**: Damaged and Lost copies never become BORROWED
//!    or RESERVED
//!
//! # Example
//!
//! ```rust
//! use circulation_core_rs::inventory::{claim, release, ClaimKind, ReleaseTarget};
//! use circulation_core_rs::models::copy::{CopyStatus, MaterialCopy};
//!
//! let mut copy = MaterialCopy::new("mat-1".to_string());
//!
//! claim(&mut copy, ClaimKind::Borrow).unwrap();
//! assert_eq!(copy.status(), CopyStatus::Borrowed);
//!
//! release(&mut copy, ReleaseTarget::Available).unwrap();
//! assert_eq!(copy.status(), CopyStatus::Available);
//! ```

use crate::models::copy::{CopyError, CopyStatus, MaterialCopy};

/// What a successful claim is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClaimKind {
    /// Checkout: AVAILABLE → BORROWED
    Borrow,

    /// Hold fulfillment: AVAILABLE → RESERVED
    Hold,
}

/// Where a release sends the copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseTarget {
    /// Back on the shelf
    Available,

    /// Pulled for repair (administrative path)
    UnderRepair,
}

/// Atomically claim an AVAILABLE copy for a loan or a hold.
///
/// Fails if the copy is not AVAILABLE or its condition forbids lending;
/// on failure no state changes occur.
pub fn claim(copy: &mut MaterialCopy, kind: ClaimKind) -> Result<(), CopyError> {
    if !copy.is_lendable() {
        return Err(CopyError::NotLendable {
            copy_id: copy.id().to_string(),
            condition: copy.condition(),
        });
    }
    if copy.status() != CopyStatus::Available {
        return Err(CopyError::NotAvailable {
            copy_id: copy.id().to_string(),
            status: copy.status(),
        });
    }

    copy.set_status(match kind {
        ClaimKind::Borrow => CopyStatus::Borrowed,
        ClaimKind::Hold => CopyStatus::Reserved,
    });
    Ok(())
}

/// Release a claimed (BORROWED or RESERVED) copy.
pub fn release(copy: &mut MaterialCopy, target: ReleaseTarget) -> Result<(), CopyError> {
    match copy.status() {
        CopyStatus::Borrowed | CopyStatus::Reserved => {
            copy.set_status(match target {
                ReleaseTarget::Available => CopyStatus::Available,
                ReleaseTarget::UnderRepair => CopyStatus::UnderRepair,
            });
            Ok(())
        }
        status => Err(CopyError::NotClaimed {
            copy_id: copy.id().to_string(),
            status,
        }),
    }
}

/// Hand a RESERVED copy over to its holder: RESERVED → BORROWED.
///
/// Used when a READY hold is picked up; the loan row itself is created by
/// checkout, not here.
pub fn handoff(copy: &mut MaterialCopy) -> Result<(), CopyError> {
    if copy.status() != CopyStatus::Reserved {
        return Err(CopyError::NotReserved {
            copy_id: copy.id().to_string(),
            status: copy.status(),
        });
    }

    copy.set_status(CopyStatus::Borrowed);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::copy::CopyCondition;

    #[test]
    fn test_claim_for_borrow_and_hold() {
        let mut copy = MaterialCopy::new("mat-1".to_string());
        claim(&mut copy, ClaimKind::Borrow).unwrap();
        assert_eq!(copy.status(), CopyStatus::Borrowed);

        let mut copy = MaterialCopy::new("mat-1".to_string());
        claim(&mut copy, ClaimKind::Hold).unwrap();
        assert_eq!(copy.status(), CopyStatus::Reserved);
    }

    #[test]
    fn test_claim_requires_available() {
        let mut copy = MaterialCopy::new("mat-1".to_string());
        claim(&mut copy, ClaimKind::Borrow).unwrap();

        let result = claim(&mut copy, ClaimKind::Borrow);
        assert!(matches!(result, Err(CopyError::NotAvailable { .. })));
        assert_eq!(copy.status(), CopyStatus::Borrowed);
    }

    #[test]
    fn test_damaged_copy_never_claimed() {
        let mut copy =
            MaterialCopy::new("mat-1".to_string()).with_condition(CopyCondition::Damaged);

        let result = claim(&mut copy, ClaimKind::Borrow);
        assert!(matches!(result, Err(CopyError::NotLendable { .. })));
        assert_eq!(copy.status(), CopyStatus::Available);
    }

    #[test]
    fn test_lost_copy_never_claimed() {
        let mut copy = MaterialCopy::new("mat-1".to_string()).with_condition(CopyCondition::Lost);
        assert!(claim(&mut copy, ClaimKind::Hold).is_err());
    }

    #[test]
    fn test_release_targets() {
        let mut copy = MaterialCopy::new("mat-1".to_string());
        claim(&mut copy, ClaimKind::Borrow).unwrap();
        release(&mut copy, ReleaseTarget::Available).unwrap();
        assert_eq!(copy.status(), CopyStatus::Available);

        claim(&mut copy, ClaimKind::Borrow).unwrap();
        release(&mut copy, ReleaseTarget::UnderRepair).unwrap();
        assert_eq!(copy.status(), CopyStatus::UnderRepair);
    }

    #[test]
    fn test_release_requires_claimed() {
        let mut copy = MaterialCopy::new("mat-1".to_string());
        let result = release(&mut copy, ReleaseTarget::Available);
        assert!(matches!(result, Err(CopyError::NotClaimed { .. })));
    }

    #[test]
    fn test_handoff_requires_reserved() {
        let mut copy = MaterialCopy::new("mat-1".to_string());
        assert!(handoff(&mut copy).is_err());

        claim(&mut copy, ClaimKind::Hold).unwrap();
        handoff(&mut copy).unwrap();
        assert_eq!(copy.status(), CopyStatus::Borrowed);
    }
}
