//! Hold Queue
//!
//! Per-material FIFO mechanics over the reservation rows: queue-position
//! assignment, contiguous recompute, and the single-fulfillment attempt
//! that binds a freed copy to the oldest pending hold.
//!
//! Everything here runs inside the orchestrator's transaction; recompute
//! is never a separate best-effort pass, so two returns racing on the same
//! material cannot interleave and corrupt queue ordering.

use crate::inventory::{self, ClaimKind};
use crate::models::copy::CopyError;
use crate::models::store::CirculationStore;
use chrono::{DateTime, Duration, Utc};

/// Queue position for a newly placed pending hold: one past the current
/// pending count.
pub(crate) fn next_queue_position(store: &CirculationStore, material_id: &str) -> u32 {
    store.pending_reservations_for_material(material_id).len() as u32 + 1
}

/// Renumber the pending holds on a material 1..n in FIFO order.
pub(crate) fn recompute_positions(store: &mut CirculationStore, material_id: &str) {
    let ordered: Vec<String> = store
        .pending_reservations_for_material(material_id)
        .iter()
        .map(|r| r.id().to_string())
        .collect();

    for (index, reservation_id) in ordered.iter().enumerate() {
        if let Some(reservation) = store.get_reservation_mut(reservation_id) {
            reservation.set_queue_position(Some(index as u32 + 1));
        }
    }
}

/// Bind an AVAILABLE copy to the oldest pending hold on a material.
///
/// Claims the copy (AVAILABLE → RESERVED), opens the pickup window, and
/// renumbers the remaining pending holds. Returns the fulfilled
/// reservation id, or None when no hold is waiting.
pub(crate) fn fulfill_with_copy(
    store: &mut CirculationStore,
    material_id: &str,
    copy_id: &str,
    now: DateTime<Utc>,
) -> Result<Option<String>, CopyError> {
    let reservation_id = match store.oldest_pending_reservation_id(material_id) {
        Some(id) => id,
        None => return Ok(None),
    };

    let hold_days = store.config().reservation_hold_days as i64;
    let expiration = now + Duration::days(hold_days);

    {
        let copy = store
            .get_copy_mut(copy_id)
            .expect("fulfillment copy row exists");
        inventory::claim(copy, ClaimKind::Hold)?;
    }

    let reservation = store
        .get_reservation_mut(&reservation_id)
        .expect("oldest pending reservation row exists");
    reservation
        .make_ready(copy_id.to_string(), expiration)
        .expect("pending reservation becomes ready");

    recompute_positions(store, material_id);
    Ok(Some(reservation_id))
}

/// Single fulfillment attempt after a copy frees up: if a lendable copy of
/// the material is AVAILABLE and a hold is pending, bind them.
pub(crate) fn attempt_fulfillment(
    store: &mut CirculationStore,
    material_id: &str,
    now: DateTime<Utc>,
) -> Result<Option<String>, CopyError> {
    let copy_id = match store.available_copy_id_for_material(material_id) {
        Some(id) => id,
        None => return Ok(None),
    };
    fulfill_with_copy(store, material_id, &copy_id, now)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::config::LoanConfiguration;
    use crate::models::copy::{CopyStatus, MaterialCopy};
    use crate::models::reservation::{Reservation, ReservationStatus};
    use crate::models::store::MaterialRecord;

    fn store() -> CirculationStore {
        let mut store = CirculationStore::new(LoanConfiguration::default());
        store.add_material(MaterialRecord::new("mat-1".to_string()));
        store
    }

    fn add_pending(store: &mut CirculationStore, member: &str, at: DateTime<Utc>) -> String {
        let position = next_queue_position(store, "mat-1");
        let hold =
            Reservation::new_pending(member.to_string(), "mat-1".to_string(), at, position);
        let id = hold.id().to_string();
        store.add_reservation(hold);
        id
    }

    #[test]
    fn test_next_position_counts_pending_only() {
        let mut store = store();
        let now = Utc::now();
        assert_eq!(next_queue_position(&store, "mat-1"), 1);

        add_pending(&mut store, "m1", now);
        add_pending(&mut store, "m2", now);
        assert_eq!(next_queue_position(&store, "mat-1"), 3);
    }

    #[test]
    fn test_recompute_renumbers_contiguously() {
        let mut store = store();
        let now = Utc::now();
        let first = add_pending(&mut store, "m1", now);
        let second = add_pending(&mut store, "m2", now);
        let third = add_pending(&mut store, "m3", now);

        // Middle hold drops out
        store
            .get_reservation_mut(&second)
            .unwrap()
            .cancel()
            .unwrap();
        recompute_positions(&mut store, "mat-1");

        assert_eq!(
            store.get_reservation(&first).unwrap().queue_position(),
            Some(1)
        );
        assert_eq!(
            store.get_reservation(&third).unwrap().queue_position(),
            Some(2)
        );
    }

    #[test]
    fn test_fulfill_binds_oldest_and_renumbers_rest() {
        let mut store = store();
        let now = Utc::now();
        let copy = MaterialCopy::new("mat-1".to_string());
        let copy_id = copy.id().to_string();
        store.add_copy(copy);

        let first = add_pending(&mut store, "m1", now - Duration::days(2));
        let second = add_pending(&mut store, "m2", now - Duration::days(1));
        let third = add_pending(&mut store, "m3", now);

        let fulfilled = fulfill_with_copy(&mut store, "mat-1", &copy_id, now).unwrap();

        assert_eq!(fulfilled, Some(first.clone()));
        let ready = store.get_reservation(&first).unwrap();
        assert_eq!(ready.status(), ReservationStatus::Ready);
        assert_eq!(ready.copy_id(), Some(copy_id.as_str()));
        assert_eq!(
            ready.expiration_date(),
            Some(now + Duration::days(store.config().reservation_hold_days as i64))
        );
        assert_eq!(store.get_copy(&copy_id).unwrap().status(), CopyStatus::Reserved);

        assert_eq!(
            store.get_reservation(&second).unwrap().queue_position(),
            Some(1)
        );
        assert_eq!(
            store.get_reservation(&third).unwrap().queue_position(),
            Some(2)
        );
    }

    #[test]
    fn test_fulfill_with_no_pending_is_noop() {
        let mut store = store();
        let copy = MaterialCopy::new("mat-1".to_string());
        let copy_id = copy.id().to_string();
        store.add_copy(copy);

        let fulfilled = fulfill_with_copy(&mut store, "mat-1", &copy_id, Utc::now()).unwrap();

        assert_eq!(fulfilled, None);
        assert_eq!(
            store.get_copy(&copy_id).unwrap().status(),
            CopyStatus::Available
        );
    }

    #[test]
    fn test_attempt_fulfillment_needs_available_copy() {
        let mut store = store();
        let now = Utc::now();
        add_pending(&mut store, "m1", now);

        // No copies registered at all
        assert_eq!(attempt_fulfillment(&mut store, "mat-1", now).unwrap(), None);
    }
}
