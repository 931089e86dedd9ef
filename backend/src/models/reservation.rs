//! Reservation (hold) model
//!
//! A member's claim on the next available copy of a material, ordered FIFO
//! by request time. Each reservation has:
//! - Member and material ids; a bound copy id only once READY
//! - Status (Pending, Ready, PickedUp, Expired, Cancelled)
//! - Queue position, meaningful only while Pending (1-based, contiguous
//!   among pending holds on the same material)
//! - Expiration instant once Ready, and an optional pickup confirmation
//!   stamp that never changes status

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Reservation lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReservationStatus {
    /// Waiting in the FIFO queue for a copy
    Pending,

    /// A copy is set aside; member must pick up before expiration
    Ready,

    /// Copy handed over; terminal
    PickedUp,

    /// Pickup window lapsed; terminal
    Expired,

    /// Withdrawn by the member or staff; terminal
    Cancelled,
}

impl ReservationStatus {
    /// Whether a reservation in this status can still transition.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ReservationStatus::PickedUp | ReservationStatus::Expired | ReservationStatus::Cancelled
        )
    }
}

/// Errors from reservation state transitions
#[derive(Debug, Error, PartialEq)]
pub enum ReservationError {
    #[error("Reservation {reservation_id} is {status:?} and cannot transition")]
    Terminal {
        reservation_id: String,
        status: ReservationStatus,
    },

    #[error("Reservation {reservation_id} is {status:?}, expected READY")]
    NotReady {
        reservation_id: String,
        status: ReservationStatus,
    },

    #[error("Reservation {reservation_id} pickup already confirmed")]
    AlreadyConfirmed { reservation_id: String },
}

/// A member's place in line for a material.
///
/// # Example
/// ```
/// use chrono::Utc;
/// use circulation_core_rs::models::reservation::{Reservation, ReservationStatus};
///
/// let hold = Reservation::new_pending(
///     "member-1".to_string(),
///     "mat-1".to_string(),
///     Utc::now(),
///     1,
/// );
/// assert_eq!(hold.status(), ReservationStatus::Pending);
/// assert_eq!(hold.queue_position(), Some(1));
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reservation {
    /// Unique reservation identifier (UUID)
    id: String,

    /// Holding member id
    member_id: String,

    /// Requested material id
    material_id: String,

    /// Bound copy id; set only once READY
    copy_id: Option<String>,

    /// Current status
    status: ReservationStatus,

    /// 1-based FIFO position among pending holds on this material
    queue_position: Option<u32>,

    /// Instant the hold was requested; FIFO ordering key
    reservation_date: DateTime<Utc>,

    /// End of the pickup window; set when READY
    expiration_date: Option<DateTime<Utc>>,

    /// Member's pre-pickup acknowledgement; never changes status
    confirmed_at: Option<DateTime<Utc>>,

    /// Free-form notes
    notes: Option<String>,

    /// Arrival sequence assigned by the store; breaks reservation_date ties
    sequence: u64,
}

impl Reservation {
    /// Create a pending hold at the given queue position.
    pub fn new_pending(
        member_id: String,
        material_id: String,
        reservation_date: DateTime<Utc>,
        queue_position: u32,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            member_id,
            material_id,
            copy_id: None,
            status: ReservationStatus::Pending,
            queue_position: Some(queue_position),
            reservation_date,
            expiration_date: None,
            confirmed_at: None,
            notes: None,
            sequence: 0,
        }
    }

    /// Create a hold that is READY from the start, bound to a copy.
    ///
    /// Used when a hold is placed while an available copy exists.
    pub fn new_ready(
        member_id: String,
        material_id: String,
        copy_id: String,
        reservation_date: DateTime<Utc>,
        expiration_date: DateTime<Utc>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            member_id,
            material_id,
            copy_id: Some(copy_id),
            status: ReservationStatus::Ready,
            queue_position: None,
            reservation_date,
            expiration_date: None,
            confirmed_at: None,
            notes: None,
            sequence: 0,
        }
        .with_expiration(expiration_date)
    }

    fn with_expiration(mut self, expiration_date: DateTime<Utc>) -> Self {
        self.expiration_date = Some(expiration_date);
        self
    }

    /// Attach notes (builder pattern).
    pub fn with_notes(mut self, notes: String) -> Self {
        self.notes = Some(notes);
        self
    }

    /// Get reservation id
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Get holding member id
    pub fn member_id(&self) -> &str {
        &self.member_id
    }

    /// Get requested material id
    pub fn material_id(&self) -> &str {
        &self.material_id
    }

    /// Get bound copy id, if READY or later
    pub fn copy_id(&self) -> Option<&str> {
        self.copy_id.as_deref()
    }

    /// Get current status
    pub fn status(&self) -> ReservationStatus {
        self.status
    }

    /// Get queue position (Pending holds only)
    pub fn queue_position(&self) -> Option<u32> {
        self.queue_position
    }

    /// Get request instant
    pub fn reservation_date(&self) -> DateTime<Utc> {
        self.reservation_date
    }

    /// Get pickup-window end, if READY
    pub fn expiration_date(&self) -> Option<DateTime<Utc>> {
        self.expiration_date
    }

    /// Get pickup confirmation stamp, if any
    pub fn confirmed_at(&self) -> Option<DateTime<Utc>> {
        self.confirmed_at
    }

    /// Get notes
    pub fn notes(&self) -> Option<&str> {
        self.notes.as_deref()
    }

    /// Arrival sequence; FIFO tie-break within equal reservation dates.
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    pub(crate) fn set_sequence(&mut self, sequence: u64) {
        self.sequence = sequence;
    }

    /// Whether this hold still occupies the member's slot for the material.
    pub fn is_open(&self) -> bool {
        matches!(
            self.status,
            ReservationStatus::Pending | ReservationStatus::Ready
        )
    }

    /// FIFO ordering key: request instant, then arrival sequence.
    pub fn fifo_key(&self) -> (DateTime<Utc>, u64) {
        (self.reservation_date, self.sequence)
    }

    pub(crate) fn set_queue_position(&mut self, position: Option<u32>) {
        self.queue_position = position;
    }

    /// Bind a copy and open the pickup window.
    ///
    /// Legal from Pending (fulfillment) and from Ready (staff rebinding to
    /// a different copy). The caller releases any previously bound copy.
    pub fn make_ready(
        &mut self,
        copy_id: String,
        expiration_date: DateTime<Utc>,
    ) -> Result<(), ReservationError> {
        match self.status {
            ReservationStatus::Pending | ReservationStatus::Ready => {
                self.status = ReservationStatus::Ready;
                self.copy_id = Some(copy_id);
                self.expiration_date = Some(expiration_date);
                self.queue_position = None;
                Ok(())
            }
            status => Err(ReservationError::Terminal {
                reservation_id: self.id.clone(),
                status,
            }),
        }
    }

    /// Record the hand-off of the bound copy.
    pub fn mark_picked_up(&mut self) -> Result<(), ReservationError> {
        if self.status != ReservationStatus::Ready {
            return Err(ReservationError::NotReady {
                reservation_id: self.id.clone(),
                status: self.status,
            });
        }

        self.status = ReservationStatus::PickedUp;
        Ok(())
    }

    /// Withdraw an open hold.
    pub fn cancel(&mut self) -> Result<(), ReservationError> {
        if self.status.is_terminal() {
            return Err(ReservationError::Terminal {
                reservation_id: self.id.clone(),
                status: self.status,
            });
        }

        self.status = ReservationStatus::Cancelled;
        self.queue_position = None;
        Ok(())
    }

    /// Lapse a READY hold whose pickup window passed.
    pub fn expire(&mut self) -> Result<(), ReservationError> {
        if self.status.is_terminal() {
            return Err(ReservationError::Terminal {
                reservation_id: self.id.clone(),
                status: self.status,
            });
        }

        self.status = ReservationStatus::Expired;
        self.queue_position = None;
        Ok(())
    }

    /// Stamp the member's pickup acknowledgement without changing status.
    pub fn confirm(&mut self, at: DateTime<Utc>) -> Result<(), ReservationError> {
        if self.status != ReservationStatus::Ready {
            return Err(ReservationError::NotReady {
                reservation_id: self.id.clone(),
                status: self.status,
            });
        }
        if self.confirmed_at.is_some() {
            return Err(ReservationError::AlreadyConfirmed {
                reservation_id: self.id.clone(),
            });
        }

        self.confirmed_at = Some(at);
        Ok(())
    }
}
