//! Material copy model
//!
//! One physical, individually trackable instance of a catalog material.
//! Each copy has:
//! - An owning catalog material (external entity, referenced by id)
//! - Availability status (Available, Borrowed, Reserved, UnderRepair, Removed)
//! - Physical condition (New..Lost)
//!
//! The status machine here is deliberately ignorant of loans and holds:
//! only the inventory primitives flip status, and the orchestrator decides
//! when they run.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Availability state of a physical copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CopyStatus {
    /// On the shelf, claimable by checkout or hold fulfillment
    Available,

    /// Out on loan to a member
    Borrowed,

    /// Set aside for a READY reservation, awaiting pickup
    Reserved,

    /// Pulled from circulation for repair (administrative path)
    UnderRepair,

    /// Permanently withdrawn from the collection
    Removed,
}

impl CopyStatus {
    /// Short display name matching the external wire form.
    pub fn as_str(&self) -> &'static str {
        match self {
            CopyStatus::Available => "AVAILABLE",
            CopyStatus::Borrowed => "BORROWED",
            CopyStatus::Reserved => "RESERVED",
            CopyStatus::UnderRepair => "UNDER_REPAIR",
            CopyStatus::Removed => "REMOVED",
        }
    }
}

/// Physical condition of a copy.
///
/// Damaged and Lost copies must never be lent out, whatever their status
/// row says.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CopyCondition {
    New,
    Good,
    Fair,
    Damaged,
    Lost,
}

/// Errors from copy status transitions
#[derive(Debug, Error, PartialEq)]
pub enum CopyError {
    #[error("Copy {copy_id} is not available (status {status:?})")]
    NotAvailable { copy_id: String, status: CopyStatus },

    #[error("Copy {copy_id} cannot circulate in condition {condition:?}")]
    NotLendable {
        copy_id: String,
        condition: CopyCondition,
    },

    #[error("Copy {copy_id} is not claimed (status {status:?})")]
    NotClaimed { copy_id: String, status: CopyStatus },

    #[error("Copy {copy_id} is not reserved (status {status:?})")]
    NotReserved { copy_id: String, status: CopyStatus },
}

/// A physical copy of a catalog material.
///
/// # Example
/// ```
/// use circulation_core_rs::models::copy::{CopyStatus, MaterialCopy};
///
/// let copy = MaterialCopy::new("mat-001".to_string());
/// assert_eq!(copy.status(), CopyStatus::Available);
/// assert!(copy.is_lendable());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaterialCopy {
    /// Unique copy identifier (UUID)
    id: String,

    /// Owning catalog material id (external entity)
    material_id: String,

    /// Availability state
    status: CopyStatus,

    /// Physical condition
    condition: CopyCondition,
}

impl MaterialCopy {
    /// Create a new copy, available and in good condition.
    pub fn new(material_id: String) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            material_id,
            status: CopyStatus::Available,
            condition: CopyCondition::Good,
        }
    }

    /// Set condition (builder pattern).
    pub fn with_condition(mut self, condition: CopyCondition) -> Self {
        self.condition = condition;
        self
    }

    /// Restore a copy with all fields preserved (snapshot loading).
    pub fn from_snapshot(
        id: String,
        material_id: String,
        status: CopyStatus,
        condition: CopyCondition,
    ) -> Self {
        Self {
            id,
            material_id,
            status,
            condition,
        }
    }

    /// Get copy id
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Get owning material id
    pub fn material_id(&self) -> &str {
        &self.material_id
    }

    /// Get availability status
    pub fn status(&self) -> CopyStatus {
        self.status
    }

    /// Get physical condition
    pub fn condition(&self) -> CopyCondition {
        self.condition
    }

    /// Whether the copy's condition permits lending at all.
    pub fn is_lendable(&self) -> bool {
        !matches!(self.condition, CopyCondition::Damaged | CopyCondition::Lost)
    }

    /// Whether the copy is on the shelf and claimable.
    pub fn is_available(&self) -> bool {
        self.status == CopyStatus::Available
    }

    pub(crate) fn set_status(&mut self, status: CopyStatus) {
        self.status = status;
    }
}
