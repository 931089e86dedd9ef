//! Domain models for the circulation engine

pub mod config;
pub mod copy;
pub mod event;
pub mod fine;
pub mod loan;
pub mod member;
pub mod reservation;
pub mod store;

// Re-exports
pub use config::{ConfigError, ConfigurationUpdate, LoanConfiguration};
pub use copy::{CopyCondition, CopyError, CopyStatus, MaterialCopy};
pub use event::{CirculationEvent, EventLog};
pub use fine::{Fine, FineError, FineStatus};
pub use loan::{Loan, LoanError, LoanStatus};
pub use member::{AccountState, MemberCondition, MemberSnapshot};
pub use reservation::{Reservation, ReservationError, ReservationStatus};
pub use store::{CirculationStore, MaterialRecord};
