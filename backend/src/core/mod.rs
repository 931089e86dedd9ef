//! Time source and calendar arithmetic

pub mod clock;

pub use clock::{overdue_days, Clock, FixedClock, SystemClock};
