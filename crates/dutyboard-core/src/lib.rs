//! # DutyBoard Core
//! Shared configuration, error type, wire records and clock abstraction.

pub mod clock;
pub mod config;
pub mod error;
pub mod types;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::DutyBoardConfig;
pub use error::{DutyBoardError, Result};
pub use types::{ClosureRecord, ClosuresPayload, DayPayload, EntityId, RawEntity, RawSlot, WindowDay};
