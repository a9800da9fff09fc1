//! # DutyBoard Sync
//! The engine loop that keeps a board view consistent with the schedule server.

pub mod engine;

pub use engine::{Command, EngineSettings, SyncEngine};
