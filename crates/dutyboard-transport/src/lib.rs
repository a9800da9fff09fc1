//! # DutyBoard Transport
//! Hybrid push/pull transport: an SSE subscription that reconnects with capped
//! exponential backoff, plus the REST pulls the sync engine uses as ground truth.

pub mod api;
pub mod backoff;
pub mod events;
pub mod push;
pub mod sse;

pub use api::{HttpScheduleApi, ScheduleApi};
pub use backoff::Backoff;
pub use events::{ConnectionState, PushEvent, Topic, TransportEvent};
pub use push::PushClient;
pub use sse::{SseDecoder, SseFrame};
