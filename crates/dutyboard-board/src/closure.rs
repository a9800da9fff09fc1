//! Closure registry and the full-board overlay it drives.

use chrono::NaiveDate;
use dutyboard_core::types::{ClosureRecord, ClosuresPayload};
use std::collections::BTreeMap;

/// Shown when a closed date carries no usable reason.
pub const CLOSURE_FALLBACK: &str = "TODAY IS A PUBLIC HOLIDAY";

/// Dates on which the facility is closed.
#[derive(Debug, Default, Clone)]
pub struct ClosureRegistry {
    dates: BTreeMap<NaiveDate, ClosureRecord>,
}

impl ClosureRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_payload(payload: &ClosuresPayload) -> Self {
        let mut registry = Self::new();
        registry.replace(payload);
        registry
    }

    /// Swap in a fresh closure map. Keys that are not ISO dates are skipped.
    pub fn replace(&mut self, payload: &ClosuresPayload) {
        self.dates.clear();
        for (key, record) in &payload.dates {
            match NaiveDate::parse_from_str(key.trim(), "%Y-%m-%d") {
                Ok(date) => {
                    self.dates.insert(date, record.clone());
                }
                Err(e) => tracing::warn!("⚠️ Ignoring closure with bad date '{key}': {e}"),
            }
        }
    }

    /// Forget every closure. Used when the registry cannot be fetched.
    pub fn clear(&mut self) {
        self.dates.clear();
    }

    pub fn is_closed(&self, date: NaiveDate) -> bool {
        self.dates.contains_key(&date)
    }

    pub fn get(&self, date: NaiveDate) -> Option<&ClosureRecord> {
        self.dates.get(&date)
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    /// Overlay text for a closed date: the current reason, else the most recent
    /// entry of the reason history, else the generic fallback.
    pub fn reason_text(&self, date: NaiveDate) -> Option<String> {
        let record = self.dates.get(&date)?;
        let reason = record
            .reason
            .as_deref()
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .or_else(|| {
                record
                    .reasons
                    .iter()
                    .rev()
                    .map(|r| r.trim())
                    .find(|r| !r.is_empty())
            })
            .unwrap_or(CLOSURE_FALLBACK);
        Some(reason.to_string())
    }
}

/// Full-board overlay state.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ClosureOverlay {
    message: Option<String>,
}

impl ClosureOverlay {
    /// Recompute visibility for the viewed date. Returns true when it changed.
    pub fn apply(&mut self, viewed: Option<NaiveDate>, registry: &ClosureRegistry) -> bool {
        let next = viewed.and_then(|d| registry.reason_text(d));
        let changed = next != self.message;
        self.message = next;
        changed
    }

    pub fn is_visible(&self) -> bool {
        self.message.is_some()
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }
}
