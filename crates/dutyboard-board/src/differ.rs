//! Snapshot differ.
//!
//! Keeps one fingerprint per entity id and reports whether a freshly normalized
//! record differs from the last one seen. Only display-relevant fields feed the
//! fingerprint; name, specialty and designation changes are not highlighted.

use crate::normalize::{Slot, TrackedEntity};
use dutyboard_core::types::EntityId;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::HashMap;

#[derive(Serialize)]
struct FingerprintFields<'a> {
    status: &'a str,
    start_time: Option<&'a str>,
    patient_count: Option<u32>,
    opd: &'a [Slot],
    before_break: Option<&'a [Slot]>,
    after_break: Option<&'a [Slot]>,
    breaks: &'a [String],
    room: Option<&'a str>,
    asset_version: u64,
    status_reason: Option<&'a str>,
}

/// Hex SHA-256 over the display-relevant fields, serialized in fixed order.
pub fn fingerprint(entity: &TrackedEntity) -> String {
    let fields = FingerprintFields {
        status: &entity.display_status,
        start_time: entity.start_time.as_deref(),
        patient_count: entity.schedule.patient_count,
        opd: &entity.schedule.opd,
        before_break: entity.schedule.before_break.as_deref(),
        after_break: entity.schedule.after_break.as_deref(),
        breaks: &entity.schedule.breaks,
        room: entity.room.as_deref(),
        asset_version: entity.asset_version,
        status_reason: entity.status_reason.as_deref(),
    };
    let bytes = serde_json::to_vec(&fields).unwrap_or_default();
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    format!("{:x}", hasher.finalize())
}

#[derive(Debug, Default)]
pub struct SnapshotDiffer {
    snapshots: HashMap<EntityId, String>,
}

impl SnapshotDiffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the entity's fingerprint; true when it changed since last seen.
    ///
    /// The first sighting of an id stores a baseline and reports no change.
    pub fn diff(&mut self, entity: &TrackedEntity) -> bool {
        let fp = fingerprint(entity);
        match self.snapshots.insert(entity.id.clone(), fp.clone()) {
            Some(previous) => previous != fp,
            None => false,
        }
    }

    pub fn reset(&mut self) {
        self.snapshots.clear();
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    pub fn contains(&self, id: &EntityId) -> bool {
        self.snapshots.contains_key(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::normalize;

    fn entity(json: &str) -> TrackedEntity {
        normalize(&serde_json::from_str(json).unwrap())
    }

    #[test]
    fn test_first_sighting_is_baseline() {
        let mut differ = SnapshotDiffer::new();
        assert!(!differ.diff(&entity(r#"{"id":"a","status":"ON_DUTY"}"#)));
        assert!(differ.contains(&EntityId::from("a")));
    }

    #[test]
    fn test_identical_record_unchanged() {
        let mut differ = SnapshotDiffer::new();
        let e = entity(r#"{"id":"a","status":"ON_DUTY","opd":["08:00-10:00"]}"#);
        differ.diff(&e);
        assert!(!differ.diff(&e));
        assert!(!differ.diff(&e.clone()));
    }

    #[test]
    fn test_display_field_change_detected() {
        let mut differ = SnapshotDiffer::new();
        differ.diff(&entity(r#"{"id":"a","status":"ON_DUTY","room":"4"}"#));
        assert!(differ.diff(&entity(r#"{"id":"a","status":"ON_DUTY","room":"5"}"#)));
        assert!(differ.diff(&entity(r#"{"id":"a","status":"ON_DUTY","room":"5","image_version":2}"#)));
    }

    #[test]
    fn test_name_change_not_highlighted() {
        let mut differ = SnapshotDiffer::new();
        differ.diff(&entity(r#"{"id":"a","name":"Dr. A","status":"SICK"}"#));
        assert!(!differ.diff(&entity(r#"{"id":"a","name":"Dr. B","status":"SICK"}"#)));
    }

    #[test]
    fn test_reset_restarts_baseline() {
        let mut differ = SnapshotDiffer::new();
        differ.diff(&entity(r#"{"id":"a","status":"SICK"}"#));
        differ.reset();
        assert!(differ.is_empty());
        assert!(!differ.diff(&entity(r#"{"id":"a","status":"LEAVE"}"#)));
    }

    #[test]
    fn test_equivalent_time_text_same_fingerprint() {
        let a = entity(r#"{"id":"a","start_time":"8:00","opd":["8:00-9:00"]}"#);
        let b = entity(r#"{"id":"a","start_time":"08:00","opd":["08:00-09:00"]}"#);
        assert_eq!(fingerprint(&a), fingerprint(&b));
    }
}
