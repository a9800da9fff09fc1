//! Record normalizer: one canonical schedule shape per entity.
//!
//! Everything downstream (differ, classifier, schedule groups) reads
//! [`TrackedEntity`] only; raw server records never leak past this module.

use dutyboard_core::types::{EntityId, RawEntity, RawSlot};
use regex::Regex;
use serde::Serialize;
use std::sync::LazyLock;

static TIME_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(\d{1,2}):(\d{2})(?::\d{2})?\b").expect("valid time regex"));

static INTERVAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(\d{1,2}):(\d{2})\s*-\s*(\d{1,2}):(\d{2})\s*$").expect("valid interval regex")
});

/// Rewrite every `H:MM` / `HH:MM[:SS]` occurrence as zero-padded `HH:MM`.
pub fn normalize_time_text(text: &str) -> String {
    TIME_TOKEN
        .replace_all(text, |caps: &regex::Captures<'_>| format!("{:0>2}:{}", &caps[1], &caps[2]))
        .into_owned()
}

fn to_minutes(h: &str, m: &str) -> Option<u16> {
    let h: u16 = h.parse().ok()?;
    let m: u16 = m.parse().ok()?;
    Some(h.min(23) * 60 + m.min(59))
}

/// Parse `HH:MM-HH:MM` into minutes since midnight.
pub fn parse_interval(text: &str) -> Option<(u16, u16)> {
    let caps = INTERVAL.captures(text)?;
    Some((to_minutes(&caps[1], &caps[2])?, to_minutes(&caps[3], &caps[4])?))
}

/// One OPD time range with an optional patient count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Slot {
    pub range: String,
    pub count: Option<u32>,
}

impl Slot {
    pub fn new(range: &str, count: Option<u32>) -> Self {
        Self {
            range: normalize_time_text(range.trim()),
            count,
        }
    }

    pub fn interval(&self) -> Option<(u16, u16)> {
        parse_interval(&self.range)
    }

    /// Start minute, when the range is a full interval.
    pub fn start(&self) -> Option<u16> {
        self.interval().map(|(start, _)| start)
    }

    fn from_raw(raw: &RawSlot) -> Option<Self> {
        let (range, count) = raw.parts();
        let range = range?.trim();
        if range.is_empty() || !TIME_TOKEN.is_match(range) {
            return None;
        }
        Some(Self::new(range, count))
    }
}

fn slots(raw: Option<&Vec<RawSlot>>) -> Option<Vec<Slot>> {
    raw.map(|list| list.iter().filter_map(Slot::from_raw).collect())
}

fn non_empty(text: Option<&String>) -> Option<String> {
    text.map(|s| s.trim()).filter(|s| !s.is_empty()).map(String::from)
}

/// Canonical per-entity schedule bag.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScheduleFields {
    pub patient_count: Option<u32>,
    /// Flat OPD list.
    pub opd: Vec<Slot>,
    pub breaks: Vec<String>,
    /// Explicit before-break list, when the server sent one.
    pub before_break: Option<Vec<Slot>>,
    /// Explicit after-break list, when the server sent one.
    pub after_break: Option<Vec<Slot>>,
    pub before_break_patients: Option<u32>,
    pub after_break_patients: Option<u32>,
    pub after_break_note: Option<String>,
}

/// OPD ranges split around the break.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Partition {
    pub before: Vec<Slot>,
    pub after: Vec<Slot>,
    /// True when the split came from explicit before/after lists.
    pub explicit: bool,
}

impl ScheduleFields {
    /// Whether any schedule content exists at all.
    pub fn has_schedule(&self) -> bool {
        self.patient_count.is_some()
            || !self.opd.is_empty()
            || !self.breaks.is_empty()
            || self.before_break.as_ref().is_some_and(|l| !l.is_empty())
            || self.after_break.as_ref().is_some_and(|l| !l.is_empty())
            || self.after_break_note.is_some()
    }

    /// Explicit lists count as present only when at least one carries a range.
    pub fn has_explicit_split(&self) -> bool {
        self.before_break.as_ref().is_some_and(|l| !l.is_empty())
            || self.after_break.as_ref().is_some_and(|l| !l.is_empty())
    }

    pub fn partition(&self) -> Partition {
        if self.has_explicit_split() {
            return Partition {
                before: self.before_break.clone().unwrap_or_default(),
                after: self.after_break.clone().unwrap_or_default(),
                explicit: true,
            };
        }
        let (before, after) = partition_by_breaks(&self.opd, &self.breaks);
        Partition {
            before,
            after,
            explicit: false,
        }
    }
}

/// Split a flat OPD list around break intervals.
///
/// Ranges overlapping any break are dropped. The first break's start is the split
/// point; ranges without a resolvable start stay in `before`. Input order is kept.
pub fn partition_by_breaks(opd: &[Slot], breaks: &[String]) -> (Vec<Slot>, Vec<Slot>) {
    let intervals: Vec<(u16, u16)> = breaks.iter().filter_map(|b| parse_interval(b)).collect();
    let split_at = breaks.first().and_then(|b| parse_interval(b)).map(|(start, _)| start);

    let mut before = Vec::new();
    let mut after = Vec::new();
    for slot in opd {
        let interval = slot.interval();
        if let Some((a, b)) = interval {
            if intervals.iter().any(|&(ba, bb)| a < bb && b > ba) {
                continue;
            }
        }
        match (split_at, interval) {
            (Some(split), Some((start, _))) if start >= split => after.push(slot.clone()),
            _ => before.push(slot.clone()),
        }
    }
    (before, after)
}

/// A duty-status record in canonical form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrackedEntity {
    pub id: EntityId,
    pub name: String,
    pub specialty: String,
    pub designation: Option<String>,
    /// Raw status string, trimmed. Empty means unset.
    pub display_status: String,
    pub status_reason: Option<String>,
    pub start_time: Option<String>,
    pub room: Option<String>,
    pub schedule: ScheduleFields,
    pub asset_version: u64,
}

/// Normalize one raw record. The input is left untouched.
pub fn normalize(raw: &RawEntity) -> TrackedEntity {
    let breaks = raw
        .breaks
        .as_ref()
        .map(|list| {
            list.iter()
                .map(|b| b.trim())
                .filter(|b| !b.is_empty() && TIME_TOKEN.is_match(b))
                .map(normalize_time_text)
                .collect()
        })
        .unwrap_or_default();

    TrackedEntity {
        id: raw.id.clone(),
        name: raw.name.as_deref().map(str::trim).unwrap_or_default().to_string(),
        specialty: raw.specialty.as_deref().map(str::trim).unwrap_or_default().to_string(),
        designation: non_empty(raw.designation.as_ref()),
        display_status: raw.status.as_deref().map(str::trim).unwrap_or_default().to_string(),
        status_reason: non_empty(raw.status_reason.as_ref()).or_else(|| non_empty(raw.reason.as_ref())),
        start_time: non_empty(raw.start_time.as_ref()).map(|t| normalize_time_text(&t)),
        room: non_empty(raw.room.as_ref()),
        schedule: ScheduleFields {
            patient_count: raw.patient_count,
            opd: slots(raw.opd.as_ref()).unwrap_or_default(),
            breaks,
            before_break: slots(raw.before_break_opd.as_ref()),
            after_break: slots(raw.after_break_opd.as_ref()),
            before_break_patients: raw.before_break_opd_patients,
            after_break_patients: raw.after_break_opd_patients,
            after_break_note: non_empty(raw.after_break_note.as_ref()),
        },
        asset_version: raw.image_version.unwrap_or(1),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(json: &str) -> RawEntity {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_time_text_normalization() {
        assert_eq!(normalize_time_text("8:00-14:30"), "08:00-14:30");
        assert_eq!(normalize_time_text("from 7:05:59 until 13:00:00"), "from 07:05 until 13:00");
        assert_eq!(normalize_time_text("no times here"), "no times here");
    }

    #[test]
    fn test_parse_interval() {
        assert_eq!(parse_interval("08:00-10:30"), Some((480, 630)));
        assert_eq!(parse_interval(" 08:00 - 10:30 "), Some((480, 630)));
        assert_eq!(parse_interval("08:00 onwards"), None);
    }

    #[test]
    fn test_malformed_fragments_dropped() {
        let e = normalize(&raw(
            r#"{"id":"d1","opd":["", "TBD", "8:00-10:00", {"count": 3}, "09:00 onwards"]}"#,
        ));
        let ranges: Vec<&str> = e.schedule.opd.iter().map(|s| s.range.as_str()).collect();
        assert_eq!(ranges, vec!["08:00-10:00", "09:00 onwards"]);
    }

    #[test]
    fn test_empty_breaks_keep_flat_order() {
        let e = normalize(&raw(
            r#"{"id":"d1","opd":[{"range":"13:00-14:00","count":4},"08:00-10:00",{"range":"10:00-12:00","count":9}]}"#,
        ));
        let (before, after) = partition_by_breaks(&e.schedule.opd, &e.schedule.breaks);
        assert_eq!(before, e.schedule.opd);
        assert!(after.is_empty());
    }

    #[test]
    fn test_break_split_and_overlap() {
        let e = normalize(&raw(
            r#"{"id":"d1","opd":["08:00-11:00","11:30-12:30","13:00-15:00","late shift 16:00"],
                "breaks":["12:00-13:00"]}"#,
        ));
        let part = e.schedule.partition();
        assert!(!part.explicit);
        let before: Vec<&str> = part.before.iter().map(|s| s.range.as_str()).collect();
        let after: Vec<&str> = part.after.iter().map(|s| s.range.as_str()).collect();
        // 11:30-12:30 overlaps the break and is excluded.
        assert_eq!(before, vec!["08:00-11:00", "late shift 16:00"]);
        assert_eq!(after, vec!["13:00-15:00"]);
    }

    #[test]
    fn test_explicit_lists_win() {
        let e = normalize(&raw(
            r#"{"id":"d1","opd":["08:00-09:00"],
                "before_break_opd":[{"r":"08:00-10:00","c":5}],
                "after_break_opd":[]}"#,
        ));
        let part = e.schedule.partition();
        assert!(part.explicit);
        assert_eq!(part.before, vec![Slot::new("08:00-10:00", Some(5))]);
        assert!(part.after.is_empty());
    }

    #[test]
    fn test_empty_explicit_lists_use_flat_split() {
        let e = normalize(&raw(
            r#"{"id":"d1","opd":["08:00-10:00","14:00-16:00"],"breaks":["12:00-13:00"],
                "before_break_opd":[],"after_break_opd":[]}"#,
        ));
        assert!(!e.schedule.has_explicit_split());
        let part = e.schedule.partition();
        assert!(!part.explicit);
        assert_eq!(part.before, vec![Slot::new("08:00-10:00", None)]);
        assert_eq!(part.after, vec![Slot::new("14:00-16:00", None)]);
    }

    #[test]
    fn test_reason_field_fallback() {
        let e = normalize(&raw(r#"{"id":"a","status":"SICK","reason":"flu"}"#));
        assert_eq!(e.status_reason.as_deref(), Some("flu"));
        let e = normalize(&raw(r#"{"id":"a","status":"SICK","status_reason":" ","reason":"flu"}"#));
        assert_eq!(e.status_reason.as_deref(), Some("flu"));
        let e = normalize(&raw(r#"{"id":"a","status":"SICK","status_reason":"cold","reason":"flu"}"#));
        assert_eq!(e.status_reason.as_deref(), Some("cold"));
    }

    #[test]
    fn test_has_schedule_predicate() {
        assert!(!normalize(&raw(r#"{"id":"a","opd":[],"breaks":[]}"#)).schedule.has_schedule());
        assert!(normalize(&raw(r#"{"id":"a","patient_count":0}"#)).schedule.has_schedule());
        assert!(normalize(&raw(r#"{"id":"a","breaks":["12:00-13:00"]}"#)).schedule.has_schedule());
        assert!(normalize(&raw(r#"{"id":"a","after_break_note":"till late"}"#)).schedule.has_schedule());
        assert!(!normalize(&raw(r#"{"id":"a","after_break_note":"  "}"#)).schedule.has_schedule());
    }

    #[test]
    fn test_normalize_does_not_mutate_input() {
        let input = raw(r#"{"id":"a","status":" ON_DUTY ","start_time":"8:00","opd":["8:00-9:00"]}"#);
        let copy = input.clone();
        let e = normalize(&input);
        assert_eq!(input, copy);
        assert_eq!(e.display_status, "ON_DUTY");
        assert_eq!(e.start_time.as_deref(), Some("08:00"));
        assert_eq!(e.asset_version, 1);
    }
}
