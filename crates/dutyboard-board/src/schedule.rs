//! Schedule groups: the titled chip rows shown under each card.

use crate::normalize::{ScheduleFields, Slot, normalize_time_text};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum GroupKind {
    Patients,
    Opd,
    BeforeBreak,
    BeforeBreakPatients,
    Break,
    AfterBreak,
    AfterBreakPatients,
}

impl GroupKind {
    pub fn title(&self) -> &'static str {
        match self {
            Self::Patients => "PATIENTS",
            Self::Opd => "OPD",
            Self::BeforeBreak => "BEFORE BREAK OPD",
            Self::BeforeBreakPatients => "BEFORE BREAK PATIENTS",
            Self::Break => "BREAK",
            Self::AfterBreak => "AFTER BREAK OPD",
            Self::AfterBreakPatients => "AFTER BREAK PATIENTS",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScheduleGroup {
    pub kind: GroupKind,
    pub chips: Vec<String>,
}

impl ScheduleGroup {
    fn new(kind: GroupKind, chips: Vec<String>) -> Self {
        Self { kind, chips }
    }

    pub fn title(&self) -> &'static str {
        self.kind.title()
    }
}

/// Chip text for a range with an optional count: `"08:00-10:00 • 12 pts"`.
pub fn chip(range: &str, count: Option<u32>) -> String {
    let range = normalize_time_text(range);
    match count {
        Some(n) => format!("{range} • {n} pts"),
        None => range,
    }
}

fn count_chip(n: u32) -> String {
    format!("{n} pts")
}

fn slot_chips(slots: &[Slot]) -> Vec<String> {
    slots.iter().map(|s| chip(&s.range, s.count)).collect()
}

fn has_counts(slots: &[Slot]) -> bool {
    slots.iter().any(|s| s.count.is_some())
}

/// Build the ordered group list for one schedule.
pub fn schedule_groups(s: &ScheduleFields) -> Vec<ScheduleGroup> {
    let mut groups = Vec::new();

    if let Some(n) = s.patient_count {
        groups.push(ScheduleGroup::new(GroupKind::Patients, vec![count_chip(n)]));
    }

    let part = s.partition();
    if part.explicit {
        if !part.before.is_empty() {
            groups.push(ScheduleGroup::new(GroupKind::BeforeBreak, slot_chips(&part.before)));
            if let (false, Some(n)) = (has_counts(&part.before), s.before_break_patients) {
                groups.push(ScheduleGroup::new(GroupKind::BeforeBreakPatients, vec![count_chip(n)]));
            }
        }
        if !s.breaks.is_empty() {
            groups.push(ScheduleGroup::new(GroupKind::Break, s.breaks.clone()));
        }
        if !part.after.is_empty() {
            groups.push(ScheduleGroup::new(GroupKind::AfterBreak, slot_chips(&part.after)));
            if let (false, Some(n)) = (has_counts(&part.after), s.after_break_patients) {
                groups.push(ScheduleGroup::new(GroupKind::AfterBreakPatients, vec![count_chip(n)]));
            }
        } else if let Some(note) = &s.after_break_note {
            groups.push(ScheduleGroup::new(GroupKind::AfterBreak, vec![note.clone()]));
        }
        return groups;
    }

    if s.breaks.is_empty() {
        if !part.before.is_empty() {
            groups.push(ScheduleGroup::new(GroupKind::Opd, slot_chips(&part.before)));
        }
        return groups;
    }

    if !part.before.is_empty() {
        groups.push(ScheduleGroup::new(GroupKind::BeforeBreak, slot_chips(&part.before)));
        if let (false, Some(n)) = (has_counts(&part.before), s.before_break_patients) {
            groups.push(ScheduleGroup::new(GroupKind::BeforeBreakPatients, vec![count_chip(n)]));
        }
    } else if let Some(n) = s.before_break_patients {
        groups.push(ScheduleGroup::new(GroupKind::BeforeBreak, vec![count_chip(n)]));
    }

    groups.push(ScheduleGroup::new(GroupKind::Break, s.breaks.clone()));

    if !part.after.is_empty() {
        groups.push(ScheduleGroup::new(GroupKind::AfterBreak, slot_chips(&part.after)));
        if let (false, Some(n)) = (has_counts(&part.after), s.after_break_patients) {
            groups.push(ScheduleGroup::new(GroupKind::AfterBreakPatients, vec![count_chip(n)]));
        }
    } else if let Some(n) = s.after_break_patients {
        groups.push(ScheduleGroup::new(GroupKind::AfterBreak, vec![count_chip(n)]));
    } else if let Some(note) = &s.after_break_note {
        groups.push(ScheduleGroup::new(GroupKind::AfterBreak, vec![note.clone()]));
    }

    groups
}
