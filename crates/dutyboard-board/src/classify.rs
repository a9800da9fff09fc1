//! Status classifier.
//!
//! Derives the single display state for an entity from its status string, its
//! status reason and whether any schedule content exists. Pure: same input, same
//! output.

use crate::normalize::TrackedEntity;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum DutyState {
    Pending,
    Sick,
    Leave,
    Cancelled,
    OnCall,
    AwaitingSchedule,
    OnDuty,
}

impl DutyState {
    /// Overlay badge text. `None` means the card renders normally.
    pub fn badge_text(&self) -> Option<&'static str> {
        match self {
            Self::Pending | Self::AwaitingSchedule => Some("PENDING: AWAITING SCHEDULE"),
            Self::Sick => Some("SICK LEAVE"),
            Self::Leave => Some("ON LEAVE"),
            Self::Cancelled => Some("OPD CANCELLED"),
            Self::OnCall => Some("ON CALL"),
            Self::OnDuty => None,
        }
    }

    pub fn css_class(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Sick => "sick",
            Self::Leave => "leave",
            Self::Cancelled => "cancelled",
            Self::OnCall => "on-call",
            Self::AwaitingSchedule => "awaiting",
            Self::OnDuty => "on-duty",
        }
    }

    /// Whether the status reason may be shown under the badge.
    pub fn shows_reason(&self) -> bool {
        matches!(self, Self::Sick | Self::Leave | Self::Cancelled | Self::OnCall)
    }
}

/// Classifier output for one entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Classification {
    pub state: DutyState,
    pub badge_text: Option<&'static str>,
    /// Set only when the state allows it and a non-empty reason exists.
    pub reason: Option<String>,
    pub show_schedule: bool,
    pub show_start_time: bool,
    pub show_room: bool,
}

impl Classification {
    pub fn show_reason(&self) -> bool {
        self.reason.is_some()
    }

    /// Escaped overlay markup, or `None` when there is no badge.
    pub fn overlay_html(&self) -> Option<String> {
        let badge = escape_html(self.badge_text?);
        Some(match &self.reason {
            Some(reason) => format!("{badge}<div class=\"small\">{}</div>", escape_html(reason)),
            None => badge,
        })
    }
}

/// Uppercased, trimmed, `_`/`-` folded to spaces, whitespace collapsed.
pub fn canonical_status(raw: &str) -> String {
    raw.to_uppercase()
        .replace(['_', '-'], " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn state_for(entity: &TrackedEntity) -> DutyState {
    let status = canonical_status(&entity.display_status);
    let reason = entity.status_reason.as_deref().unwrap_or_default().to_lowercase();

    match status.as_str() {
        "" | "PENDING" => DutyState::Pending,
        "SICK" | "SICK LEAVE" => DutyState::Sick,
        "LEAVE" | "ANNUAL LEAVE" => DutyState::Leave,
        "OPD CANCELLED" | "CANCELLED" | "CANCELED" => DutyState::Cancelled,
        "OFF DUTY" if reason.contains("cancel") => DutyState::Cancelled,
        "ON CALL" => DutyState::OnCall,
        _ if !entity.schedule.has_schedule() => DutyState::AwaitingSchedule,
        _ => DutyState::OnDuty,
    }
}

/// Classify one entity.
pub fn classify(entity: &TrackedEntity) -> Classification {
    let state = state_for(entity);
    let reason = if state.shows_reason() {
        entity.status_reason.clone()
    } else {
        None
    };
    let blocked = matches!(
        state,
        DutyState::Pending | DutyState::Sick | DutyState::Leave | DutyState::Cancelled
    );
    Classification {
        state,
        badge_text: state.badge_text(),
        reason,
        show_schedule: entity.schedule.has_schedule() && !blocked,
        show_start_time: state != DutyState::Pending && entity.start_time.is_some(),
        show_room: state != DutyState::Pending && entity.room.is_some(),
    }
}

/// Escape text for HTML interpolation.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::normalize;

    fn entity(json: &str) -> TrackedEntity {
        normalize(&serde_json::from_str(json).unwrap())
    }

    #[test]
    fn test_canonical_status() {
        assert_eq!(canonical_status(" opd_cancelled "), "OPD CANCELLED");
        assert_eq!(canonical_status("On-Call"), "ON CALL");
        assert_eq!(canonical_status("sick   leave"), "SICK LEAVE");
    }

    #[test]
    fn test_pending_variants() {
        for status in [r#""#, r#","status":"PENDING""#, r#","status":"  pending ""#] {
            let c = classify(&entity(&format!(r#"{{"id":"a"{status},"opd":["08:00-10:00"],"status_reason":"x"}}"#)));
            assert_eq!(c.state, DutyState::Pending);
            assert_eq!(c.badge_text, Some("PENDING: AWAITING SCHEDULE"));
            assert!(!c.show_reason());
            assert!(!c.show_start_time);
        }
    }

    #[test]
    fn test_absence_states_show_reason() {
        let c = classify(&entity(r#"{"id":"a","status":"SICK","status_reason":"Flu"}"#));
        assert_eq!(c.state, DutyState::Sick);
        assert_eq!(c.reason.as_deref(), Some("Flu"));

        let c = classify(&entity(r#"{"id":"a","status":"leave"}"#));
        assert_eq!(c.state, DutyState::Leave);
        assert!(!c.show_reason());

        // Only the exact leave spellings count.
        let c = classify(&entity(r#"{"id":"a","status":"on leave"}"#));
        assert_eq!(c.state, DutyState::AwaitingSchedule);

        let c = classify(&entity(r#"{"id":"a","status":"ON_CALL","status_reason":"ER","opd":["08:00-10:00"]}"#));
        assert_eq!(c.badge_text, Some("ON CALL"));
        assert!(c.show_schedule);

        let c = classify(&entity(r#"{"id":"a","status":"Annual Leave","opd":["08:00-10:00"]}"#));
        assert_eq!(c.state, DutyState::Leave);
        assert!(!c.show_schedule);
    }

    #[test]
    fn test_off_duty_cancellation() {
        let c = classify(&entity(r#"{"id":"a","status":"OFF_DUTY","status_reason":"OPD Cancelled today"}"#));
        assert_eq!(c.state, DutyState::Cancelled);
        assert_eq!(c.badge_text, Some("OPD CANCELLED"));

        let c = classify(&entity(r#"{"id":"a","status":"OFF_DUTY","status_reason":"conference"}"#));
        assert_eq!(c.state, DutyState::AwaitingSchedule);
    }

    #[test]
    fn test_schedule_decides_on_duty() {
        let c = classify(&entity(r#"{"id":"a","status":"ON_DUTY","start_time":"8:00","room":"12"}"#));
        assert_eq!(c.state, DutyState::AwaitingSchedule);
        assert!(c.show_start_time);
        assert!(c.show_room);

        let c = classify(&entity(r#"{"id":"a","status":"ON_DUTY","opd":["08:00-10:00"]}"#));
        assert_eq!(c.state, DutyState::OnDuty);
        assert!(c.badge_text.is_none());
        assert!(c.show_schedule);
        assert!(c.overlay_html().is_none());
    }

    #[test]
    fn test_overlay_markup_is_escaped() {
        let c = classify(&entity(r#"{"id":"a","status":"SICK","status_reason":"<b>flu</b> & \"cold\""}"#));
        assert_eq!(
            c.overlay_html().unwrap(),
            "SICK LEAVE<div class=\"small\">&lt;b&gt;flu&lt;/b&gt; &amp; &quot;cold&quot;</div>"
        );
    }

    #[test]
    fn test_classify_is_deterministic() {
        let e = entity(r#"{"id":"a","status":"OPD_CANCELLED","status_reason":"strike"}"#);
        assert_eq!(classify(&e), classify(&e));
    }
}
