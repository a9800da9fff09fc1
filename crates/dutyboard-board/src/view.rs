//! Immutable view model produced from [`BoardState`].
//!
//! Front ends paint a [`BoardView`]; they never reach into the state itself.

use crate::board::BoardState;
use crate::classify::{DutyState, classify};
use crate::normalize::TrackedEntity;
use crate::schedule::{ScheduleGroup, schedule_groups};
use crate::window::WindowState;
use chrono::NaiveDate;
use dutyboard_core::types::EntityId;
use regex::Regex;
use serde::Serialize;
use std::fmt::Write as _;
use std::sync::LazyLock;
use tokio::time::Instant;

static DR_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^Dr[.\s]+").expect("valid prefix regex"));

pub const EMPTY_SECTION_MESSAGE: &str = "No doctors on duty";

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BoardView {
    pub state: WindowState,
    pub date: Option<NaiveDate>,
    pub offset: usize,
    pub window_len: usize,
    pub can_prev: bool,
    pub can_next: bool,
    /// Closure overlay message. When set, no card is rendered.
    pub closure: Option<String>,
    pub sections: Vec<SectionView>,
    pub branding_version: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SectionView {
    pub specialty: String,
    pub visible: bool,
    /// No card in this section is visible.
    pub empty: bool,
    pub cards: Vec<CardView>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CardView {
    pub id: EntityId,
    pub display_name: String,
    pub full_name: String,
    pub designation: String,
    pub state: DutyState,
    pub badge: Option<&'static str>,
    pub reason: Option<String>,
    pub overlay_html: Option<String>,
    pub start_time: Option<String>,
    pub room: Option<String>,
    pub groups: Vec<ScheduleGroup>,
    pub highlighted: bool,
    pub hidden: bool,
}

impl BoardView {
    /// Cards actually painted: none while the closure overlay is up.
    pub fn rendered_cards(&self) -> impl Iterator<Item = &CardView> {
        let open = self.closure.is_none();
        self.sections
            .iter()
            .filter(move |s| open && s.visible)
            .flat_map(|s| s.cards.iter())
            .filter(|c| !c.hidden)
    }

    pub fn card(&self, id: &EntityId) -> Option<&CardView> {
        self.sections.iter().flat_map(|s| s.cards.iter()).find(|c| &c.id == id)
    }
}

/// Shorten long names: drop a leading "Dr." above 34 chars; above 48 chars,
/// reduce middle names to initials when that saves more than three characters.
pub fn display_name(name: &str) -> String {
    let mut shown = name.trim().to_string();
    if shown.chars().count() > 34 {
        shown = DR_PREFIX.replace(&shown, "").into_owned();
    }
    let len = shown.chars().count();
    if len > 48 {
        let parts: Vec<&str> = shown.split_whitespace().collect();
        if parts.len() > 3 {
            let initials: Vec<String> = parts[1..parts.len() - 1]
                .iter()
                .filter_map(|p| p.chars().next())
                .map(|c| format!("{}.", c.to_uppercase()))
                .collect();
            let compressed = format!("{} {} {}", parts[0], initials.join(" "), parts[parts.len() - 1]);
            if compressed.chars().count() + 3 < len {
                shown = compressed;
            }
        }
    }
    shown
}

fn card_view(board: &BoardState, entity: &TrackedEntity, now: Instant) -> CardView {
    let c = classify(entity);
    CardView {
        id: entity.id.clone(),
        display_name: display_name(&entity.name),
        full_name: entity.name.clone(),
        designation: entity
            .designation
            .clone()
            .unwrap_or_else(|| entity.specialty.clone()),
        state: c.state,
        badge: c.badge_text,
        reason: c.reason.clone(),
        overlay_html: c.overlay_html(),
        start_time: entity.start_time.clone().filter(|_| c.show_start_time),
        room: entity.room.clone().filter(|_| c.show_room),
        groups: if c.show_schedule {
            schedule_groups(&entity.schedule)
        } else {
            Vec::new()
        },
        highlighted: board.is_highlighted(&entity.id, now),
        hidden: board.options().is_hidden(entity),
    }
}

/// Sections in first-seen order, then the ordered names moved to the end.
fn order_sections(mut sections: Vec<SectionView>, order: &[String]) -> Vec<SectionView> {
    for name in order {
        if let Some(pos) = sections.iter().position(|s| &s.specialty == name) {
            let section = sections.remove(pos);
            sections.push(section);
        }
    }
    sections
}

impl BoardState {
    pub fn view(&self, now: Instant) -> BoardView {
        let window = self.window();
        let closed = self.overlay().is_visible();

        let mut sections: Vec<SectionView> = Vec::new();
        if let Some(day) = window.current() {
            for entity in &day.entities {
                let card = card_view(self, entity, now);
                match sections.iter_mut().find(|s| s.specialty == entity.specialty) {
                    Some(section) => section.cards.push(card),
                    None => sections.push(SectionView {
                        specialty: entity.specialty.clone(),
                        visible: true,
                        empty: false,
                        cards: vec![card],
                    }),
                }
            }
        }
        for section in &mut sections {
            section.visible = !closed;
            section.empty = section.cards.iter().all(|c| c.hidden);
        }

        BoardView {
            state: window.state(),
            date: window.current_date(),
            offset: window.offset(),
            window_len: window.len(),
            can_prev: window.can_prev(),
            can_next: window.can_next(),
            closure: self.overlay().message().map(String::from),
            sections: order_sections(sections, &self.section_order),
            branding_version: self.branding_version(),
        }
    }
}

/// Plain-text rendering for terminals.
pub fn render_text(view: &BoardView) -> String {
    let mut out = String::new();
    let Some(date) = view.date else {
        let _ = writeln!(out, "Loading duty board...");
        return out;
    };
    let _ = writeln!(
        out,
        "=== {} ({}/{}) {}{} ===",
        date.format("%A %d %B %Y"),
        view.offset + 1,
        view.window_len,
        if view.can_prev { "[p]rev " } else { "" },
        if view.can_next { "[n]ext" } else { "" },
    );
    if let Some(message) = &view.closure {
        let _ = writeln!(out, "\n  *** {message} ***");
        return out;
    }
    for section in view.sections.iter().filter(|s| s.visible) {
        let title = if section.specialty.is_empty() { "OTHER" } else { &section.specialty };
        let _ = writeln!(out, "\n{title}");
        if section.empty {
            let _ = writeln!(out, "  {EMPTY_SECTION_MESSAGE}");
            continue;
        }
        for c in section.cards.iter().filter(|c| !c.hidden) {
            let mark = if c.highlighted { "*" } else { " " };
            let _ = write!(out, " {mark} {} ({})", c.display_name, c.designation);
            if let Some(t) = &c.start_time {
                let _ = write!(out, " from {t}");
            }
            if let Some(r) = &c.room {
                let _ = write!(out, " Room: {r}");
            }
            if let Some(badge) = c.badge {
                let _ = write!(out, " [{badge}]");
            }
            if let Some(reason) = &c.reason {
                let _ = write!(out, " {reason}");
            }
            let _ = writeln!(out);
            for g in &c.groups {
                let _ = writeln!(out, "      {}: {}", g.title(), g.chips.join(", "));
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::DisplayOptions;
    use crate::window::Direction;
    use dutyboard_core::config::DisplayConfig;
    use dutyboard_core::types::{ClosuresPayload, WindowDay};

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, d).unwrap()
    }

    fn board(json: &str) -> (BoardState, Instant) {
        let days: Vec<WindowDay> = serde_json::from_str(json).unwrap();
        let now = Instant::now();
        let mut board = BoardState::new(DisplayOptions::default());
        board.load_window(days, date(17), now);
        (board, now)
    }

    const DAY: &str = r#"[{"date":"2026-10-17","doctors":[
        {"id":"a","name":"Dr. A","specialty":"CARDIOLOGY","status":"on_duty","start_time":"8:00","room":"4",
         "opd":[{"range":"08:00-14:00","count":20}]},
        {"id":"b","name":"Dr. B","specialty":"ENT","status":"","start_time":"09:00","room":"2","opd":["09:00-10:00"]},
        {"id":"c","name":"Dr. C","specialty":"CARDIOLOGY","status":"SICK","status_reason":"flu (2 days)"}
    ]}]"#;

    #[test]
    fn test_display_name_compression() {
        assert_eq!(display_name("Dr. Short Name"), "Dr. Short Name");
        let long = "Dr. Abdullah Mohamed Rasheed Ibrahim";
        assert_eq!(display_name(long), "Abdullah Mohamed Rasheed Ibrahim");
        let very_long = "Dr. Mohamed Abdulla Hassan Rasheed Ibrahim Manik Fulhu";
        assert_eq!(display_name(very_long), "Mohamed A. H. R. I. M. Fulhu");
    }

    #[test]
    fn test_on_duty_card_renders_chips() {
        let (board, now) = board(DAY);
        let view = board.view(now);
        let a = view.card(&EntityId::from("a")).unwrap();
        assert_eq!(a.state, DutyState::OnDuty);
        assert_eq!(a.groups.len(), 1);
        assert_eq!(a.groups[0].chips, vec!["08:00-14:00 • 20 pts"]);
        assert_eq!(a.start_time.as_deref(), Some("08:00"));
        assert_eq!(a.designation, "CARDIOLOGY");
    }

    #[test]
    fn test_pending_card_hides_details() {
        let (board, now) = board(DAY);
        let view = board.view(now);
        let b = view.card(&EntityId::from("b")).unwrap();
        assert_eq!(b.state, DutyState::Pending);
        assert!(b.start_time.is_none());
        assert!(b.room.is_none());
        assert!(b.groups.is_empty());
    }

    #[test]
    fn test_sick_card_carries_reason() {
        let (board, now) = board(DAY);
        let view = board.view(now);
        let c = view.card(&EntityId::from("c")).unwrap();
        assert_eq!(c.badge, Some("SICK LEAVE"));
        assert_eq!(c.reason.as_deref(), Some("flu (2 days)"));
    }

    #[test]
    fn test_closed_date_renders_no_cards() {
        let (mut board, now) = board(DAY);
        let payload: ClosuresPayload = serde_json::from_str(r#"{"dates":{"2026-10-17":{}}}"#).unwrap();
        board.replace_closures(&payload, now);
        let view = board.view(now);
        assert_eq!(view.closure.as_deref(), Some("TODAY IS A PUBLIC HOLIDAY"));
        assert_eq!(view.rendered_cards().count(), 0);
        assert!(view.sections.iter().all(|s| !s.visible));
        assert!(render_text(&view).contains("PUBLIC HOLIDAY"));
    }

    #[test]
    fn test_section_order_moves_named_to_end() {
        let (mut board, now) = board(DAY);
        assert_eq!(
            board.view(now).sections.iter().map(|s| s.specialty.as_str()).collect::<Vec<_>>(),
            vec!["CARDIOLOGY", "ENT"]
        );
        board.set_section_order(vec!["CARDIOLOGY".into(), "UNKNOWN".into()]);
        assert_eq!(
            board.view(now).sections.iter().map(|s| s.specialty.as_str()).collect::<Vec<_>>(),
            vec!["ENT", "CARDIOLOGY"]
        );
    }

    #[test]
    fn test_hidden_cards_mark_section_empty() {
        let days: Vec<WindowDay> = serde_json::from_str(DAY).unwrap();
        let now = Instant::now();
        let config = DisplayConfig {
            hidden_statuses: vec!["sick".into(), "on-duty".into()],
            ..DisplayConfig::default()
        };
        let mut board = BoardState::new(DisplayOptions::from(&config));
        board.load_window(days, date(17), now);
        let view = board.view(now);
        let cardiology = view.sections.iter().find(|s| s.specialty == "CARDIOLOGY").unwrap();
        assert!(cardiology.empty);
        assert_eq!(view.rendered_cards().count(), 1);
        assert!(render_text(&view).contains(EMPTY_SECTION_MESSAGE));
    }

    #[test]
    fn test_view_tracks_navigation_bounds() {
        let (mut board, now) = board(
            r#"[{"date":"2026-10-17","doctors":[]},{"date":"2026-10-18","doctors":[]}]"#,
        );
        let view = board.view(now);
        assert!(!view.can_prev && view.can_next);
        board.navigate(Direction::Next, now);
        let view = board.view(now);
        assert_eq!(view.date, Some(date(18)));
        assert_eq!(view.state, WindowState::Navigating);
        assert!(view.can_prev && !view.can_next);
    }
}
