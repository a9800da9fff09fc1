//! Board state: the single owned struct every input mutates.

use crate::classify::canonical_status;
use crate::closure::{ClosureOverlay, ClosureRegistry};
use crate::differ::SnapshotDiffer;
use crate::normalize::{TrackedEntity, normalize};
use crate::window::{DateWindow, Day, Direction};
use chrono::NaiveDate;
use dutyboard_core::config::DisplayConfig;
use dutyboard_core::types::{ClosuresPayload, EntityId, RawEntity, WindowDay};
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::Instant;

/// Display-layer options. They never change classification.
#[derive(Debug, Clone)]
pub struct DisplayOptions {
    pub show_hidden: bool,
    /// Canonical status strings hidden unless `show_hidden` is set.
    pub hidden_statuses: Vec<String>,
    pub highlight: Duration,
}

impl Default for DisplayOptions {
    fn default() -> Self {
        Self::from(&DisplayConfig::default())
    }
}

impl From<&DisplayConfig> for DisplayOptions {
    fn from(config: &DisplayConfig) -> Self {
        Self {
            show_hidden: config.show_hidden,
            hidden_statuses: config.hidden_statuses.iter().map(|s| canonical_status(s)).collect(),
            highlight: Duration::from_millis(config.highlight_ms),
        }
    }
}

impl DisplayOptions {
    pub fn is_hidden(&self, entity: &TrackedEntity) -> bool {
        !self.show_hidden
            && !self.hidden_statuses.is_empty()
            && self.hidden_statuses.contains(&canonical_status(&entity.display_status))
    }
}

/// Result of applying a batch of records to the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// The batch targeted a date other than the viewed one.
    OutOfScope,
    Applied {
        updated: usize,
        changed: usize,
        /// Ids not present in the loaded window.
        unknown: usize,
    },
}

#[derive(Debug, Default)]
pub struct BoardState {
    pub(crate) window: DateWindow,
    differ: SnapshotDiffer,
    registry: ClosureRegistry,
    pub(crate) overlay: ClosureOverlay,
    highlights: HashMap<EntityId, Instant>,
    pub(crate) section_order: Vec<String>,
    pub(crate) branding_version: u64,
    pub(crate) options: DisplayOptions,
}

impl BoardState {
    pub fn new(options: DisplayOptions) -> Self {
        Self {
            options,
            ..Self::default()
        }
    }

    pub fn window(&self) -> &DateWindow {
        &self.window
    }

    pub fn registry(&self) -> &ClosureRegistry {
        &self.registry
    }

    pub fn overlay(&self) -> &ClosureOverlay {
        &self.overlay
    }

    pub fn options(&self) -> &DisplayOptions {
        &self.options
    }

    pub fn current_date(&self) -> Option<NaiveDate> {
        self.window.current_date()
    }

    /// Remember the anchor a window load was issued for.
    pub fn begin_load(&mut self, anchor: NaiveDate) {
        self.window.set_anchor(anchor);
    }

    /// Install a loaded window and render day 0.
    pub fn load_window(&mut self, days: Vec<WindowDay>, anchor: NaiveDate, now: Instant) {
        let days = days
            .into_iter()
            .map(|d| Day {
                date: d.date,
                entities: d.doctors.iter().map(normalize).collect(),
            })
            .collect();
        self.window.replace(days, anchor);
        self.render_current(now);
    }

    /// Drop the window ahead of a re-anchored reload.
    pub fn discard_window(&mut self, anchor: NaiveDate) {
        self.window.discard(anchor);
        self.overlay.apply(None, &self.registry);
    }

    /// Re-evaluate the closure overlay and snapshots for the viewed day.
    ///
    /// Returns true when the overlay is showing. Snapshots are not touched while
    /// the date is closed.
    pub fn render_current(&mut self, now: Instant) -> bool {
        let viewed = self.window.current_date();
        self.overlay.apply(viewed, &self.registry);
        if self.overlay.is_visible() {
            return true;
        }
        let Some(day) = self.window.current() else {
            return false;
        };
        let changed: Vec<EntityId> = day
            .entities
            .iter()
            .filter(|e| self.differ.diff(e))
            .map(|e| e.id.clone())
            .collect();
        self.flag(changed, now);
        false
    }

    /// Move the viewed offset and re-render. `None` when the move was out of bounds.
    pub fn navigate(&mut self, direction: Direction, now: Instant) -> Option<NaiveDate> {
        let date = self.window.step(direction)?;
        self.render_current(now);
        Some(date)
    }

    pub fn settle_navigation(&mut self) {
        self.window.settle();
    }

    /// Apply authoritative or patch records for `date`.
    pub fn apply_records(&mut self, date: NaiveDate, records: &[RawEntity], now: Instant) -> ApplyOutcome {
        if self.window.current_date() != Some(date) {
            return ApplyOutcome::OutOfScope;
        }
        let Some(day) = self.window.current_mut() else {
            return ApplyOutcome::OutOfScope;
        };

        let (mut updated, mut unknown) = (0, 0);
        let mut changed = Vec::new();
        for raw in records {
            let fresh = normalize(raw);
            let Some(slot) = day.entity_mut(&fresh.id) else {
                unknown += 1;
                continue;
            };
            let name = std::mem::take(&mut slot.name);
            let specialty = std::mem::take(&mut slot.specialty);
            *slot = fresh;
            if slot.name.is_empty() {
                slot.name = name;
            }
            if slot.specialty.is_empty() {
                slot.specialty = specialty;
            }
            updated += 1;
            if self.differ.diff(slot) {
                changed.push(slot.id.clone());
            }
        }
        let changed_count = changed.len();
        self.flag(changed, now);
        ApplyOutcome::Applied {
            updated,
            changed: changed_count,
            unknown,
        }
    }

    pub fn replace_closures(&mut self, payload: &ClosuresPayload, now: Instant) {
        self.registry.replace(payload);
        self.render_current(now);
    }

    /// Fail open: forget all closures.
    pub fn clear_closures(&mut self, now: Instant) {
        self.registry.clear();
        self.render_current(now);
    }

    pub fn set_section_order(&mut self, order: Vec<String>) {
        self.section_order = order;
    }

    /// Set the branding version, or bump it when the update carries none.
    pub fn bump_branding(&mut self, version: Option<u64>) {
        self.branding_version = version.unwrap_or(self.branding_version + 1);
    }

    pub fn branding_version(&self) -> u64 {
        self.branding_version
    }

    fn flag(&mut self, ids: Vec<EntityId>, now: Instant) {
        let until = now + self.options.highlight;
        for id in ids {
            self.highlights.insert(id, until);
        }
    }

    pub fn is_highlighted(&self, id: &EntityId, now: Instant) -> bool {
        self.highlights.get(id).is_some_and(|until| *until > now)
    }

    pub fn next_highlight_expiry(&self) -> Option<Instant> {
        self.highlights.values().min().copied()
    }

    /// Drop expired highlights. Returns true when any were removed.
    pub fn prune_highlights(&mut self, now: Instant) -> bool {
        let before = self.highlights.len();
        self.highlights.retain(|_, until| *until > now);
        self.highlights.len() != before
    }

    /// Forget everything except display options.
    pub fn reset(&mut self) {
        let options = std::mem::take(&mut self.options);
        *self = Self::new(options);
    }
}
