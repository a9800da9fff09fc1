//! Date-window controller.
//!
//! Owns the loaded run of days, the viewed offset and the date the window was
//! anchored on. Navigation is local; network work is left to the caller.

use crate::normalize::TrackedEntity;
use chrono::NaiveDate;
use dutyboard_core::types::EntityId;
use serde::Serialize;

/// One loaded day of the window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Day {
    pub date: NaiveDate,
    pub entities: Vec<TrackedEntity>,
}

impl Day {
    pub fn entity(&self, id: &EntityId) -> Option<&TrackedEntity> {
        self.entities.iter().find(|e| &e.id == id)
    }

    pub fn entity_mut(&mut self, id: &EntityId) -> Option<&mut TrackedEntity> {
        self.entities.iter_mut().find(|e| &e.id == id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum WindowState {
    #[default]
    Uninitialized,
    Loaded,
    /// Offset moved; the exact fetch for the new date has not landed yet.
    Navigating,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Prev,
    Next,
}

#[derive(Debug, Default)]
pub struct DateWindow {
    days: Vec<Day>,
    offset: usize,
    anchor: Option<NaiveDate>,
    state: WindowState,
}

impl DateWindow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install a freshly loaded window and jump back to its first day.
    ///
    /// An empty window leaves the controller uninitialized so the next poll retries.
    pub fn replace(&mut self, days: Vec<Day>, anchor: NaiveDate) {
        self.anchor = Some(anchor);
        self.offset = 0;
        self.state = if days.is_empty() {
            WindowState::Uninitialized
        } else {
            WindowState::Loaded
        };
        self.days = days;
    }

    /// Record the anchor a pending load was issued for, keeping any loaded days.
    pub fn set_anchor(&mut self, anchor: NaiveDate) {
        self.anchor = Some(anchor);
    }

    /// Drop all loaded days ahead of a reload anchored on `anchor`.
    pub fn discard(&mut self, anchor: NaiveDate) {
        self.days.clear();
        self.offset = 0;
        self.anchor = Some(anchor);
        self.state = WindowState::Uninitialized;
    }

    pub fn anchor(&self) -> Option<NaiveDate> {
        self.anchor
    }

    pub fn state(&self) -> WindowState {
        self.state
    }

    pub fn is_loaded(&self) -> bool {
        self.state != WindowState::Uninitialized
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn len(&self) -> usize {
        self.days.len()
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }

    pub fn days(&self) -> &[Day] {
        &self.days
    }

    pub fn current(&self) -> Option<&Day> {
        self.days.get(self.offset)
    }

    pub fn current_mut(&mut self) -> Option<&mut Day> {
        self.days.get_mut(self.offset)
    }

    pub fn current_date(&self) -> Option<NaiveDate> {
        self.current().map(|d| d.date)
    }

    pub fn can_prev(&self) -> bool {
        self.is_loaded() && self.offset > 0
    }

    pub fn can_next(&self) -> bool {
        self.is_loaded() && self.offset + 1 < self.days.len()
    }

    /// Move one day. Out-of-bounds moves are no-ops and return `None`.
    pub fn step(&mut self, direction: Direction) -> Option<NaiveDate> {
        let target = match direction {
            Direction::Prev if self.can_prev() => self.offset - 1,
            Direction::Next if self.can_next() => self.offset + 1,
            _ => return None,
        };
        self.offset = target;
        self.state = WindowState::Navigating;
        self.current_date()
    }

    /// The exact fetch for the viewed date finished.
    pub fn settle(&mut self) {
        if self.state == WindowState::Navigating {
            self.state = WindowState::Loaded;
        }
    }

    /// True when the window was anchored on a date other than `today`.
    pub fn needs_reanchor(&self, today: NaiveDate) -> bool {
        self.anchor.is_some_and(|a| a != today)
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
