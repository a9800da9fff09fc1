//! # DutyBoard Board
//! Everything between a raw server record and a painted card: normalization,
//! classification, change detection, the date window, closures and the view model.

pub mod board;
pub mod classify;
pub mod closure;
pub mod differ;
pub mod normalize;
pub mod schedule;
pub mod view;
pub mod window;

pub use board::{ApplyOutcome, BoardState, DisplayOptions};
pub use classify::{Classification, DutyState, classify};
pub use closure::{ClosureOverlay, ClosureRegistry};
pub use differ::SnapshotDiffer;
pub use normalize::{TrackedEntity, normalize};
pub use schedule::{GroupKind, ScheduleGroup, schedule_groups};
pub use view::{BoardView, CardView, SectionView, render_text};
pub use window::{DateWindow, Day, Direction, WindowState};
