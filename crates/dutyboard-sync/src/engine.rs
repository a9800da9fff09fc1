//! Sync engine: the single task that owns the board.
//!
//! Push events, fetch completions, navigation commands and timers all funnel
//! into one `select!` loop. Fetches run on spawned tasks and report back over a
//! channel, so board state is only ever touched from here.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use tokio::sync::{mpsc, watch};
use tokio::time::{Instant, MissedTickBehavior};

use dutyboard_board::{ApplyOutcome, BoardState, BoardView, Direction, DisplayOptions};
use dutyboard_core::config::DutyBoardConfig;
use dutyboard_core::error::Result;
use dutyboard_core::types::{ClosuresPayload, DayPayload, WindowDay};
use dutyboard_core::Clock;
use dutyboard_transport::{ConnectionState, PushEvent, ScheduleApi, TransportEvent};

/// Navigation and lifecycle commands from the front end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Next,
    Prev,
    Reload,
    Shutdown,
}

/// Timer settings for the engine loop.
#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub window_days: usize,
    pub poll_interval: Duration,
    pub reanchor_interval: Duration,
}

impl From<&DutyBoardConfig> for EngineSettings {
    fn from(config: &DutyBoardConfig) -> Self {
        Self {
            window_days: config.window.days,
            poll_interval: config.sync.poll_interval(),
            reanchor_interval: config.window.reanchor_interval(),
        }
    }
}

enum Completion {
    Window {
        anchor: NaiveDate,
        result: Result<Vec<WindowDay>>,
    },
    Day {
        date: NaiveDate,
        result: Result<DayPayload>,
    },
    Closures(Result<ClosuresPayload>),
}

pub struct SyncEngine {
    board: BoardState,
    api: Arc<dyn ScheduleApi>,
    clock: Arc<dyn Clock>,
    settings: EngineSettings,
    in_flight: usize,
    done_tx: mpsc::UnboundedSender<Completion>,
    done_rx: mpsc::UnboundedReceiver<Completion>,
    view_tx: watch::Sender<BoardView>,
}

impl SyncEngine {
    pub fn new(config: &DutyBoardConfig, api: Arc<dyn ScheduleApi>, clock: Arc<dyn Clock>) -> Self {
        let (done_tx, done_rx) = mpsc::unbounded_channel();
        let (view_tx, _) = watch::channel(BoardView::default());
        Self {
            board: BoardState::new(DisplayOptions::from(&config.display)),
            api,
            clock,
            settings: EngineSettings::from(config),
            in_flight: 0,
            done_tx,
            done_rx,
            view_tx,
        }
    }

    /// Latest board view, republished after every handled input.
    pub fn subscribe(&self) -> watch::Receiver<BoardView> {
        self.view_tx.subscribe()
    }

    pub fn board(&self) -> &BoardState {
        &self.board
    }

    /// Fetches spawned but not yet applied.
    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    /// Kick off the initial closure and window loads.
    pub fn start(&mut self) {
        let today = self.clock.today();
        tracing::info!("📅 Duty board starting, anchored at {today}");
        self.board.begin_load(today);
        self.request_closures();
        self.request_window(today, None);
        self.publish();
    }

    pub fn handle_transport(&mut self, event: TransportEvent) {
        match event {
            TransportEvent::Push(push) => self.handle_push(push),
            TransportEvent::Connection(ConnectionState::Connected) => {
                tracing::info!("📡 Live updates connected");
            }
            TransportEvent::Connection(ConnectionState::Disconnected) => {
                tracing::warn!("⚠️ Live updates disconnected, polling continues");
            }
            TransportEvent::Connection(ConnectionState::Reconnecting { delay, attempt }) => {
                tracing::debug!("Reconnect attempt {attempt} in {}ms", delay.as_millis());
            }
        }
        self.publish();
    }

    fn handle_push(&mut self, event: PushEvent) {
        let viewed = self.board.current_date();
        match event {
            PushEvent::EntityUpdate { entity_id, date, entity } => {
                let Some(viewed) = viewed else {
                    tracing::debug!("Update for {entity_id:?} before window load, ignored");
                    return;
                };
                if let Some(date) = date.filter(|d| *d != viewed) {
                    tracing::debug!("Update for {entity_id:?} on {date} out of scope (viewing {viewed})");
                    return;
                }
                if let Some(raw) = entity {
                    self.board
                        .apply_records(viewed, std::slice::from_ref(&*raw), Instant::now());
                }
                self.request_day(viewed);
            }
            PushEvent::ClosureUpdate => self.request_closures(),
            PushEvent::BrandingUpdate { version } => {
                self.board.bump_branding(version);
                tracing::info!("🎨 Branding version now {}", self.board.branding_version());
            }
            PushEvent::OrderUpdate { order } => {
                tracing::info!("🔀 Section order updated ({} named)", order.len());
                self.board.set_section_order(order);
            }
            PushEvent::ScheduleCleared { dates } => match viewed {
                Some(viewed) if dates.contains(&viewed) => {
                    tracing::info!("🧹 Schedule cleared for viewed date {viewed}, reloading window");
                    let anchor = self.anchor();
                    self.request_window(anchor, Some(anchor));
                }
                _ => tracing::debug!("Schedule clear for {dates:?} does not touch the viewed date"),
            },
            PushEvent::EntityCreated { entity_id } | PushEvent::EntityDeleted { entity_id } => {
                tracing::debug!("Roster change for {entity_id:?}; picked up on next window load");
            }
            PushEvent::Other { topic } => tracing::debug!("Ignoring push topic '{topic}'"),
        }
    }

    /// Returns false when the engine should stop.
    pub fn handle_command(&mut self, command: Command) -> bool {
        match command {
            Command::Next => self.navigate(Direction::Next),
            Command::Prev => self.navigate(Direction::Prev),
            Command::Reload => {
                if !self.check_rollover() {
                    let anchor = self.anchor();
                    self.request_window(anchor, Some(anchor));
                }
            }
            Command::Shutdown => {
                tracing::info!("👋 Sync engine shutting down");
                return false;
            }
        }
        self.publish();
        true
    }

    fn navigate(&mut self, direction: Direction) {
        if self.check_rollover() {
            return;
        }
        match self.board.navigate(direction, Instant::now()) {
            Some(date) => self.request_day(date),
            None => tracing::debug!("Navigation {direction:?} out of bounds"),
        }
    }

    /// Safety-net poll: retry the window while unloaded, else re-pull the viewed day.
    pub fn on_poll_tick(&mut self) {
        match self.board.current_date() {
            Some(date) => self.request_day(date),
            None => {
                let anchor = self.anchor();
                self.request_window(anchor, Some(anchor));
            }
        }
    }

    /// Returns true when the date rolled over and the window was re-anchored.
    pub fn on_reanchor_tick(&mut self) -> bool {
        let rolled = self.check_rollover();
        if rolled {
            self.publish();
        }
        rolled
    }

    fn check_rollover(&mut self) -> bool {
        let today = self.clock.today();
        if !self.board.window().needs_reanchor(today) {
            return false;
        }
        tracing::info!(
            "🌅 Date rolled over ({:?} → {today}), reloading window",
            self.board.window().anchor()
        );
        self.board.discard_window(today);
        self.request_window(today, Some(today));
        true
    }

    fn anchor(&self) -> NaiveDate {
        self.board.window().anchor().unwrap_or_else(|| self.clock.today())
    }

    fn handle_completion(&mut self, done: Completion) {
        self.in_flight = self.in_flight.saturating_sub(1);
        let now = Instant::now();
        match done {
            Completion::Window { anchor, result } => match result {
                Ok(days) if self.board.window().anchor() == Some(anchor) => {
                    tracing::info!("📅 Window loaded: {} days anchored at {anchor}", days.len());
                    self.board.load_window(days, anchor, now);
                    if let Some(date) = self.board.current_date() {
                        self.request_day(date);
                    }
                }
                Ok(_) => tracing::debug!("Discarding stale window anchored at {anchor}"),
                Err(e) => tracing::warn!("⚠️ Window load failed: {e}"),
            },
            Completion::Day { date, result } => match result {
                Ok(payload) => match self.board.apply_records(date, &payload.doctors, now) {
                    ApplyOutcome::OutOfScope => {
                        tracing::debug!("Discarding day {date}: no longer viewed");
                    }
                    ApplyOutcome::Applied { updated, changed, unknown } => {
                        self.board.settle_navigation();
                        tracing::debug!("Day {date}: {updated} updated, {changed} changed, {unknown} unknown");
                    }
                },
                Err(e) => {
                    if self.board.current_date() == Some(date) {
                        self.board.settle_navigation();
                    }
                    tracing::warn!("⚠️ Day fetch for {date} failed: {e}");
                }
            },
            Completion::Closures(result) => match result {
                Ok(payload) => {
                    self.board.replace_closures(&payload, now);
                    tracing::info!("🏖️ Closure registry refreshed: {} dates", self.board.registry().len());
                }
                Err(e) => {
                    tracing::warn!("⚠️ Closure fetch failed, showing board open: {e}");
                    self.board.clear_closures(now);
                }
            },
        }
        self.publish();
    }

    /// Apply completions until no fetch is outstanding.
    pub async fn drain_fetches(&mut self) {
        while self.in_flight > 0 {
            match self.done_rx.recv().await {
                Some(done) => self.handle_completion(done),
                None => break,
            }
        }
    }

    /// Main loop. Returns on `Command::Shutdown` or when the command channel closes.
    pub async fn run(
        mut self,
        mut events: mpsc::Receiver<TransportEvent>,
        mut commands: mpsc::Receiver<Command>,
    ) {
        self.start();

        let start = Instant::now();
        let mut poll = tokio::time::interval_at(start + self.settings.poll_interval, self.settings.poll_interval);
        poll.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut reanchor =
            tokio::time::interval_at(start + self.settings.reanchor_interval, self.settings.reanchor_interval);
        reanchor.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut events_open = true;

        loop {
            let expiry = self.board.next_highlight_expiry();
            tokio::select! {
                Some(done) = self.done_rx.recv() => self.handle_completion(done),
                event = events.recv(), if events_open => match event {
                    Some(event) => self.handle_transport(event),
                    None => {
                        tracing::warn!("⚠️ Push channel gone, continuing on polling only");
                        events_open = false;
                    }
                },
                command = commands.recv() => match command {
                    Some(command) => {
                        if !self.handle_command(command) {
                            break;
                        }
                    }
                    None => break,
                },
                _ = poll.tick() => {
                    self.on_poll_tick();
                    self.publish();
                }
                _ = reanchor.tick() => {
                    self.on_reanchor_tick();
                }
                _ = tokio::time::sleep_until(expiry.unwrap_or(start)), if expiry.is_some() => {
                    if self.board.prune_highlights(Instant::now()) {
                        self.publish();
                    }
                }
            }
        }
    }

    fn publish(&self) {
        self.view_tx.send_replace(self.board.view(Instant::now()));
    }

    fn spawn_fetch<F>(&mut self, fetch: F)
    where
        F: Future<Output = Completion> + Send + 'static,
    {
        self.in_flight += 1;
        let tx = self.done_tx.clone();
        tokio::spawn(async move {
            let _ = tx.send(fetch.await);
        });
    }

    fn request_window(&mut self, anchor: NaiveDate, start: Option<NaiveDate>) {
        let api = self.api.clone();
        let days = self.settings.window_days;
        self.spawn_fetch(async move {
            Completion::Window {
                anchor,
                result: api.fetch_window(start, days).await,
            }
        });
    }

    fn request_day(&mut self, date: NaiveDate) {
        let api = self.api.clone();
        self.spawn_fetch(async move {
            Completion::Day {
                date,
                result: api.fetch_day(date).await,
            }
        });
    }

    fn request_closures(&mut self) {
        let api = self.api.clone();
        self.spawn_fetch(async move { Completion::Closures(api.fetch_closures().await) });
    }
}
