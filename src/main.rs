//! # DutyBoard: terminal duty board
//!
//! Runs the sync engine against a schedule server and prints the board every
//! time it changes.
//!
//! Usage:
//!   dutyboard                                  # Use ~/.dutyboard/config.toml
//!   dutyboard --server http://10.0.0.5:5000    # Point at another server
//!   dutyboard --days 7 --show-hidden           # Shorter window, reveal hidden cards
//!
//! Keys (type then Enter): n = next day, p = previous day, r = reload, q = quit.
//! The board also stops when stdin closes or on Ctrl-C.

use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

use dutyboard_board::render_text;
use dutyboard_core::{DutyBoardConfig, SystemClock};
use dutyboard_sync::{Command, SyncEngine};
use dutyboard_transport::{Backoff, HttpScheduleApi, PushClient};

#[derive(Parser)]
#[command(
    name = "dutyboard",
    version,
    about = "Live hospital duty board kept in sync with the schedule server"
)]
struct Cli {
    /// Config file (defaults to ~/.dutyboard/config.toml)
    #[arg(short, long)]
    config: Option<String>,

    /// Schedule server base URL
    #[arg(long)]
    server: Option<String>,

    /// Number of days in the navigable window
    #[arg(long)]
    days: Option<usize>,

    /// Reveal cards whose status is configured as hidden
    #[arg(long)]
    show_hidden: bool,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn expand_path(p: &str) -> String {
    shellexpand::tilde(p).to_string()
}

fn parse_command(line: &str) -> Option<Command> {
    match line.trim().to_lowercase().as_str() {
        "n" | "next" => Some(Command::Next),
        "p" | "prev" => Some(Command::Prev),
        "r" | "reload" => Some(Command::Reload),
        "q" | "quit" => Some(Command::Shutdown),
        _ => None,
    }
}

/// Forward typed commands to the engine until `q`, EOF or a read error.
async fn forward_commands<R>(reader: R, tx: &mpsc::Sender<Command>)
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();
    while let Ok(Some(line)) = lines.next_line().await {
        match parse_command(&line) {
            Some(Command::Shutdown) => return,
            Some(command) => {
                if tx.send(command).await.is_err() {
                    return;
                }
            }
            None => println!("keys: n = next, p = prev, r = reload, q = quit"),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        "dutyboard=debug,dutyboard_sync=debug,dutyboard_transport=debug,dutyboard_board=debug"
    } else {
        "dutyboard=info,dutyboard_sync=info,dutyboard_transport=info,dutyboard_board=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_target(false)
        .init();

    let mut config = match &cli.config {
        Some(path) => DutyBoardConfig::load_from(std::path::Path::new(&expand_path(path)))?,
        None => DutyBoardConfig::load()?,
    };
    if let Some(server) = cli.server {
        config.server.base_url = server;
    }
    if let Some(days) = cli.days {
        config.window.days = days;
    }
    if cli.show_hidden {
        config.display.show_hidden = true;
    }
    config.validate()?;

    tracing::info!("🏥 DutyBoard v{} → {}", env!("CARGO_PKG_VERSION"), config.server.base_url);

    let api = Arc::new(HttpScheduleApi::new(config.server.clone()));
    let clock = Arc::new(SystemClock::with_offset_minutes(config.window.utc_offset_minutes));

    let (event_tx, event_rx) = mpsc::channel(256);
    let push = PushClient::new(
        config.server.url(&config.server.events_path),
        Backoff::from_config(&config.reconnect),
    )
    .spawn(event_tx);

    let engine = SyncEngine::new(&config, api, clock);
    let mut views = engine.subscribe();
    let (command_tx, command_rx) = mpsc::channel(16);
    let engine_task = tokio::spawn(engine.run(event_rx, command_rx));

    let printer = tokio::spawn(async move {
        while views.changed().await.is_ok() {
            let text = render_text(&views.borrow_and_update());
            println!("{text}");
        }
    });

    tokio::select! {
        _ = forward_commands(BufReader::new(tokio::io::stdin()), &command_tx) => {}
        _ = tokio::signal::ctrl_c() => {}
    }

    let _ = command_tx.send(Command::Shutdown).await;
    let _ = engine_task.await;
    push.abort();
    printer.abort();
    tracing::info!("👋 DutyBoard stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_command() {
        assert_eq!(parse_command(" N "), Some(Command::Next));
        assert_eq!(parse_command("prev"), Some(Command::Prev));
        assert_eq!(parse_command("r"), Some(Command::Reload));
        assert_eq!(parse_command("q"), Some(Command::Shutdown));
        assert_eq!(parse_command("x"), None);
    }

    #[tokio::test]
    async fn test_forward_commands_stops_at_eof() {
        let (tx, mut rx) = mpsc::channel(8);
        forward_commands(&b"n\nhelp\np\n"[..], &tx).await;
        drop(tx);
        assert_eq!(rx.recv().await, Some(Command::Next));
        assert_eq!(rx.recv().await, Some(Command::Prev));
        assert_eq!(rx.recv().await, None);
    }

    #[tokio::test]
    async fn test_forward_commands_stops_at_quit() {
        let (tx, mut rx) = mpsc::channel(8);
        forward_commands(&b"r\nq\nn\n"[..], &tx).await;
        drop(tx);
        assert_eq!(rx.recv().await, Some(Command::Reload));
        assert_eq!(rx.recv().await, None);
    }

    #[test]
    fn test_cli_overrides_parse() {
        let cli = Cli::parse_from(["dutyboard", "--server", "http://x:1", "--days", "7", "--show-hidden"]);
        assert_eq!(cli.server.as_deref(), Some("http://x:1"));
        assert_eq!(cli.days, Some(7));
        assert!(cli.show_hidden);
        assert!(!cli.verbose);
    }
}
