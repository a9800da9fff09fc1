//! Server-push subscription with reconnect backoff.
//!
//! One task, one loop: connect, stream frames until the connection drops, wait
//! out the backoff, try again. The loop ends when the receiving side goes away.

use crate::backoff::Backoff;
use crate::events::{ConnectionState, PushEvent, TransportEvent};
use crate::sse::SseDecoder;
use dutyboard_core::error::{DutyBoardError, Result};
use futures::StreamExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

enum StreamEnd {
    /// Server closed the stream.
    Closed,
    /// Nobody is listening any more.
    ReceiverGone,
}

pub struct PushClient {
    url: String,
    client: reqwest::Client,
    backoff: Backoff,
}

impl PushClient {
    pub fn new(url: impl Into<String>, backoff: Backoff) -> Self {
        Self {
            url: url.into(),
            client: reqwest::Client::new(),
            backoff,
        }
    }

    /// Run the subscription loop on its own task.
    pub fn spawn(self, tx: mpsc::Sender<TransportEvent>) -> JoinHandle<()> {
        tokio::spawn(self.run(tx))
    }

    pub async fn run(mut self, tx: mpsc::Sender<TransportEvent>) {
        tracing::info!("📡 Push channel starting: {}", self.url);
        loop {
            match self.stream_once(&tx).await {
                Ok(StreamEnd::ReceiverGone) => break,
                Ok(StreamEnd::Closed) => tracing::info!("📡 Push channel closed by server"),
                Err(e) => tracing::warn!("⚠️ Push channel error: {e}"),
            }

            let delay = self.backoff.next_delay();
            let reconnecting = ConnectionState::Reconnecting {
                delay,
                attempt: self.backoff.attempts(),
            };
            if tx.send(TransportEvent::Connection(ConnectionState::Disconnected)).await.is_err()
                || tx.send(TransportEvent::Connection(reconnecting)).await.is_err()
            {
                break;
            }
            tracing::debug!("Push channel reconnecting in {}ms", delay.as_millis());

            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = tx.closed() => break,
            }
        }
        tracing::info!("📡 Push channel stopped");
    }

    async fn stream_once(&mut self, tx: &mpsc::Sender<TransportEvent>) -> Result<StreamEnd> {
        let resp = self
            .client
            .get(&self.url)
            .header(reqwest::header::ACCEPT, "text/event-stream")
            .header("Cache-Control", "no-cache")
            .send()
            .await
            .map_err(|e| DutyBoardError::Transport(format!("connect {} failed: {e}", self.url)))?;

        if !resp.status().is_success() {
            return Err(DutyBoardError::Transport(format!(
                "push endpoint returned {}",
                resp.status()
            )));
        }

        self.backoff.reset();
        tracing::info!("📡 Push channel open");
        if tx.send(TransportEvent::Connection(ConnectionState::Connected)).await.is_err() {
            return Ok(StreamEnd::ReceiverGone);
        }

        let mut decoder = SseDecoder::new();
        let mut stream = resp.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| DutyBoardError::Transport(format!("stream read failed: {e}")))?;
            for frame in decoder.feed(&chunk)? {
                match PushEvent::from_frame(&frame) {
                    Ok(event) => {
                        if tx.send(TransportEvent::Push(event)).await.is_err() {
                            return Ok(StreamEnd::ReceiverGone);
                        }
                    }
                    Err(e) => tracing::warn!("⚠️ Skipping malformed '{}' frame: {e}", frame.event),
                }
            }
        }
        Ok(StreamEnd::Closed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    const BODY: &str = "HTTP/1.1 200 OK\r\nContent-Type: text/event-stream\r\nConnection: close\r\n\r\n\
        : ping\n\n\
        event: doctor_update\ndata: {\"doctor_id\": 5, \"date\": \"2026-10-17\"}\n\n\
        event: doctor_update\ndata: oops\n\n\
        event: closure_update\ndata: {}\n\n";

    #[tokio::test]
    async fn test_streams_events_then_reconnects() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            loop {
                let Ok((mut sock, _)) = listener.accept().await else { return };
                let mut buf = vec![0u8; 4096];
                let _ = sock.read(&mut buf).await;
                let _ = sock.write_all(BODY.as_bytes()).await;
                let _ = sock.shutdown().await;
            }
        });

        let backoff = Backoff::new(Duration::from_millis(20), Duration::from_millis(50), 2.0);
        let (tx, mut rx) = mpsc::channel(32);
        let handle = PushClient::new(format!("http://{addr}/events"), backoff).spawn(tx);

        let mut seen = Vec::new();
        while seen.len() < 6 {
            let ev = tokio::time::timeout(Duration::from_secs(5), rx.recv())
                .await
                .unwrap()
                .unwrap();
            seen.push(ev);
        }

        assert_eq!(seen[0], TransportEvent::Connection(ConnectionState::Connected));
        assert!(matches!(
            &seen[1],
            TransportEvent::Push(PushEvent::EntityUpdate { date: Some(_), .. })
        ));
        assert_eq!(seen[2], TransportEvent::Push(PushEvent::ClosureUpdate));
        assert_eq!(seen[3], TransportEvent::Connection(ConnectionState::Disconnected));
        assert_eq!(
            seen[4],
            TransportEvent::Connection(ConnectionState::Reconnecting {
                delay: Duration::from_millis(20),
                attempt: 1,
            })
        );
        // Second connection succeeds and the backoff is back at its floor.
        assert_eq!(seen[5], TransportEvent::Connection(ConnectionState::Connected));

        drop(rx);
        tokio::time::timeout(Duration::from_secs(5), handle).await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_refused_connection_backs_off() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let backoff = Backoff::new(Duration::from_millis(5), Duration::from_millis(8), 2.0);
        let (tx, mut rx) = mpsc::channel(32);
        let handle = PushClient::new(format!("http://{addr}/events"), backoff).spawn(tx);

        let mut delays = Vec::new();
        while delays.len() < 3 {
            let ev = tokio::time::timeout(Duration::from_secs(5), rx.recv()).await.unwrap().unwrap();
            if let TransportEvent::Connection(ConnectionState::Reconnecting { delay, .. }) = ev {
                delays.push(delay.as_millis());
            }
        }
        assert_eq!(delays, vec![5, 8, 8]);

        drop(rx);
        tokio::time::timeout(Duration::from_secs(5), handle).await.unwrap().unwrap();
    }
}
