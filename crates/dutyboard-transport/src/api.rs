//! Pull side of the transport: day, window and closure fetches.

use async_trait::async_trait;
use chrono::NaiveDate;
use dutyboard_core::config::ServerConfig;
use dutyboard_core::error::{DutyBoardError, Result};
use dutyboard_core::types::{ClosuresPayload, DayPayload, WindowDay, WindowPayload};
use serde::de::DeserializeOwned;

/// Authoritative schedule reads.
#[async_trait]
pub trait ScheduleApi: Send + Sync {
    /// Exact records for one date.
    async fn fetch_day(&self, date: NaiveDate) -> Result<DayPayload>;

    /// A run of days starting at `start`, or at the server's notion of today when `None`.
    async fn fetch_window(&self, start: Option<NaiveDate>, days: usize) -> Result<Vec<WindowDay>>;

    /// The full closure registry.
    async fn fetch_closures(&self) -> Result<ClosuresPayload>;
}

/// [`ScheduleApi`] over HTTP.
pub struct HttpScheduleApi {
    client: reqwest::Client,
    server: ServerConfig,
}

impl HttpScheduleApi {
    pub fn new(server: ServerConfig) -> Self {
        Self::with_client(reqwest::Client::new(), server)
    }

    pub fn with_client(client: reqwest::Client, server: ServerConfig) -> Self {
        Self { client, server }
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> Result<T> {
        let url = self.server.url(path);
        let resp = self
            .client
            .get(&url)
            .query(query)
            .header("Cache-Control", "no-store")
            .send()
            .await
            .map_err(|e| DutyBoardError::Http(format!("GET {url} failed: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(DutyBoardError::Http(format!("GET {url} returned {status}: {text}")));
        }

        resp.json::<T>()
            .await
            .map_err(|e| DutyBoardError::Decode(format!("GET {url}: {e}")))
    }
}

#[async_trait]
impl ScheduleApi for HttpScheduleApi {
    async fn fetch_day(&self, date: NaiveDate) -> Result<DayPayload> {
        let query = [("date", date.format("%Y-%m-%d").to_string())];
        self.get_json(&self.server.day_path, &query).await
    }

    async fn fetch_window(&self, start: Option<NaiveDate>, days: usize) -> Result<Vec<WindowDay>> {
        let start = start
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| "auto".to_string());
        let query = [("start", start), ("days", days.to_string())];
        let payload: WindowPayload = self.get_json(&self.server.window_path, &query).await?;
        Ok(payload.into_days())
    }

    async fn fetch_closures(&self) -> Result<ClosuresPayload> {
        self.get_json(&self.server.closures_path, &[]).await
    }
}
