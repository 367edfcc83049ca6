//! Supabase store using the PostgREST HTTP API.
//!
//! ## Tables read
//!
//! - `ingestion_cycles`: latest row by `started_at`
//! - `raw_buffer`: exact row count only (`HEAD` + `Prefer: count=exact`)
//! - `active_pins`: all rows, or one row with embedded `pin_metric_history`
//!
//! ## Example
//!
//! ```rust,no_run
//! use eltwatch::{StoreReader, SupabaseStore};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = SupabaseStore::builder()
//!         .endpoint("https://project.supabase.co")
//!         .api_key("anon-key")
//!         .build()?;
//!
//!     let cycle = store.fetch_latest_cycle().await?;
//!     println!("latest cycle: {:?}", cycle.map(|c| c.status));
//!     Ok(())
//! }
//! ```

use std::time::Duration;

use async_trait::async_trait;
use eltwatch_types::{ActivePin, IngestionCycle, PinMetricHistory};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Deserialize;

use super::{PinWithHistory, StoreReader};
use crate::error::FetchError;

/// History columns selected when embedding `pin_metric_history`.
///
/// `delta_outbound_clicks` is not part of the store schema.
const HISTORY_COLUMNS: &str = "id,pin_id,cycle_id,recorded_at,impressions,saves,outbound_clicks,delta_impressions,delta_saves";

/// Store backed by a Supabase project.
#[derive(Debug, Clone)]
pub struct SupabaseStore {
    client: Client,
    endpoint: String,
    api_key: String,
    description: String,
}

impl SupabaseStore {
    /// Create a new builder for configuring the store.
    pub fn builder() -> SupabaseStoreBuilder {
        SupabaseStoreBuilder::default()
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.endpoint, table)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
    }

    async fn get_rows<T>(&self, table: &str, query: &[(&str, &str)]) -> Result<Vec<T>, FetchError>
    where
        T: for<'de> Deserialize<'de>,
    {
        let response = self
            .authorized(self.client.get(self.table_url(table)))
            .query(query)
            .send()
            .await?;

        let response = check_status(response)?;

        response
            .json()
            .await
            .map_err(|e| FetchError::Parse(e.to_string()))
    }
}

fn check_status(response: Response) -> Result<Response, FetchError> {
    let status = response.status();

    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return Err(FetchError::Auth("Invalid API key".to_string()));
    }

    if !status.is_success() {
        return Err(FetchError::Http(format!("API returned status {}", status)));
    }

    Ok(response)
}

/// Parse the total from a PostgREST `Content-Range` header ("0-24/842", "*/0").
fn parse_content_range(value: &str) -> Result<u64, FetchError> {
    let total = value
        .rsplit_once('/')
        .map(|(_, total)| total.trim())
        .ok_or_else(|| FetchError::Parse(format!("Malformed Content-Range: {}", value)))?;

    total
        .parse()
        .map_err(|_| FetchError::Parse(format!("Content-Range has no exact count: {}", value)))
}

/// Pin row with its embedded history, as returned by the embedded select.
#[derive(Debug, Deserialize)]
struct PinWithHistoryRow {
    #[serde(flatten)]
    pin: ActivePin,
    #[serde(default)]
    pin_metric_history: Option<Vec<PinMetricHistory>>,
}

#[async_trait]
impl StoreReader for SupabaseStore {
    async fn fetch_latest_cycle(&self) -> Result<Option<IngestionCycle>, FetchError> {
        let rows: Vec<IngestionCycle> = self
            .get_rows(
                "ingestion_cycles",
                &[("select", "*"), ("order", "started_at.desc"), ("limit", "1")],
            )
            .await?;

        Ok(rows.into_iter().next())
    }

    async fn fetch_buffer_count(&self) -> Result<u64, FetchError> {
        let response = self
            .authorized(self.client.head(self.table_url("raw_buffer")))
            .query(&[("select", "*")])
            .header("Prefer", "count=exact")
            .send()
            .await?;

        let response = check_status(response)?;

        let range = response
            .headers()
            .get(reqwest::header::CONTENT_RANGE)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| FetchError::Parse("Missing Content-Range header".to_string()))?;

        parse_content_range(range)
    }

    async fn fetch_pin_with_history(
        &self,
        pin_id: &str,
    ) -> Result<Option<PinWithHistory>, FetchError> {
        let select = format!("*,pin_metric_history({})", HISTORY_COLUMNS);
        let pin_filter = format!("eq.{}", pin_id);

        let rows: Vec<PinWithHistoryRow> = self
            .get_rows(
                "active_pins",
                &[
                    ("select", select.as_str()),
                    ("pin_id", pin_filter.as_str()),
                    ("pin_metric_history.order", "recorded_at.desc"),
                ],
            )
            .await?;

        Ok(rows
            .into_iter()
            .next()
            .map(|row| (row.pin, row.pin_metric_history.unwrap_or_default())))
    }

    async fn fetch_active_pins(&self) -> Result<Vec<ActivePin>, FetchError> {
        self.get_rows("active_pins", &[("select", "*")]).await
    }

    fn description(&self) -> &str {
        &self.description
    }
}

/// Builder for SupabaseStore.
#[derive(Debug, Default)]
pub struct SupabaseStoreBuilder {
    endpoint: Option<String>,
    api_key: Option<String>,
    timeout: Option<Duration>,
}

impl SupabaseStoreBuilder {
    /// Set the project URL (e.g., "https://project.supabase.co").
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Set the API key sent as `apikey` and bearer token.
    pub fn api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Set the request timeout (default: 10 seconds).
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Build the store.
    pub fn build(self) -> Result<SupabaseStore, FetchError> {
        let timeout = self.timeout.unwrap_or(Duration::from_secs(10));

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| FetchError::Connection(e.to_string()))?;

        let endpoint = self
            .endpoint
            .unwrap_or_else(|| "http://localhost:54321".to_string())
            .trim_end_matches('/')
            .to_string();

        Ok(SupabaseStore {
            client,
            description: format!("supabase: {}", endpoint),
            endpoint,
            api_key: self.api_key.unwrap_or_default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_defaults() {
        let store = SupabaseStore::builder().build().unwrap();
        assert_eq!(store.endpoint, "http://localhost:54321");
        assert_eq!(store.api_key, "");
        assert_eq!(store.description(), "supabase: http://localhost:54321");
    }

    #[test]
    fn test_builder_custom() {
        let store = SupabaseStore::builder()
            .endpoint("https://placeholder-project.supabase.co/")
            .api_key("placeholder-key")
            .timeout(Duration::from_secs(3))
            .build()
            .unwrap();

        assert_eq!(store.endpoint, "https://placeholder-project.supabase.co");
        assert_eq!(store.api_key, "placeholder-key");
        assert_eq!(
            store.table_url("active_pins"),
            "https://placeholder-project.supabase.co/rest/v1/active_pins"
        );
    }

    #[test]
    fn test_parse_content_range() {
        assert_eq!(parse_content_range("0-24/842").unwrap(), 842);
        assert_eq!(parse_content_range("*/0").unwrap(), 0);
        assert!(matches!(
            parse_content_range("0-24/*"),
            Err(FetchError::Parse(_))
        ));
        assert!(matches!(
            parse_content_range("garbage"),
            Err(FetchError::Parse(_))
        ));
    }

    #[test]
    fn test_embedded_history_row() {
        let json = r#"[{
            "pin_id": "1029384756",
            "title": "Loft",
            "image_url": "",
            "current_status": "active",
            "last_synced_at": "2024-05-01T10:00:00Z",
            "created_at": "2024-04-01T10:00:00Z",
            "pin_metric_history": null
        }]"#;

        let rows: Vec<PinWithHistoryRow> = serde_json::from_str(json).unwrap();
        assert_eq!(rows[0].pin.pin_id, "1029384756");
        assert!(rows[0].pin_metric_history.is_none());
    }
}
