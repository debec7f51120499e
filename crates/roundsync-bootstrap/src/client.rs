//! HTTP client for the backend's bootstrap endpoints.

use crate::error::{BootstrapError, BootstrapResult};
use crate::types::{ApiEnvelope, CurrentRoundBets, RoundHistoryPage};
use reqwest::Client;
use roundsync_core::Symbol;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;

/// Client for `/bets/round/current` and `/rounds/history`.
#[derive(Debug, Clone)]
pub struct BootstrapClient {
    client: Client,
    /// API base URL without a trailing slash (e.g., "http://localhost:8000/api").
    base_url: String,
}

impl BootstrapClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> BootstrapResult<Self> {
        let client = Client::builder().timeout(timeout).build().map_err(|e| {
            BootstrapError::HttpClient(format!("Failed to create HTTP client: {e}"))
        })?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Bets placed on the symbol's current round.
    ///
    /// A `round_id` of `0` in the result means the backend has no active round.
    pub async fn fetch_current_bets(&self, symbol: &Symbol) -> BootstrapResult<CurrentRoundBets> {
        self.get_json("/bets/round/current", &[("symbol", symbol.as_str().to_string())])
            .await
    }

    /// One page of settled rounds, newest first. `page` is 1-based.
    pub async fn fetch_round_history(
        &self,
        symbol: &Symbol,
        page: u32,
        limit: u32,
    ) -> BootstrapResult<RoundHistoryPage> {
        self.get_json(
            "/rounds/history",
            &[
                ("symbol", symbol.as_str().to_string()),
                ("page", page.to_string()),
                ("limit", limit.to_string()),
            ],
        )
        .await
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> BootstrapResult<T> {
        let url = format!("{}{path}", self.base_url);
        debug!(%url, ?query, "Bootstrap request");

        let response = self
            .client
            .get(&url)
            .query(query)
            .send()
            .await
            .map_err(|e| BootstrapError::HttpClient(format!("HTTP request failed: {e}")))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| BootstrapError::HttpClient(format!("Failed to read response: {e}")))?;

        if !status.is_success() {
            return Err(BootstrapError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let envelope: ApiEnvelope<T> = serde_json::from_str(&body)?;
        envelope.into_result()
    }
}
