//! HTTP client for the NeoWs feed endpoint.

use super::{flatten_feed, AsteroidSource, FeedRequest, DATE_FORMAT};
use crate::error::FeedError;
use crate::models::Asteroid;
use std::time::Duration;
use tracing::{debug, info};

/// Configuration for the feed client.
#[derive(Debug, Clone)]
pub struct FeedClientConfig {
    pub endpoint: String,
    pub api_key: String,
    pub timeout_seconds: u64,
}

/// Fetches asteroid rows from the NeoWs `feed` endpoint.
pub struct NeoFeedClient {
    config: FeedClientConfig,
    http_client: reqwest::Client,
}

impl NeoFeedClient {
    pub fn new(config: FeedClientConfig) -> Result<Self, FeedError> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;

        Ok(Self {
            config,
            http_client,
        })
    }

    /// Build the GET request for a window without sending it.
    pub fn build_request(&self, request: &FeedRequest) -> Result<reqwest::Request, FeedError> {
        let start = request.start_date.format(DATE_FORMAT).to_string();
        let end = request.end_date()?.format(DATE_FORMAT).to_string();

        let built = self
            .http_client
            .get(&self.config.endpoint)
            .query(&[
                ("start_date", start.as_str()),
                ("end_date", end.as_str()),
                ("api_key", self.config.api_key.as_str()),
            ])
            .build()?;

        Ok(built)
    }
}

impl AsteroidSource for NeoFeedClient {
    async fn fetch_asteroids(&self, request: &FeedRequest) -> Result<Vec<Asteroid>, FeedError> {
        let http_request = self.build_request(request)?;
        info!(
            "Fetching feed {} for {} (+{} days)",
            self.config.endpoint, request.start_date, request.span_days
        );

        let response = self.http_client.execute(http_request).await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(FeedError::Upstream {
                status: status.as_u16(),
                body,
            });
        }

        let body = response.text().await?;
        debug!("Feed response: {} bytes", body.len());

        flatten_feed(&body)
    }
}
