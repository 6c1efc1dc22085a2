///! Feed access boundary
///!
///! Connectors only see the [`FeedClient`] trait. The service uses the
///! reqwest-backed [`HttpFeedClient`]; replays and tests use the in-memory
///! [`MemoryFeedClient`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, header::LAST_MODIFIED};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use crate::dates::parse_http_date;
use crate::error::{EngineError, Result};

/// Result of a cheap "has this file changed" probe
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Freshness {
    /// `false` only when the server proved the file is not newer
    pub is_newer: bool,
    pub modified_at: Option<DateTime<Utc>>,
}

impl Freshness {
    /// Probe result when nothing is known; callers download anyway
    pub fn unknown() -> Self {
        Self {
            is_newer: true,
            modified_at: None,
        }
    }

    pub fn from_modified(modified_at: Option<DateTime<Utc>>, last_known: Option<DateTime<Utc>>) -> Self {
        let is_newer = match (modified_at, last_known) {
            (Some(modified), Some(known)) => modified > known,
            _ => true,
        };
        Self {
            is_newer,
            modified_at,
        }
    }
}

#[async_trait]
pub trait FeedClient: Send + Sync {
    /// Download the body of `url` as text
    async fn fetch_text(&self, url: &str) -> Result<String>;

    /// Compare the file's modification time against `last_known`
    async fn check_freshness(
        &self,
        url: &str,
        last_known: Option<DateTime<Utc>>,
    ) -> Result<Freshness>;
}

/// HTTP client with a bounded per-request timeout
pub struct HttpFeedClient {
    client: Client,
}

impl HttpFeedClient {
    pub fn new(timeout: Duration, user_agent: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .map_err(|e| EngineError::fetch("<client>", format!("failed to build HTTP client: {}", e)))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl FeedClient for HttpFeedClient {
    async fn fetch_text(&self, url: &str) -> Result<String> {
        tracing::debug!("GET {}", url);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| EngineError::fetch(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(EngineError::fetch(url, format!("unexpected status {}", status)));
        }

        response.text().await.map_err(|e| EngineError::fetch(url, e))
    }

    async fn check_freshness(
        &self,
        url: &str,
        last_known: Option<DateTime<Utc>>,
    ) -> Result<Freshness> {
        tracing::debug!("HEAD {}", url);

        let response = self
            .client
            .head(url)
            .send()
            .await
            .map_err(|e| EngineError::fetch(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(EngineError::fetch(url, format!("unexpected status {}", status)));
        }

        let modified_at = response
            .headers()
            .get(LAST_MODIFIED)
            .and_then(|v| v.to_str().ok())
            .and_then(parse_http_date);

        Ok(Freshness::from_modified(modified_at, last_known))
    }
}

#[derive(Debug, Clone)]
struct MemoryFeed {
    body: String,
    modified_at: Option<DateTime<Utc>>,
}

/// Serves fixed payloads keyed by URL.
#[derive(Debug, Default)]
pub struct MemoryFeedClient {
    feeds: Mutex<HashMap<String, MemoryFeed>>,
}

impl MemoryFeedClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the payload served for `url`
    pub fn set(&self, url: &str, body: impl Into<String>, modified_at: Option<DateTime<Utc>>) {
        let feed = MemoryFeed {
            body: body.into(),
            modified_at,
        };
        if let Ok(mut feeds) = self.feeds.lock() {
            feeds.insert(url.to_string(), feed);
        }
    }

    /// Stop serving `url`; later requests fail like an unreachable host
    pub fn remove(&self, url: &str) {
        if let Ok(mut feeds) = self.feeds.lock() {
            feeds.remove(url);
        }
    }

    fn get(&self, url: &str) -> Result<MemoryFeed> {
        let feeds = self
            .feeds
            .lock()
            .map_err(|_| EngineError::fetch(url, "feed table poisoned"))?;
        feeds
            .get(url)
            .cloned()
            .ok_or_else(|| EngineError::fetch(url, "no payload registered"))
    }
}

#[async_trait]
impl FeedClient for MemoryFeedClient {
    async fn fetch_text(&self, url: &str) -> Result<String> {
        Ok(self.get(url)?.body)
    }

    async fn check_freshness(
        &self,
        url: &str,
        last_known: Option<DateTime<Utc>>,
    ) -> Result<Freshness> {
        let feed = self.get(url)?;
        Ok(Freshness::from_modified(feed.modified_at, last_known))
    }
}
