//! Remote Quote Client
//!
//! Fetches a JSONPlaceholder-style post list over HTTP and maps each record
//! into the quote shape: title becomes the text, the first word of the body
//! becomes the category, and the fetch time becomes the timestamp.

use crate::domain::entities::quote::Quote;
use crate::domain::errors::SyncError;
use crate::domain::repositories::quote_source::QuoteSource;
use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Category used when a remote record has an empty body
const FALLBACK_CATEGORY: &str = "General";

/// External post record as served by the mock endpoint
#[derive(Debug, Deserialize)]
struct RemotePost {
    title: String,
    #[serde(default)]
    body: String,
}

pub struct RemoteQuoteClient {
    client: Client,
    endpoint: Url,
    fetch_limit: u32,
}

impl RemoteQuoteClient {
    pub fn new(endpoint: Url, fetch_limit: u32, timeout: Duration) -> Result<Self, SyncError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SyncError::RemoteUnavailable(e.to_string()))?;

        Ok(Self {
            client,
            endpoint,
            fetch_limit,
        })
    }
}

#[async_trait]
impl QuoteSource for RemoteQuoteClient {
    async fn fetch_quotes(&self) -> Result<Vec<Quote>, SyncError> {
        let response = self
            .client
            .get(self.endpoint.clone())
            .query(&[("_limit", self.fetch_limit)])
            .send()
            .await
            .map_err(|e| SyncError::RemoteUnavailable(e.to_string()))?
            .error_for_status()
            .map_err(|e| SyncError::RemoteUnavailable(e.to_string()))?;

        let posts: Vec<RemotePost> = response
            .json()
            .await
            .map_err(|e| SyncError::RemoteUnavailable(e.to_string()))?;

        let fetched_at = Utc::now().timestamp_millis();
        let quotes: Vec<Quote> = posts
            .iter()
            .filter_map(|post| map_post(post, fetched_at))
            .collect();

        debug!(
            fetched = posts.len(),
            mapped = quotes.len(),
            "fetched remote quote candidates"
        );

        Ok(quotes)
    }
}

/// Map an external post into the quote shape
///
/// Records with an empty title cannot become quotes and are skipped.
fn map_post(post: &RemotePost, fetched_at: i64) -> Option<Quote> {
    let category = post
        .body
        .split_whitespace()
        .next()
        .unwrap_or(FALLBACK_CATEGORY);

    Quote::from_remote(&post.title, category, fetched_at).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_post_title_and_first_body_word() {
        let post = RemotePost {
            title: "Be yourself".to_string(),
            body: "wisdom for the ages".to_string(),
        };
        let quote = map_post(&post, 1234).unwrap();
        assert_eq!(quote.text, "Be yourself");
        assert_eq!(quote.category, "wisdom");
        assert_eq!(quote.updated_at, Some(1234));
        assert_eq!(quote.id, None);
    }

    #[test]
    fn test_map_post_empty_body_falls_back() {
        let post = RemotePost {
            title: "Be yourself".to_string(),
            body: String::new(),
        };
        let quote = map_post(&post, 1).unwrap();
        assert_eq!(quote.category, FALLBACK_CATEGORY);
    }

    #[test]
    fn test_map_post_blank_title_is_skipped() {
        let post = RemotePost {
            title: "   ".to_string(),
            body: "wisdom".to_string(),
        };
        assert!(map_post(&post, 1).is_none());
    }

    #[test]
    fn test_remote_post_deserializes_without_body() {
        let post: RemotePost = serde_json::from_str(r#"{"title": "A"}"#).unwrap();
        assert_eq!(post.title, "A");
        assert_eq!(post.body, "");
    }
}
