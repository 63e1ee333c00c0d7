use crate::domain::errors::QuoteError;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A single quote record
///
/// `id` is a stable identifier assigned when a quote is created locally or
/// imported. Quotes mapped from the remote feed carry no id; for those, the
/// trimmed text acts as the matching key during reconciliation.
///
/// `updated_at` is milliseconds since epoch. An absent timestamp is treated
/// as older than any present one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quote {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub text: String,
    pub category: String,
    #[serde(
        rename = "updatedAt",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub updated_at: Option<i64>,
}

impl Quote {
    /// Create a quote from local user input
    ///
    /// Assigns a fresh id and stamps the current time.
    pub fn new(text: &str, category: &str) -> Result<Self, QuoteError> {
        Self::from_parts(
            Some(Uuid::new_v4().to_string()),
            text,
            category,
            Some(Utc::now().timestamp_millis()),
        )
    }

    /// Create a quote mapped from a remote record
    ///
    /// Remote records have no stable id in our namespace; `fetched_at` is the
    /// time of mapping, not the remote record's own revision time.
    pub fn from_remote(text: &str, category: &str, fetched_at: i64) -> Result<Self, QuoteError> {
        Self::from_parts(None, text, category, Some(fetched_at))
    }

    /// Validate and assemble a quote from raw parts
    ///
    /// Both `text` and `category` are trimmed and must be non-empty.
    pub fn from_parts(
        id: Option<String>,
        text: &str,
        category: &str,
        updated_at: Option<i64>,
    ) -> Result<Self, QuoteError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(QuoteError::EmptyText);
        }

        let category = category.trim();
        if category.is_empty() {
            return Err(QuoteError::EmptyCategory);
        }

        Ok(Self {
            id,
            text: text.to_string(),
            category: category.to_string(),
            updated_at,
        })
    }
}
