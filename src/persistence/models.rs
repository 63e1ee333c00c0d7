//! Database record types

use crate::domain::entities::quote::Quote;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// A quote row as stored in the database
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct QuoteRecord {
    pub id: String,
    pub text: String,
    pub category: String,
    pub updated_at: Option<i64>,
    pub position: i64,
}

impl QuoteRecord {
    pub fn into_quote(self) -> Quote {
        Quote {
            id: Some(self.id),
            text: self.text,
            category: self.category,
            updated_at: self.updated_at,
        }
    }
}

/// One recorded sync cycle
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct SyncAuditEntry {
    pub fetched: i64,
    pub added: i64,
    pub updated: i64,
    pub status: String,
    pub error: Option<String>,
    pub run_at: DateTime<Utc>,
}

impl SyncAuditEntry {
    pub fn success(fetched: usize, added: usize, updated: usize, run_at: DateTime<Utc>) -> Self {
        Self {
            fetched: fetched as i64,
            added: added as i64,
            updated: updated as i64,
            status: "ok".to_string(),
            error: None,
            run_at,
        }
    }

    pub fn failure(error: String, run_at: DateTime<Utc>) -> Self {
        Self {
            fetched: 0,
            added: 0,
            updated: 0,
            status: "failed".to_string(),
            error: Some(error),
            run_at,
        }
    }
}
