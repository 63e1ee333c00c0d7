//! Database Repositories
//!
//! Data access for the quote collection and the application state keys.

use super::models::QuoteRecord;
use super::{DatabaseError, DbPool};
use crate::domain::entities::quote::Quote;
use rand::seq::SliceRandom;
use tracing::{debug, error};
use uuid::Uuid;

/// Storage key for the last successful sync time (milliseconds since epoch)
pub const LAST_SYNC_KEY: &str = "lastSync";

/// Storage key for the user's selected category filter
pub const SELECTED_CATEGORY_KEY: &str = "selectedCategory";

/// Quote repository
#[derive(Clone)]
pub struct QuoteRepository {
    pool: DbPool,
}

impl QuoteRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// List the whole collection in display order
    pub async fn list_all(&self) -> Result<Vec<Quote>, DatabaseError> {
        let records = sqlx::query_as::<_, QuoteRecord>(
            "SELECT id, text, category, updated_at, position FROM quotes ORDER BY position",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            error!("Failed to list quotes: {}", e);
            DatabaseError::QueryError(format!("Failed to list quotes: {}", e))
        })?;

        Ok(records.into_iter().map(QuoteRecord::into_quote).collect())
    }

    /// List quotes in one category, in display order
    pub async fn list_by_category(&self, category: &str) -> Result<Vec<Quote>, DatabaseError> {
        let records = sqlx::query_as::<_, QuoteRecord>(
            r#"
            SELECT id, text, category, updated_at, position
            FROM quotes WHERE category = ?1 ORDER BY position
            "#,
        )
        .bind(category)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            error!("Failed to list quotes for category {}: {}", category, e);
            DatabaseError::QueryError(format!("Failed to list quotes: {}", e))
        })?;

        Ok(records.into_iter().map(QuoteRecord::into_quote).collect())
    }

    /// Append a quote to the end of the collection
    ///
    /// Assigns an id when the quote has none. Returns the stored quote.
    pub async fn insert(&self, quote: &Quote) -> Result<Quote, DatabaseError> {
        let id = quote
            .id
            .clone()
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        sqlx::query(
            r#"
            INSERT INTO quotes (id, text, category, updated_at, position)
            VALUES (?1, ?2, ?3, ?4, (SELECT COALESCE(MAX(position), -1) + 1 FROM quotes))
            "#,
        )
        .bind(&id)
        .bind(&quote.text)
        .bind(&quote.category)
        .bind(quote.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            error!("Failed to insert quote: {}", e);
            DatabaseError::QueryError(format!("Failed to insert quote: {}", e))
        })?;

        debug!("Inserted quote {} in category {}", id, quote.category);

        Ok(Quote {
            id: Some(id),
            ..quote.clone()
        })
    }

    /// Append several quotes, preserving their order
    pub async fn insert_many(&self, quotes: &[Quote]) -> Result<usize, DatabaseError> {
        for quote in quotes {
            self.insert(quote).await?;
        }
        Ok(quotes.len())
    }

    /// Replace the whole collection in a single transaction
    ///
    /// Used to persist a merge outcome; positions are rewritten to match the
    /// order of `quotes`.
    pub async fn replace_all(&self, quotes: &[Quote]) -> Result<(), DatabaseError> {
        let mut tx = self.pool.begin().await.map_err(|e| {
            DatabaseError::QueryError(format!("Failed to begin transaction: {}", e))
        })?;

        sqlx::query("DELETE FROM quotes")
            .execute(&mut *tx)
            .await
            .map_err(|e| DatabaseError::QueryError(format!("Failed to clear quotes: {}", e)))?;

        for (position, quote) in quotes.iter().enumerate() {
            let id = quote
                .id
                .clone()
                .unwrap_or_else(|| Uuid::new_v4().to_string());

            sqlx::query(
                r#"
                INSERT INTO quotes (id, text, category, updated_at, position)
                VALUES (?1, ?2, ?3, ?4, ?5)
                "#,
            )
            .bind(&id)
            .bind(&quote.text)
            .bind(&quote.category)
            .bind(quote.updated_at)
            .bind(position as i64)
            .execute(&mut *tx)
            .await
            .map_err(|e| DatabaseError::QueryError(format!("Failed to write quote: {}", e)))?;
        }

        tx.commit().await.map_err(|e| {
            DatabaseError::QueryError(format!("Failed to commit transaction: {}", e))
        })?;

        debug!("Replaced quote collection with {} entries", quotes.len());
        Ok(())
    }

    /// Distinct categories, sorted
    pub async fn categories(&self) -> Result<Vec<String>, DatabaseError> {
        sqlx::query_scalar("SELECT DISTINCT category FROM quotes ORDER BY category")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                error!("Failed to list categories: {}", e);
                DatabaseError::QueryError(format!("Failed to list categories: {}", e))
            })
    }

    /// Pick a random quote, optionally within one category
    ///
    /// `None` and `"all"` both mean the whole collection.
    pub async fn random(&self, category: Option<&str>) -> Result<Option<Quote>, DatabaseError> {
        let candidates = match category {
            Some(category) if category != "all" => self.list_by_category(category).await?,
            _ => self.list_all().await?,
        };

        Ok(candidates.choose(&mut rand::thread_rng()).cloned())
    }

    pub async fn count(&self) -> Result<i64, DatabaseError> {
        sqlx::query_scalar("SELECT COUNT(*) FROM quotes")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| DatabaseError::QueryError(format!("Failed to count quotes: {}", e)))
    }

    /// Insert the starter quotes into an empty collection
    ///
    /// Seed entries carry no timestamp, so the first sync cycle may overwrite
    /// them with remote versions.
    pub async fn seed_defaults(&self) -> Result<usize, DatabaseError> {
        if self.count().await? > 0 {
            return Ok(0);
        }

        let defaults = [
            ("Be yourself; everyone else is already taken.", "Inspiration"),
            ("The journey of a thousand miles begins with one step.", "Motivation"),
            ("Life is what happens when you're busy making other plans.", "Life"),
        ];

        for (text, category) in defaults {
            let quote = Quote {
                id: Some(Uuid::new_v4().to_string()),
                text: text.to_string(),
                category: category.to_string(),
                updated_at: None,
            };
            self.insert(&quote).await?;
        }

        debug!("Seeded {} default quotes", defaults.len());
        Ok(defaults.len())
    }
}

/// Application state repository for fixed key/value pairs
#[derive(Clone)]
pub struct AppStateRepository {
    pool: DbPool,
}

impl AppStateRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn get(&self, key: &str) -> Result<Option<String>, DatabaseError> {
        sqlx::query_scalar("SELECT value FROM app_state WHERE key = ?1")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                error!("Failed to read app state {}: {}", key, e);
                DatabaseError::QueryError(format!("Failed to read app state: {}", e))
            })
    }

    pub async fn set(&self, key: &str, value: &str) -> Result<(), DatabaseError> {
        sqlx::query(
            r#"
            INSERT INTO app_state (key, value, updated_at)
            VALUES (?1, ?2, CURRENT_TIMESTAMP)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
            "#,
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            error!("Failed to write app state {}: {}", key, e);
            DatabaseError::QueryError(format!("Failed to write app state: {}", e))
        })?;

        Ok(())
    }
}
