//! Sync Audit Repository
//!
//! Persists one row per sync cycle so the outcome of past reconciliations
//! can be inspected after the fact.

use super::models::SyncAuditEntry;
use super::{DatabaseError, DbPool};
use async_trait::async_trait;
use tracing::error;

/// Sync audit repository trait
#[async_trait]
pub trait SyncAuditRepository: Send + Sync {
    async fn record_cycle(&self, entry: &SyncAuditEntry) -> Result<(), DatabaseError>;
    async fn last_cycle(&self) -> Result<Option<SyncAuditEntry>, DatabaseError>;
    async fn recent_cycles(&self, limit: u32) -> Result<Vec<SyncAuditEntry>, DatabaseError>;
}

/// SQLite implementation of the sync audit repository
pub struct SqliteSyncAuditRepository {
    pool: DbPool,
}

impl SqliteSyncAuditRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SyncAuditRepository for SqliteSyncAuditRepository {
    async fn record_cycle(&self, entry: &SyncAuditEntry) -> Result<(), DatabaseError> {
        sqlx::query(
            r#"
            INSERT INTO sync_audit (fetched, added, updated, status, error, run_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(entry.fetched)
        .bind(entry.added)
        .bind(entry.updated)
        .bind(&entry.status)
        .bind(&entry.error)
        .bind(entry.run_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            error!("Failed to record sync cycle: {}", e);
            DatabaseError::QueryError(format!("Failed to record sync cycle: {}", e))
        })?;

        Ok(())
    }

    async fn last_cycle(&self) -> Result<Option<SyncAuditEntry>, DatabaseError> {
        sqlx::query_as::<_, SyncAuditEntry>(
            r#"
            SELECT fetched, added, updated, status, error, run_at
            FROM sync_audit ORDER BY id DESC LIMIT 1
            "#,
        )
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DatabaseError::QueryError(format!("Failed to read last sync cycle: {}", e)))
    }

    async fn recent_cycles(&self, limit: u32) -> Result<Vec<SyncAuditEntry>, DatabaseError> {
        sqlx::query_as::<_, SyncAuditEntry>(
            r#"
            SELECT fetched, added, updated, status, error, run_at
            FROM sync_audit ORDER BY id DESC LIMIT ?1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DatabaseError::QueryError(format!("Failed to read sync history: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::init_database;
    use chrono::Utc;

    #[tokio::test]
    async fn test_record_and_read_back() {
        let pool = init_database("sqlite::memory:").await.unwrap();
        let audit = SqliteSyncAuditRepository::new(pool);

        assert!(audit.last_cycle().await.unwrap().is_none());

        audit
            .record_cycle(&SyncAuditEntry::success(10, 3, 1, Utc::now()))
            .await
            .unwrap();
        audit
            .record_cycle(&SyncAuditEntry::failure("timeout".to_string(), Utc::now()))
            .await
            .unwrap();

        let last = audit.last_cycle().await.unwrap().unwrap();
        assert_eq!(last.status, "failed");
        assert_eq!(last.error.as_deref(), Some("timeout"));

        let history = audit.recent_cycles(10).await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].status, "failed");
        assert_eq!(history[1].status, "ok");
        assert_eq!(history[1].added, 3);
    }

    #[tokio::test]
    async fn test_history_limit() {
        let pool = init_database("sqlite::memory:").await.unwrap();
        let audit = SqliteSyncAuditRepository::new(pool);

        for i in 0..5 {
            audit
                .record_cycle(&SyncAuditEntry::success(i, 0, 0, Utc::now()))
                .await
                .unwrap();
        }

        let history = audit.recent_cycles(3).await.unwrap();
        assert_eq!(history.len(), 3);
    }
}
