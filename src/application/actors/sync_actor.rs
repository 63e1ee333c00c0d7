//! Sync Actor
//!
//! Owns the periodic quote synchronization: fetch remote candidates, merge
//! them into the local collection, persist the result, and keep stats and an
//! audit trail. Messages are processed one at a time, so two sync cycles can
//! never run against the same collection concurrently; the scheduler uses a
//! bounded channel and drops a tick when a cycle is still pending.

use crate::domain::errors::SyncError;
use crate::domain::repositories::quote_source::QuoteSource;
use crate::domain::services::reconciler::reconcile;
use crate::persistence::models::SyncAuditEntry;
use crate::persistence::repository::{AppStateRepository, QuoteRepository, LAST_SYNC_KEY};
use crate::persistence::sync_audit::SyncAuditRepository;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// Channel capacity for sync actor messages
///
/// Deliberately small: a timer tick that arrives while a cycle is queued or
/// running is skipped instead of piling up.
pub const SYNC_CHANNEL_CAPACITY: usize = 1;

/// Messages that can be sent to the sync actor
#[derive(Debug)]
pub enum SyncMessage {
    /// Run one sync cycle now
    SyncNow {
        reply: mpsc::Sender<Result<SyncReport, SyncError>>,
    },

    /// Get cumulative sync statistics
    GetStatus { reply: mpsc::Sender<SyncStats> },

    /// Shutdown the actor
    Shutdown,
}

/// Outcome of one successful sync cycle
#[derive(Debug, Clone, Serialize)]
pub struct SyncReport {
    pub fetched: usize,
    pub added: usize,
    pub updated: usize,
    pub completed_at: DateTime<Utc>,
}

/// Cumulative sync statistics
#[derive(Debug, Clone, Default, Serialize)]
pub struct SyncStats {
    pub total_cycles: u64,
    pub successful_cycles: u64,
    pub failed_cycles: u64,
    pub last_report: Option<SyncReport>,
    pub last_error: Option<String>,
}

/// Sync Actor
pub struct SyncActor {
    source: Arc<dyn QuoteSource>,
    quotes: QuoteRepository,
    app_state: AppStateRepository,
    audit: Arc<dyn SyncAuditRepository>,
    stats: SyncStats,
}

impl SyncActor {
    pub fn new(
        source: Arc<dyn QuoteSource>,
        quotes: QuoteRepository,
        app_state: AppStateRepository,
        audit: Arc<dyn SyncAuditRepository>,
    ) -> Self {
        Self {
            source,
            quotes,
            app_state,
            audit,
            stats: SyncStats::default(),
        }
    }

    /// Spawn the sync actor and return its message sender
    pub fn spawn(
        source: Arc<dyn QuoteSource>,
        quotes: QuoteRepository,
        app_state: AppStateRepository,
        audit: Arc<dyn SyncAuditRepository>,
    ) -> mpsc::Sender<SyncMessage> {
        let (tx, rx) = mpsc::channel(SYNC_CHANNEL_CAPACITY);

        let actor = Self::new(source, quotes, app_state, audit);

        tokio::spawn(async move {
            actor.run(rx).await;
        });

        info!("SyncActor spawned");
        tx
    }

    /// Main actor loop
    async fn run(mut self, mut rx: mpsc::Receiver<SyncMessage>) {
        info!("SyncActor started");

        while let Some(msg) = rx.recv().await {
            match msg {
                SyncMessage::SyncNow { reply } => {
                    debug!("SyncActor received SyncNow");
                    let result = self.run_cycle().await;
                    self.update_stats(&result).await;
                    if let Err(e) = reply.send(result).await {
                        error!("Failed to send SyncNow reply: {:?}", e);
                    }
                }

                SyncMessage::GetStatus { reply } => {
                    debug!("SyncActor received GetStatus");
                    if let Err(e) = reply.send(self.stats.clone()).await {
                        error!("Failed to send GetStatus reply: {:?}", e);
                    }
                }

                SyncMessage::Shutdown => {
                    info!("SyncActor received shutdown signal");
                    break;
                }
            }
        }

        info!("SyncActor stopped");
    }

    /// Run one sync cycle
    ///
    /// A fetch failure aborts the cycle before the merge; local state is not
    /// touched in that case.
    async fn run_cycle(&self) -> Result<SyncReport, SyncError> {
        let remote = self.source.fetch_quotes().await?;
        let fetched = remote.len();

        let local = self
            .quotes
            .list_all()
            .await
            .map_err(|e| SyncError::Database(e.to_string()))?;

        let outcome = reconcile(local, remote);

        if outcome.added > 0 || outcome.updated > 0 {
            self.quotes
                .replace_all(&outcome.merged)
                .await
                .map_err(|e| SyncError::Database(e.to_string()))?;
        }

        let completed_at = Utc::now();
        self.app_state
            .set(LAST_SYNC_KEY, &completed_at.timestamp_millis().to_string())
            .await
            .map_err(|e| SyncError::Database(e.to_string()))?;

        let report = SyncReport {
            fetched,
            added: outcome.added,
            updated: outcome.updated,
            completed_at,
        };

        info!(
            fetched = report.fetched,
            added = report.added,
            updated = report.updated,
            "Sync cycle complete"
        );

        Ok(report)
    }

    /// Update statistics and write the audit row for one cycle
    async fn update_stats(&mut self, result: &Result<SyncReport, SyncError>) {
        self.stats.total_cycles += 1;

        let entry = match result {
            Ok(report) => {
                self.stats.successful_cycles += 1;
                self.stats.last_report = Some(report.clone());
                self.stats.last_error = None;
                SyncAuditEntry::success(
                    report.fetched,
                    report.added,
                    report.updated,
                    report.completed_at,
                )
            }
            Err(e) => {
                self.stats.failed_cycles += 1;
                self.stats.last_error = Some(e.to_string());
                warn!("Sync cycle failed: {}", e);
                SyncAuditEntry::failure(e.to_string(), Utc::now())
            }
        };

        // The audit trail is best-effort; a write failure must not fail the
        // cycle that already completed.
        if let Err(e) = self.audit.record_cycle(&entry).await {
            error!("Failed to record sync audit entry: {}", e);
        }
    }
}

/// Run one sync cycle through the actor and wait for its report
pub async fn request_sync(
    sync: &mpsc::Sender<SyncMessage>,
    timeout: std::time::Duration,
) -> Result<SyncReport, SyncError> {
    let (reply_tx, mut reply_rx) = mpsc::channel(1);
    sync.send(SyncMessage::SyncNow { reply: reply_tx }).await?;

    match tokio::time::timeout(timeout, reply_rx.recv()).await {
        Ok(Some(result)) => result,
        Ok(None) => Err(SyncError::NoResponse),
        Err(_) => Err(SyncError::Timeout),
    }
}

/// Fetch cumulative statistics from the actor
pub async fn request_status(sync: &mpsc::Sender<SyncMessage>) -> Result<SyncStats, SyncError> {
    let (reply_tx, mut reply_rx) = mpsc::channel(1);
    sync.send(SyncMessage::GetStatus { reply: reply_tx }).await?;
    reply_rx.recv().await.ok_or(SyncError::NoResponse)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::quote::Quote;
    use crate::persistence::init_database;
    use crate::persistence::sync_audit::SqliteSyncAuditRepository;
    use async_trait::async_trait;
    use std::time::Duration;

    struct StaticSource {
        quotes: Vec<Quote>,
        fail: bool,
    }

    #[async_trait]
    impl QuoteSource for StaticSource {
        async fn fetch_quotes(&self) -> Result<Vec<Quote>, SyncError> {
            if self.fail {
                Err(SyncError::RemoteUnavailable("connection refused".to_string()))
            } else {
                Ok(self.quotes.clone())
            }
        }
    }

    async fn spawn_with_source(fail: bool, quotes: Vec<Quote>) -> (mpsc::Sender<SyncMessage>, QuoteRepository) {
        let pool = init_database("sqlite::memory:").await.unwrap();
        let repo = QuoteRepository::new(pool.clone());
        let app_state = AppStateRepository::new(pool.clone());
        let audit = Arc::new(SqliteSyncAuditRepository::new(pool));
        let source = Arc::new(StaticSource { quotes, fail });
        let tx = SyncActor::spawn(source, repo.clone(), app_state, audit);
        (tx, repo)
    }

    #[tokio::test]
    async fn test_sync_now_adds_remote_quotes() {
        let remote = vec![Quote::from_remote("New one", "Life", 999).unwrap()];
        let (tx, repo) = spawn_with_source(false, remote).await;

        let report = request_sync(&tx, Duration::from_secs(5)).await.unwrap();
        assert_eq!(report.fetched, 1);
        assert_eq!(report.added, 1);
        assert_eq!(report.updated, 0);

        let stored = repo.list_all().await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].text, "New one");
    }

    #[tokio::test]
    async fn test_failed_fetch_leaves_local_untouched() {
        let (tx, repo) = spawn_with_source(true, vec![]).await;
        repo.insert(&Quote::new("A", "X").unwrap()).await.unwrap();

        let result = request_sync(&tx, Duration::from_secs(5)).await;
        assert!(matches!(result, Err(SyncError::RemoteUnavailable(_))));

        assert_eq!(repo.count().await.unwrap(), 1);

        let stats = request_status(&tx).await.unwrap();
        assert_eq!(stats.total_cycles, 1);
        assert_eq!(stats.failed_cycles, 1);
        assert!(stats.last_report.is_none());
        assert!(stats.last_error.is_some());
    }

    #[tokio::test]
    async fn test_stats_accumulate_over_cycles() {
        let remote = vec![Quote::from_remote("A", "X", 100).unwrap()];
        let (tx, _repo) = spawn_with_source(false, remote).await;

        let first = request_sync(&tx, Duration::from_secs(5)).await.unwrap();
        assert_eq!(first.added, 1);

        // Same remote again: nothing is newer, nothing new
        let second = request_sync(&tx, Duration::from_secs(5)).await.unwrap();
        assert_eq!(second.added, 0);
        assert_eq!(second.updated, 0);

        let stats = request_status(&tx).await.unwrap();
        assert_eq!(stats.total_cycles, 2);
        assert_eq!(stats.successful_cycles, 2);
        assert_eq!(stats.failed_cycles, 0);
        assert_eq!(stats.last_report.unwrap().added, 0);
    }
}
