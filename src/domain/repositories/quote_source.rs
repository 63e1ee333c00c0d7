use crate::domain::entities::quote::Quote;
use crate::domain::errors::SyncError;
use async_trait::async_trait;

/// Source of remote quote candidates for a sync cycle
///
/// Implementations must surface any fetch or parse failure as
/// `SyncError::RemoteUnavailable`; the reconciler itself never observes
/// transport errors.
#[async_trait]
pub trait QuoteSource: Send + Sync {
    async fn fetch_quotes(&self) -> Result<Vec<Quote>, SyncError>;
}
