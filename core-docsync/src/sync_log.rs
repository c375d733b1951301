//! # Sync Log
//!
//! Append-only audit trail of push and pull attempts. This is data, kept in
//! the `sync_logs` table; the matching `tracing` event is only a diagnostic
//! echo of it.

use crate::models::{DocumentId, LogStatus, NewSyncLogEntry, SyncLogEntry, SyncOperation};
use crate::repository::DocumentRepository;
use crate::Result;
use bridge_traits::Clock;
use std::sync::Arc;
use tracing::{info, warn};

pub struct SyncLog {
    repository: Arc<dyn DocumentRepository>,
    clock: Arc<dyn Clock>,
}

impl SyncLog {
    pub fn new(repository: Arc<dyn DocumentRepository>, clock: Arc<dyn Clock>) -> Self {
        Self { repository, clock }
    }

    /// Write exactly one entry for an attempt
    pub async fn record(
        &self,
        document_id: &DocumentId,
        operation: SyncOperation,
        status: LogStatus,
        message: impl Into<String>,
        user_id: &str,
    ) -> Result<SyncLogEntry> {
        let entry = NewSyncLogEntry {
            document_id: *document_id,
            operation,
            status,
            message: message.into(),
            user_id: user_id.to_string(),
            timestamp: self.clock.now(),
        };

        match status {
            LogStatus::Success => info!(
                document_id = %document_id,
                operation = %operation,
                message = %entry.message,
                "Sync attempt succeeded"
            ),
            LogStatus::Error => warn!(
                document_id = %document_id,
                operation = %operation,
                message = %entry.message,
                "Sync attempt failed"
            ),
        }

        self.repository.append_log(&entry).await
    }

    pub async fn entries(&self, document_id: &DocumentId) -> Result<Vec<SyncLogEntry>> {
        self.repository.logs(document_id).await
    }
}
