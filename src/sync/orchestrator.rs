//! Sync orchestrator — drives the full pipeline for one mailbox
//! connection.
//!
//! Flow: load credentials → list recent threads → per thread, fetch and
//! reconcile (failures isolated) → stamp the connection → recency pass.
//! Thread- and message-level failures are logged and skipped; only
//! missing credentials, a failed listing, or the run deadline fail the
//! whole run, and those are recorded on the connection row.

use std::sync::Arc;

use chrono::Utc;
use tracing::{error, info, warn};

use crate::config::SyncConfig;
use crate::error::{Error, SyncError};
use crate::mail::normalize::normalize_message;
use crate::provider::{MailProvider, MailboxCredentials};
use crate::store::Database;
use crate::sync::recency;
use crate::sync::reconcile::reconcile_thread;

/// Aggregate result of one sync run. Callers get this or one
/// consolidated error, never per-item outcomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncOutcome {
    /// Threads fetched and reconciled without a unit-level failure.
    pub threads_synced: usize,
}

/// Drives mailbox syncs against one provider and one store.
pub struct SyncEngine {
    db: Arc<dyn Database>,
    provider: Arc<dyn MailProvider>,
    config: SyncConfig,
}

impl SyncEngine {
    pub fn new(db: Arc<dyn Database>, provider: Arc<dyn MailProvider>, config: SyncConfig) -> Self {
        Self {
            db,
            provider,
            config,
        }
    }

    /// Sync one connection end to end, bounded by the configured
    /// deadline. Fatal failures are recorded on the connection row before
    /// they propagate.
    pub async fn sync_connection(&self, connection_id: &str) -> Result<SyncOutcome, Error> {
        let connection = self
            .db
            .get_connection(connection_id)
            .await
            .map_err(SyncError::Database)?
            .ok_or_else(|| SyncError::ConnectionNotFound(connection_id.to_string()))?;

        if !connection.has_access_token() {
            let err = SyncError::MissingCredentials {
                id: connection_id.to_string(),
                reason: "empty access token".to_string(),
            };
            self.record_failure(connection_id, &err).await;
            return Err(err.into());
        }

        let creds = MailboxCredentials {
            access_token: connection.access_token.clone(),
            mailbox_email: connection.mailbox_email.clone(),
        };

        let deadline = self.config.run_timeout();
        let run = tokio::time::timeout(
            deadline,
            self.run_sync(&connection.user_id, connection_id, &creds),
        );

        let outcome = match run.await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(err)) => {
                self.record_failure(connection_id, &err).await;
                return Err(err.into());
            }
            Err(_) => {
                let err = SyncError::Timeout(deadline);
                self.record_failure(connection_id, &err).await;
                return Err(err.into());
            }
        };

        info!(
            connection_id = %connection_id,
            threads = outcome.threads_synced,
            "Sync complete"
        );
        Ok(outcome)
    }

    async fn run_sync(
        &self,
        user_id: &str,
        connection_id: &str,
        creds: &MailboxCredentials,
    ) -> Result<SyncOutcome, SyncError> {
        let stubs = self
            .provider
            .list_threads(creds, self.config.page_size)
            .await?;
        info!(
            connection_id = %connection_id,
            listed = stubs.len(),
            "Listed threads"
        );

        let mut threads_synced = 0;
        for stub in &stubs {
            // Per-thread isolation: one bad thread never aborts the run
            match self.sync_thread(user_id, creds, &stub.id).await {
                Ok(true) => threads_synced += 1,
                Ok(false) => {}
                Err(e) => {
                    warn!(provider_thread_id = %stub.id, "Thread sync failed: {e}");
                }
            }
        }

        self.db
            .mark_connection_synced(connection_id, Utc::now())
            .await?;

        // Recency recompute rides along but never fails the sync
        if let Err(e) = recency::refresh_contact_recency(&self.db, user_id, Utc::now()).await {
            error!(user_id = %user_id, "Contact recency pass failed: {e}");
        }

        Ok(SyncOutcome { threads_synced })
    }

    /// Fetch and reconcile one thread. Returns whether it counted toward
    /// the run's total (threads with no messages do not).
    async fn sync_thread(
        &self,
        user_id: &str,
        creds: &MailboxCredentials,
        provider_thread_id: &str,
    ) -> Result<bool, SyncError> {
        let thread = self.provider.get_thread(creds, provider_thread_id).await?;

        if thread.messages.is_empty() {
            warn!(provider_thread_id = %provider_thread_id, "Thread has no messages, skipping");
            return Ok(false);
        }

        let normalized: Vec<_> = thread
            .messages
            .iter()
            .map(|m| normalize_message(m, &creds.mailbox_email))
            .collect();

        let outcome = reconcile_thread(&self.db, user_id, provider_thread_id, &normalized).await?;
        info!(
            provider_thread_id = %provider_thread_id,
            thread_id = %outcome.thread_id,
            inserted = outcome.inserted,
            "Thread reconciled"
        );
        Ok(true)
    }

    async fn record_failure(&self, connection_id: &str, err: &SyncError) {
        if let Err(record_err) = self
            .db
            .record_connection_error(connection_id, &err.to_string())
            .await
        {
            error!(
                connection_id = %connection_id,
                "Failed to record sync error: {record_err}"
            );
        }
    }
}
