//! Unified `Database` trait — single async interface for all persistence.
//!
//! One method per query the sync pipeline, recency pass, and action queue
//! actually run. Backends implement these; everything else holds an
//! `Arc<dyn Database>`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::DatabaseError;
use crate::store::model::{Connection, EmailThread, Lead, StoredMessage};

/// Backend-agnostic database trait covering connections, leads, threads,
/// and messages.
#[async_trait]
pub trait Database: Send + Sync {
    /// Run all pending schema migrations.
    async fn run_migrations(&self) -> Result<(), DatabaseError>;

    // ── Connections ─────────────────────────────────────────────────

    /// Get a connection by ID.
    async fn get_connection(&self, id: &str) -> Result<Option<Connection>, DatabaseError>;

    /// All connections, oldest first. The scheduler sweeps these.
    async fn list_connections(&self) -> Result<Vec<Connection>, DatabaseError>;

    /// Insert a connection, or refresh tokens/mailbox of an existing row
    /// for the same `(user_id, mailbox_email)`. Returns the row id.
    async fn upsert_connection(&self, connection: &Connection) -> Result<String, DatabaseError>;

    /// Stamp a successful sync: set `last_synced_at`, clear `error_message`.
    async fn mark_connection_synced(
        &self,
        id: &str,
        at: DateTime<Utc>,
    ) -> Result<(), DatabaseError>;

    /// Record a run-fatal failure on the connection row.
    async fn record_connection_error(
        &self,
        id: &str,
        message: &str,
    ) -> Result<(), DatabaseError>;

    // ── Leads ───────────────────────────────────────────────────────

    /// Look up a lead by lowercased email for one user.
    async fn find_lead_by_email(
        &self,
        user_id: &str,
        email: &str,
    ) -> Result<Option<Lead>, DatabaseError>;

    /// Insert a new lead. Returns the lead id.
    async fn insert_lead(&self, lead: &Lead) -> Result<String, DatabaseError>;

    /// Backfill a lead's display name (used when the stored name is a
    /// placeholder and mail traffic reveals the real one).
    async fn update_lead_name(&self, id: &str, name: &str) -> Result<(), DatabaseError>;

    /// All leads for a user, newest first.
    async fn list_leads(&self, user_id: &str) -> Result<Vec<Lead>, DatabaseError>;

    /// Write the recency pair computed after a sync.
    async fn set_lead_recency(
        &self,
        id: &str,
        last_contacted_at: DateTime<Utc>,
        days_since_contact: i64,
    ) -> Result<(), DatabaseError>;

    /// Leads eligible for a follow-up nudge: `days_since_contact >= min_days`
    /// and no outbound sent message anywhere in their threads. Ownership is
    /// decided by `email_threads.lead_id` alone; `messages.lead_id` is a
    /// denormalized convenience column and is not consulted. Ordered by
    /// days descending, at most `limit` rows.
    async fn followup_candidates(
        &self,
        user_id: &str,
        min_days: i64,
        limit: usize,
    ) -> Result<Vec<Lead>, DatabaseError>;

    // ── Threads ─────────────────────────────────────────────────────

    /// Look up a thread by its provider-side id for one user.
    async fn find_thread_by_provider_id(
        &self,
        user_id: &str,
        provider_thread_id: &str,
    ) -> Result<Option<EmailThread>, DatabaseError>;

    /// Insert a new thread. Returns the thread id.
    async fn insert_thread(&self, thread: &EmailThread) -> Result<String, DatabaseError>;

    /// Bump a thread's `updated_at` when a sync touches it again.
    async fn touch_thread(&self, id: &str, at: DateTime<Utc>) -> Result<(), DatabaseError>;

    // ── Messages ────────────────────────────────────────────────────

    /// Dedup probe for the `(user_id, thread_id, external_id)` key.
    async fn message_exists(
        &self,
        user_id: &str,
        thread_id: &str,
        external_id: &str,
    ) -> Result<bool, DatabaseError>;

    /// Insert a message row. Returns the message id.
    async fn insert_message(&self, message: &StoredMessage) -> Result<String, DatabaseError>;

    /// `sent_at` of the newest outbound sent message across a lead's
    /// threads, if any. Drives the recency pass.
    async fn latest_outbound_sent_at(
        &self,
        user_id: &str,
        lead_id: &str,
    ) -> Result<Option<DateTime<Utc>>, DatabaseError>;

    /// Newest AI-generated drafts for a user, up to `limit`.
    async fn recent_ai_drafts(
        &self,
        user_id: &str,
        limit: usize,
    ) -> Result<Vec<StoredMessage>, DatabaseError>;

    /// Newest hand-written drafts for a user, up to `limit`.
    async fn recent_manual_drafts(
        &self,
        user_id: &str,
        limit: usize,
    ) -> Result<Vec<StoredMessage>, DatabaseError>;

    /// Messages in a thread, newest first (diagnostics and tests).
    async fn list_thread_messages(
        &self,
        thread_id: &str,
    ) -> Result<Vec<StoredMessage>, DatabaseError>;
}
