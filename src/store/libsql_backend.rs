//! libSQL backend — async `Database` trait implementation.
//!
//! Single connection reused for all operations; `libsql::Connection` is
//! `Send + Sync` and safe for concurrent async use. Supports local file
//! and in-memory databases.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use libsql::{Connection as LibSqlConnection, Database as LibSqlDatabase, params};
use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, info};

use crate::error::DatabaseError;
use crate::store::migrations;
use crate::store::model::{Connection, EmailThread, Lead, StoredMessage};
use crate::store::traits::Database;

/// libSQL database backend.
pub struct LibSqlBackend {
    #[allow(dead_code)]
    db: Arc<LibSqlDatabase>,
    conn: LibSqlConnection,
}

impl LibSqlBackend {
    /// Open (or create) a local database file and run migrations.
    pub async fn new_local(path: &Path) -> Result<Self, DatabaseError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                DatabaseError::Pool(format!("Failed to create database directory: {e}"))
            })?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| DatabaseError::Pool(format!("Failed to open libSQL database: {e}")))?;

        let conn = db
            .connect()
            .map_err(|e| DatabaseError::Pool(format!("Failed to create connection: {e}")))?;

        let backend = Self {
            db: Arc::new(db),
            conn,
        };
        backend.run_migrations().await?;
        info!(path = %path.display(), "Database opened");
        Ok(backend)
    }

    /// Create an in-memory database (for tests).
    pub async fn new_memory() -> Result<Self, DatabaseError> {
        let db = libsql::Builder::new_local(":memory:")
            .build()
            .await
            .map_err(|e| {
                DatabaseError::Pool(format!("Failed to create in-memory database: {e}"))
            })?;

        let conn = db
            .connect()
            .map_err(|e| DatabaseError::Pool(format!("Failed to create connection: {e}")))?;

        let backend = Self {
            db: Arc::new(db),
            conn,
        };
        backend.run_migrations().await?;
        Ok(backend)
    }

    /// Get the connection.
    fn conn(&self) -> &LibSqlConnection {
        &self.conn
    }
}

// ── Helper functions ────────────────────────────────────────────────

/// Parse an RFC 3339 or SQLite datetime string into DateTime<Utc>.
fn parse_datetime(s: &str) -> DateTime<Utc> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return dt.with_timezone(&Utc);
    }
    if let Ok(ndt) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f") {
        return ndt.and_utc();
    }
    if let Ok(ndt) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return ndt.and_utc();
    }
    DateTime::<Utc>::MIN_UTC
}

fn parse_optional_datetime(s: &Option<String>) -> Option<DateTime<Utc>> {
    s.as_ref().map(|s| parse_datetime(s))
}

fn opt_text(s: Option<&str>) -> libsql::Value {
    match s {
        Some(s) => libsql::Value::Text(s.to_string()),
        None => libsql::Value::Null,
    }
}

fn opt_text_owned(s: Option<String>) -> libsql::Value {
    match s {
        Some(s) => libsql::Value::Text(s),
        None => libsql::Value::Null,
    }
}

fn opt_int(v: Option<i64>) -> libsql::Value {
    match v {
        Some(v) => libsql::Value::Integer(v),
        None => libsql::Value::Null,
    }
}

fn opt_datetime(dt: Option<DateTime<Utc>>) -> libsql::Value {
    opt_text_owned(dt.map(|d| d.to_rfc3339()))
}

/// Map an insert error, surfacing dedup-index hits as `Constraint` so
/// callers can treat them as benign.
fn map_insert_err(context: &str, e: libsql::Error) -> DatabaseError {
    let msg = e.to_string();
    if msg.contains("UNIQUE") {
        DatabaseError::Constraint(format!("{context}: {msg}"))
    } else {
        DatabaseError::Query(format!("{context}: {msg}"))
    }
}

const CONNECTION_COLUMNS: &str = "id, user_id, provider, mailbox_email, access_token, \
     refresh_token, last_synced_at, error_message, created_at, updated_at";

/// Map a libsql Row to a Connection. Column order matches CONNECTION_COLUMNS.
fn row_to_connection(row: &libsql::Row) -> Result<Connection, libsql::Error> {
    let access_token: String = row.get(4)?;
    let refresh_token: Option<String> = row.get(5).ok();
    let last_synced: Option<String> = row.get(6).ok();
    let error_message: Option<String> = row.get(7).ok();
    let created_str: String = row.get(8)?;
    let updated_str: String = row.get(9)?;

    Ok(Connection {
        id: row.get(0)?,
        user_id: row.get(1)?,
        provider: row.get(2)?,
        mailbox_email: row.get(3)?,
        access_token: SecretString::from(access_token),
        refresh_token: refresh_token.map(SecretString::from),
        last_synced_at: parse_optional_datetime(&last_synced),
        error_message,
        created_at: parse_datetime(&created_str),
        updated_at: parse_datetime(&updated_str),
    })
}

const LEAD_COLUMNS: &str = "id, user_id, email, name, company, status, last_contacted_at, \
     days_since_contact, ai_suggestion, has_draft, created_at, updated_at";

/// Map a libsql Row to a Lead. Column order matches LEAD_COLUMNS.
fn row_to_lead(row: &libsql::Row) -> Result<Lead, libsql::Error> {
    let status_str: String = row.get(5)?;
    let last_contacted: Option<String> = row.get(6).ok();
    let has_draft: i64 = row.get(9).unwrap_or(0);
    let created_str: String = row.get(10)?;
    let updated_str: String = row.get(11)?;

    Ok(Lead {
        id: row.get(0)?,
        user_id: row.get(1)?,
        email: row.get(2)?,
        name: row.get(3).ok(),
        company: row.get(4).ok(),
        status: status_str.parse().unwrap_or_default(),
        last_contacted_at: parse_optional_datetime(&last_contacted),
        days_since_contact: row.get(7).ok(),
        ai_suggestion: row.get(8).ok(),
        has_draft: has_draft != 0,
        created_at: parse_datetime(&created_str),
        updated_at: parse_datetime(&updated_str),
    })
}

const THREAD_COLUMNS: &str =
    "id, user_id, provider_thread_id, subject, lead_id, status, created_at, updated_at";

/// Map a libsql Row to an EmailThread. Column order matches THREAD_COLUMNS.
fn row_to_thread(row: &libsql::Row) -> Result<EmailThread, libsql::Error> {
    let status_str: String = row.get(5)?;
    let created_str: String = row.get(6)?;
    let updated_str: String = row.get(7)?;

    Ok(EmailThread {
        id: row.get(0)?,
        user_id: row.get(1)?,
        provider_thread_id: row.get(2)?,
        subject: row.get(3)?,
        lead_id: row.get(4).ok(),
        status: status_str.parse().unwrap_or_default(),
        created_at: parse_datetime(&created_str),
        updated_at: parse_datetime(&updated_str),
    })
}

const MESSAGE_COLUMNS: &str = "id, user_id, thread_id, lead_id, direction, from_email, \
     to_email, subject, body_text, body_html, status, is_ai_draft, sent_at, received_at, \
     external_id, created_at, updated_at";

/// Map a libsql Row to a StoredMessage. Column order matches MESSAGE_COLUMNS.
fn row_to_message(row: &libsql::Row) -> Result<StoredMessage, libsql::Error> {
    let direction_str: String = row.get(4)?;
    let status_str: String = row.get(10)?;
    let is_ai_draft: i64 = row.get(11).unwrap_or(0);
    let sent_at: Option<String> = row.get(12).ok();
    let received_at: Option<String> = row.get(13).ok();
    let created_str: String = row.get(15)?;
    let updated_str: String = row.get(16)?;

    Ok(StoredMessage {
        id: row.get(0)?,
        user_id: row.get(1)?,
        thread_id: row.get(2)?,
        lead_id: row.get(3).ok(),
        direction: direction_str.parse().unwrap_or_default(),
        from_email: row.get(5)?,
        to_email: row.get(6)?,
        subject: row.get(7)?,
        body_text: row.get(8)?,
        body_html: row.get(9).ok(),
        status: status_str.parse().unwrap_or_default(),
        is_ai_draft: is_ai_draft != 0,
        sent_at: parse_optional_datetime(&sent_at),
        received_at: parse_optional_datetime(&received_at),
        external_id: row.get(14).ok(),
        created_at: parse_datetime(&created_str),
        updated_at: parse_datetime(&updated_str),
    })
}

#[async_trait]
impl Database for LibSqlBackend {
    async fn run_migrations(&self) -> Result<(), DatabaseError> {
        migrations::run_migrations(self.conn()).await
    }

    // ── Connections ─────────────────────────────────────────────────

    async fn get_connection(&self, id: &str) -> Result<Option<Connection>, DatabaseError> {
        let conn = self.conn();
        let mut rows = conn
            .query(
                &format!("SELECT {CONNECTION_COLUMNS} FROM connections WHERE id = ?1"),
                params![id],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("get_connection: {e}")))?;

        match rows.next().await {
            Ok(Some(row)) => {
                let connection = row_to_connection(&row)
                    .map_err(|e| DatabaseError::Query(format!("get_connection row parse: {e}")))?;
                Ok(Some(connection))
            }
            Ok(None) => Ok(None),
            Err(e) => Err(DatabaseError::Query(format!("get_connection: {e}"))),
        }
    }

    async fn list_connections(&self) -> Result<Vec<Connection>, DatabaseError> {
        let conn = self.conn();
        let mut rows = conn
            .query(
                &format!("SELECT {CONNECTION_COLUMNS} FROM connections ORDER BY created_at ASC"),
                (),
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("list_connections: {e}")))?;

        let mut connections = Vec::new();
        while let Ok(Some(row)) = rows.next().await {
            match row_to_connection(&row) {
                Ok(connection) => connections.push(connection),
                Err(e) => {
                    tracing::warn!("Skipping connection row: {e}");
                }
            }
        }
        Ok(connections)
    }

    async fn upsert_connection(&self, connection: &Connection) -> Result<String, DatabaseError> {
        let conn = self.conn();
        conn.execute(
            "INSERT INTO connections (id, user_id, provider, mailbox_email, access_token, \
             refresh_token, last_synced_at, error_message, created_at, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10) \
             ON CONFLICT(user_id, mailbox_email) DO UPDATE SET \
             provider = excluded.provider, \
             access_token = excluded.access_token, \
             refresh_token = excluded.refresh_token, \
             updated_at = excluded.updated_at",
            params![
                connection.id.as_str(),
                connection.user_id.as_str(),
                connection.provider.as_str(),
                connection.mailbox_email.as_str(),
                connection.access_token.expose_secret(),
                opt_text(
                    connection
                        .refresh_token
                        .as_ref()
                        .map(|t| t.expose_secret())
                ),
                opt_datetime(connection.last_synced_at),
                opt_text(connection.error_message.as_deref()),
                connection.created_at.to_rfc3339(),
                connection.updated_at.to_rfc3339(),
            ],
        )
        .await
        .map_err(|e| DatabaseError::Query(format!("upsert_connection: {e}")))?;

        let mut rows = conn
            .query(
                "SELECT id FROM connections WHERE user_id = ?1 AND mailbox_email = ?2",
                params![
                    connection.user_id.as_str(),
                    connection.mailbox_email.as_str()
                ],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("upsert_connection lookup: {e}")))?;

        match rows.next().await {
            Ok(Some(row)) => {
                let id: String = row
                    .get(0)
                    .map_err(|e| DatabaseError::Query(format!("upsert_connection id: {e}")))?;
                Ok(id)
            }
            _ => Err(DatabaseError::NotFound {
                entity: "connection".to_string(),
                id: connection.mailbox_email.clone(),
            }),
        }
    }

    async fn mark_connection_synced(
        &self,
        id: &str,
        at: DateTime<Utc>,
    ) -> Result<(), DatabaseError> {
        let conn = self.conn();
        let now = Utc::now().to_rfc3339();
        conn.execute(
            "UPDATE connections SET last_synced_at = ?1, error_message = NULL, updated_at = ?2 \
             WHERE id = ?3",
            params![at.to_rfc3339(), now, id],
        )
        .await
        .map_err(|e| DatabaseError::Query(format!("mark_connection_synced: {e}")))?;

        debug!(connection_id = %id, "Connection sync stamped");
        Ok(())
    }

    async fn record_connection_error(
        &self,
        id: &str,
        message: &str,
    ) -> Result<(), DatabaseError> {
        let conn = self.conn();
        let now = Utc::now().to_rfc3339();
        conn.execute(
            "UPDATE connections SET error_message = ?1, updated_at = ?2 WHERE id = ?3",
            params![message, now, id],
        )
        .await
        .map_err(|e| DatabaseError::Query(format!("record_connection_error: {e}")))?;
        Ok(())
    }

    // ── Leads ───────────────────────────────────────────────────────

    async fn find_lead_by_email(
        &self,
        user_id: &str,
        email: &str,
    ) -> Result<Option<Lead>, DatabaseError> {
        let conn = self.conn();
        let mut rows = conn
            .query(
                &format!("SELECT {LEAD_COLUMNS} FROM leads WHERE user_id = ?1 AND email = ?2"),
                params![user_id, email.to_lowercase()],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("find_lead_by_email: {e}")))?;

        match rows.next().await {
            Ok(Some(row)) => {
                let lead = row_to_lead(&row).map_err(|e| {
                    DatabaseError::Query(format!("find_lead_by_email row parse: {e}"))
                })?;
                Ok(Some(lead))
            }
            Ok(None) => Ok(None),
            Err(e) => Err(DatabaseError::Query(format!("find_lead_by_email: {e}"))),
        }
    }

    async fn insert_lead(&self, lead: &Lead) -> Result<String, DatabaseError> {
        let conn = self.conn();
        conn.execute(
            "INSERT INTO leads (id, user_id, email, name, company, status, last_contacted_at, \
             days_since_contact, ai_suggestion, has_draft, created_at, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
            params![
                lead.id.as_str(),
                lead.user_id.as_str(),
                lead.email.as_str(),
                opt_text(lead.name.as_deref()),
                opt_text(lead.company.as_deref()),
                lead.status.to_string(),
                opt_datetime(lead.last_contacted_at),
                opt_int(lead.days_since_contact),
                opt_text(lead.ai_suggestion.as_deref()),
                lead.has_draft as i64,
                lead.created_at.to_rfc3339(),
                lead.updated_at.to_rfc3339(),
            ],
        )
        .await
        .map_err(|e| map_insert_err("insert_lead", e))?;

        debug!(lead_id = %lead.id, email = %lead.email, "Lead inserted");
        Ok(lead.id.clone())
    }

    async fn update_lead_name(&self, id: &str, name: &str) -> Result<(), DatabaseError> {
        let conn = self.conn();
        let now = Utc::now().to_rfc3339();
        conn.execute(
            "UPDATE leads SET name = ?1, updated_at = ?2 WHERE id = ?3",
            params![name, now, id],
        )
        .await
        .map_err(|e| DatabaseError::Query(format!("update_lead_name: {e}")))?;
        Ok(())
    }

    async fn list_leads(&self, user_id: &str) -> Result<Vec<Lead>, DatabaseError> {
        let conn = self.conn();
        let mut rows = conn
            .query(
                &format!(
                    "SELECT {LEAD_COLUMNS} FROM leads WHERE user_id = ?1 ORDER BY created_at DESC"
                ),
                params![user_id],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("list_leads: {e}")))?;

        let mut leads = Vec::new();
        while let Ok(Some(row)) = rows.next().await {
            match row_to_lead(&row) {
                Ok(lead) => leads.push(lead),
                Err(e) => {
                    tracing::warn!("Skipping lead row: {e}");
                }
            }
        }
        Ok(leads)
    }

    async fn set_lead_recency(
        &self,
        id: &str,
        last_contacted_at: DateTime<Utc>,
        days_since_contact: i64,
    ) -> Result<(), DatabaseError> {
        let conn = self.conn();
        let now = Utc::now().to_rfc3339();
        conn.execute(
            "UPDATE leads SET last_contacted_at = ?1, days_since_contact = ?2, updated_at = ?3 \
             WHERE id = ?4",
            params![last_contacted_at.to_rfc3339(), days_since_contact, now, id],
        )
        .await
        .map_err(|e| DatabaseError::Query(format!("set_lead_recency: {e}")))?;
        Ok(())
    }

    async fn followup_candidates(
        &self,
        user_id: &str,
        min_days: i64,
        limit: usize,
    ) -> Result<Vec<Lead>, DatabaseError> {
        let conn = self.conn();
        let mut rows = conn
            .query(
                &format!(
                    "SELECT {LEAD_COLUMNS} FROM leads \
                     WHERE user_id = ?1 AND days_since_contact >= ?2 \
                     AND NOT EXISTS ( \
                         SELECT 1 FROM messages m \
                         JOIN email_threads t ON m.thread_id = t.id \
                         WHERE t.lead_id = leads.id \
                           AND m.direction = 'outbound' AND m.status = 'sent' \
                     ) \
                     ORDER BY days_since_contact DESC \
                     LIMIT ?3"
                ),
                params![user_id, min_days, limit as i64],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("followup_candidates: {e}")))?;

        let mut leads = Vec::new();
        while let Ok(Some(row)) = rows.next().await {
            match row_to_lead(&row) {
                Ok(lead) => leads.push(lead),
                Err(e) => {
                    tracing::warn!("Skipping lead row: {e}");
                }
            }
        }
        Ok(leads)
    }

    // ── Threads ─────────────────────────────────────────────────────

    async fn find_thread_by_provider_id(
        &self,
        user_id: &str,
        provider_thread_id: &str,
    ) -> Result<Option<EmailThread>, DatabaseError> {
        let conn = self.conn();
        let mut rows = conn
            .query(
                &format!(
                    "SELECT {THREAD_COLUMNS} FROM email_threads \
                     WHERE user_id = ?1 AND provider_thread_id = ?2"
                ),
                params![user_id, provider_thread_id],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("find_thread_by_provider_id: {e}")))?;

        match rows.next().await {
            Ok(Some(row)) => {
                let thread = row_to_thread(&row).map_err(|e| {
                    DatabaseError::Query(format!("find_thread_by_provider_id row parse: {e}"))
                })?;
                Ok(Some(thread))
            }
            Ok(None) => Ok(None),
            Err(e) => Err(DatabaseError::Query(format!(
                "find_thread_by_provider_id: {e}"
            ))),
        }
    }

    async fn insert_thread(&self, thread: &EmailThread) -> Result<String, DatabaseError> {
        let conn = self.conn();
        conn.execute(
            "INSERT INTO email_threads (id, user_id, provider_thread_id, subject, lead_id, \
             status, created_at, updated_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                thread.id.as_str(),
                thread.user_id.as_str(),
                thread.provider_thread_id.as_str(),
                thread.subject.as_str(),
                opt_text(thread.lead_id.as_deref()),
                thread.status.to_string(),
                thread.created_at.to_rfc3339(),
                thread.updated_at.to_rfc3339(),
            ],
        )
        .await
        .map_err(|e| map_insert_err("insert_thread", e))?;

        debug!(thread_id = %thread.id, provider_thread_id = %thread.provider_thread_id, "Thread inserted");
        Ok(thread.id.clone())
    }

    async fn touch_thread(&self, id: &str, at: DateTime<Utc>) -> Result<(), DatabaseError> {
        let conn = self.conn();
        conn.execute(
            "UPDATE email_threads SET updated_at = ?1 WHERE id = ?2",
            params![at.to_rfc3339(), id],
        )
        .await
        .map_err(|e| DatabaseError::Query(format!("touch_thread: {e}")))?;
        Ok(())
    }

    // ── Messages ────────────────────────────────────────────────────

    async fn message_exists(
        &self,
        user_id: &str,
        thread_id: &str,
        external_id: &str,
    ) -> Result<bool, DatabaseError> {
        let conn = self.conn();
        let mut rows = conn
            .query(
                "SELECT COUNT(*) FROM messages \
                 WHERE user_id = ?1 AND thread_id = ?2 AND external_id = ?3",
                params![user_id, thread_id, external_id],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("message_exists: {e}")))?;

        match rows.next().await {
            Ok(Some(row)) => {
                let count: i64 = row.get(0).unwrap_or(0);
                Ok(count > 0)
            }
            _ => Ok(false),
        }
    }

    async fn insert_message(&self, message: &StoredMessage) -> Result<String, DatabaseError> {
        let conn = self.conn();
        conn.execute(
            "INSERT INTO messages (id, user_id, thread_id, lead_id, direction, from_email, \
             to_email, subject, body_text, body_html, status, is_ai_draft, sent_at, \
             received_at, external_id, created_at, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)",
            params![
                message.id.as_str(),
                message.user_id.as_str(),
                message.thread_id.as_str(),
                opt_text(message.lead_id.as_deref()),
                message.direction.to_string(),
                message.from_email.as_str(),
                message.to_email.as_str(),
                message.subject.as_str(),
                message.body_text.as_str(),
                opt_text(message.body_html.as_deref()),
                message.status.to_string(),
                message.is_ai_draft as i64,
                opt_datetime(message.sent_at),
                opt_datetime(message.received_at),
                opt_text(message.external_id.as_deref()),
                message.created_at.to_rfc3339(),
                message.updated_at.to_rfc3339(),
            ],
        )
        .await
        .map_err(|e| map_insert_err("insert_message", e))?;

        debug!(message_id = %message.id, thread_id = %message.thread_id, "Message inserted");
        Ok(message.id.clone())
    }

    async fn latest_outbound_sent_at(
        &self,
        user_id: &str,
        lead_id: &str,
    ) -> Result<Option<DateTime<Utc>>, DatabaseError> {
        let conn = self.conn();
        let mut rows = conn
            .query(
                "SELECT MAX(m.sent_at) FROM messages m \
                 JOIN email_threads t ON m.thread_id = t.id \
                 WHERE m.user_id = ?1 AND t.lead_id = ?2 \
                   AND m.direction = 'outbound' AND m.status = 'sent' \
                   AND m.sent_at IS NOT NULL",
                params![user_id, lead_id],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("latest_outbound_sent_at: {e}")))?;

        match rows.next().await {
            Ok(Some(row)) => {
                let latest: Option<String> = row.get(0).ok();
                Ok(parse_optional_datetime(&latest))
            }
            _ => Ok(None),
        }
    }

    async fn recent_ai_drafts(
        &self,
        user_id: &str,
        limit: usize,
    ) -> Result<Vec<StoredMessage>, DatabaseError> {
        let conn = self.conn();
        let mut rows = conn
            .query(
                &format!(
                    "SELECT {MESSAGE_COLUMNS} FROM messages \
                     WHERE user_id = ?1 AND status = 'draft' AND is_ai_draft = 1 \
                     ORDER BY created_at DESC LIMIT ?2"
                ),
                params![user_id, limit as i64],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("recent_ai_drafts: {e}")))?;

        let mut messages = Vec::new();
        while let Ok(Some(row)) = rows.next().await {
            match row_to_message(&row) {
                Ok(message) => messages.push(message),
                Err(e) => {
                    tracing::warn!("Skipping message row: {e}");
                }
            }
        }
        Ok(messages)
    }

    async fn recent_manual_drafts(
        &self,
        user_id: &str,
        limit: usize,
    ) -> Result<Vec<StoredMessage>, DatabaseError> {
        let conn = self.conn();
        let mut rows = conn
            .query(
                &format!(
                    "SELECT {MESSAGE_COLUMNS} FROM messages \
                     WHERE user_id = ?1 AND status = 'draft' AND is_ai_draft = 0 \
                     ORDER BY created_at DESC LIMIT ?2"
                ),
                params![user_id, limit as i64],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("recent_manual_drafts: {e}")))?;

        let mut messages = Vec::new();
        while let Ok(Some(row)) = rows.next().await {
            match row_to_message(&row) {
                Ok(message) => messages.push(message),
                Err(e) => {
                    tracing::warn!("Skipping message row: {e}");
                }
            }
        }
        Ok(messages)
    }

    async fn list_thread_messages(
        &self,
        thread_id: &str,
    ) -> Result<Vec<StoredMessage>, DatabaseError> {
        let conn = self.conn();
        let mut rows = conn
            .query(
                &format!(
                    "SELECT {MESSAGE_COLUMNS} FROM messages WHERE thread_id = ?1 \
                     ORDER BY COALESCE(sent_at, received_at, created_at) DESC"
                ),
                params![thread_id],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("list_thread_messages: {e}")))?;

        let mut messages = Vec::new();
        while let Ok(Some(row)) = rows.next().await {
            match row_to_message(&row) {
                Ok(message) => messages.push(message),
                Err(e) => {
                    tracing::warn!("Skipping message row: {e}");
                }
            }
        }
        Ok(messages)
    }
}
