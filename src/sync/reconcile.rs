//! Per-thread reconciliation — lead and thread resolution plus
//! deduplicated message persistence.
//!
//! One call to [`reconcile_thread`] handles one provider thread:
//! resolve the sender into a lead, find-or-create the thread row, persist
//! every message through the dedup gate, and fall back to a synthetic
//! snippet message when nothing new landed. Per-message failures are
//! logged and skipped; the thread's outcome reports what actually
//! happened.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, warn};

use crate::error::DatabaseError;
use crate::mail::NormalizedMessage;
use crate::mail::headers::company_from_email;
use crate::store::Database;
use crate::store::model::{Direction, EmailThread, Lead, MessageStatus, StoredMessage};

/// Stored text bodies are capped to protect the row size.
pub const MAX_TEXT_BODY_CHARS: usize = 50_000;
/// HTML is capped independently (markup is bulkier).
pub const MAX_HTML_BODY_CHARS: usize = 100_000;

/// What one thread's reconciliation produced.
#[derive(Debug, Clone, Default)]
pub struct ThreadOutcome {
    pub thread_id: String,
    pub lead_id: Option<String>,
    /// Messages newly persisted by this pass (fallback included).
    pub inserted: usize,
}

/// Reconcile one provider thread's normalized messages, newest first.
///
/// Lead and thread resolution use the first (newest) message; persistence
/// then runs over all of them. When a fetched thread yields zero new rows,
/// a synthetic message built from the newest snippet goes through the same
/// dedup gate, so every touched thread keeps at least one row and re-runs
/// stay no-ops.
pub async fn reconcile_thread(
    db: &Arc<dyn Database>,
    user_id: &str,
    provider_thread_id: &str,
    messages: &[NormalizedMessage],
) -> Result<ThreadOutcome, DatabaseError> {
    let newest = match messages.first() {
        Some(m) => m,
        None => return Ok(ThreadOutcome::default()),
    };

    let lead_id = resolve_lead(db, user_id, newest).await?;
    let thread_id = resolve_thread(db, user_id, provider_thread_id, newest, lead_id.as_deref())
        .await?;

    let mut inserted = 0;
    for message in messages {
        match persist_if_new(db, user_id, &thread_id, lead_id.as_deref(), message).await {
            Ok(true) => inserted += 1,
            Ok(false) => {}
            Err(e) => {
                warn!(
                    external_id = %message.external_id,
                    provider_thread_id = %provider_thread_id,
                    "Skipping message: {e}"
                );
            }
        }
    }

    if inserted == 0 && !newest.snippet.is_empty() {
        let fallback = NormalizedMessage {
            body_text: String::new(),
            body_html: String::new(),
            ..newest.clone()
        };
        match persist_if_new(db, user_id, &thread_id, lead_id.as_deref(), &fallback).await {
            Ok(true) => {
                debug!(provider_thread_id = %provider_thread_id, "Persisted fallback snippet message");
                inserted += 1;
            }
            Ok(false) => {}
            Err(e) => {
                warn!(provider_thread_id = %provider_thread_id, "Fallback persist failed: {e}");
            }
        }
    }

    Ok(ThreadOutcome {
        thread_id,
        lead_id,
        inserted,
    })
}

/// Resolve the sender of a message into a lead id.
///
/// Existing leads get a name backfill when the stored name is a
/// placeholder. Unseen senders spawn a warm lead only when a display name
/// is available; addressless or nameless senders resolve to `None`.
pub async fn resolve_lead(
    db: &Arc<dyn Database>,
    user_id: &str,
    message: &NormalizedMessage,
) -> Result<Option<String>, DatabaseError> {
    if message.from_email.is_empty() {
        return Ok(None);
    }

    if let Some(existing) = db.find_lead_by_email(user_id, &message.from_email).await? {
        if existing.name_is_placeholder() {
            if let Some(name) = message.from_name.as_deref() {
                db.update_lead_name(&existing.id, name).await?;
                debug!(lead_id = %existing.id, name = %name, "Backfilled lead name");
            }
        }
        return Ok(Some(existing.id));
    }

    let Some(name) = message.from_name.as_deref() else {
        // Nameless unseen senders do not spawn leads
        return Ok(None);
    };

    let lead = Lead::new(user_id, &message.from_email, name)
        .with_company(company_from_email(&message.from_email))
        .with_last_contacted(message.sent_at);
    let id = db.insert_lead(&lead).await?;
    debug!(lead_id = %id, email = %lead.email, "Created lead");
    Ok(Some(id))
}

/// Find or create the thread row for a provider thread id.
///
/// Reuse only bumps `updated_at`; the lead link is fixed at creation and
/// never rewritten by later syncs.
pub async fn resolve_thread(
    db: &Arc<dyn Database>,
    user_id: &str,
    provider_thread_id: &str,
    newest: &NormalizedMessage,
    lead_id: Option<&str>,
) -> Result<String, DatabaseError> {
    if let Some(existing) = db
        .find_thread_by_provider_id(user_id, provider_thread_id)
        .await?
    {
        db.touch_thread(&existing.id, newest.sent_at).await?;
        return Ok(existing.id);
    }

    let thread = EmailThread::new(user_id, provider_thread_id, &newest.subject)
        .with_lead(lead_id.map(str::to_string));
    db.insert_thread(&thread).await
}

/// Persist one normalized message unless its external id is already
/// stored for this thread. Returns whether a row was inserted.
///
/// Body caps apply here; when both decoded bodies are empty the snippet
/// becomes the text body. A duplicate-key race after the existence probe
/// is treated the same as a probe hit.
pub async fn persist_if_new(
    db: &Arc<dyn Database>,
    user_id: &str,
    thread_id: &str,
    lead_id: Option<&str>,
    message: &NormalizedMessage,
) -> Result<bool, DatabaseError> {
    if db
        .message_exists(user_id, thread_id, &message.external_id)
        .await?
    {
        return Ok(false);
    }

    let body_text = if message.has_decoded_body() {
        truncate_chars(&message.body_text, MAX_TEXT_BODY_CHARS)
    } else {
        truncate_chars(&message.snippet, MAX_TEXT_BODY_CHARS)
    };
    let body_html = {
        let html = truncate_chars(&message.body_html, MAX_HTML_BODY_CHARS);
        if html.is_empty() { None } else { Some(html) }
    };

    let now = Utc::now();
    let row = StoredMessage {
        id: uuid::Uuid::new_v4().to_string(),
        user_id: user_id.to_string(),
        thread_id: thread_id.to_string(),
        lead_id: lead_id.map(str::to_string),
        direction: message.direction,
        from_email: message.from_email.clone(),
        to_email: message.to_email.clone(),
        subject: message.subject.clone(),
        body_text,
        body_html,
        status: MessageStatus::Sent,
        is_ai_draft: false,
        sent_at: (message.direction == Direction::Outbound).then_some(message.sent_at),
        received_at: (message.direction == Direction::Inbound).then_some(message.sent_at),
        external_id: Some(message.external_id.clone()),
        created_at: now,
        updated_at: now,
    };

    match db.insert_message(&row).await {
        Ok(_) => Ok(true),
        // Concurrent insert of the same external id lost the race
        Err(DatabaseError::Constraint(_)) => Ok(false),
        Err(e) => Err(e),
    }
}

fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::LibSqlBackend;
    use chrono::{TimeZone, Utc};

    async fn test_db() -> Arc<dyn Database> {
        Arc::new(LibSqlBackend::new_memory().await.unwrap())
    }

    fn normalized(external_id: &str, from: &str, name: Option<&str>) -> NormalizedMessage {
        NormalizedMessage {
            external_id: external_id.to_string(),
            from_email: from.to_string(),
            from_name: name.map(str::to_string),
            to_email: "me@example.com".to_string(),
            subject: "Pricing".to_string(),
            sent_at: Utc.with_ymd_and_hms(2026, 8, 20, 9, 0, 0).unwrap(),
            direction: Direction::Inbound,
            body_text: "hello there".to_string(),
            body_html: String::new(),
            snippet: "hello th…".to_string(),
        }
    }

    #[tokio::test]
    async fn resolve_lead_creates_once_and_backfills() {
        let db = test_db().await;
        let msg = normalized("m1", "jane@acme.com", Some("Jane Doe"));

        let first = resolve_lead(&db, "u1", &msg).await.unwrap().unwrap();
        let second = resolve_lead(&db, "u1", &msg).await.unwrap().unwrap();
        assert_eq!(first, second);

        let lead = db
            .find_lead_by_email("u1", "jane@acme.com")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(lead.name.as_deref(), Some("Jane Doe"));
        assert_eq!(lead.company.as_deref(), Some("Acme"));
        assert_eq!(
            lead.last_contacted_at,
            Some(Utc.with_ymd_and_hms(2026, 8, 20, 9, 0, 0).unwrap())
        );
    }

    #[tokio::test]
    async fn resolve_lead_skips_nameless_and_addressless() {
        let db = test_db().await;

        let nameless = normalized("m1", "bare@example.com", None);
        assert!(resolve_lead(&db, "u1", &nameless).await.unwrap().is_none());
        assert!(
            db.find_lead_by_email("u1", "bare@example.com")
                .await
                .unwrap()
                .is_none()
        );

        let addressless = normalized("m2", "", Some("Ghost"));
        assert!(
            resolve_lead(&db, "u1", &addressless)
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn resolve_lead_backfills_placeholder_name() {
        let db = test_db().await;
        let lead = Lead::new("u1", "jane@acme.com", "Unknown");
        db.insert_lead(&lead).await.unwrap();

        let msg = normalized("m1", "jane@acme.com", Some("Jane Doe"));
        let id = resolve_lead(&db, "u1", &msg).await.unwrap().unwrap();
        assert_eq!(id, lead.id);

        let fetched = db
            .find_lead_by_email("u1", "jane@acme.com")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(fetched.name.as_deref(), Some("Jane Doe"));
    }

    #[tokio::test]
    async fn thread_lead_link_fixed_at_creation() {
        let db = test_db().await;
        let first = normalized("m1", "bare@example.com", None);

        // First sight: nameless sender, thread created without a lead
        let thread_id = resolve_thread(&db, "u1", "pt-1", &first, None).await.unwrap();

        // Later sync resolves a lead, but reuse must not link it
        let msg = normalized("m2", "jane@acme.com", Some("Jane Doe"));
        let lead_id = resolve_lead(&db, "u1", &msg).await.unwrap().unwrap();
        let reused = resolve_thread(&db, "u1", "pt-1", &msg, Some(&lead_id))
            .await
            .unwrap();
        assert_eq!(reused, thread_id);

        let thread = db
            .find_thread_by_provider_id("u1", "pt-1")
            .await
            .unwrap()
            .unwrap();
        assert!(thread.lead_id.is_none());
        assert_eq!(thread.updated_at, msg.sent_at);
    }

    #[tokio::test]
    async fn persist_dedups_and_caps_bodies() {
        let db = test_db().await;
        let msg = normalized("m1", "jane@acme.com", Some("Jane Doe"));
        let thread_id = resolve_thread(&db, "u1", "pt-1", &msg, None).await.unwrap();

        let mut long = msg.clone();
        long.body_text = "x".repeat(60_000);
        assert!(persist_if_new(&db, "u1", &thread_id, None, &long).await.unwrap());
        assert!(!persist_if_new(&db, "u1", &thread_id, None, &long).await.unwrap());

        let rows = db.list_thread_messages(&thread_id).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].body_text.chars().count(), MAX_TEXT_BODY_CHARS);
        assert_eq!(rows[0].received_at, Some(msg.sent_at));
        assert!(rows[0].sent_at.is_none());
    }

    #[tokio::test]
    async fn persist_falls_back_to_snippet() {
        let db = test_db().await;
        let mut msg = normalized("m1", "jane@acme.com", Some("Jane Doe"));
        msg.body_text = String::new();
        let thread_id = resolve_thread(&db, "u1", "pt-1", &msg, None).await.unwrap();

        persist_if_new(&db, "u1", &thread_id, None, &msg).await.unwrap();
        let rows = db.list_thread_messages(&thread_id).await.unwrap();
        assert_eq!(rows[0].body_text, "hello th…");
        assert!(rows[0].body_html.is_none());
    }

    #[tokio::test]
    async fn reconcile_full_thread() {
        let db = test_db().await;
        let inbound = normalized("m-b", "jane@acme.com", Some("Jane Doe"));
        let mut outbound = normalized("m-a", "me@example.com", Some("Me"));
        outbound.direction = Direction::Outbound;

        let outcome = reconcile_thread(&db, "u1", "pt-9", &[inbound, outbound])
            .await
            .unwrap();
        assert_eq!(outcome.inserted, 2);
        assert!(outcome.lead_id.is_some());

        let thread = db
            .find_thread_by_provider_id("u1", "pt-9")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(thread.id, outcome.thread_id);
        assert_eq!(thread.lead_id, outcome.lead_id);

        // Second pass over the same data is a no-op
        let inbound = normalized("m-b", "jane@acme.com", Some("Jane Doe"));
        let mut outbound = normalized("m-a", "me@example.com", Some("Me"));
        outbound.direction = Direction::Outbound;
        let again = reconcile_thread(&db, "u1", "pt-9", &[inbound, outbound])
            .await
            .unwrap();
        assert_eq!(again.inserted, 0);
        assert_eq!(db.list_thread_messages(&thread.id).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn reconcile_empty_thread_is_noop() {
        let db = test_db().await;
        let outcome = reconcile_thread(&db, "u1", "pt-0", &[]).await.unwrap();
        assert_eq!(outcome.inserted, 0);
        assert!(outcome.thread_id.is_empty());
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        let s = "héllo wörld";
        assert_eq!(truncate_chars(s, 5), "héllo");
        assert_eq!(truncate_chars(s, 100), s);
    }
}
