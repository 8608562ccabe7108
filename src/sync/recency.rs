//! Post-sync contact recency pass.
//!
//! Recomputes each lead's `days_since_contact`. The anchor is the newest
//! outbound sent message across the lead's threads; leads the user never
//! wrote to fall back to their stored `last_contacted_at` (set at
//! creation), so they keep aging into follow-up eligibility. Leads with
//! neither anchor are left untouched.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::error::DatabaseError;
use crate::store::Database;

/// Refresh recency for every lead of `user_id` as of `now`.
///
/// Per-lead writes are independent: a failure on one lead is logged and
/// the pass moves on. Returns how many leads were updated.
pub async fn refresh_contact_recency(
    db: &Arc<dyn Database>,
    user_id: &str,
    now: DateTime<Utc>,
) -> Result<usize, DatabaseError> {
    let leads = db.list_leads(user_id).await?;
    let mut updated = 0;

    for lead in &leads {
        let anchor = match db.latest_outbound_sent_at(user_id, &lead.id).await {
            Ok(Some(sent_at)) => Some(sent_at),
            Ok(None) => lead.last_contacted_at,
            Err(e) => {
                warn!(lead_id = %lead.id, "Recency lookup failed: {e}");
                continue;
            }
        };

        let Some(anchor) = anchor else {
            continue;
        };

        let days = (now - anchor).num_days().max(0);
        match db.set_lead_recency(&lead.id, anchor, days).await {
            Ok(()) => {
                debug!(lead_id = %lead.id, days, "Recency updated");
                updated += 1;
            }
            Err(e) => {
                warn!(lead_id = %lead.id, "Recency write failed: {e}");
            }
        }
    }

    Ok(updated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::LibSqlBackend;
    use crate::store::model::{Direction, EmailThread, Lead, MessageStatus, StoredMessage};
    use chrono::TimeZone;

    async fn test_db() -> Arc<dyn Database> {
        Arc::new(LibSqlBackend::new_memory().await.unwrap())
    }

    fn outbound_sent(thread_id: &str, external_id: &str, sent_at: DateTime<Utc>) -> StoredMessage {
        StoredMessage {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: "u1".to_string(),
            thread_id: thread_id.to_string(),
            lead_id: None,
            direction: Direction::Outbound,
            from_email: "me@example.com".to_string(),
            to_email: "jane@acme.com".to_string(),
            subject: "Re: pricing".to_string(),
            body_text: "following up".to_string(),
            body_html: None,
            status: MessageStatus::Sent,
            is_ai_draft: false,
            sent_at: Some(sent_at),
            received_at: None,
            external_id: Some(external_id.to_string()),
            created_at: sent_at,
            updated_at: sent_at,
        }
    }

    #[tokio::test]
    async fn outbound_anchor_wins() {
        let db = test_db().await;
        let old_anchor = Utc.with_ymd_and_hms(2026, 8, 1, 0, 0, 0).unwrap();
        let lead = Lead::new("u1", "jane@acme.com", "Jane").with_last_contacted(old_anchor);
        db.insert_lead(&lead).await.unwrap();

        let thread = EmailThread::new("u1", "pt-1", "Hi").with_lead(Some(lead.id.clone()));
        db.insert_thread(&thread).await.unwrap();

        let sent = Utc.with_ymd_and_hms(2026, 8, 18, 12, 0, 0).unwrap();
        db.insert_message(&outbound_sent(&thread.id, "o1", sent))
            .await
            .unwrap();

        let now = Utc.with_ymd_and_hms(2026, 8, 24, 12, 0, 0).unwrap();
        let updated = refresh_contact_recency(&db, "u1", now).await.unwrap();
        assert_eq!(updated, 1);

        let fetched = db
            .find_lead_by_email("u1", "jane@acme.com")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(fetched.last_contacted_at, Some(sent));
        assert_eq!(fetched.days_since_contact, Some(6));
    }

    #[tokio::test]
    async fn stored_anchor_used_without_outbound() {
        let db = test_db().await;
        let anchor = Utc.with_ymd_and_hms(2026, 8, 14, 9, 0, 0).unwrap();
        let lead = Lead::new("u1", "jane@acme.com", "Jane").with_last_contacted(anchor);
        db.insert_lead(&lead).await.unwrap();

        let now = Utc.with_ymd_and_hms(2026, 8, 24, 12, 0, 0).unwrap();
        refresh_contact_recency(&db, "u1", now).await.unwrap();

        let fetched = db
            .find_lead_by_email("u1", "jane@acme.com")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(fetched.days_since_contact, Some(10));
    }

    #[tokio::test]
    async fn anchorless_leads_left_untouched() {
        let db = test_db().await;
        let lead = Lead::new("u1", "jane@acme.com", "Jane");
        db.insert_lead(&lead).await.unwrap();

        let updated = refresh_contact_recency(&db, "u1", Utc::now()).await.unwrap();
        assert_eq!(updated, 0);

        let fetched = db
            .find_lead_by_email("u1", "jane@acme.com")
            .await
            .unwrap()
            .unwrap();
        assert!(fetched.days_since_contact.is_none());
        assert!(fetched.last_contacted_at.is_none());
    }

    #[tokio::test]
    async fn future_anchor_clamps_to_zero() {
        let db = test_db().await;
        let anchor = Utc.with_ymd_and_hms(2026, 8, 25, 0, 0, 0).unwrap();
        let lead = Lead::new("u1", "jane@acme.com", "Jane").with_last_contacted(anchor);
        db.insert_lead(&lead).await.unwrap();

        let now = Utc.with_ymd_and_hms(2026, 8, 24, 12, 0, 0).unwrap();
        refresh_contact_recency(&db, "u1", now).await.unwrap();

        let fetched = db
            .find_lead_by_email("u1", "jane@acme.com")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(fetched.days_since_contact, Some(0));
    }
}
