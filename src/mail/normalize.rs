//! Normalization of one raw provider message into a canonical record.

use chrono::{DateTime, TimeZone, Utc};

use crate::mail::headers::{extract_address, extract_display_name, header_value};
use crate::mail::mime::{self, ExtractedBodies};
use crate::provider::ProviderMessage;
use crate::store::model::Direction;

/// The canonical in-memory form of one provider message, ready for
/// reconciliation and persistence.
#[derive(Debug, Clone)]
pub struct NormalizedMessage {
    pub external_id: String,
    /// Lowercased sender address; may be empty for headerless mail.
    pub from_email: String,
    pub from_name: Option<String>,
    pub to_email: String,
    pub subject: String,
    pub sent_at: DateTime<Utc>,
    pub direction: Direction,
    pub body_text: String,
    pub body_html: String,
    /// Provider snippet, the fallback body when decoding yields nothing.
    pub snippet: String,
}

impl NormalizedMessage {
    pub fn has_decoded_body(&self) -> bool {
        !self.body_text.is_empty() || !self.body_html.is_empty()
    }
}

/// Normalize one provider message against the connection's own mailbox
/// address. Total: any missing field resolves to a safe default.
pub fn normalize_message(message: &ProviderMessage, mailbox_email: &str) -> NormalizedMessage {
    let headers = message
        .payload
        .as_ref()
        .map(|p| p.headers.as_slice())
        .unwrap_or_default();

    let from_raw = header_value(headers, "From").unwrap_or_default();
    let from_email = extract_address(from_raw).to_lowercase();
    let from_name = extract_display_name(from_raw);
    let to_email = extract_address(header_value(headers, "To").unwrap_or_default()).to_lowercase();
    let subject = header_value(headers, "Subject").unwrap_or_default().to_string();

    let direction = if !from_email.is_empty() && from_email.eq_ignore_ascii_case(mailbox_email) {
        Direction::Outbound
    } else {
        Direction::Inbound
    };

    let sent_at = resolve_date(
        header_value(headers, "Date"),
        message.internal_date.as_deref(),
    );

    let bodies: ExtractedBodies = message
        .payload
        .as_ref()
        .map(mime::extract_bodies)
        .unwrap_or_default();

    NormalizedMessage {
        external_id: message.id.clone(),
        from_email,
        from_name,
        to_email,
        subject,
        sent_at,
        direction,
        body_text: bodies.text,
        body_html: bodies.html,
        snippet: message.snippet.clone().unwrap_or_default(),
    }
}

/// Date resolution chain: RFC 2822 `Date` header → provider internalDate
/// (epoch milliseconds as a string) → Unix epoch. Never fails.
fn resolve_date(date_header: Option<&str>, internal_date: Option<&str>) -> DateTime<Utc> {
    if let Some(raw) = date_header {
        if let Ok(dt) = DateTime::parse_from_rfc2822(raw.trim()) {
            return dt.with_timezone(&Utc);
        }
    }

    if let Some(ms) = internal_date.and_then(|s| s.trim().parse::<i64>().ok()) {
        if let Some(dt) = Utc.timestamp_millis_opt(ms).single() {
            return dt;
        }
    }

    DateTime::UNIX_EPOCH
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{MessageHeader, MimePart};

    fn message_with_headers(pairs: &[(&str, &str)]) -> ProviderMessage {
        ProviderMessage {
            id: "m1".to_string(),
            internal_date: None,
            snippet: Some("snippet text".to_string()),
            payload: Some(MimePart {
                mime_type: Some("text/plain".to_string()),
                headers: pairs
                    .iter()
                    .map(|(n, v)| MessageHeader {
                        name: n.to_string(),
                        value: v.to_string(),
                    })
                    .collect(),
                body: None,
                parts: None,
            }),
        }
    }

    #[test]
    fn outbound_when_sender_matches_mailbox() {
        let msg = message_with_headers(&[("From", "Me <ME@Example.COM>")]);
        let norm = normalize_message(&msg, "me@example.com");
        assert_eq!(norm.direction, Direction::Outbound);
        assert_eq!(norm.from_email, "me@example.com");
    }

    #[test]
    fn inbound_for_other_senders_and_missing_from() {
        let msg = message_with_headers(&[("From", "Jane <jane@acme.com>")]);
        assert_eq!(
            normalize_message(&msg, "me@example.com").direction,
            Direction::Inbound
        );

        // No From header at all still normalizes, as inbound
        let bare = message_with_headers(&[("Subject", "Hi")]);
        let norm = normalize_message(&bare, "me@example.com");
        assert_eq!(norm.direction, Direction::Inbound);
        assert!(norm.from_email.is_empty());
        assert_eq!(norm.subject, "Hi");
    }

    #[test]
    fn date_prefers_rfc2822_header() {
        let msg = ProviderMessage {
            internal_date: Some("1700000000000".to_string()),
            ..message_with_headers(&[("Date", "Tue, 18 Aug 2026 10:30:00 +0000")])
        };
        let norm = normalize_message(&msg, "me@example.com");
        assert_eq!(norm.sent_at.to_rfc3339(), "2026-08-18T10:30:00+00:00");
    }

    #[test]
    fn date_falls_back_to_internal_date_then_epoch() {
        let msg = ProviderMessage {
            internal_date: Some("1700000000000".to_string()),
            ..message_with_headers(&[("Date", "not a date")])
        };
        let norm = normalize_message(&msg, "me@example.com");
        assert_eq!(norm.sent_at.timestamp_millis(), 1_700_000_000_000);

        let msg = message_with_headers(&[]);
        let norm = normalize_message(&msg, "me@example.com");
        assert_eq!(norm.sent_at, DateTime::UNIX_EPOCH);
    }

    #[test]
    fn snippet_carried_for_fallback() {
        let msg = message_with_headers(&[]);
        let norm = normalize_message(&msg, "me@example.com");
        assert!(!norm.has_decoded_body());
        assert_eq!(norm.snippet, "snippet text");
    }

    #[test]
    fn missing_payload_normalizes_to_defaults() {
        let msg = ProviderMessage {
            id: "m2".to_string(),
            internal_date: None,
            snippet: None,
            payload: None,
        };
        let norm = normalize_message(&msg, "me@example.com");
        assert_eq!(norm.external_id, "m2");
        assert!(norm.from_email.is_empty());
        assert!(norm.subject.is_empty());
        assert_eq!(norm.sent_at, DateTime::UNIX_EPOCH);
    }
}
