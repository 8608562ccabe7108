//! Mail provider boundary — the async trait the sync pipeline talks to,
//! plus the wire types provider responses deserialize into.
//!
//! Every field on the wire types is optional-tolerant: third-party payloads
//! routinely omit pieces, and the pipeline treats absence as "no data",
//! never as an error.

use async_trait::async_trait;
use secrecy::SecretString;
use serde::Deserialize;

use crate::error::ProviderError;

pub mod gmail;

pub use gmail::GmailProvider;

/// Credentials for one mailbox, read off the Connection row. Token refresh
/// happens outside this service; the provider either works with what it is
/// given or fails the run.
#[derive(Clone)]
pub struct MailboxCredentials {
    pub access_token: SecretString,
    pub mailbox_email: String,
}

/// A thread id from the listing endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct ThreadStub {
    pub id: String,
}

/// A full thread with its messages, newest first as the provider returns
/// them.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProviderThread {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub messages: Vec<ProviderMessage>,
}

/// One raw provider message.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderMessage {
    #[serde(default)]
    pub id: String,
    /// Epoch milliseconds, as a string.
    pub internal_date: Option<String>,
    pub snippet: Option<String>,
    pub payload: Option<MimePart>,
}

/// One name/value header pair.
#[derive(Debug, Clone, Deserialize)]
pub struct MessageHeader {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub value: String,
}

/// A node in the recursive MIME part tree.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MimePart {
    pub mime_type: Option<String>,
    #[serde(default)]
    pub headers: Vec<MessageHeader>,
    pub body: Option<MimeBody>,
    pub parts: Option<Vec<MimePart>>,
}

/// Inline body data on a part, base64url-encoded.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MimeBody {
    pub data: Option<String>,
    pub size: Option<u64>,
}

/// The provider seam the sync engine drives. Implemented by the Gmail REST
/// client in production and by scripted stubs in tests.
#[async_trait]
pub trait MailProvider: Send + Sync {
    /// List ids of the most recent threads, up to `max_results`.
    async fn list_threads(
        &self,
        creds: &MailboxCredentials,
        max_results: u32,
    ) -> Result<Vec<ThreadStub>, ProviderError>;

    /// Fetch one thread with full message payloads.
    async fn get_thread(
        &self,
        creds: &MailboxCredentials,
        thread_id: &str,
    ) -> Result<ProviderThread, ProviderError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_types_tolerate_sparse_payloads() {
        // A message with nothing but an id must still deserialize.
        let msg: ProviderMessage = serde_json::from_str(r#"{"id":"m1"}"#).unwrap();
        assert_eq!(msg.id, "m1");
        assert!(msg.payload.is_none());
        assert!(msg.snippet.is_none());

        let thread: ProviderThread = serde_json::from_str(r#"{"id":"t1"}"#).unwrap();
        assert!(thread.messages.is_empty());
    }

    #[test]
    fn mime_tree_deserializes_recursively() {
        let json = r#"{
            "mimeType": "multipart/alternative",
            "parts": [
                {"mimeType": "text/plain", "body": {"data": "aGk", "size": 2}},
                {"mimeType": "text/html", "body": {"data": "PGI-aGk8L2I-"}}
            ]
        }"#;
        let part: MimePart = serde_json::from_str(json).unwrap();
        assert_eq!(part.mime_type.as_deref(), Some("multipart/alternative"));
        let parts = part.parts.unwrap();
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0].body.as_ref().unwrap().data.as_deref(), Some("aGk"));
    }
}
