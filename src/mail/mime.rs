//! MIME body extraction from a provider part tree.
//!
//! The payload is a recursive multipart structure; text content hides at
//! arbitrary depth behind `multipart/alternative`, `multipart/mixed`, and
//! friends. The walk visits every node, decodes base64url body data, and
//! keeps the last `text/plain` and `text/html` bodies it sees.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use tracing::debug;

use crate::provider::MimePart;

/// Decoded text bodies pulled out of one message's part tree.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedBodies {
    pub text: String,
    pub html: String,
}

impl ExtractedBodies {
    pub fn is_empty(&self) -> bool {
        self.text.is_empty() && self.html.is_empty()
    }
}

/// Walk the part tree and collect plain-text and HTML bodies.
///
/// Last writer wins per content type: a later part of the same type
/// replaces the earlier one. Decode failures skip the node and continue;
/// the result may legitimately be empty, in which case the caller falls
/// back to the message-level snippet.
pub fn extract_bodies(root: &MimePart) -> ExtractedBodies {
    let mut bodies = ExtractedBodies::default();
    collect(root, &mut bodies);
    bodies
}

fn collect(part: &MimePart, bodies: &mut ExtractedBodies) {
    let mime_type = part
        .mime_type
        .as_deref()
        .unwrap_or("")
        .to_ascii_lowercase();

    if let Some(data) = part.body.as_ref().and_then(|b| b.data.as_deref()) {
        if !data.is_empty() {
            match decode_body_data(data) {
                Ok(decoded) => match mime_type.as_str() {
                    "text/plain" => bodies.text = decoded,
                    "text/html" => bodies.html = decoded,
                    _ => {}
                },
                Err(e) => {
                    debug!(mime_type = %mime_type, "Skipping undecodable part: {e}");
                }
            }
        }
    }

    // Recurse regardless of whether this node carried data
    if let Some(parts) = &part.parts {
        for child in parts {
            collect(child, bodies);
        }
    }
}

/// Decode a base64url (no padding) body into UTF-8 text.
fn decode_body_data(data: &str) -> Result<String, String> {
    let bytes = URL_SAFE_NO_PAD
        .decode(data)
        .map_err(|e| format!("base64: {e}"))?;
    String::from_utf8(bytes).map_err(|e| format!("utf8: {e}"))
}
