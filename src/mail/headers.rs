//! Header and address parsing for raw `"Name <addr>"` strings.
//!
//! All of these are total functions: malformed or empty input yields
//! `None`/empty, never an error. Header lists from the provider are tiny
//! (a dozen entries), so lookup stays a linear scan.

use crate::provider::MessageHeader;

/// Case-insensitive header lookup. First match wins.
pub fn header_value<'a>(headers: &'a [MessageHeader], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|h| h.name.eq_ignore_ascii_case(name))
        .map(|h| h.value.as_str())
}

/// Pull the bare address out of a raw header value.
///
/// `"Jane Doe <jane@acme.com>"` → `"jane@acme.com"`; a plain address comes
/// back trimmed as-is. Empty input yields an empty string.
pub fn extract_address(raw: &str) -> String {
    let raw = raw.trim();
    if let Some(start) = raw.rfind('<') {
        if let Some(end) = raw.rfind('>') {
            if end > start {
                return raw[start + 1..end].trim().to_string();
            }
        }
    }
    raw.to_string()
}

/// Pull a display name out of a raw header value.
///
/// Uses the text before `<...>` when present (quotes stripped); otherwise
/// derives a name from the address local part: `"jane.doe@x"` → `"Jane Doe"`.
pub fn extract_display_name(raw: &str) -> Option<String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Some(start) = raw.rfind('<') {
        let name = raw[..start].trim().trim_matches('"').trim();
        if !name.is_empty() {
            return Some(name.to_string());
        }
    }

    name_from_address(&extract_address(raw))
}

/// Derive a human-ish name from an address local part.
///
/// Splits on `.` and `_`, title-cases each segment. `None` when the address
/// has no local part worth using.
pub fn name_from_address(address: &str) -> Option<String> {
    let local = address.split('@').next()?.trim();
    if local.is_empty() {
        return None;
    }

    let name = local
        .split(['.', '_'])
        .filter(|s| !s.is_empty())
        .map(title_case)
        .collect::<Vec<_>>()
        .join(" ");

    if name.is_empty() { None } else { Some(name) }
}

/// Company guess from the address domain: first label, title-cased.
/// `"sales@acme.com"` → `"Acme"`.
pub fn company_from_email(address: &str) -> Option<String> {
    let domain = address.split('@').nth(1)?.trim();
    let label = domain.split('.').next()?.trim();
    if label.is_empty() {
        return None;
    }
    Some(title_case(label))
}

fn title_case(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(name: &str, value: &str) -> MessageHeader {
        MessageHeader {
            name: name.to_string(),
            value: value.to_string(),
        }
    }

    #[test]
    fn header_lookup_is_case_insensitive() {
        let headers = vec![header("From", "a@b.c"), header("Subject", "Hi")];
        assert_eq!(header_value(&headers, "from"), Some("a@b.c"));
        assert_eq!(header_value(&headers, "SUBJECT"), Some("Hi"));
        assert_eq!(header_value(&headers, "Date"), None);
        assert_eq!(header_value(&[], "From"), None);
    }

    #[test]
    fn address_from_angle_brackets() {
        assert_eq!(
            extract_address("Jane Doe <jane@acme.com>"),
            "jane@acme.com"
        );
        assert_eq!(extract_address("  jane@acme.com  "), "jane@acme.com");
        assert_eq!(extract_address(""), "");
        // Unclosed bracket falls back to the raw value
        assert_eq!(extract_address("Jane <jane@acme.com"), "Jane <jane@acme.com");
    }

    #[test]
    fn display_name_before_brackets() {
        assert_eq!(
            extract_display_name("Jane Doe <jane@acme.com>").as_deref(),
            Some("Jane Doe")
        );
        assert_eq!(
            extract_display_name("\"Doe, Jane\" <jane@acme.com>").as_deref(),
            Some("Doe, Jane")
        );
    }

    #[test]
    fn display_name_derived_from_local_part() {
        assert_eq!(
            extract_display_name("jane.doe@acme.com").as_deref(),
            Some("Jane Doe")
        );
        assert_eq!(
            extract_display_name("jane_q_doe@acme.com").as_deref(),
            Some("Jane Q Doe")
        );
        assert_eq!(extract_display_name("").as_deref(), None);
    }

    #[test]
    fn company_from_domain() {
        assert_eq!(company_from_email("sales@acme.com").as_deref(), Some("Acme"));
        assert_eq!(
            company_from_email("x@BIGCORP.co.uk").as_deref(),
            Some("Bigcorp")
        );
        assert_eq!(company_from_email("no-domain"), None);
        assert_eq!(company_from_email(""), None);
    }
}
