// Small helpers shared by handlers and services

use serde::{Deserialize, Deserializer};

/// First `max_chars` characters of `text`, with an ellipsis when cut
pub fn content_preview(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => format!("{}...", &text[..byte_idx]),
        None => text.to_string(),
    }
}

/// Mask email address for logs
pub fn mask_email(email: &str) -> String {
    if let Some(at_pos) = email.find('@') {
        let local = &email[..at_pos];
        let domain = &email[at_pos..];

        let mut chars = local.chars();
        match (chars.next(), chars.next(), chars.next()) {
            (Some(a), Some(b), Some(_)) => format!("{}{}***{}", a, b, domain),
            _ => email.to_string(),
        }
    } else {
        email.to_string()
    }
}

/// Only same-site paths are accepted as post-login destinations
pub fn sanitize_return_path(raw: Option<&str>) -> String {
    match raw.map(str::trim) {
        Some(path) if path.starts_with('/') && !path.starts_with("//") && !path.contains('\\') => {
            path.to_string()
        }
        _ => "/".to_string(),
    }
}

/// Lets `Option<Option<T>>` tell an explicit `null` apart from a missing field.
/// Use together with `#[serde(default)]`.
pub fn deserialize_some<'de, T, D>(deserializer: D) -> Result<Option<T>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    T::deserialize(deserializer).map(Some)
}
