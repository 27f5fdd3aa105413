//! Shared utility functions for provider adapters.

use lc_domain::error::Error;

/// Convert a [`reqwest::Error`] into the domain [`Error`] type.
///
/// Timeout errors map to [`Error::Timeout`]; everything else maps to
/// [`Error::Http`].
pub(crate) fn from_reqwest(e: reqwest::Error) -> Error {
    if e.is_timeout() {
        Error::Timeout(e.to_string())
    } else {
        Error::Http(e.to_string())
    }
}

/// Mask substrings that look like API keys or bearer tokens in an error
/// message. Prevents raw secrets from leaking into logs or error bodies.
pub fn mask_secrets(msg: &str) -> String {
    let mut result = msg.to_string();
    for word in msg.split(|c: char| c.is_whitespace() || c == '\'' || c == '"' || c == ',') {
        let trimmed = word.trim();
        if trimmed.len() >= 20
            && trimmed
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            let masked = if trimmed.len() > 8 {
                format!("{}...{}", &trimmed[..4], &trimmed[trimmed.len() - 4..])
            } else {
                "***masked***".to_string()
            };
            result = result.replace(trimmed, &masked);
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn masks_long_alphanumeric_tokens() {
        let msg = "unauthorized: key sk-ant-REDACTED rejected";
        let masked = mask_secrets(msg);
        assert!(!masked.contains("abcdefghijklmnopqrstuvwxyz"));
        assert!(masked.contains("sk-a...wxyz") || masked.contains("***masked***"));
    }

    #[test]
    fn leaves_short_words_alone() {
        let msg = "provider anthropic returned HTTP 401";
        assert_eq!(mask_secrets(msg), msg);
    }
}
