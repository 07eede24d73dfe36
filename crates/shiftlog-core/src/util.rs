//! Shared utility functions used across multiple modules.

use chrono::{DateTime, Duration, Utc};
use serde::Serializer;

/// Normalize optional text by trimming whitespace and removing empties.
///
/// Returns `None` when the input is `None` or the trimmed value is empty.
pub fn normalize_text_option(value: Option<String>) -> Option<String> {
    let value = value?;
    let value = value.trim();
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

/// Check if a string starts with `http://` or `https://`.
pub fn is_http_url(value: &str) -> bool {
    value.starts_with("http://") || value.starts_with("https://")
}

/// Truncate text to at most 180 characters for error messages.
pub fn compact_text(value: &str) -> String {
    value.trim().chars().take(180).collect()
}

/// Encode an instant as integer microseconds for storage.
pub fn to_storage_micros(at: DateTime<Utc>) -> i64 {
    at.timestamp_micros()
}

/// Decode a stored microsecond timestamp.
pub fn from_storage_micros(micros: i64) -> crate::Result<DateTime<Utc>> {
    DateTime::from_timestamp_micros(micros).ok_or_else(|| {
        crate::Error::Database(format!("stored timestamp out of range: {micros}"))
    })
}

/// Serialize a duration as whole milliseconds.
pub fn serialize_millis<S: Serializer>(
    duration: &Duration,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_i64(duration.num_milliseconds())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_text_option_rejects_empty() {
        assert_eq!(normalize_text_option(None), None);
        assert_eq!(normalize_text_option(Some("   ".to_string())), None);
    }

    #[test]
    fn normalize_text_option_trims_value() {
        assert_eq!(
            normalize_text_option(Some(" https://example.com ".to_string())),
            Some("https://example.com".to_string())
        );
    }

    #[test]
    fn is_http_url_accepts_valid_schemes() {
        assert!(is_http_url("http://localhost"));
        assert!(is_http_url("https://example.com"));
        assert!(!is_http_url("ftp://example.com"));
        assert!(!is_http_url("example.com"));
    }

    #[test]
    fn storage_micros_keep_sub_millisecond_precision() {
        let at = DateTime::from_timestamp_micros(1_700_000_000_123_457).unwrap();
        let stored = to_storage_micros(at);
        assert_eq!(from_storage_micros(stored).unwrap(), at);
    }
}
