//! Bounded-length text helpers
//!
//! Persisted diagnostic fields (error messages, raw row payloads) have a hard
//! character bound that is enforced here rather than by the storage engine, so
//! every back-end stores exactly the same text.

/// Maximum characters stored for an import error message.
pub const MAX_ERROR_MESSAGE_CHARS: usize = 1000;

/// Maximum characters stored for a raw row payload.
pub const MAX_ROW_DATA_CHARS: usize = 2000;

/// Truncate `value` to at most `max_chars` Unicode scalar values.
///
/// Never splits a multi-byte character.
pub fn truncate_chars(value: &str, max_chars: usize) -> String {
    match value.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => value[..byte_idx].to_string(),
        None => value.to_string(),
    }
}

/// Truncate an error message to [`MAX_ERROR_MESSAGE_CHARS`].
pub fn bounded_error_message(value: &str) -> String {
    truncate_chars(value, MAX_ERROR_MESSAGE_CHARS)
}

/// Truncate a raw row payload to [`MAX_ROW_DATA_CHARS`].
pub fn bounded_row_data(value: &str) -> String {
    truncate_chars(value, MAX_ROW_DATA_CHARS)
}
