//! # Engine Primitives
//!
//! Fixed limits and wire constants for the catalog engine.
//! These are compiled in and immutable at runtime.

/// Separator between tag name and count in a tag delta (`"crow,2"`).
pub const TAG_DELTA_SEPARATOR: char = ',';

/// Maximum length of a tag name in bytes.
///
/// Deltas and insert payloads with longer names are rejected.
pub const MAX_TAG_NAME_LENGTH: usize = 128;

/// Maximum number of tags named by a single query.
pub const MAX_QUERY_TAGS: usize = 256;

/// Maximum number of links processed by one tag edit or delete request.
pub const MAX_BATCH_LINKS: usize = 1000;

/// Maximum length of a record identifier or link in bytes.
pub const MAX_LINK_LENGTH: usize = 2048;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delta_separator_is_comma() {
        assert_eq!(TAG_DELTA_SEPARATOR, ',');
    }

    #[test]
    fn limits_are_ordered() {
        assert!(MAX_TAG_NAME_LENGTH < MAX_LINK_LENGTH);
        assert!(MAX_QUERY_TAGS <= MAX_BATCH_LINKS);
    }
}
