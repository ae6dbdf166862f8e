//! Identifier helpers.

use regex::Regex;
use std::sync::LazyLock;

static UUID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}$")
        .expect("UUID pattern is valid")
});

/// Whether `value` is a syntactically valid UUID.
///
/// The API rejects malformed record ids with a validation error rather than
/// a not-found, so callers check before issuing lookups.
pub fn is_uuid(value: &str) -> bool {
    UUID.is_match(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_uuid() {
        assert!(is_uuid("0a1b2c3d-4e5f-4a6b-8c7d-9e0f1a2b3c4d"));
        assert!(is_uuid("0A1B2C3D-4E5F-4A6B-8C7D-9E0F1A2B3C4D"));
    }

    #[test]
    fn test_is_uuid_rejects_malformed() {
        assert!(!is_uuid(""));
        assert!(!is_uuid("not-a-uuid"));
        assert!(!is_uuid("0a1b2c3d4e5f4a6b8c7d9e0f1a2b3c4d"));
        assert!(!is_uuid("0a1b2c3d-4e5f-4a6b-8c7d-9e0f1a2b3c4d-extra"));
        assert!(!is_uuid("{{ record.id }}"));
    }
}
