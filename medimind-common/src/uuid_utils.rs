//! UUID utilities
//!
//! Row identifiers are UUID v4 rendered as lowercase hyphenated strings.

use uuid::Uuid;

/// Generate a new UUIDv4 as a storage id
pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}

/// True if `s` is a well-formed UUID
pub fn is_valid_id(s: &str) -> bool {
    Uuid::parse_str(s).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_ids_are_unique_and_valid() {
        let a = new_id();
        let b = new_id();
        assert_ne!(a, b);
        assert!(is_valid_id(&a));
        assert_eq!(Uuid::parse_str(&a).unwrap().get_version_num(), 4);
    }

    #[test]
    fn test_invalid_id_rejected() {
        assert!(!is_valid_id("not-a-uuid"));
        assert!(!is_valid_id(""));
    }
}
