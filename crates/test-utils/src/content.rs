//! Document content builders for test fixtures.

use nebula_repository_types::{CAPACITY_ATTRIBUTE, DocumentContent, Name};

/// The permission set used by fixtures.
#[must_use]
pub fn public_permissions() -> Name {
    Name::new("/permissions/public/v1").expect("static name is valid")
}

/// Content carrying one `$text` payload attribute.
#[must_use]
pub fn text_content(text: &str) -> DocumentContent {
    DocumentContent::draft(public_permissions()).with_attribute("$text", text)
}

/// Content declaring a bag of the given capacity.
#[must_use]
pub fn bag_content(capacity: u64) -> DocumentContent {
    DocumentContent::draft(public_permissions()).with_attribute(CAPACITY_ATTRIBUTE, capacity)
}

/// Message content carrying one `$payload` attribute.
#[must_use]
pub fn message_content(payload: &str) -> DocumentContent {
    DocumentContent::draft(public_permissions()).with_attribute("$payload", payload)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builders_produce_distinct_tags() {
        assert_ne!(text_content("a").tag, text_content("a").tag);
    }

    #[test]
    fn test_bag_content_declares_capacity() {
        assert_eq!(bag_content(8).capacity(), Some(8));
    }

    #[test]
    fn test_message_content_carries_payload() {
        let content = message_content("$first");
        assert_eq!(
            content.attribute("$payload").and_then(serde_json::Value::as_str),
            Some("$first")
        );
    }
}
