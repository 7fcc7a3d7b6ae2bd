//! Input validation for repository boundary arguments.
//!
//! Validators are used at the public API boundary before any storage work
//! happens, so malformed input fails with a structured error instead of a
//! half-performed operation.
//!
//! ## Character Whitelists
//!
//! - Name segments: `[A-Za-z0-9.-]` - safe for storage paths, URLs, and logs.
//! - Tags: the 32-character base-32 alphabet, optional `#` sigil.
//! - Versions: dot-separated positive integers, optional `v` prefix.

use std::fmt;

/// Maximum byte length of a name's textual form.
pub const MAX_NAME_BYTES: usize = 256;

/// Validation error with structured context.
///
/// Contains the field that failed and the constraint that was violated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// The field that failed validation.
    pub field: String,
    /// Description of the violated constraint.
    pub constraint: String,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.constraint)
    }
}

impl std::error::Error for ValidationError {}

/// Validates a hierarchical name.
///
/// Names must:
/// - Be non-empty and at most [`MAX_NAME_BYTES`] bytes
/// - Start with `/`
/// - Consist of non-empty segments of `[A-Za-z0-9.-]`
///
/// # Errors
///
/// Returns [`ValidationError`] naming the violated constraint.
pub fn validate_name(name: &str) -> Result<(), ValidationError> {
    let error = |constraint: String| ValidationError { field: "name".to_string(), constraint };

    if name.is_empty() {
        return Err(error("must not be empty".to_string()));
    }
    if name.len() > MAX_NAME_BYTES {
        return Err(error(format!(
            "length {} bytes exceeds maximum {} bytes",
            name.len(),
            MAX_NAME_BYTES
        )));
    }
    let Some(rest) = name.strip_prefix('/') else {
        return Err(error("must start with '/'".to_string()));
    };
    for segment in rest.split('/') {
        if segment.is_empty() {
            return Err(error("segments must not be empty".to_string()));
        }
        if let Some(bad) = segment.chars().find(|c| !is_segment_char(*c)) {
            return Err(error(format!(
                "segment {segment:?} contains invalid character {bad:?}; allowed: [A-Za-z0-9.-]"
            )));
        }
    }
    Ok(())
}

/// Returns true for characters allowed inside a name segment.
#[inline]
fn is_segment_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '.' || c == '-'
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_typical_names() {
        for name in ["/a", "/nebula/examples/Queue/v1", "/x-y/z.9"] {
            assert!(validate_name(name).is_ok(), "should accept {name}");
        }
    }

    #[test]
    fn test_rejects_missing_leading_slash() {
        let err = validate_name("nope").expect_err("missing slash");
        assert!(err.constraint.contains("start with"));
    }

    #[test]
    fn test_rejects_empty_segments() {
        assert!(validate_name("/a//b").is_err());
        assert!(validate_name("/a/").is_err());
        assert!(validate_name("/").is_err());
    }

    #[test]
    fn test_rejects_invalid_characters() {
        let err = validate_name("/has space").expect_err("space");
        assert!(err.constraint.contains("invalid character"));
        assert!(validate_name("/uni\u{e9}code").is_err());
    }

    #[test]
    fn test_rejects_oversized_names() {
        let long = format!("/{}", "a".repeat(MAX_NAME_BYTES));
        assert!(validate_name(&long).is_err());
    }

    #[test]
    fn test_error_display_includes_field() {
        let err = validate_name("bad").expect_err("invalid");
        assert!(err.to_string().starts_with("name: "));
    }
}
