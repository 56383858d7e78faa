use lazy_static::lazy_static;
use regex::Regex;

/// Maximum length of a normalized folder path
pub const MAX_FOLDER_PATH_LENGTH: usize = 500;

lazy_static! {
    /// Regex for a single folder path segment
    /// Must start with a letter or digit; may contain letters, digits, spaces, `_`, `.`, `-`
    /// - Valid: "guides", "Term 1", "v2.0", "year-7_maths"
    /// - Invalid: "", ".hidden", "..", "-draft", "a/b"
    pub static ref FOLDER_SEGMENT_REGEX: Regex =
        Regex::new(r"^[A-Za-z0-9][A-Za-z0-9 _.\-]*$").unwrap();
}

/// Normalize a folder path from user input.
///
/// Trims whitespace and surrounding slashes; a blank path means "no folder".
/// Every segment is trimmed and must match [`FOLDER_SEGMENT_REGEX`].
pub fn normalize_folder_path(raw: &str) -> Result<Option<String>, String> {
    let trimmed = raw.trim().trim_matches('/');
    if trimmed.is_empty() {
        return Ok(None);
    }

    let mut segments = Vec::new();
    for segment in trimmed.split('/') {
        let segment = segment.trim();
        if segment.is_empty() {
            return Err("folder_path must not contain empty segments".to_string());
        }
        if segment == ".." || !FOLDER_SEGMENT_REGEX.is_match(segment) {
            return Err(format!("folder_path segment '{}' is not allowed", segment));
        }
        segments.push(segment);
    }

    let normalized = segments.join("/");
    if normalized.len() > MAX_FOLDER_PATH_LENGTH {
        return Err(format!(
            "folder_path must not exceed {} characters",
            MAX_FOLDER_PATH_LENGTH
        ));
    }

    Ok(Some(normalized))
}

/// Whether a URL uses the http or https scheme
pub fn is_http_url(url: &str) -> bool {
    let lower = url.trim().to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_folder_segment_regex_valid() {
        assert!(FOLDER_SEGMENT_REGEX.is_match("guides"));
        assert!(FOLDER_SEGMENT_REGEX.is_match("Term 1"));
        assert!(FOLDER_SEGMENT_REGEX.is_match("v2.0"));
        assert!(FOLDER_SEGMENT_REGEX.is_match("year-7_maths"));
    }

    #[test]
    fn test_folder_segment_regex_invalid() {
        assert!(!FOLDER_SEGMENT_REGEX.is_match("")); // empty
        assert!(!FOLDER_SEGMENT_REGEX.is_match(".hidden")); // starts with dot
        assert!(!FOLDER_SEGMENT_REGEX.is_match("-draft")); // starts with hyphen
        assert!(!FOLDER_SEGMENT_REGEX.is_match("a/b")); // separator
        assert!(!FOLDER_SEGMENT_REGEX.is_match("notes?")); // punctuation
    }

    #[test]
    fn test_normalize_folder_path() {
        assert_eq!(normalize_folder_path("").unwrap(), None);
        assert_eq!(normalize_folder_path("  / ").unwrap(), None);
        assert_eq!(
            normalize_folder_path("/guides/onboarding/").unwrap().as_deref(),
            Some("guides/onboarding")
        );
        assert_eq!(
            normalize_folder_path(" Term 1 / week 2 ").unwrap().as_deref(),
            Some("Term 1/week 2")
        );
    }

    #[test]
    fn test_normalize_folder_path_rejects_bad_segments() {
        assert!(normalize_folder_path("guides//onboarding").is_err());
        assert!(normalize_folder_path("guides/../secret").is_err());
        assert!(normalize_folder_path("guides/.git").is_err());
        assert!(normalize_folder_path(&"a/".repeat(300)).is_err());
    }

    #[test]
    fn test_is_http_url() {
        assert!(is_http_url("https://example.com/doc.pdf"));
        assert!(is_http_url("HTTP://example.com"));
        assert!(!is_http_url("ftp://example.com"));
        assert!(!is_http_url("javascript:alert(1)"));
    }
}
