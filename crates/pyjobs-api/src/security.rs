//! Input validation for user-supplied links and free text.
//!
//! Challenge responses and profile links are shown to companies as clickable
//! links, so only absolute http(s) URLs to public hosts are accepted.

use std::sync::LazyLock;

use regex_lite::Regex;
use url::Url;

/// Maximum URL length.
pub const MAX_URL_LENGTH: usize = 2048;

/// Maximum feedback length.
pub const MAX_FEEDBACK_LENGTH: usize = 5000;

/// Hosts that never make sense in a link shown to someone else.
static BLOCKED_HOSTS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"^localhost$",
        r"^127\.",
        r"^10\.",
        r"^172\.(1[6-9]|2[0-9]|3[0-1])\.",
        r"^192\.168\.",
        r"^169\.254\.",
        r"^\[::1\]$",
        r"^0\.0\.0\.0$",
    ]
    .iter()
    .filter_map(|p| Regex::new(p).ok())
    .collect()
});

/// Result of link validation.
#[derive(Debug, PartialEq, Eq)]
pub enum LinkValidation {
    /// Link is valid; carries the trimmed link.
    Valid(String),
    /// Link is empty, malformed or uses an unsupported scheme.
    Invalid(String),
    /// Link points to a private or loopback host.
    Blocked(String),
    /// Link exceeds maximum length.
    TooLong,
}

impl LinkValidation {
    /// Convert to Result for easy error handling.
    pub fn into_result(self) -> Result<String, String> {
        match self {
            Self::Valid(link) => Ok(link),
            Self::Invalid(msg) => Err(msg),
            Self::Blocked(host) => Err(format!("Links to '{}' are not allowed", host)),
            Self::TooLong => Err(format!("URL exceeds maximum length of {} characters", MAX_URL_LENGTH)),
        }
    }
}

/// Validate a link a user wants to show to someone else.
pub fn validate_public_link(link: &str) -> LinkValidation {
    if link.len() > MAX_URL_LENGTH {
        return LinkValidation::TooLong;
    }

    let link = link.trim();
    if link.is_empty() {
        return LinkValidation::Invalid("URL cannot be empty".to_string());
    }

    let parsed = match Url::parse(link) {
        Ok(u) => u,
        Err(e) => return LinkValidation::Invalid(format!("Invalid URL format: {}", e)),
    };

    if !matches!(parsed.scheme(), "http" | "https") {
        return LinkValidation::Invalid(format!("Unsupported URL scheme: {}", parsed.scheme()));
    }

    let Some(host) = parsed.host_str() else {
        return LinkValidation::Invalid("URL must include a host".to_string());
    };
    let host = host.to_lowercase();
    if BLOCKED_HOSTS.iter().any(|re| re.is_match(&host)) {
        return LinkValidation::Blocked(host);
    }

    LinkValidation::Valid(link.to_string())
}

/// Turn an optional form field into `None` when blank.
pub fn non_blank(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

/// Local redirect target, or `/` for anything that could leave the site.
pub fn safe_next(next: Option<&str>) -> String {
    match next {
        Some(n) if n.starts_with('/') && !n.starts_with("//") && !n.contains('\\') => n.to_string(),
        _ => "/".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_public_links() {
        assert_eq!(
            validate_public_link(" https://github.com/ana/challenge "),
            LinkValidation::Valid("https://github.com/ana/challenge".to_string())
        );
        assert!(validate_public_link("http://example.com/x?y=1").into_result().is_ok());
    }

    #[test]
    fn test_rejects_bad_links() {
        assert!(matches!(validate_public_link(""), LinkValidation::Invalid(_)));
        assert!(matches!(validate_public_link("github.com/ana"), LinkValidation::Invalid(_)));
        assert!(matches!(validate_public_link("ftp://example.com"), LinkValidation::Invalid(_)));
        assert!(matches!(validate_public_link("javascript:alert(1)"), LinkValidation::Invalid(_)));
        assert!(matches!(validate_public_link("http://localhost:3000"), LinkValidation::Blocked(_)));
        assert!(matches!(validate_public_link("http://192.168.0.10/"), LinkValidation::Blocked(_)));

        let long = format!("https://example.com/{}", "a".repeat(MAX_URL_LENGTH));
        assert_eq!(validate_public_link(&long), LinkValidation::TooLong);
    }

    #[test]
    fn test_safe_next() {
        assert_eq!(safe_next(Some("/job/abc/")), "/job/abc/");
        assert_eq!(safe_next(Some("//evil.example")), "/");
        assert_eq!(safe_next(Some("https://evil.example")), "/");
        assert_eq!(safe_next(None), "/");
    }

    #[test]
    fn test_non_blank() {
        assert_eq!(non_blank(Some("  ".to_string())), None);
        assert_eq!(non_blank(Some(" x ".to_string())), Some("x".to_string()));
    }
}
