use lazy_static::lazy_static;
use regex::Regex;

/// Tokens that disqualify a submission when they appear anywhere in it.
pub const SPAM_TOKENS: &[&str] = &[
    // Mail header injection
    "bcc:",
    "cc:",
    "%0ato:",
    "\nto:",
    "url:",
    "url=",
    "multipart",
    "content-type",
    // Markup and script injection
    "<a",
    "&lt;a",
    "<script",
    "&lt;script",
    // Unsolicited links
    "http:",
    "https:",
    "ftp:",
    "www.",
    "document.cookie",
    "document.write",
];

lazy_static! {
    static ref SPAM_PATTERN: Regex = {
        let alternatives: Vec<String> = SPAM_TOKENS.iter().map(|t| regex::escape(t)).collect();
        Regex::new(&format!("(?i){}", alternatives.join("|"))).expect("spam token pattern is valid")
    };
}

/// Returns true when any blacklisted token appears in the submitted text.
pub fn detect_spam(text: &str) -> bool {
    match SPAM_PATTERN.find(text) {
        Some(m) => {
            log::debug!("Spam token matched: {:?}", m.as_str());
            true
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_text_passes() {
        assert!(!detect_spam("Hello there, I'd like a quote for 3 chairs."));
        assert!(!detect_spam("Alicealice@example.comHiHello there"));
    }

    #[test]
    fn test_links_are_spam() {
        assert!(detect_spam("visit http://evil.com"));
        assert!(detect_spam("HTTPS://EXAMPLE.COM"));
        assert!(detect_spam("see www.example.com"));
        assert!(detect_spam("ftp://files.example.com"));
    }

    #[test]
    fn test_header_injection_is_spam() {
        assert!(detect_spam("hi\nBcc: victim@example.com"));
        assert!(detect_spam("CC: someone"));
        assert!(detect_spam("x%0ATo: victim@example.com"));
        assert!(detect_spam("line\nto: victim@example.com"));
        assert!(detect_spam("Content-Type: text/html"));
        assert!(detect_spam("MULTIPART/alternative"));
    }

    #[test]
    fn test_markup_is_spam() {
        assert!(detect_spam("<A HREF=\"x\">"));
        assert!(detect_spam("&lt;script&gt;"));
        assert!(detect_spam("document.cookie"));
    }

    #[test]
    fn test_to_without_newline_is_allowed() {
        // Only a newline-prefixed "to:" looks like a header
        assert!(!detect_spam("Reply to: the office"));
    }

    #[test]
    fn test_www_requires_literal_dot() {
        assert!(!detect_spam("awwwX"));
    }
}
