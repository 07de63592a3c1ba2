/// GitHub rejects comment bodies above 65 536 characters; keep headroom for the marker.
pub const GITHUB_COMMENT_MAX_CHARS: usize = 65_000;

const TRUNCATION_MARKER: &str = "\n\n_(output truncated)_";

/// Truncate error text for inclusion in comments and log lines.
pub fn truncate_for_error(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut truncated = text.chars().take(max_chars).collect::<String>();
    truncated.push_str("...");
    truncated
}

/// Clamp a comment body to `max_chars`, appending a visible marker when cut.
pub fn truncate_comment_body(body: &str, max_chars: usize) -> String {
    if body.chars().count() <= max_chars {
        return body.to_string();
    }
    let keep = max_chars.saturating_sub(TRUNCATION_MARKER.chars().count());
    let mut truncated = body.chars().take(keep).collect::<String>();
    truncated.push_str(TRUNCATION_MARKER);
    truncated
}

/// First line of a multi-line message, trimmed.
pub fn first_line(text: &str) -> &str {
    text.lines().next().unwrap_or_default().trim()
}

#[cfg(test)]
mod tests {
    use super::{first_line, truncate_comment_body, truncate_for_error};

    #[test]
    fn unit_truncate_for_error_keeps_short_text() {
        assert_eq!(truncate_for_error("boom", 10), "boom");
        assert_eq!(truncate_for_error("", 10), "");
    }

    #[test]
    fn functional_truncate_for_error_counts_chars_not_bytes() {
        let truncated = truncate_for_error("构建失败了很多次", 4);
        assert_eq!(truncated, "构建失败...");
    }

    #[test]
    fn functional_truncate_comment_body_respects_limit() {
        let body = "x".repeat(200);
        let truncated = truncate_comment_body(&body, 100);
        assert_eq!(truncated.chars().count(), 100);
        assert!(truncated.ends_with("_(output truncated)_"));
        assert_eq!(truncate_comment_body("short", 100), "short");
    }

    #[test]
    fn regression_first_line_handles_empty_and_crlf_messages() {
        assert_eq!(first_line(""), "");
        assert_eq!(first_line("fix: parser\r\n\nbody"), "fix: parser");
        assert_eq!(first_line("  single  "), "single");
    }
}
