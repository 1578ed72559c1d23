//! Shared utility functions

/// Truncate a string to at most `max_chars` characters, appending "..." if
/// truncated.
pub fn truncate_str(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        return s.to_string();
    }
    let suffix = "...";
    let keep = max_chars.saturating_sub(suffix.len());
    let truncated: String = s.chars().take(keep).collect();
    format!("{}{}", truncated, suffix)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_str() {
        assert_eq!(truncate_str("short", 10), "short");
        assert_eq!(truncate_str("a long article title", 10), "a long ...");
        assert_eq!(truncate_str("Ünïcödé Ärticle", 8), "Ünïcö...");
    }
}
