//! Small string formatters for CLI output.

/// First 8 chars of a UUID string for list display.
pub fn short_id(id: &str) -> &str {
    id.get(..8).unwrap_or(id)
}

/// Truncate a string with unicode ellipsis.
pub fn truncate_ellipsis(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(1)).collect();
        format!("{kept}\u{2026}")
    }
}

/// Format a count with a label: "3 tools", "1 pattern".
pub fn count_label(n: usize, singular: &str, plural: &str) -> String {
    if n == 1 {
        format!("{n} {singular}")
    } else {
        format!("{n} {plural}")
    }
}
