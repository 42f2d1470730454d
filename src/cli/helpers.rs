//! Shared helper functions for CLI commands

use chrono::{DateTime, Local, Utc};

/// Truncate a string to max_len characters, adding "..." if truncated
pub fn truncate_str(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

/// Local-time rendering of a stored UTC timestamp
pub fn format_local(ts: &DateTime<Utc>) -> String {
    ts.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string()
}

/// `"in_progress"` -> `"In Progress"`
pub fn humanize(value: &str) -> String {
    value
        .split('_')
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

/// Fixed-width placeholder for a configured secret; reveals neither content nor length
pub fn mask_secret(secret: &str) -> String {
    if secret.is_empty() {
        String::new()
    } else {
        "********".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_str() {
        assert_eq!(truncate_str("hello", 10), "hello");
        assert_eq!(truncate_str("hello world", 8), "hello...");
        assert_eq!(truncate_str("hi", 2), "hi");
    }

    #[test]
    fn test_truncate_str_multibyte() {
        assert_eq!(truncate_str("Ops → Dev → QA", 9), "Ops → ...");
    }

    #[test]
    fn test_humanize() {
        assert_eq!(humanize("in_progress"), "In Progress");
        assert_eq!(humanize("open"), "Open");
        assert_eq!(humanize("not_run"), "Not Run");
    }

    #[test]
    fn test_mask_secret() {
        assert_eq!(mask_secret("hunter2"), "********");
        assert_eq!(mask_secret("a-much-longer-password"), "********");
        assert!(!mask_secret("hunter2").contains("hu"));
        assert_eq!(mask_secret(""), "");
    }
}
