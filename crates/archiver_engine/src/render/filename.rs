use chrono::{DateTime, Utc};

use crate::PostRecord;

const FALLBACK_NAME: &str = "untitled";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilenameOptions {
    pub include_date: bool,
    pub include_author: bool,
    /// Upper bound, in characters, for each sanitized part.
    pub max_part_length: usize,
}

impl Default for FilenameOptions {
    fn default() -> Self {
        Self {
            include_date: true,
            include_author: true,
            max_part_length: 60,
        }
    }
}

/// `yyyy-mm-dd - author - title.md`, with the date and author parts optional.
/// The date is the post's own instant when known, else `archived_at`.
pub fn document_filename(
    record: &PostRecord,
    title: &str,
    archived_at: DateTime<Utc>,
    options: &FilenameOptions,
) -> String {
    let mut parts = Vec::with_capacity(3);
    if options.include_date {
        let date = record.timestamp.parsed.unwrap_or(archived_at);
        parts.push(date.format("%Y-%m-%d").to_string());
    }
    if options.include_author {
        parts.push(sanitize_filename(&record.author.name, options.max_part_length));
    }
    parts.push(sanitize_filename(title, options.max_part_length));
    format!("{}.md", parts.join(" - "))
}

/// Make `input` safe as a single path segment on every common file system:
/// invalid and control characters are removed, whitespace and dash runs
/// collapse, separators and dots are trimmed from both ends and the result
/// is cut to `max_len` characters.
pub fn sanitize_filename(input: &str, max_len: usize) -> String {
    let mut compacted = String::with_capacity(input.len());
    let mut prev: Option<char> = None;
    for c in input.chars() {
        if is_forbidden(c) {
            continue;
        }
        let c = if c.is_whitespace() { ' ' } else { c };
        if (c == ' ' || c == '-' || c == '_') && prev == Some(c) {
            continue;
        }
        compacted.push(c);
        prev = Some(c);
    }

    let mut name: String = trim_separators(&compacted)
        .chars()
        .take(max_len.max(1))
        .collect();
    name = trim_separators(&name).to_string();
    if name.is_empty() {
        name = FALLBACK_NAME.to_string();
    }
    if is_reserved_windows_name(&name) {
        name.push('_');
    }
    name
}

fn trim_separators(s: &str) -> &str {
    s.trim_matches(|c: char| c == ' ' || c == '-' || c == '_' || c == '.' || c.is_whitespace())
}

fn is_forbidden(c: char) -> bool {
    matches!(c,
        '\\' | '/' | ':' | '*' | '?' | '"' | '<' | '>' | '|'
    ) || c.is_control()
}

fn is_reserved_windows_name(name: &str) -> bool {
    const RESERVED: &[&str] = &[
        "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
        "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
    ];
    let stem = name.split('.').next().unwrap_or(name);
    RESERVED.iter().any(|r| r.eq_ignore_ascii_case(stem))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn strips_and_collapses() {
        assert_eq!(sanitize_filename("  My: Title?/Bad  ", 80), "My TitleBad");
        assert_eq!(sanitize_filename("a --- b\t\tc", 80), "a - b c");
        assert_eq!(sanitize_filename("...hidden...", 80), "hidden");
        assert_eq!(sanitize_filename("???", 80), "untitled");
    }

    #[test]
    fn truncation_does_not_leave_trailing_separators() {
        assert_eq!(sanitize_filename("abcd efgh", 5), "abcd");
    }

    #[test]
    fn reserved_names_are_patched() {
        assert_eq!(sanitize_filename("con", 80), "con_");
        assert_eq!(sanitize_filename("LPT1", 80), "LPT1_");
        assert_eq!(sanitize_filename("console", 80), "console");
    }

    proptest! {
        #[test]
        fn output_is_always_a_safe_segment(input in any::<String>(), max_len in 1usize..120) {
            let name = sanitize_filename(&input, max_len);
            prop_assert!(!name.is_empty());
            prop_assert!(!name.chars().any(|c| "<>:\"/\\|?*".contains(c) || c.is_control()));
            prop_assert!(!name.starts_with(char::is_whitespace));
            prop_assert!(!name.ends_with(char::is_whitespace));
            prop_assert!(!name.starts_with('.'));
            prop_assert!(!name.ends_with('.'));
        }
    }
}
