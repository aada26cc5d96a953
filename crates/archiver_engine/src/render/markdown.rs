/// Characters that change meaning anywhere in a markdown line.
const INLINE_SPECIAL: &[char] = &['\\', '`', '*', '_', '[', ']', '<', '>', '|', '~'];

/// Escape markdown syntax in plain post text, line by line. Hashtags and
/// mentions are copied verbatim so they stay live references.
pub fn escape_markdown(text: &str) -> String {
    text.lines()
        .map(escape_line)
        .collect::<Vec<_>>()
        .join("\n")
}

fn escape_line(line: &str) -> String {
    let mut out = String::with_capacity(line.len() + 8);
    let trimmed = line.trim_start();
    let indent = &line[..line.len() - trimmed.len()];
    out.push_str(indent);

    // Block markers only matter at the start of a line.
    let mut rest = trimmed;
    if let Some(first) = rest.chars().next() {
        if matches!(first, '-' | '+' | '=') {
            out.push('\\');
            out.push(first);
            rest = &rest[first.len_utf8()..];
        } else if first == '#' && tag_len(rest) == 0 {
            // `# x`, `##x` and a lone `#` would open a heading.
            out.push_str("\\#");
            rest = &rest[1..];
        } else if let Some(digits_end) = ordered_list_marker(rest) {
            out.push_str(&rest[..digits_end]);
            out.push_str("\\.");
            rest = &rest[digits_end + 1..];
        }
    }

    while let Some(ch) = rest.chars().next() {
        let tag = if matches!(ch, '#' | '@') { tag_len(rest) } else { 0 };
        if tag > 0 {
            out.push_str(&rest[..tag]);
            rest = &rest[tag..];
            continue;
        }
        if INLINE_SPECIAL.contains(&ch) {
            out.push('\\');
        }
        out.push(ch);
        rest = &rest[ch.len_utf8()..];
    }
    out
}

/// Byte length of a `#word` or `@word` token at the start of `text`, or 0
/// when the marker is not followed by a word character.
fn tag_len(text: &str) -> usize {
    let Some(body) = text.strip_prefix(['#', '@']) else {
        return 0;
    };
    let word: usize = body
        .chars()
        .take_while(|&c| c.is_alphanumeric() || matches!(c, '_' | '/' | '-'))
        .map(char::len_utf8)
        .sum();
    if word == 0 {
        0
    } else {
        1 + word
    }
}

/// Byte offset of the `.` in a leading `123.` marker.
fn ordered_list_marker(line: &str) -> Option<usize> {
    let digits = line.chars().take_while(char::is_ascii_digit).count();
    (digits > 0 && line[digits..].starts_with('.')).then_some(digits)
}

/// Turn single newlines into markdown hard breaks (two trailing spaces).
/// Blank lines keep separating paragraphs.
pub fn hard_line_breaks(text: &str) -> String {
    let lines: Vec<&str> = text.lines().collect();
    let mut out = String::with_capacity(text.len() + lines.len() * 2);
    for (index, line) in lines.iter().enumerate() {
        out.push_str(line.trim_end());
        let Some(next) = lines.get(index + 1) else {
            break;
        };
        if !line.trim().is_empty() && !next.trim().is_empty() {
            out.push_str("  ");
        }
        out.push('\n');
    }
    out
}

/// `1234` → `1.2K`, `3_000_000` → `3.0M`; below 1,000 the number is
/// printed as is.
pub fn abbreviate_count(n: u64) -> String {
    if n >= 999_950 {
        format!("{:.1}M", n as f64 / 1_000_000.0)
    } else if n >= 1_000 {
        format!("{:.1}K", n as f64 / 1_000.0)
    } else {
        n.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn escapes_everything_but_tags_and_mentions() {
        assert_eq!(
            escape_markdown("Loving *this* #rustlang with @ferris_crab"),
            "Loving \\*this\\* #rustlang with @ferris_crab"
        );
        assert_eq!(escape_markdown("- not a list\n1. nor this"), "\\- not a list\n1\\. nor this");
    }

    #[test]
    fn tags_and_mentions_are_copied_verbatim() {
        assert_eq!(
            escape_markdown("Hi @ferris_crab see #rust_lang and #wg-async/io_uring*"),
            "Hi @ferris_crab see #rust_lang and #wg-async/io_uring\\*"
        );
        assert_eq!(escape_markdown("#launch_day is here"), "#launch_day is here");
        assert_eq!(escape_markdown("mail me @ home, 100 #"), "mail me @ home, 100 #");
    }

    #[test]
    fn leading_hashes_cannot_open_a_heading() {
        assert_eq!(escape_markdown("# Breaking news"), "\\# Breaking news");
        assert_eq!(escape_markdown("text\n## Media"), "text\n\\## Media");
        assert_eq!(escape_markdown("  #"), "  \\#");
    }

    #[test]
    fn single_newlines_become_hard_breaks() {
        assert_eq!(hard_line_breaks("a\nb\n\nc"), "a  \nb\n\nc");
        assert_eq!(hard_line_breaks("single"), "single");
    }

    #[test]
    fn counts_are_abbreviated_to_one_decimal() {
        assert_eq!(abbreviate_count(999), "999");
        assert_eq!(abbreviate_count(1_000), "1.0K");
        assert_eq!(abbreviate_count(1_234), "1.2K");
        assert_eq!(abbreviate_count(2_500_000), "2.5M");
        assert_eq!(abbreviate_count(999_999), "1.0M");
    }

    proptest! {
        #[test]
        fn tags_survive_any_surrounding_text(
            before in "[ a-z*_]{0,12}",
            tag in "[#@][a-z0-9][a-z0-9_/-]{0,12}",
            after in "[ .,!*]{0,6}",
        ) {
            let line = format!("{before} {tag}{after}");
            prop_assert!(escape_markdown(&line).contains(&tag));
        }

        #[test]
        fn no_line_opens_a_heading(input in any::<String>()) {
            for line in escape_markdown(&input).lines() {
                let line = line.trim_start();
                if line.starts_with('#') {
                    prop_assert!(tag_len(line) > 0, "{line:?}");
                }
            }
        }
    }
}
