//! Turns a [`PostRecord`] and its persisted attachments into a markdown
//! document.
mod filename;
mod frontmatter;
mod markdown;

use std::fmt::Write as _;

use chrono::{DateTime, SecondsFormat, Utc};

use crate::{PostRecord, StoredAttachment};

pub use filename::{document_filename, sanitize_filename, FilenameOptions};
pub use frontmatter::Frontmatter;
pub use markdown::{abbreviate_count, escape_markdown, hard_line_breaks};

pub const UNTITLED_POST: &str = "Untitled post";

#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum RenderError {
    #[error("render failed: {0}")]
    Internal(String),
}

impl From<std::fmt::Error> for RenderError {
    fn from(err: std::fmt::Error) -> Self {
        RenderError::Internal(err.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderOptions {
    pub include_frontmatter: bool,
    pub include_engagement: bool,
    /// Add the original remote link under each embedded attachment.
    pub include_media_links: bool,
    pub max_title_length: usize,
    pub preserve_formatting: bool,
    pub filename: FilenameOptions,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            include_frontmatter: true,
            include_engagement: true,
            include_media_links: false,
            max_title_length: 100,
            preserve_formatting: true,
            filename: FilenameOptions::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredDocument {
    pub frontmatter: Frontmatter,
    pub title: String,
    pub body: String,
    /// Embed targets, relative to the document's folder.
    pub media_references: Vec<String>,
    pub filename: String,
}

impl StoredDocument {
    pub fn to_markdown(&self) -> String {
        let mut out = String::new();
        if !self.frontmatter.is_empty() {
            out.push_str(&self.frontmatter.render());
        }
        out.push_str(&self.body);
        if !out.ends_with('\n') {
            out.push('\n');
        }
        out
    }
}

/// Build the document for `record`. Only `attachments` are embedded, so the
/// result never points at media that was not persisted.
pub fn convert(
    record: &PostRecord,
    attachments: &[StoredAttachment],
    options: &RenderOptions,
    archived_at: DateTime<Utc>,
) -> Result<StoredDocument, RenderError> {
    let title = derive_title(&record.content.text, options.max_title_length);
    let frontmatter = if options.include_frontmatter {
        build_frontmatter(record, attachments, archived_at)
    } else {
        Frontmatter::new()
    };

    let mut body = String::new();
    if options.preserve_formatting {
        writeln!(body, "# {}", escape_markdown(&title))?;
    } else {
        writeln!(body, "# {title}")?;
    }
    writeln!(body)?;

    let text = record.content.text.trim();
    if !text.is_empty() {
        let text = if options.preserve_formatting {
            hard_line_breaks(&escape_markdown(text))
        } else {
            text.to_string()
        };
        writeln!(body, "{text}")?;
    }

    let media_references: Vec<String> = attachments
        .iter()
        .map(|attachment| attachment.relative_path.clone())
        .collect();
    if !attachments.is_empty() {
        writeln!(body)?;
        writeln!(body, "## Media")?;
        writeln!(body)?;
        for attachment in attachments {
            writeln!(body, "![[{}]]", attachment.relative_path)?;
            if let Some(caption) = attachment.media.caption.as_deref() {
                writeln!(body, "*{}*", escape_markdown(caption))?;
            }
            if options.include_media_links {
                writeln!(body, "[Source]({})", attachment.media.source_url)?;
            }
            writeln!(body)?;
        }
    }

    let engagement = &record.engagement;
    if options.include_engagement && !engagement.is_empty() {
        if !body.ends_with("\n\n") {
            writeln!(body)?;
        }
        writeln!(body, "## Engagement")?;
        writeln!(body)?;
        for (label, value) in [
            ("Likes", engagement.likes),
            ("Comments", engagement.comments),
            ("Shares", engagement.shares),
            ("Views", engagement.views),
        ] {
            if let Some(value) = value {
                writeln!(body, "- {label}: {}", abbreviate_count(value))?;
            }
        }
    }

    let body = format!("{}\n", body.trim_end());
    let filename = document_filename(record, &title, archived_at, &options.filename);
    Ok(StoredDocument {
        frontmatter,
        title,
        body,
        media_references,
        filename,
    })
}

fn build_frontmatter(
    record: &PostRecord,
    attachments: &[StoredAttachment],
    archived_at: DateTime<Utc>,
) -> Frontmatter {
    let mut fm = Frontmatter::new();
    fm.set("platform", record.platform.display_name());
    fm.set("archived", rfc3339(archived_at));
    fm.set("url", record.source_urls.preferred());
    if record.source_urls.canonical.is_some() {
        fm.set("post_url", record.source_urls.post.as_str());
    }
    fm.set("author", record.author.name.as_str());
    fm.set_opt("author_username", record.author.username.as_deref());
    fm.set_opt("author_url", record.author.profile_url.as_deref());

    match record.timestamp.parsed {
        Some(parsed) => fm.set("posted", rfc3339(parsed)),
        None if !record.timestamp.raw.trim().is_empty() => {
            fm.set("posted", record.timestamp.raw.trim())
        }
        None => {}
    }

    fm.set("post_type", record.flags.post_type.as_str());
    if record.flags.sponsored {
        fm.set("sponsored", "true");
    }
    if !attachments.is_empty() {
        fm.set("media_count", attachments.len().to_string());
    }
    if attachments.iter().any(StoredAttachment::is_video) {
        fm.set("has_video", "true");
    }
    fm.set("id", record.id.as_str());
    fm
}

fn rfc3339(instant: DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// First non-empty line, whitespace-normalized and cut to `max_len`
/// characters with a trailing ellipsis.
pub fn derive_title(text: &str, max_len: usize) -> String {
    let first_line = text
        .lines()
        .map(crate::normalize_whitespace)
        .find(|line| !line.is_empty());
    let Some(line) = first_line else {
        return UNTITLED_POST.to_string();
    };
    if line.chars().count() <= max_len {
        return line;
    }
    let keep = max_len.saturating_sub(1);
    let mut cut: String = line.chars().take(keep).collect();
    cut.truncate(cut.trim_end().len());
    cut.push('…');
    cut
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn title_is_first_line_with_ellipsis() {
        assert_eq!(derive_title("\n  Hello   world \nrest", 100), "Hello world");
        assert_eq!(derive_title("abcdefghij", 5), "abcd…");
        assert_eq!(derive_title("abc defghij", 5), "abc…");
        assert_eq!(derive_title("   \n", 10), UNTITLED_POST);
    }
}
