use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

/// Content sources the archiver knows how to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Platform {
    Facebook,
    LinkedIn,
    Twitter,
    Reddit,
}

impl Platform {
    pub const ALL: [Platform; 4] = [
        Platform::Facebook,
        Platform::LinkedIn,
        Platform::Twitter,
        Platform::Reddit,
    ];

    /// Human facing name, also used as the top level archive folder.
    pub fn display_name(self) -> &'static str {
        match self {
            Platform::Facebook => "Facebook",
            Platform::LinkedIn => "LinkedIn",
            Platform::Twitter => "X",
            Platform::Reddit => "Reddit",
        }
    }

    pub fn slug(self) -> &'static str {
        match self {
            Platform::Facebook => "facebook",
            Platform::LinkedIn => "linkedin",
            Platform::Twitter => "twitter",
            Platform::Reddit => "reddit",
        }
    }

    /// Accepts slugs, display names and common aliases, case-insensitively.
    pub fn from_name(name: &str) -> Option<Self> {
        let lower = name.trim().to_ascii_lowercase();
        match lower.as_str() {
            "facebook" | "fb" => Some(Platform::Facebook),
            "linkedin" => Some(Platform::LinkedIn),
            "twitter" | "x" => Some(Platform::Twitter),
            "reddit" => Some(Platform::Reddit),
            _ => None,
        }
    }

    /// Picks the platform serving `url`, based on its host.
    pub fn detect(url: &Url) -> Option<Self> {
        let host = url.host_str()?.to_ascii_lowercase();
        let host = host.strip_prefix("www.").unwrap_or(&host);
        let matches = |domain: &str| host == domain || host.ends_with(&format!(".{domain}"));
        if matches("facebook.com") || matches("fb.com") {
            Some(Platform::Facebook)
        } else if matches("linkedin.com") {
            Some(Platform::LinkedIn)
        } else if matches("twitter.com") || matches("x.com") {
            Some(Platform::Twitter)
        } else if matches("reddit.com") {
            Some(Platform::Reddit)
        } else {
            None
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Author {
    pub name: String,
    pub username: Option<String>,
    pub profile_url: Option<String>,
    pub avatar_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PostContent {
    pub text: String,
    pub raw_markup: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PostTimestamp {
    /// Text or attribute value exactly as found in the page.
    pub raw: String,
    pub parsed: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum MediaKind {
    Image,
    Video,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MediaRef {
    pub kind: MediaKind,
    pub source_url: String,
    pub caption: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Engagement {
    pub likes: Option<u64>,
    pub comments: Option<u64>,
    pub shares: Option<u64>,
    pub views: Option<u64>,
}

impl Engagement {
    pub fn is_empty(&self) -> bool {
        self.likes.is_none()
            && self.comments.is_none()
            && self.shares.is_none()
            && self.views.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceUrls {
    pub post: String,
    pub canonical: Option<String>,
}

impl SourceUrls {
    /// Canonical url when known, otherwise the post url.
    pub fn preferred(&self) -> &str {
        self.canonical.as_deref().unwrap_or(&self.post)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PostType {
    Text,
    Image,
    Gallery,
    Video,
    Link,
}

impl PostType {
    pub fn classify(media: &[MediaRef], has_link_card: bool) -> Self {
        let images = media.iter().filter(|m| m.kind == MediaKind::Image).count();
        if media.iter().any(|m| m.kind == MediaKind::Video) {
            PostType::Video
        } else if images > 1 {
            PostType::Gallery
        } else if images == 1 {
            PostType::Image
        } else if has_link_card {
            PostType::Link
        } else {
            PostType::Text
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PostType::Text => "text",
            PostType::Image => "image",
            PostType::Gallery => "gallery",
            PostType::Video => "video",
            PostType::Link => "link",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PostFlags {
    pub sponsored: bool,
    pub post_type: PostType,
}

/// Canonical representation of one extracted post.
///
/// Built by a [`crate::PostExtractor`]; the pipeline only reads it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PostRecord {
    pub id: String,
    pub platform: Platform,
    pub author: Author,
    pub content: PostContent,
    pub timestamp: PostTimestamp,
    pub media_items: Vec<MediaRef>,
    pub engagement: Engagement,
    pub source_urls: SourceUrls,
    pub flags: PostFlags,
}

impl PostRecord {
    pub fn has_video(&self) -> bool {
        self.media_items.iter().any(|m| m.kind == MediaKind::Video)
    }
}
