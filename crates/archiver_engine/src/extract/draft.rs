use std::collections::HashSet;

use scraper::ElementRef;
use sha2::{Digest, Sha256};
use url::Url;

use super::numbers::parse_engagement_number;
use super::profile::{CompiledProfile, RuleSet};
use super::text::normalize_whitespace;
use super::timestamp::parse_timestamp;
use super::ExtractionError;
use crate::{
    Author, Engagement, MediaKind, MediaRef, PageDocument, Platform, PostContent, PostFlags,
    PostRecord, PostTimestamp, PostType, SourceUrls,
};

/// Field values resolved from a candidate element before platform-specific
/// adjustments. Platform extractors tweak the draft, then call
/// [`RecordDraft::finish`].
#[derive(Debug, Clone, Default)]
pub(crate) struct RecordDraft {
    pub(crate) id: Option<String>,
    pub(crate) author_name: Option<String>,
    pub(crate) author_username: Option<String>,
    pub(crate) author_url: Option<Url>,
    pub(crate) author_avatar: Option<Url>,
    pub(crate) text: String,
    pub(crate) raw_markup: Option<String>,
    pub(crate) timestamp_raw: String,
    pub(crate) timestamp: Option<chrono::DateTime<chrono::Utc>>,
    pub(crate) permalink: Option<Url>,
    pub(crate) media: Vec<MediaRef>,
    pub(crate) has_link_card: bool,
    pub(crate) engagement: Engagement,
    pub(crate) sponsored: bool,
}

impl RecordDraft {
    pub(crate) fn scan(
        profile: &CompiledProfile,
        node: ElementRef<'_>,
        page: &PageDocument,
    ) -> Self {
        let headline = profile.headline.first_value(node);
        let (body, raw_markup) = profile
            .content
            .first_block(node, &profile.noise)
            .unwrap_or_default();
        let text = match headline {
            Some(headline) if body.is_empty() => headline,
            Some(headline) => format!("{headline}\n\n{body}"),
            None => body,
        };

        let timestamp_raw = profile.timestamp.first_value(node).unwrap_or_default();
        let timestamp = parse_timestamp(
            &timestamp_raw,
            profile.relative_timestamps,
            page.captured_at(),
        );

        let mut media = collect_media(&profile.images, MediaKind::Image, node, page);
        media.extend(collect_media(&profile.videos, MediaKind::Video, node, page));

        Self {
            id: profile.id.first_value(node),
            author_name: profile
                .author_name
                .first_value(node)
                .map(|name| normalize_whitespace(&name)),
            author_username: profile.author_username.first_value(node),
            author_url: resolve_first(&profile.author_url, node, page),
            author_avatar: resolve_first(&profile.author_avatar, node, page),
            text,
            raw_markup,
            timestamp_raw,
            timestamp,
            permalink: resolve_first(&profile.permalink, node, page),
            media,
            has_link_card: profile.link_card.first_value(node).is_some(),
            engagement: Engagement {
                likes: count(&profile.likes, node),
                comments: count(&profile.comments, node),
                shares: count(&profile.shares, node),
                views: count(&profile.views, node),
            },
            sponsored: profile.is_sponsored(node),
        }
    }

    /// Validate required fields and build the immutable record.
    pub(crate) fn finish(
        self,
        platform: Platform,
        page: &PageDocument,
    ) -> Result<PostRecord, ExtractionError> {
        let name = self
            .author_name
            .filter(|name| !name.trim().is_empty())
            .ok_or(ExtractionError::MissingField {
                field: "author.name",
            })?;

        let username = self
            .author_username
            .map(|u| u.trim().trim_start_matches('@').to_string())
            .filter(|u| !u.is_empty())
            .or_else(|| self.author_url.as_ref().and_then(username_from_profile_url));

        let post_url = self
            .permalink
            .clone()
            .unwrap_or_else(|| page.url().clone());
        let canonical = self.permalink.as_ref().map(canonicalize).filter(|c| *c != post_url);

        let id = self.id.filter(|id| !id.trim().is_empty()).unwrap_or_else(|| {
            fallback_id(
                platform,
                post_url.as_str(),
                &name,
                &self.timestamp_raw,
                &self.text,
            )
        });

        let post_type = PostType::classify(&self.media, self.has_link_card);
        Ok(PostRecord {
            id,
            platform,
            author: Author {
                name,
                username,
                profile_url: self.author_url.map(String::from),
                avatar_url: self.author_avatar.map(String::from),
            },
            content: PostContent {
                text: self.text,
                raw_markup: self.raw_markup,
            },
            timestamp: PostTimestamp {
                raw: self.timestamp_raw,
                parsed: self.timestamp,
            },
            media_items: self.media,
            engagement: self.engagement,
            source_urls: SourceUrls {
                post: post_url.to_string(),
                canonical: canonical.map(String::from),
            },
            flags: PostFlags {
                sponsored: self.sponsored,
                post_type,
            },
        })
    }
}

fn resolve_first(rules: &RuleSet, node: ElementRef<'_>, page: &PageDocument) -> Option<Url> {
    rules
        .all_values(node)
        .into_iter()
        .find_map(|(_, value)| page.resolve_url(&value))
}

fn count(rules: &RuleSet, node: ElementRef<'_>) -> Option<u64> {
    rules
        .first_value(node)
        .map(|value| parse_engagement_number(&value))
}

fn collect_media(
    rules: &RuleSet,
    kind: MediaKind,
    node: ElementRef<'_>,
    page: &PageDocument,
) -> Vec<MediaRef> {
    let mut seen = HashSet::new();
    rules
        .all_values(node)
        .into_iter()
        .filter_map(|(element, value)| {
            let url = page.resolve_url(&value)?;
            if !seen.insert(url.to_string()) {
                return None;
            }
            let caption = element
                .value()
                .attr("alt")
                .or_else(|| element.value().attr("aria-label"))
                .map(normalize_whitespace)
                .filter(|caption| !caption.is_empty());
            Some(MediaRef {
                kind,
                source_url: url.into(),
                caption,
            })
        })
        .collect()
}

/// Last path segment of a profile link, skipping generic endpoints.
pub(crate) fn username_from_profile_url(url: &Url) -> Option<String> {
    let segment = url
        .path_segments()?
        .filter(|segment| !segment.is_empty())
        .last()?;
    if segment.ends_with(".php") {
        return None;
    }
    Some(segment.trim_start_matches('@').to_string()).filter(|s| !s.is_empty())
}

const TRACKING_PARAMS: [&str; 8] = [
    "utm_", "__cft__", "__tn__", "ref", "ref_src", "trk", "rcm", "share_id",
];

/// The permalink without fragment and tracking parameters.
pub(crate) fn canonicalize(url: &Url) -> Url {
    let mut canonical = url.clone();
    canonical.set_fragment(None);
    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| !is_tracking_param(key))
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect();
    if kept.is_empty() {
        canonical.set_query(None);
    } else {
        canonical.query_pairs_mut().clear().extend_pairs(kept);
    }
    canonical
}

fn is_tracking_param(key: &str) -> bool {
    TRACKING_PARAMS.iter().any(|param| {
        if param.ends_with('_') {
            key.starts_with(param)
        } else {
            key == *param
        }
    })
}

fn fallback_id(platform: Platform, url: &str, author: &str, timestamp: &str, text: &str) -> String {
    let mut hasher = Sha256::new();
    for part in [url, author, timestamp, text] {
        hasher.update(part.as_bytes());
        hasher.update([0u8]);
    }
    let digest = hasher.finalize();
    let mut id = format!("{}-", platform.slug());
    for byte in digest.iter().take(6) {
        use std::fmt::Write;
        let _ = write!(&mut id, "{byte:02x}");
    }
    id
}

/// Hands out session-unique ids, suffixing repeats with `-2`, `-3`, ...
#[derive(Debug, Default)]
pub(crate) struct IdRegistry {
    used: HashSet<String>,
}

impl IdRegistry {
    pub(crate) fn claim(&mut self, id: &str) -> String {
        if self.used.insert(id.to_string()) {
            return id.to_string();
        }
        let mut n = 2;
        loop {
            let candidate = format!("{id}-{n}");
            if self.used.insert(candidate.clone()) {
                return candidate;
            }
            n += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_ids_get_suffixes() {
        let mut registry = IdRegistry::default();
        assert_eq!(registry.claim("a"), "a");
        assert_eq!(registry.claim("a"), "a-2");
        assert_eq!(registry.claim("a"), "a-3");
        assert_eq!(registry.claim("b"), "b");
    }

    #[test]
    fn username_comes_from_last_segment() {
        let url = Url::parse("https://www.linkedin.com/in/jane-doe/?miniProfile=1").unwrap();
        assert_eq!(username_from_profile_url(&url).as_deref(), Some("jane-doe"));
        let url = Url::parse("https://www.facebook.com/profile.php?id=4").unwrap();
        assert_eq!(username_from_profile_url(&url), None);
    }

    #[test]
    fn canonical_drops_tracking_but_keeps_identity() {
        let url = Url::parse(
            "https://www.facebook.com/permalink.php?story_fbid=12&id=34&__cft__[0]=AZX&__tn__=R#c",
        )
        .unwrap();
        assert_eq!(
            canonicalize(&url).as_str(),
            "https://www.facebook.com/permalink.php?story_fbid=12&id=34"
        );
        let url = Url::parse("https://x.com/jack/status/20?utm_source=a&ref_src=b").unwrap();
        assert_eq!(canonicalize(&url).as_str(), "https://x.com/jack/status/20");
    }

    #[test]
    fn fallback_ids_are_stable_and_prefixed() {
        let a = fallback_id(Platform::Reddit, "u", "n", "t", "x");
        let b = fallback_id(Platform::Reddit, "u", "n", "t", "x");
        assert_eq!(a, b);
        assert!(a.starts_with("reddit-"));
        assert_eq!(a.len(), "reddit-".len() + 12);
    }
}
