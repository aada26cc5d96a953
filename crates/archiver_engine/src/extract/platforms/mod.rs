//! One adapter per platform. Field lookup is shared and driven by the
//! platform's selector profile; each adapter only adds the fix-ups its
//! platform needs (id schemes, permalink shapes, handles).
mod facebook;
mod linkedin;
mod reddit;
mod twitter;

pub(crate) use facebook::FacebookExtractor;
pub(crate) use linkedin::LinkedInExtractor;
pub(crate) use reddit::RedditExtractor;
pub(crate) use twitter::TwitterExtractor;

use scraper::ElementRef;

use super::draft::RecordDraft;
use super::profile::CompiledProfile;
use super::ExtractionError;
use crate::PageDocument;

/// Profile-driven lookups shared by every adapter.
#[derive(Debug, Clone)]
pub(crate) struct ProfileScanner {
    profile: CompiledProfile,
}

impl ProfileScanner {
    pub(crate) fn new(profile: CompiledProfile) -> Self {
        Self { profile }
    }

    pub(crate) fn feed_root<'a>(&self, page: &'a PageDocument) -> Option<ElementRef<'a>> {
        self.profile
            .feed_root
            .iter()
            .find_map(|selector| page.html().select(selector).next())
    }

    /// Elements of the first post selector that matches anything.
    pub(crate) fn candidates<'a>(&self, root: ElementRef<'a>) -> Vec<ElementRef<'a>> {
        self.profile
            .post
            .iter()
            .map(|selector| root.select(selector).collect::<Vec<_>>())
            .find(|found| !found.is_empty())
            .unwrap_or_default()
    }

    /// A post element that is not excluded and not nested in another post
    /// (shared posts and comments render as posts inside posts).
    pub(crate) fn is_candidate(&self, node: ElementRef<'_>) -> bool {
        if !self.profile.matches_post(&node) || self.profile.is_excluded(&node) {
            return false;
        }
        !node
            .ancestors()
            .filter_map(ElementRef::wrap)
            .any(|ancestor| self.profile.matches_post(&ancestor))
    }

    /// Resolve every profile field for `node`, failing when it is not a post.
    pub(crate) fn scan(
        &self,
        node: ElementRef<'_>,
        page: &PageDocument,
    ) -> Result<RecordDraft, ExtractionError> {
        if !self.profile.matches_post(&node) {
            return Err(ExtractionError::NoMatch { field: "post" });
        }
        Ok(RecordDraft::scan(&self.profile, node, page))
    }
}

/// Path segment following `marker` (e.g. the id after `/status/`).
pub(crate) fn segment_after(url: &url::Url, marker: &str) -> Option<String> {
    let mut segments = url.path_segments()?;
    segments.find(|segment| *segment == marker)?;
    segments
        .next()
        .filter(|segment| !segment.is_empty())
        .map(str::to_string)
}
