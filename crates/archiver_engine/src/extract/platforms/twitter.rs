use scraper::ElementRef;
use url::Url;

use super::{segment_after, ProfileScanner};
use crate::extract::profile::CompiledProfile;
use crate::extract::{ExtractionError, PostExtractor};
use crate::{PageDocument, Platform, PostRecord};

pub(crate) struct TwitterExtractor {
    scanner: ProfileScanner,
}

impl TwitterExtractor {
    pub(crate) fn new(profile: CompiledProfile) -> Self {
        Self {
            scanner: ProfileScanner::new(profile),
        }
    }
}

impl PostExtractor for TwitterExtractor {
    fn platform(&self) -> Platform {
        Platform::Twitter
    }

    fn feed_root<'a>(&self, page: &'a PageDocument) -> Option<ElementRef<'a>> {
        self.scanner.feed_root(page)
    }

    fn candidates<'a>(&self, root: ElementRef<'a>) -> Vec<ElementRef<'a>> {
        self.scanner.candidates(root)
    }

    fn is_candidate(&self, node: ElementRef<'_>) -> bool {
        self.scanner.is_candidate(node)
    }

    fn extract(
        &self,
        node: ElementRef<'_>,
        page: &PageDocument,
    ) -> Result<PostRecord, ExtractionError> {
        let mut draft = self.scanner.scan(node, page)?;
        if let Some(permalink) = draft.permalink.take() {
            let status = status_permalink(&permalink);
            if draft.id.is_none() {
                draft.id = segment_after(&status, "status").map(|id| format!("x-{id}"));
            }
            draft.permalink = Some(status);
        }
        draft.finish(Platform::Twitter, page)
    }
}

/// Cut `/{user}/status/{id}/analytics` (and similar) down to the status url.
fn status_permalink(url: &Url) -> Url {
    let Some(segments) = url.path_segments() else {
        return url.clone();
    };
    let segments: Vec<&str> = segments.collect();
    let Some(position) = segments.iter().position(|segment| *segment == "status") else {
        return url.clone();
    };
    let end = (position + 2).min(segments.len());
    let mut status = url.clone();
    status.set_path(&format!("/{}", segments[..end].join("/")));
    status.set_query(None);
    status.set_fragment(None);
    status
}
