use scraper::ElementRef;
use url::Url;

use super::ProfileScanner;
use crate::extract::profile::CompiledProfile;
use crate::extract::{ExtractionError, PostExtractor};
use crate::{PageDocument, Platform, PostRecord};

const FEED_UPDATE_BASE: &str = "https://www.linkedin.com/feed/update/";

pub(crate) struct LinkedInExtractor {
    scanner: ProfileScanner,
}

impl LinkedInExtractor {
    pub(crate) fn new(profile: CompiledProfile) -> Self {
        Self {
            scanner: ProfileScanner::new(profile),
        }
    }
}

impl PostExtractor for LinkedInExtractor {
    fn platform(&self) -> Platform {
        Platform::LinkedIn
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
        // Feed cards rarely carry a link to themselves; the activity urn does.
        if draft.permalink.is_none() {
            draft.permalink = draft.id.as_deref().and_then(permalink_from_urn);
        }
        draft.finish(Platform::LinkedIn, page)
    }
}

/// `urn:li:activity:123` → `https://www.linkedin.com/feed/update/urn:li:activity:123/`
fn permalink_from_urn(urn: &str) -> Option<Url> {
    let urn = urn.trim();
    if !urn.starts_with("urn:li:") {
        return None;
    }
    Url::parse(&format!("{FEED_UPDATE_BASE}{urn}/")).ok()
}
