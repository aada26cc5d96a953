use scraper::ElementRef;
use url::Url;

use super::ProfileScanner;
use crate::extract::profile::CompiledProfile;
use crate::extract::{ExtractionError, PostExtractor};
use crate::{PageDocument, Platform, PostRecord};

pub(crate) struct RedditExtractor {
    scanner: ProfileScanner,
}

impl RedditExtractor {
    pub(crate) fn new(profile: CompiledProfile) -> Self {
        Self {
            scanner: ProfileScanner::new(profile),
        }
    }
}

impl PostExtractor for RedditExtractor {
    fn platform(&self) -> Platform {
        Platform::Reddit
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
        // Reddit shows the account handle as the author.
        let handle = draft
            .author_name
            .as_deref()
            .map(|name| name.trim().trim_start_matches("u/").to_string())
            .filter(|name| !name.is_empty());
        if let Some(handle) = handle {
            if draft.author_url.is_none() {
                draft.author_url = profile_url(&handle);
            }
            draft.author_username.get_or_insert_with(|| handle.clone());
            draft.author_name = Some(handle);
        }
        draft.finish(Platform::Reddit, page)
    }
}

fn profile_url(handle: &str) -> Option<Url> {
    Url::parse("https://www.reddit.com/user/").ok()?.join(&format!("{handle}/")).ok()
}
