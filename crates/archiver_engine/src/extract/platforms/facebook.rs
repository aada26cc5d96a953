use scraper::ElementRef;
use url::Url;

use super::{segment_after, ProfileScanner};
use crate::extract::profile::CompiledProfile;
use crate::extract::{ExtractionError, PostExtractor};
use crate::{PageDocument, Platform, PostRecord};

pub(crate) struct FacebookExtractor {
    scanner: ProfileScanner,
}

impl FacebookExtractor {
    pub(crate) fn new(profile: CompiledProfile) -> Self {
        Self {
            scanner: ProfileScanner::new(profile),
        }
    }
}

impl PostExtractor for FacebookExtractor {
    fn platform(&self) -> Platform {
        Platform::Facebook
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
        if draft.id.is_none() {
            draft.id = draft.permalink.as_ref().and_then(post_id_from_permalink);
        }
        draft.finish(Platform::Facebook, page)
    }
}

/// Story id from the permalink shapes Facebook uses:
/// `/{page}/posts/{id}`, `/permalink.php?story_fbid={id}`,
/// `/groups/{g}/permalink/{id}`, `/{page}/videos/{id}`, `/photo/?fbid={id}`.
fn post_id_from_permalink(url: &Url) -> Option<String> {
    let from_query = url
        .query_pairs()
        .find(|(key, _)| key == "story_fbid" || key == "fbid")
        .map(|(_, value)| value.into_owned());
    from_query
        .or_else(|| segment_after(url, "posts"))
        .or_else(|| segment_after(url, "permalink"))
        .or_else(|| segment_after(url, "videos"))
        .map(|id| format!("fb-{id}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn permalink_shapes_yield_ids() {
        let cases = [
            ("https://www.facebook.com/acme/posts/pfbid02x", Some("fb-pfbid02x")),
            (
                "https://www.facebook.com/permalink.php?story_fbid=123&id=9",
                Some("fb-123"),
            ),
            (
                "https://www.facebook.com/groups/rust/permalink/456/",
                Some("fb-456"),
            ),
            ("https://www.facebook.com/acme/videos/789", Some("fb-789")),
            ("https://www.facebook.com/acme", None),
        ];
        for (raw, expected) in cases {
            let url = Url::parse(raw).unwrap();
            assert_eq!(post_id_from_permalink(&url).as_deref(), expected, "{raw}");
        }
    }
}
