//! Platform adapters that turn a page snapshot into [`PostRecord`]s.
mod draft;
mod numbers;
mod platforms;
mod profile;
mod text;
mod timestamp;

use std::collections::HashMap;

use engine_logging::{engine_debug, engine_warn};
use scraper::ElementRef;

use crate::{PageDocument, Platform, PostRecord};
use draft::IdRegistry;
use platforms::{FacebookExtractor, LinkedInExtractor, RedditExtractor, TwitterExtractor};
use profile::CompiledProfile;

pub use numbers::parse_engagement_number;
pub use profile::{FieldRule, SelectorProfile};
pub use text::normalize_whitespace;
pub use timestamp::{parse_absolute_timestamp, parse_relative_timestamp};

#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum ExtractionError {
    #[error("no element matched the {field} rules")]
    NoMatch { field: &'static str },
    #[error("required field {field} is empty")]
    MissingField { field: &'static str },
    #[error("invalid selector {selector:?}: {message}")]
    InvalidSelector { selector: String, message: String },
    #[error("invalid selector profile for {platform}: {message}")]
    InvalidProfile { platform: Platform, message: String },
}

/// Capability set every platform adapter implements.
pub trait PostExtractor: Send + Sync {
    fn platform(&self) -> Platform;

    /// Element that contains the post list, when the page has one.
    fn feed_root<'a>(&self, page: &'a PageDocument) -> Option<ElementRef<'a>>;

    /// Candidate post elements below `root`, in document order.
    fn candidates<'a>(&self, root: ElementRef<'a>) -> Vec<ElementRef<'a>>;

    fn is_candidate(&self, node: ElementRef<'_>) -> bool;

    fn extract(
        &self,
        node: ElementRef<'_>,
        page: &PageDocument,
    ) -> Result<PostRecord, ExtractionError>;

    /// Every post currently present in `page`, in document order. A
    /// candidate that fails to extract is logged and skipped.
    fn enumerate(&self, page: &PageDocument) -> Vec<PostRecord> {
        let root = self
            .feed_root(page)
            .unwrap_or_else(|| page.html().root_element());
        let mut ids = IdRegistry::default();
        let mut records = Vec::new();

        for (index, node) in self.candidates(root).into_iter().enumerate() {
            if !self.is_candidate(node) {
                continue;
            }
            match self.extract(node, page) {
                Ok(mut record) => {
                    record.id = ids.claim(&record.id);
                    records.push(record);
                }
                Err(err) => {
                    engine_warn!(
                        "{} candidate #{} skipped: {}",
                        self.platform(),
                        index,
                        err
                    );
                }
            }
        }

        engine_debug!(
            "{} extraction found {} post(s) on {}",
            self.platform(),
            records.len(),
            page.url()
        );
        records
    }
}

/// Builds the adapter for a platform from its selector profile.
#[derive(Debug, Default, Clone)]
pub struct ExtractorFactory {
    overrides: HashMap<Platform, SelectorProfile>,
}

impl ExtractorFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the built-in selector profile of `platform`.
    pub fn with_profile(mut self, platform: Platform, profile: SelectorProfile) -> Self {
        self.overrides.insert(platform, profile);
        self
    }

    pub fn extractor_for(
        &self,
        platform: Platform,
    ) -> Result<Box<dyn PostExtractor>, ExtractionError> {
        let profile = match self.overrides.get(&platform) {
            Some(profile) => profile.clone(),
            None => SelectorProfile::builtin(platform)?,
        };
        let compiled = CompiledProfile::compile(&profile)?;
        let extractor: Box<dyn PostExtractor> = match platform {
            Platform::Facebook => Box::new(FacebookExtractor::new(compiled)),
            Platform::LinkedIn => Box::new(LinkedInExtractor::new(compiled)),
            Platform::Twitter => Box::new(TwitterExtractor::new(compiled)),
            Platform::Reddit => Box::new(RedditExtractor::new(compiled)),
        };
        Ok(extractor)
    }
}
