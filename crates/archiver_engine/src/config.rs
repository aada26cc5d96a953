//! User-facing settings and the runtime options derived from them.
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::fetch::{FetchOptions, DEFAULT_CONCURRENCY, DEFAULT_MAX_ATTEMPTS, DEFAULT_MAX_BYTES};
use crate::render::{FilenameOptions, RenderOptions};
use crate::storage::{CollisionPolicy, FolderLayout};
use crate::MediaKind;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArchiveSettings {
    pub storage_root: Option<PathBuf>,
    pub folder_layout: FolderLayout,
    pub collision_policy: CollisionPolicy,
    pub filename: FilenameSettings,
    pub media: MediaSettings,
    pub render: RenderSettings,
    pub batch_pause_ms: u64,
}

impl Default for ArchiveSettings {
    fn default() -> Self {
        Self {
            storage_root: None,
            folder_layout: FolderLayout::default(),
            collision_policy: CollisionPolicy::default(),
            filename: FilenameSettings::default(),
            media: MediaSettings::default(),
            render: RenderSettings::default(),
            batch_pause_ms: 500,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilenameSettings {
    pub include_date: bool,
    pub include_author: bool,
}

impl Default for FilenameSettings {
    fn default() -> Self {
        Self {
            include_date: true,
            include_author: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaSettings {
    pub download_media: bool,
    pub download_images: bool,
    pub download_videos: bool,
    pub max_attachment_bytes: u64,
    pub concurrency: usize,
    pub max_attempts: u32,
    pub timeout_ms: u64,
}

impl Default for MediaSettings {
    fn default() -> Self {
        Self {
            download_media: true,
            download_images: true,
            download_videos: true,
            max_attachment_bytes: DEFAULT_MAX_BYTES,
            concurrency: DEFAULT_CONCURRENCY,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            timeout_ms: 30_000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderSettings {
    pub include_frontmatter: bool,
    pub include_engagement: bool,
    pub include_media_links: bool,
    pub preserve_formatting: bool,
    pub max_title_length: usize,
}

impl Default for RenderSettings {
    fn default() -> Self {
        let defaults = RenderOptions::default();
        Self {
            include_frontmatter: defaults.include_frontmatter,
            include_engagement: defaults.include_engagement,
            include_media_links: defaults.include_media_links,
            preserve_formatting: defaults.preserve_formatting,
            max_title_length: defaults.max_title_length,
        }
    }
}

/// Which media items of a record get downloaded, and how.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaOptions {
    pub enabled: bool,
    pub images: bool,
    pub videos: bool,
    pub concurrency: usize,
    pub fetch: FetchOptions,
}

impl Default for MediaOptions {
    fn default() -> Self {
        MediaSettings::default().to_options()
    }
}

impl MediaOptions {
    pub fn wants(&self, kind: MediaKind) -> bool {
        self.enabled
            && match kind {
                MediaKind::Image => self.images,
                MediaKind::Video => self.videos,
            }
    }
}

impl MediaSettings {
    pub fn to_options(&self) -> MediaOptions {
        MediaOptions {
            enabled: self.download_media,
            images: self.download_images,
            videos: self.download_videos,
            concurrency: self.concurrency.max(1),
            fetch: FetchOptions {
                max_attempts: self.max_attempts.max(1),
                timeout: Duration::from_millis(self.timeout_ms),
                max_bytes: self.max_attachment_bytes,
            },
        }
    }
}

/// Everything [`crate::ArchivePipeline`] needs to archive one record.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ArchiveOptions {
    pub folder_layout: FolderLayout,
    pub collision_policy: CollisionPolicy,
    pub media: MediaOptions,
    pub render: RenderOptions,
    pub batch_pause: Duration,
}

impl ArchiveSettings {
    pub fn archive_options(&self) -> ArchiveOptions {
        ArchiveOptions {
            folder_layout: self.folder_layout,
            collision_policy: self.collision_policy,
            media: self.media.to_options(),
            render: RenderOptions {
                include_frontmatter: self.render.include_frontmatter,
                include_engagement: self.render.include_engagement,
                include_media_links: self.render.include_media_links,
                max_title_length: self.render.max_title_length.max(1),
                preserve_formatting: self.render.preserve_formatting,
                filename: FilenameOptions {
                    include_date: self.filename.include_date,
                    include_author: self.filename.include_author,
                    ..FilenameOptions::default()
                },
            },
            batch_pause: Duration::from_millis(self.batch_pause_ms),
        }
    }
}
