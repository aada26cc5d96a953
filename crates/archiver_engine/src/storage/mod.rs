//! Storage root access, folder layout and collision-safe persistence.
mod fs;
mod path;
mod root;

use std::io;
use std::sync::Arc;

use bytes::Bytes;
use chrono::{DateTime, Datelike, Utc};
use engine_logging::{engine_debug, engine_info};
use serde::{Deserialize, Serialize};
use tokio::sync::OnceCell;

use crate::fetch::{FetchedMedia, MediaFormat};
use crate::render::sanitize_filename;
use crate::{MediaKind, MediaRef, Platform};

pub use fs::{FsRootProvider, FsStorageRoot};
pub use path::StoragePath;
pub use root::{DirEntry, EntryKind, Permission, RootProvider, StorageRoot, WriteMode};

pub const ATTACHMENTS_DIR: &str = "attachments";
pub const MAX_RENAME_ATTEMPTS: u32 = 1000;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("no storage folder has been selected")]
    NoRootSelected,
    #[error("write access to {root} was not granted")]
    PermissionDenied { root: String },
    #[error("could not create folder {path}: {message}")]
    CreateFailed { path: String, message: String },
    #[error("no free name for {filename} after {attempts} attempts")]
    CollisionUnresolved { filename: String, attempts: u32 },
    #[error("{path} already exists")]
    AlreadyExists { path: String },
    #[error("invalid storage path {path:?}: {reason}")]
    InvalidPath { path: String, reason: &'static str },
    #[error("io error at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum FolderLayout {
    /// `Facebook/2025/10`
    #[default]
    PlatformYearMonth,
    /// `2025/10/Facebook`
    YearMonthPlatform,
    Platform,
    Flat,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum CollisionPolicy {
    #[default]
    Fail,
    /// Append ` (1)`, ` (2)`, ... to the file stem until a name is free.
    AutoRename,
    Overwrite,
}

impl CollisionPolicy {
    /// Policy for the attachments of a document saved under `self`.
    pub fn for_attachments(self) -> Self {
        match self {
            CollisionPolicy::Overwrite => CollisionPolicy::Overwrite,
            CollisionPolicy::Fail | CollisionPolicy::AutoRename => CollisionPolicy::AutoRename,
        }
    }
}

/// Folder segments for a post of `platform` dated `instant`.
pub fn folder_segments(
    layout: FolderLayout,
    platform: Platform,
    instant: DateTime<Utc>,
) -> Vec<String> {
    let name = platform.display_name().to_string();
    let year = format!("{:04}", instant.year());
    let month = format!("{:02}", instant.month());
    match layout {
        FolderLayout::PlatformYearMonth => vec![name, year, month],
        FolderLayout::YearMonthPlatform => vec![year, month, name],
        FolderLayout::Platform => vec![name],
        FolderLayout::Flat => Vec::new(),
    }
}

/// `post.md` with `n = 2` → `post (2).md`.
pub fn numbered_name(filename: &str, n: u32) -> String {
    match filename.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => format!("{stem} ({n}).{ext}"),
        _ => format!("{filename} ({n})"),
    }
}

/// A media item persisted next to its document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredAttachment {
    pub media: MediaRef,
    pub path: StoragePath,
    /// Path relative to the document's folder, as used by the embed.
    pub relative_path: String,
    pub format: Option<MediaFormat>,
    pub size: u64,
}

impl StoredAttachment {
    pub fn is_video(&self) -> bool {
        self.media.kind == MediaKind::Video || self.format.is_some_and(MediaFormat::is_video)
    }
}

/// Owns the storage root for the lifetime of the archiver.
pub struct StorageCoordinator {
    provider: Arc<dyn RootProvider>,
    root: OnceCell<Arc<dyn StorageRoot>>,
}

impl StorageCoordinator {
    pub fn new(provider: Arc<dyn RootProvider>) -> Self {
        Self {
            provider,
            root: OnceCell::new(),
        }
    }

    /// Root requested once from the provider, then cached.
    pub async fn root(&self) -> Result<Arc<dyn StorageRoot>, StorageError> {
        self.root
            .get_or_try_init(|| self.provider.provide())
            .await
            .cloned()
    }

    /// The root, with write permission checked and re-requested if needed.
    pub async fn ensure_access(&self) -> Result<Arc<dyn StorageRoot>, StorageError> {
        let root = self.root().await?;
        if root.permission().await == Permission::Granted {
            return Ok(root);
        }
        match root.request_permission().await {
            Permission::Granted => Ok(root),
            _ => Err(StorageError::PermissionDenied {
                root: root.describe(),
            }),
        }
    }

    /// Get-or-create each segment in order.
    pub async fn ensure_folder(&self, segments: &[String]) -> Result<StoragePath, StorageError> {
        let root = self.ensure_access().await?;
        let mut folder = StoragePath::root();
        for segment in segments {
            folder = folder.join(segment)?;
            if !root.exists(&folder).await? {
                root.create_dir(&folder).await?;
                engine_debug!("created folder {}", folder);
            }
        }
        Ok(folder)
    }

    /// Write `contents` as `folder/filename` under `policy`. Returns the
    /// path actually written.
    pub async fn save_file(
        &self,
        folder: &StoragePath,
        filename: &str,
        contents: Bytes,
        policy: CollisionPolicy,
    ) -> Result<StoragePath, StorageError> {
        let root = self.ensure_access().await?;
        let (target, mode) = resolve_target(root.as_ref(), folder, filename, policy).await?;
        root.write_file(&target, contents, mode).await?;
        engine_info!("saved {}", target);
        Ok(target)
    }

    pub async fn save_document(
        &self,
        folder: &StoragePath,
        filename: &str,
        markdown: &str,
        policy: CollisionPolicy,
    ) -> Result<StoragePath, StorageError> {
        self.save_file(
            folder,
            filename,
            Bytes::copy_from_slice(markdown.as_bytes()),
            policy,
        )
        .await
    }

    /// Store media item number `index` (1-based) of `record_id` under
    /// `folder/attachments/`. The attachment replaces an earlier one of the
    /// same name only when its document is written with `Overwrite`;
    /// otherwise it is renamed.
    #[allow(clippy::too_many_arguments)]
    pub async fn save_attachment(
        &self,
        folder: &StoragePath,
        record_id: &str,
        index: usize,
        media: &MediaRef,
        fetched: &FetchedMedia,
        archived_at: DateTime<Utc>,
        document_policy: CollisionPolicy,
    ) -> Result<StoredAttachment, StorageError> {
        let attachments = folder.join(ATTACHMENTS_DIR)?;
        let root = self.ensure_access().await?;
        if !root.exists(&attachments).await? {
            root.create_dir(&attachments).await?;
        }

        let filename = attachment_filename(record_id, index, media, fetched, archived_at);
        let path = self
            .save_file(
                &attachments,
                &filename,
                fetched.bytes.clone(),
                document_policy.for_attachments(),
            )
            .await?;
        let stored_name = path.file_name().unwrap_or(filename.as_str()).to_string();
        Ok(StoredAttachment {
            media: media.clone(),
            relative_path: format!("{ATTACHMENTS_DIR}/{stored_name}"),
            path,
            format: fetched.format,
            size: fetched.bytes.len() as u64,
        })
    }

    /// Best-effort removal, used to roll back attachments of a failed post.
    pub async fn remove(&self, path: &StoragePath) -> Result<(), StorageError> {
        let root = self.ensure_access().await?;
        root.delete(path).await
    }
}

async fn resolve_target(
    root: &dyn StorageRoot,
    folder: &StoragePath,
    filename: &str,
    policy: CollisionPolicy,
) -> Result<(StoragePath, WriteMode), StorageError> {
    let target = folder.join(filename)?;
    match policy {
        CollisionPolicy::Overwrite => Ok((target, WriteMode::Replace)),
        CollisionPolicy::Fail => {
            if root.exists(&target).await? {
                return Err(StorageError::AlreadyExists {
                    path: target.to_string(),
                });
            }
            Ok((target, WriteMode::CreateNew))
        }
        CollisionPolicy::AutoRename => {
            if !root.exists(&target).await? {
                return Ok((target, WriteMode::CreateNew));
            }
            for n in 1..=MAX_RENAME_ATTEMPTS {
                let candidate = folder.join(&numbered_name(filename, n))?;
                if !root.exists(&candidate).await? {
                    return Ok((candidate, WriteMode::CreateNew));
                }
            }
            Err(StorageError::CollisionUnresolved {
                filename: filename.to_string(),
                attempts: MAX_RENAME_ATTEMPTS,
            })
        }
    }
}

/// `{id}_{index}.{ext}` when the source URL names a known format, otherwise
/// `{id}_{index}_{millis}.{ext}` with the detected format or `bin`.
pub fn attachment_filename(
    record_id: &str,
    index: usize,
    media: &MediaRef,
    fetched: &FetchedMedia,
    archived_at: DateTime<Utc>,
) -> String {
    let stem = sanitize_filename(record_id, 80).replace(' ', "_");
    match MediaFormat::from_url(&media.source_url) {
        Some(format) => format!("{stem}_{index}.{}", format.extension()),
        None => {
            let ext = fetched.format.map_or("bin", MediaFormat::extension);
            format!("{stem}_{index}_{}.{ext}", archived_at.timestamp_millis())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn october() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 10, 15, 9, 0, 0).unwrap()
    }

    #[test]
    fn layouts_order_segments() {
        assert_eq!(
            folder_segments(FolderLayout::PlatformYearMonth, Platform::Facebook, october()),
            ["Facebook", "2025", "10"]
        );
        assert_eq!(
            folder_segments(FolderLayout::YearMonthPlatform, Platform::Twitter, october()),
            ["2025", "10", "X"]
        );
        assert!(folder_segments(FolderLayout::Flat, Platform::Reddit, october()).is_empty());
    }

    #[test]
    fn numbered_names_keep_the_extension() {
        assert_eq!(numbered_name("post.md", 1), "post (1).md");
        assert_eq!(numbered_name("2025-10-15 - A - B.md", 2), "2025-10-15 - A - B (2).md");
        assert_eq!(numbered_name("README", 3), "README (3)");
    }

    #[test]
    fn attachment_names_prefer_the_url_extension() {
        let fetched = FetchedMedia {
            bytes: Bytes::from_static(b"x"),
            content_type: Some("image/png".into()),
            final_url: "https://cdn.example.com/x".into(),
            format: Some(MediaFormat::Png),
        };
        let media = MediaRef {
            kind: MediaKind::Image,
            source_url: "https://cdn.example.com/photo.jpg".into(),
            caption: None,
        };
        assert_eq!(
            attachment_filename("fb-1", 1, &media, &fetched, october()),
            "fb-1_1.jpg"
        );

        let media = MediaRef {
            source_url: "https://cdn.example.com/render?id=9".into(),
            ..media
        };
        assert_eq!(
            attachment_filename("fb-1", 2, &media, &fetched, october()),
            format!("fb-1_2_{}.png", october().timestamp_millis())
        );
    }
}
