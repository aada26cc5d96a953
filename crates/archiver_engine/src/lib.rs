//! Archiver engine: post extraction, media fetching, rendering and storage.
mod config;
mod extract;
mod fetch;
mod page;
mod pipeline;
mod record;
mod render;
mod storage;
mod types;

pub use config::{
    ArchiveOptions, ArchiveSettings, FilenameSettings, MediaOptions, MediaSettings,
    RenderSettings,
};
pub use extract::{
    normalize_whitespace, parse_absolute_timestamp, parse_engagement_number,
    parse_relative_timestamp, ExtractionError, ExtractorFactory, FieldRule, PostExtractor,
    SelectorProfile,
};
pub use fetch::{
    BatchFetchReport, DirectSettings, DirectStrategy, FetchOptions, FetchStrategy, FetchedMedia,
    MediaFetcher, MediaFormat, PrivilegedRelay, RelayError, RelayRequest, RelayResponse,
    RelayStrategy, RetryPolicy, DEFAULT_CONCURRENCY, DEFAULT_MAX_ATTEMPTS, DEFAULT_MAX_BYTES,
    DEFAULT_TIMEOUT,
};
pub use page::{PageDocument, PageError};
pub use pipeline::{
    ArchiveError, ArchiveOutcome, ArchivePipeline, BatchReport, BatchSummary, Clock,
};
pub use record::{
    Author, Engagement, MediaKind, MediaRef, Platform, PostContent, PostFlags, PostRecord,
    PostTimestamp, PostType, SourceUrls,
};
pub use render::{
    abbreviate_count, convert, derive_title, document_filename, escape_markdown,
    hard_line_breaks, sanitize_filename, FilenameOptions, Frontmatter, RenderError,
    RenderOptions, StoredDocument, UNTITLED_POST,
};
pub use storage::{
    attachment_filename, folder_segments, numbered_name, CollisionPolicy, DirEntry, EntryKind,
    FolderLayout, FsRootProvider, FsStorageRoot, Permission, RootProvider, StorageCoordinator,
    StorageError, StoragePath, StorageRoot, StoredAttachment, WriteMode, ATTACHMENTS_DIR,
    MAX_RENAME_ATTEMPTS,
};
pub use types::{
    ArchiveEvent, ArchiveProgress, FailureKind, FetchError, NullProgressSink, ProgressSink, Stage,
};
