//! Per-record and batch archival: folder, media, render, write.
use std::sync::Arc;

use chrono::{DateTime, Utc};
use engine_logging::{engine_debug, engine_info, engine_warn};

use crate::config::ArchiveOptions;
use crate::fetch::MediaFetcher;
use crate::render::{convert, RenderError};
use crate::storage::{
    folder_segments, StorageCoordinator, StorageError, StoragePath, StoredAttachment,
};
use crate::{
    ArchiveEvent, ArchiveProgress, MediaRef, NullProgressSink, PostRecord, ProgressSink, Stage,
};

pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveOutcome {
    pub record_id: String,
    pub final_path: StoragePath,
    pub filename: String,
    pub attachments: Vec<StoredAttachment>,
    /// Media items that were requested but could not be fetched or stored.
    pub media_failed: usize,
}

#[derive(Debug, thiserror::Error)]
pub enum ArchiveError {
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Render(#[from] RenderError),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
}

impl BatchSummary {
    pub fn from_results<T, E>(results: &[Result<T, E>]) -> Self {
        let succeeded = results.iter().filter(|result| result.is_ok()).count();
        Self {
            total: results.len(),
            succeeded,
            failed: results.len() - succeeded,
        }
    }
}

/// One result per input record, in input order.
#[derive(Debug)]
pub struct BatchReport {
    pub results: Vec<Result<ArchiveOutcome, ArchiveError>>,
    pub summary: BatchSummary,
}

pub struct ArchivePipeline {
    storage: StorageCoordinator,
    fetcher: MediaFetcher,
    sink: Arc<dyn ProgressSink>,
    clock: Clock,
}

impl ArchivePipeline {
    pub fn new(storage: StorageCoordinator, fetcher: MediaFetcher) -> Self {
        Self {
            storage,
            fetcher,
            sink: Arc::new(NullProgressSink),
            clock: Arc::new(Utc::now),
        }
    }

    pub fn with_sink(mut self, sink: Arc<dyn ProgressSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn storage(&self) -> &StorageCoordinator {
        &self.storage
    }

    pub async fn archive_one(
        &self,
        record: &PostRecord,
        options: &ArchiveOptions,
    ) -> Result<ArchiveOutcome, ArchiveError> {
        let result = self.run(record, options).await;
        match &result {
            Ok(outcome) => {
                engine_info!("archived {} to {}", record.id, outcome.final_path);
                self.emit_stage(&record.id, Stage::Done);
            }
            Err(err) => engine_warn!("archiving {} failed: {}", record.id, err),
        }
        self.sink.emit(ArchiveEvent::Completed {
            record_id: record.id.clone(),
            result: result
                .as_ref()
                .map(|outcome| outcome.final_path.clone())
                .map_err(ToString::to_string),
        });
        result
    }

    /// Archive `records` strictly one after another, pausing between them.
    /// A failed record never stops the batch.
    pub async fn archive_many(
        &self,
        records: &[PostRecord],
        options: &ArchiveOptions,
    ) -> BatchReport {
        for record in records {
            self.emit_stage(&record.id, Stage::Queued);
        }

        let mut results = Vec::with_capacity(records.len());
        for (index, record) in records.iter().enumerate() {
            if index > 0 && !options.batch_pause.is_zero() {
                tokio::time::sleep(options.batch_pause).await;
            }
            results.push(self.archive_one(record, options).await);
        }

        let summary = BatchSummary::from_results(&results);
        engine_info!(
            "batch finished: {} archived, {} failed",
            summary.succeeded,
            summary.failed
        );
        BatchReport { results, summary }
    }

    async fn run(
        &self,
        record: &PostRecord,
        options: &ArchiveOptions,
    ) -> Result<ArchiveOutcome, ArchiveError> {
        self.emit_stage(&record.id, Stage::Preparing);
        let archived_at = (self.clock)();
        self.storage.ensure_access().await?;

        let dated = record.timestamp.parsed.unwrap_or(archived_at);
        let segments = folder_segments(options.folder_layout, record.platform, dated);
        let folder = self.storage.ensure_folder(&segments).await?;

        let (attachments, media_failed) = self
            .store_media(record, &folder, options, archived_at)
            .await;

        self.emit_stage(&record.id, Stage::Rendering);
        let document = match convert(record, &attachments, &options.render, archived_at) {
            Ok(document) => document,
            Err(err) => {
                self.rollback(&attachments).await;
                return Err(err.into());
            }
        };

        self.emit_stage(&record.id, Stage::Writing);
        let final_path = match self
            .storage
            .save_document(
                &folder,
                &document.filename,
                &document.to_markdown(),
                options.collision_policy,
            )
            .await
        {
            Ok(path) => path,
            Err(err) => {
                self.rollback(&attachments).await;
                return Err(err.into());
            }
        };

        Ok(ArchiveOutcome {
            record_id: record.id.clone(),
            filename: final_path
                .file_name()
                .unwrap_or(document.filename.as_str())
                .to_string(),
            final_path,
            attachments,
            media_failed,
        })
    }

    /// Fetch and persist the enabled media items. Items that fail at either
    /// step are left out and counted.
    async fn store_media(
        &self,
        record: &PostRecord,
        folder: &StoragePath,
        options: &ArchiveOptions,
        archived_at: DateTime<Utc>,
    ) -> (Vec<StoredAttachment>, usize) {
        let selected: Vec<(usize, &MediaRef)> = record
            .media_items
            .iter()
            .enumerate()
            .filter(|(_, media)| options.media.wants(media.kind))
            .map(|(index, media)| (index + 1, media))
            .collect();
        if selected.is_empty() {
            return (Vec::new(), 0);
        }

        self.emit_stage(&record.id, Stage::FetchingMedia);
        let mut urls: Vec<String> = Vec::with_capacity(selected.len());
        for (_, media) in &selected {
            if !urls.contains(&media.source_url) {
                urls.push(media.source_url.clone());
            }
        }
        let report = self
            .fetcher
            .fetch_batch(
                &urls,
                options.media.concurrency,
                &options.media.fetch,
                self.sink.as_ref(),
            )
            .await;

        let mut stored = Vec::with_capacity(selected.len());
        let mut failed = 0;
        for (index, media) in selected {
            let fetched = match report.get(&media.source_url) {
                Some(Ok(fetched)) => fetched,
                Some(Err(err)) => {
                    engine_debug!("media {} omitted: {}", media.source_url, err);
                    failed += 1;
                    continue;
                }
                None => {
                    failed += 1;
                    continue;
                }
            };
            match self
                .storage
                .save_attachment(
                    folder,
                    &record.id,
                    index,
                    media,
                    fetched,
                    archived_at,
                    options.collision_policy,
                )
                .await
            {
                Ok(attachment) => stored.push(attachment),
                Err(err) => {
                    engine_warn!("could not store media {}: {}", media.source_url, err);
                    failed += 1;
                }
            }
        }
        (stored, failed)
    }

    async fn rollback(&self, attachments: &[StoredAttachment]) {
        for attachment in attachments {
            if let Err(err) = self.storage.remove(&attachment.path).await {
                engine_warn!("could not remove {}: {}", attachment.path, err);
            }
        }
    }

    fn emit_stage(&self, record_id: &str, stage: Stage) {
        self.sink.emit(ArchiveEvent::Progress(ArchiveProgress {
            record_id: record_id.to_string(),
            stage,
        }));
    }
}
