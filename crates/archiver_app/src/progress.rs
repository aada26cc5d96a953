use archiver_engine::{ArchiveEvent, ProgressSink};
use engine_logging::{engine_debug, engine_info, engine_warn};

/// Reports pipeline progress through the log.
pub(crate) struct LogProgressSink;

impl ProgressSink for LogProgressSink {
    fn emit(&self, event: ArchiveEvent) {
        match event {
            ArchiveEvent::Progress(progress) => {
                engine_debug!("{}: {:?}", progress.record_id, progress.stage);
            }
            ArchiveEvent::MediaFetched {
                url,
                succeeded,
                completed,
                total,
            } => {
                if succeeded {
                    engine_debug!("media {}/{} fetched: {}", completed, total, url);
                } else {
                    engine_warn!("media {}/{} failed: {}", completed, total, url);
                }
            }
            ArchiveEvent::Completed { record_id, result } => match result {
                Ok(path) => engine_info!("{} saved as {}", record_id, path),
                Err(reason) => engine_warn!("{} not archived: {}", record_id, reason),
            },
        }
    }
}
