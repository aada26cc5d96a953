use crate::StoragePath;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Queued,
    Preparing,
    FetchingMedia,
    Rendering,
    Writing,
    Done,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveProgress {
    pub record_id: String,
    pub stage: Stage,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArchiveEvent {
    Progress(ArchiveProgress),
    MediaFetched {
        url: String,
        succeeded: bool,
        completed: usize,
        total: usize,
    },
    /// Final outcome of one record: the stored document path or the
    /// human-readable failure reason.
    Completed {
        record_id: String,
        result: Result<StoragePath, String>,
    },
}

pub trait ProgressSink: Send + Sync {
    fn emit(&self, event: ArchiveEvent);
}

/// Sink that drops every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullProgressSink;

impl ProgressSink for NullProgressSink {
    fn emit(&self, _event: ArchiveEvent) {}
}

/// Why a media item could not be fetched.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct FetchError {
    pub kind: FailureKind,
    pub message: String,
}

impl FetchError {
    pub(crate) fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FailureKind {
    #[error("not an http(s) url")]
    InvalidUrl,
    #[error("connection failed")]
    Network,
    /// Network-layer failure the direct path could not tell apart from an
    /// origin policy block.
    #[error("blocked by origin policy")]
    CorsBlocked,
    #[error("timed out")]
    Timeout,
    #[error("status {0}")]
    HttpStatus(u16),
    #[error("over the {max_bytes} byte limit")]
    TooLarge { max_bytes: u64, actual: Option<u64> },
    #[error("relay failed")]
    Relay,
}

impl FailureKind {
    /// Failures that justify handing the request to the next strategy.
    pub fn is_blocked(&self) -> bool {
        matches!(self, FailureKind::Network | FailureKind::CorsBlocked)
    }

    /// 4xx answers are final, except request timeout and rate limiting.
    pub fn is_retryable(&self) -> bool {
        match self {
            FailureKind::InvalidUrl | FailureKind::TooLarge { .. } => false,
            FailureKind::HttpStatus(code @ 400..=499) => matches!(code, 408 | 429),
            FailureKind::HttpStatus(_)
            | FailureKind::Network
            | FailureKind::CorsBlocked
            | FailureKind::Timeout
            | FailureKind::Relay => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::FailureKind;

    #[test]
    fn client_errors_are_final_except_throttling() {
        assert!(!FailureKind::HttpStatus(404).is_retryable());
        assert!(!FailureKind::HttpStatus(403).is_retryable());
        assert!(FailureKind::HttpStatus(429).is_retryable());
        assert!(FailureKind::HttpStatus(503).is_retryable());
        assert!(FailureKind::Timeout.is_retryable());
        assert!(!FailureKind::InvalidUrl.is_retryable());
    }

    #[test]
    fn only_network_layer_failures_escalate() {
        assert!(FailureKind::Network.is_blocked());
        assert!(FailureKind::CorsBlocked.is_blocked());
        assert!(!FailureKind::Timeout.is_blocked());
        assert!(!FailureKind::HttpStatus(500).is_blocked());
    }
}
