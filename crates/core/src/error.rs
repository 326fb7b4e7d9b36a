//! Error taxonomy for the fan-out/fan-in engine.
//!
//! Per-subject domain failures (a compile that failed, a run that timed out)
//! are never represented here; they are ordinary [`crate::model::Status`]
//! values folded into the corpus.

use thiserror::Error;

/// Which per-subject map a duplicate attach targeted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultKind {
    Recipe,
    Compile,
    Run,
}

impl ResultKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ResultKind::Recipe => "recipe",
            ResultKind::Compile => "compile result",
            ResultKind::Run => "run result",
        }
    }
}

impl std::fmt::Display for ResultKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error type for the worker pool, request queue, builder and classifier.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The shared cancellation token fired.
    #[error("operation cancelled")]
    Cancelled,

    /// A batch was declared with no expected requests.
    #[error("batch '{name}' expects no requests; a batch must carry at least one")]
    EmptyBatch { name: String },

    /// The expected request count of a batch does not fit in `usize`.
    #[error("batch '{name}' of {subjects} subjects x {per_subject} requests is too large")]
    BatchTooLarge { name: String, subjects: usize, per_subject: usize },

    /// A stage that needs at least one subject was handed an empty corpus.
    #[error("corpus is empty")]
    EmptyCorpus,

    #[error("duplicate subject name '{0}'")]
    DuplicateName(String),

    #[error("subject '{0}' not found in corpus")]
    NameNotFound(String),

    #[error("subject '{name}' already has a {kind} for '{key}'")]
    DuplicateResult { name: String, kind: ResultKind, key: String },

    /// The other end of a queue went away mid-send or mid-receive.
    #[error("request queue closed")]
    QueueClosed,

    /// Every producer finished before the expected number of requests arrived.
    #[error("batch ended after {received} of {expected} requests")]
    ShortBatch { received: usize, expected: usize },

    /// A serialized request or build event could not be decoded.
    #[error("malformed request: {0}")]
    MalformedRequest(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A per-subject task failed for reasons of its own (not a subject outcome).
    #[error("task for subject '{name}' failed: {source}")]
    Task {
        name: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync + 'static>,
    },
}

impl EngineError {
    /// Wrap an arbitrary task-side error, tagging it with the subject it came from.
    pub fn task(
        name: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync + 'static>>,
    ) -> Self {
        EngineError::Task { name: name.into(), source: source.into() }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, EngineError::Cancelled)
    }

    /// Errors that only echo a peer going away: cancellation, or the other
    /// end of a queue being dropped.
    pub fn is_induced(&self) -> bool {
        matches!(self, EngineError::Cancelled | EngineError::QueueClosed)
    }
}

/// Convenience result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;
