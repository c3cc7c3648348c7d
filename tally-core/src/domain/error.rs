use thiserror::Error;

/// Errors surfaced by the entry store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("{0}")]
    Backend(String),
}

impl StoreError {
    pub fn backend(msg: impl Into<String>) -> Self {
        Self::Backend(msg.into())
    }
}

/// Errors from timer engine operations.
///
/// `start` and `stop` surface these to the caller; the engine is left
/// at its last known good state on failure.
#[derive(Debug, Error)]
pub enum TimerError {
    #[error("timer already running")]
    AlreadyRunning,
    #[error("no timer running")]
    NotRunning,
    #[error("entry store read failed: {0}")]
    StoreRead(#[source] StoreError),
    #[error("entry store write failed: {0}")]
    StoreWrite(#[source] StoreError),
}

/// Errors from the CSV import pipeline.
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("csv must have a header row and at least one data row")]
    TooFewRows,
    #[error("select either start/end time columns or a duration column")]
    MissingTimeColumns,
    #[error("row {row}: {message}")]
    InvalidRow { row: usize, message: String },
    /// The whole batch is aborted on any insert failure; nothing is
    /// committed.
    #[error("import of {attempted} entries aborted, none were created: {source}")]
    Batch {
        attempted: usize,
        #[source]
        source: StoreError,
    },
}
