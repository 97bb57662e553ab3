use thiserror::Error;

pub type Result<T> = std::result::Result<T, SyncError>;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV parsing error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Date parsing error: {0}")]
    DateParse(#[from] chrono::ParseError),

    #[error("Parquet write error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Configuration source error: {0}")]
    Settings(#[from] config::ConfigError),

    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("Malformed record at line {line}, field '{field}': {message}")]
    MalformedRecord {
        line: usize,
        field: &'static str,
        message: String,
    },

    #[error("Transient fetch error for {path}: {message}")]
    TransientFetch { path: String, message: String },

    #[error("Fetch of {path} failed after {attempts} attempts: {message}")]
    FetchFailed {
        path: String,
        attempts: u32,
        message: String,
    },

    #[error("Object store unavailable at key '{key}': {message}")]
    StoreUnavailable { key: String, message: String },

    #[error("Conflicting inventory upserts for station {station} in {year}")]
    ReconciliationConflict { station: String, year: i32 },

    #[error("Invalid data format: {0}")]
    InvalidFormat(String),

    #[error("Async task error: {0}")]
    TaskJoin(#[from] tokio::task::JoinError),
}

impl SyncError {
    pub fn malformed(line: usize, field: &'static str, message: impl Into<String>) -> Self {
        SyncError::MalformedRecord {
            line,
            field,
            message: message.into(),
        }
    }

    pub fn store(key: impl Into<String>, err: impl std::fmt::Display) -> Self {
        SyncError::StoreUnavailable {
            key: key.into(),
            message: err.to_string(),
        }
    }

    /// Errors confined to a single station-file. These keep the owning year
    /// stale but never abort the run.
    pub fn is_file_level(&self) -> bool {
        matches!(
            self,
            SyncError::FetchFailed { .. }
                | SyncError::TransientFetch { .. }
                | SyncError::MalformedRecord { .. }
                | SyncError::InvalidFormat(_)
        )
    }

    pub fn is_transient(&self) -> bool {
        matches!(self, SyncError::TransientFetch { .. })
    }
}
