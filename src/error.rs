use std::path::PathBuf;

/// Raised while resolving configuration at startup. Any of these aborts the
/// process with a non-zero exit code.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value:?} ({reason})")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },

    #[error("unknown time zone {0:?}")]
    TimeZone(String),

    #[error("watchlist is empty")]
    EmptyWatchlist,

    #[error("session boundaries out of order: {0}")]
    SessionOrder(String),
}

/// Failures of the persisted trade ledger.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("ledger I/O on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("ledger serialization: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl LedgerError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        LedgerError::Io {
            path: path.into(),
            source,
        }
    }
}
