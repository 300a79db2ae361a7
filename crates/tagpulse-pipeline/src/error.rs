use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("invalid hashtag: {0:?}")]
    InvalidHashtag(String),

    #[error("no data collected for #{hashtag}: {reason}")]
    NoDataCollected { hashtag: String, reason: String },

    #[error("TEI error: {0}")]
    Tei(String),

    #[error("chat error: {0}")]
    Chat(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("snapshot I/O error at {}: {source}", .path.display())]
    SnapshotIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("snapshot format error in {}: {reason}", .path.display())]
    SnapshotFormat { path: PathBuf, reason: String },

    #[error("retrieval unavailable: {0}")]
    RetrievalUnavailable(String),
}
