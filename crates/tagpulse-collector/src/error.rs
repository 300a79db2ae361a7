use thiserror::Error;

#[derive(Debug, Error)]
pub enum CollectorError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("rate limited by collector service (retry after {retry_after_secs}s)")]
    RateLimited { retry_after_secs: u64 },

    #[error("collector service rejected credentials (HTTP {status})")]
    Unauthorized { status: u16 },

    #[error("collector service error: HTTP {status} from {url}")]
    ServerError { status: u16, url: String },

    #[error("unexpected HTTP status {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },

    #[error("invalid collector base URL \"{url}\": {reason}")]
    InvalidBaseUrl { url: String, reason: String },
}
