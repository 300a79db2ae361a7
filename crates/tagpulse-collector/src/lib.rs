//! Collector adapter for a hashtag-scraping service.
//!
//! [`HashtagClient::collect`] pages through the service, converts wire items
//! into [`tagpulse_core::PostRecord`]s and reports failures through
//! [`CollectStatus`] instead of an error, so a dead service never aborts the
//! caller's pipeline.

pub mod client;
pub mod error;
pub mod normalize;
pub mod types;

mod rate_limit;

pub use client::{CollectOutcome, CollectStatus, HashtagClient};
pub use error::CollectorError;
pub use normalize::{normalize_item, parse_taken_at};
pub use types::{HashtagPage, WirePost};
