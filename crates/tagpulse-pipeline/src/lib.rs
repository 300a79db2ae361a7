//! Post-enrichment pipeline for tagpulse.
//!
//! Collects posts for a hashtag, cleans their captions, scores sentiment and
//! extracts keywords through TEI-hosted models, then indexes the cleaned text
//! for substring and semantic retrieval. Stages preserve record order and
//! isolate failures per record; only an empty collection aborts a run.

pub mod chat;
pub mod error;
pub mod index;
pub mod keywords;
pub mod models;
pub mod normalize;
pub mod pipeline;
pub mod progress;
pub mod report;
pub mod sentiment;
pub mod session;
pub mod snapshot;
pub mod tei;
pub mod types;

pub use chat::OpenAiChat;
pub use error::PipelineError;
pub use index::RetrievalIndex;
pub use models::{ChatResponder, ChatTurn, ClassScore, Embedder, ModelHub, PostSource, SentimentModel};
pub use normalize::{clean_records, normalize};
pub use pipeline::{filter_recent, AnalysisRun, Pipeline};
pub use progress::{NoProgress, ProgressEvent, ProgressSink, TracingProgress};
pub use report::{keyword_frequency, meaningful_posts, SentimentDistribution};
pub use session::{NoResponder, SessionContext, CANNOT_ANSWER};
pub use snapshot::{load_checkpoint, read_snapshot, snapshot_path, write_snapshot};
pub use tei::TeiClient;
pub use types::{Checkpoint, PipelineConfig, RetrievalStatus, RunState};
