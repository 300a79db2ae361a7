use std::path::PathBuf;

use serde::Serialize;
use tagpulse_core::AppConfig;

/// Tunables for one analysis run.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Directory that receives the raw and final checkpoints.
    pub data_dir: PathBuf,
    /// Texts per sentiment model call. Affects throughput only.
    pub sentiment_batch_size: usize,
    /// Sentiment input is truncated to this many characters.
    pub sentiment_max_chars: usize,
    pub keyword_top_n: usize,
    /// Size of the candidate pool the diverse keyword set is chosen from.
    pub keyword_candidates: usize,
    /// Records whose keywords are extracted concurrently.
    pub keyword_concurrency: usize,
    pub retrieval_top_k: usize,
    /// When set, only posts dated within the last N days survive collection.
    pub recent_days: Option<u32>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
            sentiment_batch_size: 32,
            sentiment_max_chars: 512,
            keyword_top_n: 3,
            keyword_candidates: 20,
            keyword_concurrency: 4,
            retrieval_top_k: 4,
            recent_days: None,
        }
    }
}

impl PipelineConfig {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            data_dir: config.data_dir.clone(),
            sentiment_batch_size: config.sentiment_batch_size.max(1),
            sentiment_max_chars: config.sentiment_max_chars,
            keyword_top_n: config.keyword_top_n,
            keyword_candidates: config.keyword_candidates,
            keyword_concurrency: config.keyword_concurrency.max(1),
            retrieval_top_k: config.retrieval_top_k,
            recent_days: config.recent_days,
        }
    }
}

/// States of a single analysis run.
///
/// The happy path is strictly linear; `Failed` is reachable only from
/// `Collecting`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    Idle,
    Collecting,
    Cleaning,
    ScoringSentiment,
    ExtractingKeywords,
    Indexing,
    Done,
    Failed,
}

impl RunState {
    /// Returns `true` if a run may move from `self` to `next`.
    #[must_use]
    pub fn can_transition_to(self, next: RunState) -> bool {
        matches!(
            (self, next),
            (RunState::Idle, RunState::Collecting)
                | (RunState::Collecting, RunState::Cleaning | RunState::Failed)
                | (RunState::Cleaning, RunState::ScoringSentiment)
                | (RunState::ScoringSentiment, RunState::ExtractingKeywords)
                | (RunState::ExtractingKeywords, RunState::Indexing)
                | (RunState::Indexing, RunState::Done)
        )
    }

    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, RunState::Done | RunState::Failed)
    }
}

impl std::fmt::Display for RunState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            RunState::Idle => "idle",
            RunState::Collecting => "collecting",
            RunState::Cleaning => "cleaning",
            RunState::ScoringSentiment => "scoring_sentiment",
            RunState::ExtractingKeywords => "extracting_keywords",
            RunState::Indexing => "indexing",
            RunState::Done => "done",
            RunState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Durable snapshot points of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Checkpoint {
    /// Written right after collection.
    Raw,
    /// Written right after keyword extraction.
    Final,
}

impl Checkpoint {
    #[must_use]
    pub fn suffix(self) -> &'static str {
        match self {
            Checkpoint::Raw => "raw",
            Checkpoint::Final => "final",
        }
    }
}

/// What the retrieval layer can do for the current analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RetrievalStatus {
    /// No record had a non-empty cleaned caption.
    Unavailable,
    /// Substring search works; embeddings could not be computed.
    SubstringOnly,
    /// Substring and semantic search both work.
    Ready,
}

impl RetrievalStatus {
    #[must_use]
    pub fn supports_semantic(self) -> bool {
        self == RetrievalStatus::Ready
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn happy_path_transitions_are_legal() {
        let path = [
            RunState::Idle,
            RunState::Collecting,
            RunState::Cleaning,
            RunState::ScoringSentiment,
            RunState::ExtractingKeywords,
            RunState::Indexing,
            RunState::Done,
        ];
        for pair in path.windows(2) {
            assert!(
                pair[0].can_transition_to(pair[1]),
                "{} -> {} should be legal",
                pair[0],
                pair[1]
            );
        }
    }

    #[test]
    fn failed_only_reachable_from_collecting() {
        assert!(RunState::Collecting.can_transition_to(RunState::Failed));
        assert!(!RunState::Cleaning.can_transition_to(RunState::Failed));
        assert!(!RunState::Indexing.can_transition_to(RunState::Failed));
        assert!(!RunState::Idle.can_transition_to(RunState::Failed));
    }

    #[test]
    fn stages_cannot_be_skipped() {
        assert!(!RunState::Collecting.can_transition_to(RunState::ScoringSentiment));
        assert!(!RunState::Done.can_transition_to(RunState::Idle));
    }

    #[test]
    fn run_state_serializes_snake_case() {
        let json = serde_json::to_string(&RunState::ScoringSentiment).unwrap();
        assert_eq!(json, "\"scoring_sentiment\"");
        assert_eq!(RunState::ExtractingKeywords.to_string(), "extracting_keywords");
    }
}
