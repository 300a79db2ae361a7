//! Run orchestration: collect → clean → sentiment → keywords → index.

use std::path::{Path, PathBuf};

use chrono::{Days, NaiveDate, Utc};
use tagpulse_collector::CollectStatus;
use tagpulse_core::{clamp_post_limit, normalize_hashtag, PostRecord};

use crate::error::PipelineError;
use crate::index::RetrievalIndex;
use crate::keywords::enrich_keywords;
use crate::models::{Embedder, PostSource, SentimentModel};
use crate::normalize::clean_records;
use crate::progress::{NoProgress, ProgressEvent, ProgressSink};
use crate::sentiment::enrich_sentiment;
use crate::snapshot::{load_checkpoint, write_snapshot};
use crate::types::{Checkpoint, PipelineConfig, RetrievalStatus, RunState};

/// The enriched result of one analysis run.
#[derive(Debug, Clone)]
pub struct AnalysisRun {
    pub hashtag: String,
    /// Records in collection order.
    pub records: Vec<PostRecord>,
    /// How collection went; `None` when the run was loaded from a snapshot.
    pub collect_status: Option<CollectStatus>,
    pub index: Option<RetrievalIndex>,
    pub state: RunState,
    pub raw_snapshot: Option<PathBuf>,
    pub final_snapshot: Option<PathBuf>,
}

impl AnalysisRun {
    #[must_use]
    pub fn retrieval_status(&self) -> RetrievalStatus {
        self.index
            .as_ref()
            .map_or(RetrievalStatus::Unavailable, RetrievalIndex::status)
    }

    /// Rebuild a finished analysis from the final checkpoint of `hashtag`.
    ///
    /// The index supports substring search only until
    /// [`AnalysisRun::enable_semantic`] is called.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidHashtag`] for an empty tag, or the
    /// snapshot error when the checkpoint cannot be read.
    pub fn from_snapshot(data_dir: &Path, hashtag: &str) -> Result<Self, PipelineError> {
        let hashtag = normalize_hashtag(hashtag)
            .ok_or_else(|| PipelineError::InvalidHashtag(hashtag.to_owned()))?;
        let records = load_checkpoint(data_dir, &hashtag, Checkpoint::Final)?;
        let index = RetrievalIndex::from_records(&records);
        tracing::info!(
            hashtag = %hashtag,
            count = records.len(),
            indexed = index.as_ref().map_or(0, RetrievalIndex::len),
            "analysis loaded from snapshot"
        );
        Ok(Self {
            hashtag,
            records,
            collect_status: None,
            index,
            state: RunState::Done,
            raw_snapshot: None,
            final_snapshot: None,
        })
    }

    /// Embed the indexed texts so semantic retrieval works.
    ///
    /// Failure is logged and leaves substring search in place.
    pub async fn enable_semantic<E: Embedder>(&mut self, embedder: &E) -> RetrievalStatus {
        if let Some(index) = self.index.as_mut() {
            if let Err(e) = index.attach_embeddings(embedder).await {
                tracing::warn!(
                    hashtag = %self.hashtag,
                    error = %e,
                    "embedding index failed, semantic retrieval unavailable"
                );
            }
        }
        self.retrieval_status()
    }

    /// Records whose cleaned caption contains `term`, in collection order.
    #[must_use]
    pub fn search(&self, term: &str, case_sensitive: bool) -> Vec<&PostRecord> {
        self.index
            .as_ref()
            .map(|index| {
                index
                    .query_substring(term, case_sensitive)
                    .into_iter()
                    .filter_map(|id| self.records.get(id))
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Keep records dated within the last `days` days before `today` (inclusive).
///
/// Records with an unknown date are dropped.
#[must_use]
pub fn filter_recent(records: Vec<PostRecord>, days: u32, today: NaiveDate) -> Vec<PostRecord> {
    let cutoff = today
        .checked_sub_days(Days::new(u64::from(days)))
        .unwrap_or(NaiveDate::MIN);
    records
        .into_iter()
        .filter(|r| r.date.is_some_and(|d| d >= cutoff))
        .collect()
}

/// Tracks the run state and reports every transition.
struct StateTracker<'a> {
    state: RunState,
    progress: &'a dyn ProgressSink,
}

impl StateTracker<'_> {
    fn advance(&mut self, next: RunState) {
        debug_assert!(
            self.state.can_transition_to(next),
            "illegal run transition {} -> {}",
            self.state,
            next
        );
        self.progress.on_event(&ProgressEvent::StateChanged {
            from: self.state,
            to: next,
        });
        self.state = next;
    }
}

/// Sequences the stages of an analysis run over injected capabilities.
pub struct Pipeline<'a, P, S, E> {
    source: &'a P,
    sentiment: &'a S,
    embedder: &'a E,
    config: &'a PipelineConfig,
    progress: &'a dyn ProgressSink,
}

impl<'a, P, S, E> Pipeline<'a, P, S, E>
where
    P: PostSource,
    S: SentimentModel,
    E: Embedder,
{
    #[must_use]
    pub fn new(source: &'a P, sentiment: &'a S, embedder: &'a E, config: &'a PipelineConfig) -> Self {
        Self {
            source,
            sentiment,
            embedder,
            config,
            progress: &NoProgress,
        }
    }

    #[must_use]
    pub fn with_progress(mut self, progress: &'a dyn ProgressSink) -> Self {
        self.progress = progress;
        self
    }

    /// Run every stage for `hashtag` and return the enriched analysis.
    ///
    /// `limit` is clamped to the accepted post-count range. Record-level
    /// failures never abort the run; they leave sentinel values on the
    /// affected records. A checkpoint that cannot be written is logged and
    /// its path left as `None`.
    ///
    /// # Errors
    ///
    /// - [`PipelineError::InvalidHashtag`]: nothing usable after stripping `#`.
    /// - [`PipelineError::NoDataCollected`]: collection (after the optional
    ///   recent-days filter) produced no records; no snapshot is written.
    #[allow(clippy::too_many_lines)]
    pub async fn run(&self, hashtag: &str, limit: u32) -> Result<AnalysisRun, PipelineError> {
        let hashtag = normalize_hashtag(hashtag)
            .ok_or_else(|| PipelineError::InvalidHashtag(hashtag.to_owned()))?;
        let limit = clamp_post_limit(limit);
        let mut tracker = StateTracker {
            state: RunState::Idle,
            progress: self.progress,
        };

        // Collecting
        tracker.advance(RunState::Collecting);
        self.stage_started(RunState::Collecting, limit as usize);
        let outcome = self.source.collect(&hashtag, limit).await;
        let status = outcome.status;
        let mut records = outcome.posts;
        records.truncate(limit as usize);
        let collected = records.len();

        if let Some(days) = self.config.recent_days {
            records = filter_recent(records, days, Utc::now().date_naive());
            tracing::info!(
                hashtag = %hashtag,
                days,
                kept = records.len(),
                dropped = collected - records.len(),
                "recent-days filter applied"
            );
        }

        if records.is_empty() {
            tracker.advance(RunState::Failed);
            let reason = match (status.reason(), collected) {
                (Some(reason), 0) => reason.to_owned(),
                (None, 0) => "collector returned no posts".to_owned(),
                _ => format!(
                    "none of {collected} posts fall within the last {} days",
                    self.config.recent_days.unwrap_or_default()
                ),
            };
            tracing::warn!(hashtag = %hashtag, reason = %reason, "no data collected, run failed");
            return Err(PipelineError::NoDataCollected { hashtag, reason });
        }

        if let CollectStatus::Partial { reason } = &status {
            tracing::warn!(
                hashtag = %hashtag,
                count = records.len(),
                reason = %reason,
                "collection incomplete, continuing with partial data"
            );
        }
        let raw_snapshot = self.checkpoint(&hashtag, Checkpoint::Raw, &records);
        self.stage_finished(RunState::Collecting, records.len());

        // Cleaning
        tracker.advance(RunState::Cleaning);
        self.stage_started(RunState::Cleaning, records.len());
        clean_records(&mut records, self.progress);
        self.stage_finished(RunState::Cleaning, records.len());

        // Sentiment
        tracker.advance(RunState::ScoringSentiment);
        self.stage_started(RunState::ScoringSentiment, records.len());
        enrich_sentiment(
            self.sentiment,
            &mut records,
            self.config.sentiment_batch_size,
            self.config.sentiment_max_chars,
            self.progress,
        )
        .await;
        self.stage_finished(RunState::ScoringSentiment, records.len());

        // Keywords
        tracker.advance(RunState::ExtractingKeywords);
        self.stage_started(RunState::ExtractingKeywords, records.len());
        enrich_keywords(
            self.embedder,
            &mut records,
            self.config.keyword_top_n,
            self.config.keyword_candidates,
            self.config.keyword_concurrency,
            self.progress,
        )
        .await;
        let final_snapshot = self.checkpoint(&hashtag, Checkpoint::Final, &records);
        self.stage_finished(RunState::ExtractingKeywords, records.len());

        // Indexing
        tracker.advance(RunState::Indexing);
        self.stage_started(RunState::Indexing, records.len());
        let mut index = RetrievalIndex::from_records(&records);
        match index.as_mut() {
            Some(index) => {
                if let Err(e) = index.attach_embeddings(self.embedder).await {
                    tracing::warn!(
                        hashtag = %hashtag,
                        error = %e,
                        "embedding index failed, only substring search available"
                    );
                }
            }
            None => {
                tracing::info!(
                    hashtag = %hashtag,
                    "no cleaned captions to index, retrieval unavailable"
                );
            }
        }
        self.stage_finished(RunState::Indexing, index.as_ref().map_or(0, RetrievalIndex::len));

        tracker.advance(RunState::Done);
        tracing::info!(hashtag = %hashtag, count = records.len(), "analysis run complete");

        Ok(AnalysisRun {
            hashtag,
            records,
            collect_status: Some(status),
            index,
            state: tracker.state,
            raw_snapshot,
            final_snapshot,
        })
    }

    /// Write a checkpoint; a failed write is logged and the run continues.
    fn checkpoint(
        &self,
        hashtag: &str,
        checkpoint: Checkpoint,
        records: &[PostRecord],
    ) -> Option<PathBuf> {
        match write_snapshot(&self.config.data_dir, hashtag, checkpoint, records) {
            Ok(path) => Some(path),
            Err(e) => {
                tracing::warn!(
                    hashtag = %hashtag,
                    checkpoint = checkpoint.suffix(),
                    error = %e,
                    "snapshot write failed, continuing without checkpoint"
                );
                None
            }
        }
    }

    fn stage_started(&self, stage: RunState, total: usize) {
        self.progress
            .on_event(&ProgressEvent::StageStarted { stage, total });
    }

    fn stage_finished(&self, stage: RunState, total: usize) {
        self.progress
            .on_event(&ProgressEvent::StageFinished { stage, total });
    }
}
