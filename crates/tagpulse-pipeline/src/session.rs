//! Per-user session: the current analysis, its retrieval index, and the
//! chat history built on top of it.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::PipelineError;
use crate::index::RetrievalIndex;
use crate::models::{ChatResponder, ChatTurn, Embedder};
use crate::pipeline::AnalysisRun;
use crate::types::RetrievalStatus;

/// Reply used whenever a question cannot be answered from the analysis.
pub const CANNOT_ANSWER: &str =
    "Sorry, I can't answer that from the collected posts right now.";

/// Question tokens shorter than this are ignored by substring retrieval.
const MIN_TERM_CHARS: usize = 2;

/// Responder used when no chat backend is configured; every call fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoResponder;

impl ChatResponder for NoResponder {
    async fn answer(
        &self,
        _question: &str,
        _context: &[&str],
        _history: &[ChatTurn],
    ) -> Result<String, PipelineError> {
        Err(PipelineError::Chat("no chat backend configured".to_owned()))
    }
}

pub struct SessionContext {
    id: Uuid,
    created_at: DateTime<Utc>,
    top_k: usize,
    analysis: Option<AnalysisRun>,
    history: Vec<ChatTurn>,
}

impl SessionContext {
    /// New empty session retrieving `top_k` posts per question.
    #[must_use]
    pub fn new(top_k: usize) -> Self {
        Self {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            top_k,
            analysis: None,
            history: Vec::new(),
        }
    }

    #[must_use]
    pub fn id(&self) -> Uuid {
        self.id
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    #[must_use]
    pub fn analysis(&self) -> Option<&AnalysisRun> {
        self.analysis.as_ref()
    }

    #[must_use]
    pub fn history(&self) -> &[ChatTurn] {
        &self.history
    }

    #[must_use]
    pub fn retrieval_status(&self) -> RetrievalStatus {
        self.analysis
            .as_ref()
            .map_or(RetrievalStatus::Unavailable, AnalysisRun::retrieval_status)
    }

    /// Replace the current analysis. The chat history belonged to the old
    /// one and is cleared.
    pub fn set_analysis(&mut self, run: AnalysisRun) {
        tracing::debug!(
            session = %self.id,
            hashtag = %run.hashtag,
            "session analysis replaced"
        );
        self.analysis = Some(run);
        self.history.clear();
    }

    /// Drop the analysis and the chat history.
    pub fn reset(&mut self) {
        tracing::debug!(session = %self.id, "session reset");
        self.analysis = None;
        self.history.clear();
    }

    /// Answer `question` from the current analysis.
    ///
    /// Retrieves up to `top_k` posts (semantic search when embeddings are
    /// available, term matching otherwise) and hands them to `responder`
    /// with the history. Returns [`CANNOT_ANSWER`] when there is no index,
    /// nothing relevant is found, or the responder fails. Every answered
    /// question is appended to the history.
    pub async fn ask<E, C>(&mut self, embedder: &E, responder: &C, question: &str) -> String
    where
        E: Embedder,
        C: ChatResponder,
    {
        let question = question.trim();
        if question.is_empty() {
            return CANNOT_ANSWER.to_owned();
        }

        let context = self.retrieve_context(embedder, question).await;
        let answer = if context.is_empty() {
            tracing::info!(session = %self.id, "no retrieval context, cannot answer");
            CANNOT_ANSWER.to_owned()
        } else {
            let texts: Vec<&str> = context.iter().map(String::as_str).collect();
            match responder.answer(question, &texts, &self.history).await {
                Ok(answer) => answer,
                Err(e) => {
                    tracing::warn!(session = %self.id, error = %e, "chat responder failed");
                    CANNOT_ANSWER.to_owned()
                }
            }
        };

        self.history.push(ChatTurn {
            question: question.to_owned(),
            answer: answer.clone(),
        });
        answer
    }

    async fn retrieve_context<E: Embedder>(&self, embedder: &E, question: &str) -> Vec<String> {
        let Some(index) = self.analysis.as_ref().and_then(|a| a.index.as_ref()) else {
            return Vec::new();
        };

        let ids = if index.status().supports_semantic() {
            match index.query_semantic(embedder, question, self.top_k).await {
                Ok(ids) => ids,
                Err(e) => {
                    tracing::warn!(
                        session = %self.id,
                        error = %e,
                        "semantic retrieval failed, falling back to term matching"
                    );
                    term_matches(index, question, self.top_k)
                }
            }
        } else {
            term_matches(index, question, self.top_k)
        };

        ids.into_iter()
            .filter_map(|id| index.text(id).map(str::to_owned))
            .collect()
    }
}

/// Ids of texts containing any question term, in id order, at most `k`.
fn term_matches(index: &RetrievalIndex, question: &str, k: usize) -> Vec<usize> {
    let mut ids = BTreeSet::new();
    for term in question
        .split_whitespace()
        .map(|t| t.trim_matches(|c: char| !c.is_alphanumeric()))
        .filter(|t| t.chars().count() >= MIN_TERM_CHARS)
    {
        ids.extend(index.query_substring(term, false));
    }
    ids.into_iter().take(k).collect()
}
