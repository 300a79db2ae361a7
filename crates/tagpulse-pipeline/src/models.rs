//! Capabilities the pipeline depends on, and the factory that builds the
//! production implementations once per process.

use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tagpulse_collector::{CollectOutcome, HashtagClient};
use tokio::sync::OnceCell;

use crate::error::PipelineError;
use crate::tei::TeiClient;

/// One class score returned by a sequence classifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassScore {
    pub label: String,
    pub score: f32,
}

/// One completed exchange in a chat session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub question: String,
    pub answer: String,
}

/// Source of raw posts for a hashtag.
pub trait PostSource: Send + Sync {
    /// Never fails; problems are reported through [`CollectOutcome::status`].
    fn collect(&self, hashtag: &str, limit: u32) -> impl Future<Output = CollectOutcome> + Send;
}

/// Sequence classifier: one list of class scores per input text, same order.
pub trait SentimentModel: Send + Sync {
    fn classify(
        &self,
        texts: &[&str],
    ) -> impl Future<Output = Result<Vec<Vec<ClassScore>>, PipelineError>> + Send;
}

/// Sentence embedder: one vector per input text, same order.
pub trait Embedder: Send + Sync {
    fn embed(
        &self,
        texts: &[&str],
    ) -> impl Future<Output = Result<Vec<Vec<f32>>, PipelineError>> + Send;
}

/// Answers a question from retrieved post texts and the running history.
pub trait ChatResponder: Send + Sync {
    fn answer(
        &self,
        question: &str,
        context: &[&str],
        history: &[ChatTurn],
    ) -> impl Future<Output = Result<String, PipelineError>> + Send;
}

impl PostSource for HashtagClient {
    async fn collect(&self, hashtag: &str, limit: u32) -> CollectOutcome {
        HashtagClient::collect(self, hashtag, limit).await
    }
}

/// Lazily connects to the TEI servers on first use and hands out shared
/// clients afterwards.
pub struct ModelHub {
    sentiment_url: String,
    embedding_url: String,
    timeout: Duration,
    sentiment: OnceCell<TeiClient>,
    embedder: OnceCell<TeiClient>,
}

impl ModelHub {
    #[must_use]
    pub fn new(sentiment_url: &str, embedding_url: &str, timeout: Duration) -> Self {
        Self {
            sentiment_url: sentiment_url.to_owned(),
            embedding_url: embedding_url.to_owned(),
            timeout,
            sentiment: OnceCell::new(),
            embedder: OnceCell::new(),
        }
    }

    /// Sentiment classifier client, created on the first call.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Http`] if the HTTP client cannot be built.
    pub async fn sentiment(&self) -> Result<&TeiClient, PipelineError> {
        self.sentiment
            .get_or_try_init(|| connect(&self.sentiment_url, self.timeout, "sentiment"))
            .await
    }

    /// Embedding client, created on the first call.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Http`] if the HTTP client cannot be built.
    pub async fn embedder(&self) -> Result<&TeiClient, PipelineError> {
        self.embedder
            .get_or_try_init(|| connect(&self.embedding_url, self.timeout, "embedding"))
            .await
    }
}

/// Builds a client and queries `/info`. An unreachable server is logged, not
/// fatal: every later call on the client fails per record instead.
async fn connect(url: &str, timeout: Duration, role: &str) -> Result<TeiClient, PipelineError> {
    let client = TeiClient::new(url, timeout)?;
    match client.info().await {
        Ok(info) => {
            tracing::info!(role, model_id = %info.model_id, url, "TEI model ready");
        }
        Err(e) => {
            tracing::warn!(role, url, error = %e, "TEI info request failed");
        }
    }
    Ok(client)
}
