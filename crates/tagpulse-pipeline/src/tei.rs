//! TEI (Text Embeddings Inference) client for classification and embeddings.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::PipelineError;
use crate::models::{ClassScore, Embedder, SentimentModel};

/// Maximum number of texts per /embed call.
const EMBED_BATCH_SIZE: usize = 64;

/// TEI HTTP client.
pub struct TeiClient {
    client: reqwest::Client,
    base_url: String,
}

/// Subset of the `/info` response.
#[derive(Debug, Clone, Deserialize)]
pub struct TeiInfo {
    pub model_id: String,
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    inputs: &'a [&'a str],
    truncate: bool,
}

#[derive(Serialize)]
struct PredictRequest<'a> {
    inputs: Vec<[&'a str; 1]>,
    truncate: bool,
}

impl TeiClient {
    /// Create a new `TeiClient` for the server at `tei_url`.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Http`] if the HTTP client cannot be built.
    pub fn new(tei_url: &str, timeout: Duration) -> Result<Self, PipelineError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: tei_url.trim_end_matches('/').to_owned(),
        })
    }

    /// Fetch the served model's metadata.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Tei`] if the request fails or the response
    /// cannot be parsed.
    pub async fn info(&self) -> Result<TeiInfo, PipelineError> {
        let response = self
            .client
            .get(format!("{}/info", self.base_url))
            .send()
            .await
            .map_err(|e| PipelineError::Tei(format!("TEI info request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(PipelineError::Tei(format!(
                "TEI info returned status {}",
                response.status()
            )));
        }

        response
            .json()
            .await
            .map_err(|e| PipelineError::Tei(format!("TEI info parse error: {e}")))
    }

    /// Classify a batch of texts in one `/predict` call.
    ///
    /// Returns one list of class scores per input text, in the same order.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Tei`] if the request fails, the response
    /// cannot be parsed, or the result count differs from the input count.
    pub async fn predict(&self, texts: &[&str]) -> Result<Vec<Vec<ClassScore>>, PipelineError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let request = PredictRequest {
            inputs: texts.iter().map(|t| [*t]).collect(),
            truncate: true,
        };
        let response = self
            .client
            .post(format!("{}/predict", self.base_url))
            .json(&request)
            .send()
            .await
            .map_err(|e| PipelineError::Tei(format!("TEI predict request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(PipelineError::Tei(format!(
                "TEI predict returned status {}",
                response.status()
            )));
        }

        let predictions: Vec<Vec<ClassScore>> = response
            .json()
            .await
            .map_err(|e| PipelineError::Tei(format!("TEI predict parse error: {e}")))?;

        if predictions.len() != texts.len() {
            return Err(PipelineError::Tei(format!(
                "TEI returned {} predictions for {} inputs",
                predictions.len(),
                texts.len()
            )));
        }

        Ok(predictions)
    }

    /// Generate embeddings for a batch of texts.
    ///
    /// Texts are batched into groups of [`EMBED_BATCH_SIZE`] (64) per request.
    /// Returns one embedding vector per input text, in the same order.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Tei`] if the request fails or the response
    /// cannot be parsed.
    pub async fn embed_texts(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, PipelineError> {
        let mut all_embeddings = Vec::with_capacity(texts.len());
        let url = format!("{}/embed", self.base_url);

        for chunk in texts.chunks(EMBED_BATCH_SIZE) {
            let request = EmbedRequest {
                inputs: chunk,
                truncate: true,
            };
            let response = self
                .client
                .post(&url)
                .json(&request)
                .send()
                .await
                .map_err(|e| PipelineError::Tei(format!("TEI request failed: {e}")))?;

            if !response.status().is_success() {
                return Err(PipelineError::Tei(format!(
                    "TEI returned status {}",
                    response.status()
                )));
            }

            let embeddings: Vec<Vec<f32>> = response
                .json()
                .await
                .map_err(|e| PipelineError::Tei(format!("TEI response parse error: {e}")))?;

            if embeddings.len() != chunk.len() {
                return Err(PipelineError::Tei(format!(
                    "TEI returned {} embeddings for {} inputs",
                    embeddings.len(),
                    chunk.len()
                )));
            }

            all_embeddings.extend(embeddings);
        }

        Ok(all_embeddings)
    }
}

impl SentimentModel for TeiClient {
    async fn classify(&self, texts: &[&str]) -> Result<Vec<Vec<ClassScore>>, PipelineError> {
        self.predict(texts).await
    }
}

impl Embedder for TeiClient {
    async fn embed(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, PipelineError> {
        self.embed_texts(texts).await
    }
}
