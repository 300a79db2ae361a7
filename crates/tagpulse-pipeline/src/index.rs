//! In-memory retrieval over cleaned captions.
//!
//! Ids are record positions in the analysis the index was built from.
//! Substring search works as soon as the index exists; semantic search needs
//! [`RetrievalIndex::attach_embeddings`] to have succeeded.

use tagpulse_core::PostRecord;

use crate::error::PipelineError;
use crate::models::Embedder;
use crate::types::RetrievalStatus;

/// Cosine similarity of two vectors; `0.0` when either has zero length or norm.
#[must_use]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let mut dot = 0.0_f32;
    let mut norm_a = 0.0_f32;
    let mut norm_b = 0.0_f32;
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

#[derive(Debug, Clone, PartialEq)]
struct IndexedDoc {
    id: usize,
    text: String,
}

#[derive(Debug, Clone)]
pub struct RetrievalIndex {
    docs: Vec<IndexedDoc>,
    embeddings: Option<Vec<Vec<f32>>>,
}

impl RetrievalIndex {
    /// Index every `(id, text)` pair with non-blank text.
    ///
    /// Returns `None` when no pair qualifies.
    pub fn build<I>(docs: I) -> Option<Self>
    where
        I: IntoIterator<Item = (usize, String)>,
    {
        let docs: Vec<IndexedDoc> = docs
            .into_iter()
            .filter(|(_, text)| !text.trim().is_empty())
            .map(|(id, text)| IndexedDoc { id, text })
            .collect();
        if docs.is_empty() {
            None
        } else {
            Some(Self {
                docs,
                embeddings: None,
            })
        }
    }

    /// Index the cleaned captions of `records`, keyed by position.
    #[must_use]
    pub fn from_records(records: &[PostRecord]) -> Option<Self> {
        Self::build(
            records
                .iter()
                .enumerate()
                .map(|(i, r)| (i, r.cleaned_text().to_owned())),
        )
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.docs.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }

    /// Indexed text for `id`.
    #[must_use]
    pub fn text(&self, id: usize) -> Option<&str> {
        self.docs
            .iter()
            .find(|d| d.id == id)
            .map(|d| d.text.as_str())
    }

    #[must_use]
    pub fn status(&self) -> RetrievalStatus {
        if self.embeddings.is_some() {
            RetrievalStatus::Ready
        } else {
            RetrievalStatus::SubstringOnly
        }
    }

    /// Embed every indexed text so semantic queries become available.
    ///
    /// # Errors
    ///
    /// Propagates the embedder's error, or [`PipelineError::Tei`] when it
    /// returns the wrong number of vectors. The index stays usable for
    /// substring search either way.
    pub async fn attach_embeddings<E: Embedder>(
        &mut self,
        embedder: &E,
    ) -> Result<(), PipelineError> {
        let texts: Vec<&str> = self.docs.iter().map(|d| d.text.as_str()).collect();
        let vectors = embedder.embed(&texts).await?;
        if vectors.len() != self.docs.len() {
            return Err(PipelineError::Tei(format!(
                "embedder returned {} vectors for {} indexed texts",
                vectors.len(),
                self.docs.len()
            )));
        }
        self.embeddings = Some(vectors);
        Ok(())
    }

    /// Ids whose text contains `term`, in id order. A blank term matches nothing.
    #[must_use]
    pub fn query_substring(&self, term: &str, case_sensitive: bool) -> Vec<usize> {
        if term.trim().is_empty() {
            return Vec::new();
        }
        if case_sensitive {
            self.docs
                .iter()
                .filter(|d| d.text.contains(term))
                .map(|d| d.id)
                .collect()
        } else {
            let needle = term.to_lowercase();
            self.docs
                .iter()
                .filter(|d| d.text.to_lowercase().contains(&needle))
                .map(|d| d.id)
                .collect()
        }
    }

    /// The `k` ids most similar to `question`, most similar first.
    ///
    /// Returns fewer than `k` ids when the index is smaller. Equal
    /// similarities are ordered by id.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::RetrievalUnavailable`] when no embeddings are
    /// attached, or the embedder's error for the question.
    pub async fn query_semantic<E: Embedder>(
        &self,
        embedder: &E,
        question: &str,
        k: usize,
    ) -> Result<Vec<usize>, PipelineError> {
        let Some(embeddings) = &self.embeddings else {
            return Err(PipelineError::RetrievalUnavailable(
                "index has no embeddings".to_owned(),
            ));
        };
        if k == 0 {
            return Ok(Vec::new());
        }

        let mut vectors = embedder.embed(&[question]).await?;
        let query = vectors
            .pop()
            .ok_or_else(|| PipelineError::Tei("embedder returned no vector".to_owned()))?;

        let mut ranked: Vec<(usize, f32)> = self
            .docs
            .iter()
            .zip(embeddings)
            .map(|(doc, emb)| (doc.id, cosine_similarity(&query, emb)))
            .collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
        ranked.truncate(k);
        Ok(ranked.into_iter().map(|(id, _)| id).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> RetrievalIndex {
        RetrievalIndex::build(vec![
            (0, "Jeju ocean view".to_owned()),
            (1, String::new()),
            (2, "seoul night market".to_owned()),
            (3, "jeju tangerine".to_owned()),
        ])
        .unwrap()
    }

    #[test]
    fn blank_texts_are_not_indexed() {
        let index = sample();
        assert_eq!(index.len(), 3);
        assert_eq!(index.text(1), None);
        assert_eq!(index.text(2), Some("seoul night market"));
    }

    #[test]
    fn build_without_texts_is_none() {
        assert!(RetrievalIndex::build(vec![(0, "  ".to_owned())]).is_none());
        assert!(RetrievalIndex::from_records(&[]).is_none());
    }

    #[test]
    fn substring_respects_case_flag() {
        let index = sample();
        assert_eq!(index.query_substring("jeju", true), vec![3]);
        assert_eq!(index.query_substring("jeju", false), vec![0, 3]);
        assert!(index.query_substring("busan", false).is_empty());
        assert!(index.query_substring(" ", false).is_empty());
    }

    #[test]
    fn new_index_is_substring_only() {
        assert_eq!(sample().status(), RetrievalStatus::SubstringOnly);
    }

    /// Fixed 2-d vectors for a handful of words; anything else is the zero vector.
    struct TableEmbedder;

    impl Embedder for TableEmbedder {
        async fn embed(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, PipelineError> {
            Ok(texts
                .iter()
                .map(|t| match *t {
                    "east" => vec![1.0, 0.0],
                    "far east" => vec![3.0, 0.0],
                    "north" => vec![0.0, 1.0],
                    "north east" => vec![1.0, 1.0],
                    "mostly east" => vec![3.0, 1.0],
                    _ => vec![0.0, 0.0],
                })
                .collect())
        }
    }

    async fn compass() -> RetrievalIndex {
        let mut index = RetrievalIndex::build(vec![
            (0, "north".to_owned()),
            (2, "north east".to_owned()),
            (4, "far east".to_owned()),
            (5, "mostly east".to_owned()),
            (7, "east".to_owned()),
        ])
        .unwrap();
        index.attach_embeddings(&TableEmbedder).await.unwrap();
        index
    }

    #[tokio::test]
    async fn semantic_query_ranks_by_similarity_and_breaks_ties_by_id() {
        let index = compass().await;
        assert_eq!(index.status(), RetrievalStatus::Ready);

        let ids = index.query_semantic(&TableEmbedder, "east", 5).await.unwrap();
        // "far east" (4) and "east" (7) are both parallel to the query.
        assert_eq!(ids, vec![4, 7, 5, 2, 0]);
    }

    #[tokio::test]
    async fn semantic_query_returns_exactly_k() {
        let index = compass().await;
        let ids = index.query_semantic(&TableEmbedder, "north", 2).await.unwrap();
        assert_eq!(ids, vec![0, 2]);
    }

    #[tokio::test]
    async fn semantic_query_caps_at_index_size() {
        let index = compass().await;
        let ids = index.query_semantic(&TableEmbedder, "east", 50).await.unwrap();
        assert_eq!(ids.len(), index.len());
    }

    #[tokio::test]
    async fn semantic_query_with_zero_k_is_empty() {
        let index = compass().await;
        assert!(index
            .query_semantic(&TableEmbedder, "east", 0)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn semantic_query_without_embeddings_is_unavailable() {
        let err = sample()
            .query_semantic(&TableEmbedder, "east", 3)
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::RetrievalUnavailable(_)));
    }

    #[test]
    fn cosine_of_orthogonal_and_parallel_vectors() {
        assert!((cosine_similarity(&[1.0, 0.0], &[2.0, 0.0]) - 1.0).abs() < 1e-6);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 3.0]).abs() < 1e-6);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]), 0.0);
    }
}
