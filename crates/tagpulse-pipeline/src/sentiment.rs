//! Sentiment stage: cleaned text to `(label, confidence)`.

use tagpulse_core::{PostRecord, Sentiment};

use crate::models::{ClassScore, SentimentModel};
use crate::progress::{ProgressEvent, ProgressSink};
use crate::types::RunState;

/// Top-class scores below this are reported as [`Sentiment::Neutral`].
pub const CONFIDENCE_THRESHOLD: f32 = 0.6;

/// Known model label strings, lowercased, and the sentiment they denote.
const LABEL_TABLE: &[(&str, Sentiment)] = &[
    ("positive", Sentiment::Positive),
    ("pos", Sentiment::Positive),
    ("label_1", Sentiment::Positive),
    ("긍정", Sentiment::Positive),
    ("negative", Sentiment::Negative),
    ("neg", Sentiment::Negative),
    ("label_0", Sentiment::Negative),
    ("부정", Sentiment::Negative),
    ("neutral", Sentiment::Neutral),
    ("neu", Sentiment::Neutral),
    ("중립", Sentiment::Neutral),
];

/// Map a raw model label to a [`Sentiment`].
///
/// Unknown labels fall back to [`Sentiment::Neutral`].
#[must_use]
pub fn map_label(raw: &str) -> Sentiment {
    let key = raw.trim().to_lowercase();
    LABEL_TABLE
        .iter()
        .find(|(label, _)| *label == key)
        .map_or_else(
            || {
                tracing::debug!(label = raw, "unknown sentiment label, treating as neutral");
                Sentiment::Neutral
            },
            |&(_, sentiment)| sentiment,
        )
}

/// Pick the label for one text from its class scores.
///
/// The highest-scoring class wins; when its score is below
/// [`CONFIDENCE_THRESHOLD`] the label becomes neutral and keeps that score.
/// Returns `None` when the model produced no classes.
#[must_use]
pub fn decide(scores: &[ClassScore]) -> Option<(Sentiment, f32)> {
    let top = scores
        .iter()
        .filter(|c| c.score.is_finite())
        .fold(None::<&ClassScore>, |best, c| match best {
            Some(b) if b.score >= c.score => Some(b),
            _ => Some(c),
        })?;
    let score = round4(top.score.clamp(0.0, 1.0));
    let label = if top.score < CONFIDENCE_THRESHOLD {
        Sentiment::Neutral
    } else {
        map_label(&top.label)
    };
    Some((label, score))
}

fn round4(value: f32) -> f32 {
    (value * 10_000.0).round() / 10_000.0
}

/// Score `texts` in input order.
///
/// Blank texts get `(Unprocessable, 0.0)` without reaching the model. Each
/// batch of at most `batch_size` texts is one model call; if that call
/// fails, its texts are retried one at a time and any text that still fails
/// gets `(Error, 0.0)`. The result does not depend on `batch_size`.
pub async fn score_texts<M: SentimentModel>(
    model: &M,
    texts: &[&str],
    batch_size: usize,
    max_chars: usize,
    progress: &dyn ProgressSink,
) -> Vec<(Sentiment, f32)> {
    let mut results = vec![(Sentiment::Unprocessable, 0.0_f32); texts.len()];

    let pending: Vec<(usize, String)> = texts
        .iter()
        .enumerate()
        .filter(|(_, text)| !text.trim().is_empty())
        .map(|(i, text)| (i, text.chars().take(max_chars).collect()))
        .collect();

    let batch_size = batch_size.max(1);
    let batches = pending.len().div_ceil(batch_size);

    for (batch_no, chunk) in pending.chunks(batch_size).enumerate() {
        let inputs: Vec<&str> = chunk.iter().map(|(_, t)| t.as_str()).collect();

        match model.classify(&inputs).await {
            Ok(outputs) if outputs.len() == chunk.len() => {
                for ((idx, _), scores) in chunk.iter().zip(outputs) {
                    results[*idx] = decide(&scores).unwrap_or((Sentiment::Error, 0.0));
                }
            }
            Ok(outputs) => {
                tracing::warn!(
                    expected = chunk.len(),
                    got = outputs.len(),
                    "sentiment model returned wrong result count, retrying per text"
                );
                score_individually(model, chunk, &mut results).await;
            }
            Err(e) => {
                tracing::warn!(
                    batch = batch_no + 1,
                    size = chunk.len(),
                    error = %e,
                    "sentiment batch failed, retrying per text"
                );
                score_individually(model, chunk, &mut results).await;
            }
        }

        progress.on_event(&ProgressEvent::BatchProcessed {
            stage: RunState::ScoringSentiment,
            batch: batch_no + 1,
            batches,
        });
    }

    results
}

async fn score_individually<M: SentimentModel>(
    model: &M,
    chunk: &[(usize, String)],
    results: &mut [(Sentiment, f32)],
) {
    for (idx, text) in chunk {
        results[*idx] = match model.classify(&[text.as_str()]).await {
            Ok(mut outputs) if outputs.len() == 1 => {
                decide(&outputs.remove(0)).unwrap_or((Sentiment::Error, 0.0))
            }
            Ok(_) => (Sentiment::Error, 0.0),
            Err(e) => {
                tracing::warn!(index = idx, error = %e, "sentiment scoring failed for record");
                (Sentiment::Error, 0.0)
            }
        };
    }
}

/// Summary of a sentiment pass over a record list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SentimentStats {
    pub scored: usize,
    pub unprocessable: usize,
    pub errors: usize,
    pub skipped: usize,
}

/// Set `sentiment` and `score` on every record that has no real result yet.
///
/// Records already carrying a prediction or `unprocessable` are left alone;
/// `error` records are scored again.
pub async fn enrich_sentiment<M: SentimentModel>(
    model: &M,
    records: &mut [PostRecord],
    batch_size: usize,
    max_chars: usize,
    progress: &dyn ProgressSink,
) -> SentimentStats {
    let mut stats = SentimentStats::default();

    let targets: Vec<usize> = records
        .iter()
        .enumerate()
        .filter(|(_, r)| matches!(r.sentiment, None | Some(Sentiment::Error)))
        .map(|(i, _)| i)
        .collect();
    stats.skipped = records.len() - targets.len();

    let texts: Vec<&str> = targets.iter().map(|&i| records[i].cleaned_text()).collect();
    let scored = score_texts(model, &texts, batch_size, max_chars, progress).await;

    for (&i, (label, score)) in targets.iter().zip(scored) {
        match label {
            Sentiment::Unprocessable => stats.unprocessable += 1,
            Sentiment::Error => stats.errors += 1,
            _ => stats.scored += 1,
        }
        records[i].sentiment = Some(label);
        records[i].score = Some(score);
    }

    tracing::info!(
        total = records.len(),
        scored = stats.scored,
        unprocessable = stats.unprocessable,
        errors = stats.errors,
        skipped = stats.skipped,
        "sentiment scoring complete"
    );
    stats
}

#[cfg(test)]
mod tests {
    use super::*;

    fn class(label: &str, score: f32) -> ClassScore {
        ClassScore {
            label: label.to_owned(),
            score,
        }
    }

    #[test]
    fn map_label_covers_declared_table() {
        assert_eq!(map_label("POSITIVE"), Sentiment::Positive);
        assert_eq!(map_label("LABEL_1"), Sentiment::Positive);
        assert_eq!(map_label("부정"), Sentiment::Negative);
        assert_eq!(map_label("neu"), Sentiment::Neutral);
    }

    #[test]
    fn map_label_falls_back_to_neutral() {
        assert_eq!(map_label("LABEL_7"), Sentiment::Neutral);
        assert_eq!(map_label(""), Sentiment::Neutral);
    }

    #[test]
    fn decide_picks_highest_class() {
        let scores = [class("negative", 0.1), class("positive", 0.87654)];
        assert_eq!(decide(&scores), Some((Sentiment::Positive, 0.8765)));
    }

    #[test]
    fn low_confidence_becomes_neutral() {
        let scores = [class("negative", 0.55), class("positive", 0.45)];
        assert_eq!(decide(&scores), Some((Sentiment::Neutral, 0.55)));
    }

    #[test]
    fn threshold_is_inclusive() {
        let scores = [class("negative", 0.6), class("positive", 0.4)];
        assert_eq!(decide(&scores), Some((Sentiment::Negative, 0.6)));
    }

    #[test]
    fn empty_scores_have_no_decision() {
        assert_eq!(decide(&[]), None);
    }
}
