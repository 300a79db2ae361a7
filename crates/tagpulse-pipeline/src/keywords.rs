//! Keyword stage: embedding-based key phrase extraction with a diversity
//! constraint (Max Sum Distance over the most relevant candidates).

use std::sync::LazyLock;

use futures::stream::{self, StreamExt};
use regex::Regex;
use tagpulse_core::PostRecord;

use crate::error::PipelineError;
use crate::index::cosine_similarity;
use crate::models::Embedder;
use crate::progress::{ProgressEvent, ProgressSink};
use crate::types::RunState;

/// Texts shorter than this (in characters) get no keywords.
pub const MIN_KEYWORD_TEXT_CHARS: usize = 10;

/// Largest number of combinations searched exhaustively; bigger pools fall
/// back to a greedy pick.
const MAX_EXHAUSTIVE_COMBINATIONS: u64 = 200_000;

static TOKEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\w{2,}").expect("valid regex"));

/// Distinct 1- and 2-word phrases over the lowercase tokens of `text`, in
/// first-seen order. Tokens are runs of at least two word characters.
#[must_use]
pub fn candidate_phrases(text: &str) -> Vec<String> {
    let lowered = text.to_lowercase();
    let tokens: Vec<&str> = TOKEN_RE.find_iter(&lowered).map(|m| m.as_str()).collect();

    let mut phrases: Vec<String> = Vec::new();
    let mut push = |phrase: String| {
        if !phrases.contains(&phrase) {
            phrases.push(phrase);
        }
    };
    for token in &tokens {
        push((*token).to_string());
    }
    for pair in tokens.windows(2) {
        push(format!("{} {}", pair[0], pair[1]));
    }
    phrases
}

/// Choose `top_n` diverse candidates.
///
/// The `nr_candidates` candidates most similar to the document form a pool;
/// the returned indices are the `top_n`-combination from that pool with the
/// smallest summed pairwise similarity, ordered by descending similarity to
/// the document. When the pool has more than 200 000 combinations the most
/// relevant candidate is taken first and each further pick minimizes its
/// summed similarity to those already chosen.
#[must_use]
pub fn max_sum_selection(
    doc: &[f32],
    candidates: &[Vec<f32>],
    top_n: usize,
    nr_candidates: usize,
) -> Vec<usize> {
    if top_n == 0 || candidates.is_empty() {
        return Vec::new();
    }

    let doc_sim: Vec<f32> = candidates
        .iter()
        .map(|c| cosine_similarity(doc, c))
        .collect();

    let mut pool: Vec<usize> = (0..candidates.len()).collect();
    pool.sort_by(|&a, &b| doc_sim[b].total_cmp(&doc_sim[a]).then(a.cmp(&b)));
    pool.truncate(nr_candidates.max(top_n));

    let mut chosen: Vec<usize> = if pool.len() <= top_n {
        pool
    } else {
        let pairwise: Vec<Vec<f32>> = pool
            .iter()
            .map(|&i| {
                pool.iter()
                    .map(|&j| cosine_similarity(&candidates[i], &candidates[j]))
                    .collect()
            })
            .collect();

        let combo = if combinations(pool.len(), top_n) > MAX_EXHAUSTIVE_COMBINATIONS {
            greedy_selection(&pairwise, top_n)
        } else {
            let mut best: Option<(f32, Vec<usize>)> = None;
            let mut current = Vec::with_capacity(top_n);
            search_combinations(&pairwise, top_n, 0, &mut current, 0.0, &mut best);
            best.map(|(_, combo)| combo).unwrap_or_default()
        };
        combo.into_iter().map(|p| pool[p]).collect()
    };

    chosen.sort_by(|&a, &b| doc_sim[b].total_cmp(&doc_sim[a]).then(a.cmp(&b)));
    chosen
}

/// `n` choose `k`, saturating at `u64::MAX`.
fn combinations(n: usize, k: usize) -> u64 {
    let k = k.min(n - k) as u64;
    let n = n as u64;
    let mut acc: u64 = 1;
    for i in 0..k {
        match acc.checked_mul(n - i) {
            Some(v) => acc = v / (i + 1),
            None => return u64::MAX,
        }
    }
    acc
}

/// Pool position 0 first, then repeatedly the position with the lowest summed
/// similarity to those already chosen (lowest position on ties).
fn greedy_selection(pairwise: &[Vec<f32>], k: usize) -> Vec<usize> {
    let mut chosen = vec![0];
    while chosen.len() < k {
        let next = (0..pairwise.len())
            .filter(|p| !chosen.contains(p))
            .map(|p| (p, chosen.iter().map(|&c| pairwise[c][p]).sum::<f32>()))
            .min_by(|(a, sa), (b, sb)| sa.total_cmp(sb).then(a.cmp(b)));
        match next {
            Some((p, _)) => chosen.push(p),
            None => break,
        }
    }
    chosen
}

/// Depth-first walk over every `k`-combination of pool positions, keeping the
/// first one with the lowest summed pairwise similarity.
fn search_combinations(
    pairwise: &[Vec<f32>],
    k: usize,
    start: usize,
    current: &mut Vec<usize>,
    partial_sum: f32,
    best: &mut Option<(f32, Vec<usize>)>,
) {
    if current.len() == k {
        if best.as_ref().is_none_or(|(sum, _)| partial_sum < *sum) {
            *best = Some((partial_sum, current.clone()));
        }
        return;
    }
    let remaining = k - current.len();
    for next in start..=pairwise.len() - remaining {
        let added: f32 = current.iter().map(|&p| pairwise[p][next]).sum();
        current.push(next);
        search_combinations(pairwise, k, next + 1, current, partial_sum + added, best);
        current.pop();
    }
}

/// Extract up to `top_n` diverse key phrases from `text`, most relevant first.
///
/// Texts shorter than [`MIN_KEYWORD_TEXT_CHARS`] return an empty list
/// without calling the embedder.
///
/// # Errors
///
/// Returns [`PipelineError::Tei`] (or whatever the embedder reports) when the
/// embedding call fails or returns the wrong number of vectors.
pub async fn extract_keywords<E: Embedder>(
    embedder: &E,
    text: &str,
    top_n: usize,
    nr_candidates: usize,
) -> Result<Vec<String>, PipelineError> {
    let text = text.trim();
    if top_n == 0 || text.chars().count() < MIN_KEYWORD_TEXT_CHARS {
        return Ok(Vec::new());
    }

    let phrases = candidate_phrases(text);
    if phrases.is_empty() {
        return Ok(Vec::new());
    }

    let mut inputs: Vec<&str> = Vec::with_capacity(phrases.len() + 1);
    inputs.push(text);
    inputs.extend(phrases.iter().map(String::as_str));

    let mut vectors = embedder.embed(&inputs).await?;
    if vectors.len() != inputs.len() {
        return Err(PipelineError::Tei(format!(
            "embedder returned {} vectors for {} inputs",
            vectors.len(),
            inputs.len()
        )));
    }
    let candidates = vectors.split_off(1);
    let doc = &vectors[0];

    Ok(max_sum_selection(doc, &candidates, top_n, nr_candidates)
        .into_iter()
        .map(|i| phrases[i].clone())
        .collect())
}

/// Summary of a keyword pass over a record list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KeywordStats {
    pub extracted: usize,
    pub empty: usize,
    pub failed: usize,
    pub skipped: usize,
}

/// Set `keywords` on every record that does not have them yet.
///
/// Up to `concurrency` records are processed at once; results are applied in
/// input order. A failed extraction gives that record an empty list.
pub async fn enrich_keywords<E: Embedder>(
    embedder: &E,
    records: &mut [PostRecord],
    top_n: usize,
    nr_candidates: usize,
    concurrency: usize,
    progress: &dyn ProgressSink,
) -> KeywordStats {
    let mut stats = KeywordStats::default();

    let targets: Vec<(usize, String)> = records
        .iter()
        .enumerate()
        .filter(|(_, r)| r.keywords.is_none())
        .map(|(i, r)| (i, r.cleaned_text().to_owned()))
        .collect();
    stats.skipped = records.len() - targets.len();
    let total = targets.len();

    let mut results = stream::iter(targets.into_iter().map(|(idx, text)| async move {
        let outcome = extract_keywords(embedder, &text, top_n, nr_candidates).await;
        (idx, outcome)
    }))
    .buffered(concurrency.max(1));

    let mut done = 0usize;
    while let Some((idx, outcome)) = results.next().await {
        let keywords = match outcome {
            Ok(keywords) => {
                if keywords.is_empty() {
                    stats.empty += 1;
                } else {
                    stats.extracted += 1;
                }
                keywords
            }
            Err(e) => {
                tracing::warn!(
                    shortcode = %records[idx].shortcode,
                    error = %e,
                    "keyword extraction failed for record"
                );
                stats.failed += 1;
                Vec::new()
            }
        };
        records[idx].keywords = Some(keywords);

        done += 1;
        if done % 10 == 0 || done == total {
            progress.on_event(&ProgressEvent::RecordsProcessed {
                stage: RunState::ExtractingKeywords,
                done,
                total,
            });
        }
    }

    tracing::info!(
        total = records.len(),
        extracted = stats.extracted,
        empty = stats.empty,
        failed = stats.failed,
        skipped = stats.skipped,
        "keyword extraction complete"
    );
    stats
}
