//! Aggregations behind the sentiment chart, the keyword cloud and the post
//! listings.

use std::collections::HashMap;

use serde::Serialize;
use tagpulse_core::{PostRecord, Sentiment};

/// Per-label record counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SentimentDistribution {
    pub positive: usize,
    pub neutral: usize,
    pub negative: usize,
    pub unprocessable: usize,
    pub error: usize,
    /// Records the sentiment stage has not reached.
    pub unscored: usize,
}

impl SentimentDistribution {
    #[must_use]
    pub fn from_records(records: &[PostRecord]) -> Self {
        let mut dist = Self::default();
        for record in records {
            match record.sentiment {
                Some(Sentiment::Positive) => dist.positive += 1,
                Some(Sentiment::Neutral) => dist.neutral += 1,
                Some(Sentiment::Negative) => dist.negative += 1,
                Some(Sentiment::Unprocessable) => dist.unprocessable += 1,
                Some(Sentiment::Error) => dist.error += 1,
                None => dist.unscored += 1,
            }
        }
        dist
    }

    /// Records with a real prediction.
    #[must_use]
    pub fn predicted(&self) -> usize {
        self.positive + self.neutral + self.negative
    }

    /// Chart rows in fixed positive, neutral, negative order; zero counts included.
    #[must_use]
    pub fn chart_rows(&self) -> [(Sentiment, usize); 3] {
        [
            (Sentiment::Positive, self.positive),
            (Sentiment::Neutral, self.neutral),
            (Sentiment::Negative, self.negative),
        ]
    }
}

/// Keyword counts across `records`, most frequent first.
///
/// Keywords shorter than `min_len` characters are ignored. Equal counts keep
/// the order in which the keywords were first seen.
#[must_use]
pub fn keyword_frequency(records: &[PostRecord], min_len: usize) -> Vec<(String, usize)> {
    let mut order: Vec<&str> = Vec::new();
    let mut counts: HashMap<&str, usize> = HashMap::new();

    for keyword in records
        .iter()
        .filter_map(|r| r.keywords.as_deref())
        .flatten()
        .filter(|k| k.chars().count() >= min_len)
    {
        let count = counts.entry(keyword.as_str()).or_insert(0);
        if *count == 0 {
            order.push(keyword.as_str());
        }
        *count += 1;
    }

    let mut ranked: Vec<(String, usize)> = order
        .into_iter()
        .map(|k| (k.to_owned(), counts[k]))
        .collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1));
    ranked
}

/// Records whose cleaned caption has at least `min_chars` characters and
/// `min_words` whitespace-separated words.
#[must_use]
pub fn meaningful_posts(
    records: &[PostRecord],
    min_chars: usize,
    min_words: usize,
) -> Vec<&PostRecord> {
    records
        .iter()
        .filter(|r| {
            let text = r.cleaned_text();
            text.chars().count() >= min_chars && text.split_whitespace().count() >= min_words
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn record(sentiment: Option<Sentiment>, keywords: &[&str], cleaned: &str) -> PostRecord {
        let mut r = PostRecord::collected(
            String::new(),
            None,
            String::new(),
            String::new(),
            "tag".to_owned(),
            Utc::now(),
        );
        r.sentiment = sentiment;
        r.keywords = Some(keywords.iter().map(|k| (*k).to_owned()).collect());
        r.cleaned_caption = Some(cleaned.to_owned());
        r
    }

    #[test]
    fn distribution_counts_every_label() {
        let records = vec![
            record(Some(Sentiment::Positive), &[], ""),
            record(Some(Sentiment::Positive), &[], ""),
            record(Some(Sentiment::Unprocessable), &[], ""),
            record(None, &[], ""),
        ];
        let dist = SentimentDistribution::from_records(&records);
        assert_eq!(dist.positive, 2);
        assert_eq!(dist.unprocessable, 1);
        assert_eq!(dist.unscored, 1);
        assert_eq!(dist.predicted(), 2);
        assert_eq!(
            dist.chart_rows(),
            [
                (Sentiment::Positive, 2),
                (Sentiment::Neutral, 0),
                (Sentiment::Negative, 0)
            ]
        );
    }

    #[test]
    fn keyword_frequency_ranks_and_keeps_first_seen_ties() {
        let records = vec![
            record(None, &["바다", "a", "제주"], ""),
            record(None, &["제주", "노을"], ""),
            record(None, &["바다", "제주"], ""),
        ];
        let freq = keyword_frequency(&records, 2);
        assert_eq!(
            freq,
            vec![
                ("제주".to_owned(), 3),
                ("바다".to_owned(), 2),
                ("노을".to_owned(), 1)
            ]
        );
    }

    #[test]
    fn meaningful_posts_need_length_and_words() {
        let records = vec![
            record(None, &[], "제주 바다 정말 최고"),
            record(None, &[], "아주아주아주아주길다"),
            record(None, &[], "a b c"),
        ];
        let kept = meaningful_posts(&records, 10, 3);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].cleaned_text(), "제주 바다 정말 최고");
    }
}
