//! The post record carried through every pipeline stage.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Smallest post-count limit accepted for a collection run.
pub const MIN_POST_LIMIT: u32 = 20;
/// Largest post-count limit accepted for a collection run.
pub const MAX_POST_LIMIT: u32 = 500;

/// Sentiment label attached to a record by the sentiment stage.
///
/// `Unprocessable` and `Error` are sentinels: the stage ran but produced no
/// real prediction (empty cleaned text, or a failed model call).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Positive,
    Neutral,
    Negative,
    Unprocessable,
    Error,
}

impl Sentiment {
    /// `true` for the three labels a model can actually predict.
    #[must_use]
    pub fn is_prediction(self) -> bool {
        matches!(self, Self::Positive | Self::Neutral | Self::Negative)
    }

    /// Parse a stored label, including the Korean labels written by older
    /// snapshot files. Unknown labels give `None`.
    #[must_use]
    pub fn from_stored(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "positive" | "긍정" => Some(Self::Positive),
            "neutral" | "중립" => Some(Self::Neutral),
            "negative" | "부정" => Some(Self::Negative),
            "unprocessable" | "처리불가" => Some(Self::Unprocessable),
            "error" => Some(Self::Error),
            _ => None,
        }
    }
}

impl std::fmt::Display for Sentiment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Sentiment::Positive => write!(f, "positive"),
            Sentiment::Neutral => write!(f, "neutral"),
            Sentiment::Negative => write!(f, "negative"),
            Sentiment::Unprocessable => write!(f, "unprocessable"),
            Sentiment::Error => write!(f, "error"),
        }
    }
}

/// One collected post plus every field derived from it.
///
/// Collector fields are always present. Each later stage owns exactly one
/// group of optional fields, which stays `None` (and is omitted from JSON)
/// until that stage has run. Unknown keys read from older snapshots are
/// kept in `extra` so they survive a read/write cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostRecord {
    #[serde(default, deserialize_with = "lenient_text")]
    pub caption: String,
    #[serde(default, deserialize_with = "lenient_date")]
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub shortcode: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub hashtag: String,
    #[serde(default)]
    pub likes: u64,
    #[serde(default)]
    pub comments: u64,
    #[serde(default = "Utc::now", deserialize_with = "lenient_timestamp")]
    pub collected_at: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cleaned_caption: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient_sentiment",
        skip_serializing_if = "Option::is_none"
    )]
    pub sentiment: Option<Sentiment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keywords: Option<Vec<String>>,

    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl PostRecord {
    /// Build a freshly collected record with no derived fields.
    #[must_use]
    pub fn collected(
        caption: String,
        date: Option<NaiveDate>,
        shortcode: String,
        url: String,
        hashtag: String,
        collected_at: DateTime<Utc>,
    ) -> Self {
        Self {
            caption,
            date,
            shortcode,
            url,
            hashtag,
            likes: 0,
            comments: 0,
            collected_at,
            cleaned_caption: None,
            sentiment: None,
            score: None,
            keywords: None,
            extra: serde_json::Map::new(),
        }
    }

    /// Cleaned caption, or `""` when the cleaning stage has not produced one.
    #[must_use]
    pub fn cleaned_text(&self) -> &str {
        self.cleaned_caption.as_deref().unwrap_or("")
    }
}

/// Accept any JSON value for a text field; non-strings become `""`.
fn lenient_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::String(s) => s,
        _ => String::new(),
    })
}

/// Read `YYYY-MM-DD`, tolerating a trailing time part; anything else is `None`.
fn lenient_date<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value
        .as_ref()
        .and_then(serde_json::Value::as_str)
        .and_then(|s| s.get(..10))
        .and_then(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()))
}

/// Read a stored sentiment label; unknown or non-string values are `None`.
fn lenient_sentiment<'de, D>(deserializer: D) -> Result<Option<Sentiment>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value
        .as_ref()
        .and_then(serde_json::Value::as_str)
        .and_then(Sentiment::from_stored))
}

/// Read an RFC 3339 timestamp or a legacy `YYYY-MM-DD HH:MM:SS` (taken as UTC).
///
/// `null` is treated like a missing key.
fn lenient_timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let Some(raw) = Option::<String>::deserialize(deserializer)? else {
        return Ok(Utc::now());
    };
    if let Ok(ts) = DateTime::parse_from_rfc3339(&raw) {
        return Ok(ts.with_timezone(&Utc));
    }
    chrono::NaiveDateTime::parse_from_str(&raw, "%Y-%m-%d %H:%M:%S")
        .map(|naive| naive.and_utc())
        .map_err(serde::de::Error::custom)
}

/// Strip `#` markers and surrounding whitespace from user input.
///
/// Returns `None` when nothing usable remains.
#[must_use]
pub fn normalize_hashtag(raw: &str) -> Option<String> {
    let tag: String = raw.trim().chars().filter(|c| *c != '#').collect();
    let tag = tag.trim();
    if tag.is_empty() {
        None
    } else {
        Some(tag.to_string())
    }
}

/// Bound a requested post count to `[MIN_POST_LIMIT, MAX_POST_LIMIT]`.
#[must_use]
pub fn clamp_post_limit(limit: u32) -> u32 {
    limit.clamp(MIN_POST_LIMIT, MAX_POST_LIMIT)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> PostRecord {
        PostRecord::collected(
            "오늘 완전 좋았다".to_string(),
            NaiveDate::from_ymd_opt(2024, 5, 1),
            "abc123".to_string(),
            "https://www.instagram.com/p/abc123/".to_string(),
            "여행".to_string(),
            Utc::now(),
        )
    }

    #[test]
    fn sentiment_serializes_lowercase() {
        let json = serde_json::to_string(&Sentiment::Unprocessable).unwrap();
        assert_eq!(json, "\"unprocessable\"");
        let back: Sentiment = serde_json::from_str("\"negative\"").unwrap();
        assert_eq!(back, Sentiment::Negative);
    }

    #[test]
    fn only_model_labels_are_predictions() {
        assert!(Sentiment::Neutral.is_prediction());
        assert!(!Sentiment::Error.is_prediction());
        assert!(!Sentiment::Unprocessable.is_prediction());
    }

    #[test]
    fn unset_stage_fields_are_omitted() {
        let value = serde_json::to_value(sample()).unwrap();
        let obj = value.as_object().unwrap();
        assert!(!obj.contains_key("cleaned_caption"));
        assert!(!obj.contains_key("sentiment"));
        assert!(!obj.contains_key("keywords"));
        assert_eq!(obj["date"], "2024-05-01");
    }

    #[test]
    fn non_text_caption_reads_as_empty() {
        let json = r#"{"caption": 12345, "collected_at": "2024-05-01T00:00:00Z"}"#;
        let record: PostRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.caption, "");
        assert_eq!(record.likes, 0);
        assert!(record.date.is_none());
    }

    #[test]
    fn legacy_datetime_strings_read_as_dates() {
        let json = r#"{"caption": "x", "date": "2024-05-01 13:45:00", "collected_at": "2024-05-01T00:00:00Z"}"#;
        let record: PostRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.date, NaiveDate::from_ymd_opt(2024, 5, 1));

        let json = r#"{"caption": "x", "date": "yesterday", "collected_at": "2024-05-01T00:00:00Z"}"#;
        let record: PostRecord = serde_json::from_str(json).unwrap();
        assert!(record.date.is_none());
    }

    #[test]
    fn legacy_collected_at_is_read_as_utc() {
        let json = r#"{"caption": "x", "collected_at": "2024-05-01 09:30:00"}"#;
        let record: PostRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.collected_at.to_rfc3339(), "2024-05-01T09:30:00+00:00");
    }

    #[test]
    fn legacy_sentiment_labels_are_mapped() {
        for (stored, expected) in [
            ("긍정", Some(Sentiment::Positive)),
            ("부정", Some(Sentiment::Negative)),
            ("중립", Some(Sentiment::Neutral)),
            ("처리불가", Some(Sentiment::Unprocessable)),
            ("ERROR", Some(Sentiment::Error)),
            ("neutral", Some(Sentiment::Neutral)),
            ("mixed", None),
        ] {
            let json = format!(
                r#"{{"caption": "x", "collected_at": "2024-05-01T00:00:00Z", "sentiment": "{stored}"}}"#
            );
            let record: PostRecord = serde_json::from_str(&json).unwrap();
            assert_eq!(record.sentiment, expected, "stored label {stored}");
        }
    }

    #[test]
    fn null_or_numeric_sentiment_reads_as_unset() {
        let json = r#"{"caption": "x", "collected_at": "2024-05-01T00:00:00Z", "sentiment": null}"#;
        let record: PostRecord = serde_json::from_str(json).unwrap();
        assert!(record.sentiment.is_none());

        let json = r#"{"caption": "x", "collected_at": "2024-05-01T00:00:00Z", "sentiment": 1}"#;
        let record: PostRecord = serde_json::from_str(json).unwrap();
        assert!(record.sentiment.is_none());
    }

    #[test]
    fn null_collected_at_falls_back_to_now() {
        let before = Utc::now();
        let record: PostRecord =
            serde_json::from_str(r#"{"caption": "x", "collected_at": null}"#).unwrap();
        assert!(record.collected_at >= before);
    }

    #[test]
    fn unknown_fields_survive_round_trip() {
        let json = r#"{"caption": "hi there", "collected_at": "2024-05-01T00:00:00Z", "owner": "someone"}"#;
        let record: PostRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.extra["owner"], "someone");
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["owner"], "someone");
    }

    #[test]
    fn normalize_hashtag_strips_markers() {
        assert_eq!(normalize_hashtag("  #여행 ").as_deref(), Some("여행"));
        assert_eq!(normalize_hashtag("#o#otd").as_deref(), Some("ootd"));
        assert_eq!(normalize_hashtag("##"), None);
        assert_eq!(normalize_hashtag("   "), None);
    }

    #[test]
    fn clamp_post_limit_bounds_range() {
        assert_eq!(clamp_post_limit(5), MIN_POST_LIMIT);
        assert_eq!(clamp_post_limit(100), 100);
        assert_eq!(clamp_post_limit(10_000), MAX_POST_LIMIT);
    }
}
