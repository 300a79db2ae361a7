//! Conversion from scraping-service wire items to [`PostRecord`]s.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use tagpulse_core::PostRecord;

use crate::types::WirePost;

/// Converts one wire item into a collected [`PostRecord`].
///
/// Returns `None` for items without caption text: a post with nothing to
/// read cannot be analyzed. Missing or negative counts become `0`, and a
/// missing URL is derived from the shortcode.
#[must_use]
pub fn normalize_item(
    item: WirePost,
    hashtag: &str,
    collected_at: DateTime<Utc>,
) -> Option<PostRecord> {
    let caption = item.caption.filter(|c| !c.trim().is_empty())?;
    let shortcode = item.shortcode.unwrap_or_default();
    let url = item
        .url
        .filter(|u| !u.is_empty())
        .unwrap_or_else(|| post_url(&shortcode));
    let date = item.taken_at.as_ref().and_then(parse_taken_at);

    let mut record = PostRecord::collected(
        caption,
        date,
        shortcode,
        url,
        hashtag.to_string(),
        collected_at,
    );
    record.likes = non_negative(item.like_count);
    record.comments = non_negative(item.comment_count);
    Some(record)
}

/// Parses the service's `taken_at` value into a calendar date.
///
/// Accepts RFC 3339, `YYYY-MM-DD HH:MM:SS`, `YYYY-MM-DD`, and integer epoch
/// seconds. Anything else yields `None`.
#[must_use]
pub fn parse_taken_at(value: &serde_json::Value) -> Option<NaiveDate> {
    match value {
        serde_json::Value::Number(n) => n
            .as_i64()
            .and_then(|secs| DateTime::from_timestamp(secs, 0))
            .map(|ts| ts.date_naive()),
        serde_json::Value::String(s) => {
            let s = s.trim();
            DateTime::parse_from_rfc3339(s)
                .map(|ts| ts.with_timezone(&Utc).date_naive())
                .or_else(|_| {
                    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").map(|dt| dt.date())
                })
                .or_else(|_| NaiveDate::parse_from_str(s, "%Y-%m-%d"))
                .ok()
        }
        _ => None,
    }
}

fn post_url(shortcode: &str) -> String {
    if shortcode.is_empty() {
        String::new()
    } else {
        format!("https://www.instagram.com/p/{shortcode}/")
    }
}

fn non_negative(count: Option<i64>) -> u64 {
    count.and_then(|c| u64::try_from(c).ok()).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn item(caption: Option<&str>) -> WirePost {
        WirePost {
            caption: caption.map(str::to_owned),
            taken_at: Some(json!("2024-03-09T21:15:00Z")),
            shortcode: Some("Cx1".to_owned()),
            url: None,
            like_count: Some(12),
            comment_count: None,
        }
    }

    #[test]
    fn item_without_caption_is_dropped() {
        assert!(normalize_item(item(None), "여행", Utc::now()).is_none());
        assert!(normalize_item(item(Some("   ")), "여행", Utc::now()).is_none());
    }

    #[test]
    fn item_fields_are_mapped() {
        let record = normalize_item(item(Some("바다 최고")), "여행", Utc::now()).unwrap();
        assert_eq!(record.caption, "바다 최고");
        assert_eq!(record.hashtag, "여행");
        assert_eq!(record.url, "https://www.instagram.com/p/Cx1/");
        assert_eq!(record.likes, 12);
        assert_eq!(record.comments, 0);
        assert_eq!(record.date, NaiveDate::from_ymd_opt(2024, 3, 9));
        assert!(record.cleaned_caption.is_none());
    }

    #[test]
    fn negative_counts_become_zero() {
        let mut raw = item(Some("caption"));
        raw.like_count = Some(-5);
        let record = normalize_item(raw, "tag", Utc::now()).unwrap();
        assert_eq!(record.likes, 0);
    }

    #[test]
    fn explicit_url_is_kept() {
        let mut raw = item(Some("caption"));
        raw.url = Some("https://example.com/p/1".to_owned());
        let record = normalize_item(raw, "tag", Utc::now()).unwrap();
        assert_eq!(record.url, "https://example.com/p/1");
    }

    #[test]
    fn parse_taken_at_accepts_known_formats() {
        let expected = NaiveDate::from_ymd_opt(2024, 3, 9);
        assert_eq!(parse_taken_at(&json!("2024-03-09T21:15:00+00:00")), expected);
        assert_eq!(parse_taken_at(&json!("2024-03-09 21:15:00")), expected);
        assert_eq!(parse_taken_at(&json!("2024-03-09")), expected);
        assert_eq!(parse_taken_at(&json!(1_710_018_900)), expected);
    }

    #[test]
    fn parse_taken_at_rejects_garbage() {
        assert_eq!(parse_taken_at(&json!("last tuesday")), None);
        assert_eq!(parse_taken_at(&json!(null)), None);
        assert_eq!(parse_taken_at(&json!({"ts": 1})), None);
    }
}
