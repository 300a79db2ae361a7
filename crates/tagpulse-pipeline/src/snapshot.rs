//! JSON checkpoints of the record list, keyed by hashtag and stage.

use std::fs;
use std::path::{Path, PathBuf};

use tagpulse_core::PostRecord;

use crate::error::PipelineError;
use crate::types::Checkpoint;

/// Replace every character that is not alphanumeric, `_` or `-` with `_`.
#[must_use]
pub fn sanitize_name(hashtag: &str) -> String {
    hashtag
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// `{data_dir}/{sanitized hashtag}_{raw|final}.json`
#[must_use]
pub fn snapshot_path(data_dir: &Path, hashtag: &str, checkpoint: Checkpoint) -> PathBuf {
    data_dir.join(format!(
        "{}_{}.json",
        sanitize_name(hashtag),
        checkpoint.suffix()
    ))
}

/// Overwrite the checkpoint for `hashtag` with `records`.
///
/// The file is an indented JSON array, written to a temporary sibling and
/// renamed into place. `data_dir` is created if missing.
///
/// # Errors
///
/// Returns [`PipelineError::SnapshotIo`] if the directory or file cannot be
/// written, or [`PipelineError::SnapshotFormat`] if serialization fails.
pub fn write_snapshot(
    data_dir: &Path,
    hashtag: &str,
    checkpoint: Checkpoint,
    records: &[PostRecord],
) -> Result<PathBuf, PipelineError> {
    fs::create_dir_all(data_dir).map_err(|source| PipelineError::SnapshotIo {
        path: data_dir.to_path_buf(),
        source,
    })?;

    let path = snapshot_path(data_dir, hashtag, checkpoint);
    let body =
        serde_json::to_string_pretty(records).map_err(|e| PipelineError::SnapshotFormat {
            path: path.clone(),
            reason: e.to_string(),
        })?;

    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, body).map_err(|source| PipelineError::SnapshotIo {
        path: tmp.clone(),
        source,
    })?;
    fs::rename(&tmp, &path).map_err(|source| PipelineError::SnapshotIo {
        path: path.clone(),
        source,
    })?;

    tracing::info!(
        path = %path.display(),
        checkpoint = checkpoint.suffix(),
        count = records.len(),
        "snapshot written"
    );
    Ok(path)
}

/// Read a snapshot file.
///
/// Accepts a bare array of records, `{"posts": [...]}`, or `{"data": [...]}`.
///
/// # Errors
///
/// Returns [`PipelineError::SnapshotIo`] if the file cannot be read, or
/// [`PipelineError::SnapshotFormat`] if it is not one of the accepted shapes.
pub fn read_snapshot(path: &Path) -> Result<Vec<PostRecord>, PipelineError> {
    let body = fs::read_to_string(path).map_err(|source| PipelineError::SnapshotIo {
        path: path.to_path_buf(),
        source,
    })?;
    let format_err = |reason: String| PipelineError::SnapshotFormat {
        path: path.to_path_buf(),
        reason,
    };

    let value: serde_json::Value =
        serde_json::from_str(&body).map_err(|e| format_err(e.to_string()))?;
    let posts = match value {
        serde_json::Value::Array(_) => value,
        serde_json::Value::Object(mut map) => match map.remove("posts").or_else(|| map.remove("data")) {
            Some(posts @ serde_json::Value::Array(_)) => posts,
            _ => return Err(format_err("expected a `posts` or `data` array".to_owned())),
        },
        _ => return Err(format_err("expected an array of posts".to_owned())),
    };

    serde_json::from_value(posts).map_err(|e| format_err(e.to_string()))
}

/// Read the `checkpoint` snapshot for `hashtag` from `data_dir`.
///
/// # Errors
///
/// See [`read_snapshot`].
pub fn load_checkpoint(
    data_dir: &Path,
    hashtag: &str,
    checkpoint: Checkpoint,
) -> Result<Vec<PostRecord>, PipelineError> {
    read_snapshot(&snapshot_path(data_dir, hashtag, checkpoint))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone, Utc};
    use tagpulse_core::Sentiment;

    fn enriched_record() -> PostRecord {
        let mut record = PostRecord::collected(
            "제주 바다 최고 #여행".to_owned(),
            NaiveDate::from_ymd_opt(2024, 3, 9),
            "Cx1".to_owned(),
            "https://www.instagram.com/p/Cx1/".to_owned(),
            "여행".to_owned(),
            Utc.with_ymd_and_hms(2024, 3, 10, 8, 0, 0).unwrap(),
        );
        record.likes = 4;
        record.cleaned_caption = Some("제주 바다 최고".to_owned());
        record.sentiment = Some(Sentiment::Positive);
        record.score = Some(0.9123);
        record.keywords = Some(vec!["제주 바다".to_owned(), "최고".to_owned()]);
        record
            .extra
            .insert("owner".to_owned(), serde_json::json!("someone"));
        record
    }

    #[test]
    fn sanitize_keeps_korean_and_replaces_separators() {
        assert_eq!(sanitize_name("여행"), "여행");
        assert_eq!(sanitize_name("a/b c.d"), "a_b_c_d");
        assert_eq!(sanitize_name("foo-bar_1"), "foo-bar_1");
    }

    #[test]
    fn snapshot_path_uses_checkpoint_suffix() {
        let path = snapshot_path(Path::new("/tmp/data"), "여행", Checkpoint::Final);
        assert_eq!(path, PathBuf::from("/tmp/data/여행_final.json"));
    }

    #[test]
    fn write_then_read_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let records = vec![enriched_record(), {
            let mut r = enriched_record();
            r.shortcode = "Cx2".to_owned();
            r.sentiment = None;
            r.score = None;
            r
        }];

        let path = write_snapshot(dir.path(), "여행", Checkpoint::Final, &records).unwrap();
        let loaded = read_snapshot(&path).unwrap();

        assert_eq!(loaded, records);
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[test]
    fn written_file_is_indented_array() {
        let dir = tempfile::tempdir().unwrap();
        let path =
            write_snapshot(dir.path(), "travel", Checkpoint::Raw, &[enriched_record()]).unwrap();
        let body = fs::read_to_string(path).unwrap();
        assert!(body.starts_with("[\n"));
        assert!(body.contains("\n    \"caption\""));
    }

    #[test]
    fn write_creates_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a").join("b");
        write_snapshot(&nested, "travel", Checkpoint::Raw, &[]).unwrap();
        assert!(nested.join("travel_raw.json").exists());
    }

    #[test]
    fn read_accepts_wrapped_shapes() {
        let dir = tempfile::tempdir().unwrap();
        let posts_path = dir.path().join("posts.json");
        fs::write(
            &posts_path,
            r#"{"posts": [{"caption": "hello there", "date": "2024-03-09 10:00:00"}], "summary": {}}"#,
        )
        .unwrap();
        let data_path = dir.path().join("data.json");
        fs::write(&data_path, r#"{"data": [{"caption": 42}]}"#).unwrap();

        let posts = read_snapshot(&posts_path).unwrap();
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].caption, "hello there");
        assert_eq!(posts[0].date, NaiveDate::from_ymd_opt(2024, 3, 9));

        let data = read_snapshot(&data_path).unwrap();
        assert_eq!(data[0].caption, "");
    }

    #[test]
    fn read_accepts_korean_labelled_records() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("여행_final.json");
        fs::write(
            &path,
            r#"[
              {"caption": "제주 최고", "date": "2024-03-09 10:00:00", "collected_at": "2024-03-10 08:00:00",
               "cleaned_caption": "제주 최고", "sentiment": "긍정", "score": 0.9876, "keywords": ["제주"]},
              {"caption": "1234", "date": null, "collected_at": null,
               "cleaned_caption": "", "sentiment": "처리불가", "score": 0.0, "keywords": []},
              {"caption": "뭔가 이상함", "collected_at": "2024-03-10 08:00:00",
               "cleaned_caption": "뭔가 이상함", "sentiment": "ERROR", "score": 0.0, "keywords": []}
            ]"#,
        )
        .unwrap();

        let records = read_snapshot(&path).unwrap();
        let labels: Vec<_> = records.iter().map(|r| r.sentiment).collect();
        assert_eq!(
            labels,
            vec![
                Some(Sentiment::Positive),
                Some(Sentiment::Unprocessable),
                Some(Sentiment::Error)
            ]
        );
        assert_eq!(records[0].date, NaiveDate::from_ymd_opt(2024, 3, 9));
        assert_eq!(records[0].score, Some(0.9876));
        assert!(records[1].date.is_none());

        let rewritten = write_snapshot(dir.path(), "copy", Checkpoint::Final, &records).unwrap();
        let body = fs::read_to_string(rewritten).unwrap();
        assert!(body.contains("\"sentiment\": \"positive\""));
    }

    #[test]
    fn read_rejects_unknown_shape() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        fs::write(&path, r#"{"items": []}"#).unwrap();
        assert!(matches!(
            read_snapshot(&path),
            Err(PipelineError::SnapshotFormat { .. })
        ));
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            load_checkpoint(dir.path(), "none", Checkpoint::Final),
            Err(PipelineError::SnapshotIo { .. })
        ));
    }
}
