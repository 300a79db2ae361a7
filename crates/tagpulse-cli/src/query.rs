//! Read-only handlers over a saved analysis: `search` and `report`.

use std::fmt::Write as _;

use chrono::Utc;
use tagpulse_core::{AppConfig, PostRecord};
use tagpulse_pipeline::{keyword_frequency, meaningful_posts, AnalysisRun, SentimentDistribution};

/// Width of the longest bar in the sentiment chart.
const BAR_WIDTH: usize = 40;
const SAMPLE_POSTS: usize = 5;

fn load_run(config: &AppConfig, hashtag: &str) -> anyhow::Result<AnalysisRun> {
    AnalysisRun::from_snapshot(&config.data_dir, hashtag).map_err(|e| {
        anyhow::anyhow!("no saved analysis for '{hashtag}' ({e}); run `tagpulse analyze` first")
    })
}

/// Print posts whose cleaned caption contains `term`.
///
/// # Errors
///
/// Returns an error if no final snapshot exists for `hashtag`.
pub(crate) fn run_search(
    config: &AppConfig,
    hashtag: &str,
    term: &str,
    case_sensitive: bool,
) -> anyhow::Result<()> {
    let run = load_run(config, hashtag)?;
    let hits = run.search(term, case_sensitive);

    if hits.is_empty() {
        println!("no posts in #{} mention '{term}'", run.hashtag);
        return Ok(());
    }

    println!("{:<12}{:<15}{:<14}CAPTION", "DATE", "SENTIMENT", "SHORTCODE");
    for record in hits {
        println!(
            "{:<12}{:<15}{:<14}{}",
            record
                .date
                .map_or_else(|| "-".to_owned(), |d| d.to_string()),
            record
                .sentiment
                .map_or_else(|| "-".to_owned(), |s| s.to_string()),
            record.shortcode,
            record.cleaned_text()
        );
    }
    Ok(())
}

/// Print the markdown report (or JSON aggregates) for `hashtag`.
///
/// # Errors
///
/// Returns an error if no final snapshot exists for `hashtag`.
pub(crate) fn run_report(
    config: &AppConfig,
    hashtag: &str,
    top: usize,
    json: bool,
) -> anyhow::Result<()> {
    let run = load_run(config, hashtag)?;

    if json {
        let keywords: Vec<_> = keyword_frequency(&run.records, 2)
            .into_iter()
            .take(top)
            .collect();
        let value = serde_json::json!({
            "hashtag": run.hashtag,
            "posts": run.records.len(),
            "sentiment": SentimentDistribution::from_records(&run.records),
            "keywords": keywords,
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
    } else {
        print!("{}", render_report(&run.hashtag, &run.records, top));
    }
    Ok(())
}

/// Markdown report with an ASCII sentiment chart, top keywords and sample posts.
pub(crate) fn render_report(hashtag: &str, records: &[PostRecord], top: usize) -> String {
    let dist = SentimentDistribution::from_records(records);
    let keywords = keyword_frequency(records, 2);
    let mut out = String::new();

    let _ = writeln!(out, "# Hashtag Report: #{hashtag}");
    let _ = writeln!(out);
    let _ = writeln!(
        out,
        "**Generated**: {}",
        Utc::now().format("%Y-%m-%d %H:%M UTC")
    );
    let _ = writeln!(out, "**Posts**: {}", records.len());
    let _ = writeln!(out, "**Scored**: {}", dist.predicted());
    let _ = writeln!(out);

    let _ = writeln!(out, "## Sentiment");
    let _ = writeln!(out);
    let _ = writeln!(out, "```");
    for line in bar_chart(&dist.chart_rows().map(|(s, n)| (s.to_string(), n))) {
        let _ = writeln!(out, "{line}");
    }
    let _ = writeln!(out, "```");
    if dist.unprocessable + dist.error > 0 {
        let _ = writeln!(
            out,
            "\n{} unprocessable, {} failed to score.",
            dist.unprocessable, dist.error
        );
    }
    let _ = writeln!(out);

    let _ = writeln!(out, "## Top Keywords");
    let _ = writeln!(out);
    if keywords.is_empty() {
        let _ = writeln!(out, "_No keywords extracted._");
    } else {
        let _ = writeln!(out, "| Keyword | Posts |");
        let _ = writeln!(out, "|---------|-------|");
        for (keyword, count) in keywords.iter().take(top) {
            let _ = writeln!(out, "| {keyword} | {count} |");
        }
    }
    let _ = writeln!(out);

    let _ = writeln!(out, "## Sample Posts");
    let _ = writeln!(out);
    let samples = meaningful_posts(records, 10, 3);
    if samples.is_empty() {
        let _ = writeln!(out, "_No posts long enough to show._");
    }
    for record in samples.into_iter().take(SAMPLE_POSTS) {
        let label = record
            .sentiment
            .map_or_else(|| "unscored".to_owned(), |s| s.to_string());
        let _ = writeln!(out, "- [{label}] {}", record.cleaned_text());
    }
    out
}

/// One `label | ##### count` line per row, scaled to [`BAR_WIDTH`].
fn bar_chart(rows: &[(String, usize)]) -> Vec<String> {
    let max = rows.iter().map(|(_, n)| *n).max().unwrap_or(0);
    let label_width = rows.iter().map(|(l, _)| l.len()).max().unwrap_or(0);
    rows.iter()
        .map(|(label, n)| {
            let len = if max == 0 { 0 } else { n * BAR_WIDTH / max };
            let len = if *n > 0 { len.max(1) } else { 0 };
            format!("{label:<label_width$} | {} {n}", "#".repeat(len))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tagpulse_core::Sentiment;

    fn record(caption: &str, sentiment: Sentiment, keywords: &[&str]) -> PostRecord {
        let mut r = PostRecord::collected(
            caption.to_owned(),
            None,
            "sc".to_owned(),
            String::new(),
            "여행".to_owned(),
            Utc::now(),
        );
        r.cleaned_caption = Some(caption.to_owned());
        r.sentiment = Some(sentiment);
        r.keywords = Some(keywords.iter().map(|k| (*k).to_owned()).collect());
        r
    }

    #[test]
    fn bar_chart_scales_to_largest_row() {
        let lines = bar_chart(&[
            ("positive".to_owned(), 10),
            ("neutral".to_owned(), 5),
            ("negative".to_owned(), 0),
        ]);
        assert_eq!(lines[0], format!("positive | {} 10", "#".repeat(BAR_WIDTH)));
        assert_eq!(lines[1], format!("neutral  | {} 5", "#".repeat(BAR_WIDTH / 2)));
        assert_eq!(lines[2], "negative |  0");
    }

    #[test]
    fn bar_chart_gives_small_counts_a_visible_bar() {
        let lines = bar_chart(&[("a".to_owned(), 1000), ("b".to_owned(), 1)]);
        assert_eq!(lines[1], "b | # 1");
    }

    #[test]
    fn report_lists_sections_and_keywords() {
        let records = vec![
            record("제주 바다 정말 좋았다", Sentiment::Positive, &["제주", "바다"]),
            record("바다 바람이 너무 차가웠다", Sentiment::Negative, &["바다"]),
            record("", Sentiment::Unprocessable, &[]),
        ];
        let report = render_report("여행", &records, 1);
        assert!(report.starts_with("# Hashtag Report: #여행\n"));
        assert!(report.contains("**Posts**: 3"));
        assert!(report.contains("**Scored**: 2"));
        assert!(report.contains("| 바다 | 2 |"));
        assert!(!report.contains("| 제주 |"), "top=1 keeps only the first keyword");
        assert!(report.contains("1 unprocessable, 0 failed to score."));
        assert!(report.contains("- [positive] 제주 바다 정말 좋았다"));
    }
}
