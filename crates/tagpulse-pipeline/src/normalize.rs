//! Caption cleaning: raw post text to analyzable text.

use std::panic::catch_unwind;
use std::sync::LazyLock;

use regex::Regex;
use tagpulse_core::PostRecord;

use crate::progress::{ProgressEvent, ProgressSink};
use crate::types::RunState;

/// Cleaned text shorter than this (in characters) is discarded.
const MIN_CLEANED_CHARS: usize = 3;

/// Characters whose runs of 3+ are collapsed to exactly 2.
const REPEATABLE: &[char] = &['ㅋ', 'ㅎ', '!', '?', '~', '.'];

/// Upper bound on cleaning passes; each pass only removes characters.
const MAX_PASSES: usize = 8;

static HASHTAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"#\S+").expect("valid hashtag regex"));

static MENTION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"@\S+").expect("valid mention regex"));

static URL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"https?://\S+|www\.\S+").expect("valid URL regex")
});

static BARE_DOMAIN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\S+\.(?:com|kr|net|org|co\.kr)\S*").expect("valid bare-domain regex")
});

static EMOJI_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"[\p{Extended_Pictographic}\p{Emoji_Modifier}\p{Regional_Indicator}\u{FE0F}\u{200D}\u{20E3}]",
    )
    .expect("valid emoji regex")
});

static DISALLOWED_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[^\w\s가-힣ㄱ-ㅎㅏ-ㅣ.,!?~\-]").expect("valid whitelist regex")
});

static WHITESPACE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("valid whitespace regex"));

/// Normalize a raw caption into analyzable text.
///
/// Strips hashtags, mentions, URLs, bare domains and emoji, drops every
/// character outside word characters, Korean blocks, whitespace and
/// `. , ! ? ~ -`, collapses laughter/punctuation runs to two characters and
/// squeezes whitespace. Results shorter than 3 characters or made only of
/// digits become `""`.
///
/// `normalize(&normalize(x)) == normalize(x)` for every input.
#[must_use]
pub fn normalize(raw: &str) -> String {
    let mut text = clean_pass(raw);
    for _ in 0..MAX_PASSES {
        let next = clean_pass(&text);
        if next == text {
            break;
        }
        text = next;
    }

    if text.chars().count() < MIN_CLEANED_CHARS || text.chars().all(char::is_numeric) {
        return String::new();
    }
    text
}

fn clean_pass(raw: &str) -> String {
    let text = HASHTAG_RE.replace_all(raw, "");
    let text = MENTION_RE.replace_all(&text, "");
    let text = URL_RE.replace_all(&text, "");
    let text = BARE_DOMAIN_RE.replace_all(&text, "");
    let text = EMOJI_RE.replace_all(&text, "");
    let text = DISALLOWED_RE.replace_all(&text, "");
    let text = collapse_repeats(&text);
    let text = WHITESPACE_RE.replace_all(&text, " ");
    text.trim().to_string()
}

/// Replace runs of 3+ identical [`REPEATABLE`] characters with two copies.
fn collapse_repeats(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut prev: Option<char> = None;
    let mut run = 0usize;
    for c in text.chars() {
        if Some(c) == prev {
            run += 1;
        } else {
            prev = Some(c);
            run = 1;
        }
        if run <= 2 || !REPEATABLE.contains(&c) {
            out.push(c);
        }
    }
    out
}

/// Summary of a cleaning pass over a record list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CleanStats {
    pub cleaned: usize,
    pub empty: usize,
    pub skipped: usize,
}

/// Fill `cleaned_caption` for every record that does not have one yet.
///
/// A fault while cleaning one caption is logged and yields `""` for that
/// record only.
pub fn clean_records(records: &mut [PostRecord], progress: &dyn ProgressSink) -> CleanStats {
    let total = records.len();
    let mut stats = CleanStats::default();

    for (i, record) in records.iter_mut().enumerate() {
        if record.cleaned_caption.is_some() {
            stats.skipped += 1;
        } else {
            let caption = record.caption.as_str();
            let cleaned = catch_unwind(|| normalize(caption)).unwrap_or_else(|_| {
                tracing::warn!(
                    shortcode = %record.shortcode,
                    "caption cleaning failed, treating as empty"
                );
                String::new()
            });
            if cleaned.is_empty() {
                stats.empty += 1;
            } else {
                stats.cleaned += 1;
            }
            record.cleaned_caption = Some(cleaned);
        }

        if (i + 1) % 10 == 0 || i + 1 == total {
            progress.on_event(&ProgressEvent::RecordsProcessed {
                stage: RunState::Cleaning,
                done: i + 1,
                total,
            });
        }
    }

    tracing::info!(
        total,
        cleaned = stats.cleaned,
        empty = stats.empty,
        skipped = stats.skipped,
        "caption cleaning complete"
    );
    stats
}
