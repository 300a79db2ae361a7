use std::collections::HashSet;
use std::time::Duration;

use chrono::Utc;
use reqwest::{Client, StatusCode, Url};
use serde::Serialize;
use tagpulse_core::{AppConfig, PostRecord};

use crate::error::CollectorError;
use crate::normalize::normalize_item;
use crate::rate_limit::retry_with_backoff;
use crate::types::HashtagPage;

/// Maximum number of pages to fetch for one hashtag.
/// Prevents infinite loops on cycling cursors.
const MAX_PAGES: usize = 50;

/// Out-of-band result of a collection run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CollectStatus {
    /// Every requested page was fetched.
    Complete,
    /// A page failed after some posts were collected; the posts are kept.
    Partial { reason: String },
    /// Nothing could be collected.
    Failed { reason: String },
}

impl CollectStatus {
    #[must_use]
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }

    /// Failure reason, if any page failed.
    #[must_use]
    pub fn reason(&self) -> Option<&str> {
        match self {
            Self::Complete => None,
            Self::Partial { reason } | Self::Failed { reason } => Some(reason),
        }
    }
}

/// Posts gathered for one hashtag plus how the collection went.
#[derive(Debug, Clone)]
pub struct CollectOutcome {
    pub posts: Vec<PostRecord>,
    pub status: CollectStatus,
}

impl CollectOutcome {
    fn failed(reason: String) -> Self {
        Self {
            posts: Vec::new(),
            status: CollectStatus::Failed { reason },
        }
    }
}

/// HTTP client for the hashtag-scraping service.
///
/// Transient errors (429, 5xx, network failures) are retried with
/// exponential backoff up to `max_retries` additional attempts per page.
pub struct HashtagClient {
    client: Client,
    base_url: String,
    token: String,
    /// Maximum number of retry attempts after the first failure.
    max_retries: u32,
    /// Base delay in seconds for exponential backoff.
    backoff_base_secs: u64,
    /// Posts requested per page.
    page_size: u32,
    /// Pause between page requests.
    inter_request_delay_ms: u64,
}

impl HashtagClient {
    /// Creates a `HashtagClient` with a request timeout and `User-Agent`.
    ///
    /// Retries default to 3 attempts with a 5 s backoff base; paging defaults
    /// to 50 posts per page with a 250 ms pause between pages.
    ///
    /// # Errors
    ///
    /// Returns [`CollectorError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed, or [`CollectorError::InvalidBaseUrl`] if
    /// `base_url` is not an absolute URL.
    pub fn new(
        base_url: &str,
        token: &str,
        timeout_secs: u64,
        user_agent: &str,
    ) -> Result<Self, CollectorError> {
        let parsed = Url::parse(base_url).map_err(|e| CollectorError::InvalidBaseUrl {
            url: base_url.to_owned(),
            reason: e.to_string(),
        })?;
        if parsed.cannot_be_a_base() {
            return Err(CollectorError::InvalidBaseUrl {
                url: base_url.to_owned(),
                reason: "URL cannot be used as a base".to_owned(),
            });
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(user_agent)
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_owned(),
            token: token.to_owned(),
            max_retries: 3,
            backoff_base_secs: 5,
            page_size: 50,
            inter_request_delay_ms: 250,
        })
    }

    /// Builds a client from the application configuration.
    ///
    /// # Errors
    ///
    /// See [`HashtagClient::new`].
    pub fn from_app_config(config: &AppConfig) -> Result<Self, CollectorError> {
        Ok(Self::new(
            &config.collector_url,
            &config.collector_token,
            config.collector_timeout_secs,
            &config.collector_user_agent,
        )?
        .with_retry(
            config.collector_max_retries,
            config.collector_retry_backoff_base_secs,
        )
        .with_paging(
            config.collector_page_size,
            config.collector_inter_request_delay_ms,
        ))
    }

    /// Overrides the retry policy. `max_retries = 0` disables retries.
    #[must_use]
    pub fn with_retry(mut self, max_retries: u32, backoff_base_secs: u64) -> Self {
        self.max_retries = max_retries;
        self.backoff_base_secs = backoff_base_secs;
        self
    }

    /// Overrides the page size and the pause between page requests.
    #[must_use]
    pub fn with_paging(mut self, page_size: u32, inter_request_delay_ms: u64) -> Self {
        self.page_size = page_size.max(1);
        self.inter_request_delay_ms = inter_request_delay_ms;
        self
    }

    /// Collects up to `limit` captioned posts for `hashtag`.
    ///
    /// Never fails: errors are logged and reported through
    /// [`CollectOutcome::status`]. Posts without a caption are skipped and
    /// repeated shortcodes within the run are dropped.
    pub async fn collect(&self, hashtag: &str, limit: u32) -> CollectOutcome {
        let limit = usize::try_from(limit).unwrap_or(usize::MAX);
        let mut posts: Vec<PostRecord> = Vec::new();
        let mut seen_shortcodes: HashSet<String> = HashSet::new();
        let mut cursor: Option<String> = None;
        let mut skipped = 0usize;
        let mut page_count = 0usize;

        while posts.len() < limit {
            page_count += 1;
            if page_count > MAX_PAGES {
                tracing::warn!(
                    hashtag,
                    max_pages = MAX_PAGES,
                    collected = posts.len(),
                    "page limit reached before collecting the requested posts"
                );
                break;
            }

            if page_count > 1 && self.inter_request_delay_ms > 0 {
                tokio::time::sleep(Duration::from_millis(self.inter_request_delay_ms)).await;
            }

            let remaining = u32::try_from(limit - posts.len()).unwrap_or(u32::MAX);
            let page_size = self.page_size.min(remaining);

            let page = match self.fetch_page(hashtag, page_size, cursor.as_deref()).await {
                Ok(page) => page,
                Err(e) => {
                    tracing::warn!(
                        hashtag,
                        page = page_count,
                        collected = posts.len(),
                        error = %e,
                        "collector page fetch failed"
                    );
                    if posts.is_empty() {
                        return CollectOutcome::failed(e.to_string());
                    }
                    return CollectOutcome {
                        posts,
                        status: CollectStatus::Partial {
                            reason: e.to_string(),
                        },
                    };
                }
            };

            let collected_at = Utc::now();
            for item in page.items {
                if posts.len() >= limit {
                    break;
                }
                let Some(record) = normalize_item(item, hashtag, collected_at) else {
                    skipped += 1;
                    continue;
                };
                if !record.shortcode.is_empty() && !seen_shortcodes.insert(record.shortcode.clone())
                {
                    tracing::debug!(shortcode = %record.shortcode, "duplicate shortcode, skipping");
                    continue;
                }
                posts.push(record);
            }

            tracing::debug!(
                hashtag,
                page = page_count,
                collected = posts.len(),
                "collector page processed"
            );

            cursor = page.next_cursor.filter(|c| !c.is_empty());
            if cursor.is_none() {
                break;
            }
        }

        tracing::info!(
            hashtag,
            collected = posts.len(),
            skipped_without_caption = skipped,
            "collection finished"
        );

        CollectOutcome {
            posts,
            status: CollectStatus::Complete,
        }
    }

    /// Fetches one page of posts, retrying transient errors.
    ///
    /// # Errors
    ///
    /// - [`CollectorError::RateLimited`]: HTTP 429 after all retries.
    /// - [`CollectorError::Unauthorized`]: HTTP 401/403 (not retried).
    /// - [`CollectorError::ServerError`]: HTTP 5xx after all retries.
    /// - [`CollectorError::UnexpectedStatus`]: any other non-2xx (not retried).
    /// - [`CollectorError::Http`]: network failure after all retries.
    /// - [`CollectorError::Deserialize`]: body does not match [`HashtagPage`].
    pub async fn fetch_page(
        &self,
        hashtag: &str,
        page_size: u32,
        cursor: Option<&str>,
    ) -> Result<HashtagPage, CollectorError> {
        let url = self.page_url(hashtag, page_size, cursor)?;

        retry_with_backoff(self.max_retries, self.backoff_base_secs, || {
            let url = url.clone();
            async move {
                let response = self
                    .client
                    .get(url.clone())
                    .bearer_auth(&self.token)
                    .send()
                    .await?;
                let status = response.status();

                if status == StatusCode::TOO_MANY_REQUESTS {
                    let retry_after_secs = response
                        .headers()
                        .get(reqwest::header::RETRY_AFTER)
                        .and_then(|v| v.to_str().ok())
                        .and_then(|s| s.parse::<u64>().ok())
                        .unwrap_or(60);
                    return Err(CollectorError::RateLimited { retry_after_secs });
                }

                if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
                    return Err(CollectorError::Unauthorized {
                        status: status.as_u16(),
                    });
                }

                if status.is_server_error() {
                    return Err(CollectorError::ServerError {
                        status: status.as_u16(),
                        url: url.to_string(),
                    });
                }

                if !status.is_success() {
                    return Err(CollectorError::UnexpectedStatus {
                        status: status.as_u16(),
                        url: url.to_string(),
                    });
                }

                let body = response.text().await?;
                serde_json::from_str::<HashtagPage>(&body).map_err(|e| {
                    CollectorError::Deserialize {
                        context: format!("hashtag page from {url}"),
                        source: e,
                    }
                })
            }
        })
        .await
    }

    /// Builds `{base}/v1/hashtags/{tag}/posts?limit=N[&cursor=C]`.
    ///
    /// The hashtag is a single percent-encoded path segment, so non-ASCII
    /// tags and tags containing `/` cannot escape the route.
    fn page_url(
        &self,
        hashtag: &str,
        page_size: u32,
        cursor: Option<&str>,
    ) -> Result<Url, CollectorError> {
        let invalid = |reason: String| CollectorError::InvalidBaseUrl {
            url: self.base_url.clone(),
            reason,
        };
        let mut url = Url::parse(&self.base_url).map_err(|e| invalid(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|()| invalid("URL cannot be used as a base".to_owned()))?
            .pop_if_empty()
            .extend(["v1", "hashtags", hashtag, "posts"]);
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("limit", &page_size.to_string());
            if let Some(cursor) = cursor {
                query.append_pair("cursor", cursor);
            }
        }
        Ok(url)
    }
}

#[cfg(test)]
#[path = "client_test.rs"]
mod tests;
