use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub env: Environment,
    pub log_level: String,
    pub data_dir: PathBuf,
    pub collector_url: String,
    pub collector_token: String,
    pub collector_timeout_secs: u64,
    pub collector_user_agent: String,
    pub collector_page_size: u32,
    pub collector_inter_request_delay_ms: u64,
    pub collector_max_retries: u32,
    pub collector_retry_backoff_base_secs: u64,
    pub sentiment_tei_url: String,
    pub sentiment_batch_size: usize,
    pub sentiment_max_chars: usize,
    pub embedding_tei_url: String,
    pub keyword_top_n: usize,
    pub keyword_candidates: usize,
    pub keyword_concurrency: usize,
    pub retrieval_top_k: usize,
    /// Keep only posts dated within this many days. `None` disables the filter.
    pub recent_days: Option<u32>,
    pub chat_url: Option<String>,
    pub chat_api_key: Option<String>,
    pub chat_model: String,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("log_level", &self.log_level)
            .field("data_dir", &self.data_dir)
            .field("collector_url", &self.collector_url)
            .field("collector_token", &"[redacted]")
            .field("collector_timeout_secs", &self.collector_timeout_secs)
            .field("collector_user_agent", &self.collector_user_agent)
            .field("collector_page_size", &self.collector_page_size)
            .field(
                "collector_inter_request_delay_ms",
                &self.collector_inter_request_delay_ms,
            )
            .field("collector_max_retries", &self.collector_max_retries)
            .field(
                "collector_retry_backoff_base_secs",
                &self.collector_retry_backoff_base_secs,
            )
            .field("sentiment_tei_url", &self.sentiment_tei_url)
            .field("sentiment_batch_size", &self.sentiment_batch_size)
            .field("sentiment_max_chars", &self.sentiment_max_chars)
            .field("embedding_tei_url", &self.embedding_tei_url)
            .field("keyword_top_n", &self.keyword_top_n)
            .field("keyword_candidates", &self.keyword_candidates)
            .field("keyword_concurrency", &self.keyword_concurrency)
            .field("retrieval_top_k", &self.retrieval_top_k)
            .field("recent_days", &self.recent_days)
            .field("chat_url", &self.chat_url)
            .field(
                "chat_api_key",
                &self.chat_api_key.as_ref().map(|_| "[redacted]"),
            )
            .field("chat_model", &self.chat_model)
            .finish()
    }
}
