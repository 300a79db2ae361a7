use std::path::PathBuf;

use crate::app_config::{AppConfig, Environment};
use crate::ConfigError;

/// Upper bound for `TAGPULSE_KEYWORD_TOP_N`.
pub const MAX_KEYWORD_TOP_N: usize = 5;
/// Upper bound for `TAGPULSE_KEYWORD_CANDIDATES`.
pub const MAX_KEYWORD_CANDIDATES: usize = 30;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Decoupled from the real environment so tests can drive it with a `HashMap`.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    let require = |var: &str| -> Result<String, ConfigError> {
        lookup(var)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingEnvVar(var.to_string()))
    };

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let optional =
        |var: &str| -> Option<String> { lookup(var).ok().filter(|v| !v.trim().is_empty()) };

    let invalid = |var: &str, reason: String| ConfigError::InvalidEnvVar {
        var: var.to_string(),
        reason,
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        or_default(var, default)
            .parse::<u32>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        or_default(var, default)
            .parse::<u64>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_positive = |var: &str, default: &str| -> Result<usize, ConfigError> {
        let value = or_default(var, default)
            .parse::<usize>()
            .map_err(|e| invalid(var, e.to_string()))?;
        if value == 0 {
            return Err(invalid(var, "must be at least 1".to_string()));
        }
        Ok(value)
    };

    let collector_url = require("TAGPULSE_COLLECTOR_URL")?;
    let collector_token = require("TAGPULSE_COLLECTOR_TOKEN")?;
    let sentiment_tei_url = require("TAGPULSE_SENTIMENT_TEI_URL")?;
    let embedding_tei_url = require("TAGPULSE_EMBEDDING_TEI_URL")?;

    let env = parse_environment(&or_default("TAGPULSE_ENV", "development"));
    let log_level = or_default("TAGPULSE_LOG_LEVEL", "info");
    let data_dir = PathBuf::from(or_default("TAGPULSE_DATA_DIR", "./data"));

    let collector_timeout_secs = parse_u64("TAGPULSE_COLLECTOR_TIMEOUT_SECS", "30")?;
    let collector_user_agent = or_default(
        "TAGPULSE_COLLECTOR_USER_AGENT",
        "tagpulse/0.1 (hashtag-analysis)",
    );
    let collector_page_size = parse_u32("TAGPULSE_COLLECTOR_PAGE_SIZE", "50")?;
    let collector_inter_request_delay_ms =
        parse_u64("TAGPULSE_COLLECTOR_INTER_REQUEST_DELAY_MS", "250")?;
    let collector_max_retries = parse_u32("TAGPULSE_COLLECTOR_MAX_RETRIES", "3")?;
    let collector_retry_backoff_base_secs =
        parse_u64("TAGPULSE_COLLECTOR_RETRY_BACKOFF_BASE_SECS", "5")?;

    let sentiment_batch_size = parse_positive("TAGPULSE_SENTIMENT_BATCH_SIZE", "32")?;
    let sentiment_max_chars = parse_positive("TAGPULSE_SENTIMENT_MAX_CHARS", "512")?;
    let keyword_top_n = parse_positive("TAGPULSE_KEYWORD_TOP_N", "3")?;
    if keyword_top_n > MAX_KEYWORD_TOP_N {
        return Err(invalid(
            "TAGPULSE_KEYWORD_TOP_N",
            format!("must be at most {MAX_KEYWORD_TOP_N}"),
        ));
    }
    let keyword_candidates = parse_positive("TAGPULSE_KEYWORD_CANDIDATES", "20")?;
    if !(keyword_top_n..=MAX_KEYWORD_CANDIDATES).contains(&keyword_candidates) {
        return Err(invalid(
            "TAGPULSE_KEYWORD_CANDIDATES",
            format!(
                "must be between TAGPULSE_KEYWORD_TOP_N ({keyword_top_n}) and {MAX_KEYWORD_CANDIDATES}"
            ),
        ));
    }
    let keyword_concurrency = parse_positive("TAGPULSE_KEYWORD_CONCURRENCY", "4")?;
    let retrieval_top_k = parse_positive("TAGPULSE_RETRIEVAL_TOP_K", "4")?;

    let recent_days = optional("TAGPULSE_RECENT_DAYS")
        .map(|raw| {
            raw.parse::<u32>()
                .map_err(|e| invalid("TAGPULSE_RECENT_DAYS", e.to_string()))
        })
        .transpose()?;

    let chat_url = optional("TAGPULSE_CHAT_URL");
    let chat_api_key = optional("TAGPULSE_CHAT_API_KEY");
    let chat_model = or_default("TAGPULSE_CHAT_MODEL", "gpt-4o-mini");

    Ok(AppConfig {
        env,
        log_level,
        data_dir,
        collector_url,
        collector_token,
        collector_timeout_secs,
        collector_user_agent,
        collector_page_size,
        collector_inter_request_delay_ms,
        collector_max_retries,
        collector_retry_backoff_base_secs,
        sentiment_tei_url,
        sentiment_batch_size,
        sentiment_max_chars,
        embedding_tei_url,
        keyword_top_n,
        keyword_candidates,
        keyword_concurrency,
        retrieval_top_k,
        recent_days,
        chat_url,
        chat_api_key,
        chat_model,
    })
}

/// Parse a string into an `Environment` variant.
///
/// Unrecognized values default to `Environment::Development`.
fn parse_environment(s: &str) -> Environment {
    match s {
        "production" => Environment::Production,
        "test" => Environment::Test,
        _ => Environment::Development,
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
