//! Shared data model and configuration for tagpulse.

pub mod app_config;
pub mod config;
pub mod post;

use thiserror::Error;

pub use app_config::{AppConfig, Environment};
pub use config::{
    load_app_config, load_app_config_from_env, MAX_KEYWORD_CANDIDATES, MAX_KEYWORD_TOP_N,
};
pub use post::{
    clamp_post_limit, normalize_hashtag, PostRecord, Sentiment, MAX_POST_LIMIT, MIN_POST_LIMIT,
};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}
