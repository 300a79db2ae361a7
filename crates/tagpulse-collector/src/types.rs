use serde::Deserialize;

/// One page of posts returned by the scraping service.
#[derive(Debug, Clone, Deserialize)]
pub struct HashtagPage {
    #[serde(default)]
    pub items: Vec<WirePost>,
    #[serde(default)]
    pub next_cursor: Option<String>,
}

/// A post as the scraping service describes it.
///
/// Every field is optional on the wire; [`crate::normalize_item`] decides
/// which items become records.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WirePost {
    #[serde(default)]
    pub caption: Option<String>,
    /// RFC 3339 string, `YYYY-MM-DD HH:MM:SS`, `YYYY-MM-DD`, or epoch seconds.
    #[serde(default)]
    pub taken_at: Option<serde_json::Value>,
    #[serde(default)]
    pub shortcode: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub like_count: Option<i64>,
    #[serde(default)]
    pub comment_count: Option<i64>,
}
