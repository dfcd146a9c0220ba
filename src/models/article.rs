//! Published articles, the pipeline's output sink.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A media attachment on a published article.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaRef {
    #[serde(rename = "type")]
    pub kind: String,
    pub url: String,
    #[serde(default)]
    pub caption: String,
    pub order: usize,
}

impl MediaRef {
    pub fn image(url: String, order: usize) -> Self {
        Self {
            kind: "image".to_string(),
            url,
            caption: String::new(),
            order,
        }
    }
}

/// A published article produced from a scraping item.
///
/// The pipeline only ever reads back `title` (for similarity screening)
/// and `slug` (for collision checks); articles are never hard-deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Article {
    pub id: String,
    pub item_id: String,
    pub slug: String,
    pub title: String,
    pub summary: String,
    pub body: String,
    pub category: Option<String>,
    pub tags: Vec<String>,
    pub brief: Option<String>,
    pub core: Option<String>,
    pub deep: Option<String>,
    pub media: Vec<MediaRef>,
    pub published_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}
