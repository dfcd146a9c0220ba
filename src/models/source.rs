//! Configured scraping sources.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A configured origin to harvest articles from.
///
/// A source is automatically deactivated once `consecutive_errors`
/// reaches `max_consecutive_errors`; a successful run resets the counter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrapingSource {
    pub id: String,
    /// Stable key items refer to (`source_key`).
    pub slug: String,
    pub name: String,
    pub base_url: String,
    /// Section paths appended to the base URL when listing.
    pub sections: Vec<String>,
    /// Which registered scraper handles this source.
    pub scraper_kind: String,
    pub is_active: bool,
    /// Minimum minutes between scheduled scrapes of this source.
    pub interval_minutes: i64,
    pub max_items_per_run: i64,

    // Immediate publication after a cooling-off window.
    pub auto_publish: bool,
    pub auto_publish_delay_minutes: i64,

    // Error tracking
    pub consecutive_errors: i64,
    pub max_consecutive_errors: i64,

    // Last-run bookkeeping
    pub last_run_at: Option<DateTime<Utc>>,
    pub last_run_status: Option<String>,
    pub last_run_message: Option<String>,
    pub last_run_items: i64,
    pub total_items: i64,
    pub total_runs: i64,

    /// Free-form scraper configuration (selectors, headers, ...).
    pub config: serde_json::Value,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ScrapingSource {
    pub fn new(slug: String, name: String, base_url: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            slug,
            name,
            base_url,
            sections: Vec::new(),
            scraper_kind: "http_list".to_string(),
            is_active: false,
            interval_minutes: 60,
            max_items_per_run: 50,
            auto_publish: false,
            auto_publish_delay_minutes: 15,
            consecutive_errors: 0,
            max_consecutive_errors: 5,
            last_run_at: None,
            last_run_status: None,
            last_run_message: None,
            last_run_items: 0,
            total_items: 0,
            total_runs: 0,
            config: serde_json::json!({}),
            created_at: now,
            updated_at: now,
        }
    }

    /// Read a string value from the free-form config map.
    pub fn config_str(&self, key: &str) -> Option<&str> {
        self.config.get(key).and_then(|v| v.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_source_defaults() {
        let s = ScrapingSource::new("lagaceta".into(), "La Gaceta".into(), "https://lg.ar".into());
        assert!(!s.is_active);
        assert!(!s.auto_publish);
        assert_eq!(s.auto_publish_delay_minutes, 15);
        assert_eq!(s.max_consecutive_errors, 5);
    }

    #[test]
    fn test_config_str() {
        let mut s = ScrapingSource::new("x".into(), "X".into(), "https://x".into());
        s.config = serde_json::json!({"article_selector": "h2 a"});
        assert_eq!(s.config_str("article_selector"), Some("h2 a"));
        assert_eq!(s.config_str("missing"), None);
    }
}
