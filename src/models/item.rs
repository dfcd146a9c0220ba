//! Scraping item model and its lifecycle state machine.
//!
//! Items are identified by their normalized-URL fingerprint: a second
//! harvest of the same URL refreshes content on the existing row instead
//! of creating a new one.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::fingerprint::{content_fingerprint, url_fingerprint};

/// Lifecycle status of a scraping item.
///
/// `scraped → ready_for_ai → processing_ai → ai_completed →
/// {ready_to_publish | discarded | duplicate} → published`, with `error`
/// reachable from the processing states and `expired` from
/// `ready_to_publish`. Transitions are one-directional except the manual
/// restore path `discarded → scraped`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    Scraped,
    ReadyForAi,
    ProcessingAi,
    AiCompleted,
    ReadyToPublish,
    Published,
    Discarded,
    Duplicate,
    Error,
    Expired,
}

impl ItemStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Scraped => "scraped",
            Self::ReadyForAi => "ready_for_ai",
            Self::ProcessingAi => "processing_ai",
            Self::AiCompleted => "ai_completed",
            Self::ReadyToPublish => "ready_to_publish",
            Self::Published => "published",
            Self::Discarded => "discarded",
            Self::Duplicate => "duplicate",
            Self::Error => "error",
            Self::Expired => "expired",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "scraped" => Some(Self::Scraped),
            "ready_for_ai" => Some(Self::ReadyForAi),
            "processing_ai" => Some(Self::ProcessingAi),
            "ai_completed" => Some(Self::AiCompleted),
            "ready_to_publish" => Some(Self::ReadyToPublish),
            "published" => Some(Self::Published),
            "discarded" => Some(Self::Discarded),
            "duplicate" => Some(Self::Duplicate),
            "error" => Some(Self::Error),
            "expired" => Some(Self::Expired),
            _ => None,
        }
    }

    /// Whether a transition from `self` to `next` is legal.
    pub fn can_transition(self, next: ItemStatus) -> bool {
        use ItemStatus::*;
        if self == next {
            // Same-status updates refresh the message (quality-gate
            // rejections keep items in ai_completed with a diagnostic).
            return matches!(self, AiCompleted | Error);
        }
        match self {
            Scraped => matches!(next, ReadyForAi | Discarded | Error),
            ReadyForAi => matches!(next, ProcessingAi | Discarded | Error),
            ProcessingAi => matches!(next, AiCompleted | Error),
            AiCompleted => matches!(next, ReadyToPublish | Duplicate | Discarded | Error),
            ReadyToPublish => matches!(next, Published | Expired | Discarded),
            Error => matches!(next, ReadyForAi | ProcessingAi | Discarded),
            // Manual restore path only.
            Discarded => matches!(next, Scraped),
            Published | Duplicate | Expired => false,
        }
    }
}

/// Three graduated renderings of an article, from shortest to deepest.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Renderings {
    #[serde(default)]
    pub brief: String,
    #[serde(default)]
    pub core: String,
    #[serde(default)]
    pub deep: String,
}

/// Output of the enrichment step for one item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrichmentOutput {
    pub title: String,
    pub summary: String,
    pub category: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub renderings: Renderings,
    #[serde(default = "default_true")]
    pub is_valid: bool,
    #[serde(default)]
    pub rejection_reason: Option<String>,
    /// Free-form extras the enricher wants to carry along.
    #[serde(default)]
    pub extra: serde_json::Value,
}

fn default_true() -> bool {
    true
}

/// One harvested article candidate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrapingItem {
    pub id: String,

    // Origin
    pub source_key: String,
    pub section: Option<String>,
    pub url: String,
    pub normalized_url: String,
    pub url_fingerprint: String,
    pub content_fingerprint: String,

    // Raw scraped fields
    pub title: Option<String>,
    pub subtitle: Option<String>,
    pub summary: Option<String>,
    pub content: String,
    pub author: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub tags: Vec<String>,
    pub image_urls: Vec<String>,
    pub video_urls: Vec<String>,

    // Traceability
    pub scraper_name: String,
    pub run_id: Option<String>,
    pub scraped_at: DateTime<Utc>,

    // Enrichment
    pub enrichment: Option<EnrichmentOutput>,
    pub enriched_at: Option<DateTime<Utc>>,

    // Lifecycle
    pub status: ItemStatus,
    pub status_message: Option<String>,
    pub status_updated_at: DateTime<Utc>,
    pub retry_count: i64,
    pub max_retries: i64,
    pub last_error: Option<String>,
    pub last_error_at: Option<DateTime<Utc>>,

    // Publication link
    pub article_id: Option<String>,
    pub article_published_at: Option<DateTime<Utc>>,

    pub updated_at: DateTime<Utc>,
}

impl ScrapingItem {
    /// Build a fresh item from raw scraped fields, computing fingerprints.
    #[allow(clippy::too_many_arguments)]
    pub fn new(source_key: String, scraper_name: String, url: String, content: String) -> Self {
        let now = Utc::now();
        let normalized_url = crate::fingerprint::normalize_url(&url);
        Self {
            id: Uuid::new_v4().to_string(),
            source_key,
            section: None,
            url_fingerprint: url_fingerprint(&url),
            content_fingerprint: content_fingerprint(&content),
            url,
            normalized_url,
            title: None,
            subtitle: None,
            summary: None,
            content,
            author: None,
            published_at: None,
            tags: Vec::new(),
            image_urls: Vec::new(),
            video_urls: Vec::new(),
            scraper_name,
            run_id: None,
            scraped_at: now,
            enrichment: None,
            enriched_at: None,
            status: ItemStatus::Scraped,
            status_message: None,
            status_updated_at: now,
            retry_count: 0,
            max_retries: 3,
            last_error: None,
            last_error_at: None,
            article_id: None,
            article_published_at: None,
            updated_at: now,
        }
    }

    /// Enriched title when present, raw title otherwise.
    pub fn display_title(&self) -> &str {
        self.enrichment
            .as_ref()
            .map(|e| e.title.as_str())
            .filter(|t| !t.is_empty())
            .or(self.title.as_deref())
            .unwrap_or("")
    }

    /// Category for curation: enriched, then section, then "general".
    pub fn category(&self) -> &str {
        self.enrichment
            .as_ref()
            .map(|e| e.category.as_str())
            .filter(|c| !c.is_empty())
            .or(self.section.as_deref())
            .unwrap_or("general")
    }

    pub fn retries_exhausted(&self) -> bool {
        self.retry_count >= self.max_retries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trip() {
        for s in [
            ItemStatus::Scraped,
            ItemStatus::ReadyForAi,
            ItemStatus::ProcessingAi,
            ItemStatus::AiCompleted,
            ItemStatus::ReadyToPublish,
            ItemStatus::Published,
            ItemStatus::Discarded,
            ItemStatus::Duplicate,
            ItemStatus::Error,
            ItemStatus::Expired,
        ] {
            assert_eq!(ItemStatus::from_str(s.as_str()), Some(s));
        }
        assert_eq!(ItemStatus::from_str("bogus"), None);
    }

    #[test]
    fn test_transitions_follow_pipeline_order() {
        use ItemStatus::*;
        assert!(Scraped.can_transition(ReadyForAi));
        assert!(ReadyForAi.can_transition(ProcessingAi));
        assert!(ProcessingAi.can_transition(AiCompleted));
        assert!(AiCompleted.can_transition(ReadyToPublish));
        assert!(AiCompleted.can_transition(Duplicate));
        assert!(ReadyToPublish.can_transition(Published));
        assert!(ReadyToPublish.can_transition(Expired));
        // One-directional: no going back.
        assert!(!Published.can_transition(ReadyToPublish));
        assert!(!ReadyToPublish.can_transition(AiCompleted));
        assert!(!Duplicate.can_transition(ReadyToPublish));
    }

    #[test]
    fn test_restore_path_from_discarded_only() {
        use ItemStatus::*;
        assert!(Discarded.can_transition(Scraped));
        assert!(!Discarded.can_transition(ReadyToPublish));
        assert!(!Expired.can_transition(Scraped));
    }

    #[test]
    fn test_new_item_computes_fingerprints() {
        let item = ScrapingItem::new(
            "lagaceta".into(),
            "http_list".into(),
            "https://Example.com/nota/?utm_source=x&id=7".into(),
            "Cuerpo de la nota".into(),
        );
        assert_eq!(item.url_fingerprint.len(), 64);
        assert_eq!(item.normalized_url, "https://example.com/nota?id=7");
        assert_eq!(item.status, ItemStatus::Scraped);
    }

    #[test]
    fn test_display_title_prefers_enrichment() {
        let mut item = ScrapingItem::new("s".into(), "n".into(), "https://e.com/a".into(), "c".into());
        item.title = Some("crudo".into());
        assert_eq!(item.display_title(), "crudo");
        item.enrichment = Some(EnrichmentOutput {
            title: "mejorado".into(),
            summary: String::new(),
            category: String::new(),
            tags: vec![],
            renderings: Renderings::default(),
            is_valid: true,
            rejection_reason: None,
            extra: serde_json::Value::Null,
        });
        assert_eq!(item.display_title(), "mejorado");
        assert_eq!(item.category(), "general");
    }
}
