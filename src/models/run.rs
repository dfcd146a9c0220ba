//! Audit records for scrape cycles.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// What triggered a scrape cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum RunTrigger {
    Scheduled,
    Manual {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        requested_by: Option<String>,
    },
}

impl RunTrigger {
    pub fn describe(&self) -> String {
        match self {
            Self::Scheduled => "scheduled".to_string(),
            Self::Manual { requested_by: None } => "manual".to_string(),
            Self::Manual {
                requested_by: Some(who),
            } => format!("manual ({})", who),
        }
    }
}

/// One scheduler-triggered scrape cycle, created at cycle start and
/// finalized at cycle end or on abort.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrapingRun {
    pub id: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub trigger: RunTrigger,
    pub source_ids: Vec<String>,
    pub items_scraped: i64,
    pub items_failed: i64,
    pub items_duplicate: i64,
    pub errors: Vec<String>,
}

impl ScrapingRun {
    pub fn start(trigger: RunTrigger, source_ids: Vec<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            started_at: Utc::now(),
            finished_at: None,
            trigger,
            source_ids,
            items_scraped: 0,
            items_failed: 0,
            items_duplicate: 0,
            errors: Vec::new(),
        }
    }

    pub fn duration_seconds(&self) -> Option<i64> {
        self.finished_at
            .map(|end| (end - self.started_at).num_seconds())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trigger_describe() {
        assert_eq!(RunTrigger::Scheduled.describe(), "scheduled");
        let manual = RunTrigger::Manual {
            requested_by: Some("admin@example.com".into()),
        };
        assert_eq!(manual.describe(), "manual (admin@example.com)");
    }

    #[test]
    fn test_run_starts_open() {
        let run = ScrapingRun::start(RunTrigger::Scheduled, vec!["a".into()]);
        assert!(run.finished_at.is_none());
        assert_eq!(run.duration_seconds(), None);
    }
}
