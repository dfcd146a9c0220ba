//! Configuration: startup settings from a TOML file plus the live,
//! runtime-adjustable knobs behind the control API.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Deserializer, Serialize};

use crate::enrich::ChatConfig;
use crate::notify::NotifierConfig;
use crate::pipeline::{CuratorConfig, GateConfig};

/// Startup settings, loaded once.
///
/// Every field has a default, so an absent or partial file works; secrets
/// are filled in from the environment after parsing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,
    /// Bind address of the control server.
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
    /// Where runtime config changes are persisted.
    #[serde(default = "default_live_config_path")]
    pub live_config_path: PathBuf,
    #[serde(default)]
    pub chat: ChatConfig,
    #[serde(default)]
    pub gate: GateConfig,
    #[serde(default)]
    pub curator: CuratorConfig,
    #[serde(default)]
    pub notifier: NotifierConfig,
    /// Initial values for the live knobs.
    #[serde(default)]
    pub live: LiveConfig,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("newsdesk.db")
}

fn default_bind_addr() -> String {
    "127.0.0.1:8750".to_string()
}

fn default_live_config_path() -> PathBuf {
    PathBuf::from("newsdesk.live.toml")
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            bind_addr: default_bind_addr(),
            live_config_path: default_live_config_path(),
            chat: ChatConfig::default(),
            gate: GateConfig::default(),
            curator: CuratorConfig::default(),
            notifier: NotifierConfig::default(),
            live: LiveConfig::default(),
        }
    }
}

impl Settings {
    /// Load settings from `path`, or defaults when the file is absent.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let mut settings: Settings = if path.exists() {
            let contents = fs::read_to_string(path)?;
            toml::from_str(&contents)?
        } else {
            Settings::default()
        };
        settings.apply_env();
        Ok(settings)
    }

    /// Pull secrets from the environment when the file left them empty.
    fn apply_env(&mut self) {
        if self.chat.api_key.is_empty() {
            if let Ok(key) = std::env::var("OPENAI_API_KEY") {
                self.chat.api_key = key;
            }
        }
        if self.notifier.bot_token.is_empty() {
            if let Ok(token) = std::env::var("TELEGRAM_BOT_TOKEN") {
                self.notifier.bot_token = token;
            }
        }
        if self.notifier.chat_id.is_empty() {
            if let Ok(chat_id) = std::env::var("TELEGRAM_CHAT_ID") {
                self.notifier.chat_id = chat_id;
            }
        }
    }
}

/// Load the persisted live config, falling back to `initial` when the
/// file does not exist yet.
pub fn load_live(path: &Path, initial: &LiveConfig) -> anyhow::Result<LiveConfig> {
    if path.exists() {
        let contents = fs::read_to_string(path)?;
        Ok(toml::from_str(&contents)?)
    } else {
        Ok(initial.clone())
    }
}

/// Persist the live config so runtime changes survive restarts.
pub fn save_live(path: &Path, live: &LiveConfig) -> anyhow::Result<()> {
    fs::write(path, toml::to_string_pretty(live)?)?;
    Ok(())
}

/// Knobs adjustable at runtime through the control API.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LiveConfig {
    #[serde(default = "default_true")]
    pub scrape_enabled: bool,
    #[serde(default = "default_true")]
    pub enrich_enabled: bool,
    #[serde(default = "default_true")]
    pub prepare_enabled: bool,
    #[serde(default = "default_true")]
    pub auto_publish_enabled: bool,
    #[serde(default = "default_true")]
    pub curator_enabled: bool,

    #[serde(default = "default_scrape_interval")]
    pub scrape_interval_minutes: i64,
    #[serde(default = "default_enrich_interval")]
    pub enrich_interval_minutes: i64,
    #[serde(default = "default_curator_interval")]
    pub curator_interval_minutes: i64,

    /// How far back scraped items are still queued for enrichment.
    #[serde(default = "default_lookback_hours")]
    pub lookback_hours: i64,
    /// Publish-ready items older than this expire.
    #[serde(default = "default_expire_ready")]
    pub expire_ready_hours: i64,
    /// Enriched items unselected for this long get discarded.
    #[serde(default = "default_expire_completed")]
    pub expire_completed_hours: i64,

    /// Restrict scheduled scrapes to these source ids (None = all active).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_source_ids: Option<Vec<String>>,

    #[serde(default = "default_scrape_workers")]
    pub scrape_workers: usize,
    #[serde(default = "default_enrich_batch")]
    pub enrich_batch_limit: usize,
    #[serde(default = "default_publish_batch")]
    pub publish_batch_limit: usize,
}

fn default_true() -> bool {
    true
}
fn default_scrape_interval() -> i64 {
    60
}
fn default_enrich_interval() -> i64 {
    30
}
fn default_curator_interval() -> i64 {
    180
}
fn default_lookback_hours() -> i64 {
    24
}
fn default_expire_ready() -> i64 {
    12
}
fn default_expire_completed() -> i64 {
    24
}
fn default_scrape_workers() -> usize {
    5
}
fn default_enrich_batch() -> usize {
    50
}
fn default_publish_batch() -> usize {
    50
}

impl Default for LiveConfig {
    fn default() -> Self {
        Self {
            scrape_enabled: true,
            enrich_enabled: true,
            prepare_enabled: true,
            auto_publish_enabled: true,
            curator_enabled: true,
            scrape_interval_minutes: default_scrape_interval(),
            enrich_interval_minutes: default_enrich_interval(),
            curator_interval_minutes: default_curator_interval(),
            lookback_hours: default_lookback_hours(),
            expire_ready_hours: default_expire_ready(),
            expire_completed_hours: default_expire_completed(),
            selected_source_ids: None,
            scrape_workers: default_scrape_workers(),
            enrich_batch_limit: default_enrich_batch(),
            publish_batch_limit: default_publish_batch(),
        }
    }
}

/// A partial update to [`LiveConfig`]; absent fields stay untouched.
///
/// `selected_source_ids` is doubly optional so a client can distinguish
/// "leave as is" (field absent) from "clear the restriction" (explicit
/// null).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LiveConfigPatch {
    pub scrape_enabled: Option<bool>,
    pub enrich_enabled: Option<bool>,
    pub prepare_enabled: Option<bool>,
    pub auto_publish_enabled: Option<bool>,
    pub curator_enabled: Option<bool>,
    pub scrape_interval_minutes: Option<i64>,
    pub enrich_interval_minutes: Option<i64>,
    pub curator_interval_minutes: Option<i64>,
    pub lookback_hours: Option<i64>,
    pub expire_ready_hours: Option<i64>,
    pub expire_completed_hours: Option<i64>,
    #[serde(default, deserialize_with = "double_option")]
    pub selected_source_ids: Option<Option<Vec<String>>>,
    pub scrape_workers: Option<usize>,
    pub enrich_batch_limit: Option<usize>,
    pub publish_batch_limit: Option<usize>,
}

fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Deserialize::deserialize(deserializer).map(Some)
}

impl LiveConfig {
    /// Apply a patch in place.
    pub fn apply(&mut self, patch: LiveConfigPatch) {
        macro_rules! set {
            ($field:ident) => {
                if let Some(value) = patch.$field {
                    self.$field = value;
                }
            };
        }
        set!(scrape_enabled);
        set!(enrich_enabled);
        set!(prepare_enabled);
        set!(auto_publish_enabled);
        set!(curator_enabled);
        set!(scrape_interval_minutes);
        set!(enrich_interval_minutes);
        set!(curator_interval_minutes);
        set!(lookback_hours);
        set!(expire_ready_hours);
        set!(expire_completed_hours);
        set!(selected_source_ids);
        set!(scrape_workers);
        set!(enrich_batch_limit);
        set!(publish_batch_limit);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_toml_fills_defaults() {
        let settings: Settings = toml::from_str(
            r#"
            bind_addr = "0.0.0.0:9000"

            [live]
            scrape_interval_minutes = 15
            "#,
        )
        .unwrap();
        assert_eq!(settings.bind_addr, "0.0.0.0:9000");
        assert_eq!(settings.db_path, PathBuf::from("newsdesk.db"));
        assert_eq!(settings.live.scrape_interval_minutes, 15);
        assert_eq!(settings.live.enrich_interval_minutes, 30);
        assert!(settings.live.curator_enabled);
    }

    #[test]
    fn test_patch_leaves_absent_fields() {
        let mut live = LiveConfig::default();
        let patch: LiveConfigPatch =
            serde_json::from_str(r#"{"scrape_enabled": false, "lookback_hours": 48}"#).unwrap();
        live.apply(patch);
        assert!(!live.scrape_enabled);
        assert_eq!(live.lookback_hours, 48);
        assert!(live.enrich_enabled);
        assert_eq!(live.expire_ready_hours, 12);
    }

    #[test]
    fn test_patch_distinguishes_null_from_absent() {
        let mut live = LiveConfig::default();
        live.selected_source_ids = Some(vec!["src-1".into()]);

        // Absent field: restriction stays.
        let patch: LiveConfigPatch = serde_json::from_str(r#"{}"#).unwrap();
        live.apply(patch);
        assert_eq!(live.selected_source_ids, Some(vec!["src-1".to_string()]));

        // Explicit null: restriction cleared.
        let patch: LiveConfigPatch =
            serde_json::from_str(r#"{"selected_source_ids": null}"#).unwrap();
        live.apply(patch);
        assert_eq!(live.selected_source_ids, None);
    }

    #[test]
    fn test_live_config_round_trips_through_disk() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("live.toml");

        let mut live = LiveConfig::default();
        live.scrape_enabled = false;
        live.selected_source_ids = Some(vec!["src-1".into()]);
        save_live(&path, &live).unwrap();

        let loaded = load_live(&path, &LiveConfig::default()).unwrap();
        assert!(!loaded.scrape_enabled);
        assert_eq!(loaded.selected_source_ids, Some(vec!["src-1".to_string()]));

        // Missing file: the initial values pass through.
        let absent = load_live(&dir.path().join("nope.toml"), &live).unwrap();
        assert!(!absent.scrape_enabled);
    }

    #[test]
    fn test_unknown_field_is_rejected() {
        let result: Result<LiveConfigPatch, _> =
            serde_json::from_str(r#"{"scrap_enabled": true}"#);
        assert!(result.is_err());
    }
}
