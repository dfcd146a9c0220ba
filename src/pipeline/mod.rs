//! Post-enrichment pipeline: quality gate, curation and publication.

pub mod curator;
pub mod publisher;
pub mod quality;

pub use curator::{CurationPlan, Curator, CuratorConfig};
pub use publisher::{publish_item, run_auto_publish, AutoPublishStats};
pub use quality::{run_gate, GateConfig, GateStats, ALLOWED_CATEGORIES};
