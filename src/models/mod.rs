//! Domain models for the scraping and publishing pipeline.

mod article;
mod item;
mod run;
mod source;

pub use article::{Article, MediaRef};
pub use item::{EnrichmentOutput, ItemStatus, Renderings, ScrapingItem};
pub use run::{RunTrigger, ScrapingRun};
pub use source::ScrapingSource;
