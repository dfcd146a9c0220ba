//! Newsdesk - news article ingestion, curation and publishing pipeline.
//!
//! Site-specific scrapers harvest article candidates into a SQLite item
//! store, an enrichment pass rewrites them, a quality gate screens them,
//! and either a delayed per-source auto-publisher or a diversity-balanced
//! curator turns them into published articles. A scheduler loop drives the
//! stages on independent intervals; a control API observes and steers it.

pub mod cli;
pub mod config;
pub mod control;
pub mod enrich;
pub mod fingerprint;
pub mod models;
pub mod notify;
pub mod pipeline;
pub mod repository;
pub mod scheduler;
pub mod scrape;
pub mod slug;
