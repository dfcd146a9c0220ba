//! Source management commands.

use anyhow::bail;
use console::style;

use crate::config::Settings;
use crate::models::ScrapingSource;
use crate::repository::DbContext;

pub fn cmd_source_list(settings: &Settings) -> anyhow::Result<()> {
    let db = DbContext::open(&settings.db_path)?;
    let sources = db.sources.get_all()?;
    if sources.is_empty() {
        println!("No sources configured. Add one with: newsdesk source add");
        return Ok(());
    }
    for source in &sources {
        let marker = if source.is_active {
            style("●").green()
        } else {
            style("○").red()
        };
        let auto = if source.auto_publish {
            format!(" · auto-publish after {}m", source.auto_publish_delay_minutes)
        } else {
            String::new()
        };
        println!("{} {:<20} {}{}", marker, source.slug, source.base_url, auto);
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
pub fn cmd_source_add(
    settings: &Settings,
    slug: String,
    name: String,
    base_url: String,
    sections: Vec<String>,
    link_selector: Option<String>,
    content_selector: Option<String>,
    max_items: i64,
    auto_publish: bool,
    auto_publish_delay: i64,
) -> anyhow::Result<()> {
    let db = DbContext::open(&settings.db_path)?;
    if db.sources.get_by_slug(&slug)?.is_some() {
        bail!("source '{slug}' already exists");
    }

    let mut source = ScrapingSource::new(slug, name, base_url);
    source.sections = sections;
    source.max_items_per_run = max_items;
    source.auto_publish = auto_publish;
    source.auto_publish_delay_minutes = auto_publish_delay;

    let mut config = serde_json::Map::new();
    if let Some(selector) = link_selector {
        config.insert("link_selector".into(), selector.into());
    }
    if let Some(selector) = content_selector {
        config.insert("content_selector".into(), selector.into());
    }
    source.config = serde_json::Value::Object(config);

    db.sources.save(&source)?;
    println!("{} Added source: {}", style("✓").green(), source.name);
    println!("  Enable it with: newsdesk source enable {}", source.slug);
    Ok(())
}

pub fn cmd_source_set_active(settings: &Settings, slug: &str, active: bool) -> anyhow::Result<()> {
    let db = DbContext::open(&settings.db_path)?;
    let Some(source) = db.sources.get_by_slug(slug)? else {
        bail!("source '{slug}' not found");
    };
    db.sources.set_active(&source.id, active)?;
    let verb = if active { "enabled" } else { "disabled" };
    println!("{} Source {} {}", style("✓").green(), source.slug, verb);
    Ok(())
}

pub fn cmd_restore_item(settings: &Settings, item_id: &str) -> anyhow::Result<()> {
    let db = DbContext::open(&settings.db_path)?;
    db.items.restore_discarded(item_id)?;
    println!(
        "{} Item {} sent back to the start of the pipeline",
        style("✓").green(),
        item_id
    );
    Ok(())
}
