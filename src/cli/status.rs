//! Status command.

use console::style;

use crate::config::Settings;
use crate::repository::DbContext;

/// Show pipeline counts and source health.
pub fn cmd_status(settings: &Settings) -> anyhow::Result<()> {
    let db = DbContext::open(&settings.db_path)?;

    println!("{}", style("Items").bold());
    let counts = db.items.counts_by_status()?;
    if counts.is_empty() {
        println!("  (none)");
    }
    for (status, count) in &counts {
        println!("  {status:<18} {count}");
    }

    println!("\n{}", style("Sources").bold());
    let sources = db.sources.get_all()?;
    if sources.is_empty() {
        println!("  (none)");
    }
    for source in &sources {
        let marker = if source.is_active {
            style("●").green()
        } else {
            style("○").red()
        };
        let last = source
            .last_run_message
            .as_deref()
            .unwrap_or("never run");
        println!(
            "  {} {:<20} {} items over {} runs · {}",
            marker, source.slug, source.total_items, source.total_runs, last
        );
    }

    println!("\n{}", style("Articles").bold());
    println!("  published {}", db.articles.count()?);

    let runs = db.runs.recent(5)?;
    if !runs.is_empty() {
        println!("\n{}", style("Recent runs").bold());
        for run in &runs {
            println!(
                "  {} [{}] {} new, {} refreshed, {} failed",
                run.started_at.format("%Y-%m-%d %H:%M"),
                run.trigger.describe(),
                run.items_scraped,
                run.items_duplicate,
                run.items_failed
            );
        }
    }
    Ok(())
}
