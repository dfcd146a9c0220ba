//! Message templates for operator notifications.

use crate::models::ScrapingRun;
use crate::pipeline::GateStats;

pub fn startup(bind_addr: &str) -> String {
    format!(
        "🚀 <b>newsdesk {}</b> en marcha\nControl: {}",
        env!("CARGO_PKG_VERSION"),
        bind_addr
    )
}

pub fn scrape_summary(run: &ScrapingRun) -> String {
    let mut text = format!(
        "📰 Ciclo de scraping ({})\nNuevas: {} · Refrescadas: {} · Fallas: {}",
        run.trigger.describe(),
        run.items_scraped,
        run.items_duplicate,
        run.items_failed
    );
    if !run.errors.is_empty() {
        text.push_str(&format!("\nErrores: {}", run.errors.len()));
    }
    text
}

pub fn gate_summary(stats: &GateStats) -> String {
    format!(
        "✅ Control de calidad\nAprobadas: {} · Duplicadas: {} · Observadas: {} · Vencidas: {}",
        stats.ready,
        stats.duplicates,
        stats.quality_failed,
        stats.expired + stats.stale_discarded
    )
}

pub fn published_batch(titles: &[String]) -> String {
    let mut text = format!("📣 {} artículos publicados:", titles.len());
    for title in titles.iter().take(15) {
        text.push_str(&format!("\n• {title}"));
    }
    if titles.len() > 15 {
        text.push_str(&format!("\n… y {} más", titles.len() - 15));
    }
    text
}

pub fn shutdown() -> String {
    "🛑 <b>newsdesk</b> deteniéndose".to_string()
}

pub fn source_deactivated(name: &str) -> String {
    format!("⛔ Fuente <b>{name}</b> desactivada por errores consecutivos")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_published_batch_truncates() {
        let titles: Vec<String> = (0..20).map(|i| format!("Nota {i}")).collect();
        let text = published_batch(&titles);
        assert!(text.contains("20 artículos"));
        assert!(text.contains("… y 5 más"));
        assert!(!text.contains("Nota 16"));
    }

    #[test]
    fn test_source_deactivated_names_source() {
        assert!(source_deactivated("La Gaceta").contains("La Gaceta"));
    }
}
