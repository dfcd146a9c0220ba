//! Generic listing-page scraper driven by CSS selectors.
//!
//! Covers the common news-site shape: a section page linking to article
//! pages. Selectors come from the source's free-form config, with
//! defaults that match plain semantic HTML.

use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use scraper::{Html, Selector};
use tracing::{debug, warn};
use url::Url;

use super::{RawArticle, SourceScraper};
use crate::models::ScrapingSource;

const USER_AGENT: &str = concat!("newsdesk/", env!("CARGO_PKG_VERSION"));

const DEFAULT_LINK_SELECTOR: &str = "article a[href], h2 a[href], h3 a[href]";
const DEFAULT_CONTENT_SELECTOR: &str = "article p, .article-body p";

pub struct HttpListScraper {
    client: Client,
}

impl Default for HttpListScraper {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpListScraper {
    pub fn new() -> Self {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(30))
            .gzip(true)
            .build()
            .unwrap_or_default();
        Self { client }
    }

    async fn fetch_text(&self, url: &str) -> anyhow::Result<String> {
        let response = self.client.get(url).send().await?.error_for_status()?;
        Ok(response.text().await?)
    }
}

#[async_trait]
impl SourceScraper for HttpListScraper {
    fn name(&self) -> &str {
        "http_list"
    }

    async fn scrape(&self, source: &ScrapingSource) -> anyhow::Result<Vec<RawArticle>> {
        let base = Url::parse(&source.base_url)?;
        let link_selector = source
            .config_str("link_selector")
            .unwrap_or(DEFAULT_LINK_SELECTOR)
            .to_string();
        let content_selector = source
            .config_str("content_selector")
            .unwrap_or(DEFAULT_CONTENT_SELECTOR)
            .to_string();

        let sections: Vec<String> = if source.sections.is_empty() {
            vec![String::new()]
        } else {
            source.sections.clone()
        };

        // Listing pass: collect candidate article URLs per section.
        let mut seen: HashSet<String> = HashSet::new();
        let mut candidates: Vec<(String, Option<String>)> = Vec::new();
        for section in &sections {
            let listing_url = match base.join(section) {
                Ok(u) => u,
                Err(e) => {
                    warn!(section = %section, error = %e, "bad section path, skipping");
                    continue;
                }
            };
            let html = match self.fetch_text(listing_url.as_str()).await {
                Ok(html) => html,
                Err(e) => {
                    warn!(url = %listing_url, error = %e, "listing fetch failed");
                    continue;
                }
            };
            let links = extract_links(&html, &base, &link_selector);
            debug!(section = %section, links = links.len(), "listing parsed");
            for link in links {
                if seen.insert(link.clone()) {
                    let section = (!section.is_empty()).then(|| section.clone());
                    candidates.push((link, section));
                }
            }
            if candidates.len() as i64 >= source.max_items_per_run {
                break;
            }
        }
        candidates.truncate(source.max_items_per_run as usize);

        // Article pass: fetch and extract each candidate.
        let mut articles = Vec::with_capacity(candidates.len());
        for (url, section) in candidates {
            let html = match self.fetch_text(&url).await {
                Ok(html) => html,
                Err(e) => {
                    warn!(url = %url, error = %e, "article fetch failed");
                    continue;
                }
            };
            let mut raw = extract_article(&html, &content_selector);
            raw.url = url;
            raw.section = section;
            if raw.content.is_empty() {
                debug!(url = %raw.url, "no extractable body, skipping");
                continue;
            }
            articles.push(raw);
        }
        Ok(articles)
    }
}

/// Pull same-host article links out of a listing page.
fn extract_links(html: &str, base: &Url, link_selector: &str) -> Vec<String> {
    let document = Html::parse_document(html);
    let selector = match Selector::parse(link_selector) {
        Ok(s) => s,
        Err(_) => return Vec::new(),
    };

    let mut urls = Vec::new();
    for element in document.select(&selector) {
        let Some(href) = element.value().attr("href") else {
            continue;
        };
        let Ok(resolved) = base.join(href) else {
            continue;
        };
        // Stay on the source's own host.
        if resolved.host_str() != base.host_str() {
            continue;
        }
        urls.push(resolved.to_string());
    }
    urls
}

/// Extract article fields from a page.
fn extract_article(html: &str, content_selector: &str) -> RawArticle {
    let document = Html::parse_document(html);
    let mut raw = RawArticle::default();

    raw.title = select_text(&document, "h1")
        .or_else(|| select_meta(&document, "meta[property=\"og:title\"]"));
    raw.subtitle = select_text(&document, "h2.subtitle, .bajada, .subhead");
    raw.summary = select_meta(&document, "meta[name=\"description\"]")
        .or_else(|| select_meta(&document, "meta[property=\"og:description\"]"));
    raw.author = select_meta(&document, "meta[name=\"author\"]")
        .or_else(|| select_text(&document, ".author, .byline"));
    raw.published_at = select_meta(&document, "meta[property=\"article:published_time\"]")
        .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
        .map(|dt| dt.with_timezone(&Utc));

    if let Ok(selector) = Selector::parse(content_selector) {
        let paragraphs: Vec<String> = document
            .select(&selector)
            .map(|el| el.text().collect::<String>().trim().to_string())
            .filter(|p| !p.is_empty())
            .collect();
        raw.content = paragraphs.join("\n\n");
    }

    if let Some(image) = select_meta(&document, "meta[property=\"og:image\"]") {
        raw.image_urls.push(image);
    }

    raw
}

fn select_text(document: &Html, selector_str: &str) -> Option<String> {
    let selector = Selector::parse(selector_str).ok()?;
    document
        .select(&selector)
        .next()
        .map(|el| el.text().collect::<String>().trim().to_string())
        .filter(|t| !t.is_empty())
}

fn select_meta(document: &Html, selector_str: &str) -> Option<String> {
    let selector = Selector::parse(selector_str).ok()?;
    document
        .select(&selector)
        .next()
        .and_then(|el| el.value().attr("content"))
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
}
