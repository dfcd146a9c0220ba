//! URL and content fingerprinting for deduplication.
//!
//! Two items are the same article by URL when the fingerprints of their
//! normalized URLs match, and the same by content when their normalized
//! content fingerprints match. Everything here is pure: calling twice on
//! the same input yields the same digest.

use std::collections::HashSet;

use sha2::{Digest, Sha256};
use url::Url;

/// Query parameters stripped during URL normalization.
const TRACKING_PARAMS: &[&str] = &[
    "utm_source",
    "utm_medium",
    "utm_campaign",
    "utm_term",
    "utm_content",
    "fbclid",
    "gclid",
    "msclkid",
    "_ga",
    "mc_cid",
    "mc_eid",
];

/// Normalize a URL for deduplication.
///
/// Lower-cases scheme and host, strips default ports, removes tracking
/// query parameters, sorts the remaining query pairs, drops the fragment
/// and strips a trailing slash from the path. Unparsable input is returned
/// trimmed and lower-cased so it still fingerprints deterministically.
pub fn normalize_url(url: &str) -> String {
    let parsed = match Url::parse(url.trim()) {
        Ok(u) => u,
        Err(_) => return url.trim().to_lowercase(),
    };

    // Url already lower-cases scheme/host and elides default ports.
    let mut normalized = format!("{}://", parsed.scheme());
    if let Some(host) = parsed.host_str() {
        normalized.push_str(host);
    }
    if let Some(port) = parsed.port() {
        normalized.push_str(&format!(":{}", port));
    }

    let path = parsed.path().trim_end_matches('/');
    if path.is_empty() {
        normalized.push('/');
    } else {
        normalized.push_str(path);
    }

    let mut pairs: Vec<(String, String)> = parsed
        .query_pairs()
        .filter(|(k, _)| !TRACKING_PARAMS.contains(&k.as_ref()))
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    if !pairs.is_empty() {
        pairs.sort();
        let mut serializer = url::form_urlencoded::Serializer::new(String::new());
        for (k, v) in &pairs {
            serializer.append_pair(k, v);
        }
        normalized.push('?');
        normalized.push_str(&serializer.finish());
    }

    normalized
}

/// Normalize content text: lower-case and collapse runs of whitespace.
pub fn normalize_content(content: &str) -> String {
    content
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// SHA-256 digest of a string as 64 hex chars.
pub fn fingerprint(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    hex::encode(hasher.finalize())
}

/// Fingerprint of a URL after normalization.
pub fn url_fingerprint(url: &str) -> String {
    fingerprint(&normalize_url(url))
}

/// Fingerprint of content after normalization.
pub fn content_fingerprint(content: &str) -> String {
    fingerprint(&normalize_content(content))
}

/// Common Spanish words ignored when comparing titles.
const STOP_WORDS: &[&str] = &[
    "el", "la", "los", "las", "un", "una", "de", "del", "en", "con", "por", "para", "que", "y",
    "a", "su", "se", "es", "al",
];

/// Split a title into comparison tokens: lower-cased words with
/// punctuation removed, stop words and words of two chars or fewer
/// dropped.
pub fn title_tokens(title: &str) -> HashSet<String> {
    let cleaned: String = title
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect();
    cleaned
        .split_whitespace()
        .filter(|w| w.chars().count() > 2 && !STOP_WORDS.contains(w))
        .map(|w| w.to_string())
        .collect()
}

/// Token-set Jaccard similarity between two titles, in [0, 1].
pub fn title_similarity(a: &str, b: &str) -> f64 {
    let ta = title_tokens(a);
    let tb = title_tokens(b);
    if ta.is_empty() || tb.is_empty() {
        return 0.0;
    }
    let intersection = ta.intersection(&tb).count();
    let union = ta.union(&tb).count();
    if union == 0 {
        0.0
    } else {
        intersection as f64 / union as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_url_strips_tracking_and_fragment() {
        let normalized =
            normalize_url("https://Example.com:443/path/?utm_source=twitter&id=123#section");
        assert_eq!(normalized, "https://example.com/path?id=123");
    }

    #[test]
    fn test_normalize_url_sorts_query_params() {
        let a = normalize_url("https://example.com/a?b=2&a=1");
        let b = normalize_url("https://example.com/a?a=1&b=2");
        assert_eq!(a, b);
    }

    #[test]
    fn test_normalize_url_equivalent_variants_share_fingerprint() {
        let variants = [
            "https://Example.com:443/path/?utm_source=twitter&id=123#section",
            "https://example.com/path?id=123",
            "https://example.com/path/?id=123&utm_campaign=test",
        ];
        let first = url_fingerprint(variants[0]);
        for v in &variants[1..] {
            assert_eq!(url_fingerprint(v), first, "variant {} diverged", v);
        }
    }

    #[test]
    fn test_normalize_url_keeps_non_default_port() {
        assert_eq!(
            normalize_url("http://example.com:8080/x"),
            "http://example.com:8080/x"
        );
    }

    #[test]
    fn test_content_fingerprint_ignores_case_and_whitespace() {
        let a = content_fingerprint("This is a test article about politics.");
        let b = content_fingerprint("this   is  a TEST article   about politics.");
        assert_eq!(a, b);
        let c = content_fingerprint("This is a completely different article.");
        assert_ne!(a, c);
    }

    #[test]
    fn test_fingerprint_is_64_hex_chars() {
        let digest = fingerprint("hello");
        assert_eq!(digest.len(), 64);
        assert!(digest.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_title_similarity_flags_same_story() {
        let a = "Senado aprueba ley de presupuesto 2026";
        let b = "El Senado aprueba el presupuesto 2026";
        assert!(title_similarity(a, b) >= 0.6);
    }

    #[test]
    fn test_title_similarity_distinct_stories() {
        let a = "Senado aprueba ley de presupuesto 2026";
        let b = "River gana el clásico ante Boca en el Monumental";
        assert!(title_similarity(a, b) < 0.2);
    }

    #[test]
    fn test_title_similarity_empty_is_zero() {
        assert_eq!(title_similarity("", "algo"), 0.0);
        assert_eq!(title_similarity("de la el", "de la el"), 0.0);
    }
}
