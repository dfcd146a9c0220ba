//! Chat-completion enricher.
//!
//! Talks to any OpenAI-compatible chat endpoint and expects the model to
//! answer with a single JSON object matching [`EnrichmentOutput`].

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{EnrichError, Enricher};
use crate::models::{EnrichmentOutput, ScrapingItem};

/// Default prompt for rewriting a scraped article.
pub const DEFAULT_REWRITE_PROMPT: &str = r#"Sos un editor de un medio de noticias digital. Reescribí el siguiente artículo para publicación.

Respondé SOLO con un objeto JSON, sin texto adicional ni bloques de código, con esta forma:
{
  "title": "titular claro y completo (mínimo 20 caracteres)",
  "summary": "resumen informativo (mínimo 50 caracteres)",
  "category": "una de: Ciencia, Cultura, Deportes, Economía, Educación, Investigación, Medio Ambiente, Política, Salud, Sociedad, Tecnología, Turismo",
  "tags": ["etiquetas", "en", "minúscula"],
  "renderings": {
    "brief": "versión mínima (mínimo 20 caracteres)",
    "core": "versión central (mínimo 50 caracteres)",
    "deep": "versión en profundidad (mínimo 100 caracteres)"
  },
  "is_valid": true,
  "rejection_reason": null
}

Si el texto NO es una noticia publicable (publicidad, página de error, listado, contenido truncado), devolvé "is_valid": false y explicá el motivo en "rejection_reason".

Título original: {title}

Texto original:
{content}"#;

/// Configuration for the chat enricher.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    /// OpenAI-compatible API endpoint.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    /// API key, usually injected from the environment.
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    /// Custom rewrite prompt ({title} and {content} placeholders).
    #[serde(default)]
    pub rewrite_prompt: Option<String>,
    /// Maximum characters of article content to send.
    #[serde(default = "default_max_content_chars")]
    pub max_content_chars: usize,
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

fn default_endpoint() -> String {
    "https://api.openai.com/v1".to_string()
}
fn default_model() -> String {
    "gpt-4o-mini".to_string()
}
fn default_max_tokens() -> u32 {
    2048
}
fn default_temperature() -> f32 {
    0.3
}
fn default_max_content_chars() -> usize {
    12000
}
fn default_timeout_seconds() -> u64 {
    120
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            api_key: String::new(),
            model: default_model(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            rewrite_prompt: None,
            max_content_chars: default_max_content_chars(),
            timeout_seconds: default_timeout_seconds(),
        }
    }
}

impl ChatConfig {
    pub fn get_rewrite_prompt(&self) -> &str {
        self.rewrite_prompt.as_deref().unwrap_or(DEFAULT_REWRITE_PROMPT)
    }
}

/// Chat API request format.
#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

/// Chat API response format.
#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    content: String,
}

/// Enricher backed by a chat-completion API.
pub struct ChatEnricher {
    config: ChatConfig,
    client: Client,
}

impl ChatEnricher {
    pub fn new(config: ChatConfig) -> Result<Self, EnrichError> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| EnrichError::Connection(e.to_string()))?;
        Ok(Self { config, client })
    }

    fn truncate_content<'a>(&self, content: &'a str) -> &'a str {
        let limit = self.config.max_content_chars;
        if content.len() <= limit {
            return content;
        }
        // Cut on a char boundary.
        let mut end = limit;
        while end > 0 && !content.is_char_boundary(end) {
            end -= 1;
        }
        &content[..end]
    }

    async fn call_api(&self, prompt: &str) -> Result<String, EnrichError> {
        let request = ChatRequest {
            model: self.config.model.clone(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
        };

        let url = format!("{}/chat/completions", self.config.endpoint);
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| EnrichError::Connection(e.to_string()))?;

        if !response.status().is_success() {
            return Err(EnrichError::Api(format!("HTTP {}", response.status())));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| EnrichError::Parse(e.to_string()))?;
        parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| EnrichError::Parse("empty choices in response".to_string()))
    }
}

#[async_trait]
impl Enricher for ChatEnricher {
    async fn enrich(&self, item: &ScrapingItem) -> Result<EnrichmentOutput, EnrichError> {
        let title = item.title.as_deref().unwrap_or("(sin título)");
        let prompt = self
            .config
            .get_rewrite_prompt()
            .replace("{title}", title)
            .replace("{content}", self.truncate_content(&item.content));

        debug!(item_id = %item.id, model = %self.config.model, "requesting rewrite");
        let answer = self.call_api(&prompt).await?;
        parse_model_json(&answer)
    }
}

/// Parse the model's answer, tolerating markdown code fences.
fn parse_model_json(answer: &str) -> Result<EnrichmentOutput, EnrichError> {
    let trimmed = answer.trim();
    let body = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .map(|rest| rest.trim_end_matches("```").trim())
        .unwrap_or(trimmed);

    serde_json::from_str(body).map_err(|e| EnrichError::Parse(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain_json() {
        let out = parse_model_json(
            r#"{"title": "Titular de prueba suficientemente largo",
                "summary": "Un resumen con los caracteres necesarios para pasar.",
                "category": "Política",
                "tags": ["senado"],
                "renderings": {"brief": "b", "core": "c", "deep": "d"}}"#,
        )
        .unwrap();
        assert_eq!(out.category, "Política");
        assert!(out.is_valid);
        assert!(out.rejection_reason.is_none());
    }

    #[test]
    fn test_parse_fenced_json() {
        let out = parse_model_json(
            "```json\n{\"title\": \"t\", \"summary\": \"s\", \"category\": \"Salud\", \"is_valid\": false, \"rejection_reason\": \"publicidad\"}\n```",
        )
        .unwrap();
        assert!(!out.is_valid);
        assert_eq!(out.rejection_reason.as_deref(), Some("publicidad"));
    }

    #[test]
    fn test_parse_garbage_is_error() {
        assert!(parse_model_json("no soy json").is_err());
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        let enricher = ChatEnricher::new(ChatConfig {
            max_content_chars: 5,
            ..Default::default()
        })
        .unwrap();
        // "ñ" is two bytes; the cut must not split it.
        assert_eq!(enricher.truncate_content("añañañña"), "aña");
    }
}
