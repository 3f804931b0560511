//! Remote generation client: the boundary to Gemini's `generateContent` API.
//!
//! The rest of the pipeline only sees the [`GenerationClient`] trait; the
//! production implementation talks REST. Failures surface as opaque
//! `anyhow` errors carrying the HTTP status and body text so the classifier
//! can pick markers out of them. A malformed-but-successful script payload is
//! reported as [`ClassifiedError::script_unavailable`] so the orchestrator
//! fails it with the right category.

pub mod prompts;

use std::sync::Arc;

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use base64::Engine;
use bytes::Bytes;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::debug;

use crate::core::classify::ClassifiedError;
use crate::core::comic::{GenerationRequest, PanelImage, PanelScript, ReferenceImage};

#[async_trait]
pub trait GenerationClient: Send + Sync {
    /// One call that plots every panel at once. Returns the ordered script
    /// list; empty or malformed output is the caller's problem to classify.
    async fn synthesize_script(&self, request: &GenerationRequest) -> Result<Vec<PanelScript>>;

    /// Render one panel description to image bytes. A zero-byte payload is a
    /// failure.
    async fn synthesize_image(
        &self,
        request: &GenerationRequest,
        description: &str,
    ) -> Result<PanelImage>;
}

#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_base: String,
    pub script_model: String,
    pub image_model: String,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_base: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            script_model: "gemini-3-flash-preview".to_string(),
            image_model: "gemini-2.5-flash-image".to_string(),
        }
    }
}

pub struct GeminiClient {
    http: Client,
    // Shared with the credential reselector, which swaps the key in place.
    api_key: Arc<RwLock<String>>,
    config: GeminiConfig,
}

impl GeminiClient {
    pub fn new(api_key: Arc<RwLock<String>>) -> Self {
        Self::with_config(api_key, GeminiConfig::default())
    }

    pub fn with_config(api_key: Arc<RwLock<String>>, config: GeminiConfig) -> Self {
        Self {
            http: Client::new(),
            api_key,
            config,
        }
    }

    async fn generate(&self, model: &str, body: &GeminiRequest) -> Result<GeminiResponse> {
        let key = self.api_key.read().await.clone();
        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.config.api_base, model, key
        );
        debug!(model, "calling generateContent");
        let res = self.http.post(&url).json(body).send().await?;
        let status = res.status();
        if !status.is_success() {
            let text = res.text().await.unwrap_or_default();
            return Err(anyhow!("Gemini API error ({status}): {text}"));
        }
        Ok(res.json().await?)
    }
}

#[async_trait]
impl GenerationClient for GeminiClient {
    async fn synthesize_script(&self, request: &GenerationRequest) -> Result<Vec<PanelScript>> {
        let mut parts: Vec<GeminiPart> = request
            .reference_images
            .iter()
            .map(GeminiPart::blob)
            .collect();
        parts.push(GeminiPart::text(prompts::script_user_prompt(request)));

        let body = GeminiRequest {
            system_instruction: Some(GeminiContent {
                role: "user".to_string(),
                parts: vec![GeminiPart::text(prompts::script_system_instruction(
                    request.style,
                    request.mode,
                ))],
            }),
            contents: vec![GeminiContent {
                role: "user".to_string(),
                parts,
            }],
            generation_config: Some(ScriptGenerationConfig {
                response_mime_type: "application/json".to_string(),
                response_schema: script_response_schema(),
            }),
        };

        let response = self.generate(&self.config.script_model, &body).await?;
        let text = response
            .first_text()
            .ok_or_else(|| anyhow!("no text returned from script synthesis"))?;
        parse_script_items(&text)
    }

    async fn synthesize_image(
        &self,
        request: &GenerationRequest,
        description: &str,
    ) -> Result<PanelImage> {
        let mut parts: Vec<GeminiPart> = request
            .reference_images
            .iter()
            .map(GeminiPart::blob)
            .collect();
        parts.push(GeminiPart::text(prompts::image_prompt(request, description)));

        let body = GeminiRequest {
            system_instruction: None,
            contents: vec![GeminiContent {
                role: "user".to_string(),
                parts,
            }],
            generation_config: None,
        };

        let response = self.generate(&self.config.image_model, &body).await?;
        response
            .first_image()?
            .ok_or_else(|| anyhow!("no image data found in response"))
    }
}

// --- Wire types ---

#[derive(Serialize)]
struct GeminiRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<GeminiContent>,
    contents: Vec<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<ScriptGenerationConfig>,
}

#[derive(Serialize)]
struct ScriptGenerationConfig {
    response_mime_type: String,
    response_schema: serde_json::Value,
}

#[derive(Serialize)]
struct GeminiContent {
    role: String,
    parts: Vec<GeminiPart>,
}

#[derive(Serialize)]
struct GeminiPart {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    inline_data: Option<GeminiBlob>,
}

impl GeminiPart {
    fn text(text: String) -> Self {
        Self {
            text: Some(text),
            inline_data: None,
        }
    }

    fn blob(image: &ReferenceImage) -> Self {
        Self {
            text: None,
            inline_data: Some(GeminiBlob {
                mime_type: image.mime_type.clone(),
                data: base64::engine::general_purpose::STANDARD.encode(&image.data),
            }),
        }
    }
}

#[derive(Serialize)]
struct GeminiBlob {
    mime_type: String,
    data: String,
}

#[derive(Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Deserialize)]
struct GeminiCandidate {
    content: GeminiResContent,
}

#[derive(Deserialize)]
struct GeminiResContent {
    #[serde(default)]
    parts: Vec<GeminiResPart>,
}

#[derive(Deserialize)]
struct GeminiResPart {
    text: Option<String>,
    #[serde(rename = "inlineData", alias = "inline_data")]
    inline_data: Option<GeminiResBlob>,
}

#[derive(Deserialize)]
struct GeminiResBlob {
    #[serde(rename = "mimeType", alias = "mime_type", default)]
    mime_type: String,
    data: String,
}

impl GeminiResponse {
    fn first_text(self) -> Option<String> {
        self.candidates
            .into_iter()
            .next()?
            .content
            .parts
            .into_iter()
            .find_map(|p| p.text)
    }

    fn first_image(self) -> Result<Option<PanelImage>> {
        for candidate in self.candidates {
            for part in candidate.content.parts {
                if let Some(blob) = part.inline_data {
                    let data = base64::engine::general_purpose::STANDARD
                        .decode(blob.data.trim())
                        .map_err(|e| anyhow!("image payload is not valid base64: {e}"))?;
                    let mime_type = if blob.mime_type.is_empty() {
                        "image/png".to_string()
                    } else {
                        blob.mime_type
                    };
                    return Ok(Some(PanelImage {
                        mime_type,
                        data: Bytes::from(data),
                    }));
                }
            }
        }
        Ok(None)
    }
}

fn script_response_schema() -> serde_json::Value {
    serde_json::json!({
        "type": "ARRAY",
        "items": {
            "type": "OBJECT",
            "properties": {
                "description": {
                    "type": "STRING",
                    "description": "Visual description of the scene for an image generator, \
                                    including the style line and the main character's appearance."
                },
                "caption": {
                    "type": "STRING",
                    "description": "The panel's dialogue, short and sweet, Traditional Chinese."
                }
            },
            "required": ["description", "caption"]
        }
    })
}

#[derive(Deserialize)]
struct ScriptItem {
    #[serde(alias = "panelDescription", alias = "panel_description")]
    description: String,
    caption: String,
}

/// Pull a JSON block out of model output. Accepts a fenced ```json block or
/// raw JSON starting with `{` or `[`.
fn extract_json_block(text: &str) -> Option<&str> {
    let trimmed = text.trim();
    if let Some(start) = trimmed.find("```json") {
        let content_start = start + 7;
        if let Some(end) = trimmed[content_start..].find("```") {
            let block = trimmed[content_start..content_start + end].trim();
            if !block.is_empty() {
                return Some(block);
            }
        }
    }
    if trimmed.starts_with('{') || trimmed.starts_with('[') {
        return Some(trimmed);
    }
    None
}

/// Parse script-synthesis output into ordered panel scripts. A payload that
/// does not contain a parsable script array is reported as
/// `ScriptUnavailable` rather than a transport failure.
fn parse_script_items(text: &str) -> Result<Vec<PanelScript>> {
    let block = extract_json_block(text).ok_or(ClassifiedError::script_unavailable())?;
    let items: Vec<ScriptItem> =
        serde_json::from_str(block).map_err(|_| ClassifiedError::script_unavailable())?;
    Ok(items
        .into_iter()
        .enumerate()
        .map(|(i, item)| PanelScript {
            index: i + 1,
            description: item.description,
            caption: item.caption,
        })
        .collect())
}
