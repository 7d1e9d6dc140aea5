//! HTTP transform gateway speaking the Gemini `generateContent` protocol.
//!
//! Each transform is one POST carrying an optional inline image plus a text
//! directive, with the response modality forced to IMAGE. The first inline
//! image in the first candidate is the result; a response without one is a
//! failure.

use std::sync::Arc;

use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose};
use reqwest::Client;
use serde::Deserialize;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use crate::config::{EnhancementSettings, GatewayConfig, OutputFormat, ResolutionTier};
use crate::core::{Artifact, LayerKind, MediaType};
use crate::error::{FlyerError, FlyerResult};
use crate::gateway::{TransformGateway, directives};

/// Gateway backed by a Gemini-compatible HTTP endpoint.
///
/// Requests beyond `max_concurrent_requests` wait for a permit instead of
/// being sent; each request is bounded by the configured timeout.
#[derive(Debug, Clone)]
pub struct GeminiGateway {
    client: Client,
    config: GatewayConfig,
    permits: Arc<Semaphore>,
}

impl GeminiGateway {
    pub fn new(config: GatewayConfig) -> FlyerResult<Self> {
        config.validate()?;
        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| FlyerError::config("http_client", "", e.to_string()))?;
        let permits = Arc::new(Semaphore::new(config.max_concurrent_requests));
        info!(
            endpoint = %config.endpoint,
            model = %config.model,
            max_concurrent = config.max_concurrent_requests,
            "transform gateway ready"
        );
        Ok(Self {
            client,
            config,
            permits,
        })
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Send one generateContent request and unwrap the image it returns.
    async fn generate(
        &self,
        operation: &str,
        image: Option<&Artifact>,
        directive: &str,
    ) -> FlyerResult<Artifact> {
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|e| FlyerError::gateway(operation, e.to_string()))?;

        let body = request_body(image, directive);
        let api_key = self.config.api_key.as_deref().unwrap_or_default();

        debug!(operation, has_image = image.is_some(), "sending transform request");
        let response = self
            .client
            .post(self.config.generate_url())
            .header("x-goog-api-key", api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                let reason = if e.is_timeout() {
                    format!("timed out after {}s", self.config.timeout_secs)
                } else {
                    e.to_string()
                };
                FlyerError::gateway(operation, reason)
            })?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            warn!(operation, %status, "transform request rejected");
            return Err(FlyerError::gateway(
                operation,
                format!("service returned {status}: {}", truncate(&detail, 300)),
            ));
        }

        let parsed: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| FlyerError::gateway(operation, format!("unreadable response: {e}")))?;

        let artifact = image_from_response(operation, parsed)?;
        debug!(operation, media_type = %artifact.media_type(), bytes = artifact.len(), "transform succeeded");
        Ok(artifact)
    }
}

#[async_trait]
impl TransformGateway for GeminiGateway {
    async fn extract(&self, image: &Artifact, kind: LayerKind) -> FlyerResult<Artifact> {
        let operation = format!("extract {kind}");
        self.generate(&operation, Some(image), directives::extraction_directive(kind))
            .await
    }

    async fn enhance(
        &self,
        image: &Artifact,
        kind: LayerKind,
        settings: &EnhancementSettings,
    ) -> FlyerResult<Artifact> {
        let operation = format!("enhance {kind}");
        let directive = directives::enhancement_directive(kind, settings);
        self.generate(&operation, Some(image), &directive).await
    }

    async fn restore(&self, image: &Artifact) -> FlyerResult<Artifact> {
        self.generate("restore", Some(image), directives::RESTORATION_DIRECTIVE)
            .await
    }

    async fn super_resolve(
        &self,
        image: &Artifact,
        tier: ResolutionTier,
        format: OutputFormat,
    ) -> FlyerResult<Artifact> {
        let directive = directives::export_directive(tier, format);
        self.generate("super-resolve", Some(image), &directive).await
    }

    async fn generate_from_text(&self, prompt: &str) -> FlyerResult<Artifact> {
        let directive = directives::creation_directive(prompt);
        self.generate("generate", None, &directive).await
    }
}

fn request_body(image: Option<&Artifact>, directive: &str) -> serde_json::Value {
    let mut parts = Vec::with_capacity(2);
    if let Some(image) = image {
        parts.push(serde_json::json!({
            "inlineData": {
                "mimeType": image.media_type().mime(),
                "data": general_purpose::STANDARD.encode(image.bytes()),
            }
        }));
    }
    parts.push(serde_json::json!({ "text": directive }));
    serde_json::json!({
        "contents": [{ "parts": parts }],
        "generationConfig": { "responseModalities": ["IMAGE"] },
    })
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Part {
    inline_data: Option<InlineData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: String,
    data: String,
}

fn image_from_response(operation: &str, response: GenerateContentResponse) -> FlyerResult<Artifact> {
    let inline = response
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .and_then(|content| content.parts.into_iter().find_map(|p| p.inline_data))
        .ok_or_else(|| FlyerError::gateway(operation, "response contained no image"))?;

    let media_type = MediaType::from_mime(&inline.mime_type).ok_or_else(|| {
        FlyerError::gateway(
            operation,
            format!("unsupported image type '{}'", inline.mime_type),
        )
    })?;
    let data = general_purpose::STANDARD
        .decode(inline.data.as_bytes())
        .map_err(|e| FlyerError::gateway(operation, format!("invalid base64 image: {e}")))?;
    if data.is_empty() {
        return Err(FlyerError::gateway(operation, "response image was empty"));
    }
    Ok(Artifact::new(media_type, data))
}

fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}…", &text[..idx]),
        None => text.to_string(),
    }
}
