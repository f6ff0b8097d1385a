//! Gemini API連携
//!
//! `generateContent` エンドポイントへのリクエスト/レスポンスの変換と送信。

use super::{GenerativeModel, ModelReply, ModelRequest};
use crate::config::Config;
use crate::error::{PlantExplorerError, Result};
use plant_explorer_common::{Attribution, GatewayError};
use serde::{Deserialize, Serialize};
use std::time::Duration;

const UNTITLED_SOURCE: &str = "Untitled Source";
/// エラー本文をメッセージに含める最大文字数
const MAX_ERROR_BODY_CHARS: usize = 300;

/// Gemini APIリクエスト
#[derive(Serialize)]
struct GeminiRequest {
    contents: Vec<Content>,
    #[serde(rename = "generationConfig", skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<Tool>,
}

#[derive(Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum Part {
    Text { text: String },
    InlineData { inline_data: InlineData },
}

#[derive(Serialize)]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Serialize)]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(rename = "responseMimeType", skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<String>,
}

#[derive(Serialize)]
struct Tool {
    google_search: GoogleSearch,
}

#[derive(Serialize)]
struct GoogleSearch {}

impl GeminiRequest {
    fn from_model_request(request: ModelRequest) -> Self {
        let mut parts = Vec::with_capacity(2);
        if let Some(image) = request.image {
            parts.push(Part::InlineData {
                inline_data: InlineData {
                    mime_type: image.mime_type,
                    data: image.data,
                },
            });
        }
        parts.push(Part::Text { text: request.prompt });

        // グラウンディング使用時は responseMimeType を指定できない
        let response_mime_type = (request.json_response && !request.grounded).then(|| "application/json".to_string());
        let generation_config = if request.temperature.is_some() || response_mime_type.is_some() {
            Some(GenerationConfig {
                temperature: request.temperature,
                response_mime_type,
            })
        } else {
            None
        };

        let tools = if request.grounded {
            vec![Tool { google_search: GoogleSearch {} }]
        } else {
            Vec::new()
        };

        Self {
            contents: vec![Content { parts }],
            generation_config,
            tools,
        }
    }
}

/// Gemini APIレスポンス
#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<ResponseContent>,
    grounding_metadata: Option<GroundingMetadata>,
}

#[derive(Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GroundingMetadata {
    #[serde(default)]
    grounding_chunks: Vec<GroundingChunk>,
}

#[derive(Deserialize)]
struct GroundingChunk {
    web: Option<WebChunk>,
}

#[derive(Deserialize)]
struct WebChunk {
    uri: Option<String>,
    title: Option<String>,
}

impl GeminiResponse {
    fn into_reply(self) -> std::result::Result<ModelReply, GatewayError> {
        let Some(candidate) = self.candidates.into_iter().next() else {
            let reason = self.prompt_feedback.and_then(|f| f.block_reason);
            return Err(GatewayError::Transport(match reason {
                Some(reason) => format!("Request was blocked by the model: {}", reason),
                None => "Empty response".to_string(),
            }));
        };

        let text = candidate
            .content
            .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect::<String>())
            .unwrap_or_default();

        let attributions = candidate
            .grounding_metadata
            .map(|m| map_grounding_chunks(m.grounding_chunks))
            .unwrap_or_default();

        Ok(ModelReply { text, attributions })
    }
}

/// 出典のうちURIのあるWeb出典だけを残す（URIの重複は除く）
fn map_grounding_chunks(chunks: Vec<GroundingChunk>) -> Vec<Attribution> {
    let mut attributions: Vec<Attribution> = Vec::new();
    for web in chunks.into_iter().filter_map(|c| c.web) {
        let Some(uri) = web.uri.filter(|u| !u.trim().is_empty()) else {
            continue;
        };
        if attributions.iter().any(|a| a.uri == uri) {
            continue;
        }
        let title = web
            .title
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| UNTITLED_SOURCE.to_string());
        attributions.push(Attribution { uri, title });
    }
    attributions
}

/// エラーレスポンスから表示用メッセージを取り出す
fn api_error_message(body: &str) -> String {
    let from_json = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v["error"]["message"].as_str().map(str::to_string));
    from_json.unwrap_or_else(|| body.trim().chars().take(MAX_ERROR_BODY_CHARS).collect())
}

/// Gemini REST クライアント
pub struct GeminiClient {
    http: reqwest::Client,
    api_key: Option<String>,
    endpoint: String,
}

impl GeminiClient {
    pub fn new(api_key: Option<String>, api_base: &str, model: &str, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| PlantExplorerError::HttpClient(e.to_string()))?;
        let endpoint = format!("{}/models/{}:generateContent", api_base.trim_end_matches('/'), model);
        Ok(Self {
            http,
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            endpoint,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(
            config.resolve_api_key(),
            &config.api_base,
            &config.model,
            Duration::from_secs(config.timeout_seconds),
        )
    }

    pub fn has_credential(&self) -> bool {
        self.api_key.is_some()
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl GenerativeModel for GeminiClient {
    async fn generate(&self, request: ModelRequest) -> std::result::Result<ModelReply, GatewayError> {
        // キー未設定なら通信せずに打ち切る
        let Some(api_key) = self.api_key.as_deref() else {
            return Err(GatewayError::MissingCredential);
        };

        let body = GeminiRequest::from_model_request(request);
        let response = self
            .http
            .post(&self.endpoint)
            .header("x-goog-api-key", api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| GatewayError::Transport(format!("Request to Gemini failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(GatewayError::Transport(format!(
                "API error: {} {}",
                status.as_u16(),
                api_error_message(&text)
            )));
        }

        let payload: GeminiResponse = response
            .json()
            .await
            .map_err(|e| GatewayError::Transport(format!("Invalid response from Gemini: {}", e)))?;
        payload.into_reply()
    }
}
