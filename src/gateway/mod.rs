//! AIゲートウェイ
//!
//! 3種類のリクエストを生成モデルに投げ、応答を型付きの結果に正規化する:
//! - fetch_plant_info: 植物名 → 植物情報 + 出典
//! - identify_from_image: 写真 → 植物名
//! - assess_health: 写真 + 植物名 → 健康診断
//!
//! 失敗はすべて `GatewayError` として返し、パニックさせない。

mod gemini;

pub use gemini::GeminiClient;

use crate::image_input::PlantImage;
use plant_explorer_common::{
    build_health_prompt, build_plant_info_prompt, parse_health_assessment, parse_identification,
    parse_plant_info, Attribution, GatewayError, HealthAssessment, InfoPayload,
    PLANT_IDENTIFICATION_PROMPT,
};
use std::future::Future;
use std::time::Instant;

/// リクエストに添付する画像
#[derive(Debug, Clone, PartialEq)]
pub struct InlineImage {
    pub mime_type: String,
    /// Base64データ（Data URLのプレフィックスなし）
    pub data: String,
}

impl From<&PlantImage> for InlineImage {
    fn from(image: &PlantImage) -> Self {
        Self {
            mime_type: image.mime_type().to_string(),
            data: image.base64_data().to_string(),
        }
    }
}

/// 生成モデルへのリクエスト（転送方式に依存しない形）
#[derive(Debug, Clone, PartialEq)]
pub struct ModelRequest {
    pub prompt: String,
    pub image: Option<InlineImage>,
    /// Web検索によるグラウンディングを有効にする
    pub grounded: bool,
    /// JSONでの応答を要求する（グラウンディングとは併用不可）
    pub json_response: bool,
    pub temperature: Option<f32>,
}

impl ModelRequest {
    pub fn text(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            image: None,
            grounded: false,
            json_response: false,
            temperature: None,
        }
    }

    pub fn with_image(mut self, image: &PlantImage) -> Self {
        self.image = Some(InlineImage::from(image));
        self
    }
}

/// 生成モデルの応答
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModelReply {
    pub text: String,
    pub attributions: Vec<Attribution>,
}

/// 生成モデルとの通信路
pub trait GenerativeModel: Send + Sync {
    fn generate(&self, request: ModelRequest) -> impl Future<Output = Result<ModelReply, GatewayError>> + Send;
}

pub struct AiGateway<M> {
    model: M,
}

impl<M: GenerativeModel> AiGateway<M> {
    pub fn new(model: M) -> Self {
        Self { model }
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    /// 植物名から植物情報を取得
    pub async fn fetch_plant_info(&self, plant_name: &str) -> Result<InfoPayload, GatewayError> {
        let started = Instant::now();
        let request = ModelRequest {
            grounded: true,
            ..ModelRequest::text(build_plant_info_prompt(plant_name))
        };

        let reply = self.model.generate(request).await?;
        tracing::debug!(
            plant = plant_name,
            chars = reply.text.len(),
            attributions = reply.attributions.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "plant info response"
        );

        let info = parse_plant_info(&reply.text, plant_name)?;
        Ok(InfoPayload {
            info,
            attributions: reply.attributions,
        })
    }

    /// 写真から植物名を特定
    pub async fn identify_from_image(&self, image: &PlantImage) -> Result<String, GatewayError> {
        let started = Instant::now();
        let request = ModelRequest::text(PLANT_IDENTIFICATION_PROMPT).with_image(image);

        let reply = self.model.generate(request).await?;
        tracing::debug!(
            image = %image.image_ref(),
            response = reply.text.trim(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "identification response"
        );

        parse_identification(&reply.text)
    }

    /// 写真から健康状態を診断
    pub async fn assess_health(&self, image: &PlantImage, plant_name: &str) -> Result<HealthAssessment, GatewayError> {
        let started = Instant::now();
        let request = ModelRequest {
            json_response: true,
            temperature: Some(0.2),
            ..ModelRequest::text(build_health_prompt(plant_name)).with_image(image)
        };

        let reply = self.model.generate(request).await?;
        tracing::debug!(
            plant = plant_name,
            chars = reply.text.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "health response"
        );

        parse_health_assessment(&reply.text, plant_name)
    }
}
