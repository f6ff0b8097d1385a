//! 画像入力
//!
//! 画像ファイルをData URLに変換し、内容ハッシュで同一性を判定する。

use crate::error::{PlantExplorerError, Result};
use base64::Engine;
use plant_explorer_common::data_url;
use sha2::{Digest, Sha256};
use std::fmt;
use std::path::Path;
use std::sync::Arc;

const IMAGE_EXTENSIONS: &[(&str, &str)] = &[
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("png", "image/png"),
    ("webp", "image/webp"),
];

/// 画像の同一性キー（Data URLのSHA-256）
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ImageRef(String);

impl ImageRef {
    pub fn of(data_url: &str) -> Self {
        let digest = Sha256::digest(data_url.as_bytes());
        Self(hex::encode(digest))
    }
}

impl fmt::Display for ImageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // 先頭12桁で十分に区別できる
        f.write_str(&self.0[..self.0.len().min(12)])
    }
}

/// ユーザーが渡した植物の写真
///
/// クローンは安価（Data URLは共有される）。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlantImage {
    data_url: Arc<str>,
    image_ref: ImageRef,
}

impl PlantImage {
    pub fn from_data_url(data_url: impl Into<String>) -> Result<Self> {
        let data_url: String = data_url.into();
        data_url::validate_image_data_url(&data_url)
            .map_err(|e| PlantExplorerError::ImageLoad(e.to_string()))?;
        let image_ref = ImageRef::of(&data_url);
        Ok(Self {
            data_url: Arc::from(data_url),
            image_ref,
        })
    }

    pub fn from_bytes(bytes: &[u8], mime_type: &str) -> Result<Self> {
        let encoded = base64::engine::general_purpose::STANDARD.encode(bytes);
        Self::from_data_url(data_url::build_data_url(mime_type, &encoded))
    }

    /// 画像ファイルを読み込む（拡張子からMIMEタイプを決める）
    pub fn load(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(PlantExplorerError::FileNotFound(path.display().to_string()));
        }
        let mime_type = mime_type_for(path)
            .ok_or_else(|| PlantExplorerError::UnsupportedImage(path.display().to_string()))?;
        let bytes = std::fs::read(path)?;
        Self::from_bytes(&bytes, mime_type)
    }

    pub fn data_url(&self) -> &str {
        &self.data_url
    }

    pub fn image_ref(&self) -> &ImageRef {
        &self.image_ref
    }

    pub fn mime_type(&self) -> &str {
        data_url::extract_mime_type(&self.data_url)
    }

    pub fn base64_data(&self) -> &str {
        data_url::extract_base64(&self.data_url)
    }
}

fn mime_type_for(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_string_lossy().to_lowercase();
    IMAGE_EXTENSIONS
        .iter()
        .find(|(e, _)| *e == ext)
        .map(|(_, mime)| *mime)
}
