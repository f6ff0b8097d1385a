//! 結果キャッシュ
//!
//! (植物名, 画像) をキーに、取得済みの植物情報・健康診断をセッション中だけ保持する。
//! 画像が違えば同じ名前でも別エントリ。テキスト検索は「画像なし」をキーにする。

use crate::image_input::ImageRef;
use plant_explorer_common::{HealthAssessment, InfoPayload};
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    plant_name: String,
    image: Option<ImageRef>,
}

impl CacheKey {
    fn new(plant_name: &str, image: Option<&ImageRef>) -> Self {
        Self {
            plant_name: plant_name.trim().to_lowercase(),
            image: image.cloned(),
        }
    }
}

/// キャッシュエントリ
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CachedResult {
    /// 結果を計算した画像
    pub image: Option<ImageRef>,
    pub info: Option<InfoPayload>,
    pub health: Option<HealthAssessment>,
}

/// キャッシュに入れる結果
#[derive(Debug, Clone, PartialEq)]
pub enum CachedPayload {
    Info(InfoPayload),
    Health(HealthAssessment),
}

#[derive(Debug, Default)]
pub struct ResultCache {
    entries: HashMap<CacheKey, CachedResult>,
}

impl ResultCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// キャッシュをルックアップ（画像が完全一致する場合のみ）
    pub fn get(&self, plant_name: &str, image: Option<&ImageRef>) -> Option<&CachedResult> {
        self.entries
            .get(&CacheKey::new(plant_name, image))
            .filter(|entry| entry.image.as_ref() == image)
    }

    pub fn info(&self, plant_name: &str, image: Option<&ImageRef>) -> Option<&InfoPayload> {
        self.get(plant_name, image).and_then(|e| e.info.as_ref())
    }

    pub fn health(&self, plant_name: &str, image: Option<&ImageRef>) -> Option<&HealthAssessment> {
        self.get(plant_name, image).and_then(|e| e.health.as_ref())
    }

    /// 結果を保存（同じスロットは無条件に上書き）
    pub fn put(&mut self, plant_name: &str, image: Option<&ImageRef>, payload: CachedPayload) {
        let entry = self
            .entries
            .entry(CacheKey::new(plant_name, image))
            .or_insert_with(|| CachedResult {
                image: image.cloned(),
                ..Default::default()
            });
        match payload {
            CachedPayload::Info(info) => entry.info = Some(info),
            CachedPayload::Health(health) => entry.health = Some(health),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
