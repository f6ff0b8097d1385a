//! 検索履歴
//!
//! 新しい順・最大件数・直近の重複排除を保った履歴リストを管理する。
//! 保存に失敗しても呼び出し元にはエラーを返さず、ログに残す。

mod slot;

pub use slot::HistorySlot;

use crate::config::HistorySettings;
use crate::error::Result;
use crate::image_input::PlantImage;
use crate::thumbnail;
use serde::{Deserialize, Serialize};
use std::fmt;

/// 検索の種類
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchKind {
    Text,
    Image,
}

impl fmt::Display for SearchKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SearchKind::Text => write!(f, "text"),
            SearchKind::Image => write!(f, "image"),
        }
    }
}

/// 履歴アイテム
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryItem {
    pub id: String,
    pub plant_name: String,
    pub search_type: SearchKind,
    /// 作成日時（epochミリ秒）
    pub timestamp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
}

impl HistoryItem {
    fn is_same_search(&self, plant_name: &str, kind: SearchKind) -> bool {
        self.search_type == kind && self.plant_name.to_lowercase() == plant_name.to_lowercase()
    }
}

#[derive(Debug, Clone)]
pub struct HistoryStore {
    slot: HistorySlot,
    settings: HistorySettings,
}

impl HistoryStore {
    pub fn new(slot: HistorySlot, settings: HistorySettings) -> Self {
        Self { slot, settings }
    }

    /// 履歴一覧（新しい順）
    pub fn list(&self) -> Vec<HistoryItem> {
        let mut items = self.slot.read();
        sort_newest_first(&mut items);
        items
    }

    /// 履歴に追加
    ///
    /// 画像があればサムネイルを作る。直近 `dedup_window` 件に同じ
    /// (名前, 種類) があれば、それを取り除いて先頭に入れ直す。
    pub async fn add(&self, plant_name: &str, kind: SearchKind, image: Option<&PlantImage>) -> HistoryItem {
        let thumbnail = match image {
            Some(image) => Some(self.make_thumbnail(image).await),
            None => None,
        };

        let item = HistoryItem {
            id: uuid::Uuid::new_v4().to_string(),
            plant_name: plant_name.trim().to_string(),
            search_type: kind,
            timestamp: chrono::Utc::now().timestamp_millis(),
            image_url: image.map(|i| i.data_url().to_string()),
            thumbnail,
        };

        let settings = self.settings;
        match self.slot.update(|items| insert_item(items, item, &settings)) {
            Ok(added) => added,
            Err((added, e)) => {
                tracing::warn!(error = %e, plant = %added.plant_name, "failed to save search history");
                added
            }
        }
    }

    /// IDで履歴を探す
    pub fn find(&self, id: &str) -> Option<HistoryItem> {
        self.slot.read().into_iter().find(|item| item.id == id)
    }

    /// 指定IDを削除して更新後の一覧を返す
    pub fn remove(&self, id: &str) -> Vec<HistoryItem> {
        if !self.slot.read().iter().any(|item| item.id == id) {
            return self.list();
        }

        let result = self.slot.update(|items| {
            items.retain(|item| item.id != id);
            sort_newest_first(items);
            items.clone()
        });
        match result {
            Ok(items) => items,
            Err((_, e)) => {
                tracing::warn!(error = %e, id, "failed to remove search history item");
                self.list()
            }
        }
    }

    /// 全削除
    pub fn clear(&self) -> Result<()> {
        if self.slot.remove()? {
            tracing::debug!(path = %self.slot.path().display(), "search history cleared");
        }
        Ok(())
    }

    async fn make_thumbnail(&self, image: &PlantImage) -> String {
        let data_url = image.data_url().to_string();
        let max_dimension = self.settings.thumbnail_max_dimension;
        let quality = self.settings.thumbnail_quality;
        let fallback = data_url.clone();

        tokio::task::spawn_blocking(move || thumbnail::create_thumbnail(&data_url, max_dimension, quality))
            .await
            .unwrap_or_else(|e| {
                tracing::warn!(error = %e, "thumbnail task failed");
                fallback
            })
    }
}

fn sort_newest_first(items: &mut [HistoryItem]) {
    // 安定ソートなので同時刻は既存の並びを保つ
    items.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
}

/// リストに新しいアイテムを入れ、追加したアイテムを返す
fn insert_item(items: &mut Vec<HistoryItem>, mut item: HistoryItem, settings: &HistorySettings) -> HistoryItem {
    sort_newest_first(items);

    // 時計が戻っても先頭が最新になるようにする
    if let Some(newest) = items.first() {
        item.timestamp = item.timestamp.max(newest.timestamp);
    }

    let window = settings.dedup_window.min(items.len());
    if let Some(index) = items[..window]
        .iter()
        .position(|h| h.is_same_search(&item.plant_name, item.search_type))
    {
        items.remove(index);
    }

    items.insert(0, item.clone());
    items.truncate(settings.max_items);
    item
}
