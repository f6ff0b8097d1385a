//! 履歴ファイル（単一スロット）
//!
//! `{ "version": 1, "items": [...] }` 形式のJSONファイル1つに履歴を保存する。
//! 読み書きはすべて `update` を通し、シリアライズの失敗をここで一括して扱う。

use super::HistoryItem;
use crate::error::{PlantExplorerError, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

/// 履歴ファイルの構造
#[derive(Debug, Clone, Serialize, Deserialize)]
struct SlotFile {
    /// バージョン（互換性チェック用）
    version: u32,
    items: Vec<HistoryItem>,
}

impl SlotFile {
    const CURRENT_VERSION: u32 = 1;
}

#[derive(Debug, Clone)]
pub struct HistorySlot {
    path: PathBuf,
}

impl HistorySlot {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 履歴を読み込む
    ///
    /// ファイルなし・破損・バージョン不一致は空の履歴として扱う。
    pub fn read(&self) -> Vec<HistoryItem> {
        if !self.path.exists() {
            return Vec::new();
        }

        let file = match File::open(&self.path) {
            Ok(f) => f,
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "failed to open search history");
                return Vec::new();
            }
        };

        match serde_json::from_reader::<_, SlotFile>(BufReader::new(file)) {
            Ok(slot) if slot.version == SlotFile::CURRENT_VERSION => slot.items,
            Ok(slot) => {
                tracing::warn!(version = slot.version, "search history version mismatch, starting fresh");
                Vec::new()
            }
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "search history is corrupted, starting fresh");
                Vec::new()
            }
        }
    }

    /// 読み込み→変更→保存をまとめて行う
    ///
    /// 保存に失敗した場合もクロージャの戻り値は失われないよう、
    /// エラーと一緒に返す。
    pub fn update<T>(
        &self,
        mutate: impl FnOnce(&mut Vec<HistoryItem>) -> T,
    ) -> std::result::Result<T, (T, PlantExplorerError)> {
        let mut items = self.read();
        let output = mutate(&mut items);
        match self.write(&items) {
            Ok(()) => Ok(output),
            Err(e) => Err((output, e)),
        }
    }

    /// スロットを削除（存在しなければ false）
    pub fn remove(&self) -> Result<bool> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    fn write(&self, items: &[HistoryItem]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let slot = SlotFile {
            version: SlotFile::CURRENT_VERSION,
            items: items.to_vec(),
        };

        // 途中で落ちても元のファイルを壊さないよう一時ファイル経由で置き換える
        let tmp_path = self.path.with_extension("json.tmp");
        {
            let mut writer = BufWriter::new(File::create(&tmp_path)?);
            serde_json::to_writer(&mut writer, &slot)
                .map_err(|e| PlantExplorerError::Storage(e.to_string()))?;
            writer.flush()?;
        }
        std::fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }
}
