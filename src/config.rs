use crate::error::{PlantExplorerError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// APIキーを読む環境変数（先に見つかったものを使う）
const API_KEY_ENV_VARS: &[&str] = &["GEMINI_API_KEY", "API_KEY"];

const APP_DIR_NAME: &str = "plant-explorer";
const HISTORY_FILE_NAME: &str = "search_history.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api_key: Option<String>,
    pub model: String,
    pub api_base: String,
    pub timeout_seconds: u64,
    /// 植物特定直後に情報・健康診断を先読みする
    pub preload: bool,
    /// 履歴ファイルの保存先（省略時はデータディレクトリ）
    pub history_path: Option<PathBuf>,
    pub history: HistorySettings,
}

/// 検索履歴の設定
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistorySettings {
    /// 保持する最大件数
    pub max_items: usize,
    /// 重複判定の対象にする直近件数
    pub dedup_window: usize,
    /// サムネイルの長辺(px)
    pub thumbnail_max_dimension: u32,
    /// サムネイルのJPEG品質 (1-100)
    pub thumbnail_quality: u8,
}

impl Default for HistorySettings {
    fn default() -> Self {
        Self {
            max_items: 50,
            dedup_window: 5,
            thumbnail_max_dimension: 100,
            thumbnail_quality: 70,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: None,
            model: "gemini-2.5-flash".into(),
            api_base: "https://generativelanguage.googleapis.com/v1beta".into(),
            timeout_seconds: 60,
            preload: true,
            history_path: None,
            history: HistorySettings::default(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(config_path: &Path) -> Result<Self> {
        if config_path.exists() {
            let content = std::fs::read_to_string(config_path)?;
            let config: Config = serde_json::from_str(&content)?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(config_path, content)?;
        Ok(())
    }

    pub fn config_path() -> Result<PathBuf> {
        let home = dirs::home_dir()
            .ok_or_else(|| PlantExplorerError::Config("ホームディレクトリが見つかりません".into()))?;
        Ok(home.join(".config").join(APP_DIR_NAME).join("config.json"))
    }

    /// 履歴ファイルのパス
    pub fn history_file(&self) -> Result<PathBuf> {
        if let Some(path) = &self.history_path {
            return Ok(path.clone());
        }
        let data_dir = dirs::data_dir()
            .ok_or_else(|| PlantExplorerError::Config("データディレクトリが見つかりません".into()))?;
        Ok(data_dir.join(APP_DIR_NAME).join(HISTORY_FILE_NAME))
    }

    /// APIキー（環境変数を優先）
    pub fn resolve_api_key(&self) -> Option<String> {
        API_KEY_ENV_VARS
            .iter()
            .filter_map(|name| std::env::var(name).ok())
            .chain(self.api_key.clone())
            .map(|key| key.trim().to_string())
            .find(|key| !key.is_empty())
    }

    pub fn set_api_key(&mut self, key: String) -> Result<()> {
        self.api_key = Some(key);
        self.save()
    }
}
