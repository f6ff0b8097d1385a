//! エラー型定義
//!
//! - Error: パーサー等の共通エラー
//! - GatewayError: AIゲートウェイ呼び出しの失敗（呼び出し元へは常に値として返す）

use thiserror::Error;

/// 共通エラー型
#[derive(Error, Debug)]
pub enum Error {
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Invalid data URL: {0}")]
    DataUrl(String),
}

/// Result型エイリアス
pub type Result<T> = std::result::Result<T, Error>;

/// AIゲートウェイの失敗理由
///
/// 表示用メッセージはそのままユーザーに見せる前提で組み立てる。
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GatewayError {
    /// APIキー未設定（ネットワーク呼び出し前に打ち切る）
    #[error("API Key not configured.")]
    MissingCredential,

    /// 通信・サービス側の失敗
    #[error("{0}")]
    Transport(String),

    /// レスポンスが想定した構造になっていない
    #[error("{0}")]
    Parse(String),

    /// 画像から植物を特定できなかった（"Unknown" 応答や空応答）
    #[error("{0}")]
    Unidentified(String),
}
