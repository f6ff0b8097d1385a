use thiserror::Error;

#[derive(Error, Debug)]
pub enum PlantExplorerError {
    #[error("設定エラー: {0}")]
    Config(String),

    #[error("APIキーが設定されていません。`plant-explorer config --set-api-key YOUR_KEY` か GEMINI_API_KEY で設定してください")]
    MissingApiKey,

    #[error("ファイルが見つかりません: {0}")]
    FileNotFound(String),

    #[error("対応していない画像形式です: {0}")]
    UnsupportedImage(String),

    #[error("画像読み込みエラー: {0}")]
    ImageLoad(String),

    #[error("履歴の保存に失敗: {0}")]
    Storage(String),

    #[error("JSON解析エラー: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("IOエラー: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTPクライアントの初期化に失敗: {0}")]
    HttpClient(String),
}

pub type Result<T> = std::result::Result<T, PlantExplorerError>;
