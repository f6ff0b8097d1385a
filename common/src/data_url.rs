//! Data URL ユーティリティ
//!
//! "data:image/jpeg;base64,/9j/4AAQ..." 形式の文字列を扱う。

use crate::error::{Error, Result};

/// MIMEタイプが取れない場合の既定値
pub const DEFAULT_IMAGE_MIME: &str = "image/jpeg";

/// Data URLからBase64データ部分を抽出
///
/// プレフィックスがない場合は文字列全体をBase64とみなす。
pub fn extract_base64(data_url: &str) -> &str {
    if data_url.starts_with("data:") {
        data_url.split_once(',').map(|(_, data)| data).unwrap_or("")
    } else {
        data_url
    }
}

/// Data URLからMIMEタイプを抽出
pub fn extract_mime_type(data_url: &str) -> &str {
    data_url
        .strip_prefix("data:")
        .and_then(|rest| rest.split([';', ',']).next())
        .filter(|mime| !mime.is_empty())
        .unwrap_or(DEFAULT_IMAGE_MIME)
}

/// Base64データからData URLを組み立てる
pub fn build_data_url(mime_type: &str, base64_data: &str) -> String {
    format!("data:{};base64,{}", mime_type, base64_data)
}

/// 画像のData URLとして妥当か確認
pub fn validate_image_data_url(data_url: &str) -> Result<()> {
    if !data_url.starts_with("data:image/") {
        return Err(Error::DataUrl("画像のData URLではありません".into()));
    }
    if extract_base64(data_url).is_empty() {
        return Err(Error::DataUrl("データ部分が空です".into()));
    }
    Ok(())
}
