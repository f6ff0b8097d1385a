//! サムネイル生成
//!
//! 長辺を上限サイズに収めるよう縮小し、JPEGで再エンコードしてData URLで返す。
//! デコードに失敗した場合は元の画像をそのまま返す（失敗させない）。

use base64::Engine;
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, GenericImageView};
use plant_explorer_common::data_url;

/// アスペクト比を保って長辺を `max_dimension` 以下にしたサイズ
///
/// 元画像が小さい場合は拡大しない。
pub fn fit_within(width: u32, height: u32, max_dimension: u32) -> (u32, u32) {
    let max_dimension = max_dimension.max(1);
    if width <= max_dimension && height <= max_dimension {
        return (width.max(1), height.max(1));
    }
    let scale = max_dimension as f64 / width.max(height) as f64;
    let new_width = ((width as f64 * scale).round() as u32).clamp(1, max_dimension);
    let new_height = ((height as f64 * scale).round() as u32).clamp(1, max_dimension);
    (new_width, new_height)
}

/// サムネイルのData URLを生成
pub fn create_thumbnail(image_data_url: &str, max_dimension: u32, quality: u8) -> String {
    match try_create_thumbnail(image_data_url, max_dimension, quality) {
        Ok(thumb) => thumb,
        Err(e) => {
            tracing::debug!(error = %e, "thumbnail generation failed, keeping original image");
            image_data_url.to_string()
        }
    }
}

fn try_create_thumbnail(image_data_url: &str, max_dimension: u32, quality: u8) -> anyhow::Result<String> {
    let bytes = base64::engine::general_purpose::STANDARD.decode(data_url::extract_base64(image_data_url))?;
    let img = image::load_from_memory(&bytes)?;

    let (width, height) = img.dimensions();
    let (new_width, new_height) = fit_within(width, height, max_dimension);
    let resized = if (new_width, new_height) == (width, height) {
        img
    } else {
        img.resize_exact(new_width, new_height, image::imageops::FilterType::Triangle)
    };

    // JPEGはアルファを持てないのでRGBに落とす
    let rgb = DynamicImage::ImageRgb8(resized.to_rgb8());
    let mut buffer = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut buffer, quality.clamp(1, 100));
    rgb.write_with_encoder(encoder)?;

    let encoded = base64::engine::general_purpose::STANDARD.encode(&buffer);
    Ok(data_url::build_data_url("image/jpeg", &encoded))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgba, RgbaImage};
    use std::io::Cursor;

    fn png_data_url(width: u32, height: u32) -> String {
        let img = RgbaImage::from_pixel(width, height, Rgba([30, 160, 60, 255]));
        let mut buffer = Vec::new();
        DynamicImage::ImageRgba8(img)
            .write_to(&mut Cursor::new(&mut buffer), ImageFormat::Png)
            .unwrap();
        data_url::build_data_url("image/png", &base64::engine::general_purpose::STANDARD.encode(&buffer))
    }

    fn decode_dimensions(data_url_str: &str) -> (u32, u32) {
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(data_url::extract_base64(data_url_str))
            .unwrap();
        image::load_from_memory(&bytes).unwrap().dimensions()
    }

    #[test]
    fn test_fit_within_landscape() {
        assert_eq!(fit_within(400, 200, 100), (100, 50));
    }

    #[test]
    fn test_fit_within_portrait() {
        assert_eq!(fit_within(300, 600, 100), (50, 100));
    }

    #[test]
    fn test_fit_within_small_image_not_upscaled() {
        assert_eq!(fit_within(40, 20, 100), (40, 20));
    }

    #[test]
    fn test_fit_within_extreme_ratio_keeps_one_pixel() {
        assert_eq!(fit_within(10_000, 10, 100), (100, 1));
    }

    #[test]
    fn test_create_thumbnail_downscales_to_jpeg() {
        let original = png_data_url(320, 160);
        let thumb = create_thumbnail(&original, 100, 70);
        assert!(thumb.starts_with("data:image/jpeg;base64,"));
        assert_eq!(decode_dimensions(&thumb), (100, 50));
    }

    #[test]
    fn test_create_thumbnail_invalid_image_returns_original() {
        let broken = "data:image/jpeg;base64,bm90IGFuIGltYWdl";
        assert_eq!(create_thumbnail(broken, 100, 70), broken);
    }
}
