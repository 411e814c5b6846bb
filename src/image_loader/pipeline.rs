//! # 解码流水线模块
//!
//! ## 设计思路
//!
//! 将“字节 → 图像 → RGBA”的过程集中管理，并在关键节点增加资源上限控制。
//! 优先做尺寸检查，再进行完整解码，降低恶意输入触发高内存开销的风险。
//!
//! ## 实现思路
//!
//! 1. 猜测格式并读取 header 尺寸
//! 2. 按像素上限与内存上限快速拒绝
//! 3. 完整解码（多帧格式只取第一帧）
//! 4. 按配置决定是否上下翻转
//! 5. 统一转换为 4 通道 RGBA，并校验字节长度一致性

use image::{DynamicImage, GenericImageView, ImageReader};
use std::io::Cursor;

use super::source::{RawImageData, SourceImage, rgba_len};
use super::{DecodeConfig, ImageError};

/// 将原始字节解码为 RGBA 源图。
pub(crate) fn decode_rgba(raw: RawImageData, config: &DecodeConfig) -> Result<SourceImage, ImageError> {
    image::guess_format(&raw.bytes)
        .map_err(|e| ImageError::InvalidFormat(format!("不支持的图片格式：{}", e)))?;

    let (header_width, header_height) = inspect_dimensions_from_memory(&raw.bytes)?;
    validate_pixel_limits(config, header_width, header_height)?;
    validate_decoded_memory_limits(config, header_width, header_height)?;

    let decoded = image::load_from_memory(&raw.bytes)
        .map_err(|e| ImageError::Decode(format!("图片解码失败：{}", e)))?;

    let (width, height) = decoded.dimensions();
    validate_pixel_limits(config, width, height)?;
    validate_decoded_memory_limits(config, width, height)?;

    let oriented = if config.flip_vertically {
        decoded.flipv()
    } else {
        decoded
    };

    let source = into_source_image(oriented)?;

    log::debug!(
        "图片解码成功 - 来源: {} 尺寸: {}x{}",
        raw.source_hint,
        source.width(),
        source.height()
    );

    Ok(source)
}

fn into_source_image(image: DynamicImage) -> Result<SourceImage, ImageError> {
    let (width, height) = image.dimensions();
    let bytes = image.into_rgba8().into_raw();

    let expected_len = rgba_len(width, height)?;
    if bytes.len() != expected_len {
        return Err(ImageError::Decode("解码后像素数据长度异常".to_string()));
    }

    SourceImage::new(width, height, bytes)
}

/// 仅通过内存中的图片头信息读取宽高。
///
/// 用于在完整解码前做像素限制检查。
fn inspect_dimensions_from_memory(bytes: &[u8]) -> Result<(u32, u32), ImageError> {
    let reader = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| ImageError::InvalidFormat(format!("无法识别图片格式：{}", e)))?;

    let (width, height) = reader
        .into_dimensions()
        .map_err(|e| ImageError::Decode(format!("无法读取图片尺寸：{}", e)))?;

    if width == 0 || height == 0 {
        return Err(ImageError::InvalidDimensions { width, height });
    }

    Ok((width, height))
}

/// 校验像素数量是否超过配置上限。
fn validate_pixel_limits(config: &DecodeConfig, width: u32, height: u32) -> Result<(), ImageError> {
    let pixels = (width as u64)
        .checked_mul(height as u64)
        .ok_or_else(|| ImageError::ResourceLimit("图片像素数溢出".to_string()))?;

    if pixels > config.max_decoded_pixels {
        return Err(ImageError::ResourceLimit(format!(
            "图片像素过大：{} 像素（限制：{} 像素）",
            pixels, config.max_decoded_pixels
        )));
    }

    Ok(())
}

fn validate_decoded_memory_limits(
    config: &DecodeConfig,
    width: u32,
    height: u32,
) -> Result<(), ImageError> {
    let estimated = (width as u64)
        .checked_mul(height as u64)
        .and_then(|pixels| pixels.checked_mul(4))
        .ok_or_else(|| ImageError::ResourceLimit("图片解码内存估算溢出".to_string()))?;

    if estimated > config.max_decoded_bytes {
        return Err(ImageError::ResourceLimit(format!(
            "图片解码预计内存过大：{:.2} MB（限制：{:.2} MB）",
            estimated as f64 / 1024.0 / 1024.0,
            config.max_decoded_bytes as f64 / 1024.0 / 1024.0
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, ImageBuffer, ImageFormat, Luma, Rgba};

    fn encode(image: DynamicImage, format: ImageFormat) -> Vec<u8> {
        let mut cursor = Cursor::new(Vec::new());
        image
            .write_to(&mut cursor, format)
            .expect("failed to encode test image");
        cursor.into_inner()
    }

    fn create_png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = ImageBuffer::from_fn(width, height, |x, y| {
            Rgba([(x % 255) as u8, (y % 255) as u8, ((x + y) % 255) as u8, 255])
        });
        encode(DynamicImage::ImageRgba8(img), ImageFormat::Png)
    }

    fn raw(bytes: Vec<u8>) -> RawImageData {
        RawImageData {
            bytes,
            source_hint: "test",
        }
    }

    #[test]
    fn decodes_png_into_rgba() {
        let source = decode_rgba(raw(create_png_bytes(7, 5)), &DecodeConfig::default())
            .expect("decode should succeed");

        assert_eq!((source.width(), source.height()), (7, 5));
        assert_eq!(source.byte_len(), 7 * 5 * 4);
        assert_eq!(source.pixel(3, 2), [3, 2, 5, 255]);
    }

    #[test]
    fn grayscale_input_is_expanded_to_four_channels() {
        let gray = ImageBuffer::from_fn(3, 2, |x, _| Luma([(x * 100) as u8]));
        let bytes = encode(DynamicImage::ImageLuma8(gray), ImageFormat::Png);

        let source = decode_rgba(raw(bytes), &DecodeConfig::default()).expect("decode");
        assert_eq!(source.pixel(2, 1), [200, 200, 200, 255]);
    }

    #[test]
    fn flip_vertically_reverses_row_order() {
        let config = DecodeConfig {
            flip_vertically: true,
            ..DecodeConfig::default()
        };

        let source = decode_rgba(raw(create_png_bytes(2, 3)), &config).expect("decode");
        assert_eq!(source.pixel(1, 0), [1, 2, 3, 255]);
        assert_eq!(source.pixel(1, 2), [1, 0, 1, 255]);
    }

    #[test]
    fn rejects_too_many_pixels_before_decoding() {
        let config = DecodeConfig {
            max_decoded_pixels: 1_000,
            ..DecodeConfig::default()
        };

        let result = decode_rgba(raw(create_png_bytes(40, 40)), &config);
        assert!(matches!(result, Err(ImageError::ResourceLimit(_))));
    }

    #[test]
    fn rejects_decoded_memory_over_budget() {
        let config = DecodeConfig {
            max_decoded_bytes: 1_024,
            ..DecodeConfig::default()
        };

        let result = decode_rgba(raw(create_png_bytes(20, 20)), &config);
        assert!(matches!(result, Err(ImageError::ResourceLimit(_))));
    }

    #[test]
    fn garbage_bytes_are_not_an_image() {
        let result = decode_rgba(raw(b"definitely not an image".to_vec()), &DecodeConfig::default());
        assert!(matches!(result, Err(ImageError::InvalidFormat(_))));
    }

    #[test]
    fn truncated_png_fails_to_decode() {
        let mut bytes = create_png_bytes(16, 16);
        bytes.truncate(bytes.len() / 2);

        let result = decode_rgba(raw(bytes), &DecodeConfig::default());
        assert!(matches!(result, Err(ImageError::Decode(_))));
    }
}
