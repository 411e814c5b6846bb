//! # 传输缓冲编解码
//!
//! 跨 JNI 边界返回的扁平字节布局：
//!
//! ```text
//! [0, 4)          width  (i32, little-endian)
//! [4, 8)          height (i32, little-endian)
//! [8, 8 + w*h*4)  RGBA 像素，行优先
//! ```
//!
//! JVM 侧按小端读取头部（Android 目标平台均为小端），这里固定小端而不是跟随主机字节序。

use bytes::{Buf, BufMut};

use super::source::{ResultImage, rgba_len};
use super::ImageError;

/// 头部字节数（宽 + 高）。
pub const HEADER_LEN: usize = 8;

/// 将结果图打包为传输缓冲。
pub fn pack(image: &ResultImage) -> Result<Vec<u8>, ImageError> {
    let width = header_value(image.width())?;
    let height = header_value(image.height())?;
    let total = HEADER_LEN + image.byte_len();

    let mut buffer = Vec::new();
    buffer
        .try_reserve_exact(total)
        .map_err(|_| ImageError::AllocationFailure { bytes: total })?;

    buffer.put_i32_le(width);
    buffer.put_i32_le(height);
    buffer.put_slice(image.pixels());

    Ok(buffer)
}

/// 解析传输缓冲。
pub fn unpack(mut buffer: &[u8]) -> Result<ResultImage, ImageError> {
    if buffer.len() < HEADER_LEN {
        return Err(ImageError::InvalidFormat(format!(
            "传输缓冲过短：{} 字节",
            buffer.len()
        )));
    }

    let width = buffer.get_i32_le();
    let height = buffer.get_i32_le();
    if width <= 0 || height <= 0 {
        return Err(ImageError::InvalidDimensions {
            width: width.max(0) as u32,
            height: height.max(0) as u32,
        });
    }

    let (width, height) = (width as u32, height as u32);
    let expected = rgba_len(width, height)?;
    if buffer.len() != expected {
        return Err(ImageError::InvalidFormat(format!(
            "像素区长度不符：期望 {} 字节，实际 {} 字节",
            expected,
            buffer.len()
        )));
    }

    ResultImage::new(width, height, buffer.to_vec())
}

fn header_value(value: u32) -> Result<i32, ImageError> {
    i32::try_from(value)
        .map_err(|_| ImageError::ResourceLimit(format!("尺寸超出 i32 范围：{}", value)))
}
