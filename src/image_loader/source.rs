//! # 数据源与中间模型
//!
//! ## 设计思路
//!
//! 将“外部输入类型”和“流水线中间结果”解耦：
//! - `ImageSource` 表示外部来源语义
//! - `RawImageData` 表示已加载但未解码的字节
//! - `PixelImage` 表示 RGBA 像素（解码产物与采样产物共用同一类型）
//!
//! 像素缓冲只有一种所有权形态（`Vec<u8>`），释放方式因此不会错配。

use std::path::PathBuf;

use super::ImageError;

/// 每个像素的字节数（RGBA）。
pub const BYTES_PER_PIXEL: usize = 4;

/// 图片输入来源。
#[derive(Debug, Clone)]
pub enum ImageSource {
    /// 内存中的编码字节。
    Bytes(Vec<u8>),
    /// 本地文件路径来源。
    FilePath(PathBuf),
}

/// 加载阶段输出：原始字节与来源标识。
pub(crate) struct RawImageData {
    /// 原始图片字节。
    pub(crate) bytes: Vec<u8>,
    /// 来源提示（用于日志与诊断）。
    pub(crate) source_hint: &'static str,
}

/// RGBA 像素图。
///
/// 不变式：`width >= 1`、`height >= 1` 且 `pixels.len() == width * height * 4`，
/// 行优先、自上而下。构造后不可变。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelImage {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

/// 解码产物，交给采样器的输入。
pub type SourceImage = PixelImage;

/// 采样产物，所有权完全移交给调用方。
pub type ResultImage = PixelImage;

impl PixelImage {
    /// 校验不变式后构建像素图。
    ///
    /// # 示例
    /// ```rust
    /// use imageloader::image_loader::PixelImage;
    ///
    /// let image = PixelImage::new(1, 1, vec![255, 0, 0, 255]).unwrap();
    /// assert_eq!(image.pixel(0, 0), [255, 0, 0, 255]);
    /// ```
    pub fn new(width: u32, height: u32, pixels: Vec<u8>) -> Result<Self, ImageError> {
        let expected = rgba_len(width, height)?;
        if pixels.len() != expected {
            return Err(ImageError::InvalidDimensions { width, height });
        }

        Ok(Self { width, height, pixels })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// 交出像素缓冲的所有权。
    pub fn into_pixels(self) -> Vec<u8> {
        self.pixels
    }

    /// 读取 `(x, y)` 处的 RGBA 四元组。
    ///
    /// 越界坐标会 panic，与切片索引一致。
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let offset = (y as usize * self.width as usize + x as usize) * BYTES_PER_PIXEL;
        let mut quad = [0u8; 4];
        quad.copy_from_slice(&self.pixels[offset..offset + BYTES_PER_PIXEL]);
        quad
    }

    /// 像素缓冲字节数，用于缓存权重。
    pub fn byte_len(&self) -> usize {
        self.pixels.len()
    }
}

/// 计算 `width * height * 4`，几何为 0 或溢出时返回错误。
pub(crate) fn rgba_len(width: u32, height: u32) -> Result<usize, ImageError> {
    if width == 0 || height == 0 {
        return Err(ImageError::InvalidDimensions { width, height });
    }

    (width as usize)
        .checked_mul(height as usize)
        .and_then(|pixels| pixels.checked_mul(BYTES_PER_PIXEL))
        .ok_or_else(|| ImageError::ResourceLimit("图片尺寸导致内存溢出风险".to_string()))
}
