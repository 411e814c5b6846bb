//! # 采样器模块
//!
//! ## 设计思路
//!
//! `ImageSampler` 是整条链路中唯一承载算法语义的部分：
//! - `PassThrough`：原样返回（直接移交所有权，不复制）
//! - `UniformFactor(n)`：最近邻抽样，逐字节复制 RGBA 四元组，不做任何插值
//! - `ExplicitTarget`：交给 `fast_image_resize` 做卷积缩放，输出严格等于目标尺寸
//! - `FitWithin`：先按比例计算目标尺寸，再走 `ExplicitTarget`
//!
//! ## 实现思路
//!
//! 输出缓冲统一经 `allocate` 获取：先按 `max_output_bytes` 预算判断，
//! 再用 `try_reserve_exact` 申请，失败立即返回 `AllocationFailure`，不重试、不返回半成品。
//! 采样器本身不打日志、不做 I/O，可在多线程中对独立输入并发调用。

use fast_image_resize as fr;

use super::source::{BYTES_PER_PIXEL, ResultImage, SourceImage, rgba_len};
use super::{DecodeConfig, ImageError, ResizeQuality};

/// 采样请求。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SampleRequest {
    /// 不做任何变化。
    PassThrough,
    /// 最近邻等比抽样，`n == 1` 等价于 `PassThrough`。
    UniformFactor(u32),
    /// 高质量缩放到精确尺寸（忽略原始宽高比）。
    ExplicitTarget { width: u32, height: u32 },
    /// 高质量缩放到边界内的最大尺寸，保持宽高比且不放大。
    FitWithin { max_width: u32, max_height: u32 },
}

impl SampleRequest {
    /// 将 JNI 入参映射为采样请求。
    ///
    /// 规则与 JVM 侧约定一致：宽高都为正时按精确尺寸缩放；
    /// 否则 `sample_size > 1` 时按倍率抽样；其余情况原样返回。
    ///
    /// # 示例
    /// ```rust
    /// use imageloader::image_loader::SampleRequest;
    ///
    /// assert_eq!(SampleRequest::from_jni_args(4, 0, 0), SampleRequest::UniformFactor(4));
    /// assert_eq!(
    ///     SampleRequest::from_jni_args(4, 320, 240),
    ///     SampleRequest::ExplicitTarget { width: 320, height: 240 }
    /// );
    /// assert_eq!(SampleRequest::from_jni_args(1, -1, 0), SampleRequest::PassThrough);
    /// ```
    pub fn from_jni_args(sample_size: i32, req_width: i32, req_height: i32) -> Self {
        if req_width > 0 && req_height > 0 {
            Self::ExplicitTarget {
                width: req_width as u32,
                height: req_height as u32,
            }
        } else if sample_size > 1 {
            Self::UniformFactor(sample_size as u32)
        } else {
            Self::PassThrough
        }
    }
}

/// 计算保持宽高比、落在 `max_width x max_height` 内的目标尺寸。
///
/// 不放大；任一边界为 0 时按 1 处理；结果每边至少为 1。
pub fn fit_within(width: u32, height: u32, max_width: u32, max_height: u32) -> (u32, u32) {
    let max_width = max_width.max(1);
    let max_height = max_height.max(1);
    let width = width.max(1);
    let height = height.max(1);

    if width <= max_width && height <= max_height {
        return (width, height);
    }

    let scale = (max_width as f64 / width as f64).min(max_height as f64 / height as f64);
    let target_width = ((width as f64 * scale).floor() as u32).clamp(1, max_width);
    let target_height = ((height as f64 * scale).floor() as u32).clamp(1, max_height);

    (target_width, target_height)
}

/// RGBA 采样器。
///
/// 只持有不可变配置，可跨线程共享。
#[derive(Debug, Clone)]
pub struct ImageSampler {
    quality: ResizeQuality,
    max_output_bytes: u64,
}

impl ImageSampler {
    pub fn new(quality: ResizeQuality, max_output_bytes: u64) -> Self {
        Self {
            quality,
            max_output_bytes,
        }
    }

    pub fn from_config(config: &DecodeConfig) -> Self {
        Self::new(config.resize_quality, config.max_output_bytes)
    }

    /// 按请求对源图采样。
    ///
    /// # 示例
    /// ```rust
    /// use imageloader::image_loader::{ImageSampler, PixelImage, ResizeQuality, SampleRequest};
    ///
    /// let sampler = ImageSampler::new(ResizeQuality::Balanced, 1024 * 1024);
    /// let source = PixelImage::new(4, 4, vec![7u8; 64]).unwrap();
    /// let result = sampler.resample(source, SampleRequest::UniformFactor(2)).unwrap();
    /// assert_eq!((result.width(), result.height()), (2, 2));
    /// ```
    pub fn resample(
        &self,
        source: SourceImage,
        request: SampleRequest,
    ) -> Result<ResultImage, ImageError> {
        match request {
            SampleRequest::PassThrough | SampleRequest::UniformFactor(1) => Ok(source),
            SampleRequest::UniformFactor(0) => Err(ImageError::InvalidFormat(
                "采样倍率必须为正整数".to_string(),
            )),
            SampleRequest::UniformFactor(factor) => self.decimate(&source, factor),
            SampleRequest::ExplicitTarget { width, height } => {
                self.resize_exact(source, width.max(1), height.max(1))
            }
            SampleRequest::FitWithin {
                max_width,
                max_height,
            } => {
                let (width, height) =
                    fit_within(source.width(), source.height(), max_width, max_height);
                self.resize_exact(source, width, height)
            }
        }
    }

    /// 最近邻抽样：目标 `(x, y)` 取源 `(min(x*n, w-1), min(y*n, h-1))`。
    fn decimate(&self, source: &SourceImage, factor: u32) -> Result<ResultImage, ImageError> {
        let (src_width, src_height) = (source.width(), source.height());
        let target_width = (src_width / factor).max(1);
        let target_height = (src_height / factor).max(1);

        let mut pixels = self.allocate(target_width, target_height)?;
        let src = source.pixels();
        let src_stride = src_width as usize * BYTES_PER_PIXEL;
        let dst_stride = target_width as usize * BYTES_PER_PIXEL;

        for (y, dst_row) in pixels.chunks_exact_mut(dst_stride).enumerate() {
            let src_y = (y as u64 * factor as u64).min(src_height as u64 - 1) as usize;
            let src_row = &src[src_y * src_stride..(src_y + 1) * src_stride];

            for (x, dst_px) in dst_row.chunks_exact_mut(BYTES_PER_PIXEL).enumerate() {
                let src_x = (x as u64 * factor as u64).min(src_width as u64 - 1) as usize;
                let offset = src_x * BYTES_PER_PIXEL;
                dst_px.copy_from_slice(&src_row[offset..offset + BYTES_PER_PIXEL]);
            }
        }

        ResultImage::new(target_width, target_height, pixels)
    }

    fn resize_exact(
        &self,
        source: SourceImage,
        target_width: u32,
        target_height: u32,
    ) -> Result<ResultImage, ImageError> {
        let (src_width, src_height) = (source.width(), source.height());
        if (src_width, src_height) == (target_width, target_height) {
            return Ok(source);
        }

        let dst_buffer = self.allocate(target_width, target_height)?;

        let src_image = fr::images::Image::from_vec_u8(
            src_width,
            src_height,
            source.into_pixels(),
            fr::PixelType::U8x4,
        )
        .map_err(|e| ImageError::Resize(format!("构建源图像缓冲失败：{}", e)))?;

        let mut dst_image = fr::images::Image::from_vec_u8(
            target_width,
            target_height,
            dst_buffer,
            fr::PixelType::U8x4,
        )
        .map_err(|e| ImageError::Resize(format!("构建目标图像缓冲失败：{}", e)))?;

        let mut resizer = fr::Resizer::new();
        let options = fr::ResizeOptions::new()
            .resize_alg(fr::ResizeAlg::Convolution(self.quality.filter()));

        resizer
            .resize(&src_image, &mut dst_image, Some(&options))
            .map_err(|e| ImageError::Resize(format!("fast_image_resize 执行失败：{}", e)))?;

        ResultImage::new(target_width, target_height, dst_image.into_vec())
    }

    /// 申请 `width * height * 4` 字节的输出缓冲。
    fn allocate(&self, width: u32, height: u32) -> Result<Vec<u8>, ImageError> {
        let len = rgba_len(width, height)?;
        if len as u64 > self.max_output_bytes {
            return Err(ImageError::AllocationFailure { bytes: len });
        }

        let mut buffer = Vec::new();
        buffer
            .try_reserve_exact(len)
            .map_err(|_| ImageError::AllocationFailure { bytes: len })?;
        buffer.resize(len, 0);
        Ok(buffer)
    }
}
