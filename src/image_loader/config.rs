//! # 配置模块
//!
//! ## 设计思路
//!
//! 将所有“可调策略”集中到 `DecodeConfig`，作为显式值传入 `ImageLoader`。
//! 旧实现中“初始化时设置全局翻转开关”的做法，在这里变成配置字段 `flip_vertically`，
//! 进程内只在初始化时写入一次，之后只读。
//!
//! ## 实现思路
//!
//! - `Default` 提供生产可用的平衡配置。
//! - 通过 `serde` 支持从 JSON 构建配置（JVM 侧 `nativeInitWithConfig`），缺省字段回落到默认值。
//! - `ResizeQuality` 是面向调用方的高层语义，映射到 `fast_image_resize` 的卷积滤镜。
//! - `validate` 在构建 `ImageLoader` 时统一校验，避免非法阈值流入流水线。

use fast_image_resize as fr;
use serde::{Deserialize, Serialize};

use super::ImageError;

/// 默认缓存预算：按 512MB 堆的 1/8 估算。
pub const DEFAULT_CACHE_BUDGET_BYTES: u64 = 512 * 1024 * 1024 / 8;

/// 解码与采样配置。
///
/// 字段覆盖了读取、解码、采样输出与缓存四个阶段。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecodeConfig {
    /// 解码后是否上下翻转（默认关闭，保持自上而下的行序）。
    pub flip_vertically: bool,
    /// 读取文件时允许的最大体积（字节）。
    pub max_file_size: u64,
    /// 解码后的像素上限（`width * height`）。
    pub max_decoded_pixels: u64,
    /// 解码阶段允许的预计内存上限（按 RGBA 估算，字节）。
    pub max_decoded_bytes: u64,
    /// 采样输出缓冲允许的最大字节数，超出即视为分配失败。
    pub max_output_bytes: u64,
    /// 显式目标尺寸缩放时使用的质量档位。
    pub resize_quality: ResizeQuality,
    /// 文件来源结果缓存的字节预算，`0` 表示关闭缓存。
    pub cache_budget_bytes: u64,
}

impl Default for DecodeConfig {
    fn default() -> Self {
        Self {
            flip_vertically: false,
            max_file_size: 50 * 1024 * 1024,
            max_decoded_pixels: 40_000_000,
            max_decoded_bytes: 160 * 1024 * 1024,
            max_output_bytes: 160 * 1024 * 1024,
            resize_quality: ResizeQuality::Balanced,
            cache_budget_bytes: DEFAULT_CACHE_BUDGET_BYTES,
        }
    }
}

/// 缩放质量档位。
///
/// - `Speed`：盒式滤镜，速度优先
/// - `Balanced`：双线性（三角）滤镜，质量与性能平衡
/// - `Quality`：Catmull-Rom，尽量保真
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResizeQuality {
    Speed,
    #[default]
    Balanced,
    Quality,
}

impl ResizeQuality {
    /// 输出稳定字符串，供日志使用。
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Speed => "speed",
            Self::Balanced => "balanced",
            Self::Quality => "quality",
        }
    }

    pub(crate) fn filter(self) -> fr::FilterType {
        match self {
            Self::Speed => fr::FilterType::Box,
            Self::Balanced => fr::FilterType::Bilinear,
            Self::Quality => fr::FilterType::CatmullRom,
        }
    }
}

impl DecodeConfig {
    /// 从 JSON 文本解析配置，缺省字段使用默认值。
    ///
    /// # 示例
    /// ```rust
    /// use imageloader::image_loader::DecodeConfig;
    ///
    /// let config = DecodeConfig::from_json(r#"{ "flip_vertically": true }"#).unwrap();
    /// assert!(config.flip_vertically);
    /// ```
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// 校验阈值合法性。
    pub fn validate(&self) -> Result<(), ImageError> {
        let limits = [
            ("max_file_size", self.max_file_size),
            ("max_decoded_pixels", self.max_decoded_pixels),
            ("max_decoded_bytes", self.max_decoded_bytes),
            ("max_output_bytes", self.max_output_bytes),
        ];

        for (name, value) in limits {
            if value == 0 {
                return Err(ImageError::InvalidFormat(format!("{} 不能为 0", name)));
            }
        }

        Ok(())
    }
}
