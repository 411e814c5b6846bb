//! # 错误模型模块
//!
//! ## 设计思路
//!
//! 使用单一错误枚举承载解码链路中的所有错误来源，避免字符串拼接式错误处理。
//! 通过 `thiserror` 保持人类可读错误，同时让调用侧可按分支匹配：
//! 解码失败、几何非法、内存分配失败三类必须能被明确区分。

/// 图片解码 / 采样统一错误类型。
///
/// 该类型会在桥接层被上转为 `BridgeError`，最终以 `null` 返回给 JVM。
#[derive(Debug, thiserror::Error)]
pub enum ImageError {
    #[error("解码错误：{0}")]
    Decode(String),

    #[error("格式错误：{0}")]
    InvalidFormat(String),

    #[error("图片尺寸非法：{width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },

    #[error("内存分配失败：需要 {bytes} 字节")]
    AllocationFailure { bytes: usize },

    #[error("缩放错误：{0}")]
    Resize(String),

    #[error("文件错误：{0}")]
    FileSystem(String),

    #[error("资源限制：{0}")]
    ResourceLimit(String),
}

