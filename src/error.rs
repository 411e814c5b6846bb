//! 统一错误类型模块
//!
//! # 设计思路
//!
//! JNI 导出函数内部统一返回 `Result<T, BridgeError>`，在边界处记录日志并转换为 `null`，
//! 任何错误或 panic 都不会以异常形式穿过边界。
//!
//! # 实现思路
//!
//! - 使用 `thiserror` 派生可读错误消息。
//! - 为 `ImageError`、JNI 错误与配置解析错误提供 `From` 转换，无需手动 map。

use crate::image_loader::ImageError;

/// 桥接层统一错误类型
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    /// 图片处理流水线错误（加载 / 解码 / 采样 / 打包）
    #[error("{0}")]
    Image(#[from] ImageError),

    /// JNI 调用失败（取数组、分配结果数组等）
    #[error("JNI 调用失败: {0}")]
    Jni(#[from] jni::errors::Error),

    /// 初始化配置无法解析
    #[error("配置解析失败: {0}")]
    Config(#[from] serde_json::Error),

    /// JVM 传入了 null
    #[error("参数为空: {0}")]
    NullArgument(&'static str),

    /// 进程级加载器已初始化，配置只允许写入一次
    #[error("加载器已初始化，忽略新的配置")]
    AlreadyInitialized,
}
