//! # 图片加载模块（image_loader）
//!
//! ## 设计思路
//!
//! 该模块将“来源加载 → 解码 → 采样 → 打包”按职责拆分为多个子模块，避免单文件膨胀与耦合。
//!
//! - `handler`：编排整条处理流水线（`ImageLoader`）
//! - `loader`：负责内存字节 / 文件加载与签名、体积校验
//! - `pipeline`：负责解码、像素限制、翻转与 RGBA 转换
//! - `sampler`：最近邻抽样与高质量缩放（`ImageSampler`）
//! - `transport`：跨边界传输缓冲的打包与解析
//! - `cache`：文件来源结果的 LRU 缓存
//! - `config/error/source`：配置、错误、数据模型
//!
//! ## 新同事快速上手
//!
//! ```text
//! JVM 调用
//!    ↓
//! bridge.rs（JNI 参数适配，失败统一返回 null）
//!    ↓
//! handler.rs（统一编排 + 阶段耗时日志）
//!    ├─ loader.rs（来源加载 + 体积/签名校验）
//!    ├─ pipeline.rs（解码 + 像素限制 + RGBA）
//!    ├─ sampler.rs（抽样 / 缩放）
//!    └─ transport.rs（8 字节头 + 像素）
//! ```

mod cache;
mod config;
mod error;
mod handler;
mod loader;
mod pipeline;
mod sampler;
mod source;
pub mod transport;

pub use cache::CacheStats;
pub use config::{DEFAULT_CACHE_BUDGET_BYTES, DecodeConfig, ResizeQuality};
pub use error::ImageError;
pub use handler::ImageLoader;
pub use sampler::{ImageSampler, SampleRequest, fit_within};
pub use source::{BYTES_PER_PIXEL, ImageSource, PixelImage, ResultImage, SourceImage};
