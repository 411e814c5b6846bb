//! # imageloader — 原生图片解码库
//!
//! ## 架构总览
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │              JVM (Kotlin, cpp.test.ImageLoader)           │
//! │                                                          │
//! │  MainActivity ── ImageGrid ── BitmapCache                │
//! │       │  System.loadLibrary("imageloader")               │
//! └───────┼──────────────────────────────────────────────────┘
//!         ↕ JNI (ByteArray? = [width][height][RGBA...])
//! ┌───────┼──────────────────────────────────────────────────┐
//! │       ↕            原生层 (Rust)                          │
//! │                                                          │
//! │  ┌─ bridge ───── JNI 导出函数（失败返回 null）             │
//! │  │                                                       │
//! │  ├─ error ────── BridgeError (统一错误类型)               │
//! │  │                                                       │
//! │  └─ image_loader      加载·解码·采样·打包                 │
//! │      ├─ sampler        最近邻抽样 / 高质量缩放            │
//! │      └─ cache          文件结果 LRU 缓存                  │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! ## 模块职责
//!
//! | 模块 | 职责 |
//! |------|------|
//! | [`bridge`] | `Java_cpp_test_ImageLoader_*` 导出函数、进程级加载器 |
//! | [`error`] | 桥接层统一错误类型 `BridgeError` |
//! | [`image_loader`] | 从内存字节或文件解码图片，采样并打包为传输缓冲 |

pub mod bridge;
pub mod error;
pub mod image_loader;
