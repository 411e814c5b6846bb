//! # 加载模块
//!
//! ## 设计思路
//!
//! 负责把 `ImageSource` 统一转换为 `RawImageData`，并在解码前完成廉价的安全校验：
//! - 文件体积上限（先读元数据，再读内容）
//! - 文件签名（magic bytes）必须是图片类型
//!
//! 解码本身交给 `pipeline`，这里不触碰像素。

use std::path::Path;

use super::cache::FileStamp;
use super::source::RawImageData;
use super::{DecodeConfig, ImageError, ImageSource};

/// 按来源加载原始字节。
pub(crate) fn load_source(source: ImageSource, config: &DecodeConfig) -> Result<RawImageData, ImageError> {
    match source {
        ImageSource::Bytes(bytes) => load_from_bytes(bytes, config),
        ImageSource::FilePath(path) => load_from_file(&path, config),
    }
}

fn load_from_bytes(bytes: Vec<u8>, config: &DecodeConfig) -> Result<RawImageData, ImageError> {
    if bytes.len() as u64 > config.max_file_size {
        return Err(ImageError::ResourceLimit(format!(
            "图片数据过大：{:.2} MB（限制：{:.2} MB）",
            bytes.len() as f64 / 1024.0 / 1024.0,
            config.max_file_size as f64 / 1024.0 / 1024.0
        )));
    }

    validate_image_signature(&bytes)?;

    Ok(RawImageData {
        bytes,
        source_hint: "bytes",
    })
}

fn load_from_file(path: &Path, config: &DecodeConfig) -> Result<RawImageData, ImageError> {
    log::debug!("开始读取本地图片 - 路径: {}", path.display());

    if !path.exists() {
        return Err(ImageError::FileSystem(format!("文件不存在：{}", path.display())));
    }

    let metadata = std::fs::metadata(path)
        .map_err(|e| ImageError::FileSystem(format!("无法读取文件信息：{}", e)))?;

    if metadata.len() > config.max_file_size {
        return Err(ImageError::ResourceLimit(format!(
            "文件过大：{:.2} MB（限制：{:.2} MB）",
            metadata.len() as f64 / 1024.0 / 1024.0,
            config.max_file_size as f64 / 1024.0 / 1024.0
        )));
    }

    let bytes = std::fs::read(path)
        .map_err(|e| ImageError::FileSystem(format!("无法读取图片文件：{}", e)))?;
    validate_image_signature(&bytes)?;

    Ok(RawImageData {
        bytes,
        source_hint: "file",
    })
}

/// 读取文件戳，用于判断缓存条目是否仍对应磁盘上的内容。
pub(crate) fn file_stamp(path: &Path) -> Result<FileStamp, ImageError> {
    let metadata = std::fs::metadata(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => {
            ImageError::FileSystem(format!("文件不存在：{}", path.display()))
        }
        _ => ImageError::FileSystem(format!("无法读取文件信息：{}", e)),
    })?;
    Ok(FileStamp::from_metadata(&metadata))
}

/// 通过文件签名（magic bytes）校验输入是否为图片。
fn validate_image_signature(bytes: &[u8]) -> Result<(), ImageError> {
    if bytes.is_empty() {
        return Err(ImageError::InvalidFormat("图片内容为空".to_string()));
    }

    let kind = infer::get(bytes)
        .ok_or_else(|| ImageError::InvalidFormat("无法识别图片类型".to_string()))?;

    if kind.matcher_type() != infer::MatcherType::Image {
        return Err(ImageError::InvalidFormat(format!(
            "文件签名不是图片类型：{}",
            kind.mime_type()
        )));
    }

    Ok(())
}
