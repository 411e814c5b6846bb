//! # 核心编排模块
//!
//! ## 设计思路
//!
//! `ImageLoader` 只负责流程编排，不直接与 JNI 绑定。
//! 处理链路固定为：
//! 1. 按来源加载原始字节
//! 2. 解码为 RGBA 源图
//! 3. 按请求采样
//! 4. （可选）打包为传输缓冲
//!
//! ## 实现思路
//!
//! - 配置在构建时传入并校验，之后只读，多个线程可共享同一个 `ImageLoader`。
//! - 文件来源的结果按“路径 + 请求”写入 LRU 缓存，内存来源不缓存；
//!   查询前先读文件戳，文件被改写、替换或删除后不会再命中旧结果。
//! - 记录 `load/decode/resample/total` 阶段耗时，便于性能诊断。

use std::sync::{Mutex, MutexGuard};
use std::time::Instant;

use super::cache::{CacheKey, CacheStats, ImageCache};
use super::{
    DecodeConfig, ImageError, ImageSampler, ImageSource, ResultImage, SampleRequest, loader,
    pipeline, transport,
};

/// 图片加载器。
///
/// 封装了配置、采样器与结果缓存，并编排各子模块实现完整流程。
pub struct ImageLoader {
    config: DecodeConfig,
    sampler: ImageSampler,
    cache: Option<Mutex<ImageCache>>,
}

impl ImageLoader {
    /// 根据配置创建加载器。
    ///
    /// # 示例
    /// ```rust
    /// use imageloader::image_loader::{DecodeConfig, ImageLoader};
    ///
    /// let loader = ImageLoader::new(DecodeConfig::default())?;
    /// assert!(!loader.config().flip_vertically);
    /// # Ok::<(), imageloader::image_loader::ImageError>(())
    /// ```
    pub fn new(config: DecodeConfig) -> Result<Self, ImageError> {
        config.validate()?;

        let cache = (config.cache_budget_bytes > 0)
            .then(|| Mutex::new(ImageCache::new(config.cache_budget_bytes)));

        log::info!(
            "图片加载器已初始化（flip={}, quality={}, cache_budget={}B）",
            config.flip_vertically,
            config.resize_quality.as_str(),
            config.cache_budget_bytes
        );

        Ok(Self {
            sampler: ImageSampler::from_config(&config),
            config,
            cache,
        })
    }

    pub fn config(&self) -> &DecodeConfig {
        &self.config
    }

    /// 处理主入口：加载、解码并采样。
    pub fn load(&self, source: ImageSource, request: SampleRequest) -> Result<ResultImage, ImageError> {
        let total_start = Instant::now();

        let cache_key = match &source {
            ImageSource::FilePath(path) if self.cache.is_some() => {
                Some((CacheKey::new(path, request), loader::file_stamp(path)?))
            }
            _ => None,
        };

        if let Some((key, stamp)) = &cache_key {
            if let Some(hit) = self.lock_cache()?.and_then(|mut cache| cache.get(key, *stamp)) {
                log::debug!("命中结果缓存 - {}x{}", hit.width(), hit.height());
                return Ok(hit);
            }
        }

        let load_start = Instant::now();
        let raw = loader::load_source(source, &self.config)?;
        let load_elapsed = load_start.elapsed();

        let decode_start = Instant::now();
        let decoded = pipeline::decode_rgba(raw, &self.config)?;
        let decode_elapsed = decode_start.elapsed();
        let (source_width, source_height) = (decoded.width(), decoded.height());

        let resample_start = Instant::now();
        let result = self.sampler.resample(decoded, request)?;
        let resample_elapsed = resample_start.elapsed();

        if let Some((key, stamp)) = cache_key {
            if let Some(mut cache) = self.lock_cache()? {
                cache.put(key, stamp, &result);
            }
        }

        log::info!(
            "图片处理完成 - {}x{} -> {}x{} ({:?}) load={}ms decode={}ms resample={}ms total={}ms",
            source_width,
            source_height,
            result.width(),
            result.height(),
            request,
            load_elapsed.as_millis(),
            decode_elapsed.as_millis(),
            resample_elapsed.as_millis(),
            total_start.elapsed().as_millis()
        );

        Ok(result)
    }

    /// 加载并打包为跨边界传输缓冲。
    pub fn load_packed(&self, source: ImageSource, request: SampleRequest) -> Result<Vec<u8>, ImageError> {
        let image = self.load(source, request)?;

        let pack_start = Instant::now();
        let packed = transport::pack(&image)?;
        log::debug!(
            "传输缓冲打包完成 - {} 字节 pack={}ms",
            packed.len(),
            pack_start.elapsed().as_millis()
        );

        Ok(packed)
    }

    /// 读取缓存占用；未启用缓存时返回空快照。
    pub fn cache_stats(&self) -> Result<CacheStats, ImageError> {
        Ok(self
            .lock_cache()?
            .map(|cache| cache.stats())
            .unwrap_or_default())
    }

    fn lock_cache(&self) -> Result<Option<MutexGuard<'_, ImageCache>>, ImageError> {
        match &self.cache {
            Some(cache) => cache
                .lock()
                .map(Some)
                .map_err(|_| ImageError::ResourceLimit("缓存锁已中毒".to_string())),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, ImageBuffer, ImageFormat, Rgba};
    use std::io::Cursor;
    use std::path::PathBuf;

    fn create_png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = ImageBuffer::from_fn(width, height, |x, y| {
            Rgba([(x % 255) as u8, (y % 255) as u8, ((x + y) % 255) as u8, 255])
        });

        let mut cursor = Cursor::new(Vec::new());
        DynamicImage::ImageRgba8(img)
            .write_to(&mut cursor, ImageFormat::Png)
            .expect("failed to encode test image");
        cursor.into_inner()
    }

    fn temp_png(name: &str, width: u32, height: u32) -> PathBuf {
        let path = std::env::temp_dir().join(format!(
            "imageloader-handler-{}-{}.png",
            std::process::id(),
            name
        ));
        std::fs::write(&path, create_png_bytes(width, height)).expect("write temp png");
        path
    }

    fn solid_png_bytes(width: u32, height: u32, value: u8) -> Vec<u8> {
        let img = ImageBuffer::from_pixel(width, height, Rgba([value, value, value, 255]));
        let mut cursor = Cursor::new(Vec::new());
        DynamicImage::ImageRgba8(img)
            .write_to(&mut cursor, ImageFormat::Png)
            .expect("failed to encode test image");
        cursor.into_inner()
    }

    #[test]
    fn new_rejects_invalid_config() {
        let config = DecodeConfig {
            max_decoded_pixels: 0,
            ..DecodeConfig::default()
        };
        assert!(matches!(ImageLoader::new(config), Err(ImageError::InvalidFormat(_))));
    }

    #[test]
    fn load_bytes_with_uniform_factor() {
        let loader = ImageLoader::new(DecodeConfig::default()).expect("loader init failed");
        let result = loader
            .load(
                ImageSource::Bytes(create_png_bytes(9, 6)),
                SampleRequest::UniformFactor(2),
            )
            .expect("load should succeed");

        assert_eq!((result.width(), result.height()), (4, 3));
        assert_eq!(result.pixel(3, 2), [6, 4, 10, 255]);
    }

    #[test]
    fn load_packed_produces_transport_layout() {
        let loader = ImageLoader::new(DecodeConfig::default()).expect("loader init failed");
        let packed = loader
            .load_packed(
                ImageSource::Bytes(create_png_bytes(5, 4)),
                SampleRequest::PassThrough,
            )
            .expect("load should succeed");

        assert_eq!(packed.len(), 8 + 5 * 4 * 4);
        let image = transport::unpack(&packed).expect("unpack");
        assert_eq!(image.pixel(4, 3), [4, 3, 7, 255]);
    }

    #[test]
    fn file_results_are_cached_per_request() {
        let path = temp_png("cache", 8, 8);
        let loader = ImageLoader::new(DecodeConfig::default()).expect("loader init failed");

        let first = loader
            .load(ImageSource::FilePath(path.clone()), SampleRequest::UniformFactor(2))
            .expect("first load");
        let second = loader
            .load(ImageSource::FilePath(path.clone()), SampleRequest::UniformFactor(2))
            .expect("cached load");
        assert_eq!(first, second);
        assert_eq!(loader.cache_stats().expect("stats").entries, 1);

        loader
            .load(ImageSource::FilePath(path.clone()), SampleRequest::PassThrough)
            .expect("second request");
        assert_eq!(loader.cache_stats().expect("stats").entries, 2);

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn rewritten_file_is_decoded_again() {
        let path = std::env::temp_dir().join(format!(
            "imageloader-handler-{}-rewrite.png",
            std::process::id()
        ));
        std::fs::write(&path, solid_png_bytes(8, 8, 10)).expect("write temp png");
        let loader = ImageLoader::new(DecodeConfig::default()).expect("loader init failed");

        let first = loader
            .load(ImageSource::FilePath(path.clone()), SampleRequest::PassThrough)
            .expect("first load");
        assert_eq!((first.width(), first.height()), (8, 8));
        assert_eq!(first.pixel(0, 0), [10, 10, 10, 255]);

        // 同一路径改写为另一张图，并推后修改时间，避免文件系统时间粒度导致戳相同
        let first_modified = std::fs::metadata(&path)
            .and_then(|m| m.modified())
            .expect("modified time");
        std::fs::write(&path, solid_png_bytes(4, 4, 200)).expect("rewrite temp png");
        std::fs::File::options()
            .write(true)
            .open(&path)
            .and_then(|file| file.set_modified(first_modified + std::time::Duration::from_secs(10)))
            .expect("bump modified time");

        let second = loader
            .load(ImageSource::FilePath(path.clone()), SampleRequest::PassThrough)
            .expect("reload");
        assert_eq!((second.width(), second.height()), (4, 4));
        assert_eq!(second.pixel(0, 0), [200, 200, 200, 255]);
        assert_eq!(loader.cache_stats().expect("stats").entries, 1);

        // 删除后不再命中缓存
        std::fs::remove_file(&path).expect("remove temp png");
        let missing = loader.load(ImageSource::FilePath(path), SampleRequest::PassThrough);
        assert!(matches!(missing, Err(ImageError::FileSystem(_))));
    }

    #[test]
    fn zero_budget_disables_cache() {
        let path = temp_png("nocache", 4, 4);
        let loader = ImageLoader::new(DecodeConfig {
            cache_budget_bytes: 0,
            ..DecodeConfig::default()
        })
        .expect("loader init failed");

        loader
            .load(ImageSource::FilePath(path.clone()), SampleRequest::PassThrough)
            .expect("load");
        std::fs::remove_file(&path).ok();

        assert_eq!(loader.cache_stats().expect("stats"), CacheStats::default());
    }

    #[test]
    fn allocation_failure_is_distinct_from_decode_error() {
        let loader = ImageLoader::new(DecodeConfig {
            max_output_bytes: 8,
            ..DecodeConfig::default()
        })
        .expect("loader init failed");

        let denied = loader.load(
            ImageSource::Bytes(create_png_bytes(16, 16)),
            SampleRequest::UniformFactor(4),
        );
        assert!(matches!(denied, Err(ImageError::AllocationFailure { bytes: 64 })));

        let mut corrupt = vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
        corrupt.extend_from_slice(b"garbage garbage garbage");
        let garbage = loader.load(
            ImageSource::Bytes(corrupt),
            SampleRequest::UniformFactor(4),
        );
        assert!(matches!(garbage, Err(ImageError::Decode(_))));
    }
}
