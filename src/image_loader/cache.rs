//! # 结果缓存模块
//!
//! ## 设计思路
//!
//! 图库场景会反复请求同一路径的缩略图。这里按“路径 + 采样请求”缓存采样结果，
//! 以像素字节数作为权重，总量受 `cache_budget_bytes` 约束，超出时按 LRU 淘汰。
//!
//! ## 实现思路
//!
//! `lru::LruCache` 以无上限模式使用，容量控制由本模块按字节预算自行完成；
//! 单个结果超过整个预算时直接不缓存。命中时返回克隆，调用方拿到独占所有权。
//! 每个条目记录写入时的文件戳（长度 + 修改时间），查询时戳不一致即视为过期并移除。

use std::fs::Metadata;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use lru::LruCache;

use super::{ResultImage, SampleRequest};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) struct CacheKey {
    path: PathBuf,
    request: SampleRequest,
}

impl CacheKey {
    pub(crate) fn new(path: &Path, request: SampleRequest) -> Self {
        Self {
            path: path.to_path_buf(),
            request,
        }
    }
}

/// 文件戳：文件被改写或替换后至少有一项会变化。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct FileStamp {
    len: u64,
    modified: Option<SystemTime>,
}

impl FileStamp {
    pub(crate) fn from_metadata(metadata: &Metadata) -> Self {
        Self {
            len: metadata.len(),
            modified: metadata.modified().ok(),
        }
    }
}

struct CacheEntry {
    stamp: FileStamp,
    image: ResultImage,
}

/// 缓存占用快照。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CacheStats {
    pub entries: usize,
    pub bytes: u64,
}

pub(crate) struct ImageCache {
    entries: LruCache<CacheKey, CacheEntry>,
    budget_bytes: u64,
    used_bytes: u64,
}

impl ImageCache {
    pub(crate) fn new(budget_bytes: u64) -> Self {
        Self {
            entries: LruCache::unbounded(),
            budget_bytes,
            used_bytes: 0,
        }
    }

    /// 查询缓存；文件戳不一致的条目会被移除。
    pub(crate) fn get(&mut self, key: &CacheKey, stamp: FileStamp) -> Option<ResultImage> {
        let entry = self.entries.get(key)?;
        if entry.stamp == stamp {
            return Some(entry.image.clone());
        }

        log::debug!("缓存条目已过期，移除：{}", key.path.display());
        if let Some(stale) = self.entries.pop(key) {
            self.used_bytes -= stale.image.byte_len() as u64;
        }
        None
    }

    pub(crate) fn put(&mut self, key: CacheKey, stamp: FileStamp, image: &ResultImage) {
        let weight = image.byte_len() as u64;
        if weight > self.budget_bytes {
            log::debug!("结果超出缓存预算，跳过缓存：{} 字节", weight);
            return;
        }

        let entry = CacheEntry {
            stamp,
            image: image.clone(),
        };
        if let Some(previous) = self.entries.put(key, entry) {
            self.used_bytes -= previous.image.byte_len() as u64;
        }
        self.used_bytes += weight;

        while self.used_bytes > self.budget_bytes {
            match self.entries.pop_lru() {
                Some((_, evicted)) => self.used_bytes -= evicted.image.byte_len() as u64,
                None => break,
            }
        }
    }

    pub(crate) fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.entries.len(),
            bytes: self.used_bytes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image(side: u32) -> ResultImage {
        ResultImage::new(side, side, vec![1u8; (side * side * 4) as usize]).expect("valid image")
    }

    fn key(name: &str) -> CacheKey {
        CacheKey::new(Path::new(name), SampleRequest::PassThrough)
    }

    fn stamp(len: u64) -> FileStamp {
        FileStamp {
            len,
            modified: Some(SystemTime::UNIX_EPOCH),
        }
    }

    #[test]
    fn hit_returns_cached_copy() {
        let mut cache = ImageCache::new(1024);
        cache.put(key("a.png"), stamp(1), &image(2));

        assert_eq!(cache.get(&key("a.png"), stamp(1)), Some(image(2)));
        assert_eq!(cache.get(&key("b.png"), stamp(1)), None);
    }

    #[test]
    fn request_is_part_of_the_key() {
        let mut cache = ImageCache::new(1024);
        cache.put(key("a.png"), stamp(1), &image(2));

        let other = CacheKey::new(Path::new("a.png"), SampleRequest::UniformFactor(2));
        assert_eq!(cache.get(&other, stamp(1)), None);
    }

    #[test]
    fn evicts_least_recently_used_when_over_budget() {
        // 每张 2x2 图 16 字节，预算可容纳两张
        let mut cache = ImageCache::new(32);
        cache.put(key("a.png"), stamp(1), &image(2));
        cache.put(key("b.png"), stamp(1), &image(2));
        assert!(cache.get(&key("a.png"), stamp(1)).is_some());

        cache.put(key("c.png"), stamp(1), &image(2));

        assert!(cache.get(&key("a.png"), stamp(1)).is_some());
        assert!(cache.get(&key("b.png"), stamp(1)).is_none());
        assert_eq!(cache.stats(), CacheStats { entries: 2, bytes: 32 });
    }

    #[test]
    fn replacing_an_entry_keeps_accounting_exact() {
        let mut cache = ImageCache::new(1024);
        cache.put(key("a.png"), stamp(1), &image(4));
        cache.put(key("a.png"), stamp(1), &image(2));

        assert_eq!(cache.stats(), CacheStats { entries: 1, bytes: 16 });
    }

    #[test]
    fn changed_stamp_drops_the_entry() {
        let mut cache = ImageCache::new(1024);
        cache.put(key("a.png"), stamp(1), &image(2));

        assert_eq!(cache.get(&key("a.png"), stamp(2)), None);
        assert_eq!(cache.stats(), CacheStats::default());
        assert_eq!(cache.get(&key("a.png"), stamp(1)), None);
    }

    #[test]
    fn oversized_result_is_not_cached() {
        let mut cache = ImageCache::new(8);
        cache.put(key("a.png"), stamp(1), &image(2));

        assert_eq!(cache.stats(), CacheStats::default());
    }
}
