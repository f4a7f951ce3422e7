//! 容量有限的过期缓存
//!
//! 超出容量时按最近最少使用淘汰；过期条目在读取时惰性删除。
//! 每个调用方各自持有一个实例，不存在进程级的全局缓存。

use std::fmt;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use lru::LruCache;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

/// 默认容量（条目数）
pub const DEFAULT_CAPACITY: usize = 65536;

struct Entry {
    value: Vec<u8>,
    /// `None` 表示永不过期
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.map_or(true, |at| at > now)
    }
}

#[derive(Default)]
struct Counters {
    expired: AtomicU64,
    evacuated: AtomicU64,
    lookups: AtomicU64,
    lookup_nanos: AtomicU64,
    hits: AtomicU64,
    misses: AtomicU64,
    overwrites: AtomicU64,
    touched: AtomicU64,
}

fn bump(counter: &AtomicU64) {
    counter.fetch_add(1, Ordering::Relaxed);
}

/// 缓存的度量数据
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CacheMetrics {
    pub entry_count: u64,
    pub expired_count: u64,
    pub evacuate_count: u64,
    pub lookup_count: u64,
    /// 平均每次查找的耗时（纳秒）
    pub average_access_time: u64,
    pub hit_count: u64,
    pub miss_count: u64,
    pub overwrite_count: u64,
    pub touched_count: u64,
    pub hit_rate: f64,
}

impl fmt::Display for CacheMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let json = serde_json::to_string(self).map_err(|_| fmt::Error)?;
        f.write_str(&json)
    }
}

pub struct DistrictCache {
    entries: Mutex<LruCache<String, Entry>>,
    counters: Counters,
}

impl Default for DistrictCache {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl DistrictCache {
    /// `capacity` 为最大条目数，0 按 1 处理
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
            counters: Counters::default(),
        }
    }

    pub fn get(&self, key: &str) -> Option<Vec<u8>> {
        let value = self.peek(key);
        match value {
            Some(_) => self.record_hit(),
            None => self.record_miss(),
        }
        value
    }

    /// 同 [`get`](Self::get)，但不计入命中/未命中，由调用方在解码后调用
    /// [`record_hit`](Self::record_hit) 或 [`record_miss`](Self::record_miss)
    pub fn peek(&self, key: &str) -> Option<Vec<u8>> {
        let started = Instant::now();
        let value = {
            let mut entries = self.entries.lock();
            let state = entries
                .get(key)
                .map(|entry| entry.is_live(started).then(|| entry.value.clone()));
            match state {
                Some(Some(value)) => Some(value),
                Some(None) => {
                    entries.pop(key);
                    bump(&self.counters.expired);
                    None
                }
                None => None,
            }
        };

        bump(&self.counters.lookups);
        let nanos = u64::try_from(started.elapsed().as_nanos()).unwrap_or(u64::MAX);
        self.counters.lookup_nanos.fetch_add(nanos, Ordering::Relaxed);
        value
    }

    pub fn record_hit(&self) {
        bump(&self.counters.hits);
    }

    pub fn record_miss(&self) {
        bump(&self.counters.misses);
    }

    pub fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) {
        let entry = Entry {
            value,
            expires_at: Instant::now().checked_add(ttl),
        };
        let replaced = self.entries.lock().push(key.to_string(), entry);
        if let Some((old_key, _)) = replaced {
            if old_key == key {
                bump(&self.counters.overwrites);
            } else {
                bump(&self.counters.evacuated);
            }
        }
    }

    /// 刷新未过期条目的过期时间
    pub fn touch(&self, key: &str, ttl: Duration) -> bool {
        let now = Instant::now();
        let mut entries = self.entries.lock();
        match entries.get_mut(key) {
            Some(entry) if entry.is_live(now) => {
                entry.expires_at = now.checked_add(ttl);
                bump(&self.counters.touched);
                true
            }
            _ => false,
        }
    }

    pub fn remove(&self, key: &str) -> bool {
        self.entries.lock().pop(key).is_some()
    }

    /// 清空所有条目，计数保留
    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn metrics(&self) -> CacheMetrics {
        let load = |counter: &AtomicU64| counter.load(Ordering::Relaxed);
        let lookups = load(&self.counters.lookups);
        let hits = load(&self.counters.hits);
        let misses = load(&self.counters.misses);
        let average_access_time = load(&self.counters.lookup_nanos)
            .checked_div(lookups)
            .unwrap_or(0);
        let hit_rate = if hits + misses == 0 {
            0.0
        } else {
            hits as f64 / (hits + misses) as f64
        };

        CacheMetrics {
            entry_count: self.len() as u64,
            expired_count: load(&self.counters.expired),
            evacuate_count: load(&self.counters.evacuated),
            lookup_count: lookups,
            average_access_time,
            hit_count: hits,
            miss_count: misses,
            overwrite_count: load(&self.counters.overwrites),
            touched_count: load(&self.counters.touched),
            hit_rate,
        }
    }
}
