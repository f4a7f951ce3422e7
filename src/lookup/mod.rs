//! 行政区代码与名称的互查，带读穿透缓存
//!
//! 缓存未命中时查询后端存储，找到结果后写回缓存；不存在的结果不缓存。
//! 写回的过期时间在基础时长上叠加随机秒数，避免批量写入的条目同时过期。

pub mod cache;
pub mod store;

use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use crate::error::{LookupError, StoreError};
use crate::names::perfect_province_name;

pub use cache::{CacheMetrics, DistrictCache, DEFAULT_CAPACITY};
pub use store::{DistrictStore, SqliteDistrictStore};

/// 缓存时长下限（秒）
pub const MIN_EXPIRE_SECONDS: u64 = 60;
/// 默认缓存时长（秒），行政区数据极少变化
pub const DEFAULT_EXPIRE_SECONDS: u64 = 3600 * 12;

fn digest(key: &str) -> String {
    format!("{:x}", Sha256::digest(key.as_bytes()))
}

/// 行政区名称三元组，空字符串表示该级不存在
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct Name {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub province_name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub city_name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub county_name: String,
}

impl Name {
    pub fn new(province_name: &str, city_name: &str, county_name: &str) -> Self {
        Self {
            province_name: province_name.to_string(),
            city_name: city_name.to_string(),
            county_name: county_name.to_string(),
        }
    }

    /// 补全省份简称，如 "广东" -> "广东省"
    pub fn normalized(&self) -> Self {
        let province_name = if self.province_name.is_empty() {
            String::new()
        } else {
            perfect_province_name(&self.province_name)
        };
        Self {
            province_name,
            ..self.clone()
        }
    }

    pub fn cache_key(&self) -> String {
        digest(&format!(
            "DistrictName:{}:{}:{}",
            self.province_name, self.city_name, self.county_name
        ))
    }
}

/// 行政区代码三元组，0 表示该级不存在
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct Code {
    #[serde(skip_serializing_if = "is_zero")]
    pub province_code: u32,
    #[serde(skip_serializing_if = "is_zero")]
    pub city_code: u32,
    #[serde(skip_serializing_if = "is_zero")]
    pub county_code: u32,
}

fn is_zero(value: &u32) -> bool {
    *value == 0
}

impl Code {
    pub fn new(province_code: u32, city_code: u32, county_code: u32) -> Self {
        Self {
            province_code,
            city_code,
            county_code,
        }
    }

    pub fn cache_key(&self) -> String {
        digest(&format!(
            "DistrictCode:{}:{}:{}",
            self.province_code, self.city_code, self.county_code
        ))
    }
}

fn county_count_key(province_name: &str, city_name: &str) -> String {
    digest(&format!("CountyCount:{}:{}", province_name, city_name))
}

#[derive(Debug, Clone)]
pub struct QueryConfig {
    /// 缓存基础时长，小于 60 时按 60 处理
    pub expire_seconds: u64,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            expire_seconds: DEFAULT_EXPIRE_SECONDS,
        }
    }
}

/// 基础时长越长，叠加的随机秒数范围越大
pub fn jitter_seconds(expire_seconds: u64) -> u64 {
    let random = rand::random::<u64>();
    if expire_seconds >= 3600 {
        random % 600
    } else if expire_seconds >= 600 {
        random % 60
    } else if expire_seconds >= MIN_EXPIRE_SECONDS {
        random % 6
    } else {
        1
    }
}

/// 读穿透查询
pub struct DistrictQuery<S> {
    store: S,
    cache: Arc<DistrictCache>,
    expire_seconds: u64,
}

impl<S: DistrictStore> DistrictQuery<S> {
    pub fn new(store: S, cache: Arc<DistrictCache>, config: QueryConfig) -> Self {
        let expire_seconds = config.expire_seconds.max(MIN_EXPIRE_SECONDS);
        if expire_seconds != config.expire_seconds {
            warn!(
                "缓存时长 {}s 过短，使用 {}s",
                config.expire_seconds, expire_seconds
            );
        }
        Self {
            store,
            cache,
            expire_seconds,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn cache(&self) -> &Arc<DistrictCache> {
        &self.cache
    }

    pub fn expire_seconds(&self) -> u64 {
        self.expire_seconds
    }

    /// 按名称查代码，不存在返回 `Ok(None)`
    pub fn get_district_code(&self, name: &Name) -> Result<Option<Code>, LookupError> {
        self.read_through(&name.cache_key(), || self.store.find_code(name))
    }

    /// 按代码查名称，不存在返回 `Ok(None)`
    pub fn get_district_name(&self, code: &Code) -> Result<Option<Name>, LookupError> {
        self.read_through(&code.cache_key(), || self.store.find_name(code))
    }

    /// 与省、市名称都匹配的行数，市本身的一行也计入
    pub fn get_county_count(&self, province_name: &str, city_name: &str) -> Result<u64, LookupError> {
        let key = county_count_key(province_name, city_name);
        let count = self.read_through(&key, || {
            self.store
                .count_counties(province_name, city_name)
                .map(Some)
        })?;
        Ok(count.unwrap_or_default())
    }

    /// 把后端全表写入缓存（两个方向），返回处理的行数
    pub fn load_to_cache(&self) -> Result<usize, LookupError> {
        let records = self.store.records()?;
        for record in &records {
            let name = Name::new(&record.province_name, &record.city_name, &record.county_name);
            let code = Code::new(record.province_code, record.city_code, record.county_code);
            self.populate(&name.cache_key(), &code)?;
            self.populate(&code.cache_key(), &name)?;
        }
        info!("已加载 {} 条行政区到缓存", records.len());
        Ok(records.len())
    }

    pub fn metrics(&self) -> CacheMetrics {
        self.cache.metrics()
    }

    fn read_through<T, F>(&self, key: &str, fetch: F) -> Result<Option<T>, LookupError>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Result<Option<T>, StoreError>,
    {
        if let Some(bytes) = self.cache.peek(key) {
            match serde_json::from_slice(&bytes) {
                Ok(value) => {
                    self.cache.record_hit();
                    return Ok(Some(value));
                }
                Err(err) => debug!("缓存内容无法解析，回源查询: {}", err),
            }
        }
        self.cache.record_miss();

        let found = fetch()?;
        if let Some(value) = &found {
            if let Err(err) = self.populate(key, value) {
                warn!("写入缓存失败: {}", err);
            }
        }
        Ok(found)
    }

    fn populate<T: Serialize>(&self, key: &str, value: &T) -> Result<(), LookupError> {
        let bytes = serde_json::to_vec(value)?;
        let ttl = self.expire_seconds + jitter_seconds(self.expire_seconds);
        self.cache.set(key, bytes, Duration::from_secs(ttl));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::cell::{Cell, RefCell};

    use super::*;
    use crate::table::DictDistrict;

    #[derive(Default)]
    struct FakeStore {
        rows: Vec<DictDistrict>,
        queries: Cell<usize>,
        broken: Cell<bool>,
        seen: RefCell<Vec<String>>,
    }

    impl FakeStore {
        fn with_rows() -> Self {
            let row = |p: u32, c: u32, k: u32, level: u32, pn: &str, cn: &str, kn: &str| DictDistrict {
                province_code: p,
                city_code: c,
                county_code: k,
                level,
                province_name: pn.to_string(),
                city_name: cn.to_string(),
                county_name: kn.to_string(),
            };
            Self {
                rows: vec![
                    row(440000, 0, 0, 1, "广东省", "", ""),
                    row(440000, 440400, 0, 2, "广东省", "珠海市", ""),
                    row(440000, 440400, 440402, 3, "广东省", "珠海市", "香洲区"),
                    row(440000, 440400, 440403, 3, "广东省", "珠海市", "斗门区"),
                ],
                ..Self::default()
            }
        }

        fn query(&self, what: &str) -> Result<(), StoreError> {
            self.queries.set(self.queries.get() + 1);
            self.seen.borrow_mut().push(what.to_string());
            if self.broken.get() {
                return Err(StoreError::InvalidTableName("broken".to_string()));
            }
            Ok(())
        }
    }

    impl DistrictStore for &FakeStore {
        fn find_code(&self, name: &Name) -> Result<Option<Code>, StoreError> {
            self.query("code")?;
            Ok(self
                .rows
                .iter()
                .find(|r| {
                    r.province_name == name.province_name
                        && r.city_name == name.city_name
                        && r.county_name == name.county_name
                })
                .map(|r| Code::new(r.province_code, r.city_code, r.county_code)))
        }

        fn find_name(&self, code: &Code) -> Result<Option<Name>, StoreError> {
            self.query("name")?;
            Ok(self
                .rows
                .iter()
                .find(|r| {
                    r.province_code == code.province_code
                        && r.city_code == code.city_code
                        && r.county_code == code.county_code
                })
                .map(|r| Name::new(&r.province_name, &r.city_name, &r.county_name)))
        }

        fn count_counties(&self, province_name: &str, city_name: &str) -> Result<u64, StoreError> {
            self.query("count")?;
            Ok(self
                .rows
                .iter()
                .filter(|r| {
                    r.province_name == province_name && r.city_name == city_name
                })
                .count() as u64)
        }

        fn records(&self) -> Result<Vec<DictDistrict>, StoreError> {
            self.query("records")?;
            Ok(self.rows.clone())
        }
    }

    fn query(store: &FakeStore) -> DistrictQuery<&FakeStore> {
        DistrictQuery::new(store, Arc::new(DistrictCache::new(64)), QueryConfig::default())
    }

    #[test]
    fn hit_never_touches_the_store() {
        let store = FakeStore::with_rows();
        let query = query(&store);
        let name = Name::new("广东省", "珠海市", "香洲区");

        let first = query.get_district_code(&name).unwrap();
        assert_eq!(first, Some(Code::new(440000, 440400, 440402)));
        assert_eq!(store.queries.get(), 1);

        store.broken.set(true);
        let second = query.get_district_code(&name).unwrap();
        assert_eq!(second, first);
        assert_eq!(store.queries.get(), 1);
        assert_eq!(query.metrics().hit_count, 1);
    }

    #[test]
    fn not_found_is_not_cached() {
        let store = FakeStore::with_rows();
        let query = query(&store);
        let name = Name::new("广东省", "珠海", "");

        assert_eq!(query.get_district_code(&name).unwrap(), None);
        assert_eq!(query.get_district_code(&name).unwrap(), None);
        assert_eq!(store.queries.get(), 2);
        assert!(query.cache().is_empty());
    }

    #[test]
    fn partial_triples_are_distinct_keys() {
        let store = FakeStore::with_rows();
        let query = query(&store);
        let city = query
            .get_district_code(&Name::new("广东省", "珠海市", ""))
            .unwrap();
        assert_eq!(city, Some(Code::new(440000, 440400, 0)));
        assert_ne!(
            Name::new("广东省", "珠海市", "").cache_key(),
            Name::new("广东省", "珠海市", "香洲区").cache_key()
        );
    }

    #[test]
    fn store_errors_are_not_not_found() {
        let store = FakeStore::with_rows();
        store.broken.set(true);
        let query = query(&store);
        let result = query.get_district_name(&Code::new(440000, 0, 0));
        assert!(matches!(result, Err(LookupError::Store(_))));
    }

    #[test]
    fn corrupt_cache_entry_falls_back_to_store() {
        let store = FakeStore::with_rows();
        let query = query(&store);
        let code = Code::new(440000, 440400, 440403);
        query
            .cache()
            .set(&code.cache_key(), b"not json".to_vec(), Duration::from_secs(60));

        let name = query.get_district_name(&code).unwrap();
        assert_eq!(name, Some(Name::new("广东省", "珠海市", "斗门区")));
        assert_eq!(store.queries.get(), 1);
        let metrics = query.metrics();
        assert_eq!((metrics.hit_count, metrics.miss_count), (0, 1));

        query.get_district_name(&code).unwrap();
        assert_eq!(store.queries.get(), 1);
        let metrics = query.metrics();
        assert_eq!((metrics.hit_count, metrics.miss_count), (1, 1));
    }

    #[test]
    fn county_count_is_cached_as_a_number() {
        let store = FakeStore::with_rows();
        let query = query(&store);
        assert_eq!(query.get_county_count("广东省", "珠海市").unwrap(), 3);
        assert_eq!(query.get_county_count("广东省", "珠海市").unwrap(), 3);
        assert_eq!(store.queries.get(), 1);

        let raw = query.cache().get(&county_count_key("广东省", "珠海市")).unwrap();
        assert_eq!(raw, b"3");
    }

    #[test]
    fn warm_fills_both_directions() {
        let store = FakeStore::with_rows();
        let query = query(&store);
        assert_eq!(query.load_to_cache().unwrap(), 4);
        assert_eq!(query.cache().len(), 8);

        let code = query
            .get_district_code(&Name::new("广东省", "", ""))
            .unwrap();
        assert_eq!(code, Some(Code::new(440000, 0, 0)));
        let name = query
            .get_district_name(&Code::new(440000, 440400, 0))
            .unwrap();
        assert_eq!(name, Some(Name::new("广东省", "珠海市", "")));
        assert_eq!(*store.seen.borrow(), vec!["records"]);
    }

    #[test]
    fn warm_aborts_on_store_error() {
        let store = FakeStore::with_rows();
        store.broken.set(true);
        let query = query(&store);
        assert!(query.load_to_cache().is_err());
        assert!(query.cache().is_empty());
    }

    #[test]
    fn expire_seconds_has_a_floor() {
        let store = FakeStore::default();
        let query = DistrictQuery::new(
            &store,
            Arc::new(DistrictCache::default()),
            QueryConfig { expire_seconds: 5 },
        );
        assert_eq!(query.expire_seconds(), MIN_EXPIRE_SECONDS);
    }

    #[test]
    fn jitter_scales_with_expiry() {
        for _ in 0..200 {
            assert!(jitter_seconds(43200) < 600);
            assert!(jitter_seconds(600) < 60);
            assert!(jitter_seconds(60) < 6);
        }
        assert_eq!(jitter_seconds(10), 1);
    }

    #[test]
    fn names_are_normalized_and_keys_are_stable() {
        let name = Name::new("广东", "珠海市", "");
        assert_eq!(name.normalized().province_name, "广东省");
        assert_eq!(name.cache_key(), Name::new("广东", "珠海市", "").cache_key());
        assert_eq!(name.cache_key().len(), 64);

        let json = serde_json::to_string(&Code::new(440000, 0, 0)).unwrap();
        assert_eq!(json, r#"{"province_code":440000}"#);
        let back: Code = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Code::new(440000, 0, 0));
    }
}
