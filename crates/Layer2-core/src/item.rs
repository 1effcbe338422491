//! Cache Item - 키 하나에 대한 지연 값 컨테이너
//!
//! `is_hit()`과 `get()`은 처음 호출될 때만 저장소에 접근하고 결과를 기억합니다.
//! 따라서 한 item 인스턴스당 `has`/`get` 왕복은 각각 최대 한 번입니다.

use crate::extension::Stage;
use crate::pool::CachePool;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use stash_foundation::{time, ErrorAware, ItemConfig};
use std::collections::BTreeSet;
use std::fmt;

// ============================================================================
// CacheValue - item 값
// ============================================================================

/// Item에 담기는 값
///
/// driver는 `Bytes`만 저장합니다. `Data`는 serialize extension이
/// 저장 직전에 바이트로 바꿉니다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum CacheValue {
    Bytes(Vec<u8>),
    Data(serde_json::Value),
}

impl CacheValue {
    /// 직렬화 가능한 값으로부터 생성
    pub fn from_serialize<T: Serialize>(value: &T) -> serde_json::Result<Self> {
        Ok(Self::Data(serde_json::to_value(value)?))
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Bytes(bytes) => Some(bytes),
            Self::Data(_) => None,
        }
    }

    pub fn as_data(&self) -> Option<&serde_json::Value> {
        match self {
            Self::Data(data) => Some(data),
            Self::Bytes(_) => None,
        }
    }

    /// 원하는 타입으로 변환 (`Data`는 JSON 값, `Bytes`는 JSON 바이트로 해석)
    pub fn decode<T: DeserializeOwned>(&self) -> Option<T> {
        match self {
            Self::Data(data) => serde_json::from_value(data.clone()).ok(),
            Self::Bytes(bytes) => serde_json::from_slice(bytes).ok(),
        }
    }
}

impl From<Vec<u8>> for CacheValue {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Bytes(bytes)
    }
}

impl From<serde_json::Value> for CacheValue {
    fn from(value: serde_json::Value) -> Self {
        Self::Data(value)
    }
}

impl From<String> for CacheValue {
    fn from(value: String) -> Self {
        Self::Data(serde_json::Value::String(value))
    }
}

impl From<&str> for CacheValue {
    fn from(value: &str) -> Self {
        Self::Data(serde_json::Value::String(value.to_string()))
    }
}

impl From<i64> for CacheValue {
    fn from(value: i64) -> Self {
        Self::Data(serde_json::Value::from(value))
    }
}

impl From<bool> for CacheValue {
    fn from(value: bool) -> Self {
        Self::Data(serde_json::Value::Bool(value))
    }
}

// ============================================================================
// CacheItem
// ============================================================================

/// Pool이 만들어 주는 item
///
/// `clone()`은 깊은 복사이며, pool은 save 계열 hook을 돌리기 전에
/// 복사본을 만들어 호출자의 item이 바뀌지 않게 합니다.
#[derive(Clone)]
pub struct CacheItem {
    key: String,
    pool: CachePool,
    value: Option<CacheValue>,
    /// None = 아직 저장소에 묻지 않음
    hit: Option<bool>,
    done: bool,
    /// 0 = 아직 계산되지 않음
    expire_at: i64,
    ttl: i64,
    tags: BTreeSet<String>,
}

impl CacheItem {
    /// 새 item 생성 (보통 `CachePool::get_item`을 사용)
    pub fn new(key: impl Into<String>, pool: &CachePool, config: &ItemConfig) -> Self {
        Self {
            key: key.into(),
            pool: pool.clone(),
            value: None,
            hit: None,
            done: false,
            expire_at: 0,
            ttl: config.ttl,
            tags: BTreeSet::new(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn pool(&self) -> &CachePool {
        &self.pool
    }

    // ========================================================================
    // 값 조회/설정
    // ========================================================================

    /// 값 조회
    ///
    /// 처음 한 번만 저장소에서 읽고, 이후에는 기억한 값을 돌려줍니다.
    /// miss이면 `None` (또는 호출자가 `set`으로 넣은 값)을 돌려줍니다.
    pub fn get(&mut self) -> Option<&CacheValue> {
        if !self.done {
            self.resolve();
        }
        self.value.as_ref()
    }

    /// 값을 원하는 타입으로 조회
    pub fn get_as<T: DeserializeOwned>(&mut self) -> Option<T> {
        self.get().and_then(CacheValue::decode)
    }

    fn resolve(&mut self) {
        self.done = true;

        if !self.is_hit() {
            return;
        }

        let pool = self.pool.clone();

        if !pool.run_extensions(Stage::PreGet, Some(self)) {
            self.hit = Some(false);
            return;
        }

        let driver = pool.driver();
        match driver.get(&self.key) {
            Some(raw) => {
                self.set_value(Some(CacheValue::Bytes(raw)));
            }
            None => {
                pool.set_error(driver.last_error());
                self.hit = Some(false);
                return;
            }
        }

        if !pool.run_extensions(Stage::PostGet, Some(self)) {
            self.hit = Some(false);
            self.value = None;
        }
    }

    /// 저장소에 값이 있는지 (유효기간 포함)
    pub fn is_hit(&mut self) -> bool {
        if let Some(hit) = self.hit {
            return hit;
        }

        let pool = self.pool.clone();

        if !pool.run_extensions(Stage::PreHas, Some(self)) {
            self.hit = Some(false);
            return false;
        }

        let expire = pool.driver().has(&self.key);
        let hit = expire > 0 && expire >= time::now();
        if hit {
            self.expire_at = expire;
        }
        self.hit = Some(hit);

        if !pool.run_extensions(Stage::PostHas, Some(self)) {
            self.hit = Some(false);
        }

        self.hit.unwrap_or(false)
    }

    /// hit 상태 강제 설정 (stampede 보호 등)
    pub fn set_hit(&mut self, hit: bool) {
        self.hit = Some(hit);
    }

    /// 아직 저장소에 묻지 않았으면 `None`
    pub fn hit_state(&self) -> Option<bool> {
        self.hit
    }

    /// 값 설정
    pub fn set(&mut self, value: impl Into<CacheValue>) -> &mut Self {
        self.set_value(Some(value.into()))
    }

    /// 직렬화 가능한 값 설정
    pub fn set_serialized<T: Serialize>(&mut self, value: &T) -> serde_json::Result<&mut Self> {
        let value = CacheValue::from_serialize(value)?;
        Ok(self.set_value(Some(value)))
    }

    /// `None` 포함 값 설정
    pub fn set_value(&mut self, value: Option<CacheValue>) -> &mut Self {
        self.done = true;
        self.value = value;
        if self.expire_at == 0 {
            self.expire_at = time::now() + self.ttl;
        }
        self
    }

    /// 저장소 접근 없이 현재 값 참조 (hook, driver용)
    pub fn value(&self) -> Option<&CacheValue> {
        self.value.as_ref()
    }

    /// 현재 값이 바이트라면 그 바이트
    pub fn payload(&self) -> Option<&[u8]> {
        self.value.as_ref().and_then(CacheValue::as_bytes)
    }

    pub fn is_done(&self) -> bool {
        self.done
    }

    // ========================================================================
    // 만료
    // ========================================================================

    /// 절대 만료 시각 설정 (`None`이면 지금 + TTL)
    pub fn expires_at(&mut self, at: Option<DateTime<Utc>>) -> &mut Self {
        self.expire_at = match at {
            Some(at) => at.timestamp(),
            None => time::now() + self.ttl,
        };
        self
    }

    /// 절대 만료 시각 설정 (Unix 초)
    pub fn expires_at_timestamp(&mut self, timestamp: i64) -> &mut Self {
        self.expire_at = timestamp;
        self
    }

    /// 상대 만료 시간 설정 (`None`이면 기본 TTL)
    pub fn expires_after(&mut self, seconds: Option<i64>) -> &mut Self {
        self.expire_at = time::now() + seconds.unwrap_or(self.ttl);
        self
    }

    /// 만료 시각 (Unix 초), 아직 계산 전이면 지금 + TTL
    pub fn expiration(&self) -> i64 {
        if self.expire_at == 0 {
            time::now() + self.ttl
        } else {
            self.expire_at
        }
    }

    pub fn expiration_datetime(&self) -> DateTime<Utc> {
        time::to_datetime(self.expiration())
    }

    pub fn ttl(&self) -> i64 {
        self.ttl
    }

    pub fn set_ttl(&mut self, ttl: i64) -> &mut Self {
        self.ttl = ttl;
        self
    }

    // ========================================================================
    // 태그
    // ========================================================================

    pub fn tags(&self) -> &BTreeSet<String> {
        &self.tags
    }

    pub fn set_tags<I, S>(&mut self, tags: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn add_tag(&mut self, tag: impl Into<String>) -> &mut Self {
        self.tags.insert(tag.into());
        self
    }
}

impl fmt::Debug for CacheItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheItem")
            .field("key", &self.key)
            .field("value", &self.value)
            .field("hit", &self.hit)
            .field("done", &self.done)
            .field("expire_at", &self.expire_at)
            .field("ttl", &self.ttl)
            .field("tags", &self.tags)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::{Driver, MemoryDriver};
    use std::sync::Arc;

    fn memory_pool() -> (CachePool, Arc<MemoryDriver>) {
        let driver = Arc::new(MemoryDriver::new());
        let pool = CachePool::new(driver.clone()).unwrap();
        (pool, driver)
    }

    #[test]
    fn test_set_then_get_needs_no_storage() {
        let (pool, driver) = memory_pool();
        let mut item = pool.get_item("k");
        item.set("v");

        assert_eq!(item.get(), Some(&CacheValue::from("v")));
        assert_eq!(item.hit_state(), None);
        assert_eq!(driver.stats().has_calls, 0);
        assert_eq!(driver.stats().get_calls, 0);
    }

    #[test]
    fn test_miss_returns_none() {
        let (pool, _) = memory_pool();
        let mut item = pool.get_item("absent");
        assert!(!item.is_hit());
        assert_eq!(item.get(), None);
    }

    #[test]
    fn test_is_hit_memoized() {
        let (pool, driver) = memory_pool();
        let mut item = pool.get_item("k");
        item.is_hit();
        item.is_hit();
        item.get();
        item.get();
        assert_eq!(driver.stats().has_calls, 1);
        assert_eq!(driver.stats().get_calls, 0);
    }

    #[test]
    fn test_expire_sentinel_resolved_on_set() {
        let (pool, _) = memory_pool();
        let mut item = pool.get_item("k");
        let before = time::now();
        item.set(1);
        let expiration = item.expiration();
        assert!(expiration >= before + item.ttl());
        assert!(expiration <= time::now() + item.ttl());
    }

    #[test]
    fn test_explicit_expiration_kept_on_set() {
        let (pool, _) = memory_pool();
        let mut item = pool.get_item("k");
        item.expires_at_timestamp(42);
        item.set(1);
        assert_eq!(item.expiration(), 42);
    }

    #[test]
    fn test_clone_is_independent() {
        let (pool, _) = memory_pool();
        let mut item = pool.get_item("k");
        item.set("a").add_tag("t1");

        let mut copy = item.clone();
        copy.set("b").add_tag("t2");

        assert_eq!(item.value(), Some(&CacheValue::from("a")));
        assert_eq!(item.tags().len(), 1);
        assert_eq!(copy.tags().len(), 2);
    }

    #[test]
    fn test_decode_value() {
        let value = CacheValue::from_serialize(&vec![1, 2, 3]).unwrap();
        assert_eq!(value.decode::<Vec<i32>>(), Some(vec![1, 2, 3]));
        assert_eq!(CacheValue::Bytes(b"[4]".to_vec()).decode::<Vec<i32>>(), Some(vec![4]));
    }

    #[test]
    fn test_has_round_trip_with_driver() {
        let (pool, driver) = memory_pool();
        let mut item = pool.get_item("k");
        item.set("v");
        item.expires_after(Some(300));
        assert!(pool.save(&item));

        let has = driver.has("k");
        assert!(has > time::now());
    }
}
