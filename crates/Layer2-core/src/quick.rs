//! Quick Cache - 함수 결과 memoization
//!
//! ```ignore
//! let quick = QuickCache::new(pool);
//! let report = quick.cached(&("report", user_id), || build_report(user_id))?;
//! ```
//!
//! 키는 참조 값을 JSON으로 직렬화한 뒤 MD5 hex로 만듭니다.
//! JSON 객체 키는 정렬되어 직렬화되므로 필드 순서는 키에 영향을 주지 않습니다.

use crate::pool::CachePool;
use md5::{Digest, Md5};
use serde::de::DeserializeOwned;
use serde::Serialize;
use stash_foundation::Result;
use tracing::debug;

/// 기본 TTL (하루)
pub const DEFAULT_QUICK_TTL: i64 = 86400;

/// pool 위의 memoization 헬퍼
#[derive(Debug, Clone)]
pub struct QuickCache {
    pool: CachePool,
    ttl: i64,
}

impl QuickCache {
    pub fn new(pool: CachePool) -> Self {
        Self {
            pool,
            ttl: DEFAULT_QUICK_TTL,
        }
    }

    pub fn with_ttl(mut self, ttl: i64) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn pool(&self) -> &CachePool {
        &self.pool
    }

    /// 참조 값으로부터 캐시 키 생성
    pub fn key_for<R: Serialize + ?Sized>(reference: &R) -> Result<String> {
        let normalized = serde_json::to_value(reference)?;
        let bytes = serde_json::to_vec(&normalized)?;
        Ok(hex::encode(Md5::digest(&bytes)))
    }

    /// 캐시된 결과를 반환하거나, 없으면 `f`를 실행해 저장 후 반환
    pub fn cached<R, T, F>(&self, reference: &R, f: F) -> Result<T>
    where
        R: Serialize + ?Sized,
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> T,
    {
        self.cached_for(self.ttl, reference, f)
    }

    /// TTL을 지정하는 `cached`
    pub fn cached_for<R, T, F>(&self, ttl: i64, reference: &R, f: F) -> Result<T>
    where
        R: Serialize + ?Sized,
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> T,
    {
        let key = Self::key_for(reference)?;
        let mut item = self.pool.get_item(&key);

        if item.is_hit() {
            if let Some(value) = item.get_as::<T>() {
                return Ok(value);
            }
            debug!("Cached value for {} could not be decoded, recomputing", key);
        }

        let value = f();
        item.set_serialized(&value)?;
        item.expires_after(Some(ttl));
        if !self.pool.save(&item) {
            debug!("Failed to cache result for {}", key);
        }
        Ok(value)
    }
}
