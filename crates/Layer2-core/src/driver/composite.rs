//! Composite Driver - front/back 2단 저장소
//!
//! - 읽기: front에 있으면 front, 없으면 back
//! - 쓰기: back에는 항상, front에는 tester가 허용할 때만 (하나라도 성공하면 성공)
//!   tester가 거부하면 front의 이전 항목은 지움
//! - clear/delete/purge: 양쪽 모두 성공해야 성공 (먼저 실패한 쪽의 에러 전달)

use super::{fallback_or_null, Driver};
use crate::item::CacheItem;
use stash_foundation::{time, ErrorAware, ErrorState};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// front 기록 여부 판단 함수
pub type WriteTester = Arc<dyn Fn(&CacheItem) -> bool + Send + Sync>;

/// 2단 driver
pub struct CompositeDriver {
    front: Arc<dyn Driver>,
    back: Arc<dyn Driver>,
    tester: WriteTester,
    errors: ErrorState,
    fallback: Option<Arc<dyn Driver>>,
}

impl CompositeDriver {
    /// 새 driver 생성 (기본 tester: 항상 front에도 기록)
    pub fn new(front: Arc<dyn Driver>, back: Arc<dyn Driver>) -> Self {
        Self {
            front,
            back,
            tester: Arc::new(|_| true),
            errors: ErrorState::new(),
            fallback: None,
        }
    }

    pub fn with_tester<F>(mut self, tester: F) -> Self
    where
        F: Fn(&CacheItem) -> bool + Send + Sync + 'static,
    {
        self.tester = Arc::new(tester);
        self
    }

    /// 직렬화된 크기가 `max_bytes` 이하인 item만 front에 기록
    pub fn with_front_max_bytes(self, max_bytes: usize) -> Self {
        self.with_tester(move |item| {
            item.payload()
                .map(|payload| payload.len() <= max_bytes)
                .unwrap_or(false)
        })
    }

    pub fn with_fallback(mut self, fallback: Arc<dyn Driver>) -> Self {
        self.fallback = Some(fallback);
        self
    }

    pub fn front(&self) -> &Arc<dyn Driver> {
        &self.front
    }

    pub fn back(&self) -> &Arc<dyn Driver> {
        &self.back
    }

    /// front에서만 확인
    pub fn front_has(&self, key: &str) -> i64 {
        self.front.has(key)
    }

    /// back에서만 확인
    pub fn back_has(&self, key: &str) -> i64 {
        self.back.has(key)
    }

    // ========================================================================
    // 정책 헬퍼
    // ========================================================================

    /// front에 아직 만료되지 않은 항목이 있으면 그 만료 시각
    fn front_fresh(&self, key: &str) -> Option<i64> {
        let expire = self.front.has(key);
        (expire > 0 && expire >= time::now()).then_some(expire)
    }

    /// OR 정책 쓰기: front(tester 허용 시)와 back 모두 시도
    fn write_either<F>(&self, item: &CacheItem, op: F) -> bool
    where
        F: Fn(&dyn Driver, &CacheItem) -> bool,
    {
        let mut written = false;
        let mut failure = None;

        if (self.tester)(item) {
            if op(self.front.as_ref(), item) {
                written = true;
            } else {
                debug!("Composite front write failed for {}: {}", item.key(), self.front.error());
                failure = Some(self.front.last_error());
            }
        } else if !self.front.delete(item.key()) {
            debug!("Composite front evict failed for {}: {}", item.key(), self.front.error());
            failure = Some(self.front.last_error());
        }

        if op(self.back.as_ref(), item) {
            written = true;
        } else {
            debug!("Composite back write failed for {}: {}", item.key(), self.back.error());
            failure = Some(self.back.last_error());
        }

        if written {
            self.succeed()
        } else {
            self.fail(failure.unwrap_or_default())
        }
    }

    /// AND 정책: front 실패 시 back은 시도하지 않음
    fn both<F>(&self, op: F) -> bool
    where
        F: Fn(&dyn Driver) -> bool,
    {
        for side in [&self.front, &self.back] {
            if !op(side.as_ref()) {
                return self.fail(side.last_error());
            }
        }
        self.succeed()
    }

    /// OR 정책: 양쪽 모두 시도
    fn either<F>(&self, op: F) -> bool
    where
        F: Fn(&dyn Driver) -> bool,
    {
        let front_ok = op(self.front.as_ref());
        let back_ok = op(self.back.as_ref());

        if front_ok || back_ok {
            self.succeed()
        } else {
            self.fail(self.back.last_error())
        }
    }
}

impl ErrorAware for CompositeDriver {
    fn error_state(&self) -> &ErrorState {
        &self.errors
    }
}

impl Driver for CompositeDriver {
    fn name(&self) -> &'static str {
        "composite"
    }

    fn get(&self, key: &str) -> Option<Vec<u8>> {
        let side = if self.front_fresh(key).is_some() {
            &self.front
        } else {
            &self.back
        };

        let value = side.get(key);
        if value.is_none() {
            self.set_error(side.last_error());
        }
        value
    }

    fn has(&self, key: &str) -> i64 {
        match self.front_fresh(key) {
            Some(expire) => expire,
            None => self.back.has(key),
        }
    }

    fn save(&self, item: &CacheItem) -> bool {
        self.write_either(item, |driver, item| driver.save(item))
    }

    fn save_deferred(&self, item: &CacheItem) -> bool {
        self.write_either(item, |driver, item| driver.save_deferred(item))
    }

    fn commit(&self) -> bool {
        self.either(|driver| driver.commit())
    }

    fn delete(&self, key: &str) -> bool {
        self.both(|driver| driver.delete(key))
    }

    fn clear(&self) -> bool {
        self.both(|driver| driver.clear())
    }

    fn purge(&self, max_age: u64) -> bool {
        self.both(|driver| driver.purge(max_age))
    }

    fn ping(&self) -> bool {
        self.front.ping() || self.back.ping()
    }

    fn fallback(&self) -> Arc<dyn Driver> {
        fallback_or_null(&self.fallback)
    }
}

impl fmt::Debug for CompositeDriver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompositeDriver")
            .field("front", &self.front.name())
            .field("back", &self.back.name())
            .field("error", &self.errors.get())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::{MemoryDriver, NullDriver};
    use crate::item::CacheValue;
    use crate::pool::CachePool;
    use stash_foundation::{code, time, ErrorInfo};

    /// 쓰기/삭제가 항상 실패하는 driver
    struct BrokenDriver {
        errors: ErrorState,
    }

    impl BrokenDriver {
        fn new() -> Self {
            Self {
                errors: ErrorState::new(),
            }
        }
    }

    impl ErrorAware for BrokenDriver {
        fn error_state(&self) -> &ErrorState {
            &self.errors
        }
    }

    impl Driver for BrokenDriver {
        fn name(&self) -> &'static str {
            "broken"
        }
        fn get(&self, _key: &str) -> Option<Vec<u8>> {
            None
        }
        fn has(&self, _key: &str) -> i64 {
            0
        }
        fn save(&self, _item: &CacheItem) -> bool {
            self.fail(ErrorInfo::new("disk full", code::FAIL_WRITEFILE))
        }
        fn delete(&self, _key: &str) -> bool {
            self.fail(ErrorInfo::new("read only", code::FAIL_DELETE))
        }
        fn clear(&self) -> bool {
            self.fail(ErrorInfo::new("read only", code::FAIL_DELETE))
        }
        fn purge(&self, _max_age: u64) -> bool {
            self.fail(ErrorInfo::new("read only", code::FAIL_DELETE))
        }
        fn ping(&self) -> bool {
            false
        }
    }

    fn item(pool: &CachePool, key: &str, payload: &[u8]) -> CacheItem {
        let mut item = pool.get_item(key);
        item.set(payload.to_vec());
        item.expires_at_timestamp(time::now() + 60);
        item
    }

    fn scratch_pool() -> CachePool {
        CachePool::new(Arc::new(NullDriver::new())).unwrap()
    }

    #[test]
    fn test_reads_prefer_front() {
        let pool = scratch_pool();
        let front = Arc::new(MemoryDriver::new());
        let back = Arc::new(MemoryDriver::new());
        front.save(&item(&pool, "k", b"front"));
        back.save(&item(&pool, "k", b"back"));
        back.save(&item(&pool, "only-back", b"back"));

        let composite = CompositeDriver::new(front, back);
        assert_eq!(composite.get("k").as_deref(), Some(&b"front"[..]));
        assert_eq!(composite.get("only-back").as_deref(), Some(&b"back"[..]));
        assert!(composite.has("only-back") > 0);
        assert_eq!(composite.has("none"), 0);
    }

    #[test]
    fn test_save_succeeds_if_one_side_succeeds() {
        let pool = scratch_pool();
        let back = Arc::new(MemoryDriver::new());
        let composite = CompositeDriver::new(Arc::new(BrokenDriver::new()), back.clone());

        assert!(composite.save(&item(&pool, "k", b"v")));
        assert!(!composite.has_error());
        assert!(back.has("k") > 0);
    }

    #[test]
    fn test_save_fails_if_all_sides_fail() {
        let pool = scratch_pool();
        let composite = CompositeDriver::new(
            Arc::new(BrokenDriver::new()),
            Arc::new(BrokenDriver::new()),
        );

        assert!(!composite.save(&item(&pool, "k", b"v")));
        assert_eq!(composite.error(), "disk full");
        assert_eq!(composite.error_code(), code::FAIL_WRITEFILE);
    }

    #[test]
    fn test_tester_limits_front_writes() {
        let pool = scratch_pool();
        let front = Arc::new(MemoryDriver::new());
        let back = Arc::new(MemoryDriver::new());
        let composite =
            CompositeDriver::new(front.clone(), back.clone()).with_front_max_bytes(3);

        composite.save(&item(&pool, "small", b"abc"));
        composite.save(&item(&pool, "large", b"abcdef"));

        assert!(composite.front_has("small") > 0);
        assert_eq!(composite.front_has("large"), 0);
        assert!(composite.back_has("small") > 0);
        assert!(composite.back_has("large") > 0);
    }

    #[test]
    fn test_delete_requires_both() {
        let back = Arc::new(MemoryDriver::new());
        let composite = CompositeDriver::new(Arc::new(BrokenDriver::new()), back);

        assert!(!composite.delete("k"));
        assert_eq!(composite.error(), "read only");
        assert!(!composite.clear());
        assert!(!composite.purge(10));
    }

    #[test]
    fn test_clear_fails_when_back_fails() {
        let front = Arc::new(MemoryDriver::new());
        let composite = CompositeDriver::new(front.clone(), Arc::new(BrokenDriver::new()));
        let pool = scratch_pool();
        front.save(&item(&pool, "k", b"v"));

        assert!(!composite.clear());
        assert_eq!(composite.error(), "read only");
        assert_eq!(composite.error_code(), code::FAIL_DELETE);
        assert!(!composite.delete("k"));
        assert!(!composite.purge(10));
    }

    #[test]
    fn test_rejected_write_evicts_front() {
        let front = Arc::new(MemoryDriver::new());
        let back = Arc::new(MemoryDriver::new());
        let composite = Arc::new(
            CompositeDriver::new(front.clone(), back.clone()).with_front_max_bytes(64),
        );
        let pool = CachePool::new(composite).unwrap();

        let mut small = pool.get_item("k");
        small.set("old");
        assert!(pool.save(&small));
        assert!(front.has("k") > 0);

        let large = "x".repeat(1_000);
        let mut big = pool.get_item("k");
        big.set(large.as_str());
        assert!(pool.save(&big));

        assert_eq!(front.has("k"), 0);
        assert_eq!(pool.get_item("k").get(), Some(&CacheValue::from(large)));
    }

    #[test]
    fn test_expired_front_falls_through() {
        let pool = scratch_pool();
        let front = Arc::new(MemoryDriver::new());
        let back = Arc::new(MemoryDriver::new());

        let mut stale = item(&pool, "k", b"stale");
        stale.expires_at_timestamp(time::now() - 30);
        front.save(&stale);
        back.save(&item(&pool, "k", b"fresh"));

        let composite = CompositeDriver::new(front, back);
        assert!(composite.has("k") >= time::now());
        assert_eq!(composite.get("k").as_deref(), Some(&b"fresh"[..]));
    }

    #[test]
    fn test_ping_is_or() {
        let healthy = CompositeDriver::new(
            Arc::new(BrokenDriver::new()),
            Arc::new(MemoryDriver::new()),
        );
        assert!(healthy.ping());

        let dead = CompositeDriver::new(
            Arc::new(BrokenDriver::new()),
            Arc::new(BrokenDriver::new()),
        );
        assert!(!dead.ping());
    }
}
