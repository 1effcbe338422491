//! 통합 테스트 공용 헬퍼

#![allow(dead_code)]

use parking_lot::Mutex;
use stash_core::{
    CacheItem, CachePool, Driver, ErrorAware, ErrorInfo, ErrorState, Extension, HookResult,
    MemoryDriver, Stage,
};
use std::any::Any;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

/// 테스트 로그 출력 (`RUST_LOG=debug cargo test`)
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

// ============================================================================
// ScriptedDriver - 호출 횟수 기록 + 실패 주입
// ============================================================================

/// MemoryDriver를 감싸 호출을 세고, 필요하면 실패를 흉내냅니다.
pub struct ScriptedDriver {
    inner: MemoryDriver,
    errors: ErrorState,
    pub has_calls: AtomicUsize,
    pub get_calls: AtomicUsize,
    pub save_calls: AtomicUsize,
    pub fail_writes: AtomicBool,
    pub fail_clear: AtomicBool,
    pub healthy: AtomicBool,
    fallback: Option<Arc<dyn Driver>>,
}

impl ScriptedDriver {
    pub fn new() -> Self {
        Self {
            inner: MemoryDriver::new(),
            errors: ErrorState::new(),
            has_calls: AtomicUsize::new(0),
            get_calls: AtomicUsize::new(0),
            save_calls: AtomicUsize::new(0),
            fail_writes: AtomicBool::new(false),
            fail_clear: AtomicBool::new(false),
            healthy: AtomicBool::new(true),
            fallback: None,
        }
    }

    pub fn unhealthy() -> Self {
        let driver = Self::new();
        driver.healthy.store(false, Ordering::SeqCst);
        driver
    }

    pub fn failing_writes() -> Self {
        let driver = Self::new();
        driver.fail_writes.store(true, Ordering::SeqCst);
        driver
    }

    pub fn with_fallback(mut self, fallback: Arc<dyn Driver>) -> Self {
        self.fallback = Some(fallback);
        self
    }

    pub fn count(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }
}

impl ErrorAware for ScriptedDriver {
    fn error_state(&self) -> &ErrorState {
        &self.errors
    }
}

impl Driver for ScriptedDriver {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn get(&self, key: &str) -> Option<Vec<u8>> {
        self.get_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.get(key)
    }

    fn has(&self, key: &str) -> i64 {
        self.has_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.has(key)
    }

    fn save(&self, item: &CacheItem) -> bool {
        self.save_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_writes.load(Ordering::SeqCst) {
            return self.fail(ErrorInfo::new("scripted write failure", 42));
        }
        if self.inner.save(item) {
            self.succeed()
        } else {
            self.fail(self.inner.last_error())
        }
    }

    fn save_deferred(&self, item: &CacheItem) -> bool {
        if self.fail_writes.load(Ordering::SeqCst) {
            return self.fail(ErrorInfo::new("scripted write failure", 42));
        }
        self.inner.save_deferred(item)
    }

    fn commit(&self) -> bool {
        self.inner.commit()
    }

    fn delete(&self, key: &str) -> bool {
        self.inner.delete(key)
    }

    fn clear(&self) -> bool {
        if self.fail_clear.load(Ordering::SeqCst) {
            return self.fail(ErrorInfo::new("scripted clear failure", 43));
        }
        self.inner.clear()
    }

    fn purge(&self, max_age: u64) -> bool {
        self.inner.purge(max_age)
    }

    fn ping(&self) -> bool {
        self.healthy.load(Ordering::SeqCst)
    }

    fn fallback(&self) -> Arc<dyn Driver> {
        match &self.fallback {
            Some(driver) => driver.clone(),
            None => Arc::new(stash_core::NullDriver::new()),
        }
    }
}

// ============================================================================
// RecordingExtension - 실행 순서 기록
// ============================================================================

pub type Log = Arc<Mutex<Vec<String>>>;

pub fn new_log() -> Log {
    Arc::new(Mutex::new(Vec::new()))
}

/// 실행될 때마다 로그에 이름을 남기는 extension
pub struct RecordingExtension {
    name: &'static str,
    stages: Vec<(Stage, u8)>,
    log: Log,
    failure: Option<ErrorInfo>,
}

impl RecordingExtension {
    pub fn new(name: &'static str, stages: Vec<(Stage, u8)>, log: &Log) -> Self {
        Self {
            name,
            stages,
            log: log.clone(),
            failure: None,
        }
    }

    pub fn failing(mut self, message: &str, code: i64) -> Self {
        self.failure = Some(ErrorInfo::new(message, code));
        self
    }
}

impl Extension for RecordingExtension {
    fn name(&self) -> &'static str {
        self.name
    }

    fn stages(&self) -> Vec<(Stage, u8)> {
        self.stages.clone()
    }

    fn invoke(&self, _pool: &CachePool, stage: Stage, _item: Option<&mut CacheItem>) -> HookResult {
        self.log.lock().push(format!("{}@{}", self.name, stage));
        match &self.failure {
            Some(info) => Err(info.clone()),
            None => Ok(()),
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
