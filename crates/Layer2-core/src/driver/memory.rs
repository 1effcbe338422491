//! Memory Driver - 프로세스 내 저장소
//!
//! 지연 저장분은 별도 큐에 쌓였다가 `commit()`에서 반영됩니다.
//! 큐에 있는 항목도 `has`/`get`에서 보입니다.

use super::{fallback_or_null, payload_of, Driver};
use crate::item::CacheItem;
use parking_lot::{Mutex, RwLock};
use stash_foundation::{code, time, ErrorAware, ErrorInfo, ErrorState};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

#[derive(Debug, Clone)]
struct Entry {
    payload: Vec<u8>,
    expire_at: i64,
}

impl Entry {
    fn from_item(payload: &[u8], item: &CacheItem) -> Self {
        Self {
            payload: payload.to_vec(),
            expire_at: item.expiration(),
        }
    }
}

/// 호출 횟수 통계
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MemoryStats {
    pub has_calls: u64,
    pub get_calls: u64,
    pub save_calls: u64,
}

/// HashMap 기반 driver
pub struct MemoryDriver {
    entries: RwLock<HashMap<String, Entry>>,
    deferred: Mutex<HashMap<String, Entry>>,
    errors: ErrorState,
    fallback: Option<Arc<dyn Driver>>,
    has_calls: AtomicU64,
    get_calls: AtomicU64,
    save_calls: AtomicU64,
}

impl Default for MemoryDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryDriver {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            deferred: Mutex::new(HashMap::new()),
            errors: ErrorState::new(),
            fallback: None,
            has_calls: AtomicU64::new(0),
            get_calls: AtomicU64::new(0),
            save_calls: AtomicU64::new(0),
        }
    }

    pub fn with_fallback(mut self, fallback: Arc<dyn Driver>) -> Self {
        self.fallback = Some(fallback);
        self
    }

    /// 반영된 항목 수
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// 아직 반영되지 않은 지연 저장 수
    pub fn pending(&self) -> usize {
        self.deferred.lock().len()
    }

    pub fn stats(&self) -> MemoryStats {
        MemoryStats {
            has_calls: self.has_calls.load(Ordering::Relaxed),
            get_calls: self.get_calls.load(Ordering::Relaxed),
            save_calls: self.save_calls.load(Ordering::Relaxed),
        }
    }

    fn lookup<T>(&self, key: &str, f: impl Fn(&Entry) -> T) -> Option<T> {
        if let Some(entry) = self.deferred.lock().get(key) {
            return Some(f(entry));
        }
        self.entries.read().get(key).map(f)
    }
}

impl ErrorAware for MemoryDriver {
    fn error_state(&self) -> &ErrorState {
        &self.errors
    }
}

impl Driver for MemoryDriver {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn get(&self, key: &str) -> Option<Vec<u8>> {
        self.get_calls.fetch_add(1, Ordering::Relaxed);
        match self.lookup(key, |entry| entry.payload.clone()) {
            Some(payload) => {
                self.succeed();
                Some(payload)
            }
            None => {
                self.set_error(ErrorInfo::new(
                    format!("Key \"{}\" not found", key),
                    code::FAIL_READFILE,
                ));
                None
            }
        }
    }

    fn has(&self, key: &str) -> i64 {
        self.has_calls.fetch_add(1, Ordering::Relaxed);
        self.lookup(key, |entry| entry.expire_at).unwrap_or(0)
    }

    fn save(&self, item: &CacheItem) -> bool {
        self.save_calls.fetch_add(1, Ordering::Relaxed);
        let Some(payload) = payload_of(self, item) else {
            return false;
        };

        let entry = Entry::from_item(payload, item);
        self.deferred.lock().remove(item.key());
        self.entries.write().insert(item.key().to_string(), entry);
        self.succeed()
    }

    fn save_deferred(&self, item: &CacheItem) -> bool {
        let Some(payload) = payload_of(self, item) else {
            return false;
        };

        let entry = Entry::from_item(payload, item);
        self.deferred.lock().insert(item.key().to_string(), entry);
        self.succeed()
    }

    fn commit(&self) -> bool {
        let pending: Vec<_> = self.deferred.lock().drain().collect();
        if !pending.is_empty() {
            self.entries.write().extend(pending);
        }
        self.succeed()
    }

    fn delete(&self, key: &str) -> bool {
        self.deferred.lock().remove(key);
        self.entries.write().remove(key);
        self.succeed()
    }

    fn clear(&self) -> bool {
        self.deferred.lock().clear();
        self.entries.write().clear();
        self.succeed()
    }

    fn purge(&self, max_age: u64) -> bool {
        if max_age == 0 {
            return self.clear();
        }

        let threshold = time::seconds_ago(max_age);
        self.entries
            .write()
            .retain(|_, entry| entry.expire_at >= threshold);
        self.deferred
            .lock()
            .retain(|_, entry| entry.expire_at >= threshold);
        self.succeed()
    }

    fn ping(&self) -> bool {
        true
    }

    fn fallback(&self) -> Arc<dyn Driver> {
        fallback_or_null(&self.fallback)
    }
}
