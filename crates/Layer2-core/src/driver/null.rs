//! Null Driver - 저장하지 않고 항상 성공

use super::Driver;
use crate::item::CacheItem;
use stash_foundation::{ErrorAware, ErrorState};

/// 직렬화된 "값 없음"
const EMPTY_PAYLOAD: &[u8] = b"null";

/// 모든 fallback 체인의 끝
#[derive(Debug, Default)]
pub struct NullDriver {
    errors: ErrorState,
}

impl NullDriver {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ErrorAware for NullDriver {
    fn error_state(&self) -> &ErrorState {
        &self.errors
    }
}

impl Driver for NullDriver {
    fn name(&self) -> &'static str {
        "null"
    }

    fn get(&self, _key: &str) -> Option<Vec<u8>> {
        Some(EMPTY_PAYLOAD.to_vec())
    }

    fn has(&self, _key: &str) -> i64 {
        0
    }

    fn save(&self, _item: &CacheItem) -> bool {
        true
    }

    fn delete(&self, _key: &str) -> bool {
        true
    }

    fn clear(&self) -> bool {
        true
    }

    fn purge(&self, _max_age: u64) -> bool {
        true
    }

    fn ping(&self) -> bool {
        true
    }
}
