//! Statistics Extension - hit/miss 집계

use crate::extension::{Extension, HookResult, Stage};
use crate::item::CacheItem;
use crate::pool::CachePool;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use stash_foundation::{Error, Result};
use std::any::Any;
use std::sync::atomic::{AtomicU64, Ordering};

/// 집계 결과
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StatisticsSnapshot {
    pub hits: u64,
    pub misses: u64,
    pub hit_rate: f64,
}

#[derive(Debug, Default)]
pub struct StatisticsExtension {
    hits: AtomicU64,
    misses: AtomicU64,
}

impl StatisticsExtension {
    pub const NAME: &'static str = "statistics";
    pub const STATISTICS: &'static str = "statistics";

    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> StatisticsSnapshot {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let total = hits + misses;
        StatisticsSnapshot {
            hits,
            misses,
            hit_rate: if total == 0 {
                0.0
            } else {
                hits as f64 / total as f64
            },
        }
    }

    pub fn reset(&self) {
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
    }
}

impl Extension for StatisticsExtension {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn stages(&self) -> Vec<(Stage, u8)> {
        vec![(Stage::PostHas, 80)]
    }

    fn invoke(&self, _pool: &CachePool, _stage: Stage, item: Option<&mut CacheItem>) -> HookResult {
        if let Some(item) = item {
            match item.hit_state() {
                Some(true) => self.hits.fetch_add(1, Ordering::Relaxed),
                _ => self.misses.fetch_add(1, Ordering::Relaxed),
            };
        }
        Ok(())
    }

    fn methods(&self) -> Vec<&'static str> {
        vec![Self::STATISTICS]
    }

    fn call(&self, _pool: &CachePool, method: &str, _args: &[Value]) -> Result<Value> {
        if method != Self::STATISTICS {
            return Err(Error::bad_method(Self::NAME, method));
        }
        Ok(serde_json::to_value(self.snapshot())?)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
