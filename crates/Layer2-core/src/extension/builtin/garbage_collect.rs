//! GarbageCollect Extension - 조회 후 확률적으로 오래 만료된 항목 정리

use crate::extension::{roll, Extension, HookResult, Stage};
use crate::item::CacheItem;
use crate::pool::CachePool;
use std::any::Any;
use tracing::{info, warn};

#[derive(Debug, Clone)]
pub struct GarbageCollectExtension {
    probability: u32,
    divisor: u32,
    /// 만료 후 이 시간(초)이 지난 항목 제거
    max_lifetime: u64,
}

impl Default for GarbageCollectExtension {
    fn default() -> Self {
        Self::new(3, 1000, 86400)
    }
}

impl GarbageCollectExtension {
    pub const NAME: &'static str = "garbage_collect";

    pub fn new(probability: u32, divisor: u32, max_lifetime: u64) -> Self {
        Self {
            probability,
            divisor,
            max_lifetime,
        }
    }
}

impl Extension for GarbageCollectExtension {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn stages(&self) -> Vec<(Stage, u8)> {
        vec![(Stage::PostGet, 95)]
    }

    fn invoke(&self, pool: &CachePool, _stage: Stage, _item: Option<&mut CacheItem>) -> HookResult {
        if roll(self.probability, self.divisor) {
            info!("Garbage collection started (max lifetime {}s)", self.max_lifetime);
            let driver = pool.driver();
            if !driver.purge(self.max_lifetime) {
                warn!("Garbage collection failed: {}", driver.error());
            }
        }
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
