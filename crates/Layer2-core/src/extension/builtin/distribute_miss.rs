//! DistributeMiss Extension - 만료 시각을 무작위로 흩뜨림
//!
//! 같은 TTL로 한꺼번에 저장된 항목들이 같은 순간에 만료되지 않도록
//! 남은 수명을 ±`distribution`‰ 범위에서 조정합니다.

use crate::extension::{Extension, HookResult, Stage};
use crate::item::CacheItem;
use crate::pool::CachePool;
use rand::Rng;
use stash_foundation::time;
use std::any::Any;

#[derive(Debug, Clone)]
pub struct DistributeMissExtension {
    /// 천분율 (50 = ±5%)
    distribution: u32,
}

impl Default for DistributeMissExtension {
    fn default() -> Self {
        Self::new(50)
    }
}

impl DistributeMissExtension {
    pub const NAME: &'static str = "distribute_miss";

    pub fn new(distribution: u32) -> Self {
        Self { distribution }
    }

    /// 조정된 남은 수명
    fn spread(&self, left: i64) -> i64 {
        let d = i64::from(self.distribution);
        if d == 0 {
            return left;
        }
        let offset = rand::thread_rng().gen_range(0..=d * 2) - d;
        let percent = offset as f64 * 0.001;
        (left as f64 + left as f64 * percent).round() as i64
    }
}

impl Extension for DistributeMissExtension {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn stages(&self) -> Vec<(Stage, u8)> {
        vec![(Stage::PreSave, 20), (Stage::PreDefer, 20)]
    }

    fn invoke(&self, _pool: &CachePool, _stage: Stage, item: Option<&mut CacheItem>) -> HookResult {
        let Some(item) = item else {
            return Ok(());
        };

        let now = time::now();
        let left = item.expiration() - now;
        item.expires_at_timestamp(now + self.spread(left));
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
