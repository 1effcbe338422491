//! Stampede Extension - 만료 직전 항목을 확률적으로 miss 처리
//!
//! 많은 요청이 같은 순간에 만료를 보고 동시에 재생성하는 것을 막기 위해,
//! 남은 수명이 `time_left`보다 짧으면 일부 요청만 먼저 miss로 봅니다.

use crate::extension::{roll, Extension, HookResult, Stage};
use crate::item::CacheItem;
use crate::pool::CachePool;
use stash_foundation::time;
use std::any::Any;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct StampedeExtension {
    probability: u32,
    divisor: u32,
    time_left: i64,
}

impl Default for StampedeExtension {
    fn default() -> Self {
        Self::new(50, 1000, 600)
    }
}

impl StampedeExtension {
    pub const NAME: &'static str = "stampede";

    pub fn new(probability: u32, divisor: u32, time_left: i64) -> Self {
        Self {
            probability,
            divisor,
            time_left,
        }
    }
}

impl Extension for StampedeExtension {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn stages(&self) -> Vec<(Stage, u8)> {
        vec![(Stage::PostHas, 50)]
    }

    fn invoke(&self, _pool: &CachePool, _stage: Stage, item: Option<&mut CacheItem>) -> HookResult {
        let Some(item) = item else {
            return Ok(());
        };

        if item.hit_state() == Some(true) {
            let left = item.expiration() - time::now();
            if left < self.time_left && roll(self.probability, self.divisor) {
                debug!("Early miss for {} ({}s left)", item.key(), left);
                item.set_hit(false);
            }
        }
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
