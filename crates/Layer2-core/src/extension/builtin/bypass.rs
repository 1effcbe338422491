//! Bypass Extension - 요청 컨텍스트에 트리거가 있으면 모든 단계 중단

use crate::extension::{Extension, HookResult, Stage};
use crate::item::CacheItem;
use crate::pool::CachePool;
use stash_foundation::{code, ErrorInfo};
use std::any::Any;

#[derive(Debug, Clone)]
pub struct BypassExtension {
    /// 빈 문자열이면 항상 우회
    trigger: String,
    /// 빈 문자열이면 에러 메시지 없이 중단
    message: String,
}

impl Default for BypassExtension {
    fn default() -> Self {
        Self::new("nocache", "bypass cache")
    }
}

impl BypassExtension {
    pub const NAME: &'static str = "bypass";

    pub fn new(trigger: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            trigger: trigger.into(),
            message: message.into(),
        }
    }

    fn triggered(&self, pool: &CachePool) -> bool {
        self.trigger.is_empty() || pool.context().is_truthy(&self.trigger)
    }
}

impl Extension for BypassExtension {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn stages(&self) -> Vec<(Stage, u8)> {
        vec![(Stage::All, 0)]
    }

    fn invoke(&self, pool: &CachePool, _stage: Stage, _item: Option<&mut CacheItem>) -> HookResult {
        if !self.triggered(pool) {
            return Ok(());
        }

        if self.message.is_empty() {
            Err(ErrorInfo::default())
        } else {
            Err(ErrorInfo::new(self.message.clone(), code::BYPASS))
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
