//! CommitDeferred Extension - 지연 저장 후 확률적으로 driver commit

use crate::extension::{roll, Extension, HookResult, Stage};
use crate::item::CacheItem;
use crate::pool::CachePool;
use std::any::Any;
use tracing::{info, warn};

#[derive(Debug, Clone)]
pub struct CommitDeferredExtension {
    probability: u32,
    divisor: u32,
}

impl Default for CommitDeferredExtension {
    fn default() -> Self {
        Self::new(100, 1000)
    }
}

impl CommitDeferredExtension {
    pub const NAME: &'static str = "commit_deferred";

    pub fn new(probability: u32, divisor: u32) -> Self {
        Self {
            probability,
            divisor,
        }
    }
}

impl Extension for CommitDeferredExtension {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn stages(&self) -> Vec<(Stage, u8)> {
        vec![(Stage::PostDefer, 90)]
    }

    fn invoke(&self, pool: &CachePool, _stage: Stage, _item: Option<&mut CacheItem>) -> HookResult {
        if roll(self.probability, self.divisor) {
            info!("Committing deferred items");
            let driver = pool.driver();
            if !driver.commit() {
                warn!("Deferred commit failed: {}", driver.error());
            }
        }
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::MemoryDriver;
    use std::sync::Arc;

    fn deferred_pool(ext: CommitDeferredExtension) -> (CachePool, Arc<MemoryDriver>) {
        let driver = Arc::new(MemoryDriver::new());
        let pool = CachePool::builder()
            .driver(driver.clone())
            .extension(Arc::new(ext))
            .build()
            .unwrap();
        (pool, driver)
    }

    #[test]
    fn test_always_commit() {
        let (pool, driver) = deferred_pool(CommitDeferredExtension::new(1000, 1000));
        let mut item = pool.get_item("k");
        item.set("v");
        assert!(pool.save_deferred(&item));
        assert_eq!(driver.pending(), 0);
        assert_eq!(driver.len(), 1);
    }

    #[test]
    fn test_never_commit() {
        let (pool, driver) = deferred_pool(CommitDeferredExtension::new(0, 1000));
        let mut item = pool.get_item("k");
        item.set("v");
        assert!(pool.save_deferred(&item));
        assert_eq!(driver.pending(), 1);
    }
}
