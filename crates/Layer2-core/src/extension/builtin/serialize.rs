//! Serialize Extension - 값 <-> 바이트 변환
//!
//! 저장 전에는 item 값 전체(`Option<CacheValue>`)를 JSON 바이트로 바꾸고,
//! 조회 후에는 되돌립니다. 항상 로드되는 기본 extension입니다.

use crate::extension::{Extension, HookResult, Stage};
use crate::item::{CacheItem, CacheValue};
use crate::pool::CachePool;
use stash_foundation::{code, ErrorInfo};
use std::any::Any;

#[derive(Debug, Default)]
pub struct SerializeExtension;

impl SerializeExtension {
    pub const NAME: &'static str = "serialize";

    pub fn new() -> Self {
        Self
    }

    fn failure(item: &CacheItem) -> ErrorInfo {
        ErrorInfo::new(
            format!("Serialize/unserialize failed for \"{}\"", item.key()),
            code::FAIL_SERIALIZE,
        )
    }

    fn encode(item: &mut CacheItem) -> HookResult {
        let value = item.get().cloned();
        let bytes = serde_json::to_vec(&value).map_err(|_| Self::failure(item))?;
        item.set_value(Some(CacheValue::Bytes(bytes)));
        Ok(())
    }

    fn decode(item: &mut CacheItem) -> HookResult {
        if item.hit_state() != Some(true) {
            return Ok(());
        }

        let decoded = match item.payload() {
            Some(bytes) => serde_json::from_slice::<Option<CacheValue>>(bytes).ok(),
            None => None,
        };

        match decoded {
            Some(value) => {
                item.set_value(value);
                Ok(())
            }
            None => Err(Self::failure(item)),
        }
    }
}

impl Extension for SerializeExtension {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn stages(&self) -> Vec<(Stage, u8)> {
        vec![
            (Stage::PostGet, 50),
            (Stage::PreSave, 50),
            (Stage::PreDefer, 50),
        ]
    }

    fn invoke(&self, _pool: &CachePool, stage: Stage, item: Option<&mut CacheItem>) -> HookResult {
        let Some(item) = item else {
            return Ok(());
        };

        match stage {
            Stage::PostGet => Self::decode(item),
            _ => Self::encode(item),
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
