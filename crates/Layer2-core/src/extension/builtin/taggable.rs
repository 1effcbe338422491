//! Taggable Extension - 태그 단위 삭제
//!
//! 태그마다 보조 item(`THE_TAG_<tag>`)에 그 태그가 붙은 키 목록을 저장하고,
//! pool 메서드 `clear_by_tag`로 한 번에 삭제합니다.

use crate::extension::{Extension, HookResult, Stage};
use crate::item::CacheItem;
use crate::pool::CachePool;
use serde_json::Value;
use stash_foundation::{Error, ErrorAware, Result};
use std::any::Any;
use std::collections::BTreeSet;
use tracing::debug;

/// 태그 item 수명 (360일)
const TAG_LIFETIME: i64 = 86400 * 360;

#[derive(Debug, Default)]
pub struct TaggableExtension;

impl TaggableExtension {
    pub const NAME: &'static str = "taggable";
    pub const CLEAR_BY_TAG: &'static str = "clear_by_tag";

    pub fn new() -> Self {
        Self
    }

    /// 태그 item 키
    pub fn tag_key(tag: &str) -> String {
        format!("THE_TAG_{}", tag)
    }

    fn tagged_keys(item: &mut CacheItem) -> BTreeSet<String> {
        if !item.is_hit() {
            return BTreeSet::new();
        }
        item.get_as::<BTreeSet<String>>().unwrap_or_default()
    }

    fn store_keys(pool: &CachePool, tag_item: &mut CacheItem, keys: &BTreeSet<String>) -> bool {
        if tag_item.set_serialized(keys).is_err() {
            return false;
        }
        tag_item.expires_after(Some(TAG_LIFETIME));
        pool.save(tag_item)
    }

    /// 태그가 붙은 모든 키 삭제
    ///
    /// 일부 키를 삭제하지 못하면 남은 키를 태그 item에 다시 저장하고,
    /// 첫 실패의 에러를 pool에 남긴 채 `false`를 반환합니다.
    pub fn clear_by_tag(&self, pool: &CachePool, tag: &str) -> bool {
        let mut tag_item = pool.get_item(&Self::tag_key(tag));
        let keys = Self::tagged_keys(&mut tag_item);
        if keys.is_empty() {
            return pool.succeed();
        }

        let mut remaining = BTreeSet::new();
        let mut failure = None;
        for key in keys {
            if !pool.delete_item(&key) {
                if failure.is_none() {
                    failure = Some(pool.last_error());
                }
                remaining.insert(key);
            }
        }

        debug!(
            "Cleared tag {} ({} keys left)",
            tag,
            remaining.len()
        );

        match failure {
            None => pool.delete_item(tag_item.key()),
            Some(info) => {
                Self::store_keys(pool, &mut tag_item, &remaining);
                pool.fail(info)
            }
        }
    }
}

impl Extension for TaggableExtension {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn stages(&self) -> Vec<(Stage, u8)> {
        vec![(Stage::PostSave, 70), (Stage::PostDefer, 70)]
    }

    fn invoke(&self, pool: &CachePool, _stage: Stage, item: Option<&mut CacheItem>) -> HookResult {
        let Some(item) = item else {
            return Ok(());
        };

        let key = item.key().to_string();
        let tags: Vec<String> = item.tags().iter().cloned().collect();

        for tag in tags {
            let mut tag_item = pool.get_item(&Self::tag_key(&tag));
            let mut keys = Self::tagged_keys(&mut tag_item);
            keys.insert(key.clone());
            // 이미 있는 키여도 다시 저장해 태그 수명 갱신
            if !Self::store_keys(pool, &mut tag_item, &keys) {
                return Err(pool.last_error());
            }
        }
        Ok(())
    }

    fn methods(&self) -> Vec<&'static str> {
        vec![Self::CLEAR_BY_TAG]
    }

    fn call(&self, pool: &CachePool, method: &str, args: &[Value]) -> Result<Value> {
        if method != Self::CLEAR_BY_TAG {
            return Err(Error::bad_method(Self::NAME, method));
        }

        let tag = args
            .first()
            .and_then(Value::as_str)
            .ok_or_else(|| Error::InvalidArgument("clear_by_tag expects a tag string".into()))?;

        Ok(Value::Bool(self.clear_by_tag(pool, tag)))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
