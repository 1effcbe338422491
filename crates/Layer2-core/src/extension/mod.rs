//! Extension - 단계별 hook 시스템
//!
//! - `Stage` - 작업 생명주기의 hook 지점
//! - `Extension` - 하나 이상의 (stage, priority)에 묶인 hook 묶음
//! - `pipeline` - priority 순서 실행과 pool 메서드 등록
//! - `builtin` - 기본 제공 extension
//!
//! hook이 `Err`를 반환하면 해당 단계가 즉시 중단되고 그 에러가 pool로 복사됩니다.

pub mod builtin;
mod pipeline;

pub use pipeline::ExtensionPipeline;

use crate::item::CacheItem;
use crate::pool::CachePool;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use stash_foundation::{Error, ErrorInfo, Result};
use std::any::Any;
use std::fmt;

/// hook 실행 결과 (`Err`이면 단계 중단)
pub type HookResult = std::result::Result<(), ErrorInfo>;

// ============================================================================
// Stage - hook 지점
// ============================================================================

/// 작업 생명주기 단계
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// 모든 단계 (wildcard)
    All,

    /// pool 생성 직후
    Init,
    /// pool 종료 시
    End,

    PreHas,
    PostHas,

    PreGet,
    PostGet,

    PreSave,
    PostSave,

    PreClear,
    PostClear,

    PreDelete,
    PostDelete,

    PreDefer,
    PostDefer,

    PreCommit,
    PostCommit,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Init => "init",
            Self::End => "end",
            Self::PreHas => "pre_has",
            Self::PostHas => "post_has",
            Self::PreGet => "pre_get",
            Self::PostGet => "post_get",
            Self::PreSave => "pre_save",
            Self::PostSave => "post_save",
            Self::PreClear => "pre_clear",
            Self::PostClear => "post_clear",
            Self::PreDelete => "pre_delete",
            Self::PostDelete => "post_delete",
            Self::PreDefer => "pre_defer",
            Self::PostDefer => "post_defer",
            Self::PreCommit => "pre_commit",
            Self::PostCommit => "post_commit",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Extension trait
// ============================================================================

/// Pool extension
///
/// 같은 `name()`을 가진 extension은 한 pool에 한 번만 등록됩니다.
pub trait Extension: Send + Sync {
    /// 고유 이름 (기본: 타입 이름)
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// 참여할 (단계, 우선순위) 목록, 우선순위는 낮을수록 먼저 실행
    fn stages(&self) -> Vec<(Stage, u8)>;

    /// hook 실행
    ///
    /// 작업 대상 item이 있는 단계에서는 `item`이 `Some`입니다
    /// (has/get/save/defer/delete). clear/commit/init/end는 `None`.
    fn invoke(&self, pool: &CachePool, stage: Stage, item: Option<&mut CacheItem>) -> HookResult;

    /// pool에 노출할 메서드 이름
    fn methods(&self) -> Vec<&'static str> {
        Vec::new()
    }

    /// `CachePool::call`로 전달된 메서드 실행
    fn call(&self, _pool: &CachePool, method: &str, _args: &[Value]) -> Result<Value> {
        Err(Error::bad_method(self.name(), method))
    }

    /// 다운캐스팅 지원
    fn as_any(&self) -> &dyn Any;
}

/// `probability / divisor` 확률로 true
pub(crate) fn roll(probability: u32, divisor: u32) -> bool {
    use rand::Rng;

    if divisor == 0 || probability == 0 {
        return false;
    }
    if probability >= divisor {
        return true;
    }
    rand::thread_rng().gen_range(1..=divisor) <= probability
}
