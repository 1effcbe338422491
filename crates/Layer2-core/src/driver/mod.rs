//! Driver - 저장소 백엔드 추상화
//!
//! - `null` - 아무것도 저장하지 않는 최종 fallback
//! - `memory` - 프로세스 내 HashMap 저장소
//! - `filesystem` - 해시 경로 기반 파일 저장소
//! - `composite` - front/back 2단 저장소
//!
//! driver는 바이트만 다룹니다. 값 변환은 serialize extension의 몫입니다.
//! 실패는 panic이나 `Result`가 아니라 `false`/`None`/`0` 반환과
//! `ErrorAware` 에러 상태로 보고됩니다.

mod composite;
mod filesystem;
mod memory;
mod null;

pub use composite::{CompositeDriver, WriteTester};
pub use filesystem::{FilesystemDriver, MAX_HASH_LEVEL};
pub use memory::{MemoryDriver, MemoryStats};
pub use null::NullDriver;

use crate::item::CacheItem;
use stash_foundation::{code, ErrorAware, ErrorInfo};
use std::sync::Arc;

// ============================================================================
// Driver trait
// ============================================================================

/// 저장소 driver
pub trait Driver: ErrorAware + Send + Sync {
    /// 로그용 driver 이름
    fn name(&self) -> &'static str;

    /// 저장된 바이트 조회
    fn get(&self, key: &str) -> Option<Vec<u8>>;

    /// 만료 시각 (Unix 초), 없으면 0
    ///
    /// 만료 여부는 판단하지 않습니다. 호출자가 현재 시각과 비교합니다.
    fn has(&self, key: &str) -> i64;

    /// item의 바이트 값을 만료 시각과 함께 저장
    fn save(&self, item: &CacheItem) -> bool;

    /// 지연 저장 (기본: 즉시 저장)
    fn save_deferred(&self, item: &CacheItem) -> bool {
        self.save(item)
    }

    /// 지연 저장분 반영
    fn commit(&self) -> bool {
        true
    }

    /// 키 삭제 (없는 키는 성공)
    fn delete(&self, key: &str) -> bool;

    /// 전체 삭제
    fn clear(&self) -> bool;

    /// 만료된 지 `max_age`초 넘은 항목 제거
    fn purge(&self, max_age: u64) -> bool;

    /// 사용 가능한지 확인
    fn ping(&self) -> bool;

    /// ping 실패 시 대신 사용할 driver
    fn fallback(&self) -> Arc<dyn Driver> {
        Arc::new(NullDriver::new())
    }
}

// ============================================================================
// 공통 헬퍼
// ============================================================================

/// 설정된 fallback, 없으면 NullDriver
pub(crate) fn fallback_or_null(fallback: &Option<Arc<dyn Driver>>) -> Arc<dyn Driver> {
    match fallback {
        Some(driver) => driver.clone(),
        None => Arc::new(NullDriver::new()),
    }
}

/// item에서 저장할 바이트 추출, 바이트가 아니면 driver 에러 기록
pub(crate) fn payload_of<'a>(driver: &dyn Driver, item: &'a CacheItem) -> Option<&'a [u8]> {
    let payload = item.payload();
    if payload.is_none() {
        driver.set_error(ErrorInfo::new(
            format!("Value of \"{}\" is not serialized", item.key()),
            code::FAIL_SERIALIZE,
        ));
    }
    payload
}
