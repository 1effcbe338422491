//! Error Context - 상태를 가진 객체가 들고 다니는 `{message, code}` 쌍
//!
//! 성공하면 지워지고 실패하면 가장 깊은 곳의 원인이 위로 복사됩니다.

use parking_lot::Mutex;
use std::fmt;

// ============================================================================
// ErrorInfo
// ============================================================================

/// 실패 메시지와 코드
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorInfo {
    pub message: String,
    pub code: i64,
}

impl ErrorInfo {
    pub fn new(message: impl Into<String>, code: i64) -> Self {
        Self {
            message: message.into(),
            code,
        }
    }

    /// 에러가 기록되어 있는지
    pub fn is_set(&self) -> bool {
        !self.message.is_empty() || self.code != 0
    }
}

impl fmt::Display for ErrorInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

// ============================================================================
// ErrorState - `&self`로 기록 가능한 에러 저장소
// ============================================================================

#[derive(Debug, Default)]
pub struct ErrorState {
    inner: Mutex<ErrorInfo>,
}

impl ErrorState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> ErrorInfo {
        self.inner.lock().clone()
    }

    pub fn set(&self, info: ErrorInfo) {
        *self.inner.lock() = info;
    }

    pub fn clear(&self) {
        *self.inner.lock() = ErrorInfo::default();
    }
}

// ============================================================================
// ErrorAware trait
// ============================================================================

/// 에러 상태를 노출하는 객체 (driver, pool)
pub trait ErrorAware {
    fn error_state(&self) -> &ErrorState;

    /// 마지막 에러 메시지
    fn error(&self) -> String {
        self.error_state().get().message
    }

    /// 마지막 에러 코드
    fn error_code(&self) -> i64 {
        self.error_state().get().code
    }

    fn has_error(&self) -> bool {
        self.error_state().get().is_set()
    }

    fn last_error(&self) -> ErrorInfo {
        self.error_state().get()
    }

    fn set_error(&self, info: ErrorInfo) {
        self.error_state().set(info);
    }

    fn clear_error(&self) {
        self.error_state().clear();
    }

    /// 에러를 기록하고 `false` 반환
    fn fail(&self, info: ErrorInfo) -> bool {
        self.set_error(info);
        false
    }

    /// 에러를 지우고 `true` 반환
    fn succeed(&self) -> bool {
        self.clear_error();
        true
    }
}
