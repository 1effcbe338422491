//! Error types for Stash
//!
//! - `Error` - 설정/등록 단계에서 즉시 발생하는 구조화된 오류 (fault)
//! - `ErrorInfo` / `ErrorState` - 운영 중 실패를 `{message, code}` 쌍으로 전달
//! - `code` - 안정적인 숫자 메시지 코드

pub mod code;
mod context;

pub use context::{ErrorAware, ErrorInfo, ErrorState};

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Stash 설정 오류 타입
///
/// 운영 중 실패(디스크 I/O, 직렬화, hook 중단)는 여기에 속하지 않습니다.
/// 그런 실패는 `ErrorInfo`로 기록되고 `false`로 보고됩니다.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // 등록/구성 관련
    // ========================================================================
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Duplicate found: {0}")]
    DuplicateFound(String),

    #[error("Bad method call: {target} has no method \"{method}\"")]
    BadMethodCall { target: String, method: String },

    // ========================================================================
    // 설정 파일 관련
    // ========================================================================
    #[error("Configuration error: {0}")]
    Config(String),

    // ========================================================================
    // 외부 에러 변환
    // ========================================================================
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// 메시지 코드 반환
    pub fn code(&self) -> i64 {
        match self {
            Error::InvalidArgument(_) => code::INVALID_ARGUMENT,
            Error::DuplicateFound(_) => code::INVALID_EXT,
            Error::BadMethodCall { .. } => code::INVALID_METHOD,
            Error::Config(_) => code::INVALID_CONFIG,
            Error::Json(_) => code::FAIL_SERIALIZE,
        }
    }

    /// 알 수 없는 메서드 호출 에러 생성 헬퍼
    pub fn bad_method(target: impl Into<String>, method: impl Into<String>) -> Self {
        Error::BadMethodCall {
            target: target.into(),
            method: method.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(
            Error::DuplicateFound("x".into()).code(),
            code::INVALID_EXT
        );
        assert_eq!(
            Error::bad_method("CachePool", "nope").code(),
            code::INVALID_METHOD
        );
    }

    #[test]
    fn test_bad_method_message() {
        let err = Error::bad_method("CachePool", "clear_by_tag");
        assert_eq!(
            err.to_string(),
            "Bad method call: CachePool has no method \"clear_by_tag\""
        );
    }
}
