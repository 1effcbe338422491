//! # stash-foundation
//!
//! Foundation layer for Stash:
//! - Error: 설정 fault (`Error`) 와 운영 실패 컨텍스트 (`ErrorInfo`, `ErrorAware`)
//! - Config: PoolConfig, DriverSpec, ExtensionSpec (JSON / TOML)
//! - Time: Unix 타임스탬프 헬퍼

pub mod config;
pub mod error;
pub mod time;

// ============================================================================
// Error
// ============================================================================
pub use error::{code, Error, ErrorAware, ErrorInfo, ErrorState, Result};

// ============================================================================
// Config (설정)
// ============================================================================
pub use config::{DriverKind, DriverSpec, ExtensionSpec, FilesystemOptions, ItemConfig, PoolConfig};
