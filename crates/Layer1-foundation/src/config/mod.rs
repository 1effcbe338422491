//! Config - 캐시 풀 설정 관리
//!
//! - `pool.rs` - PoolConfig, DriverSpec, ExtensionSpec, ItemConfig
//!
//! JSON과 TOML 둘 다 읽을 수 있으며, 파일 확장자로 형식을 고릅니다.

mod pool;

pub use pool::{DriverKind, DriverSpec, ExtensionSpec, FilesystemOptions, ItemConfig, PoolConfig};

use crate::{Error, Result};
use std::path::Path;

impl PoolConfig {
    // ========================================================================
    // Load
    // ========================================================================

    /// JSON 문자열에서 로드
    pub fn from_json_str(content: &str) -> Result<Self> {
        serde_json::from_str(content)
            .map_err(|e| Error::Config(format!("Failed to parse JSON config: {}", e)))
    }

    /// TOML 문자열에서 로드
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content)
            .map_err(|e| Error::Config(format!("Failed to parse TOML config: {}", e)))
    }

    /// 파일에서 로드 (`.toml`이면 TOML, 그 외는 JSON)
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read {}: {}", path.display(), e)))?;

        let is_toml = path
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("toml"))
            .unwrap_or(false);

        if is_toml {
            Self::from_toml_str(&content)
        } else {
            Self::from_json_str(&content)
        }
    }

    /// JSON으로 직렬화
    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
