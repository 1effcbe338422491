//! Pool Config - driver, extension, item 설정
//!
//! driver/extension은 문자열 클래스명이 아니라 태그된 enum으로 기술되므로
//! 사용 가능한 종류가 컴파일 시점에 고정됩니다.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

// ============================================================================
// PoolConfig (통합)
// ============================================================================

/// Cache pool 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolConfig {
    /// 저장소 driver
    #[serde(default)]
    pub driver: DriverSpec,

    /// driver ping 실패 시 fallback 허용 여부
    #[serde(default = "default_allow_fallback")]
    pub allow_fallback: bool,

    /// 기본 serialize 외에 추가로 로드할 extension
    #[serde(default)]
    pub extensions: Vec<ExtensionSpec>,

    /// item 기본값
    #[serde(default)]
    pub item: ItemConfig,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            driver: DriverSpec::default(),
            allow_fallback: default_allow_fallback(),
            extensions: Vec::new(),
            item: ItemConfig::default(),
        }
    }
}

impl PoolConfig {
    pub fn new(driver: DriverSpec) -> Self {
        Self {
            driver,
            ..Default::default()
        }
    }

    pub fn with_extension(mut self, ext: ExtensionSpec) -> Self {
        self.extensions.push(ext);
        self
    }

    pub fn with_ttl(mut self, ttl: i64) -> Self {
        self.item.ttl = ttl;
        self
    }
}

fn default_allow_fallback() -> bool {
    true
}

// ============================================================================
// ItemConfig
// ============================================================================

/// Item 기본 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemConfig {
    /// 기본 TTL (초)
    #[serde(default = "default_ttl")]
    pub ttl: i64,
}

impl Default for ItemConfig {
    fn default() -> Self {
        Self { ttl: default_ttl() }
    }
}

fn default_ttl() -> i64 {
    28800
}

// ============================================================================
// DriverSpec
// ============================================================================

/// Driver 설정 (fallback 체인 포함)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriverSpec {
    #[serde(flatten)]
    pub kind: DriverKind,

    /// ping 실패 시 대신 설치할 driver
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback: Option<Box<DriverSpec>>,
}

impl Default for DriverSpec {
    fn default() -> Self {
        Self::new(DriverKind::Filesystem(FilesystemOptions::default()))
    }
}

impl DriverSpec {
    pub fn new(kind: DriverKind) -> Self {
        Self {
            kind,
            fallback: None,
        }
    }

    pub fn null() -> Self {
        Self::new(DriverKind::Null)
    }

    pub fn memory() -> Self {
        Self::new(DriverKind::Memory)
    }

    pub fn filesystem(options: FilesystemOptions) -> Self {
        Self::new(DriverKind::Filesystem(options))
    }

    pub fn composite(front: DriverSpec, back: DriverSpec) -> Self {
        Self::new(DriverKind::Composite {
            front: Box::new(front),
            back: Box::new(back),
            front_max_bytes: None,
        })
    }

    pub fn with_fallback(mut self, fallback: DriverSpec) -> Self {
        self.fallback = Some(Box::new(fallback));
        self
    }
}

/// Driver 종류
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DriverKind {
    /// 아무것도 저장하지 않는 driver (최종 fallback)
    Null,

    /// 프로세스 내 메모리 driver
    Memory,

    /// 해시 경로 파일 저장소
    Filesystem(FilesystemOptions),

    /// front + back 2단 driver
    Composite {
        front: Box<DriverSpec>,
        back: Box<DriverSpec>,
        /// 설정 시 직렬화된 크기가 이 값 이하인 item만 front에도 기록
        #[serde(default, skip_serializing_if = "Option::is_none")]
        front_max_bytes: Option<usize>,
    },
}

impl DriverKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Memory => "memory",
            Self::Filesystem(_) => "filesystem",
            Self::Composite { .. } => "composite",
        }
    }
}

/// Filesystem driver 옵션
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilesystemOptions {
    /// 루트 디렉토리 (없으면 사용자 캐시 디렉토리/stash)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root: Option<PathBuf>,

    /// 해시 하위 디렉토리 단계 (0-5)
    #[serde(default = "default_hash_level")]
    pub hash_level: usize,

    /// 파일명 접두사
    #[serde(default)]
    pub prefix: String,

    /// 파일명 접미사
    #[serde(default)]
    pub suffix: String,
}

impl Default for FilesystemOptions {
    fn default() -> Self {
        Self {
            root: None,
            hash_level: default_hash_level(),
            prefix: String::new(),
            suffix: String::new(),
        }
    }
}

impl FilesystemOptions {
    pub fn at(root: impl Into<PathBuf>) -> Self {
        Self {
            root: Some(root.into()),
            ..Default::default()
        }
    }

    pub fn with_hash_level(mut self, level: usize) -> Self {
        self.hash_level = level;
        self
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    pub fn with_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.suffix = suffix.into();
        self
    }
}

fn default_hash_level() -> usize {
    2
}

// ============================================================================
// ExtensionSpec
// ============================================================================

/// Extension 설정
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "name", rename_all = "snake_case")]
pub enum ExtensionSpec {
    Serialize,

    /// base64 변환 (기본 encrypt/decrypt 함수)
    Encrypt,

    Bypass {
        /// 요청 컨텍스트에서 찾을 키, 빈 문자열이면 항상 우회
        #[serde(default = "default_bypass_trigger")]
        trigger: String,
        /// 우회 시 기록할 메시지, 빈 문자열이면 에러를 남기지 않음
        #[serde(default = "default_bypass_message")]
        message: String,
    },

    Stampede {
        #[serde(default = "default_stampede_probability")]
        probability: u32,
        #[serde(default = "default_divisor")]
        divisor: u32,
        /// 남은 수명이 이 값(초)보다 작을 때만 동작
        #[serde(default = "default_time_left")]
        time_left: i64,
    },

    DistributeMiss {
        /// 천분율 (50 = ±5%)
        #[serde(default = "default_distribution")]
        distribution: u32,
    },

    CommitDeferred {
        #[serde(default = "default_commit_probability")]
        probability: u32,
        #[serde(default = "default_divisor")]
        divisor: u32,
    },

    GarbageCollect {
        #[serde(default = "default_gc_probability")]
        probability: u32,
        #[serde(default = "default_divisor")]
        divisor: u32,
        #[serde(default = "default_max_lifetime")]
        max_lifetime: u64,
    },

    Taggable,

    Statistics,
}

impl ExtensionSpec {
    pub fn bypass() -> Self {
        Self::Bypass {
            trigger: default_bypass_trigger(),
            message: default_bypass_message(),
        }
    }

    pub fn stampede() -> Self {
        Self::Stampede {
            probability: default_stampede_probability(),
            divisor: default_divisor(),
            time_left: default_time_left(),
        }
    }

    pub fn distribute_miss() -> Self {
        Self::DistributeMiss {
            distribution: default_distribution(),
        }
    }

    pub fn commit_deferred() -> Self {
        Self::CommitDeferred {
            probability: default_commit_probability(),
            divisor: default_divisor(),
        }
    }

    pub fn garbage_collect() -> Self {
        Self::GarbageCollect {
            probability: default_gc_probability(),
            divisor: default_divisor(),
            max_lifetime: default_max_lifetime(),
        }
    }
}

fn default_bypass_trigger() -> String {
    "nocache".to_string()
}

fn default_bypass_message() -> String {
    "bypass cache".to_string()
}

fn default_divisor() -> u32 {
    1000
}

fn default_stampede_probability() -> u32 {
    50
}

fn default_time_left() -> i64 {
    600
}

fn default_distribution() -> u32 {
    50
}

fn default_commit_probability() -> u32 {
    100
}

fn default_gc_probability() -> u32 {
    3
}

fn default_max_lifetime() -> u64 {
    86400
}
