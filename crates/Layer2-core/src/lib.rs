//! stash-core: Cache Pool Runtime
//!
//! Layer2 - 캐시 pool, driver, extension 구현 레이어
//!
//! # 주요 모듈
//!
//! - `pool`: CachePool / CachePoolBuilder (item 생성, 저장, 삭제)
//! - `item`: CacheItem (지연 조회, 만료, 태그)
//! - `driver`: 저장소 driver (null, memory, filesystem, composite)
//! - `extension`: 단계별 hook 파이프라인과 기본 extension
//! - `registry`: 설정 기술자 -> driver/extension 생성
//! - `quick`: 함수 결과 memoization
//!
//! # 사용 예시
//!
//! ```ignore
//! use stash_core::{CachePool, MemoryDriver, TaggableExtension};
//!
//! let pool = CachePool::builder()
//!     .driver(Arc::new(MemoryDriver::new()))
//!     .extension(Arc::new(TaggableExtension::new()))
//!     .build()?;
//!
//! let mut item = pool.get_item("user:1");
//! if !item.is_hit() {
//!     item.set(json!({"name": "kim"})).add_tag("users");
//!     pool.save(&item);
//! }
//!
//! // 태그 단위 삭제
//! pool.call("clear_by_tag", &[json!("users")])?;
//! ```

pub mod context;
pub mod driver;
pub mod extension;
pub mod item;
pub mod pool;
pub mod quick;
pub mod registry;

// Re-exports: Pool / Item
pub use context::RequestContext;
pub use item::{CacheItem, CacheValue};
pub use pool::{CachePool, CachePoolBuilder, ItemFactory, MAX_FALLBACK_DEPTH};
pub use quick::QuickCache;

// Re-exports: Driver
pub use driver::{
    CompositeDriver, Driver, FilesystemDriver, MemoryDriver, MemoryStats, NullDriver, WriteTester,
};

// Re-exports: Extension
pub use extension::builtin::{
    BypassExtension, CipherFn, CommitDeferredExtension, DistributeMissExtension,
    EncryptExtension, GarbageCollectExtension, SerializeExtension, StampedeExtension,
    StatisticsExtension, StatisticsSnapshot, TaggableExtension,
};
pub use extension::{Extension, ExtensionPipeline, HookResult, Stage};

// Re-exports: Foundation
pub use stash_foundation::{
    code, DriverKind, DriverSpec, Error, ErrorAware, ErrorInfo, ErrorState, ExtensionSpec,
    FilesystemOptions, ItemConfig, PoolConfig, Result,
};
