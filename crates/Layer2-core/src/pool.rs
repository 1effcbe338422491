//! Cache Pool - item 생성, 저장, 삭제와 extension 실행
//!
//! 모든 작업은 같은 모양을 따릅니다:
//! 1. pre 단계 실행 (실패 시 중단)
//! 2. driver 호출 (실패 시 driver 에러를 pool로 복사)
//! 3. post 단계 실행
//!
//! `CachePool`은 `Arc` 핸들이라 복제 비용이 작고, item이 자신을 만든 pool을
//! 참조할 때도 이 핸들을 사용합니다.

use crate::context::RequestContext;
use crate::driver::{Driver, FilesystemDriver, NullDriver};
use crate::extension::builtin::SerializeExtension;
use crate::extension::{Extension, ExtensionPipeline, Stage};
use crate::item::CacheItem;
use crate::registry;
use parking_lot::RwLock;
use serde_json::Value;
use stash_foundation::{
    code, Error, ErrorAware, ErrorInfo, ErrorState, ExtensionSpec, FilesystemOptions, ItemConfig,
    PoolConfig, Result,
};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// fallback 체인 최대 깊이 (이후에는 NullDriver)
pub const MAX_FALLBACK_DEPTH: usize = 8;

/// 사용자 정의 item 생성 함수
pub type ItemFactory = Arc<dyn Fn(&str, &CachePool, &ItemConfig) -> CacheItem + Send + Sync>;

// ============================================================================
// CachePool
// ============================================================================

/// Cache pool 핸들
#[derive(Clone)]
pub struct CachePool {
    inner: Arc<PoolInner>,
}

struct PoolInner {
    driver: RwLock<Arc<dyn Driver>>,
    pipeline: ExtensionPipeline,
    errors: ErrorState,
    item_config: ItemConfig,
    item_factory: Option<ItemFactory>,
    context: RwLock<RequestContext>,
}

impl Drop for PoolInner {
    fn drop(&mut self) {
        let driver = self.driver.read().clone();
        if !driver.commit() {
            warn!("Failed to commit deferred items on drop: {}", driver.error());
        }
    }
}

impl CachePool {
    /// driver로 pool 생성 (fallback 허용, 기본 extension만)
    pub fn new(driver: Arc<dyn Driver>) -> Result<Self> {
        CachePoolBuilder::new().driver(driver).build()
    }

    pub fn builder() -> CachePoolBuilder {
        CachePoolBuilder::new()
    }

    /// 설정으로부터 pool 생성
    pub fn from_config(config: &PoolConfig) -> Result<Self> {
        let driver = registry::build_driver(&config.driver)?;

        let mut builder = CachePoolBuilder::new()
            .driver(driver)
            .allow_fallback(config.allow_fallback)
            .item_config(config.item.clone());

        // serialize는 항상 로드됨
        for spec in config
            .extensions
            .iter()
            .filter(|spec| **spec != ExtensionSpec::Serialize)
        {
            builder = builder.extension(registry::build_extension(spec));
        }

        builder.build()
    }

    // ========================================================================
    // Driver
    // ========================================================================

    /// 현재 driver
    pub fn driver(&self) -> Arc<dyn Driver> {
        self.inner.driver.read().clone()
    }

    /// driver 교체
    ///
    /// ping에 실패하면 `allow_fallback`일 때 fallback 체인을 따라가고
    /// (마지막은 NullDriver), 아니면 `InvalidArgument`를 반환합니다.
    /// fallback으로 대체되면 pool 에러에 `FAIL_DRIVER`가 남습니다.
    pub fn set_driver(&self, driver: Arc<dyn Driver>, allow_fallback: bool) -> Result<()> {
        let requested = driver.name();
        let mut candidate = driver;
        let mut depth = 0;

        loop {
            if candidate.ping() {
                debug!("Driver installed: {}", candidate.name());
                if depth > 0 {
                    self.set_error(ErrorInfo::new(
                        format!(
                            "Driver \"{}\" failed, using \"{}\"",
                            requested,
                            candidate.name()
                        ),
                        code::FAIL_DRIVER,
                    ));
                }
                *self.inner.driver.write() = candidate;
                return Ok(());
            }

            if !allow_fallback {
                return Err(Error::InvalidArgument(format!(
                    "Driver \"{}\" failed to ping: {}",
                    candidate.name(),
                    candidate.error()
                )));
            }

            let fallback: Arc<dyn Driver> = if depth >= MAX_FALLBACK_DEPTH {
                Arc::new(NullDriver::new())
            } else {
                candidate.fallback()
            };

            warn!(
                "Driver \"{}\" failed ({}), falling back to \"{}\"",
                candidate.name(),
                candidate.error(),
                fallback.name()
            );

            candidate = fallback;
            depth += 1;
        }
    }

    // ========================================================================
    // Item 조회
    // ========================================================================

    /// item 생성 (저장소에는 아직 접근하지 않음)
    pub fn get_item(&self, key: &str) -> CacheItem {
        let key = key.trim();
        match &self.inner.item_factory {
            Some(factory) => factory(key, self, &self.inner.item_config),
            None => CacheItem::new(key, self, &self.inner.item_config),
        }
    }

    /// 여러 item 생성
    pub fn get_items<I, S>(&self, keys: I) -> HashMap<String, CacheItem>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        keys.into_iter()
            .map(|key| {
                let item = self.get_item(key.as_ref());
                (item.key().to_string(), item)
            })
            .collect()
    }

    /// 유효한 값이 있는지
    pub fn has_item(&self, key: &str) -> bool {
        self.get_item(key).is_hit()
    }

    // ========================================================================
    // 저장
    // ========================================================================

    /// 즉시 저장
    ///
    /// hook은 복사본에서 동작하므로 호출자의 item은 바뀌지 않습니다.
    pub fn save(&self, item: &CacheItem) -> bool {
        self.write(item, Stage::PreSave, Stage::PostSave, |driver, item| {
            driver.save(item)
        })
    }

    /// 지연 저장 (`commit` 때 반영)
    pub fn save_deferred(&self, item: &CacheItem) -> bool {
        self.write(item, Stage::PreDefer, Stage::PostDefer, |driver, item| {
            driver.save_deferred(item)
        })
    }

    fn write<F>(&self, item: &CacheItem, pre: Stage, post: Stage, op: F) -> bool
    where
        F: Fn(&dyn Driver, &CacheItem) -> bool,
    {
        let mut clone = item.clone();

        if !self.run_extensions(pre, Some(&mut clone)) {
            return false;
        }

        let driver = self.driver();
        if !op(driver.as_ref(), &clone) {
            return self.fail(driver.last_error());
        }

        self.run_extensions(post, Some(&mut clone))
    }

    /// 지연 저장분 반영
    pub fn commit(&self) -> bool {
        if !self.run_extensions(Stage::PreCommit, None) {
            return false;
        }

        let driver = self.driver();
        if !driver.commit() {
            return self.fail(driver.last_error());
        }

        self.run_extensions(Stage::PostCommit, None)
    }

    // ========================================================================
    // 삭제
    // ========================================================================

    /// 키 삭제
    pub fn delete_item(&self, key: &str) -> bool {
        let mut item = self.get_item(key);

        if !self.run_extensions(Stage::PreDelete, Some(&mut item)) {
            return false;
        }

        let driver = self.driver();
        if !driver.delete(item.key()) {
            return self.fail(driver.last_error());
        }

        self.run_extensions(Stage::PostDelete, Some(&mut item))
    }

    /// 여러 키 삭제, 첫 실패에서 중단
    pub fn delete_items<I, S>(&self, keys: I) -> bool
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        keys.into_iter().all(|key| self.delete_item(key.as_ref()))
    }

    /// 전체 삭제
    pub fn clear(&self) -> bool {
        if !self.run_extensions(Stage::PreClear, None) {
            return false;
        }

        let driver = self.driver();
        if !driver.clear() {
            return self.fail(driver.last_error());
        }

        self.run_extensions(Stage::PostClear, None)
    }

    // ========================================================================
    // Extension
    // ========================================================================

    /// extension 등록
    pub fn add_extension(&self, extension: Arc<dyn Extension>) -> Result<()> {
        self.inner.pipeline.add(extension)
    }

    /// 모든 extension 제거 후 기본 serialize extension만 다시 등록
    pub fn clear_extensions(&self) -> Result<()> {
        self.inner.pipeline.clear();
        self.inner.pipeline.add(Arc::new(SerializeExtension::new()))
    }

    /// 단계 실행
    ///
    /// 성공하면 pool 에러를 지우고 `true`, 실패하면 중단시킨 hook의 에러를
    /// 기록하고 `false`.
    pub fn run_extensions(&self, stage: Stage, item: Option<&mut CacheItem>) -> bool {
        match self.inner.pipeline.run(self, stage, item) {
            Ok(()) => self.succeed(),
            Err(info) => self.fail(info),
        }
    }

    /// extension이 등록한 메서드 호출
    pub fn call(&self, method: &str, args: &[Value]) -> Result<Value> {
        match self.inner.pipeline.method(method) {
            Some(extension) => extension.call(self, method, args),
            None => Err(Error::bad_method("CachePool", method)),
        }
    }

    /// 타입으로 extension을 찾아 `f` 실행
    pub fn with_extension<T, R>(&self, name: &str, f: impl FnOnce(&T) -> R) -> Option<R>
    where
        T: Extension + 'static,
    {
        let extension = self.inner.pipeline.find(name)?;
        extension.as_any().downcast_ref::<T>().map(f)
    }

    /// 등록된 extension 이름 (등록 순서)
    pub fn extension_names(&self) -> Vec<&'static str> {
        self.inner.pipeline.names()
    }

    pub fn has_extension(&self, name: &str) -> bool {
        self.inner.pipeline.is_loaded(name)
    }

    // ========================================================================
    // 컨텍스트 / 설정
    // ========================================================================

    /// 현재 요청 컨텍스트 (복사본)
    pub fn context(&self) -> RequestContext {
        self.inner.context.read().clone()
    }

    pub fn set_context(&self, context: RequestContext) {
        *self.inner.context.write() = context;
    }

    pub fn item_config(&self) -> &ItemConfig {
        &self.inner.item_config
    }

    /// 지연 저장분을 반영하고 `end` 단계 실행
    pub fn shutdown(&self) -> bool {
        let committed = self.commit();
        let ended = self.run_extensions(Stage::End, None);
        committed && ended
    }

    /// 두 핸들이 같은 pool인지
    pub fn ptr_eq(&self, other: &CachePool) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl ErrorAware for CachePool {
    fn error_state(&self) -> &ErrorState {
        &self.inner.errors
    }
}

impl fmt::Debug for CachePool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CachePool")
            .field("driver", &self.driver().name())
            .field("extensions", &self.extension_names())
            .field("error", &self.last_error())
            .finish()
    }
}

// ============================================================================
// CachePoolBuilder
// ============================================================================

/// Pool builder
pub struct CachePoolBuilder {
    driver: Option<Arc<dyn Driver>>,
    allow_fallback: bool,
    extensions: Vec<Arc<dyn Extension>>,
    item_config: ItemConfig,
    item_factory: Option<ItemFactory>,
    context: RequestContext,
}

impl Default for CachePoolBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl CachePoolBuilder {
    pub fn new() -> Self {
        Self {
            driver: None,
            allow_fallback: true,
            extensions: Vec::new(),
            item_config: ItemConfig::default(),
            item_factory: None,
            context: RequestContext::default(),
        }
    }

    /// 저장소 driver (기본: 기본 경로의 FilesystemDriver)
    pub fn driver(mut self, driver: Arc<dyn Driver>) -> Self {
        self.driver = Some(driver);
        self
    }

    pub fn allow_fallback(mut self, allow: bool) -> Self {
        self.allow_fallback = allow;
        self
    }

    pub fn extension(mut self, extension: Arc<dyn Extension>) -> Self {
        self.extensions.push(extension);
        self
    }

    pub fn item_config(mut self, config: ItemConfig) -> Self {
        self.item_config = config;
        self
    }

    pub fn ttl(mut self, ttl: i64) -> Self {
        self.item_config.ttl = ttl;
        self
    }

    pub fn item_factory<F>(mut self, factory: F) -> Self
    where
        F: Fn(&str, &CachePool, &ItemConfig) -> CacheItem + Send + Sync + 'static,
    {
        self.item_factory = Some(Arc::new(factory));
        self
    }

    pub fn context(mut self, context: RequestContext) -> Self {
        self.context = context;
        self
    }

    /// pool 생성 후 `init` 단계 실행
    pub fn build(self) -> Result<CachePool> {
        let driver = match self.driver {
            Some(driver) => driver,
            None => Arc::new(FilesystemDriver::new(&FilesystemOptions::default())),
        };

        let pool = CachePool {
            inner: Arc::new(PoolInner {
                driver: RwLock::new(Arc::new(NullDriver::new())),
                pipeline: ExtensionPipeline::new(),
                errors: ErrorState::new(),
                item_config: self.item_config,
                item_factory: self.item_factory,
                context: RwLock::new(self.context),
            }),
        };

        pool.set_driver(driver, self.allow_fallback)?;
        pool.clear_extensions()?;
        for extension in self.extensions {
            pool.add_extension(extension)?;
        }

        pool.run_extensions(Stage::Init, None);
        Ok(pool)
    }
}
