//! Extension Pipeline - 등록, 정렬, 실행
//!
//! 실행 순서:
//! 1. 우선순위 오름차순
//! 2. 같은 우선순위에서는 `all` hook이 단계 전용 hook보다 먼저
//! 3. 같은 그룹 안에서는 등록 순서
//!
//! 단계별 정렬 결과는 캐시되고, 새 extension이 등록되면 무효화됩니다.
//! 실행 중에는 lock을 잡지 않으므로 hook 안에서 pool을 다시 호출할 수 있습니다.

use super::{Extension, HookResult, Stage};
use crate::item::CacheItem;
use crate::pool::CachePool;
use parking_lot::Mutex;
use stash_foundation::{Error, Result};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::debug;

type Hooks = Arc<[Arc<dyn Extension>]>;

#[derive(Default)]
struct PipelineState {
    /// stage -> priority -> 등록 순서 목록
    extensions: HashMap<Stage, BTreeMap<u8, Vec<Arc<dyn Extension>>>>,
    /// stage별 정렬 결과 캐시
    sorted: HashMap<Stage, Hooks>,
    /// pool 메서드 이름 -> 제공 extension
    methods: HashMap<String, Arc<dyn Extension>>,
    /// 등록된 extension (등록 순서)
    loaded: Vec<Arc<dyn Extension>>,
}

impl PipelineState {
    fn sort(&self, stage: Stage) -> Hooks {
        let mut buckets: BTreeMap<u8, Vec<Arc<dyn Extension>>> = BTreeMap::new();

        if stage != Stage::All {
            if let Some(wildcard) = self.extensions.get(&Stage::All) {
                for (priority, list) in wildcard {
                    buckets.entry(*priority).or_default().extend(list.iter().cloned());
                }
            }
        }

        if let Some(specific) = self.extensions.get(&stage) {
            for (priority, list) in specific {
                buckets.entry(*priority).or_default().extend(list.iter().cloned());
            }
        }

        buckets.into_values().flatten().collect()
    }
}

/// Extension 실행 파이프라인
#[derive(Default)]
pub struct ExtensionPipeline {
    state: Mutex<PipelineState>,
}

impl ExtensionPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    // ========================================================================
    // 등록
    // ========================================================================

    /// extension 등록
    ///
    /// - 같은 이름이 이미 있으면 `DuplicateFound`
    /// - 메서드 이름이 다른 extension과 겹치면 `InvalidArgument`
    ///
    /// 실패하면 아무것도 바뀌지 않습니다.
    pub fn add(&self, extension: Arc<dyn Extension>) -> Result<()> {
        let mut state = self.state.lock();
        let name = extension.name();

        if state.loaded.iter().any(|loaded| loaded.name() == name) {
            return Err(Error::DuplicateFound(format!(
                "Extension \"{}\" already loaded",
                name
            )));
        }

        let methods = extension.methods();
        for method in &methods {
            if let Some(owner) = state.methods.get(*method) {
                return Err(Error::InvalidArgument(format!(
                    "Method \"{}\" of \"{}\" is already provided by \"{}\"",
                    method,
                    name,
                    owner.name()
                )));
            }
        }

        for (stage, priority) in extension.stages() {
            state
                .extensions
                .entry(stage)
                .or_default()
                .entry(priority)
                .or_default()
                .push(extension.clone());
        }

        for method in methods {
            state.methods.insert(method.to_string(), extension.clone());
        }

        state.sorted.clear();
        state.loaded.push(extension);

        debug!("Extension loaded: {}", name);
        Ok(())
    }

    /// 모든 extension 제거
    pub fn clear(&self) {
        *self.state.lock() = PipelineState::default();
    }

    // ========================================================================
    // 조회
    // ========================================================================

    /// 단계의 실행 순서 (정렬 결과 캐시 사용)
    pub fn hooks(&self, stage: Stage) -> Hooks {
        let mut state = self.state.lock();
        if let Some(hooks) = state.sorted.get(&stage) {
            return hooks.clone();
        }

        let hooks = state.sort(stage);
        state.sorted.insert(stage, hooks.clone());
        hooks
    }

    /// 메서드를 제공하는 extension
    pub fn method(&self, name: &str) -> Option<Arc<dyn Extension>> {
        self.state.lock().methods.get(name).cloned()
    }

    /// 이름으로 extension 찾기
    pub fn find(&self, name: &str) -> Option<Arc<dyn Extension>> {
        self.state
            .lock()
            .loaded
            .iter()
            .find(|ext| ext.name() == name)
            .cloned()
    }

    /// 등록된 extension 이름 (등록 순서)
    pub fn names(&self) -> Vec<&'static str> {
        self.state.lock().loaded.iter().map(|ext| ext.name()).collect()
    }

    pub fn is_loaded(&self, name: &str) -> bool {
        self.state.lock().loaded.iter().any(|ext| ext.name() == name)
    }

    pub fn len(&self) -> usize {
        self.state.lock().loaded.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().loaded.is_empty()
    }

    // ========================================================================
    // 실행
    // ========================================================================

    /// 단계 실행, 첫 번째 실패에서 중단
    pub fn run(
        &self,
        pool: &CachePool,
        stage: Stage,
        mut item: Option<&mut CacheItem>,
    ) -> HookResult {
        let hooks = self.hooks(stage);

        for extension in hooks.iter() {
            if let Err(info) = extension.invoke(pool, stage, item.as_deref_mut()) {
                debug!(
                    "Stage {} aborted by {}: {}",
                    stage,
                    extension.name(),
                    info
                );
                return Err(info);
            }
        }
        Ok(())
    }
}
