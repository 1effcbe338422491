//! Filesystem Driver - 해시 경로 파일 저장소
//!
//! ## 디스크 레이아웃
//! ```text
//! <root>/[<dir from key>/]<h0>/<h1>/<prefix><md5 hex><suffix>
//! ```
//! - `h0..` 는 키 MD5의 앞 글자들 (`hash_level`개, 최대 5)
//! - `/`가 들어간 키는 마지막 `/` 앞부분을 그대로 하위 디렉토리로 사용
//! - 파일 mtime = 만료 시각
//!
//! 쓰기는 같은 디렉토리의 임시 파일에 기록한 뒤 rename 하므로
//! 동시에 읽는 쪽은 이전 내용이나 새 내용 중 하나만 봅니다.

use super::{fallback_or_null, payload_of, Driver};
use crate::item::CacheItem;
use md5::{Digest, Md5};
use stash_foundation::{code, time, ErrorAware, ErrorInfo, ErrorState, FilesystemOptions};
use std::fs;
use std::io::{self, Write};
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::{debug, warn};

/// 최대 해시 디렉토리 단계
pub const MAX_HASH_LEVEL: usize = 5;

/// 파일 기반 driver
pub struct FilesystemDriver {
    root: PathBuf,
    hash_level: usize,
    prefix: String,
    suffix: String,
    ready: bool,
    errors: ErrorState,
    fallback: Option<Arc<dyn Driver>>,
}

impl FilesystemDriver {
    /// 새 driver 생성
    ///
    /// 루트 디렉토리를 만들지 못해도 생성은 성공하며, 이후 `ping()`이 실패합니다.
    pub fn new(options: &FilesystemOptions) -> Self {
        let root = options.root.clone().unwrap_or_else(default_root);
        let root = trim_root(root);
        let errors = ErrorState::new();

        let ready = match fs::create_dir_all(&root) {
            Ok(()) => true,
            Err(e) => {
                warn!("Failed to create cache root {}: {}", root.display(), e);
                errors.set(ErrorInfo::new(
                    format!("Failed to create directory \"{}\"", root.display()),
                    code::FAIL_MKDIR,
                ));
                false
            }
        };

        Self {
            root,
            hash_level: options.hash_level.min(MAX_HASH_LEVEL),
            prefix: options.prefix.clone(),
            suffix: options.suffix.clone(),
            ready,
            errors,
            fallback: None,
        }
    }

    pub fn with_fallback(mut self, fallback: Arc<dyn Driver>) -> Self {
        self.fallback = Some(fallback);
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    // ========================================================================
    // 경로 계산
    // ========================================================================

    /// 키에 해당하는 경로
    ///
    /// 루트를 벗어나거나 루트 자체를 가리키는 키(빈 키 등)는 `None`
    pub fn path_for(&self, key: &str) -> Option<PathBuf> {
        let (dir, name) = match key.rfind('/') {
            Some(pos) => (key[..pos].trim_start_matches('/'), &key[pos + 1..]),
            None => ("", key),
        };

        let escapes = Path::new(dir)
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if escapes {
            return None;
        }

        let mut path = self.root.join(dir);
        if !name.is_empty() {
            path.push(self.hashed_name(name));
        }
        (path != self.root).then_some(path)
    }

    fn hashed_name(&self, name: &str) -> PathBuf {
        let digest = hex::encode(Md5::digest(name.as_bytes()));

        let mut path = PathBuf::new();
        for c in digest.chars().take(self.hash_level) {
            path.push(c.to_string());
        }
        path.push(format!("{}{}{}", self.prefix, digest, self.suffix));
        path
    }

    fn checked_path(&self, key: &str) -> Option<PathBuf> {
        let path = self.path_for(key);
        if path.is_none() {
            self.set_error(ErrorInfo::new(
                format!("Invalid key \"{}\"", key),
                code::INVALID_KEY,
            ));
        }
        path
    }

    // ========================================================================
    // 파일 작업
    // ========================================================================

    fn write_atomic(&self, path: &Path, payload: &[u8], expire_at: i64) -> io::Result<()> {
        let dir = path.parent().unwrap_or(self.root.as_path());
        let mut tmp = tempfile::Builder::new().prefix("temp_").tempfile_in(dir)?;
        tmp.write_all(payload)?;
        tmp.as_file().set_modified(to_system_time(expire_at))?;
        tmp.persist(path).map_err(|e| e.error)?;
        Ok(())
    }

    /// 디렉토리 안의 파일 삭제 (`max_age`가 Some이면 오래 만료된 것만)
    fn sweep(&self, dir: &Path, max_age: Option<u64>) -> io::Result<()> {
        let threshold = max_age.map(time::seconds_ago);

        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            let path = entry.path();

            if entry.file_type()?.is_dir() {
                match threshold {
                    None => fs::remove_dir_all(&path)?,
                    Some(_) => {
                        self.sweep(&path, max_age)?;
                        // 비어 있지 않으면 남겨둠
                        let _ = fs::remove_dir(&path);
                    }
                }
                continue;
            }

            let stale = match threshold {
                None => true,
                Some(threshold) => modified_timestamp(&entry.metadata()?) < threshold,
            };
            if stale {
                fs::remove_file(&path)?;
            }
        }
        Ok(())
    }
}

impl ErrorAware for FilesystemDriver {
    fn error_state(&self) -> &ErrorState {
        &self.errors
    }
}

impl Driver for FilesystemDriver {
    fn name(&self) -> &'static str {
        "filesystem"
    }

    fn get(&self, key: &str) -> Option<Vec<u8>> {
        let path = self.checked_path(key)?;
        match fs::read(&path) {
            Ok(bytes) => Some(bytes),
            Err(e) => {
                debug!("Failed to read {}: {}", path.display(), e);
                self.set_error(ErrorInfo::new(
                    format!("Failed to read file \"{}\"", path.display()),
                    code::FAIL_READFILE,
                ));
                None
            }
        }
    }

    fn has(&self, key: &str) -> i64 {
        let Some(path) = self.path_for(key) else {
            return 0;
        };
        match fs::metadata(&path) {
            Ok(meta) if meta.is_file() => modified_timestamp(&meta),
            _ => 0,
        }
    }

    fn save(&self, item: &CacheItem) -> bool {
        let Some(payload) = payload_of(self, item) else {
            return false;
        };
        let Some(path) = self.checked_path(item.key()) else {
            return false;
        };

        if let Some(dir) = path.parent() {
            if let Err(e) = fs::create_dir_all(dir) {
                warn!("Failed to create {}: {}", dir.display(), e);
                return self.fail(ErrorInfo::new(
                    format!("Failed to create directory \"{}\"", dir.display()),
                    code::FAIL_MKDIR,
                ));
            }
        }

        match self.write_atomic(&path, payload, item.expiration()) {
            Ok(()) => self.succeed(),
            Err(e) => {
                warn!("Failed to write {}: {}", path.display(), e);
                self.fail(ErrorInfo::new(
                    format!("Failed to write file \"{}\"", item.key()),
                    code::FAIL_WRITEFILE,
                ))
            }
        }
    }

    fn delete(&self, key: &str) -> bool {
        let Some(path) = self.checked_path(key) else {
            return false;
        };

        let result = if path.is_dir() {
            fs::remove_dir_all(&path)
        } else {
            match fs::remove_file(&path) {
                Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
                other => other,
            }
        };

        match result {
            Ok(()) => self.succeed(),
            Err(e) => {
                warn!("Failed to delete {}: {}", path.display(), e);
                self.fail(ErrorInfo::new(
                    format!("Failed to delete \"{}\"", key),
                    code::FAIL_DELETE,
                ))
            }
        }
    }

    fn clear(&self) -> bool {
        if !self.root.is_dir() {
            return self.succeed();
        }
        match self.sweep(&self.root, None) {
            Ok(()) => self.succeed(),
            Err(e) => {
                warn!("Failed to clear {}: {}", self.root.display(), e);
                self.fail(ErrorInfo::new(
                    format!("Failed to delete \"{}\"", self.root.display()),
                    code::FAIL_DELETE,
                ))
            }
        }
    }

    fn purge(&self, max_age: u64) -> bool {
        if max_age == 0 {
            return self.clear();
        }
        if !self.root.is_dir() {
            return self.succeed();
        }
        match self.sweep(&self.root, Some(max_age)) {
            Ok(()) => self.succeed(),
            Err(e) => {
                warn!("Failed to purge {}: {}", self.root.display(), e);
                self.fail(ErrorInfo::new(
                    format!("Failed to delete \"{}\"", self.root.display()),
                    code::FAIL_DELETE,
                ))
            }
        }
    }

    fn ping(&self) -> bool {
        self.ready && self.root.is_dir()
    }

    fn fallback(&self) -> Arc<dyn Driver> {
        fallback_or_null(&self.fallback)
    }
}

// ============================================================================
// 헬퍼
// ============================================================================

fn default_root() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("stash")
}

/// 끝의 구분자 제거
fn trim_root(root: PathBuf) -> PathBuf {
    root.components().collect()
}

fn to_system_time(timestamp: i64) -> SystemTime {
    if timestamp <= 0 {
        UNIX_EPOCH
    } else {
        UNIX_EPOCH + Duration::from_secs(timestamp as u64)
    }
}

fn modified_timestamp(meta: &fs::Metadata) -> i64 {
    meta.modified()
        .ok()
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}
