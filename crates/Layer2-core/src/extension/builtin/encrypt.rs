//! Encrypt Extension - 직렬화된 바이트 변환
//!
//! serialize(50) 다음에 암호화(60), serialize 전에 복호화(40)합니다.
//! 기본 함수는 base64 인코딩/디코딩입니다.

use crate::extension::{Extension, HookResult, Stage};
use crate::item::{CacheItem, CacheValue};
use crate::pool::CachePool;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use stash_foundation::{code, ErrorInfo};
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// 바이트 변환 함수, 실패 시 `None`
pub type CipherFn = Arc<dyn Fn(&[u8]) -> Option<Vec<u8>> + Send + Sync>;

pub struct EncryptExtension {
    encrypt: CipherFn,
    decrypt: CipherFn,
}

impl Default for EncryptExtension {
    fn default() -> Self {
        Self::new()
    }
}

impl EncryptExtension {
    pub const NAME: &'static str = "encrypt";

    /// base64 기본 함수 사용
    pub fn new() -> Self {
        Self {
            encrypt: Arc::new(|bytes| Some(STANDARD.encode(bytes).into_bytes())),
            decrypt: Arc::new(|bytes| STANDARD.decode(bytes).ok()),
        }
    }

    /// 사용자 정의 함수 사용
    pub fn with_functions<E, D>(encrypt: E, decrypt: D) -> Self
    where
        E: Fn(&[u8]) -> Option<Vec<u8>> + Send + Sync + 'static,
        D: Fn(&[u8]) -> Option<Vec<u8>> + Send + Sync + 'static,
    {
        Self {
            encrypt: Arc::new(encrypt),
            decrypt: Arc::new(decrypt),
        }
    }

    fn apply(cipher: &CipherFn, item: &mut CacheItem) -> HookResult {
        let result = item.payload().and_then(|bytes| cipher(bytes));
        match result {
            Some(bytes) => {
                item.set_value(Some(CacheValue::Bytes(bytes)));
                Ok(())
            }
            None => Err(ErrorInfo::new(
                format!("Encrypt/decrypt failed for \"{}\"", item.key()),
                code::FAIL_ENCRYPT,
            )),
        }
    }
}

impl Extension for EncryptExtension {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn stages(&self) -> Vec<(Stage, u8)> {
        vec![
            (Stage::PostGet, 40),
            (Stage::PreSave, 60),
            (Stage::PreDefer, 60),
        ]
    }

    fn invoke(&self, _pool: &CachePool, stage: Stage, item: Option<&mut CacheItem>) -> HookResult {
        let Some(item) = item else {
            return Ok(());
        };

        if stage == Stage::PostGet {
            if item.hit_state() != Some(true) {
                return Ok(());
            }
            Self::apply(&self.decrypt, item)
        } else {
            Self::apply(&self.encrypt, item)
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl fmt::Debug for EncryptExtension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncryptExtension").finish_non_exhaustive()
    }
}
