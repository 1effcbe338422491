//! Registry - 설정 기술자에서 driver/extension 생성
//!
//! 종류가 enum으로 고정되어 있어 모르는 이름은 설정을 읽는 단계에서
//! 이미 거부됩니다. 여기서는 값 범위만 검사합니다.

use crate::driver::{
    CompositeDriver, Driver, FilesystemDriver, MemoryDriver, NullDriver, MAX_HASH_LEVEL,
};
use crate::extension::builtin::{
    BypassExtension, CommitDeferredExtension, DistributeMissExtension, EncryptExtension,
    GarbageCollectExtension, SerializeExtension, StampedeExtension, StatisticsExtension,
    TaggableExtension,
};
use crate::extension::Extension;
use stash_foundation::{DriverKind, DriverSpec, Error, ExtensionSpec, Result};
use std::sync::Arc;
use tracing::debug;

/// driver 생성 (fallback 체인 포함)
pub fn build_driver(spec: &DriverSpec) -> Result<Arc<dyn Driver>> {
    let fallback = spec.fallback.as_deref().map(build_driver).transpose()?;

    let driver: Arc<dyn Driver> = match &spec.kind {
        DriverKind::Null => Arc::new(NullDriver::new()),

        DriverKind::Memory => {
            let mut driver = MemoryDriver::new();
            if let Some(fallback) = fallback {
                driver = driver.with_fallback(fallback);
            }
            Arc::new(driver)
        }

        DriverKind::Filesystem(options) => {
            if options.hash_level > MAX_HASH_LEVEL {
                return Err(Error::InvalidArgument(format!(
                    "hash_level must be 0-{}, got {}",
                    MAX_HASH_LEVEL, options.hash_level
                )));
            }
            let mut driver = FilesystemDriver::new(options);
            if let Some(fallback) = fallback {
                driver = driver.with_fallback(fallback);
            }
            Arc::new(driver)
        }

        DriverKind::Composite {
            front,
            back,
            front_max_bytes,
        } => {
            let mut driver = CompositeDriver::new(build_driver(front)?, build_driver(back)?);
            if let Some(max_bytes) = front_max_bytes {
                driver = driver.with_front_max_bytes(*max_bytes);
            }
            if let Some(fallback) = fallback {
                driver = driver.with_fallback(fallback);
            }
            Arc::new(driver)
        }
    };

    debug!("Driver built: {}", spec.kind.name());
    Ok(driver)
}

/// extension 생성
pub fn build_extension(spec: &ExtensionSpec) -> Arc<dyn Extension> {
    match spec {
        ExtensionSpec::Serialize => Arc::new(SerializeExtension::new()),
        ExtensionSpec::Encrypt => Arc::new(EncryptExtension::new()),
        ExtensionSpec::Bypass { trigger, message } => {
            Arc::new(BypassExtension::new(trigger.clone(), message.clone()))
        }
        ExtensionSpec::Stampede {
            probability,
            divisor,
            time_left,
        } => Arc::new(StampedeExtension::new(*probability, *divisor, *time_left)),
        ExtensionSpec::DistributeMiss { distribution } => {
            Arc::new(DistributeMissExtension::new(*distribution))
        }
        ExtensionSpec::CommitDeferred {
            probability,
            divisor,
        } => Arc::new(CommitDeferredExtension::new(*probability, *divisor)),
        ExtensionSpec::GarbageCollect {
            probability,
            divisor,
            max_lifetime,
        } => Arc::new(GarbageCollectExtension::new(
            *probability,
            *divisor,
            *max_lifetime,
        )),
        ExtensionSpec::Taggable => Arc::new(TaggableExtension::new()),
        ExtensionSpec::Statistics => Arc::new(StatisticsExtension::new()),
    }
}
