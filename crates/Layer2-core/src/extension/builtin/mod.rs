//! Builtin Extensions
//!
//! | extension | 단계 (우선순위) |
//! |---|---|
//! | bypass | all (0) |
//! | distribute_miss | pre_save, pre_defer (20) |
//! | encrypt | post_get (40), pre_save/pre_defer (60) |
//! | serialize | post_get, pre_save, pre_defer (50) |
//! | stampede | post_has (50) |
//! | taggable | post_save, post_defer (70) |
//! | statistics | post_has (80) |
//! | commit_deferred | post_defer (90) |
//! | garbage_collect | post_get (95) |

mod bypass;
mod commit_deferred;
mod distribute_miss;
mod encrypt;
mod garbage_collect;
mod serialize;
mod stampede;
mod statistics;
mod taggable;

pub use bypass::BypassExtension;
pub use commit_deferred::CommitDeferredExtension;
pub use distribute_miss::DistributeMissExtension;
pub use encrypt::{CipherFn, EncryptExtension};
pub use garbage_collect::GarbageCollectExtension;
pub use serialize::SerializeExtension;
pub use stampede::StampedeExtension;
pub use statistics::{StatisticsExtension, StatisticsSnapshot};
pub use taggable::TaggableExtension;
