//! Filesystem / Composite driver 통합 테스트
//!
//! 임시 디렉토리에 실제 파일을 쓰고 pool을 다시 만들어 읽어봅니다.

mod common;

use base64::Engine;
use common::init_tracing;
use serde_json::json;
use stash_core::ErrorAware;
use stash_core::{
    CachePool, CacheValue, CompositeDriver, Driver, DriverSpec, EncryptExtension,
    ExtensionSpec, FilesystemDriver, FilesystemOptions, MemoryDriver, PoolConfig, QuickCache,
    TaggableExtension,
};
use stash_foundation::time;
use std::cell::Cell;
use std::sync::Arc;
use tempfile::TempDir;

fn fs_driver(dir: &TempDir) -> Arc<FilesystemDriver> {
    Arc::new(FilesystemDriver::new(&FilesystemOptions::at(dir.path())))
}

// ============================================================================
// Filesystem
// ============================================================================

#[test]
fn test_values_survive_new_pool() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();

    {
        let pool = CachePool::new(fs_driver(&dir)).unwrap();
        let mut item = pool.get_item("user/42");
        item.set(json!({"name": "kim", "roles": ["admin"]}));
        assert!(pool.save(&item));
    }

    let pool = CachePool::new(fs_driver(&dir)).unwrap();
    assert_eq!(pool.driver().name(), "filesystem");
    let mut item = pool.get_item("user/42");
    assert!(item.is_hit());
    assert_eq!(
        item.get(),
        Some(&CacheValue::Data(json!({"name": "kim", "roles": ["admin"]})))
    );
}

#[test]
fn test_deferred_visible_before_commit() {
    let dir = tempfile::tempdir().unwrap();
    let driver = fs_driver(&dir);
    let pool = CachePool::new(driver.clone()).unwrap();

    let mut item = pool.get_item("later");
    item.set("v");
    assert!(pool.save_deferred(&item));
    assert!(pool.commit());
    assert!(driver.path_for("later").unwrap().is_file());
    assert!(pool.has_item("later"));
}

#[test]
fn test_delete_and_clear() {
    let dir = tempfile::tempdir().unwrap();
    let pool = CachePool::new(fs_driver(&dir)).unwrap();

    for key in ["a", "b", "c"] {
        let mut item = pool.get_item(key);
        item.set(key);
        assert!(pool.save(&item));
    }

    assert!(pool.delete_item("a"));
    assert!(!pool.has_item("a"));
    // 없는 키 삭제도 성공
    assert!(pool.delete_item("missing"));

    assert!(pool.clear());
    assert!(!pool.has_item("b"));
    assert!(!pool.has_item("c"));
    assert!(dir.path().is_dir());
}

#[test]
fn test_blank_key_never_touches_root() {
    let dir = tempfile::tempdir().unwrap();
    let driver = fs_driver(&dir);
    let pool = CachePool::new(driver.clone()).unwrap();

    for key in ["a", "b"] {
        let mut item = pool.get_item(key);
        item.set(key);
        assert!(pool.save(&item));
    }

    assert!(!pool.delete_item("  "));
    assert_eq!(pool.error_code(), stash_core::code::INVALID_KEY);

    let mut blank = pool.get_item("");
    blank.set("v");
    assert!(!pool.save(&blank));

    assert!(pool.has_item("a"));
    assert!(pool.has_item("b"));
    assert!(driver.ping());
}

#[test]
fn test_purge_respects_max_age() {
    let dir = tempfile::tempdir().unwrap();
    let driver = fs_driver(&dir);
    let pool = CachePool::new(driver.clone()).unwrap();
    let now = time::now();

    for (key, expire) in [("ancient", now - 5_000), ("recent", now - 10), ("live", now + 600)] {
        let mut item = pool.get_item(key);
        item.set(key).expires_at_timestamp(expire);
        assert!(pool.save(&item));
    }

    assert!(driver.purge(1_000));
    assert!(driver.has("ancient") == 0);
    assert!(driver.has("recent") > 0);
    assert!(driver.has("live") > 0);
}

#[test]
fn test_unwritable_root_falls_back() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let blocker = dir.path().join("blocker");
    std::fs::write(&blocker, b"file").unwrap();

    let driver = FilesystemDriver::new(&FilesystemOptions::at(blocker.join("cache")))
        .with_fallback(Arc::new(MemoryDriver::new()));
    let pool = CachePool::new(Arc::new(driver)).unwrap();
    assert_eq!(pool.driver().name(), "memory");
}

#[test]
fn test_encrypted_payload_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    let driver = fs_driver(&dir);
    let pool = CachePool::builder()
        .driver(driver.clone())
        .extension(Arc::new(EncryptExtension::new()))
        .build()
        .unwrap();

    let mut item = pool.get_item("secret");
    item.set("plain text value");
    assert!(pool.save(&item));

    let raw = std::fs::read(driver.path_for("secret").unwrap()).unwrap();
    assert!(!String::from_utf8_lossy(&raw).contains("plain text value"));
    let decoded = base64::engine::general_purpose::STANDARD
        .decode(&raw)
        .unwrap();
    assert!(String::from_utf8_lossy(&decoded).contains("plain text value"));

    let mut read = pool.get_item("secret");
    assert_eq!(read.get(), Some(&CacheValue::from("plain text value")));
}

// ============================================================================
// Composite
// ============================================================================

#[test]
fn test_composite_size_gate() {
    let dir = tempfile::tempdir().unwrap();
    let front = Arc::new(MemoryDriver::new());
    let back = fs_driver(&dir);
    let composite = CompositeDriver::new(front.clone(), back.clone()).with_front_max_bytes(64);
    let pool = CachePool::new(Arc::new(composite)).unwrap();

    let mut small = pool.get_item("small");
    small.set("hi");
    assert!(pool.save(&small));

    let mut large = pool.get_item("large");
    large.set("x".repeat(1_000));
    assert!(pool.save(&large));

    assert!(front.has("small") > 0);
    assert!(back.has("small") > 0);
    assert_eq!(front.has("large"), 0);
    assert!(back.has("large") > 0);

    // front에 없으면 back에서 읽음
    let mut read = pool.get_item("large");
    assert_eq!(read.get(), Some(&CacheValue::from("x".repeat(1_000))));
}

#[test]
fn test_composite_clear_empties_both() {
    let dir = tempfile::tempdir().unwrap();
    let front = Arc::new(MemoryDriver::new());
    let back = fs_driver(&dir);
    let pool =
        CachePool::new(Arc::new(CompositeDriver::new(front.clone(), back.clone()))).unwrap();

    let mut item = pool.get_item("k");
    item.set("v");
    assert!(pool.save(&item));
    assert!(pool.clear());

    assert_eq!(front.has("k"), 0);
    assert_eq!(back.has("k"), 0);
}

// ============================================================================
// Config / Tag / Quick
// ============================================================================

#[test]
fn test_pool_from_config() {
    let dir = tempfile::tempdir().unwrap();
    let config = PoolConfig::new(DriverSpec::composite(
        DriverSpec::memory(),
        DriverSpec::filesystem(FilesystemOptions::at(dir.path()).with_hash_level(1)),
    ))
    .with_ttl(120)
    .with_extension(ExtensionSpec::Serialize)
    .with_extension(ExtensionSpec::Taggable)
    .with_extension(ExtensionSpec::distribute_miss());

    let pool = CachePool::from_config(&config).unwrap();
    assert_eq!(pool.driver().name(), "composite");
    assert_eq!(pool.item_config().ttl, 120);
    assert!(pool.has_extension(TaggableExtension::NAME));

    let mut item = pool.get_item("k");
    item.set(1).add_tag("numbers");
    assert!(pool.save(&item));
    assert!(pool.has_item("k"));
}

#[test]
fn test_pool_from_toml_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cache.toml");
    std::fs::write(
        &path,
        format!(
            "[driver]\ntype = \"filesystem\"\nroot = {:?}\nhash_level = 0\n\n[[extensions]]\nname = \"statistics\"\n",
            dir.path().join("store").display().to_string()
        ),
    )
    .unwrap();

    let config = PoolConfig::load(&path).unwrap();
    let pool = CachePool::from_config(&config).unwrap();

    pool.get_item("a").is_hit();
    let stats = pool.call("statistics", &[]).unwrap();
    assert_eq!(stats["misses"], json!(1));
}

#[test]
fn test_tags_persist_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    let pool = CachePool::builder()
        .driver(fs_driver(&dir))
        .extension(Arc::new(TaggableExtension::new()))
        .build()
        .unwrap();

    for key in ["p1", "p2"] {
        let mut item = pool.get_item(key);
        item.set(key).set_tags(["posts"]);
        assert!(pool.save(&item));
    }

    assert!(pool.has_item(&TaggableExtension::tag_key("posts")));
    assert_eq!(pool.call("clear_by_tag", &[json!("posts")]).unwrap(), json!(true));
    assert!(!pool.has_item("p1"));
    assert!(!pool.has_item("p2"));
    assert!(!pool.has_item(&TaggableExtension::tag_key("posts")));
}

#[test]
fn test_quick_cache_memoizes() {
    let dir = tempfile::tempdir().unwrap();
    let quick = QuickCache::new(CachePool::new(fs_driver(&dir)).unwrap());
    let calls = Cell::new(0);

    let compute = || {
        calls.set(calls.get() + 1);
        vec![1, 2, 3]
    };

    let first: Vec<i32> = quick.cached(&("list", 3), compute).unwrap();
    let second: Vec<i32> = quick.cached(&("list", 3), compute).unwrap();
    assert_eq!(first, second);
    assert_eq!(calls.get(), 1);

    let _: Vec<i32> = quick.cached(&("list", 4), compute).unwrap();
    assert_eq!(calls.get(), 2);
}
