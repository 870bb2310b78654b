//! Integration Tests for the Cache Store
//!
//! Exercises the public API end to end: TTL scenarios, memoization,
//! failure propagation and shared use across threads and tasks.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier, Once};
use std::thread::{self, sleep};
use std::time::Duration;

use mini_cache::{CacheConfig, CacheError, CacheStore, SharedCache};
use serde::{Deserialize, Serialize};

// == Helper Functions ==

static TRACING: Once = Once::new();

fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "mini_cache=debug".into()),
            )
            .with_test_writer()
            .try_init();
    });
}

fn create_test_cache() -> SharedCache {
    init_tracing();
    Arc::new(CacheStore::new(Duration::from_secs(300)))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct User {
    id: u64,
    name: String,
    roles: Vec<String>,
}

fn sample_user() -> User {
    User {
        id: 7,
        name: "alice".to_string(),
        roles: vec!["reader".to_string()],
    }
}

// == Set / TryGet ==

#[test]
fn test_set_then_try_get_struct() {
    let cache = create_test_cache();

    cache
        .set_with_ttl("user:7", &sample_user(), Duration::from_secs(5))
        .unwrap();

    let user = cache.try_get::<User>("user:7").unwrap();
    assert_eq!(*user, sample_user());
}

#[test]
fn test_mutating_original_does_not_change_cached_copy() {
    let cache = create_test_cache();
    let mut user = sample_user();

    cache.set("user:7", &user).unwrap();
    user.name = "mallory".to_string();
    user.roles.push("admin".to_string());

    let cached = cache.try_get::<User>("user:7").unwrap();
    assert_eq!(cached.name, "alice");
    assert_eq!(cached.roles, vec!["reader".to_string()]);
}

#[test]
fn test_expired_entry_scenario() {
    let cache = create_test_cache();

    cache.set_with_ttl("a", &1i32, Duration::from_millis(100)).unwrap();
    sleep(Duration::from_millis(150));

    assert!(cache.try_get::<i32>("a").is_none());
    assert_eq!(cache.len(), 0, "Expired key should be gone after the read");
}

#[test]
fn test_unread_expired_entries_stay_until_clear() {
    let cache = create_test_cache();

    for i in 0..5 {
        cache
            .set_with_ttl(format!("k{}", i), &i, Duration::ZERO)
            .unwrap();
    }
    assert_eq!(cache.len(), 5);

    cache.clear();
    assert!(cache.is_empty());
}

#[test]
fn test_type_mismatch_scenario() {
    let cache = create_test_cache();

    cache.set("x", &5i32).unwrap();

    assert!(cache.try_get::<String>("x").is_none());
    assert_eq!(cache.try_get::<i32>("x").as_deref(), Some(&5));
}

#[derive(Debug, PartialEq, Serialize, Deserialize)]
struct Ready;

#[test]
fn test_values_with_null_json_form_are_not_dropped() {
    let cache = create_test_cache();

    cache.set("ready", &Ready).unwrap();
    assert_eq!(cache.try_get::<Ready>("ready").as_deref(), Some(&Ready));

    for result in [
        cache.set("nan", &f64::NAN),
        cache.set("inf", &f64::INFINITY),
        cache.set("nested", &Some(None::<i32>)),
    ] {
        assert!(matches!(result, Err(CacheError::Isolation(_))));
    }

    assert!(cache.try_get::<f64>("nan").is_none());
    assert_eq!(cache.len(), 1);
}

#[test]
fn test_remove_and_clear() {
    let cache = create_test_cache();

    assert!(!cache.remove("missing"));

    cache.set("a", &"1".to_string()).unwrap();
    cache.set("b", &2u8).unwrap();
    assert!(cache.remove("a"));
    assert!(cache.try_get::<String>("a").is_none());

    cache.clear();
    assert!(cache.try_get::<u8>("b").is_none());
}

#[test]
fn test_config_drives_default_ttl() {
    init_tracing();
    let cache = CacheStore::from_config(&CacheConfig::from_millis_str(Some("50")));

    cache.set("short", &"lived".to_string()).unwrap();
    assert!(cache.try_get::<String>("short").is_some());

    sleep(Duration::from_millis(80));
    assert!(cache.try_get::<String>("short").is_none());
}

#[test]
fn test_invalid_config_falls_back_to_sixty_seconds() {
    init_tracing();
    let cache = CacheStore::from_config(&CacheConfig::from_millis_str(Some("soon")));
    assert_eq!(cache.default_ttl(), Duration::from_secs(60));
}

// == Get Or Set ==

#[test]
fn test_get_or_set_with_anyhow_factory() {
    let cache = create_test_cache();
    let calls = AtomicUsize::new(0);

    let load = || -> anyhow::Result<User> {
        calls.fetch_add(1, Ordering::SeqCst);
        Ok(sample_user())
    };

    let first = cache.get_or_set("user:7", load).unwrap();
    let second = cache.get_or_set("user:7", load).unwrap();

    assert_eq!(*first, sample_user());
    assert_eq!(*second, sample_user());
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_get_or_set_isolation_error_surfaces_through_caller_error() {
    let cache = create_test_cache();

    let result = cache.get_or_set("bad", || -> anyhow::Result<std::collections::HashMap<(u8, u8), u8>> {
        Ok([((1, 2), 3)].into_iter().collect())
    });

    let err = result.unwrap_err();
    assert!(matches!(
        err.downcast_ref::<CacheError>(),
        Some(CacheError::Isolation(_))
    ));
    assert!(cache.is_empty());
}

#[test]
fn test_get_or_set_after_expiry_recomputes() {
    let cache = create_test_cache();
    let calls = AtomicUsize::new(0);

    let load = || -> anyhow::Result<u32> {
        Ok(calls.fetch_add(1, Ordering::SeqCst) as u32)
    };

    let ttl = Duration::from_millis(40);
    assert_eq!(*cache.get_or_set_with_ttl("n", load, ttl).unwrap(), 0);
    assert_eq!(*cache.get_or_set_with_ttl("n", load, ttl).unwrap(), 0);

    sleep(Duration::from_millis(70));
    assert_eq!(*cache.get_or_set_with_ttl("n", load, ttl).unwrap(), 1);
}

// == Async Get Or Set ==

#[tokio::test]
async fn test_get_or_set_async_cold_then_hit() {
    let cache = create_test_cache();
    let calls = Arc::new(AtomicUsize::new(0));

    for _ in 0..3 {
        let calls = Arc::clone(&calls);
        let user = cache
            .get_or_set_async("user:7", || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(5)).await;
                anyhow::Ok(sample_user())
            })
            .await
            .unwrap();
        assert_eq!(*user, sample_user());
    }

    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_get_or_set_async_failure_writes_nothing() {
    let cache = create_test_cache();

    let result = cache
        .get_or_set_async("k", || async {
            tokio::time::sleep(Duration::from_millis(5)).await;
            Err::<String, _>(anyhow::anyhow!("backend unavailable"))
        })
        .await;

    assert_eq!(result.unwrap_err().to_string(), "backend unavailable");
    assert!(cache.try_get::<String>("k").is_none());
    assert!(cache.is_empty());
}

#[tokio::test]
async fn test_get_or_set_async_from_spawned_tasks() {
    let cache = create_test_cache();

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let cache = Arc::clone(&cache);
            tokio::spawn(async move {
                let key = format!("task:{}", i % 2);
                cache
                    .get_or_set_async_with_ttl(
                        &key,
                        || async move { anyhow::Ok(i % 2) },
                        Duration::from_secs(5),
                    )
                    .await
                    .map(|v| *v)
            })
        })
        .collect();

    for handle in handles {
        let value = handle.await.unwrap().unwrap();
        assert!(value < 2);
    }

    assert_eq!(cache.try_get::<i32>("task:0").as_deref(), Some(&0));
    assert_eq!(cache.try_get::<i32>("task:1").as_deref(), Some(&1));
}

#[tokio::test]
async fn test_concurrent_async_misses_may_each_run_factory() {
    let cache = create_test_cache();
    let calls = Arc::new(AtomicUsize::new(0));
    let gate = Arc::new(tokio::sync::Barrier::new(2));

    let run = |id: u32| {
        let cache = Arc::clone(&cache);
        let calls = Arc::clone(&calls);
        let gate = Arc::clone(&gate);
        async move {
            cache
                .get_or_set_async("shared", || async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    // Both callers are past their miss before either stores
                    gate.wait().await;
                    anyhow::Ok(id)
                })
                .await
                .map(|v| *v)
        }
    };

    let (a, b) = tokio::join!(run(1), run(2));
    assert_eq!(a.unwrap(), 1);
    assert_eq!(b.unwrap(), 2);
    assert_eq!(calls.load(Ordering::SeqCst), 2);

    let stored = *cache.try_get::<u32>("shared").unwrap();
    assert!(stored == 1 || stored == 2, "Last write wins");
}

// == Threads ==

#[test]
fn test_shared_across_threads() {
    let cache = create_test_cache();
    let barrier = Arc::new(Barrier::new(4));

    let handles: Vec<_> = (0..4)
        .map(|t| {
            let cache = Arc::clone(&cache);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                for i in 0..100 {
                    let key = format!("t{}:{}", t, i);
                    cache.set(key.clone(), &i).unwrap();
                    assert_eq!(cache.try_get::<i32>(&key).as_deref(), Some(&i));
                    if i % 3 == 0 {
                        assert!(cache.remove(&key));
                    }
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    // 100 keys per thread, every third removed
    assert_eq!(cache.len(), 4 * 66);
}

#[test]
fn test_concurrent_lazy_eviction_is_safe() {
    let cache = create_test_cache();
    for i in 0..50 {
        cache
            .set_with_ttl(format!("k{}", i), &i, Duration::ZERO)
            .unwrap();
    }

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let cache = Arc::clone(&cache);
            thread::spawn(move || {
                for i in 0..50 {
                    assert!(cache.try_get::<i32>(&format!("k{}", i)).is_none());
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    assert!(cache.is_empty());
}
