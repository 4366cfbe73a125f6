// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Read-through and background write behavior of `Cache`.

use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use ohno::ErrorExt;
use stowage::{Cache, CacheBackend, CacheOp, Collection, ErrorKind, MockBackend, Value, ValueType};
use tracing_subscriber::fmt::MakeWriter;

/// Captures formatted log output of the current thread.
#[derive(Debug, Clone, Default)]
struct LogCapture {
    buffer: Arc<Mutex<Vec<u8>>>,
}

impl LogCapture {
    fn output(&self) -> String {
        String::from_utf8_lossy(&self.buffer.lock().unwrap()).to_string()
    }

    fn assert_contains(&self, expected: &str) {
        let output = self.output();
        assert!(output.contains(expected), "log output does not contain '{expected}', got:\n{output}");
    }

    fn subscriber(&self) -> impl tracing::Subscriber {
        use tracing_subscriber::layer::SubscriberExt;
        tracing_subscriber::registry().with(tracing_subscriber::fmt::layer().with_writer(self.clone()).with_ansi(false))
    }
}

impl<'a> MakeWriter<'a> for LogCapture {
    type Writer = LogCaptureWriter;

    fn make_writer(&'a self) -> Self::Writer {
        LogCaptureWriter {
            buffer: Arc::clone(&self.buffer),
        }
    }
}

struct LogCaptureWriter {
    buffer: Arc<Mutex<Vec<u8>>>,
}

impl Write for LogCaptureWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.buffer.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

async fn settle() {
    for _ in 0..20 {
        tokio::task::yield_now().await;
    }
}

async fn registered(collection: &Collection) -> (MockBackend, Cache) {
    let backend = MockBackend::new();
    let cache = Cache::new(backend.clone());
    cache.register(collection.clone()).await.expect("register failed");
    (backend, cache)
}

fn users() -> Collection {
    Collection::new("users", ValueType::String)
}

#[tokio::test]
async fn miss_fetches_once_and_later_calls_hit() {
    let users = users();
    let (backend, cache) = registered(&users).await;
    let key = users.key("42");
    let calls = AtomicUsize::new(0);

    let first: String = cache
        .get_or_set(&key, |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Ok::<_, std::io::Error>("ada".to_owned()) }
        })
        .await
        .expect("get_or_set failed");
    assert_eq!(first, "ada");

    settle().await;
    assert!(backend.contains_key(&key), "the fetched value should be written in the background");

    let second: String = cache
        .get_or_set(&key, |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Ok::<_, std::io::Error>("grace".to_owned()) }
        })
        .await
        .expect("get_or_set failed");
    assert_eq!(second, "ada");
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn fetch_errors_propagate_and_nothing_is_cached() {
    let users = users();
    let (backend, cache) = registered(&users).await;
    let key = users.key("42");

    let error = cache
        .get_or_set::<String, _, _, _>(&key, |_| async { Err(std::io::Error::other("directory unavailable")) })
        .await
        .expect_err("fetch error should propagate");
    assert_eq!(error.kind(), ErrorKind::Fetch);
    let source = error.find_source::<std::io::Error>().expect("io error should be the source");
    assert_eq!(source.to_string(), "directory unavailable");

    settle().await;
    assert!(!backend.operations().iter().any(|op| matches!(op, CacheOp::Set { .. })));
    assert_eq!(backend.entry_count(), 0);
}

#[tokio::test]
async fn backend_read_failure_is_logged_and_treated_as_a_miss() {
    let capture = LogCapture::default();
    let _guard = tracing::subscriber::set_default(capture.subscriber());

    let users = users();
    let (backend, cache) = registered(&users).await;
    backend.fail_when(|op| matches!(op, CacheOp::Get(_)));

    let value: String = cache
        .get_or_set(&users.key("42"), |_| async { Ok::<_, std::io::Error>("ada".to_owned()) })
        .await
        .expect("a failing cache should not fail the lookup");
    assert_eq!(value, "ada");

    capture.assert_contains("cache read failed, fetching instead");
    capture.assert_contains("mock: get failed");
}

#[tokio::test]
async fn usage_errors_propagate_without_fetching() {
    let users = users();
    let (_backend, cache) = registered(&users).await;
    let calls = AtomicUsize::new(0);

    let unregistered = Collection::new("orders", ValueType::String).key("1");
    let error = cache
        .get_or_set(&unregistered, |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Ok::<_, std::io::Error>("x".to_owned()) }
        })
        .await
        .expect_err("unregistered collection should fail");
    assert_eq!(error.kind(), ErrorKind::Usage);
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn cached_value_of_another_type_is_a_usage_error() {
    let users = users();
    let (_backend, cache) = registered(&users).await;
    let key = users.key("42");
    cache.set(&key, Value::from("ada")).await.expect("set failed");

    let error = cache
        .get_or_set::<i64, _, _, _>(&key, |_| async { Ok::<_, std::io::Error>(7) })
        .await
        .expect_err("type mismatch should fail");
    assert_eq!(error.kind(), ErrorKind::Usage);
}

#[tokio::test]
async fn failed_background_write_is_logged_not_returned() {
    let capture = LogCapture::default();
    let _guard = tracing::subscriber::set_default(capture.subscriber());

    let users = users();
    let (backend, cache) = registered(&users).await;
    backend.fail_when(|op| matches!(op, CacheOp::Set { .. }));

    let value: String = cache
        .get_or_set(&users.key("42"), |_| async { Ok::<_, std::io::Error>("ada".to_owned()) })
        .await
        .expect("write failures should not surface");
    assert_eq!(value, "ada");

    settle().await;
    capture.assert_contains("failed to write to cache");
    assert_eq!(backend.entry_count(), 0);
}

#[tokio::test]
async fn set_async_and_del_async_report_through_their_handles() {
    let users = users();
    let (backend, cache) = registered(&users).await;
    let key = users.key("42");

    cache.set_async(&key, "ada".to_owned()).await.expect("set_async failed");
    assert_eq!(cache.get(&key).await.expect("get failed"), Some(Value::from("ada")));

    cache.del_async(&key).await.expect("del_async failed");
    assert_eq!(cache.get(&key).await.expect("get failed"), None);

    backend.fail_when(|op| matches!(op, CacheOp::Del(_)));
    let error = cache.del_async(&key).await.expect_err("injected failure should be returned");
    assert_eq!(error.kind(), ErrorKind::Backend);

    let mistyped = cache.set_async(&key, 5_i64).await.expect_err("int into a string collection");
    assert_eq!(mistyped.kind(), ErrorKind::Usage);
}

#[tokio::test]
async fn dropped_handles_still_complete() {
    let users = users();
    let (backend, cache) = registered(&users).await;
    let key = users.key("42");

    drop(cache.set_async(&key, "ada".to_owned()));
    settle().await;
    assert!(backend.contains_key(&key));

    drop(cache.del_async(&key));
    settle().await;
    assert!(!backend.contains_key(&key));
}
