//! Testing utilities for Rester.
//!
//! This module provides in-memory collaborators so dispatch pipelines can be
//! exercised without real storage or sockets.
//!
//! # Features
//!
//! - [`MemoryDatabase`] / [`MemoryCache`]: in-memory shared handles
//! - [`StaticProvider`]: always hands out the same in-memory handles
//! - [`FailingProvider`]: refuses database or cache connections a number of times
//! - [`RecordingEvent`]: an event hook that appends a label to a shared log
//! - [`CapturingReporter`]: collects reported unhandled failures
//! - [`CapturedTransport`]: collects emitted responses

use crate::{
    classify::ErrorReporter,
    emit::{EmitError, Transport},
    pool::ResourceProvider,
};
use rester_core::{
    BoxError, Cache, Database, EventHook, Failure, HttpResponse, RequestContext, ResourceError,
};
use serde_json::Value;
use std::{
    any::Any,
    collections::HashMap,
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
};

// ============================================================================
// In-memory handles
// ============================================================================

/// A key-value store standing in for a database.
#[derive(Debug, Default)]
pub struct MemoryDatabase {
    records: Mutex<HashMap<String, Value>>,
    closes: AtomicUsize,
}

impl MemoryDatabase {
    /// Create an empty database.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a record, failing with a duplication conflict if `key` exists.
    pub fn insert(&self, key: impl Into<String>, value: Value) -> Result<(), Failure> {
        let key = key.into();
        let mut records = self.records.lock().unwrap();
        if records.contains_key(&key) {
            return Err(Failure::duplication(key));
        }
        records.insert(key, value);
        Ok(())
    }

    /// Fetch a record.
    pub fn get(&self, key: &str) -> Option<Value> {
        self.records.lock().unwrap().get(key).cloned()
    }

    /// Number of times `close` was called.
    pub fn close_count(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

impl Database for MemoryDatabase {
    fn close(&self) -> Result<(), BoxError> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// A key-value map standing in for a cache.
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<String, Value>>,
}

impl MemoryCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a value.
    pub fn set(&self, key: impl Into<String>, value: Value) {
        self.entries.lock().unwrap().insert(key.into(), value);
    }

    /// Read a value.
    pub fn get(&self, key: &str) -> Option<Value> {
        self.entries.lock().unwrap().get(key).cloned()
    }
}

impl Cache for MemoryCache {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

// ============================================================================
// Providers
// ============================================================================

/// A provider that always hands out the same in-memory handles.
#[derive(Debug, Clone, Default)]
pub struct StaticProvider {
    db: Arc<MemoryDatabase>,
    cache: Arc<MemoryCache>,
    db_connects: Arc<AtomicUsize>,
    cache_connects: Arc<AtomicUsize>,
}

impl StaticProvider {
    /// Create a provider with fresh handles.
    pub fn new() -> Self {
        Self::default()
    }

    /// The database this provider hands out.
    pub fn database(&self) -> Arc<MemoryDatabase> {
        self.db.clone()
    }

    /// The cache this provider hands out.
    pub fn cache(&self) -> Arc<MemoryCache> {
        self.cache.clone()
    }

    /// How many times the database was opened.
    pub fn db_connects(&self) -> usize {
        self.db_connects.load(Ordering::SeqCst)
    }

    /// How many times the cache was opened.
    pub fn cache_connects(&self) -> usize {
        self.cache_connects.load(Ordering::SeqCst)
    }
}

impl ResourceProvider for StaticProvider {
    async fn connect_db(&self, _descriptor: &Value) -> Result<Arc<dyn Database>, ResourceError> {
        self.db_connects.fetch_add(1, Ordering::SeqCst);
        Ok(self.db.clone())
    }

    async fn connect_cache(&self, _descriptor: &Value) -> Result<Arc<dyn Cache>, ResourceError> {
        self.cache_connects.fetch_add(1, Ordering::SeqCst);
        Ok(self.cache.clone())
    }
}

/// A provider whose database, or cache, refuses connections a number of times.
#[derive(Debug, Clone)]
pub struct FailingProvider {
    inner: StaticProvider,
    fails_cache: bool,
    remaining_failures: Arc<AtomicUsize>,
    attempts: Arc<AtomicUsize>,
}

impl FailingProvider {
    /// Fail every database connection.
    pub fn always() -> Self {
        Self::failing_times(usize::MAX)
    }

    /// Fail the first `times` database connections.
    pub fn failing_times(times: usize) -> Self {
        Self {
            inner: StaticProvider::new(),
            fails_cache: false,
            remaining_failures: Arc::new(AtomicUsize::new(times)),
            attempts: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Fail the first `times` cache connections; the database always opens.
    pub fn cache_failing_times(times: usize) -> Self {
        Self {
            fails_cache: true,
            ..Self::failing_times(times)
        }
    }

    /// How many connections were attempted on the failing handle.
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    /// The provider handing out the handles once connections succeed.
    pub fn inner(&self) -> &StaticProvider {
        &self.inner
    }

    fn refuse(&self) -> Option<BoxError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        self.remaining_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .ok()?;
        let refused: BoxError =
            std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "connection refused").into();
        Some(refused)
    }
}

impl ResourceProvider for FailingProvider {
    async fn connect_db(&self, descriptor: &Value) -> Result<Arc<dyn Database>, ResourceError> {
        if !self.fails_cache {
            if let Some(error) = self.refuse() {
                return Err(ResourceError::Database(error));
            }
        }
        self.inner.connect_db(descriptor).await
    }

    async fn connect_cache(&self, descriptor: &Value) -> Result<Arc<dyn Cache>, ResourceError> {
        if self.fails_cache {
            if let Some(error) = self.refuse() {
                return Err(ResourceError::Cache(error));
            }
        }
        self.inner.connect_cache(descriptor).await
    }
}

// ============================================================================
// Hooks and sinks
// ============================================================================

/// An event hook that appends its label to a shared log.
///
/// # Example
///
/// ```rust,ignore
/// let log = Arc::new(Mutex::new(Vec::new()));
/// registry.bind_event("request", RecordingEvent::new("first", log.clone()));
/// registry.bind_event("request", RecordingEvent::new("second", log.clone()));
/// // after a dispatch: *log.lock().unwrap() == ["first", "second"]
/// ```
#[derive(Debug, Clone)]
pub struct RecordingEvent {
    label: String,
    log: Arc<Mutex<Vec<String>>>,
}

impl RecordingEvent {
    /// Create a hook writing `label` to `log`.
    pub fn new(label: impl Into<String>, log: Arc<Mutex<Vec<String>>>) -> Self {
        Self {
            label: label.into(),
            log,
        }
    }
}

impl EventHook for RecordingEvent {
    async fn on_event(&self, _request: &RequestContext) -> Result<(), Failure> {
        self.log.lock().unwrap().push(self.label.clone());
        Ok(())
    }
}

/// An [`ErrorReporter`] that keeps every reported message.
#[derive(Debug, Clone, Default)]
pub struct CapturingReporter {
    messages: Arc<Mutex<Vec<String>>>,
}

impl CapturingReporter {
    /// Create an empty reporter.
    pub fn new() -> Self {
        Self::default()
    }

    /// Messages of the reported failures.
    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().unwrap().clone()
    }

    /// Number of reported failures.
    pub fn count(&self) -> usize {
        self.messages.lock().unwrap().len()
    }
}

impl ErrorReporter for CapturingReporter {
    fn report(&self, failure: &Failure) {
        self.messages.lock().unwrap().push(failure.to_string());
    }
}

/// A [`Transport`] that keeps every response it is sent.
#[derive(Debug, Clone, Default)]
pub struct CapturedTransport {
    sent: Arc<Mutex<Vec<HttpResponse>>>,
}

impl CapturedTransport {
    /// Create an empty transport.
    pub fn new() -> Self {
        Self::default()
    }

    /// The responses sent so far.
    pub fn sent(&self) -> Vec<HttpResponse> {
        self.sent.lock().unwrap().clone()
    }

    /// Number of responses sent.
    pub fn count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }
}

impl Transport for CapturedTransport {
    async fn send(&mut self, response: HttpResponse) -> Result<(), EmitError> {
        self.sent.lock().unwrap().push(response);
        Ok(())
    }
}
