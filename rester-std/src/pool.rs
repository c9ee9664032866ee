//! Process-wide shared resources.
//!
//! The [`ResourcePool`] is the root owner of the database and cache handles.
//! Both are created lazily on the first [`ResourcePool::acquire`] and then
//! reused by every dispatch. A failed acquisition is not cached, so the next
//! dispatch tries again.
//!
//! Closing the database at process shutdown is tied to a [`ShutdownGuard`],
//! which closes it when dropped, including during unwinding:
//!
//! ```rust,ignore
//! let pool = Arc::new(ResourcePool::new(provider, &settings));
//! let _guard = pool.shutdown_guard();
//! serve(dispatcher).await;
//! // the shared database is closed here, however `serve` exits
//! ```

use crate::settings::Settings;
use rester_core::{Cache, Database, ResourceError, Resources};
use serde_json::Value;
use std::{
    fmt,
    future::Future,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};
use tokio::sync::OnceCell;

/// Opens the shared handles from their configured descriptors.
pub trait ResourceProvider: Send + Sync + 'static {
    /// Open the database described by `application.db`.
    fn connect_db(
        &self,
        descriptor: &Value,
    ) -> impl Future<Output = Result<Arc<dyn Database>, ResourceError>> + Send;

    /// Open the cache described by `application.cache`.
    fn connect_cache(
        &self,
        descriptor: &Value,
    ) -> impl Future<Output = Result<Arc<dyn Cache>, ResourceError>> + Send;
}

/// Lazily created, shared database and cache handles.
pub struct ResourcePool<P> {
    provider: P,
    db_descriptor: Value,
    cache_descriptor: Value,
    close_on_shutdown: bool,
    db: OnceCell<Arc<dyn Database>>,
    cache: OnceCell<Arc<dyn Cache>>,
    closed: AtomicBool,
}

impl<P: ResourceProvider> ResourcePool<P> {
    /// Create a pool reading descriptors from `application.db` and `application.cache`.
    pub fn new(provider: P, settings: &Settings) -> Self {
        let application = settings.application();
        Self {
            provider,
            db_descriptor: application.db.clone(),
            cache_descriptor: application.cache.clone(),
            close_on_shutdown: application.close_on_shutdown,
            db: OnceCell::new(),
            cache: OnceCell::new(),
            closed: AtomicBool::new(false),
        }
    }

    /// Borrow the shared handles, creating them on first use.
    pub async fn acquire(&self) -> Result<Resources, ResourceError> {
        let db = self
            .db
            .get_or_try_init(|| async {
                tracing::info!("opening shared database");
                self.provider.connect_db(&self.db_descriptor).await
            })
            .await?;
        let cache = self
            .cache
            .get_or_try_init(|| async {
                tracing::info!("opening shared cache");
                self.provider.connect_cache(&self.cache_descriptor).await
            })
            .await?;
        Ok(Resources::new(db.clone(), cache.clone()))
    }

    /// The provider the pool opens handles with.
    pub fn provider(&self) -> &P {
        &self.provider
    }
}

impl<P> ResourcePool<P> {
    /// Whether the database handle has been created.
    pub fn is_connected(&self) -> bool {
        self.db.initialized()
    }

    /// Close the shared database if it was opened. Idempotent.
    ///
    /// Closing an unopened pool does nothing, so a database opened afterwards
    /// is still closed by the next call.
    pub fn close(&self) -> Result<(), ResourceError> {
        let Some(db) = self.db.get() else {
            return Ok(());
        };
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        tracing::info!("closing shared database");
        db.close().map_err(ResourceError::Close)
    }

    /// A guard that closes the database when dropped.
    ///
    /// When `application.close_on_shutdown` is false the guard does nothing.
    pub fn shutdown_guard(self: &Arc<Self>) -> ShutdownGuard
    where
        P: Send + Sync + 'static,
    {
        ShutdownGuard {
            pool: self.close_on_shutdown.then(|| Arc::clone(self) as Arc<dyn Closable>),
        }
    }
}

impl<P> fmt::Debug for ResourcePool<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourcePool")
            .field("db", &self.db.initialized())
            .field("cache", &self.cache.initialized())
            .field("closed", &self.closed.load(Ordering::Acquire))
            .finish()
    }
}

trait Closable: Send + Sync {
    fn close_now(&self) -> Result<(), ResourceError>;
}

impl<P: Send + Sync> Closable for ResourcePool<P> {
    fn close_now(&self) -> Result<(), ResourceError> {
        self.close()
    }
}

/// Closes the shared database when dropped.
#[must_use = "the database is closed as soon as the guard is dropped"]
pub struct ShutdownGuard {
    pool: Option<Arc<dyn Closable>>,
}

impl ShutdownGuard {
    /// Give up the guard without closing anything.
    pub fn disarm(mut self) {
        self.pool = None;
    }
}

impl Drop for ShutdownGuard {
    fn drop(&mut self) {
        if let Some(pool) = self.pool.take() {
            if let Err(error) = pool.close_now() {
                tracing::error!(%error, "shared database did not close cleanly");
            }
        }
    }
}

impl fmt::Debug for ShutdownGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShutdownGuard")
            .field("armed", &self.pool.is_some())
            .finish()
    }
}
