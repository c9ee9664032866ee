//! Shared resource handles.
//!
//! The database and cache handles are process-wide singletons owned by a root
//! resource holder. A dispatch only ever borrows them through [`Resources`],
//! which clones the `Arc`s and never closes anything.

use crate::error::BoxError;
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// A shared database handle.
///
/// The dispatch core only needs to close it at shutdown. Handlers reach the
/// concrete driver through [`Resources::db_as`].
pub trait Database: Send + Sync + 'static {
    /// Release the underlying connection.
    fn close(&self) -> Result<(), BoxError>;

    /// Upcast for downcasting to the concrete driver.
    fn as_any(&self) -> &dyn Any;
}

/// A shared cache handle. Opaque to the dispatch core.
pub trait Cache: Send + Sync + 'static {
    /// Upcast for downcasting to the concrete client.
    fn as_any(&self) -> &dyn Any;
}

/// The borrowed handles available to one dispatch.
#[derive(Clone)]
pub struct Resources {
    db: Arc<dyn Database>,
    cache: Arc<dyn Cache>,
}

impl Resources {
    /// Bundle the shared handles.
    pub fn new(db: Arc<dyn Database>, cache: Arc<dyn Cache>) -> Self {
        Self { db, cache }
    }

    /// The shared database handle.
    pub fn db(&self) -> &dyn Database {
        &*self.db
    }

    /// The shared cache handle.
    pub fn cache(&self) -> &dyn Cache {
        &*self.cache
    }

    /// The database handle as its concrete type.
    pub fn db_as<T: 'static>(&self) -> Option<&T> {
        self.db.as_any().downcast_ref::<T>()
    }

    /// The cache handle as its concrete type.
    pub fn cache_as<T: 'static>(&self) -> Option<&T> {
        self.cache.as_any().downcast_ref::<T>()
    }

    /// Whether both bundles point at the same singletons.
    pub fn same_handles(&self, other: &Resources) -> bool {
        Arc::ptr_eq(&self.db, &other.db) && Arc::ptr_eq(&self.cache, &other.cache)
    }
}

impl fmt::Debug for Resources {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resources").finish_non_exhaustive()
    }
}
