//! # Request Context
//!
//! The per-dispatch value handed to handlers and hooks. It is created by the
//! dispatcher after resources are acquired and the path is negotiated, is
//! owned exclusively by that dispatch, and is dropped when it ends.
//!
//! Handlers fire hooks through the context so that every hook sees the same
//! path, principal, negotiated format and shared handles:
//!
//! ```rust,ignore
//! async fn handle(&self, request: &mut RequestContext) -> Result<OperationResponse, Failure> {
//!     request.trigger_event("user_created").await?;
//!     let body = request.apply_filter("user_body", json!({"id": 7})).await?;
//!     Ok(OperationResponse::created(body))
//! }
//! ```

use crate::{
    error::Failure,
    registry::HookRegistry,
    resource::{Cache, Database, Resources},
};
use serde_json::Value;
use std::sync::Arc;

/// An already-authenticated identity.
///
/// Authentication itself happens before dispatch; this is only the slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    /// Stable identifier of the principal.
    pub id: String,
    /// Roles granted to the principal.
    pub roles: Vec<String>,
}

impl Principal {
    /// Create a principal without roles.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            roles: Vec::new(),
        }
    }

    /// Grant a role.
    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.roles.push(role.into());
        self
    }

    /// Whether the principal holds `role`.
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }
}

/// Transient state of one dispatch.
#[derive(Debug)]
pub struct RequestContext {
    path: Vec<String>,
    resources: Resources,
    hooks: Arc<HookRegistry>,
    principal: Option<Principal>,
    format: Option<String>,
}

impl RequestContext {
    /// Create a context for a negotiated path.
    pub fn new(path: Vec<String>, resources: Resources, hooks: Arc<HookRegistry>) -> Self {
        Self {
            path,
            resources,
            hooks,
            principal: None,
            format: None,
        }
    }

    /// Attach the authenticated principal.
    pub fn with_principal(mut self, principal: Option<Principal>) -> Self {
        self.principal = principal;
        self
    }

    /// Attach the negotiated output format.
    pub fn with_format(mut self, format: Option<String>) -> Self {
        self.format = format;
        self
    }

    /// The resolved path segments. Segments may be empty.
    pub fn path(&self) -> &[String] {
        &self.path
    }

    /// The segment at `index`, if any.
    pub fn segment(&self, index: usize) -> Option<&str> {
        self.path.get(index).map(String::as_str)
    }

    /// The shared database handle.
    pub fn db(&self) -> &dyn Database {
        self.resources.db()
    }

    /// The shared cache handle.
    pub fn cache(&self) -> &dyn Cache {
        self.resources.cache()
    }

    /// Both shared handles.
    pub fn resources(&self) -> &Resources {
        &self.resources
    }

    /// The authenticated principal, if any.
    pub fn principal(&self) -> Option<&Principal> {
        self.principal.as_ref()
    }

    /// The output format negotiated from the path, if any.
    pub fn format(&self) -> Option<&str> {
        self.format.as_deref()
    }

    /// The hook registry of the server.
    pub fn hooks(&self) -> &HookRegistry {
        &self.hooks
    }

    /// Fire every event hook bound to `name`.
    pub async fn trigger_event(&self, name: &str) -> Result<(), Failure> {
        self.hooks.trigger_event(name, self).await
    }

    /// Thread `content` through every filter hook bound to `name`.
    pub async fn apply_filter(&self, name: &str, content: Value) -> Result<Value, Failure> {
        self.hooks.apply_filter(name, content, self).await
    }
}
