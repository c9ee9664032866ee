//! # rester-core
//!
//! Core contracts for the Rester request-dispatch pipeline.
//!
//! This crate has minimal dependencies and is designed to be imported by
//! handlers and hook plugins that don't need the full `rester-std`
//! implementation.
//!
//! # Pipeline
//!
//! ```text
//! transport → Dispatcher → negotiation → Handler ⇄ HookRegistry
//!                 │                          │
//!                 └──── Failure ─→ classifier ┘→ OperationResponse → HttpResponse → transport
//! ```
//!
//! ## Hooks ([`EventHook`], [`FilterHook`])
//!
//! Named callbacks on two independent channels. Events notify, filters
//! transform a value as a left fold over their registration order.
//!
//! ## Registry ([`HookRegistry`])
//!
//! Append-only storage of bindings, populated at startup and shared read-only
//! while dispatching.
//!
//! ## Context ([`RequestContext`])
//!
//! Per-dispatch state: negotiated path, borrowed shared handles, principal and
//! negotiated format.
//!
//! ## Handler ([`Handler`])
//!
//! The business-logic endpoint. Produces an [`OperationResponse`] or raises a
//! [`Failure`].
//!
//! # Error Types
//!
//! - [`Failure`] - The tagged failure taxonomy classified by the dispatcher
//! - [`ResourceError`] - Shared resource acquisition errors

#![deny(clippy::wildcard_imports)]
#![warn(missing_docs)]

mod context;
mod error;
mod handler;
mod hook;
mod registry;
mod resource;
mod response;

// Re-exports
pub use context::{Principal, RequestContext};
pub use error::{BoxError, Failure, FailureExt, FailureKind, ResourceError};
pub use handler::{DynHandler, Handler, HandlerFn, HandlerFuture, handler_fn};
pub use hook::{
    Callback, Channel, DynEventHook, DynFilterHook, EventFn, EventHook, FilterFn, FilterHook,
    HookFuture, event_fn, filter_fn,
};
pub use registry::{HookBinding, HookRegistry};
pub use resource::{Cache, Database, Resources};
pub use response::{Headers, HttpResponse, OperationResponse};

pub use http::{StatusCode, Version};
