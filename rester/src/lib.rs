//! # rester - Request-Dispatch Core for REST Servers
//!
//! `rester` turns an inbound request path into exactly one HTTP response. It
//! negotiates the output format from the path, runs the business-logic
//! handler between named event and filter hooks, and classifies every failure
//! into a structured 4xx/5xx body.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use rester::prelude::*;
//!
//! let settings = Settings::builder().file("rester.toml").build()?;
//! let dispatcher = Dispatcher::builder(settings, MyProvider::new())
//!     .catalog(HookCatalog::new().event("audit", AuditHook))
//!     .handler(handler_fn(|request| {
//!         match request.segment(0) {
//!             Some("users") => Ok(OperationResponse::ok(json!([]))),
//!             _ => Err(Failure::invalid_argument("unknown resource")),
//!         }
//!     }))
//!     .build()?;
//!
//! let _guard = dispatcher.pool().shutdown_guard();
//! let response = dispatcher.dispatch(Request::parse("/users.csv")).await;
//! ```

#![deny(clippy::wildcard_imports)]
#![warn(missing_docs)]

pub use rester_core::{
    // Errors
    BoxError,
    // Resources
    Cache,
    // Hooks
    Callback,
    Channel,
    Database,
    DynEventHook,
    DynFilterHook,
    // Handler
    DynHandler,
    EventFn,
    EventHook,
    Failure,
    FailureExt,
    FailureKind,
    FilterFn,
    FilterHook,
    Handler,
    HandlerFn,
    HandlerFuture,
    // Responses
    Headers,
    // Registry
    HookBinding,
    HookFuture,
    HookRegistry,
    HttpResponse,
    OperationResponse,
    // Context
    Principal,
    RequestContext,
    ResourceError,
    Resources,
    StatusCode,
    Version,
    event_fn,
    filter_fn,
    handler_fn,
};

pub use rester_std::{
    ApplicationSettings, ContentNegotiator, Dispatcher, DispatcherBuilder, EmitError,
    ErrorClassifier, ErrorReporter, FINISH_EVENT, HookCatalog, HttpVersion, Negotiation,
    REQUEST_EVENT, RESPONSE_FILTER, RenderError, Renderer, Renderers, Request, ResourcePool,
    ResourceProvider, Responder, ResponseEmitter, RuntimeMode, Settings, SettingsError,
    ShutdownGuard, TelemetryError, TracingReporter, Transport, WriterTransport, init_tracing,
};

/// Built-in body renderers.
pub mod render {
    pub use rester_std::render::{CsvRenderer, JsonRenderer, TextRenderer};
}

/// Testing utilities.
pub mod testing {
    #![allow(clippy::wildcard_imports)]
    pub use rester_std::testing::*;
}

/// Prelude module - common imports for Rester.
///
/// # Usage
///
/// ```rust,ignore
/// use rester::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{
        // Dispatch
        Dispatcher,
        // Hooks
        EventHook,
        // Errors
        Failure,
        FailureExt,
        FilterHook,
        // Handler
        Handler,
        HookCatalog,
        HookRegistry,
        OperationResponse,
        Request,
        RequestContext,
        ResourceProvider,
        // Configuration
        Settings,
        event_fn,
        filter_fn,
        handler_fn,
    };
}
