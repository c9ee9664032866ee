//! # rester-std
//!
//! Standard implementations for the Rester request-dispatch pipeline.
//!
//! This crate provides:
//! - **Configuration**: [`Settings`] layered from files, TOML and `RESTER__` environment
//! - **Dispatch**: [`Dispatcher`], [`DispatcherBuilder`], [`Request`]
//! - **Negotiation**: [`ContentNegotiator`] for path-extension output formats
//! - **Classification**: [`ErrorClassifier`] with pluggable [`ErrorReporter`]s
//! - **Rendering**: [`Responder`] and the [`render`] formats
//! - **Emission**: [`ResponseEmitter`] and [`Transport`]s
//! - **Resources**: [`ResourcePool`] with a [`ShutdownGuard`]
//! - **Hooks from configuration**: [`HookCatalog`]

#![deny(clippy::wildcard_imports)]
#![warn(missing_docs)]

// Re-export core contracts
pub use rester_core;

// Modules
pub mod catalog;
pub mod classify;
pub mod dispatch;
pub mod emit;
pub mod negotiate;
pub mod pool;
pub mod render;
pub mod respond;
pub mod settings;
pub mod telemetry;
pub mod testing;

pub use catalog::HookCatalog;
pub use classify::{ErrorClassifier, ErrorReporter, TracingReporter};
pub use dispatch::{
    Dispatcher, DispatcherBuilder, FINISH_EVENT, REQUEST_EVENT, RESPONSE_FILTER, Request,
};
pub use emit::{EmitError, ResponseEmitter, Transport, WriterTransport};
pub use negotiate::{ContentNegotiator, Negotiation};
pub use pool::{ResourcePool, ResourceProvider, ShutdownGuard};
pub use render::{RenderError, Renderer, Renderers};
pub use respond::Responder;
pub use settings::{ApplicationSettings, HttpVersion, RuntimeMode, Settings, SettingsError};
pub use telemetry::{TelemetryError, init_tracing};
