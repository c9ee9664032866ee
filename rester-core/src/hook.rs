//! # Hooks
//!
//! Hooks are callbacks bound by name on one of two channels:
//!
//! - **Event** hooks are fire-and-forget notifications. Their return value is
//!   discarded; only a failure is observed.
//! - **Filter** hooks transform a value in flight. Each filter receives the
//!   output of the previous one.
//!
//! Both receive the [`RequestContext`] of the dispatch, which exposes the shared
//! database and cache handles.
//!
//! # Static vs Dynamic Dispatch
//!
//! [`EventHook`] and [`FilterHook`] use native `async fn` for zero-cost static
//! dispatch. The registry stores them behind the object-safe [`DynEventHook`] and
//! [`DynFilterHook`], which every hook implements through a blanket impl.

use crate::{context::RequestContext, error::Failure};
use serde_json::Value;
use std::{fmt, future::Future, pin::Pin, sync::Arc};

/// The channel a hook is bound on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    /// Notification hooks.
    Event,
    /// Transforming hooks.
    Filter,
}

impl Channel {
    /// Configuration section name of the channel.
    pub const fn as_str(self) -> &'static str {
        match self {
            Channel::Event => "event",
            Channel::Filter => "filter",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A notification hook.
#[diagnostic::on_unimplemented(
    message = "`{Self}` is not an `EventHook`",
    label = "missing `EventHook` implementation",
    note = "Event hooks must implement `on_event`, or wrap a closure with `event_fn`."
)]
pub trait EventHook: Send + Sync + 'static {
    /// Called when the event this hook is bound to is triggered.
    fn on_event(
        &self,
        request: &RequestContext,
    ) -> impl Future<Output = Result<(), Failure>> + Send;
}

/// A transforming hook.
#[diagnostic::on_unimplemented(
    message = "`{Self}` is not a `FilterHook`",
    label = "missing `FilterHook` implementation",
    note = "Filter hooks must implement `apply`, or wrap a closure with `filter_fn`."
)]
pub trait FilterHook: Send + Sync + 'static {
    /// Transform `content`, returning the input of the next filter.
    fn apply(
        &self,
        request: &RequestContext,
        content: Value,
    ) -> impl Future<Output = Result<Value, Failure>> + Send;
}

/// Boxed future returned by the dynamic hook traits.
pub type HookFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, Failure>> + Send + 'a>>;

/// Dynamic object-safe version of [`EventHook`].
pub trait DynEventHook: Send + Sync + 'static {
    /// Called when the event is triggered (dynamic dispatch version).
    fn on_event_dyn<'a>(&'a self, request: &'a RequestContext) -> HookFuture<'a, ()>;
}

/// Dynamic object-safe version of [`FilterHook`].
pub trait DynFilterHook: Send + Sync + 'static {
    /// Transform `content` (dynamic dispatch version).
    fn apply_dyn<'a>(&'a self, request: &'a RequestContext, content: Value)
    -> HookFuture<'a, Value>;
}

impl<T: EventHook> DynEventHook for T {
    fn on_event_dyn<'a>(&'a self, request: &'a RequestContext) -> HookFuture<'a, ()> {
        Box::pin(self.on_event(request))
    }
}

impl<T: FilterHook> DynFilterHook for T {
    fn apply_dyn<'a>(
        &'a self,
        request: &'a RequestContext,
        content: Value,
    ) -> HookFuture<'a, Value> {
        Box::pin(self.apply(request, content))
    }
}

/// A synchronous closure used as an [`EventHook`].
pub struct EventFn<F>(F);

/// Wrap a synchronous closure as an event hook.
///
/// ```rust,ignore
/// registry.bind_event("user_created", event_fn(|request| {
///     tracing::info!(path = ?request.path(), "user created");
///     Ok(())
/// }));
/// ```
pub fn event_fn<F>(f: F) -> EventFn<F>
where
    F: Fn(&RequestContext) -> Result<(), Failure> + Send + Sync + 'static,
{
    EventFn(f)
}

impl<F> EventHook for EventFn<F>
where
    F: Fn(&RequestContext) -> Result<(), Failure> + Send + Sync + 'static,
{
    async fn on_event(&self, request: &RequestContext) -> Result<(), Failure> {
        (self.0)(request)
    }
}

/// A synchronous closure used as a [`FilterHook`].
pub struct FilterFn<F>(F);

/// Wrap a synchronous closure as a filter hook.
pub fn filter_fn<F>(f: F) -> FilterFn<F>
where
    F: Fn(&RequestContext, Value) -> Result<Value, Failure> + Send + Sync + 'static,
{
    FilterFn(f)
}

impl<F> FilterHook for FilterFn<F>
where
    F: Fn(&RequestContext, Value) -> Result<Value, Failure> + Send + Sync + 'static,
{
    async fn apply(&self, request: &RequestContext, content: Value) -> Result<Value, Failure> {
        (self.0)(request, content)
    }
}

/// A shareable hook reference, tagged with its channel.
///
/// Cloning a `Callback` clones the reference, not the hook: binding the same
/// callback twice makes the same hook fire twice.
#[derive(Clone)]
pub enum Callback {
    /// An event hook.
    Event(Arc<dyn DynEventHook>),
    /// A filter hook.
    Filter(Arc<dyn DynFilterHook>),
}

impl Callback {
    /// Wrap an event hook.
    pub fn event<H: EventHook>(hook: H) -> Self {
        Callback::Event(Arc::new(hook))
    }

    /// Wrap a filter hook.
    pub fn filter<H: FilterHook>(hook: H) -> Self {
        Callback::Filter(Arc::new(hook))
    }

    /// The channel this callback belongs to.
    pub fn channel(&self) -> Channel {
        match self {
            Callback::Event(_) => Channel::Event,
            Callback::Filter(_) => Channel::Filter,
        }
    }
}

impl fmt::Debug for Callback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Callback").field(&self.channel()).finish()
    }
}
