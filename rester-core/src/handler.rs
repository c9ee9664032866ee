//! # Request Handler
//!
//! The collaborator that interprets the negotiated path and runs business
//! logic. It is the only place routing decisions happen. It either produces an
//! [`OperationResponse`] or raises a [`Failure`]; it never builds the HTTP
//! response itself.

use crate::{context::RequestContext, error::Failure, response::OperationResponse};
use std::{future::Future, pin::Pin};

/// Boxed future returned by [`DynHandler`].
pub type HandlerFuture<'a> =
    Pin<Box<dyn Future<Output = Result<OperationResponse, Failure>> + Send + 'a>>;

/// The business-logic endpoint of a dispatch.
#[diagnostic::on_unimplemented(
    message = "`{Self}` is not a request `Handler`",
    label = "missing `Handler` implementation",
    note = "Handlers must implement `handle`, or wrap a closure with `handler_fn`."
)]
pub trait Handler: Send + Sync + 'static {
    /// Interpret the request path and execute it.
    fn handle(
        &self,
        request: &mut RequestContext,
    ) -> impl Future<Output = Result<OperationResponse, Failure>> + Send;
}

/// Dynamic object-safe version of [`Handler`].
pub trait DynHandler: Send + Sync + 'static {
    /// Interpret the request path and execute it (dynamic dispatch version).
    fn handle_dyn<'a>(&'a self, request: &'a mut RequestContext) -> HandlerFuture<'a>;
}

impl<T: Handler> DynHandler for T {
    fn handle_dyn<'a>(&'a self, request: &'a mut RequestContext) -> HandlerFuture<'a> {
        Box::pin(self.handle(request))
    }
}

/// A synchronous closure used as a [`Handler`].
pub struct HandlerFn<F>(F);

/// Wrap a synchronous closure as a handler.
pub fn handler_fn<F>(f: F) -> HandlerFn<F>
where
    F: Fn(&mut RequestContext) -> Result<OperationResponse, Failure> + Send + Sync + 'static,
{
    HandlerFn(f)
}

impl<F> Handler for HandlerFn<F>
where
    F: Fn(&mut RequestContext) -> Result<OperationResponse, Failure> + Send + Sync + 'static,
{
    async fn handle(&self, request: &mut RequestContext) -> Result<OperationResponse, Failure> {
        (self.0)(request)
    }
}
