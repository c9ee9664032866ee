//! The per-request pipeline.
//!
//! One call to [`Dispatcher::dispatch`] walks a request through
//!
//! ```text
//! Start → ResourcesAcquired → Negotiated → HandlerInvoked → Responded
//! ```
//!
//! and always ends with exactly one [`HttpResponse`]. Every [`Failure`],
//! including a failed resource acquisition or a handler panic, is caught once
//! at this boundary, classified, and formatted by the [`Responder`], which
//! needs no resources of its own.
//!
//! Around the handler the dispatcher fires the lifecycle hooks
//! [`REQUEST_EVENT`], [`RESPONSE_FILTER`] and [`FINISH_EVENT`].

use crate::{
    catalog::HookCatalog,
    classify::{ErrorClassifier, ErrorReporter, TracingReporter},
    emit::{EmitError, Transport},
    negotiate::{ContentNegotiator, Negotiation},
    pool::{ResourcePool, ResourceProvider},
    render::Renderers,
    respond::Responder,
    settings::{Settings, SettingsError},
};
use futures::FutureExt;
use rester_core::{
    DynHandler, Failure, Handler, HookRegistry, HttpResponse, OperationResponse, Principal,
    RequestContext,
};
use std::{fmt, panic::AssertUnwindSafe, sync::Arc};
use tracing::Instrument;

/// Event fired after negotiation, before the handler runs.
pub const REQUEST_EVENT: &str = "request";
/// Filter threaded over the body of a successful response.
pub const RESPONSE_FILTER: &str = "response";
/// Event fired after a successful handler and response filter.
pub const FINISH_EVENT: &str = "finish";

/// An inbound request, as handed over by the transport.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Request {
    /// Path segments, in order. Segments may be empty.
    pub path: Vec<String>,
    /// The already-authenticated principal, if any.
    pub principal: Option<Principal>,
}

impl Request {
    /// Create a request from path segments.
    pub fn new<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            path: segments.into_iter().map(Into::into).collect(),
            principal: None,
        }
    }

    /// Split a raw path such as `/users/7.json` into segments.
    ///
    /// One leading `/` and any query string are dropped. Interior and trailing
    /// empty segments are kept; `/` alone yields no segments.
    pub fn parse(raw: &str) -> Self {
        let path = raw.split(['?', '#']).next().unwrap_or_default();
        let path = path.strip_prefix('/').unwrap_or(path);
        if path.is_empty() {
            return Self::default();
        }
        Self::new(path.split('/'))
    }

    /// Attach the authenticated principal.
    pub fn with_principal(mut self, principal: Principal) -> Self {
        self.principal = Some(principal);
        self
    }
}

/// Runs requests through negotiation, hooks, the handler and classification.
pub struct Dispatcher<P> {
    pool: Arc<ResourcePool<P>>,
    hooks: Arc<HookRegistry>,
    negotiator: ContentNegotiator,
    classifier: ErrorClassifier,
    responder: Responder,
    handler: Arc<dyn DynHandler>,
}

impl<P: ResourceProvider> Dispatcher<P> {
    /// Start building a dispatcher.
    pub fn builder(settings: Settings, provider: P) -> DispatcherBuilder<P> {
        DispatcherBuilder::new(settings, provider)
    }

    /// Dispatch with the default handler.
    pub async fn dispatch(&self, request: Request) -> HttpResponse {
        self.dispatch_with(request, &*self.handler).await
    }

    /// Dispatch with a pre-built handler.
    pub async fn dispatch_with(&self, request: Request, handler: &dyn DynHandler) -> HttpResponse {
        let span = tracing::info_span!("dispatch", path = ?request.path);
        async move {
            let mut format = None;
            let outcome = AssertUnwindSafe(self.run(request, handler, &mut format))
                .catch_unwind()
                .await;

            let response = match outcome {
                Ok(Ok(response)) => response,
                Ok(Err(failure)) => self.classifier.classify(failure),
                Err(payload) => self.classifier.classify(Failure::panic(&*payload)),
            };
            tracing::debug!(status = response.status().as_u16(), "responded");
            self.responder.respond(response, format.as_deref())
        }
        .instrument(span)
        .await
    }

    /// Dispatch with the default handler and send the response to `transport`.
    pub async fn dispatch_to<T>(&self, request: Request, transport: &mut T) -> Result<(), EmitError>
    where
        T: Transport + ?Sized,
    {
        let response = self.dispatch(request).await;
        transport.send(response).await
    }

    async fn run(
        &self,
        request: Request,
        handler: &dyn DynHandler,
        format: &mut Option<String>,
    ) -> Result<OperationResponse, Failure> {
        let resources = self.pool.acquire().await?;
        tracing::debug!("resources acquired");

        let Negotiation { path, format: negotiated } = self.negotiator.negotiate(request.path);
        format.clone_from(&negotiated);
        tracing::debug!(format = ?negotiated, "path negotiated");

        let mut context = RequestContext::new(path, resources, Arc::clone(&self.hooks))
            .with_principal(request.principal)
            .with_format(negotiated);

        context.trigger_event(REQUEST_EVENT).await?;
        let (status, body) = handler.handle_dyn(&mut context).await?.into_parts();
        tracing::debug!(status = status.as_u16(), "handler invoked");

        let body = context.apply_filter(RESPONSE_FILTER, body).await?;
        context.trigger_event(FINISH_EVENT).await?;
        Ok(OperationResponse::new(status, body))
    }
}

impl<P> Dispatcher<P> {
    /// The shared resource pool.
    pub fn pool(&self) -> &Arc<ResourcePool<P>> {
        &self.pool
    }

    /// The hook registry.
    pub fn hooks(&self) -> &HookRegistry {
        &self.hooks
    }

    /// The responder used for every outcome.
    pub fn responder(&self) -> &Responder {
        &self.responder
    }
}

impl<P> fmt::Debug for Dispatcher<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("pool", &self.pool)
            .field("hooks", &self.hooks)
            .field("negotiator", &self.negotiator)
            .field("responder", &self.responder)
            .finish_non_exhaustive()
    }
}

/// Builder for [`Dispatcher`].
pub struct DispatcherBuilder<P> {
    settings: Settings,
    provider: P,
    hooks: HookRegistry,
    catalog: Option<HookCatalog>,
    reporter: Arc<dyn ErrorReporter>,
    renderers: Renderers,
    handler: Option<Arc<dyn DynHandler>>,
}

impl<P: ResourceProvider> DispatcherBuilder<P> {
    /// Create a builder with default renderers and a tracing reporter.
    pub fn new(settings: Settings, provider: P) -> Self {
        Self {
            settings,
            provider,
            hooks: HookRegistry::new(),
            catalog: None,
            reporter: Arc::new(TracingReporter),
            renderers: Renderers::default(),
            handler: None,
        }
    }

    /// Use an already populated registry.
    pub fn hooks(mut self, hooks: HookRegistry) -> Self {
        self.hooks = hooks;
        self
    }

    /// Bind the configured `events` and `filters` through `catalog` at build time.
    pub fn catalog(mut self, catalog: HookCatalog) -> Self {
        self.catalog = Some(catalog);
        self
    }

    /// Report unhandled failures to `reporter`.
    pub fn reporter<R: ErrorReporter>(mut self, reporter: R) -> Self {
        self.reporter = Arc::new(reporter);
        self
    }

    /// Replace the renderer set.
    pub fn renderers(mut self, renderers: Renderers) -> Self {
        self.renderers = renderers;
        self
    }

    /// Set the default handler.
    pub fn handler<H: Handler>(mut self, handler: H) -> Self {
        self.handler = Some(Arc::new(handler));
        self
    }

    /// Assemble the dispatcher.
    pub fn build(self) -> Result<Dispatcher<P>, SettingsError> {
        let Self {
            settings,
            provider,
            mut hooks,
            catalog,
            reporter,
            renderers,
            handler,
        } = self;

        let handler = handler.ok_or(SettingsError::MissingHandler)?;
        if let Some(catalog) = catalog {
            catalog.load_into(&settings, &mut hooks)?;
        }
        tracing::info!(
            hooks = hooks.len(),
            mode = ?settings.mode(),
            output = %settings.application().output,
            "dispatcher ready"
        );

        Ok(Dispatcher {
            pool: Arc::new(ResourcePool::new(provider, &settings)),
            hooks: Arc::new(hooks),
            negotiator: ContentNegotiator::from_settings(&settings),
            classifier: ErrorClassifier::from_settings(&settings, reporter),
            responder: Responder::from_settings(&settings, renderers),
            handler,
        })
    }
}

impl<P> fmt::Debug for DispatcherBuilder<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DispatcherBuilder")
            .field("hooks", &self.hooks)
            .field("catalog", &self.catalog)
            .field("renderers", &self.renderers)
            .field("handler", &self.handler.is_some())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{CapturingReporter, FailingProvider, RecordingEvent, StaticProvider};
    use http::StatusCode;
    use rester_core::{filter_fn, handler_fn};
    use serde_json::json;
    use std::sync::Mutex;

    fn settings() -> Settings {
        Settings::builder()
            .without_env()
            .set("application.allow_output_extensions", true)
            .build()
            .unwrap()
    }

    fn echo() -> impl Handler {
        handler_fn(|request| Ok(OperationResponse::ok(json!({ "path": request.path() }))))
    }

    #[test]
    fn parse_keeps_interior_empty_segments() {
        assert_eq!(Request::parse("/a//b.json").path, ["a", "", "b.json"]);
        assert_eq!(Request::parse("/users/?page=2").path, ["users", ""]);
        assert!(Request::parse("/").path.is_empty());
        assert!(Request::parse("").path.is_empty());
    }

    #[test]
    fn missing_handler_is_rejected() {
        let result = Dispatcher::builder(settings(), StaticProvider::new()).build();
        assert!(matches!(result, Err(SettingsError::MissingHandler)));
    }

    #[tokio::test]
    async fn negotiated_path_reaches_the_handler() {
        let dispatcher = Dispatcher::builder(settings(), StaticProvider::new())
            .handler(echo())
            .build()
            .unwrap();

        let out = dispatcher.dispatch(Request::parse("/users/7.json")).await;

        assert_eq!(out.status, StatusCode::OK);
        assert_eq!(out.json().unwrap(), json!({ "path": ["users", "7"] }));
    }

    #[tokio::test]
    async fn lifecycle_hooks_wrap_the_handler() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut hooks = HookRegistry::new();
        hooks
            .bind_event(REQUEST_EVENT, RecordingEvent::new("request", log.clone()))
            .bind_event(FINISH_EVENT, RecordingEvent::new("finish", log.clone()))
            .bind_filter(
                RESPONSE_FILTER,
                filter_fn(|_, mut body| {
                    body["stamped"] = json!(true);
                    Ok(body)
                }),
            );

        let seen = log.clone();
        let handler = handler_fn(move |_| {
            seen.lock().unwrap().push("handler".to_string());
            Ok(OperationResponse::ok(json!({})))
        });
        let dispatcher = Dispatcher::builder(settings(), StaticProvider::new())
            .hooks(hooks)
            .handler(handler)
            .build()
            .unwrap();

        let out = dispatcher.dispatch(Request::new(["x"])).await;

        assert_eq!(out.json().unwrap(), json!({ "stamped": true }));
        assert_eq!(*log.lock().unwrap(), ["request", "handler", "finish"]);
    }

    #[tokio::test]
    async fn acquisition_failure_still_responds() {
        let reporter = CapturingReporter::new();
        let dispatcher = Dispatcher::builder(settings(), FailingProvider::always())
            .reporter(reporter.clone())
            .handler(echo())
            .build()
            .unwrap();

        let out = dispatcher.dispatch(Request::new(["x"])).await;

        assert_eq!(out.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            out.json().unwrap(),
            json!({ "message": "database unavailable: connection refused" })
        );
        assert_eq!(reporter.count(), 1);
    }

    #[tokio::test]
    async fn handler_panic_is_unhandled() {
        let reporter = CapturingReporter::new();
        let dispatcher = Dispatcher::builder(settings(), StaticProvider::new())
            .reporter(reporter.clone())
            .handler(handler_fn(|_| panic!("boom")))
            .build()
            .unwrap();

        let out = dispatcher.dispatch(Request::new(["x"])).await;

        assert_eq!(out.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(reporter.messages(), ["handler panicked: boom"]);
    }
}
