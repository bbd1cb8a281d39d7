//! Request-scoped locale setup for server-side rendering.
//!
//! Every request gets its own [`LocaleController`] that is reset and set up
//! before any handler runs, so no locale state leaks between requests.

use crate::controller::LocaleController;
use crate::host::Host;
use futures::FutureExt as _;
use futures::future::BoxFuture;
use locale_kit_core::{FluentEngine, I18nConfig, I18nOptions, TranslationEngine};
use std::future::Future;
use std::sync::Arc;

/// What a handler in the sequence decided.
pub enum HandleOutcome<E, R> {
    /// Stop here and answer with this response.
    Response(R),
    /// Pass the (possibly updated) event to the next handler.
    Continue(E),
}

/// The continuation that produces the default response for an event.
pub struct Resolver<E, R> {
    resolve: Box<dyn Fn(E) -> BoxFuture<'static, R> + Send + Sync>,
}

impl<E, R> Resolver<E, R> {
    pub fn new<F, Fut>(resolve: F) -> Self
    where
        F: Fn(E) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
    {
        Self {
            resolve: Box::new(move |event| resolve(event).boxed()),
        }
    }

    pub fn resolve(&self, event: E) -> BoxFuture<'static, R> {
        (self.resolve)(event)
    }
}

/// One step of a request handler chain.
pub trait Handle<E, R>: Send + Sync {
    fn handle<'a>(
        &'a self,
        event: E,
        resolve: &'a Resolver<E, R>,
    ) -> BoxFuture<'a, HandleOutcome<E, R>>;
}

/// Adapts an async closure that does not need the resolver into a [`Handle`].
pub struct HandleFn<F>(pub F);

impl<E, R, F, Fut> Handle<E, R> for HandleFn<F>
where
    F: Fn(E) -> Fut + Send + Sync,
    Fut: Future<Output = HandleOutcome<E, R>> + Send + 'static,
{
    fn handle<'a>(
        &'a self,
        event: E,
        _resolve: &'a Resolver<E, R>,
    ) -> BoxFuture<'a, HandleOutcome<E, R>> {
        (self.0)(event).boxed()
    }
}

/// An event paired with the locale controller set up for its request.
#[derive(Debug)]
pub struct RequestScope<E> {
    pub event: E,
    pub locale: LocaleController,
}

impl<E> RequestScope<E> {
    pub fn new(event: E, locale: LocaleController) -> Self {
        Self { event, locale }
    }

    pub fn map_event<T>(self, f: impl FnOnce(E) -> T) -> RequestScope<T> {
        RequestScope {
            event: f(self.event),
            locale: self.locale,
        }
    }
}

type EngineFactory = Arc<dyn Fn() -> Arc<dyn TranslationEngine> + Send + Sync>;

/// Wraps a handler chain with per-request locale setup.
pub struct I18nHandle<E, R> {
    config: I18nConfig,
    engine_factory: EngineFactory,
    sequence: Vec<Box<dyn Handle<RequestScope<E>, R>>>,
}

impl<E, R> I18nHandle<E, R>
where
    E: Send + 'static,
    R: Send + 'static,
{
    pub fn new(options: I18nOptions) -> Self {
        Self::from_config(I18nConfig::from_options(options))
    }

    pub fn from_config(config: I18nConfig) -> Self {
        Self {
            config,
            engine_factory: Arc::new(|| {
                Arc::new(FluentEngine::new()) as Arc<dyn TranslationEngine>
            }),
            sequence: Vec::new(),
        }
    }

    /// Uses `factory` to build the translation engine of each request.
    pub fn with_engine_factory<F>(mut self, factory: F) -> Self
    where
        F: Fn() -> Arc<dyn TranslationEngine> + Send + Sync + 'static,
    {
        self.engine_factory = Arc::new(factory);
        self
    }

    /// Appends a handler to the sequence run before the resolver.
    pub fn with_handle<H>(mut self, handle: H) -> Self
    where
        H: Handle<RequestScope<E>, R> + 'static,
    {
        self.sequence.push(Box::new(handle));
        self
    }

    pub fn config(&self) -> &I18nConfig {
        &self.config
    }

    /// A freshly set up, environment-independent controller.
    pub fn request_controller(&self) -> LocaleController {
        let mut controller = LocaleController::new((self.engine_factory)(), Host::server())
            .with_config(self.config.clone());
        controller.reset_initialization();
        controller.setup_server();
        controller
    }

    /// Sets up locale state for the request, then runs the handlers in order.
    ///
    /// The first handler answering with a response wins; otherwise the
    /// resolver produces the response.
    pub async fn handle(&self, event: E, resolve: &Resolver<RequestScope<E>, R>) -> R {
        let mut scope = RequestScope::new(event, self.request_controller());

        for handle in &self.sequence {
            match handle.handle(scope, resolve).await {
                HandleOutcome::Response(response) => return response,
                HandleOutcome::Continue(next) => scope = next,
            }
        }

        resolve.resolve(scope).await
    }
}
