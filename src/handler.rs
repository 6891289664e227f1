use std::error::Error;
use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;
use hyper::{Request, Response};

use crate::body::Body;
use crate::pool::RequestVars;

/// An error returned by a handler. It is passed through every middleware
/// layer unchanged.
pub type BoxError = Box<dyn Error + Send + Sync>;

/// The result of handling a request.
pub type HandlerResult = Result<Response<Body>, BoxError>;

/// The future returned by [`Handler::call`].
pub type HandlerFuture = BoxFuture<'static, HandlerResult>;

/// An asynchronous request handler.
///
/// The handler receives the request together with its [`RequestVars`], the
/// pooled parameters captured by the matched route. The vars are returned
/// to the pool when they are dropped, so they must not outlive the handler.
///
/// Implemented for every `Fn(Request<B>, RequestVars) -> impl Future`:
///
/// ```rust
/// use muxtree::{Body, Handler, RequestVars};
/// use hyper::{Request, Response};
///
/// async fn hello(_req: Request<Body>, vars: RequestVars) -> muxtree::HandlerResult {
///     Ok(Response::new(format!("hello {}", vars.url_param("name")).into()))
/// }
///
/// fn assert_handler<H: Handler<Body>>(_: H) {}
/// assert_handler(hello);
/// ```
pub trait Handler<B>: Send + Sync + 'static {
    /// Handles a request.
    fn call(&self, req: Request<B>, vars: RequestVars) -> HandlerFuture;
}

impl<F, R, B> Handler<B> for F
where
    F: Fn(Request<B>, RequestVars) -> R + Send + Sync + 'static,
    R: Future<Output = HandlerResult> + Send + 'static,
{
    fn call(&self, req: Request<B>, vars: RequestVars) -> HandlerFuture {
        Box::pin(self(req, vars))
    }
}

/// A type-erased, shareable handler.
pub type BoxedHandler<B> = Arc<dyn Handler<B>>;

/// Wraps a handler into another handler.
///
/// Middleware is applied once, when a route is registered, never per request.
pub type Middleware<B> = Arc<dyn Fn(BoxedHandler<B>) -> BoxedHandler<B> + Send + Sync>;

/// Creates a [`Middleware`] from a closure.
///
/// ```rust
/// use muxtree::{middleware_fn, Body, BoxedHandler, Handler, RequestVars};
/// use hyper::Request;
/// use std::sync::Arc;
///
/// let noop = middleware_fn(|next: BoxedHandler<Body>| -> BoxedHandler<Body> {
///     Arc::new(move |req: Request<Body>, vars: RequestVars| next.call(req, vars))
/// });
/// # let _ = noop;
/// ```
pub fn middleware_fn<B, F>(f: F) -> Middleware<B>
where
    F: Fn(BoxedHandler<B>) -> BoxedHandler<B> + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Composes `middleware` around `handler`.
///
/// The first middleware is the outermost: `[m1, m2]` around `h` yields
/// `m1(m2(h))`.
pub(crate) fn chain<B>(middleware: &[Middleware<B>], handler: BoxedHandler<B>) -> BoxedHandler<B> {
    middleware
        .iter()
        .rev()
        .fold(handler, |next, middleware| middleware(next))
}
