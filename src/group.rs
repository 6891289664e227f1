use std::sync::Arc;

use hyper::Method;

use crate::handler::{chain, BoxedHandler, Handler, Middleware};
use crate::table::RouteTable;
use crate::InsertError;

/// Methods registered by [`Routes::any`].
const ANY_METHODS: [Method; 9] = [
    Method::CONNECT,
    Method::DELETE,
    Method::GET,
    Method::HEAD,
    Method::OPTIONS,
    Method::PATCH,
    Method::POST,
    Method::PUT,
    Method::TRACE,
];

/// The registration surface shared by the [`Mux`](crate::Mux) and its
/// [groups](Group).
///
/// Handlers are wrapped in the current middleware chain when they are
/// registered. Middleware added later only applies to routes registered
/// after it.
///
/// The conventional registration methods (`handle`, `get`, `post`, ...)
/// panic when a route is invalid or conflicts with an existing one, since
/// routes are registered once at startup. Use
/// [`try_handle`](Routes::try_handle) to inspect the error instead.
pub trait Routes<B: Send + 'static> {
    /// Registers a handler for `method` at `path`, below this scope's prefix
    /// and wrapped in its middleware.
    ///
    /// Returns the number of parameters the route declares.
    fn try_handle_boxed(
        &mut self,
        method: Method,
        path: &str,
        handler: BoxedHandler<B>,
    ) -> Result<usize, InsertError>;

    /// Appends middleware to this scope's chain.
    fn use_middleware(&mut self, middleware: Middleware<B>);

    /// Returns this scope's middleware chain, outermost first.
    fn middleware(&self) -> &[Middleware<B>];

    /// Creates a nested scope below `prefix` with exactly the given chain.
    fn scoped(&mut self, prefix: &str, middleware: Vec<Middleware<B>>) -> Group<'_, B>;

    /// Like [`try_handle_boxed`](Routes::try_handle_boxed), for any handler.
    fn try_handle<H: Handler<B>>(
        &mut self,
        method: Method,
        path: &str,
        handler: H,
    ) -> Result<usize, InsertError>
    where
        Self: Sized,
    {
        self.try_handle_boxed(method, path, Arc::new(handler))
    }

    /// Registers a handler for an arbitrary method, including non-standard
    /// ones such as `PROPFIND`.
    ///
    /// # Panics
    ///
    /// Panics if the route is invalid or conflicts with a registered route.
    fn handle<H: Handler<B>>(&mut self, method: Method, path: &str, handler: H)
    where
        Self: Sized,
    {
        if let Err(err) = self.try_handle(method, path, handler) {
            panic!("{}", err);
        }
    }

    /// Registers a handler for GET requests.
    fn get<H: Handler<B>>(&mut self, path: &str, handler: H)
    where
        Self: Sized,
    {
        self.handle(Method::GET, path, handler);
    }

    /// Registers a handler for POST requests.
    fn post<H: Handler<B>>(&mut self, path: &str, handler: H)
    where
        Self: Sized,
    {
        self.handle(Method::POST, path, handler);
    }

    /// Registers a handler for PUT requests.
    fn put<H: Handler<B>>(&mut self, path: &str, handler: H)
    where
        Self: Sized,
    {
        self.handle(Method::PUT, path, handler);
    }

    /// Registers a handler for DELETE requests.
    fn delete<H: Handler<B>>(&mut self, path: &str, handler: H)
    where
        Self: Sized,
    {
        self.handle(Method::DELETE, path, handler);
    }

    /// Registers a handler for PATCH requests.
    fn patch<H: Handler<B>>(&mut self, path: &str, handler: H)
    where
        Self: Sized,
    {
        self.handle(Method::PATCH, path, handler);
    }

    /// Registers a handler for HEAD requests.
    fn head<H: Handler<B>>(&mut self, path: &str, handler: H)
    where
        Self: Sized,
    {
        self.handle(Method::HEAD, path, handler);
    }

    /// Registers a handler for OPTIONS requests.
    fn options<H: Handler<B>>(&mut self, path: &str, handler: H)
    where
        Self: Sized,
    {
        self.handle(Method::OPTIONS, path, handler);
    }

    /// Registers a handler for CONNECT requests.
    fn connect<H: Handler<B>>(&mut self, path: &str, handler: H)
    where
        Self: Sized,
    {
        self.handle(Method::CONNECT, path, handler);
    }

    /// Registers a handler for TRACE requests.
    fn trace<H: Handler<B>>(&mut self, path: &str, handler: H)
    where
        Self: Sized,
    {
        self.handle(Method::TRACE, path, handler);
    }

    /// Registers a handler for every standard method.
    fn any<H: Handler<B>>(&mut self, path: &str, handler: H)
    where
        Self: Sized,
    {
        self.match_methods(ANY_METHODS, path, handler);
    }

    /// Registers a handler for each of the given methods.
    fn match_methods<H, I>(&mut self, methods: I, path: &str, handler: H)
    where
        Self: Sized,
        H: Handler<B>,
        I: IntoIterator<Item = Method>,
    {
        let handler: BoxedHandler<B> = Arc::new(handler);
        for method in methods {
            if let Err(err) = self.try_handle_boxed(method, path, Arc::clone(&handler)) {
                panic!("{}", err);
            }
        }
    }

    /// Creates a group below `prefix` that inherits this scope's middleware.
    fn group(&mut self, prefix: &str) -> Group<'_, B>
    where
        Self: Sized,
    {
        let middleware = self.middleware().to_vec();
        self.scoped(prefix, middleware)
    }

    /// Creates a group below `prefix` whose chain is this scope's middleware
    /// followed by `extra`.
    fn group_with<I>(&mut self, prefix: &str, extra: I) -> Group<'_, B>
    where
        Self: Sized,
        I: IntoIterator<Item = Middleware<B>>,
    {
        let mut middleware = self.middleware().to_vec();
        middleware.extend(extra);
        self.scoped(prefix, middleware)
    }

    /// Creates a group below `prefix` that starts with an empty chain.
    fn group_fresh(&mut self, prefix: &str) -> Group<'_, B>
    where
        Self: Sized,
    {
        self.scoped(prefix, Vec::new())
    }
}

/// A set of routes sharing a path prefix and a middleware chain.
///
/// The chain is copied from the parent when the group is created, so
/// middleware the parent adds afterwards does not reach the group.
///
/// ```rust
/// use muxtree::{Body, HandlerResult, Mux, RequestVars, Routes};
/// use hyper::{Request, Response};
///
/// async fn user(_req: Request<Body>, vars: RequestVars) -> HandlerResult {
///     Ok(Response::new(vars.url_param("id").to_owned().into()))
/// }
///
/// let mut mux = Mux::<Body>::new();
/// let mut api = mux.group("/api");
/// let mut v1 = api.group("/v1");
/// v1.get("/users/:id", user);
/// ```
pub struct Group<'a, B> {
    table: &'a mut RouteTable<BoxedHandler<B>>,
    prefix: String,
    middleware: Vec<Middleware<B>>,
}

impl<'a, B: Send + 'static> Group<'a, B> {
    pub(crate) fn new(
        table: &'a mut RouteTable<BoxedHandler<B>>,
        prefix: String,
        middleware: Vec<Middleware<B>>,
    ) -> Self {
        Group {
            table,
            prefix,
            middleware,
        }
    }

    /// Returns the full path prefix of this group.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }
}

impl<B: Send + 'static> Routes<B> for Group<'_, B> {
    fn try_handle_boxed(
        &mut self,
        method: Method,
        path: &str,
        handler: BoxedHandler<B>,
    ) -> Result<usize, InsertError> {
        register(
            self.table,
            &self.prefix,
            &self.middleware,
            method,
            path,
            handler,
        )
    }

    fn use_middleware(&mut self, middleware: Middleware<B>) {
        self.middleware.push(middleware);
    }

    fn middleware(&self) -> &[Middleware<B>] {
        &self.middleware
    }

    fn scoped(&mut self, prefix: &str, middleware: Vec<Middleware<B>>) -> Group<'_, B> {
        Group::new(&mut *self.table, join(&self.prefix, prefix), middleware)
    }
}

/// Wraps `handler` in `middleware` and inserts it at `prefix + path`.
pub(crate) fn register<B>(
    table: &mut RouteTable<BoxedHandler<B>>,
    prefix: &str,
    middleware: &[Middleware<B>],
    method: Method,
    path: &str,
    handler: BoxedHandler<B>,
) -> Result<usize, InsertError> {
    let route = join(prefix, path);

    if let Some(index) = route.find("//") {
        return Err(InsertError::DoubleSlash { route, index });
    }

    let handler = chain(middleware, handler);
    let params = table.insert(method.clone(), &route, handler)?;

    debug!("registered {} {} ({} params)", method, route, params);
    Ok(params)
}

pub(crate) fn join(prefix: &str, path: &str) -> String {
    let mut route = String::with_capacity(prefix.len() + path.len());
    route.push_str(prefix);
    route.push_str(path);
    route
}
