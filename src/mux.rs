use std::borrow::Cow;
use std::sync::Arc;

use hyper::body::Incoming;
use hyper::header::{HeaderValue, ALLOW, CONTENT_TYPE, LOCATION};
use hyper::{Method, Request, Response, StatusCode};

use crate::escape::{escape_path, unescape};
use crate::group::{join, register, Group, Routes};
use crate::handler::{chain, BoxError, BoxedHandler, Handler, HandlerFuture, HandlerResult, Middleware};
use crate::pool::{RequestVars, VarsPool};
use crate::service::MuxService;
use crate::table::{allow_header, sort_methods, RouteTable};
use crate::{Body, InsertError, Node, Params};

/// The request multiplexer.
///
/// A `Mux` owns one routing tree per HTTP method. Routes and configuration
/// are set up through `&mut self` before serving; [`serve`](Mux::serve) only
/// needs `&self`, so the finished mux can be shared by any number of
/// concurrent requests.
///
/// For every request the mux runs the following sequence, stopping at the
/// first step that produces a handler:
///
/// 1. The route registered for the request's method and path.
/// 2. If trailing slash redirection is enabled (the default) and the path is
///    longer than `/`: the lowercased path, then the lowercased path with its
///    trailing slash toggled. A match results in a redirect, `301` for `GET`
///    and `308` for every other method.
/// 3. If automatic `OPTIONS` handling is enabled and the method is `OPTIONS`:
///    a `200` listing the methods available for the path in `Allow`.
/// 4. If method not allowed handling is enabled and another method matches
///    the path: the `405` handler, with `Allow` listing those methods.
/// 5. The `404` handler.
///
/// ```rust
/// use muxtree::{Body, HandlerResult, Mux, RequestVars, Routes};
/// use hyper::{Request, Response};
///
/// async fn hello(_req: Request<Body>, vars: RequestVars) -> HandlerResult {
///     Ok(Response::new(format!("Hello, {}!", vars.url_param("name")).into()))
/// }
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let mut mux: Mux<Body> = Mux::new();
/// mux.get("/hello/:name", hello);
///
/// let req = Request::get("/hello/gopher").body(Body::empty()).unwrap();
/// let res = mux.serve(req).await.unwrap();
/// assert_eq!(res.body().bytes(), b"Hello, gopher!");
/// # }
/// ```
pub struct Mux<B = Incoming> {
    table: RouteTable<BoxedHandler<B>>,
    middleware: Vec<Middleware<B>>,
    pool: Arc<VarsPool>,
    not_found: BoxedHandler<B>,
    method_not_allowed: BoxedHandler<B>,
    automatic_options: BoxedHandler<B>,
    redirect_trailing_slash: bool,
    handle_method_not_allowed: bool,
    handle_options: bool,
}

// What the dispatcher decided to run for a request.
enum Route<'m, B> {
    Matched(&'m BoxedHandler<B>),
    Redirect(BoxedHandler<B>),
    Options(String),
    MethodNotAllowed(String),
    NotFound,
}

impl<B: Send + 'static> Default for Mux<B> {
    fn default() -> Self {
        Mux {
            table: RouteTable::new(),
            middleware: Vec::new(),
            pool: VarsPool::new(),
            not_found: Arc::new(not_found::<B>),
            method_not_allowed: Arc::new(method_not_allowed::<B>),
            automatic_options: Arc::new(automatic_options::<B>),
            redirect_trailing_slash: true,
            handle_method_not_allowed: false,
            handle_options: false,
        }
    }
}

impl<B: Send + 'static> Mux<B> {
    /// Creates a mux with no routes, trailing slash redirection enabled, and
    /// automatic `OPTIONS` and `405` handling disabled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets whether unmatched paths are retried lowercased and with their
    /// trailing slash toggled, redirecting the client on success.
    pub fn set_redirect_trailing_slash(&mut self, enabled: bool) {
        self.redirect_trailing_slash = enabled;
    }

    /// Replaces the handler run when nothing matches, wrapped in `middleware`.
    pub fn register_not_found<H, I>(&mut self, handler: H, middleware: I)
    where
        H: Handler<B>,
        I: IntoIterator<Item = Middleware<B>>,
    {
        let middleware: Vec<_> = middleware.into_iter().collect();
        self.not_found = chain(&middleware, Arc::new(handler));
    }

    /// Enables automatic replies to `OPTIONS` requests, wrapped in
    /// `middleware`. Explicitly registered `OPTIONS` routes take precedence.
    pub fn register_automatic_options<I>(&mut self, middleware: I)
    where
        I: IntoIterator<Item = Middleware<B>>,
    {
        let middleware: Vec<_> = middleware.into_iter().collect();
        self.handle_options = true;
        self.automatic_options = chain(&middleware, Arc::new(automatic_options::<B>));
    }

    /// Enables `405 Method Not Allowed` replies, wrapped in `middleware`.
    pub fn register_method_not_allowed<I>(&mut self, middleware: I)
    where
        I: IntoIterator<Item = Middleware<B>>,
    {
        let middleware: Vec<_> = middleware.into_iter().collect();
        self.handle_method_not_allowed = true;
        self.method_not_allowed = chain(&middleware, Arc::new(method_not_allowed::<B>));
    }

    /// Returns the routing tree of `method`, if any route was registered for it.
    pub fn tree(&self, method: &Method) -> Option<&Node<BoxedHandler<B>>> {
        self.table.tree(method)
    }

    /// Returns the pool that request vars are drawn from.
    pub fn pool(&self) -> &VarsPool {
        &self.pool
    }

    /// Dispatches a request to its handler.
    pub fn serve(&self, req: Request<B>) -> HandlerFuture {
        let mut vars = self.pool.acquire(self.table.most_params());
        vars.set_query(req.uri().query());

        let route = {
            let raw = req.uri().path();
            // a malformed escape is matched as is
            let path = unescape(raw).unwrap_or(Cow::Borrowed(raw));
            self.route(req.method(), &path, req.uri().query(), vars.params_mut())
        };

        match route {
            Route::Matched(handler) => handler.call(req, vars),
            Route::Redirect(handler) => handler.call(req, vars),
            Route::Options(allow) => with_allow(self.automatic_options.call(req, vars), allow),
            Route::MethodNotAllowed(allow) => {
                with_allow(self.method_not_allowed.call(req, vars), allow)
            }
            Route::NotFound => self.not_found.call(req, vars),
        }
    }

    /// Converts the mux into a [`hyper::service::Service`].
    pub fn into_service(self) -> MuxService<B> {
        MuxService::new(self)
    }

    fn route(
        &self,
        method: &Method,
        path: &str,
        query: Option<&str>,
        params: &mut Params,
    ) -> Route<'_, B> {
        if let Some(tree) = self.table.tree(method) {
            if let Some(handler) = tree.find(path, params) {
                return Route::Matched(handler);
            }

            if self.redirect_trailing_slash && path.len() > 1 {
                if let Some(to) = corrected_path(tree, path, params) {
                    debug!("redirecting {} {} to {}", method, path, to);
                    return Route::Redirect(self.redirect(method, &to, query));
                }
            }
        }

        params.clear();

        if self.handle_options && method == Method::OPTIONS {
            let mut allowed: Vec<Method> = if path == "*" {
                self.table
                    .methods()
                    .into_iter()
                    .filter(|m| m != Method::OPTIONS)
                    .collect()
            } else {
                self.table.allowed(path, method, params)
            };

            allowed.push(Method::OPTIONS);
            sort_methods(&mut allowed);

            trace!("automatic OPTIONS for {}", path);
            return Route::Options(allow_header(&allowed));
        }

        if self.handle_method_not_allowed {
            let allowed = self.table.allowed(path, method, params);
            if !allowed.is_empty() {
                trace!("{} not allowed for {}", method, path);
                return Route::MethodNotAllowed(allow_header(&allowed));
            }
        }

        trace!("no route for {} {}", method, path);
        Route::NotFound
    }

    // Builds the redirect to `path`, wrapped in the root middleware.
    fn redirect(&self, method: &Method, path: &str, query: Option<&str>) -> BoxedHandler<B> {
        let status = if method == Method::GET {
            StatusCode::MOVED_PERMANENTLY
        } else {
            StatusCode::PERMANENT_REDIRECT
        };

        let mut location = escape_path(path).into_owned();
        if let Some(query) = query {
            location.push('?');
            location.push_str(query);
        }

        let handler: BoxedHandler<B> = Arc::new(move |_req: Request<B>, _vars: RequestVars| {
            let res = Response::builder()
                .status(status)
                .header(LOCATION, location.as_str())
                .body(Body::empty());
            async move { res.map_err(BoxError::from) }
        });

        chain(&self.middleware, handler)
    }
}

impl<B: Send + 'static> Routes<B> for Mux<B> {
    fn try_handle_boxed(
        &mut self,
        method: Method,
        path: &str,
        handler: BoxedHandler<B>,
    ) -> Result<usize, InsertError> {
        register(&mut self.table, "", &self.middleware, method, path, handler)
    }

    fn use_middleware(&mut self, middleware: Middleware<B>) {
        self.middleware.push(middleware);
    }

    fn middleware(&self) -> &[Middleware<B>] {
        &self.middleware
    }

    fn scoped(&mut self, prefix: &str, middleware: Vec<Middleware<B>>) -> Group<'_, B> {
        Group::new(&mut self.table, join("", prefix), middleware)
    }
}

// Tries the lowercased path, then the lowercased path with its trailing
// slash toggled.
fn corrected_path<T>(tree: &Node<T>, path: &str, params: &mut Params) -> Option<String> {
    let lower = path.to_lowercase();

    if lower != path && tree.find(&lower, params).is_some() {
        return Some(lower);
    }

    let toggled = match lower.strip_suffix('/') {
        Some(stripped) => stripped.to_owned(),
        None => lower + "/",
    };

    tree.find(&toggled, params).map(|_| toggled)
}

// Adds the `Allow` header unless the handler set one itself.
fn with_allow(future: HandlerFuture, allow: String) -> HandlerFuture {
    Box::pin(async move {
        let mut res = future.await?;
        if let Ok(value) = HeaderValue::from_str(&allow) {
            res.headers_mut().entry(ALLOW).or_insert(value);
        }
        Ok(res)
    })
}

async fn not_found<B>(_req: Request<B>, _vars: RequestVars) -> HandlerResult {
    let res = Response::builder()
        .status(StatusCode::NOT_FOUND)
        .header(CONTENT_TYPE, "text/plain; charset=utf-8")
        .body(Body::from("Not Found"))?;
    Ok(res)
}

async fn method_not_allowed<B>(_req: Request<B>, _vars: RequestVars) -> HandlerResult {
    let res = Response::builder()
        .status(StatusCode::METHOD_NOT_ALLOWED)
        .body(Body::empty())?;
    Ok(res)
}

async fn automatic_options<B>(_req: Request<B>, _vars: RequestVars) -> HandlerResult {
    Ok(Response::new(Body::empty()))
}
