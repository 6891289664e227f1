use std::sync::Arc;

use hyper::header::{HeaderValue, ALLOW, LOCATION};
use hyper::{Method, Request, Response, StatusCode};
use muxtree::{
    middleware_fn, Body, BoxError, BoxedHandler, Handler, HandlerResult, Middleware, Mux,
    RequestVars, Routes,
};

async fn ok(_req: Request<Body>, _vars: RequestVars) -> HandlerResult {
    Ok(Response::new(Body::from("ok")))
}

// Responds with the captured parameters as `key=value` pairs.
async fn echo(_req: Request<Body>, vars: RequestVars) -> HandlerResult {
    let body = vars
        .params()
        .iter()
        .map(|(key, value)| format!("{key}={value}"))
        .collect::<Vec<_>>()
        .join(",");
    Ok(Response::new(body.into()))
}

fn tag(name: &'static str) -> Middleware<Body> {
    middleware_fn(move |next: BoxedHandler<Body>| -> BoxedHandler<Body> {
        Arc::new(move |req: Request<Body>, vars: RequestVars| {
            let future = next.call(req, vars);
            async move {
                let mut res = future.await?;
                res.headers_mut()
                    .append("x-trace", HeaderValue::from_static(name));
                Ok::<_, BoxError>(res)
            }
        })
    })
}

fn request(method: Method, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

async fn send(mux: &Mux<Body>, method: Method, uri: &str) -> Response<Body> {
    mux.serve(request(method, uri)).await.unwrap()
}

#[tokio::test]
async fn params_are_captured() {
    let mut mux: Mux<Body> = Mux::new();
    mux.get("/users/:id/files/*path", echo);
    mux.get("/static/*", echo);

    let res = send(&mux, Method::GET, "/users/42/files/a/b.txt").await;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.body().bytes(), b"id=42,path=a/b.txt");

    let res = send(&mux, Method::GET, "/static/css/site.css").await;
    assert_eq!(res.body().bytes(), b"*wildcard=css/site.css");

    let res = send(&mux, Method::GET, "/users//files/a").await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn request_paths_are_unescaped() {
    let mut mux: Mux<Body> = Mux::new();
    mux.get("/files/:name", echo);

    let res = send(&mux, Method::GET, "/files/hello%20world").await;
    assert_eq!(res.body().bytes(), b"name=hello world");

    let res = send(&mux, Method::GET, "/files/%zz").await;
    assert_eq!(res.body().bytes(), b"name=%zz");
}

#[tokio::test]
async fn query_params() {
    let mut mux: Mux<Body> = Mux::new();
    mux.get("/search", |req: Request<Body>, mut vars: RequestVars| async move {
        let q = vars.query_param("q").unwrap_or("none").to_owned();
        let count = vars.query_params().len();
        Ok::<_, BoxError>(Response::new(format!("{q} {count}").into()))
    });

    let res = send(&mux, Method::GET, "/search?q=rust+lang&page=2").await;
    assert_eq!(res.body().bytes(), b"rust lang 2");

    let res = send(&mux, Method::GET, "/search").await;
    assert_eq!(res.body().bytes(), b"none 0");
}

#[tokio::test]
async fn redirects() {
    let mut mux: Mux<Body> = Mux::new();
    mux.use_middleware(tag("root"));
    mux.get("/home", ok);
    mux.get("/docs/", ok);
    mux.post("/submit", ok);
    mux.get("/a b", ok);

    let res = send(&mux, Method::GET, "/Home/?lang=en").await;
    assert_eq!(res.status(), StatusCode::MOVED_PERMANENTLY);
    assert_eq!(res.headers()[LOCATION], "/home?lang=en");
    assert_eq!(res.headers()["x-trace"], "root");

    let res = send(&mux, Method::GET, "/home").await;
    assert_eq!(res.status(), StatusCode::OK);

    let res = send(&mux, Method::GET, "/docs").await;
    assert_eq!(res.status(), StatusCode::MOVED_PERMANENTLY);
    assert_eq!(res.headers()[LOCATION], "/docs/");

    let res = send(&mux, Method::GET, "/HOME").await;
    assert_eq!(res.headers()[LOCATION], "/home");

    let res = send(&mux, Method::POST, "/submit/").await;
    assert_eq!(res.status(), StatusCode::PERMANENT_REDIRECT);
    assert_eq!(res.headers()[LOCATION], "/submit");

    let res = send(&mux, Method::GET, "/A%20B").await;
    assert_eq!(res.headers()[LOCATION], "/a%20b");
}

#[tokio::test]
async fn redirects_disabled() {
    let mut mux: Mux<Body> = Mux::new();
    mux.set_redirect_trailing_slash(false);
    mux.get("/home", ok);

    let res = send(&mux, Method::GET, "/home/").await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn root_is_never_redirected() {
    let mut mux: Mux<Body> = Mux::new();
    mux.get("/home", ok);

    let res = send(&mux, Method::GET, "/").await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn automatic_options() {
    let mut mux: Mux<Body> = Mux::new();
    mux.get("/res", ok);
    mux.post("/res", ok);
    mux.put("/other", ok);
    mux.options("/custom", ok);
    mux.get("/custom", ok);
    mux.register_automatic_options([tag("options")]);

    let res = send(&mux, Method::OPTIONS, "/res").await;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.headers()[ALLOW], "GET, POST, OPTIONS");
    assert_eq!(res.headers()["x-trace"], "options");

    let res = send(&mux, Method::OPTIONS, "*").await;
    assert_eq!(res.headers()[ALLOW], "GET, POST, PUT, OPTIONS");

    let res = send(&mux, Method::OPTIONS, "/custom").await;
    assert_eq!(res.body().bytes(), b"ok");
    assert!(res.headers().get(ALLOW).is_none());

    let res = send(&mux, Method::OPTIONS, "/missing").await;
    assert_eq!(res.headers()[ALLOW], "OPTIONS");
}

#[tokio::test]
async fn automatic_options_without_options_routes() {
    let mut mux: Mux<Body> = Mux::new();
    mux.get("/res", ok);
    mux.delete("/res", ok);
    mux.register_automatic_options([]);

    assert!(mux.tree(&Method::OPTIONS).is_none());

    let res = send(&mux, Method::OPTIONS, "/res").await;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.headers()[ALLOW], "GET, DELETE, OPTIONS");

    let res = send(&mux, Method::OPTIONS, "/res/").await;
    assert_eq!(res.headers()[ALLOW], "OPTIONS");

    let res = send(&mux, Method::OPTIONS, "*").await;
    assert_eq!(res.headers()[ALLOW], "GET, DELETE, OPTIONS");
}

#[tokio::test]
async fn rejected_routes_are_not_advertised() {
    let purge = Method::from_bytes(b"PURGE").unwrap();

    let mut mux: Mux<Body> = Mux::new();
    mux.get("/home", ok);
    assert!(mux.try_handle(purge.clone(), "/a/:x/:x", ok).is_err());
    mux.register_automatic_options([]);
    mux.register_method_not_allowed([]);

    assert!(mux.tree(&purge).is_none());

    let res = send(&mux, Method::OPTIONS, "*").await;
    assert_eq!(res.headers()[ALLOW], "GET, OPTIONS");

    let res = send(&mux, Method::POST, "/home").await;
    assert_eq!(res.headers()[ALLOW], "GET");
}

#[tokio::test]
async fn options_disabled() {
    let mut mux: Mux<Body> = Mux::new();
    mux.get("/res", ok);

    let res = send(&mux, Method::OPTIONS, "/res").await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn method_not_allowed() {
    let mut mux: Mux<Body> = Mux::new();
    mux.get("/res", ok);
    mux.post("/res", ok);
    mux.get("/only-get", ok);

    let res = send(&mux, Method::DELETE, "/res").await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    mux.register_method_not_allowed([tag("405")]);

    let res = send(&mux, Method::DELETE, "/res").await;
    assert_eq!(res.status(), StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(res.headers()[ALLOW], "GET, POST");
    assert_eq!(res.headers()["x-trace"], "405");

    let res = send(&mux, Method::POST, "/only-get").await;
    assert_eq!(res.status(), StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(res.headers()[ALLOW], "GET");

    let res = send(&mux, Method::DELETE, "/nowhere").await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn not_found() {
    let mut mux: Mux<Body> = Mux::new();
    mux.get("/home", ok);

    let res = send(&mux, Method::GET, "/missing").await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    assert_eq!(res.body().bytes(), b"Not Found");

    mux.register_not_found(
        |_req: Request<Body>, _vars: RequestVars| async {
            let res = Response::builder()
                .status(StatusCode::NOT_FOUND)
                .body(Body::from("nothing here"))?;
            Ok::<_, BoxError>(res)
        },
        [tag("missing")],
    );

    let res = send(&mux, Method::PATCH, "/missing").await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    assert_eq!(res.body().bytes(), b"nothing here");
    assert_eq!(res.headers()["x-trace"], "missing");
}

#[tokio::test]
async fn handler_errors_are_returned() {
    let mut mux: Mux<Body> = Mux::new();
    mux.get("/fail", |_req: Request<Body>, _vars: RequestVars| async {
        Err::<Response<Body>, BoxError>("database unavailable".into())
    });

    let err = mux.serve(request(Method::GET, "/fail")).await.unwrap_err();
    assert_eq!(err.to_string(), "database unavailable");
}

#[tokio::test]
async fn custom_methods() {
    let propfind = Method::from_bytes(b"PROPFIND").unwrap();

    let mut mux: Mux<Body> = Mux::new();
    mux.handle(propfind.clone(), "/dav/*path", echo);
    mux.get("/dav/*path", ok);
    mux.register_method_not_allowed([]);

    let res = send(&mux, propfind, "/dav/a/b").await;
    assert_eq!(res.body().bytes(), b"path=a/b");

    let res = send(&mux, Method::PUT, "/dav/a").await;
    assert_eq!(res.headers()[ALLOW], "GET, PROPFIND");
}

#[tokio::test]
async fn vars_return_to_the_pool() {
    let mut mux: Mux<Body> = Mux::new();
    mux.get("/users/:id", echo);

    assert_eq!(mux.pool().idle(), 0);
    send(&mux, Method::GET, "/users/1").await;
    send(&mux, Method::GET, "/missing").await;
    assert_eq!(mux.pool().idle(), 1);

    let res = send(&mux, Method::GET, "/users/2").await;
    assert_eq!(res.body().bytes(), b"id=2");
    assert_eq!(mux.pool().idle(), 1);
}
