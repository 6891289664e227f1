use std::io::Read;

use flate2::read::GzDecoder;
use hyper::header::{ACCEPT_ENCODING, CONTENT_ENCODING, CONTENT_LENGTH, VARY};
use hyper::{Request, Response, StatusCode};
use muxtree::{gzip, gzip_level, json, Body, Compression, HandlerResult, Mux, RequestVars, Routes};

const TEXT: &str = "the quick brown fox jumps over the lazy dog, again and again and again";

async fn text(_req: Request<Body>, _vars: RequestVars) -> HandlerResult {
    let res = Response::builder()
        .header(CONTENT_LENGTH, TEXT.len())
        .body(Body::from(TEXT))?;
    Ok(res)
}

async fn empty(_req: Request<Body>, _vars: RequestVars) -> HandlerResult {
    Ok(Response::builder()
        .status(StatusCode::NO_CONTENT)
        .body(Body::empty())?)
}

async fn encoded(_req: Request<Body>, _vars: RequestVars) -> HandlerResult {
    Ok(Response::builder()
        .header(CONTENT_ENCODING, "br")
        .body(Body::from("already compressed"))?)
}

fn mux() -> Mux<Body> {
    let mut mux: Mux<Body> = Mux::new();
    mux.use_middleware(gzip());
    mux.get("/text", text);
    mux.get("/empty", empty);
    mux.get("/encoded", encoded);
    mux
}

async fn get(mux: &Mux<Body>, uri: &str, accept: Option<&str>) -> Response<Body> {
    let mut req = Request::get(uri);
    if let Some(accept) = accept {
        req = req.header(ACCEPT_ENCODING, accept);
    }
    mux.serve(req.body(Body::empty()).unwrap()).await.unwrap()
}

fn gunzip(bytes: &[u8]) -> String {
    let mut out = String::new();
    GzDecoder::new(bytes).read_to_string(&mut out).unwrap();
    out
}

#[tokio::test]
async fn compresses_when_accepted() {
    let mux = mux();

    let res = get(&mux, "/text", Some("deflate, gzip;q=1.0")).await;
    assert_eq!(res.headers()[CONTENT_ENCODING], "gzip");
    assert_eq!(res.headers()[VARY], "Accept-Encoding");
    assert!(res.headers().get(CONTENT_LENGTH).is_none());
    assert_eq!(gunzip(res.body().bytes()), TEXT);
}

#[tokio::test]
async fn plain_without_accept_encoding() {
    let mux = mux();

    let res = get(&mux, "/text", None).await;
    assert!(res.headers().get(CONTENT_ENCODING).is_none());
    assert_eq!(res.headers()[VARY], "Accept-Encoding");
    assert_eq!(res.body().bytes(), TEXT.as_bytes());

    let res = get(&mux, "/text", Some("br")).await;
    assert!(res.headers().get(CONTENT_ENCODING).is_none());
}

#[tokio::test]
async fn empty_and_encoded_bodies_are_left_alone() {
    let mux = mux();

    let res = get(&mux, "/empty", Some("gzip")).await;
    assert_eq!(res.status(), StatusCode::NO_CONTENT);
    assert!(res.headers().get(CONTENT_ENCODING).is_none());
    assert_eq!(res.headers()[VARY], "Accept-Encoding");

    let res = get(&mux, "/encoded", Some("gzip")).await;
    assert_eq!(res.headers()[CONTENT_ENCODING], "br");
    assert_eq!(res.body().bytes(), b"already compressed");
}

#[tokio::test]
async fn custom_level() {
    let mut mux: Mux<Body> = Mux::new();
    mux.use_middleware(gzip_level(Compression::best()));
    mux.get("/user", |_req: Request<Body>, _vars: RequestVars| async {
        json(StatusCode::OK, &serde_json::json!({ "name": "gopher" }))
    });

    let res = get(&mux, "/user", Some("gzip")).await;
    assert_eq!(res.headers()[CONTENT_ENCODING], "gzip");
    assert_eq!(gunzip(res.body().bytes()), r#"{"name":"gopher"}"#);
}
