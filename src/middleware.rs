use std::any::Any;
use std::io::Write;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

use flate2::write::GzEncoder;
use flate2::Compression;
use futures::FutureExt;
use hyper::header::{
    HeaderValue, ACCEPT_ENCODING, CONTENT_ENCODING, CONTENT_LENGTH, CONTENT_TYPE, VARY,
};
use hyper::{HeaderMap, Request, Response, StatusCode};

use crate::handler::{BoxError, BoxedHandler, Handler, HandlerResult, Middleware};
use crate::pool::RequestVars;
use crate::Body;

/// Logs every request and turns handler failures into a `500` response.
///
/// Each request produces one `info!` line with its method, path, status and
/// latency. Errors returned by the wrapped handler, and panics raised while
/// it runs, are logged at `error!` and answered with
/// `500 Internal Server Error`.
pub fn logging_and_recovery<B: Send + 'static>() -> Middleware<B> {
    Arc::new(|next: BoxedHandler<B>| -> BoxedHandler<B> {
        Arc::new(move |req: Request<B>, vars: RequestVars| {
            let method = req.method().clone();
            let path = req.uri().path().to_owned();
            let start = Instant::now();
            // the inner call happens inside the guard, synchronous panics included
            let next = Arc::clone(&next);
            let future =
                AssertUnwindSafe(async move { next.call(req, vars).await }).catch_unwind();

            async move {
                let res = match future.await {
                    Ok(Ok(res)) => res,
                    Ok(Err(err)) => {
                        error!("{} {}: {}", method, path, err);
                        internal_error()?
                    }
                    Err(panic) => {
                        error!("{} {}: panicked: {}", method, path, panic_message(&*panic));
                        internal_error()?
                    }
                };

                info!(
                    "{} {} {} {:?}",
                    method,
                    path,
                    res.status().as_u16(),
                    start.elapsed()
                );
                Ok::<_, BoxError>(res)
            }
        })
    })
}

/// Compresses response bodies with gzip at the default compression level.
///
/// See [`gzip_level`].
pub fn gzip<B: Send + 'static>() -> Middleware<B> {
    gzip_level(Compression::default())
}

/// Compresses response bodies with gzip at the given level.
///
/// Every response gets `Vary: Accept-Encoding`. The body is only compressed
/// when the request's `Accept-Encoding` mentions gzip, the body is not
/// empty, and the handler did not encode it already.
pub fn gzip_level<B: Send + 'static>(level: Compression) -> Middleware<B> {
    Arc::new(move |next: BoxedHandler<B>| -> BoxedHandler<B> {
        Arc::new(move |req: Request<B>, vars: RequestVars| {
            let accepted = accepts_gzip(req.headers());
            let future = next.call(req, vars);

            async move {
                let mut res = future.await?;
                res.headers_mut()
                    .append(VARY, HeaderValue::from_static("Accept-Encoding"));

                let compress = accepted
                    && !res.body().bytes().is_empty()
                    && !res.headers().contains_key(CONTENT_ENCODING);

                if compress {
                    let mut encoder = GzEncoder::new(Vec::new(), level);
                    encoder.write_all(res.body().bytes())?;
                    let compressed = encoder.finish()?;

                    let headers = res.headers_mut();
                    headers.insert(CONTENT_ENCODING, HeaderValue::from_static("gzip"));
                    headers.remove(CONTENT_LENGTH);
                    *res.body_mut() = Body::from(compressed);
                }

                Ok::<_, BoxError>(res)
            }
        })
    })
}

fn accepts_gzip(headers: &HeaderMap) -> bool {
    headers
        .get_all(ACCEPT_ENCODING)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .any(|value| value.contains("gzip"))
}

fn internal_error() -> HandlerResult {
    let res = Response::builder()
        .status(StatusCode::INTERNAL_SERVER_ERROR)
        .header(CONTENT_TYPE, "text/plain; charset=utf-8")
        .body(Body::from("Internal Server Error"))?;
    Ok(res)
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message
    } else {
        "unknown panic"
    }
}
