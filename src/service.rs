//! `MuxService` adapts a finished [`Mux`] to hyper's connection machinery.
//!
//! ```rust,no_run
//! use hyper::server::conn::http1::Builder as ConnectionBuilder;
//! use hyper_util::rt::TokioIo;
//! use muxtree::Mux;
//! use tokio::net::TcpListener;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let mux: Mux = Mux::new();
//! let service = mux.into_service();
//!
//! let listener = TcpListener::bind(("127.0.0.1", 3000)).await?;
//! loop {
//!     let (tcp, _) = listener.accept().await?;
//!     let service = service.clone();
//!     tokio::spawn(async move {
//!         let _ = ConnectionBuilder::new()
//!             .serve_connection(TokioIo::new(tcp), service)
//!             .await;
//!     });
//! }
//! # }
//! ```
use std::sync::Arc;

use hyper::body::Incoming;
use hyper::service::Service;
use hyper::{Request, Response};

use crate::handler::{BoxError, HandlerFuture};
use crate::{Body, Mux};

/// A cheaply cloneable handle to a [`Mux`] implementing
/// [`hyper::service::Service`].
pub struct MuxService<B = Incoming>(Arc<Mux<B>>);

impl<B: Send + 'static> MuxService<B> {
    pub(crate) fn new(mux: Mux<B>) -> Self {
        MuxService(Arc::new(mux))
    }

    /// Returns the underlying mux.
    pub fn mux(&self) -> &Mux<B> {
        &self.0
    }
}

impl<B> Clone for MuxService<B> {
    fn clone(&self) -> Self {
        MuxService(Arc::clone(&self.0))
    }
}

impl<B: Send + 'static> Service<Request<B>> for MuxService<B> {
    type Response = Response<Body>;
    type Error = BoxError;
    type Future = HandlerFuture;

    fn call(&self, req: Request<B>) -> Self::Future {
        self.0.serve(req)
    }
}
