//! # `muxtree`
//!
//! A fast HTTP request multiplexer built on a radix tree.
//!
//! Routes are registered per HTTP method and may contain two kinds of
//! parameters:
//!
//! ```text
//! Syntax    Type
//! :name     named parameter
//! *name     catch-all parameter
//! ```
//!
//! Named parameters match exactly one non-empty path segment:
//!
//! ```text
//! Pattern: /user/:user
//!
//!  /user/gordon              match
//!  /user/you                 match
//!  /user/gordon/profile      no match
//!  /user/                    no match
//! ```
//!
//! Catch-all parameters match everything after the final `/` of the
//! pattern, slashes included, and must always be the last segment. An
//! unnamed catch-all (`/files/*`) binds to [`WILDCARD_PARAM`].
//!
//! ```text
//! Pattern: /src/*filepath
//!
//!  /src/                     match: filepath = ""
//!  /src/somefile.rs          match: filepath = "somefile.rs"
//!  /src/subdir/somefile.rs   match: filepath = "subdir/somefile.rs"
//! ```
//!
//! Handlers receive the request and its [`RequestVars`], which hold the
//! captured parameters for the lifetime of the request:
//!
//! ```rust
//! use muxtree::{logging_and_recovery, Body, HandlerResult, Mux, RequestVars, Routes};
//! use hyper::{Request, Response};
//!
//! async fn user(_req: Request<Body>, vars: RequestVars) -> HandlerResult {
//!     Ok(Response::new(format!("user {}", vars.url_param("id")).into()))
//! }
//!
//! let mut mux: Mux<Body> = Mux::new();
//! mux.use_middleware(logging_and_recovery());
//! mux.register_method_not_allowed([]);
//!
//! let mut users = mux.group("/users");
//! users.get("/:id", user);
//! users.delete("/:id", user);
//! ```
//!
//! Besides routing, the crate ships [`logging_and_recovery`] and [`gzip`]
//! middleware, and response helpers such as [`json`] and [`attachment`].
//!
//! Routes are checked for conflicts as they are registered. The
//! registration methods panic on an invalid or conflicting route, since
//! this is a programming error that should stop the program at startup;
//! [`Routes::try_handle`] and [`Node::insert`] return an [`InsertError`]
//! instead.
//!
//! Registration must finish before the mux starts serving: the routing
//! trees are not synchronized, and serving only requires `&self`.
#![deny(clippy::all)]
#![forbid(unsafe_code)]

#[macro_use]
extern crate log;

mod body;
mod error;
mod escape;
mod group;
mod handler;
mod helpers;
mod middleware;
mod mux;
mod params;
mod pool;
mod service;
mod table;
mod tree;

pub use body::Body;
pub use error::InsertError;
pub use escape::{escape_path, unescape, EscapeError};
pub use flate2::Compression;
pub use group::{Group, Routes};
pub use handler::{
    middleware_fn, BoxError, BoxedHandler, Handler, HandlerFuture, HandlerResult, Middleware,
};
pub use helpers::{
    accepted_languages, attachment, client_ip, inline, json, json_bytes, jsonp, xml_bytes,
};
pub use middleware::{gzip, gzip_level, logging_and_recovery};
pub use mux::Mux;
pub use params::{Params, ParamsIter};
pub use pool::{RequestVars, VarsPool};
pub use service::MuxService;
pub use table::RouteTable;
pub use tree::{Match, Node, MAX_PARAMS, WILDCARD_PARAM};
