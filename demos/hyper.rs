use std::net::SocketAddr;

use hyper::body::Incoming;
use hyper::server::conn::http1::Builder as ConnectionBuilder;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use muxtree::{
    accepted_languages, attachment, gzip, json, logging_and_recovery, Body, HandlerResult, Mux,
    RequestVars, Routes,
};
use tokio::net::TcpListener;

// GET /
async fn index(req: Request<Incoming>, _vars: RequestVars) -> HandlerResult {
    let greeting = match accepted_languages(req.headers()).first().map(String::as_str) {
        Some("fr") => "Bonjour, le monde!",
        Some("de") => "Hallo, Welt!",
        _ => "Hello, world!",
    };
    Ok(Response::new(greeting.into()))
}

// GET /blog/:slug
async fn post(_req: Request<Incoming>, vars: RequestVars) -> HandlerResult {
    Ok(Response::new(format!("post: {}", vars.url_param("slug")).into()))
}

// GET /search?q=...
async fn search(_req: Request<Incoming>, mut vars: RequestVars) -> HandlerResult {
    let query = vars.query_param("q").unwrap_or("").to_owned();
    Ok(Response::new(format!("searching for {query:?}").into()))
}

// GET /api/users/:id
async fn user(_req: Request<Incoming>, vars: RequestVars) -> HandlerResult {
    json(
        StatusCode::OK,
        &serde_json::json!({ "id": vars.url_param("id"), "name": "gopher" }),
    )
}

// GET /download
async fn download(_req: Request<Incoming>, _vars: RequestVars) -> HandlerResult {
    attachment("hello.txt", "Hello from muxtree!\n")
}

// GET /static/*file
async fn asset(_req: Request<Incoming>, vars: RequestVars) -> HandlerResult {
    Ok(Response::new(format!("asset: {}", vars.url_param("file")).into()))
}

// 404 handler
async fn not_found(_req: Request<Incoming>, _vars: RequestVars) -> HandlerResult {
    let res = Response::builder()
        .status(StatusCode::NOT_FOUND)
        .body(Body::from("nothing to see here"))?;
    Ok(res)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init();

    let mut mux: Mux = Mux::new();
    mux.use_middleware(logging_and_recovery());
    mux.register_automatic_options([logging_and_recovery()]);
    mux.register_method_not_allowed([logging_and_recovery()]);
    mux.register_not_found(not_found, [logging_and_recovery()]);

    mux.get("/", index);
    mux.get("/search", search);
    mux.get("/static/*file", asset);
    mux.get("/download", download);

    let mut api = mux.group_with("/api", [gzip()]);
    api.get("/users/:id", user);

    let mut blog = mux.group("/blog");
    blog.get("/:slug", post);
    blog.delete("/:slug", post);

    let service = mux.into_service();

    let addr = SocketAddr::from(([127, 0, 0, 1], 3000));
    let listener = TcpListener::bind(addr).await?;
    println!("listening on http://{addr}");

    loop {
        let (tcp, _) = listener.accept().await?;
        let service = service.clone();
        tokio::task::spawn(async move {
            if let Err(err) = ConnectionBuilder::new()
                .serve_connection(TokioIo::new(tcp), service)
                .await
            {
                println!("Error serving connection: {:?}", err);
            }
        });
    }
}
