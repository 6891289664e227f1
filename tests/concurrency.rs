use hyper::service::Service;
use hyper::{Request, Response};
use muxtree::{Body, HandlerResult, Mux, RequestVars, Routes};

const TASKS: usize = 32;
const REQUESTS: usize = 100;

async fn echo(_req: Request<Body>, vars: RequestVars) -> HandlerResult {
    tokio::task::yield_now().await;
    let body = format!("{}/{}", vars.url_param("user"), vars.url_param("item"));
    Ok(Response::new(body.into()))
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn parameters_do_not_leak_between_requests() {
    let mut mux: Mux<Body> = Mux::new();
    mux.get("/users/:user/items/:item", echo);
    mux.get("/users/:user", echo);
    let service = mux.into_service();

    let tasks: Vec<_> = (0..TASKS)
        .map(|task| {
            let service = service.clone();
            tokio::spawn(async move {
                for i in 0..REQUESTS {
                    let (uri, expected) = if i % 2 == 0 {
                        (format!("/users/{task}/items/{i}"), format!("{task}/{i}"))
                    } else {
                        (format!("/users/{task}"), format!("{task}/"))
                    };

                    let req = Request::get(uri).body(Body::empty()).unwrap();
                    let res = service.call(req).await.unwrap();
                    assert_eq!(res.body().bytes(), expected.as_bytes());
                }
            })
        })
        .collect();

    for task in tasks {
        task.await.unwrap();
    }

    let idle = service.mux().pool().idle();
    assert!((1..=TASKS).contains(&idle), "{idle} idle vars");
}
