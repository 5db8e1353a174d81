//! End-to-end dispatch behavior through the full stack:
//! App chain → Router → Route → handlers.

use http::{header, Method, StatusCode};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use viaduct::prelude::*;

async fn run(app: &App, method: Method, url: &str) -> (RequestContext, Response) {
    let mut req = RequestContext::new(method, url);
    let mut res = Response::new();
    app.handle(&mut req, &mut res).await;
    (req, res)
}

#[tokio::test]
async fn prefix_and_exact_layers_run_in_order() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let mut app = App::new();
    {
        let log = Arc::clone(&log);
        app.router().use_middleware(
            "/api",
            handler_fn(move |req, _| {
                log.lock()
                    .unwrap()
                    .push(format!("A base_url={}", req.base_url()));
                Ok(Flow::Continue)
            }),
        );
    }
    {
        let log = Arc::clone(&log);
        app.get(
            "/api/users/:id",
            handler_fn(move |req, res| {
                log.lock().unwrap().push(format!(
                    "B id={}",
                    req.params().get("id").unwrap_or("<missing>")
                ));
                res.send("ok");
                Ok(Flow::Finish)
            }),
        );
    }

    let (_, res) = run(&app, Method::GET, "/api/users/42").await;

    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(
        *log.lock().unwrap(),
        vec!["A base_url=".to_string(), "B id=42".to_string()]
    );
}

#[tokio::test]
async fn options_fallback_lists_registered_methods() {
    let mut app = App::new();
    app.route("/items")
        .get(handler_fn(|_, _| Ok(Flow::Continue)))
        .post(handler_fn(|_, _| Ok(Flow::Continue)));

    let (_, res) = run(&app, Method::OPTIONS, "/items").await;

    assert_eq!(
        res.header(&header::ALLOW).and_then(|v| v.to_str().ok()),
        Some("GET, POST")
    );
    assert_eq!(res.body(), &b"GET, POST"[..]);
}

#[tokio::test]
async fn unregistered_method_gets_not_found() {
    let mut app = App::new();
    app.route("/items")
        .get(handler_fn(|_, res| {
            res.send("list");
            Ok(Flow::Finish)
        }))
        .post(handler_fn(|_, res| {
            res.send("create");
            Ok(Flow::Finish)
        }));

    let (_, res) = run(&app, Method::DELETE, "/items").await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn head_request_runs_get_handler() {
    let mut app = App::new();
    app.get(
        "/items",
        handler_fn(|_, res| {
            res.send("list");
            Ok(Flow::Finish)
        }),
    );

    let (_, res) = run(&app, Method::HEAD, "/items").await;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.body(), &b"list"[..]);
}

#[tokio::test]
async fn nested_mounts_accumulate_base_url() {
    let observed = Arc::new(Mutex::new(Vec::new()));

    let mut leaf = Router::new();
    {
        let observed = Arc::clone(&observed);
        leaf.get(
            "/report",
            handler_fn(move |req, res| {
                observed
                    .lock()
                    .unwrap()
                    .push((req.base_url().to_string(), req.url().to_string()));
                res.send("done");
                Ok(Flow::Finish)
            }),
        );
    }

    let mut mid = Router::new();
    mid.mount("/v1", leaf);

    let mut app = App::new();
    app.mount("/api", mid);

    let (req, res) = run(&app, Method::GET, "/api/v1/report").await;

    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(
        *observed.lock().unwrap(),
        vec![("/api/v1".to_string(), "/report".to_string())]
    );
    // The caller's view is restored regardless of match outcome.
    assert_eq!(req.base_url(), "");
    assert_eq!(req.url(), "/api/v1/report");
}

#[tokio::test]
async fn base_url_restored_after_no_match_in_nested_router() {
    let mut inner = Router::new();
    inner.get("/only-this", handler_fn(|_, _| Ok(Flow::Continue)));

    let after = Arc::new(Mutex::new(Vec::new()));
    let mut app = App::new();
    app.mount("/api", inner);
    {
        let after = Arc::clone(&after);
        app.router().use_middleware(
            "/",
            handler_fn(move |req, _| {
                after
                    .lock()
                    .unwrap()
                    .push((req.base_url().to_string(), req.url().to_string()));
                Ok(Flow::Continue)
            }),
        );
    }

    run(&app, Method::GET, "/api/other").await;

    assert_eq!(
        *after.lock().unwrap(),
        vec![(String::new(), "/api/other".to_string())]
    );
}

#[tokio::test]
async fn param_middleware_runs_once_per_unique_value() {
    let hits = Arc::new(AtomicUsize::new(0));
    let mut app = App::new();
    {
        let hits = Arc::clone(&hits);
        app.param(
            "id",
            param_fn(move |_, _, _| {
                hits.fetch_add(1, Ordering::SeqCst);
                Ok(Flow::Continue)
            }),
        );
    }
    // Two different layers both bind a parameter named `id`.
    app.router()
        .use_middleware("/users/:id", handler_fn(|_, _| Ok(Flow::Continue)));
    app.get(
        "/users/:id",
        handler_fn(|_, res| {
            res.send("user");
            Ok(Flow::Finish)
        }),
    );

    run(&app, Method::GET, "/users/42").await;
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn thrown_error_reaches_nearest_error_handler() {
    let mut app = App::new();
    app.get(
        "/explode",
        handler_fn(|_, _| Err(DispatchError::internal("kaboom"))),
    );
    app.use_error(error_handler_fn(|err, _, res| {
        res.set_status(StatusCode::IM_A_TEAPOT);
        res.send(err.to_string());
        Ok(Flow::Finish)
    }));

    let (_, res) = run(&app, Method::GET, "/explode").await;

    assert_eq!(res.status(), StatusCode::IM_A_TEAPOT);
    assert!(String::from_utf8_lossy(res.body()).contains("kaboom"));
}

#[tokio::test]
async fn unhandled_error_becomes_500_class_response() {
    let mut app = App::new();
    app.get(
        "/explode",
        handler_fn(|_, _| Err(DispatchError::internal("kaboom"))),
    );

    let (_, res) = run(&app, Method::GET, "/explode").await;

    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(res.is_ended());
}

#[tokio::test]
async fn skip_route_resumes_at_parent_router() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let mut app = App::new();
    {
        let log = Arc::clone(&log);
        app.route("/items").get(handler_fn(move |_, _| {
            log.lock().unwrap().push("first route handler");
            Ok(Flow::SkipRoute)
        }));
    }
    {
        let log = Arc::clone(&log);
        app.route("/items").get(handler_fn(move |_, _| {
            log.lock().unwrap().push("second route handler");
            Ok(Flow::Continue)
        }));
    }
    {
        let log = Arc::clone(&log);
        app.router().use_middleware(
            "/",
            handler_fn(move |_, res| {
                log.lock().unwrap().push("sibling layer");
                res.send("fell through");
                Ok(Flow::Finish)
            }),
        );
    }

    run(&app, Method::GET, "/items").await;

    assert_eq!(
        *log.lock().unwrap(),
        vec!["first route handler", "sibling layer"]
    );
}

#[tokio::test]
async fn long_synchronous_chain_completes() {
    let hits = Arc::new(AtomicUsize::new(0));
    let mut app = App::new();
    for _ in 0..1_000 {
        let hits = Arc::clone(&hits);
        app.router().use_middleware(
            "/",
            handler_fn(move |_, _| {
                hits.fetch_add(1, Ordering::SeqCst);
                Ok(Flow::Continue)
            }),
        );
    }

    let (_, res) = run(&app, Method::GET, "/deep").await;

    assert_eq!(hits.load(Ordering::SeqCst), 1_000);
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn strict_routing_setting_controls_trailing_slash() {
    let mut app = App::new();
    app.enable("strict routing");
    app.get(
        "/exact",
        handler_fn(|_, res| {
            res.send("hit");
            Ok(Flow::Finish)
        }),
    );

    let (_, res) = run(&app, Method::GET, "/exact").await;
    assert_eq!(res.status(), StatusCode::OK);

    let (_, res) = run(&app, Method::GET, "/exact/").await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}
