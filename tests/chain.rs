mod common;

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use common::{Recorder, tag_app, tag_endware, tag_middleware};
use tsu_chain::handler;
use tsu_chain::{
    BoxedHandler, Chain, Constructor, Endware, ErasedHandler, Handler, Method, Request, Response,
    StatusCode,
};

fn get(path: &str) -> Request {
    Request::new(Method::GET, path)
}

#[tokio::test]
async fn then_orders_handlers_correctly() {
    let rec = Recorder::default();
    let chain = Chain::new([
        tag_middleware(&rec, "t1\n"),
        tag_middleware(&rec, "t2\n"),
        tag_middleware(&rec, "t3\n"),
    ])
    .after([
        tag_endware(&rec, "e1\n"),
        tag_endware(&rec, "e2\n"),
        tag_endware(&rec, "e3\n"),
    ]);

    let res = chain.then(Some(tag_app(&rec, "app\n"))).call(get("/")).await;

    assert_eq!(res.status_code(), StatusCode::OK);
    assert_eq!(rec.output(), "t1\nt2\nt3\napp\ne1\ne2\ne3\n");
}

#[test]
fn then_without_middleware_returns_the_terminal_itself() {
    let rec = Recorder::default();
    let app = tag_app(&rec, "app\n");

    let resolved = Chain::<BoxedHandler>::default().then(Some(Arc::clone(&app)));

    assert!(Arc::ptr_eq(&resolved, &app));
}

#[tokio::test]
async fn absent_terminal_resolves_to_the_default_handler() {
    let resolved = Chain::<BoxedHandler>::default().then(None);
    assert!(Arc::ptr_eq(&resolved, &handler::fallback()));

    let no_terminal = None::<fn(Request) -> std::future::Ready<Response>>;
    let resolved = Chain::<BoxedHandler>::default().then_fn(no_terminal);
    assert!(Arc::ptr_eq(&resolved, &handler::fallback()));

    let rec = Recorder::default();
    let res = Chain::new([tag_middleware(&rec, "t1\n")]).then(None).call(get("/")).await;
    assert_eq!(res.status_code(), StatusCode::NOT_FOUND);
    assert_eq!(rec.output(), "t1\n");
}

#[tokio::test]
async fn then_fn_accepts_async_functions() {
    async fn hello(req: Request) -> String {
        format!("hello {}", req.path())
    }

    let res = Chain::<BoxedHandler>::default().then_fn(Some(hello)).call(get("/world")).await;
    assert_eq!(res.body(), b"hello /world");
}

#[tokio::test]
async fn append_adds_handlers_without_touching_the_original() {
    let rec = Recorder::default();
    let chain = Chain::new([tag_middleware(&rec, "t1\n"), tag_middleware(&rec, "t2\n")]);
    let new_chain = chain.append([tag_middleware(&rec, "t3\n"), tag_middleware(&rec, "t4\n")]);

    assert_eq!(chain.constructor_count(), 2);
    assert_eq!(new_chain.constructor_count(), 4);

    new_chain.then(Some(tag_app(&rec, "app\n"))).call(get("/")).await;
    assert_eq!(rec.take(), "t1\nt2\nt3\nt4\napp\n");

    chain.then(Some(tag_app(&rec, "app\n"))).call(get("/")).await;
    assert_eq!(rec.take(), "t1\nt2\napp\n");
}

#[tokio::test]
async fn append_keeps_existing_endwares() {
    let rec = Recorder::default();
    let chain = Chain::new([tag_middleware(&rec, "t1\n")])
        .after([tag_endware(&rec, "e1\n")])
        .append([tag_middleware(&rec, "t2\n")]);

    chain.then(Some(tag_app(&rec, "app\n"))).call(get("/")).await;
    assert_eq!(rec.output(), "t1\nt2\napp\ne1\n");
}

#[tokio::test]
async fn append_endware_adds_endwares_without_touching_the_original() {
    let rec = Recorder::default();
    let chain = Chain::new([tag_middleware(&rec, "t1\n")])
        .after([tag_endware(&rec, "e1\n"), tag_endware(&rec, "e2\n")]);
    let new_chain = chain.append_endware([tag_endware(&rec, "e3\n"), tag_endware(&rec, "e4\n")]);

    assert_eq!(chain.endware_count(), 2);
    assert_eq!(new_chain.endware_count(), 4);

    new_chain.then(Some(tag_app(&rec, "app\n"))).call(get("/")).await;
    assert_eq!(rec.take(), "t1\napp\ne1\ne2\ne3\ne4\n");

    chain.then(Some(tag_app(&rec, "app\n"))).call(get("/")).await;
    assert_eq!(rec.take(), "t1\napp\ne1\ne2\n");
}

#[tokio::test]
async fn after_replaces_nothing_and_keeps_constructors() {
    let rec = Recorder::default();
    let chain = Chain::new([tag_middleware(&rec, "t1\n"), tag_middleware(&rec, "t2\n")])
        .after([tag_endware(&rec, "e1\n")]);

    assert_eq!(chain.constructor_count(), 2);
    assert_eq!(chain.endware_count(), 1);

    chain.then(Some(tag_app(&rec, "app\n"))).call(get("/")).await;
    assert_eq!(rec.output(), "t1\nt2\napp\ne1\n");
}

#[tokio::test]
async fn extend_concatenates_constructors_and_endwares() {
    let rec = Recorder::default();
    let first = Chain::new([tag_middleware(&rec, "t1\n"), tag_middleware(&rec, "t2\n")])
        .after([tag_endware(&rec, "e1\n")]);
    let second = Chain::new([tag_middleware(&rec, "t3\n"), tag_middleware(&rec, "t4\n")])
        .after([tag_endware(&rec, "e2\n")]);

    let extended = first.extend(&second);

    assert_eq!(extended.constructor_count(), 4);
    assert_eq!(extended.endware_count(), 2);
    assert_eq!(first.constructor_count(), 2);
    assert_eq!(second.constructor_count(), 2);

    extended.then(Some(tag_app(&rec, "app\n"))).call(get("/")).await;
    assert_eq!(rec.take(), "t1\nt2\nt3\nt4\napp\ne1\ne2\n");

    first.then(Some(tag_app(&rec, "app\n"))).call(get("/")).await;
    assert_eq!(rec.take(), "t1\nt2\napp\ne1\n");
}

#[tokio::test]
async fn every_resolution_builds_fresh_middleware() {
    // Each wrapped handler owns its own hit counter.
    let built = Arc::new(AtomicUsize::new(0));
    let counted = Arc::clone(&built);
    let counter = Constructor::new(move |next: BoxedHandler| -> BoxedHandler {
        counted.fetch_add(1, Ordering::SeqCst);
        let hits = Arc::new(AtomicUsize::new(0));
        (move |req: Request| {
            let seen = hits.fetch_add(1, Ordering::SeqCst) + 1;
            let next = Arc::clone(&next);
            async move {
                let mut res = next.call(req).await;
                res.insert_header("x-hits", seen.to_string());
                res
            }
        })
        .into_boxed_handler()
    });

    let chain = Chain::new([counter]);
    let a = chain.then_fn(Some(|_req: Request| async { "a" }));
    let b = chain.then_fn(Some(|_req: Request| async { "b" }));
    assert_eq!(built.load(Ordering::SeqCst), 2);

    a.call(get("/")).await;
    let res = a.call(get("/")).await;
    assert_eq!(res.header("x-hits"), Some("2"));

    let res = b.call(get("/")).await;
    assert_eq!(res.body(), b"b");
    assert_eq!(res.header("x-hits"), Some("1"));
}

#[tokio::test]
async fn middleware_can_short_circuit() {
    let rec = Recorder::default();
    let deny = Constructor::new(|_next: BoxedHandler| -> BoxedHandler {
        (|_req: Request| async {
            Response::builder()
                .status(StatusCode::UNAUTHORIZED)
                .header("www-authenticate", "Bearer")
                .no_body()
        })
        .into_boxed_handler()
    });

    let chain = Chain::new([tag_middleware(&rec, "t1\n"), deny, tag_middleware(&rec, "t2\n")])
        .after([tag_endware(&rec, "e1\n")]);
    let res = chain.then(Some(tag_app(&rec, "app\n"))).call(get("/")).await;

    assert_eq!(res.status_code(), StatusCode::UNAUTHORIZED);
    assert_eq!(res.header("www-authenticate"), Some("Bearer"));
    assert!(res.body().is_empty());
    assert_eq!(rec.output(), "t1\n");
}

#[tokio::test]
async fn endwares_can_amend_the_response() {
    let stamp = Endware::new(|head, res| {
        res.insert_header("x-path", head.path());
    });
    let app = Chain::<BoxedHandler>::default()
        .after([stamp])
        .then_fn(Some(|_req: Request| async { "ok" }));

    let res = app.call(get("/stamped")).await;
    assert_eq!(res.header("x-path"), Some("/stamped"));
    assert_eq!(res.body(), b"ok");
}
