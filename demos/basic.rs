//! A shared middleware stack reused by two endpoints, one of them context-aware.
//!
//! Run with:
//!   RUST_LOG=info cargo run --example basic
//!
//! Try:
//!   curl -i http://localhost:3000/
//!   curl -i -H 'x-tenant: acme' http://localhost:3000/whoami

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use tracing::info;
use tsu_chain::{
    BoxedHandler, Chain, Constructor, Context, Endware, ErasedHandler, Handler, Request, Response,
    Server, ServerConfig, StatusCode, Transformer,
};

#[derive(Clone)]
struct Tenant(String);

#[tokio::main]
async fn main() -> Result<(), tsu_chain::Error> {
    tracing_subscriber::fmt::init();

    let stack = Chain::new([request_id(), timing()]).after([access_log()]);

    let index_app = stack.then_fn(Some(index));
    let whoami_app = stack
        .contextualize(Transformer::from_request(|req| match req.header("x-tenant") {
            Some(tenant) => Context::background().with(Tenant(tenant.to_owned())),
            None => Context::background(),
        }))
        .then_fn(Some(whoami));

    // Routing is the application's business; a path check is enough here.
    let app = (move |req: Request| {
        let target = if req.path() == "/whoami" { &whoami_app } else { &index_app };
        target.call(req)
    })
    .into_boxed_handler();

    Server::bind(ServerConfig::default()).await?.serve(app).await
}

/// Tags every request with a sequential `x-request-id`.
fn request_id() -> Constructor<BoxedHandler> {
    let next_id = Arc::new(AtomicU64::new(1));
    Constructor::new(move |next: BoxedHandler| {
        let next_id = Arc::clone(&next_id);
        (move |mut req: Request| {
            let id = next_id.fetch_add(1, Ordering::Relaxed);
            req.insert_header("x-request-id", id.to_string());
            next.call(req)
        })
        .into_boxed_handler()
    })
}

/// Adds `x-elapsed-us` to every response.
fn timing() -> Constructor<BoxedHandler> {
    Constructor::new(|next: BoxedHandler| {
        (move |req: Request| {
            let next = Arc::clone(&next);
            async move {
                let started = Instant::now();
                let mut res = next.call(req).await;
                res.insert_header("x-elapsed-us", started.elapsed().as_micros().to_string());
                res
            }
        })
        .into_boxed_handler()
    })
}

fn access_log() -> Endware {
    Endware::new(|head, res| {
        info!(
            method = %head.method(),
            path = head.path(),
            request_id = head.header("x-request-id").unwrap_or("-"),
            status = res.status_code().as_u16(),
            "served"
        );
    })
}

async fn index(req: Request) -> Response {
    if req.path() != "/" {
        return Response::status(StatusCode::NOT_FOUND);
    }
    Response::text("hello from tsu-chain\n")
}

async fn whoami(ctx: Context, _req: Request) -> Response {
    match ctx.get::<Tenant>() {
        Some(tenant) => Response::text(format!("tenant {}\n", tenant.0)),
        None => Response::builder()
            .status(StatusCode::UNAUTHORIZED)
            .text("missing x-tenant\n"),
    }
}
