//! Shared helpers: middleware that record a tag when a request passes
//! through them, so tests can assert on the order of execution.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use tsu_chain::{
    BoxedContextHandler, BoxedHandler, Constructor, Context, ContextConstructor, ContextHandler,
    Endware, ErasedContextHandler, ErasedHandler, Handler, Request, Response,
};

/// Collects tags in the order they were recorded.
#[derive(Clone, Default)]
pub struct Recorder(Arc<Mutex<String>>);

impl Recorder {
    pub fn record(&self, tag: &str) {
        self.0.lock().unwrap().push_str(tag);
    }

    pub fn output(&self) -> String {
        self.0.lock().unwrap().clone()
    }

    pub fn take(&self) -> String {
        std::mem::take(&mut *self.0.lock().unwrap())
    }
}

/// Middleware that records `tag`, then calls the next handler.
pub fn tag_middleware(rec: &Recorder, tag: &'static str) -> Constructor<BoxedHandler> {
    let rec = rec.clone();
    Constructor::new(move |next: BoxedHandler| {
        let rec = rec.clone();
        (move |req: Request| {
            let rec = rec.clone();
            let next = Arc::clone(&next);
            async move {
                rec.record(tag);
                next.call(req).await
            }
        })
        .into_boxed_handler()
    })
}

pub fn tag_endware(rec: &Recorder, tag: &'static str) -> Endware {
    let rec = rec.clone();
    Endware::new(move |_, _| rec.record(tag))
}

/// Terminal handler that records `tag` and answers `200 ok`.
pub fn tag_app(rec: &Recorder, tag: &'static str) -> BoxedHandler {
    let rec = rec.clone();
    (move |_req: Request| {
        rec.record(tag);
        async { Response::text("ok") }
    })
    .into_boxed_handler()
}

pub fn ctx_tag_middleware(rec: &Recorder, tag: &'static str) -> ContextConstructor {
    let rec = rec.clone();
    Constructor::new(move |next: BoxedContextHandler| {
        let rec = rec.clone();
        (move |ctx: Context, req: Request| {
            rec.record(tag);
            next.call(ctx, req)
        })
        .into_boxed_context_handler()
    })
}

pub fn ctx_tag_app(rec: &Recorder, tag: &'static str) -> BoxedContextHandler {
    let rec = rec.clone();
    (move |_ctx: Context, _req: Request| {
        rec.record(tag);
        async { Response::text("ok") }
    })
    .into_boxed_context_handler()
}
