//! Handler trait and type erasure.
//!
//! # How async handlers are stored
//!
//! A chain wraps handlers of *different* concrete types around each other,
//! so every layer is stored as a **trait object** (`dyn ErasedHandler`) that
//! hides the concrete type behind one interface.
//!
//! The chain from user code to vtable call is:
//!
//! ```text
//! async fn hello(req: Request) -> Response { … }   ← user writes this
//!        ↓ chain.then_fn(Some(hello))
//! hello.into_boxed_handler()                       ← Handler blanket impl
//!        ↓
//! Arc::new(FnHandler(hello))                       ← heap-allocated wrapper
//!        ↓  wrapped by each Constructor, outermost stored as BoxedHandler
//! handler.call(req)  at request time               ← one vtable dispatch per layer
//!        ↓
//! Box::pin(async { hello(req).await.into_response() })  ← BoxFuture
//! ```

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, LazyLock};

use http::StatusCode;

use crate::middleware::{Endpoint, IntoEndpoint};
use crate::request::{Head, Request};
use crate::response::{IntoResponse, Response};

/// A heap-allocated, type-erased future that resolves to a [`Response`].
///
/// `Send + 'static` lets tokio move the future across threads.
pub type BoxFuture = Pin<Box<dyn Future<Output = Response> + Send + 'static>>;

/// Dispatch interface of every handler in a chain.
///
/// Middleware calls this on the handler it wraps to continue the chain.
/// Not calling it short-circuits everything further in.
pub trait ErasedHandler {
    fn call(&self, req: Request) -> BoxFuture;
}

/// A heap-allocated, type-erased handler shared across concurrent requests.
pub type BoxedHandler = Arc<dyn ErasedHandler + Send + Sync + 'static>;

// ── Public Handler trait ──────────────────────────────────────────────────────

/// Implemented for every valid request handler function.
///
/// You never implement this yourself. It is automatically satisfied for any
/// `async fn` (or closure returning a future) with the signature:
///
/// ```text
/// async fn name(req: Request) -> impl IntoResponse
/// ```
///
/// The trait is **sealed** (via the private `Sealed` supertrait): only the
/// blanket impl below can satisfy it.
pub trait Handler: private::Sealed + Send + Sync + 'static {
    /// Boxes the function so it can be composed.
    fn into_boxed_handler(self) -> BoxedHandler;
}

mod private {
    pub trait Sealed {}
}

impl<F, Fut, R> private::Sealed for F
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
}

impl<F, Fut, R> Handler for F
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
    fn into_boxed_handler(self) -> BoxedHandler {
        Arc::new(FnHandler(self))
    }
}

impl<F: Handler> IntoEndpoint<BoxedHandler> for F {
    fn into_endpoint(self) -> BoxedHandler {
        self.into_boxed_handler()
    }
}

/// Newtype wrapper that holds a concrete handler `F` and implements
/// [`ErasedHandler`], bridging the typed world to the trait-object world.
struct FnHandler<F>(F);

impl<F, Fut, R> ErasedHandler for FnHandler<F>
where
    F: Fn(Request) -> Fut + Send + Sync,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
    fn call(&self, req: Request) -> BoxFuture {
        let fut = (self.0)(req);
        Box::pin(async move { fut.await.into_response() })
    }
}

// ── Fallback ──────────────────────────────────────────────────────────────────

static FALLBACK: LazyLock<BoxedHandler> = LazyLock::new(not_found);

fn not_found() -> BoxedHandler {
    Arc::new(NotFound)
}

struct NotFound;

impl ErasedHandler for NotFound {
    fn call(&self, _req: Request) -> BoxFuture {
        Box::pin(async { Response::status(StatusCode::NOT_FOUND) })
    }
}

/// The process-wide default handler: answers `404 Not Found` to everything.
///
/// Chains resolve an absent terminal to this. Every call returns the same
/// instance, so `Arc::ptr_eq(&a, &handler::fallback())` identifies it.
pub fn fallback() -> BoxedHandler {
    Arc::clone(&FALLBACK)
}

// ── Endware ───────────────────────────────────────────────────────────────────

/// Runs after the main handler has produced its response.
///
/// Sees the request head (the body is gone by then) and may amend the
/// response: add a header, append to the body, or only observe it for
/// logging and metrics.
#[derive(Clone)]
pub struct Endware(pub(crate) Arc<dyn Fn(&Head, &mut Response) + Send + Sync>);

impl Endware {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&Head, &mut Response) + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    pub fn call(&self, head: &Head, res: &mut Response) {
        (self.0)(head, res)
    }
}

/// A handler followed by its endwares. Sits directly above the terminal,
/// below every constructor.
struct EndwareHandler {
    handler: BoxedHandler,
    endwares: Arc<[Endware]>,
}

impl ErasedHandler for EndwareHandler {
    fn call(&self, req: Request) -> BoxFuture {
        let head = req.head();
        let inner = self.handler.call(req);
        let endwares = Arc::clone(&self.endwares);
        Box::pin(async move {
            let mut res = inner.await;
            for endware in endwares.iter() {
                endware.call(&head, &mut res);
            }
            res
        })
    }
}

impl Endpoint for BoxedHandler {
    type Endware = Endware;

    fn fallback() -> Self {
        self::fallback()
    }

    fn followed_by(self, endwares: Vec<Endware>) -> Self {
        Arc::new(EndwareHandler { handler: self, endwares: endwares.into() })
    }
}
