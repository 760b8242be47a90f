//! Request-scoped context and context-aware handlers.
//!
//! A [`Context`] is passed explicitly, as the first argument, to every
//! context-aware handler. Nothing is stored in task-locals or globals: what a
//! handler sees is exactly what the layer above it passed down.
//!
//! ```rust
//! use tsu_chain::{Context, Request};
//!
//! #[derive(Clone)]
//! struct RequestId(String);
//!
//! async fn whoami(ctx: Context, _req: Request) -> String {
//!     match ctx.get::<RequestId>() {
//!         Some(id) => format!("request {}", id.0),
//!         None => "anonymous".to_owned(),
//!     }
//! }
//! ```

use std::future::Future;
use std::sync::{Arc, LazyLock};

use http::Extensions;

use crate::handler::{self, BoxFuture, ErasedHandler};
use crate::middleware::IntoEndpoint;
use crate::request::Request;
use crate::response::IntoResponse;

// ── Context ───────────────────────────────────────────────────────────────────

/// A type-keyed bag of request-scoped values.
///
/// Holds at most one value per type. Cloning forks the bag: values added to
/// the clone are not visible through the original.
#[derive(Clone, Debug, Default)]
pub struct Context {
    values: Extensions,
}

impl Context {
    /// The empty context.
    pub fn background() -> Self {
        Self::default()
    }

    /// Returns the context with `value` added, replacing any value of the
    /// same type.
    pub fn with<T: Clone + Send + Sync + 'static>(mut self, value: T) -> Self {
        self.values.insert(value);
        self
    }

    /// Adds `value`, returning the one it replaced.
    pub fn insert<T: Clone + Send + Sync + 'static>(&mut self, value: T) -> Option<T> {
        self.values.insert(value)
    }

    pub fn get<T: Send + Sync + 'static>(&self) -> Option<&T> {
        self.values.get::<T>()
    }

    pub fn remove<T: Send + Sync + 'static>(&mut self) -> Option<T> {
        self.values.remove::<T>()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

// ── Context-aware handlers ────────────────────────────────────────────────────

/// Dispatch interface of every handler in a [`ContextChain`](crate::ContextChain).
pub trait ErasedContextHandler {
    fn call(&self, ctx: Context, req: Request) -> BoxFuture;
}

/// A heap-allocated, type-erased context-aware handler.
pub type BoxedContextHandler = Arc<dyn ErasedContextHandler + Send + Sync + 'static>;

/// Implemented for every function with the signature:
///
/// ```text
/// async fn name(ctx: Context, req: Request) -> impl IntoResponse
/// ```
///
/// Sealed, like [`Handler`](crate::Handler).
pub trait ContextHandler: private::Sealed + Send + Sync + 'static {
    fn into_boxed_context_handler(self) -> BoxedContextHandler;
}

mod private {
    pub trait Sealed {}
}

impl<F, Fut, R> private::Sealed for F
where
    F: Fn(Context, Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
}

impl<F, Fut, R> ContextHandler for F
where
    F: Fn(Context, Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
    fn into_boxed_context_handler(self) -> BoxedContextHandler {
        Arc::new(FnContextHandler(self))
    }
}

impl<F: ContextHandler> IntoEndpoint<BoxedContextHandler> for F {
    fn into_endpoint(self) -> BoxedContextHandler {
        self.into_boxed_context_handler()
    }
}

struct FnContextHandler<F>(F);

impl<F, Fut, R> ErasedContextHandler for FnContextHandler<F>
where
    F: Fn(Context, Request) -> Fut + Send + Sync,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
    fn call(&self, ctx: Context, req: Request) -> BoxFuture {
        let fut = (self.0)(ctx, req);
        Box::pin(async move { fut.await.into_response() })
    }
}

// ── Fallback ──────────────────────────────────────────────────────────────────

static FALLBACK: LazyLock<BoxedContextHandler> = LazyLock::new(forward_to_default);

fn forward_to_default() -> BoxedContextHandler {
    Arc::new(ForwardToDefault)
}

struct ForwardToDefault;

impl ErasedContextHandler for ForwardToDefault {
    fn call(&self, _ctx: Context, req: Request) -> BoxFuture {
        handler::fallback().call(req)
    }
}

/// The context-aware default handler: drops the context and forwards to
/// [`handler::fallback`](crate::handler::fallback).
///
/// Returns the same instance on every call.
pub fn fallback() -> BoxedContextHandler {
    Arc::clone(&FALLBACK)
}

#[cfg(test)]
mod tests {
    use http::{Method, StatusCode};

    use super::*;

    #[derive(Clone, Debug, PartialEq)]
    struct UserId(u64);

    #[test]
    fn clones_fork_the_bag() {
        let parent = Context::background().with(UserId(7));
        let mut child = parent.clone();
        child.insert(UserId(8));

        assert_eq!(parent.get::<UserId>(), Some(&UserId(7)));
        assert_eq!(child.get::<UserId>(), Some(&UserId(8)));
    }

    #[test]
    fn remove_empties_the_bag() {
        let mut ctx = Context::background().with(UserId(1));
        assert_eq!(ctx.remove::<UserId>(), Some(UserId(1)));
        assert!(ctx.is_empty());
    }

    #[tokio::test]
    async fn fallback_ignores_context() {
        assert!(Arc::ptr_eq(&fallback(), &fallback()));

        let ctx = Context::background().with(UserId(1));
        let res = fallback().call(ctx, Request::new(Method::GET, "/")).await;
        assert_eq!(res.status_code(), StatusCode::NOT_FOUND);
    }
}
