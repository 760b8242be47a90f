//! Middleware layer.
//!
//! Middleware is the right place for cross-cutting concerns: structured
//! tracing, rate limiting, request-id injection, authentication. This module
//! does not ship any middleware. It composes yours.
//!
//! A [`Constructor`] wraps one handler and returns another. A [`Chain`] is an
//! immutable, ordered list of constructors (plus optional endwares) that can
//! be resolved around a terminal handler any number of times:
//!
//! ```text
//! Chain::new([m1, m2, m3]).after([e1, e2]).then(Some(h))
//!
//!     request ──▶ m1 ──▶ m2 ──▶ m3 ──▶ h ──▶ e1 ──▶ e2
//! ```
//!
//! The same chain works for three handler shapes:
//!
//! | Chain | Handler | Absent terminal resolves to |
//! |---|---|---|
//! | [`Chain`] | [`BoxedHandler`](crate::BoxedHandler) | [`handler::fallback`](crate::handler::fallback) (404) |
//! | [`TransportChain`] | [`BoxedTransport`](crate::BoxedTransport) | [`default_transport`](crate::transport::default_transport) |
//! | [`ContextChain`] | [`BoxedContextHandler`](crate::BoxedContextHandler) | [`context::fallback`](crate::context::fallback) |
//!
//! A plain chain can turn context-aware partway through with
//! [`Chain::contextualize`], see [`ToContextChain`].

use std::fmt;
use std::sync::Arc;

mod bridge;
mod chain;
mod context_chain;

pub use bridge::{ToContextChain, Transformer};
pub use chain::{Chain, TransportChain};
pub use context_chain::{ContextChain, ContextConstructor};

// ── Constructor ───────────────────────────────────────────────────────────────

/// A piece of middleware: takes the next handler, returns a handler that
/// (usually) calls it.
///
/// Cheap to clone. A constructor is invoked once per resolution of the chain
/// holding it, not once per request.
pub struct Constructor<H>(Arc<dyn Fn(H) -> H + Send + Sync>);

impl<H> Constructor<H> {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(H) -> H + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    /// Applies the constructor to `next`.
    pub fn wrap(&self, next: H) -> H {
        (self.0)(next)
    }
}

impl<H> Clone for Constructor<H> {
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}

impl<H> fmt::Debug for Constructor<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Constructor")
    }
}

// ── Endpoint ──────────────────────────────────────────────────────────────────

/// A handler shape a [`Chain`] knows how to resolve.
///
/// Implemented for [`BoxedHandler`](crate::BoxedHandler) and
/// [`BoxedTransport`](crate::BoxedTransport).
pub trait Endpoint: Clone + Send + Sync + 'static {
    /// Post-processing step run after the handler completes.
    type Endware: Clone + Send + Sync + 'static;

    /// The handler substituted for an absent terminal.
    ///
    /// Must return the same shared instance on every call.
    fn fallback() -> Self;

    /// Wraps `self` so that every endware runs, in order, once it completes.
    fn followed_by(self, endwares: Vec<Self::Endware>) -> Self;
}

/// Conversion of a plain function into a boxed handler of shape `E`.
///
/// Blanket-implemented for async functions with the right signature, so
/// `then_fn(Some(my_handler))` works for every chain.
pub trait IntoEndpoint<E> {
    fn into_endpoint(self) -> E;
}

/// Applies `constructors` around `terminal`, last one innermost.
pub(crate) fn compose<H>(terminal: H, constructors: &[Constructor<H>]) -> H {
    constructors
        .iter()
        .rev()
        .fold(terminal, |next, constructor| constructor.wrap(next))
}
