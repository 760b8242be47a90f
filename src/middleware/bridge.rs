//! Turning a plain chain context-aware partway through.
//!
//! ```text
//! Chain::new([t1, t2])
//!     .contextualize(Transformer::background())
//!     .append([ct1, ct2])
//!     .then_fn(Some(app))
//!
//!     request ──▶ t1 ──▶ t2 ──▶ ⟨transformer⟩ ──▶ ct1 ──▶ ct2 ──▶ app
//!                └── Handler ──┘   the seam     └──── ContextHandler ────┘
//! ```

use std::fmt;
use std::sync::Arc;

use tracing::trace;

use super::{Chain, ContextChain, ContextConstructor, IntoEndpoint};
use crate::context::{BoxedContextHandler, Context, ErasedContextHandler};
use crate::handler::{BoxFuture, BoxedHandler, ErasedHandler};
use crate::request::Request;

// ── Transformer ───────────────────────────────────────────────────────────────

/// Converts a fully composed context-aware handler into a plain one.
///
/// Whatever it returns decides which [`Context`] the context-aware segment
/// sees. Called exactly once per resolution of a [`ToContextChain`].
#[derive(Clone)]
pub struct Transformer(Arc<dyn Fn(BoxedContextHandler) -> BoxedHandler + Send + Sync>);

impl Transformer {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(BoxedContextHandler) -> BoxedHandler + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    /// Hands every request a clone of `ctx`.
    pub fn bind(ctx: Context) -> Self {
        Self::new(move |next| Arc::new(Bound { next, ctx: ctx.clone() }))
    }

    /// Hands every request an empty context.
    pub fn background() -> Self {
        Self::bind(Context::background())
    }

    /// Builds each request's context from the request itself, e.g. lifting a
    /// header into a typed value.
    pub fn from_request<F>(derive: F) -> Self
    where
        F: Fn(&Request) -> Context + Send + Sync + 'static,
    {
        let derive: Arc<dyn Fn(&Request) -> Context + Send + Sync> = Arc::new(derive);
        Self::new(move |next| Arc::new(Derived { next, derive: Arc::clone(&derive) }))
    }

    pub fn apply(&self, handler: BoxedContextHandler) -> BoxedHandler {
        (self.0)(handler)
    }
}

impl fmt::Debug for Transformer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Transformer")
    }
}

struct Bound {
    next: BoxedContextHandler,
    ctx: Context,
}

impl ErasedHandler for Bound {
    fn call(&self, req: Request) -> BoxFuture {
        self.next.call(self.ctx.clone(), req)
    }
}

struct Derived {
    next: BoxedContextHandler,
    derive: Arc<dyn Fn(&Request) -> Context + Send + Sync>,
}

impl ErasedHandler for Derived {
    fn call(&self, req: Request) -> BoxFuture {
        let ctx = (self.derive)(&req);
        self.next.call(ctx, req)
    }
}

// ── ToContextChain ────────────────────────────────────────────────────────────

/// A plain [`Chain`] followed by a [`ContextChain`], joined by a
/// [`Transformer`].
///
/// Like the chains it holds, it is immutable: [`append`](Self::append)
/// returns a new value.
#[derive(Clone, Debug)]
pub struct ToContextChain {
    chain: Chain,
    transformer: Transformer,
    context_chain: ContextChain,
}

impl Chain {
    /// Ends the plain segment of this chain and starts a context-aware one.
    ///
    /// The returned chain keeps a copy of this chain's constructors and
    /// endwares; the endwares still run after the whole request.
    pub fn contextualize(&self, transformer: Transformer) -> ToContextChain {
        ToContextChain {
            chain: self.clone(),
            transformer,
            context_chain: ContextChain::default(),
        }
    }
}

impl ToContextChain {
    /// Returns a new chain with `constructors` added to the context-aware
    /// segment. The plain segment is unchanged.
    pub fn append(&self, constructors: impl IntoIterator<Item = ContextConstructor>) -> Self {
        Self {
            chain: self.chain.clone(),
            transformer: self.transformer.clone(),
            context_chain: self.context_chain.append(constructors),
        }
    }

    /// Resolves the context-aware segment around `terminal`, crosses the seam
    /// with the transformer, then resolves the plain segment around that.
    pub fn then(&self, terminal: Option<BoxedContextHandler>) -> BoxedHandler {
        let inner = self.context_chain.then(terminal);
        trace!("crossing context seam");
        let bridged = self.transformer.apply(inner);
        self.chain.then(Some(bridged))
    }

    /// Like [`then`](ToContextChain::then), but takes a plain async function.
    pub fn then_fn<F: IntoEndpoint<BoxedContextHandler>>(&self, f: Option<F>) -> BoxedHandler {
        self.then(f.map(IntoEndpoint::into_endpoint))
    }
}
