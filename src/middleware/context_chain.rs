//! Chains of context-aware middleware.

use std::fmt;

use tracing::trace;

use super::{Constructor, IntoEndpoint, compose};
use crate::context::{self, BoxedContextHandler};

/// Middleware for context-aware handlers.
pub type ContextConstructor = Constructor<BoxedContextHandler>;

/// A chain of [`ContextConstructor`]s.
///
/// Behaves like [`Chain`](crate::Chain), except that every handler also
/// receives a [`Context`](crate::Context). Context chains have no endwares.
#[derive(Clone, Default)]
pub struct ContextChain {
    pub(super) constructors: Vec<ContextConstructor>,
}

impl ContextChain {
    /// Creates a chain holding a copy of `constructors`, in order.
    pub fn new(constructors: impl IntoIterator<Item = ContextConstructor>) -> Self {
        Self { constructors: constructors.into_iter().collect() }
    }

    /// Returns a new chain with `constructors` added after the existing ones.
    pub fn append(&self, constructors: impl IntoIterator<Item = ContextConstructor>) -> Self {
        Self::new(self.constructors.iter().cloned().chain(constructors))
    }

    /// Wraps the chain around `terminal`, first constructor outermost.
    ///
    /// `None` resolves to [`context::fallback`], which drops the context and
    /// answers like [`handler::fallback`](crate::handler::fallback).
    pub fn then(&self, terminal: Option<BoxedContextHandler>) -> BoxedContextHandler {
        trace!(
            constructors = self.constructors.len(),
            fallback = terminal.is_none(),
            "resolving context chain"
        );

        let terminal = terminal.unwrap_or_else(context::fallback);
        compose(terminal, &self.constructors)
    }

    /// Like [`then`](ContextChain::then), but takes a plain async function.
    pub fn then_fn<F: IntoEndpoint<BoxedContextHandler>>(
        &self,
        f: Option<F>,
    ) -> BoxedContextHandler {
        self.then(f.map(IntoEndpoint::into_endpoint))
    }

    pub fn constructor_count(&self) -> usize {
        self.constructors.len()
    }
}

impl fmt::Debug for ContextChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContextChain")
            .field("constructors", &self.constructors.len())
            .finish()
    }
}
