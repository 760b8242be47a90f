//! The immutable middleware chain.

use std::fmt;

use tracing::trace;

use super::{Constructor, Endpoint, IntoEndpoint, compose};
use crate::handler::BoxedHandler;
use crate::transport::BoxedTransport;

/// A chain of outbound [`Constructor`]s around a [`BoxedTransport`].
pub type TransportChain = Chain<BoxedTransport>;

/// An ordered list of constructors and endwares.
///
/// A chain is effectively immutable: once created, it always holds the same
/// constructors and endwares in the same order. Every method that adds to it
/// returns a new chain with its own copy of both lists.
///
/// Constructors are only called when the chain is resolved with
/// [`then`](Chain::then), once per resolution.
pub struct Chain<E: Endpoint = BoxedHandler> {
    pub(super) constructors: Vec<Constructor<E>>,
    pub(super) endwares: Vec<E::Endware>,
}

impl<E: Endpoint> Chain<E> {
    /// Creates a chain holding a copy of `constructors`, in order.
    pub fn new(constructors: impl IntoIterator<Item = Constructor<E>>) -> Self {
        Self {
            constructors: constructors.into_iter().collect(),
            endwares: Vec::new(),
        }
    }

    /// Wraps the chain around `terminal` and returns the result.
    ///
    /// ```text
    /// Chain::new([m1, m2, m3]).after([e1, e2, e3]).then(Some(h))
    /// ```
    ///
    /// is equivalent to `m1(m2(m3(h)))` followed by `e1`, `e2`, `e3`: a
    /// request passes through m1, m2, m3, then reaches `h`, and once `h` is
    /// done the endwares run in order (assuming every middleware calls the
    /// next one).
    ///
    /// A chain can be resolved any number of times:
    ///
    /// ```text
    /// let std_stack = Chain::new([rate_limit, csrf]).after([access_log]);
    /// let index = std_stack.then(Some(index_handler));
    /// let auth = std_stack.then(Some(auth_handler));
    /// ```
    ///
    /// Each resolution calls every constructor again, so `index` and `auth`
    /// get separate middleware instances.
    ///
    /// `None` resolves to [`Endpoint::fallback`].
    pub fn then(&self, terminal: Option<E>) -> E {
        trace!(
            constructors = self.constructors.len(),
            endwares = self.endwares.len(),
            fallback = terminal.is_none(),
            "resolving chain"
        );

        let mut terminal = terminal.unwrap_or_else(E::fallback);
        if !self.endwares.is_empty() {
            terminal = terminal.followed_by(self.endwares.clone());
        }

        compose(terminal, &self.constructors)
    }

    /// Like [`then`](Chain::then), but takes a plain async function.
    ///
    /// `c.then_fn(Some(f))` is `c.then(Some(f.into_endpoint()))` and
    /// `c.then_fn(None::<F>)` is `c.then(None)`.
    pub fn then_fn<F: IntoEndpoint<E>>(&self, f: Option<F>) -> E {
        self.then(f.map(IntoEndpoint::into_endpoint))
    }

    /// Returns a new chain with `constructors` added after the existing ones,
    /// i.e. closest to the terminal. Endwares are carried over.
    ///
    /// ```text
    /// let std_chain = Chain::new([m1, m2]);
    /// let ext_chain = std_chain.append([m3, m4]);
    /// // requests in std_chain go m1 -> m2
    /// // requests in ext_chain go m1 -> m2 -> m3 -> m4
    /// ```
    pub fn append(&self, constructors: impl IntoIterator<Item = Constructor<E>>) -> Self {
        let constructors = self.constructors.iter().cloned().chain(constructors);
        Self::new(constructors).append_endware(self.endwares.iter().cloned())
    }

    /// Returns a new chain running `other` after `self`: its constructors
    /// after ours, its endwares after ours.
    ///
    /// ```text
    /// let std_chain  = Chain::new([m1, m2]);
    /// let ext1_chain = Chain::new([m3, m4]).after([e1, e2]);
    /// let ext2_chain = std_chain.extend(&ext1_chain);
    /// // requests in ext2_chain go m1 -> m2 -> m3 -> m4 -> handler -> e1 -> e2
    /// ```
    pub fn extend(&self, other: &Self) -> Self {
        self.append(other.constructors.iter().cloned())
            .append_endware(other.endwares.iter().cloned())
    }

    /// Returns a new chain with the same constructors and `endwares` added
    /// after the existing endwares.
    ///
    /// Endwares run after both the constructors and the terminal handler.
    pub fn after(&self, endwares: impl IntoIterator<Item = E::Endware>) -> Self {
        let endwares = self.endwares.iter().cloned().chain(endwares).collect();
        Self {
            constructors: self.constructors.clone(),
            endwares,
        }
    }

    /// Returns a new chain with `endwares` added as the last ones to run.
    ///
    /// ```text
    /// let std_chain = Chain::new([m1]).after([e1, e2]);
    /// let ext_chain = std_chain.append_endware([e3, e4]);
    /// // requests in ext_chain go m1 -> handler -> e1 -> e2 -> e3 -> e4
    /// ```
    pub fn append_endware(&self, endwares: impl IntoIterator<Item = E::Endware>) -> Self {
        Self::new(self.constructors.iter().cloned())
            .after(self.endwares.iter().cloned().chain(endwares))
    }

    pub fn constructor_count(&self) -> usize {
        self.constructors.len()
    }

    pub fn endware_count(&self) -> usize {
        self.endwares.len()
    }
}

impl<E: Endpoint> Clone for Chain<E> {
    fn clone(&self) -> Self {
        Self {
            constructors: self.constructors.clone(),
            endwares: self.endwares.clone(),
        }
    }
}

impl<E: Endpoint> Default for Chain<E> {
    fn default() -> Self {
        Self::new([])
    }
}

impl<E: Endpoint> fmt::Debug for Chain<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Chain")
            .field("constructors", &self.constructors.len())
            .field("endwares", &self.endwares.len())
            .finish()
    }
}
