//! Unified error type.

use std::time::Duration;

/// The error type returned by tsu-chain's fallible operations.
///
/// Composing a chain never fails. Application-level errors (404, 422, etc.)
/// are expressed as HTTP [`Response`](crate::Response) values, not as
/// `Error`s. This type surfaces infrastructure failures: binding a port,
/// serving a connection, or performing an outbound round trip.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    /// Building an `http` request or response failed. Lets transports and
    /// transport middleware use `?` on the `http` builders.
    #[error("http: {0}")]
    Http(#[from] http::Error),

    #[error("hyper: {0}")]
    Hyper(#[from] hyper::Error),

    #[error("transport: {0}")]
    Transport(#[from] hyper_util::client::legacy::Error),

    #[error("round trip timed out after {0:?}")]
    Timeout(Duration),
}
