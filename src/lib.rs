//! # tsu-chain
//!
//! Immutable, reusable middleware chains for tsu handlers and HTTP
//! transports.
//!
//! ## The contract
//!
//! A [`Chain`] is a list of middleware [`Constructor`]s and [`Endware`]s.
//! Resolving it around a terminal handler produces one handler:
//!
//! - Constructors wrap right to left: `Chain::new([m1, m2, m3]).then(Some(h))`
//!   is `m1(m2(m3(h)))`, so a request meets m1 first and `h` last.
//! - Endwares run after the terminal handler, in the order they were added.
//! - `append`, `extend`, `after` and `append_endware` never modify the chain
//!   they are called on. They return a new one.
//! - An absent terminal resolves to a shared default handler.
//! - Composition never fails and never touches a request by itself.
//!
//! What a chain does *not* do: routing, dispatching to several handlers,
//! or shipping middleware. Bring your own.
//!
//! The same rules hold for outbound round trips ([`TransportChain`]) and for
//! handlers that take an explicit request-scoped [`Context`]
//! ([`ContextChain`], joined to a plain chain with [`Chain::contextualize`]).
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use tsu_chain::{
//!     BoxedHandler, Chain, Constructor, Endware, ErasedHandler, Handler, Request, Response,
//!     Server, ServerConfig,
//! };
//!
//! fn request_id() -> Constructor<BoxedHandler> {
//!     Constructor::new(|next: BoxedHandler| {
//!         (move |mut req: Request| {
//!             req.insert_header("x-request-id", "42");
//!             next.call(req)
//!         })
//!         .into_boxed_handler()
//!     })
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), tsu_chain::Error> {
//!     let access_log = Endware::new(|head, res| {
//!         tracing::info!(path = head.path(), status = %res.status_code(), "served");
//!     });
//!
//!     let app = Chain::new([request_id()])
//!         .after([access_log])
//!         .then_fn(Some(hello));
//!
//!     Server::bind(ServerConfig::default()).await?.serve(app).await
//! }
//!
//! async fn hello(req: Request) -> Response {
//!     Response::text(format!("hello, request {}", req.header("x-request-id").unwrap_or("?")))
//! }
//! ```

mod config;
mod error;
mod request;
mod response;
mod server;

pub mod context;
pub mod handler;
pub mod middleware;
pub mod transport;

pub use bytes::Bytes;
pub use http::{Method, StatusCode};

pub use config::{ServerConfig, ServerConfigBuilder, TransportConfig, TransportConfigBuilder};
pub use context::{BoxedContextHandler, Context, ContextHandler, ErasedContextHandler};
pub use error::Error;
pub use handler::{BoxFuture, BoxedHandler, Endware, ErasedHandler, Handler};
pub use middleware::{
    Chain, Constructor, ContextChain, ContextConstructor, Endpoint, IntoEndpoint,
    ToContextChain, Transformer, TransportChain,
};
pub use request::{Head, Request};
pub use response::{IntoResponse, Response, ResponseBuilder};
pub use server::Server;
pub use transport::{
    BoxedTransport, ErasedTransport, HttpTransport, Transport, TransportEndware, TransportFuture,
};
