//! Outbound round trips.
//!
//! The client-side counterpart of [`handler`](crate::handler): a transport
//! takes an `http::Request<Bytes>` and eventually yields an
//! `http::Response<Bytes>` or an [`Error`]. A [`TransportChain`] wraps
//! cross-cutting concerns (auth headers, retries, tracing) around one, the
//! same way a [`Chain`](crate::Chain) wraps a handler.
//!
//! [`TransportChain`]: crate::TransportChain

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, LazyLock};
use std::time::{Duration, Instant};

use bytes::Bytes;
use http::request::Parts;
use http_body_util::{BodyExt, Full};
use hyper_util::client::legacy::Client;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::rt::{TokioExecutor, TokioTimer};
use tracing::debug;

use crate::config::TransportConfig;
use crate::error::Error;
use crate::middleware::{Endpoint, IntoEndpoint};

/// A heap-allocated, type-erased future resolving to the round-trip result.
pub type TransportFuture =
    Pin<Box<dyn Future<Output = Result<http::Response<Bytes>, Error>> + Send + 'static>>;

/// Dispatch interface of every transport in a chain.
pub trait ErasedTransport {
    fn round_trip(&self, req: http::Request<Bytes>) -> TransportFuture;
}

/// A heap-allocated, type-erased transport shared across concurrent requests.
pub type BoxedTransport = Arc<dyn ErasedTransport + Send + Sync + 'static>;

// ── Public Transport trait ────────────────────────────────────────────────────

/// Implemented for every function with the signature:
///
/// ```text
/// async fn name(req: http::Request<Bytes>) -> Result<http::Response<Bytes>, Error>
/// ```
///
/// Sealed, like [`Handler`](crate::Handler).
pub trait Transport: private::Sealed + Send + Sync + 'static {
    fn into_boxed_transport(self) -> BoxedTransport;
}

mod private {
    pub trait Sealed {}
}

impl<F, Fut> private::Sealed for F
where
    F: Fn(http::Request<Bytes>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<http::Response<Bytes>, Error>> + Send + 'static,
{
}

impl<F, Fut> Transport for F
where
    F: Fn(http::Request<Bytes>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<http::Response<Bytes>, Error>> + Send + 'static,
{
    fn into_boxed_transport(self) -> BoxedTransport {
        Arc::new(FnTransport(self))
    }
}

impl<F: Transport> IntoEndpoint<BoxedTransport> for F {
    fn into_endpoint(self) -> BoxedTransport {
        self.into_boxed_transport()
    }
}

struct FnTransport<F>(F);

impl<F, Fut> ErasedTransport for FnTransport<F>
where
    F: Fn(http::Request<Bytes>) -> Fut + Send + Sync,
    Fut: Future<Output = Result<http::Response<Bytes>, Error>> + Send + 'static,
{
    fn round_trip(&self, req: http::Request<Bytes>) -> TransportFuture {
        Box::pin((self.0)(req))
    }
}

// ── HttpTransport ─────────────────────────────────────────────────────────────

/// Plain-HTTP transport over a pooled hyper-util client.
///
/// Response bodies are collected in full before the round trip resolves.
#[derive(Clone)]
pub struct HttpTransport {
    client: Client<HttpConnector, Full<Bytes>>,
    timeout: Duration,
}

impl HttpTransport {
    pub fn new(config: &TransportConfig) -> Self {
        let client = Client::builder(TokioExecutor::new())
            .pool_timer(TokioTimer::new())
            .pool_idle_timeout(config.pool_idle_timeout)
            .pool_max_idle_per_host(config.pool_max_idle_per_host)
            .build_http();

        Self { client, timeout: config.timeout }
    }
}

impl ErasedTransport for HttpTransport {
    fn round_trip(&self, req: http::Request<Bytes>) -> TransportFuture {
        let client = self.client.clone();
        let timeout = self.timeout;

        Box::pin(async move {
            let started = Instant::now();
            let method = req.method().clone();
            let uri = req.uri().clone();

            let (parts, body) = req.into_parts();
            let pending = client.request(http::Request::from_parts(parts, Full::new(body)));
            let res = tokio::time::timeout(timeout, pending)
                .await
                .map_err(|_| Error::Timeout(timeout))??;

            let (parts, body) = res.into_parts();
            let body = body.collect().await?.to_bytes();

            debug!(
                %method,
                %uri,
                status = parts.status.as_u16(),
                elapsed = ?started.elapsed(),
                "round trip"
            );
            Ok(http::Response::from_parts(parts, body))
        })
    }
}

static DEFAULT_TRANSPORT: LazyLock<BoxedTransport> = LazyLock::new(default_http);

fn default_http() -> BoxedTransport {
    Arc::new(HttpTransport::new(&TransportConfig::default()))
}

/// The process-wide default transport: an [`HttpTransport`] with
/// [`TransportConfig::default`].
///
/// Transport chains resolve an absent terminal to this. Every call returns
/// the same instance.
pub fn default_transport() -> BoxedTransport {
    Arc::clone(&DEFAULT_TRANSPORT)
}

// ── Endware ───────────────────────────────────────────────────────────────────

/// Runs after a round trip completes, successfully or not.
///
/// Observes the request parts and the result; cannot change either.
#[derive(Clone)]
pub struct TransportEndware(
    Arc<dyn Fn(&Parts, Result<&http::Response<Bytes>, &Error>) + Send + Sync>,
);

impl TransportEndware {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&Parts, Result<&http::Response<Bytes>, &Error>) + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    pub fn call(&self, parts: &Parts, result: Result<&http::Response<Bytes>, &Error>) {
        (self.0)(parts, result)
    }
}

struct EndwareTransport {
    transport: BoxedTransport,
    endwares: Arc<[TransportEndware]>,
}

impl ErasedTransport for EndwareTransport {
    fn round_trip(&self, req: http::Request<Bytes>) -> TransportFuture {
        let (parts, body) = req.into_parts();
        let seen = parts.clone();
        let inner = self.transport.round_trip(http::Request::from_parts(parts, body));
        let endwares = Arc::clone(&self.endwares);

        Box::pin(async move {
            let result = inner.await;
            for endware in endwares.iter() {
                endware.call(&seen, result.as_ref());
            }
            result
        })
    }
}

impl Endpoint for BoxedTransport {
    type Endware = TransportEndware;

    fn fallback() -> Self {
        default_transport()
    }

    fn followed_by(self, endwares: Vec<TransportEndware>) -> Self {
        Arc::new(EndwareTransport { transport: self, endwares: endwares.into() })
    }
}
