//! HTTP server and graceful shutdown.
//!
//! The server takes one [`BoxedHandler`], typically the result of resolving
//! a [`Chain`](crate::Chain), and calls it for every request.
//!
//! # Graceful shutdown and Kubernetes
//!
//! When Kubernetes terminates a pod it sends **SIGTERM** and waits
//! `terminationGracePeriodSeconds` (default 30 s) before sending SIGKILL.
//!
//! The server reacts by:
//! 1. Immediately stopping `listener.accept()`: no new connections are made.
//! 2. Telling every open connection to shut down gracefully. Idle keep-alive
//!    connections close right away; busy ones finish their in-flight request
//!    first, for at most [`ServerConfig::drain_timeout`].
//! 3. Aborting whatever is left and returning from [`Server::serve`].

use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use http::StatusCode;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::service::service_fn;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as ConnBuilder;
use hyper_util::server::graceful::GracefulShutdown;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

use crate::config::ServerConfig;
use crate::error::Error;
use crate::handler::{BoxedHandler, ErasedHandler};
use crate::request::Request;
use crate::response::Response;

/// The HTTP server.
pub struct Server {
    listener: TcpListener,
    config: ServerConfig,
}

impl Server {
    /// Binds the listener to [`ServerConfig::addr`].
    ///
    /// Port `0` picks a free port; read it back with
    /// [`local_addr`](Server::local_addr).
    pub async fn bind(config: ServerConfig) -> Result<Self, Error> {
        let listener = TcpListener::bind(config.addr).await?;
        Ok(Self { listener, config })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, Error> {
        Ok(self.listener.local_addr()?)
    }

    /// Serves `handler` until SIGTERM or Ctrl-C, then drains.
    pub async fn serve(self, handler: BoxedHandler) -> Result<(), Error> {
        self.serve_with_shutdown(handler, shutdown_signal()).await
    }

    /// Serves `handler` until `signal` resolves, then drains.
    pub async fn serve_with_shutdown<S>(self, handler: BoxedHandler, signal: S) -> Result<(), Error>
    where
        S: Future<Output = ()>,
    {
        let addr = self.local_addr()?;
        info!(%addr, "tsu listening");

        // JoinSet tracks every spawned connection task so we can wait for
        // them during graceful shutdown.
        let mut tasks = tokio::task::JoinSet::new();
        let graceful = GracefulShutdown::new();
        let builder = ConnBuilder::new(TokioExecutor::new());

        tokio::pin!(signal);

        loop {
            tokio::select! {
                // Check shutdown first so a signal immediately stops
                // accepting, even if more connections are queued.
                biased;

                () = &mut signal => {
                    info!(in_flight = tasks.len(), "shutdown signal received, draining connections");
                    break;
                }

                res = self.listener.accept() => {
                    let (stream, remote_addr) = match res {
                        Ok(v) => v,
                        Err(e) => {
                            error!("accept error: {e}");
                            continue;
                        }
                    };

                    let handler = Arc::clone(&handler);
                    let io = TokioIo::new(stream);

                    // Called once per request on the connection, not once
                    // per connection.
                    let svc = service_fn(move |req| dispatch(Arc::clone(&handler), req));
                    let conn = graceful.watch(builder.serve_connection(io, svc).into_owned());

                    tasks.spawn(async move {
                        if let Err(e) = conn.await {
                            error!(peer = %remote_addr, "connection error: {e}");
                        }
                    });
                }

                // Reap finished connection tasks so the JoinSet does not grow
                // without bound on long-running servers.
                Some(_) = tasks.join_next(), if !tasks.is_empty() => {}
            }
        }

        let drained = tokio::time::timeout(self.config.drain_timeout, async {
            graceful.shutdown().await;
            while tasks.join_next().await.is_some() {}
        })
        .await;

        if drained.is_err() {
            warn!(
                remaining = tasks.len(),
                timeout = ?self.config.drain_timeout,
                "drain timeout elapsed, aborting connections"
            );
            tasks.abort_all();
        }

        info!("tsu stopped");
        Ok(())
    }
}

// ── Request dispatch ──────────────────────────────────────────────────────────

/// Core hot path: turns one hyper request into a [`Request`], runs the
/// handler, and encodes its [`Response`].
///
/// The error type is [`Infallible`]: failures become 400 / 500 responses so
/// hyper never sees an error.
async fn dispatch(
    handler: BoxedHandler,
    req: hyper::Request<Incoming>,
) -> Result<http::Response<Full<Bytes>>, Infallible> {
    let response = match read_request(req).await {
        Ok(req) => handler.call(req).await,
        Err(e) => {
            warn!("failed to read request body: {e}");
            Response::status(StatusCode::BAD_REQUEST)
        }
    };

    Ok(encode(response))
}

async fn read_request(req: hyper::Request<Incoming>) -> Result<Request, hyper::Error> {
    let (parts, body) = req.into_parts();
    let body = body.collect().await?.to_bytes();

    // Headers that are not visible ASCII are dropped rather than mangled.
    let headers = parts.headers.iter()
        .filter_map(|(name, value)| {
            value.to_str().ok().map(|v| (name.as_str().to_owned(), v.to_owned()))
        })
        .collect();

    Ok(Request {
        method: parts.method,
        path: parts.uri.path().to_owned(),
        query: parts.uri.query().map(str::to_owned),
        headers,
        body: body.to_vec(),
    })
}

fn encode(response: Response) -> http::Response<Full<Bytes>> {
    response.into_http().unwrap_or_else(|e| {
        error!("handler produced an invalid response: {e}");
        let mut res = http::Response::new(Full::default());
        *res.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
        res
    })
}

// ── Shutdown signal ───────────────────────────────────────────────────────────

/// Resolves on the first shutdown signal the process receives.
///
/// On Unix this listens for both **SIGTERM** and **SIGINT** (Ctrl-C).
/// On Windows only Ctrl-C is available. A signal that cannot be installed is
/// logged and never fires.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("failed to install Ctrl-C handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let sigterm = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let sigterm = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c   => {}
        () = sigterm  => {}
    }
}
