// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! HTTP server implementation for Esix.
//!
//! The server is a *thin* wrapper around **hyper-util**.  It owns the
//! listening socket and translates between Hyper's types and the internal
//! [`ProxyRequest`] / [`ProxyResponse`] that the engine uses.  There is a
//! single catch-all route: any inbound path and method is proxied through
//! the fetch → parse → resolve → render pipeline.
//!
//! **Protocol support**
//! Uses `hyper_util::server::conn::auto::Builder`, so the same connection
//! transparently handles both HTTP/1.1 *and* HTTP/2.


use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::service::service_fn;
use hyper::{Request, Response};
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as AutoBuilder;
use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};
use tokio::signal;
use tokio::task::JoinSet;

use crate::core::{ProxyError, ProxyRequest, ProxyResponse};
use crate::engine::EsiEngine;

#[cfg(unix)]
use tokio::signal::unix::{signal, SignalKind};

/// Configuration for the HTTP server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// HTTP server for the proxy.
#[derive(Debug, Clone)]
pub struct ProxyServer {
    /// Server configuration
    config: ServerConfig,
    /// Resolution engine shared by all connections
    engine: Arc<EsiEngine>,
}

impl ProxyServer {
    /// Create a new proxy server with the given configuration and engine.
    pub fn new(config: ServerConfig, engine: Arc<EsiEngine>) -> Self {
        Self { config, engine }
    }

    /// Start the proxy server and serve until interrupted.
    pub async fn start(&self) -> Result<(), ProxyError> {
        let addr = format!("{}:{}", self.config.host, self.config.port)
            .parse::<SocketAddr>()
            .map_err(|e| ProxyError::Other(format!("Invalid server address: {e}")))?;

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| ProxyError::Other(format!("Failed to bind: {e}")))?;

        info!("Esix proxy listening on http://{addr}");

        // prepare signal futures (no errors at creation)
        let ctrl_c = signal::ctrl_c();

        #[cfg(unix)]
        let mut term_stream = signal(SignalKind::terminate())
            .map_err(|e| ProxyError::Other(format!("Cannot install SIGTERM handler: {e}")))?;

        #[cfg(unix)]
        let sigterm = term_stream.recv();
        #[cfg(not(unix))]
        let sigterm = std::future::pending();

        tokio::pin!(ctrl_c);
        tokio::pin!(sigterm);

        // Track spawned connection tasks
        let mut connections = JoinSet::new();
        let engine = self.engine.clone();

        loop {
            tokio::select! {
                _ = &mut ctrl_c => {
                    info!("Received Ctrl-C; initiating graceful shutdown");
                    break;
                }
                _ = &mut sigterm => {
                    info!("Received SIGTERM; initiating graceful shutdown");
                    break;
                }
                accept = listener.accept() => {
                    match accept {
                        Ok((stream, remote_addr)) => {
                            let engine = engine.clone();
                            let client_ip = remote_addr.ip().to_string();

                            connections.spawn(async move {
                                let service = service_fn(move |req: Request<Incoming>| {
                                    debug!("Incoming over {:?}", &req.version());
                                    handle_request(req, engine.clone(), client_ip.clone())
                                });

                                let io = TokioIo::new(stream);
                                let builder = {
                                    let mut b = AutoBuilder::new(TokioExecutor::new());
                                    b.http1();
                                    b.http2();
                                    b
                                };

                                if let Err(e) = builder.serve_connection(io, service).await {
                                    let message = e.to_string();
                                    if !message.contains("connection closed")
                                        && !message.contains("connection reset")
                                    {
                                        error!("Connection error: {message}");
                                    }
                                }
                            });
                        }
                        Err(e) => error!("Accept error: {e}"),
                    }
                }
            }
        }

        // Stop accepting and drain in-flight connections
        info!("Shutting down; waiting for {} connection(s)", connections.len());

        let shutdown_timeout = tokio::time::Duration::from_secs(30);
        let drain = async {
            while let Some(joined) = connections.join_next().await {
                match joined {
                    Ok(()) => debug!("Connection task completed"),
                    Err(e) if e.is_cancelled() => debug!("Connection task cancelled"),
                    Err(e) => error!("Connection task failed: {e}"),
                }
            }
        };

        if tokio::time::timeout(shutdown_timeout, drain).await.is_err() {
            warn!(
                "Shutdown timed out after {} seconds, aborting remaining connections",
                shutdown_timeout.as_secs()
            );
        }

        info!("Shutdown complete");
        Ok(())
    }
}

/// Convert a hyper request to a proxy request.
///
/// Inbound bodies are not forwarded – the proxy serves documents, and the
/// origin fetch replays method, path, query and headers only.
fn convert_hyper_request(req: Request<Incoming>, client_ip: String) -> ProxyRequest {
    let method = req.method().clone();
    let uri = req.uri().clone();
    let path = uri.path().to_owned();
    let query = uri.query().map(|q| q.to_owned());
    let headers = req.headers().clone();

    log::trace!(
        "Converting request: {method} {path} with {} headers",
        headers.len()
    );

    ProxyRequest {
        method,
        path,
        query,
        headers,
        client_ip: Some(client_ip),
    }
}

/// Convert a proxy response to a hyper response.
fn convert_proxy_response(resp: ProxyResponse) -> Result<Response<Full<Bytes>>, ProxyError> {
    log::trace!(
        "Converting response with status {} and {} headers",
        resp.status,
        resp.headers.len()
    );

    let mut builder = Response::builder().status(resp.status);
    let headers = builder.headers_mut().ok_or_else(|| {
        ProxyError::Other("Failed to build response: unable to get mutable headers".into())
    })?;
    *headers = resp.headers;

    builder
        .body(Full::new(Bytes::from(resp.body)))
        .map_err(|e| ProxyError::Other(e.to_string()))
}

/// Handle an incoming HTTP request.
async fn handle_request(
    req: Request<Incoming>,
    engine: Arc<EsiEngine>,
    client_ip: String,
) -> Result<Response<Full<Bytes>>, Infallible> {
    let method = req.method().clone();
    let path = req.uri().path().to_owned();

    log::debug!("Received request: {method} {path}");

    let proxy_req = convert_hyper_request(req, client_ip);

    match engine.process_request(proxy_req).await {
        Ok(proxy_resp) => {
            log::debug!(
                "Successfully processed request {method} {path} -> {}",
                proxy_resp.status
            );
            match convert_proxy_response(proxy_resp) {
                Ok(resp) => Ok(resp),
                Err(e) => {
                    log::error!("Failed to convert response for {method} {path}: {e}");
                    Ok(error_response(500, "Internal Server Error"))
                }
            }
        }
        Err(e) => {
            let (status, message) = match &e {
                ProxyError::Timeout(d) => {
                    log::warn!("Request {method} {path} timed out after {d:?}");
                    (504, format!("Gateway Timeout after {d:?}"))
                }
                ProxyError::ClientError(err) => {
                    log::error!("Origin fetch failed for {method} {path}: {err}");
                    (502, "Bad Gateway".into())
                }
                ProxyError::ResolverError(msg) => {
                    log::warn!("Resolver error for {method} {path}: {msg}");
                    (502, "Bad Gateway".into())
                }
                _ => {
                    log::error!("Internal error processing {method} {path}: {e}");
                    (500, "Internal Server Error".into())
                }
            };

            Ok(error_response(status, &message))
        }
    }
}

fn error_response(status: u16, message: &str) -> Response<Full<Bytes>> {
    // Builder only fails on invalid parts, which these are not
    Response::builder()
        .status(status)
        .body(Full::new(Bytes::from(message.to_owned())))
        .unwrap_or_else(|_| {
            let mut resp = Response::new(Full::new(Bytes::from_static(b"Internal Server Error")));
            *resp.status_mut() = hyper::StatusCode::INTERNAL_SERVER_ERROR;
            resp
        })
}
