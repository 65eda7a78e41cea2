// src/http/server.rs

//! Axum HTTP server: `/healthz` plus exact-path dispatch to calls.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::extract::{ConnectInfo, Request, State};
use axum::http::{Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::any;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::errors::{AutoapplyError, Result};

use super::call::Call;
use super::env::CallRequest;

#[derive(Clone)]
struct ServerState {
    calls: Arc<Vec<Arc<Call>>>,
}

/// Build the router serving `/healthz` and the given calls.
pub fn router(calls: Vec<Arc<Call>>) -> Router {
    let state = ServerState {
        calls: Arc::new(calls),
    };
    Router::new()
        .route("/healthz", any(healthz))
        .fallback(dispatch)
        .with_state(state)
}

async fn healthz(method: Method) -> Response {
    match method {
        Method::GET => (StatusCode::OK, "OK").into_response(),
        Method::HEAD => StatusCode::OK.into_response(),
        _ => (StatusCode::METHOD_NOT_ALLOWED, "Only GET or HEAD supported!").into_response(),
    }
}

async fn dispatch(State(state): State<ServerState>, request: Request) -> Response {
    debug!(method = %request.method(), uri = %request.uri(), "request received");

    let path = request.uri().path();
    let Some(call) = state.calls.iter().find(|c| c.path() == path).cloned() else {
        return (StatusCode::NOT_FOUND, "Not found!").into_response();
    };

    let remote_addr = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let (parts, _body) = request.into_parts();
    let call_request = CallRequest {
        method: parts.method,
        uri: parts.uri,
        headers: parts.headers,
        remote_addr,
    };

    match call.handle(call_request).await {
        Ok(response) => response,
        Err(err) => err.into_response(),
    }
}

/// A running server.
#[derive(Debug)]
pub struct ServerHandle {
    local_addr: SocketAddr,
    shutdown: CancellationToken,
    join: JoinHandle<std::io::Result<()>>,
}

impl ServerHandle {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Stop accepting connections and wait for in-flight requests.
    ///
    /// Failures are logged, never returned.
    pub async fn stop(self) {
        self.shutdown.cancel();
        match self.join.await {
            Ok(Ok(())) => info!("server stopped"),
            Ok(Err(e)) => warn!(error = %e, "could not stop server"),
            Err(e) => warn!(error = %e, "server task failed"),
        }
    }
}

/// Bind `0.0.0.0:<port>` and start serving in a background task.
pub async fn start(port: u16, calls: Vec<Arc<Call>>) -> Result<ServerHandle> {
    debug!("starting server...");
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| AutoapplyError::Server(format!("binding {addr}: {e}")))?;
    let local_addr = listener.local_addr()?;

    let shutdown = CancellationToken::new();
    let app = router(calls).into_make_service_with_connect_info::<SocketAddr>();
    let signal = shutdown.clone().cancelled_owned();
    let join = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(signal)
            .await
    });

    info!(port = local_addr.port(), "server is listening");
    Ok(ServerHandle {
        local_addr,
        shutdown,
        join,
    })
}
