// src/http/call.rs

//! HTTP-triggered command batches.

use std::convert::Infallible;
use std::path::PathBuf;
use std::sync::Arc;

use axum::body::Body;
use axum::http::header::WWW_AUTHENTICATE;
use axum::http::{HeaderName, HeaderValue, Method, StatusCode, response::Builder};
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use tokio::sync::mpsc;
use tracing::{Instrument, debug, error, info_span, warn};

use crate::config::CallConfig;
use crate::errors::{AutoapplyError, Result};
use crate::exec::{Batch, BufferSink, ChannelSink};

use super::auth::Authentication;
use super::env::{CallRequest, request_env};

/// Header carrying the exit code of a failed buffered call.
pub const EXIT_CODE_HEADER: &str = "x-exit-code";

/// A batch bound to an HTTP path.
#[derive(Debug)]
pub struct Call {
    path: String,
    methods: Vec<Method>,
    headers: Vec<(HeaderName, HeaderValue)>,
    authentication: Option<Authentication>,
    stream: bool,
    cwd: PathBuf,
    batch: Batch,
}

/// Failure while producing a call's response.
#[derive(Debug, thiserror::Error)]
pub enum CallError {
    #[error("building response: {0}")]
    Response(#[from] axum::http::Error),

    #[error("call task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl IntoResponse for CallError {
    fn into_response(self) -> Response {
        error!(error = %self, "error handling request");
        (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response()
    }
}

impl Call {
    pub fn from_config(cfg: &CallConfig) -> Result<Self> {
        let batch = Batch::new(
            format!("Call {}", cfg.path),
            cfg.commands.clone(),
            cfg.on_error,
        )
        .map_err(AutoapplyError::ConfigError)?;

        Ok(Self {
            path: cfg.path.clone(),
            methods: cfg.methods.clone(),
            headers: cfg.headers.clone(),
            authentication: cfg.authentication.clone(),
            stream: cfg.stream,
            cwd: cfg.cwd.clone(),
            batch,
        })
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn is_streaming(&self) -> bool {
        self.stream
    }

    pub fn accepts(&self, method: &Method) -> bool {
        self.methods.is_empty() || self.methods.contains(method)
    }

    /// Handle one request for this call's path.
    ///
    /// Requests are independent: each gets its own environment and sink, so
    /// concurrent calls share nothing but this read-only configuration.
    pub async fn handle(
        self: Arc<Self>,
        request: CallRequest,
    ) -> std::result::Result<Response, CallError> {
        let username = match &self.authentication {
            None => None,
            Some(auth) => match auth.authenticate(&request.headers) {
                Some(user) => Some(user.to_string()),
                None => {
                    debug!(path = %self.path, "rejecting unauthenticated request");
                    return Ok(Response::builder()
                        .status(StatusCode::UNAUTHORIZED)
                        .header(WWW_AUTHENTICATE, Authentication::challenge())
                        .body(Body::from("Unauthorized"))?);
                }
            },
        };

        if !self.accepts(&request.method) {
            return Ok(Response::builder()
                .status(StatusCode::METHOD_NOT_ALLOWED)
                .body(Body::from(format!("Unsupported method: {}", request.method)))?);
        }

        let env = request_env(&request, username.as_deref());

        if self.stream {
            self.respond_streaming(env)
        } else {
            self.respond_buffered(env).await
        }
    }

    fn response_builder(&self) -> Builder {
        self.headers
            .iter()
            .fold(Response::builder(), |builder, (name, value)| {
                builder.header(name, value)
            })
    }

    /// Send 200 right away and forward output chunks as they are produced.
    ///
    /// A failure after this point can only truncate the body; the status line
    /// is already on its way to the client.
    fn respond_streaming(
        self: Arc<Self>,
        env: crate::exec::Env,
    ) -> std::result::Result<Response, CallError> {
        let (tx, rx) = mpsc::unbounded_channel::<Bytes>();
        let sink = ChannelSink::new(tx);

        let this = Arc::clone(&self);
        let span = info_span!("call", path = %self.path);
        tokio::spawn(
            async move {
                if let Err(err) = this.batch.run(&this.cwd, &env, &sink).await {
                    warn!(error = %err, "streaming call failed; response truncated");
                }
            }
            .instrument(span),
        );

        let body = futures_util::stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|chunk| (Ok::<_, Infallible>(chunk), rx))
        });

        Ok(self
            .response_builder()
            .status(StatusCode::OK)
            .body(Body::from_stream(body))?)
    }

    /// Run to completion, then answer 200 with the output or 500 with
    /// whatever was produced before the failure.
    ///
    /// The batch runs in its own task so a client hanging up cannot cut it
    /// short.
    async fn respond_buffered(
        self: Arc<Self>,
        env: crate::exec::Env,
    ) -> std::result::Result<Response, CallError> {
        let this = Arc::clone(&self);
        let span = info_span!("call", path = %self.path);
        let (result, body) = tokio::spawn(
            async move {
                let sink = BufferSink::new();
                let result = this.batch.run(&this.cwd, &env, &sink).await;
                (result, sink.into_bytes())
            }
            .instrument(span),
        )
        .await?;

        match result {
            Ok(_) => Ok(self
                .response_builder()
                .status(StatusCode::OK)
                .body(Body::from(body))?),
            Err(err) => {
                debug!(path = %self.path, error = %err, "call failed");
                let mut builder = self
                    .response_builder()
                    .status(StatusCode::INTERNAL_SERVER_ERROR);
                if let Some(code) = err.exit_code() {
                    builder = builder.header(EXIT_CODE_HEADER, code);
                }
                Ok(builder.body(Body::from(body))?)
            }
        }
    }
}
