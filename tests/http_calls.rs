// tests/http_calls.rs
#![cfg(unix)]

mod common;
use crate::common::builders::{CallBuilder, ConfigFileBuilder};
use crate::common::{TestResult, init_tracing, with_timeout};

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::body::Body;
use axum::http::header::{AUTHORIZATION, WWW_AUTHENTICATE};
use axum::http::{Request, StatusCode};
use axum::Router;
use futures_util::StreamExt as _;
use tower::ServiceExt as _;

use autoapply::http::{Call, router};

fn app(calls: Vec<autoapply::config::RawCall>) -> Router {
    let cfg = calls
        .into_iter()
        .fold(ConfigFileBuilder::new(), |b, c| b.with_call(c))
        .build();
    let calls = cfg
        .calls
        .iter()
        .map(|c| Call::from_config(c).map(Arc::new))
        .collect::<Result<Vec<_>, _>>()
        .unwrap();
    router(calls)
}

async fn body_text(response: axum::response::Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8_lossy(&bytes).into_owned()
}

#[tokio::test]
async fn test_missing_credentials_get_a_challenge() -> TestResult {
    init_tracing();
    let app = app(vec![
        CallBuilder::new("/secure", "echo \"user=$REQUEST_USERNAME\"")
            .user("admin", "s3cret")
            .build(),
    ]);

    let response = app
        .clone()
        .oneshot(Request::get("/secure").body(Body::empty())?)
        .await?;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        response.headers()[WWW_AUTHENTICATE],
        "Basic realm=\"autoapply\""
    );
    assert_eq!(body_text(response).await, "Unauthorized");

    let wrong = app
        .clone()
        .oneshot(
            Request::get("/secure")
                .header(AUTHORIZATION, "Basic YWRtaW46d3Jvbmc=")
                .body(Body::empty())?,
        )
        .await?;
    assert_eq!(wrong.status(), StatusCode::UNAUTHORIZED);

    // base64("admin:s3cret")
    let ok = app
        .oneshot(
            Request::get("/secure")
                .header(AUTHORIZATION, "basic YWRtaW46czNjcmV0")
                .body(Body::empty())?,
        )
        .await?;
    assert_eq!(ok.status(), StatusCode::OK);
    assert_eq!(body_text(ok).await, "user=admin\n");
    Ok(())
}

#[tokio::test]
async fn test_auth_is_checked_before_the_method() -> TestResult {
    let app = app(vec![
        CallBuilder::new("/secure", "true")
            .user("admin", "s3cret")
            .build(),
    ]);
    let response = app
        .oneshot(Request::post("/secure").body(Body::empty())?)
        .await?;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn test_method_filter() -> TestResult {
    let app = app(vec![
        CallBuilder::new("/deploy", "echo deployed")
            .methods(&["post", "PUT"])
            .build(),
    ]);

    let rejected = app
        .clone()
        .oneshot(Request::get("/deploy").body(Body::empty())?)
        .await?;
    assert_eq!(rejected.status(), StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(body_text(rejected).await, "Unsupported method: GET");

    let accepted = app
        .oneshot(Request::post("/deploy").body(Body::empty())?)
        .await?;
    assert_eq!(accepted.status(), StatusCode::OK);
    assert_eq!(body_text(accepted).await, "deployed\n");
    Ok(())
}

#[tokio::test]
async fn test_buffered_and_streamed_responses() -> TestResult {
    init_tracing();
    let app = app(vec![
        CallBuilder::new("/buffered", "echo first")
            .command("exit 4")
            .build(),
        CallBuilder::new("/streamed", "echo first")
            .command("exit 4")
            .stream(true)
            .build(),
    ]);

    let buffered = app
        .clone()
        .oneshot(Request::get("/buffered").body(Body::empty())?)
        .await?;
    assert_eq!(buffered.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(buffered.headers()["x-exit-code"], "4");
    assert_eq!(body_text(buffered).await, "first\n");

    // Streaming has committed to 200 before the failure happens.
    let streamed = app
        .oneshot(Request::get("/streamed").body(Body::empty())?)
        .await?;
    assert_eq!(streamed.status(), StatusCode::OK);
    assert!(streamed.headers().get("x-exit-code").is_none());
    assert_eq!(body_text(streamed).await, "first\n");
    Ok(())
}

#[tokio::test]
async fn test_streamed_output_arrives_as_produced() -> TestResult {
    init_tracing();
    let app = app(vec![
        CallBuilder::new("/progress", "echo a; sleep 1; echo b")
            .stream(true)
            .build(),
    ]);

    let started = Instant::now();
    let response = app
        .oneshot(Request::get("/progress").body(Body::empty())?)
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(
        started.elapsed() < Duration::from_millis(500),
        "head took {:?}",
        started.elapsed()
    );

    let mut chunks = response.into_body().into_data_stream();
    let first = with_timeout(chunks.next()).await.unwrap()?;
    assert_eq!(&first[..], b"a\n");
    assert!(
        started.elapsed() < Duration::from_millis(800),
        "first chunk took {:?}",
        started.elapsed()
    );

    let mut rest = Vec::new();
    while let Some(chunk) = with_timeout(chunks.next()).await {
        rest.extend_from_slice(&chunk?);
    }
    assert_eq!(rest, b"b\n");
    assert!(started.elapsed() >= Duration::from_secs(1));
    Ok(())
}

#[tokio::test]
async fn test_request_environment() -> TestResult {
    let app = app(vec![
        CallBuilder::new(
            "/env",
            "echo \"$REQUEST_METHOD $REQUEST_URI $HTTP_X_TRACE_ID $QUERY_NAME ${HTTP_AUTHORIZATION:-none}\"",
        )
        .build(),
    ]);

    let response = app
        .oneshot(
            Request::get("/env?name=world&name=again")
                .header("X-Trace-Id", "abc")
                .header(AUTHORIZATION, "Basic Zm9vOmJhcg==")
                .body(Body::empty())?,
        )
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        body_text(response).await,
        "GET /env?name=world&name=again abc again none\n"
    );
    Ok(())
}

#[tokio::test]
async fn test_configured_headers_are_sent() -> TestResult {
    let cfg = autoapply::config::load_from_str(
        "call: { path: /h, headers: { Content-Type: text/plain, X-Powered-By: autoapply }, commands: [ 'true' ] }",
    )?;
    let call = Arc::new(Call::from_config(&cfg.calls[0])?);
    let response = router(vec![call])
        .oneshot(Request::get("/h").body(Body::empty())?)
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["content-type"], "text/plain");
    assert_eq!(response.headers()["x-powered-by"], "autoapply");
    Ok(())
}
