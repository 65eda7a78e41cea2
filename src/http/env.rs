// src/http/env.rs

//! CGI-style environment variables describing an HTTP request.

use std::net::SocketAddr;

use axum::extract::Query;
use axum::http::header::AUTHORIZATION;
use axum::http::{HeaderMap, Method, Uri};

use crate::exec::Env;

/// The parts of an incoming request a call needs.
#[derive(Debug, Clone)]
pub struct CallRequest {
    pub method: Method,
    pub uri: Uri,
    pub headers: HeaderMap,
    pub remote_addr: Option<SocketAddr>,
}

/// Uppercase `name` and replace everything outside `[A-Z0-9]` with `_`.
pub fn normalize_name(name: &str) -> String {
    name.chars()
        .map(|c| {
            let c = c.to_ascii_uppercase();
            if c.is_ascii_uppercase() || c.is_ascii_digit() {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Build the environment for a call's commands.
///
/// The result is layered over the inherited process environment by the
/// command runner, so only request-specific variables are included:
/// `REQUEST_METHOD`, `REQUEST_URI`, `REMOTE_ADDR`, `HTTP_*` per header
/// (except `Authorization`), `QUERY_*` per query parameter and
/// `REQUEST_USERNAME` when authenticated.
pub fn request_env(request: &CallRequest, username: Option<&str>) -> Env {
    let mut env = Env::new();
    env.insert("REQUEST_METHOD".to_string(), request.method.to_string());
    env.insert(
        "REQUEST_URI".to_string(),
        request
            .uri
            .path_and_query()
            .map(|pq| pq.as_str().to_string())
            .unwrap_or_else(|| request.uri.path().to_string()),
    );
    env.insert(
        "REMOTE_ADDR".to_string(),
        request
            .remote_addr
            .map(|addr| addr.ip().to_string())
            .unwrap_or_default(),
    );

    for name in request.headers.keys() {
        if name == AUTHORIZATION {
            continue;
        }
        let values: Vec<String> = request
            .headers
            .get_all(name)
            .iter()
            .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned())
            .collect();
        env.insert(
            format!("HTTP_{}", normalize_name(name.as_str())),
            values.join(", "),
        );
    }

    for (name, value) in query_params(&request.uri) {
        env.insert(format!("QUERY_{}", normalize_name(&name)), value);
    }

    if let Some(username) = username {
        env.insert("REQUEST_USERNAME".to_string(), username.to_string());
    }

    env
}

fn query_params(uri: &Uri) -> Vec<(String, String)> {
    match Query::<Vec<(String, String)>>::try_from_uri(uri) {
        Ok(Query(params)) => params,
        Err(_) => Vec::new(),
    }
}
