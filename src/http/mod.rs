// src/http/mod.rs

//! HTTP surface: a small axum server that serves `/healthz` and runs a
//! call's batch when its path is requested.
//!
//! - [`call`] holds the per-path `Call` handler (auth, method filter,
//!   streaming or buffered responses).
//! - [`auth`] implements Basic authentication.
//! - [`env`] turns a request into environment variables for the commands.
//! - [`server`] wires everything into a router and a listener.

pub mod auth;
pub mod call;
pub mod env;
pub mod server;

pub use auth::Authentication;
pub use call::{Call, CallError};
pub use env::{CallRequest, normalize_name, request_env};
pub use server::{ServerHandle, router, start};
