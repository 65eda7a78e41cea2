// src/config/model.rs

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use axum::http::{HeaderName, HeaderValue, Method};
use serde::Deserialize;

use crate::exec::Command;
use crate::http::Authentication;
use crate::types::OnError;

/// Top-level configuration as read from YAML.
///
/// ```yaml
/// init:
///   cwd: /srv/app
///   commands: ["git clone https://example.org/repo.git ."]
///
/// loop:
///   sleep: 30
///   onerror: continue
///   commands:
///     - git pull
///     - { command: [kubectl, apply, -f, .], stdout: ignore }
///
/// call:
///   path: /deploy
///   methods: [POST]
///   stream: true
///   commands:
///     - script: |
///         #!/bin/sh
///         ./deploy.sh
///
/// server:
///   port: 3000
/// ```
///
/// This is the raw, shape-preserving model; [`ConfigFile`] is the decoded
/// form the engine consumes.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawConfigFile {
    #[serde(default)]
    pub init: Option<RawInit>,

    #[serde(default, rename = "loop")]
    pub loops: Option<OneOrMany<RawLoop>>,

    #[serde(default, rename = "call")]
    pub calls: Option<OneOrMany<RawCall>>,

    #[serde(default)]
    pub server: Option<RawServer>,
}

/// A section that accepts either a single object or a list of them.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}

impl<T> OneOrMany<T> {
    pub fn into_vec(self) -> Vec<T> {
        match self {
            OneOrMany::One(item) => vec![item],
            OneOrMany::Many(items) => items,
        }
    }
}

/// `init` section.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawInit {
    #[serde(default)]
    pub cwd: Option<String>,
    #[serde(default)]
    pub onerror: Option<String>,
    #[serde(default)]
    pub commands: Vec<RawCommand>,
}

/// One `loop` entry.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawLoop {
    #[serde(default)]
    pub cwd: Option<String>,
    #[serde(default)]
    pub sleep: Option<RawSleep>,
    #[serde(default)]
    pub onerror: Option<String>,
    #[serde(default)]
    pub commands: Vec<RawCommand>,
}

/// `sleep` as written in YAML: `30`, `0.5` or `"30"`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum RawSleep {
    Seconds(f64),
    Text(String),
}

/// One `call` entry.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawCall {
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub methods: Option<Vec<String>>,
    #[serde(default)]
    pub headers: Option<RawHeaders>,
    #[serde(default)]
    pub authentication: Option<RawAuthentication>,
    #[serde(default)]
    pub stream: Option<bool>,
    #[serde(default)]
    pub onerror: Option<String>,
    #[serde(default)]
    pub cwd: Option<String>,
    #[serde(default)]
    pub commands: Vec<RawCommand>,
}

/// Response headers: `{Name: value}` or `[{name, value}]`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawHeaders {
    Map(BTreeMap<String, String>),
    List(Vec<RawHeader>),
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawHeader {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub value: Option<String>,
}

/// Credentials: `{file: path}`, `{env: NAME}` or `[{username, password}]`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawAuthentication {
    Source(RawAuthSource),
    Users(Vec<RawUser>),
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawAuthSource {
    #[serde(default)]
    pub file: Option<String>,
    #[serde(default)]
    pub env: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawUser {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

/// `server` section.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawServer {
    #[serde(default)]
    pub enabled: Option<bool>,
    #[serde(default)]
    pub port: Option<u16>,
}

/// A command entry in any of its accepted shapes.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawCommand {
    Shell(String),
    Argv(Vec<String>),
    Detailed(RawCommandObject),
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawCommandObject {
    #[serde(default)]
    pub command: Option<RawCommandLine>,
    #[serde(default)]
    pub script: Option<String>,
    #[serde(default)]
    pub stdout: Option<String>,
    #[serde(default)]
    pub stderr: Option<String>,
}

/// The `command` field of a detailed command entry.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawCommandLine {
    Shell(String),
    Argv(Vec<String>),
}

/// Decoded, validated configuration.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub init: Option<InitConfig>,
    pub loops: Vec<LoopConfig>,
    pub calls: Vec<CallConfig>,
    pub server: ServerConfig,
}

#[derive(Debug, Clone)]
pub struct InitConfig {
    pub cwd: PathBuf,
    pub on_error: OnError,
    pub commands: Vec<Command>,
}

#[derive(Debug, Clone)]
pub struct LoopConfig {
    /// Fixed working directory; `None` means a fresh temporary directory per
    /// iteration.
    pub cwd: Option<PathBuf>,
    pub sleep: Duration,
    pub on_error: OnError,
    pub commands: Vec<Command>,
}

#[derive(Debug, Clone)]
pub struct CallConfig {
    pub path: String,
    /// Allowed methods; empty accepts any method.
    pub methods: Vec<Method>,
    pub headers: Vec<(HeaderName, HeaderValue)>,
    pub authentication: Option<Authentication>,
    pub stream: bool,
    pub on_error: OnError,
    pub cwd: PathBuf,
    pub commands: Vec<Command>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServerConfig {
    pub enabled: bool,
    pub port: u16,
}

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_SLEEP: Duration = Duration::from_secs(60);

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            port: DEFAULT_PORT,
        }
    }
}
