// src/config/validate.rs

//! Decoding of the raw YAML model into the canonical [`ConfigFile`].
//!
//! Every shape check happens here, once, at load time. The engine never looks
//! at raw values again.

use std::path::PathBuf;
use std::time::Duration;

use axum::http::{HeaderName, HeaderValue, Method};
use tracing::debug;

use crate::config::model::{
    CallConfig, ConfigFile, DEFAULT_PORT, DEFAULT_SLEEP, InitConfig, LoopConfig, RawAuthentication,
    RawCall, RawCommand, RawCommandLine, RawCommandObject, RawConfigFile, RawHeaders, RawInit,
    RawLoop, RawServer, RawSleep, ServerConfig,
};
use crate::errors::{AutoapplyError, Result};
use crate::exec::{Command, Invocation};
use crate::http::Authentication;
use crate::types::{OnError, StdioMode};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = AutoapplyError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_config(raw)
    }
}

/// Validate and decode a raw configuration.
pub fn validate_config(raw: RawConfigFile) -> Result<ConfigFile> {
    let init = raw.init.map(decode_init).transpose()?;

    if raw.loops.is_none() && raw.calls.is_none() {
        return Err(AutoapplyError::config(
            "invalid configuration, neither loop nor call section given!",
        ));
    }

    let loops = raw
        .loops
        .map(|l| l.into_vec())
        .unwrap_or_default()
        .into_iter()
        .map(decode_loop)
        .collect::<Result<Vec<_>>>()?;

    let calls = raw
        .calls
        .map(|c| c.into_vec())
        .unwrap_or_default()
        .into_iter()
        .map(decode_call)
        .collect::<Result<Vec<_>>>()?;

    let server = decode_server(raw.server.as_ref(), !calls.is_empty());

    Ok(ConfigFile {
        init,
        loops,
        calls,
        server,
    })
}

fn decode_init(raw: RawInit) -> Result<InitConfig> {
    if raw.commands.is_empty() {
        return Err(AutoapplyError::config("no init commands given!"));
    }
    Ok(InitConfig {
        cwd: non_empty(raw.cwd)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(".")),
        on_error: parse_on_error(raw.onerror.as_deref(), OnError::Fail)?,
        commands: decode_commands(raw.commands)?,
    })
}

fn decode_loop(raw: RawLoop) -> Result<LoopConfig> {
    if raw.commands.is_empty() {
        return Err(AutoapplyError::config("no loop commands given!"));
    }
    Ok(LoopConfig {
        cwd: non_empty(raw.cwd).map(PathBuf::from),
        sleep: parse_sleep(raw.sleep.as_ref())?,
        on_error: parse_on_error(raw.onerror.as_deref(), OnError::Continue)?,
        commands: decode_commands(raw.commands)?,
    })
}

fn decode_call(raw: RawCall) -> Result<CallConfig> {
    let path = non_empty(raw.path).ok_or_else(|| AutoapplyError::config("call: no path given!"))?;
    if raw.commands.is_empty() {
        return Err(AutoapplyError::config("call: no commands given!"));
    }

    let authentication = match raw.authentication {
        Some(auth) => decode_authentication(auth)?,
        None => None,
    };

    Ok(CallConfig {
        path,
        methods: parse_methods(raw.methods)?,
        headers: parse_headers(raw.headers)?,
        authentication,
        stream: raw.stream.unwrap_or(false),
        on_error: parse_on_error(raw.onerror.as_deref(), OnError::Fail)?,
        cwd: non_empty(raw.cwd)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(".")),
        commands: decode_commands(raw.commands)?,
    })
}

/// The server runs whenever calls are configured, or when a `server` section
/// is present without `enabled: false`.
fn decode_server(raw: Option<&RawServer>, has_calls: bool) -> ServerConfig {
    let enabled = has_calls || raw.is_some_and(|s| s.enabled != Some(false));
    let port = raw
        .and_then(|s| s.port)
        .filter(|p| *p != 0)
        .unwrap_or(DEFAULT_PORT);
    ServerConfig { enabled, port }
}

fn decode_commands(raw: Vec<RawCommand>) -> Result<Vec<Command>> {
    raw.into_iter().map(decode_command).collect()
}

/// Decode a single command entry.
pub fn decode_command(raw: RawCommand) -> Result<Command> {
    let command = match raw {
        RawCommand::Shell(s) => Command::new(Invocation::shell(&s).map_err(AutoapplyError::config)?),
        RawCommand::Argv(argv) => {
            Command::new(Invocation::argv(argv).map_err(AutoapplyError::config)?)
        }
        RawCommand::Detailed(obj) => decode_command_object(obj)?,
    };
    Ok(command)
}

fn decode_command_object(obj: RawCommandObject) -> Result<Command> {
    let invocation = match (obj.command, obj.script) {
        (Some(_), Some(_)) => {
            return Err(AutoapplyError::config("cannot combine command and script!"));
        }
        (None, Some(script)) => Invocation::script(&script),
        (Some(RawCommandLine::Shell(s)), None) => Invocation::shell(&s),
        (Some(RawCommandLine::Argv(argv)), None) => Invocation::argv(argv),
        (None, None) => Err("invalid command: neither command nor script given".to_string()),
    }
    .map_err(AutoapplyError::config)?;

    let stdout = StdioMode::parse_or_default(obj.stdout.as_deref()).map_err(AutoapplyError::config)?;
    let stderr = StdioMode::parse_or_default(obj.stderr.as_deref()).map_err(AutoapplyError::config)?;

    Ok(Command::new(invocation)
        .with_stdout(stdout)
        .with_stderr(stderr))
}

fn parse_on_error(value: Option<&str>, default: OnError) -> Result<OnError> {
    OnError::parse_or(value, default).map_err(AutoapplyError::config)
}

/// Parse a loop's `sleep` value in seconds.
///
/// Missing or negative values fall back to 60s; `0` disables sleeping.
pub fn parse_sleep(value: Option<&RawSleep>) -> Result<Duration> {
    let seconds = match value {
        None => None,
        Some(RawSleep::Seconds(s)) => Some(*s),
        Some(RawSleep::Text(text)) => {
            let trimmed = text.trim();
            if trimmed.is_empty() {
                None
            } else {
                let parsed = trimmed
                    .parse::<f64>()
                    .ok()
                    .filter(|s| s.is_finite())
                    .ok_or_else(|| AutoapplyError::config(format!("invalid sleep value: {text}")))?;
                Some(parsed)
            }
        }
    };

    match seconds {
        Some(s) if s.is_nan() => Err(AutoapplyError::config("invalid sleep value: NaN")),
        Some(s) if s >= 0.0 => Duration::try_from_secs_f64(s)
            .map_err(|_| AutoapplyError::config(format!("invalid sleep value: {s}"))),
        _ => {
            debug!("using default sleep value");
            Ok(DEFAULT_SLEEP)
        }
    }
}

/// Parse allowed methods. Missing means `GET` only; `[]` or `["*"]` accept
/// every method.
pub fn parse_methods(value: Option<Vec<String>>) -> Result<Vec<Method>> {
    let Some(methods) = value else {
        return Ok(vec![Method::GET]);
    };
    if methods.is_empty() || (methods.len() == 1 && methods[0] == "*") {
        return Ok(Vec::new());
    }
    methods
        .iter()
        .map(|m| {
            Method::from_bytes(m.trim().to_uppercase().as_bytes())
                .map_err(|_| AutoapplyError::config(format!("invalid method: {m}")))
        })
        .collect()
}

/// Parse response headers from either the map or the list form.
pub fn parse_headers(value: Option<RawHeaders>) -> Result<Vec<(HeaderName, HeaderValue)>> {
    let pairs: Vec<(String, String)> = match value {
        None => return Ok(Vec::new()),
        Some(RawHeaders::Map(map)) => map.into_iter().collect(),
        Some(RawHeaders::List(list)) => list
            .into_iter()
            .map(|h| {
                let name = non_empty(h.name).ok_or_else(|| {
                    AutoapplyError::config("header name is missing or invalid!")
                })?;
                let value = non_empty(h.value).ok_or_else(|| {
                    AutoapplyError::config(format!("header value is missing or invalid: {name}"))
                })?;
                Ok((name, value))
            })
            .collect::<Result<_>>()?,
    };

    pairs
        .into_iter()
        .map(|(name, value)| {
            let header_name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|_| AutoapplyError::config(format!("invalid header name: {name}")))?;
            let header_value = HeaderValue::from_str(&value)
                .map_err(|_| AutoapplyError::config(format!("invalid header value: {value}")))?;
            Ok((header_name, header_value))
        })
        .collect()
}

fn decode_authentication(raw: RawAuthentication) -> Result<Option<Authentication>> {
    match raw {
        RawAuthentication::Users(users) => {
            if users.is_empty() {
                return Ok(None);
            }
            let pairs = users
                .into_iter()
                .map(|u| (u.username.unwrap_or_default(), u.password.unwrap_or_default()));
            Authentication::from_pairs(pairs)
                .map(Some)
                .map_err(AutoapplyError::config)
        }
        RawAuthentication::Source(source) => {
            if let Some(file) = source.file {
                let content = std::fs::read_to_string(&file).map_err(|_| {
                    AutoapplyError::config(format!("could not read authentication file: {file}"))
                })?;
                let auth = Authentication::parse(&content).map_err(AutoapplyError::config)?;
                auth.map(Some).ok_or_else(|| {
                    AutoapplyError::config(format!("no authentication entries: {file}"))
                })
            } else if let Some(env) = source.env {
                let content = std::env::var(&env).unwrap_or_default();
                let auth = Authentication::parse(&content).map_err(AutoapplyError::config)?;
                auth.map(Some).ok_or_else(|| {
                    AutoapplyError::config(format!("no authentication entries: {env}"))
                })
            } else {
                Err(AutoapplyError::config(
                    "invalid authentication value: expected `file`, `env` or a list of users",
                ))
            }
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sleep_defaults_and_bounds() {
        assert_eq!(parse_sleep(None).unwrap(), Duration::from_secs(60));
        assert_eq!(parse_sleep(Some(&RawSleep::Seconds(0.0))).unwrap(), Duration::ZERO);
        assert_eq!(
            parse_sleep(Some(&RawSleep::Text("0".into()))).unwrap(),
            Duration::ZERO
        );
        assert_eq!(
            parse_sleep(Some(&RawSleep::Text("-0.3".into()))).unwrap(),
            Duration::from_secs(60)
        );
        assert_eq!(
            parse_sleep(Some(&RawSleep::Seconds(-5.0))).unwrap(),
            Duration::from_secs(60)
        );
        assert_eq!(
            parse_sleep(Some(&RawSleep::Text("0.01".into()))).unwrap(),
            Duration::from_millis(10)
        );
    }

    #[test]
    fn sleep_rejects_garbage() {
        let err = parse_sleep(Some(&RawSleep::Text("x".into()))).unwrap_err();
        assert!(err.to_string().contains("invalid sleep value: x"));
    }

    #[test]
    fn methods_defaults_and_wildcards() {
        assert_eq!(parse_methods(None).unwrap(), vec![Method::GET]);
        assert!(parse_methods(Some(vec![])).unwrap().is_empty());
        assert!(parse_methods(Some(vec!["*".into()])).unwrap().is_empty());
        assert_eq!(
            parse_methods(Some(vec!["post".into(), "Put".into()])).unwrap(),
            vec![Method::POST, Method::PUT]
        );
    }

    #[test]
    fn headers_from_map_and_list() {
        let map = RawHeaders::Map([("Content-Type".to_string(), "text/plain".to_string())].into());
        let parsed = parse_headers(Some(map)).unwrap();
        assert_eq!(parsed[0].0, "content-type");
        assert_eq!(parsed[0].1, "text/plain");

        let list = RawHeaders::List(vec![crate::config::model::RawHeader {
            name: Some("X-A".into()),
            value: None,
        }]);
        let err = parse_headers(Some(list)).unwrap_err();
        assert!(err.to_string().contains("header value is missing"));
    }

    #[test]
    fn command_object_rules() {
        let both = RawCommandObject {
            command: Some(RawCommandLine::Shell("ls".into())),
            script: Some("true".into()),
            ..Default::default()
        };
        let err = decode_command(RawCommand::Detailed(both)).unwrap_err();
        assert!(err.to_string().contains("cannot combine command and script!"));

        let neither = RawCommandObject::default();
        let err = decode_command(RawCommand::Detailed(neither)).unwrap_err();
        assert!(err.to_string().contains("invalid command"));

        let bad_stdio = RawCommandObject {
            command: Some(RawCommandLine::Shell("ls".into())),
            stdout: Some("unknown".into()),
            ..Default::default()
        };
        let err = decode_command(RawCommand::Detailed(bad_stdio)).unwrap_err();
        assert!(err.to_string().contains("invalid stdio"));
    }

    #[test]
    fn server_enablement() {
        assert!(!decode_server(None, false).enabled);
        assert!(decode_server(None, true).enabled);

        let explicit = RawServer {
            enabled: None,
            port: Some(3001),
        };
        let server = decode_server(Some(&explicit), false);
        assert!(server.enabled);
        assert_eq!(server.port, 3001);

        let disabled = RawServer {
            enabled: Some(false),
            port: Some(0),
        };
        let server = decode_server(Some(&disabled), false);
        assert!(!server.enabled);
        assert_eq!(server.port, DEFAULT_PORT);
    }
}
