// src/config/loader.rs

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::{AutoapplyError, Result};

/// Prefix selecting an environment variable as the configuration source.
pub const ENV_PREFIX: &str = "env:";

/// Where the YAML configuration comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    File(PathBuf),
    /// Name of an environment variable holding the YAML text.
    Env(String),
}

impl ConfigSource {
    /// Interpret a CLI argument: `env:NAME` or a file path.
    pub fn from_arg(arg: &str) -> Self {
        match arg.strip_prefix(ENV_PREFIX) {
            Some(name) => ConfigSource::Env(name.to_string()),
            None => ConfigSource::File(PathBuf::from(arg)),
        }
    }

    /// Read the raw YAML text.
    pub fn read(&self) -> Result<String> {
        match self {
            ConfigSource::File(path) => Ok(fs::read_to_string(path)?),
            ConfigSource::Env(name) => {
                if name.is_empty() {
                    return Err(AutoapplyError::config("empty environment variable name!"));
                }
                std::env::var(name).map_err(|_| {
                    AutoapplyError::config(format!("environment variable does not exist: {name}"))
                })
            }
        }
    }
}

impl fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigSource::File(path) => write!(f, "{}", path.display()),
            ConfigSource::Env(name) => write!(f, "{ENV_PREFIX}{name}"),
        }
    }
}

/// Parse YAML text into the raw model.
///
/// This only performs deserialization; it does **not** validate values.
/// Use [`load_from_str`] for that.
pub fn parse_raw(contents: &str) -> Result<RawConfigFile> {
    let value: serde_yaml::Value = serde_yaml::from_str(contents)?;
    if value.is_null() {
        return Err(AutoapplyError::config("configuration is empty!"));
    }
    Ok(serde_yaml::from_value(value)?)
}

/// Load a configuration file from a given path and return the raw model.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawConfigFile> {
    let contents = fs::read_to_string(path.as_ref())?;
    parse_raw(&contents)
}

/// Parse and validate YAML text.
pub fn load_from_str(contents: &str) -> Result<ConfigFile> {
    ConfigFile::try_from(parse_raw(contents)?)
}

/// Load a configuration from its source and run validation.
///
/// This is the recommended entry point for the rest of the application:
///
/// - Reads YAML from a file or an environment variable.
/// - Applies defaults (sleep, onerror, methods, port, ...).
/// - Decodes every command, header and credential into its typed form.
pub fn load_and_validate(source: &ConfigSource) -> Result<ConfigFile> {
    let contents = source.read()?;
    load_from_str(&contents)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_from_arg() {
        assert_eq!(
            ConfigSource::from_arg("env:AUTOAPPLY_CONFIG"),
            ConfigSource::Env("AUTOAPPLY_CONFIG".to_string())
        );
        assert_eq!(
            ConfigSource::from_arg("config.yaml"),
            ConfigSource::File(PathBuf::from("config.yaml"))
        );
        assert_eq!(ConfigSource::from_arg("env:").to_string(), "env:");
    }

    #[test]
    fn empty_env_name_is_rejected() {
        let err = ConfigSource::Env(String::new()).read().unwrap_err();
        assert!(err.to_string().contains("empty environment variable name!"));
    }

    #[test]
    fn missing_env_var_is_rejected() {
        let err = ConfigSource::Env("AUTOAPPLY_SURELY_UNSET_VARIABLE".into())
            .read()
            .unwrap_err();
        assert!(err.to_string().contains("environment variable does not exist"));
    }

    #[test]
    fn empty_document_is_rejected() {
        let err = parse_raw("").unwrap_err();
        assert!(err.to_string().contains("configuration is empty!"));
        let err = parse_raw("# only a comment\n").unwrap_err();
        assert!(err.to_string().contains("configuration is empty!"));
    }
}
