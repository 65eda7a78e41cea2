// src/config/mod.rs

//! Configuration loading and validation for autoapply.
//!
//! Responsibilities:
//! - Define the YAML-backed raw data model and the decoded model (`model.rs`).
//! - Load a config from a file or an environment variable (`loader.rs`).
//! - Validate and decode raw shapes into typed values (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{ConfigSource, load_and_validate, load_from_path, load_from_str, parse_raw};
pub use model::{
    CallConfig, ConfigFile, InitConfig, LoopConfig, OneOrMany, RawAuthentication, RawCall,
    RawCommand, RawCommandLine, RawCommandObject, RawConfigFile, RawHeader, RawHeaders, RawInit,
    RawLoop, RawServer, RawSleep, RawUser, ServerConfig,
};
pub use validate::{decode_command, validate_config};
