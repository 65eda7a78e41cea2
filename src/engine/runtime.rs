// src/engine/runtime.rs

use std::sync::Arc;

use tracing::{debug, info};

use crate::config::ConfigFile;
use crate::errors::Result;
use crate::http::{self, Call};

use super::context::{Context, RunState};
use super::init::Init;
use super::looper::Loop;
use super::RunOptions;

/// Start everything described by `config`.
///
/// Order: server, then init, then loops. An init failure stops the server
/// and is returned; nothing else is started. The returned [`Context`] owns
/// the running loop tasks and the server.
pub async fn run(config: &ConfigFile, options: RunOptions) -> Result<Context> {
    let init = config.init.as_ref().map(Init::from_config).transpose()?;

    let single = config.loops.len() == 1;
    let loops = config
        .loops
        .iter()
        .enumerate()
        .map(|(idx, cfg)| {
            let name = if single {
                "Loop".to_string()
            } else {
                format!("Loop {}", idx + 1)
            };
            Loop::from_config(cfg, name).map(Arc::new)
        })
        .collect::<Result<Vec<_>>>()?;

    let calls = config
        .calls
        .iter()
        .map(|cfg| Call::from_config(cfg).map(Arc::new))
        .collect::<Result<Vec<_>>>()?;

    let server = if config.server.enabled {
        Some(http::start(config.server.port, calls.clone()).await?)
    } else {
        debug!("server disabled");
        None
    };

    if let Some(init) = init {
        if let Err(err) = init.run().await {
            if let Some(server) = server {
                server.stop().await;
            }
            return Err(err);
        }
    }

    let state = RunState::new();
    let mut ctx = Context::new(state.clone(), calls, server);

    if !loops.is_empty() {
        info!("Running loop commands...");
    }
    for l in loops {
        let task = l.start(options, state.clone());
        ctx.push_loop(l, task);
    }

    Ok(ctx)
}
