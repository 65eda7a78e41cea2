// src/engine/init.rs

use std::path::PathBuf;

use tracing::info;

use crate::config::InitConfig;
use crate::errors::{AutoapplyError, Result};
use crate::exec::{Batch, Env, ProcessSink};

/// The one-time batch run after the server is up and before any loop.
#[derive(Debug)]
pub struct Init {
    batch: Batch,
    cwd: PathBuf,
}

impl Init {
    pub fn from_config(cfg: &InitConfig) -> Result<Self> {
        let batch = Batch::new("Init", cfg.commands.clone(), cfg.on_error)
            .map_err(AutoapplyError::ConfigError)?;
        Ok(Self {
            batch,
            cwd: cfg.cwd.clone(),
        })
    }

    pub async fn run(&self) -> Result<()> {
        info!("Running init commands...");
        self.batch.run(&self.cwd, &Env::new(), &ProcessSink).await?;
        Ok(())
    }
}
