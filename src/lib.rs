// src/lib.rs

pub mod cli;
pub mod config;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod http;
pub mod logging;
pub mod types;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context as _, Result};
use tracing::{debug, info, warn};

use crate::cli::CliArgs;
use crate::config::{ConfigFile, ConfigSource, load_and_validate};
use crate::engine::{Context, RunOptions};
use crate::exec::Command;

/// A second Ctrl-C within this window terminates immediately.
const FORCE_EXIT_WINDOW: Duration = Duration::from_secs(5);

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading (file or `env:NAME`)
/// - the engine (server, init, loops)
/// - Ctrl-C handling
pub async fn run(args: CliArgs) -> Result<()> {
    let source = ConfigSource::from_arg(&args.config);
    let cfg = load_and_validate(&source)
        .with_context(|| format!("loading configuration from {source}"))?;

    if args.dry_run {
        print_dry_run(&cfg);
        return Ok(());
    }

    let options = RunOptions {
        loops: args.loops,
        catch_errors: true,
    };
    let ctx = Arc::new(engine::run(&cfg, options).await?);

    spawn_signal_handler(Arc::clone(&ctx));

    ctx.wait().await?;
    if ctx.server_addr().is_some() {
        // Calls keep being served after bounded loops are done.
        ctx.stopped().await;
    }
    ctx.stop().await?;
    Ok(())
}

/// First Ctrl-C requests a graceful stop; a second one within
/// [`FORCE_EXIT_WINDOW`] exits the process.
fn spawn_signal_handler(ctx: Arc<Context>) {
    tokio::spawn(async move {
        loop {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "failed to listen for Ctrl+C");
                return;
            }
            info!("Signal SIGINT received, shutting down...");
            ctx.request_stop();

            match tokio::time::timeout(FORCE_EXIT_WINDOW, tokio::signal::ctrl_c()).await {
                Ok(_) => {
                    warn!("Terminated.");
                    std::process::exit(130);
                }
                Err(_) => debug!("no second signal, still shutting down"),
            }
        }
    });
}

fn describe_command(command: &Command) -> String {
    command
        .describe()
        .unwrap_or_else(|| "<script>".to_string())
}

/// Print the decoded configuration without running anything.
fn print_dry_run(cfg: &ConfigFile) {
    println!("autoapply dry-run");

    if let Some(init) = &cfg.init {
        println!();
        println!("init (cwd: {}, onerror: {}):", init.cwd.display(), init.on_error);
        for command in &init.commands {
            println!("  - {}", describe_command(command));
        }
    }

    for (idx, l) in cfg.loops.iter().enumerate() {
        println!();
        let cwd = l
            .cwd
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "<temporary>".to_string());
        println!(
            "loop #{} (cwd: {cwd}, sleep: {:?}, onerror: {}):",
            idx + 1,
            l.sleep,
            l.on_error
        );
        for command in &l.commands {
            println!("  - {}", describe_command(command));
        }
    }

    for call in &cfg.calls {
        println!();
        let methods = if call.methods.is_empty() {
            "*".to_string()
        } else {
            call.methods
                .iter()
                .map(|m| m.as_str())
                .collect::<Vec<_>>()
                .join(",")
        };
        println!(
            "call {} (methods: {methods}, stream: {}, onerror: {}, cwd: {}):",
            call.path,
            call.stream,
            call.on_error,
            call.cwd.display()
        );
        if let Some(auth) = &call.authentication {
            println!("  authentication: {} user(s)", auth.len());
        }
        for (name, value) in &call.headers {
            println!("  header {name}: {}", value.to_str().unwrap_or("<binary>"));
        }
        for command in &call.commands {
            println!("  - {}", describe_command(command));
        }
    }

    println!();
    if cfg.server.enabled {
        println!("server: enabled on port {}", cfg.server.port);
    } else {
        println!("server: disabled");
    }

    debug!("dry-run complete (no execution)");
}
