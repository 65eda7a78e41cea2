// tests/loop_behaviour.rs
#![cfg(unix)]

mod common;
use crate::common::builders::{ConfigFileBuilder, InitBuilder, LoopBuilder};
use crate::common::{TestResult, init_tracing, with_timeout};

use std::time::{Duration, Instant};

use autoapply::engine::{self, RunOptions};

fn line_count(path: &std::path::Path) -> usize {
    std::fs::read_to_string(path)
        .map(|s| s.lines().count())
        .unwrap_or(0)
}

#[tokio::test]
async fn test_loop_runs_exactly_n_iterations() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let cfg = ConfigFileBuilder::new()
        .with_loop(
            LoopBuilder::new("echo tick >> ticks.txt")
                .sleep(0.0)
                .cwd(dir.path())
                .build(),
        )
        .build();

    let options = RunOptions {
        loops: Some(3),
        catch_errors: false,
    };
    let ctx = engine::run(&cfg, options).await?;
    with_timeout(ctx.wait()).await?;

    assert_eq!(line_count(&dir.path().join("ticks.txt")), 3);
    assert_eq!(ctx.active_loops(), 0);
    Ok(())
}

#[tokio::test]
async fn test_stop_interrupts_a_long_sleep() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let cfg = ConfigFileBuilder::new()
        .with_loop(
            LoopBuilder::new("echo tick >> ticks.txt")
                .sleep(3600.0)
                .cwd(dir.path())
                .build(),
        )
        .build();

    let ctx = engine::run(&cfg, RunOptions::default()).await?;

    // Wait for the first iteration, then for the loop to be asleep.
    with_timeout(async {
        while line_count(&dir.path().join("ticks.txt")) < 1 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await;
    tokio::time::sleep(Duration::from_millis(100)).await;

    let started = Instant::now();
    with_timeout(ctx.stop()).await?;
    let elapsed = started.elapsed();

    assert!(
        elapsed < Duration::from_millis(100),
        "stop took {elapsed:?}"
    );
    assert!(!ctx.is_running());
    assert_eq!(ctx.active_loops(), 0);
    assert_eq!(line_count(&dir.path().join("ticks.txt")), 1);

    // A second stop is a no-op.
    with_timeout(ctx.stop()).await?;
    Ok(())
}

#[tokio::test]
async fn test_stop_before_first_sleep_is_not_lost() -> TestResult {
    init_tracing();
    let cfg = ConfigFileBuilder::new()
        .with_loop(LoopBuilder::new("sleep 0.2").sleep(3600.0).build())
        .build();

    let ctx = engine::run(&cfg, RunOptions::default()).await?;
    // Requested while the first iteration is still running.
    ctx.request_stop();
    with_timeout(ctx.wait()).await?;
    assert_eq!(ctx.active_loops(), 0);
    Ok(())
}

#[tokio::test]
async fn test_multiple_loops_each_run_n_times() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let cfg = ConfigFileBuilder::new()
        .with_loop(
            LoopBuilder::new("echo a >> a.txt")
                .sleep(0.0)
                .cwd(dir.path())
                .build(),
        )
        .with_loop(
            LoopBuilder::new("echo b >> b.txt")
                .sleep(0.01)
                .cwd(dir.path())
                .build(),
        )
        .build();

    let options = RunOptions {
        loops: Some(4),
        catch_errors: false,
    };
    let ctx = engine::run(&cfg, options).await?;
    let names: Vec<String> = ctx.loops().map(|l| l.name().to_string()).collect();
    assert_eq!(names, ["Loop 1", "Loop 2"]);

    with_timeout(ctx.wait()).await?;
    assert_eq!(line_count(&dir.path().join("a.txt")), 4);
    assert_eq!(line_count(&dir.path().join("b.txt")), 4);
    Ok(())
}

#[tokio::test]
async fn test_loop_without_cwd_uses_a_fresh_temp_dir() -> TestResult {
    init_tracing();
    let record = tempfile::tempdir()?;
    let log = record.path().join("dirs.txt");
    let cfg = ConfigFileBuilder::new()
        .with_loop(
            LoopBuilder::new(&format!("pwd >> '{}'", log.display()))
                .sleep(0.0)
                .build(),
        )
        .build();

    let options = RunOptions {
        loops: Some(2),
        catch_errors: false,
    };
    let ctx = engine::run(&cfg, options).await?;
    with_timeout(ctx.wait()).await?;

    let dirs: Vec<String> = std::fs::read_to_string(&log)?
        .lines()
        .map(str::to_string)
        .collect();
    assert_eq!(dirs.len(), 2);
    assert_ne!(dirs[0], dirs[1]);
    for dir in &dirs {
        assert!(!std::path::Path::new(dir).exists(), "{dir} not cleaned up");
    }
    Ok(())
}

#[tokio::test]
async fn test_failing_loop_surfaces_error_only_when_not_caught() -> TestResult {
    init_tracing();
    let build = || {
        ConfigFileBuilder::new()
            .with_loop(LoopBuilder::new("exit 9").onerror("fail").build())
            .build()
    };

    let uncaught = RunOptions {
        loops: Some(1),
        catch_errors: false,
    };
    let ctx = engine::run(&build(), uncaught).await?;
    let err = with_timeout(ctx.wait()).await.unwrap_err();
    assert!(err.to_string().contains("code 9"), "{err}");

    let caught = RunOptions {
        loops: Some(1),
        catch_errors: true,
    };
    let ctx = engine::run(&build(), caught).await?;
    with_timeout(ctx.wait()).await?;
    Ok(())
}

#[tokio::test]
async fn test_init_runs_in_its_cwd_before_loops() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let cfg = ConfigFileBuilder::new()
        .with_init(
            InitBuilder::new("echo init > order.txt")
                .cwd(dir.path())
                .build(),
        )
        .with_loop(
            LoopBuilder::new("echo loop >> order.txt")
                .cwd(dir.path())
                .build(),
        )
        .build();

    let options = RunOptions {
        loops: Some(1),
        catch_errors: false,
    };
    let ctx = engine::run(&cfg, options).await?;
    with_timeout(ctx.wait()).await?;

    let order = std::fs::read_to_string(dir.path().join("order.txt"))?;
    assert_eq!(order, "init\nloop\n");
    Ok(())
}

#[tokio::test]
async fn test_failing_init_reports_127_for_missing_program() -> TestResult {
    init_tracing();
    let cfg = ConfigFileBuilder::new()
        .with_init(InitBuilder::new("autoapply-no-such-program 2>/dev/null").build())
        .with_loop(LoopBuilder::new("true").build())
        .build();

    let err = engine::run(&cfg, RunOptions::default()).await.unwrap_err();
    assert_eq!(err.to_string(), "command failed with code 127");
    Ok(())
}
