// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Muster Daemon (musterd)
//!
//! Background process that runs the monitoring loop over the agent fleet
//! and answers CLI requests on a Unix socket.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

use std::sync::Arc;
use std::time::Instant;

use muster_adapters::{DesktopNotifyAdapter, TmuxDriver};
use muster_core::SystemClock;
use muster_daemon::lifecycle::{self, Config, LifecycleError, PidLock};
use muster_daemon::listener::{ListenCtx, Listener};
use muster_daemon::PROTOCOL_VERSION;
use muster_engine::MonitorService;
use parking_lot::Mutex;
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::Notify;
use tracing::{error, info};

/// Exit code for fatal daemon errors, distinct from argument errors (1).
const EXIT_FATAL: i32 = 2;

#[tokio::main]
async fn main() {
    // Handle info flags before any config/lock acquisition
    if let Some(arg) = std::env::args().nth(1) {
        match arg.as_str() {
            "--version" | "-V" | "-v" => {
                println!("musterd {PROTOCOL_VERSION}");
                return;
            }
            "--help" | "-h" | "help" => {
                println!("musterd {PROTOCOL_VERSION}");
                println!("Muster monitor daemon - watches a fleet of terminal-hosted agents");
                println!();
                println!("USAGE:");
                println!("    musterd");
                println!();
                println!("The daemon is typically started by the `muster` CLI and should not");
                println!("be invoked directly. It listens on a Unix socket for commands.");
                println!();
                println!("OPTIONS:");
                println!("    -h, --help       Print help information");
                println!("    -v, --version    Print version information");
                return;
            }
            _ => {
                eprintln!("error: unexpected argument '{arg}'");
                eprintln!("Usage: musterd [--help | --version]");
                std::process::exit(1);
            }
        }
    }

    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {e}");
            std::process::exit(EXIT_FATAL);
        }
    };

    if let Err(e) = run(config).await {
        error!("daemon failed: {e}");
        eprintln!("error: {e}");
        std::process::exit(EXIT_FATAL);
    }
}

async fn run(config: Config) -> Result<(), LifecycleError> {
    rotate_log_if_needed(&config.log_path);
    write_startup_marker(&config)?;
    let _log_guard = setup_logging(&config)?;

    // Refuse to start while a live daemon holds the PID lock.
    let pid_lock = match PidLock::acquire(&config.pid_path) {
        Ok(lock) => lock,
        Err(LifecycleError::LockFailed(_)) => {
            let pid = std::fs::read_to_string(&config.pid_path)
                .unwrap_or_default()
                .trim()
                .to_string();
            eprintln!("musterd is already running");
            if !pid.is_empty() {
                eprintln!("  pid: {pid}");
            }
            std::process::exit(1);
        }
        Err(e) => return Err(e),
    };

    info!(version = PROTOCOL_VERSION, "starting musterd");

    let monitor_config = config.monitor_config()?;
    let monitor = Arc::new(MonitorService::new(
        TmuxDriver::new,
        DesktopNotifyAdapter::new(),
        monitor_config,
        SystemClock,
        Some(config.snapshot_path.clone()),
    ));
    let shutdown_grace = monitor.config().shutdown_grace();

    let unix_listener = lifecycle::bind_socket(&config.socket_path)?;
    let shutdown = Arc::new(Notify::new());

    // The monitoring loop starts immediately; `monitor stop` pauses it
    // without taking the daemon down.
    let monitor_task = {
        let monitor = Arc::clone(&monitor);
        tokio::spawn(async move { monitor.run().await })
    };

    let ctx = Arc::new(ListenCtx {
        monitor: Arc::clone(&monitor),
        monitor_task: Mutex::new(Some(monitor_task)),
        start_time: Instant::now(),
        shutdown: Arc::clone(&shutdown),
    });
    tokio::spawn(Listener::new(unix_listener, Arc::clone(&ctx)).run());

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;

    info!(socket = %config.socket_path.display(), "daemon ready");
    // Signal ready for the parent process (CLI waiting for startup).
    println!("READY");

    tokio::select! {
        _ = shutdown.notified() => info!("shutdown requested via command"),
        _ = sigterm.recv() => info!("received SIGTERM, shutting down"),
        _ = sigint.recv() => info!("received SIGINT, shutting down"),
    }

    // Graceful shutdown: stop the loop, give in-flight work its grace,
    // then abort whatever is left.
    monitor.stop();
    let task = ctx.monitor_task.lock().take();
    if let Some(task) = task {
        match tokio::time::timeout(shutdown_grace, task).await {
            Ok(_) => info!("monitor loop stopped"),
            Err(_) => {
                error!("monitor loop did not stop within grace, aborting");
            }
        }
    }

    if config.socket_path.exists() {
        let _ = std::fs::remove_file(&config.socket_path);
    }
    pid_lock.release();

    info!("daemon stopped");
    Ok(())
}

/// Maximum log file size before rotation (10 MB).
const MAX_LOG_SIZE: u64 = 10 * 1024 * 1024;

/// Number of rotated log files to keep (daemon.log.1, .2, .3).
const MAX_ROTATED_LOGS: u32 = 3;

/// Rotate the daemon log file if it exceeds [`MAX_LOG_SIZE`].
///
/// Shifts `daemon.log` → `daemon.log.1` → `daemon.log.2` → `daemon.log.3`,
/// deleting the oldest. Best-effort: rotation failures are ignored so the
/// daemon still starts.
fn rotate_log_if_needed(log_path: &std::path::Path) {
    let size = match std::fs::metadata(log_path) {
        Ok(m) => m.len(),
        Err(_) => return,
    };
    if size < MAX_LOG_SIZE {
        return;
    }

    let log_str = log_path.display().to_string();
    for i in (1..MAX_ROTATED_LOGS).rev() {
        let from = format!("{log_str}.{i}");
        let to = format!("{log_str}.{}", i + 1);
        let _ = std::fs::rename(&from, &to);
    }
    let _ = std::fs::rename(log_path, format!("{log_str}.1"));
}

/// Startup marker prefix written to the log before tracing initializes,
/// so the CLI can find where the current startup attempt begins.
const STARTUP_MARKER_PREFIX: &str = "--- musterd: starting (pid: ";

fn write_startup_marker(config: &Config) -> Result<(), LifecycleError> {
    use std::io::Write;

    if let Some(parent) = config.log_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&config.log_path)?;
    writeln!(file, "{}{}) ---\n", STARTUP_MARKER_PREFIX, std::process::id())?;
    Ok(())
}

fn setup_logging(
    config: &Config,
) -> Result<tracing_appender::non_blocking::WorkerGuard, LifecycleError> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    if let Some(parent) = config.log_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let file_appender = tracing_appender::rolling::never(
        config.log_path.parent().ok_or(LifecycleError::NoStateDir)?,
        config
            .log_path
            .file_name()
            .ok_or(LifecycleError::NoStateDir)?,
    );
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(non_blocking))
        .init();

    Ok(guard)
}
