// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Unix-socket listener: accepts CLI connections and answers requests
//! against the running monitor.

use crate::protocol::{Request, Response, StatusData};
use crate::wire::{self, DEFAULT_TIMEOUT, PROTOCOL_VERSION};
use muster_core::AgentTarget;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use std::time::Instant;
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use muster_adapters::{NotifyAdapter, TerminalDriver};
use muster_core::Clock;
use muster_engine::MonitorService;

/// Shared context for request handling.
pub struct ListenCtx<D: TerminalDriver, N: NotifyAdapter, C: Clock> {
    pub monitor: Arc<MonitorService<D, N, C>>,
    pub monitor_task: Mutex<Option<JoinHandle<()>>>,
    pub start_time: Instant,
    pub shutdown: Arc<Notify>,
}

pub struct Listener<D: TerminalDriver, N: NotifyAdapter, C: Clock> {
    listener: UnixListener,
    ctx: Arc<ListenCtx<D, N, C>>,
}

impl<D: TerminalDriver, N: NotifyAdapter, C: Clock> Listener<D, N, C> {
    pub fn new(listener: UnixListener, ctx: Arc<ListenCtx<D, N, C>>) -> Self {
        Self { listener, ctx }
    }

    /// Accept loop. One task per connection; connections are short-lived
    /// (one request, one response).
    pub async fn run(self) {
        loop {
            match self.listener.accept().await {
                Ok((stream, _addr)) => {
                    let ctx = Arc::clone(&self.ctx);
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(stream, ctx).await {
                            debug!(error = %e, "connection handling failed");
                        }
                    });
                }
                Err(e) => {
                    warn!(error = %e, "accept failed");
                    tokio::time::sleep(Duration::from_millis(100)).await;
                }
            }
        }
    }
}

async fn handle_connection<D: TerminalDriver, N: NotifyAdapter, C: Clock>(
    mut stream: UnixStream,
    ctx: Arc<ListenCtx<D, N, C>>,
) -> Result<(), crate::wire::ProtocolError> {
    let request: Request = wire::read_with_timeout(&mut stream, DEFAULT_TIMEOUT).await?;
    debug!(?request, "request received");
    let response = handle_request(request, &ctx).await;
    wire::write_with_timeout(&mut stream, &response, DEFAULT_TIMEOUT).await
}

/// Answer one request. Submissions can outlast the IPC timeout budget, so
/// the write timeout is generous only for those.
pub async fn handle_request<D: TerminalDriver, N: NotifyAdapter, C: Clock>(
    request: Request,
    ctx: &ListenCtx<D, N, C>,
) -> Response {
    match request {
        Request::Ping => Response::Pong,

        Request::Hello { version } => {
            if version != PROTOCOL_VERSION {
                warn!(cli = %version, daemon = PROTOCOL_VERSION, "version mismatch");
            }
            Response::Hello {
                version: PROTOCOL_VERSION.to_string(),
            }
        }

        Request::Status => Response::Status(Box::new(StatusData {
            version: PROTOCOL_VERSION.to_string(),
            pid: std::process::id(),
            uptime_secs: ctx.start_time.elapsed().as_secs(),
            monitor: ctx.monitor.status(),
        })),

        Request::MonitorStart => {
            let mut task = ctx.monitor_task.lock();
            let running = task.as_ref().is_some_and(|t| !t.is_finished());
            if running {
                return Response::error("monitor already running", "validation_error");
            }
            let monitor = Arc::clone(&ctx.monitor);
            *task = Some(tokio::spawn(async move { monitor.run().await }));
            Response::Ok
        }

        Request::MonitorStop => {
            ctx.monitor.stop();
            Response::Ok
        }

        Request::AgentList => Response::Agents {
            agents: ctx.monitor.registry().snapshot_all(),
        },

        Request::AgentInfo { target } => match parse_target(&target) {
            Ok(target) => match ctx.monitor.registry().get(&target) {
                Some(agent) => Response::Agent {
                    agent: Box::new(agent),
                },
                None => Response::error(format!("no such agent: {target}"), "not_found"),
            },
            Err(response) => response,
        },

        Request::AgentSend {
            target,
            message,
            delay_hint_ms,
        } => match parse_target(&target) {
            Ok(target) => {
                let outcome = ctx
                    .monitor
                    .submitter()
                    .submit(
                        &target,
                        &message,
                        delay_hint_ms.map(Duration::from_millis),
                    )
                    .await;
                Response::Submitted { outcome }
            }
            Err(response) => response,
        },

        Request::AgentKill { target } => match parse_target(&target) {
            Ok(target) => {
                let result = async {
                    let lease = ctx.monitor.context().pool.acquire().await?;
                    lease
                        .kill_window(&target)
                        .await
                        .map_err(muster_engine::EngineError::Terminal)
                }
                .await;
                match result {
                    Ok(()) => Response::Ok,
                    Err(e) => Response::error(e.to_string(), e.error_type()),
                }
            }
            Err(response) => response,
        },

        Request::Recover { target } => match parse_target(&target) {
            Ok(target) => match ctx.monitor.recovery().recover(&target).await {
                Ok(events) => Response::Events { events },
                Err(e) => Response::error(e.to_string(), e.error_type()),
            },
            Err(response) => response,
        },

        Request::RecoveryEnable { enabled } => {
            ctx.monitor.set_recovery_enabled(enabled);
            Response::Ok
        }

        Request::ErrorsList { limit } => Response::Errors {
            entries: ctx.monitor.errors().list(limit),
        },

        Request::ErrorsShow { id } => match ctx.monitor.errors().get(id) {
            Some(entry) => Response::Errors {
                entries: vec![entry],
            },
            None => Response::error(format!("no error entry {id}"), "not_found"),
        },

        Request::ErrorsClear => Response::Cleared {
            count: ctx.monitor.errors().clear(),
        },

        Request::ErrorsSummary => Response::ErrorsSummary {
            summary: ctx.monitor.errors().summary(),
        },

        Request::Shutdown => {
            ctx.shutdown.notify_waiters();
            Response::Ok
        }
    }
}

fn parse_target(raw: &str) -> Result<AgentTarget, Response> {
    raw.parse()
        .map_err(|e: muster_core::TargetParseError| {
            Response::error(e.to_string(), "invalid_target_format")
        })
}

#[cfg(test)]
#[path = "listener_tests.rs"]
mod tests;
