// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Desktop notification adapters.
//!
//! Used only for human escalations (recovery failures, fatal monitor
//! errors); agent-to-agent notices travel through the message submitter.

mod desktop;
mod noop;

pub use desktop::DesktopNotifyAdapter;
pub use noop::NoOpNotifyAdapter;

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeNotifyAdapter, NotifyCall};

use async_trait::async_trait;
use thiserror::Error;

/// Errors from notify operations
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("send failed: {0}")]
    SendFailed(String),
}

/// Adapter for sending notifications to the human operator
#[async_trait]
pub trait NotifyAdapter: Clone + Send + Sync + 'static {
    /// Send a notification with a title and message body
    async fn notify(&self, title: &str, message: &str) -> Result<(), NotifyError>;
}
