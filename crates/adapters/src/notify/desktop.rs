// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Desktop notification adapter using notify-rust.
//!
//! On macOS the first notification triggers an AppleScript bundle-identifier
//! lookup that blocks forever in a daemon process without Automation
//! permissions; the identifier is pre-set at construction to skip it.

use super::{NotifyAdapter, NotifyError};
use async_trait::async_trait;

#[derive(Clone, Copy, Debug, Default)]
pub struct DesktopNotifyAdapter;

impl DesktopNotifyAdapter {
    pub fn new() -> Self {
        #[cfg(target_os = "macos")]
        {
            let _ = mac_notification_sys::set_application("com.apple.Terminal");
        }
        Self
    }
}

#[async_trait]
impl NotifyAdapter for DesktopNotifyAdapter {
    async fn notify(&self, title: &str, message: &str) -> Result<(), NotifyError> {
        let title = title.to_string();
        let message = message.to_string();
        // Notification::show() is synchronous on macOS; run it fire-and-forget
        // on the blocking pool so the monitor loop never stalls on it.
        tokio::task::spawn_blocking(move || {
            match notify_rust::Notification::new()
                .summary(&title)
                .body(&message)
                .show()
            {
                Ok(_) => tracing::debug!(%title, "desktop notification sent"),
                Err(e) => tracing::warn!(%title, error = %e, "desktop notification failed"),
            }
        });
        Ok(())
    }
}
