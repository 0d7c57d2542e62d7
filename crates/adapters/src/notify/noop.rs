// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! No-op notification adapter for headless environments.

use super::{NotifyAdapter, NotifyError};
use async_trait::async_trait;

#[derive(Clone, Copy, Debug, Default)]
pub struct NoOpNotifyAdapter;

impl NoOpNotifyAdapter {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl NotifyAdapter for NoOpNotifyAdapter {
    async fn notify(&self, title: &str, _message: &str) -> Result<(), NotifyError> {
        tracing::debug!(%title, "notification suppressed (noop adapter)");
        Ok(())
    }
}
