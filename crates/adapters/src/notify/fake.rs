// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake notification adapter for testing
#![cfg_attr(coverage_nightly, coverage(off))]

use super::{NotifyAdapter, NotifyError};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;

/// Recorded notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotifyCall {
    pub title: String,
    pub message: String,
}

/// Fake notification adapter that records every call.
#[derive(Clone, Default)]
pub struct FakeNotifyAdapter {
    calls: Arc<Mutex<Vec<NotifyCall>>>,
    fail: Arc<Mutex<bool>>,
}

impl FakeNotifyAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<NotifyCall> {
        self.calls.lock().clone()
    }

    pub fn set_fail(&self, fail: bool) {
        *self.fail.lock() = fail;
    }
}

#[async_trait]
impl NotifyAdapter for FakeNotifyAdapter {
    async fn notify(&self, title: &str, message: &str) -> Result<(), NotifyError> {
        if *self.fail.lock() {
            return Err(NotifyError::SendFailed("injected failure".into()));
        }
        self.calls.lock().push(NotifyCall {
            title: title.to_string(),
            message: message.to_string(),
        });
        Ok(())
    }
}
