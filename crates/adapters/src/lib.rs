// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Adapters for external I/O: the terminal multiplexer and desktop
//! notifications. Everything else talks to these through traits so tests
//! run against fakes.

pub mod notify;
pub mod terminal;

pub use notify::{DesktopNotifyAdapter, NoOpNotifyAdapter, NotifyAdapter};
pub use terminal::{Key, TerminalDriver, TerminalError, TmuxDriver, WindowInfo};

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
pub use notify::{FakeNotifyAdapter, NotifyCall};
#[cfg(any(test, feature = "test-support"))]
pub use terminal::{DriverCall, FakeDriver, FakePane};
