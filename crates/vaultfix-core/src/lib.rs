// Allow unwrap/expect in tests for clear failure messages
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used, clippy::panic))]

//! # vaultfix-core
//!
//! Per-test isolation and lifecycle primitives for the vaultfix harness.
//!
//! This crate provides the pieces that keep repeated, retried and partially
//! failed integration-test runs from interfering with each other:
//!
//! - [`SessionWorkspace`] — one root directory per suite run, with the
//!   process-wide attempt counter and session failure state
//! - [`TestDir`] — a deterministic `{test}_{attempt}` directory with
//!   outcome-dependent retention at teardown
//! - [`BacktraceGuard`] — scoped `RUST_BACKTRACE` override inherited by
//!   spawned daemons
//! - [`TaskPool`] — fixed-size named worker pool for concurrent
//!   daemon-driving actions within one test
//! - [`TestFixture`] — the per-test composition of all of the above
//!
//! ## Retention policy
//!
//! Retention is decided from session-wide failure state, not the owning
//! test's own outcome: once one test fails, every directory released
//! afterwards is kept for forensic inspection, including those of passing
//! tests. This bias toward generous retention is deliberate.

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod diag;
pub mod error;
pub mod fixture;
pub mod pool;
pub mod session;

pub use config::{HarnessConfig, PostgresCreds};
pub use diag::BacktraceGuard;
pub use error::{HarnessError, Result};
pub use fixture::TestFixture;
pub use pool::{TaskHandle, TaskPool};
pub use session::{SessionWorkspace, TestDir};
