//! Scoped diagnostic verbosity toggle.
//!
//! Daemons spawned during a test inherit the harness environment, so turning
//! `RUST_BACKTRACE` on for the duration of one test makes their failure
//! output useful. The guard captures the previous value and restores it on
//! every exit path, including panics.
//!
//! The toggle is process-wide. Running tests concurrently in one process
//! with differing desired values is unsupported; this is a documented
//! constraint of environment inheritance, not a bug.

/// The environment variable controlled by [`BacktraceGuard`].
pub const BACKTRACE_VAR: &str = "RUST_BACKTRACE";

/// RAII guard enabling verbose daemon backtraces for one test.
#[must_use = "the guard restores the previous value when dropped"]
pub struct BacktraceGuard {
    previous: String,
}

impl BacktraceGuard {
    /// Captures the current `RUST_BACKTRACE` value (default "0") and sets
    /// it to "1" until the guard is dropped.
    pub fn enable() -> Self {
        let previous = std::env::var(BACKTRACE_VAR).unwrap_or_else(|_| "0".to_string());
        set_backtrace("1");
        Self { previous }
    }

    /// Returns the value that will be restored on drop.
    #[must_use]
    pub fn previous(&self) -> &str {
        &self.previous
    }
}

impl Drop for BacktraceGuard {
    fn drop(&mut self) {
        set_backtrace(&self.previous);
    }
}

#[allow(unsafe_code)]
fn set_backtrace(value: &str) {
    // SAFETY: the harness owns the process environment while tests run
    // sequentially; see the module constraint on concurrent use.
    unsafe { std::env::set_var(BACKTRACE_VAR, value) };
}
