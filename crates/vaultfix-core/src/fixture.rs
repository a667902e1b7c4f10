//! Per-test fixture composition.
//!
//! Ties the isolation pieces together in the order a test needs them: a
//! directory allocated for this attempt, verbose daemon backtraces for the
//! duration of the body, and a task pool named after the test. Teardown runs
//! the pieces in reverse, applying the session-wide retention policy last.

use std::sync::Arc;

use crate::config::HarnessConfig;
use crate::diag::BacktraceGuard;
use crate::error::Result;
use crate::pool::TaskPool;
use crate::session::{SessionWorkspace, TestDir};

/// Everything one test invocation owns.
pub struct TestFixture {
    test_name: String,
    session: Arc<SessionWorkspace>,
    dir: Option<TestDir>,
    pool: Option<TaskPool>,
    _backtrace: BacktraceGuard,
}

impl TestFixture {
    /// Sets up the fixture for one test invocation.
    ///
    /// Allocation failures abort the test before the body runs; no
    /// half-built fixture is ever yielded.
    ///
    /// # Errors
    /// Returns an error if the directory or pool cannot be created.
    pub fn set_up(
        workspace: &Arc<SessionWorkspace>,
        config: &HarnessConfig,
        test_name: &str,
    ) -> Result<Self> {
        let backtrace = BacktraceGuard::enable();
        let dir = workspace.allocate(test_name)?;
        let pool = TaskPool::new(test_name, config.pool_workers)?;

        Ok(Self {
            test_name: test_name.to_string(),
            session: Arc::clone(workspace),
            dir: Some(dir),
            pool: Some(pool),
            _backtrace: backtrace,
        })
    }

    /// Returns the test's directory.
    ///
    /// # Panics
    /// Panics only after `tear_down`, which consumes the fixture; the
    /// directory is present for the fixture's whole usable lifetime.
    #[must_use]
    #[allow(clippy::unwrap_used)]
    pub fn dir(&self) -> &TestDir {
        self.dir.as_ref().unwrap()
    }

    /// Returns the test's task pool.
    ///
    /// # Panics
    /// Same caveat as [`dir`](Self::dir); unreachable in practice.
    #[must_use]
    #[allow(clippy::unwrap_used)]
    pub fn pool(&self) -> &TaskPool {
        self.pool.as_ref().unwrap()
    }

    /// Returns the owning test's name.
    #[must_use]
    pub fn test_name(&self) -> &str {
        &self.test_name
    }

    /// Tears the fixture down after the test body has finished.
    ///
    /// A failed outcome is recorded against the whole session before the
    /// directory is released, so this and every later directory is retained.
    /// The pool is shut down without waiting; in-flight tasks may outlive
    /// the test.
    ///
    /// # Errors
    /// Returns an error if directory cleanup fails on a clean session.
    pub fn tear_down(mut self, passed: bool) -> Result<()> {
        if !passed {
            tracing::warn!(test = %self.test_name, "test failed, recording session failure");
            self.session.record_failure();
        }

        if let Some(pool) = self.pool.take() {
            pool.shutdown(false);
        }
        if let Some(dir) = self.dir.take() {
            dir.release()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::SessionWorkspace;

    fn setup() -> (tempfile::TempDir, HarnessConfig, Arc<SessionWorkspace>) {
        let base = tempfile::tempdir().unwrap();
        let config = HarnessConfig {
            base_dir: base.path().to_path_buf(),
            pool_workers: 2,
            ..Default::default()
        };
        let ws = SessionWorkspace::create(&config).unwrap();
        (base, config, ws)
    }

    #[test]
    fn test_set_up_allocates_everything() {
        let _env = crate::test_util::ENV_LOCK.lock();
        let (_base, config, ws) = setup();
        let fixture = TestFixture::set_up(&ws, &config, "test_getinfo").unwrap();

        assert!(fixture.dir().path().exists());
        assert!(fixture.dir().path().ends_with("test_getinfo_1"));
        assert_eq!(fixture.pool().name(), "test_getinfo");
        assert_eq!(std::env::var("RUST_BACKTRACE").unwrap(), "1");

        fixture.tear_down(true).unwrap();
    }

    #[test]
    fn test_tear_down_pass_removes_directory() {
        let _env = crate::test_util::ENV_LOCK.lock();
        let (_base, config, ws) = setup();
        let fixture = TestFixture::set_up(&ws, &config, "test_pass").unwrap();
        let path = fixture.dir().path().to_path_buf();
        fixture.tear_down(true).unwrap();
        assert!(!path.exists());
        assert!(!ws.failed());
    }

    #[test]
    fn test_tear_down_failure_retains_directory() {
        let _env = crate::test_util::ENV_LOCK.lock();
        let (_base, config, ws) = setup();
        let fixture = TestFixture::set_up(&ws, &config, "test_fail").unwrap();
        let path = fixture.dir().path().to_path_buf();
        fixture.tear_down(false).unwrap();
        assert!(path.exists());
        assert!(ws.failed());
    }
}
