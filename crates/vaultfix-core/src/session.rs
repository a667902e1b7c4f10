//! Session workspace and per-test directory allocation.
//!
//! One [`SessionWorkspace`] spans a whole suite run. Each test invocation
//! gets its own directory under the workspace root, named after the test and
//! its attempt number so reruns of the same test never collide. Retention at
//! teardown is decided from session-wide failure state: once anything in the
//! run has failed, every directory released afterwards is kept on disk for
//! postmortem inspection.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;

use crate::config::HarnessConfig;
use crate::error::{HarnessError, Result};

/// Root directory and shared state for one suite run.
pub struct SessionWorkspace {
    root: PathBuf,
    attempts: Mutex<HashMap<String, u32>>,
    failed: AtomicBool,
}

impl SessionWorkspace {
    /// Creates the session root under the configured base directory.
    ///
    /// # Errors
    /// Returns an error if the directory cannot be created.
    pub fn create(config: &HarnessConfig) -> Result<Arc<Self>> {
        let root = config
            .base_dir
            .join(format!("vaultfix-tests-{}", uuid::Uuid::new_v4().simple()));
        std::fs::create_dir_all(&root)?;

        tracing::info!(root = %root.display(), "created session workspace");

        Ok(Arc::new(Self {
            root,
            attempts: Mutex::new(HashMap::new()),
            failed: AtomicBool::new(false),
        }))
    }

    /// Returns the workspace root.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the next attempt number for a test identifier.
    ///
    /// Starts at 1 and increments on every call for the same identifier.
    /// The increment happens under one lock so concurrent test runners
    /// cannot lose updates.
    pub fn next_attempt(&self, test_id: &str) -> u32 {
        let mut attempts = self.attempts.lock();
        let count = attempts.entry(test_id.to_string()).or_insert(0);
        *count += 1;
        *count
    }

    /// Records that some test in this session has failed.
    ///
    /// Monotonic: there is no way to clear the flag. Every directory
    /// released after this point is retained, whatever its own outcome.
    pub fn record_failure(&self) {
        self.failed.store(true, Ordering::SeqCst);
    }

    /// Returns true if any test in this session has failed so far.
    #[must_use]
    pub fn failed(&self) -> bool {
        self.failed.load(Ordering::SeqCst)
    }

    /// Allocates the directory for one test invocation.
    ///
    /// The directory is `{root}/{test_id}_{attempt}`, created if missing.
    /// Creation is idempotent: a leftover directory from a prior crashed run
    /// with the same identifier and attempt is reused, contents untouched.
    ///
    /// # Errors
    /// Returns an error if the directory cannot be created.
    pub fn allocate(self: &Arc<Self>, test_id: &str) -> Result<TestDir> {
        let attempt = self.next_attempt(test_id);
        let path = self.root.join(format!("{test_id}_{attempt}"));
        std::fs::create_dir_all(&path)?;

        tracing::debug!(test = test_id, attempt, path = %path.display(), "allocated test directory");

        Ok(TestDir {
            path,
            test_id: test_id.to_string(),
            attempt,
            session: Arc::clone(self),
            released: false,
        })
    }

    /// Removes the workspace root if every test directory was cleaned up.
    ///
    /// A non-empty root is left on disk and its remaining entries logged.
    ///
    /// # Errors
    /// Returns an error if the root cannot be inspected or removed.
    pub fn close(&self) -> Result<()> {
        let entries: Vec<PathBuf> = std::fs::read_dir(&self.root)?
            .filter_map(|e| e.ok().map(|e| e.path()))
            .collect();

        if entries.is_empty() {
            std::fs::remove_dir(&self.root)?;
            tracing::info!(root = %self.root.display(), "removed empty session workspace");
        } else {
            tracing::info!(
                root = %self.root.display(),
                entries = ?entries,
                "leaving session workspace, still contains test directories"
            );
        }
        Ok(())
    }
}

/// A directory owned by exactly one test invocation.
///
/// Dropping without an explicit [`release`](Self::release) applies the same
/// retention policy best-effort, so a panicking test body still gets the
/// correct cleanup behavior; the explicit call is the error-surfacing path.
pub struct TestDir {
    path: PathBuf,
    test_id: String,
    attempt: u32,
    session: Arc<SessionWorkspace>,
    released: bool,
}

impl TestDir {
    /// Returns the directory path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the owning test identifier.
    #[must_use]
    pub fn test_id(&self) -> &str {
        &self.test_id
    }

    /// Returns the attempt number this directory belongs to.
    #[must_use]
    pub const fn attempt(&self) -> u32 {
        self.attempt
    }

    /// Applies the retention policy and consumes the directory handle.
    ///
    /// With no failure recorded in the session, the directory is deleted
    /// recursively; a delete that leaves files behind (say, a lingering
    /// process holding a handle) is fatal and the survivors are listed.
    /// With a failure recorded anywhere in the session, the directory is
    /// retained, even if the test that owned it passed.
    ///
    /// # Errors
    /// Returns [`HarnessError::Cleanup`] if deletion left files behind.
    pub fn release(mut self) -> Result<()> {
        self.released = true;
        self.apply_policy()
    }

    fn apply_policy(&self) -> Result<()> {
        if self.session.failed() {
            tracing::warn!(
                path = %self.path.display(),
                "session has failures, leaving directory intact"
            );
            return Ok(());
        }

        if let Err(e) = std::fs::remove_dir_all(&self.path) {
            let files = files_under(&self.path);
            tracing::error!(
                path = %self.path.display(),
                error = %e,
                files = ?files,
                "directory still contains files after removal attempt"
            );
            return Err(HarnessError::Cleanup {
                path: self.path.clone(),
                files,
            });
        }

        tracing::debug!(path = %self.path.display(), "removed test directory");
        Ok(())
    }
}

impl Drop for TestDir {
    fn drop(&mut self) {
        if !self.released {
            if let Err(e) = self.apply_policy() {
                tracing::error!(error = %e, "test directory cleanup failed during drop");
            }
        }
    }
}

/// Recursively lists files below a path, best-effort.
fn files_under(path: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();
    let Ok(entries) = std::fs::read_dir(path) else {
        return files;
    };
    for entry in entries.filter_map(|e| e.ok()) {
        let p = entry.path();
        if p.is_dir() {
            files.extend(files_under(&p));
        } else {
            files.push(p);
        }
    }
    files
}

#[cfg(test)]
mod tests {
    use super::*;

    fn workspace() -> (tempfile::TempDir, Arc<SessionWorkspace>) {
        let base = tempfile::tempdir().unwrap();
        let config = HarnessConfig {
            base_dir: base.path().to_path_buf(),
            ..Default::default()
        };
        let ws = SessionWorkspace::create(&config).unwrap();
        (base, ws)
    }

    #[test]
    fn test_attempts_increment_per_identifier() {
        let (_base, ws) = workspace();
        assert_eq!(ws.next_attempt("test_getinfo"), 1);
        assert_eq!(ws.next_attempt("test_getinfo"), 2);
        assert_eq!(ws.next_attempt("test_getinfo"), 3);
        assert_eq!(ws.next_attempt("test_listvaults"), 1);
    }

    #[test]
    fn test_allocations_never_collide() {
        let (_base, ws) = workspace();
        let a = ws.allocate("test_spend").unwrap();
        let b = ws.allocate("test_spend").unwrap();
        assert_ne!(a.path(), b.path());
        assert!(a.path().ends_with("test_spend_1"));
        assert!(b.path().ends_with("test_spend_2"));
    }

    #[test]
    fn test_allocate_reuses_leftover_directory() {
        let (_base, ws) = workspace();
        let leftover = ws.root().join("test_crashy_1");
        std::fs::create_dir_all(&leftover).unwrap();
        std::fs::write(leftover.join("stale.log"), b"prior run").unwrap();

        let dir = ws.allocate("test_crashy").unwrap();
        assert_eq!(dir.path(), leftover.as_path());
        // Existing content is preserved.
        assert_eq!(
            std::fs::read(dir.path().join("stale.log")).unwrap(),
            b"prior run"
        );
        ws.record_failure();
        dir.release().unwrap();
    }

    #[test]
    fn test_release_removes_directory_on_clean_session() {
        let (_base, ws) = workspace();
        let dir = ws.allocate("test_clean").unwrap();
        let path = dir.path().to_path_buf();
        std::fs::write(path.join("bitcoind.log"), b"log").unwrap();

        dir.release().unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn test_release_retains_directory_after_session_failure() {
        let (_base, ws) = workspace();
        ws.record_failure();

        // The owning test passed; the session did not. Retained anyway.
        let dir = ws.allocate("test_passing_after_failure").unwrap();
        let path = dir.path().to_path_buf();
        dir.release().unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_drop_applies_retention_policy() {
        let (_base, ws) = workspace();
        let path = {
            let dir = ws.allocate("test_dropped").unwrap();
            dir.path().to_path_buf()
            // dropped here without release()
        };
        assert!(!path.exists());
    }

    #[test]
    fn test_close_removes_empty_root() {
        let (_base, ws) = workspace();
        let root = ws.root().to_path_buf();
        ws.allocate("test_a").unwrap().release().unwrap();
        ws.close().unwrap();
        assert!(!root.exists());
    }

    #[test]
    fn test_close_leaves_nonempty_root() {
        let (_base, ws) = workspace();
        let root = ws.root().to_path_buf();
        ws.record_failure();
        ws.allocate("test_b").unwrap().release().unwrap();
        ws.close().unwrap();
        assert!(root.exists());
        assert!(root.join("test_b_1").exists());
    }

    #[test]
    fn test_concurrent_attempts_lose_no_updates() {
        let (_base, ws) = workspace();
        let mut handles = Vec::new();
        for _ in 0..8 {
            let ws = Arc::clone(&ws);
            handles.push(std::thread::spawn(move || {
                for _ in 0..100 {
                    ws.next_attempt("test_parallel");
                }
            }));
        }
        for h in handles {
            h.join().unwrap();
        }
        // 801 means all 800 increments landed.
        assert_eq!(ws.next_attempt("test_parallel"), 801);
    }
}
