//! Isolation guarantees across a whole simulated session.

#![allow(clippy::unwrap_used)]

use std::collections::HashMap;
use std::sync::Arc;

use proptest::prelude::*;
use vaultfix_core::{HarnessConfig, SessionWorkspace, TestFixture};

fn session_in(base: &std::path::Path) -> (HarnessConfig, Arc<SessionWorkspace>) {
    let config = HarnessConfig {
        base_dir: base.to_path_buf(),
        pool_workers: 2,
        ..Default::default()
    };
    let workspace = SessionWorkspace::create(&config).unwrap();
    (config, workspace)
}

/// A passes, B fails, C passes: A's directory is gone (session clean at its
/// teardown), B's and C's are retained (session failed from B onward), and
/// the session root survives non-empty.
#[test]
fn test_session_retention_follows_first_failure() {
    let base = tempfile::tempdir().unwrap();
    let (config, workspace) = session_in(base.path());
    let root = workspace.root().to_path_buf();

    let a = TestFixture::set_up(&workspace, &config, "test_a").unwrap();
    let a_path = a.dir().path().to_path_buf();
    a.tear_down(true).unwrap();
    assert!(!a_path.exists());

    let b = TestFixture::set_up(&workspace, &config, "test_b").unwrap();
    let b_path = b.dir().path().to_path_buf();
    b.tear_down(false).unwrap();
    assert!(b_path.exists());

    // C itself passes, but the session is already suspect.
    let c = TestFixture::set_up(&workspace, &config, "test_c").unwrap();
    let c_path = c.dir().path().to_path_buf();
    c.tear_down(true).unwrap();
    assert!(c_path.exists());

    workspace.close().unwrap();
    assert!(root.exists());
}

/// A fully clean session leaves nothing behind, root included.
#[test]
fn test_clean_session_leaves_no_trace() {
    let base = tempfile::tempdir().unwrap();
    let (config, workspace) = session_in(base.path());
    let root = workspace.root().to_path_buf();

    for name in ["test_a", "test_b", "test_a"] {
        let fixture = TestFixture::set_up(&workspace, &config, name).unwrap();
        fixture.tear_down(true).unwrap();
    }

    workspace.close().unwrap();
    assert!(!root.exists());
}

/// Reruns of the same test within a session get distinct directories.
#[test]
fn test_reruns_get_distinct_directories() {
    let base = tempfile::tempdir().unwrap();
    let (_config, workspace) = session_in(base.path());
    workspace.record_failure(); // retain everything so we can look at it

    let first = workspace.allocate("test_reorg").unwrap();
    let second = workspace.allocate("test_reorg").unwrap();
    let third = workspace.allocate("test_reorg").unwrap();

    assert!(first.path().ends_with("test_reorg_1"));
    assert!(second.path().ends_with("test_reorg_2"));
    assert!(third.path().ends_with("test_reorg_3"));

    first.release().unwrap();
    second.release().unwrap();
    third.release().unwrap();
}

proptest! {
    /// For any interleaving of test identifiers, each identifier observes
    /// attempt numbers 1..K in call order.
    #[test]
    fn prop_attempt_numbers_are_dense_per_identifier(
        ids in proptest::collection::vec("test_[a-d]", 1..50)
    ) {
        let base = tempfile::tempdir().unwrap();
        let (_config, workspace) = session_in(base.path());

        let mut expected: HashMap<String, u32> = HashMap::new();
        for id in &ids {
            let count = expected.entry(id.clone()).or_insert(0);
            *count += 1;
            prop_assert_eq!(workspace.next_attempt(id), *count);
        }
    }
}
