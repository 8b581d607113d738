// SPDX-FileCopyrightText: 2026 Zapkeep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Registry behaviour across process restarts, using the file backend.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use zapkeep_core::StoreBackend;
use zapkeep_store::{FileStore, SessionTokenRegistry};

fn open(dir: &std::path::Path) -> SessionTokenRegistry {
    let backend: Arc<dyn StoreBackend> = Arc::new(FileStore::open(dir).unwrap());
    SessionTokenRegistry::new(backend)
}

/// A session created before a restart comes back with the same credential.
#[tokio::test]
async fn create_restart_restore_returns_identical_blob() {
    let dir = tempfile::tempdir().unwrap();

    let created = {
        let registry = open(dir.path());
        let token = registry.create_session("A").await.unwrap();
        registry.bind_identity("A", "5511@c.us").await.unwrap();
        token
    };

    let registry = open(dir.path());
    let restored = registry.restore_all(&CancellationToken::new()).await.unwrap();
    assert_eq!(restored.len(), 1);
    assert_eq!(restored[0].name, "A");
    assert_eq!(restored[0].credential, created.credential);
    assert_eq!(restored[0].created_at, created.created_at);
    assert_eq!(registry.self_identity("A").await.as_deref(), Some("5511@c.us"));
}

/// A corrupt file is skipped while its neighbours are restored.
#[tokio::test]
async fn corrupt_file_is_skipped_on_restore() {
    let dir = tempfile::tempdir().unwrap();
    {
        let registry = open(dir.path());
        registry.create_session("good").await.unwrap();
    }
    std::fs::write(dir.path().join("bad.token"), b"\x00\x01garbage").unwrap();

    let registry = open(dir.path());
    let restored = registry.restore_all(&CancellationToken::new()).await.unwrap();
    let names: Vec<_> = restored.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, vec!["good"]);
}

/// Revoking removes the file so a restart does not resurrect the session.
#[tokio::test]
async fn revoked_session_stays_gone_after_restart() {
    let dir = tempfile::tempdir().unwrap();
    {
        let registry = open(dir.path());
        registry.create_session("A").await.unwrap();
        registry.create_session("B").await.unwrap();
        registry.revoke("A").await.unwrap();
    }

    let registry = open(dir.path());
    let restored = registry.restore_all(&CancellationToken::new()).await.unwrap();
    assert_eq!(restored.len(), 1);
    assert_eq!(restored[0].name, "B");
    assert!(!dir.path().join("A.token").exists());
}
