use tempfile::TempDir;

use crate::db::Repository;

/// A repository backed by a fresh database file; keep the dir alive for the test.
pub async fn temp_repository() -> (Repository, TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("guest_book.db");
    let repo = Repository::new(path.to_str().unwrap()).await.unwrap();
    (repo, dir)
}
