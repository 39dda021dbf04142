use std::path::PathBuf;

use tempfile::TempDir;
use todo_store::{CommitMode, Database, DatabaseConfig};

/// Temporary file-backed SQLite database for integration tests.
///
/// The directory (and the database in it) is removed on drop.
pub struct TempDb {
    dir: TempDir,
    db: Database,
}

impl TempDb {
    pub fn create(name: &str) -> Self {
        Self::with_config(name, |_| {})
    }

    pub fn with_commit_mode(name: &str, commit: CommitMode) -> Self {
        Self::with_config(name, |config| config.commit = commit)
    }

    pub fn with_config(name: &str, adjust: impl FnOnce(&mut DatabaseConfig)) -> Self {
        let dir = tempfile::Builder::new()
            .prefix(&format!("todo-store-{name}-"))
            .tempdir()
            .expect("create temp dir");
        let mut config = DatabaseConfig::with_url(Self::url_in(&dir));
        adjust(&mut config);
        let db = Database::connect(&config).expect("connect temp database");
        Self { dir, db }
    }

    /// Filesystem path of the database file.
    pub fn path(&self) -> PathBuf {
        self.dir.path().join("todo.db")
    }

    fn url_in(dir: &TempDir) -> String {
        format!("sqlite:///{}", dir.path().join("todo.db").display())
    }

    /// Connection URI of the database file.
    pub fn url(&self) -> String {
        Self::url_in(&self.dir)
    }

    pub fn db(&self) -> &Database {
        &self.db
    }

    /// Panics if any session still holds a connection.
    pub fn assert_no_leaked_sessions(&self) {
        let state = self.db.state();
        assert_eq!(
            state.in_use(),
            0,
            "expected every connection back in the pool, got {state:?}"
        );
    }
}
