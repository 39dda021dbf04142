//! Database connection management using Diesel ORM.
//!
//! [`Database`] is the process-wide engine handle: an `r2d2` pool of SQLite
//! connections plus the commit policy handed to every [`Session`] it issues.
//! It is cheap to clone and is meant to be built once at start-up and passed
//! to whatever needs storage.

use std::fmt;
use std::time::Duration;

use diesel::connection::SimpleConnection;
use diesel::r2d2::{
    ConnectionManager, CustomizeConnection, ManageConnection, Pool, R2D2Connection,
};
use diesel::SqliteConnection;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use tracing::{debug, info};

use super::session::Session;
use crate::config::{CommitMode, DatabaseConfig};
use crate::error::{Error, Result};

/// Embedded database migrations compiled from the migrations/ directory.
pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

/// Type alias for a SQLite connection pool.
pub type DbPool = Pool<SqliteManager>;

/// Diesel's connection manager, with one change for in-memory databases.
///
/// Diesel discards any connection returned while the thread is panicking.
/// For `:memory:` that connection is the whole database, so it is kept as
/// long as its transaction state is clean; sessions roll back on drop before
/// the connection is returned.
pub struct SqliteManager {
    inner: ConnectionManager<SqliteConnection>,
    in_memory: bool,
}

impl SqliteManager {
    fn new(url: &str) -> Self {
        Self {
            inner: ConnectionManager::new(url),
            in_memory: is_in_memory(url),
        }
    }
}

impl ManageConnection for SqliteManager {
    type Connection = SqliteConnection;
    type Error = diesel::r2d2::Error;

    fn connect(&self) -> std::result::Result<SqliteConnection, Self::Error> {
        self.inner.connect()
    }

    fn is_valid(&self, conn: &mut SqliteConnection) -> std::result::Result<(), Self::Error> {
        self.inner.is_valid(conn)
    }

    fn has_broken(&self, conn: &mut SqliteConnection) -> bool {
        if self.in_memory {
            conn.is_broken()
        } else {
            self.inner.has_broken(conn)
        }
    }
}

impl fmt::Debug for SqliteManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SqliteManager")
            .field("in_memory", &self.in_memory)
            .finish()
    }
}

/// Pragmas applied to every new pooled connection.
#[derive(Debug, Clone, Copy)]
struct ConnectionOptions {
    busy_timeout: Duration,
}

impl CustomizeConnection<SqliteConnection, diesel::r2d2::Error> for ConnectionOptions {
    fn on_acquire(
        &self,
        conn: &mut SqliteConnection,
    ) -> std::result::Result<(), diesel::r2d2::Error> {
        conn.batch_execute(&format!(
            "PRAGMA busy_timeout = {}; PRAGMA foreign_keys = ON;",
            self.busy_timeout.as_millis()
        ))
        .map_err(diesel::r2d2::Error::QueryError)
    }
}

/// Connection counts reported by the pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolState {
    /// Connections currently open, idle or checked out.
    pub connections: u32,
    /// Connections sitting idle in the pool.
    pub idle: u32,
}

impl PoolState {
    /// Connections checked out by live sessions.
    #[must_use]
    pub fn in_use(&self) -> u32 {
        self.connections.saturating_sub(self.idle)
    }
}

/// Translate a connection URI into the form Diesel's SQLite backend opens.
///
/// SQLAlchemy-style URLs are accepted: `sqlite:///todo.db` is a relative
/// path, `sqlite:////var/todo.db` an absolute one and a bare `sqlite://` is
/// an in-memory database. Anything else is passed through unchanged.
#[must_use]
pub fn database_url(url: &str) -> String {
    let url = url.trim();
    if url == "sqlite://" || url == "sqlite:///:memory:" {
        return ":memory:".to_string();
    }
    match url.strip_prefix("sqlite:///") {
        Some(path) => path.to_string(),
        None => url.to_string(),
    }
}

fn is_in_memory(url: &str) -> bool {
    url == ":memory:" || url.starts_with("file::memory:") || url.contains("mode=memory")
}

/// Process-wide handle to the todo database.
#[derive(Clone)]
pub struct Database {
    pool: DbPool,
    commit_mode: CommitMode,
}

impl Database {
    /// Build the connection pool described by `config`.
    ///
    /// In-memory databases get a single connection that is never recycled,
    /// since each SQLite connection to `:memory:` is a separate database.
    ///
    /// # Errors
    /// Returns [`Error::StorageUnavailable`] if the database cannot be
    /// opened, or a migration error if `run_migrations` is set and fails.
    pub fn connect(config: &DatabaseConfig) -> Result<Self> {
        config.validate()?;

        let url = database_url(&config.url);
        let in_memory = is_in_memory(&url);
        let max_size = if in_memory { 1 } else { config.pool_size };

        let mut builder = Pool::builder()
            .max_size(max_size)
            .connection_timeout(config.connection_timeout())
            .connection_customizer(Box::new(ConnectionOptions {
                busy_timeout: config.busy_timeout(),
            }));
        if in_memory {
            builder = builder.idle_timeout(None).max_lifetime(None);
        }

        let pool = builder
            .build(SqliteManager::new(&url))
            .map_err(|e| Error::StorageUnavailable(e.to_string()))?;
        debug!(url = %url, max_size, "created sqlite pool");

        let database = Self {
            pool,
            commit_mode: config.commit,
        };
        if config.run_migrations {
            database.run_migrations()?;
        }
        Ok(database)
    }

    /// Connect with default settings.
    ///
    /// # Errors
    /// See [`Database::connect`].
    pub fn open(url: &str) -> Result<Self> {
        Self::connect(&DatabaseConfig::with_url(url))
    }

    /// Run all pending database migrations.
    ///
    /// # Errors
    /// Returns an error if no connection is available or a migration fails.
    pub fn run_migrations(&self) -> Result<()> {
        let mut conn = self.pool.get()?;
        let conn: &mut SqliteConnection = &mut conn;
        let applied = conn
            .run_pending_migrations(MIGRATIONS)
            .map_err(|e| Error::Migration(e.to_string()))?;
        if !applied.is_empty() {
            info!(count = applied.len(), "applied database migrations");
        }
        Ok(())
    }

    /// Check out a connection and start a unit of work on it.
    ///
    /// The returned [`Session`] rolls back uncommitted work and returns its
    /// connection to the pool when dropped. When every connection is in use
    /// this blocks until one is released or the connection timeout expires.
    ///
    /// # Errors
    /// Returns [`Error::StorageUnavailable`] if no connection can be obtained.
    pub fn acquire_session(&self) -> Result<Session> {
        let conn = self.pool.get()?;
        Session::begin(conn, self.commit_mode)
    }

    /// Run `f` inside a session that is always released afterwards.
    ///
    /// With [`CommitMode::OnSuccess`] the work is committed when `f` returns
    /// `Ok` and rolled back when it returns `Err`. With [`CommitMode::Manual`]
    /// only what `f` committed itself is kept.
    ///
    /// # Errors
    /// Returns the error from acquiring the session, from `f`, or from
    /// ending the transaction.
    pub fn with_session<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Session) -> Result<T>,
    {
        let mut session = self.acquire_session()?;
        let value = f(&mut session)?;
        session.close()?;
        Ok(value)
    }

    #[must_use]
    pub fn commit_mode(&self) -> CommitMode {
        self.commit_mode
    }

    #[must_use]
    pub fn state(&self) -> PoolState {
        let state = self.pool.state();
        PoolState {
            connections: state.connections,
            idle: state.idle_connections,
        }
    }
}

impl fmt::Debug for Database {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Database")
            .field("commit_mode", &self.commit_mode)
            .field("state", &self.state())
            .finish()
    }
}
