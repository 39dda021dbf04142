//! Scoped units of work over a pooled connection.
//!
//! A [`Session`] owns one pooled connection and an open transaction for as
//! long as it lives. Dropping it rolls back whatever has not been committed
//! and hands the connection back to the pool, so release happens on every
//! exit path: normal return, `?`, or unwinding.

use diesel::connection::{AnsiTransactionManager, TransactionManager};
use diesel::prelude::*;
use diesel::r2d2::PooledConnection;
use diesel::SqliteConnection;
use tracing::{trace, warn};

use super::connection::SqliteManager;
use super::model::{LastInsertRowId, TodoRow};
use super::schema::todo_items;
use crate::config::CommitMode;
use crate::domain::TodoItem;
use crate::error::{Error, Result};

type PooledSqlite = PooledConnection<SqliteManager>;

/// A unit of work bound to one database connection.
///
/// Obtained from [`Database::acquire_session`](super::Database::acquire_session)
/// or [`Database::with_session`](super::Database::with_session).
pub struct Session {
    conn: PooledSqlite,
    commit_mode: CommitMode,
    in_transaction: bool,
}

impl Session {
    pub(crate) fn begin(conn: PooledSqlite, commit_mode: CommitMode) -> Result<Self> {
        let mut session = Self {
            conn,
            commit_mode,
            in_transaction: false,
        };
        // A lock held past busy_timeout leaves the caller without storage.
        session.begin_transaction().map_err(|e| match e {
            Error::Database(msg) => Error::StorageUnavailable(msg),
            other => other,
        })?;
        trace!(?commit_mode, "session acquired");
        Ok(session)
    }

    // IMMEDIATE takes the write lock at BEGIN; concurrent sessions queue on
    // busy_timeout.
    fn begin_transaction(&mut self) -> Result<()> {
        AnsiTransactionManager::begin_transaction_sql(&mut *self.conn, "BEGIN IMMEDIATE")?;
        self.in_transaction = true;
        Ok(())
    }

    fn finish_transaction(&mut self, commit: bool) -> Result<()> {
        if !self.in_transaction {
            return Ok(());
        }
        let conn: &mut SqliteConnection = &mut self.conn;
        let result = if commit {
            AnsiTransactionManager::commit_transaction(conn)
        } else {
            AnsiTransactionManager::rollback_transaction(conn)
        };
        if result.is_err() {
            // A failed COMMIT can leave the transaction open.
            let _ = AnsiTransactionManager::rollback_transaction(conn);
        }
        self.in_transaction = false;
        result.map_err(Error::from)
    }

    /// Connection for CRUD work, refused once the transaction is lost.
    fn unit_of_work(&mut self) -> Result<&mut SqliteConnection> {
        if !self.in_transaction {
            return Err(Error::NoTransaction);
        }
        Ok(&mut self.conn)
    }

    /// Commit the work done so far and start a new transaction.
    ///
    /// A new transaction is started even when the commit fails, so later
    /// work never runs outside one. If that also fails the session refuses
    /// further work with [`Error::NoTransaction`].
    ///
    /// # Errors
    /// Returns the commit error, or the error from starting the next
    /// transaction.
    pub fn commit(&mut self) -> Result<()> {
        let committed = self.finish_transaction(true);
        let restarted = self.begin_transaction();
        committed.and(restarted)
    }

    /// Discard the work done since the last commit and start over.
    ///
    /// # Errors
    /// Returns the rollback error, or the error from starting the next
    /// transaction.
    pub fn rollback(&mut self) -> Result<()> {
        let rolled_back = self.finish_transaction(false);
        let restarted = self.begin_transaction();
        rolled_back.and(restarted)
    }

    /// Release the session, committing first under [`CommitMode::OnSuccess`].
    ///
    /// # Errors
    /// Returns an error if ending the transaction fails, or
    /// [`Error::NoTransaction`] if it was already lost. The connection is
    /// returned to the pool either way.
    pub fn close(mut self) -> Result<()> {
        if !self.in_transaction {
            return Err(Error::NoTransaction);
        }
        let commit = self.commit_mode == CommitMode::OnSuccess;
        self.finish_transaction(commit)
    }

    #[must_use]
    pub fn commit_mode(&self) -> CommitMode {
        self.commit_mode
    }

    /// The underlying connection, inside this session's transaction while
    /// it is open.
    pub fn connection(&mut self) -> &mut SqliteConnection {
        &mut self.conn
    }

    /// Insert an unsaved item and record its new id on it.
    ///
    /// # Errors
    /// Returns [`Error::AlreadyPersisted`] if the item already has an id and
    /// [`Error::ConstraintViolation`] if storage rejects the row.
    pub fn add(&mut self, item: &mut TodoItem) -> Result<i64> {
        if let Some(id) = item.id() {
            return Err(Error::AlreadyPersisted { id });
        }

        diesel::insert_into(todo_items::table)
            .values(item.to_new_row())
            .execute(self.unit_of_work()?)?;
        let id = diesel::sql_query("SELECT last_insert_rowid() AS id")
            .get_result::<LastInsertRowId>(self.unit_of_work()?)?
            .id;

        item.assign_id(id);
        Ok(id)
    }

    /// Load an item, or `None` if no row has this id.
    ///
    /// # Errors
    /// Returns an error if the query fails.
    pub fn find(&mut self, id: i64) -> Result<Option<TodoItem>> {
        let row = todo_items::table
            .find(id)
            .select(TodoRow::as_select())
            .first(self.unit_of_work()?)
            .optional()?;
        Ok(row.map(TodoItem::from))
    }

    /// Load an item by id.
    ///
    /// # Errors
    /// Returns [`Error::NotFound`] if no row has this id.
    pub fn get(&mut self, id: i64) -> Result<TodoItem> {
        self.find(id)?.ok_or(Error::NotFound { id })
    }

    /// All items in id order.
    ///
    /// # Errors
    /// Returns an error if the query fails.
    pub fn list(&mut self) -> Result<Vec<TodoItem>> {
        let rows = todo_items::table
            .order(todo_items::id.asc())
            .select(TodoRow::as_select())
            .load(self.unit_of_work()?)?;
        Ok(rows.into_iter().map(TodoItem::from).collect())
    }

    /// Write an item's `text` and `done` back to its row.
    ///
    /// # Errors
    /// Returns [`Error::Unsaved`] if the item has no id, [`Error::NotFound`]
    /// if its row is gone and [`Error::ConstraintViolation`] if storage
    /// rejects the new values.
    pub fn update(&mut self, item: &TodoItem) -> Result<()> {
        let id = item.id().ok_or(Error::Unsaved)?;
        let updated = diesel::update(todo_items::table.find(id))
            .set(item.to_changes())
            .execute(self.unit_of_work()?)?;
        if updated == 0 {
            return Err(Error::NotFound { id });
        }
        Ok(())
    }

    /// Insert the item if it is unsaved, otherwise update its row.
    ///
    /// # Errors
    /// See [`Session::add`] and [`Session::update`].
    pub fn save(&mut self, item: &mut TodoItem) -> Result<i64> {
        match item.id() {
            Some(id) => {
                self.update(item)?;
                Ok(id)
            }
            None => self.add(item),
        }
    }

    /// Delete an item's row.
    ///
    /// # Errors
    /// Returns [`Error::Unsaved`] if the item has no id and
    /// [`Error::NotFound`] if its row is already gone.
    pub fn delete(&mut self, item: &TodoItem) -> Result<()> {
        let id = item.id().ok_or(Error::Unsaved)?;
        self.delete_by_id(id)
    }

    /// Delete the row with this id.
    ///
    /// # Errors
    /// Returns [`Error::NotFound`] if no row has this id.
    pub fn delete_by_id(&mut self, id: i64) -> Result<()> {
        let deleted =
            diesel::delete(todo_items::table.find(id)).execute(self.unit_of_work()?)?;
        if deleted == 0 {
            return Err(Error::NotFound { id });
        }
        Ok(())
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if let Err(e) = self.finish_transaction(false) {
            warn!(error = %e, "failed to roll back session on release");
        }
        trace!("session released");
    }
}
