//! SQLite persistence.
//!
//! Provides the pooled [`Database`] handle, scoped [`Session`]s, the Diesel
//! schema and the row types that map `todo_items` onto
//! [`TodoItem`](crate::domain::TodoItem).

pub mod connection;
pub mod model;
pub mod schema;
pub mod session;

pub use connection::{database_url, Database, DbPool, PoolState, SqliteManager, MIGRATIONS};
pub use session::Session;
