//! todo-store - SQLite persistence for a todo list.
//!
//! The crate has two halves:
//!
//! - **[`db`]** - the session provider: a pooled [`Database`] handle that
//!   hands out scoped [`Session`]s, plus the Diesel schema and row mapping
//! - **[`domain`]** - the [`TodoItem`] entity with its defaults and rendering
//!
//! # Modules
//!
//! - [`config`] - Configuration loading from TOML and the environment
//! - [`db`] - Connection pool, sessions, migrations and row types
//! - [`domain`] - The todo item entity
//! - [`error`] - Error types for the crate
//!
//! # Example
//!
//! ```no_run
//! use todo_store::{Database, TodoItem};
//!
//! fn main() -> todo_store::Result<()> {
//!     let db = Database::open("sqlite:///todo.db")?;
//!     let id = db.with_session(|session| session.add(&mut TodoItem::new("Buy milk")))?;
//!
//!     let item = db.with_session(|session| session.get(id))?;
//!     assert_eq!(item.to_string(), "Buy milk");
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod db;
pub mod domain;
pub mod error;

pub use config::{CommitMode, Config, DatabaseConfig};
pub use db::{Database, Session};
pub use domain::TodoItem;
pub use error::{Error, Result};
