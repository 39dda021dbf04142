//! Configuration modules.

pub mod database;
pub mod logging;
pub mod settings;

pub use database::{CommitMode, DatabaseConfig};
pub use logging::LoggingConfig;
pub use settings::Config;
