use diesel::result::{DatabaseErrorKind, Error as DieselError};
use thiserror::Error;

/// Configuration-related errors with structured variants.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing required field: {field}")]
    MissingField { field: &'static str },

    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },

    #[error("failed to read config file: {0}")]
    ReadFile(#[source] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[source] toml::de::Error),
}

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The database could not be opened or no connection could be checked out.
    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),

    /// A write was rejected by a schema constraint. Row state is unchanged.
    #[error("constraint violation: {0}")]
    ConstraintViolation(String),

    #[error("todo item {id} not found")]
    NotFound { id: i64 },

    /// The item has no id yet, so there is no row to update or delete.
    #[error("todo item has not been persisted")]
    Unsaved,

    #[error("todo item {id} is already persisted")]
    AlreadyPersisted { id: i64 },

    /// The session's transaction ended and could not be restarted.
    #[error("session has no open transaction")]
    NoTransaction,

    #[error("migration error: {0}")]
    Migration(String),

    #[error("database error: {0}")]
    Database(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl From<DieselError> for Error {
    fn from(err: DieselError) -> Self {
        match err {
            DieselError::DatabaseError(kind, info) => match kind {
                DatabaseErrorKind::CheckViolation
                | DatabaseErrorKind::NotNullViolation
                | DatabaseErrorKind::UniqueViolation
                | DatabaseErrorKind::ForeignKeyViolation => {
                    Error::ConstraintViolation(info.message().to_string())
                }
                // Older SQLite builds report some constraint failures without
                // an extended result code.
                _ if info.message().contains("constraint failed") => {
                    Error::ConstraintViolation(info.message().to_string())
                }
                _ => Error::Database(info.message().to_string()),
            },
            other => Error::Database(other.to_string()),
        }
    }
}

impl From<diesel::r2d2::PoolError> for Error {
    fn from(err: diesel::r2d2::PoolError) -> Self {
        Error::StorageUnavailable(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Info(&'static str);

    impl diesel::result::DatabaseErrorInformation for Info {
        fn message(&self) -> &str {
            self.0
        }
        fn details(&self) -> Option<&str> {
            None
        }
        fn hint(&self) -> Option<&str> {
            None
        }
        fn table_name(&self) -> Option<&str> {
            None
        }
        fn column_name(&self) -> Option<&str> {
            None
        }
        fn constraint_name(&self) -> Option<&str> {
            None
        }
        fn statement_position(&self) -> Option<i32> {
            None
        }
    }

    fn db_error(kind: DatabaseErrorKind, message: &'static str) -> DieselError {
        DieselError::DatabaseError(kind, Box::new(Info(message)))
    }

    #[test]
    fn check_violation_maps_to_constraint_violation() {
        let err = Error::from(db_error(
            DatabaseErrorKind::CheckViolation,
            "CHECK constraint failed: length(text) <= 50",
        ));
        assert!(matches!(err, Error::ConstraintViolation(msg) if msg.contains("length(text)")));
    }

    #[test]
    fn not_null_violation_maps_to_constraint_violation() {
        let err = Error::from(db_error(
            DatabaseErrorKind::NotNullViolation,
            "NOT NULL constraint failed: todo_items.text",
        ));
        assert!(matches!(err, Error::ConstraintViolation(_)));
    }

    #[test]
    fn unclassified_constraint_message_maps_to_constraint_violation() {
        let err = Error::from(db_error(
            DatabaseErrorKind::Unknown,
            "CHECK constraint failed: todo_items",
        ));
        assert!(matches!(err, Error::ConstraintViolation(_)));
    }

    #[test]
    fn other_database_errors_stay_database_errors() {
        let err = Error::from(db_error(DatabaseErrorKind::Unknown, "no such table: todo_items"));
        assert!(matches!(err, Error::Database(msg) if msg == "no such table: todo_items"));
    }

    #[test]
    fn diesel_not_found_is_not_a_typed_not_found() {
        // Typed NotFound carries an id, which only the caller knows.
        let err = Error::from(DieselError::NotFound);
        assert!(matches!(err, Error::Database(_)));
    }

    #[test]
    fn not_found_message_includes_id() {
        let err = Error::NotFound { id: 42 };
        assert_eq!(err.to_string(), "todo item 42 not found");
    }

    #[test]
    fn config_error_is_transparent() {
        let err: Error = ConfigError::MissingField { field: "url" }.into();
        assert_eq!(err.to_string(), "missing required field: url");
    }
}
