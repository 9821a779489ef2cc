//! Errors surfaced by the attendance store and the operations built on top of it.

use diesel::result::{DatabaseErrorKind, Error as DieselError};
use std::fmt;

pub type Result<T> = std::result::Result<T, AttendanceError>;

/// The kind of record a [`AttendanceError::NotFound`] refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entity {
    Class,
    Student,
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Entity::Class => f.write_str("class"),
            Entity::Student => f.write_str("student"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AttendanceError {
    #[error("{entity} {id} does not exist")]
    NotFound { entity: Entity, id: i32 },

    /// A write was rejected by a storage constraint, e.g. a student added to a class that does
    /// not exist or a second record for the same student and day.
    #[error("integrity violation: {0}")]
    IntegrityViolation(String),

    #[error("database error: {0}")]
    Database(DieselError),

    #[error("could not connect to the database: {0}")]
    Connection(#[from] diesel::result::ConnectionError),

    #[error("could not run database migrations: {0}")]
    Migration(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),
}

impl AttendanceError {
    pub fn class_not_found(id: i32) -> Self {
        AttendanceError::NotFound {
            entity: Entity::Class,
            id,
        }
    }

    pub fn student_not_found(id: i32) -> Self {
        AttendanceError::NotFound {
            entity: Entity::Student,
            id,
        }
    }
}

impl From<DieselError> for AttendanceError {
    fn from(err: DieselError) -> Self {
        match err {
            DieselError::DatabaseError(
                kind @ (DatabaseErrorKind::ForeignKeyViolation
                | DatabaseErrorKind::UniqueViolation
                | DatabaseErrorKind::CheckViolation
                | DatabaseErrorKind::NotNullViolation),
                info,
            ) => AttendanceError::IntegrityViolation(format!("{kind:?}: {}", info.message())),
            other => AttendanceError::Database(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_names_the_entity() {
        let err = AttendanceError::class_not_found(999);
        assert_eq!(err.to_string(), "class 999 does not exist");

        let err = AttendanceError::student_not_found(7);
        assert_eq!(err.to_string(), "student 7 does not exist");
    }

    #[test]
    fn plain_diesel_errors_stay_database_errors() {
        let err = AttendanceError::from(DieselError::NotFound);
        assert!(matches!(err, AttendanceError::Database(DieselError::NotFound)));
    }
}
