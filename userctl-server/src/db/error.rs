//! Database error type
//!
//! Classifies sqlx failures as transient (`Unavailable`) or permanent
//! (`Sqlx`). Unique violations are translated into `Conflict` at the write
//! call sites, which know the offending value.

/// SQLSTATE for unique_violation
const UNIQUE_VIOLATION: &str = "23505";

/// Database error type
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("database error: {0}")]
    Sqlx(sqlx::Error),

    #[error("not found: {resource} '{id}'")]
    NotFound { resource: &'static str, id: String },

    #[error("conflict: {resource} with {field} '{value}' already exists")]
    Conflict {
        resource: &'static str,
        field: &'static str,
        value: String,
    },

    #[error("database unavailable: {0}")]
    Unavailable(String),
}

impl DbError {
    /// Map a write failure, turning a unique violation into `Conflict`.
    pub(crate) fn from_write(
        err: sqlx::Error,
        resource: &'static str,
        field: &'static str,
        value: &str,
    ) -> Self {
        if is_unique_violation(&err) {
            Self::Conflict {
                resource,
                field,
                value: value.to_owned(),
            }
        } else {
            err.into()
        }
    }
}

impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::PoolTimedOut => {
                Self::Unavailable("timed out waiting for a pooled connection".to_owned())
            }
            sqlx::Error::PoolClosed => Self::Unavailable("connection pool closed".to_owned()),
            sqlx::Error::Io(e) => Self::Unavailable(format!("connection I/O error: {}", e)),
            other => Self::Sqlx(other),
        }
    }
}

/// Check if an error is a unique constraint violation.
pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    if let sqlx::Error::Database(db_err) = err {
        if let Some(code) = db_err.code() {
            return code.as_ref() == UNIQUE_VIOLATION;
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pool_timeout_is_unavailable() {
        let err = DbError::from(sqlx::Error::PoolTimedOut);
        assert!(matches!(err, DbError::Unavailable(_)));
    }

    #[test]
    fn io_failure_is_unavailable() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset");
        let err = DbError::from(sqlx::Error::Io(io));
        assert!(matches!(err, DbError::Unavailable(_)));
    }

    #[test]
    fn row_not_found_is_permanent() {
        let err = DbError::from(sqlx::Error::RowNotFound);
        assert!(matches!(err, DbError::Sqlx(_)));
    }

    #[test]
    fn non_database_write_error_is_not_conflict() {
        let err = DbError::from_write(sqlx::Error::PoolClosed, "user", "email", "ada@x.com");
        assert!(matches!(err, DbError::Unavailable(_)));
    }

    #[test]
    fn conflict_display() {
        let err = DbError::Conflict {
            resource: "user",
            field: "email",
            value: "ada@x.com".into(),
        };
        assert_eq!(
            err.to_string(),
            "conflict: user with email 'ada@x.com' already exists"
        );
    }
}
