use thiserror::Error;

/// Where a constraint violation happened, as reported by PostgreSQL
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConstraintViolation {
    pub constraint: Option<String>,
    pub table: Option<String>,
    pub message: String,
}

impl ConstraintViolation {
    fn from_database(err: &dyn sqlx::error::DatabaseError) -> Self {
        Self {
            constraint: err.constraint().map(str::to_string),
            table: err.table().map(str::to_string),
            message: err.message().to_string(),
        }
    }
}

/// Errors from the repositories in [`crate::db::handlers`]
#[derive(Error, Debug)]
pub enum DbError {
    /// No row for the requested id or slug
    #[error("Entity not found")]
    NotFound,

    /// Duplicate account email or mailbox slug
    #[error("Unique constraint violation on {}", .0.constraint.as_deref().unwrap_or("unknown constraint"))]
    UniqueViolation(ConstraintViolation),

    /// Profile, identity or message pointing at a missing account or mailbox
    #[error("Foreign key constraint violation on {}", .0.constraint.as_deref().unwrap_or("unknown constraint"))]
    ForeignKeyViolation(ConstraintViolation),

    #[error("Check constraint violation on {}", .0.constraint.as_deref().unwrap_or("unknown constraint"))]
    CheckViolation(ConstraintViolation),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Entities whose uniqueness is enforced by the schema
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Duplicate {
    AccountEmail,
    MailboxSlug,
}

impl DbError {
    /// Which business rule a unique violation broke, when it is one we name.
    pub fn duplicate(&self) -> Option<Duplicate> {
        let DbError::UniqueViolation(violation) = self else {
            return None;
        };
        match (violation.table.as_deref(), violation.constraint.as_deref()) {
            (Some("users"), Some(c)) if c.contains("email") => Some(Duplicate::AccountEmail),
            (Some("mailboxes"), Some("mailboxes_slug_unique")) => Some(Duplicate::MailboxSlug),
            _ => None,
        }
    }
}

impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => DbError::NotFound,
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                DbError::UniqueViolation(ConstraintViolation::from_database(db_err.as_ref()))
            }
            sqlx::Error::Database(db_err) if db_err.is_foreign_key_violation() => {
                DbError::ForeignKeyViolation(ConstraintViolation::from_database(db_err.as_ref()))
            }
            sqlx::Error::Database(db_err) if db_err.is_check_violation() => {
                DbError::CheckViolation(ConstraintViolation::from_database(db_err.as_ref()))
            }
            _ => DbError::Other(anyhow::Error::from(err)),
        }
    }
}

/// Type alias for database operation results
pub type Result<T> = std::result::Result<T, DbError>;
