use crate::db::errors::{DbError, Duplicate};
use crate::integrations::ProviderError;
use crate::types::{Operation, Permission, Resource};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error as ThisError;

#[derive(ThisError, Debug)]
pub enum Error {
    /// Authentication required but not provided
    #[error("Not authenticated")]
    Unauthenticated { message: Option<String> },

    /// User lacks required permissions for the operation
    #[error("Insufficient permissions to {action} {resource}")]
    InsufficientPermissions {
        required: Permission,
        action: Operation,
        resource: Resource,
    },

    /// Invalid request data or business rule violation
    #[error("{message}")]
    BadRequest { message: String },

    /// Requested resource not found
    #[error("{resource} with ID {id} not found")]
    NotFound { resource: String, id: String },

    /// Generic internal service error
    #[error("Failed to {operation}")]
    Internal { operation: String },

    /// Database operation error
    #[error(transparent)]
    Database(#[from] DbError),

    /// Identity, GitHub or Slack provider error
    #[error(transparent)]
    Provider(ProviderError),

    /// Unexpected error with full context chain
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<ProviderError> for Error {
    fn from(err: ProviderError) -> Self {
        match err {
            // The in-database identity provider surfaces plain database errors
            ProviderError::Database(db_err) => Error::Database(db_err),
            other => Error::Provider(other),
        }
    }
}

impl Error {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::Unauthenticated { .. } => StatusCode::UNAUTHORIZED,
            Error::InsufficientPermissions { .. } => StatusCode::FORBIDDEN,
            Error::BadRequest { .. } => StatusCode::BAD_REQUEST,
            Error::NotFound { .. } => StatusCode::NOT_FOUND,
            Error::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            Error::Database(db_err) => match db_err {
                DbError::NotFound => StatusCode::NOT_FOUND,
                DbError::UniqueViolation(_) => StatusCode::CONFLICT,
                DbError::ForeignKeyViolation(_) => StatusCode::BAD_REQUEST,
                DbError::CheckViolation(_) => StatusCode::BAD_REQUEST,
                DbError::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Error::Provider(provider_err) => match provider_err {
                ProviderError::InvalidConfig { .. } => StatusCode::INTERNAL_SERVER_ERROR,
                _ => StatusCode::BAD_GATEWAY,
            },
            Error::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns a user-safe error message, without leaking internal implementation details
    pub fn user_message(&self) -> String {
        match self {
            Error::Unauthenticated { message } => message.clone().unwrap_or_else(|| "Authentication required".to_string()),
            Error::InsufficientPermissions { action, resource, .. } => {
                format!("Insufficient permissions to {action} {resource}")
            }
            Error::BadRequest { message } => message.clone(),
            Error::NotFound { resource, id } => {
                format!("{resource} with ID {id} not found")
            }
            Error::Internal { .. } => "Internal server error".to_string(),
            Error::Database(db_err) => match db_err {
                DbError::NotFound => "Resource not found".to_string(),
                DbError::UniqueViolation(_) => match db_err.duplicate() {
                    Some(Duplicate::AccountEmail) => "An account with this email address already exists".to_string(),
                    Some(Duplicate::MailboxSlug) => "A mailbox with this slug already exists".to_string(),
                    None => "Resource already exists".to_string(),
                },
                DbError::ForeignKeyViolation(_) => "Invalid reference to related resource".to_string(),
                DbError::CheckViolation(_) => "Invalid data provided".to_string(),
                DbError::Other(_) => "Database error occurred".to_string(),
            },
            Error::Provider(provider_err) => match provider_err {
                ProviderError::Api { provider, message, .. } => format!("{provider} rejected the request: {message}"),
                ProviderError::InvalidConfig { .. } => "Internal server error".to_string(),
                _ => format!("Could not reach {}", provider_err.provider()),
            },
            Error::Other(_) => "Internal server error".to_string(),
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        // Log full error details for debugging - different log levels based on severity
        match &self {
            Error::Database(DbError::Other(_)) | Error::Internal { .. } | Error::Other(_) => {
                tracing::error!("Internal service error: {:#}", self);
            }
            Error::Provider(_) => {
                tracing::error!("Provider error: {}", self);
            }
            Error::Database(_) => {
                tracing::warn!("Database constraint error: {}", self);
            }
            Error::Unauthenticated { .. } | Error::InsufficientPermissions { .. } => {
                tracing::info!("Authorization error: {}", self);
            }
            Error::BadRequest { .. } | Error::NotFound { .. } => {
                tracing::debug!("Client error: {}", self);
            }
        }

        (self.status_code(), self.user_message()).into_response()
    }
}

/// Report an error that is handled (swallowed or turned into a redirect) but should still
/// reach the exception tracker.
pub fn capture_exception(error: &(dyn std::error::Error + 'static), context: &str) {
    let mut chain = Vec::new();
    let mut source = error.source();
    while let Some(cause) = source {
        chain.push(cause.to_string());
        source = cause.source();
    }
    tracing::error!(context, error = %error, causes = ?chain, "Captured exception");
}

/// Type alias for service operation results
pub type Result<T> = std::result::Result<T, Error>;
