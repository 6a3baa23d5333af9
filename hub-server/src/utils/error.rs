//! Unified service-layer error type
//!
//! `ServiceError` bridges the gap between store errors (`sqlx::Error`) and the
//! API-layer error (`AppError`). It enables `?` propagation on both kinds and
//! tells the retry wrapper which failures are worth a second attempt.

use axum::response::IntoResponse;
use shared::error::{AppError, ErrorCode};

/// Service-layer error
///
/// - `Db`: store errors (logged, mapped to `DatabaseError`)
/// - `App`: business-rule errors (transparent pass-through to the caller)
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("database error: {0}")]
    Db(#[from] sqlx::Error),
    #[error(transparent)]
    App(#[from] AppError),
}

impl ServiceError {
    /// Store errors a single retry can plausibly fix (pool exhaustion, I/O,
    /// SQLITE_BUSY / SQLITE_LOCKED and their extended codes)
    pub fn is_transient(&self) -> bool {
        match self {
            ServiceError::Db(sqlx::Error::PoolTimedOut) => true,
            ServiceError::Db(sqlx::Error::Io(_)) => true,
            ServiceError::Db(sqlx::Error::Database(db_err)) => db_err
                .code()
                .and_then(|code| code.parse::<i32>().ok())
                .is_some_and(|code| matches!(code & 0xff, 5 | 6)),
            _ => false,
        }
    }

    /// Unique-constraint violation reported by the store
    pub fn is_unique_violation(&self) -> bool {
        matches!(self, ServiceError::Db(sqlx::Error::Database(db_err)) if db_err.is_unique_violation())
    }

    /// Business error code, if this is one
    pub fn code(&self) -> Option<ErrorCode> {
        match self {
            ServiceError::App(e) => Some(e.code),
            ServiceError::Db(_) => None,
        }
    }
}

impl From<ServiceError> for AppError {
    fn from(e: ServiceError) -> Self {
        match e {
            ServiceError::App(app_err) => app_err,
            ServiceError::Db(db_err) => {
                tracing::error!(error = %db_err, "Service database error");
                AppError::new(ErrorCode::DatabaseError)
            }
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> axum::response::Response {
        let app_error: AppError = self.into();
        app_error.into_response()
    }
}

/// Convenience type alias for service-layer results
pub type ServiceResult<T> = Result<T, ServiceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_timeout_is_transient() {
        assert!(ServiceError::Db(sqlx::Error::PoolTimedOut).is_transient());
        assert!(!ServiceError::Db(sqlx::Error::RowNotFound).is_transient());
    }

    #[test]
    fn test_app_error_is_never_transient() {
        let err = ServiceError::from(AppError::validation("bad"));
        assert!(!err.is_transient());
        assert!(!err.is_unique_violation());
        assert_eq!(err.code(), Some(ErrorCode::ValidationFailed));
    }

    #[test]
    fn test_db_error_maps_to_database_code() {
        let app: AppError = ServiceError::Db(sqlx::Error::RowNotFound).into();
        assert_eq!(app.code, ErrorCode::DatabaseError);
    }
}
