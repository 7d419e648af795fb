//! # Error Handling
//!
//! Unified error type for registry operations. Every failure surfaces as one
//! of three caller-facing kinds (validation, conflict, not found) or as an
//! internal error wrapping its source.

use std::fmt;

use serde::Serialize;
use thiserror::Error;

use crate::crypto::CryptoError;

/// A single violated field constraint
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldViolation {
    /// Field name as it appears in a draft (e.g. `api_url`)
    pub field: &'static str,
    /// Human-readable description of the violation
    pub message: String,
}

/// Every field violation found while validating one input
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationErrors {
    pub violations: Vec<FieldViolation>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Convenience constructor for a single violation
    pub fn single(field: &'static str, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.push(field, message);
        errors
    }

    pub fn push(&mut self, field: &'static str, message: impl Into<String>) {
        self.violations.push(FieldViolation {
            field,
            message: message.into(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.violations.is_empty()
    }

    /// Whether any violation concerns `field`
    pub fn has_field(&self, field: &str) -> bool {
        self.violations.iter().any(|v| v.field == field)
    }

    /// `Ok(())` when nothing was recorded, otherwise the collected errors
    pub fn into_result(self) -> Result<(), RegistryError> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(RegistryError::Validation(self))
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, violation) in self.violations.iter().enumerate() {
            if index > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{}: {}", violation.field, violation.message)?;
        }
        Ok(())
    }
}

/// Errors returned by the registry and its repositories
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("validation failed: {0}")]
    Validation(ValidationErrors),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("credential encryption error: {0}")]
    Crypto(#[from] CryptoError),
    #[error("database error: {0}")]
    Database(sea_orm::DbErr),
    #[error(transparent)]
    Collaborator(#[from] anyhow::Error),
}

impl RegistryError {
    /// Shorthand for a single-field validation failure
    pub fn invalid(field: &'static str, message: impl Into<String>) -> Self {
        RegistryError::Validation(ValidationErrors::single(field, message))
    }

    /// Stable error code for programmatic handling (SCREAMING_SNAKE_CASE)
    pub fn error_code(&self) -> &'static str {
        match self {
            RegistryError::Validation(_) => "VALIDATION_FAILED",
            RegistryError::Conflict(_) => "CONFLICT",
            RegistryError::NotFound(_) => "NOT_FOUND",
            RegistryError::Crypto(_)
            | RegistryError::Database(_)
            | RegistryError::Collaborator(_) => "INTERNAL_ERROR",
        }
    }

    /// Process exit code used by the command-line front end
    pub fn exit_code(&self) -> i32 {
        match self {
            RegistryError::Validation(_) => 2,
            RegistryError::NotFound(_) => 3,
            RegistryError::Conflict(_) => 4,
            _ => 1,
        }
    }
}

fn is_unique_violation(error: &sea_orm::DbErr) -> bool {
    use sea_orm::RuntimeErr;

    const PG_UNIQUE: &str = "23505";
    const SQLITE_DUPLICATE_CODES: &[&str] = &["1555", "2067"];

    let runtime_err = match error {
        sea_orm::DbErr::Query(RuntimeErr::SqlxError(sqlx_err))
        | sea_orm::DbErr::Exec(RuntimeErr::SqlxError(sqlx_err)) => sqlx_err,
        _ => return false,
    };

    let Some(db_error) = runtime_err.as_database_error() else {
        return false;
    };

    if db_error.is_unique_violation() {
        return true;
    }

    db_error.code().is_some_and(|code| {
        let code_str = code.as_ref();
        code_str == PG_UNIQUE || SQLITE_DUPLICATE_CODES.contains(&code_str)
    })
}

impl From<sea_orm::DbErr> for RegistryError {
    fn from(error: sea_orm::DbErr) -> Self {
        if is_unique_violation(&error) {
            tracing::debug!(?error, "Unique constraint violation detected");
            return RegistryError::Conflict("resource already exists".to_string());
        }

        match error {
            sea_orm::DbErr::RecordNotFound(record) => RegistryError::NotFound(record),
            other => {
                tracing::error!("Database error: {:?}", other);
                RegistryError::Database(other)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_errors_display_lists_every_field() {
        let mut errors = ValidationErrors::new();
        errors.push("name", "is required");
        errors.push("prefix", "must start with '10.'");

        assert_eq!(
            errors.to_string(),
            "name: is required; prefix: must start with '10.'"
        );
        assert!(errors.has_field("prefix"));
        assert!(!errors.has_field("api_url"));
    }

    #[test]
    fn test_empty_validation_errors_are_ok() {
        assert!(ValidationErrors::new().into_result().is_ok());
        assert!(matches!(
            ValidationErrors::single("name", "is required").into_result(),
            Err(RegistryError::Validation(_))
        ));
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(
            RegistryError::invalid("name", "is required").error_code(),
            "VALIDATION_FAILED"
        );
        assert_eq!(
            RegistryError::Conflict("dup".into()).error_code(),
            "CONFLICT"
        );
        assert_eq!(
            RegistryError::NotFound("x".into()).error_code(),
            "NOT_FOUND"
        );
        assert_eq!(
            RegistryError::from(anyhow::anyhow!("catalog down")).error_code(),
            "INTERNAL_ERROR"
        );
    }

    #[test]
    fn test_exit_codes_are_distinct() {
        let codes = [
            RegistryError::invalid("name", "is required").exit_code(),
            RegistryError::NotFound("x".into()).exit_code(),
            RegistryError::Conflict("x".into()).exit_code(),
            RegistryError::from(anyhow::anyhow!("boom")).exit_code(),
        ];
        assert_eq!(codes, [2, 3, 4, 1]);
    }

    #[test]
    fn test_record_not_found_maps_to_not_found() {
        let error: RegistryError = sea_orm::DbErr::RecordNotFound("doiserver 7".into()).into();
        assert!(matches!(error, RegistryError::NotFound(ref msg) if msg == "doiserver 7"));
    }

    #[test]
    fn test_other_db_errors_are_internal() {
        let error: RegistryError = sea_orm::DbErr::Custom("boom".into()).into();
        assert!(matches!(error, RegistryError::Database(_)));
        assert_eq!(error.exit_code(), 1);
    }
}
