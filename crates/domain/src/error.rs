//! Unified error types for the domain layer
//!
//! Provides a common error type for value construction and invariant checks,
//! so the sync layer can report rejections without resorting to strings.

use thiserror::Error;

/// Unified error type for domain operations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Validation failed (e.g., invalid field values)
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Numeric value outside its allowed range
    #[error("{field} must be within {min}..={max}, got {value}")]
    OutOfRange {
        field: &'static str,
        value: i64,
        min: i64,
        max: i64,
    },

    /// Parse error (for value objects)
    #[error("Parse error: {0}")]
    Parse(String),

    /// Fractional ordering key is malformed or the bounds are not ordered
    #[error("Invalid order key: {0}")]
    InvalidOrderKey(String),
}

impl DomainError {
    /// Creates a validation error for business rule violations.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create an out-of-range error for a bounded numeric field
    pub fn out_of_range(field: &'static str, value: i64, min: i64, max: i64) -> Self {
        Self::OutOfRange {
            field,
            value,
            min,
            max,
        }
    }

    /// Creates a parse error for string-to-type conversion failures.
    ///
    /// Use this in `FromStr` implementations when the input string
    /// doesn't match any known variant:
    ///
    /// ```ignore
    /// impl FromStr for Die {
    ///     type Err = DomainError;
    ///     fn from_str(s: &str) -> Result<Self, Self::Err> {
    ///         match s {
    ///             "d20" => Ok(Self::D20),
    ///             _ => Err(DomainError::parse(format!("Unknown die: {}", s))),
    ///         }
    ///     }
    /// }
    /// ```
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }

    /// Create an invalid order key error
    pub fn invalid_order_key(msg: impl Into<String>) -> Self {
        Self::InvalidOrderKey(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error() {
        let err = DomainError::validation("adversity cannot be negative");
        assert!(matches!(err, DomainError::Validation(_)));
        assert_eq!(
            err.to_string(),
            "Validation failed: adversity cannot be negative"
        );
    }

    #[test]
    fn test_out_of_range_error() {
        let err = DomainError::out_of_range("secondary dial", 4, -3, 3);
        assert_eq!(err.to_string(), "secondary dial must be within -3..=3, got 4");
    }

    #[test]
    fn test_invalid_order_key_error() {
        let err = DomainError::invalid_order_key("a1 >= a0");
        assert!(err.to_string().contains("a1 >= a0"));
    }
}
