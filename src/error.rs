//! Error types for dependency injection

use crate::key::Key;
use thiserror::Error;

/// Errors that can occur during registration lookup and object construction
#[derive(Error, Debug, Clone)]
pub enum DiError {
    /// No registration exists for the requested key
    #[error("no registration found for key `{key}`")]
    NotFound { key: Key },

    /// A constructor failed to produce an instance
    #[error("failed to construct {type_name}: {reason}")]
    CreationFailed {
        type_name: &'static str,
        reason: String,
    },

    /// A resolved value did not have the type the caller asked for
    #[error("resolved value is not a {expected}")]
    TypeMismatch { expected: &'static str },

    /// A constructor consumed more arguments than were bound for it
    #[error("no argument left for {expected}")]
    MissingArgument { expected: &'static str },
}

impl DiError {
    /// Create a NotFound error for a key
    #[inline]
    pub fn not_found(key: Key) -> Self {
        Self::NotFound { key }
    }

    /// Create a CreationFailed error
    #[inline]
    pub fn creation_failed<T: 'static>(reason: impl Into<String>) -> Self {
        Self::CreationFailed {
            type_name: std::any::type_name::<T>(),
            reason: reason.into(),
        }
    }

    /// Create a TypeMismatch error
    #[inline]
    pub fn type_mismatch<T: 'static>() -> Self {
        Self::TypeMismatch {
            expected: std::any::type_name::<T>(),
        }
    }

    /// Create a MissingArgument error
    #[inline]
    pub fn missing_argument<T: 'static>() -> Self {
        Self::MissingArgument {
            expected: std::any::type_name::<T>(),
        }
    }

    /// Check whether this is a NotFound error (the default-value fallback
    /// in parameter binding only swallows this variant)
    #[inline]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Result type alias for DI operations
pub type Result<T> = std::result::Result<T, DiError>;
