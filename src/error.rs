//! The single error kind surfaced by this crate.

use thiserror::Error;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, FhirPathError>;

/// Every way evaluating a FHIRPath expression can fail.
///
/// Division by zero, out-of-range indexing, and empty-propagation are *not*
/// errors — they produce an empty collection. This enum only covers genuine
/// failures: malformed syntax, unresolved names, type mismatches, wrong
/// argument counts, and singleton violations, plus `Internal` for
/// invariants that should never actually trip.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FhirPathError {
    /// Ill-formed expression text.
    #[error("parse error at position {position}: {message} (expected one of: {expected})")]
    Parse {
        /// Byte offset into the source expression.
        position: usize,
        /// Human-readable description of what went wrong.
        message: String,
        /// Comma-joined set of tokens that would have been accepted here.
        expected: String,
    },

    /// An unknown variable, function, or `ofType`/`is`/`as` type name.
    #[error("resolution error: {message}")]
    Resolution {
        /// Human-readable description.
        message: String,
    },

    /// An operator or function applied to incompatible value kinds.
    #[error("type error: {message}")]
    Type {
        /// Human-readable description.
        message: String,
    },

    /// A function was called with the wrong number of arguments.
    #[error("arity error: '{function}' expects {expected}, got {actual}")]
    Arity {
        /// Function name.
        function: String,
        /// Human-readable arity requirement, e.g. "1 argument" or "1 or 2 arguments".
        expected: String,
        /// Actual argument count supplied.
        actual: usize,
    },

    /// A context that required a singleton received a collection of length >= 2.
    #[error("singleton error: expected a single value, found {actual} in {context}")]
    Singleton {
        /// Where the singleton was required, e.g. "boolean operand" or "as Type".
        context: String,
        /// Actual collection length encountered.
        actual: usize,
    },

    /// An invariant the evaluator relies on was violated internally.
    #[error("internal error: {message}")]
    Internal {
        /// Human-readable description.
        message: String,
    },
}

impl FhirPathError {
    /// Build a [`FhirPathError::Parse`] error.
    pub fn parse(position: usize, message: impl Into<String>, expected: &[&str]) -> Self {
        FhirPathError::Parse {
            position,
            message: message.into(),
            expected: expected.join(", "),
        }
    }

    /// Build a [`FhirPathError::Resolution`] error.
    pub fn resolution(message: impl Into<String>) -> Self {
        FhirPathError::Resolution {
            message: message.into(),
        }
    }

    /// Build a [`FhirPathError::Type`] error.
    pub fn type_error(message: impl Into<String>) -> Self {
        FhirPathError::Type {
            message: message.into(),
        }
    }

    /// Build a [`FhirPathError::Arity`] error.
    pub fn arity(function: impl Into<String>, expected: impl Into<String>, actual: usize) -> Self {
        FhirPathError::Arity {
            function: function.into(),
            expected: expected.into(),
            actual,
        }
    }

    /// Build a [`FhirPathError::Singleton`] error.
    pub fn singleton(context: impl Into<String>, actual: usize) -> Self {
        FhirPathError::Singleton {
            context: context.into(),
            actual,
        }
    }

    /// Build a [`FhirPathError::Internal`] error.
    pub fn internal(message: impl Into<String>) -> Self {
        FhirPathError::Internal {
            message: message.into(),
        }
    }
}
