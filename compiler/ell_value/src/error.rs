//! Error taxonomy for emission.
//!
//! Every variant signals API misuse or a malformed request reaching the
//! emitter, never a transient condition. Errors are raised at the point of
//! detection and abort the current emission; instructions emitted before the
//! failing call stay in the backend's output.

use thiserror::Error;

use crate::value_type::ValueType;

/// Result alias used throughout the emission layer.
pub type EmitResult<T> = Result<T, EmitError>;

/// A fatal emission error.
///
/// Callers branch on the variant rather than on message text.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum EmitError {
    /// A value type tag outside the closed enumeration, or `Void` where a
    /// first-class value type is required.
    #[error("invalid value type: {0}")]
    InvalidValueType(String),

    /// An arithmetic operator tag outside the closed enumeration.
    #[error("invalid operator type: {0}")]
    InvalidOperatorType(String),

    /// A comparison tag outside the closed enumeration.
    #[error("invalid comparison type: {0}")]
    InvalidComparisonType(String),

    /// An operand has a different type than the operation requires.
    #[error("type mismatch: expected `{expected}`, found `{found}`")]
    TypeMismatch {
        expected: ValueType,
        found: ValueType,
    },

    /// Undefined operands, unconstrained values, malformed layouts or
    /// coordinates, wrong arity.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Storage re-requested with a larger size than it was created with.
    #[error("invalid size: requested {requested} elements, capacity is {capacity}")]
    InvalidSize { requested: usize, capacity: usize },

    /// No active context, or an operation that needs an insertion point
    /// issued outside of any function.
    #[error("illegal state: {0}")]
    IllegalState(String),

    /// Function redefinition, signature clash, or a call to a function that
    /// was never defined.
    #[error("invalid function `{0}`")]
    InvalidFunction(String),

    /// The backend instruction builder rejected a request.
    #[error("backend error: {0}")]
    Backend(String),
}

impl EmitError {
    /// Shorthand for [`EmitError::InvalidArgument`].
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    /// Shorthand for [`EmitError::IllegalState`].
    pub fn illegal_state(message: impl Into<String>) -> Self {
        Self::IllegalState(message.into())
    }
}
