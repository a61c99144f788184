//! Error types for handle composition and invocation.
//!
//! Two channels exist:
//!
//! - [`HandleError`] is returned synchronously by every combinator when its
//!   inputs cannot be composed. These are programmer errors; nothing in the
//!   crate retries them.
//! - [`Throwable`] is the error value a running handle raises. Combinators
//!   propagate it unchanged, except the ones built to intercept it
//!   ([`catch_exception`](crate::combinator::catch_exception) and
//!   [`try_finally`](crate::combinator::try_finally)).
//!
//! A `HandleError` can be turned into a `Throwable`; loosely-typed invocation
//! uses this to report a failed conversion through the invocation result.

use std::fmt;
use std::sync::Arc;

use crate::signature::{ErrorClass, Signature};

// =============================================================================
// HandleError
// =============================================================================

/// Represents a failure to build a handle.
///
/// # Examples
///
/// ```rust
/// use callgraft::HandleError;
///
/// let error = HandleError::illegal_argument("insert_arguments", "position 4 out of range");
/// assert_eq!(
///     format!("{error}"),
///     "insert_arguments: illegal argument: position 4 out of range"
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandleError {
    /// The parameter or return types of the composed handles disagree.
    SignatureMismatch {
        /// The combinator that rejected its inputs.
        operation: &'static str,
        /// What did not match.
        detail: String,
    },
    /// A position, value or permutation passed to a combinator is malformed.
    IllegalArgument {
        /// The operation that rejected the argument.
        operation: &'static str,
        /// What was wrong with it.
        detail: String,
    },
    /// The functions of a loop's clauses cannot share one parameter list.
    IncompatibleClauseSignatures {
        /// Which clause function disagreed, and with what.
        detail: String,
    },
    /// No conversion exists between two signatures.
    WrongSignature {
        /// The signature of the handle being adapted.
        from: Signature,
        /// The requested signature.
        to: Signature,
    },
}

impl HandleError {
    /// Creates a [`HandleError::SignatureMismatch`].
    #[must_use]
    pub fn signature_mismatch(operation: &'static str, detail: impl Into<String>) -> Self {
        Self::SignatureMismatch {
            operation,
            detail: detail.into(),
        }
    }

    /// Creates a [`HandleError::IllegalArgument`].
    #[must_use]
    pub fn illegal_argument(operation: &'static str, detail: impl Into<String>) -> Self {
        Self::IllegalArgument {
            operation,
            detail: detail.into(),
        }
    }

    /// Creates a [`HandleError::IncompatibleClauseSignatures`].
    #[must_use]
    pub fn incompatible_clauses(detail: impl Into<String>) -> Self {
        Self::IncompatibleClauseSignatures {
            detail: detail.into(),
        }
    }

    /// Creates a [`HandleError::WrongSignature`].
    #[must_use]
    pub fn wrong_signature(from: &Signature, to: &Signature) -> Self {
        Self::WrongSignature {
            from: from.clone(),
            to: to.clone(),
        }
    }
}

impl fmt::Display for HandleError {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SignatureMismatch { operation, detail } => {
                write!(formatter, "{operation}: signature mismatch: {detail}")
            }
            Self::IllegalArgument { operation, detail } => {
                write!(formatter, "{operation}: illegal argument: {detail}")
            }
            Self::IncompatibleClauseSignatures { detail } => {
                write!(formatter, "loop: incompatible clause signatures: {detail}")
            }
            Self::WrongSignature { from, to } => {
                write!(formatter, "cannot convert handle of {from} to {to}")
            }
        }
    }
}

impl std::error::Error for HandleError {}

// =============================================================================
// Throwable
// =============================================================================

/// An error raised by a running handle.
///
/// # Examples
///
/// ```rust
/// use callgraft::Throwable;
/// use callgraft::signature::ErrorClass;
///
/// let error = Throwable::new(ErrorClass::arithmetic(), "/ by zero");
/// assert!(error.is_instance_of(&ErrorClass::runtime_exception()));
/// assert_eq!(format!("{error}"), "ArithmeticException: / by zero");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Throwable {
    class: ErrorClass,
    message: Arc<str>,
}

impl Throwable {
    /// Creates an error of the given class.
    #[must_use]
    pub fn new(class: ErrorClass, message: impl AsRef<str>) -> Self {
        Self {
            class,
            message: Arc::from(message.as_ref()),
        }
    }

    /// Creates an `IllegalArgumentException`.
    #[must_use]
    pub fn illegal_argument(message: impl AsRef<str>) -> Self {
        Self::new(ErrorClass::illegal_argument(), message)
    }

    /// Creates a `NullPointerException`.
    #[must_use]
    pub fn null_pointer(message: impl AsRef<str>) -> Self {
        Self::new(ErrorClass::null_pointer(), message)
    }

    /// Creates a `ClassCastException`.
    #[must_use]
    pub fn class_cast(message: impl AsRef<str>) -> Self {
        Self::new(ErrorClass::class_cast(), message)
    }

    /// Creates a `WrongMethodTypeException`.
    #[must_use]
    pub fn wrong_method_type(message: impl AsRef<str>) -> Self {
        Self::new(ErrorClass::wrong_method_type(), message)
    }

    /// Creates an `IndexOutOfBoundsException`.
    #[must_use]
    pub fn index_out_of_bounds(message: impl AsRef<str>) -> Self {
        Self::new(ErrorClass::index_out_of_bounds(), message)
    }

    /// Creates a `NoSuchElementException`.
    #[must_use]
    pub fn no_such_element(message: impl AsRef<str>) -> Self {
        Self::new(ErrorClass::no_such_element(), message)
    }

    /// Returns the class of this error.
    #[must_use]
    pub const fn class(&self) -> &ErrorClass {
        &self.class
    }

    /// Returns the detail message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns `true` if this error's class is `class` or one of its subclasses.
    #[must_use]
    pub fn is_instance_of(&self, class: &ErrorClass) -> bool {
        self.class.is_subclass_of(class)
    }
}

impl fmt::Display for Throwable {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}: {}", self.class, self.message)
    }
}

impl std::error::Error for Throwable {}

impl From<HandleError> for Throwable {
    fn from(error: HandleError) -> Self {
        let class = match error {
            HandleError::WrongSignature { .. } => ErrorClass::wrong_method_type(),
            _ => ErrorClass::illegal_argument(),
        };
        Self::new(class, error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signature::Type;

    #[test]
    fn test_signature_mismatch_display() {
        let error = HandleError::signature_mismatch("guard_with_test", "test must return boolean");
        assert_eq!(
            format!("{error}"),
            "guard_with_test: signature mismatch: test must return boolean"
        );
    }

    #[test]
    fn test_incompatible_clauses_display() {
        let error = HandleError::incompatible_clauses("step of clause 1 returns long");
        assert_eq!(
            format!("{error}"),
            "loop: incompatible clause signatures: step of clause 1 returns long"
        );
    }

    #[test]
    fn test_wrong_signature_becomes_wrong_method_type() {
        let from = Signature::new(Type::INT, [Type::INT]).unwrap();
        let to = Signature::new(Type::INT, [Type::String]).unwrap();
        let throwable = Throwable::from(HandleError::wrong_signature(&from, &to));
        assert_eq!(throwable.class(), &ErrorClass::wrong_method_type());
        assert_eq!(
            throwable.message(),
            "cannot convert handle of (int)int to (String)int"
        );
    }

    #[test]
    fn test_other_errors_become_illegal_argument() {
        let throwable = Throwable::from(HandleError::illegal_argument("bind_to", "bad value"));
        assert!(throwable.is_instance_of(&ErrorClass::illegal_argument()));
    }
}
