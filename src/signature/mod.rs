//! Handle signatures.
//!
//! A [`Signature`] is an immutable pair of a return [`Type`] and an ordered
//! list of parameter types. Every transformation returns a new signature;
//! the parameter list is shared between clones.
//!
//! # Invariant
//!
//! No parameter is [`Type::Void`]. Only the return type may be void.
//!
//! # Examples
//!
//! ```rust
//! use callgraft::signature::{Signature, Type};
//!
//! let signature = Signature::new(Type::INT, [Type::INT, Type::String])?;
//! assert_eq!(signature.to_string(), "(int,String)int");
//!
//! let widened = signature.insert_parameters(1, [Type::LONG])?;
//! assert_eq!(widened.to_string(), "(int,long,String)int");
//!
//! let dropped = widened.drop_parameters(0, 2)?;
//! assert_eq!(dropped.to_string(), "(String)int");
//! # Ok::<(), callgraft::HandleError>(())
//! ```

pub mod types;

pub use types::{ErrorClass, PrimitiveKind, Type};

use std::fmt;
use std::sync::Arc;

use crate::error::HandleError;

/// The shape of a handle: return type plus ordered parameter types.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "RawSignature"))]
pub struct Signature {
    return_type: Type,
    parameters: Arc<[Type]>,
}

/// Deserialized form, checked by [`Signature::new`].
#[cfg(feature = "serde")]
#[derive(serde::Deserialize)]
struct RawSignature {
    return_type: Type,
    parameters: Vec<Type>,
}

#[cfg(feature = "serde")]
impl TryFrom<RawSignature> for Signature {
    type Error = HandleError;

    fn try_from(raw: RawSignature) -> Result<Self, Self::Error> {
        Self::new(raw.return_type, raw.parameters)
    }
}

impl Signature {
    /// Creates a signature.
    ///
    /// # Errors
    ///
    /// Returns [`HandleError::IllegalArgument`] if any parameter is `Void`.
    pub fn new(
        return_type: Type,
        parameters: impl IntoIterator<Item = Type>,
    ) -> Result<Self, HandleError> {
        let parameters: Arc<[Type]> = parameters.into_iter().collect();
        check_parameters("Signature::new", &parameters)?;
        Ok(Self {
            return_type,
            parameters,
        })
    }

    /// Creates a signature that takes no parameters.
    #[must_use]
    pub fn returning(return_type: Type) -> Self {
        Self {
            return_type,
            parameters: Arc::from([]),
        }
    }

    /// Creates the signature `(Object, ..., Object)Object` with `count` parameters.
    #[must_use]
    pub fn generic(count: usize) -> Self {
        Self {
            return_type: Type::Object,
            parameters: std::iter::repeat_n(Type::Object, count).collect(),
        }
    }

    /// Returns the return type.
    #[must_use]
    pub const fn return_type(&self) -> &Type {
        &self.return_type
    }

    /// Returns the parameter types in order.
    #[must_use]
    pub fn parameters(&self) -> &[Type] {
        &self.parameters
    }

    /// Returns the number of parameters.
    #[must_use]
    pub fn parameter_count(&self) -> usize {
        self.parameters.len()
    }

    /// Returns the parameter type at `index`, if any.
    #[must_use]
    pub fn parameter(&self, index: usize) -> Option<&Type> {
        self.parameters.get(index)
    }

    /// Returns the last parameter type, if any.
    #[must_use]
    pub fn last_parameter(&self) -> Option<&Type> {
        self.parameters.last()
    }

    /// Returns `true` if the return type or any parameter type is primitive.
    #[must_use]
    pub fn has_primitives(&self) -> bool {
        self.return_type.is_primitive() || self.parameters.iter().any(Type::is_primitive)
    }

    /// Removes the parameters in `start..end`.
    ///
    /// # Errors
    ///
    /// Returns [`HandleError::IllegalArgument`] if the range is reversed or
    /// exceeds the parameter count.
    pub fn drop_parameters(&self, start: usize, end: usize) -> Result<Self, HandleError> {
        if start > end || end > self.parameters.len() {
            return Err(HandleError::illegal_argument(
                "drop_parameters",
                format!(
                    "range {start}..{end} out of bounds for {} parameters",
                    self.parameters.len()
                ),
            ));
        }
        if start == end {
            return Ok(self.clone());
        }
        let parameters = self.parameters[..start]
            .iter()
            .chain(&self.parameters[end..])
            .cloned()
            .collect();
        Ok(self.with_parameters(parameters))
    }

    /// Inserts `types` before the parameter at `index`.
    ///
    /// # Errors
    ///
    /// Returns [`HandleError::IllegalArgument`] if `index` exceeds the
    /// parameter count or any inserted type is `Void`.
    pub fn insert_parameters(
        &self,
        index: usize,
        types: impl IntoIterator<Item = Type>,
    ) -> Result<Self, HandleError> {
        if index > self.parameters.len() {
            return Err(HandleError::illegal_argument(
                "insert_parameters",
                format!(
                    "index {index} out of bounds for {} parameters",
                    self.parameters.len()
                ),
            ));
        }
        let inserted: Vec<Type> = types.into_iter().collect();
        check_parameters("insert_parameters", &inserted)?;
        if inserted.is_empty() {
            return Ok(self.clone());
        }
        let parameters = self.parameters[..index]
            .iter()
            .chain(&inserted)
            .chain(&self.parameters[index..])
            .cloned()
            .collect();
        Ok(self.with_parameters(parameters))
    }

    /// Appends `types` after the last parameter.
    ///
    /// # Errors
    ///
    /// Returns [`HandleError::IllegalArgument`] if any appended type is `Void`.
    pub fn append_parameters(
        &self,
        types: impl IntoIterator<Item = Type>,
    ) -> Result<Self, HandleError> {
        self.insert_parameters(self.parameters.len(), types)
    }

    /// Replaces the parameter at `index` with `parameter`.
    ///
    /// # Errors
    ///
    /// Returns [`HandleError::IllegalArgument`] if `index` is out of range or
    /// `parameter` is `Void`.
    pub fn change_parameter(&self, index: usize, parameter: Type) -> Result<Self, HandleError> {
        if index >= self.parameters.len() {
            return Err(HandleError::illegal_argument(
                "change_parameter",
                format!(
                    "index {index} out of bounds for {} parameters",
                    self.parameters.len()
                ),
            ));
        }
        check_parameters("change_parameter", std::slice::from_ref(&parameter))?;
        let mut parameters = self.parameters.to_vec();
        parameters[index] = parameter;
        Ok(self.with_parameters(parameters.into()))
    }

    /// Returns this signature with a different return type.
    #[must_use]
    pub fn change_return_type(&self, return_type: Type) -> Self {
        Self {
            return_type,
            parameters: Arc::clone(&self.parameters),
        }
    }

    /// Tests whether this parameter list, after skipping `skip` leading
    /// types, is a prefix of `full`.
    ///
    /// Two lists are effectively identical when the shorter one can be
    /// padded with trailing ignored parameters to produce the longer one.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use callgraft::signature::{Signature, Type};
    ///
    /// let short = Signature::new(Type::Void, [Type::INT])?;
    /// assert!(short.effectively_identical_parameters(0, &[Type::INT, Type::String]));
    /// assert!(!short.effectively_identical_parameters(0, &[Type::String]));
    ///
    /// let long = Signature::new(Type::Void, [Type::LONG, Type::INT])?;
    /// assert!(long.effectively_identical_parameters(1, &[Type::INT, Type::String]));
    /// # Ok::<(), callgraft::HandleError>(())
    /// ```
    #[must_use]
    pub fn effectively_identical_parameters(&self, skip: usize, full: &[Type]) -> bool {
        let length = self.parameters.len();
        if skip > length || length - skip > full.len() {
            return false;
        }
        let own = &self.parameters[skip..];
        own == &full[..own.len()]
    }

    /// Boxes every primitive parameter and return type.
    #[must_use]
    pub fn wrap(&self) -> Self {
        Self {
            return_type: self.return_type.wrap(),
            parameters: self.parameters.iter().map(Type::wrap).collect(),
        }
    }

    /// Unboxes every boxed parameter and return type.
    #[must_use]
    pub fn unwrap(&self) -> Self {
        Self {
            return_type: self.return_type.unwrap(),
            parameters: self.parameters.iter().map(Type::unwrap).collect(),
        }
    }

    /// Replaces every reference type by `Object`, keeping primitives and `Void`.
    #[must_use]
    pub fn erase(&self) -> Self {
        let erase = |ty: &Type| {
            if ty.is_reference() {
                Type::Object
            } else {
                ty.clone()
            }
        };
        Self {
            return_type: erase(&self.return_type),
            parameters: self.parameters.iter().map(erase).collect(),
        }
    }

    fn with_parameters(&self, parameters: Arc<[Type]>) -> Self {
        Self {
            return_type: self.return_type.clone(),
            parameters,
        }
    }
}

fn check_parameters(operation: &'static str, parameters: &[Type]) -> Result<(), HandleError> {
    match parameters.iter().position(Type::is_void) {
        Some(index) => Err(HandleError::illegal_argument(
            operation,
            format!("parameter {index} is void"),
        )),
        None => Ok(()),
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str("(")?;
        for (index, parameter) in self.parameters.iter().enumerate() {
            if index > 0 {
                formatter.write_str(",")?;
            }
            write!(formatter, "{parameter}")?;
        }
        write!(formatter, "){}", self.return_type)
    }
}

static_assertions::assert_impl_all!(Signature: Send, Sync, Clone);

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Signature {
        Signature::new(Type::INT, [Type::INT, Type::String, Type::LONG]).unwrap()
    }

    #[test]
    fn test_void_parameter_rejected() {
        let error = Signature::new(Type::INT, [Type::INT, Type::Void]).unwrap_err();
        assert!(matches!(error, HandleError::IllegalArgument { .. }));
    }

    #[test]
    fn test_drop_parameters_empty_range_is_identity() {
        assert_eq!(sample().drop_parameters(2, 2).unwrap(), sample());
    }

    #[test]
    fn test_drop_parameters_out_of_range() {
        assert!(sample().drop_parameters(1, 4).is_err());
        assert!(sample().drop_parameters(2, 1).is_err());
    }

    #[test]
    fn test_insert_void_rejected() {
        assert!(sample().insert_parameters(0, [Type::Void]).is_err());
    }

    #[test]
    fn test_change_parameter() {
        let changed = sample().change_parameter(1, Type::Object).unwrap();
        assert_eq!(changed.to_string(), "(int,Object,long)int");
        assert!(sample().change_parameter(3, Type::INT).is_err());
    }

    #[test]
    fn test_effectively_identical_rejects_skip_past_end() {
        assert!(!sample().effectively_identical_parameters(4, &[]));
        assert!(sample().effectively_identical_parameters(3, &[]));
    }

    #[test]
    fn test_wrap_erase() {
        assert_eq!(sample().wrap().to_string(), "(Integer,String,Long)Integer");
        assert_eq!(sample().erase().to_string(), "(int,Object,long)int");
        assert!(!sample().wrap().has_primitives());
    }

    #[test]
    fn test_generic() {
        assert_eq!(Signature::generic(2).to_string(), "(Object,Object)Object");
    }
}
