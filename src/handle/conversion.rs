//! Argument and return value conversions used by [`MethodHandle::as_type`].
//!
//! A conversion from a slot of type `from` to a slot of type `to` is
//! statically legal when [`can_convert`] says so. Some legal conversions
//! still check at invocation time (reference casts, unboxing from
//! `Object`), raising `ClassCastException` or `NullPointerException`.
//!
//! | from \ to | primitive | reference | void |
//! |---|---|---|---|
//! | primitive | widening table | box, then assign | discard |
//! | reference | unbox (+ widen) | checked cast | discard |
//! | void | zero | null | identity |

use smallvec::SmallVec;

use super::{InvokeResult, MethodHandle};
use crate::error::{HandleError, Throwable};
use crate::signature::{Signature, Type};
use crate::value::Value;

/// Returns `true` if a value of static type `from` may be adapted to a slot
/// of type `to`.
///
/// # Examples
///
/// ```rust
/// use callgraft::handle::can_convert;
/// use callgraft::signature::{PrimitiveKind, Type};
///
/// assert!(can_convert(&Type::INT, &Type::LONG));
/// assert!(can_convert(&Type::INT, &Type::Object));
/// assert!(can_convert(&Type::Boxed(PrimitiveKind::Int), &Type::LONG));
/// assert!(can_convert(&Type::Object, &Type::String));
/// assert!(!can_convert(&Type::LONG, &Type::INT));
/// assert!(!can_convert(&Type::INT, &Type::String));
/// ```
#[must_use]
pub fn can_convert(from: &Type, to: &Type) -> bool {
    if from == to || to.is_void() || from.is_void() {
        return true;
    }
    match (from, to) {
        (Type::Primitive(source), Type::Primitive(target)) => source.widens_to(*target),
        (Type::Primitive(source), reference) => reference.is_assignable_from(&Type::Boxed(*source)),
        (Type::Boxed(source), Type::Primitive(target)) => source.widens_to(*target),
        (Type::Object, Type::Primitive(_)) => true,
        (_, Type::Primitive(_)) => false,
        _ => true,
    }
}

/// Converts `value`, statically typed as `from`, into a slot of type `to`.
///
/// Assumes [`can_convert`] holds for the pair.
pub(crate) fn convert(value: Value, from: &Type, to: &Type) -> InvokeResult {
    if from == to {
        return Ok(value);
    }
    match to {
        Type::Void => Ok(Value::Void),
        _ if from.is_void() => Ok(Value::zero(to)),
        Type::Primitive(target) => value
            .widen_to(*target)
            .ok_or_else(|| value.cast_failure(to)),
        reference => {
            if value.is_instance_of(reference) {
                Ok(value)
            } else {
                Err(value.cast_failure(reference))
            }
        }
    }
}

/// Fits a constant into a slot of type `target`, widening primitives.
///
/// Returns `None` if the value is not usable in that slot.
pub(crate) fn coerce(value: Value, target: &Type) -> Option<Value> {
    if value.is_instance_of(target) {
        return Some(value);
    }
    match target {
        Type::Primitive(kind) => value.widen_to(*kind),
        _ => None,
    }
}

impl MethodHandle {
    /// Adapts this handle to `target` by converting each argument and the
    /// return value.
    ///
    /// Returns a clone when the signatures are already equal.
    ///
    /// # Errors
    ///
    /// Returns [`HandleError::WrongSignature`] if the parameter counts
    /// differ or any pairwise conversion is not legal.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use callgraft::{MethodHandle, Value};
    /// use callgraft::signature::{Signature, Type};
    ///
    /// let square = MethodHandle::new(
    ///     Signature::new(Type::INT, [Type::INT])?,
    ///     |arguments| Ok(Value::Int(arguments[0].as_int()?.pow(2))),
    /// );
    /// let boxed = square.as_type(&Signature::new(Type::Object, [Type::Object])?)?;
    /// assert_eq!(boxed.invoke_exact(&[Value::Int(7)]), Ok(Value::Int(49)));
    ///
    /// let failure = boxed.invoke_exact(&[Value::from("seven")]).unwrap_err();
    /// assert_eq!(failure.class().name(), "ClassCastException");
    /// # Ok::<(), callgraft::HandleError>(())
    /// ```
    pub fn as_type(&self, target: &Signature) -> Result<Self, HandleError> {
        if self.signature() == target {
            return Ok(self.clone());
        }
        let legal = self.arity() == target.parameter_count()
            && target
                .parameters()
                .iter()
                .zip(self.parameters())
                .all(|(incoming, expected)| can_convert(incoming, expected))
            && can_convert(self.return_type(), target.return_type());
        if !legal {
            tracing::debug!(from = %self.signature(), to = %target, "as_type rejected");
            return Err(HandleError::wrong_signature(self.signature(), target));
        }
        let source = self.clone();
        let call_site = target.clone();
        Ok(Self::new(target.clone(), move |arguments| {
            let converted = arguments
                .iter()
                .zip(call_site.parameters())
                .zip(source.parameters())
                .map(|((argument, from), to)| convert(argument.clone(), from, to))
                .collect::<Result<SmallVec<[Value; 8]>, Throwable>>()?;
            let result = source.invoke_basic(&converted)?;
            convert(result, source.return_type(), call_site.return_type())
        }))
    }
}
