//! Leaf handles: identity, constants, zero values, invokers, error raising
//! and array access.
//!
//! Shapes that depend only on a type or signature (`identity`, `zero`,
//! `exact_invoker`, `invoker`) are memoized process-wide when the `cache`
//! feature is enabled.

use std::sync::LazyLock;

use crate::error::{HandleError, Throwable};
use crate::handle::{MethodHandle, coerce};
use crate::signature::{ErrorClass, Signature, Type};
use crate::value::{ArrayValue, Value};

#[cfg(feature = "cache")]
type Shapes<K> = crate::cache::ShapeCache<K, MethodHandle>;

#[cfg(not(feature = "cache"))]
type Shapes<K> = Uncached<K>;

/// Stand-in for the shape cache that always rebuilds.
#[cfg(not(feature = "cache"))]
struct Uncached<K>(std::marker::PhantomData<fn(K)>);

#[cfg(not(feature = "cache"))]
impl<K> Uncached<K> {
    const fn new() -> Self {
        Self(std::marker::PhantomData)
    }

    fn get_or_insert_with<F: FnOnce() -> MethodHandle>(&self, _key: K, build: F) -> MethodHandle {
        build()
    }

    fn try_get_or_insert_with<F, E>(&self, _key: K, build: F) -> Result<MethodHandle, E>
    where
        F: FnOnce() -> Result<MethodHandle, E>,
    {
        build()
    }
}

static IDENTITIES: LazyLock<Shapes<Type>> = LazyLock::new(Shapes::<Type>::new);
static ZEROS: LazyLock<Shapes<Type>> = LazyLock::new(Shapes::<Type>::new);
static EXACT_INVOKERS: LazyLock<Shapes<Signature>> = LazyLock::new(Shapes::<Signature>::new);
static INVOKERS: LazyLock<Shapes<Signature>> = LazyLock::new(Shapes::<Signature>::new);

// =============================================================================
// Identity, constant, zero, empty
// =============================================================================

/// Returns the handle `(T)T` that returns its argument.
///
/// # Errors
///
/// Returns [`HandleError::IllegalArgument`] if `ty` is `Void`.
///
/// # Examples
///
/// ```rust
/// use callgraft::Value;
/// use callgraft::combinator::identity;
/// use callgraft::signature::Type;
///
/// let same = identity(&Type::String)?;
/// assert_eq!(same.invoke_exact(&[Value::from("x")]), Ok(Value::from("x")));
/// # Ok::<(), callgraft::HandleError>(())
/// ```
pub fn identity(ty: &Type) -> Result<MethodHandle, HandleError> {
    if ty.is_void() {
        return Err(HandleError::illegal_argument(
            "identity",
            "void has no identity",
        ));
    }
    IDENTITIES.try_get_or_insert_with(ty.clone(), || {
        let signature = Signature::new(ty.clone(), [ty.clone()])?;
        Ok(MethodHandle::new(signature, |arguments| {
            Ok(arguments[0].clone())
        }))
    })
}

/// Returns the handle `()T` that always returns `value`.
///
/// Primitive constants are widened to `ty` when needed.
///
/// # Errors
///
/// Returns [`HandleError::IllegalArgument`] if `ty` is `Void` or `value`
/// cannot occupy a slot of type `ty`.
pub fn constant(ty: &Type, value: Value) -> Result<MethodHandle, HandleError> {
    if ty.is_void() {
        return Err(HandleError::illegal_argument(
            "constant",
            "void constants are not allowed",
        ));
    }
    let description = value.to_string();
    let value = coerce(value, ty).ok_or_else(|| {
        HandleError::illegal_argument("constant", format!("{description} is not a {ty}"))
    })?;
    Ok(MethodHandle::new(
        Signature::returning(ty.clone()),
        move |_| Ok(value.clone()),
    ))
}

/// Returns the handle `()T` that returns the zero value of `ty`.
///
/// For `Void` the handle returns `Value::Void`.
pub fn zero(ty: &Type) -> MethodHandle {
    ZEROS.get_or_insert_with(ty.clone(), || {
        let value = Value::zero(ty);
        MethodHandle::new(Signature::returning(ty.clone()), move |_| {
            Ok(value.clone())
        })
    })
}

/// Returns a handle of `signature` that ignores its arguments and returns
/// the zero value of the return type.
pub fn empty(signature: &Signature) -> MethodHandle {
    let value = Value::zero(signature.return_type());
    MethodHandle::new(signature.clone(), move |_| Ok(value.clone()))
}

// =============================================================================
// Invokers
// =============================================================================

/// Returns a handle `(MethodHandle, A...)R` that exactly invokes its leading
/// handle argument, whose signature must equal `signature`.
///
/// # Errors
///
/// Returns [`HandleError::IllegalArgument`] only if the resulting signature
/// cannot be formed. Invoking with a handle of another signature raises
/// `WrongMethodTypeException`.
pub fn exact_invoker(signature: &Signature) -> Result<MethodHandle, HandleError> {
    EXACT_INVOKERS.try_get_or_insert_with(signature.clone(), || {
        let expected = signature.clone();
        Ok(MethodHandle::new(
            signature.insert_parameters(0, [Type::Handle])?,
            move |arguments| {
                let target = arguments[0].as_handle()?;
                if target.signature() != &expected {
                    return Err(Throwable::wrong_method_type(format!(
                        "expected a handle of {expected}, got {}",
                        target.signature()
                    )));
                }
                target.invoke_basic(&arguments[1..])
            },
        ))
    })
}

/// Returns a handle `(MethodHandle, A...)R` that invokes its leading handle
/// argument after adapting it to `signature` with
/// [`MethodHandle::as_type`].
///
/// # Errors
///
/// Returns [`HandleError::IllegalArgument`] only if the resulting signature
/// cannot be formed. Invoking with a handle that cannot be adapted raises
/// `WrongMethodTypeException`.
pub fn invoker(signature: &Signature) -> Result<MethodHandle, HandleError> {
    INVOKERS.try_get_or_insert_with(signature.clone(), || {
        let call_site = signature.clone();
        Ok(MethodHandle::new(
            signature.insert_parameters(0, [Type::Handle])?,
            move |arguments| {
                let target = arguments[0].as_handle()?;
                target.as_type(&call_site)?.invoke_basic(&arguments[1..])
            },
        ))
    })
}

// =============================================================================
// Errors
// =============================================================================

/// Returns a handle `(E)R` that raises its argument, where `E` is the error
/// type of `class`. The handle never returns normally.
///
/// # Examples
///
/// ```rust
/// use callgraft::{Throwable, Value};
/// use callgraft::combinator::throw_exception;
/// use callgraft::signature::{ErrorClass, Type};
///
/// let raise = throw_exception(&Type::INT, &ErrorClass::illegal_state())?;
/// let error = Throwable::new(ErrorClass::illegal_state(), "closed");
/// assert_eq!(raise.invoke_exact(&[Value::Throwable(error.clone())]), Err(error));
/// # Ok::<(), callgraft::HandleError>(())
/// ```
///
/// # Errors
///
/// Returns [`HandleError::IllegalArgument`] only if the signature cannot be
/// formed.
pub fn throw_exception(return_type: &Type, class: &ErrorClass) -> Result<MethodHandle, HandleError> {
    let error_type = Type::Throwable(class.clone());
    let signature = Signature::new(return_type.clone(), [error_type.clone()])?;
    Ok(MethodHandle::new(signature, move |arguments| match &arguments[0] {
        Value::Throwable(error) => Err(error.clone()),
        other => Err(other.cast_failure(&error_type)),
    }))
}

// =============================================================================
// Arrays
// =============================================================================

/// Returns a handle `(int)T[]` creating an array of zero values.
///
/// # Errors
///
/// Returns [`HandleError::IllegalArgument`] if `array_type` is not an
/// array type. A negative length raises `IllegalArgumentException`.
pub fn array_constructor(array_type: &Type) -> Result<MethodHandle, HandleError> {
    let element = array_element("array_constructor", array_type)?;
    let signature = Signature::new(array_type.clone(), [Type::INT])?;
    Ok(MethodHandle::new(signature, move |arguments| {
        let length = arguments[0].as_int()?;
        let length = usize::try_from(length)
            .map_err(|_| Throwable::illegal_argument(format!("negative array length {length}")))?;
        let items = std::iter::repeat_n(Value::zero(&element), length);
        Ok(Value::Array(ArrayValue::new(element.clone(), items)))
    }))
}

/// Returns a handle `(T[])int` reporting the array length.
///
/// # Errors
///
/// Returns [`HandleError::IllegalArgument`] if `array_type` is not an
/// array type. A null array raises `NullPointerException`.
pub fn array_length(array_type: &Type) -> Result<MethodHandle, HandleError> {
    array_element("array_length", array_type)?;
    let signature = Signature::new(Type::INT, [array_type.clone()])?;
    Ok(MethodHandle::new(signature, |arguments| {
        let length = arguments[0].as_array()?.len();
        i32::try_from(length)
            .map(Value::Int)
            .map_err(|_| Throwable::index_out_of_bounds("array too long for int length"))
    }))
}

/// Returns a handle `(T[], int)T` reading one element.
///
/// # Errors
///
/// Returns [`HandleError::IllegalArgument`] if `array_type` is not an
/// array type. An out-of-range index raises `IndexOutOfBoundsException`.
pub fn array_element_getter(array_type: &Type) -> Result<MethodHandle, HandleError> {
    let element = array_element("array_element_getter", array_type)?;
    let signature = Signature::new(element, [array_type.clone(), Type::INT])?;
    Ok(MethodHandle::new(signature, |arguments| {
        let array = arguments[0].as_array()?;
        let index = arguments[1].as_int()?;
        usize::try_from(index)
            .ok()
            .and_then(|index| array.items().get(index))
            .cloned()
            .ok_or_else(|| {
                Throwable::index_out_of_bounds(format!(
                    "index {index} out of bounds for length {}",
                    array.len()
                ))
            })
    }))
}

fn array_element(operation: &'static str, array_type: &Type) -> Result<Type, HandleError> {
    array_type.element_type().cloned().ok_or_else(|| {
        HandleError::illegal_argument(operation, format!("{array_type} is not an array type"))
    })
}
