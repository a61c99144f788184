//! Method handles: immutable callable values tagged with a signature.
//!
//! A [`MethodHandle`] pairs a [`Signature`] with a body. Handles are created
//! by the host through [`MethodHandle::new`] (the host is responsible for
//! the body honoring the signature) or by the combinators in
//! [`combinator`](crate::combinator) and [`loops`](crate::loops), which
//! check every composition when it is built.
//!
//! Handles never change after construction. Cloning a handle shares its
//! body, so handles are cheap to capture inside other handles.
//!
//! # Invocation
//!
//! - [`MethodHandle::invoke_exact`] requires the arguments to match the
//!   signature exactly; a mismatch raises `WrongMethodTypeException`.
//! - [`MethodHandle::invoke`] derives a call-site signature from the
//!   arguments' runtime types and adapts the handle with
//!   [`MethodHandle::as_type`] first.
//!
//! # Examples
//!
//! ```rust
//! use callgraft::{MethodHandle, Value};
//! use callgraft::signature::{Signature, Type};
//!
//! let add = MethodHandle::new(
//!     Signature::new(Type::INT, [Type::INT, Type::INT])?,
//!     |arguments| Ok(Value::Int(arguments[0].as_int()? + arguments[1].as_int()?)),
//! );
//!
//! assert_eq!(add.invoke_exact(&[Value::Int(2), Value::Int(3)]), Ok(Value::Int(5)));
//! assert!(add.invoke_exact(&[Value::Long(2), Value::Int(3)]).is_err());
//!
//! let increment = add.bind_to(Value::Int(1))?;
//! assert_eq!(increment.invoke_exact(&[Value::Int(41)]), Ok(Value::Int(42)));
//! # Ok::<(), callgraft::HandleError>(())
//! ```

mod conversion;
mod spread;

pub use conversion::can_convert;
pub(crate) use conversion::{coerce, convert};

use std::fmt;
use std::sync::Arc;

use crate::combinator;
use crate::error::{HandleError, Throwable};
use crate::signature::{Signature, Type};
use crate::value::Value;

/// The result of invoking a handle.
pub type InvokeResult = Result<Value, Throwable>;

type Body = dyn Fn(&[Value]) -> InvokeResult + Send + Sync;

/// An immutable, invocable value with a known signature.
#[derive(Clone)]
pub struct MethodHandle {
    signature: Signature,
    body: Arc<Body>,
}

impl MethodHandle {
    /// Creates a handle from a body.
    ///
    /// The body receives exactly `signature.parameter_count()` arguments,
    /// each an instance of its parameter type, and must return an instance
    /// of the return type (`Value::Void` for void).
    pub fn new<F>(signature: Signature, body: F) -> Self
    where
        F: Fn(&[Value]) -> InvokeResult + Send + Sync + 'static,
    {
        Self {
            signature,
            body: Arc::new(body),
        }
    }

    /// Returns the signature.
    #[must_use]
    pub const fn signature(&self) -> &Signature {
        &self.signature
    }

    /// Returns the number of parameters.
    #[must_use]
    pub fn arity(&self) -> usize {
        self.signature.parameter_count()
    }

    /// Returns the parameter types.
    #[must_use]
    pub fn parameters(&self) -> &[Type] {
        self.signature.parameters()
    }

    /// Returns the return type.
    #[must_use]
    pub const fn return_type(&self) -> &Type {
        self.signature.return_type()
    }

    /// Returns `true` if both handles share one body.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.body, &other.body)
    }

    /// Invokes the handle with arguments that match its signature exactly.
    ///
    /// # Errors
    ///
    /// Raises `WrongMethodTypeException` if the argument count differs from
    /// the arity or an argument is not an instance of its parameter type.
    /// Otherwise returns whatever the body returns or raises.
    pub fn invoke_exact(&self, arguments: &[Value]) -> InvokeResult {
        self.check_exact(arguments)?;
        self.invoke_basic(arguments)
    }

    /// Invokes the handle after adapting it to the runtime types of
    /// `arguments`.
    ///
    /// The call site is typed by [`Value::static_type`] of each argument and
    /// keeps this handle's return type, so `Int` arguments widen into
    /// `long` parameters, `Int` arguments box into `Object` parameters, and
    /// so on.
    ///
    /// # Errors
    ///
    /// Raises `WrongMethodTypeException` if no conversion exists, and
    /// otherwise returns whatever the body returns or raises.
    pub fn invoke(&self, arguments: &[Value]) -> InvokeResult {
        let call_site = Signature::new(
            self.return_type().clone(),
            arguments.iter().map(Value::static_type),
        )?;
        self.invoke_with(&call_site, arguments)
    }

    /// Invokes the handle through an explicitly typed call site.
    ///
    /// # Errors
    ///
    /// Raises `WrongMethodTypeException` if this handle cannot be adapted to
    /// `call_site` or the arguments do not match `call_site` exactly.
    pub fn invoke_with(&self, call_site: &Signature, arguments: &[Value]) -> InvokeResult {
        self.as_type(call_site)?.invoke_exact(arguments)
    }

    /// Fixes the leading parameter to `value`.
    ///
    /// # Errors
    ///
    /// Returns [`HandleError::IllegalArgument`] if the handle has no
    /// parameters or `value` cannot occupy the leading slot.
    pub fn bind_to(&self, value: Value) -> Result<Self, HandleError> {
        combinator::insert_arguments(self, 0, [value])
    }

    /// Calls the body without checking the arguments. Composition has
    /// already established that they match.
    #[inline]
    pub(crate) fn invoke_basic(&self, arguments: &[Value]) -> InvokeResult {
        (self.body)(arguments)
    }

    fn check_exact(&self, arguments: &[Value]) -> Result<(), Throwable> {
        if arguments.len() != self.arity() {
            return Err(Throwable::wrong_method_type(format!(
                "expected {} arguments for {}, got {}",
                self.arity(),
                self.signature,
                arguments.len()
            )));
        }
        let mismatch = self
            .parameters()
            .iter()
            .zip(arguments)
            .position(|(parameter, argument)| !argument.is_instance_of(parameter));
        match mismatch {
            Some(index) => Err(Throwable::wrong_method_type(format!(
                "argument {index} of {} must be {}, got {}",
                self.signature,
                self.signature.parameters()[index],
                arguments[index].static_type()
            ))),
            None => Ok(()),
        }
    }
}

impl fmt::Debug for MethodHandle {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "MethodHandle{}", self.signature)
    }
}

impl fmt::Display for MethodHandle {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "MethodHandle{}", self.signature)
    }
}

static_assertions::assert_impl_all!(MethodHandle: Send, Sync, Clone);
