//! Combinators that derive new handles from existing ones.
//!
//! Every combinator is a free function that checks the signatures of its
//! inputs up front and fails with a [`HandleError`](crate::HandleError)
//! when they do not fit together. A handle that composes successfully
//! never fails at invocation time because of a signature disagreement;
//! only the errors raised by the composed bodies themselves propagate.
//!
//! - [`basic`]: leaf handles such as [`identity`], [`constant`] and the
//!   invokers
//! - [`arguments`]: [`insert_arguments`], [`drop_arguments`],
//!   [`filter_arguments`], [`collect_arguments`], [`fold_arguments`] and
//!   friends
//! - [`permute`]: [`permute_arguments`] and its normalizer
//! - [`guard`]: [`guard_with_test`], [`catch_exception`], [`try_finally`]
//!   and [`table_switch`]
//!
//! # Examples
//!
//! ```rust
//! use callgraft::{MethodHandle, Value};
//! use callgraft::combinator::{filter_return_value, insert_arguments};
//! use callgraft::signature::{Signature, Type};
//!
//! let multiply = MethodHandle::new(
//!     Signature::new(Type::INT, [Type::INT, Type::INT])?,
//!     |arguments| Ok(Value::Int(arguments[0].as_int()? * arguments[1].as_int()?)),
//! );
//! let describe = MethodHandle::new(
//!     Signature::new(Type::String, [Type::INT])?,
//!     |arguments| Ok(Value::from(format!("= {}", arguments[0]))),
//! );
//! let triple = insert_arguments(&multiply, 0, [Value::Int(3)])?;
//! let pipeline = filter_return_value(&triple, &describe)?;
//! assert_eq!(pipeline.invoke_exact(&[Value::Int(14)]), Ok(Value::from("= 42")));
//! # Ok::<(), callgraft::HandleError>(())
//! ```

pub mod arguments;
pub mod basic;
pub mod guard;
pub mod permute;

pub use arguments::{
    collect_arguments, drop_arguments, drop_arguments_to_match, drop_return, filter_arguments,
    filter_return_value, fold_arguments, fold_arguments_at, insert_arguments,
};
pub use basic::{
    array_constructor, array_element_getter, array_length, constant, empty, exact_invoker,
    identity, invoker, throw_exception, zero,
};
pub use guard::{catch_exception, guard_with_test, table_switch, try_finally};
pub use permute::{NormalizedPermutation, RewriteStep, normalize_permutation, permute_arguments};
