//! # callgraft
//!
//! A typed call-adapter algebra for Rust.
//!
//! ## Overview
//!
//! A [`MethodHandle`] is an immutable callable value with an explicit
//! [`Signature`]. Combinators derive new handles from existing ones by
//! rewriting their signatures and wiring their arguments, and every
//! composition is checked when it is built rather than when it runs.
//!
//! - **Signatures**: [`Signature`], [`Type`] and the primitive conversion
//!   table
//! - **Handles**: exact and loose invocation, [`MethodHandle::as_type`],
//!   spreading and collecting arrays
//! - **Argument combinators**: insert, drop, permute, filter, collect, fold
//! - **Guards**: [`combinator::guard_with_test`],
//!   [`combinator::catch_exception`], [`combinator::try_finally`],
//!   [`combinator::table_switch`]
//! - **Loops**: the multi-clause [`loops::clause_loop`] and the while,
//!   do-while, counted and iterated shapes built on it
//!
//! Composition failures are reported as [`HandleError`]; errors raised by
//! running a handle are [`Throwable`] values.
//!
//! ## Feature Flags
//!
//! - `cache` (default): memoize frequently rebuilt handle shapes in a
//!   shared [`cache::ShapeCache`]
//! - `serde`: `Serialize`/`Deserialize` for signatures and types
//! - `full`: Enable all features
//!
//! ## Example
//!
//! ```rust
//! use callgraft::prelude::*;
//!
//! let concat = MethodHandle::new(
//!     Signature::new(Type::String, [Type::String, Type::String])?,
//!     |arguments| Ok(Value::from(format!("{}{}", arguments[0], arguments[1]))),
//! );
//! let greet = insert_arguments(&concat, 0, [Value::from("hello, ")])?;
//! assert_eq!(greet.invoke_exact(&[Value::from("world")]), Ok(Value::from("hello, world")));
//! # Ok::<(), HandleError>(())
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
// Note: Disabling redundant_closure_for_method_calls due to clippy 0.1.92 panic bug
#![allow(clippy::redundant_closure_for_method_calls)]

/// Prelude module for convenient imports.
///
/// Re-exports the core types and every combinator.
///
/// # Usage
///
/// ```rust
/// use callgraft::prelude::*;
/// ```
pub mod prelude {
    pub use crate::combinator::*;
    pub use crate::error::{HandleError, Throwable};
    pub use crate::handle::{InvokeResult, MethodHandle};
    pub use crate::loops::*;
    pub use crate::signature::{ErrorClass, PrimitiveKind, Signature, Type};
    pub use crate::value::{ArrayValue, IteratorValue, Value};
}

#[cfg(feature = "cache")]
pub mod cache;

pub mod combinator;
pub mod error;
pub mod handle;
pub mod loops;
pub mod signature;
pub mod value;

pub use error::{HandleError, Throwable};
pub use handle::{InvokeResult, MethodHandle};
pub use signature::{Signature, Type};
pub use value::Value;
