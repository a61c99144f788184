//! Control-flow combinators: guards, error interception, cleanup and
//! table switches.

use smallvec::SmallVec;

use super::arguments::{Arguments, drop_arguments_to_match};
use crate::error::HandleError;
use crate::handle::MethodHandle;
use crate::signature::{ErrorClass, Type};
use crate::value::Value;

/// Builds `if test(a...) { target(a...) } else { fallback(a...) }`.
///
/// `test` may take a prefix of the target's parameters; it receives the
/// leading arguments only.
///
/// # Errors
///
/// Returns [`HandleError::SignatureMismatch`] if `target` and `fallback`
/// differ in signature, `test` does not return `boolean`, or its
/// parameters are not a prefix of the target's.
///
/// # Examples
///
/// ```rust
/// use callgraft::{MethodHandle, Value};
/// use callgraft::combinator::{constant, drop_arguments, guard_with_test};
/// use callgraft::signature::{Signature, Type};
///
/// let is_negative = MethodHandle::new(
///     Signature::new(Type::BOOLEAN, [Type::INT])?,
///     |arguments| Ok(Value::Boolean(arguments[0].as_int()? < 0)),
/// );
/// let negative = drop_arguments(&constant(&Type::String, Value::from("negative"))?, 0, &[Type::INT])?;
/// let other = drop_arguments(&constant(&Type::String, Value::from("other"))?, 0, &[Type::INT])?;
/// let classify = guard_with_test(&is_negative, &negative, &other)?;
/// assert_eq!(classify.invoke_exact(&[Value::Int(-3)]), Ok(Value::from("negative")));
/// assert_eq!(classify.invoke_exact(&[Value::Int(3)]), Ok(Value::from("other")));
/// # Ok::<(), callgraft::HandleError>(())
/// ```
pub fn guard_with_test(
    test: &MethodHandle,
    target: &MethodHandle,
    fallback: &MethodHandle,
) -> Result<MethodHandle, HandleError> {
    if target.signature() != fallback.signature() {
        return Err(HandleError::signature_mismatch(
            "guard_with_test",
            format!(
                "target {} and fallback {} differ",
                target.signature(),
                fallback.signature()
            ),
        ));
    }
    if test.return_type() != &Type::BOOLEAN {
        return Err(HandleError::signature_mismatch(
            "guard_with_test",
            format!("test {} does not return boolean", test.signature()),
        ));
    }
    let test = drop_arguments_to_match(test, 0, target.parameters(), 0).map_err(|_| {
        HandleError::signature_mismatch(
            "guard_with_test",
            format!(
                "test {} does not take a prefix of {}",
                test.signature(),
                target.signature()
            ),
        )
    })?;
    let target = target.clone();
    let fallback = fallback.clone();
    Ok(MethodHandle::new(target.signature().clone(), move |arguments| {
        if test.invoke_basic(arguments)?.as_boolean()? {
            target.invoke_basic(arguments)
        } else {
            fallback.invoke_basic(arguments)
        }
    }))
}

/// Runs `target`; if it raises an error of `class` (or a subclass), runs
/// `handler` with the error prepended to the original arguments.
///
/// `handler` may take a prefix of the target's parameters after the error.
/// Errors of other classes propagate unchanged.
///
/// # Errors
///
/// Returns [`HandleError::SignatureMismatch`] if `handler` returns a
/// different type, its first parameter does not accept `class`, or its
/// remaining parameters are not a prefix of the target's.
pub fn catch_exception(
    target: &MethodHandle,
    class: &ErrorClass,
    handler: &MethodHandle,
) -> Result<MethodHandle, HandleError> {
    let caught = Type::Throwable(class.clone());
    let accepts = handler
        .signature()
        .parameter(0)
        .is_some_and(|parameter| parameter.is_assignable_from(&caught));
    if !accepts {
        return Err(HandleError::signature_mismatch(
            "catch_exception",
            format!("handler {} does not accept {caught}", handler.signature()),
        ));
    }
    if handler.return_type() != target.return_type() {
        return Err(HandleError::signature_mismatch(
            "catch_exception",
            format!(
                "handler {} and target {} return different types",
                handler.signature(),
                target.signature()
            ),
        ));
    }
    let handler = drop_arguments_to_match(handler, 1, target.parameters(), 0).map_err(|_| {
        HandleError::signature_mismatch(
            "catch_exception",
            format!(
                "handler {} does not take a prefix of {}",
                handler.signature(),
                target.signature()
            ),
        )
    })?;
    let class = class.clone();
    let target = target.clone();
    Ok(MethodHandle::new(target.signature().clone(), move |arguments| {
        match target.invoke_basic(arguments) {
            Err(error) if error.is_instance_of(&class) => {
                tracing::trace!(%error, "caught by handler");
                let mut handled = Arguments::with_capacity(arguments.len() + 1);
                handled.push(Value::Throwable(error));
                handled.extend(arguments.iter().cloned());
                handler.invoke_basic(&handled)
            }
            outcome => outcome,
        }
    }))
}

/// Runs `target`, then always runs `cleanup`.
///
/// `cleanup` receives the error raised by `target` (or `null`), then the
/// target's result (or the zero value of its type if it raised; omitted
/// for void targets), then a prefix of the original arguments.
///
/// If `target` raised and `cleanup` completes normally, the original error
/// is raised again. If `cleanup` raises, its error wins. Otherwise the
/// cleanup's return value is the result.
///
/// # Errors
///
/// Returns [`HandleError::SignatureMismatch`] if `cleanup` returns a
/// different type, its first parameter does not accept every error, its
/// second parameter differs from a non-void target return type, or its
/// remaining parameters are not a prefix of the target's.
///
/// # Examples
///
/// ```rust
/// use std::sync::Arc;
/// use std::sync::atomic::{AtomicUsize, Ordering};
///
/// use callgraft::{MethodHandle, Throwable, Value};
/// use callgraft::combinator::try_finally;
/// use callgraft::signature::{Signature, Type};
///
/// let failing = MethodHandle::new(Signature::new(Type::INT, [])?, |_| {
///     Err(Throwable::illegal_argument("boom"))
/// });
/// let cleanups = Arc::new(AtomicUsize::new(0));
/// let counter = Arc::clone(&cleanups);
/// let cleanup = MethodHandle::new(
///     Signature::new(Type::INT, [Type::throwable(), Type::INT])?,
///     move |arguments| {
///         counter.fetch_add(1, Ordering::SeqCst);
///         Ok(arguments[1].clone())
///     },
/// );
/// let guarded = try_finally(&failing, &cleanup)?;
/// let error = guarded.invoke_exact(&[]).unwrap_err();
/// assert_eq!(error.message(), "boom");
/// assert_eq!(cleanups.load(Ordering::SeqCst), 1);
/// # Ok::<(), callgraft::HandleError>(())
/// ```
pub fn try_finally(
    target: &MethodHandle,
    cleanup: &MethodHandle,
) -> Result<MethodHandle, HandleError> {
    let returned = target.return_type().clone();
    if cleanup.return_type() != &returned {
        return Err(HandleError::signature_mismatch(
            "try_finally",
            format!(
                "cleanup {} and target {} return different types",
                cleanup.signature(),
                target.signature()
            ),
        ));
    }
    let accepts_errors = cleanup
        .signature()
        .parameter(0)
        .is_some_and(|parameter| parameter.is_assignable_from(&Type::throwable()));
    if !accepts_errors {
        return Err(HandleError::signature_mismatch(
            "try_finally",
            format!("cleanup {} does not accept Throwable first", cleanup.signature()),
        ));
    }
    let produces = !returned.is_void();
    if produces && cleanup.signature().parameter(1) != Some(&returned) {
        return Err(HandleError::signature_mismatch(
            "try_finally",
            format!("cleanup {} does not accept {returned} second", cleanup.signature()),
        ));
    }
    let leading = 1 + usize::from(produces);
    let cleanup = drop_arguments_to_match(cleanup, leading, target.parameters(), 0).map_err(|_| {
        HandleError::signature_mismatch(
            "try_finally",
            format!(
                "cleanup {} does not take a prefix of {}",
                cleanup.signature(),
                target.signature()
            ),
        )
    })?;
    let target = target.clone();
    Ok(MethodHandle::new(target.signature().clone(), move |arguments| {
        let outcome = target.invoke_basic(arguments);
        let mut observed = Arguments::with_capacity(arguments.len() + leading);
        match &outcome {
            Ok(result) => {
                observed.push(Value::Null);
                if produces {
                    observed.push(result.clone());
                }
            }
            Err(error) => {
                observed.push(Value::Throwable(error.clone()));
                if produces {
                    observed.push(Value::zero(&returned));
                }
            }
        }
        observed.extend(arguments.iter().cloned());
        let cleaned = cleanup.invoke_basic(&observed)?;
        outcome.and(Ok(cleaned))
    }))
}

/// Dispatches on a leading `int` selector: `targets[selector]` when it is
/// in range, otherwise `fallback`. Every case receives all arguments,
/// selector included.
///
/// # Errors
///
/// Returns [`HandleError::IllegalArgument`] if `targets` is empty, and
/// [`HandleError::SignatureMismatch`] if the fallback does not take a
/// leading `int` or a target's signature differs from the fallback's.
///
/// # Examples
///
/// ```rust
/// use callgraft::Value;
/// use callgraft::combinator::{constant, drop_arguments, table_switch};
/// use callgraft::signature::Type;
///
/// let case = |label: &str| drop_arguments(&constant(&Type::String, Value::from(label))?, 0, &[Type::INT]);
/// let switch = table_switch(&case("default")?, &[case("zero")?, case("one")?])?;
/// assert_eq!(switch.invoke_exact(&[Value::Int(1)]), Ok(Value::from("one")));
/// assert_eq!(switch.invoke_exact(&[Value::Int(7)]), Ok(Value::from("default")));
/// assert_eq!(switch.invoke_exact(&[Value::Int(-1)]), Ok(Value::from("default")));
/// # Ok::<(), callgraft::HandleError>(())
/// ```
pub fn table_switch(
    fallback: &MethodHandle,
    targets: &[MethodHandle],
) -> Result<MethodHandle, HandleError> {
    if targets.is_empty() {
        return Err(HandleError::illegal_argument(
            "table_switch",
            "no cases given",
        ));
    }
    if fallback.signature().parameter(0) != Some(&Type::INT) {
        return Err(HandleError::signature_mismatch(
            "table_switch",
            format!("fallback {} does not take a leading int", fallback.signature()),
        ));
    }
    if let Some(mismatch) = targets
        .iter()
        .find(|target| target.signature() != fallback.signature())
    {
        return Err(HandleError::signature_mismatch(
            "table_switch",
            format!(
                "case {} differs from fallback {}",
                mismatch.signature(),
                fallback.signature()
            ),
        ));
    }
    let cases: SmallVec<[MethodHandle; 8]> = targets.iter().cloned().collect();
    let fallback = fallback.clone();
    Ok(MethodHandle::new(fallback.signature().clone(), move |arguments| {
        let selected = usize::try_from(arguments[0].as_int()?)
            .ok()
            .and_then(|selector| cases.get(selector))
            .unwrap_or(&fallback);
        selected.invoke_basic(arguments)
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combinator::{constant, empty, identity, throw_exception};
    use crate::error::Throwable;
    use crate::signature::Signature;

    #[test]
    fn test_guard_rejects_differing_branches() {
        let test = constant(&Type::BOOLEAN, Value::Boolean(true)).unwrap();
        let error = guard_with_test(&test, &identity(&Type::INT).unwrap(), &identity(&Type::LONG).unwrap())
            .unwrap_err();
        assert!(matches!(error, HandleError::SignatureMismatch { .. }));
    }

    #[test]
    fn test_guard_rejects_non_boolean_test() {
        let test = constant(&Type::INT, Value::Int(1)).unwrap();
        let same = identity(&Type::INT).unwrap();
        assert!(guard_with_test(&test, &same, &same).is_err());
    }

    #[test]
    fn test_catch_rejects_handler_for_narrower_class() {
        let target = throw_exception(&Type::INT, &ErrorClass::runtime_exception()).unwrap();
        let handler = empty(
            &Signature::new(Type::INT, [Type::Throwable(ErrorClass::illegal_argument())]).unwrap(),
        );
        let error = catch_exception(&target, &ErrorClass::runtime_exception(), &handler).unwrap_err();
        assert!(matches!(error, HandleError::SignatureMismatch { .. }));
    }

    #[test]
    fn test_catch_passes_unrelated_errors_through() {
        let target = MethodHandle::new(Signature::new(Type::INT, []).unwrap(), |_| {
            Err(Throwable::null_pointer("missing"))
        });
        let handler = constant(&Type::INT, Value::Int(0)).unwrap();
        let handler = crate::combinator::drop_arguments(
            &handler,
            0,
            &[Type::Throwable(ErrorClass::illegal_argument())],
        )
        .unwrap();
        let guarded = catch_exception(&target, &ErrorClass::illegal_argument(), &handler).unwrap();
        let error = guarded.invoke_exact(&[]).unwrap_err();
        assert_eq!(error.class(), &ErrorClass::null_pointer());
    }

    #[test]
    fn test_try_finally_requires_result_slot() {
        let target = identity(&Type::INT).unwrap();
        let cleanup = empty(&Signature::new(Type::INT, [Type::throwable()]).unwrap());
        assert!(try_finally(&target, &cleanup).is_err());
    }

    #[test]
    fn test_table_switch_requires_cases() {
        let fallback = identity(&Type::INT).unwrap();
        assert!(matches!(
            table_switch(&fallback, &[]),
            Err(HandleError::IllegalArgument { .. })
        ));
    }
}
