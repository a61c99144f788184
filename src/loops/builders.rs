//! Fixed-shape loops expressed as clause lists.

use super::{Clause, clause_loop};
use crate::combinator::{drop_arguments, empty, filter_arguments, identity, permute_arguments};
use crate::error::{HandleError, Throwable};
use crate::handle::MethodHandle;
use crate::signature::{Signature, Type};
use crate::value::{IteratorValue, Value};

/// Builds `v = init(a...); while pred(v, a...) { v = body(v, a...) }; v`.
///
/// `body` returns the loop variable type `V` and, unless `V` is void,
/// takes `V` first. `pred` may take a prefix of the body's parameters;
/// `init` may take a prefix of the parameters after `V`. A missing `init`
/// starts from the zero value of `V`.
///
/// # Errors
///
/// Returns [`HandleError::SignatureMismatch`] if the three handles do not
/// fit that shape, or any error of [`clause_loop`].
///
/// # Examples
///
/// ```rust
/// use callgraft::{MethodHandle, Value};
/// use callgraft::loops::while_loop;
/// use callgraft::signature::{Signature, Type};
///
/// let under_limit = MethodHandle::new(
///     Signature::new(Type::BOOLEAN, [Type::INT, Type::INT])?,
///     |arguments| Ok(Value::Boolean(arguments[0].as_int()? < arguments[1].as_int()?)),
/// );
/// let double = MethodHandle::new(
///     Signature::new(Type::INT, [Type::INT, Type::INT])?,
///     |arguments| Ok(Value::Int(arguments[0].as_int()?.max(1) * 2)),
/// );
/// let first_power = while_loop(None, &under_limit, &double)?;
/// assert_eq!(first_power.invoke_exact(&[Value::Int(100)]), Ok(Value::Int(128)));
/// # Ok::<(), callgraft::HandleError>(())
/// ```
pub fn while_loop(
    init: Option<&MethodHandle>,
    pred: &MethodHandle,
    body: &MethodHandle,
) -> Result<MethodHandle, HandleError> {
    check_while_shape("while_loop", init, pred, body)?;
    let fini = identity_or_void(body.return_type())?;
    let check_exit = Clause::new().with_pred(pred).with_fini(&fini);
    let mut variable = Clause::new().with_step(body);
    if let Some(init) = init {
        variable = variable.with_init(init);
    }
    clause_loop(&[check_exit, variable])
}

/// Builds `v = init(a...); do { v = body(v, a...) } while pred(v, a...); v`.
///
/// Shapes are as for [`while_loop`]; the body runs at least once.
///
/// # Errors
///
/// Returns [`HandleError::SignatureMismatch`] if the three handles do not
/// fit that shape, or any error of [`clause_loop`].
pub fn do_while_loop(
    init: Option<&MethodHandle>,
    body: &MethodHandle,
    pred: &MethodHandle,
) -> Result<MethodHandle, HandleError> {
    check_while_shape("do_while_loop", init, pred, body)?;
    let fini = identity_or_void(body.return_type())?;
    let mut clause = Clause::new().with_step(body).with_pred(pred).with_fini(&fini);
    if let Some(init) = init {
        clause = clause.with_init(init);
    }
    clause_loop(&[clause])
}

/// Runs `body` `iterations(a...)` times with a counter counting up from
/// zero. Equivalent to [`counted_loop_range`] with a start of zero.
///
/// # Errors
///
/// As for [`counted_loop_range`].
///
/// # Examples
///
/// ```rust
/// use callgraft::{MethodHandle, Value};
/// use callgraft::combinator::{constant, identity};
/// use callgraft::loops::counted_loop;
/// use callgraft::signature::{Signature, Type};
///
/// let add_counter = MethodHandle::new(
///     Signature::new(Type::INT, [Type::INT, Type::INT])?,
///     |arguments| Ok(Value::Int(arguments[0].as_int()? + arguments[1].as_int()?)),
/// );
/// let triangle = counted_loop(
///     &identity(&Type::INT)?,
///     Some(&constant(&Type::INT, Value::Int(0))?),
///     &add_counter,
/// )?;
/// assert_eq!(triangle.invoke_exact(&[Value::Int(5)]), Ok(Value::Int(10)));
/// # Ok::<(), callgraft::HandleError>(())
/// ```
pub fn counted_loop(
    iterations: &MethodHandle,
    init: Option<&MethodHandle>,
    body: &MethodHandle,
) -> Result<MethodHandle, HandleError> {
    counted_loop_range(&empty(iterations.signature()), iterations, init, body)
}

/// Runs `body` once for each counter value in `start(a...)..end(a...)`.
///
/// `start` and `end` return `int`. `body` takes the loop variable `V`
/// (unless void), then the `int` counter, then a prefix of the loop
/// parameters. If `body` takes no loop parameters they are taken from
/// `end`. An empty range runs no iterations and returns the initial value.
///
/// # Errors
///
/// Returns [`HandleError::SignatureMismatch`] if the handles do not fit
/// that shape, or any error of [`clause_loop`].
pub fn counted_loop_range(
    start: &MethodHandle,
    end: &MethodHandle,
    init: Option<&MethodHandle>,
    body: &MethodHandle,
) -> Result<MethodHandle, HandleError> {
    check_counted_shape(start, end, init, body)?;
    let returned = body.return_type().clone();
    let mut increment = counter_step()?;
    let mut below_limit = counter_predicate()?;
    let mut limit = Clause::new().with_init(end);
    if !returned.is_void() {
        increment = drop_arguments(&increment, 1, std::slice::from_ref(&returned))?;
        below_limit = drop_arguments(&below_limit, 1, std::slice::from_ref(&returned))?;
        limit = limit.with_fini(&drop_arguments(&identity(&returned)?, 0, &[Type::INT])?);
    }
    let limit = limit.with_pred(&below_limit);
    let mut variable = Clause::new().with_step(&drop_arguments(body, 0, &[Type::INT])?);
    if let Some(init) = init {
        variable = variable.with_init(init);
    }
    let counter = Clause::new().with_init(start).with_step(&increment);
    clause_loop(&[limit, variable, counter])
}

/// Runs `body` once per element produced by an iterator.
///
/// `body` takes the loop variable `V` (unless void), then the element,
/// then a prefix of the loop parameters. The iterator comes from
/// `iterator(a...)`, which must return `Iterator`; without it the first
/// loop parameter must be a `List`, which is iterated. Elements are
/// converted to the body's element type as by
/// [`MethodHandle::as_type`].
///
/// # Errors
///
/// Returns [`HandleError::SignatureMismatch`] if the handles do not fit
/// that shape, [`HandleError::IllegalArgument`] if the iterator does not
/// return `Iterator` or the inferred first parameter is not a `List`, or
/// any error of [`clause_loop`].
///
/// # Examples
///
/// ```rust
/// use callgraft::{MethodHandle, Value};
/// use callgraft::combinator::constant;
/// use callgraft::loops::iterated_loop;
/// use callgraft::signature::{Signature, Type};
///
/// let append = MethodHandle::new(
///     Signature::new(Type::String, [Type::String, Type::String])?,
///     |arguments| Ok(Value::from(format!("{}{}", arguments[0], arguments[1]))),
/// );
/// let blank = constant(&Type::String, Value::from(""))?;
/// let concat = iterated_loop(None, Some(&blank), &append)?;
/// assert_eq!(concat.signature().to_string(), "(List)String");
/// let words = Value::list([Value::from("a"), Value::from("b"), Value::from("c")]);
/// assert_eq!(concat.invoke_exact(&[words]), Ok(Value::from("abc")));
/// # Ok::<(), callgraft::HandleError>(())
/// ```
pub fn iterated_loop(
    iterator: Option<&MethodHandle>,
    init: Option<&MethodHandle>,
    body: &MethodHandle,
) -> Result<MethodHandle, HandleError> {
    let iterable = check_iterated_shape(iterator, init, body)?;
    let returned = body.return_type().clone();
    let start = match iterator {
        Some(iterator) => {
            let forced = iterator.signature().change_return_type(Type::Iterator);
            iterator.as_type(&forced)
        }
        None => list_iterator()?.as_type(&Signature::new(Type::Iterator, [iterable])?),
    }
    .map_err(|error| HandleError::illegal_argument("iterated_loop", error.to_string()))?;
    let element = body.parameters()[usize::from(!returned.is_void())].clone();
    let next = iterator_next()?
        .as_type(&Signature::new(element, [Type::Iterator])?)
        .map_err(|error| HandleError::illegal_argument("iterated_loop", error.to_string()))?;

    let mut iteration = Clause::new()
        .with_init(&start)
        .with_pred(&iterator_has_next()?);
    let mut step = body.clone();
    if !returned.is_void() {
        iteration = iteration.with_fini(&drop_arguments(&identity(&returned)?, 0, &[Type::Iterator])?);
        step = swap_leading(body)?;
    }
    let mut variable = Clause::new().with_step(&filter_arguments(&step, 0, &[Some(next)])?);
    if let Some(init) = init {
        variable = variable.with_init(init);
    }
    clause_loop(&[iteration, variable])
}

// =============================================================================
// Shape checks
// =============================================================================

fn check_while_shape(
    operation: &'static str,
    init: Option<&MethodHandle>,
    pred: &MethodHandle,
    body: &MethodHandle,
) -> Result<(), HandleError> {
    let returned = body.return_type();
    let inner = body.parameters();
    let outer = if returned.is_void() {
        inner
    } else if inner.first() == Some(returned) {
        &inner[1..]
    } else {
        return Err(HandleError::signature_mismatch(
            operation,
            format!("body {} must take {returned} first", body.signature()),
        ));
    };
    if pred.return_type() != &Type::BOOLEAN
        || !pred.signature().effectively_identical_parameters(0, inner)
    {
        return Err(HandleError::signature_mismatch(
            operation,
            format!(
                "predicate {} must return boolean and take a prefix of ({})",
                pred.signature(),
                super::join(inner)
            ),
        ));
    }
    check_initializer(operation, init, returned, outer)
}

fn check_counted_shape(
    start: &MethodHandle,
    end: &MethodHandle,
    init: Option<&MethodHandle>,
    body: &MethodHandle,
) -> Result<(), HandleError> {
    const OPERATION: &str = "counted_loop";
    if start.return_type() != &Type::INT {
        return Err(HandleError::signature_mismatch(
            OPERATION,
            format!("start {} must return int", start.signature()),
        ));
    }
    if end.return_type() != &Type::INT {
        return Err(HandleError::signature_mismatch(
            OPERATION,
            format!("end {} must return int", end.signature()),
        ));
    }
    let returned = body.return_type();
    let inner = body.parameters();
    let leading = usize::from(!returned.is_void());
    if leading == 1 && inner.first() != Some(returned) {
        return Err(HandleError::signature_mismatch(
            OPERATION,
            format!("body {} must take {returned} first", body.signature()),
        ));
    }
    if inner.get(leading) != Some(&Type::INT) {
        return Err(HandleError::signature_mismatch(
            OPERATION,
            format!("body {} must take the int counter at {leading}", body.signature()),
        ));
    }
    let mut outer = &inner[leading + 1..];
    if outer.is_empty() {
        outer = end.parameters();
    }
    if !start.signature().effectively_identical_parameters(0, outer) {
        return Err(HandleError::signature_mismatch(
            OPERATION,
            format!("start {} must take a prefix of ({})", start.signature(), super::join(outer)),
        ));
    }
    if end.signature() != start.signature()
        && !end.signature().effectively_identical_parameters(0, outer)
    {
        return Err(HandleError::signature_mismatch(
            OPERATION,
            format!("end {} must take a prefix of ({})", end.signature(), super::join(outer)),
        ));
    }
    check_initializer(OPERATION, init, returned, outer)
}

/// Returns the iterable parameter type when no iterator handle is given.
fn check_iterated_shape(
    iterator: Option<&MethodHandle>,
    init: Option<&MethodHandle>,
    body: &MethodHandle,
) -> Result<Type, HandleError> {
    const OPERATION: &str = "iterated_loop";
    let returned = body.return_type();
    let inner = body.parameters();
    let leading = usize::from(!returned.is_void());
    if leading == 1 && inner.first() != Some(returned) {
        return Err(HandleError::signature_mismatch(
            OPERATION,
            format!("body {} must take {returned} first", body.signature()),
        ));
    }
    if inner.len() <= leading {
        return Err(HandleError::signature_mismatch(
            OPERATION,
            format!("body {} must take an element at {leading}", body.signature()),
        ));
    }
    let mut outer = &inner[leading + 1..];
    let mut iterable = Type::List;
    match iterator {
        Some(iterator) => {
            if outer.is_empty() {
                outer = iterator.parameters();
            }
            if !Type::Iterator.is_assignable_from(iterator.return_type()) {
                return Err(HandleError::illegal_argument(
                    OPERATION,
                    format!("iterator {} must return Iterator", iterator.signature()),
                ));
            }
            if !iterator.signature().effectively_identical_parameters(0, outer) {
                return Err(HandleError::signature_mismatch(
                    OPERATION,
                    format!(
                        "iterator {} must take a prefix of ({})",
                        iterator.signature(),
                        super::join(outer)
                    ),
                ));
            }
        }
        None => {
            if outer.is_empty() {
                outer = std::slice::from_ref(&iterable);
            } else if Type::List.is_assignable_from(&outer[0]) {
                iterable = outer[0].clone();
            } else {
                return Err(HandleError::illegal_argument(
                    OPERATION,
                    format!("first loop parameter {} must be a List", outer[0]),
                ));
            }
        }
    }
    check_initializer(OPERATION, init, returned, outer)?;
    Ok(iterable)
}

fn check_initializer(
    operation: &'static str,
    init: Option<&MethodHandle>,
    returned: &Type,
    outer: &[Type],
) -> Result<(), HandleError> {
    match init {
        Some(init)
            if init.return_type() != returned
                || !init.signature().effectively_identical_parameters(0, outer) =>
        {
            Err(HandleError::signature_mismatch(
                operation,
                format!(
                    "initializer {} must return {returned} and take a prefix of ({})",
                    init.signature(),
                    super::join(outer)
                ),
            ))
        }
        _ => Ok(()),
    }
}

// =============================================================================
// Building blocks
// =============================================================================

fn identity_or_void(ty: &Type) -> Result<MethodHandle, HandleError> {
    if ty.is_void() {
        Ok(empty(&Signature::returning(Type::Void)))
    } else {
        identity(ty)
    }
}

/// `(int limit, int counter) int`: the next counter value.
fn counter_step() -> Result<MethodHandle, HandleError> {
    Ok(MethodHandle::new(
        Signature::new(Type::INT, [Type::INT, Type::INT])?,
        |arguments| Ok(Value::Int(arguments[1].as_int()?.wrapping_add(1))),
    ))
}

/// `(int limit, int counter) boolean`: whether the counter is below the limit.
fn counter_predicate() -> Result<MethodHandle, HandleError> {
    Ok(MethodHandle::new(
        Signature::new(Type::BOOLEAN, [Type::INT, Type::INT])?,
        |arguments| Ok(Value::Boolean(arguments[1].as_int()? < arguments[0].as_int()?)),
    ))
}

fn list_iterator() -> Result<MethodHandle, HandleError> {
    Ok(MethodHandle::new(
        Signature::new(Type::Iterator, [Type::List])?,
        |arguments| {
            if arguments[0].is_null() {
                return Err(Throwable::null_pointer("cannot iterate over null"));
            }
            let items = std::sync::Arc::clone(arguments[0].as_list()?);
            let cursor = (0..items.len()).map(move |index| items[index].clone());
            Ok(Value::Iterator(IteratorValue::new(cursor)))
        },
    ))
}

fn iterator_has_next() -> Result<MethodHandle, HandleError> {
    Ok(MethodHandle::new(
        Signature::new(Type::BOOLEAN, [Type::Iterator])?,
        |arguments| Ok(Value::Boolean(arguments[0].as_iterator()?.has_next())),
    ))
}

fn iterator_next() -> Result<MethodHandle, HandleError> {
    Ok(MethodHandle::new(
        Signature::new(Type::Object, [Type::Iterator])?,
        |arguments| arguments[0].as_iterator()?.next_value(),
    ))
}

/// Exchanges the first two parameters.
fn swap_leading(target: &MethodHandle) -> Result<MethodHandle, HandleError> {
    let parameters = target.parameters();
    let mut swapped = parameters.to_vec();
    swapped.swap(0, 1);
    let signature = Signature::new(target.return_type().clone(), swapped)?;
    let mut reorder: Vec<usize> = (0..parameters.len()).collect();
    reorder.swap(0, 1);
    permute_arguments(target, &signature, &reorder)
}
