//! Argument combinators: insert, drop, filter, collect and fold.
//!
//! Each combinator checks the signatures of its inputs when it is called and
//! returns a new handle whose invocation is the composition. The argument
//! list handed to the target is rebuilt per call in a `SmallVec`, so short
//! argument lists do not allocate.

use smallvec::SmallVec;

use crate::combinator::empty;
use crate::error::HandleError;
use crate::handle::{MethodHandle, coerce};
use crate::signature::{Signature, Type};
use crate::value::Value;

pub(crate) type Arguments = SmallVec<[Value; 8]>;

// =============================================================================
// Insert / drop
// =============================================================================

/// Binds `values` to the parameters of `target` starting at `position`.
///
/// The result takes the remaining parameters. Primitive values are widened
/// to their slot when needed.
///
/// # Errors
///
/// Returns [`HandleError::IllegalArgument`] if the values do not fit in
/// `position..arity` or a value cannot occupy its slot.
///
/// # Examples
///
/// ```rust
/// use callgraft::{MethodHandle, Value};
/// use callgraft::combinator::insert_arguments;
/// use callgraft::signature::{Signature, Type};
///
/// let describe = MethodHandle::new(
///     Signature::new(Type::String, [Type::String, Type::INT, Type::String])?,
///     |arguments| Ok(Value::from(format!("{}{}{}", arguments[0], arguments[1], arguments[2]))),
/// );
/// let bound = insert_arguments(&describe, 1, [Value::Int(7), Value::from("!")])?;
/// assert_eq!(bound.signature().to_string(), "(String)String");
/// assert_eq!(bound.invoke_exact(&[Value::from("#")]), Ok(Value::from("#7!")));
/// # Ok::<(), callgraft::HandleError>(())
/// ```
pub fn insert_arguments(
    target: &MethodHandle,
    position: usize,
    values: impl IntoIterator<Item = Value>,
) -> Result<MethodHandle, HandleError> {
    let values: SmallVec<[Value; 4]> = values.into_iter().collect();
    let arity = target.arity();
    if position > arity || values.len() > arity - position {
        return Err(HandleError::illegal_argument(
            "insert_arguments",
            format!(
                "cannot insert {} values at {position} into {}",
                values.len(),
                target.signature()
            ),
        ));
    }
    let slots = &target.parameters()[position..position + values.len()];
    let bound = values
        .into_iter()
        .zip(slots)
        .map(|(value, slot)| {
            let description = value.to_string();
            coerce(value, slot).ok_or_else(|| {
                HandleError::illegal_argument(
                    "insert_arguments",
                    format!("{description} cannot be bound to a parameter of type {slot}"),
                )
            })
        })
        .collect::<Result<SmallVec<[Value; 4]>, HandleError>>()?;
    if bound.is_empty() {
        return Ok(target.clone());
    }
    let signature = target
        .signature()
        .drop_parameters(position, position + bound.len())?;
    let target = target.clone();
    Ok(MethodHandle::new(signature, move |arguments| {
        let mut full = Arguments::with_capacity(arguments.len() + bound.len());
        full.extend(arguments[..position].iter().cloned());
        full.extend(bound.iter().cloned());
        full.extend(arguments[position..].iter().cloned());
        target.invoke_basic(&full)
    }))
}

/// Adds ignored parameters of `types` at `position`.
///
/// # Errors
///
/// Returns [`HandleError::IllegalArgument`] if `position` exceeds the arity
/// or any of `types` is `Void`.
pub fn drop_arguments(
    target: &MethodHandle,
    position: usize,
    types: &[Type],
) -> Result<MethodHandle, HandleError> {
    let signature = target
        .signature()
        .insert_parameters(position, types.iter().cloned())
        .map_err(|_| {
            HandleError::illegal_argument(
                "drop_arguments",
                format!(
                    "cannot drop {} arguments at {position} of {}",
                    types.len(),
                    target.signature()
                ),
            )
        })?;
    if types.is_empty() {
        return Ok(target.clone());
    }
    let count = types.len();
    let target = target.clone();
    Ok(MethodHandle::new(signature, move |arguments| {
        let mut kept = Arguments::with_capacity(arguments.len() - count);
        kept.extend(arguments[..position].iter().cloned());
        kept.extend(arguments[position + count..].iter().cloned());
        target.invoke_basic(&kept)
    }))
}

/// Pads `target` with ignored parameters so that it accepts `new_types`.
///
/// The parameters of `target` after its first `skip` must equal
/// `new_types[position..]` for their length; the types of `new_types`
/// before `position` and after that run are added as ignored parameters.
/// The result's parameters are `target`'s first `skip` parameters followed
/// by `new_types`.
///
/// # Errors
///
/// Returns [`HandleError::IllegalArgument`] if `skip` exceeds the arity or
/// `position` leaves no room for the kept parameters, and
/// [`HandleError::SignatureMismatch`] if the kept parameters differ from the
/// corresponding run of `new_types`.
///
/// # Examples
///
/// ```rust
/// use callgraft::Value;
/// use callgraft::combinator::{drop_arguments_to_match, identity};
/// use callgraft::signature::Type;
///
/// let same = identity(&Type::INT)?;
/// let padded = drop_arguments_to_match(&same, 0, &[Type::String, Type::INT, Type::LONG], 1)?;
/// assert_eq!(padded.signature().to_string(), "(String,int,long)int");
/// let arguments = [Value::from("x"), Value::Int(5), Value::Long(9)];
/// assert_eq!(padded.invoke_exact(&arguments), Ok(Value::Int(5)));
/// # Ok::<(), callgraft::HandleError>(())
/// ```
pub fn drop_arguments_to_match(
    target: &MethodHandle,
    skip: usize,
    new_types: &[Type],
    position: usize,
) -> Result<MethodHandle, HandleError> {
    let arity = target.arity();
    if skip > arity {
        return Err(HandleError::illegal_argument(
            "drop_arguments_to_match",
            format!("cannot skip {skip} parameters of {}", target.signature()),
        ));
    }
    let matched = arity - skip;
    if position > new_types.len() || matched > new_types.len() - position {
        return Err(HandleError::illegal_argument(
            "drop_arguments_to_match",
            format!(
                "{matched} kept parameters do not fit at {position} of {} new types",
                new_types.len()
            ),
        ));
    }
    let kept = &target.parameters()[skip..];
    if kept != &new_types[position..position + matched] {
        return Err(HandleError::signature_mismatch(
            "drop_arguments_to_match",
            format!(
                "parameters of {} do not match the new types at {position}",
                target.signature()
            ),
        ));
    }
    let mut adapted = target.clone();
    if position > 0 {
        adapted = drop_arguments(&adapted, skip, &new_types[..position])?;
    }
    let tail = position + matched;
    if tail < new_types.len() {
        adapted = drop_arguments(&adapted, skip + tail, &new_types[tail..])?;
    }
    Ok(adapted)
}

/// Discards the return value of `target`.
///
/// # Errors
///
/// Never fails for a well-formed handle; the `Result` mirrors the other
/// combinators.
pub fn drop_return(target: &MethodHandle) -> Result<MethodHandle, HandleError> {
    if target.return_type().is_void() {
        return Ok(target.clone());
    }
    let discard = empty(&Signature::new(Type::Void, [target.return_type().clone()])?);
    filter_return_value(target, &discard)
}

// =============================================================================
// Filters
// =============================================================================

/// Pre-processes arguments `position..position + filters.len()` with unary
/// filters. `None` leaves the corresponding argument untouched. Filters run
/// left to right.
///
/// Each filter's return type must equal the parameter it feeds; its own
/// parameter type replaces that parameter in the result.
///
/// # Errors
///
/// Returns [`HandleError::IllegalArgument`] if the filters extend past the
/// arity, and [`HandleError::SignatureMismatch`] if a filter is not unary
/// or returns the wrong type.
pub fn filter_arguments(
    target: &MethodHandle,
    position: usize,
    filters: &[Option<MethodHandle>],
) -> Result<MethodHandle, HandleError> {
    let arity = target.arity();
    if position > arity || filters.len() > arity - position {
        return Err(HandleError::illegal_argument(
            "filter_arguments",
            format!(
                "{} filters at {position} exceed {}",
                filters.len(),
                target.signature()
            ),
        ));
    }
    let mut signature = target.signature().clone();
    for (offset, filter) in filters.iter().enumerate() {
        let Some(filter) = filter else { continue };
        let index = position + offset;
        let expected = &target.parameters()[index];
        if filter.arity() != 1 || filter.return_type() != expected {
            return Err(HandleError::signature_mismatch(
                "filter_arguments",
                format!(
                    "filter {} cannot feed parameter {index} of type {expected}",
                    filter.signature()
                ),
            ));
        }
        signature = signature.change_parameter(index, filter.parameters()[0].clone())?;
    }
    if filters.iter().all(Option::is_none) {
        return Ok(target.clone());
    }
    let filters: SmallVec<[(usize, MethodHandle); 4]> = filters
        .iter()
        .enumerate()
        .filter_map(|(offset, filter)| filter.clone().map(|filter| (position + offset, filter)))
        .collect();
    let target = target.clone();
    Ok(MethodHandle::new(signature, move |arguments| {
        let mut filtered: Arguments = arguments.iter().cloned().collect();
        for (index, filter) in &filters {
            let input = std::mem::replace(&mut filtered[*index], Value::Null);
            filtered[*index] = filter.invoke_basic(std::slice::from_ref(&input))?;
        }
        target.invoke_basic(&filtered)
    }))
}

/// Post-processes the return value of `target` with `filter`.
///
/// `filter` takes the target's return value, or nothing if the target
/// returns void; the result returns what `filter` returns.
///
/// # Errors
///
/// Returns [`HandleError::SignatureMismatch`] if `filter` does not accept
/// exactly the target's return value.
///
/// # Examples
///
/// ```rust
/// use callgraft::{MethodHandle, Value};
/// use callgraft::combinator::filter_return_value;
/// use callgraft::signature::{Signature, Type};
///
/// let length = MethodHandle::new(
///     Signature::new(Type::INT, [Type::String])?,
///     |arguments| Ok(Value::Int(arguments[0].as_str()?.len() as i32)),
/// );
/// let is_even = MethodHandle::new(
///     Signature::new(Type::BOOLEAN, [Type::INT])?,
///     |arguments| Ok(Value::Boolean(arguments[0].as_int()? % 2 == 0)),
/// );
/// let even_length = filter_return_value(&length, &is_even)?;
/// assert_eq!(even_length.invoke_exact(&[Value::from("four")]), Ok(Value::Boolean(true)));
/// # Ok::<(), callgraft::HandleError>(())
/// ```
pub fn filter_return_value(
    target: &MethodHandle,
    filter: &MethodHandle,
) -> Result<MethodHandle, HandleError> {
    let returned = target.return_type();
    let accepts = if returned.is_void() {
        filter.arity() == 0
    } else {
        filter.arity() == 1 && &filter.parameters()[0] == returned
    };
    if !accepts {
        return Err(HandleError::signature_mismatch(
            "filter_return_value",
            format!(
                "filter {} cannot accept the result of {}",
                filter.signature(),
                target.signature()
            ),
        ));
    }
    let signature = target
        .signature()
        .change_return_type(filter.return_type().clone());
    let discards = returned.is_void();
    let target = target.clone();
    let filter = filter.clone();
    Ok(MethodHandle::new(signature, move |arguments| {
        let result = target.invoke_basic(arguments)?;
        if discards {
            filter.invoke_basic(&[])
        } else {
            filter.invoke_basic(std::slice::from_ref(&result))
        }
    }))
}

// =============================================================================
// Collect / fold
// =============================================================================

/// Replaces the arguments starting at `position` by the result of `filter`
/// applied to them.
///
/// `filter`'s parameters take the place of the collected run in the result.
/// If `filter` returns a value it feeds parameter `position` of `target`;
/// if it returns void nothing is fed and the filter runs for its effect.
///
/// # Errors
///
/// Returns [`HandleError::IllegalArgument`] if `position` is out of range,
/// and [`HandleError::SignatureMismatch`] if `filter`'s return type differs
/// from parameter `position` of `target`.
pub fn collect_arguments(
    target: &MethodHandle,
    position: usize,
    filter: &MethodHandle,
) -> Result<MethodHandle, HandleError> {
    let produces = !filter.return_type().is_void();
    let limit = if produces { target.arity() } else { target.arity() + 1 };
    if position >= limit {
        return Err(HandleError::illegal_argument(
            "collect_arguments",
            format!("position {position} out of range for {}", target.signature()),
        ));
    }
    let mut signature = target.signature().clone();
    if produces {
        let slot = &target.parameters()[position];
        if slot != filter.return_type() {
            return Err(HandleError::signature_mismatch(
                "collect_arguments",
                format!(
                    "filter {} cannot feed parameter {position} of type {slot}",
                    filter.signature()
                ),
            ));
        }
        signature = signature.drop_parameters(position, position + 1)?;
    }
    let signature = signature.insert_parameters(position, filter.parameters().iter().cloned())?;
    let consumed = filter.arity();
    let target = target.clone();
    let filter = filter.clone();
    Ok(MethodHandle::new(signature, move |arguments| {
        let collected = filter.invoke_basic(&arguments[position..position + consumed])?;
        let mut full = Arguments::with_capacity(target.arity());
        full.extend(arguments[..position].iter().cloned());
        if produces {
            full.push(collected);
        }
        full.extend(arguments[position + consumed..].iter().cloned());
        target.invoke_basic(&full)
    }))
}

/// Pre-computes a value from the arguments starting at `position` and
/// passes it to `target` at `position`, ahead of those arguments.
///
/// `combiner` receives the run of arguments starting at `position` (as
/// many as it has parameters). If it returns void nothing is inserted.
///
/// # Errors
///
/// Returns [`HandleError::SignatureMismatch`] if `combiner`'s parameters do
/// not match the arguments it would receive, or its return type differs
/// from parameter `position` of `target`.
///
/// # Examples
///
/// ```rust
/// use callgraft::{MethodHandle, Value};
/// use callgraft::combinator::fold_arguments;
/// use callgraft::signature::{Signature, Type};
///
/// let report = MethodHandle::new(
///     Signature::new(Type::String, [Type::INT, Type::INT, Type::INT])?,
///     |arguments| Ok(Value::from(format!("{}={}+{}", arguments[0], arguments[1], arguments[2]))),
/// );
/// let sum = MethodHandle::new(
///     Signature::new(Type::INT, [Type::INT, Type::INT])?,
///     |arguments| Ok(Value::Int(arguments[0].as_int()? + arguments[1].as_int()?)),
/// );
/// let folded = fold_arguments(&report, 0, &sum)?;
/// assert_eq!(folded.invoke_exact(&[Value::Int(2), Value::Int(3)]), Ok(Value::from("5=2+3")));
/// # Ok::<(), callgraft::HandleError>(())
/// ```
pub fn fold_arguments(
    target: &MethodHandle,
    position: usize,
    combiner: &MethodHandle,
) -> Result<MethodHandle, HandleError> {
    let signature = folded_signature(target, position, combiner)?;
    let after = position + usize::from(!combiner.return_type().is_void());
    let consumed = combiner.arity();
    if target.arity() < after + consumed
        || combiner.parameters() != &target.parameters()[after..after + consumed]
    {
        return Err(HandleError::signature_mismatch(
            "fold_arguments",
            format!(
                "combiner {} does not accept the arguments of {} at {position}",
                combiner.signature(),
                target.signature()
            ),
        ));
    }
    let positions: SmallVec<[usize; 8]> = (position..position + consumed).collect();
    Ok(fold_with_positions(target, position, combiner, signature, positions))
}

/// Like [`fold_arguments`], with the combiner's inputs taken from
/// `argument_positions` of the result's parameter list instead of a run
/// starting at `position`.
///
/// # Errors
///
/// Returns [`HandleError::IllegalArgument`] if a position is out of range
/// or the number of positions differs from the combiner's arity, and
/// [`HandleError::SignatureMismatch`] if a selected parameter differs from
/// the combiner's parameter.
pub fn fold_arguments_at(
    target: &MethodHandle,
    position: usize,
    combiner: &MethodHandle,
    argument_positions: &[usize],
) -> Result<MethodHandle, HandleError> {
    let signature = folded_signature(target, position, combiner)?;
    if argument_positions.len() != combiner.arity() {
        return Err(HandleError::illegal_argument(
            "fold_arguments",
            format!(
                "{} positions given for combiner {}",
                argument_positions.len(),
                combiner.signature()
            ),
        ));
    }
    for (parameter, &selected) in combiner.parameters().iter().zip(argument_positions) {
        match signature.parameter(selected) {
            None => {
                return Err(HandleError::illegal_argument(
                    "fold_arguments",
                    format!("position {selected} out of range for {signature}"),
                ));
            }
            Some(available) if available != parameter => {
                return Err(HandleError::signature_mismatch(
                    "fold_arguments",
                    format!("combiner parameter {parameter} cannot take argument {selected} of type {available}"),
                ));
            }
            Some(_) => {}
        }
    }
    let positions = argument_positions.iter().copied().collect();
    Ok(fold_with_positions(target, position, combiner, signature, positions))
}

fn folded_signature(
    target: &MethodHandle,
    position: usize,
    combiner: &MethodHandle,
) -> Result<Signature, HandleError> {
    let produced = combiner.return_type();
    if produced.is_void() {
        if position > target.arity() {
            return Err(HandleError::illegal_argument(
                "fold_arguments",
                format!("position {position} out of range for {}", target.signature()),
            ));
        }
        return Ok(target.signature().clone());
    }
    match target.signature().parameter(position) {
        Some(slot) if slot == produced => target.signature().drop_parameters(position, position + 1),
        Some(slot) => Err(HandleError::signature_mismatch(
            "fold_arguments",
            format!("combiner returns {produced} but parameter {position} is {slot}"),
        )),
        None => Err(HandleError::illegal_argument(
            "fold_arguments",
            format!("position {position} out of range for {}", target.signature()),
        )),
    }
}

fn fold_with_positions(
    target: &MethodHandle,
    position: usize,
    combiner: &MethodHandle,
    signature: Signature,
    positions: SmallVec<[usize; 8]>,
) -> MethodHandle {
    let produces = !combiner.return_type().is_void();
    let target = target.clone();
    let combiner = combiner.clone();
    MethodHandle::new(signature, move |arguments| {
        let inputs: Arguments = positions
            .iter()
            .map(|&selected| arguments[selected].clone())
            .collect();
        let combined = combiner.invoke_basic(&inputs)?;
        if !produces {
            return target.invoke_basic(arguments);
        }
        let mut full = Arguments::with_capacity(arguments.len() + 1);
        full.extend(arguments[..position].iter().cloned());
        full.push(combined);
        full.extend(arguments[position..].iter().cloned());
        target.invoke_basic(&full)
    })
}
