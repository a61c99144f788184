//! Argument permutation.
//!
//! A reorder array maps each parameter of the target to the incoming
//! argument that feeds it. It may reuse an incoming argument (a duplicate)
//! or leave one unused (a drop). [`normalize_permutation`] rewrites such an
//! array into a true bijection plus an ordered list of primitive
//! [`RewriteStep`]s; [`permute_arguments`] applies the steps to the target
//! one by one and finishes with a single reordering.
//!
//! Normalization is a pure function of the reorder array and the incoming
//! arity. Running it on its own output performs no further rewrites.

use smallvec::SmallVec;

use super::arguments::{Arguments, drop_arguments};
use crate::error::HandleError;
use crate::handle::MethodHandle;
use crate::signature::Signature;

/// Widest incoming arity scanned with a single `u64` mask.
const BIT_LIMIT: usize = 63;

/// One primitive rewrite of the target's parameter list.
///
/// Positions are indices into the target-side parameter list as it stands
/// when the step is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RewriteStep {
    /// The parameter at `destination` is removed and fed from the argument
    /// at `source` instead.
    Duplicate {
        /// Position whose argument is reused.
        source: usize,
        /// Position that is removed.
        destination: usize,
    },
    /// An ignored parameter is inserted at `position`; it receives the
    /// otherwise unused incoming argument `incoming`.
    Drop {
        /// Insertion point in the target-side list.
        position: usize,
        /// Index of the unused incoming argument.
        incoming: usize,
    },
}

/// A reorder array rewritten into a bijection plus the steps that reach it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedPermutation {
    permutation: Vec<usize>,
    steps: Vec<RewriteStep>,
}

impl NormalizedPermutation {
    /// Returns the final bijection over the incoming arguments.
    #[must_use]
    pub fn permutation(&self) -> &[usize] {
        &self.permutation
    }

    /// Returns the rewrite steps in application order.
    #[must_use]
    pub fn steps(&self) -> &[RewriteStep] {
        &self.steps
    }

    /// Returns `true` if no rewrite was needed and the bijection is the
    /// identity.
    #[must_use]
    pub fn is_identity(&self) -> bool {
        self.steps.is_empty() && is_in_order(&self.permutation)
    }
}

fn is_in_order(permutation: &[usize]) -> bool {
    permutation
        .iter()
        .enumerate()
        .all(|(index, &incoming)| index == incoming)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Anomaly {
    Duplicate { earlier: usize, later: usize },
    Missing(usize),
}

/// Finds the first repeated entry, or failing that the smallest incoming
/// index that no entry mentions. Entries must be below `new_arity`.
fn find_first_dup_or_drop(reorder: &[usize], new_arity: usize) -> Option<Anomaly> {
    let missing = if new_arity < BIT_LIMIT {
        let mut mask = 0_u64;
        for (later, &incoming) in reorder.iter().enumerate() {
            let bit = 1_u64 << incoming;
            if mask & bit != 0 {
                return duplicate_of(reorder, later);
            }
            mask |= bit;
        }
        (!mask).trailing_zeros() as usize
    } else {
        let mut words: SmallVec<[u64; 4]> = SmallVec::from_elem(0, new_arity.div_ceil(64));
        for (later, &incoming) in reorder.iter().enumerate() {
            let (word, bit) = (incoming / 64, 1_u64 << (incoming % 64));
            if words[word] & bit != 0 {
                return duplicate_of(reorder, later);
            }
            words[word] |= bit;
        }
        words
            .iter()
            .enumerate()
            .find(|(_, word)| **word != u64::MAX)
            .map_or(new_arity, |(index, word)| {
                index * 64 + (!word).trailing_zeros() as usize
            })
    };
    (missing < new_arity).then_some(Anomaly::Missing(missing))
}

fn duplicate_of(reorder: &[usize], later: usize) -> Option<Anomaly> {
    let value = reorder[later];
    reorder[..later]
        .iter()
        .rposition(|&incoming| incoming == value)
        .map(|earlier| Anomaly::Duplicate { earlier, later })
}

/// Rewrites `reorder` into a bijection over `0..new_arity`.
///
/// Each duplicate removes one of its two occurrences: the earlier one if a
/// smaller entry lies between them (which removes an inversion), otherwise
/// the later one. Each missing incoming index is inserted before the first
/// larger entry.
///
/// # Errors
///
/// Returns [`HandleError::IllegalArgument`] if an entry is not below
/// `new_arity`.
///
/// # Examples
///
/// ```rust
/// use callgraft::combinator::{RewriteStep, normalize_permutation};
///
/// let normalized = normalize_permutation(&[1, 0, 1], 3)?;
/// assert_eq!(normalized.permutation(), &[0, 1, 2]);
/// assert_eq!(
///     normalized.steps(),
///     &[
///         RewriteStep::Duplicate { source: 2, destination: 0 },
///         RewriteStep::Drop { position: 2, incoming: 2 },
///     ]
/// );
/// # Ok::<(), callgraft::HandleError>(())
/// ```
pub fn normalize_permutation(
    reorder: &[usize],
    new_arity: usize,
) -> Result<NormalizedPermutation, HandleError> {
    if let Some(&incoming) = reorder.iter().find(|&&incoming| incoming >= new_arity) {
        return Err(HandleError::illegal_argument(
            "permute_arguments",
            format!("reorder entry {incoming} out of range for {new_arity} arguments"),
        ));
    }
    let mut permutation = reorder.to_vec();
    let mut steps = Vec::new();
    while let Some(anomaly) = find_first_dup_or_drop(&permutation, new_arity) {
        let step = match anomaly {
            Anomaly::Duplicate { earlier, later } => {
                let value = permutation[later];
                let kill_first = permutation[earlier + 1..later]
                    .iter()
                    .any(|&between| value > between);
                let (source, destination) = if kill_first {
                    (later, earlier)
                } else {
                    (earlier, later)
                };
                permutation.remove(destination);
                RewriteStep::Duplicate {
                    source,
                    destination,
                }
            }
            Anomaly::Missing(incoming) => {
                let position = permutation
                    .iter()
                    .position(|&entry| entry > incoming)
                    .unwrap_or(permutation.len());
                permutation.insert(position, incoming);
                RewriteStep::Drop { position, incoming }
            }
        };
        tracing::trace!(?step, ?permutation, "permutation rewrite");
        steps.push(step);
    }
    Ok(NormalizedPermutation { permutation, steps })
}

/// Produces a handle of `new_signature` that invokes `target` with
/// `arguments[reorder[0]], arguments[reorder[1]], ...`.
///
/// Incoming arguments may be used more than once or not at all.
///
/// # Errors
///
/// Returns [`HandleError::IllegalArgument`] if `reorder` does not have one
/// entry per target parameter or an entry is out of range, and
/// [`HandleError::SignatureMismatch`] if the return types differ or an
/// incoming parameter type differs from the target parameter it feeds.
///
/// # Examples
///
/// ```rust
/// use callgraft::{MethodHandle, Value};
/// use callgraft::combinator::permute_arguments;
/// use callgraft::signature::{Signature, Type};
///
/// let concat = MethodHandle::new(
///     Signature::new(Type::String, [Type::String, Type::String, Type::String])?,
///     |arguments| Ok(Value::from(format!("{}{}{}", arguments[0], arguments[1], arguments[2]))),
/// );
/// let echo = permute_arguments(
///     &concat,
///     &Signature::new(Type::String, [Type::String, Type::String])?,
///     &[1, 0, 1],
/// )?;
/// assert_eq!(echo.invoke_exact(&[Value::from("a"), Value::from("b")]), Ok(Value::from("bab")));
/// # Ok::<(), callgraft::HandleError>(())
/// ```
pub fn permute_arguments(
    target: &MethodHandle,
    new_signature: &Signature,
    reorder: &[usize],
) -> Result<MethodHandle, HandleError> {
    check_permutation(target, new_signature, reorder)?;
    let normalized = normalize_permutation(reorder, new_signature.parameter_count())?;
    let mut adapted = target.clone();
    for step in normalized.steps() {
        adapted = match *step {
            RewriteStep::Duplicate {
                source,
                destination,
            } => duplicate_argument(&adapted, source, destination)?,
            RewriteStep::Drop { position, incoming } => {
                let ignored = new_signature.parameters()[incoming].clone();
                drop_arguments(&adapted, position, &[ignored])?
            }
        };
    }
    if is_in_order(normalized.permutation()) {
        return Ok(adapted);
    }
    let permutation: SmallVec<[usize; 8]> = normalized.permutation().iter().copied().collect();
    Ok(MethodHandle::new(new_signature.clone(), move |arguments| {
        let routed: Arguments = permutation
            .iter()
            .map(|&incoming| arguments[incoming].clone())
            .collect();
        adapted.invoke_basic(&routed)
    }))
}

fn check_permutation(
    target: &MethodHandle,
    new_signature: &Signature,
    reorder: &[usize],
) -> Result<(), HandleError> {
    if reorder.len() != target.arity() {
        tracing::debug!(signature = %target.signature(), ?reorder, "reorder length differs from arity");
        return Err(HandleError::illegal_argument(
            "permute_arguments",
            format!(
                "reorder has {} entries but {} has {} parameters",
                reorder.len(),
                target.signature(),
                target.arity()
            ),
        ));
    }
    if new_signature.return_type() != target.return_type() {
        return Err(HandleError::signature_mismatch(
            "permute_arguments",
            format!("{new_signature} and {} return different types", target.signature()),
        ));
    }
    for (position, (&incoming, expected)) in reorder.iter().zip(target.parameters()).enumerate() {
        match new_signature.parameter(incoming) {
            None => {
                return Err(HandleError::illegal_argument(
                    "permute_arguments",
                    format!("reorder entry {incoming} out of range for {new_signature}"),
                ));
            }
            Some(supplied) if supplied != expected => {
                return Err(HandleError::signature_mismatch(
                    "permute_arguments",
                    format!("argument {incoming} of type {supplied} cannot feed parameter {position} of type {expected}"),
                ));
            }
            Some(_) => {}
        }
    }
    Ok(())
}

/// Removes parameter `destination` and feeds it from `source`.
fn duplicate_argument(
    target: &MethodHandle,
    source: usize,
    destination: usize,
) -> Result<MethodHandle, HandleError> {
    let signature = target
        .signature()
        .drop_parameters(destination, destination + 1)?;
    let shift = move |position: usize| if position > destination { position - 1 } else { position };
    let source = shift(source);
    let arity = target.arity();
    let target = target.clone();
    Ok(MethodHandle::new(signature, move |arguments| {
        let full: Arguments = (0..arity)
            .map(|position| {
                if position == destination {
                    arguments[source].clone()
                } else {
                    arguments[shift(position)].clone()
                }
            })
            .collect();
        target.invoke_basic(&full)
    }))
}
