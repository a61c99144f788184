//! Loops built from clauses.
//!
//! A loop is described by an ordered list of [`Clause`]s. Each clause may
//! own one iteration variable and contributes up to four handles:
//!
//! | slot | role | parameters |
//! |---|---|---|
//! | `init` | seeds the clause's variable | the loop parameters `(A...)` |
//! | `step` | updates the clause's variable | `(V..., A...)` |
//! | `pred` | decides whether to continue | `(V..., A...)` |
//! | `fini` | computes the loop result on exit | `(V..., A...)` |
//!
//! `V...` are the non-void variable types in clause order. Every handle may
//! take a prefix of its list; the missing trailing parameters are ignored.
//!
//! [`clause_loop`] reconciles the clauses into one internal parameter list,
//! fills in every omitted handle and produces a single handle of
//! `(A...) -> R`. On invocation it runs every `init` in clause order, then
//! repeats: for each clause, run `step`, then `pred`; the first predicate
//! that answers `false` ends the loop with that clause's `fini`.
//!
//! A loop whose predicates never answer `false` does not terminate.
//!
//! [`while_loop`], [`do_while_loop`], [`counted_loop`],
//! [`counted_loop_range`] and [`iterated_loop`] are fixed instantiations of
//! the same protocol.
//!
//! # Examples
//!
//! Factorial, with a counter clause and an accumulator clause:
//!
//! ```rust
//! use callgraft::{MethodHandle, Value};
//! use callgraft::combinator::constant;
//! use callgraft::loops::{Clause, clause_loop};
//! use callgraft::signature::{Signature, Type};
//!
//! let int = |parameters: &[Type], body: fn(&[Value]) -> Result<Value, callgraft::Throwable>| {
//!     Signature::new(Type::INT, parameters.iter().cloned()).map(|signature| MethodHandle::new(signature, body))
//! };
//! let increment = int(&[Type::INT], |arguments| Ok(Value::Int(arguments[0].as_int()? + 1)))?;
//! let multiply = int(&[Type::INT, Type::INT], |arguments| {
//!     Ok(Value::Int(arguments[0].as_int()? * arguments[1].as_int()?))
//! })?;
//! let below = MethodHandle::new(
//!     Signature::new(Type::BOOLEAN, [Type::INT, Type::INT, Type::INT])?,
//!     |arguments| Ok(Value::Boolean(arguments[0].as_int()? < arguments[2].as_int()?)),
//! );
//! let result = int(&[Type::INT, Type::INT], |arguments| Ok(arguments[1].clone()))?;
//!
//! let factorial = clause_loop(&[
//!     Clause::new().with_step(&increment),
//!     Clause::new()
//!         .with_init(&constant(&Type::INT, Value::Int(1))?)
//!         .with_step(&multiply)
//!         .with_pred(&below)
//!         .with_fini(&result),
//! ])?;
//! assert_eq!(factorial.signature().to_string(), "(int)int");
//! assert_eq!(factorial.invoke_exact(&[Value::Int(5)]), Ok(Value::Int(120)));
//! # Ok::<(), callgraft::HandleError>(())
//! ```

mod builders;

pub use builders::{counted_loop, counted_loop_range, do_while_loop, iterated_loop, while_loop};

use smallvec::SmallVec;

use crate::combinator::{constant, drop_arguments_to_match, empty, identity};
use crate::error::HandleError;
use crate::handle::MethodHandle;
use crate::signature::{Signature, Type};
use crate::value::Value;

/// One clause of a loop: up to four handles, any of which may be omitted.
#[derive(Debug, Clone, Default)]
pub struct Clause {
    init: Option<MethodHandle>,
    step: Option<MethodHandle>,
    pred: Option<MethodHandle>,
    fini: Option<MethodHandle>,
}

impl Clause {
    /// Creates a clause with every slot empty.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            init: None,
            step: None,
            pred: None,
            fini: None,
        }
    }

    /// Builds a clause from positional slots `(init, step, pred, fini)`.
    /// Missing trailing slots are empty.
    ///
    /// # Errors
    ///
    /// Returns [`HandleError::IllegalArgument`] if more than four slots are
    /// given.
    pub fn from_slots(
        slots: impl IntoIterator<Item = Option<MethodHandle>>,
    ) -> Result<Self, HandleError> {
        let slots: SmallVec<[Option<MethodHandle>; 4]> = slots.into_iter().collect();
        if slots.len() > 4 {
            return Err(HandleError::illegal_argument(
                "loop",
                format!("a clause has at most 4 functions, got {}", slots.len()),
            ));
        }
        let mut slots = slots.into_iter();
        Ok(Self {
            init: slots.next().flatten(),
            step: slots.next().flatten(),
            pred: slots.next().flatten(),
            fini: slots.next().flatten(),
        })
    }

    /// Sets the initializer.
    #[must_use]
    pub fn with_init(mut self, init: &MethodHandle) -> Self {
        self.init = Some(init.clone());
        self
    }

    /// Sets the step.
    #[must_use]
    pub fn with_step(mut self, step: &MethodHandle) -> Self {
        self.step = Some(step.clone());
        self
    }

    /// Sets the predicate.
    #[must_use]
    pub fn with_pred(mut self, pred: &MethodHandle) -> Self {
        self.pred = Some(pred.clone());
        self
    }

    /// Sets the finalizer.
    #[must_use]
    pub fn with_fini(mut self, fini: &MethodHandle) -> Self {
        self.fini = Some(fini.clone());
        self
    }

    /// Returns the initializer.
    #[must_use]
    pub const fn init(&self) -> Option<&MethodHandle> {
        self.init.as_ref()
    }

    /// Returns the step.
    #[must_use]
    pub const fn step(&self) -> Option<&MethodHandle> {
        self.step.as_ref()
    }

    /// Returns the predicate.
    #[must_use]
    pub const fn pred(&self) -> Option<&MethodHandle> {
        self.pred.as_ref()
    }

    /// Returns the finalizer.
    #[must_use]
    pub const fn fini(&self) -> Option<&MethodHandle> {
        self.fini.as_ref()
    }

    /// Returns `true` if every slot is empty.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.init.is_none() && self.step.is_none() && self.pred.is_none() && self.fini.is_none()
    }

    /// The variable type: the return type of `init`, else of `step`.
    fn variable_type(&self) -> Result<Type, HandleError> {
        match (&self.init, &self.step) {
            (Some(init), Some(step)) if init.return_type() != step.return_type() => {
                Err(HandleError::signature_mismatch(
                    "loop",
                    format!(
                        "init {} and step {} return different types",
                        init.signature(),
                        step.signature()
                    ),
                ))
            }
            (Some(handle), _) | (None, Some(handle)) => Ok(handle.return_type().clone()),
            (None, None) => Ok(Type::Void),
        }
    }
}

/// A clause with every slot filled and padded to the loop's parameter lists.
struct Filled {
    init: MethodHandle,
    step: MethodHandle,
    pred: MethodHandle,
    fini: MethodHandle,
    slot: Option<usize>,
}

/// Builds a loop from `clauses`.
///
/// Clauses with every slot empty are ignored.
///
/// # Errors
///
/// Returns [`HandleError::IllegalArgument`] if no clause is given or no
/// clause has a predicate, [`HandleError::SignatureMismatch`] if a clause's
/// `init` and `step` return different types, a predicate does not return
/// `boolean` or the finalizers disagree on the result type, and
/// [`HandleError::IncompatibleClauseSignatures`] if the parameter lists
/// cannot be reconciled.
pub fn clause_loop(clauses: &[Clause]) -> Result<MethodHandle, HandleError> {
    if clauses.is_empty() {
        return Err(HandleError::illegal_argument("loop", "no clauses passed"));
    }
    let clauses: SmallVec<[&Clause; 4]> = clauses.iter().filter(|clause| !clause.is_empty()).collect();
    let variables = clauses
        .iter()
        .map(|clause| clause.variable_type())
        .collect::<Result<SmallVec<[Type; 4]>, HandleError>>()?;
    let prefix: SmallVec<[Type; 4]> = variables.iter().filter(|ty| !ty.is_void()).cloned().collect();
    let external = common_suffix(&clauses, prefix.len());
    let internal: Vec<Type> = prefix.iter().chain(&external).cloned().collect();
    check_parameter_lists(&clauses, &external, &internal)?;
    let returned = loop_return_type(&clauses)?;
    check_predicates(&clauses)?;

    let mut filled = Vec::with_capacity(clauses.len());
    let mut slots = 0;
    for (clause, variable) in clauses.iter().zip(&variables) {
        let slot = (!variable.is_void()).then_some(slots);
        filled.push(fill_clause(clause, variable, slot, &returned, &external, &internal)?);
        slots += usize::from(slot.is_some());
    }
    let signature = Signature::new(returned, external.iter().cloned())?;
    tracing::trace!(%signature, clauses = filled.len(), variables = slots, "loop normalized");
    Ok(emit(signature, filled, slots))
}

/// The external parameter list: the longer of the longest step, pred or
/// fini list past the variables and the longest init list.
fn common_suffix(clauses: &[&Clause], variables: usize) -> Vec<Type> {
    let internal = clauses
        .iter()
        .filter_map(|clause| clause.step.as_ref())
        .chain(clauses.iter().filter_map(|clause| clause.pred.as_ref()))
        .chain(clauses.iter().filter_map(|clause| clause.fini.as_ref()));
    let longest_internal = longest_parameter_list(internal, variables);
    let longest_init =
        longest_parameter_list(clauses.iter().filter_map(|clause| clause.init.as_ref()), 0);
    if longest_internal.len() >= longest_init.len() {
        longest_internal.to_vec()
    } else {
        longest_init.to_vec()
    }
}

fn longest_parameter_list<'a>(
    handles: impl Iterator<Item = &'a MethodHandle>,
    skip: usize,
) -> &'a [Type] {
    handles
        .map(MethodHandle::parameters)
        .reduce(|longest, candidate| {
            if longest.len() >= candidate.len() {
                longest
            } else {
                candidate
            }
        })
        .filter(|longest| longest.len() > skip)
        .map(|longest| &longest[skip..])
        .unwrap_or_default()
}

fn check_parameter_lists(
    clauses: &[&Clause],
    external: &[Type],
    internal: &[Type],
) -> Result<(), HandleError> {
    if let Some(init) = clauses
        .iter()
        .filter_map(|clause| clause.init.as_ref())
        .find(|init| !init.signature().effectively_identical_parameters(0, external))
    {
        return Err(HandleError::incompatible_clauses(format!(
            "init {} does not take a prefix of ({})",
            init.signature(),
            join(external)
        )));
    }
    let mismatch = clauses
        .iter()
        .flat_map(|clause| [&clause.step, &clause.pred, &clause.fini])
        .flatten()
        .find(|handle| !handle.signature().effectively_identical_parameters(0, internal));
    if let Some(handle) = mismatch {
        return Err(HandleError::incompatible_clauses(format!(
            "{} does not take a prefix of ({})",
            handle.signature(),
            join(internal)
        )));
    }
    Ok(())
}

fn loop_return_type(clauses: &[&Clause]) -> Result<Type, HandleError> {
    let mut finis = clauses.iter().filter_map(|clause| clause.fini.as_ref());
    let Some(first) = finis.next() else {
        return Ok(Type::Void);
    };
    let returned = first.return_type();
    if let Some(other) = finis.find(|fini| fini.return_type() != returned) {
        return Err(HandleError::signature_mismatch(
            "loop",
            format!(
                "finalizers return {returned} and {}",
                other.return_type()
            ),
        ));
    }
    Ok(returned.clone())
}

fn check_predicates(clauses: &[&Clause]) -> Result<(), HandleError> {
    let mut predicates = clauses.iter().filter_map(|clause| clause.pred.as_ref()).peekable();
    if predicates.peek().is_none() {
        return Err(HandleError::illegal_argument("loop", "no predicate found"));
    }
    if let Some(pred) = predicates.find(|pred| pred.return_type() != &Type::BOOLEAN) {
        return Err(HandleError::signature_mismatch(
            "loop",
            format!("predicate {} does not return boolean", pred.signature()),
        ));
    }
    Ok(())
}

fn fill_clause(
    clause: &Clause,
    variable: &Type,
    slot: Option<usize>,
    returned: &Type,
    external: &[Type],
    internal: &[Type],
) -> Result<Filled, HandleError> {
    let internal_signature = |return_type: &Type| Signature::new(return_type.clone(), internal.iter().cloned());
    let init = match &clause.init {
        Some(init) => drop_arguments_to_match(init, 0, external, 0)?,
        None => empty(&Signature::new(variable.clone(), external.iter().cloned())?),
    };
    let step = match (&clause.step, slot) {
        (Some(step), _) => drop_arguments_to_match(step, 0, internal, 0)?,
        (None, Some(slot)) => drop_arguments_to_match(&identity(variable)?, 0, internal, slot)?,
        (None, None) => empty(&internal_signature(&Type::Void)?),
    };
    let pred = match &clause.pred {
        Some(pred) => drop_arguments_to_match(pred, 0, internal, 0)?,
        None => drop_arguments_to_match(
            &constant(&Type::BOOLEAN, Value::Boolean(true))?,
            0,
            internal,
            0,
        )?,
    };
    let fini = match &clause.fini {
        Some(fini) => drop_arguments_to_match(fini, 0, internal, 0)?,
        None => empty(&internal_signature(returned)?),
    };
    Ok(Filled {
        init,
        step,
        pred,
        fini,
        slot,
    })
}

fn emit(signature: Signature, clauses: Vec<Filled>, variables: usize) -> MethodHandle {
    MethodHandle::new(signature, move |arguments| {
        let mut state: SmallVec<[Value; 8]> = SmallVec::with_capacity(variables + arguments.len());
        state.resize(variables, Value::Void);
        for clause in &clauses {
            let seeded = clause.init.invoke_basic(arguments)?;
            if let Some(slot) = clause.slot {
                state[slot] = seeded;
            }
        }
        state.extend(arguments.iter().cloned());
        loop {
            for clause in &clauses {
                let stepped = clause.step.invoke_basic(&state)?;
                if let Some(slot) = clause.slot {
                    state[slot] = stepped;
                }
                if !clause.pred.invoke_basic(&state)?.as_boolean()? {
                    return clause.fini.invoke_basic(&state);
                }
            }
        }
    })
}

fn join(types: &[Type]) -> String {
    types
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(",")
}
