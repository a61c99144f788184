//! Tests for the clause loop and the fixed-shape loops built on it.

use std::sync::{Arc, Mutex};

use callgraft::combinator::{constant, drop_arguments, empty, identity};
use callgraft::loops::{
    Clause, clause_loop, counted_loop, counted_loop_range, do_while_loop, iterated_loop,
    while_loop,
};
use callgraft::signature::{ErrorClass, Signature, Type};
use callgraft::value::IteratorValue;
use callgraft::{HandleError, MethodHandle, Throwable, Value};
use rstest::{fixture, rstest};

fn handle(
    return_type: Type,
    parameters: &[Type],
    body: impl Fn(&[Value]) -> Result<Value, Throwable> + Send + Sync + 'static,
) -> MethodHandle {
    MethodHandle::new(
        Signature::new(return_type, parameters.iter().cloned()).unwrap(),
        body,
    )
}

fn int_constant(value: i32) -> MethodHandle {
    constant(&Type::INT, Value::Int(value)).unwrap()
}

fn never() -> MethodHandle {
    constant(&Type::BOOLEAN, Value::Boolean(false)).unwrap()
}

/// `(int)int` factorial: a counter clause and an accumulator clause.
#[fixture]
fn factorial() -> MethodHandle {
    let increment = handle(Type::INT, &[Type::INT], |arguments| {
        Ok(Value::Int(arguments[0].as_int()? + 1))
    });
    let multiply = handle(Type::INT, &[Type::INT, Type::INT], |arguments| {
        Ok(Value::Int(arguments[0].as_int()? * arguments[1].as_int()?))
    });
    let below = handle(
        Type::BOOLEAN,
        &[Type::INT, Type::INT, Type::INT],
        |arguments| Ok(Value::Boolean(arguments[0].as_int()? < arguments[2].as_int()?)),
    );
    let result = handle(Type::INT, &[Type::INT, Type::INT], |arguments| {
        Ok(arguments[1].clone())
    });
    clause_loop(&[
        Clause::new().with_step(&increment),
        Clause::new()
            .with_init(&int_constant(1))
            .with_step(&multiply)
            .with_pred(&below)
            .with_fini(&result),
    ])
    .unwrap()
}

/// `(int v, int counter)int` adding one per iteration.
fn tally() -> MethodHandle {
    handle(Type::INT, &[Type::INT, Type::INT], |arguments| {
        Ok(Value::Int(arguments[0].as_int()? + 1))
    })
}

/// `(String v, int counter)String` appending the counter.
fn append_counter() -> MethodHandle {
    handle(Type::String, &[Type::String, Type::INT], |arguments| {
        Ok(Value::from(format!("{}{}", arguments[0], arguments[1])))
    })
}

// =============================================================================
// clause_loop
// =============================================================================

#[rstest]
#[case(1, 1)]
#[case(5, 120)]
#[case(6, 720)]
fn factorial_loop(factorial: MethodHandle, #[case] n: i32, #[case] expected: i32) {
    assert_eq!(factorial.signature().to_string(), "(int)int");
    assert_eq!(factorial.invoke_exact(&[Value::Int(n)]), Ok(Value::Int(expected)));
}

#[rstest]
fn inits_run_in_clause_order_before_any_step() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let recorder = |label: &'static str, value: i32| {
        let log = Arc::clone(&log);
        handle(Type::INT, &[], move |_| {
            log.lock().unwrap().push(label);
            Ok(Value::Int(value))
        })
    };
    let stepper = |label: &'static str| {
        let log = Arc::clone(&log);
        handle(Type::INT, &[Type::INT, Type::INT], move |arguments| {
            log.lock().unwrap().push(label);
            Ok(arguments[0].clone())
        })
    };
    let looped = clause_loop(&[
        Clause::new()
            .with_init(&recorder("init a", 1))
            .with_step(&stepper("step a")),
        Clause::new()
            .with_init(&recorder("init b", 2))
            .with_step(&stepper("step b"))
            .with_pred(&never()),
    ])
    .unwrap();
    assert_eq!(looped.invoke_exact(&[]), Ok(Value::Void));
    assert_eq!(
        *log.lock().unwrap(),
        vec!["init a", "init b", "step a", "step b"]
    );
}

#[rstest]
fn first_false_predicate_selects_its_finalizer() {
    let first = handle(Type::String, &[], |_| Ok(Value::from("first")));
    let second = handle(Type::String, &[], |_| Ok(Value::from("second")));
    let always = constant(&Type::BOOLEAN, Value::Boolean(true)).unwrap();
    let looped = clause_loop(&[
        Clause::new().with_pred(&always).with_fini(&first),
        Clause::new().with_pred(&never()).with_fini(&second),
    ])
    .unwrap();
    assert_eq!(looped.invoke_exact(&[]), Ok(Value::from("second")));
}

#[rstest]
fn positional_slots_build_a_clause() {
    let clause = Clause::from_slots([
        Some(int_constant(3)),
        None,
        Some(never()),
        Some(identity(&Type::INT).unwrap()),
    ])
    .unwrap();
    let looped = clause_loop(&[clause]).unwrap();
    assert_eq!(looped.signature().to_string(), "()int");
    assert_eq!(looped.invoke_exact(&[]), Ok(Value::Int(3)));
}

#[rstest]
fn empty_clauses_are_ignored() {
    let looped = clause_loop(&[
        Clause::new(),
        Clause::new()
            .with_init(&int_constant(4))
            .with_pred(&never())
            .with_fini(&identity(&Type::INT).unwrap()),
        Clause::new(),
    ])
    .unwrap();
    assert_eq!(looped.invoke_exact(&[]), Ok(Value::Int(4)));
}

#[rstest]
fn loop_parameters_come_from_the_longest_list() {
    let pred = handle(
        Type::BOOLEAN,
        &[Type::INT, Type::String, Type::LONG],
        |arguments| Ok(Value::Boolean(arguments[0].as_int()? < 2)),
    );
    let step = handle(Type::INT, &[Type::INT], |arguments| {
        Ok(Value::Int(arguments[0].as_int()? + 1))
    });
    let fini = handle(Type::String, &[Type::INT, Type::String], |arguments| {
        Ok(Value::from(format!("{}{}", arguments[1], arguments[0])))
    });
    let looped = clause_loop(&[Clause::new()
        .with_step(&step)
        .with_pred(&pred)
        .with_fini(&fini)])
    .unwrap();
    assert_eq!(looped.signature().to_string(), "(String,long)String");
    let result = looped.invoke_exact(&[Value::from("n="), Value::Long(0)]);
    assert_eq!(result, Ok(Value::from("n=2")));
}

#[rstest]
fn finalizers_must_agree() {
    let looped = clause_loop(&[
        Clause::new().with_pred(&never()).with_fini(&int_constant(1)),
        Clause::new().with_fini(&constant(&Type::LONG, Value::Long(1)).unwrap()),
    ]);
    assert!(matches!(looped, Err(HandleError::SignatureMismatch { .. })));
}

#[rstest]
fn init_parameters_must_match_the_loop_parameters() {
    let init = empty(&Signature::new(Type::INT, [Type::LONG]).unwrap());
    let pred = empty(&Signature::new(Type::BOOLEAN, [Type::INT, Type::String]).unwrap());
    let looped = clause_loop(&[Clause::new().with_init(&init).with_pred(&pred)]);
    assert!(matches!(
        looped,
        Err(HandleError::IncompatibleClauseSignatures { .. })
    ));
}

#[rstest]
fn errors_in_the_body_end_the_loop() {
    let failing = handle(Type::INT, &[Type::INT], |_| {
        Err(Throwable::illegal_argument("stop"))
    });
    let looped = clause_loop(&[Clause::new().with_step(&failing).with_pred(&never())]).unwrap();
    let error = looped.invoke_exact(&[]).unwrap_err();
    assert_eq!(error.class(), &ErrorClass::illegal_argument());
}

// =============================================================================
// while_loop and do_while_loop
// =============================================================================

#[rstest]
#[case(1, 1)]
#[case(100, 128)]
#[case(1024, 1024)]
fn while_loop_doubles_up_to_limit(#[case] limit: i32, #[case] expected: i32) {
    let under_limit = handle(Type::BOOLEAN, &[Type::INT, Type::INT], |arguments| {
        Ok(Value::Boolean(arguments[0].as_int()? < arguments[1].as_int()?))
    });
    let double = handle(Type::INT, &[Type::INT, Type::INT], |arguments| {
        Ok(Value::Int(arguments[0].as_int()? * 2))
    });
    let init = drop_arguments(&int_constant(1), 0, &[Type::INT]).unwrap();
    let doubled = while_loop(Some(&init), &under_limit, &double).unwrap();
    assert_eq!(doubled.signature().to_string(), "(int)int");
    assert_eq!(
        doubled.invoke_exact(&[Value::Int(limit)]),
        Ok(Value::Int(expected))
    );
}

#[rstest]
fn while_checks_before_the_body_and_do_while_after() {
    let increment = handle(Type::INT, &[Type::INT], |arguments| {
        Ok(Value::Int(arguments[0].as_int()? + 1))
    });
    let start = int_constant(5);
    let checked_first = while_loop(Some(&start), &never(), &increment).unwrap();
    let checked_after = do_while_loop(Some(&start), &increment, &never()).unwrap();
    assert_eq!(checked_first.invoke_exact(&[]), Ok(Value::Int(5)));
    assert_eq!(checked_after.invoke_exact(&[]), Ok(Value::Int(6)));
}

#[rstest]
fn void_while_loop_runs_for_effect() {
    let remaining = Arc::new(Mutex::new(3));
    let observed = Arc::clone(&remaining);
    let pending = handle(Type::BOOLEAN, &[], move |_| {
        Ok(Value::Boolean(*observed.lock().unwrap() > 0))
    });
    let consumed = Arc::clone(&remaining);
    let consume = handle(Type::Void, &[], move |_| {
        *consumed.lock().unwrap() -= 1;
        Ok(Value::Void)
    });
    let drained = while_loop(None, &pending, &consume).unwrap();
    assert_eq!(drained.signature().to_string(), "()void");
    assert_eq!(drained.invoke_exact(&[]), Ok(Value::Void));
    assert_eq!(*remaining.lock().unwrap(), 0);
}

#[rstest]
fn while_loop_rejects_mismatched_initializer() {
    let increment = handle(Type::INT, &[Type::INT], |arguments| {
        Ok(Value::Int(arguments[0].as_int()? + 1))
    });
    let init = constant(&Type::LONG, Value::Long(0)).unwrap();
    assert!(matches!(
        while_loop(Some(&init), &never(), &increment),
        Err(HandleError::SignatureMismatch { .. })
    ));
}

// =============================================================================
// counted_loop and counted_loop_range
// =============================================================================

#[rstest]
#[case(0, 0)]
#[case(1, 1)]
#[case(10, 10)]
#[case(-3, 0)]
fn counted_loop_runs_n_times(#[case] n: i32, #[case] expected: i32) {
    let counted = counted_loop(&identity(&Type::INT).unwrap(), None, &tally()).unwrap();
    assert_eq!(counted.signature().to_string(), "(int)int");
    assert_eq!(counted.invoke_exact(&[Value::Int(n)]), Ok(Value::Int(expected)));
}

#[rstest]
#[case(3, 10)]
#[case(0, 7)]
#[case(-2, 7)]
fn counted_loop_starts_from_initializer(#[case] n: i32, #[case] expected: i32) {
    let counted =
        counted_loop(&identity(&Type::INT).unwrap(), Some(&int_constant(7)), &tally()).unwrap();
    assert_eq!(counted.invoke_exact(&[Value::Int(n)]), Ok(Value::Int(expected)));
}

#[rstest]
fn void_counted_loop_sees_every_counter() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let record = handle(Type::Void, &[Type::INT], move |arguments| {
        sink.lock().unwrap().push(arguments[0].as_int()?);
        Ok(Value::Void)
    });
    let counted = counted_loop(&identity(&Type::INT).unwrap(), None, &record).unwrap();
    assert_eq!(counted.signature().to_string(), "(int)void");
    assert_eq!(counted.invoke_exact(&[Value::Int(4)]), Ok(Value::Void));
    assert_eq!(*seen.lock().unwrap(), vec![0, 1, 2, 3]);
}

#[rstest]
#[case(2, 5, "234")]
#[case(-1, 1, "-10")]
#[case(3, 3, "")]
#[case(5, 2, "")]
fn counted_range_visits_start_to_end(#[case] start: i32, #[case] end: i32, #[case] expected: &str) {
    let blank = constant(&Type::String, Value::from("")).unwrap();
    let ranged = counted_loop_range(
        &int_constant(start),
        &int_constant(end),
        Some(&blank),
        &append_counter(),
    )
    .unwrap();
    assert_eq!(ranged.signature().to_string(), "()String");
    assert_eq!(ranged.invoke_exact(&[]), Ok(Value::from(expected)));
}

#[rstest]
fn counted_loop_requires_int_bounds() {
    let end = constant(&Type::LONG, Value::Long(3)).unwrap();
    assert!(matches!(
        counted_loop(&end, None, &tally()),
        Err(HandleError::SignatureMismatch { .. })
    ));
}

// =============================================================================
// iterated_loop
// =============================================================================

fn join_elements() -> MethodHandle {
    handle(Type::String, &[Type::String, Type::String], |arguments| {
        Ok(Value::from(format!("{}{}", arguments[0], arguments[1])))
    })
}

#[rstest]
#[case(vec!["a", "b", "c"], "abc")]
#[case(vec!["solo"], "solo")]
#[case(vec![], "")]
fn iterated_loop_folds_a_list(#[case] words: Vec<&str>, #[case] expected: &str) {
    let blank = constant(&Type::String, Value::from("")).unwrap();
    let joined = iterated_loop(None, Some(&blank), &join_elements()).unwrap();
    let list = Value::list(words.into_iter().map(Value::from));
    assert_eq!(joined.invoke_exact(&[list]), Ok(Value::from(expected)));
}

#[rstest]
fn iterated_loop_over_null_list_raises() {
    let joined = iterated_loop(None, None, &join_elements()).unwrap();
    let error = joined.invoke_exact(&[Value::Null]).unwrap_err();
    assert_eq!(error.class(), &ErrorClass::null_pointer());
}

#[rstest]
fn iterated_loop_with_explicit_iterator() {
    let upto = handle(Type::Iterator, &[Type::INT], |arguments| {
        let count = arguments[0].as_int()?;
        Ok(Value::Iterator(IteratorValue::new((0..count).map(Value::Int))))
    });
    let sum = handle(Type::INT, &[Type::INT, Type::INT], |arguments| {
        Ok(Value::Int(arguments[0].as_int()? + arguments[1].as_int()?))
    });
    let summed = iterated_loop(Some(&upto), None, &sum).unwrap();
    assert_eq!(summed.signature().to_string(), "(int)int");
    assert_eq!(summed.invoke_exact(&[Value::Int(4)]), Ok(Value::Int(6)));
    assert_eq!(summed.invoke_exact(&[Value::Int(0)]), Ok(Value::Int(0)));
}

#[rstest]
fn void_iterated_loop_visits_each_element() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let visit = handle(Type::Void, &[Type::String], move |arguments| {
        sink.lock().unwrap().push(arguments[0].to_string());
        Ok(Value::Void)
    });
    let visited = iterated_loop(None, None, &visit).unwrap();
    assert_eq!(visited.signature().to_string(), "(List)void");
    let list = Value::list([Value::from("x"), Value::from("y")]);
    assert_eq!(visited.invoke_exact(&[list]), Ok(Value::Void));
    assert_eq!(*seen.lock().unwrap(), vec!["x", "y"]);
}
