//! Tests for insert, drop, filter, collect and fold.

use std::sync::{Arc, Mutex};

use callgraft::combinator::{
    collect_arguments, drop_arguments, drop_arguments_to_match, drop_return, empty,
    filter_arguments, filter_return_value, fold_arguments, fold_arguments_at, insert_arguments,
};
use callgraft::signature::{Signature, Type};
use callgraft::{HandleError, MethodHandle, Value};
use rstest::{fixture, rstest};

/// `(String, int, String)String` joining its arguments with `/`.
#[fixture]
fn join3() -> MethodHandle {
    MethodHandle::new(
        Signature::new(Type::String, [Type::String, Type::INT, Type::String]).unwrap(),
        |arguments| {
            Ok(Value::from(format!(
                "{}/{}/{}",
                arguments[0], arguments[1], arguments[2]
            )))
        },
    )
}

fn length() -> MethodHandle {
    MethodHandle::new(
        Signature::new(Type::INT, [Type::String]).unwrap(),
        |arguments| Ok(Value::Int(i32::try_from(arguments[0].as_str()?.len()).unwrap())),
    )
}

fn shout() -> MethodHandle {
    MethodHandle::new(
        Signature::new(Type::String, [Type::String]).unwrap(),
        |arguments| Ok(Value::from(arguments[0].as_str()?.to_uppercase())),
    )
}

fn strings(values: &[&str]) -> Vec<Value> {
    values.iter().map(|value| Value::from(*value)).collect()
}

// =============================================================================
// insert_arguments
// =============================================================================

#[rstest]
#[case(0, vec![Value::from("a")], vec![Value::Int(1), Value::from("c")])]
#[case(1, vec![Value::Int(1)], vec![Value::from("a"), Value::from("c")])]
#[case(1, vec![Value::Int(1), Value::from("c")], vec![Value::from("a")])]
#[case(0, vec![Value::from("a"), Value::Int(1), Value::from("c")], vec![])]
fn insertion_is_transparent(
    join3: MethodHandle,
    #[case] position: usize,
    #[case] bound: Vec<Value>,
    #[case] remaining: Vec<Value>,
) {
    let inserted = insert_arguments(&join3, position, bound).unwrap();
    assert_eq!(inserted.invoke_exact(&remaining), Ok(Value::from("a/1/c")));
}

#[rstest]
fn insert_with_no_values_keeps_target(join3: MethodHandle) {
    let same = insert_arguments(&join3, 3, []).unwrap();
    assert!(same.ptr_eq(&join3));
}

#[rstest]
fn insert_past_arity_is_illegal(join3: MethodHandle) {
    assert!(matches!(
        insert_arguments(&join3, 4, [Value::Int(1)]),
        Err(HandleError::IllegalArgument { .. })
    ));
}

// =============================================================================
// drop_arguments and drop_arguments_to_match
// =============================================================================

#[rstest]
fn dropped_arguments_are_ignored(join3: MethodHandle) {
    let padded = drop_arguments(&join3, 1, &[Type::LONG, Type::BOOLEAN]).unwrap();
    assert_eq!(
        padded.signature().to_string(),
        "(String,long,boolean,int,String)String"
    );
    let result = padded.invoke_exact(&[
        Value::from("a"),
        Value::Long(99),
        Value::Boolean(true),
        Value::Int(1),
        Value::from("c"),
    ]);
    assert_eq!(result, Ok(Value::from("a/1/c")));
}

#[rstest]
fn drop_then_insert_recovers_behavior(join3: MethodHandle) {
    let padded = drop_arguments(&join3, 0, &[Type::DOUBLE]).unwrap();
    let recovered = insert_arguments(&padded, 0, [Value::Double(1.5)]).unwrap();
    let arguments = [Value::from("x"), Value::Int(2), Value::from("y")];
    assert_eq!(
        recovered.invoke_exact(&arguments),
        join3.invoke_exact(&arguments)
    );
}

#[rstest]
fn drop_to_match_pads_both_sides(join3: MethodHandle) {
    let new_types = [
        Type::LONG,
        Type::String,
        Type::INT,
        Type::String,
        Type::BOOLEAN,
    ];
    let padded = drop_arguments_to_match(&join3, 0, &new_types, 1).unwrap();
    assert_eq!(
        padded.signature().to_string(),
        "(long,String,int,String,boolean)String"
    );
    let result = padded.invoke_exact(&[
        Value::Long(0),
        Value::from("a"),
        Value::Int(1),
        Value::from("c"),
        Value::Boolean(false),
    ]);
    assert_eq!(result, Ok(Value::from("a/1/c")));
}

#[rstest]
fn drop_return_discards_result(join3: MethodHandle) {
    let silent = drop_return(&join3).unwrap();
    assert_eq!(silent.signature().to_string(), "(String,int,String)void");
    let same = drop_return(&silent).unwrap();
    assert!(same.ptr_eq(&silent));
}

// =============================================================================
// filter_arguments and filter_return_value
// =============================================================================

#[rstest]
fn filters_replace_parameter_types(join3: MethodHandle) {
    let filtered = filter_arguments(&join3, 0, &[Some(shout()), Some(length())]).unwrap();
    assert_eq!(
        filtered.signature().to_string(),
        "(String,String,String)String"
    );
    let result = filtered.invoke_exact(&strings(&["ab", "xyz", "c"]));
    assert_eq!(result, Ok(Value::from("AB/3/c")));
}

#[rstest]
fn missing_filters_leave_arguments_alone(join3: MethodHandle) {
    let filtered = filter_arguments(&join3, 1, &[None, Some(shout())]).unwrap();
    let result = filtered.invoke_exact(&[Value::from("a"), Value::Int(1), Value::from("c")]);
    assert_eq!(result, Ok(Value::from("a/1/C")));
}

#[rstest]
fn filters_run_left_to_right(join3: MethodHandle) {
    let order = Arc::new(Mutex::new(Vec::new()));
    let recording = |label: &'static str, filter: MethodHandle| {
        let order = Arc::clone(&order);
        MethodHandle::new(filter.signature().clone(), move |arguments| {
            order.lock().unwrap().push(label);
            filter.invoke_exact(arguments)
        })
    };
    let filtered = filter_arguments(
        &join3,
        0,
        &[
            Some(recording("first", shout())),
            Some(recording("second", length())),
            Some(recording("third", shout())),
        ],
    )
    .unwrap();
    filtered.invoke_exact(&strings(&["a", "bb", "c"])).unwrap();
    assert_eq!(*order.lock().unwrap(), vec!["first", "second", "third"]);
}

#[rstest]
fn filter_with_wrong_return_type_is_rejected(join3: MethodHandle) {
    assert!(matches!(
        filter_arguments(&join3, 0, &[Some(length())]),
        Err(HandleError::SignatureMismatch { .. })
    ));
}

#[rstest]
fn filter_return_value_post_processes(join3: MethodHandle) {
    let shouted = filter_return_value(&join3, &shout()).unwrap();
    let result = shouted.invoke_exact(&[Value::from("a"), Value::Int(1), Value::from("c")]);
    assert_eq!(result, Ok(Value::from("A/1/C")));
    assert!(filter_return_value(&join3, &join3).is_err());
}

#[rstest]
fn filter_return_value_after_void_takes_nothing() {
    let silent = empty(&Signature::new(Type::Void, [Type::INT]).unwrap());
    let answer = MethodHandle::new(Signature::returning(Type::INT), |_| Ok(Value::Int(42)));
    let filtered = filter_return_value(&silent, &answer).unwrap();
    assert_eq!(filtered.signature().to_string(), "(int)int");
    assert_eq!(filtered.invoke_exact(&[Value::Int(0)]), Ok(Value::Int(42)));
}

// =============================================================================
// collect_arguments
// =============================================================================

#[rstest]
fn collect_replaces_run_with_filter_result(join3: MethodHandle) {
    let concat = MethodHandle::new(
        Signature::new(Type::String, [Type::String, Type::String]).unwrap(),
        |arguments| Ok(Value::from(format!("{}{}", arguments[0], arguments[1]))),
    );
    let collected = collect_arguments(&join3, 2, &concat).unwrap();
    assert_eq!(
        collected.signature().to_string(),
        "(String,int,String,String)String"
    );
    let result = collected.invoke_exact(&[
        Value::from("a"),
        Value::Int(1),
        Value::from("x"),
        Value::from("y"),
    ]);
    assert_eq!(result, Ok(Value::from("a/1/xy")));
}

#[rstest]
fn collect_with_void_filter_observes_arguments(join3: MethodHandle) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let observer = MethodHandle::new(
        Signature::new(Type::Void, [Type::LONG]).unwrap(),
        move |arguments| {
            sink.lock().unwrap().push(arguments[0].as_long()?);
            Ok(Value::Void)
        },
    );
    let collected = collect_arguments(&join3, 0, &observer).unwrap();
    assert_eq!(
        collected.signature().to_string(),
        "(long,String,int,String)String"
    );
    let result = collected.invoke_exact(&[
        Value::Long(7),
        Value::from("a"),
        Value::Int(1),
        Value::from("c"),
    ]);
    assert_eq!(result, Ok(Value::from("a/1/c")));
    assert_eq!(*seen.lock().unwrap(), vec![7]);
}

#[rstest]
fn collect_with_mismatched_filter_is_rejected(join3: MethodHandle) {
    assert!(matches!(
        collect_arguments(&join3, 1, &shout()),
        Err(HandleError::SignatureMismatch { .. })
    ));
}

// =============================================================================
// fold_arguments
// =============================================================================

#[rstest]
fn fold_inserts_combiner_result(join3: MethodHandle) {
    let folded = fold_arguments(&join3, 1, &length()).unwrap();
    assert_eq!(folded.signature().to_string(), "(String,String)String");
    let result = folded.invoke_exact(&strings(&["left", "right"]));
    assert_eq!(result, Ok(Value::from("left/5/right")));
}

#[rstest]
fn fold_rejects_combiner_that_cannot_take_following_arguments(join3: MethodHandle) {
    assert!(matches!(
        fold_arguments(&join3, 0, &shout()),
        Err(HandleError::SignatureMismatch { .. })
    ));
}

#[rstest]
fn fold_with_positions_selects_arguments(join3: MethodHandle) {
    let folded = fold_arguments_at(&join3, 1, &length(), &[0]).unwrap();
    assert_eq!(folded.signature().to_string(), "(String,String)String");
    let result = folded.invoke_exact(&strings(&["left", "right"]));
    assert_eq!(result, Ok(Value::from("left/4/right")));
}

#[rstest]
fn fold_with_void_combiner_runs_for_effect(join3: MethodHandle) {
    let calls = Arc::new(Mutex::new(0));
    let counter = Arc::clone(&calls);
    let combiner = MethodHandle::new(
        Signature::new(Type::Void, [Type::String]).unwrap(),
        move |_| {
            *counter.lock().unwrap() += 1;
            Ok(Value::Void)
        },
    );
    let folded = fold_arguments(&join3, 0, &combiner).unwrap();
    assert_eq!(folded.signature(), join3.signature());
    let result = folded.invoke_exact(&[Value::from("a"), Value::Int(1), Value::from("c")]);
    assert_eq!(result, Ok(Value::from("a/1/c")));
    assert_eq!(*calls.lock().unwrap(), 1);
}

#[rstest]
fn fold_with_out_of_range_position_is_illegal(join3: MethodHandle) {
    assert!(matches!(
        fold_arguments_at(&join3, 1, &length(), &[5]),
        Err(HandleError::IllegalArgument { .. })
    ));
}
