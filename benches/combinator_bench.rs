//! Benchmark for argument combinators and loops.
//!
//! Measures the cost of building adapted handles (permutation
//! normalization, clause reconciliation) and of invoking them.

use callgraft::combinator::{
    constant, identity, insert_arguments, normalize_permutation, permute_arguments,
};
use callgraft::loops::{Clause, clause_loop, counted_loop};
use callgraft::signature::{Signature, Type};
use callgraft::{MethodHandle, Value};
use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use std::hint::black_box;

fn summing(arity: usize) -> MethodHandle {
    MethodHandle::new(
        Signature::new(Type::LONG, std::iter::repeat_n(Type::LONG, arity)).unwrap(),
        |arguments| {
            let mut total = 0_i64;
            for argument in arguments {
                total = total.wrapping_add(argument.as_long()?);
            }
            Ok(Value::Long(total))
        },
    )
}

fn longs(count: usize) -> Signature {
    Signature::new(Type::LONG, std::iter::repeat_n(Type::LONG, count)).unwrap()
}

// =============================================================================
// 1. Permutation
// =============================================================================

fn benchmark_normalize_permutation(criterion: &mut Criterion) {
    let mut group = criterion.benchmark_group("normalize_permutation");

    for arity in [4, 16, 64, 128] {
        let reorder: Vec<usize> = (0..arity).map(|index| (index * 7 + 3) % arity).collect();
        group.bench_with_input(BenchmarkId::from_parameter(arity), &reorder, |bencher, reorder| {
            bencher.iter(|| black_box(normalize_permutation(black_box(reorder), arity)));
        });
    }

    group.finish();
}

fn benchmark_permuted_invocation(criterion: &mut Criterion) {
    let mut group = criterion.benchmark_group("permuted_invocation");

    for arity in [2, 8, 32] {
        let target = summing(arity);
        let reorder: Vec<usize> = (0..arity).rev().collect();
        let permuted = permute_arguments(&target, &longs(arity), &reorder).unwrap();
        let duplicated = permute_arguments(&target, &longs(1), &vec![0; arity]).unwrap();
        let arguments: Vec<Value> = (0..arity as i64).map(Value::Long).collect();

        group.bench_with_input(BenchmarkId::new("reversed", arity), &arguments, |bencher, arguments| {
            bencher.iter(|| black_box(permuted.invoke_exact(black_box(arguments))));
        });
        group.bench_function(BenchmarkId::new("duplicated", arity), |bencher| {
            bencher.iter(|| black_box(duplicated.invoke_exact(&[black_box(Value::Long(1))])));
        });
    }

    group.finish();
}

// =============================================================================
// 2. Insertion
// =============================================================================

fn benchmark_insert_chain(criterion: &mut Criterion) {
    let mut group = criterion.benchmark_group("insert_chain");

    for depth in [1, 4, 8] {
        let mut bound = summing(depth);
        for _ in 0..depth {
            bound = insert_arguments(&bound, 0, [Value::Long(1)]).unwrap();
        }
        group.bench_function(BenchmarkId::from_parameter(depth), |bencher| {
            bencher.iter(|| black_box(bound.invoke_exact(&[])));
        });
    }

    group.finish();
}

// =============================================================================
// 3. Loops
// =============================================================================

fn benchmark_counted_loop(criterion: &mut Criterion) {
    let mut group = criterion.benchmark_group("counted_loop");
    let add_counter = MethodHandle::new(
        Signature::new(Type::LONG, [Type::LONG, Type::INT]).unwrap(),
        |arguments| Ok(Value::Long(arguments[0].as_long()? + i64::from(arguments[1].as_int()?))),
    );
    let start = constant(&Type::LONG, Value::Long(0)).unwrap();
    let summed = counted_loop(&identity(&Type::INT).unwrap(), Some(&start), &add_counter).unwrap();

    for iterations in [10, 100, 1000] {
        group.bench_with_input(
            BenchmarkId::from_parameter(iterations),
            &iterations,
            |bencher, &iterations| {
                bencher.iter(|| black_box(summed.invoke_exact(&[Value::Int(black_box(iterations))])));
            },
        );
    }

    group.finish();
}

fn benchmark_clause_loop_construction(criterion: &mut Criterion) {
    let increment = MethodHandle::new(
        Signature::new(Type::INT, [Type::INT]).unwrap(),
        |arguments| Ok(Value::Int(arguments[0].as_int()? + 1)),
    );
    let below = MethodHandle::new(
        Signature::new(Type::BOOLEAN, [Type::INT, Type::INT]).unwrap(),
        |arguments| Ok(Value::Boolean(arguments[0].as_int()? < arguments[1].as_int()?)),
    );
    let clauses = [
        Clause::new().with_step(&increment).with_pred(&below),
        Clause::new().with_init(&constant(&Type::INT, Value::Int(0)).unwrap()),
    ];

    criterion.bench_function("clause_loop_construction", |bencher| {
        bencher.iter(|| black_box(clause_loop(black_box(&clauses))));
    });
}

criterion_group!(
    benches,
    // 1. Permutation
    benchmark_normalize_permutation,
    benchmark_permuted_invocation,
    // 2. Insertion
    benchmark_insert_chain,
    // 3. Loops
    benchmark_counted_loop,
    benchmark_clause_loop_construction,
);

criterion_main!(benches);
