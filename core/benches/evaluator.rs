//! Benchmarks for the Predica evaluator.
//!
//! Run with: `cargo bench` in the core/ directory.
//!
//! Benchmark groups:
//! 1. arithmetic_chain: `1 + 1 + ... + 1`, fresh state vs reused state
//! 2. comprehension: `range.exists(x, x == last)` over growing lists
//! 3. short_circuit: `false && <deep chain>`, with and without short-circuiting

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use predica_core::activation::EmptyActivation;
use predica_core::api::{CompilationOptions, CompiledExpression, Engine, EngineOptions};
use predica_core::ast::{Expr, ExprFactory, operators};

fn engine() -> Engine {
    Engine::with_standard_library(EngineOptions::default()).expect("standard library")
}

/// An expression like `1 + 1 + ... + 1` with `n` additions.
fn arithmetic_chain(f: &ExprFactory, n: usize) -> Expr {
    (0..n).fold(f.int(1), |acc, _| f.binary(operators::ADD, acc, f.int(1)))
}

fn bench_arithmetic_chain(c: &mut Criterion) {
    let engine = engine();
    let mut group = c.benchmark_group("arithmetic_chain");

    for size in [100, 200, 400, 800] {
        group.throughput(Throughput::Elements(size as u64));
        let f = ExprFactory::new();
        let expr = engine
            .compile(arithmetic_chain(&f, size))
            .expect("compile failed");

        group.bench_with_input(BenchmarkId::new("fresh_state", size), &expr, |b, expr| {
            b.iter(|| black_box(expr.evaluate(&EmptyActivation)).expect("eval failed"))
        });

        group.bench_with_input(BenchmarkId::new("reused_state", size), &expr, |b, expr| {
            let mut state = expr.new_state();
            b.iter(|| {
                black_box(expr.evaluate_with_state(&EmptyActivation, &mut state))
                    .expect("eval failed")
            })
        });
    }

    group.finish();
}

fn exists_last(engine: &Engine, size: i64) -> CompiledExpression {
    let f = ExprFactory::new();
    let range = f.list((0..size).map(|i| f.int(i)).collect());
    let predicate = f.binary(operators::EQUALS, f.ident("x"), f.int(size - 1));
    engine
        .compile(f.exists(range, "x", predicate))
        .expect("compile failed")
}

fn bench_comprehension(c: &mut Criterion) {
    let engine = engine();
    let mut group = c.benchmark_group("comprehension");

    for size in [10, 100, 1000] {
        group.throughput(Throughput::Elements(size as u64));
        let expr = exists_last(&engine, size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &expr, |b, expr| {
            b.iter(|| black_box(expr.evaluate(&EmptyActivation)).expect("eval failed"))
        });
    }

    group.finish();
}

fn bench_short_circuit(c: &mut Criterion) {
    let engine = engine();
    let mut group = c.benchmark_group("short_circuit");

    let f = ExprFactory::new();
    let expr = f.and(f.bool(false), arithmetic_chain(&f, 400));
    for short_circuiting in [true, false] {
        let options = CompilationOptions {
            short_circuiting,
            ..Default::default()
        };
        let compiled = engine
            .compile_with_options(&expr.clone().into(), &options)
            .expect("compile failed");
        group.bench_with_input(
            BenchmarkId::from_parameter(short_circuiting),
            &compiled,
            |b, expr| b.iter(|| black_box(expr.evaluate(&EmptyActivation)).expect("eval failed")),
        );
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_arithmetic_chain,
    bench_comprehension,
    bench_short_circuit
);
criterion_main!(benches);
