//! Tests for the plan compiler.

use once_cell::sync::Lazy;
use pretty_assertions::assert_eq;

use super::{CompileError, compile};
use crate::activation::{Activation, EmptyActivation, MapActivation};
use crate::api::{CompilationOptions, ExecutionOptions};
use crate::ast::{Ast, Constant, Expr, ExprFactory, ExprId, Reference, operators};
use crate::functions::{ArgKind, FunctionRegistry};
use crate::values::{ErrorCode, Type, TypeProvider, Value, ValueKind};
use crate::vm::{ExecutionPlan, ListenerError, StepKind, evaluate, evaluate_with_trace};

static REGISTRY: Lazy<FunctionRegistry> =
    Lazy::new(|| FunctionRegistry::with_builtins().unwrap());
static PROVIDER: Lazy<TypeProvider> = Lazy::new(TypeProvider::with_well_known_types);

fn plan_with(ast: &Ast, options: &CompilationOptions) -> Result<ExecutionPlan, CompileError> {
    compile(ast, &REGISTRY, &PROVIDER, options)
}

fn plan(expr: Expr) -> ExecutionPlan {
    plan_with(&Ast::new(expr), &CompilationOptions::default()).unwrap()
}

fn run(plan: &ExecutionPlan, activation: &dyn Activation) -> Value {
    evaluate(plan, activation, &ExecutionOptions::default()).unwrap()
}

fn eval(expr: Expr) -> Value {
    run(&plan(expr), &EmptyActivation)
}

/// Evaluates and returns the ids the trace listener saw.
fn traced(plan: &ExecutionPlan) -> (Value, Vec<ExprId>) {
    let mut ids = Vec::new();
    let mut listener = |id: ExprId, _: &Value| -> Result<(), ListenerError> {
        ids.push(id);
        Ok(())
    };
    let value = evaluate_with_trace(
        plan,
        &EmptyActivation,
        &ExecutionOptions::default(),
        &mut listener,
    )
    .unwrap();
    (value, ids)
}

fn list(f: &ExprFactory, values: &[i64]) -> Expr {
    f.list(values.iter().map(|&v| f.int(v)).collect())
}

#[test]
fn test_compile_constant() {
    let f = ExprFactory::new();
    let plan = plan(f.int(42));
    assert_eq!(plan.len(), 1);
    assert_eq!(plan.max_stack_size(), 1);
    assert_eq!(run(&plan, &EmptyActivation), Value::Int(42));
}

#[test]
fn test_compile_addition() {
    let f = ExprFactory::new();
    let plan = plan(f.binary(operators::ADD, f.int(2), f.int(3)));
    assert_eq!(plan.len(), 3);
    assert_eq!(plan.max_stack_size(), 2, "two operands");
    assert!(matches!(plan.steps()[2].kind, StepKind::Call { arity: 2, .. }));
    assert_eq!(run(&plan, &EmptyActivation), Value::Int(5));
}

#[test]
fn test_false_and_error_short_circuits() {
    let f = ExprFactory::new();
    let division = f.binary(operators::DIVIDE, f.int(1), f.int(0));
    let division_id = division.id;
    let expr = f.and(f.bool(false), division);

    let (value, ids) = traced(&plan(expr.clone()));
    assert_eq!(value, Value::Bool(false));
    assert!(!ids.contains(&division_id), "right operand must not run");

    // Without short-circuiting the division runs but is absorbed.
    let options = CompilationOptions {
        short_circuiting: false,
        ..Default::default()
    };
    let eager = plan_with(&Ast::new(expr), &options).unwrap();
    let (value, ids) = traced(&eager);
    assert_eq!(value, Value::Bool(false));
    assert!(ids.contains(&division_id));
}

#[test]
fn test_logical_operators() {
    let f = ExprFactory::new();
    let error = || f.binary(operators::DIVIDE, f.int(1), f.int(0));

    assert_eq!(eval(f.or(f.bool(true), error())), Value::Bool(true));
    assert_eq!(eval(f.or(error(), f.bool(true))), Value::Bool(true));
    assert_eq!(eval(f.and(error(), f.bool(false))), Value::Bool(false));
    assert_eq!(eval(f.and(f.bool(true), f.bool(true))), Value::Bool(true));
    assert!(eval(f.and(f.bool(true), error())).is_error());
    assert!(eval(f.or(f.bool(false), f.int(1))).is_error());
}

#[test]
fn test_conditional() {
    let f = ExprFactory::new();
    let error = || f.binary(operators::DIVIDE, f.int(1), f.int(0));

    assert_eq!(
        eval(f.conditional(f.bool(true), f.int(1), error())),
        Value::Int(1)
    );
    assert_eq!(
        eval(f.conditional(f.bool(false), error(), f.int(2))),
        Value::Int(2)
    );

    let non_bool = eval(f.conditional(f.int(1), f.int(2), f.int(3)));
    assert_eq!(
        non_bool.as_error().unwrap().message(),
        "no matching overload for '_?_:_'"
    );

    let failed = eval(f.conditional(error(), f.int(2), f.int(3)));
    assert_eq!(failed.as_error().unwrap().code(), ErrorCode::DivisionByZero);
}

#[test]
fn test_eager_conditional_selects_the_same_branch() {
    let f = ExprFactory::new();
    let options = CompilationOptions {
        short_circuiting: false,
        ..Default::default()
    };
    for (condition, expected) in [(true, 1), (false, 2)] {
        let expr = f.conditional(f.bool(condition), f.int(1), f.int(2));
        let plan = plan_with(&Ast::new(expr), &options).unwrap();
        assert_eq!(run(&plan, &EmptyActivation), Value::Int(expected));
    }
}

#[test]
fn test_conditional_stack_depth() {
    let f = ExprFactory::new();
    let then = f.binary(operators::ADD, f.int(1), f.int(2));
    let otherwise = f.int(3);
    let plan = plan(f.conditional(f.bool(true), then, otherwise));
    // The condition is popped before either branch runs.
    assert_eq!(plan.max_stack_size(), 2);
}

#[test]
fn test_exists_and_all() {
    let f = ExprFactory::new();
    let exists = f.exists(
        list(&f, &[1, 2, 3]),
        "x",
        f.binary(operators::GREATER, f.ident("x"), f.int(2)),
    );
    assert_eq!(eval(exists), Value::Bool(true));

    let all = f.all(
        list(&f, &[1, 2, 3]),
        "x",
        f.binary(operators::GREATER, f.ident("x"), f.int(0)),
    );
    assert_eq!(eval(all), Value::Bool(true));

    let empty = f.exists(
        list(&f, &[]),
        "x",
        f.binary(operators::GREATER, f.ident("x"), f.int(0)),
    );
    assert_eq!(eval(empty), Value::Bool(false));
}

#[test]
fn test_exists_stops_early() {
    let f = ExprFactory::new();
    let predicate = f.binary(operators::EQUALS, f.ident("x"), f.int(1));
    let predicate_id = predicate.id;
    let (value, ids) = traced(&plan(f.exists(list(&f, &[1, 2, 3]), "x", predicate)));
    assert_eq!(value, Value::Bool(true));
    assert_eq!(ids.iter().filter(|&&id| id == predicate_id).count(), 1);
}

#[test]
fn test_all_absorbs_errors_after_false() {
    let f = ExprFactory::new();
    // [0, 1].all(x, 1 / x > 0): the division by zero is decided by x == 1.
    let predicate = f.binary(
        operators::GREATER,
        f.binary(operators::DIVIDE, f.int(1), f.ident("x")),
        f.int(1),
    );
    assert_eq!(eval(f.all(list(&f, &[0, 1]), "x", predicate)), Value::Bool(false));
}

#[test]
fn test_nested_shadowing() {
    let f = ExprFactory::new();
    let inner_x = f.ident("x");
    let inner_x_id = inner_x.id;
    let inner = f.all(
        list(&f, &[3, 4]),
        "x",
        f.binary(operators::GREATER, inner_x, f.int(2)),
    );
    let outer = f.all(list(&f, &[1, 2]), "x", inner);
    let plan = plan(outer);

    let mut seen = Vec::new();
    let mut listener = |id: ExprId, value: &Value| -> Result<(), ListenerError> {
        if id == inner_x_id {
            seen.push(value.clone());
        }
        Ok(())
    };
    let value = evaluate_with_trace(
        &plan,
        &EmptyActivation,
        &ExecutionOptions::default(),
        &mut listener,
    )
    .unwrap();
    assert_eq!(value, Value::Bool(true));
    assert_eq!(
        seen,
        [3, 4, 3, 4].map(Value::Int).to_vec(),
        "inner x never sees the outer range"
    );
}

#[test]
fn test_outer_variable_visible_in_inner_comprehension() {
    let f = ExprFactory::new();
    // [1, 2].all(x, [3, 4].all(y, x < y))
    let inner = f.all(
        list(&f, &[3, 4]),
        "y",
        f.binary(operators::LESS, f.ident("x"), f.ident("y")),
    );
    assert_eq!(eval(f.all(list(&f, &[1, 2]), "x", inner)), Value::Bool(true));
}

#[test]
fn test_comprehension_shadows_activation() {
    let f = ExprFactory::new();
    let expr = f.exists(
        list(&f, &[1]),
        "x",
        f.binary(operators::EQUALS, f.ident("x"), f.int(1)),
    );
    let activation: MapActivation = [("x", 100i64)].into_iter().collect();
    assert_eq!(run(&plan(expr), &activation), Value::Bool(true));
}

#[test]
fn test_other_macros() {
    let f = ExprFactory::new();
    let doubled = f.map_macro(
        list(&f, &[1, 2]),
        "x",
        f.binary(operators::MULTIPLY, f.ident("x"), f.int(2)),
    );
    assert_eq!(eval(doubled), Value::list([Value::Int(2), Value::Int(4)]));

    let odd = f.filter(
        list(&f, &[1, 2, 3]),
        "x",
        f.binary(
            operators::EQUALS,
            f.binary(operators::MODULO, f.ident("x"), f.int(2)),
            f.int(1),
        ),
    );
    assert_eq!(eval(odd), Value::list([Value::Int(1), Value::Int(3)]));

    let once = f.exists_one(
        list(&f, &[1, 2, 3]),
        "x",
        f.binary(operators::GREATER, f.ident("x"), f.int(2)),
    );
    assert_eq!(eval(once), Value::Bool(true));

    let squares_of_big = f.map_filter(
        list(&f, &[1, 5]),
        "x",
        f.binary(operators::GREATER, f.ident("x"), f.int(2)),
        f.binary(operators::MULTIPLY, f.ident("x"), f.ident("x")),
    );
    assert_eq!(eval(squares_of_big), Value::list([Value::Int(25)]));
}

#[test]
fn test_map_range_iterates_keys() {
    let f = ExprFactory::new();
    let range = f.map(vec![(f.string("a"), f.int(1)), (f.string("b"), f.int(2))]);
    let expr = f.exists(
        range,
        "k",
        f.binary(operators::EQUALS, f.ident("k"), f.string("b")),
    );
    assert_eq!(eval(expr), Value::Bool(true));
}

#[test]
fn test_comprehensions_can_be_disabled() {
    let f = ExprFactory::new();
    let expr = f.all(list(&f, &[1]), "x", f.bool(true));
    let id = expr.id;
    let options = CompilationOptions {
        enable_comprehensions: false,
        ..Default::default()
    };
    assert_eq!(
        plan_with(&Ast::new(expr), &options).unwrap_err(),
        CompileError::ComprehensionsDisabled { id }
    );
}

#[test]
fn test_missing_loop_step() {
    let f = ExprFactory::new();
    let missing = f.unspecified();
    let missing_id = missing.id;
    let expr = f.comprehension(
        "x",
        list(&f, &[1]),
        "acc",
        f.bool(true),
        f.bool(true),
        missing,
        f.ident("acc"),
    );
    assert_eq!(
        plan_with(&Ast::new(expr), &CompilationOptions::default()).unwrap_err(),
        CompileError::MissingExpression { id: missing_id }
    );
}

#[test]
fn test_undeclared_function() {
    let f = ExprFactory::new();
    let expr = f.call("frobnicate", vec![f.int(1)]);
    assert_eq!(
        plan_with(&Ast::new(expr), &CompilationOptions::default()).unwrap_err(),
        CompileError::UndeclaredFunction {
            name: "frobnicate".into(),
            arity: 1
        }
    );
}

#[test]
fn test_runtime_kind_mismatch() {
    let f = ExprFactory::new();
    let value = eval(f.binary(operators::ADD, f.int(1), f.uint(2)));
    assert_eq!(
        value.as_error().unwrap().message(),
        "no matching overload for '_+_(int, uint)'"
    );
}

#[test]
fn test_receiver_call() {
    let f = ExprFactory::new();
    let expr = f.member_call("startsWith", f.string("predica"), vec![f.string("pre")]);
    assert_eq!(eval(expr), Value::Bool(true));
}

#[test]
fn test_select_and_presence() {
    let f = ExprFactory::new();
    let object = || f.map(vec![(f.string("a"), f.int(1))]);

    assert_eq!(eval(f.select(object(), "a")), Value::Int(1));
    assert_eq!(
        eval(f.select(object(), "b")).as_error().unwrap().code(),
        ErrorCode::NoSuchKey
    );
    assert_eq!(eval(f.has(f.select(object(), "a")).unwrap()), Value::Bool(true));
    assert_eq!(eval(f.has(f.select(object(), "b")).unwrap()), Value::Bool(false));
    assert!(eval(f.select(f.int(1), "a")).is_error());
}

#[test]
fn test_well_known_wrapper() {
    let f = ExprFactory::new();
    let expr = f.new_struct("google.protobuf.Int64Value", vec![("value", f.int(5))]);
    assert_eq!(eval(expr), Value::Int(5));

    let unknown = f.new_struct("acme.Widget", Vec::new());
    assert_eq!(
        plan_with(&Ast::new(unknown), &CompilationOptions::default()).unwrap_err(),
        CompileError::UnknownStructType {
            name: "acme.Widget".into()
        }
    );
}

#[test]
fn test_duplicate_map_key() {
    let f = ExprFactory::new();
    let expr = f.map(vec![(f.int(1), f.int(1)), (f.int(1), f.int(2))]);
    assert_eq!(eval(expr).as_error().unwrap().code(), ErrorCode::DuplicateKey);
}

#[test]
fn test_invalid_map_key() {
    let f = ExprFactory::new();
    let expr = f.map(vec![(f.double(1.5), f.int(1))]);
    assert_eq!(
        eval(expr).as_error().unwrap().code(),
        ErrorCode::InvalidMapKeyType
    );
}

#[test]
fn test_typed_and_dynamic_maps_are_equal() {
    let f = ExprFactory::new();
    let entries = || vec![(f.string("a"), f.int(1)), (f.string("b"), f.int(2))];
    let typed = f.map(entries());
    let typed_id = typed.id;
    let dynamic = f.map(entries());
    let expr = f.binary(operators::EQUALS, typed, dynamic);

    let mut ast = Ast::new(expr);
    ast.type_map
        .insert(typed_id, Type::map(Type::String, Type::Int));
    let plan = plan_with(&ast, &CompilationOptions::default()).unwrap();
    let typed_step = plan
        .steps()
        .iter()
        .find(|step| step.id == typed_id)
        .unwrap();
    assert!(matches!(
        &typed_step.kind,
        StepKind::CreateMap {
            key_type: Type::String,
            ..
        }
    ));
    assert_eq!(run(&plan, &EmptyActivation), Value::Bool(true));
}

#[test]
fn test_typed_list_checks_elements() {
    let f = ExprFactory::new();
    let expr = f.list(vec![f.int(1), f.string("two")]);
    let mut ast = Ast::new(expr.clone());
    ast.type_map.insert(expr.id, Type::list(Type::Int));
    let plan = plan_with(&ast, &CompilationOptions::default()).unwrap();
    assert!(run(&plan, &EmptyActivation).is_error());
}

#[test]
fn test_reference_constant_and_qualified_name() {
    let f = ExprFactory::new();
    let constant = f.ident("MAX");
    let qualified = f.select(f.ident("acme"), "limit");
    let (constant_id, qualified_id) = (constant.id, qualified.id);
    let expr = f.binary(operators::LESS, qualified, constant);

    let mut ast = Ast::new(expr);
    ast.reference_map.insert(
        constant_id,
        Reference {
            name: "MAX".into(),
            value: Some(Constant::Int(10)),
            ..Default::default()
        },
    );
    ast.reference_map.insert(
        qualified_id,
        Reference {
            name: "acme.limit".into(),
            ..Default::default()
        },
    );
    let plan = plan_with(&ast, &CompilationOptions::default()).unwrap();
    let activation: MapActivation = [("acme.limit", 3i64)].into_iter().collect();
    assert_eq!(run(&plan, &activation), Value::Bool(true));
}

#[test]
fn test_overload_ids_narrow_candidates() {
    let f = ExprFactory::new();
    let expr = f.binary(operators::ADD, f.uint(1), f.uint(2));
    let int_add = REGISTRY
        .find_overloads(operators::ADD, false, 2)
        .into_iter()
        .find(|o| o.descriptor().args() == [ArgKind::Is(ValueKind::Int), ArgKind::Is(ValueKind::Int)])
        .unwrap();

    let mut ast = Ast::new(expr.clone());
    ast.reference_map.insert(
        expr.id,
        Reference {
            overload_ids: vec![int_add.descriptor().overload_id().into()],
            ..Default::default()
        },
    );
    let plan = plan_with(&ast, &CompilationOptions::default()).unwrap();
    match &plan.steps()[2].kind {
        StepKind::Call { overloads, .. } => assert_eq!(overloads.len(), 1),
        other => panic!("expected a call, got {other:?}"),
    }
    assert!(run(&plan, &EmptyActivation).is_error());
}

#[test]
fn test_debug_listing() {
    let f = ExprFactory::new();
    let plan = plan(f.and(f.bool(true), f.bool(false)));
    let listing = format!("{plan:?}");
    assert!(listing.contains("JumpIfBool"), "{listing}");
    assert!(listing.contains("(to L0)"), "{listing}");
}
