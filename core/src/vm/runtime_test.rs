use std::sync::Arc;

use pretty_assertions::assert_eq;

use super::*;
use crate::activation::{EmptyActivation, MapActivation};
use crate::api::ExecutionOptions;
use crate::ast::ExprId;
use crate::functions::FunctionRegistry;
use crate::test_utils::init_test_logging;
use crate::values::{AttributePattern, ErrorValue, Type, Value};

fn constant(id: ExprId, value: impl Into<Value>) -> Step {
    Step::new(id, StepKind::Const(value.into()))
}

fn ident(id: ExprId, name: &str) -> Step {
    Step::new(id, StepKind::Ident { name: name.into() })
}

fn add(id: ExprId) -> Step {
    let registry = FunctionRegistry::with_builtins().unwrap();
    Step::new(
        id,
        StepKind::Call {
            function: "_+_".into(),
            arity: 2,
            overloads: registry.find_overloads("_+_", false, 2).into(),
        },
    )
}

/// `[1, 2, 3]` folded with `acc + x` starting from 0.
fn sum_plan() -> ExecutionPlan {
    let steps = vec![
        constant(1, Value::list([Value::Int(1), Value::Int(2), Value::Int(3)])),
        Step::internal(
            9,
            StepKind::ComprehensionInit {
                iter_var: "x".into(),
                accu_var: "acc".into(),
                skip_to: 14,
            },
        ),
        constant(2, 0i64),
        Step::internal(9, StepKind::SetAccu),
        Step::internal(9, StepKind::ComprehensionNext { done: 12 }),
        constant(3, true),
        Step::internal(9, StepKind::ComprehensionCond { done: 12 }),
        ident(4, "acc"),
        ident(5, "x"),
        add(6),
        Step::internal(9, StepKind::SetAccu),
        Step::internal(9, StepKind::Jump { target: 4 }),
        ident(7, "acc"),
        Step::new(9, StepKind::ComprehensionFinish),
    ];
    ExecutionPlan::from_steps(steps).unwrap()
}

fn run(plan: &ExecutionPlan) -> Result<Value, EvalError> {
    evaluate(plan, &EmptyActivation, &ExecutionOptions::default())
}

#[test]
fn test_single_constant() {
    let plan = ExecutionPlan::from_steps(vec![constant(1, 42i64)]).unwrap();
    assert_eq!(run(&plan).unwrap(), Value::Int(42));
}

#[test]
fn test_hand_built_fold() {
    init_test_logging();
    assert_eq!(run(&sum_plan()).unwrap(), Value::Int(6));
}

#[test]
fn test_empty_plan_is_imbalanced() {
    let plan = ExecutionPlan::from_steps(Vec::new()).unwrap();
    match run(&plan) {
        Err(EvalError::StackImbalance { expected, actual }) => {
            assert_eq!((expected, actual), (1, 0));
        }
        other => panic!("expected StackImbalance, got {other:?}"),
    }
}

#[test]
fn test_extra_value_is_imbalanced() {
    let plan = ExecutionPlan::from_steps(vec![constant(1, 1i64), constant(2, 2i64)]).unwrap();
    assert!(matches!(
        run(&plan),
        Err(EvalError::StackImbalance {
            expected: 1,
            actual: 2
        })
    ));
}

#[test]
fn test_missing_operand_is_underflow() {
    let plan =
        ExecutionPlan::from_steps(vec![constant(1, true), Step::new(2, StepKind::And)]).unwrap();
    assert!(matches!(
        run(&plan),
        Err(EvalError::StackUnderflow { pc: 1 })
    ));
}

#[test]
fn test_overflow_of_declared_limit() {
    let plan = ExecutionPlan::new_unchecked(vec![constant(1, 1i64), constant(2, 2i64)], 1);
    assert!(matches!(
        run(&plan),
        Err(EvalError::StackOverflow { pc: 1, limit: 1 })
    ));
}

#[test]
fn test_accumulator_outside_comprehension() {
    let plan = ExecutionPlan::from_steps(vec![
        constant(1, 1i64),
        Step::internal(1, StepKind::SetAccu),
        constant(2, 2i64),
    ])
    .unwrap();
    assert!(matches!(
        run(&plan),
        Err(EvalError::InvalidIterationState(_))
    ));
}

#[test]
fn test_finish_without_frame_is_underflow() {
    let plan = ExecutionPlan::from_steps(vec![
        constant(1, 1i64),
        Step::new(2, StepKind::ComprehensionFinish),
    ])
    .unwrap();
    assert!(matches!(
        run(&plan),
        Err(EvalError::StackUnderflow { pc: 1 })
    ));
}

#[test]
fn test_unchecked_dangling_jump_fails_at_run_time() {
    let plan = ExecutionPlan::new_unchecked(
        vec![constant(1, 1i64), Step::internal(1, StepKind::Jump { target: 50 })],
        2,
    );
    assert!(matches!(
        run(&plan),
        Err(EvalError::InvalidJumpTarget { pc: 1, target: 50 })
    ));
}

#[test]
fn test_non_bool_branch_operand() {
    let plan = ExecutionPlan::from_steps(vec![
        constant(1, 1i64),
        Step::internal(1, StepKind::PopJumpIfFalse { target: 3 }),
        constant(2, 2i64),
    ])
    .unwrap();
    assert!(matches!(
        run(&plan),
        Err(EvalError::UnexpectedOperand { pc: 1, .. })
    ));
}

#[test]
fn test_iteration_budget() {
    let options = ExecutionOptions {
        max_iterations: Some(2),
        ..Default::default()
    };
    let result = evaluate(&sum_plan(), &EmptyActivation, &options);
    assert!(matches!(
        result,
        Err(EvalError::IterationBudgetExceeded { limit: 2 })
    ));

    let options = ExecutionOptions {
        max_iterations: Some(3),
        ..Default::default()
    };
    assert_eq!(
        evaluate(&sum_plan(), &EmptyActivation, &options).unwrap(),
        Value::Int(6)
    );
}

#[test]
fn test_error_range_skips_the_loop() {
    let mut steps = sum_plan().steps().to_vec();
    steps[0] = constant(1, Value::Error(ErrorValue::division_by_zero()));
    let plan = ExecutionPlan::from_steps(steps).unwrap();
    assert_eq!(
        run(&plan).unwrap(),
        Value::Error(ErrorValue::division_by_zero())
    );
}

#[test]
fn test_non_iterable_range() {
    let mut steps = sum_plan().steps().to_vec();
    steps[0] = constant(1, 5i64);
    let plan = ExecutionPlan::from_steps(steps).unwrap();
    let result = run(&plan).unwrap();
    assert_eq!(
        result.as_error().unwrap().message(),
        "expression of type 'int' cannot be the range of a comprehension"
    );
}

#[test]
fn test_trace_reports_node_results() {
    let mut seen = Vec::new();
    let mut listener = |id: ExprId, value: &Value| -> Result<(), ListenerError> {
        seen.push((id, value.clone()));
        Ok(())
    };
    let plan = ExecutionPlan::from_steps(vec![constant(1, 2i64), constant(2, 3i64), add(3)])
        .unwrap();
    let result =
        evaluate_with_trace(&plan, &EmptyActivation, &ExecutionOptions::default(), &mut listener)
            .unwrap();
    assert_eq!(result, Value::Int(5));
    assert_eq!(
        seen,
        vec![(1, Value::Int(2)), (2, Value::Int(3)), (3, Value::Int(5))]
    );
}

#[test]
fn test_trace_skips_control_steps() {
    let mut ids = Vec::new();
    let mut listener = |id: ExprId, _: &Value| -> Result<(), ListenerError> {
        ids.push(id);
        Ok(())
    };
    evaluate_with_trace(
        &sum_plan(),
        &EmptyActivation,
        &ExecutionOptions::default(),
        &mut listener,
    )
    .unwrap();
    // Init, SetAccu, Next, Cond and Jump never report.
    assert_eq!(ids.first(), Some(&1));
    assert_eq!(ids.last(), Some(&9));
    assert_eq!(ids.iter().filter(|&&id| id == 9).count(), 1);
    assert_eq!(ids.iter().filter(|&&id| id == 6).count(), 3);
}

#[test]
fn test_listener_error_stops_evaluation() {
    init_test_logging();
    let mut calls = 0;
    let mut listener = |id: ExprId, _: &Value| -> Result<(), ListenerError> {
        calls += 1;
        if id == 6 { Err("stop".into()) } else { Ok(()) }
    };
    let result = evaluate_with_trace(
        &sum_plan(),
        &EmptyActivation,
        &ExecutionOptions::default(),
        &mut listener,
    );
    match result {
        Err(EvalError::Listener { id, source }) => {
            assert_eq!(id, 6);
            assert_eq!(source.to_string(), "stop");
        }
        other => panic!("expected a listener error, got {other:?}"),
    }
    // range, init, condition, two identifiers and the failing call.
    assert_eq!(calls, 6);
}

#[test]
fn test_state_reuse() {
    let plan = sum_plan();
    let mut state = EvaluationState::new(&plan);
    for _ in 0..3 {
        let result = evaluate_with_state(
            &plan,
            &EmptyActivation,
            &ExecutionOptions::default(),
            &mut state,
            None,
        )
        .unwrap();
        assert_eq!(result, Value::Int(6));
        assert_eq!(state.stack_depth(), 0);
        assert_eq!(state.iteration_depth(), 0);
    }

    // A failed evaluation leaves garbage behind; the next one resets it.
    let broken = ExecutionPlan::from_steps(vec![constant(1, 1i64), constant(2, 2i64)]).unwrap();
    assert!(
        evaluate_with_state(&broken, &EmptyActivation, &ExecutionOptions::default(), &mut state, None)
            .is_err()
    );
    let result =
        evaluate_with_state(&plan, &EmptyActivation, &ExecutionOptions::default(), &mut state, None)
            .unwrap();
    assert_eq!(result, Value::Int(6));
}

#[test]
fn test_undeclared_variable_is_an_error_value() {
    let plan = ExecutionPlan::from_steps(vec![ident(1, "missing")]).unwrap();
    let result = run(&plan).unwrap();
    assert_eq!(
        result.as_error().map(ErrorValue::code),
        Some(crate::values::ErrorCode::UndeclaredReference)
    );
}

#[test]
fn test_unknown_patterns() {
    let mut activation = MapActivation::new();
    activation.insert(
        "request",
        Value::map([(Value::string("path"), Value::string("/"))]).unwrap(),
    );
    activation.add_unknown(AttributePattern::new("request").field("auth"));
    activation.add_unknown(AttributePattern::new("session"));

    let select = |field: &str| {
        ExecutionPlan::from_steps(vec![
            ident(1, "request"),
            Step::new(
                2,
                StepKind::Select {
                    field: field.into(),
                    test_only: false,
                },
            ),
        ])
        .unwrap()
    };
    let options = ExecutionOptions {
        unknown_processing: true,
        ..Default::default()
    };

    let path = evaluate(&select("path"), &activation, &options).unwrap();
    assert_eq!(path, Value::string("/"));

    let auth = evaluate(&select("auth"), &activation, &options).unwrap();
    assert_eq!(auth.to_string(), "unknown{request.auth}");

    // Unbound variable named by a pattern.
    let session = ExecutionPlan::from_steps(vec![ident(1, "session")]).unwrap();
    assert!(evaluate(&session, &activation, &options).unwrap().is_unknown());

    // Without unknown processing the pattern is ignored.
    let auth = evaluate(&select("auth"), &activation, &ExecutionOptions::default()).unwrap();
    assert!(auth.is_error());
}

#[test]
fn test_typed_list_literal_rejects_mismatch() {
    let plan = ExecutionPlan::from_steps(vec![
        constant(1, 1i64),
        constant(2, "two"),
        Step::new(
            3,
            StepKind::CreateList {
                count: 2,
                element_type: Type::Int,
            },
        ),
    ])
    .unwrap();
    assert!(run(&plan).unwrap().is_error());
}

#[test]
fn test_plans_are_shareable() {
    let plan = Arc::new(sum_plan());
    let handles: Vec<_> = (0..4)
        .map(|_| {
            let plan = plan.clone();
            std::thread::spawn(move || run(&plan).unwrap())
        })
        .collect();
    for handle in handles {
        assert_eq!(handle.join().unwrap(), Value::Int(6));
    }
}
