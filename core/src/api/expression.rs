//! Compiled Predica expressions.

use std::sync::Arc;

use super::{Error, ExecutionOptions};
use crate::activation::Activation;
use crate::values::Value;
use crate::vm::{self, EvaluationListener, EvaluationState, ExecutionPlan};

/// A compiled expression ready for execution.
///
/// Cheap to clone and safe to evaluate from several threads at once: the
/// plan is shared, and every evaluation gets its own
/// [`EvaluationState`] unless the caller passes one in.
///
/// # Results
///
/// `Ok` carries the expression's value, which may itself be
/// `Value::Error` or `Value::Unknown`; the host decides what those mean.
/// `Err` is reserved for engine failures, an exhausted iteration budget and
/// listener aborts.
#[derive(Clone)]
pub struct CompiledExpression {
    plan: Arc<ExecutionPlan>,
    options: ExecutionOptions,
}

impl CompiledExpression {
    pub(crate) fn new(plan: ExecutionPlan, options: ExecutionOptions) -> Self {
        Self {
            plan: Arc::new(plan),
            options,
        }
    }

    pub fn plan(&self) -> &ExecutionPlan {
        &self.plan
    }

    /// The execution options used by [`evaluate`](Self::evaluate).
    pub fn options(&self) -> &ExecutionOptions {
        &self.options
    }

    /// A fresh state sized for this expression, for use with
    /// [`evaluate_with_state`](Self::evaluate_with_state).
    pub fn new_state(&self) -> EvaluationState {
        EvaluationState::new(&self.plan)
    }

    pub fn evaluate(&self, activation: &dyn Activation) -> Result<Value, Error> {
        self.evaluate_with_options(activation, &self.options)
    }

    pub fn evaluate_with_options(
        &self,
        activation: &dyn Activation,
        options: &ExecutionOptions,
    ) -> Result<Value, Error> {
        Ok(vm::evaluate(&self.plan, activation, options)?)
    }

    /// Evaluate, reporting the result of every expression node to `listener`.
    ///
    /// A listener error stops evaluation and is returned as
    /// [`EvalError::Listener`](crate::vm::EvalError::Listener).
    pub fn evaluate_with_trace(
        &self,
        activation: &dyn Activation,
        listener: &mut dyn EvaluationListener,
    ) -> Result<Value, Error> {
        Ok(vm::evaluate_with_trace(
            &self.plan,
            activation,
            &self.options,
            listener,
        )?)
    }

    /// Evaluate reusing the buffers in `state`.
    ///
    /// The state is reset before use, so it may come from an earlier
    /// evaluation, including one that failed.
    pub fn evaluate_with_state(
        &self,
        activation: &dyn Activation,
        state: &mut EvaluationState,
    ) -> Result<Value, Error> {
        Ok(vm::evaluate_with_state(
            &self.plan,
            activation,
            &self.options,
            state,
            None,
        )?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activation::MapActivation;
    use crate::api::{Engine, EngineOptions};
    use crate::ast::{ExprFactory, operators};
    use crate::vm::{EvalError, ListenerError};

    fn engine(options: EngineOptions) -> Engine {
        Engine::with_standard_library(options).unwrap()
    }

    #[test]
    fn test_state_reuse_across_activations() {
        let f = ExprFactory::new();
        let expr = engine(EngineOptions::default())
            .compile(f.binary(operators::MULTIPLY, f.ident("x"), f.int(2)))
            .unwrap();

        let mut state = expr.new_state();
        for n in 0..5i64 {
            let activation: MapActivation = [("x", n)].into_iter().collect();
            assert_eq!(
                expr.evaluate_with_state(&activation, &mut state).unwrap(),
                Value::Int(n * 2)
            );
        }
    }

    #[test]
    fn test_iteration_budget_from_engine_options() {
        let options = EngineOptions {
            default_execution_options: ExecutionOptions {
                max_iterations: Some(2),
                ..Default::default()
            },
            ..Default::default()
        };
        let f = ExprFactory::new();
        let range = f.list(vec![f.int(1), f.int(2), f.int(3)]);
        let expr = engine(options)
            .compile(f.all(range, "x", f.bool(true)))
            .unwrap();

        let err = expr.evaluate(&MapActivation::new()).unwrap_err();
        assert!(matches!(
            err,
            Error::Evaluation(EvalError::IterationBudgetExceeded { limit: 2 })
        ));
        assert!(!err.is_internal());

        let unlimited = ExecutionOptions::default();
        assert_eq!(
            expr.evaluate_with_options(&MapActivation::new(), &unlimited)
                .unwrap(),
            Value::Bool(true)
        );
    }

    #[test]
    fn test_listener_abort_is_an_error() {
        let f = ExprFactory::new();
        let expr = engine(EngineOptions::default())
            .compile(f.binary(operators::ADD, f.int(1), f.int(2)))
            .unwrap();

        let mut listener = |_: i64, _: &Value| -> Result<(), ListenerError> { Err("stop".into()) };
        let err = expr
            .evaluate_with_trace(&MapActivation::new(), &mut listener)
            .unwrap_err();
        assert!(matches!(err, Error::Evaluation(EvalError::Listener { .. })));
        assert!(!err.is_internal());
    }

    #[test]
    fn test_clones_share_the_plan() {
        let f = ExprFactory::new();
        let expr = engine(EngineOptions::default()).compile(f.int(1)).unwrap();
        let clone = expr.clone();
        assert!(std::ptr::eq(expr.plan(), clone.plan()));
    }
}
