use crate::ast::ExprId;
use crate::values::ValueKind;

pub type ListenerError = Box<dyn std::error::Error + Send + Sync>;

/// Engine invariant failures.
///
/// None of these can be caused by the data an expression is evaluated
/// against: they indicate a malformed plan or an evaluator bug, and abort
/// evaluation immediately. Expression-level failures are `Value::Error`
/// results instead.
#[derive(Debug, thiserror::Error)]
pub enum EvalError {
    #[error("operand stack underflow at step {pc}")]
    StackUnderflow { pc: usize },

    #[error("operand stack overflow at step {pc} (limit {limit})")]
    StackOverflow { pc: usize, limit: usize },

    #[error("operand stack holds {actual} values after evaluation, expected {expected}")]
    StackImbalance { expected: usize, actual: usize },

    #[error("invalid iteration state: {0}")]
    InvalidIterationState(&'static str),

    #[error("step {pc} jumps to {target}, past the end of the plan")]
    InvalidJumpTarget { pc: usize, target: usize },

    #[error("step {pc} expected a bool operand, found {kind}")]
    UnexpectedOperand { pc: usize, kind: ValueKind },

    #[error("comprehension iteration budget of {limit} exceeded")]
    IterationBudgetExceeded { limit: usize },

    #[error("evaluation aborted by listener at expression {id}")]
    Listener {
        id: ExprId,
        #[source]
        source: ListenerError,
    },
}

impl EvalError {
    /// False for the two ways a well-formed plan can stop early: a listener
    /// abort and an exhausted iteration budget.
    pub fn is_internal(&self) -> bool {
        !matches!(
            self,
            EvalError::Listener { .. } | EvalError::IterationBudgetExceeded { .. }
        )
    }
}
