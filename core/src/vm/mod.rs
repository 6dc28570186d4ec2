//! The step machine.
//!
//! A compiled expression is a flat list of [`Step`]s operating on an operand
//! stack. Control flow is limited to forward and backward jumps with absolute
//! targets, used for short-circuit logic, conditionals and comprehension
//! loops. Comprehensions additionally keep a stack of iteration frames that
//! shadow the activation during name resolution.

mod error;
mod frame;
mod plan;
mod runtime;
mod stack;
mod step;

#[cfg(test)]
mod runtime_test;

pub use error::{EvalError, ListenerError};
pub use frame::{EvaluationFrame, EvaluationState, Slot};
pub use plan::ExecutionPlan;
pub use runtime::{EvaluationListener, evaluate, evaluate_with_state, evaluate_with_trace};
pub use stack::{Stack, StackError};
pub use step::{FactoryRef, Step, StepKind};

pub(crate) use plan::find_invalid_jump;
