//! Plan compilation errors.

use ecow::EcoString;

use crate::ast::ExprId;

/// Errors that can occur while planning an expression.
///
/// These describe a structurally invalid tree or a tree that refers to
/// something the environment does not provide. Type errors in the data are
/// not compile errors; they surface as error values during evaluation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CompileError {
    /// A required sub-expression is absent (an unspecified node).
    #[error("expression {id} is missing a required sub-expression")]
    MissingExpression { id: ExprId },

    #[error("undeclared function '{name}' with {arity} argument(s)")]
    UndeclaredFunction { name: EcoString, arity: usize },

    #[error("unknown struct type '{name}'")]
    UnknownStructType { name: EcoString },

    #[error("comprehension at expression {id} is not allowed")]
    ComprehensionsDisabled { id: ExprId },

    /// Only reachable through a planner bug.
    #[error("step {pc} jumps to {target}, past the end of the plan")]
    InvalidJumpTarget { pc: usize, target: usize },
}
