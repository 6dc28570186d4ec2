//! Public error type for the Predica API.
//!
//! Expression-level failures (division by zero, missing keys, ...) are not
//! errors here: they come back as `Value::Error` from a successful
//! evaluation. This type covers everything that stops an operation outright.

use crate::compiler::CompileError;
use crate::functions::RegistryError;
use crate::values::ProviderError;
use crate::vm::EvalError;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid API usage.
    #[error("API error: {0}")]
    Api(String),

    /// The expression tree could not be turned into a plan.
    #[error("compilation failed: {0}")]
    Compilation(#[from] CompileError),

    /// An engine invariant failed, a limit was hit, or a trace listener
    /// aborted the evaluation.
    #[error("evaluation failed: {0}")]
    Evaluation(#[from] EvalError),

    #[error("function registration failed: {0}")]
    Registry(#[from] RegistryError),

    #[error("type registration failed: {0}")]
    Provider(#[from] ProviderError),
}

impl Error {
    /// True for failures that point at a bug in the compiler or evaluator
    /// rather than at the expression or its inputs.
    pub fn is_internal(&self) -> bool {
        match self {
            Error::Evaluation(err) => err.is_internal(),
            Error::Compilation(CompileError::InvalidJumpTarget { .. }) => true,
            _ => false,
        }
    }
}
