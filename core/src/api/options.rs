//! Configuration options for the engine.

/// Configuration options for compilation.
///
/// # Example
///
/// ```
/// use predica_core::api::CompilationOptions;
///
/// let options = CompilationOptions {
///     short_circuiting: false,
///     ..Default::default()
/// };
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompilationOptions {
    /// Skip the right operand of `&&`/`||` and the unselected branch of a
    /// conditional once the result is decided.
    ///
    /// When disabled every operand is evaluated; results are unchanged
    /// except that trace listeners observe every branch.
    ///
    /// Default: true
    pub short_circuiting: bool,

    /// Accept comprehension nodes. When disabled they are a compile error.
    ///
    /// Default: true
    pub enable_comprehensions: bool,
}

impl Default for CompilationOptions {
    fn default() -> Self {
        Self {
            short_circuiting: true,
            enable_comprehensions: true,
        }
    }
}

/// Configuration options for expression execution.
///
/// # Example
///
/// ```
/// use predica_core::api::ExecutionOptions;
///
/// let options = ExecutionOptions {
///     max_iterations: Some(10_000),
///     unknown_processing: true,
/// };
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionOptions {
    /// Maximum number of comprehension iterations per evaluation (if Some).
    ///
    /// Set to `None` for unlimited iterations (be careful with untrusted
    /// input!).
    ///
    /// Default: None
    pub max_iterations: Option<usize>,

    /// Turn variables and field paths matching the activation's unknown
    /// patterns into unknown values.
    ///
    /// Default: false
    pub unknown_processing: bool,
}

/// Configuration options for the engine.
///
/// These options set the defaults for compilation and execution,
/// which can be overridden on a per-call basis.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EngineOptions {
    /// Default options for compilation.
    ///
    /// These can be overridden with `Engine::compile_with_options()`.
    pub default_compilation_options: CompilationOptions,

    /// Default options for execution.
    ///
    /// These can be overridden with
    /// `CompiledExpression::evaluate_with_options()`.
    pub default_execution_options: ExecutionOptions,
}
