//! The Predica compilation engine.

use std::sync::Arc;

use super::{CompilationOptions, CompiledExpression, EngineOptions, EnvironmentBuilder, Error};
use crate::ast::Ast;
use crate::compiler;
use crate::functions::FunctionRegistry;
use crate::values::TypeProvider;

/// The Predica compilation and execution engine.
///
/// The engine owns:
/// - the function registry (operators, conversions, host functions)
/// - the type provider (struct builders)
/// - the default options for compilation and execution
///
/// Both registries are populated once, at construction, and are read-only
/// afterwards. Compiled expressions share them and can outlive the engine.
///
/// # Example
///
/// ```
/// use predica_core::activation::EmptyActivation;
/// use predica_core::api::{Engine, EngineOptions};
/// use predica_core::ast::{ExprFactory, operators};
/// use predica_core::values::Value;
///
/// let engine = Engine::with_standard_library(EngineOptions::default()).unwrap();
///
/// let f = ExprFactory::new();
/// let expr = engine
///     .compile(f.binary(operators::ADD, f.int(40), f.int(2)))
///     .unwrap();
///
/// assert_eq!(expr.evaluate(&EmptyActivation).unwrap(), Value::Int(42));
/// ```
pub struct Engine {
    registry: Arc<FunctionRegistry>,
    provider: Arc<TypeProvider>,
    options: EngineOptions,
}

impl Engine {
    /// Create a new engine with a custom environment.
    ///
    /// The environment starts empty; call
    /// [`EnvironmentBuilder::add_standard_library`] in `init` to get the
    /// standard operators.
    pub fn new(
        options: EngineOptions,
        init: impl FnOnce(&mut EnvironmentBuilder) -> Result<(), Error>,
    ) -> Result<Self, Error> {
        let mut builder = EnvironmentBuilder::new();
        init(&mut builder)?;
        let (registry, provider) = builder.build();
        tracing::debug!(?options, "Created engine");
        Ok(Self {
            registry: Arc::new(registry),
            provider: Arc::new(provider),
            options,
        })
    }

    /// An engine with the standard library and nothing else.
    pub fn with_standard_library(options: EngineOptions) -> Result<Self, Error> {
        Self::new(options, |env| {
            env.add_standard_library()?;
            Ok(())
        })
    }

    pub fn registry(&self) -> &FunctionRegistry {
        &self.registry
    }

    pub fn provider(&self) -> &TypeProvider {
        &self.provider
    }

    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    /// Compile an expression with the engine's default compilation options.
    ///
    /// Accepts a bare [`Expr`](crate::ast::Expr) or a checked [`Ast`].
    pub fn compile(&self, ast: impl Into<Ast>) -> Result<CompiledExpression, Error> {
        self.compile_with_options(&ast.into(), &self.options.default_compilation_options)
    }

    pub fn compile_with_options(
        &self,
        ast: &Ast,
        options: &CompilationOptions,
    ) -> Result<CompiledExpression, Error> {
        let plan = compiler::compile(ast, &self.registry, &self.provider, options)?;
        Ok(CompiledExpression::new(
            plan,
            self.options.default_execution_options.clone(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activation::EmptyActivation;
    use crate::ast::{ExprFactory, operators};
    use crate::compiler::CompileError;
    use crate::functions::{ArgKind, FunctionDescriptor};
    use crate::values::{StructType, Type, Value, ValueKind};

    #[test]
    fn test_empty_environment_has_no_operators() {
        let engine = Engine::new(EngineOptions::default(), |_| Ok(())).unwrap();
        let f = ExprFactory::new();
        let err = engine
            .compile(f.binary(operators::ADD, f.int(1), f.int(2)))
            .err()
            .unwrap();
        assert!(matches!(
            err,
            Error::Compilation(CompileError::UndeclaredFunction { arity: 2, .. })
        ));
    }

    #[test]
    fn test_host_function() {
        let engine = Engine::new(EngineOptions::default(), |env| {
            env.add_standard_library()?.register_function(
                FunctionDescriptor::new("triple", [ArgKind::Is(ValueKind::Int)]),
                |args: &[Value]| match &args[0] {
                    Value::Int(n) => Value::Int(n * 3),
                    other => other.clone(),
                },
            )?;
            Ok(())
        })
        .unwrap();

        let f = ExprFactory::new();
        let expr = engine.compile(f.call("triple", vec![f.int(14)])).unwrap();
        assert_eq!(expr.evaluate(&EmptyActivation).unwrap(), Value::Int(42));
    }

    #[test]
    fn test_duplicate_registrations_fail() {
        let result = Engine::new(EngineOptions::default(), |env| {
            env.add_standard_library()?;
            env.add_standard_library()?;
            Ok(())
        });
        assert!(matches!(result, Err(Error::Registry(_))));

        let result = Engine::new(EngineOptions::default(), |env| {
            env.register_struct_type(StructType::new("acme.Point"))?;
            env.register_struct_type(StructType::new("acme.Point"))?;
            Ok(())
        });
        assert!(matches!(result, Err(Error::Provider(_))));
    }

    #[test]
    fn test_host_struct_type() {
        let engine = Engine::new(EngineOptions::default(), |env| {
            env.register_struct_type(
                StructType::new("acme.Point")
                    .field("x", 1, Type::Int)
                    .field("y", 2, Type::Int),
            )?;
            Ok(())
        })
        .unwrap();

        let f = ExprFactory::new();
        let point = f.new_struct("acme.Point", vec![("x", f.int(3))]);
        let expr = engine.compile(f.select(point, "x")).unwrap();
        assert_eq!(expr.evaluate(&EmptyActivation).unwrap(), Value::Int(3));
    }

    #[test]
    fn test_default_compilation_options_apply() {
        let options = EngineOptions {
            default_compilation_options: CompilationOptions {
                enable_comprehensions: false,
                ..Default::default()
            },
            ..Default::default()
        };
        let engine = Engine::with_standard_library(options).unwrap();
        let f = ExprFactory::new();
        let expr = f.all(f.list(vec![f.int(1)]), "x", f.bool(true));
        assert!(matches!(
            engine.compile(expr.clone()),
            Err(Error::Compilation(CompileError::ComprehensionsDisabled { .. }))
        ));
        assert!(
            engine
                .compile_with_options(&expr.into(), &CompilationOptions::default())
                .is_ok()
        );
    }
}
