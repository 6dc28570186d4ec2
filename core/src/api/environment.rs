//! Environment builder for registering functions and struct types.

use std::sync::Arc;

use ecow::EcoString;

use super::Error;
use crate::functions::{Function, FunctionDescriptor, FunctionRegistry, register_builtins};
use crate::values::{StructBuilderFactory, StructType, TypeProvider};

/// Builder for the functions and struct types an engine knows about.
///
/// Used inside the initialization closure of
/// [`Engine::new`](super::Engine::new); the finished registries are frozen
/// and shared by every expression the engine compiles.
///
/// # Example
///
/// ```
/// use predica_core::api::{Engine, EngineOptions};
/// use predica_core::functions::{ArgKind, FunctionDescriptor};
/// use predica_core::values::{Value, ValueKind};
///
/// let engine = Engine::new(EngineOptions::default(), |env| {
///     env.add_standard_library()?;
///     env.register_function(
///         FunctionDescriptor::new("double", [ArgKind::Is(ValueKind::Int)]),
///         |args: &[Value]| match &args[0] {
///             Value::Int(n) => Value::Int(n * 2),
///             other => other.clone(),
///         },
///     )?;
///     Ok(())
/// })
/// .unwrap();
/// ```
#[derive(Default)]
pub struct EnvironmentBuilder {
    registry: FunctionRegistry,
    provider: TypeProvider,
}

impl EnvironmentBuilder {
    /// An empty environment: no operators, no struct types.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the standard operators and conversions plus the
    /// `google.protobuf` well-known types.
    pub fn add_standard_library(&mut self) -> Result<&mut Self, Error> {
        register_builtins(&mut self.registry)?;
        for (name, factory) in TypeProvider::with_well_known_types().factories() {
            self.provider.register_factory(name.clone(), factory.clone())?;
        }
        Ok(self)
    }

    pub fn register_function(
        &mut self,
        descriptor: FunctionDescriptor,
        function: impl Function + 'static,
    ) -> Result<&mut Self, Error> {
        self.registry.register(descriptor, function)?;
        Ok(self)
    }

    pub fn register_struct_type(&mut self, schema: StructType) -> Result<&mut Self, Error> {
        self.provider.register_struct_type(schema)?;
        Ok(self)
    }

    /// Registers a host-implemented struct builder under `name`.
    pub fn register_struct_factory(
        &mut self,
        name: impl Into<EcoString>,
        factory: Arc<dyn StructBuilderFactory>,
    ) -> Result<&mut Self, Error> {
        self.provider.register_factory(name, factory)?;
        Ok(self)
    }

    pub(crate) fn build(self) -> (FunctionRegistry, TypeProvider) {
        (self.registry, self.provider)
    }
}
