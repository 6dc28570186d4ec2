//! Public API for the Predica expression engine.
//!
//! An [`Engine`] holds the function registry and struct types, compiles
//! expression trees into [`CompiledExpression`]s, and those evaluate against
//! any [`Activation`](crate::activation::Activation).
//!
//! # Example
//!
//! ```
//! use predica_core::activation::MapActivation;
//! use predica_core::api::{Engine, EngineOptions};
//! use predica_core::ast::{ExprFactory, operators};
//! use predica_core::values::Value;
//!
//! let engine = Engine::with_standard_library(EngineOptions::default()).unwrap();
//!
//! let f = ExprFactory::new();
//! let adult = engine
//!     .compile(f.binary(operators::GREATER_EQUALS, f.ident("age"), f.int(18)))
//!     .unwrap();
//!
//! let mut activation = MapActivation::new();
//! activation.insert("age", 21i64);
//! assert_eq!(adult.evaluate(&activation).unwrap(), Value::Bool(true));
//! ```

pub mod engine;
pub mod environment;
pub mod error;
pub mod expression;
pub mod options;

pub use engine::Engine;
pub use environment::EnvironmentBuilder;
pub use error::Error;
pub use expression::CompiledExpression;
pub use options::{CompilationOptions, EngineOptions, ExecutionOptions};
