//! Predica - an embeddable evaluator for policy and filter expressions
//!
//! # Overview
//!
//! Predica evaluates side-effect-free expressions against request-time data
//! supplied by a host application. Common use cases include:
//!
//! - Access-control and policy rules
//! - Filters over records or events
//! - Feature flags and conditional logic
//!
//! Parsing and type checking are done by an external front end that hands
//! over an [`Ast`]. Predica compiles it once into a flat execution plan and
//! evaluates the plan as often as needed, from any number of threads.
//!
//! # Quick Start
//!
//! ```
//! use predica::{Engine, EngineOptions, ExprFactory, MapActivation, Value, operators};
//!
//! let engine = Engine::with_standard_library(EngineOptions::default()).unwrap();
//!
//! // request.size < 1024 && "admin" in roles
//! let f = ExprFactory::new();
//! let expr = f.and(
//!     f.binary(operators::LESS, f.select(f.ident("request"), "size"), f.int(1024)),
//!     f.binary(operators::IN, f.string("admin"), f.ident("roles")),
//! );
//! let rule = engine.compile(expr).unwrap();
//!
//! let mut activation = MapActivation::new();
//! activation.insert(
//!     "request",
//!     Value::from_json(serde_json::json!({ "size": 512 })),
//! );
//! activation.insert("roles", Value::list([Value::string("admin")]));
//!
//! assert_eq!(rule.evaluate(&activation).unwrap(), Value::Bool(true));
//! ```
//!
//! # Errors and unknowns
//!
//! Bad data never makes evaluation fail: a division by zero or a missing key
//! yields a [`Value::Error`] that propagates until something absorbs it
//! (`false && error` is `false`). Variables the host marks as unknown yield
//! [`Value::Unknown`], which records which attributes were missing. An
//! `Err` from `evaluate` means the engine itself failed, an iteration budget
//! ran out, or a trace listener asked to stop.

pub use predica_core::activation::{
    Activation, EmptyActivation, HierarchicalActivation, MapActivation,
};
pub use predica_core::api::{
    CompilationOptions, CompiledExpression, Engine, EngineOptions, EnvironmentBuilder, Error,
    ExecutionOptions,
};
pub use predica_core::ast::{Ast, Expr, ExprFactory, ExprId, Reference, operators};
pub use predica_core::functions::{ArgKind, FunctionDescriptor};
pub use predica_core::values::{
    AttributePattern, ErrorCode, ErrorValue, StructType, Type, UnknownSet, Value, ValueKind,
};
pub use predica_core::vm::{EvalError, EvaluationListener, EvaluationState, ListenerError};

/// The full engine crate, for lower-level access.
pub use predica_core as core;
