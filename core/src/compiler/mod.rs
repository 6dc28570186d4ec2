//! Plan compiler.
//!
//! Transforms an expression tree (optionally annotated by a checker) into a
//! flat [`ExecutionPlan`](crate::vm::ExecutionPlan).
//!
//! ## Design
//!
//! - Resolves function overloads and struct builders up front, so an
//!   undeclared function or unknown struct type fails here and not during
//!   evaluation
//! - Tracks stack depth precisely and stores the maximum in the plan
//! - Uses jump patching for short-circuit logic, conditionals and
//!   comprehension loops

mod error;
mod planner;

#[cfg(test)]
mod planner_test;

pub use error::CompileError;
pub use planner::compile;
