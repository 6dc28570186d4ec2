//! Predica: an embeddable evaluator for policy and filter expressions.
//!
//! An external parser/checker hands over an [`ast::Ast`]; the
//! [`compiler`] turns it into a flat [`vm::ExecutionPlan`] once, and the
//! [`vm`] evaluates that plan against an [`activation::Activation`] as often
//! as needed. Most hosts only need the [`api`] module.

pub mod activation;
pub mod api;
pub mod ast;
pub mod compiler;
pub mod functions;
pub mod values;
pub mod vm;
