//! Expression trees consumed by the compiler.
//!
//! Parsing and type checking happen elsewhere; this module only defines the
//! tree those stages hand over. Every node carries a stable [`ExprId`] that
//! the evaluator reports to trace listeners.
//!
//! Use [`ExprFactory`] to build trees by hand. It allocates ids and knows how
//! to expand the comprehension macros (`all`, `exists`, `map`, ...).

mod factory;
pub mod operators;

pub use factory::{ACCUMULATOR_VAR, ExprFactory};

use chrono::{DateTime, TimeDelta, Utc};
use ecow::{EcoString, EcoVec};
use hashbrown::HashMap;

use crate::values::{Type, Value};

pub type ExprId = i64;

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Expr {
    pub id: ExprId,
    pub kind: ExprKind,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum ExprKind {
    /// A node the producer left empty. Rejected by the compiler.
    #[default]
    Unspecified,
    Constant(Constant),
    Ident(EcoString),
    Select(Box<Select>),
    Call(Box<Call>),
    List(ListExpr),
    Struct(StructExpr),
    Map(MapExpr),
    Comprehension(Box<Comprehension>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Constant {
    Null,
    Bool(bool),
    Int(i64),
    Uint(u64),
    Double(f64),
    String(EcoString),
    Bytes(EcoVec<u8>),
    Duration(TimeDelta),
    Timestamp(DateTime<Utc>),
}

impl Constant {
    pub fn to_value(&self) -> Value {
        match self {
            Constant::Null => Value::Null,
            Constant::Bool(b) => Value::Bool(*b),
            Constant::Int(i) => Value::Int(*i),
            Constant::Uint(u) => Value::Uint(*u),
            Constant::Double(d) => Value::Double(*d),
            Constant::String(s) => Value::String(s.clone()),
            Constant::Bytes(b) => Value::Bytes(b.clone()),
            Constant::Duration(d) => Value::Duration(*d),
            Constant::Timestamp(t) => Value::Timestamp(*t),
        }
    }
}

/// `operand.field`, or `has(operand.field)` when `test_only` is set.
#[derive(Debug, Clone, PartialEq)]
pub struct Select {
    pub operand: Expr,
    pub field: EcoString,
    pub test_only: bool,
}

/// A function or operator call. `target` is the receiver of a member call.
#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    pub target: Option<Expr>,
    pub function: EcoString,
    pub args: Vec<Expr>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ListExpr {
    pub elements: Vec<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StructExpr {
    pub type_name: EcoString,
    pub fields: Vec<FieldInit>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldInit {
    pub id: ExprId,
    pub field: EcoString,
    pub value: Expr,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct MapExpr {
    pub entries: Vec<MapEntry>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MapEntry {
    pub id: ExprId,
    pub key: Expr,
    pub value: Expr,
}

/// The fold primitive every comprehension macro expands to.
///
/// ```text
/// accu_var = accu_init
/// for iter_var in iter_range:
///     if !loop_condition: break
///     accu_var = loop_step
/// return result
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Comprehension {
    pub iter_var: EcoString,
    pub iter_range: Expr,
    pub accu_var: EcoString,
    pub accu_init: Expr,
    pub loop_condition: Expr,
    pub loop_step: Expr,
    pub result: Expr,
}

/// What a checker resolved an expression to.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Reference {
    /// Fully qualified name of a resolved identifier or select chain.
    pub name: EcoString,
    /// Overloads the checker proved applicable to a call.
    pub overload_ids: Vec<EcoString>,
    /// Value of a resolved constant such as an enum entry.
    pub value: Option<Constant>,
}

/// An expression plus the optional annotations of a checker pass.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Ast {
    pub expr: Expr,
    pub reference_map: HashMap<ExprId, Reference>,
    pub type_map: HashMap<ExprId, Type>,
}

impl Ast {
    pub fn new(expr: Expr) -> Self {
        Self {
            expr,
            ..Default::default()
        }
    }

    pub fn is_checked(&self) -> bool {
        !self.reference_map.is_empty() || !self.type_map.is_empty()
    }

    pub fn reference(&self, id: ExprId) -> Option<&Reference> {
        self.reference_map.get(&id)
    }

    pub fn type_of(&self, id: ExprId) -> Option<&Type> {
        self.type_map.get(&id)
    }
}

impl From<Expr> for Ast {
    fn from(expr: Expr) -> Self {
        Ast::new(expr)
    }
}
