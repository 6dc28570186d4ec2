use std::fmt;
use std::sync::Arc;

use ecow::EcoString;

use crate::ast::ExprId;
use crate::functions::Overload;
use crate::values::{StructBuilderFactory, Type, Value};

/// One instruction of an [`ExecutionPlan`](super::ExecutionPlan).
///
/// `id` is the expression node the step was compiled from. Steps that only
/// exist to move control flow around (jumps, comprehension bookkeeping) are
/// marked with `comes_from_ast: false` and are never reported to trace
/// listeners.
#[derive(Debug, Clone)]
pub struct Step {
    pub id: ExprId,
    pub comes_from_ast: bool,
    pub kind: StepKind,
}

impl Step {
    pub fn new(id: ExprId, kind: StepKind) -> Self {
        Self {
            id,
            comes_from_ast: true,
            kind,
        }
    }

    /// A control step not attributable to a node result.
    pub fn internal(id: ExprId, kind: StepKind) -> Self {
        Self {
            id,
            comes_from_ast: false,
            kind,
        }
    }

    /// The absolute jump target, if this step can transfer control.
    pub fn jump_target(&self) -> Option<usize> {
        match &self.kind {
            StepKind::Jump { target }
            | StepKind::JumpIfBool { target, .. }
            | StepKind::JumpIfNotBool { target }
            | StepKind::PopJumpIfFalse { target } => Some(*target),
            StepKind::ComprehensionInit { skip_to, .. } => Some(*skip_to),
            StepKind::ComprehensionNext { done } | StepKind::ComprehensionCond { done } => {
                Some(*done)
            }
            _ => None,
        }
    }

    pub(crate) fn set_jump_target(&mut self, new_target: usize) {
        match &mut self.kind {
            StepKind::Jump { target }
            | StepKind::JumpIfBool { target, .. }
            | StepKind::JumpIfNotBool { target }
            | StepKind::PopJumpIfFalse { target } => *target = new_target,
            StepKind::ComprehensionInit { skip_to, .. } => *skip_to = new_target,
            StepKind::ComprehensionNext { done } | StepKind::ComprehensionCond { done } => {
                *done = new_target
            }
            _ => {}
        }
    }
}

#[derive(Debug, Clone)]
pub enum StepKind {
    /// Push a constant.
    Const(Value),

    /// Resolve a variable: comprehension bindings first, then the activation.
    Ident { name: EcoString },

    /// Pop an operand and push `operand.field` (or `has(operand.field)`).
    Select { field: EcoString, test_only: bool },

    /// Pop `arity` arguments and dispatch among the resolved overloads.
    Call {
        function: EcoString,
        arity: usize,
        overloads: Arc<[Overload]>,
    },

    /// Pop `count` elements and push a list.
    CreateList { count: usize, element_type: Type },

    /// Pop `count` key/value pairs (key below value) and push a map.
    CreateMap {
        count: usize,
        key_type: Type,
        value_type: Type,
    },

    /// Pop one value per field and push the built struct.
    CreateStruct {
        type_name: EcoString,
        fields: Vec<EcoString>,
        factory: FactoryRef,
    },

    Jump { target: usize },

    /// Jump, keeping the top of stack, if it is `Bool(expected)`.
    JumpIfBool { expected: bool, target: usize },

    /// Conditional guard. Booleans fall through; errors and unknowns jump
    /// as the result; anything else is replaced by an error and jumps.
    JumpIfNotBool { target: usize },

    /// Pop a bool and jump if it is false.
    PopJumpIfFalse { target: usize },

    /// Pop two operands and push their conjunction.
    And,

    /// Pop two operands and push their disjunction.
    Or,

    /// Pop condition, then-value and else-value; push the selected one.
    Conditional,

    /// Pop the range and enter a new iteration frame.
    ///
    /// If the range is an error, an unknown or not iterable, the result is
    /// pushed instead and control moves to `skip_to`.
    ComprehensionInit {
        iter_var: EcoString,
        accu_var: EcoString,
        skip_to: usize,
    },

    /// Pop into the innermost accumulator.
    SetAccu,

    /// Bind the next element, or jump to `done` when the range is exhausted.
    ComprehensionNext { done: usize },

    /// Pop the loop condition. Continue on `true`, otherwise leave the loop.
    ComprehensionCond { done: usize },

    /// Leave the innermost iteration frame.
    ComprehensionFinish,
}

/// A struct builder factory resolved at compile time.
#[derive(Clone)]
pub struct FactoryRef(pub Arc<dyn StructBuilderFactory>);

impl fmt::Debug for FactoryRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("FactoryRef")
    }
}
