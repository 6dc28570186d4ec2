//! Per-evaluation mutable state.
//!
//! An [`EvaluationState`] owns the operand stack and the iteration stack. It
//! can be kept by the caller and reused across evaluations to avoid
//! reallocating; it must never be shared between concurrent evaluations.
//! An [`EvaluationFrame`] borrows a state together with the activation and
//! options of one evaluation.

use std::sync::Arc;

use ecow::EcoString;
use smallvec::SmallVec;

use super::{EvalError, ExecutionPlan, Stack};
use crate::activation::Activation;
use crate::api::ExecutionOptions;
use crate::values::{AttributeTrail, ListValue, UnknownSet, Value};

/// An operand stack entry: a value plus where it was read from.
#[derive(Debug, Clone)]
pub struct Slot {
    pub value: Value,
    pub trail: AttributeTrail,
}

impl Slot {
    pub fn new(value: Value) -> Self {
        Self {
            value,
            trail: AttributeTrail::empty(),
        }
    }

    pub fn with_trail(value: Value, trail: AttributeTrail) -> Self {
        Self { value, trail }
    }
}

/// Bindings of one comprehension nesting level.
pub(crate) struct IterFrame {
    iter_var: EcoString,
    accu_var: EcoString,
    iter_slot: Option<Slot>,
    accu_slot: Option<Slot>,
    range: Arc<dyn ListValue>,
    range_trail: AttributeTrail,
    next_index: usize,
}

pub struct EvaluationState {
    pub(crate) stack: Stack<Slot>,
    pub(crate) iter_frames: SmallVec<[IterFrame; 4]>,
}

impl EvaluationState {
    pub fn new(plan: &ExecutionPlan) -> Self {
        Self {
            stack: Stack::new(plan.max_stack_size()),
            iter_frames: SmallVec::new(),
        }
    }

    /// Clears all state and sizes the operand stack for `plan`.
    pub fn reset(&mut self, plan: &ExecutionPlan) {
        self.stack.reset(plan.max_stack_size());
        self.iter_frames.clear();
    }

    /// Number of values currently on the operand stack.
    pub fn stack_depth(&self) -> usize {
        self.stack.len()
    }

    /// Number of active iteration frames.
    pub fn iteration_depth(&self) -> usize {
        self.iter_frames.len()
    }
}

pub struct EvaluationFrame<'a> {
    pub(crate) state: &'a mut EvaluationState,
    pub(crate) activation: &'a dyn Activation,
    pub(crate) options: &'a ExecutionOptions,
    pub(crate) iterations: usize,
    /// Index of the step being executed.
    pub(crate) pc: usize,
}

impl<'a> EvaluationFrame<'a> {
    pub fn new(
        state: &'a mut EvaluationState,
        activation: &'a dyn Activation,
        options: &'a ExecutionOptions,
    ) -> Self {
        Self {
            state,
            activation,
            options,
            iterations: 0,
            pc: 0,
        }
    }

    pub fn activation(&self) -> &dyn Activation {
        self.activation
    }

    pub fn options(&self) -> &ExecutionOptions {
        self.options
    }

    /// Enters a comprehension over `range`. Both variables start unbound.
    pub fn push_iter_frame(
        &mut self,
        iter_var: impl Into<EcoString>,
        accu_var: impl Into<EcoString>,
        range: Arc<dyn ListValue>,
        range_trail: AttributeTrail,
    ) {
        self.state.iter_frames.push(IterFrame {
            iter_var: iter_var.into(),
            accu_var: accu_var.into(),
            iter_slot: None,
            accu_slot: None,
            range,
            range_trail,
            next_index: 0,
        });
    }

    pub fn pop_iter_frame(&mut self) -> Result<(), EvalError> {
        match self.state.iter_frames.pop() {
            Some(_) => Ok(()),
            None => Err(EvalError::StackUnderflow { pc: self.pc }),
        }
    }

    pub fn set_accu_var(&mut self, value: Value, trail: AttributeTrail) -> Result<(), EvalError> {
        let frame = self
            .state
            .iter_frames
            .last_mut()
            .ok_or(EvalError::InvalidIterationState(
                "accumulator assigned outside of a comprehension",
            ))?;
        frame.accu_slot = Some(Slot::with_trail(value, trail));
        Ok(())
    }

    pub fn set_iter_var(&mut self, value: Value, trail: AttributeTrail) -> Result<(), EvalError> {
        let frame = self
            .state
            .iter_frames
            .last_mut()
            .ok_or(EvalError::InvalidIterationState(
                "iteration variable assigned outside of a comprehension",
            ))?;
        frame.iter_slot = Some(Slot::with_trail(value, trail));
        Ok(())
    }

    /// Looks `name` up in the iteration stack, innermost frame first.
    ///
    /// Within a frame the iteration variable wins over the accumulator.
    /// Unbound variables are skipped, so an accumulator initializer still
    /// sees the enclosing bindings.
    pub fn get_iter_var(&self, name: &str) -> Option<(Value, AttributeTrail)> {
        self.state.iter_frames.iter().rev().find_map(|frame| {
            let slot = if frame.iter_var == name {
                frame.iter_slot.as_ref()
            } else {
                None
            };
            let slot = slot.or_else(|| {
                if frame.accu_var == name {
                    frame.accu_slot.as_ref()
                } else {
                    None
                }
            });
            slot.map(|slot| (slot.value.clone(), slot.trail.clone()))
        })
    }

    /// Binds the next range element in the innermost frame.
    ///
    /// Returns `Ok(false)` once the range is exhausted.
    pub(crate) fn advance(&mut self) -> Result<bool, EvalError> {
        let frame = self
            .state
            .iter_frames
            .last_mut()
            .ok_or(EvalError::InvalidIterationState(
                "comprehension advanced without an iteration frame",
            ))?;
        if frame.next_index >= frame.range.size() {
            return Ok(false);
        }
        let index = frame.next_index;
        frame.next_index += 1;
        let value = frame.range.get(index).unwrap_or_else(Value::Error);
        let trail = frame.range_trail.step(&index.to_string());
        frame.iter_slot = Some(Slot::with_trail(value, trail));

        self.iterations += 1;
        match self.options.max_iterations {
            Some(limit) if self.iterations > limit => {
                Err(EvalError::IterationBudgetExceeded { limit })
            }
            _ => Ok(true),
        }
    }

    /// The unknown value for `trail`, if an activation pattern covers it.
    pub(crate) fn unknown_for(&self, trail: &AttributeTrail) -> Option<Value> {
        if !self.options.unknown_processing {
            return None;
        }
        let attribute = trail.attribute()?;
        self.activation
            .unknown_patterns()
            .iter()
            .any(|pattern| pattern.matches(attribute))
            .then(|| Value::Unknown(UnknownSet::from_attribute(attribute.clone())))
    }
}
