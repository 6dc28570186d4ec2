use smallvec::SmallVec;
use tracing::{error, trace, warn};

use super::frame::{EvaluationFrame, EvaluationState, Slot};
use super::stack::StackError;
use super::{EvalError, ExecutionPlan, ListenerError, Step, StepKind};
use crate::activation::Activation;
use crate::api::ExecutionOptions;
use crate::ast::{ExprId, operators};
use crate::functions::{dispatch, propagate_exceptional};
use crate::values::{
    AttributeTrail, ErrorValue, ListBuilder, UnknownSet, Value, new_map_builder,
};

/// Observes the value of every expression node as it is computed.
///
/// Returning an error stops evaluation immediately; the error is reported as
/// [`EvalError::Listener`].
pub trait EvaluationListener {
    fn on_step(&mut self, id: ExprId, value: &Value) -> Result<(), ListenerError>;
}

impl<F> EvaluationListener for F
where
    F: FnMut(ExprId, &Value) -> Result<(), ListenerError>,
{
    fn on_step(&mut self, id: ExprId, value: &Value) -> Result<(), ListenerError> {
        self(id, value)
    }
}

/// Evaluates `plan` with a fresh state.
pub fn evaluate(
    plan: &ExecutionPlan,
    activation: &dyn Activation,
    options: &ExecutionOptions,
) -> Result<Value, EvalError> {
    let mut state = EvaluationState::new(plan);
    evaluate_with_state(plan, activation, options, &mut state, None)
}

/// Evaluates `plan`, reporting each node result to `listener`.
pub fn evaluate_with_trace(
    plan: &ExecutionPlan,
    activation: &dyn Activation,
    options: &ExecutionOptions,
    listener: &mut dyn EvaluationListener,
) -> Result<Value, EvalError> {
    let mut state = EvaluationState::new(plan);
    evaluate_with_state(plan, activation, options, &mut state, Some(listener))
}

/// Evaluates `plan` reusing `state`, which is reset first.
pub fn evaluate_with_state(
    plan: &ExecutionPlan,
    activation: &dyn Activation,
    options: &ExecutionOptions,
    state: &mut EvaluationState,
    listener: Option<&mut dyn EvaluationListener>,
) -> Result<Value, EvalError> {
    state.reset(plan);
    let mut frame = EvaluationFrame::new(state, activation, options);
    let result = run(plan, &mut frame, listener);
    if let Err(err) = &result {
        match err {
            EvalError::Listener { id, source } => {
                warn!(id, %source, "evaluation aborted by listener");
            }
            EvalError::IterationBudgetExceeded { limit } => {
                warn!(limit, "comprehension iteration budget exceeded");
            }
            other => error!(error = %other, "evaluation invariant violated"),
        }
    }
    result
}

/// How control continues after a step.
struct Flow {
    next: usize,
    /// Whether the step left a node result on top of the stack.
    produced: bool,
}

impl Flow {
    fn produced(next: usize) -> Self {
        Self {
            next,
            produced: true,
        }
    }

    fn control(next: usize) -> Self {
        Self {
            next,
            produced: false,
        }
    }
}

fn run(
    plan: &ExecutionPlan,
    frame: &mut EvaluationFrame<'_>,
    mut listener: Option<&mut dyn EvaluationListener>,
) -> Result<Value, EvalError> {
    let steps = plan.steps();
    let initial_depth = frame.state.stack.len();
    let mut pc = 0;

    while pc < steps.len() {
        let step = &steps[pc];
        frame.pc = pc;
        trace!(pc, id = step.id, kind = ?step.kind, "step");

        let flow = frame.execute(step)?;

        if step.comes_from_ast && flow.produced {
            if let Some(listener) = listener.as_deref_mut() {
                let top = frame.peek()?;
                if let Err(source) = listener.on_step(step.id, &top.value) {
                    return Err(EvalError::Listener {
                        id: step.id,
                        source,
                    });
                }
            }
        }

        if flow.next > steps.len() {
            return Err(EvalError::InvalidJumpTarget {
                pc,
                target: flow.next,
            });
        }
        pc = flow.next;
    }

    if !frame.state.iter_frames.is_empty() {
        return Err(EvalError::InvalidIterationState(
            "iteration frame still active after evaluation",
        ));
    }
    let actual = frame.state.stack.len();
    if actual != initial_depth + 1 {
        return Err(EvalError::StackImbalance {
            expected: initial_depth + 1,
            actual,
        });
    }
    frame.pop().map(|slot| slot.value)
}

fn stack_error(pc: usize, err: StackError) -> EvalError {
    match err {
        StackError::Underflow => EvalError::StackUnderflow { pc },
        StackError::Overflow { limit } => EvalError::StackOverflow { pc, limit },
    }
}

impl EvaluationFrame<'_> {
    fn push(&mut self, slot: Slot) -> Result<(), EvalError> {
        let pc = self.pc;
        self.state.stack.push(slot).map_err(|e| stack_error(pc, e))
    }

    fn push_value(&mut self, value: Value) -> Result<(), EvalError> {
        self.push(Slot::new(value))
    }

    fn pop(&mut self) -> Result<Slot, EvalError> {
        let pc = self.pc;
        self.state.stack.pop().map_err(|e| stack_error(pc, e))
    }

    fn peek(&self) -> Result<&Slot, EvalError> {
        self.state.stack.peek().map_err(|e| stack_error(self.pc, e))
    }

    /// Pops `n` values, returned bottom to top.
    fn pop_values(&mut self, n: usize) -> Result<SmallVec<[Value; 4]>, EvalError> {
        let pc = self.pc;
        self.state
            .stack
            .pop_n(n)
            .map(|slots| slots.map(|slot| slot.value).collect())
            .map_err(|e| stack_error(pc, e))
    }

    fn execute(&mut self, step: &Step) -> Result<Flow, EvalError> {
        let next = self.pc + 1;
        match &step.kind {
            StepKind::Const(value) => {
                self.push_value(value.clone())?;
            }
            StepKind::Ident { name } => {
                let slot = self.resolve(name);
                self.push(slot)?;
            }
            StepKind::Select { field, test_only } => {
                let operand = self.pop()?;
                let slot = self.select(operand, field, *test_only);
                self.push(slot)?;
            }
            StepKind::Call {
                function,
                arity,
                overloads,
            } => {
                let args = self.pop_values(*arity)?;
                self.push_value(dispatch(function, overloads, &args))?;
            }
            StepKind::CreateList {
                count,
                element_type,
            } => {
                let elements = self.pop_values(*count)?;
                let list = propagate_exceptional(&elements).unwrap_or_else(|| {
                    let mut builder = ListBuilder::new(element_type.clone());
                    for element in elements {
                        if let Err(err) = builder.add(element) {
                            return Value::Error(err);
                        }
                    }
                    builder.build()
                });
                self.push_value(list)?;
            }
            StepKind::CreateMap {
                count,
                key_type,
                value_type,
            } => {
                let entries = self.pop_values(count * 2)?;
                let map = propagate_exceptional(&entries).unwrap_or_else(|| {
                    let mut builder = new_map_builder(key_type, value_type);
                    let mut entries = entries.into_iter();
                    while let (Some(key), Some(value)) = (entries.next(), entries.next()) {
                        if let Err(err) = builder.put(key, value) {
                            return Value::Error(err);
                        }
                    }
                    builder.build()
                });
                self.push_value(map)?;
            }
            StepKind::CreateStruct {
                type_name,
                fields,
                factory,
            } => {
                let values = self.pop_values(fields.len())?;
                let value = propagate_exceptional(&values).unwrap_or_else(|| {
                    let mut builder = factory.0.new_builder();
                    for (field, value) in fields.iter().zip(values) {
                        if let Err(err) = builder.set_field_by_name(field, value) {
                            return Value::Error(err);
                        }
                    }
                    builder.build().unwrap_or_else(|err| {
                        trace!(%type_name, %err, "struct construction failed");
                        Value::Error(err)
                    })
                });
                self.push_value(value)?;
            }
            StepKind::Jump { target } => return Ok(Flow::control(*target)),
            StepKind::JumpIfBool { expected, target } => {
                if let Value::Bool(b) = self.peek()?.value {
                    if b == *expected {
                        return Ok(Flow::produced(*target));
                    }
                }
                return Ok(Flow::control(next));
            }
            StepKind::JumpIfNotBool { target } => {
                let pc = self.pc;
                let top = self
                    .state
                    .stack
                    .peek_mut()
                    .map_err(|e| stack_error(pc, e))?;
                match &top.value {
                    Value::Bool(_) => return Ok(Flow::control(next)),
                    Value::Error(_) | Value::Unknown(_) => {}
                    _ => {
                        *top = Slot::new(Value::Error(ErrorValue::no_matching_overload(
                            operators::CONDITIONAL,
                        )));
                    }
                }
                return Ok(Flow::produced(*target));
            }
            StepKind::PopJumpIfFalse { target } => {
                let condition = self.pop()?;
                return match condition.value {
                    Value::Bool(true) => Ok(Flow::control(next)),
                    Value::Bool(false) => Ok(Flow::control(*target)),
                    other => Err(EvalError::UnexpectedOperand {
                        pc: self.pc,
                        kind: other.kind(),
                    }),
                };
            }
            StepKind::And => {
                let right = self.pop()?.value;
                let left = self.pop()?.value;
                self.push_value(logical(false, left, right, operators::LOGICAL_AND))?;
            }
            StepKind::Or => {
                let right = self.pop()?.value;
                let left = self.pop()?.value;
                self.push_value(logical(true, left, right, operators::LOGICAL_OR))?;
            }
            StepKind::Conditional => {
                let otherwise = self.pop()?;
                let then = self.pop()?;
                let condition = self.pop()?;
                let selected = match condition.value {
                    Value::Bool(true) => then,
                    Value::Bool(false) => otherwise,
                    Value::Error(_) | Value::Unknown(_) => condition,
                    _ => Slot::new(Value::Error(ErrorValue::no_matching_overload(
                        operators::CONDITIONAL,
                    ))),
                };
                self.push(selected)?;
            }
            StepKind::ComprehensionInit {
                iter_var,
                accu_var,
                skip_to,
            } => {
                let Slot { value, trail } = self.pop()?;
                let range = match value {
                    Value::List(list) => list,
                    Value::Map(map) => map.list_keys(),
                    Value::Error(_) | Value::Unknown(_) => {
                        self.push(Slot::with_trail(value, trail))?;
                        return Ok(Flow::produced(*skip_to));
                    }
                    other => {
                        let err = ErrorValue::invalid_argument(format!(
                            "expression of type '{}' cannot be the range of a comprehension",
                            other.kind()
                        ));
                        self.push_value(Value::Error(err))?;
                        return Ok(Flow::produced(*skip_to));
                    }
                };
                self.push_iter_frame(iter_var.clone(), accu_var.clone(), range, trail);
                return Ok(Flow::control(next));
            }
            StepKind::SetAccu => {
                let Slot { value, trail } = self.pop()?;
                self.set_accu_var(value, trail)?;
                return Ok(Flow::control(next));
            }
            StepKind::ComprehensionNext { done } => {
                let target = if self.advance()? { next } else { *done };
                return Ok(Flow::control(target));
            }
            StepKind::ComprehensionCond { done } => {
                let condition = self.pop()?;
                return match condition.value {
                    Value::Bool(true) => Ok(Flow::control(next)),
                    Value::Bool(false) => Ok(Flow::control(*done)),
                    value @ (Value::Error(_) | Value::Unknown(_)) => {
                        self.set_accu_var(value, AttributeTrail::empty())?;
                        Ok(Flow::control(*done))
                    }
                    _ => {
                        let err = ErrorValue::no_matching_overload("loop condition");
                        self.set_accu_var(Value::Error(err), AttributeTrail::empty())?;
                        Ok(Flow::control(*done))
                    }
                };
            }
            StepKind::ComprehensionFinish => {
                self.pop_iter_frame()?;
            }
        }
        Ok(Flow::produced(next))
    }

    /// Comprehension bindings, then unknown patterns, then the activation.
    fn resolve(&self, name: &str) -> Slot {
        if let Some((value, trail)) = self.get_iter_var(name) {
            return Slot::with_trail(value, trail);
        }
        let trail = AttributeTrail::for_variable(name);
        if let Some(unknown) = self.unknown_for(&trail) {
            return Slot::with_trail(unknown, trail);
        }
        match self.activation.find_variable(name) {
            Some(value) => Slot::with_trail(value, trail),
            None => {
                let declared_unknown = self.options.unknown_processing
                    && self
                        .activation
                        .unknown_patterns()
                        .iter()
                        .any(|pattern| pattern.variable() == name);
                let value = match trail.attribute() {
                    Some(attribute) if declared_unknown => {
                        Value::Unknown(UnknownSet::from_attribute(attribute.clone()))
                    }
                    _ => Value::Error(ErrorValue::undeclared_reference(name)),
                };
                Slot::with_trail(value, trail)
            }
        }
    }

    fn select(&self, operand: Slot, field: &str, test_only: bool) -> Slot {
        let trail = operand.trail.step(field);
        if let Some(unknown) = self.unknown_for(&trail) {
            return Slot::with_trail(unknown, trail);
        }
        let value = match operand.value {
            value @ (Value::Error(_) | Value::Unknown(_)) => value,
            Value::Struct(object) => {
                let result = if test_only {
                    object.has_field_by_name(field).map(Value::Bool)
                } else {
                    object.get_field_by_name(field)
                };
                result.unwrap_or_else(Value::Error)
            }
            Value::Map(map) => {
                let key = Value::string(field);
                if test_only {
                    Value::Bool(map.has(&key))
                } else {
                    map.get(&key).unwrap_or_else(Value::Error)
                }
            }
            other => Value::Error(ErrorValue::invalid_argument(format!(
                "type '{}' does not support field selection",
                other.kind()
            ))),
        };
        if test_only {
            Slot::new(value)
        } else {
            Slot::with_trail(value, trail)
        }
    }
}

/// Commutative `&&` (`absorbing == false`) and `||` (`absorbing == true`).
///
/// The absorbing value wins over anything, then errors (left first), then
/// unknowns.
fn logical(absorbing: bool, left: Value, right: Value, function: &str) -> Value {
    match (&left, &right) {
        (Value::Bool(b), _) if *b == absorbing => left,
        (_, Value::Bool(b)) if *b == absorbing => right,
        (Value::Bool(_), Value::Bool(_)) => Value::Bool(!absorbing),
        (Value::Error(_), _) => left,
        (_, Value::Error(_)) => right,
        (Value::Unknown(a), Value::Unknown(b)) => Value::Unknown(a.merge(b)),
        (Value::Unknown(_), Value::Bool(_)) => left,
        (Value::Bool(_), Value::Unknown(_)) => right,
        _ => Value::Error(ErrorValue::no_matching_overload(&format!(
            "{function}({}, {})",
            left.kind(),
            right.kind()
        ))),
    }
}
