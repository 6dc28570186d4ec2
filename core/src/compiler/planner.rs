//! Lowers an expression tree into an execution plan.

use std::sync::Arc;

use ecow::EcoString;
use hashbrown::HashSet;
use tracing::debug;

use super::CompileError;
use crate::api::CompilationOptions;
use crate::ast::{
    Ast, Call, Comprehension, Expr, ExprId, ExprKind, ListExpr, MapExpr, Select, StructExpr,
    operators,
};
use crate::functions::{FunctionRegistry, Overload};
use crate::values::{Type, TypeProvider};
use crate::vm::{ExecutionPlan, FactoryRef, Step, StepKind, find_invalid_jump};

/// Plans `ast` against the functions and types of an environment.
pub fn compile(
    ast: &Ast,
    registry: &FunctionRegistry,
    provider: &TypeProvider,
    options: &CompilationOptions,
) -> Result<ExecutionPlan, CompileError> {
    let mut planner = Planner::new(ast, registry, provider, options);
    planner.plan(&ast.expr)?;
    planner.finalize()
}

/// Walks the tree emitting steps.
///
/// Tracks the operand stack depth precisely so that the plan carries the
/// exact stack size it needs.
struct Planner<'a> {
    ast: &'a Ast,
    registry: &'a FunctionRegistry,
    provider: &'a TypeProvider,
    options: &'a CompilationOptions,

    steps: Vec<Step>,

    /// Current stack depth during compilation
    current_stack_depth: usize,

    /// Maximum stack depth observed
    max_stack_size: usize,
}

impl<'a> Planner<'a> {
    fn new(
        ast: &'a Ast,
        registry: &'a FunctionRegistry,
        provider: &'a TypeProvider,
        options: &'a CompilationOptions,
    ) -> Self {
        Self {
            ast,
            registry,
            provider,
            options,
            steps: Vec::new(),
            current_stack_depth: 0,
            max_stack_size: 0,
        }
    }

    fn finalize(self) -> Result<ExecutionPlan, CompileError> {
        debug_assert_eq!(self.current_stack_depth, 1, "plan must leave one result");
        if let Some((pc, target)) = find_invalid_jump(&self.steps) {
            return Err(CompileError::InvalidJumpTarget { pc, target });
        }
        debug!(
            steps = self.steps.len(),
            max_stack_size = self.max_stack_size,
            "planned expression"
        );
        Ok(ExecutionPlan::new_unchecked(self.steps, self.max_stack_size))
    }

    // === Stack Management ===

    fn push_stack(&mut self) {
        self.current_stack_depth += 1;
        if self.current_stack_depth > self.max_stack_size {
            self.max_stack_size = self.current_stack_depth;
        }
    }

    fn pop_stack_n(&mut self, n: usize) {
        debug_assert!(
            self.current_stack_depth >= n,
            "Stack underflow: trying to pop {} but depth is {}",
            n,
            self.current_stack_depth
        );
        self.current_stack_depth -= n;
    }

    // === Step Emission ===

    fn emit(&mut self, step: Step) -> usize {
        self.steps.push(step);
        self.steps.len() - 1
    }

    /// The index the next emitted step will have.
    fn label(&self) -> usize {
        self.steps.len()
    }

    /// Points the jump at `placeholder` to `target`.
    fn patch_jump(&mut self, placeholder: usize, target: usize) {
        self.steps[placeholder].set_jump_target(target);
    }

    // === Tree Walk ===

    fn plan(&mut self, expr: &Expr) -> Result<(), CompileError> {
        match &expr.kind {
            ExprKind::Unspecified => Err(CompileError::MissingExpression { id: expr.id }),
            ExprKind::Constant(constant) => {
                self.emit(Step::new(expr.id, StepKind::Const(constant.to_value())));
                self.push_stack();
                Ok(())
            }
            ExprKind::Ident(name) => {
                self.plan_reference(expr.id, name);
                Ok(())
            }
            ExprKind::Select(select) => self.plan_select(expr.id, select),
            ExprKind::Call(call) => self.plan_call(expr.id, call),
            ExprKind::List(list) => self.plan_list(expr.id, list),
            ExprKind::Map(map) => self.plan_map(expr.id, map),
            ExprKind::Struct(object) => self.plan_struct(expr.id, object),
            ExprKind::Comprehension(comprehension) => {
                self.plan_comprehension(expr.id, comprehension)
            }
        }
    }

    /// Emits a variable load, honouring a resolved reference.
    fn plan_reference(&mut self, id: ExprId, name: &EcoString) {
        let kind = match self.ast.reference(id) {
            Some(reference) => match &reference.value {
                Some(constant) => StepKind::Const(constant.to_value()),
                None if !reference.name.is_empty() => StepKind::Ident {
                    name: reference.name.clone(),
                },
                None => StepKind::Ident { name: name.clone() },
            },
            None => StepKind::Ident { name: name.clone() },
        };
        self.emit(Step::new(id, kind));
        self.push_stack();
    }

    fn plan_select(&mut self, id: ExprId, select: &Select) -> Result<(), CompileError> {
        // A checked qualified name such as `a.b.c` resolves as a whole.
        if !select.test_only && self.ast.reference(id).is_some() {
            self.plan_reference(id, &select.field);
            return Ok(());
        }
        self.plan(&select.operand)?;
        self.pop_stack_n(1);
        self.emit(Step::new(
            id,
            StepKind::Select {
                field: select.field.clone(),
                test_only: select.test_only,
            },
        ));
        self.push_stack();
        Ok(())
    }

    fn plan_call(&mut self, id: ExprId, call: &Call) -> Result<(), CompileError> {
        if call.target.is_none() {
            match (call.function.as_str(), call.args.as_slice()) {
                (operators::LOGICAL_AND, [left, right]) => {
                    return self.plan_logical(id, left, right, false);
                }
                (operators::LOGICAL_OR, [left, right]) => {
                    return self.plan_logical(id, left, right, true);
                }
                (operators::CONDITIONAL, [condition, then, otherwise]) => {
                    return self.plan_conditional(id, condition, then, otherwise);
                }
                _ => {}
            }
        }

        let receiver_style = call.target.is_some();
        let arity = call.args.len() + usize::from(receiver_style);
        let overloads = self.resolve_overloads(id, &call.function, receiver_style, arity)?;

        if let Some(target) = &call.target {
            self.plan(target)?;
        }
        for arg in &call.args {
            self.plan(arg)?;
        }
        self.pop_stack_n(arity);
        self.emit(Step::new(
            id,
            StepKind::Call {
                function: call.function.clone(),
                arity,
                overloads,
            },
        ));
        self.push_stack();
        Ok(())
    }

    fn resolve_overloads(
        &self,
        id: ExprId,
        function: &EcoString,
        receiver_style: bool,
        arity: usize,
    ) -> Result<Arc<[Overload]>, CompileError> {
        let mut overloads = self.registry.find_overloads(function, receiver_style, arity);
        if overloads.is_empty() {
            return Err(CompileError::UndeclaredFunction {
                name: function.clone(),
                arity,
            });
        }
        // A checker may have narrowed the candidates already.
        if let Some(reference) = self.ast.reference(id) {
            if !reference.overload_ids.is_empty() {
                let wanted: HashSet<&str> =
                    reference.overload_ids.iter().map(EcoString::as_str).collect();
                let narrowed: Vec<Overload> = overloads
                    .iter()
                    .filter(|o| wanted.contains(o.descriptor().overload_id()))
                    .cloned()
                    .collect();
                if !narrowed.is_empty() {
                    overloads = narrowed;
                }
            }
        }
        Ok(overloads.into())
    }

    /// `left && right` or `left || right`.
    ///
    /// With short-circuiting the right operand is skipped once the left one
    /// is the absorbing value; the jump keeps it on the stack as the result.
    fn plan_logical(
        &mut self,
        id: ExprId,
        left: &Expr,
        right: &Expr,
        is_or: bool,
    ) -> Result<(), CompileError> {
        self.plan(left)?;
        let skip = if self.options.short_circuiting {
            Some(self.emit(Step::new(
                id,
                StepKind::JumpIfBool {
                    expected: is_or,
                    target: 0,
                },
            )))
        } else {
            None
        };
        self.plan(right)?;
        self.pop_stack_n(2);
        self.emit(Step::new(id, if is_or { StepKind::Or } else { StepKind::And }));
        self.push_stack();
        if let Some(skip) = skip {
            let end = self.label();
            self.patch_jump(skip, end);
        }
        Ok(())
    }

    /// `condition ? then : otherwise`.
    fn plan_conditional(
        &mut self,
        id: ExprId,
        condition: &Expr,
        then: &Expr,
        otherwise: &Expr,
    ) -> Result<(), CompileError> {
        self.plan(condition)?;
        if !self.options.short_circuiting {
            self.plan(then)?;
            self.plan(otherwise)?;
            self.pop_stack_n(3);
            self.emit(Step::new(id, StepKind::Conditional));
            self.push_stack();
            return Ok(());
        }

        // A non-bool condition is itself the (error) result.
        let not_bool = self.emit(Step::new(id, StepKind::JumpIfNotBool { target: 0 }));
        let else_jump = self.emit(Step::internal(id, StepKind::PopJumpIfFalse { target: 0 }));
        self.pop_stack_n(1);

        // Only one branch runs, so both share the same stack space.
        let depth_before_branches = self.current_stack_depth;
        self.plan(then)?;
        let end_jump = self.emit(Step::internal(id, StepKind::Jump { target: 0 }));

        let else_label = self.label();
        self.patch_jump(else_jump, else_label);
        self.current_stack_depth = depth_before_branches;
        self.plan(otherwise)?;

        let end_label = self.label();
        self.patch_jump(end_jump, end_label);
        self.patch_jump(not_bool, end_label);
        self.current_stack_depth = depth_before_branches + 1;
        Ok(())
    }

    fn plan_list(&mut self, id: ExprId, list: &ListExpr) -> Result<(), CompileError> {
        for element in &list.elements {
            self.plan(element)?;
        }
        let element_type = match self.ast.type_of(id) {
            Some(Type::List(element)) => Type::clone(element),
            _ => Type::Dyn,
        };
        self.pop_stack_n(list.elements.len());
        self.emit(Step::new(
            id,
            StepKind::CreateList {
                count: list.elements.len(),
                element_type,
            },
        ));
        self.push_stack();
        Ok(())
    }

    fn plan_map(&mut self, id: ExprId, map: &MapExpr) -> Result<(), CompileError> {
        for entry in &map.entries {
            self.plan(&entry.key)?;
            self.plan(&entry.value)?;
        }
        let (key_type, value_type) = match self.ast.type_of(id) {
            Some(Type::Map(key, value)) => (Type::clone(key), Type::clone(value)),
            _ => (Type::Dyn, Type::Dyn),
        };
        self.pop_stack_n(map.entries.len() * 2);
        self.emit(Step::new(
            id,
            StepKind::CreateMap {
                count: map.entries.len(),
                key_type,
                value_type,
            },
        ));
        self.push_stack();
        Ok(())
    }

    fn plan_struct(&mut self, id: ExprId, object: &StructExpr) -> Result<(), CompileError> {
        let type_name = match self.ast.reference(id) {
            Some(reference) if !reference.name.is_empty() => reference.name.clone(),
            _ => object.type_name.clone(),
        };
        let factory = self.provider.find_struct_builder(&type_name).ok_or_else(|| {
            CompileError::UnknownStructType {
                name: type_name.clone(),
            }
        })?;

        for field in &object.fields {
            self.plan(&field.value)?;
        }
        self.pop_stack_n(object.fields.len());
        self.emit(Step::new(
            id,
            StepKind::CreateStruct {
                type_name,
                fields: object.fields.iter().map(|f| f.field.clone()).collect(),
                factory: FactoryRef(factory),
            },
        ));
        self.push_stack();
        Ok(())
    }

    /// Emits the loop
    ///
    /// ```text
    ///        <range>
    ///        ComprehensionInit      (to end if the range is not iterable)
    ///        <accu_init>
    ///        SetAccu
    /// loop:  ComprehensionNext      (to done when exhausted)
    ///        <loop_condition>
    ///        ComprehensionCond      (to done unless true)
    ///        <loop_step>
    ///        SetAccu
    ///        Jump loop
    /// done:  <result>
    ///        ComprehensionFinish
    /// end:
    /// ```
    fn plan_comprehension(
        &mut self,
        id: ExprId,
        comprehension: &Comprehension,
    ) -> Result<(), CompileError> {
        if !self.options.enable_comprehensions {
            return Err(CompileError::ComprehensionsDisabled { id });
        }

        self.plan(&comprehension.iter_range)?;
        self.pop_stack_n(1);
        let init = self.emit(Step::new(
            id,
            StepKind::ComprehensionInit {
                iter_var: comprehension.iter_var.clone(),
                accu_var: comprehension.accu_var.clone(),
                skip_to: 0,
            },
        ));

        self.plan(&comprehension.accu_init)?;
        self.pop_stack_n(1);
        self.emit(Step::internal(id, StepKind::SetAccu));

        let loop_label = self.label();
        let next = self.emit(Step::internal(id, StepKind::ComprehensionNext { done: 0 }));

        self.plan(&comprehension.loop_condition)?;
        self.pop_stack_n(1);
        let cond = self.emit(Step::internal(id, StepKind::ComprehensionCond { done: 0 }));

        self.plan(&comprehension.loop_step)?;
        self.pop_stack_n(1);
        self.emit(Step::internal(id, StepKind::SetAccu));
        self.emit(Step::internal(id, StepKind::Jump { target: loop_label }));

        let done_label = self.label();
        self.patch_jump(next, done_label);
        self.patch_jump(cond, done_label);

        self.plan(&comprehension.result)?;
        self.emit(Step::new(id, StepKind::ComprehensionFinish));

        let end_label = self.label();
        self.patch_jump(init, end_label);
        Ok(())
    }
}
