use std::cell::Cell;

use ecow::EcoString;

use super::operators;
use super::{
    Call, Comprehension, Constant, Expr, ExprId, ExprKind, FieldInit, ListExpr, MapEntry,
    MapExpr, Select, StructExpr,
};

/// Accumulator variable introduced by macro expansion. The `@` prefix keeps
/// it out of reach of user identifiers.
pub const ACCUMULATOR_VAR: &str = "@result";

/// Builds expression trees with fresh, increasing ids.
///
/// ```ignore
/// let f = ExprFactory::new();
/// // [1, 2, 3].exists(x, x > 2)
/// let range = f.list(vec![f.int(1), f.int(2), f.int(3)]);
/// let pred = f.call(">", vec![f.ident("x"), f.int(2)]);
/// let expr = f.exists(range, "x", pred);
/// ```
#[derive(Debug)]
pub struct ExprFactory {
    next_id: Cell<ExprId>,
}

impl Default for ExprFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl ExprFactory {
    pub fn new() -> Self {
        Self {
            next_id: Cell::new(1),
        }
    }

    /// Continues numbering after `last`, for extending an existing tree.
    pub fn starting_after(last: ExprId) -> Self {
        Self {
            next_id: Cell::new(last + 1),
        }
    }

    pub fn next_id(&self) -> ExprId {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        id
    }

    fn expr(&self, kind: ExprKind) -> Expr {
        Expr {
            id: self.next_id(),
            kind,
        }
    }

    /// A node with no content.
    pub fn unspecified(&self) -> Expr {
        self.expr(ExprKind::Unspecified)
    }

    pub fn constant(&self, constant: Constant) -> Expr {
        self.expr(ExprKind::Constant(constant))
    }

    pub fn null(&self) -> Expr {
        self.constant(Constant::Null)
    }

    pub fn bool(&self, value: bool) -> Expr {
        self.constant(Constant::Bool(value))
    }

    pub fn int(&self, value: i64) -> Expr {
        self.constant(Constant::Int(value))
    }

    pub fn uint(&self, value: u64) -> Expr {
        self.constant(Constant::Uint(value))
    }

    pub fn double(&self, value: f64) -> Expr {
        self.constant(Constant::Double(value))
    }

    pub fn string(&self, value: impl Into<EcoString>) -> Expr {
        self.constant(Constant::String(value.into()))
    }

    pub fn bytes(&self, value: impl AsRef<[u8]>) -> Expr {
        self.constant(Constant::Bytes(value.as_ref().into()))
    }

    pub fn ident(&self, name: impl Into<EcoString>) -> Expr {
        self.expr(ExprKind::Ident(name.into()))
    }

    pub fn select(&self, operand: Expr, field: impl Into<EcoString>) -> Expr {
        self.expr(ExprKind::Select(Box::new(Select {
            operand,
            field: field.into(),
            test_only: false,
        })))
    }

    pub fn presence_test(&self, operand: Expr, field: impl Into<EcoString>) -> Expr {
        self.expr(ExprKind::Select(Box::new(Select {
            operand,
            field: field.into(),
            test_only: true,
        })))
    }

    pub fn call(&self, function: impl Into<EcoString>, args: Vec<Expr>) -> Expr {
        self.expr(ExprKind::Call(Box::new(Call {
            target: None,
            function: function.into(),
            args,
        })))
    }

    pub fn member_call(
        &self,
        function: impl Into<EcoString>,
        target: Expr,
        args: Vec<Expr>,
    ) -> Expr {
        self.expr(ExprKind::Call(Box::new(Call {
            target: Some(target),
            function: function.into(),
            args,
        })))
    }

    pub fn and(&self, left: Expr, right: Expr) -> Expr {
        self.call(operators::LOGICAL_AND, vec![left, right])
    }

    pub fn or(&self, left: Expr, right: Expr) -> Expr {
        self.call(operators::LOGICAL_OR, vec![left, right])
    }

    pub fn not(&self, operand: Expr) -> Expr {
        self.call(operators::LOGICAL_NOT, vec![operand])
    }

    pub fn conditional(&self, condition: Expr, then: Expr, otherwise: Expr) -> Expr {
        self.call(operators::CONDITIONAL, vec![condition, then, otherwise])
    }

    pub fn binary(&self, operator: &str, left: Expr, right: Expr) -> Expr {
        self.call(operator, vec![left, right])
    }

    pub fn list(&self, elements: Vec<Expr>) -> Expr {
        self.expr(ExprKind::List(ListExpr { elements }))
    }

    pub fn map(&self, entries: Vec<(Expr, Expr)>) -> Expr {
        let entries = entries
            .into_iter()
            .map(|(key, value)| MapEntry {
                id: self.next_id(),
                key,
                value,
            })
            .collect();
        self.expr(ExprKind::Map(MapExpr { entries }))
    }

    pub fn new_struct(
        &self,
        type_name: impl Into<EcoString>,
        fields: Vec<(&str, Expr)>,
    ) -> Expr {
        let fields = fields
            .into_iter()
            .map(|(field, value)| FieldInit {
                id: self.next_id(),
                field: field.into(),
                value,
            })
            .collect();
        self.expr(ExprKind::Struct(StructExpr {
            type_name: type_name.into(),
            fields,
        }))
    }

    #[allow(clippy::too_many_arguments)]
    pub fn comprehension(
        &self,
        iter_var: impl Into<EcoString>,
        iter_range: Expr,
        accu_var: impl Into<EcoString>,
        accu_init: Expr,
        loop_condition: Expr,
        loop_step: Expr,
        result: Expr,
    ) -> Expr {
        self.expr(ExprKind::Comprehension(Box::new(Comprehension {
            iter_var: iter_var.into(),
            iter_range,
            accu_var: accu_var.into(),
            accu_init,
            loop_condition,
            loop_step,
            result,
        })))
    }

    // ------------------------------------------------------------------
    // Macros
    // ------------------------------------------------------------------

    fn accu(&self) -> Expr {
        self.ident(ACCUMULATOR_VAR)
    }

    /// `range.all(var, predicate)`
    pub fn all(&self, range: Expr, var: &str, predicate: Expr) -> Expr {
        let condition = self.call(operators::NOT_STRICTLY_FALSE, vec![self.accu()]);
        let step = self.and(self.accu(), predicate);
        self.comprehension(
            var,
            range,
            ACCUMULATOR_VAR,
            self.bool(true),
            condition,
            step,
            self.accu(),
        )
    }

    /// `range.exists(var, predicate)`
    pub fn exists(&self, range: Expr, var: &str, predicate: Expr) -> Expr {
        let condition = self.call(
            operators::NOT_STRICTLY_FALSE,
            vec![self.not(self.accu())],
        );
        let step = self.or(self.accu(), predicate);
        self.comprehension(
            var,
            range,
            ACCUMULATOR_VAR,
            self.bool(false),
            condition,
            step,
            self.accu(),
        )
    }

    /// `range.exists_one(var, predicate)`
    pub fn exists_one(&self, range: Expr, var: &str, predicate: Expr) -> Expr {
        let increment = self.binary(operators::ADD, self.accu(), self.int(1));
        let step = self.conditional(predicate, increment, self.accu());
        let result = self.binary(operators::EQUALS, self.accu(), self.int(1));
        self.comprehension(
            var,
            range,
            ACCUMULATOR_VAR,
            self.int(0),
            self.bool(true),
            step,
            result,
        )
    }

    /// `range.map(var, transform)`
    pub fn map_macro(&self, range: Expr, var: &str, transform: Expr) -> Expr {
        let step = self.append(transform);
        self.comprehension(
            var,
            range,
            ACCUMULATOR_VAR,
            self.list(Vec::new()),
            self.bool(true),
            step,
            self.accu(),
        )
    }

    /// `range.map(var, filter, transform)`
    pub fn map_filter(&self, range: Expr, var: &str, filter: Expr, transform: Expr) -> Expr {
        let step = self.conditional(filter, self.append(transform), self.accu());
        self.comprehension(
            var,
            range,
            ACCUMULATOR_VAR,
            self.list(Vec::new()),
            self.bool(true),
            step,
            self.accu(),
        )
    }

    /// `range.filter(var, predicate)`
    pub fn filter(&self, range: Expr, var: &str, predicate: Expr) -> Expr {
        let step = self.conditional(predicate, self.append(self.ident(var)), self.accu());
        self.comprehension(
            var,
            range,
            ACCUMULATOR_VAR,
            self.list(Vec::new()),
            self.bool(true),
            step,
            self.accu(),
        )
    }

    /// `has(operand.field)`. Returns `None` unless `select` is a field
    /// selection.
    pub fn has(&self, select: Expr) -> Option<Expr> {
        match select.kind {
            ExprKind::Select(select) if !select.test_only => {
                Some(self.presence_test(select.operand, select.field))
            }
            _ => None,
        }
    }

    fn append(&self, element: Expr) -> Expr {
        let single = self.list(vec![element]);
        self.binary(operators::ADD, self.accu(), single)
    }
}
