#![allow(dead_code)]

use once_cell::sync::Lazy;
use predica::{Activation, EmptyActivation, Engine, EngineOptions, Expr, ExprFactory, Value};

pub static ENGINE: Lazy<Engine> =
    Lazy::new(|| Engine::with_standard_library(EngineOptions::default()).unwrap());

pub fn eval(expr: Expr) -> Value {
    eval_with(expr, &EmptyActivation)
}

pub fn eval_with(expr: Expr, activation: &dyn Activation) -> Value {
    ENGINE.compile(expr).unwrap().evaluate(activation).unwrap()
}

/// Declares a test that builds an expression with an `ExprFactory` bound to
/// `$f`, evaluates it without variables and compares the result.
macro_rules! eval_case {
    ($name:ident, |$f:ident| $expr:expr, $expected:expr $(,)?) => {
        #[test]
        fn $name() {
            let $f = predica::ExprFactory::new();
            let actual = crate::cases::eval($expr);
            pretty_assertions::assert_eq!(actual, $expected);
        }
    };
}

pub fn ints(f: &ExprFactory, values: &[i64]) -> Expr {
    f.list(values.iter().map(|&v| f.int(v)).collect())
}

pub fn int_list(values: &[i64]) -> Value {
    Value::list(values.iter().map(|&v| Value::Int(v)))
}
