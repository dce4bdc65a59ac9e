//! Compiled expressions
//!
//! Every compiled expression answers two questions:
//! 1. `evaluate(k)` - what is the value at context `k`?
//! 2. `evaluate_known(kappa, delta)` - what is the value at `kappa`, using
//!    only what is already known in `delta`?
//!
//! The second form never blocks and never reads a dimension `delta` lacks.
//! When it needs one, it returns a [`Value::Demand`] naming the missing
//! dimensions and the caller re-invokes it with a richer `delta`. A demand
//! carries no continuation: re-invocation starts from scratch.

pub mod expression;
pub mod operations;

pub use expression::Expr;
pub use operations::{BinaryOp, UnaryOp};

use crate::context::Context;
use crate::system::System;
use crate::value::Value;
use crate::ContourResult;
use std::fmt;
use std::rc::Rc;

/// The two evaluation entry points of a compiled expression
///
/// `Err` is reserved for fatal configuration faults. Specials and demands are
/// returned as `Ok` values.
pub trait Evaluable: fmt::Debug {
    /// Evaluate at the full context `k`
    fn evaluate(&self, system: &System, k: &mut Context) -> ContourResult<Value>;

    /// Evaluate at `kappa`, reading only dimensions present in `delta`
    fn evaluate_known(
        &self,
        system: &System,
        kappa: &mut Context,
        delta: &mut Context,
    ) -> ContourResult<Value>;
}

/// Shared handle to a compiled expression
///
/// Compiled bodies are shared read-only between the generations of a
/// variable once published.
pub type Compiled = Rc<dyn Evaluable>;
