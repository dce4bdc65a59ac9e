//! Guard compilation
//!
//! A guard is a list of (dimension expression, value expression) pairs. On
//! first use each side is evaluated once in a neutral context to find out
//! whether it is constant, and the pair is filed into one of four buckets.
//! Later evaluations only re-run the non-constant sides and merge them with
//! the pre-folded constant part.

use crate::context::Context;
use crate::dimension::Dim;
use crate::evaluator::expression::dimension_of;
use crate::evaluator::{Compiled, Expr};
use crate::system::System;
use crate::tuple::Tuple;
use crate::value::{Demand, Value};
use crate::{ContourError, ContourResult};
use rust_decimal::prelude::ToPrimitive;
use std::cell::RefCell;
use std::rc::Rc;

/// Uncompiled guard: the pairs of a tuple literal
#[derive(Debug, Clone, Default)]
pub struct GuardSpec {
    pairs: Vec<(Compiled, Compiled)>,
}

impl GuardSpec {
    /// Guard that applies everywhere
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn new(pairs: Vec<(Compiled, Compiled)>) -> Self {
        Self { pairs }
    }

    /// Guard from a tuple literal expression.
    ///
    /// Anything other than a tuple literal is a malformed guard.
    pub fn from_expr(expr: Expr) -> ContourResult<Self> {
        match expr {
            Expr::Tuple(pairs) => Ok(Self {
                pairs: pairs
                    .into_iter()
                    .map(|(dim, value)| (Rc::new(dim) as Compiled, Rc::new(value) as Compiled))
                    .collect(),
            }),
            other => Err(ContourError::MalformedGuard(format!(
                "expected a tuple literal, found {:?}",
                other
            ))),
        }
    }

    /// Guard binding constant dimensions to constant values
    pub fn from_tuple(tuple: &Tuple) -> Self {
        Self {
            pairs: tuple
                .iter()
                .map(|(dim, value)| {
                    (
                        Rc::new(Expr::Constant(Value::Dimension(dim))) as Compiled,
                        Rc::new(Expr::Constant(value.clone())) as Compiled,
                    )
                })
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Partition the guard by constancy.
    ///
    /// Sides are evaluated against a neutral context at logical time 0 with
    /// nothing known yet: a side that evaluates without demanding anything is
    /// constant.
    pub fn compile(&self, system: &System) -> ContourResult<CompiledGuard> {
        let neutral = Context::new().with(Dim::TIME, Value::number(0));
        let mut compiled = CompiledGuard::default();

        for (dim_expr, value_expr) in &self.pairs {
            let dim_side = dim_expr.evaluate_known(system, &mut neutral.clone(), &mut Context::new())?;
            let value_side =
                value_expr.evaluate_known(system, &mut neutral.clone(), &mut Context::new())?;

            let dim = if dim_side.is_demand() {
                None
            } else {
                match dimension_of(system, &dim_side) {
                    Ok(dim) => Some(dim),
                    Err(_) => {
                        compiled.never = true;
                        continue;
                    }
                }
            };
            let value_constant = !value_side.is_demand();
            if value_constant && value_side.is_special() {
                compiled.never = true;
                continue;
            }

            match (dim, value_constant) {
                (Some(dim), true) => {
                    if compiled.constant.contains(dim) {
                        return Err(ContourError::MalformedGuard(format!(
                            "dimension {} constrained twice",
                            system.dimensions().describe(dim)
                        )));
                    }
                    compiled.constant = compiled.constant.with(dim, value_side);
                }
                (Some(dim), false) => {
                    if dim == Dim::PRIORITY {
                        return Err(ContourError::InvalidPriority(
                            "priority must be a constant".to_string(),
                        ));
                    }
                    compiled.varying_value.push((dim, value_expr.clone()));
                }
                (None, true) => compiled.varying_dim.push((dim_expr.clone(), value_side)),
                (None, false) => compiled
                    .varying_both
                    .push((dim_expr.clone(), value_expr.clone())),
            }
        }

        compiled.extract_priority()?;
        Ok(compiled)
    }
}

/// Result of evaluating a compiled guard in a context
#[derive(Debug, Clone, PartialEq)]
pub enum GuardOutcome {
    /// Fully determined region
    Region(Tuple),
    /// A side evaluated to a special; the equation does not apply here
    NotApplicable,
    /// More context is needed before the region is known
    Demand(Demand),
}

/// A guard partitioned into its four constancy buckets
#[derive(Debug, Clone, Default)]
pub struct CompiledGuard {
    /// Constant dimension, constant value
    constant: Tuple,
    /// Constant dimension, varying value
    varying_value: Vec<(Dim, Compiled)>,
    /// Varying dimension, constant value
    varying_dim: Vec<(Compiled, Value)>,
    /// Both sides varying
    varying_both: Vec<(Compiled, Compiled)>,
    priority: i64,
    /// A constant side was special
    never: bool,
}

impl CompiledGuard {
    pub fn priority(&self) -> i64 {
        self.priority
    }

    /// Pre-folded constant part of the region
    pub fn constant_region(&self) -> &Tuple {
        &self.constant
    }

    /// Whether the region is fully known without evaluation
    pub fn is_constant(&self) -> bool {
        self.varying_value.is_empty() && self.varying_dim.is_empty() && self.varying_both.is_empty()
    }

    fn extract_priority(&mut self) -> ContourResult<()> {
        let Some(value) = self.constant.get(Dim::PRIORITY).cloned() else {
            return Ok(());
        };
        let priority = value
            .as_number()
            .filter(|n| n.fract().is_zero())
            .and_then(|n| n.to_i64())
            .ok_or_else(|| {
                ContourError::InvalidPriority(format!("expected an integer, found {}", value))
            })?;
        self.priority = priority;
        self.constant = self
            .constant
            .iter()
            .filter(|(dim, _)| *dim != Dim::PRIORITY)
            .map(|(dim, value)| (dim, value.clone()))
            .collect();
        Ok(())
    }

    /// Region at the full context `k`
    pub fn evaluate(&self, system: &System, k: &mut Context) -> ContourResult<GuardOutcome> {
        self.evaluate_with(system, &mut |expr: &Compiled| expr.evaluate(system, &mut *k))
    }

    /// Region at `kappa` using only what `delta` knows
    pub fn evaluate_known(
        &self,
        system: &System,
        kappa: &mut Context,
        delta: &mut Context,
    ) -> ContourResult<GuardOutcome> {
        self.evaluate_with(system, &mut |expr: &Compiled| {
            expr.evaluate_known(system, &mut *kappa, &mut *delta)
        })
    }

    fn evaluate_with(
        &self,
        system: &System,
        eval: &mut dyn FnMut(&Compiled) -> ContourResult<Value>,
    ) -> ContourResult<GuardOutcome> {
        if self.never {
            return Ok(GuardOutcome::NotApplicable);
        }
        if self.is_constant() {
            return Ok(GuardOutcome::Region(self.constant.clone()));
        }

        // Known-mode evaluation stops at the first pair that needs more context
        let mut demand = Demand::new();
        let mut special = false;
        let mut region = self.constant.clone();

        for (dim, value_expr) in &self.varying_value {
            let value = eval(value_expr)?;
            record(&mut region, &mut demand, &mut special, Ok(*dim), value);
            if !demand.is_empty() {
                return Ok(GuardOutcome::Demand(demand));
            }
        }
        for (dim_expr, value) in &self.varying_dim {
            let dim = dimension_of(system, &eval(dim_expr)?);
            record(&mut region, &mut demand, &mut special, dim, value.clone());
            if !demand.is_empty() {
                return Ok(GuardOutcome::Demand(demand));
            }
        }
        for (dim_expr, value_expr) in &self.varying_both {
            let dim = dimension_of(system, &eval(dim_expr)?);
            let value = eval(value_expr)?;
            record(&mut region, &mut demand, &mut special, dim, value);
            if !demand.is_empty() {
                return Ok(GuardOutcome::Demand(demand));
            }
        }

        if special {
            Ok(GuardOutcome::NotApplicable)
        } else {
            Ok(GuardOutcome::Region(region))
        }
    }
}

/// Fold one evaluated pair into the region under construction
fn record(
    region: &mut Tuple,
    demand: &mut Demand,
    special: &mut bool,
    dim: Result<Dim, Value>,
    value: Value,
) {
    for side in [dim.as_ref().err(), Some(&value)].into_iter().flatten() {
        match side {
            Value::Demand(d) => demand.merge(d),
            Value::Special(_) => *special = true,
            _ => {}
        }
    }
    let Ok(dim) = dim else {
        return;
    };
    if value.is_exceptional() || dim == Dim::PRIORITY {
        return;
    }
    if region.get(dim).is_some_and(|existing| *existing != value) {
        // Conflicting constraints on one dimension can never be met
        *special = true;
        return;
    }
    *region = std::mem::take(region).with(dim, value);
}

/// Outcome of asking for a lazily compiled artefact
#[derive(Debug, Clone)]
pub enum Readiness<T> {
    Ready(T),
    /// Compilation of this artefact is already in progress further up the
    /// stack
    Busy,
}

#[derive(Debug)]
enum GuardState {
    Pending,
    Compiling,
    Compiled(Rc<CompiledGuard>),
}

/// A guard together with its memoized compiled form
#[derive(Debug)]
pub struct Guard {
    spec: GuardSpec,
    state: RefCell<GuardState>,
}

impl Guard {
    pub fn new(spec: GuardSpec) -> Self {
        Self {
            spec,
            state: RefCell::new(GuardState::Pending),
        }
    }

    pub fn spec(&self) -> &GuardSpec {
        &self.spec
    }

    pub fn is_compiled(&self) -> bool {
        matches!(*self.state.borrow(), GuardState::Compiled(_))
    }

    /// Compiled form, compiling on first use.
    ///
    /// A fault leaves the guard uncompiled so the next call retries.
    pub fn compiled(&self, system: &System) -> ContourResult<Readiness<Rc<CompiledGuard>>> {
        match &*self.state.borrow() {
            GuardState::Compiled(compiled) => return Ok(Readiness::Ready(compiled.clone())),
            GuardState::Compiling => return Ok(Readiness::Busy),
            GuardState::Pending => {}
        }

        *self.state.borrow_mut() = GuardState::Compiling;
        match self.spec.compile(system) {
            Ok(compiled) => {
                let compiled = Rc::new(compiled);
                *self.state.borrow_mut() = GuardState::Compiled(compiled.clone());
                Ok(Readiness::Ready(compiled))
            }
            Err(err) => {
                *self.state.borrow_mut() = GuardState::Pending;
                Err(err)
            }
        }
    }
}
