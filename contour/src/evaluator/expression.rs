//! Expression evaluation
//!
//! `Expr` is the compiled form produced by the reference compiler. Both
//! evaluation entry points share one recursive walk, parameterised by the
//! contexts in play.

use super::operations::{binary_operation, unary_operation, BinaryOp, UnaryOp};
use super::Evaluable;
use crate::context::Context;
use crate::dimension::Dim;
use crate::system::System;
use crate::tuple::Tuple;
use crate::value::{propagate, Demand, Range, Special, Value};
use crate::ContourResult;

/// A compiled expression tree
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Constant(Value),
    /// `#e`: the value of the dimension `e` evaluates to
    Query(Box<Expr>),
    /// Reference to another variable, resolved by best fit
    Variable(String),
    Unary(UnaryOp, Box<Expr>),
    Binary(Box<Expr>, BinaryOp, Box<Expr>),
    If {
        condition: Box<Expr>,
        then: Box<Expr>,
        otherwise: Box<Expr>,
    },
    /// Tuple literal `[d <- v, ...]`
    Tuple(Vec<(Expr, Expr)>),
    /// Range literal `lo..hi`, either bound optional
    Range(Option<Box<Expr>>, Option<Box<Expr>>),
    /// Context change `e @ [d <- v, ...]`
    At(Box<Expr>, Vec<(Expr, Expr)>),
}

/// Which contexts an evaluation runs against
enum Mode<'a> {
    Full(&'a mut Context),
    Known {
        kappa: &'a mut Context,
        delta: &'a mut Context,
    },
}

impl Mode<'_> {
    fn reborrow(&mut self) -> Mode<'_> {
        match self {
            Mode::Full(k) => Mode::Full(&mut **k),
            Mode::Known { kappa, delta } => Mode::Known {
                kappa: &mut **kappa,
                delta: &mut **delta,
            },
        }
    }

    /// The value of `dim`, or what is missing to know it
    fn query(&self, dim: Dim) -> Value {
        match self {
            Mode::Full(k) => k.lookup(dim),
            Mode::Known { delta, .. } => match delta.get(dim) {
                Some(value) => value.clone(),
                None => Value::Demand(Demand::single(dim)),
            },
        }
    }
}

impl Expr {
    pub fn constant(value: Value) -> Self {
        Expr::Constant(value)
    }

    pub fn query(dim: Dim) -> Self {
        Expr::Query(Box::new(Expr::Constant(Value::Dimension(dim))))
    }

    pub fn variable(name: impl Into<String>) -> Self {
        Expr::Variable(name.into())
    }

    pub fn binary(left: Expr, op: BinaryOp, right: Expr) -> Self {
        Expr::Binary(Box::new(left), op, Box::new(right))
    }

    pub fn at(body: Expr, bindings: Vec<(Expr, Expr)>) -> Self {
        Expr::At(Box::new(body), bindings)
    }

    fn eval(&self, system: &System, mut mode: Mode<'_>) -> ContourResult<Value> {
        match self {
            Expr::Constant(value) => Ok(value.clone()),

            Expr::Query(dim_expr) => {
                let dim_value = dim_expr.eval(system, mode.reborrow())?;
                match dimension_of(system, &dim_value) {
                    Ok(dim) => Ok(mode.query(dim)),
                    Err(exceptional) => Ok(exceptional),
                }
            }

            Expr::Variable(name) => match mode {
                Mode::Full(k) => system.resolve(name, k),
                Mode::Known { kappa, delta } => system.resolve_known(name, kappa, delta),
            },

            Expr::Unary(op, operand) => {
                let value = operand.eval(system, mode)?;
                if value.is_exceptional() {
                    return Ok(value);
                }
                Ok(unary_operation(*op, &value))
            }

            Expr::Binary(left, op, right) => {
                let left_value = left.eval(system, mode.reborrow())?;
                if op.is_short_circuit() {
                    match (op, &left_value) {
                        (BinaryOp::And, Value::Boolean(false)) => return Ok(Value::Boolean(false)),
                        (BinaryOp::Or, Value::Boolean(true)) => return Ok(Value::Boolean(true)),
                        _ => {}
                    }
                }
                let right_value = right.eval(system, mode)?;
                if let Some(exceptional) = propagate([&left_value, &right_value]) {
                    return Ok(exceptional);
                }
                Ok(binary_operation(&left_value, *op, &right_value))
            }

            Expr::If {
                condition,
                then,
                otherwise,
            } => match condition.eval(system, mode.reborrow())? {
                Value::Boolean(true) => then.eval(system, mode),
                Value::Boolean(false) => otherwise.eval(system, mode),
                exceptional if exceptional.is_exceptional() => Ok(exceptional),
                _ => Ok(Value::Special(Special::TypeError)),
            },

            Expr::Tuple(pairs) => match evaluate_bindings(system, pairs, &mut mode)? {
                Ok(bindings) => Ok(Value::Tuple(bindings.into_iter().collect::<Tuple>())),
                Err(exceptional) => Ok(exceptional),
            },

            Expr::Range(lower, upper) => {
                let lower = match lower {
                    Some(expr) => Some(expr.eval(system, mode.reborrow())?),
                    None => None,
                };
                let upper = match upper {
                    Some(expr) => Some(expr.eval(system, mode)?),
                    None => None,
                };
                if let Some(exceptional) = propagate(lower.iter().chain(upper.iter())) {
                    return Ok(exceptional);
                }
                let bound = |value: Option<Value>| match value {
                    None => Ok(None),
                    Some(Value::Number(n)) => Ok(Some(n)),
                    Some(_) => Err(()),
                };
                match (bound(lower), bound(upper)) {
                    (Ok(lower), Ok(upper)) => Ok(Value::Range(Range::new(lower, upper))),
                    _ => Ok(Value::Special(Special::TypeError)),
                }
            }

            Expr::At(body, pairs) => {
                let bindings = match evaluate_bindings(system, pairs, &mut mode)? {
                    Ok(bindings) => bindings,
                    Err(exceptional) => return Ok(exceptional),
                };
                if let Some(refused) = check_time_access(&mode, &bindings) {
                    return Ok(refused);
                }
                match mode {
                    Mode::Full(k) => {
                        let mut perturbed = k.perturb(bindings);
                        body.eval(system, Mode::Full(&mut perturbed))
                    }
                    Mode::Known { kappa, delta } => {
                        let mut kappa = kappa.perturb(bindings.clone());
                        let mut delta = delta.perturb(bindings);
                        body.eval(
                            system,
                            Mode::Known {
                                kappa: &mut kappa,
                                delta: &mut delta,
                            },
                        )
                    }
                }
            }
        }
    }
}

impl Evaluable for Expr {
    fn evaluate(&self, system: &System, k: &mut Context) -> ContourResult<Value> {
        self.eval(system, Mode::Full(k))
    }

    fn evaluate_known(
        &self,
        system: &System,
        kappa: &mut Context,
        delta: &mut Context,
    ) -> ContourResult<Value> {
        self.eval(system, Mode::Known { kappa, delta })
    }
}

/// Dimension named by a value.
///
/// Specials and demands come back as `Err` so the caller can pass them on.
pub(crate) fn dimension_of(system: &System, value: &Value) -> Result<Dim, Value> {
    match value {
        Value::Dimension(dim) => Ok(*dim),
        Value::Special(_) | Value::Demand(_) => Err(value.clone()),
        other => Ok(system.dimensions().intern_value(other)),
    }
}

/// Evaluate every key and value of a binding list.
///
/// All pairs are evaluated before propagating, so every demand is reported
/// together.
fn evaluate_bindings(
    system: &System,
    pairs: &[(Expr, Expr)],
    mode: &mut Mode<'_>,
) -> ContourResult<Result<Vec<(Dim, Value)>, Value>> {
    let mut evaluated = Vec::with_capacity(pairs.len());
    for (dim_expr, value_expr) in pairs {
        let dim_value = dim_expr.eval(system, mode.reborrow())?;
        let value = value_expr.eval(system, mode.reborrow())?;
        evaluated.push((dim_value, value));
    }

    let operands = evaluated.iter().flat_map(|(d, v)| [d, v]);
    if let Some(exceptional) = propagate(operands) {
        return Ok(Err(exceptional));
    }

    let mut bindings = Vec::with_capacity(evaluated.len());
    for (dim_value, value) in evaluated {
        match dimension_of(system, &dim_value) {
            Ok(dim) => bindings.push((dim, value)),
            Err(exceptional) => return Ok(Err(exceptional)),
        }
    }
    Ok(Ok(bindings))
}

/// A context change may not move logical time backward
fn check_time_access(mode: &Mode<'_>, bindings: &[(Dim, Value)]) -> Option<Value> {
    let (_, target) = bindings.iter().find(|(dim, _)| *dim == Dim::TIME)?;
    let current = match mode {
        Mode::Full(k) => k.get(Dim::TIME).cloned(),
        Mode::Known { kappa, delta } => match delta.get(Dim::TIME) {
            Some(time) => Some(time.clone()),
            None if kappa.contains(Dim::TIME) => {
                return Some(Value::Demand(Demand::single(Dim::TIME)))
            }
            None => None,
        },
    }?;
    match (current.as_number(), target.as_number()) {
        (Some(now), Some(then)) if then < now => Some(Value::Special(Special::AccessError)),
        (Some(_), Some(_)) => None,
        _ => Some(Value::Special(Special::TypeError)),
    }
}
