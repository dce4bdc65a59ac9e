//! Values flowing through evaluation
//!
//! Ordinary data, specials and demands are all plain values: an operator that
//! receives a special or a demand passes it on instead of failing.

use crate::dimension::Dim;
use crate::tuple::Tuple;
use rust_decimal::Decimal;
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt;

/// A value produced by evaluation
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Value {
    Number(Decimal),
    Text(String),
    Boolean(bool),
    Dimension(Dim),
    Tuple(Tuple),
    Range(Range),
    Special(Special),
    Demand(Demand),
}

/// Type discriminant of a [`Value`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueKind {
    Number,
    Text,
    Boolean,
    Dimension,
    Tuple,
    Range,
    Special,
    Demand,
}

impl ValueKind {
    pub fn name(&self) -> &'static str {
        match self {
            ValueKind::Number => "number",
            ValueKind::Text => "text",
            ValueKind::Boolean => "boolean",
            ValueKind::Dimension => "dimension",
            ValueKind::Tuple => "tuple",
            ValueKind::Range => "range",
            ValueKind::Special => "special",
            ValueKind::Demand => "demand",
        }
    }
}

/// Sentinel failure values
///
/// Declaration order is severity order: when several operands are special at
/// once the greatest one is reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Special {
    /// No equation applies in the context
    Undefined,
    /// Several equally specific equations apply
    MultipleDefinitions,
    /// A dimension could not be resolved
    DimensionError,
    /// Illegal backward-time context change
    AccessError,
    TypeError,
    ArithmeticError,
    /// A typed constant's text does not parse as its type
    ConstantParseError,
    /// Re-entrant evaluation of a definition being compiled
    EvaluationLoop,
}

impl Special {
    pub fn name(&self) -> &'static str {
        match self {
            Special::Undefined => "undefined",
            Special::MultipleDefinitions => "multiple-definitions",
            Special::DimensionError => "dimension-error",
            Special::AccessError => "access-error",
            Special::TypeError => "type-error",
            Special::ArithmeticError => "arithmetic-error",
            Special::ConstantParseError => "constant-parse-error",
            Special::EvaluationLoop => "evaluation-loop",
        }
    }

    /// The more severe of two specials
    pub fn worst(self, other: Special) -> Special {
        self.max(other)
    }
}

impl fmt::Display for Special {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Dimensions whose values are needed before evaluation can make progress
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Demand(BTreeSet<Dim>);

impl Demand {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(dim: Dim) -> Self {
        Self(BTreeSet::from([dim]))
    }

    pub fn insert(&mut self, dim: Dim) {
        self.0.insert(dim);
    }

    /// Union with another demand
    pub fn merge(&mut self, other: &Demand) {
        self.0.extend(other.0.iter().copied());
    }

    pub fn contains(&self, dim: Dim) -> bool {
        self.0.contains(&dim)
    }

    pub fn dims(&self) -> impl Iterator<Item = Dim> + '_ {
        self.0.iter().copied()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl FromIterator<Dim> for Demand {
    fn from_iter<I: IntoIterator<Item = Dim>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl From<Demand> for Value {
    fn from(demand: Demand) -> Self {
        Value::Demand(demand)
    }
}

impl fmt::Display for Demand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "demand{{")?;
        for (i, dim) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", dim)?;
        }
        write!(f, "}}")
    }
}

/// Closed numeric interval; a missing bound is unbounded
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Range {
    pub lower: Option<Decimal>,
    pub upper: Option<Decimal>,
}

impl Range {
    pub fn new(lower: Option<Decimal>, upper: Option<Decimal>) -> Self {
        Self { lower, upper }
    }

    pub fn unbounded() -> Self {
        Self::new(None, None)
    }

    pub fn contains(&self, value: &Decimal) -> bool {
        self.lower.map_or(true, |lower| lower <= *value)
            && self.upper.map_or(true, |upper| upper >= *value)
    }

    /// Whether `other` lies entirely inside this range
    pub fn encloses(&self, other: &Range) -> bool {
        let lower_ok = match (self.lower, other.lower) {
            (None, _) => true,
            (Some(_), None) => false,
            (Some(mine), Some(theirs)) => mine <= theirs,
        };
        let upper_ok = match (self.upper, other.upper) {
            (None, _) => true,
            (Some(_), None) => false,
            (Some(mine), Some(theirs)) => mine >= theirs,
        };
        lower_ok && upper_ok
    }
}

impl fmt::Display for Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(lower) = self.lower {
            write!(f, "{}", lower.normalize())?;
        }
        write!(f, "..")?;
        if let Some(upper) = self.upper {
            write!(f, "{}", upper.normalize())?;
        }
        Ok(())
    }
}

impl Value {
    pub fn number(n: impl Into<Decimal>) -> Self {
        Value::Number(n.into())
    }

    pub fn text(s: impl Into<String>) -> Self {
        Value::Text(s.into())
    }

    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Number(_) => ValueKind::Number,
            Value::Text(_) => ValueKind::Text,
            Value::Boolean(_) => ValueKind::Boolean,
            Value::Dimension(_) => ValueKind::Dimension,
            Value::Tuple(_) => ValueKind::Tuple,
            Value::Range(_) => ValueKind::Range,
            Value::Special(_) => ValueKind::Special,
            Value::Demand(_) => ValueKind::Demand,
        }
    }

    pub fn is_special(&self) -> bool {
        matches!(self, Value::Special(_))
    }

    pub fn is_demand(&self) -> bool {
        matches!(self, Value::Demand(_))
    }

    /// True for specials and demands, which short-circuit operators
    pub fn is_exceptional(&self) -> bool {
        self.is_special() || self.is_demand()
    }

    pub fn as_number(&self) -> Option<Decimal> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_special(&self) -> Option<Special> {
        match self {
            Value::Special(s) => Some(*s),
            _ => None,
        }
    }

    pub fn as_demand(&self) -> Option<&Demand> {
        match self {
            Value::Demand(d) => Some(d),
            _ => None,
        }
    }

    /// Ordering between comparable values of the same kind
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Number(a), Value::Number(b)) => Some(a.cmp(b)),
            (Value::Text(a), Value::Text(b)) => Some(a.cmp(b)),
            (Value::Boolean(a), Value::Boolean(b)) => Some(a.cmp(b)),
            (Value::Dimension(a), Value::Dimension(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }

    /// Whether this constraint admits `other`: equal values, a number inside
    /// a range, or a range inside a range. A single value never admits a
    /// range, so mutual admission implies equality.
    pub fn admits(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Range(range), Value::Number(n)) => range.contains(n),
            (Value::Range(outer), Value::Range(inner)) => outer.encloses(inner),
            (a, b) => a == b,
        }
    }
}

/// Combine the exceptional operands of an operator.
///
/// Returns `None` when every operand is ordinary data. Otherwise a demand
/// (the union of all operand demands) takes precedence over specials, and the
/// worst special wins among specials.
pub fn propagate<'a>(operands: impl IntoIterator<Item = &'a Value>) -> Option<Value> {
    let mut demand: Option<Demand> = None;
    let mut special: Option<Special> = None;

    for operand in operands {
        match operand {
            Value::Demand(d) => demand.get_or_insert_with(Demand::new).merge(d),
            Value::Special(s) => {
                special = Some(special.map_or(*s, |current| current.worst(*s)));
            }
            _ => {}
        }
    }

    demand
        .map(Value::Demand)
        .or_else(|| special.map(Value::Special))
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(n) => write!(f, "{}", n.normalize()),
            Value::Text(s) => write!(f, "\"{}\"", s),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Dimension(d) => write!(f, "{}", d),
            Value::Tuple(t) => write!(f, "{}", t),
            Value::Range(r) => write!(f, "{}", r),
            Value::Special(s) => write!(f, "special<{}>", s),
            Value::Demand(d) => write!(f, "{}", d),
        }
    }
}
