//! Tuples and regions
//!
//! A tuple is an immutable mapping from dimension to value. The same type
//! serves as a context snapshot and as the region an equation applies to;
//! in a region a dimension can be constrained by a `Value::Range` instead of
//! a single value.

use crate::context::Context;
use crate::dimension::{Dim, DimensionSpace};
use crate::value::Value;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Tuple {
    entries: BTreeMap<Dim, Value>,
}

impl Tuple {
    pub fn new() -> Self {
        Self::default()
    }

    /// A copy of this tuple with one more binding (replacing any existing one)
    pub fn with(mut self, dim: Dim, value: Value) -> Self {
        self.entries.insert(dim, value);
        self
    }

    pub fn get(&self, dim: Dim) -> Option<&Value> {
        self.entries.get(&dim)
    }

    pub fn contains(&self, dim: Dim) -> bool {
        self.entries.contains_key(&dim)
    }

    pub fn dims(&self) -> impl Iterator<Item = Dim> + '_ {
        self.entries.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Dim, &Value)> + '_ {
        self.entries.iter().map(|(dim, value)| (*dim, value))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether this region refines `other`.
    ///
    /// Every dimension `other` constrains must also be constrained here, with
    /// a value or interval contained in `other`'s. Dimensions only this region
    /// constrains make it more specific, never less.
    pub fn refines(&self, other: &Tuple) -> bool {
        other.entries.iter().all(|(dim, constraint)| {
            self.entries
                .get(dim)
                .is_some_and(|mine| constraint.admits(mine))
        })
    }

    /// Whether the context lies inside this region
    pub fn applicable_in(&self, context: &Context) -> bool {
        self.entries.iter().all(|(dim, constraint)| {
            context
                .get(*dim)
                .is_some_and(|value| !value.is_exceptional() && constraint.admits(value))
        })
    }

    /// Dimensions this region constrains that the context does not bind
    pub fn unbound_in<'a>(&'a self, context: &'a Context) -> impl Iterator<Item = Dim> + 'a {
        self.dims().filter(move |dim| !context.contains(*dim))
    }

    /// Render with dimension names from `space`
    pub fn describe(&self, space: &DimensionSpace) -> String {
        let parts: Vec<String> = self
            .entries
            .iter()
            .map(|(dim, value)| format!("{} <- {}", space.describe(*dim), value))
            .collect();
        format!("[{}]", parts.join(", "))
    }
}

impl FromIterator<(Dim, Value)> for Tuple {
    fn from_iter<I: IntoIterator<Item = (Dim, Value)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

impl Extend<(Dim, Value)> for Tuple {
    fn extend<I: IntoIterator<Item = (Dim, Value)>>(&mut self, iter: I) {
        self.entries.extend(iter);
    }
}

impl fmt::Display for Tuple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, (dim, value)) in self.entries.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{} <- {}", dim, value)?;
        }
        write!(f, "]")
    }
}
