//! Evaluation context
//!
//! The context is the point of the multidimensional space an expression is
//! evaluated at. It is changed only through [`Perturbation`] guards, which put
//! back exactly what they overwrote when they go out of scope, whatever the
//! exit path.

use crate::dimension::Dim;
use crate::tuple::Tuple;
use crate::value::{Special, Value};
use std::collections::BTreeMap;
use std::ops::{Deref, DerefMut};

/// Mutable mapping from dimension to value
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Context {
    bindings: BTreeMap<Dim, Value>,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_tuple(tuple: &Tuple) -> Self {
        Self {
            bindings: tuple.iter().map(|(dim, value)| (dim, value.clone())).collect(),
        }
    }

    /// Builder-style permanent binding, for setting up root contexts
    pub fn with(mut self, dim: Dim, value: Value) -> Self {
        self.bindings.insert(dim, value);
        self
    }

    /// Permanently bind a dimension. Scoped changes go through [`Context::perturb`].
    pub fn bind(&mut self, dim: Dim, value: Value) {
        self.bindings.insert(dim, value);
    }

    pub fn get(&self, dim: Dim) -> Option<&Value> {
        self.bindings.get(&dim)
    }

    /// Value of a dimension, or `dimension-error` when it is unbound
    pub fn lookup(&self, dim: Dim) -> Value {
        self.bindings
            .get(&dim)
            .cloned()
            .unwrap_or(Value::Special(Special::DimensionError))
    }

    pub fn contains(&self, dim: Dim) -> bool {
        self.bindings.contains_key(&dim)
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    pub fn dims(&self) -> impl Iterator<Item = Dim> + '_ {
        self.bindings.keys().copied()
    }

    /// Immutable copy of the current bindings
    pub fn snapshot(&self) -> Tuple {
        self.bindings
            .iter()
            .map(|(dim, value)| (*dim, value.clone()))
            .collect()
    }

    /// Check that every binding here is also in `full` with the same value.
    ///
    /// Returns the first dimension that breaks the restriction.
    pub fn check_restriction_of(&self, full: &Context) -> Result<(), Dim> {
        for (dim, value) in &self.bindings {
            if full.bindings.get(dim) != Some(value) {
                return Err(*dim);
            }
        }
        Ok(())
    }

    /// Temporarily rebind dimensions until the returned guard is dropped
    pub fn perturb<I>(&mut self, bindings: I) -> Perturbation<'_>
    where
        I: IntoIterator<Item = (Dim, Value)>,
    {
        let mut saved = Vec::new();
        for (dim, value) in bindings {
            let previous = self.bindings.insert(dim, value);
            saved.push((dim, previous));
        }
        Perturbation {
            context: self,
            saved,
        }
    }

    /// Run `f` with dimensions temporarily rebound
    pub fn with_perturbation<I, R>(&mut self, bindings: I, f: impl FnOnce(&mut Context) -> R) -> R
    where
        I: IntoIterator<Item = (Dim, Value)>,
    {
        let mut perturbed = self.perturb(bindings);
        f(&mut perturbed)
    }
}

/// Scope guard for a temporary change to a [`Context`]
///
/// Records, for each dimension it rebinds, the previous value or its absence.
/// Dropping the guard undoes the bindings in reverse order, so nested guards
/// and repeated dimensions unwind to the exact prior state.
pub struct Perturbation<'a> {
    context: &'a mut Context,
    saved: Vec<(Dim, Option<Value>)>,
}

impl Perturbation<'_> {
    /// Dimensions touched by this perturbation, in application order
    pub fn touched(&self) -> impl Iterator<Item = Dim> + '_ {
        self.saved.iter().map(|(dim, _)| *dim)
    }
}

impl Deref for Perturbation<'_> {
    type Target = Context;

    fn deref(&self) -> &Context {
        self.context
    }
}

impl DerefMut for Perturbation<'_> {
    fn deref_mut(&mut self) -> &mut Context {
        self.context
    }
}

impl Drop for Perturbation<'_> {
    fn drop(&mut self) {
        while let Some((dim, previous)) = self.saved.pop() {
            match previous {
                Some(value) => {
                    self.context.bindings.insert(dim, value);
                }
                None => {
                    self.context.bindings.remove(&dim);
                }
            }
        }
    }
}
