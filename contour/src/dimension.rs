//! Dimension space
//!
//! A process-scoped bijection between dimension names (or ordinary values
//! used as dimensions) and small integer indices. Indices are handed out once
//! and never reused; the space only grows.

use crate::value::Value;
use serde::Serialize;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;

/// Index of a dimension in the context space
///
/// Built-in dimensions use negative indices; user dimensions start at zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Dim(i32);

impl Dim {
    /// Logical time
    pub const TIME: Dim = Dim(-1);
    /// Equation priority, stripped from guards at compile time
    pub const PRIORITY: Dim = Dim(-2);
    pub const NAME: Dim = Dim(-3);
    pub const ID: Dim = Dim(-4);
    pub const VALUE: Dim = Dim(-5);
    pub const TYPE: Dim = Dim(-6);
    pub const TEXT: Dim = Dim(-7);
    pub const ALL: Dim = Dim(-8);

    const BUILTINS: [(&'static str, Dim); 8] = [
        ("time", Dim::TIME),
        ("priority", Dim::PRIORITY),
        ("name", Dim::NAME),
        ("id", Dim::ID),
        ("value", Dim::VALUE),
        ("type", Dim::TYPE),
        ("text", Dim::TEXT),
        ("all", Dim::ALL),
    ];

    /// Dimension for a raw index. Used by hosts that persist indices; the
    /// index is not registered in any `DimensionSpace`.
    pub const fn from_index(index: i32) -> Dim {
        Dim(index)
    }

    pub fn index(self) -> i32 {
        self.0
    }

    pub fn is_builtin(self) -> bool {
        self.0 < 0
    }
}

impl fmt::Display for Dim {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match Dim::BUILTINS.iter().find(|(_, d)| d == self) {
            Some((name, _)) => write!(f, "{}", name),
            None => write!(f, "dim_{}", self.0),
        }
    }
}

/// What a dimension index was allocated for
#[derive(Debug, Clone, PartialEq)]
pub enum DimensionKey {
    Named(String),
    Typed(Value),
}

#[derive(Debug, Default)]
struct Allocations {
    next: i32,
    named: HashMap<String, Dim>,
    typed: HashMap<Value, Dim>,
    reverse: Vec<DimensionKey>,
}

impl Allocations {
    fn allocate(&mut self, key: DimensionKey) -> Dim {
        let dim = Dim(self.next);
        self.next += 1;
        self.reverse.push(key);
        dim
    }
}

/// Allocator for dimension indices
///
/// Shared by handle (`Rc<DimensionSpace>`) between the system, the compiler
/// and the guard compiler. Interning goes through `&self` because typed
/// dimensions can be discovered in the middle of an evaluation.
#[derive(Debug, Default)]
pub struct DimensionSpace {
    allocations: RefCell<Allocations>,
}

impl DimensionSpace {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index for a dimension name, allocating one on first use
    pub fn intern_name(&self, name: &str) -> Dim {
        if let Some(dim) = Self::builtin(name) {
            return dim;
        }
        let mut allocations = self.allocations.borrow_mut();
        if let Some(dim) = allocations.named.get(name) {
            return *dim;
        }
        let dim = allocations.allocate(DimensionKey::Named(name.to_string()));
        allocations.named.insert(name.to_string(), dim);
        dim
    }

    /// Index for an ordinary value used as a dimension
    ///
    /// A `Value::Dimension` already names its index and is returned as is.
    pub fn intern_value(&self, value: &Value) -> Dim {
        if let Value::Dimension(dim) = value {
            return *dim;
        }
        let mut allocations = self.allocations.borrow_mut();
        if let Some(dim) = allocations.typed.get(value) {
            return *dim;
        }
        let dim = allocations.allocate(DimensionKey::Typed(value.clone()));
        allocations.typed.insert(value.clone(), dim);
        dim
    }

    /// Index for a name that must already exist
    pub fn lookup_name(&self, name: &str) -> Option<Dim> {
        Self::builtin(name).or_else(|| self.allocations.borrow().named.get(name).copied())
    }

    /// What the dimension was allocated for, if it is a user dimension
    pub fn key(&self, dim: Dim) -> Option<DimensionKey> {
        if dim.is_builtin() {
            return Dim::BUILTINS
                .iter()
                .find(|(_, d)| *d == dim)
                .map(|(name, _)| DimensionKey::Named(name.to_string()));
        }
        self.allocations
            .borrow()
            .reverse
            .get(dim.index() as usize)
            .cloned()
    }

    /// Human-readable name for diagnostics
    pub fn describe(&self, dim: Dim) -> String {
        match self.key(dim) {
            Some(DimensionKey::Named(name)) => name,
            Some(DimensionKey::Typed(value)) => format!("<{}>", value),
            None => dim.to_string(),
        }
    }

    /// Number of user dimensions allocated so far
    pub fn len(&self) -> usize {
        self.allocations.borrow().reverse.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn builtin(name: &str) -> Option<Dim> {
        Dim::BUILTINS
            .iter()
            .find(|(builtin, _)| *builtin == name)
            .map(|(_, dim)| *dim)
    }
}
