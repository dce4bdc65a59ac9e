use crate::dimension::DimensionSpace;
use crate::evaluator::Compiled;
use crate::guard::{Guard, GuardSpec};
use crate::ContourResult;
use serde::Serialize;
use std::fmt;

/// Installation order of an equation, unique within a [`crate::System`]
///
/// Later installations carry larger provenance and win ties among equally
/// specific equations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Provenance(u64);

impl Provenance {
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for Provenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifies one installed equation of one variable
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct EquationHandle {
    pub variable: String,
    pub provenance: Provenance,
}

impl fmt::Display for EquationHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.variable, self.provenance)
    }
}

/// A definition part, either already compiled or raw text compiled on first use
#[derive(Debug, Clone)]
pub enum Part<T> {
    Compiled(T),
    Raw(String),
}

impl<T> Part<T> {
    pub fn is_raw(&self) -> bool {
        matches!(self, Part::Raw(_))
    }

    fn raw_len(&self) -> usize {
        match self {
            Part::Raw(source) => source.len(),
            Part::Compiled(_) => 0,
        }
    }
}

/// What `install_equation` receives: guard, optional boolean and body
#[derive(Debug, Clone)]
pub struct Definition {
    pub guard: Option<Part<GuardSpec>>,
    pub boolean: Option<Part<Compiled>>,
    pub body: Part<Compiled>,
}

impl Definition {
    /// Unguarded definition with a compiled body
    pub fn new(body: Compiled) -> Self {
        Self {
            guard: None,
            boolean: None,
            body: Part::Compiled(body),
        }
    }

    /// Unguarded definition with a raw body
    pub fn raw(body: impl Into<String>) -> Self {
        Self {
            guard: None,
            boolean: None,
            body: Part::Raw(body.into()),
        }
    }

    pub fn with_guard(mut self, guard: GuardSpec) -> Self {
        self.guard = Some(Part::Compiled(guard));
        self
    }

    pub fn with_raw_guard(mut self, guard: impl Into<String>) -> Self {
        self.guard = Some(Part::Raw(guard.into()));
        self
    }

    pub fn with_boolean(mut self, boolean: Compiled) -> Self {
        self.boolean = Some(Part::Compiled(boolean));
        self
    }

    pub fn with_raw_boolean(mut self, boolean: impl Into<String>) -> Self {
        self.boolean = Some(Part::Raw(boolean.into()));
        self
    }

    /// Whether any part still needs the compiler
    pub fn is_raw(&self) -> bool {
        self.body.is_raw()
            || self.guard.as_ref().is_some_and(Part::is_raw)
            || self.boolean.as_ref().is_some_and(Part::is_raw)
    }

    /// Total size of the raw text parts
    pub fn source_bytes(&self) -> usize {
        self.body.raw_len()
            + self.guard.as_ref().map_or(0, Part::raw_len)
            + self.boolean.as_ref().map_or(0, Part::raw_len)
    }

    /// Compile every raw part. The guard itself stays uncompiled until its
    /// first evaluation.
    pub(crate) fn compile(
        &self,
        provenance: Provenance,
        compiler: &dyn DefinitionCompiler,
        dimensions: &DimensionSpace,
    ) -> ContourResult<Equation> {
        let guard = match &self.guard {
            None => GuardSpec::empty(),
            Some(Part::Compiled(spec)) => spec.clone(),
            Some(Part::Raw(source)) => compiler.compile_guard(source, dimensions)?,
        };
        let boolean = match &self.boolean {
            None => None,
            Some(Part::Compiled(expr)) => Some(expr.clone()),
            Some(Part::Raw(source)) => Some(compiler.compile_expr(source, dimensions)?),
        };
        let body = match &self.body {
            Part::Compiled(expr) => expr.clone(),
            Part::Raw(source) => compiler.compile_expr(source, dimensions)?,
        };
        Ok(Equation {
            provenance,
            guard: Guard::new(guard),
            boolean,
            body,
        })
    }
}

/// Turns raw definition text into compiled parts
///
/// The engine only needs this when raw definitions are installed; the
/// reference implementation is [`crate::parser::ReferenceCompiler`].
pub trait DefinitionCompiler {
    /// Compile a guard tuple
    fn compile_guard(&self, source: &str, dimensions: &DimensionSpace) -> ContourResult<GuardSpec>;

    /// Compile a boolean or body expression
    fn compile_expr(&self, source: &str, dimensions: &DimensionSpace) -> ContourResult<Compiled>;

    /// Split a whole equation line into its variable name and raw definition
    fn compile_equation(
        &self,
        source: &str,
        dimensions: &DimensionSpace,
    ) -> ContourResult<(String, Definition)>;
}

/// A compiled equation: guard, optional boolean and body
#[derive(Debug)]
pub struct Equation {
    provenance: Provenance,
    guard: Guard,
    boolean: Option<Compiled>,
    body: Compiled,
}

impl Equation {
    pub fn provenance(&self) -> Provenance {
        self.provenance
    }

    pub fn guard(&self) -> &Guard {
        &self.guard
    }

    pub fn boolean(&self) -> Option<&Compiled> {
        self.boolean.as_ref()
    }

    pub fn body(&self) -> &Compiled {
        &self.body
    }
}
