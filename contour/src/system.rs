//! Equation store and resolution entry points
//!
//! Equations are installed at a logical time and resolved against a context.
//! `resolve` reads the full context; `resolve_known` reads only what the
//! known context holds and answers with a demand when it needs more, and
//! `fulfil` repeats it until a value comes back. Nested resolution is bounded
//! by `max_resolution_depth`.
//!
//! ```
//! use contour::{Context, System, Value};
//!
//! let mut system = System::new();
//! system.define(r#"greeting = "hello""#, 0)?;
//! system.define(r#"greeting @ [lang <- "fr"] = "bonjour""#, 0)?;
//!
//! let lang = system.dim("lang");
//! let mut k = Context::new().with(lang, Value::text("fr"));
//! assert_eq!(system.resolve("greeting", &mut k)?, Value::text("bonjour"));
//! assert_eq!(system.fulfil("greeting", &k)?, Value::text("bonjour"));
//! # Ok::<(), contour::ContourError>(())
//! ```

use crate::context::Context;
use crate::dimension::{Dim, DimensionSpace};
use crate::equation::{Definition, DefinitionCompiler, EquationHandle, Provenance};
use crate::guard::Readiness;
use crate::parser::ReferenceCompiler;
use crate::redefinition::{EquationEntry, TimeRange, Variable};
use crate::value::{Demand, Special, Value};
use crate::{ContourError, ContourResult, ResourceLimits};
use rust_decimal::prelude::ToPrimitive;
use std::cell::Cell;
use std::collections::HashMap;
use std::rc::Rc;
use tracing::debug;

/// Equation store and resolver
///
/// Owns the dimension allocator, every variable's generations and the
/// compiler used for raw definitions. Installation takes `&mut self`;
/// resolution takes `&self` and may compile lazily behind interior
/// mutability.
pub struct System {
    dimensions: Rc<DimensionSpace>,
    variables: HashMap<String, Variable>,
    compiler: Box<dyn DefinitionCompiler>,
    limits: ResourceLimits,
    next_provenance: u64,
    depth: Cell<usize>,
}

impl Default for System {
    fn default() -> Self {
        Self::new()
    }
}

impl System {
    pub fn new() -> Self {
        Self::with_limits(ResourceLimits::default())
    }

    pub fn with_limits(limits: ResourceLimits) -> Self {
        let compiler = ReferenceCompiler::new(limits.clone());
        Self::with_compiler(Box::new(compiler), limits)
    }

    pub fn with_compiler(compiler: Box<dyn DefinitionCompiler>, limits: ResourceLimits) -> Self {
        Self {
            dimensions: Rc::new(DimensionSpace::new()),
            variables: HashMap::new(),
            compiler,
            limits,
            next_provenance: 0,
            depth: Cell::new(0),
        }
    }

    pub fn dimensions(&self) -> &DimensionSpace {
        &self.dimensions
    }

    /// Shared handle to the dimension allocator
    pub fn dimension_space(&self) -> Rc<DimensionSpace> {
        self.dimensions.clone()
    }

    /// Dimension for a name, allocating it on first use
    pub fn dim(&self, name: &str) -> Dim {
        self.dimensions.intern_name(name)
    }

    pub fn limits(&self) -> &ResourceLimits {
        &self.limits
    }

    pub(crate) fn compiler(&self) -> &dyn DefinitionCompiler {
        self.compiler.as_ref()
    }

    /// Install an equation for `name`, effective from logical time `time`
    pub fn install_equation(
        &mut self,
        name: &str,
        definition: Definition,
        time: i64,
    ) -> ContourResult<EquationHandle> {
        self.check_source_size(&definition)?;
        let provenance = self.allocate_provenance();
        let entry = Rc::new(EquationEntry::new(provenance, definition));
        self.variables
            .entry(name.to_string())
            .or_insert_with(|| Variable::new(name))
            .install(entry, time)?;

        debug!(variable = %name, time, provenance = %provenance, "equation installed");
        Ok(EquationHandle {
            variable: name.to_string(),
            provenance,
        })
    }

    /// Parse and install a whole equation line such as `x @ [d <- 1] = 2`
    pub fn define(&mut self, source: &str, time: i64) -> ContourResult<EquationHandle> {
        if source.len() > self.limits.max_source_bytes {
            return Err(ContourError::limit_exceeded(
                "max_source_bytes",
                self.limits.max_source_bytes,
                source.len(),
                "Split the definition into smaller equations",
            ));
        }
        let (name, definition) = self.compiler.compile_equation(source, &self.dimensions)?;
        self.install_equation(&name, definition, time)
    }

    /// Remove an equation from `time` on.
    ///
    /// Returns false when the equation is not active in the newest
    /// generation of its variable.
    pub fn delete_equation(&mut self, handle: &EquationHandle, time: i64) -> ContourResult<bool> {
        let Some(variable) = self.variables.get_mut(&handle.variable) else {
            return Ok(false);
        };
        let removed = variable.remove(handle.provenance, time)?;
        if removed {
            debug!(variable = %handle.variable, time, provenance = %handle.provenance, "equation deleted");
        }
        Ok(removed)
    }

    /// Replace an equation with a new definition from `time` on, in a single
    /// generation
    pub fn replace_equation(
        &mut self,
        handle: &EquationHandle,
        definition: Definition,
        time: i64,
    ) -> ContourResult<EquationHandle> {
        self.check_source_size(&definition)?;
        let Some(variable) = self.variables.get(&handle.variable) else {
            return Err(ContourError::Engine(format!("Unknown variable '{}'", handle.variable)));
        };
        if !variable.latest().is_some_and(|g| g.contains(handle.provenance)) {
            return Err(ContourError::Engine(format!("Equation {} is not active", handle)));
        }

        let provenance = self.allocate_provenance();
        let entry = Rc::new(EquationEntry::new(provenance, definition));
        if let Some(variable) = self.variables.get_mut(&handle.variable) {
            variable.replace(handle.provenance, entry, time)?;
        }

        debug!(variable = %handle.variable, time, replaced = %handle.provenance, provenance = %provenance, "equation replaced");
        Ok(EquationHandle {
            variable: handle.variable.clone(),
            provenance,
        })
    }

    /// Value of `name` at the full context `k`
    pub fn resolve(&self, name: &str, k: &mut Context) -> ContourResult<Value> {
        let _depth = self.enter()?;
        let time = match k.get(Dim::TIME) {
            None => None,
            Some(value) => match logical_time(value) {
                Ok(time) => Some(time),
                Err(exceptional) => return Ok(exceptional),
            },
        };
        let Some(variable) = self.variables.get(name) else {
            return Ok(Value::Special(Special::Undefined));
        };
        match self.table_at(variable, time)? {
            Ok(table) => table.resolve(self, name, k),
            Err(exceptional) => Ok(exceptional),
        }
    }

    /// Value of `name` at `kappa`, reading only what `delta` already knows.
    ///
    /// `delta` must be a restriction of `kappa`. When more context is needed
    /// the result is a demand naming the missing dimensions.
    pub fn resolve_known(
        &self,
        name: &str,
        kappa: &mut Context,
        delta: &mut Context,
    ) -> ContourResult<Value> {
        if self.depth.get() == 0 {
            delta
                .check_restriction_of(kappa)
                .map_err(ContourError::InconsistentContexts)?;
        }
        let _depth = self.enter()?;
        let time = match delta.get(Dim::TIME) {
            Some(value) => match logical_time(value) {
                Ok(time) => Some(time),
                Err(exceptional) => return Ok(exceptional),
            },
            None if kappa.contains(Dim::TIME) => {
                return Ok(Value::Demand(Demand::single(Dim::TIME)));
            }
            None => None,
        };
        let Some(variable) = self.variables.get(name) else {
            return Ok(Value::Special(Special::Undefined));
        };
        match self.table_at(variable, time)? {
            Ok(table) => table.resolve_known(self, name, kappa, delta),
            Err(exceptional) => Ok(exceptional),
        }
    }

    /// Drive two-context resolution to completion, copying each demanded
    /// dimension from `kappa` into the known context
    pub fn fulfil(&self, name: &str, kappa: &Context) -> ContourResult<Value> {
        let mut delta = Context::new();
        loop {
            let mut full = kappa.clone();
            let mut known = delta.clone();
            let demand = match self.resolve_known(name, &mut full, &mut known)? {
                Value::Demand(demand) => demand,
                value => return Ok(value),
            };

            let before = delta.len();
            for dim in demand.dims() {
                match kappa.get(dim) {
                    Some(value) => delta.bind(dim, value.clone()),
                    None => return Ok(Value::Special(Special::DimensionError)),
                }
            }
            if delta.len() == before {
                return Ok(Value::Special(Special::DimensionError));
            }
        }
    }

    /// Names of every variable with at least one installation
    pub fn variables(&self) -> impl Iterator<Item = &str> + '_ {
        self.variables.keys().map(String::as_str)
    }

    /// Time ranges of a variable's generations, oldest first
    pub fn generation_ranges(&self, name: &str) -> Vec<TimeRange> {
        self.variables
            .get(name)
            .map(|variable| variable.generations().iter().map(|g| g.range()).collect())
            .unwrap_or_default()
    }

    /// Whether the equation is part of its variable's generation at `time`
    pub fn is_active(&self, handle: &EquationHandle, time: i64) -> bool {
        self.variables
            .get(&handle.variable)
            .and_then(|variable| variable.at(time, self.limits.linear_scan_threshold))
            .is_some_and(|generation| generation.contains(handle.provenance))
    }

    /// Whether the generation of `name` valid at `time` has built its
    /// priority table
    pub fn is_materialized(&self, name: &str, time: i64) -> bool {
        self.variables
            .get(name)
            .and_then(|variable| variable.at(time, self.limits.linear_scan_threshold))
            .is_some_and(|generation| generation.is_materialized())
    }

    /// Priority table of the generation valid at `time`, or the special to
    /// return in its place
    fn table_at(
        &self,
        variable: &Variable,
        time: Option<i64>,
    ) -> ContourResult<Result<Rc<crate::bestfit::PriorityTable>, Value>> {
        let generation = match time {
            Some(time) => variable.at(time, self.limits.linear_scan_threshold),
            None => variable.latest(),
        };
        let Some(generation) = generation else {
            return Ok(Err(Value::Special(Special::Undefined)));
        };
        Ok(match generation.table(self, variable.name())? {
            Readiness::Ready(table) => Ok(table),
            Readiness::Busy => Err(Value::Special(Special::EvaluationLoop)),
        })
    }

    fn allocate_provenance(&mut self) -> Provenance {
        let provenance = Provenance::new(self.next_provenance);
        self.next_provenance += 1;
        provenance
    }

    fn check_source_size(&self, definition: &Definition) -> ContourResult<()> {
        let bytes = definition.source_bytes();
        if bytes > self.limits.max_source_bytes {
            return Err(ContourError::limit_exceeded(
                "max_source_bytes",
                self.limits.max_source_bytes,
                bytes,
                "Split the definition into smaller equations",
            ));
        }
        Ok(())
    }

    fn enter(&self) -> ContourResult<DepthGuard<'_>> {
        let depth = self.depth.get() + 1;
        if depth > self.limits.max_resolution_depth {
            return Err(ContourError::limit_exceeded(
                "max_resolution_depth",
                self.limits.max_resolution_depth,
                depth,
                "Check for equations that refer to themselves without a base case",
            ));
        }
        self.depth.set(depth);
        Ok(DepthGuard(&self.depth))
    }
}

/// Decrements the resolution depth when dropped
struct DepthGuard<'a>(&'a Cell<usize>);

impl Drop for DepthGuard<'_> {
    fn drop(&mut self) {
        self.0.set(self.0.get().saturating_sub(1));
    }
}

/// Logical time bound in a context: an integral number
fn logical_time(value: &Value) -> Result<i64, Value> {
    match value {
        Value::Number(n) if n.fract().is_zero() => {
            n.to_i64().ok_or(Value::Special(Special::TypeError))
        }
        Value::Special(_) | Value::Demand(_) => Err(value.clone()),
        _ => Err(Value::Special(Special::TypeError)),
    }
}
