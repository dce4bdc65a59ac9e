//! Best-fit selection
//!
//! The equations of one generation are grouped by priority. Resolution scans
//! priorities from highest to lowest; the first priority with an applicable
//! equation decides the result, and lower priorities are never consulted.
//!
//! Within that priority the most specific region wins: a candidate is best when
//! its region refines every other applicable region. Equally specific
//! candidates fall back to the newest installation; incomparable ones are
//! ambiguous.

use crate::context::Context;
use crate::equation::{Equation, Provenance};
use crate::guard::{CompiledGuard, GuardOutcome};
use crate::system::System;
use crate::tuple::Tuple;
use crate::value::{Demand, Special, Value};
use crate::ContourResult;
use std::collections::BTreeMap;
use std::rc::Rc;
use tracing::{debug, trace};

/// An equation together with its compiled guard
#[derive(Debug, Clone)]
pub struct Candidate {
    pub equation: Rc<Equation>,
    pub guard: Rc<CompiledGuard>,
}

impl Candidate {
    pub fn provenance(&self) -> Provenance {
        self.equation.provenance()
    }
}

/// Equations of one generation grouped by priority
///
/// Each priority keeps its candidates in ascending provenance order.
#[derive(Debug, Clone, Default)]
pub struct PriorityTable {
    levels: BTreeMap<i64, Vec<Candidate>>,
}

impl PriorityTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, candidate: Candidate) {
        let level = self.levels.entry(candidate.guard.priority()).or_default();
        let at = level.partition_point(|c| c.provenance() < candidate.provenance());
        level.insert(at, candidate);
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    pub fn len(&self) -> usize {
        self.levels.values().map(Vec::len).sum()
    }

    /// Priorities present, highest first
    pub fn priorities(&self) -> impl Iterator<Item = i64> + '_ {
        self.levels.keys().rev().copied()
    }

    fn descending(&self) -> impl Iterator<Item = (&i64, &Vec<Candidate>)> {
        self.levels.iter().rev()
    }

    /// Select and evaluate the best equation at the full context `k`
    pub fn resolve(&self, system: &System, variable: &str, k: &mut Context) -> ContourResult<Value> {
        for (priority, level) in self.descending() {
            trace!(variable = %variable, priority = *priority, candidates = level.len(), "scanning priority");

            let mut applicable = Vec::new();
            for candidate in level {
                let region = match candidate.guard.evaluate(system, k)? {
                    GuardOutcome::Region(region) => region,
                    GuardOutcome::NotApplicable | GuardOutcome::Demand(_) => continue,
                };
                if !region.applicable_in(k) {
                    continue;
                }
                if let Some(boolean) = candidate.equation.boolean() {
                    if boolean.evaluate(system, k)? != Value::Boolean(true) {
                        continue;
                    }
                }
                applicable.push((candidate, region));
            }

            if applicable.is_empty() {
                continue;
            }
            return match select(&applicable) {
                Some(chosen) => {
                    debug!(variable = %variable, priority = *priority, provenance = %chosen.provenance(), "best fit selected");
                    chosen.equation.body().evaluate(system, k)
                }
                None => {
                    debug!(variable = %variable, priority = *priority, applicable = applicable.len(), "ambiguous best fit");
                    Ok(Value::Special(Special::MultipleDefinitions))
                }
            };
        }

        debug!(variable = %variable, "no applicable equation");
        Ok(Value::Special(Special::Undefined))
    }

    /// Select and evaluate the best equation at `kappa`, using only what
    /// `delta` knows.
    ///
    /// Returns a demand as soon as a guard or boolean at the priority being
    /// scanned needs a dimension `delta` lacks, and again when an applicable
    /// region constrains dimensions `delta` lacks.
    pub fn resolve_known(
        &self,
        system: &System,
        variable: &str,
        kappa: &mut Context,
        delta: &mut Context,
    ) -> ContourResult<Value> {
        for (priority, level) in self.descending() {
            trace!(variable = %variable, priority = *priority, candidates = level.len(), "scanning priority");

            let mut applicable = Vec::new();
            for candidate in level {
                let region = match candidate.guard.evaluate_known(system, kappa, delta)? {
                    GuardOutcome::Region(region) => region,
                    GuardOutcome::NotApplicable => continue,
                    GuardOutcome::Demand(demand) => {
                        trace!(variable = %variable, priority = *priority, %demand, "guard demands");
                        return Ok(Value::Demand(demand));
                    }
                };
                if !region.applicable_in(kappa) {
                    continue;
                }
                if let Some(boolean) = candidate.equation.boolean() {
                    match boolean.evaluate_known(system, kappa, delta)? {
                        Value::Boolean(true) => {}
                        Value::Demand(demand) => {
                            trace!(variable = %variable, priority = *priority, %demand, "boolean demands");
                            return Ok(Value::Demand(demand));
                        }
                        _ => continue,
                    }
                }
                applicable.push((candidate, region));
            }

            if applicable.is_empty() {
                continue;
            }

            let known: &Context = delta;
            let missing: Demand = applicable
                .iter()
                .flat_map(|(_, region)| region.unbound_in(known))
                .collect();
            if !missing.is_empty() {
                trace!(variable = %variable, priority = *priority, demand = %missing, "regions demand");
                return Ok(Value::Demand(missing));
            }

            return match select(&applicable) {
                Some(chosen) => {
                    debug!(variable = %variable, priority = *priority, provenance = %chosen.provenance(), "best fit selected");
                    chosen.equation.body().evaluate_known(system, kappa, delta)
                }
                None => {
                    debug!(variable = %variable, priority = *priority, applicable = applicable.len(), "ambiguous best fit");
                    Ok(Value::Special(Special::MultipleDefinitions))
                }
            };
        }

        debug!(variable = %variable, "no applicable equation");
        Ok(Value::Special(Special::Undefined))
    }
}

/// The unique best candidate, or `None` when the applicable regions are
/// incomparable.
///
/// `applicable` is in ascending provenance order.
pub fn select<'a>(applicable: &[(&'a Candidate, Tuple)]) -> Option<&'a Candidate> {
    if let [(only, _)] = applicable {
        return Some(*only);
    }
    applicable
        .iter()
        .enumerate()
        .filter(|(i, (_, region))| {
            applicable
                .iter()
                .enumerate()
                .all(|(j, (_, other))| *i == j || region.refines(other))
        })
        .map(|(_, (candidate, _))| *candidate)
        .max_by_key(|candidate| candidate.provenance())
}
