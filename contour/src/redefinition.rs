//! Redefinition over logical time
//!
//! Every change to a variable's equation set opens a new generation covering
//! `[start, end)`. Generations reference equations by shared handle, so an
//! equation compiled once is reused by every later generation that still
//! contains it. The priority table of a generation is built on first use.

use crate::bestfit::{Candidate, PriorityTable};
use crate::equation::{Definition, Equation, Provenance};
use crate::guard::Readiness;
use crate::system::System;
use crate::{ContourError, ContourResult};
use serde::Serialize;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use tracing::{debug, warn};

/// Half-open logical time range `[start, end)`; `end == None` is open-ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct TimeRange {
    pub start: i64,
    pub end: Option<i64>,
}

impl TimeRange {
    pub fn starting_at(start: i64) -> Self {
        Self { start, end: None }
    }

    pub fn contains(&self, time: i64) -> bool {
        time >= self.start && self.end.map_or(true, |end| time < end)
    }

    pub fn is_open(&self) -> bool {
        self.end.is_none()
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.end {
            Some(end) => write!(f, "[{}, {})", self.start, end),
            None => write!(f, "[{}, ..)", self.start),
        }
    }
}

#[derive(Debug)]
enum EntryState {
    Pending(Definition),
    Ready(Rc<Equation>),
}

/// An installed equation, compiled from its definition on first use
#[derive(Debug)]
pub struct EquationEntry {
    provenance: Provenance,
    state: RefCell<EntryState>,
}

impl EquationEntry {
    pub fn new(provenance: Provenance, definition: Definition) -> Self {
        Self {
            provenance,
            state: RefCell::new(EntryState::Pending(definition)),
        }
    }

    pub fn provenance(&self) -> Provenance {
        self.provenance
    }

    pub fn is_compiled(&self) -> bool {
        matches!(*self.state.borrow(), EntryState::Ready(_))
    }

    /// The compiled equation. A fault leaves the definition in place.
    pub fn equation(&self, system: &System) -> ContourResult<Rc<Equation>> {
        let mut state = self.state.borrow_mut();
        let equation = match &*state {
            EntryState::Ready(equation) => return Ok(equation.clone()),
            EntryState::Pending(definition) => {
                Rc::new(definition.compile(self.provenance, system.compiler(), system.dimensions())?)
            }
        };
        *state = EntryState::Ready(equation.clone());
        Ok(equation)
    }
}

#[derive(Debug)]
enum TableState {
    Pending,
    Building,
    Ready(Rc<PriorityTable>),
}

/// One equation set of a variable, valid over a time range
#[derive(Debug)]
pub struct Generation {
    range: TimeRange,
    members: Vec<Rc<EquationEntry>>,
    table: RefCell<TableState>,
}

impl Generation {
    fn new(range: TimeRange, members: Vec<Rc<EquationEntry>>) -> Self {
        Self {
            range,
            members,
            table: RefCell::new(TableState::Pending),
        }
    }

    pub fn range(&self) -> TimeRange {
        self.range
    }

    pub fn contains(&self, provenance: Provenance) -> bool {
        self.members.iter().any(|entry| entry.provenance() == provenance)
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn is_materialized(&self) -> bool {
        matches!(*self.table.borrow(), TableState::Ready(_))
    }

    /// Priority table, built on first use.
    ///
    /// `Busy` means the table is being built further up the stack: a guard
    /// of this generation depends on the variable itself.
    pub fn table(&self, system: &System, variable: &str) -> ContourResult<Readiness<Rc<PriorityTable>>> {
        match &*self.table.borrow() {
            TableState::Ready(table) => return Ok(Readiness::Ready(table.clone())),
            TableState::Building => return Ok(Readiness::Busy),
            TableState::Pending => {}
        }

        *self.table.borrow_mut() = TableState::Building;
        match self.build(system) {
            Ok(Readiness::Ready(table)) => {
                debug!(variable = %variable, start = self.range.start, equations = table.len(), "generation materialized");
                let table = Rc::new(table);
                *self.table.borrow_mut() = TableState::Ready(table.clone());
                Ok(Readiness::Ready(table))
            }
            Ok(Readiness::Busy) => {
                *self.table.borrow_mut() = TableState::Pending;
                Ok(Readiness::Busy)
            }
            Err(err) => {
                warn!(variable = %variable, start = self.range.start, error = %err, "generation materialization failed");
                *self.table.borrow_mut() = TableState::Pending;
                Err(err)
            }
        }
    }

    fn build(&self, system: &System) -> ContourResult<Readiness<PriorityTable>> {
        let mut table = PriorityTable::new();
        for entry in &self.members {
            let equation = entry.equation(system)?;
            let guard = match equation.guard().compiled(system)? {
                Readiness::Ready(guard) => guard,
                Readiness::Busy => return Ok(Readiness::Busy),
            };
            table.insert(Candidate { equation, guard });
        }
        Ok(Readiness::Ready(table))
    }
}

/// All generations of one variable, ordered by start time
#[derive(Debug)]
pub struct Variable {
    name: String,
    generations: Vec<Generation>,
}

impl Variable {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            generations: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn generations(&self) -> &[Generation] {
        &self.generations
    }

    pub fn latest(&self) -> Option<&Generation> {
        self.generations.last()
    }

    /// Add an equation from `time` on
    pub fn install(&mut self, entry: Rc<EquationEntry>, time: i64) -> ContourResult<()> {
        let mut members = self.current_members(time)?;
        members.push(entry);
        self.open_generation(time, members);
        Ok(())
    }

    /// Drop an equation from `time` on. Returns false when the newest
    /// generation does not contain it.
    pub fn remove(&mut self, provenance: Provenance, time: i64) -> ContourResult<bool> {
        let mut members = self.current_members(time)?;
        let before = members.len();
        members.retain(|entry| entry.provenance() != provenance);
        if members.len() == before {
            return Ok(false);
        }
        self.open_generation(time, members);
        Ok(true)
    }

    /// Swap one equation for another within a single new generation
    pub fn replace(
        &mut self,
        provenance: Provenance,
        entry: Rc<EquationEntry>,
        time: i64,
    ) -> ContourResult<bool> {
        let mut members = self.current_members(time)?;
        let before = members.len();
        members.retain(|member| member.provenance() != provenance);
        if members.len() == before {
            return Ok(false);
        }
        members.push(entry);
        self.open_generation(time, members);
        Ok(true)
    }

    /// Members of the newest generation, after checking `time` does not
    /// precede it
    fn current_members(&self, time: i64) -> ContourResult<Vec<Rc<EquationEntry>>> {
        match self.generations.last() {
            None => Ok(Vec::new()),
            Some(latest) if time < latest.range.start => Err(ContourError::TimeRegression {
                requested: time,
                latest: latest.range.start,
            }),
            Some(latest) => Ok(latest.members.clone()),
        }
    }

    /// Close the newest generation at `time` and open one holding `members`.
    /// A generation starting exactly at `time` is superseded instead.
    fn open_generation(&mut self, time: i64, members: Vec<Rc<EquationEntry>>) {
        if self
            .generations
            .last()
            .is_some_and(|latest| latest.range.start == time)
        {
            self.generations.pop();
        }
        if let Some(latest) = self.generations.last_mut() {
            latest.range.end = Some(time);
        }
        debug!(variable = %self.name, start = time, equations = members.len(), "generation created");
        self.generations
            .push(Generation::new(TimeRange::starting_at(time), members));
    }

    /// Generation valid at `time`.
    ///
    /// The newest generation is checked first. Otherwise short histories are
    /// scanned backward and long ones binary searched.
    pub fn at(&self, time: i64, linear_scan_threshold: usize) -> Option<&Generation> {
        let latest = self.generations.last()?;
        if latest.range.contains(time) {
            return Some(latest);
        }
        let first = self.generations.first()?;
        if time < first.range.start || latest.range.end.is_some_and(|end| time >= end) {
            return None;
        }
        if self.generations.len() < linear_scan_threshold {
            return self
                .generations
                .iter()
                .rev()
                .find(|generation| generation.range.contains(time));
        }
        let after = self
            .generations
            .partition_point(|generation| generation.range.start <= time);
        after
            .checked_sub(1)
            .map(|index| &self.generations[index])
            .filter(|generation| generation.range.contains(time))
    }
}
