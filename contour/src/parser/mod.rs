//! Reference definition compiler
//!
//! A small notation for writing equations so the engine can be driven from
//! text:
//!
//! ```text
//! greeting = "hello"
//! greeting @ [lang <- "fr"] = "bonjour"
//! fact @ [n <- 0] = 1
//! fact | #n > 0 = #n * (fact @ [n <- #n - 1])
//! ```
//!
//! `compile_equation` only checks syntax and splits the line into raw parts;
//! each part is lowered when the equation is first used.

use crate::dimension::DimensionSpace;
use crate::equation::{Definition, DefinitionCompiler};
use crate::error::ContourError;
use crate::evaluator::Compiled;
use crate::guard::GuardSpec;
use crate::resource_limits::ResourceLimits;
use crate::ContourResult;
use pest::iterators::Pair;
use pest::Parser;
use pest_derive::Parser;
use std::rc::Rc;

pub mod expressions;
pub mod literals;

use expressions::{single_inner, Lowering};

#[derive(Parser)]
#[grammar = "src/parser/contour.pest"]
pub struct ContourParser;

/// [`DefinitionCompiler`] for the reference notation
#[derive(Debug, Clone, Default)]
pub struct ReferenceCompiler {
    limits: ResourceLimits,
}

impl ReferenceCompiler {
    pub fn new(limits: ResourceLimits) -> Self {
        Self { limits }
    }

    fn parse<'s>(&self, rule: Rule, source: &'s str) -> ContourResult<Pair<'s, Rule>> {
        check_limits(source, &self.limits)?;
        let mut pairs = ContourParser::parse(rule, source).map_err(|e| {
            let (line, col) = match e.line_col {
                pest::error::LineColLocation::Pos(pos) => pos,
                pest::error::LineColLocation::Span(start, _) => start,
            };
            ContourError::parse(e.variant.message().to_string(), source, line, col)
        })?;
        let input = pairs
            .next()
            .ok_or_else(|| ContourError::Engine(format!("No parse result for {:?}", rule)))?;
        single_inner(input)
    }
}

impl DefinitionCompiler for ReferenceCompiler {
    fn compile_guard(&self, source: &str, dimensions: &DimensionSpace) -> ContourResult<GuardSpec> {
        let pair = self.parse(Rule::guard_input, source)?;
        let expr = Lowering::new(dimensions, self.limits.max_expression_depth).expression(pair)?;
        GuardSpec::from_expr(expr)
    }

    fn compile_expr(&self, source: &str, dimensions: &DimensionSpace) -> ContourResult<Compiled> {
        let pair = self.parse(Rule::expression_input, source)?;
        let expr = Lowering::new(dimensions, self.limits.max_expression_depth).expression(pair)?;
        Ok(Rc::new(expr))
    }

    fn compile_equation(
        &self,
        source: &str,
        _dimensions: &DimensionSpace,
    ) -> ContourResult<(String, Definition)> {
        let equation = self.parse(Rule::equation_input, source)?;

        let mut name = None;
        let mut guard = None;
        let mut boolean = None;
        let mut body = None;
        for part in equation.into_inner() {
            match part.as_rule() {
                Rule::identifier => name = Some(part.as_str().to_string()),
                Rule::guard => guard = Some(part.as_str().trim().to_string()),
                Rule::boolean => boolean = Some(part.as_str().trim().to_string()),
                Rule::body => body = Some(part.as_str().trim().to_string()),
                _ => {}
            }
        }

        let (Some(name), Some(body)) = (name, body) else {
            return Err(ContourError::Engine(format!(
                "Incomplete equation: '{}'",
                source
            )));
        };
        let mut definition = Definition::raw(body);
        if let Some(guard) = guard {
            definition = definition.with_raw_guard(guard);
        }
        if let Some(boolean) = boolean {
            definition = definition.with_raw_boolean(boolean);
        }
        Ok((name, definition))
    }
}

/// Reject oversized or too deeply bracketed text before handing it to the
/// parser
fn check_limits(source: &str, limits: &ResourceLimits) -> ContourResult<()> {
    if source.len() > limits.max_source_bytes {
        return Err(ContourError::limit_exceeded(
            "max_source_bytes",
            limits.max_source_bytes,
            source.len(),
            "Split the definition into smaller equations",
        ));
    }

    let mut depth = 0usize;
    let mut deepest = 0usize;
    let mut in_string = false;
    for c in source.chars() {
        match c {
            '"' => in_string = !in_string,
            '(' | '[' if !in_string => {
                depth += 1;
                deepest = deepest.max(depth);
            }
            ')' | ']' if !in_string => depth = depth.saturating_sub(1),
            _ => {}
        }
    }
    if deepest > limits.max_expression_depth {
        return Err(ContourError::limit_exceeded(
            "max_expression_depth",
            limits.max_expression_depth,
            deepest,
            "Simplify nested expressions to reduce depth",
        ));
    }
    Ok(())
}
