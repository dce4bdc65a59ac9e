use crate::dimension::DimensionSpace;
use crate::error::ContourError;
use crate::evaluator::{BinaryOp, Expr, UnaryOp};
use crate::parser::literals::{parse_boolean, parse_number, parse_string, parse_typed_constant};
use crate::parser::Rule;
use crate::value::Value;
use crate::ContourResult;
use pest::iterators::Pair;

/// Lowers parse trees into [`Expr`] while bounding tree height
pub(crate) struct Lowering<'a> {
    dimensions: &'a DimensionSpace,
    max_depth: usize,
    depth: usize,
}

impl<'a> Lowering<'a> {
    pub(crate) fn new(dimensions: &'a DimensionSpace, max_depth: usize) -> Self {
        Self {
            dimensions,
            max_depth,
            depth: 0,
        }
    }

    fn push_depth(&mut self, levels: usize) -> ContourResult<()> {
        self.depth += levels;
        if self.depth > self.max_depth {
            return Err(ContourError::limit_exceeded(
                "max_expression_depth",
                self.max_depth,
                self.depth,
                "Simplify nested expressions to reduce depth",
            ));
        }
        Ok(())
    }

    fn pop_depth(&mut self, levels: usize) {
        self.depth = self.depth.saturating_sub(levels);
    }

    pub(crate) fn expression(&mut self, pair: Pair<Rule>) -> ContourResult<Expr> {
        self.push_depth(1)?;
        let result = self.expression_impl(pair);
        self.pop_depth(1);
        result
    }

    fn expression_impl(&mut self, pair: Pair<Rule>) -> ContourResult<Expr> {
        match pair.as_rule() {
            Rule::expression
            | Rule::guard
            | Rule::boolean
            | Rule::body
            | Rule::range_lower
            | Rule::range_upper => {
                let inner = single_inner(pair)?;
                self.expression_impl(inner)
            }
            Rule::if_expression => self.if_expression(pair),
            Rule::or_expression
            | Rule::and_expression
            | Rule::equality
            | Rule::comparison
            | Rule::additive
            | Rule::multiplicative => self.binary_chain(pair),
            Rule::unary => self.unary(pair),
            Rule::power => self.power_chain(pair),
            Rule::postfix => self.postfix(pair),
            Rule::primary => self.primary(pair),
            other => Err(ContourError::Engine(format!(
                "Unexpected rule in expression: {:?}",
                other
            ))),
        }
    }

    fn if_expression(&mut self, pair: Pair<Rule>) -> ContourResult<Expr> {
        let mut parts = pair
            .into_inner()
            .filter(|inner| inner.as_rule() == Rule::expression);
        let mut next = |what: &str| {
            parts
                .next()
                .ok_or_else(|| ContourError::Engine(format!("Missing {} in conditional", what)))
        };
        let condition = next("condition")?;
        let then = next("consequent")?;
        let otherwise = next("alternative")?;
        Ok(Expr::If {
            condition: Box::new(self.expression(condition)?),
            then: Box::new(self.expression(then)?),
            otherwise: Box::new(self.expression(otherwise)?),
        })
    }

    /// Left-associative chain `a op b op c ...`
    fn binary_chain(&mut self, pair: Pair<Rule>) -> ContourResult<Expr> {
        let rule = pair.as_rule();
        let mut pairs = pair.into_inner();
        let first = pairs
            .next()
            .ok_or_else(|| ContourError::Engine(format!("Missing left operand in {:?}", rule)))?;
        let mut left = self.expression_impl(first)?;

        let mut folded = 0;
        let result = loop {
            let Some(op_pair) = pairs.next() else {
                break Ok(left);
            };
            let op = match binary_operator(&op_pair) {
                Ok(op) => op,
                Err(err) => break Err(err),
            };
            let Some(right_pair) = pairs.next() else {
                break Err(ContourError::Engine(format!(
                    "Missing right operand for '{}'",
                    op.symbol()
                )));
            };
            if let Err(err) = self.push_depth(1) {
                break Err(err);
            }
            folded += 1;
            let right = match self.expression_impl(right_pair) {
                Ok(right) => right,
                Err(err) => break Err(err),
            };
            left = Expr::binary(left, op, right);
        };
        self.pop_depth(folded);
        result
    }

    /// Right-associative chain `a ^ b ^ c`, folded as `a ^ (b ^ c)`
    fn power_chain(&mut self, pair: Pair<Rule>) -> ContourResult<Expr> {
        let operands: Vec<_> = pair
            .into_inner()
            .filter(|inner| inner.as_rule() != Rule::pow_op)
            .collect();
        let folded = operands.len().saturating_sub(1);

        self.push_depth(folded)?;
        let lowered = operands
            .into_iter()
            .map(|operand| self.expression_impl(operand))
            .collect::<ContourResult<Vec<_>>>();
        self.pop_depth(folded);

        let mut lowered = lowered?.into_iter().rev();
        let mut expr = lowered
            .next()
            .ok_or_else(|| ContourError::Engine("Missing operand for '^'".to_string()))?;
        for base in lowered {
            expr = Expr::binary(base, BinaryOp::Power, expr);
        }
        Ok(expr)
    }

    fn unary(&mut self, pair: Pair<Rule>) -> ContourResult<Expr> {
        let mut ops = Vec::new();
        let mut operand = None;
        for inner in pair.into_inner() {
            match inner.as_rule() {
                Rule::neg_op => ops.push(UnaryOp::Negate),
                Rule::not_op => ops.push(UnaryOp::Not),
                _ => operand = Some(inner),
            }
        }
        let operand =
            operand.ok_or_else(|| ContourError::Engine("Missing unary operand".to_string()))?;

        self.push_depth(ops.len())?;
        let result = self.expression_impl(operand).map(|mut expr| {
            for op in ops.iter().rev() {
                expr = Expr::Unary(*op, Box::new(expr));
            }
            expr
        });
        self.pop_depth(ops.len());
        result
    }

    fn postfix(&mut self, pair: Pair<Rule>) -> ContourResult<Expr> {
        let mut pairs = pair.into_inner();
        let base = pairs
            .next()
            .ok_or_else(|| ContourError::Engine("Missing primary".to_string()))?;
        let mut expr = self.expression_impl(base)?;

        // Each context change nests the body one level deeper
        let mut folded = 0;
        let result = loop {
            let Some(tuple) = pairs.next() else {
                break Ok(expr);
            };
            if let Err(err) = self.push_depth(1) {
                break Err(err);
            }
            folded += 1;
            match self.bindings(tuple) {
                Ok(bindings) => expr = Expr::at(expr, bindings),
                Err(err) => break Err(err),
            }
        };
        self.pop_depth(folded);
        result
    }

    fn primary(&mut self, pair: Pair<Rule>) -> ContourResult<Expr> {
        let inner = single_inner(pair)?;
        match inner.as_rule() {
            Rule::number => Ok(Expr::Constant(parse_number(&inner)?)),
            Rule::string => Ok(Expr::Constant(parse_string(inner)?)),
            Rule::boolean_literal => Ok(Expr::Constant(parse_boolean(&inner)?)),
            Rule::typed_constant => Ok(Expr::Constant(parse_typed_constant(inner, self.dimensions)?)),
            Rule::tuple => Ok(Expr::Tuple(self.bindings(inner)?)),
            Rule::query => {
                let target = single_inner(inner)?;
                match target.as_rule() {
                    Rule::identifier => Ok(Expr::query(self.dimensions.intern_name(target.as_str()))),
                    _ => Ok(Expr::Query(Box::new(self.expression(target)?))),
                }
            }
            Rule::variable => Ok(Expr::variable(inner.as_str())),
            Rule::expression => self.expression(inner),
            other => Err(ContourError::Engine(format!(
                "Unexpected primary: {:?}",
                other
            ))),
        }
    }

    fn bindings(&mut self, tuple: Pair<Rule>) -> ContourResult<Vec<(Expr, Expr)>> {
        let mut bindings = Vec::new();
        for binding in tuple.into_inner() {
            let mut parts = binding.into_inner();
            let (Some(key), Some(value)) = (parts.next(), parts.next()) else {
                return Err(ContourError::Engine("Incomplete tuple binding".to_string()));
            };
            let key = single_inner(key)?;
            let dim = match key.as_rule() {
                Rule::identifier => Expr::Constant(Value::Dimension(
                    self.dimensions.intern_name(key.as_str()),
                )),
                _ => self.expression(key)?,
            };
            let value = match value.as_rule() {
                Rule::range => self.range(value)?,
                _ => self.expression(value)?,
            };
            bindings.push((dim, value));
        }
        Ok(bindings)
    }

    fn range(&mut self, pair: Pair<Rule>) -> ContourResult<Expr> {
        let mut lower = None;
        let mut upper = None;
        for bound in pair.into_inner() {
            match bound.as_rule() {
                Rule::range_lower => lower = Some(Box::new(self.expression(bound)?)),
                Rule::range_upper => upper = Some(Box::new(self.expression(bound)?)),
                _ => {}
            }
        }
        Ok(Expr::Range(lower, upper))
    }
}

fn binary_operator(pair: &Pair<Rule>) -> ContourResult<BinaryOp> {
    let op = match pair.as_rule() {
        Rule::or_op => BinaryOp::Or,
        Rule::and_op => BinaryOp::And,
        Rule::eq_op => BinaryOp::Equal,
        Rule::ne_op => BinaryOp::NotEqual,
        Rule::le_op => BinaryOp::LessOrEqual,
        Rule::ge_op => BinaryOp::GreaterOrEqual,
        Rule::lt_op => BinaryOp::Less,
        Rule::gt_op => BinaryOp::Greater,
        Rule::add_op => BinaryOp::Add,
        Rule::sub_op => BinaryOp::Subtract,
        Rule::mul_op => BinaryOp::Multiply,
        Rule::div_op => BinaryOp::Divide,
        Rule::mod_op => BinaryOp::Modulo,
        other => {
            return Err(ContourError::Engine(format!(
                "Unexpected operator: {:?}",
                other
            )))
        }
    };
    Ok(op)
}

/// The only child of a wrapper rule
pub(crate) fn single_inner(pair: Pair<Rule>) -> ContourResult<Pair<Rule>> {
    let rule = pair.as_rule();
    pair.into_inner()
        .next()
        .ok_or_else(|| ContourError::Engine(format!("Empty {:?}", rule)))
}
