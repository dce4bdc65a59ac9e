use crate::dimension::{Dim, DimensionSpace};
use crate::equation::{DefinitionCompiler, Part};
use crate::evaluator::{BinaryOp, Expr, UnaryOp};
use crate::parser::expressions::Lowering;
use crate::parser::{ContourParser, ReferenceCompiler, Rule};
use crate::resource_limits::ResourceLimits;
use crate::value::{Special, Value};
use crate::ContourError;
use pest::Parser;
use rust_decimal::Decimal;

fn lower(source: &str, space: &DimensionSpace) -> Result<Expr, ContourError> {
    let mut pairs = ContourParser::parse(Rule::expression_input, source)
        .map_err(|e| ContourError::Engine(e.to_string()))?;
    let input = pairs.next().unwrap();
    let expr = input.into_inner().next().unwrap();
    Lowering::new(space, 100).expression(expr)
}

fn num(n: i64) -> Expr {
    Expr::Constant(Value::number(n))
}

#[test]
fn test_precedence() {
    let space = DimensionSpace::new();
    let expr = lower("1 + 2 * 3", &space).unwrap();
    assert_eq!(
        expr,
        Expr::binary(num(1), BinaryOp::Add, Expr::binary(num(2), BinaryOp::Multiply, num(3)))
    );
}

#[test]
fn test_left_associativity() {
    let space = DimensionSpace::new();
    let expr = lower("8 - 4 - 2", &space).unwrap();
    assert_eq!(
        expr,
        Expr::binary(Expr::binary(num(8), BinaryOp::Subtract, num(4)), BinaryOp::Subtract, num(2))
    );
}

#[test]
fn test_power_binds_tighter_and_associates_right() {
    let space = DimensionSpace::new();
    let expr = lower("2 * 3 ^ 2 ^ 2", &space).unwrap();
    assert_eq!(
        expr,
        Expr::binary(
            num(2),
            BinaryOp::Multiply,
            Expr::binary(num(3), BinaryOp::Power, Expr::binary(num(2), BinaryOp::Power, num(2)))
        )
    );

    let negated = lower("-2 ^ 2", &space).unwrap();
    assert_eq!(
        negated,
        Expr::Unary(
            UnaryOp::Negate,
            Box::new(Expr::binary(num(2), BinaryOp::Power, num(2)))
        )
    );
}

#[test]
fn test_logical_and_comparison() {
    let space = DimensionSpace::new();
    let expr = lower("1 < 2 && !false || 3 != 4", &space).unwrap();
    let expected = Expr::binary(
        Expr::binary(
            Expr::binary(num(1), BinaryOp::Less, num(2)),
            BinaryOp::And,
            Expr::Unary(UnaryOp::Not, Box::new(Expr::Constant(Value::Boolean(false)))),
        ),
        BinaryOp::Or,
        Expr::binary(num(3), BinaryOp::NotEqual, num(4)),
    );
    assert_eq!(expr, expected);
}

#[test]
fn test_query_and_variable() {
    let space = DimensionSpace::new();
    let expr = lower("#n * fact", &space).unwrap();
    let n = space.lookup_name("n").unwrap();
    assert_eq!(
        expr,
        Expr::binary(Expr::query(n), BinaryOp::Multiply, Expr::variable("fact"))
    );
}

#[test]
fn test_builtin_dimension_names() {
    let space = DimensionSpace::new();
    assert_eq!(lower("#time", &space).unwrap(), Expr::query(Dim::TIME));
}

#[test]
fn test_context_change() {
    let space = DimensionSpace::new();
    let expr = lower("fact @ [n <- #n - 1]", &space).unwrap();
    let n = space.lookup_name("n").unwrap();
    assert_eq!(
        expr,
        Expr::at(
            Expr::variable("fact"),
            vec![(
                Expr::Constant(Value::Dimension(n)),
                Expr::binary(Expr::query(n), BinaryOp::Subtract, num(1))
            )]
        )
    );
}

#[test]
fn test_tuple_with_ranges_and_computed_key() {
    let space = DimensionSpace::new();
    let expr = lower("[a <- 1..5, b <- ..3, (1 + 1) <- 0]", &space).unwrap();
    let a = space.lookup_name("a").unwrap();
    let b = space.lookup_name("b").unwrap();
    assert_eq!(
        expr,
        Expr::Tuple(vec![
            (
                Expr::Constant(Value::Dimension(a)),
                Expr::Range(Some(Box::new(num(1))), Some(Box::new(num(5))))
            ),
            (
                Expr::Constant(Value::Dimension(b)),
                Expr::Range(None, Some(Box::new(num(3))))
            ),
            (Expr::binary(num(1), BinaryOp::Add, num(1)), num(0)),
        ])
    );
}

#[test]
fn test_conditional() {
    let space = DimensionSpace::new();
    let expr = lower("if true then 1 else 2", &space).unwrap();
    assert_eq!(
        expr,
        Expr::If {
            condition: Box::new(Expr::Constant(Value::Boolean(true))),
            then: Box::new(num(1)),
            otherwise: Box::new(num(2)),
        }
    );
}

#[test]
fn test_identifiers_starting_with_keywords() {
    let space = DimensionSpace::new();
    assert_eq!(lower("iffy", &space).unwrap(), Expr::variable("iffy"));
    assert_eq!(lower("truest", &space).unwrap(), Expr::variable("truest"));
}

#[test]
fn test_typed_constants() {
    let space = DimensionSpace::new();
    assert_eq!(
        lower(r#"number"3.5""#, &space).unwrap(),
        Expr::Constant(Value::Number(Decimal::new(35, 1)))
    );
    assert_eq!(
        lower(r#"number"three""#, &space).unwrap(),
        Expr::Constant(Value::Special(Special::ConstantParseError))
    );
    assert_eq!(lower(r#"text"hi""#, &space).unwrap(), Expr::Constant(Value::text("hi")));
    assert!(matches!(
        lower(r#"colour"red""#, &space),
        Err(ContourError::Semantic(_))
    ));
}

#[test]
fn test_dimension_constant_must_be_known() {
    let space = DimensionSpace::new();
    assert!(matches!(
        lower(r#"dimension"lang""#, &space),
        Err(ContourError::UnknownDimension(_))
    ));
    let lang = space.intern_name("lang");
    assert_eq!(
        lower(r#"dimension"lang""#, &space).unwrap(),
        Expr::Constant(Value::Dimension(lang))
    );
}

#[test]
fn test_compile_equation_splits_raw_parts() {
    let compiler = ReferenceCompiler::default();
    let space = DimensionSpace::new();
    let (name, definition) = compiler
        .compile_equation("fact @ [n <- 0] | true = 1", &space)
        .unwrap();

    assert_eq!(name, "fact");
    assert!(matches!(definition.guard, Some(Part::Raw(ref g)) if g == "[n <- 0]"));
    assert!(matches!(definition.boolean, Some(Part::Raw(ref b)) if b == "true"));
    assert!(matches!(definition.body, Part::Raw(ref b) if b == "1"));
}

#[test]
fn test_parse_error_carries_position() {
    let compiler = ReferenceCompiler::default();
    let space = DimensionSpace::new();
    match compiler.compile_equation("x = 1 +", &space) {
        Err(ContourError::Parse(details)) => {
            assert_eq!(details.line, 1);
            assert!(details.col > 1);
            assert_eq!(&*details.source_text, "x = 1 +");
        }
        other => panic!("Expected parse error, got {:?}", other),
    }
}

#[test]
fn test_guard_must_be_tuple() {
    let compiler = ReferenceCompiler::default();
    let space = DimensionSpace::new();
    assert!(matches!(
        compiler.compile_guard("1 + 1", &space),
        Err(ContourError::MalformedGuard(_))
    ));
    assert_eq!(compiler.compile_guard("([a <- 1])", &space).unwrap().len(), 1);
}

#[test]
fn test_nesting_limit() {
    let limits = ResourceLimits {
        max_expression_depth: 5,
        ..ResourceLimits::default()
    };
    let compiler = ReferenceCompiler::new(limits);
    let space = DimensionSpace::new();
    let deep = format!("{}1{}", "(".repeat(10), ")".repeat(10));
    assert!(matches!(
        compiler.compile_expr(&deep, &space),
        Err(ContourError::ResourceLimitExceeded { .. })
    ));
}

#[test]
fn test_long_operator_chain_hits_depth_limit() {
    let limits = ResourceLimits {
        max_expression_depth: 20,
        ..ResourceLimits::default()
    };
    let compiler = ReferenceCompiler::new(limits);
    let space = DimensionSpace::new();
    let chain = vec!["1"; 50].join(" + ");
    assert!(matches!(
        compiler.compile_expr(&chain, &space),
        Err(ContourError::ResourceLimitExceeded { .. })
    ));
    assert!(compiler.compile_expr("1 + 2 + 3", &space).is_ok());
}

#[test]
fn test_long_context_change_chain_hits_depth_limit() {
    let compiler = ReferenceCompiler::default();
    let space = DimensionSpace::new();
    let chain = format!("1{}", " @ [d <- 1]".repeat(101));
    match compiler.compile_expr(&chain, &space) {
        Err(ContourError::ResourceLimitExceeded { limit_name, .. }) => {
            assert_eq!(limit_name, "max_expression_depth");
        }
        other => panic!("Expected resource limit error, got {:?}", other),
    }

    let short = format!("1{}", " @ [d <- 1]".repeat(10));
    assert!(compiler.compile_expr(&short, &space).is_ok());
}

#[test]
fn test_source_size_limit() {
    let limits = ResourceLimits {
        max_source_bytes: 8,
        ..ResourceLimits::default()
    };
    let compiler = ReferenceCompiler::new(limits);
    let space = DimensionSpace::new();
    assert!(matches!(
        compiler.compile_expr("1 + 2 + 3 + 4", &space),
        Err(ContourError::ResourceLimitExceeded { .. })
    ));
}
