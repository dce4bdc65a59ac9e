use crate::dimension::DimensionSpace;
use crate::error::ContourError;
use crate::parser::Rule;
use crate::value::{Special, Value};
use crate::ContourResult;
use pest::iterators::Pair;
use rust_decimal::Decimal;
use std::str::FromStr;

pub(crate) fn parse_number(pair: &Pair<Rule>) -> ContourResult<Value> {
    Decimal::from_str(pair.as_str())
        .map(Value::Number)
        .map_err(|_| ContourError::Semantic(format!("Invalid number: '{}'", pair.as_str())))
}

pub(crate) fn parse_string(pair: Pair<Rule>) -> ContourResult<Value> {
    Ok(Value::Text(string_content(pair)))
}

pub(crate) fn parse_boolean(pair: &Pair<Rule>) -> ContourResult<Value> {
    match pair.as_str() {
        "true" => Ok(Value::Boolean(true)),
        "false" => Ok(Value::Boolean(false)),
        other => Err(ContourError::Semantic(format!("Invalid boolean: '{}'", other))),
    }
}

/// Constant written as `type"text"`.
///
/// Text that does not parse as the named type yields the
/// `constant-parse-error` special; an unknown type name is a fault.
///
/// # Examples
/// ```text
/// number"3.5"    3.5
/// number"abc"    special<constant-parse-error>
/// bool"true"     true
/// text"hi"       "hi"
/// dimension"x"   dimension x, which must already be known
/// ```
pub(crate) fn parse_typed_constant(
    pair: Pair<Rule>,
    dimensions: &DimensionSpace,
) -> ContourResult<Value> {
    let mut inner = pair.into_inner();
    let (Some(type_name), Some(text)) = (inner.next(), inner.next()) else {
        return Err(ContourError::Engine("Incomplete typed constant".to_string()));
    };
    let text = string_content(text);

    let value = match type_name.as_str() {
        "number" => Decimal::from_str(text.trim())
            .map(Value::Number)
            .unwrap_or(Value::Special(Special::ConstantParseError)),
        "bool" | "boolean" => match text.trim() {
            "true" => Value::Boolean(true),
            "false" => Value::Boolean(false),
            _ => Value::Special(Special::ConstantParseError),
        },
        "text" | "string" => Value::Text(text),
        "dimension" | "dim" => match dimensions.lookup_name(text.trim()) {
            Some(dim) => Value::Dimension(dim),
            None => return Err(ContourError::UnknownDimension(text)),
        },
        other => {
            return Err(ContourError::Semantic(format!(
                "Unknown constant type '{}'",
                other
            )))
        }
    };
    Ok(value)
}

fn string_content(pair: Pair<Rule>) -> String {
    pair.into_inner()
        .next()
        .map(|content| content.as_str().to_string())
        .unwrap_or_default()
}
