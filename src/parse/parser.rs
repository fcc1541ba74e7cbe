//! Decoding and encoding platform values against a schema AST
//!
//! Decoding checks a value against the schema and returns the accepted
//! value:
//! - excess object keys not covered by an index signature are dropped
//! - union members are tried in order, first success wins
//! - suspensions are forced lazily, so recursive schemas decode
//!   recursive values
//!
//! Encoding is the same walk in the other direction; the only
//! direction-sensitive node is a transformation.

use indexmap::IndexMap;
use regex::RegexBuilder;

use super::errors::{ParseError, ParseErrorKind, ParseResult};
use crate::ast::{Ast, PropertyKey, TemplateLiteral, TemplateSpanType, TupleType, TypeLiteral};
use crate::value::Value;

/// Compiled size cap for a template literal's matcher
const TEMPLATE_PATTERN_LIMIT: usize = 1 << 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Decode,
    Encode,
}

/// Decodes `input` against `ast`.
pub fn decode(ast: &Ast, input: &Value) -> ParseResult<Value> {
    parse(ast, input, Direction::Decode, "$root")
}

/// Encodes `output` against `ast`.
pub fn encode(ast: &Ast, output: &Value) -> ParseResult<Value> {
    parse(ast, output, Direction::Encode, "$root")
}

/// Whether `input` decodes against `ast`
pub fn is(ast: &Ast, input: &Value) -> bool {
    decode(ast, input).is_ok()
}

fn parse(ast: &Ast, value: &Value, direction: Direction, path: &str) -> ParseResult<Value> {
    match ast {
        Ast::Literal(literal) => {
            if literal.to_value() == *value {
                Ok(value.clone())
            } else {
                Err(ParseError::type_mismatch(path, literal.to_string(), value.to_string()))
            }
        }
        Ast::UniqueSymbol(_) | Ast::Symbol => {
            Err(ParseError::type_mismatch(path, "symbol", value.type_name()))
        }
        Ast::Undefined | Ast::Void => {
            Err(ParseError::type_mismatch(path, "undefined", value.type_name()))
        }
        Ast::Never => Err(ParseError::type_mismatch(path, "never", value.type_name())),
        Ast::Unknown | Ast::Any => Ok(value.clone()),
        Ast::Boolean => expect_kind(matches!(value, Value::Boolean(_)), "boolean", value, path),
        Ast::String { .. } => expect_kind(matches!(value, Value::String(_)), "string", value, path),
        Ast::Number => expect_kind(matches!(value, Value::Float64(_)), "number", value, path),
        Ast::BigInt => expect_kind(matches!(value, Value::Int64(_)), "bigint", value, path),
        Ast::Object => expect_kind(
            matches!(value, Value::Object(_) | Value::Array(_)),
            "object",
            value,
            path,
        ),
        Ast::Enums(members) => {
            if members.iter().any(|(_, member)| member.to_value() == *value) {
                Ok(value.clone())
            } else {
                let names: Vec<_> = members.iter().map(|(name, _)| name.as_str()).collect();
                Err(ParseError::type_mismatch(
                    path,
                    format!("one of [{}]", names.join(", ")),
                    value.to_string(),
                ))
            }
        }
        Ast::TemplateLiteral(template) => parse_template(template, value, path),
        Ast::Declaration(declaration) => declaration
            .decode(value)
            .map(|()| value.clone())
            .map_err(|reason| {
                ParseError::new(
                    path,
                    ParseErrorKind::Declaration {
                        identifier: declaration.identifier.clone(),
                        reason,
                    },
                )
            }),
        Ast::Refinement(refinement) => {
            let base = parse(&refinement.from, value, direction, path)?;
            if refinement.accepts(&base) {
                Ok(base)
            } else {
                Err(ParseError::new(
                    path,
                    ParseErrorKind::Refinement(refinement.description.clone()),
                ))
            }
        }
        Ast::Tuple(tuple) => parse_tuple(tuple, value, direction, path),
        Ast::TypeLiteral(type_literal) => parse_type_literal(type_literal, value, direction, path),
        Ast::Union(members) => members
            .iter()
            .find_map(|member| parse(member, value, direction, path).ok())
            .ok_or_else(|| {
                ParseError::new(
                    path,
                    ParseErrorKind::NoMatchingMember {
                        members: members.len(),
                    },
                )
            }),
        Ast::Suspend(suspend) => parse(&suspend.force(), value, direction, path),
        Ast::Transformation(transformation) => {
            let (first, second) = match direction {
                Direction::Decode => (&transformation.from, &transformation.to),
                Direction::Encode => (&transformation.to, &transformation.from),
            };
            let intermediate = parse(first, value, direction, path)?;
            parse(second, &intermediate, direction, path)
        }
    }
}

fn expect_kind(ok: bool, expected: &str, value: &Value, path: &str) -> ParseResult<Value> {
    if ok {
        Ok(value.clone())
    } else {
        Err(ParseError::type_mismatch(path, expected, value.type_name()))
    }
}

fn parse_template(template: &TemplateLiteral, value: &Value, path: &str) -> ParseResult<Value> {
    let Value::String(s) = value else {
        return Err(ParseError::type_mismatch(path, "string", value.type_name()));
    };

    let mut pattern = format!("^{}", regex::escape(&template.head));
    for span in &template.spans {
        pattern.push_str(match span.ty {
            TemplateSpanType::String => r"(?s:.*)",
            TemplateSpanType::Number => r"[+-]?(?:\d+(?:\.\d*)?|\.\d+)(?:[eE][+-]?\d+)?",
        });
        pattern.push_str(&regex::escape(&span.literal));
    }
    pattern.push('$');

    let matcher = RegexBuilder::new(&pattern)
        .size_limit(TEMPLATE_PATTERN_LIMIT)
        .build()
        .map_err(|e| ParseError::new(path, ParseErrorKind::Pattern(e.to_string())))?;
    if matcher.is_match(s) {
        Ok(value.clone())
    } else {
        Err(ParseError::type_mismatch(
            path,
            format!("template {}", pattern),
            format!("{:?}", s),
        ))
    }
}

fn parse_tuple(
    tuple: &TupleType,
    value: &Value,
    direction: Direction,
    path: &str,
) -> ParseResult<Value> {
    let Value::Array(items) = value else {
        return Err(ParseError::type_mismatch(path, "array", value.type_name()));
    };

    let mut out = Vec::with_capacity(items.len());
    for (i, element) in tuple.elements.iter().enumerate() {
        match items.get(i) {
            Some(item) => out.push(parse(&element.ty, item, direction, &index_path(path, i))?),
            None if element.is_optional => {}
            None => return Err(ParseError::new(index_path(path, i), ParseErrorKind::Missing)),
        }
    }

    let fixed = tuple.elements.len();
    match tuple.rest.split_first() {
        None => {
            if items.len() > fixed {
                return Err(ParseError::new(
                    index_path(path, fixed),
                    ParseErrorKind::UnexpectedItem,
                ));
            }
        }
        Some((variadic, trailing)) => {
            if items.len().saturating_sub(fixed) < trailing.len() {
                return Err(ParseError::new(index_path(path, items.len()), ParseErrorKind::Missing));
            }
            let variadic_end = items.len() - trailing.len();
            for (i, item) in items.iter().enumerate().take(variadic_end).skip(fixed) {
                out.push(parse(variadic, item, direction, &index_path(path, i))?);
            }
            for (j, ty) in trailing.iter().enumerate() {
                let i = variadic_end + j;
                out.push(parse(ty, &items[i], direction, &index_path(path, i))?);
            }
        }
    }

    Ok(Value::Array(out))
}

fn parse_type_literal(
    type_literal: &TypeLiteral,
    value: &Value,
    direction: Direction,
    path: &str,
) -> ParseResult<Value> {
    let Value::Object(obj) = value else {
        return Err(ParseError::type_mismatch(path, "object", value.type_name()));
    };

    let mut out = IndexMap::with_capacity(obj.len());
    for signature in &type_literal.property_signatures {
        let key = match &signature.name {
            PropertyKey::String(name) => name.clone(),
            PropertyKey::Number(n) => n.to_string(),
            // Symbol-keyed properties never appear on platform values
            PropertyKey::Symbol(_) if signature.is_optional => continue,
            PropertyKey::Symbol(_) => {
                let missing = make_path(path, &signature.name.to_string());
                return Err(ParseError::new(missing, ParseErrorKind::Missing));
            }
        };
        let field_path = make_path(path, &key);
        match obj.get(&key) {
            Some(field) => {
                let parsed = parse(&signature.ty, field, direction, &field_path)?;
                out.insert(key, parsed);
            }
            None if signature.is_optional => {}
            None => return Err(ParseError::new(field_path, ParseErrorKind::Missing)),
        }
    }

    for (key, field) in obj {
        if out.contains_key(key) {
            continue;
        }
        let key_value = Value::String(key.clone());
        let signature = type_literal
            .index_signatures
            .iter()
            .find(|signature| parse(&signature.parameter, &key_value, direction, path).is_ok());
        if let Some(signature) = signature {
            let parsed = parse(&signature.ty, field, direction, &make_path(path, key))?;
            out.insert(key.clone(), parsed);
        }
    }

    Ok(Value::Object(out))
}

fn make_path(prefix: &str, field: &str) -> String {
    format!("{}.{}", prefix, field)
}

fn index_path(prefix: &str, index: usize) -> String {
    format!("{}[{}]", prefix, index)
}
