//! Schema authoring helpers
//!
//! Constructors for the common shapes, so that callers rarely spell out
//! AST structs by hand.
//!
//! ```ignore
//! use effex::ast::{self, field, optional};
//!
//! let show = ast::struct_([
//!     field("name", ast::string()),
//!     field("network", ast::id("networks")),
//!     optional("rating", ast::number()),
//! ]);
//! ```

use std::sync::Arc;

use super::types::{
    Ast, Declaration, IndexSignature, LiteralValue, PropertyKey, PropertySignature, Refinement,
    Suspend, TemplateLiteral, TemplateSpan, TemplateSpanType, Transformation, TupleElement,
    TupleType, TypeLiteral,
};
use crate::value::Value;

pub fn string() -> Ast {
    Ast::String { table: None }
}

/// A string holding the id of a document in `table`
pub fn id(table: impl Into<String>) -> Ast {
    Ast::String {
        table: Some(table.into()),
    }
}

pub fn number() -> Ast {
    Ast::Number
}

pub fn bigint() -> Ast {
    Ast::BigInt
}

pub fn boolean() -> Ast {
    Ast::Boolean
}

pub fn null() -> Ast {
    Ast::Literal(LiteralValue::Null)
}

pub fn literal(value: impl Into<LiteralValue>) -> Ast {
    Ast::Literal(value.into())
}

/// A union of literals
pub fn literals<L: Into<LiteralValue>>(values: impl IntoIterator<Item = L>) -> Ast {
    union(values.into_iter().map(|value| literal(value)))
}

/// A union; no members is `never`, one member is that member
pub fn union(members: impl IntoIterator<Item = Ast>) -> Ast {
    let mut members: Vec<Ast> = members.into_iter().collect();
    match members.len() {
        0 => Ast::Never,
        1 => members.remove(0),
        _ => Ast::Union(members),
    }
}

pub fn nullable(inner: Ast) -> Ast {
    union([inner, null()])
}

/// Required property
pub fn field(name: impl Into<String>, ty: Ast) -> PropertySignature {
    PropertySignature {
        name: PropertyKey::String(name.into()),
        ty,
        is_optional: false,
    }
}

/// Optional property; its type also admits `undefined`
pub fn optional(name: impl Into<String>, ty: Ast) -> PropertySignature {
    PropertySignature {
        name: PropertyKey::String(name.into()),
        ty: Ast::Union(vec![ty, Ast::Undefined]),
        is_optional: true,
    }
}

pub fn struct_(fields: impl IntoIterator<Item = PropertySignature>) -> Ast {
    Ast::TypeLiteral(TypeLiteral {
        property_signatures: fields.into_iter().collect(),
        index_signatures: Vec::new(),
    })
}

pub fn record(key: Ast, value: Ast) -> Ast {
    Ast::TypeLiteral(TypeLiteral {
        property_signatures: Vec::new(),
        index_signatures: vec![IndexSignature {
            parameter: key,
            ty: value,
        }],
    })
}

/// Fixed-length tuple of required elements
pub fn tuple(elements: impl IntoIterator<Item = Ast>) -> Ast {
    Ast::Tuple(TupleType {
        elements: elements
            .into_iter()
            .map(|ty| TupleElement {
                ty,
                is_optional: false,
            })
            .collect(),
        rest: Vec::new(),
    })
}

/// Variable-length homogeneous array
pub fn array(item: Ast) -> Ast {
    Ast::Tuple(TupleType {
        elements: Vec::new(),
        rest: vec![item],
    })
}

/// Opaque binary data
pub fn bytes() -> Ast {
    declare("Uint8Array", |value| match value {
        Value::Bytes(_) => Ok(()),
        other => Err(format!("expected bytes, got {}", other.type_name())),
    })
}

/// A declared type checked by `decoder`
pub fn declare(
    identifier: impl Into<String>,
    decoder: impl Fn(&Value) -> Result<(), String> + Send + Sync + 'static,
) -> Ast {
    Ast::Declaration(Declaration {
        identifier: identifier.into(),
        decoder: Arc::new(decoder),
    })
}

pub fn refine(
    from: Ast,
    description: impl Into<String>,
    filter: impl Fn(&Value) -> bool + Send + Sync + 'static,
) -> Ast {
    Ast::Refinement(Refinement {
        from: Box::new(from),
        description: description.into(),
        filter: Arc::new(filter),
    })
}

/// A float64 with no fractional part
pub fn int() -> Ast {
    refine(number(), "an integer", |value| {
        matches!(value, Value::Float64(f) if f.fract() == 0.0)
    })
}

/// A lazily built node, for self-referential schemas
pub fn suspend(thunk: impl Fn() -> Ast + Send + Sync + 'static) -> Ast {
    Ast::Suspend(Suspend::new(thunk))
}

pub fn transform(from: Ast, to: Ast) -> Ast {
    Ast::Transformation(Transformation {
        from: Box::new(from),
        to: Box::new(to),
    })
}

pub fn enums<L: Into<LiteralValue>>(members: impl IntoIterator<Item = (&'static str, L)>) -> Ast {
    Ast::Enums(
        members
            .into_iter()
            .map(|(name, value)| (name.to_string(), value.into()))
            .collect(),
    )
}

/// `` `${head}${string}` `` style template; spans as `(type, trailing literal)`
pub fn template(
    head: impl Into<String>,
    spans: impl IntoIterator<Item = (TemplateSpanType, &'static str)>,
) -> Ast {
    Ast::TemplateLiteral(TemplateLiteral {
        head: head.into(),
        spans: spans
            .into_iter()
            .map(|(ty, literal)| TemplateSpan {
                ty,
                literal: literal.to_string(),
            })
            .collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_union_collapses() {
        assert!(matches!(union([string()]), Ast::String { table: None }));
        assert!(matches!(union(Vec::new()), Ast::Never));
        assert!(matches!(union([string(), number()]), Ast::Union(ref m) if m.len() == 2));
    }

    #[test]
    fn test_optional_admits_undefined() {
        let sig = optional("rating", number());
        assert!(sig.is_optional);
        match sig.ty {
            Ast::Union(members) => assert!(matches!(members[1], Ast::Undefined)),
            other => panic!("expected union, got {:?}", other),
        }
    }

    #[test]
    fn test_bytes_declaration_accepts_empty_bytes() {
        match bytes() {
            Ast::Declaration(decl) => {
                assert!(decl.decode(&Value::Bytes(Vec::new())).is_ok());
                assert!(decl.decode(&Value::String("x".into())).is_err());
            }
            other => panic!("expected declaration, got {:?}", other),
        }
    }

    #[test]
    fn test_id_annotation() {
        match id("shows") {
            Ast::String { table } => assert_eq!(table.as_deref(), Some("shows")),
            other => panic!("expected string, got {:?}", other),
        }
    }
}
