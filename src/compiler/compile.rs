//! AST to validator compilation
//!
//! Dispatch is an exhaustive match over [`Ast`]: a new node kind does not
//! compile until it is handled here.
//!
//! Precision is traded for representability in three places:
//! - recursive subtrees become `any`
//! - tuples become arrays of a union with one member per element type
//! - refinements keep only their base shape

use std::sync::OnceLock;

use regex::Regex;

use super::errors::{CompileError, CompileResult};
use super::recursion::is_recursive;
use crate::ast::{
    Ast, Declaration, LiteralValue, PropertyKey, PropertySignature, TupleType, TypeLiteral,
};
use crate::validator::{FieldValidator, PropertyValidators, Validator};
use crate::value::Value;

/// Compiles `ast` into a single validator.
///
/// Any recursive subtree compiles to [`Validator::Any`].
pub fn compile(ast: &Ast) -> CompileResult<Validator> {
    if is_recursive(ast) {
        return Ok(Validator::Any);
    }

    match ast {
        Ast::Literal(LiteralValue::Null) => Ok(Validator::Null),
        Ast::Literal(literal) => Ok(Validator::Literal {
            value: literal.clone(),
        }),
        Ast::Boolean => Ok(Validator::Boolean),
        Ast::String { table: Some(table) } => Ok(Validator::id(table.clone())),
        Ast::String { table: None } => Ok(Validator::String),
        Ast::Number => Ok(Validator::Float64),
        Ast::BigInt => Ok(Validator::Int64),
        Ast::Union(members) => compile_union(members),
        Ast::TypeLiteral(type_literal) => compile_type_literal(type_literal),
        Ast::Tuple(tuple) => compile_tuple(tuple),
        Ast::Unknown | Ast::Any | Ast::Suspend(_) => Ok(Validator::Any),
        Ast::Declaration(declaration) => compile_declaration(declaration),
        Ast::Refinement(refinement) => compile(&refinement.from),
        Ast::UniqueSymbol(_)
        | Ast::Symbol
        | Ast::Undefined
        | Ast::Void
        | Ast::Never
        | Ast::Enums(_)
        | Ast::TemplateLiteral(_)
        | Ast::Object
        | Ast::Transformation(_) => Err(CompileError::UnsupportedSchemaType { tag: ast.tag() }),
    }
}

fn compile_union(members: &[Ast]) -> CompileResult<Validator> {
    match members {
        [] => Err(CompileError::UnsupportedSchemaType {
            tag: Ast::Never.tag(),
        }),
        [single] => compile(single),
        _ => members
            .iter()
            .map(compile)
            .collect::<CompileResult<Vec<_>>>()
            .map(|value| Validator::Union { value }),
    }
}

fn compile_type_literal(type_literal: &TypeLiteral) -> CompileResult<Validator> {
    let has_properties = !type_literal.property_signatures.is_empty();
    match type_literal.index_signatures.as_slice() {
        [] => compile_properties(&type_literal.property_signatures).map(Validator::object),
        _ if has_properties => Err(CompileError::MixedIndexAndPropertySignaturesNotSupported),
        [signature] => {
            let keys = compile(&signature.parameter)?;
            let values = compile(&signature.ty)?;
            Ok(Validator::record(keys, values))
        }
        _ => Err(CompileError::IndexSignaturesNotSupported),
    }
}

/// Compiles property signatures into field validators, in declaration order.
pub(crate) fn compile_properties(
    signatures: &[PropertySignature],
) -> CompileResult<PropertyValidators> {
    let mut fields = PropertyValidators::with_capacity(signatures.len());
    for signature in signatures {
        let name = property_name(&signature.name)?;
        let field_type = if signature.is_optional {
            compile_optional(&signature.ty)?
        } else {
            compile(&signature.ty)?
        };
        fields.insert(
            name.to_string(),
            FieldValidator {
                field_type,
                optional: signature.is_optional,
            },
        );
    }
    Ok(fields)
}

/// Optionality lives on the field, so `undefined` union members are dropped.
fn compile_optional(ty: &Ast) -> CompileResult<Validator> {
    match ty {
        Ast::Union(members) if !is_recursive(ty) => {
            let defined: Vec<Ast> = members
                .iter()
                .filter(|member| !matches!(member, Ast::Undefined))
                .cloned()
                .collect();
            compile_union(&defined)
        }
        _ => compile(ty),
    }
}

fn property_name(key: &PropertyKey) -> CompileResult<&str> {
    match key {
        // Numeric-looking names are refused even though they arrive as
        // strings; the key may have been coerced from a number upstream.
        PropertyKey::String(name) if numeric_key().is_match(name) => {
            Err(CompileError::unsupported_key(name))
        }
        PropertyKey::String(name) => Ok(name),
        PropertyKey::Number(_) | PropertyKey::Symbol(_) => Err(CompileError::unsupported_key(key)),
    }
}

fn compile_tuple(tuple: &TupleType) -> CompileResult<Validator> {
    if tuple.elements.iter().any(|elem| elem.is_optional) {
        return Err(CompileError::OptionalTupleElementsNotSupported);
    }

    match (tuple.elements.as_slice(), tuple.rest.as_slice()) {
        ([], []) => Err(CompileError::EmptyTupleNotSupported),
        (elements, rest) => {
            // One member per element and rest type, in order, repeats included
            let mut members = elements
                .iter()
                .map(|elem| &elem.ty)
                .chain(rest.iter())
                .map(compile)
                .collect::<CompileResult<Vec<_>>>()?;
            let item = if members.len() == 1 {
                members.remove(0)
            } else {
                Validator::Union { value: members }
            };
            Ok(Validator::array(item))
        }
    }
}

/// Declarations are opaque; only those that accept binary data compile.
fn compile_declaration(declaration: &Declaration) -> CompileResult<Validator> {
    match declaration.decode(&Value::Bytes(Vec::new())) {
        Ok(()) => Ok(Validator::Bytes),
        Err(_) => Err(CompileError::UnsupportedSchemaType { tag: "Declaration" }),
    }
}

/// Decimal number literals: `0`, `-1`, `1.5`, `.5`, `1e3`
fn numeric_key() -> &'static Regex {
    static NUMERIC_KEY: OnceLock<Regex> = OnceLock::new();
    NUMERIC_KEY.get_or_init(|| {
        Regex::new(r"^[+-]?(\d+(\.\d*)?|\.\d+)([eE][+-]?\d+)?$")
            .expect("numeric key pattern is valid")
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{self, field, optional, IndexSignature, TupleElement};

    #[test]
    fn test_primitives() {
        assert_eq!(compile(&ast::boolean()).unwrap(), Validator::Boolean);
        assert_eq!(compile(&ast::number()).unwrap(), Validator::Float64);
        assert_eq!(compile(&ast::bigint()).unwrap(), Validator::Int64);
        assert_eq!(compile(&ast::string()).unwrap(), Validator::String);
        assert_eq!(compile(&ast::id("shows")).unwrap(), Validator::id("shows"));
        assert_eq!(compile(&ast::bytes()).unwrap(), Validator::Bytes);
        assert_eq!(compile(&Ast::Unknown).unwrap(), Validator::Any);
    }

    #[test]
    fn test_literals() {
        assert_eq!(compile(&ast::null()).unwrap(), Validator::Null);
        assert_eq!(compile(&ast::literal("a")).unwrap(), Validator::literal("a"));
        assert_eq!(compile(&ast::literal(3_i64)).unwrap(), Validator::literal(3_i64));
        assert_eq!(compile(&ast::literal(true)).unwrap(), Validator::literal(true));
    }

    #[test]
    fn test_recursive_union_compiles_to_any() {
        let node = Ast::Union(vec![ast::string(), ast::suspend(ast::number)]);
        assert_eq!(compile(&node).unwrap(), Validator::Any);
    }

    #[test]
    fn test_optional_drops_undefined() {
        let node = ast::struct_([optional("b", ast::string())]);
        let Validator::Object { value } = compile(&node).unwrap() else {
            panic!("expected object");
        };
        assert_eq!(value["b"], FieldValidator::optional(Validator::String));
    }

    #[test]
    fn test_required_undefined_is_unsupported() {
        let node = ast::struct_([field("b", Ast::Union(vec![ast::string(), Ast::Undefined]))]);
        assert_eq!(
            compile(&node).unwrap_err(),
            CompileError::UnsupportedSchemaType { tag: "UndefinedKeyword" }
        );
    }

    #[test]
    fn test_numeric_keys() {
        for key in ["0", "12", "-1", "1.5", ".5", "1e3"] {
            let node = ast::struct_([field(key, ast::string())]);
            assert_eq!(
                compile(&node).unwrap_err(),
                CompileError::unsupported_key(key),
                "key {key}"
            );
        }
        for key in ["a0", "0a", "", "1.2.3"] {
            let node = ast::struct_([field(key, ast::string())]);
            assert!(compile(&node).is_ok(), "key {key}");
        }
    }

    #[test]
    fn test_symbol_and_number_keys() {
        let sym = Ast::TypeLiteral(TypeLiteral {
            property_signatures: vec![PropertySignature {
                name: PropertyKey::Symbol("tag".into()),
                ty: ast::string(),
                is_optional: false,
            }],
            index_signatures: Vec::new(),
        });
        assert_eq!(compile(&sym).unwrap_err(), CompileError::unsupported_key("Symbol(tag)"));

        let num = Ast::TypeLiteral(TypeLiteral {
            property_signatures: vec![PropertySignature {
                name: PropertyKey::Number(1.0),
                ty: ast::string(),
                is_optional: false,
            }],
            index_signatures: Vec::new(),
        });
        assert_eq!(compile(&num).unwrap_err(), CompileError::unsupported_key("1"));
    }

    #[test]
    fn test_multiple_index_signatures() {
        let node = Ast::TypeLiteral(TypeLiteral {
            property_signatures: Vec::new(),
            index_signatures: vec![
                IndexSignature { parameter: ast::string(), ty: ast::number() },
                IndexSignature { parameter: ast::string(), ty: ast::string() },
            ],
        });
        assert_eq!(compile(&node).unwrap_err(), CompileError::IndexSignaturesNotSupported);
    }

    #[test]
    fn test_record() {
        let node = ast::record(ast::string(), ast::number());
        assert_eq!(
            compile(&node).unwrap(),
            Validator::record(Validator::String, Validator::Float64)
        );
    }

    #[test]
    fn test_tuple_shapes() {
        assert_eq!(
            compile(&ast::tuple([ast::string()])).unwrap(),
            Validator::array(Validator::String)
        );
        assert_eq!(
            compile(&ast::array(ast::number())).unwrap(),
            Validator::array(Validator::Float64)
        );
        let mixed = Ast::Tuple(TupleType {
            elements: vec![TupleElement { ty: ast::string(), is_optional: false }],
            rest: vec![ast::number()],
        });
        assert_eq!(
            compile(&mixed).unwrap(),
            Validator::array(Validator::union(vec![Validator::String, Validator::Float64]))
        );
        assert_eq!(
            compile(&ast::tuple([ast::string(), ast::string()])).unwrap(),
            Validator::array(Validator::Union {
                value: vec![Validator::String, Validator::String],
            })
        );
    }

    #[test]
    fn test_optional_tuple_element() {
        let node = Ast::Tuple(TupleType {
            elements: vec![TupleElement { ty: ast::string(), is_optional: true }],
            rest: Vec::new(),
        });
        assert_eq!(compile(&node).unwrap_err(), CompileError::OptionalTupleElementsNotSupported);
    }

    #[test]
    fn test_non_binary_declaration() {
        let date = ast::declare("Date", |_| Err("not a date".into()));
        assert_eq!(
            compile(&date).unwrap_err(),
            CompileError::UnsupportedSchemaType { tag: "Declaration" }
        );
    }

    #[test]
    fn test_unsupported_keywords() {
        let cases = [
            (Ast::Symbol, "SymbolKeyword"),
            (Ast::UniqueSymbol("s".into()), "UniqueSymbol"),
            (Ast::Undefined, "UndefinedKeyword"),
            (Ast::Void, "VoidKeyword"),
            (Ast::Never, "NeverKeyword"),
            (Ast::Object, "ObjectKeyword"),
            (ast::enums([("A", "a")]), "Enums"),
            (ast::template("id-", []), "TemplateLiteral"),
            (ast::transform(ast::string(), ast::number()), "Transformation"),
        ];
        for (node, tag) in cases {
            assert_eq!(compile(&node).unwrap_err(), CompileError::UnsupportedSchemaType { tag });
        }
    }

    #[test]
    fn test_refinement_is_transparent() {
        assert_eq!(compile(&ast::int()).unwrap(), Validator::Float64);
    }

    #[test]
    fn test_empty_union_is_never() {
        assert_eq!(
            compile(&Ast::Union(Vec::new())).unwrap_err(),
            CompileError::UnsupportedSchemaType { tag: "NeverKeyword" }
        );
    }
}
