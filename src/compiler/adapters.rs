//! Call sites over the compiler
//!
//! - args: object schema -> per-field validators for a function's parameters
//! - returns: any schema -> one validator
//! - table: object or union-of-objects schema -> document validator

use super::compile::{compile, compile_properties};
use super::errors::{CompileError, CompileResult};
use crate::ast::{Ast, TypeLiteral};
use crate::validator::{PropertyValidators, Validator};

/// Compiles a function's argument schema.
///
/// # Errors
///
/// `TopLevelMustBeObject` unless the root is a struct without index
/// signatures; otherwise any error from compiling a property.
pub fn compile_args(ast: &Ast) -> CompileResult<PropertyValidators> {
    match ast {
        Ast::TypeLiteral(type_literal) if type_literal.index_signatures.is_empty() => {
            compile_properties(&type_literal.property_signatures)
        }
        _ => Err(CompileError::TopLevelMustBeObject),
    }
}

/// Compiles a function's return schema. Any root shape is allowed.
pub fn compile_returns(ast: &Ast) -> CompileResult<Validator> {
    compile(ast)
}

/// Compiles a persisted record schema.
///
/// Fields are compiled one at a time so that a recursive field degrades to
/// `any` without degrading the whole document.
pub fn compile_table(ast: &Ast) -> CompileResult<Validator> {
    match ast {
        Ast::TypeLiteral(type_literal) => compile_table_object(type_literal),
        Ast::Union(members) => {
            let variants = members
                .iter()
                .map(|member| match member {
                    Ast::TypeLiteral(type_literal) => compile_table_object(type_literal),
                    _ => Err(CompileError::TopLevelMustBeObjectOrUnion),
                })
                .collect::<CompileResult<Vec<_>>>()?;
            Ok(Validator::union(variants))
        }
        _ => Err(CompileError::TopLevelMustBeObjectOrUnion),
    }
}

fn compile_table_object(type_literal: &TypeLiteral) -> CompileResult<Validator> {
    if !type_literal.index_signatures.is_empty() {
        return Err(CompileError::TopLevelMustBeObjectOrUnion);
    }
    compile_properties(&type_literal.property_signatures).map(Validator::object)
}
