//! Recursion detection
//!
//! `Suspend` is the only cyclic construct. It reports recursion without
//! forcing its thunk, so the walk always terminates.

use crate::ast::Ast;

/// Whether `ast` contains a self-referential node anywhere the compiler
/// would descend.
pub fn is_recursive(ast: &Ast) -> bool {
    match ast {
        Ast::Literal(_)
        | Ast::UniqueSymbol(_)
        | Ast::Symbol
        | Ast::Undefined
        | Ast::Void
        | Ast::Never
        | Ast::Unknown
        | Ast::Any
        | Ast::Boolean
        | Ast::String { .. }
        | Ast::Number
        | Ast::BigInt
        | Ast::Object
        | Ast::Enums(_)
        | Ast::TemplateLiteral(_)
        | Ast::Declaration(_)
        | Ast::Transformation(_) => false,
        Ast::Union(members) => members.iter().any(is_recursive),
        Ast::TypeLiteral(type_literal) => type_literal
            .property_signatures
            .iter()
            .any(|sig| is_recursive(&sig.ty)),
        Ast::Tuple(tuple) => tuple.elements.iter().any(|elem| is_recursive(&elem.ty)),
        Ast::Refinement(refinement) => is_recursive(&refinement.from),
        Ast::Suspend(_) => true,
    }
}
