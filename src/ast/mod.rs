//! Schema description trees
//!
//! The structural form of a data shape as produced by schema authoring,
//! prior to compilation into validators. Every consumer matches on
//! [`Ast`] exhaustively.

mod builders;
mod types;

pub use builders::{
    array, bigint, boolean, bytes, declare, enums, field, id, int, literal, literals, null,
    nullable, number, optional, record, refine, string, struct_, suspend, template, transform,
    tuple, union,
};
pub use types::{
    Ast, Declaration, DeclarationDecoder, IndexSignature, LiteralValue, PropertyKey,
    PropertySignature, Refinement, RefinementFilter, Suspend, SuspendThunk, TemplateLiteral,
    TemplateSpan, TemplateSpanType, Transformation, TupleElement, TupleType, TypeLiteral,
};
