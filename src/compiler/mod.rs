//! Schema-to-validator compiler
//!
//! Walks a schema AST and produces the platform validator describing the
//! same values, or a [`CompileError`] explaining why the schema has no
//! representation.
//!
//! # Guarantees
//!
//! - Pure, synchronous and stateless; safe to call concurrently
//! - Exactly one validator or exactly one error, never partial output
//! - The validator accepts at least what the schema accepts
//! - Recursive subtrees are capped at `any` so compilation terminates

mod adapters;
mod compile;
mod errors;
mod recursion;

pub use adapters::{compile_args, compile_returns, compile_table};
pub use compile::compile;
pub use errors::{CompileError, CompileResult};
pub use recursion::is_recursive;
