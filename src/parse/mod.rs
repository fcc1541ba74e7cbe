//! Schema-driven decoding and encoding
//!
//! The runtime counterpart of the compiler: where the compiler turns a
//! schema into a validator, this module checks platform values against the
//! schema itself, including the parts (refinements, transformations,
//! template literals) that no validator can express.

mod errors;
mod parser;

pub use errors::{ParseError, ParseErrorKind, ParseResult};
pub use parser::{decode, encode, is};
