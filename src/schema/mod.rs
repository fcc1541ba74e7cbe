//! Table and schema definitions
//!
//! Persisted documents are described by the same schema ASTs as function
//! arguments. Each table compiles its document schema once, at definition
//! time; the schema as a whole is then cross-checked for dangling id
//! references and index fields.

mod definition;
mod errors;
mod table;

pub use definition::SchemaDefinition;
pub use errors::{SchemaError, SchemaResult};
pub use table::{IndexDefinition, TableDefinition};
