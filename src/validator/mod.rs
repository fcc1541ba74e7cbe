//! Platform validators
//!
//! The output vocabulary of the compiler, its JSON export, and the
//! checks the platform runs against argument, return and document values.

mod check;
mod errors;
mod types;

pub use check::{check_fields, id_belongs_to};
pub use errors::{ValidationError, ValidationResult};
pub use types::{FieldValidator, PropertyValidators, Validator};
